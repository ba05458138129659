pub mod top_neighborhoods;

pub use top_neighborhoods::{build_top_n, TopNeighborhoodsResponse};
