//! Resolve coordinates through the configured geocoding sources and print
//! one line per point. Reads `lat,lon` pairs from the arguments, or from
//! stdin when none are given.

use anyhow::{Context, Result};
use clap::Parser;
use std::io::BufRead;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use roadwatch_common::Coordinate;
use roadwatch_domains::geo::ReconciliationEngine;

#[derive(Parser)]
#[command(name = "resolve-coords", about = "Resolve coordinates to neighborhoods")]
struct Cli {
    /// Path to config TOML file
    #[arg(long, default_value = "./config/roadwatch.toml")]
    config: PathBuf,

    /// Points as `lat,lon`
    points: Vec<String>,
}

fn parse_point(raw: &str) -> Result<Coordinate> {
    let (lat, lon) = raw
        .split_once(',')
        .with_context(|| format!("expected lat,lon, got '{raw}'"))?;
    let lat: f64 = lat.trim().parse().with_context(|| format!("bad latitude in '{raw}'"))?;
    let lon: f64 = lon.trim().parse().with_context(|| format!("bad longitude in '{raw}'"))?;
    Ok(Coordinate::new(lat, lon)?)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let file_config = roadwatch_core::file_config::load_config(&cli.config)?;
    let api_key = std::env::var("MEXICO_POSTAL_API_KEY").ok().filter(|k| !k.is_empty());

    let http_client = reqwest::Client::builder()
        .timeout(file_config.geocoding.timeout())
        .build()?;
    let engine = ReconciliationEngine::from_config(&file_config.geocoding, &http_client, api_key.as_deref())?;

    let points: Vec<String> = if cli.points.is_empty() {
        std::io::stdin()
            .lock()
            .lines()
            .collect::<std::io::Result<Vec<_>>>()?
            .into_iter()
            .filter(|l| !l.trim().is_empty())
            .collect()
    } else {
        cli.points
    };

    for raw in &points {
        let coordinate = match parse_point(raw) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("{raw}: {e:#}");
                continue;
            }
        };
        match engine.resolve(coordinate).await {
            Ok(loc) => println!(
                "{coordinate}\t{}\t{}\t{}\t{}\t{} ({}/{})",
                loc.neighborhood,
                loc.postal_code,
                loc.municipality,
                loc.state,
                loc.confidence,
                loc.agreeing_sources,
                loc.sources_consulted
            ),
            Err(e) => eprintln!("{coordinate}: {e}"),
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_points() {
        let c = parse_point("25.6866, -100.3161").unwrap();
        assert_eq!(c.latitude(), 25.6866);
        assert_eq!(c.longitude(), -100.3161);
        assert!(parse_point("25.6866").is_err());
        assert!(parse_point("95,0").is_err());
    }
}
