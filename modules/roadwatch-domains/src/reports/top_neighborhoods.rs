use roadwatch_common::{JoinedFaultRow, NeighborhoodReport};
use serde::Serialize;
use std::collections::HashMap;

/// Body of `GET /api/reports/top-neighborhoods`.
#[derive(Debug, Clone, Serialize)]
pub struct TopNeighborhoodsResponse {
    pub top_neighborhoods: Vec<NeighborhoodReport>,
}

/// Group joined fault rows by neighborhood and keep the `n` with most faults.
///
/// Ties keep the order in which neighborhoods first appear in `rows`, and each
/// group's faults keep their input order, so the same rows always produce the
/// same report.
pub fn build_top_n(rows: impl IntoIterator<Item = JoinedFaultRow>, n: usize) -> Vec<NeighborhoodReport> {
    let mut reports: Vec<NeighborhoodReport> = Vec::new();
    let mut index: HashMap<i64, usize> = HashMap::new();

    for row in rows {
        let slot = *index.entry(row.neighborhood_id).or_insert_with(|| {
            reports.push(NeighborhoodReport {
                neighborhood_id: row.neighborhood_id,
                neighborhood_name: row.neighborhood_name.clone(),
                total_faults: 0,
                faults: Vec::new(),
            });
            reports.len() - 1
        });
        let report = &mut reports[slot];
        report.total_faults += 1;
        report.faults.push(row.into());
    }

    // sort_by is stable
    reports.sort_by(|a, b| b.total_faults.cmp(&a.total_faults));
    reports.truncate(n);
    reports
}
