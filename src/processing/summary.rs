//! Per-building and campus-wide consumption summaries.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::types::{MeterRecord, UnifiedDataset};

use super::reduce::{ReduceOp, reduce};

/// kWh statistics for one building.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuildingSummary {
    pub building: String,
    pub readings: usize,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub sum: f64,
    /// Timestamp of the building's largest single reading (first one on ties).
    pub peak_at: NaiveDateTime,
}

/// Summaries for every building, sorted by building.
pub fn building_summary(dataset: &UnifiedDataset) -> Vec<BuildingSummary> {
    let mut groups: BTreeMap<&str, Vec<&MeterRecord>> = BTreeMap::new();
    for r in &dataset.records {
        groups.entry(r.building.as_str()).or_default().push(r);
    }

    groups
        .into_iter()
        .filter_map(|(building, rs)| {
            let peak = peak_record(rs.iter().copied())?;
            Some(BuildingSummary {
                building: building.to_string(),
                readings: rs.len(),
                mean: reduce(rs.iter().copied(), ReduceOp::Mean)?,
                min: reduce(rs.iter().copied(), ReduceOp::Min)?,
                max: peak.kwh,
                sum: reduce(rs.iter().copied(), ReduceOp::Sum)?,
                peak_at: peak.timestamp,
            })
        })
        .collect()
}

/// The single largest reading on campus.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeakReading {
    pub timestamp: NaiveDateTime,
    pub building: String,
    pub kwh: f64,
}

/// Campus-wide headline figures.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CampusSummary {
    /// Sum of all kWh.
    pub total_kwh: f64,
    /// Building with the largest total (alphabetically first on ties).
    pub highest_building: Option<String>,
    /// Largest single reading (first in dataset order on ties).
    pub peak: Option<PeakReading>,
}

/// Compute the campus summary.
pub fn campus_summary(dataset: &UnifiedDataset) -> CampusSummary {
    let highest_building = building_summary(dataset)
        .into_iter()
        .fold(None::<BuildingSummary>, |best, s| match best {
            Some(b) if b.sum >= s.sum => Some(b),
            _ => Some(s),
        })
        .map(|s| s.building);

    CampusSummary {
        total_kwh: reduce(&dataset.records, ReduceOp::Sum).unwrap_or(0.0),
        highest_building,
        peak: peak_record(&dataset.records).map(|r| PeakReading {
            timestamp: r.timestamp,
            building: r.building.clone(),
            kwh: r.kwh,
        }),
    }
}

fn peak_record<'a, I>(records: I) -> Option<&'a MeterRecord>
where
    I: IntoIterator<Item = &'a MeterRecord>,
{
    records.into_iter().fold(None, |best: Option<&MeterRecord>, r| match best {
        Some(b) if b.kwh >= r.kwh => Some(b),
        _ => Some(r),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(building: &str, ts: &str, kwh: f64) -> MeterRecord {
        MeterRecord {
            timestamp: NaiveDateTime::parse_from_str(ts, "%Y-%m-%d %H:%M").unwrap(),
            building: building.to_string(),
            kwh,
            extra: Default::default(),
        }
    }

    fn dataset() -> UnifiedDataset {
        UnifiedDataset {
            records: vec![
                rec("B", "2024-01-01 00:00", 4.0),
                rec("A", "2024-01-01 00:00", 1.0),
                rec("A", "2024-01-01 01:00", 5.0),
                rec("B", "2024-01-01 02:00", 5.0),
                rec("A", "2024-01-01 02:00", 0.0),
            ],
            extra_columns: vec![],
        }
    }

    #[test]
    fn building_summary_is_sorted_with_stats() {
        let s = building_summary(&dataset());
        assert_eq!(s.len(), 2);
        assert_eq!(s[0].building, "A");
        assert_eq!(s[0].readings, 3);
        assert_eq!(s[0].sum, 6.0);
        assert_eq!(s[0].mean, 2.0);
        assert_eq!(s[0].min, 0.0);
        assert_eq!(s[0].max, 5.0);
        assert_eq!(s[1].building, "B");
        assert_eq!(s[1].sum, 9.0);
        assert_eq!(s[1].peak_at.to_string(), "2024-01-01 02:00:00");
    }

    #[test]
    fn campus_summary_picks_highest_and_first_peak() {
        let c = campus_summary(&dataset());
        assert_eq!(c.total_kwh, 15.0);
        assert_eq!(c.highest_building.as_deref(), Some("B"));
        let peak = c.peak.unwrap();
        // A's 5.0 at 01:00 appears before B's 5.0 in dataset order.
        assert_eq!(peak.building, "A");
        assert_eq!(peak.timestamp.to_string(), "2024-01-01 01:00:00");
    }

    #[test]
    fn empty_dataset_summary() {
        let c = campus_summary(&UnifiedDataset::default());
        assert_eq!(c.total_kwh, 0.0);
        assert!(c.highest_building.is_none());
        assert!(c.peak.is_none());
        assert!(building_summary(&UnifiedDataset::default()).is_empty());
    }
}
