//! Calendar resampling of kWh totals.

use std::collections::BTreeMap;

use chrono::{Datelike, Days, NaiveDate};
use serde::Serialize;

use crate::types::{MeterRecord, UnifiedDataset};

/// Bucket width for [`resample_sum`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frequency {
    /// Calendar day, labelled by the date.
    Daily,
    /// Week ending Sunday, labelled by that Sunday.
    Weekly,
}

impl Frequency {
    /// Label of the bucket containing `date`.
    pub fn bucket(self, date: NaiveDate) -> NaiveDate {
        match self {
            Self::Daily => date,
            Self::Weekly => {
                let to_sunday = 6 - u64::from(date.weekday().num_days_from_monday());
                date.checked_add_days(Days::new(to_sunday)).unwrap_or(date)
            }
        }
    }

    fn step(self) -> Days {
        match self {
            Self::Daily => Days::new(1),
            Self::Weekly => Days::new(7),
        }
    }
}

/// One resampled bucket.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bucket {
    /// Bucket label (the day, or the Sunday closing the week).
    pub label: NaiveDate,
    /// Sum of kWh in the bucket.
    pub kwh: f64,
}

/// Sum kWh per bucket, in chronological order.
///
/// Buckets between the first and last populated one are emitted with `0.0`, so the series has
/// no holes. Input order does not matter.
pub fn resample_sum<'a, I>(records: I, freq: Frequency) -> Vec<Bucket>
where
    I: IntoIterator<Item = &'a MeterRecord>,
{
    let mut sums: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for r in records {
        *sums.entry(freq.bucket(r.timestamp.date())).or_insert(0.0) += r.kwh;
    }

    let (Some(&first), Some(&last)) = (sums.keys().next(), sums.keys().next_back()) else {
        return Vec::new();
    };

    let mut out = Vec::new();
    let mut label = first;
    while label <= last {
        out.push(Bucket {
            label,
            kwh: sums.get(&label).copied().unwrap_or(0.0),
        });
        match label.checked_add_days(freq.step()) {
            Some(next) => label = next,
            None => break,
        }
    }
    out
}

/// Campus-wide daily totals.
pub fn daily_totals(dataset: &UnifiedDataset) -> Vec<Bucket> {
    resample_sum(&dataset.records, Frequency::Daily)
}

/// Campus-wide weekly totals (weeks ending Sunday).
pub fn weekly_totals(dataset: &UnifiedDataset) -> Vec<Bucket> {
    resample_sum(&dataset.records, Frequency::Weekly)
}

/// Per-building series at `freq`, keyed by building.
pub fn totals_by_building(dataset: &UnifiedDataset, freq: Frequency) -> BTreeMap<String, Vec<Bucket>> {
    let mut groups: BTreeMap<&str, Vec<&MeterRecord>> = BTreeMap::new();
    for r in &dataset.records {
        groups.entry(r.building.as_str()).or_default().push(r);
    }
    groups
        .into_iter()
        .map(|(b, rs)| (b.to_string(), resample_sum(rs, freq)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn rec(building: &str, ts: &str, kwh: f64) -> MeterRecord {
        MeterRecord {
            timestamp: NaiveDateTime::parse_from_str(ts, "%Y-%m-%d %H:%M").unwrap(),
            building: building.to_string(),
            kwh,
            extra: Default::default(),
        }
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn weekly_bucket_is_the_following_sunday() {
        // 2024-01-01 is a Monday.
        assert_eq!(Frequency::Weekly.bucket(d(2024, 1, 1)), d(2024, 1, 7));
        assert_eq!(Frequency::Weekly.bucket(d(2024, 1, 7)), d(2024, 1, 7));
        assert_eq!(Frequency::Weekly.bucket(d(2024, 1, 8)), d(2024, 1, 14));
    }

    #[test]
    fn daily_totals_fill_gaps_with_zero() {
        let ds = UnifiedDataset {
            records: vec![
                rec("A", "2024-01-03 10:00", 2.0),
                rec("A", "2024-01-01 00:00", 1.0),
                rec("B", "2024-01-01 23:00", 1.5),
            ],
            extra_columns: vec![],
        };
        let daily = daily_totals(&ds);
        assert_eq!(
            daily,
            vec![
                Bucket { label: d(2024, 1, 1), kwh: 2.5 },
                Bucket { label: d(2024, 1, 2), kwh: 0.0 },
                Bucket { label: d(2024, 1, 3), kwh: 2.0 },
            ]
        );
    }

    #[test]
    fn weekly_totals_group_monday_to_sunday() {
        let ds = UnifiedDataset {
            records: vec![
                rec("A", "2024-01-01 00:00", 1.0),
                rec("A", "2024-01-07 23:59", 2.0),
                rec("A", "2024-01-08 00:00", 4.0),
            ],
            extra_columns: vec![],
        };
        let weekly = weekly_totals(&ds);
        assert_eq!(
            weekly,
            vec![
                Bucket { label: d(2024, 1, 7), kwh: 3.0 },
                Bucket { label: d(2024, 1, 14), kwh: 4.0 },
            ]
        );
    }

    #[test]
    fn per_building_series_are_independent() {
        let ds = UnifiedDataset {
            records: vec![
                rec("B", "2024-01-02 00:00", 1.0),
                rec("A", "2024-01-01 00:00", 3.0),
            ],
            extra_columns: vec![],
        };
        let by = totals_by_building(&ds, Frequency::Daily);
        assert_eq!(by.keys().collect::<Vec<_>>(), vec!["A", "B"]);
        assert_eq!(by["A"], vec![Bucket { label: d(2024, 1, 1), kwh: 3.0 }]);
        assert_eq!(by["B"], vec![Bucket { label: d(2024, 1, 2), kwh: 1.0 }]);
    }

    #[test]
    fn empty_dataset_has_no_buckets() {
        assert!(daily_totals(&UnifiedDataset::default()).is_empty());
    }
}
