//! Reductions over the `kwh` field of a [`crate::types::UnifiedDataset`].

use crate::types::MeterRecord;

/// Built-in reduction operations over kWh values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReduceOp {
    /// Count records.
    Count,
    /// Sum of kWh.
    Sum,
    /// Minimum kWh.
    Min,
    /// Maximum kWh.
    Max,
    /// Arithmetic mean of kWh.
    Mean,
}

/// Reduce the kWh values of `records` with `op`.
///
/// - `Count` always returns `Some` (zero for no records).
/// - `Sum` of no records is `Some(0.0)`.
/// - `Min`/`Max`/`Mean` of no records are `None`.
pub fn reduce<'a, I>(records: I, op: ReduceOp) -> Option<f64>
where
    I: IntoIterator<Item = &'a MeterRecord>,
{
    let mut count = 0usize;
    let mut acc: Option<f64> = None;
    for r in records {
        count += 1;
        let v = r.kwh;
        acc = Some(match (op, acc) {
            (ReduceOp::Count, _) => 0.0,
            (ReduceOp::Sum | ReduceOp::Mean, Some(a)) => a + v,
            (ReduceOp::Min, Some(a)) => a.min(v),
            (ReduceOp::Max, Some(a)) => a.max(v),
            (_, None) => v,
        });
    }

    match op {
        ReduceOp::Count => Some(count as f64),
        ReduceOp::Sum => Some(acc.unwrap_or(0.0)),
        ReduceOp::Min | ReduceOp::Max => acc,
        ReduceOp::Mean => acc.map(|sum| sum / count as f64),
    }
}
