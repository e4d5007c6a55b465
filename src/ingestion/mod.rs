//! Ingestion entrypoints and implementations.
//!
//! Most callers should use [`ingest_directory`] (from [`pipeline`]) which:
//!
//! - scans a directory for delimited-text files ([`discovery`])
//! - parses each file ([`csv`]), canonicalizes its columns and tags its building ([`normalize`])
//! - types the `timestamp` and `kwh` columns ([`timestamp`])
//! - concatenates everything in discovery order ([`merge`])
//! - optionally reports per-file outcomes to an [`IngestionObserver`]

pub mod csv;
pub mod discovery;
pub mod merge;
pub mod normalize;
pub mod observability;
pub mod pipeline;
pub mod timestamp;

pub use csv::RecordParser;
pub use discovery::FileDiscovery;
pub use merge::{DatasetMerger, FileOutcome};
pub use normalize::{DuplicateColumnPolicy, SchemaNormalizer};
pub use observability::{
    CompositeObserver, IngestionContext, IngestionObserver, IngestionSeverity, IngestionStats,
    JsonLinesObserver, TracingObserver,
};
pub use pipeline::{IngestionOutput, IngestionRequest, Pipeline, PipelineOptions, ingest_directory};
pub use timestamp::{CoercedBatch, DateOrder, RowErrorPolicy, TimestampCoercer, TimestampParser};
