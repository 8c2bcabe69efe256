//! Bead calibration QC: turn instrument report exports into a dataset and
//! flag drift of the latest measurements against recent history.

pub mod color;
pub mod config;
pub mod data;
pub mod drift;
pub mod error;

pub use config::PipelineConfig;
pub use data::builder::{BuildOutput, DatalessFile, build_dataset};
pub use data::filter::RecordFilter;
pub use data::model::{Dataset, Metric, Record};
pub use drift::{ChangeRow, DriftQuery, DriftReport, analyze, sweep};
pub use error::{DatalessReason, DriftError, ExtractError, MetadataError};
