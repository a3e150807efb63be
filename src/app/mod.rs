//! Core relay logic
//!
//! This module contains the delivery pipeline and its collaborators: source
//! connectors, the file selector with its dedup state, the multipart
//! uploader, and the per-job runner that ties them to a schedule.

pub mod connector;
pub mod pipeline;
pub mod runner;
pub mod schedule;
pub mod selector;
pub mod uploader;

// Re-export main public API
pub use connector::{connect, DirectoryEntry, SourceConnector, SourceKind};
pub use pipeline::DeliveryPipeline;
pub use runner::TaskRunner;
pub use schedule::{Schedule, ScheduleUnit};
pub use selector::{select, DedupState, SelectionRule};
pub use uploader::Uploader;
