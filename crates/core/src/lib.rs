//! Mediascribe Core Library
//!
//! Batch pipeline for turning media sources into optimized text: acquire
//! audio, transcribe with Whisper, normalize the script and run dependent
//! prompt-driven optimization passes, with per-job failure isolation and a
//! consolidated batch report.

pub mod backends;
pub mod batch;
pub mod catalog;
pub mod chain;
pub mod config;
pub mod error;
pub mod format;
pub mod job;
pub mod pipeline;
pub mod report;
pub mod retry;
pub mod store;
pub mod types;

// Re-export commonly used items at crate root
pub use backends::Backends;
pub use batch::BatchOrchestrator;
pub use catalog::{Catalog, PromptTemplate};
pub use chain::{ExecutionPlan, PassInput, PlannedPass};
pub use config::{AudioQuality, Config};
pub use error::{Result, ScribeError};
pub use job::{Job, Stage};
pub use pipeline::ItemPipeline;
pub use report::BatchReport;
pub use store::{ArtifactKind, ArtifactStore, FsStore};
pub use types::{
    AudioAsset, ModelProfile, SearchOrder, Segment, SourceDescriptor, Transcript,
};
