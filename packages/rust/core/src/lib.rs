//! Pipeline stages and orchestration for LeadPipe.
//!
//! Each stage reads the prospects in its input status from the store, calls
//! its provider per record, and writes the result back. A failure on one
//! record is logged, stored in `last_error`, and counted; it never aborts the
//! stage.

pub mod enrich;
pub mod export;
pub mod filter;
pub mod personalize;
pub mod pipeline;
pub mod scrape;

#[cfg(test)]
mod testing;

pub use enrich::{EnrichReport, run_enrichment};
pub use export::{ExportOptions, ExportReport, ready_for_export, run_export};
pub use filter::{CandidateFilter, Rejection};
pub use personalize::{PersonalizeReport, run_personalization};
pub use pipeline::{IngestReport, ProgressReporter, RecordFailure, SilentProgress, run_ingest};
pub use scrape::{ScrapeConfig, ScrapeReport, ScrapeServices, run_scrape};
