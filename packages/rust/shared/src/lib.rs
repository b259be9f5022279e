//! Shared types, error model, and configuration for LeadPipe.
//!
//! This crate is the foundation depended on by all other LeadPipe crates.
//! It provides:
//! - [`LeadPipeError`]: the unified error type
//! - Domain types ([`Prospect`], [`ProspectStatus`], [`ProspectPatch`], [`ProspectId`])
//! - Configuration ([`AppConfig`], config loading, credential lookup)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, CampaignConfig, ContactsConfig, CopyMode, DefaultsConfig, FiltersConfig,
    JobSearchConfig, JobSearchProvider, LlmConfig, StoreConfig, config_dir, config_file_path,
    init_config, init_config_at, load_config, load_config_from, require_env,
};
pub use error::{LeadPipeError, Result};
pub use types::{
    CompanyType, EmailSequence, Prospect, ProspectCandidate, ProspectId, ProspectPatch,
    ProspectStatus, employee_lower_bound, normalize_domain,
};
