#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! Run configuration parsing and workflow settings for relay transfers.
//!
//! Layout: `model.rs` (run configuration and validated parameters),
//! `validate.rs` (the single validation boundary), `settings.rs` (connection
//! references and stage retry budgets), `defaults.rs` (default values).

pub mod defaults;
pub mod error;
pub mod model;
pub mod settings;
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use model::{
    DESTINATION_BUCKET_KEY, REQUIRED_FIELDS, RunConfiguration, SOURCE_BUCKET_KEY,
    SOURCE_PREFIX_KEY, ValidatedParameters,
};
pub use settings::{StageRetries, WorkflowSettings};
pub use validate::validate_run_configuration;
