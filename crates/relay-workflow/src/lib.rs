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
#![allow(clippy::module_name_repetitions)]

//! Four-stage transfer workflow: echo the run configuration, validate it,
//! bulk copy the prefix, then list the destination.
//!
//! Layout: `service.rs` (the pipeline and step bookkeeping), `model.rs`
//! (run reports and step records), `retry.rs` (per-stage retry policy),
//! `error.rs` (the three-way failure taxonomy).

pub mod error;
pub mod model;
pub mod retry;
pub mod service;

pub use error::{FailureKind, WorkflowError, WorkflowResult};
pub use model::{RunFailure, RunReport, RunStatus, StageKind, StepRecord, StepStatus};
pub use retry::{RetryOutcome, RetryPolicy, Retryable, retry_with_policy};
pub use service::{TransferWorkflow, render_configuration};
