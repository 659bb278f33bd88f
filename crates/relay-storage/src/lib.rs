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

//! Object storage collaborators used by relay transfer workflows.
//!
//! Layout: `provider.rs` (the bulk copy / list capabilities and the
//! lower-level `ObjectStore` seam), `transfer.rs` (capabilities implemented
//! over any pair of stores), `memory.rs` and `local.rs` (store backends),
//! `model.rs` (request/response types).

pub mod error;
pub mod local;
pub mod memory;
pub mod model;
pub mod provider;
pub mod transfer;

pub use error::{StorageError, StorageResult};
pub use local::LocalStore;
pub use memory::MemoryStore;
pub use model::{ConnectionRef, CopyReport, CopyRequest, ListRequest, ObjectLocation};
pub use provider::{BulkCopy, ListObjects, ObjectStore};
pub use transfer::{StoreLister, StoreTransfer};
