//! Transport module.
//!
//! A transport is the outside world of a run: it lists the items of a
//! collection, fetches their raw bytes, receives finished archives and
//! shows a human-readable status line while the run is in progress.

mod config;
mod directory;
mod error;
mod status;
mod traits;
mod types;

pub use config::DirectoryTransportConfig;
pub use directory::{validate_source_name, DirectoryTransport};
pub use error::TransportError;
pub use status::{StatusBoard, StatusEntry};
pub use traits::Transport;
pub use types::{SourceFormat, WorkItem};
