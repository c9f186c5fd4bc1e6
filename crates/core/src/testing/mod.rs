//! Testing utilities and mock implementations.
//!
//! This module provides mock implementations of every collaborator trait a
//! run depends on, so whole runs can be exercised without ffmpeg, a
//! database or a real transport.
//!
//! # Example
//!
//! ```rust,ignore
//! use packforge_core::testing::{fixtures, MockContentCache, MockConverter, MockTransport, RecordingMetrics};
//!
//! let transport = MockTransport::new();
//! transport.set_items(fixtures::work_items(10, SourceFormat::Webm)).await;
//!
//! let converter = MockConverter::new();
//! converter.set_output_size(6 * 1024).await;
//!
//! // Hand them to a RunSupervisor...
//! ```

mod mock_cache;
mod mock_converter;
mod mock_transport;
mod recording_metrics;

pub use mock_cache::MockContentCache;
pub use mock_converter::{MockConverter, RecordedConversion};
pub use mock_transport::{MockTransport, SentArchive};
pub use recording_metrics::RecordingMetrics;

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::transport::{SourceFormat, WorkItem};

    /// A work item whose fetch reference doubles as its raw payload.
    pub fn work_item(content_id: &str, format: SourceFormat) -> WorkItem {
        WorkItem::new(content_id, format!("raw-{}", content_id), format)
    }

    /// `count` items named `item-0`, `item-1`, ...
    pub fn work_items(count: usize, format: SourceFormat) -> Vec<WorkItem> {
        (0..count)
            .map(|i| work_item(&format!("item-{}", i), format.clone()))
            .collect()
    }
}
