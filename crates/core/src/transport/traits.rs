//! Trait definitions for the transport module.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use super::error::TransportError;
use super::types::WorkItem;

/// The external system a run reads items from and delivers archives to.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Returns the name of this transport implementation.
    fn name(&self) -> &str;

    /// Lists every item of a collection, in delivery order.
    async fn list_items(&self, source: &str) -> Result<Vec<WorkItem>, TransportError>;

    /// Fetches the raw bytes of an item into a local file the caller owns.
    async fn fetch_raw(&self, item: &WorkItem) -> Result<PathBuf, TransportError>;

    /// Delivers a finished archive. The archive file stays owned by the caller.
    async fn send_archive(&self, archive: &Path) -> Result<(), TransportError>;

    /// Replaces the human-readable status line for the current run.
    async fn update_status(&self, text: &str) -> Result<(), TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::SourceFormat;
    use std::sync::Mutex;

    struct EchoTransport {
        statuses: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Transport for EchoTransport {
        fn name(&self) -> &str {
            "echo"
        }

        async fn list_items(&self, source: &str) -> Result<Vec<WorkItem>, TransportError> {
            Ok(vec![WorkItem::new(source, source, SourceFormat::Webp)])
        }

        async fn fetch_raw(&self, item: &WorkItem) -> Result<PathBuf, TransportError> {
            Ok(PathBuf::from(&item.fetch_ref))
        }

        async fn send_archive(&self, _archive: &Path) -> Result<(), TransportError> {
            Err(TransportError::send_failed("offline"))
        }

        async fn update_status(&self, text: &str) -> Result<(), TransportError> {
            self.statuses.lock().unwrap().push(text.to_string());
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_transport_is_object_safe() {
        let transport: Box<dyn Transport> = Box::new(EchoTransport {
            statuses: Mutex::new(Vec::new()),
        });

        assert_eq!(transport.name(), "echo");
        let items = transport.list_items("cats").await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].content_id, "cats");

        transport.update_status("hello").await.unwrap();
        let err = transport.send_archive(Path::new("x.zip")).await.unwrap_err();
        assert!(matches!(err, TransportError::SendFailed { .. }));
    }
}
