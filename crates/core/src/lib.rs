pub mod batch;
pub mod cache;
pub mod config;
pub mod converter;
pub mod metrics;
pub mod run;
pub mod testing;
pub mod transport;

pub use batch::{
    purge_dir, AccumulatorSnapshot, Batch, BatchAccumulator, BatchError, BatchPackager,
    PackagedBatch, RegisterOutcome,
};
pub use cache::{CacheError, CacheStats, ContentCache, NoopContentCache, SqliteContentCache};
pub use config::{
    load_config, load_config_from_str, validate_config, CacheConfig, Config, ConfigError,
    ServerConfig,
};
pub use converter::{
    decode_tgs, ConversionJob, ConversionResult, Converter, ConverterConfig, ConverterError,
    OutputFormat, StickerConverter,
};
pub use metrics::{MetricsSink, NoopMetrics, PrometheusMetrics};
pub use run::{
    ItemError, RunConfig, RunError, RunOutcome, RunRequest, RunState, RunStatus, RunSummary,
    RunSupervisor, RunTask,
};
pub use transport::{
    validate_source_name, DirectoryTransport, DirectoryTransportConfig, SourceFormat,
    StatusBoard, StatusEntry, Transport, TransportError, WorkItem,
};
