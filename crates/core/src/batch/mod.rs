//! Batching of converted artifacts.
//!
//! Workers register artifacts with a [`BatchAccumulator`]; when the next one
//! would push the pending batch to its byte limit, the registering worker
//! flushes it through the [`BatchPackager`], which zips and delivers it.

mod accumulator;
mod archive;
mod files;
mod packager;
mod types;

pub use accumulator::BatchAccumulator;
pub use files::purge_dir;
pub use packager::{BatchError, BatchPackager, PackagedBatch};
pub use types::{AccumulatorSnapshot, Batch, RegisterOutcome};
