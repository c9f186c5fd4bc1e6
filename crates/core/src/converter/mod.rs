//! Converter module for turning raw stickers into shareable artifacts.
//!
//! This module provides the `Converter` trait and the ffmpeg/Lottie backed
//! [`StickerConverter`].
//!
//! # Formats
//!
//! - WebP: converted to PNG, transparent edges trimmed
//! - WebM: converted to GIF, keeping transparency when the first frame has any
//! - TGS: gunzipped to Lottie JSON and rendered to GIF by `lottie2gif`
//! - anything else: handed to ffmpeg with a frame rate cap
//!
//! # Example
//!
//! ```ignore
//! use packforge_core::converter::{Converter, ConversionJob, StickerConverter};
//! use packforge_core::transport::SourceFormat;
//! use tokio_util::sync::CancellationToken;
//!
//! let converter = StickerConverter::with_defaults();
//! converter.validate().await?;
//!
//! let job = ConversionJob::new("job-1", "/tmp/raw.webm", SourceFormat::Webm, "/tmp/out.gif");
//! let result = converter.convert(job, CancellationToken::new()).await?;
//! println!("Converted in {} ms", result.duration_ms);
//! ```

mod config;
mod error;
mod image_ops;
mod process;
mod sticker;
mod tgs;
mod traits;
mod types;

pub use config::ConverterConfig;
pub use error::ConverterError;
pub use sticker::StickerConverter;
pub use tgs::decode_tgs;
pub use traits::Converter;
pub use types::{ConversionJob, ConversionResult, OutputFormat};
