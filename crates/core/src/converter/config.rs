//! Configuration for the converter module.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for the ffmpeg/lottie sticker converter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConverterConfig {
    /// Path to ffmpeg binary.
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: PathBuf,

    /// Path to the Lottie renderer (`lottie2gif`).
    #[serde(default = "default_lottie_path")]
    pub lottie_path: PathBuf,

    /// Whether TGS (compressed Lottie) inputs are accepted.
    #[serde(default = "default_support_tgs")]
    pub support_tgs: bool,

    /// Upper bound on the frame rate of generated GIFs.
    #[serde(default = "default_max_fps")]
    pub max_fps: u32,

    /// Canvas size handed to the Lottie renderer, e.g. `512x512`.
    #[serde(default = "default_lottie_size")]
    pub lottie_size: String,

    /// Timeout for a single external process in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// FFmpeg log level (quiet, panic, fatal, error, warning, info, verbose, debug, trace).
    #[serde(default = "default_log_level")]
    pub ffmpeg_log_level: String,
}

fn default_ffmpeg_path() -> PathBuf {
    PathBuf::from("ffmpeg")
}

fn default_lottie_path() -> PathBuf {
    PathBuf::from("lottie2gif")
}

fn default_support_tgs() -> bool {
    true
}

fn default_max_fps() -> u32 {
    40
}

fn default_lottie_size() -> String {
    "512x512".to_string()
}

fn default_timeout() -> u64 {
    120
}

fn default_log_level() -> String {
    "error".to_string()
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: default_ffmpeg_path(),
            lottie_path: default_lottie_path(),
            support_tgs: default_support_tgs(),
            max_fps: default_max_fps(),
            lottie_size: default_lottie_size(),
            timeout_secs: default_timeout(),
            ffmpeg_log_level: default_log_level(),
        }
    }
}

impl ConverterConfig {
    /// Creates a new config with a custom ffmpeg path.
    pub fn with_ffmpeg_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.ffmpeg_path = path.into();
        self
    }

    pub fn with_lottie_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.lottie_path = path.into();
        self
    }

    pub fn with_support_tgs(mut self, enabled: bool) -> Self {
        self.support_tgs = enabled;
        self
    }

    pub fn with_max_fps(mut self, fps: u32) -> Self {
        self.max_fps = fps;
        self
    }

    /// Creates a new config with a custom timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}
