//! Sticker converter backed by ffmpeg and a Lottie renderer.

use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::config::ConverterConfig;
use super::error::ConverterError;
use super::image_ops;
use super::process::run_tool;
use super::tgs::decode_tgs;
use super::traits::Converter;
use super::types::{ConversionJob, ConversionResult};
use crate::transport::SourceFormat;

/// Palette filter chain that keeps a transparent slot in the GIF palette.
const TRANSPARENT_PALETTE_FILTER: &str =
    "split[s0][s1];[s0]palettegen=reserve_transparent=1[p];[s1][p]paletteuse";

/// Converts WebP stickers to PNG, and WebM/MP4/TGS stickers to GIF.
pub struct StickerConverter {
    config: ConverterConfig,
}

impl StickerConverter {
    /// Creates a new converter with the given configuration.
    pub fn new(config: ConverterConfig) -> Self {
        Self { config }
    }

    /// Creates a new converter with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(ConverterConfig::default())
    }

    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    fn fps_filter(&self) -> String {
        format!("fps=fps='min(source_fps,{})'", self.config.max_fps)
    }

    /// Builds the ffmpeg argument list for a raster/video input.
    fn build_ffmpeg_args(&self, job: &ConversionJob, keep_alpha: bool) -> Vec<String> {
        let mut args = vec![
            "-y".to_string(),
            "-loglevel".to_string(),
            self.config.ffmpeg_log_level.clone(),
        ];

        if job.input_format == SourceFormat::Webm {
            args.push("-vcodec".to_string());
            args.push("libvpx-vp9".to_string());
        }

        args.push("-i".to_string());
        args.push(job.input_path.to_string_lossy().into_owned());

        let filter = if keep_alpha {
            format!("{},{}", self.fps_filter(), TRANSPARENT_PALETTE_FILTER)
        } else {
            self.fps_filter()
        };
        args.push("-vf".to_string());
        args.push(filter);

        args.push(job.output_path.to_string_lossy().into_owned());
        args
    }

    /// Decides whether a WebM sticker carries transparency by extracting its
    /// first frame. Any failure along the way assumes transparency.
    async fn detect_webm_alpha(&self, input: &Path, cancel: &CancellationToken) -> bool {
        let probe_path = with_suffix(input, "_alpha_check.png");
        let args = vec![
            "-y".to_string(),
            "-loglevel".to_string(),
            self.config.ffmpeg_log_level.clone(),
            "-vcodec".to_string(),
            "libvpx-vp9".to_string(),
            "-i".to_string(),
            input.to_string_lossy().into_owned(),
            "-frames:v".to_string(),
            "1".to_string(),
            probe_path.to_string_lossy().into_owned(),
        ];

        let has_alpha = match run_tool(
            "ffmpeg",
            &self.config.ffmpeg_path,
            &args,
            self.config.timeout_secs,
            cancel,
        )
        .await
        {
            Ok(()) => {
                let frame = probe_path.clone();
                match tokio::task::spawn_blocking(move || image_ops::has_transparency(&frame))
                    .await
                {
                    Ok(Ok(has_alpha)) => has_alpha,
                    Ok(Err(e)) => {
                        debug!(error = %e, "Alpha probe unreadable, assuming transparency");
                        true
                    }
                    Err(e) => {
                        debug!(error = %e, "Alpha probe task failed, assuming transparency");
                        true
                    }
                }
            }
            Err(e) => {
                debug!(error = %e, "Frame extraction failed, assuming transparency");
                true
            }
        };

        let _ = tokio::fs::remove_file(&probe_path).await;
        has_alpha
    }

    async fn convert_raster(
        &self,
        job: &ConversionJob,
        cancel: &CancellationToken,
    ) -> Result<(), ConverterError> {
        let keep_alpha = job.input_format == SourceFormat::Webm
            && self.detect_webm_alpha(&job.input_path, cancel).await;
        let args = self.build_ffmpeg_args(job, keep_alpha);

        run_tool(
            "ffmpeg",
            &self.config.ffmpeg_path,
            &args,
            self.config.timeout_secs,
            cancel,
        )
        .await?;

        if job.input_format == SourceFormat::Webp {
            let output = job.output_path.clone();
            match tokio::task::spawn_blocking(move || image_ops::trim_transparent_edges(&output))
                .await
            {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => warn!(job_id = %job.job_id, error = %e, "Failed to trim transparent edges"),
                Err(e) => warn!(job_id = %job.job_id, error = %e, "Edge trimming task failed"),
            }
        }
        Ok(())
    }

    /// Decodes a TGS sticker to Lottie JSON and renders it to GIF.
    ///
    /// Returns the preserved JSON path when one was requested and written.
    async fn convert_tgs(
        &self,
        job: &ConversionJob,
        cancel: &CancellationToken,
    ) -> Result<Option<PathBuf>, ConverterError> {
        if !self.config.support_tgs {
            return Err(ConverterError::TgsDisabled);
        }

        let json_path = with_suffix(&job.input_path, ".json");
        let (input, json) = (job.input_path.clone(), json_path.clone());
        tokio::task::spawn_blocking(move || decode_tgs(&input, &json))
            .await
            .map_err(|e| ConverterError::tgs_decode(e.to_string()))??;

        let mut preserved = None;
        if let Some(keep) = &job.preserve_intermediate {
            match tokio::fs::copy(&json_path, keep).await {
                Ok(_) => preserved = Some(keep.clone()),
                Err(e) => warn!(job_id = %job.job_id, error = %e, "Failed to preserve Lottie JSON"),
            }
        }

        let args = vec![
            json_path.to_string_lossy().into_owned(),
            self.config.lottie_size.clone(),
        ];
        let rendered = run_tool(
            "lottie2gif",
            &self.config.lottie_path,
            &args,
            self.config.timeout_secs,
            cancel,
        )
        .await;

        let gif_path = with_suffix(&json_path, ".gif");
        let result = match rendered {
            Ok(()) => tokio::fs::rename(&gif_path, &job.output_path)
                .await
                .map_err(ConverterError::from),
            Err(e) => {
                let _ = tokio::fs::remove_file(&gif_path).await;
                Err(e)
            }
        };

        if let Err(e) = tokio::fs::remove_file(&json_path).await {
            warn!(path = %json_path.display(), error = %e, "Failed to remove decoded JSON");
        }

        result.map(|()| preserved)
    }
}

/// Appends `suffix` to the full path, e.g. `a.tgs` + `.json` = `a.tgs.json`.
fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut raw: OsString = path.as_os_str().to_owned();
    raw.push(suffix);
    PathBuf::from(raw)
}

#[async_trait]
impl Converter for StickerConverter {
    fn name(&self) -> &str {
        "sticker"
    }

    async fn convert(
        &self,
        job: ConversionJob,
        cancel: CancellationToken,
    ) -> Result<ConversionResult, ConverterError> {
        let start = Instant::now();

        if !tokio::fs::try_exists(&job.input_path).await.unwrap_or(false) {
            return Err(ConverterError::InputNotFound {
                path: job.input_path.clone(),
            });
        }

        let intermediate_path = if job.input_format.is_compressed_vector() {
            self.convert_tgs(&job, &cancel).await?
        } else {
            self.convert_raster(&job, &cancel).await?;
            None
        };

        let output_size_bytes = tokio::fs::metadata(&job.output_path).await?.len();
        let duration_ms = start.elapsed().as_millis() as u64;

        info!(
            job_id = %job.job_id,
            format = %job.input_format,
            output_size_bytes,
            duration_ms,
            "Conversion complete"
        );

        Ok(ConversionResult {
            job_id: job.job_id,
            output_path: job.output_path,
            output_size_bytes,
            duration_ms,
            intermediate_path,
        })
    }

    async fn validate(&self) -> Result<(), ConverterError> {
        let ffmpeg = Command::new(&self.config.ffmpeg_path)
            .arg("-version")
            .output()
            .await;
        if let Err(e) = ffmpeg {
            if e.kind() == std::io::ErrorKind::NotFound {
                return Err(ConverterError::ToolNotFound {
                    tool: "ffmpeg".to_string(),
                    path: self.config.ffmpeg_path.clone(),
                });
            }
            return Err(ConverterError::Io(e));
        }

        if self.config.support_tgs && which(&self.config.lottie_path).is_none() {
            return Err(ConverterError::ToolNotFound {
                tool: "lottie2gif".to_string(),
                path: self.config.lottie_path.clone(),
            });
        }

        Ok(())
    }

    fn supports(&self, format: &SourceFormat) -> bool {
        match format {
            SourceFormat::Tgs => self.config.support_tgs,
            _ => true,
        }
    }
}

/// Resolves a program the way the shell would, without running it.
fn which(program: &Path) -> Option<PathBuf> {
    if program.components().count() > 1 {
        return program.is_file().then(|| program.to_path_buf());
    }
    let paths = std::env::var_os("PATH")?;
    std::env::split_paths(&paths)
        .map(|dir| dir.join(program))
        .find(|candidate| candidate.is_file())
}
