//! ffmpeg-backed image format conversion

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use super::{ConversionError, ConversionResult, Converter, ImageFormat};
use crate::core::{config, process::run_with_timeout};

/// Runs `ffmpeg -i <input> <output>`, letting ffmpeg pick the encoder from
/// the output extension.
#[derive(Debug, Clone)]
pub struct FfmpegConverter {
    binary: String,
    timeout: Duration,
    quality: u8,
}

impl FfmpegConverter {
    pub fn new(binary: impl Into<String>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            timeout,
            quality: config::conversion::DEFAULT_QUALITY,
        }
    }

    /// Converter configured from `FFMPEG_BIN`, `CONVERSION_TIMEOUT_SECS` and `IMAGE_QUALITY`
    pub fn from_config() -> Self {
        Self::new(config::FFMPEG_BIN.as_str(), config::conversion::timeout())
            .with_quality(config::conversion::quality())
    }

    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = quality.clamp(1, 100);
        self
    }

    /// Builds the argument list for one conversion.
    fn args(&self, input: &Path, output: &Path, target: ImageFormat) -> Vec<String> {
        let mut args: Vec<String> = ["-hide_banner", "-loglevel", "error", "-y", "-i"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        args.push(input.display().to_string());

        match target {
            // FFmpeg uses a 2-31 qscale for mjpeg
            ImageFormat::Jpeg => {
                let qscale = ((100 - self.quality) / 3).max(2);
                args.push("-qscale:v".to_string());
                args.push(qscale.to_string());
            }
            ImageFormat::WebP => {
                args.push("-quality".to_string());
                args.push(self.quality.to_string());
            }
            ImageFormat::Png => {}
        }

        args.push(output.display().to_string());
        args
    }
}

#[async_trait]
impl Converter for FfmpegConverter {
    async fn convert(&self, input: &Path, output: &Path, target: ImageFormat) -> ConversionResult<()> {
        let mut cmd = Command::new(&self.binary);
        cmd.args(self.args(input, output, target));

        log::info!("Running {} for {} -> {}", self.binary, input.display(), output.display());
        let result = run_with_timeout(&mut cmd, self.timeout).await?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            log::error!("FFmpeg image conversion error: {}", stderr);
            return Err(ConversionError::ConversionProcessFailed(format!(
                "{} exited with {}: {}",
                self.binary,
                result.status,
                stderr.trim()
            )));
        }

        Ok(())
    }
}
