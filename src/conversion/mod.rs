//! Photo conversion engine.
//!
//! A chat sends a photo, picks a target format from inline buttons, and gets
//! the converted file back as a document:
//! - `session`: one pending photo per chat
//! - `pipeline`: resolve -> download -> convert -> read back -> deliver
//! - `runner`: tracked background execution of pipeline runs
//! - `image`: the ffmpeg-backed [`Converter`]

pub mod image;
pub mod pipeline;
pub mod runner;
pub mod session;

use std::fmt;
use std::path::Path;

use async_trait::async_trait;
use strum::{Display, EnumIter, IntoEnumIterator};
use teloxide::types::ChatId;
use thiserror::Error;

pub use image::FfmpegConverter;
pub use pipeline::ConversionPipeline;
pub use runner::ConversionRunner;
pub use session::{BeginOutcome, ChatState, ConversionSessions, RejectReason};

/// Prefix of the inline-button payloads that select a target format
pub const CALLBACK_PREFIX: &str = "convert_";

/// Errors that can occur while running a conversion.
///
/// Each variant names the pipeline step that failed; all of them are
/// recoverable at the chat level.
#[derive(Error, Debug)]
pub enum ConversionError {
    #[error("Asset resolution failed: {0}")]
    AssetResolutionFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Conversion process failed: {0}")]
    ConversionProcessFailed(String),

    #[error("Output read failed: {0}")]
    OutputReadFailed(String),

    #[error("Delivery failed: {0}")]
    DeliveryFailed(String),
}

impl ConversionError {
    /// Notice sent to the chat when this step fails.
    pub fn user_message(&self) -> &'static str {
        match self {
            ConversionError::AssetResolutionFailed(_) => "Failed to fetch file",
            ConversionError::DownloadFailed(_) => "Download failed",
            ConversionError::ConversionProcessFailed(_) => "Conversion failed",
            ConversionError::OutputReadFailed(_) => "Failed to read converted file",
            ConversionError::DeliveryFailed(_) => "Failed to send converted file",
        }
    }
}

pub type ConversionResult<T> = Result<T, ConversionError>;

/// Supported output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum ImageFormat {
    #[strum(to_string = "png")]
    Png,
    #[strum(to_string = "jpg")]
    Jpeg,
    #[strum(to_string = "webp")]
    WebP,
}

impl ImageFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpg",
            ImageFormat::WebP => "webp",
        }
    }

    /// Inline-button payload for this format, e.g. `convert_png`
    pub fn callback_data(&self) -> String {
        format!("{}{}", CALLBACK_PREFIX, self.extension())
    }

    /// Exact inverse of [`ImageFormat::callback_data`]; anything else is unknown.
    pub fn from_callback_data(data: &str) -> Option<Self> {
        ImageFormat::iter().find(|format| format.callback_data() == data)
    }

    /// Name of the document sent back to the chat
    pub fn output_file_name(&self) -> String {
        format!("converted.{}", self.extension())
    }
}

/// Opaque platform reference to an uploaded photo (Telegram `file_id`)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AssetRef(pub String);

impl AssetRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A format decision for a pending photo, consumed by the pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionRequest {
    pub asset: AssetRef,
    pub target: ImageFormat,
    pub chat_id: ChatId,
}

/// What was sent back to the chat
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveredAsset {
    pub file_name: String,
    pub size_bytes: usize,
}

/// The external conversion process.
///
/// Takes an existing input file and writes `output`, whose extension
/// already encodes `target`.
#[async_trait]
pub trait Converter: Send + Sync {
    async fn convert(&self, input: &Path, output: &Path, target: ImageFormat) -> ConversionResult<()>;
}

/// Check if ffmpeg is available
pub async fn check_ffmpeg(binary: &str) -> bool {
    tokio::process::Command::new(binary)
        .arg("-version")
        .output()
        .await
        .map(|o| o.status.success())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_format_extension() {
        assert_eq!(ImageFormat::Jpeg.extension(), "jpg");
        assert_eq!(ImageFormat::Png.extension(), "png");
        assert_eq!(ImageFormat::WebP.extension(), "webp");
        assert_eq!(ImageFormat::WebP.to_string(), "webp");
    }

    #[test]
    fn test_callback_data_roundtrip_for_buttons() {
        for format in ImageFormat::iter() {
            assert_eq!(ImageFormat::from_callback_data(&format.callback_data()), Some(format));
        }
    }

    #[test]
    fn test_unknown_callback_data() {
        assert_eq!(ImageFormat::from_callback_data("convert_tiff"), None);
        assert_eq!(ImageFormat::from_callback_data("convert_jpeg"), None);
        assert_eq!(ImageFormat::from_callback_data("png"), None);
        assert_eq!(ImageFormat::from_callback_data(""), None);
    }

    #[test]
    fn test_button_order() {
        let order: Vec<ImageFormat> = ImageFormat::iter().collect();
        assert_eq!(order, vec![ImageFormat::Png, ImageFormat::Jpeg, ImageFormat::WebP]);
    }

    #[test]
    fn test_user_messages() {
        assert_eq!(
            ConversionError::DownloadFailed("x".into()).user_message(),
            "Download failed"
        );
        assert_eq!(
            ConversionError::ConversionProcessFailed("x".into()).user_message(),
            "Conversion failed"
        );
        assert_eq!(
            ConversionError::AssetResolutionFailed("x".into()).user_message(),
            "Failed to fetch file"
        );
    }

    #[tokio::test]
    async fn test_check_ffmpeg_missing_binary() {
        assert!(!check_ffmpeg("photoconv-no-such-ffmpeg").await);
    }
}
