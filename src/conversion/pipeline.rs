//! Download -> convert -> deliver for a single [`ConversionRequest`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use reqwest::Url;
use tempfile::TempPath;
use tokio::io::AsyncWriteExt;

use super::{ConversionError, ConversionRequest, ConversionResult, Converter, DeliveredAsset};
use crate::core::config;
use crate::telegram::ChatOutbox;

/// Runs one conversion end to end.
///
/// The input and output files live in `temp_dir` as scoped [`TempPath`]s,
/// so both are removed whichever step returns.
pub struct ConversionPipeline {
    outbox: Arc<dyn ChatOutbox>,
    converter: Arc<dyn Converter>,
    http: reqwest::Client,
    temp_dir: PathBuf,
}

impl ConversionPipeline {
    pub fn new(
        outbox: Arc<dyn ChatOutbox>,
        converter: Arc<dyn Converter>,
        http: reqwest::Client,
        temp_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            outbox,
            converter,
            http,
            temp_dir: temp_dir.into(),
        }
    }

    /// Pipeline with an HTTP client using the configured network timeout.
    pub fn with_defaults(
        outbox: Arc<dyn ChatOutbox>,
        converter: Arc<dyn Converter>,
        temp_dir: impl Into<PathBuf>,
    ) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(config::network::timeout())
            .build()?;
        Ok(Self::new(outbox, converter, http, temp_dir))
    }

    pub async fn convert(&self, request: &ConversionRequest) -> ConversionResult<DeliveredAsset> {
        let extension = request.target.extension();

        let url = self
            .outbox
            .resolve_download_url(&request.asset)
            .await
            .map_err(|e| ConversionError::AssetResolutionFailed(e.to_string()))?;

        let input = self
            .scoped_temp_path("input-", ".jpg")
            .await
            .map_err(|e| ConversionError::DownloadFailed(format!("cannot create input file: {}", e)))?;
        self.download(&url, &input).await?;

        let output = self
            .scoped_temp_path("output-", &format!(".{}", extension))
            .await
            .map_err(|e| ConversionError::ConversionProcessFailed(format!("cannot create output file: {}", e)))?;
        self.converter.convert(&input, &output, request.target).await?;

        let bytes = fs_err::tokio::read(&*output)
            .await
            .map_err(|e| ConversionError::OutputReadFailed(e.to_string()))?;
        if bytes.is_empty() {
            return Err(ConversionError::OutputReadFailed(format!(
                "{} is empty",
                output.display()
            )));
        }

        let delivered = DeliveredAsset {
            file_name: request.target.output_file_name(),
            size_bytes: bytes.len(),
        };
        self.outbox
            .send_document(request.chat_id, &delivered.file_name, bytes)
            .await
            .map_err(|e| ConversionError::DeliveryFailed(e.to_string()))?;

        Ok(delivered)
    }

    /// Creates an empty file in the temp dir and hands back its drop guard.
    async fn scoped_temp_path(&self, prefix: &str, suffix: &str) -> std::io::Result<TempPath> {
        fs_err::tokio::create_dir_all(&self.temp_dir).await?;
        let file = tempfile::Builder::new()
            .prefix(prefix)
            .suffix(suffix)
            .tempfile_in(&self.temp_dir)?;
        Ok(file.into_temp_path())
    }

    /// Streams `url` into `destination` chunk by chunk.
    async fn download(&self, url: &Url, destination: &Path) -> ConversionResult<()> {
        let mut resp = self.http.get(url.clone()).send().await.map_err(download_failed)?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ConversionError::DownloadFailed(format!("server answered {}", status)));
        }

        let mut dst = fs_err::tokio::File::create(destination)
            .await
            .map_err(download_failed)?;
        let mut written = 0usize;
        while let Some(chunk) = resp.chunk().await.map_err(download_failed)? {
            dst.write_all(&chunk).await.map_err(download_failed)?;
            written += chunk.len();
        }
        dst.flush().await.map_err(download_failed)?;

        log::info!("Downloaded {} bytes to {}", written, destination.display());
        Ok(())
    }
}

fn download_failed(e: impl std::fmt::Display) -> ConversionError {
    ConversionError::DownloadFailed(e.to_string())
}
