//! Process execution utilities with timeout support
//!
//! Provides a helper for running external processes (ffmpeg) with a
//! configurable timeout so a hung process cannot pin a conversion task
//! forever.

use std::process::Output;
use std::time::Duration;
use tokio::process::Command;

use crate::conversion::ConversionError;

/// Run an async Command with a timeout.
///
/// The child is killed when the timeout elapses (`kill_on_drop`).
/// Launch failures and timeouts both surface as `ConversionProcessFailed`;
/// a non-zero exit status is left for the caller to inspect.
pub async fn run_with_timeout(cmd: &mut Command, timeout: Duration) -> Result<Output, ConversionError> {
    cmd.kill_on_drop(true);
    match tokio::time::timeout(timeout, cmd.output()).await {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(e)) => Err(ConversionError::ConversionProcessFailed(format!(
            "failed to launch process: {}",
            e
        ))),
        Err(_) => Err(ConversionError::ConversionProcessFailed(format!(
            "process timed out after {}s",
            timeout.as_secs()
        ))),
    }
}
