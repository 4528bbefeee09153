//! Tracked background execution of conversion pipelines.

use std::sync::Arc;

use teloxide::types::ChatId;
use tokio::task::JoinHandle;
use tokio_util::task::TaskTracker;

use super::{ConversionPipeline, ConversionRequest, ConversionResult, DeliveredAsset};
use crate::storage::UserDirectory;
use crate::telegram::ChatOutbox;

/// Spawns pipeline runs off the event-handling path.
///
/// Every run is registered with a [`TaskTracker`] so shutdown (and tests)
/// can wait for in-flight conversions to settle. Failures are reported to
/// the chat here; nothing propagates back to the dispatcher.
pub struct ConversionRunner {
    pipeline: Arc<ConversionPipeline>,
    outbox: Arc<dyn ChatOutbox>,
    users: Option<Arc<dyn UserDirectory>>,
    tracker: TaskTracker,
}

impl ConversionRunner {
    pub fn new(pipeline: Arc<ConversionPipeline>, outbox: Arc<dyn ChatOutbox>) -> Self {
        Self {
            pipeline,
            outbox,
            users: None,
            tracker: TaskTracker::new(),
        }
    }

    /// Counts delivered conversions against the user bound to the chat.
    pub fn with_user_directory(mut self, users: Arc<dyn UserDirectory>) -> Self {
        self.users = Some(users);
        self
    }

    pub fn spawn(&self, request: ConversionRequest) -> JoinHandle<ConversionResult<DeliveredAsset>> {
        let pipeline = Arc::clone(&self.pipeline);
        let outbox = Arc::clone(&self.outbox);
        let users = self.users.clone();

        self.tracker.spawn(async move {
            let chat_id = request.chat_id;
            log::info!(
                "Starting conversion of {} to {} for chat {}",
                request.asset,
                request.target,
                chat_id
            );

            let result = pipeline.convert(&request).await;
            match &result {
                Ok(delivered) => {
                    log::info!(
                        "Delivered {} ({} bytes) to chat {}",
                        delivered.file_name,
                        delivered.size_bytes,
                        chat_id
                    );
                    if let Some(users) = users {
                        record_conversion(users.as_ref(), chat_id);
                    }
                }
                Err(e) => {
                    log::error!("Conversion for chat {} failed: {}", chat_id, e);
                    if let Err(send_err) = outbox.send_text(chat_id, e.user_message(), None).await {
                        log::warn!("Failed to notify chat {} about failure: {}", chat_id, send_err);
                    }
                }
            }
            result
        })
    }

    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Waits for every conversion spawned so far; the runner keeps accepting
    /// new work afterwards.
    pub async fn drain(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }

    /// Waits for in-flight conversions without reopening.
    pub async fn shutdown(&self) {
        let pending = self.tracker.len();
        if pending > 0 {
            log::info!("Waiting for {} in-flight conversion(s)", pending);
        }
        self.tracker.close();
        self.tracker.wait().await;
    }
}

fn record_conversion(users: &dyn UserDirectory, chat_id: ChatId) {
    let result = match users.get_by_chat(chat_id.0) {
        Ok(Some(user)) => users.increment_converted_images(user.id, 1),
        Ok(None) => {
            log::debug!("No registered user for chat {}", chat_id);
            Ok(())
        }
        Err(e) => Err(e),
    };
    if let Err(e) = result {
        log::warn!("Failed to record conversion for chat {}: {}", chat_id, e);
    }
}
