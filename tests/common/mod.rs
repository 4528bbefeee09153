//! Common test utilities
//!
//! Fakes for the chat platform and the conversion process, plus a harness
//! wiring them to a real dispatcher, runner and SQLite user directory.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use photoconv::conversion::{
    AssetRef, ConversionError, ConversionPipeline, ConversionResult, ConversionRunner, ConversionSessions, Converter,
    ImageFormat,
};
use photoconv::core::error::{AppError, AppResult};
use photoconv::storage::{create_pool, SqliteUserDirectory, UserDirectory};
use photoconv::telegram::{ChatDispatcher, ChatOutbox, Keyboard};
use reqwest::Url;
use teloxide::types::{CallbackQueryId, ChatId};
use tempfile::TempDir;
use wiremock::matchers::{method, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Bytes served for every downloadable asset
pub const PHOTO_BYTES: &[u8] = b"\xFF\xD8\xFF\xE0fake-jpeg-payload";

/// Assets with this prefix answer 404 on download
pub const BROKEN_ASSET_PREFIX: &str = "BROKEN";

/// Everything the outbox was asked to send
#[derive(Debug, Clone, PartialEq)]
pub enum Sent {
    Text {
        chat_id: ChatId,
        text: String,
        keyboard: Option<Keyboard>,
    },
    Document {
        chat_id: ChatId,
        file_name: String,
        bytes: Vec<u8>,
    },
    CallbackAnswer {
        callback_id: String,
        text: String,
    },
}

/// [`ChatOutbox`] that records calls and resolves assets to a mock server.
pub struct RecordingOutbox {
    download_base: Url,
    sent: Mutex<Vec<Sent>>,
    resolved: Mutex<Vec<AssetRef>>,
    fail_resolve: AtomicBool,
    fail_delivery: AtomicBool,
}

impl RecordingOutbox {
    pub fn new(download_base: Url) -> Self {
        Self {
            download_base,
            sent: Mutex::new(Vec::new()),
            resolved: Mutex::new(Vec::new()),
            fail_resolve: AtomicBool::new(false),
            fail_delivery: AtomicBool::new(false),
        }
    }

    pub fn fail_resolve(&self) {
        self.fail_resolve.store(true, Ordering::SeqCst);
    }

    pub fn fail_delivery(&self) {
        self.fail_delivery.store(true, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn resolved(&self) -> Vec<AssetRef> {
        self.resolved.lock().unwrap().clone()
    }

    /// Plain texts sent to `chat_id`, in order
    pub fn texts(&self, chat_id: ChatId) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Text { chat_id: c, text, .. } if c == chat_id => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn last_text(&self, chat_id: ChatId) -> Option<String> {
        self.texts(chat_id).pop()
    }

    pub fn documents(&self, chat_id: ChatId) -> Vec<(String, Vec<u8>)> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Document {
                    chat_id: c,
                    file_name,
                    bytes,
                } if c == chat_id => Some((file_name, bytes)),
                _ => None,
            })
            .collect()
    }

    pub fn callback_answers(&self) -> Vec<(String, String)> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::CallbackAnswer { callback_id, text } => Some((callback_id, text)),
                _ => None,
            })
            .collect()
    }

    fn record(&self, sent: Sent) {
        self.sent.lock().unwrap().push(sent);
    }
}

#[async_trait]
impl ChatOutbox for RecordingOutbox {
    async fn send_text(&self, chat_id: ChatId, text: &str, keyboard: Option<Keyboard>) -> AppResult<()> {
        self.record(Sent::Text {
            chat_id,
            text: text.to_string(),
            keyboard,
        });
        Ok(())
    }

    async fn send_document(&self, chat_id: ChatId, file_name: &str, bytes: Vec<u8>) -> AppResult<()> {
        if self.fail_delivery.load(Ordering::SeqCst) {
            return Err(AppError::Anyhow(anyhow::anyhow!("Bad Request: chat not found")));
        }
        self.record(Sent::Document {
            chat_id,
            file_name: file_name.to_string(),
            bytes,
        });
        Ok(())
    }

    async fn answer_callback(&self, callback_id: &CallbackQueryId, text: &str) -> AppResult<()> {
        self.record(Sent::CallbackAnswer {
            callback_id: callback_id.0.clone(),
            text: text.to_string(),
        });
        Ok(())
    }

    async fn resolve_download_url(&self, asset: &AssetRef) -> AppResult<Url> {
        self.resolved.lock().unwrap().push(asset.clone());
        if self.fail_resolve.load(Ordering::SeqCst) {
            return Err(AppError::Anyhow(anyhow::anyhow!("Bad Request: invalid file_id")));
        }
        Ok(self.download_base.join(&format!("files/{}", asset))?)
    }
}

/// How [`FakeConverter`] behaves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConverterMode {
    /// Copies the input bytes to the output path
    Copy,
    /// Fails like a non-zero ffmpeg exit
    Fail,
    /// Exits successfully without writing anything
    Empty,
}

/// A single recorded converter invocation
#[derive(Debug, Clone, PartialEq)]
pub struct ConverterCall {
    pub input: PathBuf,
    pub output: PathBuf,
    pub target: ImageFormat,
    pub input_bytes: Vec<u8>,
}

pub struct FakeConverter {
    mode: ConverterMode,
    calls: Mutex<Vec<ConverterCall>>,
}

impl FakeConverter {
    pub fn new(mode: ConverterMode) -> Self {
        Self {
            mode,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<ConverterCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Converter for FakeConverter {
    async fn convert(&self, input: &Path, output: &Path, target: ImageFormat) -> ConversionResult<()> {
        let input_bytes = tokio::fs::read(input)
            .await
            .map_err(|e| ConversionError::ConversionProcessFailed(e.to_string()))?;
        self.calls.lock().unwrap().push(ConverterCall {
            input: input.to_path_buf(),
            output: output.to_path_buf(),
            target,
            input_bytes: input_bytes.clone(),
        });

        match self.mode {
            ConverterMode::Copy => tokio::fs::write(output, input_bytes)
                .await
                .map_err(|e| ConversionError::ConversionProcessFailed(e.to_string())),
            ConverterMode::Fail => Err(ConversionError::ConversionProcessFailed(
                "ffmpeg exited with exit status: 1".to_string(),
            )),
            ConverterMode::Empty => Ok(()),
        }
    }
}

/// Dispatcher wired to fakes, a mock download server and a scratch database.
pub struct Harness {
    pub server: MockServer,
    pub outbox: Arc<RecordingOutbox>,
    pub converter: Arc<FakeConverter>,
    pub users: Arc<SqliteUserDirectory>,
    pub runner: Arc<ConversionRunner>,
    pub dispatcher: ChatDispatcher,
    pub temp_dir: TempDir,
    _db_dir: TempDir,
}

impl Harness {
    pub async fn new(mode: ConverterMode) -> Self {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path_regex(format!("^/files/{}.*$", BROKEN_ASSET_PREFIX)))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path_regex("^/files/A.*$"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(PHOTO_BYTES.to_vec()))
            .mount(&server)
            .await;

        let download_base = Url::parse(&format!("{}/", server.uri())).unwrap();
        let outbox = Arc::new(RecordingOutbox::new(download_base));
        let converter = Arc::new(FakeConverter::new(mode));

        let db_dir = tempfile::tempdir().unwrap();
        let db_path = db_dir.path().join("test.db");
        let pool = create_pool(db_path.to_str().unwrap()).unwrap();
        let users = Arc::new(SqliteUserDirectory::new(pool));

        let temp_dir = tempfile::tempdir().unwrap();
        let pipeline = ConversionPipeline::new(
            outbox.clone() as Arc<dyn ChatOutbox>,
            converter.clone() as Arc<dyn Converter>,
            reqwest::Client::new(),
            temp_dir.path().join("conversions"),
        );
        let runner = Arc::new(
            ConversionRunner::new(Arc::new(pipeline), outbox.clone() as Arc<dyn ChatOutbox>)
                .with_user_directory(users.clone() as Arc<dyn UserDirectory>),
        );
        let dispatcher = ChatDispatcher::new(
            Arc::new(ConversionSessions::new()),
            Arc::clone(&runner),
            outbox.clone() as Arc<dyn ChatOutbox>,
            users.clone() as Arc<dyn UserDirectory>,
        );

        Self {
            server,
            outbox,
            converter,
            users,
            runner,
            dispatcher,
            temp_dir,
            _db_dir: db_dir,
        }
    }

    /// Waits for every spawned conversion to finish.
    pub async fn settle(&self) {
        self.runner.drain().await;
    }

    /// Files left behind in the conversion scratch directory
    pub fn leftover_files(&self) -> Vec<PathBuf> {
        match std::fs::read_dir(self.temp_dir.path().join("conversions")) {
            Ok(entries) => entries.map(|e| e.unwrap().path()).collect(),
            Err(_) => Vec::new(),
        }
    }
}

pub fn callback_id(id: &str) -> CallbackQueryId {
    CallbackQueryId(id.to_string())
}
