//! Shared fixtures for the API client tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use pikselcat_api::PixelcutClient;
use pikselcat_core::{CreditsResponse, ManualClock};
use pikselcat_fetch::{FetchError, PixelcutTransport, SubmitRequest};
use pikselcat_store::ConfigStore;
use tempfile::TempDir;

/// What the mock answers to metered calls.
#[derive(Debug, Clone)]
pub enum Reply {
    Credits(i64),
    Status(u16),
    Network,
    Panic,
}

impl Reply {
    fn to_error(&self) -> Option<FetchError> {
        match self {
            Reply::Credits(_) | Reply::Panic => None,
            Reply::Status(401) => Some(FetchError::Unauthorized),
            Reply::Status(403) => Some(FetchError::Forbidden),
            Reply::Status(429) => Some(FetchError::RateLimited { retry_after: Some(30) }),
            Reply::Status(status) => Some(FetchError::Status {
                status: *status,
                message: "mock".to_string(),
            }),
            Reply::Network => Some(FetchError::Timeout(10)),
        }
    }
}

/// Transport double with call counters.
#[derive(Debug)]
pub struct MockTransport {
    pub reply: Mutex<Reply>,
    pub delay: Duration,
    pub credit_calls: AtomicUsize,
    pub submit_calls: AtomicUsize,
    pub download_calls: AtomicUsize,
}

impl MockTransport {
    pub fn new(reply: Reply) -> Self {
        Self {
            reply: Mutex::new(reply),
            delay: Duration::ZERO,
            credit_calls: AtomicUsize::new(0),
            submit_calls: AtomicUsize::new(0),
            download_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn set_reply(&self, reply: Reply) {
        *self.reply.lock().unwrap() = reply;
    }

    pub fn credit_calls(&self) -> usize {
        self.credit_calls.load(Ordering::SeqCst)
    }

    pub fn submit_calls(&self) -> usize {
        self.submit_calls.load(Ordering::SeqCst)
    }

    fn current(&self) -> Reply {
        self.reply.lock().unwrap().clone()
    }
}

#[async_trait]
impl PixelcutTransport for MockTransport {
    async fn fetch_credits(&self, _api_key: &str) -> Result<CreditsResponse, FetchError> {
        self.credit_calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let reply = self.current();
        if matches!(reply, Reply::Panic) {
            panic!("transport crashed");
        }
        match (reply.to_error(), reply) {
            (Some(e), _) => Err(e),
            (None, Reply::Credits(n)) => Ok(CreditsResponse {
                credits_remaining: Some(n),
                ..CreditsResponse::default()
            }),
            (None, _) => Err(FetchError::InvalidResponse("unexpected".to_string())),
        }
    }

    async fn submit_image(&self, _api_key: &str, request: SubmitRequest) -> Result<String, FetchError> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(e) = self.current().to_error() {
            return Err(e);
        }
        Ok(format!("https://results.example/{}", request.file_name))
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self.download_calls.fetch_add(1, Ordering::SeqCst);
        Ok(format!("result of {url}").into_bytes())
    }
}

/// A client over a mock transport with a manual clock and a temp config file.
pub struct Harness {
    pub client: PixelcutClient,
    pub transport: Arc<MockTransport>,
    pub store: ConfigStore,
    pub clock: ManualClock,
    pub dir: TempDir,
}

pub async fn harness(transport: MockTransport) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let clock = ManualClock::starting_now();
    let store = ConfigStore::new(dir.path().join("config.json"), Arc::new(clock.clone()));
    let transport = Arc::new(transport);
    let client = PixelcutClient::new(transport.clone(), store.clone());
    Harness {
        client,
        transport,
        store,
        clock,
        dir,
    }
}

impl Harness {
    /// `callsToday` as written to `config.json`.
    pub async fn calls_on_disk(&self) -> u32 {
        let reloaded = ConfigStore::load(self.store.path().to_path_buf(), Arc::new(self.clock.clone()))
            .await
            .unwrap();
        reloaded.read(|d| d.api_quota.calls_today).await
    }

    /// Moves past the minimum call interval.
    pub fn pass_interval(&self) {
        self.clock.advance(chrono::Duration::seconds(3));
    }
}
