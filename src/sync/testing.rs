//! Test doubles for sync tests.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

use crate::storage::{Gateway, GatewayError, MemoryGateway};

/// Memory gateway with switchable failures, a put counter and an optional
/// hold on puts.
#[derive(Clone, Default)]
pub struct FlakyGateway {
    pub inner: MemoryGateway,
    fail_gets: Arc<AtomicBool>,
    fail_puts: Arc<AtomicBool>,
    hold_puts: Arc<AtomicBool>,
    release: Arc<Notify>,
    puts: Arc<AtomicUsize>,
}

impl FlakyGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_gets(&self, fail: bool) {
        self.fail_gets.store(fail, Ordering::SeqCst);
    }

    pub fn fail_puts(&self, fail: bool) {
        self.fail_puts.store(fail, Ordering::SeqCst);
    }

    /// Makes every put wait for [`FlakyGateway::release_put`].
    pub fn hold_puts(&self, hold: bool) {
        self.hold_puts.store(hold, Ordering::SeqCst);
    }

    pub fn release_put(&self) {
        self.release.notify_one();
    }

    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Gateway for FlakyGateway {
    async fn get(&self, key: &str) -> Result<Option<String>, GatewayError> {
        if self.fail_gets.load(Ordering::SeqCst) {
            return Err(GatewayError::HttpError("offline".into()));
        }
        self.inner.get(key).await
    }

    async fn put(&self, key: &str, value: &str) -> Result<(), GatewayError> {
        if self.hold_puts.load(Ordering::SeqCst) {
            self.release.notified().await;
        }
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(GatewayError::HttpError("offline".into()));
        }
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.inner.put(key, value).await
    }

    async fn delete(&self, key: &str) -> Result<bool, GatewayError> {
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(GatewayError::HttpError("offline".into()));
        }
        self.inner.delete(key).await
    }

    fn name(&self) -> &'static str {
        "flaky"
    }
}
