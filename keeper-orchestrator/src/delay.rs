use async_trait::async_trait;
use std::sync::Mutex;
use std::time::Duration;

/// Source of the fixed pauses between status polls and between accounts.
#[async_trait]
pub trait Delay: Send + Sync {
    async fn pause(&self, duration: Duration);
}

/// Real wall-clock pauses.
pub struct TokioDelay;

#[async_trait]
impl Delay for TokioDelay {
    async fn pause(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Records every requested pause and returns immediately.
#[derive(Default)]
pub struct RecordingDelay {
    pauses: Mutex<Vec<Duration>>,
}

impl RecordingDelay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pauses(&self) -> Vec<Duration> {
        self.pauses
            .lock()
            .map(|p| p.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    pub fn count(&self, duration: Duration) -> usize {
        self.pauses().iter().filter(|d| **d == duration).count()
    }
}

#[async_trait]
impl Delay for RecordingDelay {
    async fn pause(&self, duration: Duration) {
        match self.pauses.lock() {
            Ok(mut p) => p.push(duration),
            Err(poisoned) => poisoned.into_inner().push(duration),
        }
    }
}
