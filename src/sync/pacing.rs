use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

/// Pause taken between quote batches to stay polite with the remote source
#[async_trait]
pub trait Pacer: Send + Sync {
    async fn pause(&self);
}

/// Sleeps for a fixed interval.
pub struct FixedDelay(pub Duration);

#[async_trait]
impl Pacer for FixedDelay {
    async fn pause(&self) {
        if self.0.is_zero() {
            return;
        }
        debug!("Pausing {:?} before next batch", self.0);
        tokio::time::sleep(self.0).await;
    }
}

/// Never pauses.
pub struct NoDelay;

#[async_trait]
impl Pacer for NoDelay {
    async fn pause(&self) {}
}
