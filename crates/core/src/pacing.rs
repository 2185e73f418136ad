//! Self-imposed rate limiting in front of the remote service.
//!
//! Each call category keeps its own "last call" timestamp; a call waits until
//! the category's minimum interval has elapsed since the previous one.

use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use async_trait::async_trait;
use tracing::debug;

#[async_trait]
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
    async fn sleep(&self, duration: Duration);
}

/// Wall clock backed by `tokio::time`.
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
    Upload,
    Generate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacingPolicy {
    pub upload_interval: Duration,
    pub generate_interval: Duration,
}

impl PacingPolicy {
    /// Lighter "flash" models get a shorter generation interval.
    pub fn for_model(model: &str) -> Self {
        let generate_secs = if model.to_lowercase().contains("flash") {
            4
        } else {
            12
        };
        Self {
            upload_interval: Duration::from_secs(4),
            generate_interval: Duration::from_secs(generate_secs),
        }
    }

    pub fn none() -> Self {
        Self {
            upload_interval: Duration::ZERO,
            generate_interval: Duration::ZERO,
        }
    }

    fn interval(&self, kind: CallKind) -> Duration {
        match kind {
            CallKind::Upload => self.upload_interval,
            CallKind::Generate => self.generate_interval,
        }
    }
}

pub struct Pacer {
    policy: PacingPolicy,
    clock: Arc<dyn Clock>,
    last_call: HashMap<CallKind, Instant>,
}

impl Pacer {
    pub fn new(policy: PacingPolicy, clock: Arc<dyn Clock>) -> Self {
        Self {
            policy,
            clock,
            last_call: HashMap::new(),
        }
    }

    /// Wait until a call of `kind` may be issued, then record it.
    pub async fn acquire(&mut self, kind: CallKind) {
        let interval = self.policy.interval(kind);
        if let Some(last) = self.last_call.get(&kind) {
            let elapsed = self.clock.now().saturating_duration_since(*last);
            if elapsed < interval {
                let wait = interval - elapsed;
                debug!(?kind, ?wait, "pacing remote call");
                self.clock.sleep(wait).await;
            }
        }
        self.last_call.insert(kind, self.clock.now());
    }
}
