//! Token-bucket rate limiting per operation category.
//!
//! A bucket starts full. Each call takes one token; when none are left the
//! caller sleeps for the whole refill window and continues with the budget
//! restored (minus the token it just used). The stall is a normal outcome,
//! not an error.
//!
//! [`ThrottleRegistry`] maps categories to buckets. Each bucket sits behind an
//! async mutex that is held across the stall, so callers queued on the same
//! category wait their turn instead of racing for a refilled budget.

use std::sync::Arc;

use dashmap::DashMap;
use rustmws_core::{ThrottleCategory, ThrottleProfile, ThrottleProfiles};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::{MwsError, MwsResult};

/// Remaining budget of one throttle category.
#[derive(Debug)]
pub struct ThrottleBucket {
    category: ThrottleCategory,
    profile: ThrottleProfile,
    tokens_remaining: u32,
}

impl ThrottleBucket {
    /// Create a full bucket.
    #[must_use]
    pub fn new(category: ThrottleCategory, profile: ThrottleProfile) -> Self {
        Self {
            category,
            profile,
            tokens_remaining: profile.max_tokens,
        }
    }

    /// Take one token, sleeping through the refill window if none are left.
    pub async fn consume(&mut self) {
        if self.try_take() {
            return;
        }
        self.log_stall();
        tokio::time::sleep(self.profile.refill_window()).await;
        self.refill_after_stall();
    }

    /// Like [`consume`](Self::consume), but a cancelled token aborts the stall.
    ///
    /// # Errors
    ///
    /// Returns [`MwsError::ThrottleTimeout`] when `cancel` fires before the
    /// window elapses. The bucket stays empty in that case.
    pub async fn consume_cancellable(&mut self, cancel: &CancellationToken) -> MwsResult<()> {
        if self.try_take() {
            return Ok(());
        }
        self.log_stall();
        tokio::select! {
            () = tokio::time::sleep(self.profile.refill_window()) => {
                self.refill_after_stall();
                Ok(())
            }
            () = cancel.cancelled() => {
                info!(category = %self.category, "Throttle wait cancelled");
                Err(MwsError::ThrottleTimeout { category: self.category })
            }
        }
    }

    /// Restore the full budget.
    pub fn reset(&mut self) {
        self.tokens_remaining = self.profile.max_tokens;
    }

    /// Tokens left before the next call stalls.
    #[must_use]
    pub fn tokens_remaining(&self) -> u32 {
        self.tokens_remaining
    }

    /// Profile this bucket enforces.
    #[must_use]
    pub fn profile(&self) -> ThrottleProfile {
        self.profile
    }

    fn try_take(&mut self) -> bool {
        if self.tokens_remaining == 0 {
            return false;
        }
        self.tokens_remaining -= 1;
        debug!(
            category = %self.category,
            remaining = self.tokens_remaining,
            "Consumed throttle token"
        );
        true
    }

    fn refill_after_stall(&mut self) {
        self.tokens_remaining = self.profile.max_tokens.saturating_sub(1);
    }

    fn log_stall(&self) {
        info!(
            category = %self.category,
            max_tokens = self.profile.max_tokens,
            wait_secs = self.profile.refill_window_seconds,
            "Throttle budget exhausted, waiting for refill"
        );
    }
}

/// Buckets keyed by category, created lazily from a profile table.
#[derive(Debug, Default)]
pub struct ThrottleRegistry {
    profiles: ThrottleProfiles,
    buckets: DashMap<ThrottleCategory, Arc<Mutex<ThrottleBucket>>>,
}

impl ThrottleRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new(profiles: ThrottleProfiles) -> Self {
        Self {
            profiles,
            buckets: DashMap::new(),
        }
    }

    /// Bucket of a category, created full on first use.
    #[must_use]
    pub fn bucket(&self, category: ThrottleCategory) -> Arc<Mutex<ThrottleBucket>> {
        let entry = self.buckets.entry(category).or_insert_with(|| {
            Arc::new(Mutex::new(ThrottleBucket::new(
                category,
                self.profiles.get(category),
            )))
        });
        Arc::clone(entry.value())
    }

    /// Take one token from a category, optionally abortable.
    ///
    /// # Errors
    ///
    /// Returns [`MwsError::ThrottleTimeout`] if `cancel` fires while waiting
    /// for the bucket or for its refill.
    pub async fn consume(
        &self,
        category: ThrottleCategory,
        cancel: Option<&CancellationToken>,
    ) -> MwsResult<()> {
        let bucket = self.bucket(category);
        match cancel {
            Some(cancel) => {
                let mut guard = tokio::select! {
                    guard = bucket.lock() => guard,
                    () = cancel.cancelled() => {
                        return Err(MwsError::ThrottleTimeout { category });
                    }
                };
                guard.consume_cancellable(cancel).await
            }
            None => {
                bucket.lock().await.consume().await;
                Ok(())
            }
        }
    }

    /// Restore the full budget of one category.
    pub async fn reset(&self, category: ThrottleCategory) {
        self.bucket(category).lock().await.reset();
    }

    /// Restore the full budget of every category used so far.
    pub async fn reset_all(&self) {
        let buckets: Vec<_> = self
            .buckets
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        for bucket in buckets {
            bucket.lock().await.reset();
        }
    }

    /// Tokens left in a category.
    pub async fn tokens_remaining(&self, category: ThrottleCategory) -> u32 {
        self.bucket(category).lock().await.tokens_remaining()
    }

    /// Profile table this registry was built from.
    #[must_use]
    pub fn profiles(&self) -> &ThrottleProfiles {
        &self.profiles
    }
}
