//! RotationScheduler - keeps exactly one authoritative hub subscription
//!
//! The hub drops long-lived event feeds without notice, so the subscription is
//! replaced on a fixed interval. The replacement is opened first and the old
//! one closed only afterwards; a short overlap is fine, a gap is not.

use std::sync::Arc;
use std::time::Duration;

use backon::{BackoffBuilder, ExponentialBackoff, ExponentialBuilder};
use contracts::{HubClient, RotationConfig};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::error::{IngestionError, Result};
use crate::subscriber::{SubscriptionHandle, UpstreamSubscriber};

/// Attempts before the recovery delay stays pinned at its maximum
const RECOVERY_STEPS: usize = 16;

/// Scheduler state, observable through `RotationScheduler::state`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RotationState {
    /// No subscription yet
    #[default]
    Idle,
    /// One authoritative subscription
    Active { handle: u64 },
    /// Replacement open, old one about to close
    Rotating { old: u64, new: u64 },
    /// Cancelled; every subscription closed
    Stopped,
}

pub struct RotationScheduler<C> {
    subscriber: Arc<UpstreamSubscriber<C>>,
    config: RotationConfig,
    state: watch::Sender<RotationState>,
}

impl<C> RotationScheduler<C>
where
    C: HubClient + Send + Sync + 'static,
{
    pub fn new(subscriber: Arc<UpstreamSubscriber<C>>, config: RotationConfig) -> Self {
        let (state, _) = watch::channel(RotationState::Idle);
        Self {
            subscriber,
            config,
            state,
        }
    }

    /// Watch state transitions
    pub fn state(&self) -> watch::Receiver<RotationState> {
        self.state.subscribe()
    }

    pub fn subscriber(&self) -> &Arc<UpstreamSubscriber<C>> {
        &self.subscriber
    }

    /// Run on a background task until `cancel` fires
    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<Result<()>> {
        tokio::spawn(async move { self.run(cancel).await })
    }

    /// Drive the rotation loop until `cancel` fires
    ///
    /// # Errors
    /// `IngestionError::Cancelled` when cancelled before the first subscription
    /// opened
    #[instrument(name = "rotation_run", skip_all, fields(interval_secs = self.config.interval_secs))]
    pub async fn run(&self, cancel: CancellationToken) -> Result<()> {
        let Some(mut current) = self.open_with_backoff(&cancel).await else {
            self.state.send_replace(RotationState::Stopped);
            return Err(IngestionError::Cancelled);
        };
        self.state.send_replace(RotationState::Active {
            handle: current.id(),
        });

        let period = self.config.interval();
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => break,

                _ = current.died() => {
                    warn!(handle = current.id(), "Subscription died, recovering");
                    let Some(next) = self.open_with_backoff(&cancel).await else {
                        break;
                    };
                    self.replace(&mut current, next);
                    ticker.reset();
                }

                _ = ticker.tick() => {
                    let opened = tokio::select! {
                        _ = cancel.cancelled() => break,
                        opened = self.subscriber.open() => opened,
                    };
                    match opened {
                        Ok(next) => {
                            observability::record_rotation(true);
                            self.replace(&mut current, next);
                        }
                        Err(e) => {
                            observability::record_rotation(false);
                            warn!(
                                handle = current.id(),
                                error = %e,
                                "Rotation failed, keeping current subscription"
                            );
                        }
                    }
                }
            }
        }

        self.subscriber.close(&current);
        current.shutdown().await;
        self.state.send_replace(RotationState::Stopped);
        info!("Rotation scheduler stopped");
        Ok(())
    }

    /// Make `next` authoritative, then close the previous subscription
    fn replace(&self, current: &mut SubscriptionHandle, next: SubscriptionHandle) {
        self.state.send_replace(RotationState::Rotating {
            old: current.id(),
            new: next.id(),
        });
        let old = std::mem::replace(current, next);
        self.subscriber.close(&old);
        info!(old = old.id(), new = current.id(), "Subscription rotated");
        self.state.send_replace(RotationState::Active {
            handle: current.id(),
        });
    }

    fn recovery_backoff(&self) -> ExponentialBackoff {
        ExponentialBuilder::default()
            .with_min_delay(self.config.recovery_min())
            .with_max_delay(self.config.recovery_max())
            .with_max_times(RECOVERY_STEPS)
            .with_jitter()
            .build()
    }

    /// Open a subscription, retrying with jittered exponential backoff
    ///
    /// Returns `None` only when cancelled.
    async fn open_with_backoff(&self, cancel: &CancellationToken) -> Option<SubscriptionHandle> {
        let mut delays = self.recovery_backoff();
        let max_delay = self.config.recovery_max();

        loop {
            let opened = tokio::select! {
                _ = cancel.cancelled() => return None,
                opened = self.subscriber.open() => opened,
            };
            match opened {
                Ok(handle) => return Some(handle),
                Err(e) => {
                    let delay: Duration = delays.next().unwrap_or(max_delay);
                    warn!(error = %e, delay_ms = delay.as_millis() as u64, "Open failed, retrying");
                    tokio::select! {
                        _ = cancel.cancelled() => return None,
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }
    }
}
