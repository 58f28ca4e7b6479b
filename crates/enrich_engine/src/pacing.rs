use std::time::Duration;

use enrich_logging::enrich_debug;
use tokio::time::{sleep, sleep_until, Instant};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacingSettings {
    /// Minimum spacing between two enrichment calls.
    pub call_delay: Duration,
    /// Extra pause taken at every checkpoint.
    pub cooldown: Duration,
    /// Items between checkpoints; 0 disables them.
    pub cooldown_every: usize,
}

impl Default for PacingSettings {
    fn default() -> Self {
        Self {
            call_delay: Duration::from_secs(1),
            cooldown: Duration::from_secs(5),
            cooldown_every: 5,
        }
    }
}

/// Result of waiting on the limiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permit {
    Granted,
    /// The run was interrupted while waiting; no call should be made.
    Cancelled,
}

/// Fixed-delay pacing for outbound enrichment calls, plus checkpoint cooldowns.
#[derive(Debug)]
pub struct RateLimiter {
    settings: PacingSettings,
    last_grant: Option<Instant>,
}

impl RateLimiter {
    pub fn new(settings: PacingSettings) -> Self {
        Self {
            settings,
            last_grant: None,
        }
    }

    pub fn settings(&self) -> &PacingSettings {
        &self.settings
    }

    /// Wait until at least `call_delay` has passed since the previous grant.
    pub async fn acquire(&mut self, cancel: &CancellationToken) -> Permit {
        if cancel.is_cancelled() {
            return Permit::Cancelled;
        }
        if let Some(last) = self.last_grant {
            let deadline = last + self.settings.call_delay;
            if deadline > Instant::now() {
                enrich_debug!("Pacing: waiting {:?}", deadline - Instant::now());
                tokio::select! {
                    _ = sleep_until(deadline) => {}
                    _ = cancel.cancelled() => return Permit::Cancelled,
                }
            }
        }
        self.last_grant = Some(Instant::now());
        Permit::Granted
    }

    /// True when the item at 1-based `position` closes a checkpoint batch.
    pub fn is_checkpoint(&self, position: usize) -> bool {
        self.settings.cooldown_every > 0 && position % self.settings.cooldown_every == 0
    }

    /// Pause for the checkpoint cooldown, cut short by interruption.
    pub async fn cooldown(&self, cancel: &CancellationToken) -> Permit {
        if cancel.is_cancelled() {
            return Permit::Cancelled;
        }
        tokio::select! {
            _ = sleep(self.settings.cooldown) => Permit::Granted,
            _ = cancel.cancelled() => Permit::Cancelled,
        }
    }
}
