// ── Poller ──
//
// Refreshes an account's device list and each device's cached state.
// At most one cycle runs per account at a time, and a non-forced trigger
// within the scan interval of the last completed cycle is a no-op.
// Failures are logged and never propagate out of the cycle.

use std::time::Duration;

use tokio::sync::{Mutex, MutexGuard};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::model::Device;
use crate::session::AccountSession;

/// Result of one poll trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// The device list was replaced. `initialized` counts the devices whose
    /// state was fetched before the first failure (equal to `devices` when
    /// every initialization succeeded).
    Refreshed { devices: usize, initialized: usize },
    /// A cycle is running, or the last one completed within the interval.
    Throttled,
    /// The appliance list could not be fetched; the previous devices stay.
    Failed,
}

// ── Throttle ─────────────────────────────────────────────────────────

/// Per-account rate limiter for poll cycles.
#[derive(Debug)]
pub(crate) struct Throttle {
    interval: Duration,
    last_run: Mutex<Option<Instant>>,
}

impl Throttle {
    pub(crate) fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_run: Mutex::new(None),
        }
    }

    /// Claim the next cycle, or `None` if one is running or the interval
    /// has not elapsed. `force` skips only the interval check.
    pub(crate) fn try_begin(&self, force: bool) -> Option<ThrottleGuard<'_>> {
        let guard = self.last_run.try_lock().ok()?;
        if !force {
            if let Some(last) = *guard {
                if last.elapsed() < self.interval {
                    return None;
                }
            }
        }
        Some(ThrottleGuard { last_run: guard })
    }
}

/// Held for the duration of a cycle.
pub(crate) struct ThrottleGuard<'a> {
    last_run: MutexGuard<'a, Option<Instant>>,
}

impl ThrottleGuard<'_> {
    /// Record the cycle as completed now.
    pub(crate) fn complete(mut self) {
        *self.last_run = Some(Instant::now());
    }
}

// ── Poll cycle ───────────────────────────────────────────────────────

/// Run one throttled poll cycle for `session`.
pub async fn poll(session: &AccountSession, force: bool) -> PollOutcome {
    let Some(guard) = session.throttle().try_begin(force) else {
        debug!(account = session.id(), "poll throttled");
        return PollOutcome::Throttled;
    };

    let outcome = refresh(session).await;
    guard.complete();
    outcome
}

async fn refresh(session: &AccountSession) -> PollOutcome {
    let appliances = match session.client().get_appliances().await {
        Ok(appliances) => appliances,
        Err(e) => {
            warn!(
                account = session.id(),
                status = ?e.status(),
                transient = e.is_transient(),
                error = %e,
                "cannot update devices"
            );
            return PollOutcome::Failed;
        }
    };

    let mut devices: Vec<Device> = appliances
        .into_iter()
        .map(|handle| Device::new(handle, session.id(), session.entity_ids()))
        .collect();

    let mut initialized = 0;
    for device in &mut devices {
        if let Err(e) = device.initialize().await {
            warn!(
                account = session.id(),
                ha_id = device.ha_id(),
                status = ?e.status(),
                transient = e.is_transient(),
                error = %e,
                "cannot update devices"
            );
            break;
        }
        initialized += 1;
    }

    let total = devices.len();
    session.replace_devices(devices);
    debug!(
        account = session.id(),
        devices = total,
        initialized,
        "device refresh complete"
    );

    PollOutcome::Refreshed {
        devices: total,
        initialized,
    }
}
