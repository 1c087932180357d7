// ⏰ Update Gate
// The registry is refreshed at most once per interval (24h by default).
// Every check takes `now` explicitly so callers and tests control the clock.

use crate::error::{MacvenError, Result};
use crate::state::{RefreshState, StateStore};
use chrono::{DateTime, Duration, Utc};

/// Two states, Cooldown → Eligible purely by elapsed time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateStatus {
    Eligible,
    Cooldown { remaining: Duration },
}

#[derive(Debug, Clone, Copy)]
pub struct UpdateGate {
    min_interval: Duration,
}

impl Default for UpdateGate {
    fn default() -> Self {
        UpdateGate {
            min_interval: Duration::hours(24),
        }
    }
}

impl UpdateGate {
    pub fn new(min_interval: Duration) -> Self {
        UpdateGate { min_interval }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Elapsed time since the last refresh, None if there never was one
    pub fn time_since_update(&self, state: &RefreshState, now: DateTime<Utc>) -> Option<Duration> {
        state.last_updated.map(|last| now - last)
    }

    /// `last_updated + interval - now`; zero or negative means eligible
    pub fn time_until_eligible(&self, state: &RefreshState, now: DateTime<Utc>) -> Duration {
        match state.last_updated {
            Some(last) => last + self.min_interval - now,
            None => Duration::zero(),
        }
    }

    pub fn status(&self, state: &RefreshState, now: DateTime<Utc>) -> GateStatus {
        let remaining = self.time_until_eligible(state, now);
        if remaining > Duration::zero() {
            GateStatus::Cooldown { remaining }
        } else {
            GateStatus::Eligible
        }
    }

    /// Fail with CooldownActive unless a refresh may run now
    pub fn check(&self, state: &RefreshState, now: DateTime<Utc>) -> Result<()> {
        match self.status(state, now) {
            GateStatus::Eligible => Ok(()),
            GateStatus::Cooldown { remaining } => Err(MacvenError::CooldownActive {
                elapsed: self.time_since_update(state, now).unwrap_or_else(Duration::zero),
                remaining,
            }),
        }
    }

    /// Persist a successful refresh at `now` and return the new state
    pub fn record_refresh(
        &self,
        store: &dyn StateStore,
        state: &RefreshState,
        now: DateTime<Utc>,
    ) -> Result<RefreshState> {
        store.commit(&state.refreshed_at(now))
    }
}
