//! Per-provider request counters and rate limits.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Source of the current time for quota windows.
pub trait Clock: Send + Sync + fmt::Debug {
    /// Current instant.
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
/// Wall clock.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug)]
/// Clock that only moves when told to.
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    /// Clock frozen at `start`.
    #[must_use]
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, by: chrono::Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
/// How a provider limits its callers.
pub enum QuotaPolicy {
    /// Request count per UTC calendar day.
    Daily {
        /// Requests allowed per day.
        limit: u32,
    },
    /// Request count per UTC calendar month.
    Monthly {
        /// Requests allowed per month.
        limit: u32,
    },
    /// No count, only a minimum gap between requests.
    MinInterval(Duration),
}

impl QuotaPolicy {
    fn limit(self) -> Option<u32> {
        match self {
            QuotaPolicy::Daily { limit } | QuotaPolicy::Monthly { limit } => Some(limit),
            QuotaPolicy::MinInterval(_) => None,
        }
    }

    fn window_start(self, now: DateTime<Utc>) -> NaiveDate {
        let today = now.date_naive();
        match self {
            QuotaPolicy::Monthly { .. } => today.with_day(1).unwrap_or(today),
            QuotaPolicy::Daily { .. } | QuotaPolicy::MinInterval(_) => today,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Bookkeeping for one provider.
pub struct ProviderState {
    /// Provider name.
    pub name: String,
    /// Attempts counted in the current window.
    pub request_counter: u32,
    /// First day of the current counting window.
    pub counter_window_start: NaiveDate,
    /// Attempts allowed per window; `None` for rate-limited-only providers.
    pub quota_limit: Option<u32>,
    /// When the last attempt was issued.
    pub last_request: Option<DateTime<Utc>>,
}

/// Owns a provider's [`ProviderState`] and applies its [`QuotaPolicy`].
#[derive(Debug)]
pub struct QuotaTracker {
    policy: QuotaPolicy,
    state: Mutex<ProviderState>,
    clock: Arc<dyn Clock>,
}

impl QuotaTracker {
    /// Tracker on the wall clock.
    #[must_use]
    pub fn new(name: impl Into<String>, policy: QuotaPolicy) -> Self {
        Self::with_clock(name, policy, Arc::new(SystemClock))
    }

    /// Tracker on a caller-supplied clock.
    #[must_use]
    pub fn with_clock(name: impl Into<String>, policy: QuotaPolicy, clock: Arc<dyn Clock>) -> Self {
        let now = clock.now();
        Self {
            policy,
            state: Mutex::new(ProviderState {
                name: name.into(),
                request_counter: 0,
                counter_window_start: policy.window_start(now),
                quota_limit: policy.limit(),
                last_request: None,
            }),
            clock,
        }
    }

    /// Policy in force.
    #[must_use]
    pub fn policy(&self) -> QuotaPolicy {
        self.policy
    }

    /// Whether another attempt is allowed now. Resets an expired counting window first.
    #[must_use]
    pub fn has_quota(&self) -> bool {
        let now = self.clock.now();
        let mut state = self.lock();
        match self.policy {
            QuotaPolicy::Daily { limit } | QuotaPolicy::Monthly { limit } => {
                self.roll_window(&mut state, now);
                state.request_counter < limit
            }
            QuotaPolicy::MinInterval(interval) => state
                .last_request
                .is_none_or(|last| elapsed(last, now) >= interval),
        }
    }

    /// Count one attempt.
    pub fn record_attempt(&self) {
        let now = self.clock.now();
        let mut state = self.lock();
        self.roll_window(&mut state, now);
        state.request_counter = state.request_counter.saturating_add(1);
        state.last_request = Some(now);
    }

    /// Time left before the minimum interval has passed; zero for counted policies.
    #[must_use]
    pub fn wait_duration(&self) -> Duration {
        let QuotaPolicy::MinInterval(interval) = self.policy else {
            return Duration::ZERO;
        };
        let now = self.clock.now();
        self.lock()
            .last_request
            .map_or(Duration::ZERO, |last| interval.saturating_sub(elapsed(last, now)))
    }

    /// Remaining minimum interval, or `None` when no wait would make a call possible.
    #[must_use]
    pub fn cooldown(&self) -> Option<Duration> {
        matches!(self.policy, QuotaPolicy::MinInterval(_))
            .then(|| self.wait_duration())
            .filter(|wait| !wait.is_zero())
    }

    /// Sleep until the minimum interval has passed.
    pub async fn wait_for_slot(&self) {
        let wait = self.wait_duration();
        if !wait.is_zero() {
            tokio::time::sleep(wait).await;
        }
    }

    /// Copy of the current bookkeeping.
    #[must_use]
    pub fn snapshot(&self) -> ProviderState {
        self.lock().clone()
    }

    fn roll_window(&self, state: &mut ProviderState, now: DateTime<Utc>) {
        let current = self.policy.window_start(now);
        let expired = match self.policy {
            QuotaPolicy::Daily { .. } => state.counter_window_start != current,
            QuotaPolicy::Monthly { .. } => {
                (state.counter_window_start.year(), state.counter_window_start.month())
                    != (current.year(), current.month())
            }
            QuotaPolicy::MinInterval(_) => false,
        };
        if expired {
            state.request_counter = 0;
            state.counter_window_start = current;
        }
    }

    fn lock(&self) -> MutexGuard<'_, ProviderState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn elapsed(since: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    (now - since).to_std().unwrap_or(Duration::ZERO)
}
