//! Budget Tracker
//!
//! Rolling per-minute/per-day request and token ledger checked before
//! every provider call.
//!
//! ## Design
//!
//! - **Soft enforcement**: the ledger is advisory. It keeps the process
//!   from hammering a provider that will refuse anyway; the provider's own
//!   429 is the backstop.
//! - **Pessimistic reservation**: a call reserves its estimate up front
//!   and settles to real usage afterwards, so concurrent callers see
//!   in-flight consumption.
//! - **Lazy rollover**: window counters reset on the first call after the
//!   wall-clock crosses a minute/day boundary; minute and day windows roll
//!   independently. Nothing ticks in the background.
//!
//! All state lives behind one mutex per tracker; `try_reserve` fuses the
//! affordability check and the reservation under a single lock acquisition
//! so two callers cannot both reserve the last slot.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::ai::clock::{SharedClock, system_clock};
use crate::constants::budget as defaults;

// =============================================================================
// Limits
// =============================================================================

/// Configured ceilings for one tracker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BudgetLimits {
    /// Requests per minute
    pub rpm: u32,
    /// Requests per day
    pub rpd: u32,
    /// Tokens per minute
    pub tpm: u64,
    /// Tokens per day
    pub tpd: u64,
}

impl Default for BudgetLimits {
    fn default() -> Self {
        Self {
            rpm: defaults::DEFAULT_RPM,
            rpd: defaults::DEFAULT_RPD,
            tpm: defaults::DEFAULT_TPM,
            tpd: defaults::DEFAULT_TPD,
        }
    }
}

// =============================================================================
// Denial
// =============================================================================

/// Which ceiling blocked a reservation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BudgetDenial {
    RequestsPerMinute { used: u32, limit: u32 },
    RequestsPerDay { used: u32, limit: u32 },
    TokensPerMinute { needed: u64, used: u64, limit: u64 },
    TokensPerDay { needed: u64, used: u64, limit: u64 },
}

impl std::fmt::Display for BudgetDenial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BudgetDenial::RequestsPerMinute { used, limit } => {
                write!(f, "requests-per-minute ceiling reached ({}/{})", used, limit)
            }
            BudgetDenial::RequestsPerDay { used, limit } => {
                write!(f, "requests-per-day ceiling reached ({}/{})", used, limit)
            }
            BudgetDenial::TokensPerMinute {
                needed,
                used,
                limit,
            } => write!(
                f,
                "tokens-per-minute ceiling would be exceeded (need {}, used {}/{})",
                needed, used, limit
            ),
            BudgetDenial::TokensPerDay {
                needed,
                used,
                limit,
            } => write!(
                f,
                "tokens-per-day ceiling would be exceeded (need {}, used {}/{})",
                needed, used, limit
            ),
        }
    }
}

impl std::error::Error for BudgetDenial {}

// =============================================================================
// Window state
// =============================================================================

#[derive(Debug, Clone, Copy)]
struct WindowState {
    minute_epoch: i64,
    day_epoch: i64,
    requests_minute: u32,
    requests_day: u32,
    tokens_minute: u64,
    tokens_day: u64,
}

impl WindowState {
    fn new(minute_epoch: i64, day_epoch: i64) -> Self {
        Self {
            minute_epoch,
            day_epoch,
            requests_minute: 0,
            requests_day: 0,
            tokens_minute: 0,
            tokens_day: 0,
        }
    }

    /// Reset any window the wall-clock has moved past. Minute and day
    /// roll independently.
    fn roll(&mut self, minute_epoch: i64, day_epoch: i64) {
        if minute_epoch != self.minute_epoch {
            self.minute_epoch = minute_epoch;
            self.requests_minute = 0;
            self.tokens_minute = 0;
        }
        if day_epoch != self.day_epoch {
            self.day_epoch = day_epoch;
            self.requests_day = 0;
            self.tokens_day = 0;
        }
    }

    fn check(&self, estimate: u64, limits: &BudgetLimits) -> Result<(), BudgetDenial> {
        if self.requests_minute >= limits.rpm {
            return Err(BudgetDenial::RequestsPerMinute {
                used: self.requests_minute,
                limit: limits.rpm,
            });
        }
        if self.requests_day >= limits.rpd {
            return Err(BudgetDenial::RequestsPerDay {
                used: self.requests_day,
                limit: limits.rpd,
            });
        }
        if self.tokens_minute.saturating_add(estimate) > limits.tpm {
            return Err(BudgetDenial::TokensPerMinute {
                needed: estimate,
                used: self.tokens_minute,
                limit: limits.tpm,
            });
        }
        if self.tokens_day.saturating_add(estimate) > limits.tpd {
            return Err(BudgetDenial::TokensPerDay {
                needed: estimate,
                used: self.tokens_day,
                limit: limits.tpd,
            });
        }
        Ok(())
    }

    fn reserve(&mut self, estimate: u64) {
        self.requests_minute = self.requests_minute.saturating_add(1);
        self.requests_day = self.requests_day.saturating_add(1);
        self.tokens_minute = self.tokens_minute.saturating_add(estimate);
        self.tokens_day = self.tokens_day.saturating_add(estimate);
    }
}

// =============================================================================
// Tracker
// =============================================================================

/// Shared budget tracker handle
pub type SharedBudget = Arc<BudgetTracker>;

/// Rolling request/token usage against configured ceilings
#[derive(Debug)]
pub struct BudgetTracker {
    limits: BudgetLimits,
    clock: SharedClock,
    state: Mutex<WindowState>,
}

impl BudgetTracker {
    pub fn new(limits: BudgetLimits, clock: SharedClock) -> Self {
        let now = clock.now().timestamp();
        Self {
            limits,
            clock,
            state: Mutex::new(WindowState::new(now.div_euclid(60), now.div_euclid(86_400))),
        }
    }

    pub fn with_system_clock(limits: BudgetLimits) -> Self {
        Self::new(limits, system_clock())
    }

    /// Create a tracker wrapped for sharing across request handlers
    pub fn shared(limits: BudgetLimits, clock: SharedClock) -> SharedBudget {
        Arc::new(Self::new(limits, clock))
    }

    pub fn limits(&self) -> &BudgetLimits {
        &self.limits
    }

    /// Lock the ledger with windows rolled up to the current instant
    fn rolled(&self) -> MutexGuard<'_, WindowState> {
        let now = self.clock.now().timestamp();
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        state.roll(now.div_euclid(60), now.div_euclid(86_400));
        state
    }

    /// Would a reservation of `estimate` tokens fit every ceiling?
    pub fn can_afford(&self, estimate: u64) -> Result<(), BudgetDenial> {
        self.rolled().check(estimate, &self.limits)
    }

    /// Check and reserve under one lock acquisition.
    ///
    /// The dispatch loop uses this form: a separate check-then-reserve
    /// would let two callers both observe the last free slot.
    pub fn try_reserve(&self, estimate: u64) -> Result<(), BudgetDenial> {
        let mut state = self.rolled();
        state.check(estimate, &self.limits)?;
        state.reserve(estimate);
        Ok(())
    }

    /// Unconditionally reserve one request and `estimate` tokens
    pub fn reserve(&self, estimate: u64) {
        self.rolled().reserve(estimate);
    }

    /// Settle a reservation against the real usage a response reported.
    ///
    /// Applies `actual - reserved` to the token counters, floored at zero.
    /// Request counters are untouched: the request happened either way.
    pub fn adjust_after_response(&self, reserved: u64, actual: u64) {
        let mut state = self.rolled();
        if actual >= reserved {
            let extra = actual - reserved;
            state.tokens_minute = state.tokens_minute.saturating_add(extra);
            state.tokens_day = state.tokens_day.saturating_add(extra);
        } else {
            let refund = reserved - actual;
            state.tokens_minute = state.tokens_minute.saturating_sub(refund);
            state.tokens_day = state.tokens_day.saturating_sub(refund);
        }
    }

    /// Point-in-time usage view for logging
    pub fn snapshot(&self) -> BudgetSnapshot {
        let state = self.rolled();
        BudgetSnapshot {
            requests_this_minute: state.requests_minute,
            requests_today: state.requests_day,
            tokens_this_minute: state.tokens_minute,
            tokens_today: state.tokens_day,
            limits: self.limits,
        }
    }
}

// =============================================================================
// Snapshot
// =============================================================================

/// Usage counters at one instant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BudgetSnapshot {
    pub requests_this_minute: u32,
    pub requests_today: u32,
    pub tokens_this_minute: u64,
    pub tokens_today: u64,
    pub limits: BudgetLimits,
}

impl BudgetSnapshot {
    /// One-line usage summary for logs
    pub fn summary(&self) -> String {
        format!(
            "requests {}/{} (minute) {}/{} (day); tokens {}/{} (minute) {}/{} (day)",
            self.requests_this_minute,
            self.limits.rpm,
            self.requests_today,
            self.limits.rpd,
            self.tokens_this_minute,
            self.limits.tpm,
            self.tokens_today,
            self.limits.tpd,
        )
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::clock::ManualClock;
    use chrono::{TimeZone, Utc};
    use proptest::prelude::*;

    fn clock() -> Arc<ManualClock> {
        // mid-minute, mid-day start so single-step advances stay in-window
        ManualClock::new(Utc.with_ymd_and_hms(2025, 6, 1, 12, 30, 30).unwrap())
    }

    fn tracker(limits: BudgetLimits) -> (BudgetTracker, Arc<ManualClock>) {
        let clock = clock();
        (BudgetTracker::new(limits, clock.clone()), clock)
    }

    #[test]
    fn test_reserve_then_adjust_nets_to_actual() {
        let (tracker, _clock) = tracker(BudgetLimits::default());

        tracker.try_reserve(500).unwrap();
        tracker.adjust_after_response(500, 320);

        let snapshot = tracker.snapshot();
        assert_eq!(snapshot.tokens_this_minute, 320);
        assert_eq!(snapshot.tokens_today, 320);
        assert_eq!(snapshot.requests_this_minute, 1);
        assert_eq!(snapshot.requests_today, 1);
    }

    #[test]
    fn test_adjust_upward_when_actual_exceeds_reserved() {
        let (tracker, _clock) = tracker(BudgetLimits::default());

        tracker.try_reserve(100).unwrap();
        tracker.adjust_after_response(100, 250);

        assert_eq!(tracker.snapshot().tokens_this_minute, 250);
    }

    #[test]
    fn test_adjust_floors_at_zero() {
        let (tracker, _clock) = tracker(BudgetLimits::default());

        tracker.reserve(50);
        // settling a larger reservation than was ever recorded must not underflow
        tracker.adjust_after_response(200, 0);

        let snapshot = tracker.snapshot();
        assert_eq!(snapshot.tokens_this_minute, 0);
        assert_eq!(snapshot.tokens_today, 0);
    }

    #[test]
    fn test_minute_rollover_preserves_day_counters() {
        let (tracker, clock) = tracker(BudgetLimits::default());

        tracker.try_reserve(400).unwrap();
        clock.advance(chrono::Duration::seconds(60));

        let snapshot = tracker.snapshot();
        assert_eq!(snapshot.tokens_this_minute, 0);
        assert_eq!(snapshot.requests_this_minute, 0);
        assert_eq!(snapshot.tokens_today, 400);
        assert_eq!(snapshot.requests_today, 1);
    }

    #[test]
    fn test_day_rollover_resets_day_counters() {
        let (tracker, clock) = tracker(BudgetLimits::default());

        tracker.try_reserve(400).unwrap();
        clock.advance(chrono::Duration::days(1));

        let snapshot = tracker.snapshot();
        assert_eq!(snapshot.tokens_today, 0);
        assert_eq!(snapshot.requests_today, 0);
    }

    #[test]
    fn test_rpm_denial_after_limit() {
        let limits = BudgetLimits {
            rpm: 2,
            ..BudgetLimits::default()
        };
        let (tracker, clock) = tracker(limits);

        tracker.try_reserve(1).unwrap();
        tracker.try_reserve(1).unwrap();
        let denial = tracker.try_reserve(1).unwrap_err();
        assert_eq!(denial, BudgetDenial::RequestsPerMinute { used: 2, limit: 2 });

        // new minute clears the per-minute ceiling
        clock.advance(chrono::Duration::seconds(60));
        assert!(tracker.try_reserve(1).is_ok());
    }

    #[test]
    fn test_rpd_denial_survives_minute_rollover() {
        let limits = BudgetLimits {
            rpm: 10,
            rpd: 1,
            ..BudgetLimits::default()
        };
        let (tracker, clock) = tracker(limits);

        tracker.try_reserve(1).unwrap();
        clock.advance(chrono::Duration::seconds(60));

        let denial = tracker.try_reserve(1).unwrap_err();
        assert!(matches!(denial, BudgetDenial::RequestsPerDay { .. }));
    }

    #[test]
    fn test_tpm_denial_reports_need_and_usage() {
        let limits = BudgetLimits {
            tpm: 1_000,
            ..BudgetLimits::default()
        };
        let (tracker, _clock) = tracker(limits);

        tracker.try_reserve(900).unwrap();
        let denial = tracker.try_reserve(200).unwrap_err();
        assert_eq!(
            denial,
            BudgetDenial::TokensPerMinute {
                needed: 200,
                used: 900,
                limit: 1_000
            }
        );
        assert!(denial.to_string().contains("tokens-per-minute"));
    }

    #[test]
    fn test_try_reserve_is_atomic_under_contention() {
        let limits = BudgetLimits {
            rpm: 5,
            ..BudgetLimits::default()
        };
        let tracker = Arc::new(BudgetTracker::new(limits, clock()));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let tracker = tracker.clone();
                std::thread::spawn(move || tracker.try_reserve(1).is_ok())
            })
            .collect();

        let granted = handles
            .into_iter()
            .filter(|h| h.join().unwrap_or(false))
            .count();
        assert_eq!(granted, 5);
    }

    #[test]
    fn test_can_afford_does_not_consume() {
        let (tracker, _clock) = tracker(BudgetLimits::default());

        tracker.can_afford(100).unwrap();
        tracker.can_afford(100).unwrap();
        assert_eq!(tracker.snapshot().tokens_this_minute, 0);
    }

    #[test]
    fn test_snapshot_summary_format() {
        let (tracker, _clock) = tracker(BudgetLimits::default());
        tracker.try_reserve(10).unwrap();
        let summary = tracker.snapshot().summary();
        assert!(summary.contains("requests 1/"));
        assert!(summary.contains("tokens 10/"));
    }

    proptest! {
        #[test]
        fn prop_reserve_adjust_nets_to_actual(
            estimate in 0u64..50_000,
            actual in 0u64..50_000,
        ) {
            let limits = BudgetLimits {
                tpm: u64::MAX,
                tpd: u64::MAX,
                ..BudgetLimits::default()
            };
            let tracker = BudgetTracker::new(limits, clock());

            tracker.reserve(estimate);
            tracker.adjust_after_response(estimate, actual);

            let snapshot = tracker.snapshot();
            prop_assert_eq!(snapshot.tokens_this_minute, actual);
            prop_assert_eq!(snapshot.tokens_today, actual);
        }
    }
}
