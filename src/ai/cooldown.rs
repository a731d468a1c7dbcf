//! Cooldown Registry
//!
//! Per-model quarantine. A model that reports rate or quota exhaustion is
//! excluded from candidate selection until its expiry instant passes.
//!
//! ## Semantics
//!
//! - Absent entry = always eligible.
//! - A model is eligible iff `now >= expiry`.
//! - Setting a cooldown never shortens an existing one (max-merge): a
//!   short per-minute signal must not erase a standing daily quarantine.
//! - State is in-memory only; a restart forgets every quarantine.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use std::sync::Arc;

use crate::ai::clock::SharedClock;
use crate::constants::dispatch::{LONG_COOLDOWN_SECS, SHORT_COOLDOWN_SECS};

/// Quarantine length class chosen by error classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CooldownKind {
    /// Per-minute rate signals (~60s)
    Short,
    /// Daily/quota signals (~6h)
    Long,
}

impl CooldownKind {
    pub fn default_secs(&self) -> u64 {
        match self {
            CooldownKind::Short => SHORT_COOLDOWN_SECS,
            CooldownKind::Long => LONG_COOLDOWN_SECS,
        }
    }
}

impl std::fmt::Display for CooldownKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CooldownKind::Short => write!(f, "short"),
            CooldownKind::Long => write!(f, "long"),
        }
    }
}

/// Shared registry handle
pub type SharedCooldowns = Arc<CooldownRegistry>;

/// Model-identifier → quarantine-expiry table
#[derive(Debug)]
pub struct CooldownRegistry {
    clock: SharedClock,
    entries: DashMap<String, DateTime<Utc>>,
}

impl CooldownRegistry {
    pub fn new(clock: SharedClock) -> Self {
        Self {
            clock,
            entries: DashMap::new(),
        }
    }

    pub fn shared(clock: SharedClock) -> SharedCooldowns {
        Arc::new(Self::new(clock))
    }

    /// Is the model currently quarantined?
    pub fn is_on_cooldown(&self, model: &str) -> bool {
        match self.entries.get(model) {
            Some(expiry) => self.clock.now() < *expiry,
            None => false,
        }
    }

    /// Quarantine a model for `secs` seconds from now. Never shortens an
    /// existing quarantine.
    pub fn set_cooldown(&self, model: &str, secs: u64) {
        let expiry = self.clock.now() + Duration::seconds(secs.min(i64::MAX as u64) as i64);
        self.entries
            .entry(model.to_string())
            .and_modify(|existing| {
                if expiry > *existing {
                    *existing = expiry;
                }
            })
            .or_insert(expiry);
    }

    /// Remaining quarantine, if any
    pub fn remaining(&self, model: &str) -> Option<Duration> {
        let expiry = self.entries.get(model)?;
        let left = *expiry - self.clock.now();
        (left > Duration::zero()).then_some(left)
    }

    /// Currently quarantined models with their expiries, for logging
    pub fn active(&self) -> Vec<(String, DateTime<Utc>)> {
        let now = self.clock.now();
        self.entries
            .iter()
            .filter(|entry| *entry.value() > now)
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect()
    }
}

// =============================================================================
// Tests
// =============================================================================
