//! AI Dispatch Layer
//!
//! Budget-tracked, multi-model completion dispatch with cooldown-based
//! failover.

pub mod budget;
pub mod clock;
pub mod cooldown;
pub mod dispatch;
pub mod estimate;
pub mod provider;

pub use budget::{BudgetDenial, BudgetLimits, BudgetSnapshot, BudgetTracker, SharedBudget};
pub use clock::{Clock, ManualClock, SharedClock, SystemClock, system_clock};
pub use cooldown::{CooldownKind, CooldownRegistry, SharedCooldowns};
pub use dispatch::{
    DispatchRequest, DispatchSuccess, DispatchTuning, Dispatcher, ModelPreference,
};
pub use provider::{
    CompletionBackend, CompletionRequest, HttpBackend, ProviderReply, SharedBackend,
};
