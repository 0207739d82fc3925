pub mod automation;
pub mod events;

pub use automation::{
    ActionParameters, ComparisonOperator, NewRecurringSwap, NewTrigger, RecurringSwapConfig,
    TriggerAction, TriggerCondition, TriggerKind,
};
pub use events::{EngineEvent, EventError, SwapReceipt};
