use serde::{Deserialize, Serialize};

use crate::automation::{RecurringSwapConfig, TriggerCondition};

/// Summary of a confirmed swap, attached to execution events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapReceipt {
    pub signature: String,
    pub input_amount: u64,
    pub output_amount: u64,
    pub price_impact: f64,
}

/// Machine-readable code plus human-readable message of a failure
/// observed at a fire or poll boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventError {
    pub code: String,
    pub message: String,
}

/// Every state transition of the scheduler and trigger monitor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum EngineEvent {
    SwapScheduled(RecurringSwapConfig),
    SwapCancelled { id: String },
    SwapToggled { id: String, enabled: bool },
    SwapExecuting(RecurringSwapConfig),
    SwapExecuted {
        config: RecurringSwapConfig,
        receipt: SwapReceipt,
    },
    SwapFailed {
        config: RecurringSwapConfig,
        error: EventError,
    },
    TriggerSet(TriggerCondition),
    TriggerRemoved { id: String },
    TriggerToggled { id: String, enabled: bool },
    TriggerExecuting(TriggerCondition),
    TriggerExecuted {
        condition: TriggerCondition,
        receipt: Option<SwapReceipt>,
    },
    TriggerFailed {
        condition: TriggerCondition,
        error: EventError,
    },
    TriggerCheckFailed {
        condition: TriggerCondition,
        error: EventError,
    },
    SchedulerStarted,
    SchedulerStopped,
}

impl EngineEvent {
    /// Event name as published to UI and CLI listeners.
    pub fn name(&self) -> &'static str {
        match self {
            Self::SwapScheduled(_) => "swapScheduled",
            Self::SwapCancelled { .. } => "swapCancelled",
            Self::SwapToggled { .. } => "swapToggled",
            Self::SwapExecuting(_) => "swapExecuting",
            Self::SwapExecuted { .. } => "swapExecuted",
            Self::SwapFailed { .. } => "swapFailed",
            Self::TriggerSet(_) => "triggerSet",
            Self::TriggerRemoved { .. } => "triggerRemoved",
            Self::TriggerToggled { .. } => "triggerToggled",
            Self::TriggerExecuting(_) => "triggerExecuting",
            Self::TriggerExecuted { .. } => "triggerExecuted",
            Self::TriggerFailed { .. } => "triggerFailed",
            Self::TriggerCheckFailed { .. } => "triggerCheckFailed",
            Self::SchedulerStarted => "schedulerStarted",
            Self::SchedulerStopped => "schedulerStopped",
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Self::SwapFailed { .. } | Self::TriggerFailed { .. } | Self::TriggerCheckFailed { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serializes_with_tag() {
        let event = EngineEvent::SwapToggled {
            id: "swap_1".to_string(),
            enabled: false,
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["event"], "swapToggled");
        assert_eq!(value["id"], "swap_1");
        assert_eq!(event.name(), "swapToggled");
        assert!(!event.is_failure());
    }
}
