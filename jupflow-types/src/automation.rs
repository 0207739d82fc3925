use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;

/// A swap bound to a cron schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurringSwapConfig {
    pub id: String,
    pub cron_schedule: String,
    pub input_asset: String,
    pub output_asset: String,
    /// Amount in the input asset's smallest unit.
    pub amount: u64,
    #[serde(with = "pubkey_string")]
    pub owner_account: Pubkey,
    pub enabled: bool,
    pub max_slippage_bps: u16,
    pub created_at: DateTime<Utc>,
    pub last_executed_at: Option<DateTime<Utc>>,
}

/// Registration request for a recurring swap; id and timestamps are
/// assigned by the scheduler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRecurringSwap {
    pub cron_schedule: String,
    pub input_asset: String,
    pub output_asset: String,
    pub amount: u64,
    #[serde(with = "pubkey_string")]
    pub owner_account: Pubkey,
    pub enabled: bool,
    pub max_slippage_bps: Option<u16>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerKind {
    Price,
    Balance,
    Time,
    Custom,
}

impl fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Price => write!(f, "price"),
            Self::Balance => write!(f, "balance"),
            Self::Time => write!(f, "time"),
            Self::Custom => write!(f, "custom"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComparisonOperator {
    Gt,
    Lt,
    Eq,
    Gte,
    Lte,
}

impl ComparisonOperator {
    /// Compares an observed value against a threshold.
    pub fn holds(self, observed: f64, threshold: f64) -> bool {
        match self {
            Self::Gt => observed > threshold,
            Self::Lt => observed < threshold,
            Self::Eq => observed == threshold,
            Self::Gte => observed >= threshold,
            Self::Lte => observed <= threshold,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerAction {
    Swap,
    Sell,
    Buy,
    Notify,
}

impl fmt::Display for TriggerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Swap => write!(f, "swap"),
            Self::Sell => write!(f, "sell"),
            Self::Buy => write!(f, "buy"),
            Self::Notify => write!(f, "notify"),
        }
    }
}

/// Parameters for the action a trigger performs.
///
/// `sell` spends the watched asset when `input_asset` is absent and `buy`
/// acquires the watched asset when `output_asset` is absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionParameters {
    pub input_asset: Option<String>,
    pub output_asset: Option<String>,
    pub amount: Option<u64>,
    #[serde(default, with = "option_pubkey_string")]
    pub owner: Option<Pubkey>,
    pub slippage_bps: Option<u16>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerCondition {
    pub id: String,
    pub kind: TriggerKind,
    pub watched_asset: Option<String>,
    pub operator: ComparisonOperator,
    /// Price, balance in smallest units, or unix milliseconds for `time`.
    pub threshold: f64,
    pub action: TriggerAction,
    pub action_parameters: ActionParameters,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTrigger {
    pub kind: TriggerKind,
    pub watched_asset: Option<String>,
    pub operator: ComparisonOperator,
    pub threshold: f64,
    pub action: TriggerAction,
    #[serde(default)]
    pub action_parameters: ActionParameters,
    pub enabled: bool,
}

mod pubkey_string {
    use std::str::FromStr;

    use serde::{de::Error, Deserialize, Deserializer, Serializer};
    use solana_sdk::pubkey::Pubkey;

    pub fn serialize<S: Serializer>(key: &Pubkey, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&key.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Pubkey, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Pubkey::from_str(&raw).map_err(D::Error::custom)
    }
}

mod option_pubkey_string {
    use std::str::FromStr;

    use serde::{de::Error, Deserialize, Deserializer, Serializer};
    use solana_sdk::pubkey::Pubkey;

    pub fn serialize<S: Serializer>(
        key: &Option<Pubkey>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match key {
            Some(key) => serializer.serialize_some(&key.to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Pubkey>, D::Error> {
        Option::<String>::deserialize(deserializer)?
            .map(|raw| Pubkey::from_str(&raw).map_err(D::Error::custom))
            .transpose()
    }
}
