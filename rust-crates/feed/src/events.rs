use chrono::DateTime;
use ethers::types::{
    Address,
    TxHash,
    U256,
};
use serde::{
    Deserialize,
    Serialize,
};

/// A decoded, enriched event observed on the Lucky6 contract.
#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub enum FeedEvent {
    Roll(RollEvent),
    Winner(WinnerEvent),
}

/// One dice roll paid for by a player. `amount` is the stake in whole-coin
/// units; `roll` is the outcome rendered as an uppercase hex digit string.
#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct RollEvent {
    pub player: Address,
    pub amount: f64,
    pub roll: String,
    pub block_number: u64,
    pub transaction_hash: TxHash,
    pub timestamp: String,
}

/// A prize payout. `amount` stays in base units.
#[derive(PartialEq, Eq, Debug, Clone, Serialize, Deserialize)]
pub struct WinnerEvent {
    pub winner: Address,
    pub amount: U256,
    pub block_number: u64,
    pub transaction_hash: TxHash,
    pub timestamp: String,
}

impl RollEvent {
    pub fn new(
        player: Address,
        amount: U256,
        roll: U256,
        block_number: u64,
        transaction_hash: TxHash,
        timestamp: Option<U256>,
    ) -> Self {
        Self {
            player,
            amount: base_units_to_coins(amount),
            roll: format!("{roll:x}").to_uppercase(),
            block_number,
            transaction_hash,
            timestamp: render_timestamp(timestamp),
        }
    }
}

impl WinnerEvent {
    pub fn new(
        winner: Address,
        amount: U256,
        block_number: u64,
        transaction_hash: TxHash,
        timestamp: Option<U256>,
    ) -> Self {
        Self {
            winner,
            amount,
            block_number,
            transaction_hash,
            timestamp: render_timestamp(timestamp),
        }
    }
}

/// Convert a base-unit amount to whole coins using the chain's fixed
/// 18-decimal scale.
pub fn base_units_to_coins(amount: U256) -> f64 {
    if amount.bits() > 128 {
        return f64::MAX;
    }
    amount.low_u128() as f64 / 1e18
}

fn render_timestamp(timestamp: Option<U256>) -> String {
    timestamp
        .and_then(|ts| i64::try_from(ts.low_u64()).ok())
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .map(|datetime| datetime.to_rfc3339())
        .unwrap_or_else(|| "N/A".to_string())
}
