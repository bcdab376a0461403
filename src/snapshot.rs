use crate::{
    amount::Amount,
    phase::PresalePhase,
};
use serde::{
    Deserialize,
    Serialize,
};

/// Local mirror of the presale contract, populated from a single
/// synchronization pass.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub phase: PresalePhase,
    pub wallet_balance: Amount,
    pub contract_total_deposited: Amount,
    pub user_deposited: Amount,
    pub user_token_balance: Amount,
    pub airdrop_completed: bool,
    pub user_claimed: bool,
    pub countdown_seconds: u64,
}

impl Snapshot {
    /// Snapshot used while no wallet is connected. Per-user and quantitative
    /// fields are zeroed; the global fields are carried over.
    pub fn disconnected(
        phase: PresalePhase,
        countdown_seconds: u64,
        airdrop_completed: bool,
    ) -> Self {
        Self {
            phase,
            countdown_seconds,
            airdrop_completed,
            ..Self::default()
        }
    }

    /// Wallet balance rounded for display. Never compare on this value.
    pub fn wallet_balance_display(&self, decimals: u32) -> String {
        self.wallet_balance.display_rounded(decimals)
    }
}
