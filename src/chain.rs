//! Boundary to the presale contract. Implementations live outside this crate
//! (or in [`crate::simulated`] for tests).

use crate::amount::Amount;
use color_eyre::eyre::Result;
use std::future::Future;

/// Point-in-time reads of contract and ledger state.
pub trait ChainReader: Send + Sync + 'static {
    /// Raw phase index as stored by the contract.
    fn phase(&self) -> impl Future<Output = Result<u64>> + Send;

    /// Decimal string of the native currency held by the contract.
    fn total_deposited(&self) -> impl Future<Output = Result<String>> + Send;

    fn user_deposited(&self, address: &str) -> impl Future<Output = Result<String>> + Send;

    fn user_token_balance(
        &self,
        address: &str,
    ) -> impl Future<Output = Result<String>> + Send;

    fn airdrop_completed(&self) -> impl Future<Output = Result<bool>> + Send;

    fn claimed(&self, address: &str) -> impl Future<Output = Result<bool>> + Send;

    /// Seconds remaining in the whitelist window.
    fn countdown(&self) -> impl Future<Output = Result<u64>> + Send;

    /// Hex encoded smallest-unit balance of `address`.
    fn native_balance(&self, address: &str) -> impl Future<Output = Result<String>> + Send;
}

/// Result reported by the contract call layer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxReceipt {
    pub success: bool,
    pub message: String,
}

impl TxReceipt {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// State-changing contract calls.
pub trait TransactionExecutor: Send + Sync + 'static {
    fn deposit(
        &self,
        amount: Amount,
        address: &str,
    ) -> impl Future<Output = Result<TxReceipt>> + Send;

    fn withdraw_all(&self, address: &str) -> impl Future<Output = Result<TxReceipt>> + Send;

    fn seed_liquidity(
        &self,
        address: &str,
    ) -> impl Future<Output = Result<TxReceipt>> + Send;

    fn claim_tokens(&self, address: &str) -> impl Future<Output = Result<TxReceipt>> + Send;

    fn airdrop_all(&self) -> impl Future<Output = Result<TxReceipt>> + Send;
}
