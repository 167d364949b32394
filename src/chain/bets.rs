//! Bet placement and resolution through a wallet.
//!
//! A bet is an on-chain transaction first and a local record second: the
//! record is only written after the transaction commits, and a failure to
//! write it is logged without failing the bet.

use rust_decimal::prelude::*;
use rust_decimal_macros::dec;
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

use super::client::ChainClient;
use super::wallet::{EntryFunctionPayload, Wallet};
use crate::storage::{JsonStore, SharedStore};
use crate::types::{now_ms, BetDirection, BetRecord, BetStatus, XenithError};

/// Octas per APT.
pub const OCTAS_PER_APT: Decimal = dec!(100_000_000);

/// Convert an APT amount to octas, rounded half away from zero, as a
/// decimal string.
pub fn apt_to_octas(apt: f64) -> Result<String, XenithError> {
    if !apt.is_finite() || apt < 0.0 {
        return Err(XenithError::InvalidInput(format!("invalid APT amount {apt}")));
    }
    let octas = Decimal::from_f64(apt)
        .and_then(|d| d.checked_mul(OCTAS_PER_APT))
        .ok_or_else(|| XenithError::InvalidInput(format!("APT amount {apt} out of range")))?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    Ok(octas.normalize().to_string())
}

pub struct BetService {
    wallet: Arc<dyn Wallet>,
    chain: Arc<ChainClient>,
    store: SharedStore,
}

impl BetService {
    pub fn new(wallet: Arc<dyn Wallet>, chain: Arc<ChainClient>, store: SharedStore) -> Self {
        Self { wallet, chain, store }
    }

    pub async fn connect(&self) -> Result<String, XenithError> {
        let address = self.wallet.connect().await?;
        info!(address = %address, "Wallet connected");
        Ok(address)
    }

    async fn require_account(&self) -> Result<String, XenithError> {
        self.wallet.account().await?.ok_or(XenithError::NoWallet)
    }

    async fn submit(&self, function: &str, arguments: Vec<serde_json::Value>) -> Result<String, XenithError> {
        let payload = EntryFunctionPayload::new(self.chain.function_id(function), arguments);
        let hash = self.wallet.sign_and_submit(payload).await?;
        info!(function, hash = %hash, "Transaction submitted");
        self.chain.wait_for_transaction(&hash).await?;
        Ok(hash)
    }

    /// Stake `apt_amount` on sentiment moving in `direction`.
    pub async fn place_bet(
        &self,
        direction: BetDirection,
        apt_amount: f64,
        entry_sentiment: u8,
    ) -> Result<BetRecord, XenithError> {
        let address = self.require_account().await?;
        let octas = apt_to_octas(apt_amount)?;
        if octas == "0" {
            return Err(XenithError::InvalidInput("bet amount must be positive".into()));
        }

        let tx_hash = self
            .submit(
                "place_sentiment_bet",
                vec![json!(u8::from(direction)), json!(octas)],
            )
            .await?;

        let created_at = now_ms();
        let record = BetRecord {
            id: format!("{address}-{created_at}"),
            address,
            direction,
            amount_octas: octas,
            entry_sentiment,
            created_at,
            tx_hash,
            status: BetStatus::Active,
            resolved_at: None,
            won: None,
            payout_octas: None,
        };

        let saved = record.clone();
        if let Err(e) = self.store.run(move |s| s.save_bet(&saved)).await {
            warn!(id = %record.id, error = %e, "Bet placed but not recorded");
        }
        info!(bet = %record, "Bet placed");
        Ok(record)
    }

    /// Resolve the caller's open bet and mark their latest active record
    /// resolved. Returns the transaction hash.
    pub async fn resolve_bet(&self) -> Result<String, XenithError> {
        let address = self.require_account().await?;
        let tx_hash = self.submit("resolve_bet", vec![]).await?;

        let (addr, hash) = (address.clone(), tx_hash.clone());
        if let Err(e) = self.store.run(move |s| mark_resolved(s, &addr, &hash)).await {
            warn!(address = %address, error = %e, "Bet resolved but record not updated");
        }
        Ok(tx_hash)
    }
}

/// Mark `address`'s latest active record resolved by `tx_hash`.
fn mark_resolved(store: &JsonStore, address: &str, tx_hash: &str) -> anyhow::Result<()> {
    let records = store.read_bets()?.records();
    let Some(last) = records
        .iter()
        .rev()
        .find(|b| b.address == address && b.status == BetStatus::Active)
    else {
        info!(address, "No active bet record to resolve");
        return Ok(());
    };

    store.upsert_bet(json!({
        "id": last.id,
        "status": BetStatus::Resolved,
        "resolvedAt": now_ms(),
        "txHash": tx_hash,
    }))?;
    info!(id = %last.id, "Bet record resolved");
    Ok(())
}
