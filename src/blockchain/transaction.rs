//! Transaction building.
//!
//! # Responsibilities
//! - Build account-creation transactions naming the issuer as fee payer
//! - Build funds transactions with a nonce derived from a fresh issuer query
//! - Keep nonces strictly increasing across transfers in one cycle

use std::sync::Arc;

use crate::blockchain::types::{Address, ChainAccount, TxHash, TxKind};
use crate::blockchain::wallet::{Wallet, SIGNATURE_LEN};
use crate::config::ChainConfig;

/// A transaction that has not been signed yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnsignedTx {
    /// Create `target` as a new account, paid for by `issuer`.
    AccountCreate {
        target: Address,
        issuer: Address,
        header: u8,
        fee: u64,
    },
    /// Move `amount` from `from` to `to`.
    FundsTransfer {
        from: Address,
        to: Address,
        amount: u64,
        fee: u64,
        nonce: u64,
        header: u8,
    },
}

impl UnsignedTx {
    pub fn kind(&self) -> TxKind {
        match self {
            UnsignedTx::AccountCreate { .. } => TxKind::AccountCreate,
            UnsignedTx::FundsTransfer { .. } => TxKind::FundsTransfer,
        }
    }

    /// The account this transaction creates or pays into.
    pub fn target(&self) -> Address {
        match self {
            UnsignedTx::AccountCreate { target, .. } => *target,
            UnsignedTx::FundsTransfer { to, .. } => *to,
        }
    }
}

/// A transaction hash together with the issuer's signature over it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    pub hash: TxHash,
    pub signature: [u8; SIGNATURE_LEN],
    pub kind: TxKind,
}

/// Transaction builder for the issuer account.
#[derive(Debug, Clone)]
pub struct TxBuilder {
    wallet: Arc<Wallet>,
    fee: u64,
    header: u8,
}

impl TxBuilder {
    /// Create a new transaction builder.
    pub fn new(wallet: Arc<Wallet>, config: &ChainConfig) -> Self {
        Self {
            wallet,
            fee: config.fee,
            header: config.header,
        }
    }

    /// Zero-value creation of `target`, signed and paid for by the issuer.
    pub fn build_account_create(&self, target: Address) -> UnsignedTx {
        UnsignedTx::AccountCreate {
            target,
            issuer: self.wallet.address(),
            header: self.header,
            fee: self.fee,
        }
    }

    /// Transfer `amount` from the issuer to `target`.
    ///
    /// `source` must be the issuer account as queried immediately before this
    /// call; its `tx_count` seeds the nonce.
    pub fn build_funds_transfer(&self, source: &ChainAccount, target: Address, amount: u64) -> UnsignedTx {
        let nonce = self.wallet.reserve_nonce(source.tx_count);

        tracing::debug!(
            target = %target,
            amount = amount,
            chain_tx_count = source.tx_count,
            nonce = nonce,
            "Built funds transaction"
        );

        UnsignedTx::FundsTransfer {
            from: self.wallet.address(),
            to: target,
            amount,
            fee: self.fee,
            nonce,
            header: self.header,
        }
    }

    /// Return the nonce of a transaction the chain did not accept.
    pub fn release(&self, tx: &UnsignedTx) {
        if let UnsignedTx::FundsTransfer { nonce, .. } = tx {
            self.wallet.release_nonce(*nonce);
        }
    }

    /// Start a new cycle of nonce tracking.
    pub fn begin_cycle(&self) {
        self.wallet.reset_nonce();
    }

    /// Get the issuer address.
    pub fn issuer(&self) -> Address {
        self.wallet.address()
    }
}
