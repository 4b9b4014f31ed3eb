//! Blockchain integration subsystem.
//!
//! # Data Flow
//! ```text
//! Key file (public X/Y, private scalar)
//!     → wallet.rs (key loading, signing, nonce tracking)
//!     → client.rs (light client REST calls with timeouts)
//!     → transaction.rs (build account-creation / funds transactions)
//!     → submitter.rs (local signing or delegated tool)
//! ```
//!
//! # Security Constraints
//! - Private keys ONLY from the key file named at startup
//! - Never log private keys or signatures
//! - All node calls have configurable timeouts

pub mod client;
pub mod submitter;
pub mod transaction;
pub mod types;
pub mod wallet;

pub use client::{ChainQuery, HttpChainClient};
pub use submitter::{build_submitter, DelegatedSubmitter, LocalSubmitter, Submitter};
pub use transaction::{SignedTransaction, TxBuilder, UnsignedTx};
pub use types::{Address, BlockchainError, BlockchainResult, ChainAccount, TxHash, TxKind, TxReceipt};
pub use wallet::Wallet;
