//! Issuer key material, transaction signing and nonce tracking.
//!
//! # Security
//! - Private keys are loaded ONLY from the key file given at startup
//! - Keys are never logged or serialized
//!
//! # Key file format
//! ```text
//! <public X coordinate, hex>
//! <public Y coordinate, hex>
//! <private scalar, hex>        (optional for the delegated strategy)
//! ```
//! Values may omit leading zeros.

use p256::ecdsa::signature::hazmat::PrehashSigner;
use p256::ecdsa::{Signature, SigningKey};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::blockchain::types::{Address, BlockchainError, BlockchainResult, TxHash, ADDRESS_LEN};

/// Length of an encoded signature: r‖s, 32 bytes each.
pub const SIGNATURE_LEN: usize = 64;

const COORDINATE_LEN: usize = 32;

/// Issuer wallet: address, optional signing key, and the per-cycle nonce counter.
pub struct Wallet {
    address: Address,
    signer: Option<SigningKey>,
    /// Next nonce to hand out for funds transactions.
    nonce: Arc<AtomicU64>,
}

impl Wallet {
    /// Load a wallet from a key file.
    ///
    /// With `require_private_key` the third line must be present and must
    /// match the public coordinates.
    pub fn from_key_file(path: &Path, require_private_key: bool) -> BlockchainResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            BlockchainError::KeyFile(format!("cannot read {}: {}", path.display(), e))
        })?;
        let wallet = Self::from_key_material(&content, require_private_key)?;

        tracing::info!(
            address = %wallet.address,
            can_sign = wallet.can_sign(),
            "Wallet initialized"
        );

        Ok(wallet)
    }

    /// Parse key file contents.
    pub fn from_key_material(content: &str, require_private_key: bool) -> BlockchainResult<Self> {
        let lines: Vec<&str> = content
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect();

        if lines.len() < 2 {
            return Err(BlockchainError::KeyFile(
                "expected at least two lines (public X and Y)".to_string(),
            ));
        }

        let mut public_key = [0u8; ADDRESS_LEN];
        public_key[..COORDINATE_LEN].copy_from_slice(&parse_coordinate(lines[0], "public X")?);
        public_key[COORDINATE_LEN..].copy_from_slice(&parse_coordinate(lines[1], "public Y")?);

        let signer = match lines.get(2) {
            Some(line) => {
                let scalar = parse_coordinate(line, "private key")?;
                let signer = SigningKey::from_slice(&scalar)
                    .map_err(|_| BlockchainError::KeyFile("invalid private scalar".to_string()))?;

                let encoded = signer.verifying_key().to_encoded_point(false);
                // Uncompressed SEC1 point: 0x04 ‖ X ‖ Y
                if encoded.as_bytes().get(1..) != Some(&public_key[..]) {
                    return Err(BlockchainError::KeyFile(
                        "private key does not match public key".to_string(),
                    ));
                }
                Some(signer)
            }
            None if require_private_key => {
                return Err(BlockchainError::KeyFile(
                    "private key line missing; required for local signing".to_string(),
                ));
            }
            None => None,
        };

        Ok(Self {
            address: Address::from_public_key(&public_key),
            signer,
            nonce: Arc::new(AtomicU64::new(0)),
        })
    }

    /// Create a wallet directly from a signing key.
    pub fn from_signing_key(signer: SigningKey) -> Self {
        let encoded = signer.verifying_key().to_encoded_point(false);
        let mut public_key = [0u8; ADDRESS_LEN];
        public_key.copy_from_slice(&encoded.as_bytes()[1..]);

        Self {
            address: Address::from_public_key(&public_key),
            signer: Some(signer),
            nonce: Arc::new(AtomicU64::new(0)),
        }
    }

    /// The issuer's chain address.
    pub fn address(&self) -> Address {
        self.address
    }

    /// Whether a private key was loaded.
    pub fn can_sign(&self) -> bool {
        self.signer.is_some()
    }

    /// Sign a transaction hash.
    ///
    /// Returns r‖s, each a 32-byte big-endian integer left-padded with zeros.
    pub fn sign_hash(&self, hash: &TxHash) -> BlockchainResult<[u8; SIGNATURE_LEN]> {
        let signer = self
            .signer
            .as_ref()
            .ok_or_else(|| BlockchainError::Signing("wallet has no private key".to_string()))?;

        let signature: Signature = signer
            .sign_prehash(&hash.0)
            .map_err(|e| BlockchainError::Signing(format!("signing failed: {}", e)))?;

        let mut out = [0u8; SIGNATURE_LEN];
        out.copy_from_slice(&signature.to_bytes());
        Ok(out)
    }

    /// Forget locally issued nonces; called at the start of every funds cycle.
    pub fn reset_nonce(&self) {
        self.nonce.store(0, Ordering::SeqCst);
    }

    /// Reserve the next nonce given the issuer's freshly queried `tx_count`.
    ///
    /// Within one cycle successive reservations are strictly increasing even
    /// when the chain has not yet counted the earlier transactions.
    pub fn reserve_nonce(&self, chain_tx_count: u64) -> u64 {
        self.nonce.fetch_max(chain_tx_count, Ordering::SeqCst);
        self.nonce.fetch_add(1, Ordering::SeqCst)
    }

    /// Give back a nonce whose transaction was not accepted.
    ///
    /// Only the most recent reservation can be released.
    pub fn release_nonce(&self, nonce: u64) {
        let _ = self
            .nonce
            .compare_exchange(nonce + 1, nonce, Ordering::SeqCst, Ordering::SeqCst);
    }

    /// Get current nonce without incrementing.
    pub fn current_nonce(&self) -> u64 {
        self.nonce.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for Wallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wallet")
            .field("address", &self.address)
            .field("can_sign", &self.can_sign())
            .field("nonce", &self.current_nonce())
            .finish()
    }
}

fn parse_coordinate(line: &str, what: &str) -> BlockchainResult<[u8; COORDINATE_LEN]> {
    let hex_str = line.strip_prefix("0x").unwrap_or(line);
    if hex_str.is_empty() || hex_str.len() > COORDINATE_LEN * 2 {
        return Err(BlockchainError::KeyFile(format!("{} has invalid length", what)));
    }

    let padded = format!("{:0>width$}", hex_str, width = COORDINATE_LEN * 2);
    let mut out = [0u8; COORDINATE_LEN];
    hex::decode_to_slice(&padded, &mut out)
        .map_err(|e| BlockchainError::KeyFile(format!("{} is not valid hex: {}", what, e)))?;
    Ok(out)
}
