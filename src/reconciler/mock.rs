//! In-memory collaborators for reconciler tests.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::blockchain::wallet::tests::test_signing_key;
use crate::blockchain::{
    Address, BlockchainError, BlockchainResult, ChainAccount, ChainQuery, Submitter, TxBuilder,
    TxHash, TxReceipt, UnsignedTx, Wallet,
};
use crate::config::ChainConfig;
use crate::reconciler::journal::SubmissionJournal;
use crate::reconciler::runner::Collaborators;
use crate::requests::{
    select_candidates, Candidate, FundingRequest, RequestResult, RequestService,
    RequestServiceError, RequestStatus,
};

/// Request service keeping requests in memory.
///
/// Pushes update the stored status, so a pushed request moves to the next
/// summary just like on the real service.
#[derive(Clone, Default)]
pub struct MockRequestService {
    requests: Arc<Mutex<BTreeMap<u64, FundingRequest>>>,
    pushes: Arc<Mutex<Vec<(u64, RequestStatus)>>>,
    failing_pushes: Arc<Mutex<HashMap<u64, usize>>>,
    fetched_overrides: Arc<Mutex<HashMap<u64, RequestStatus>>>,
    summary_down: Arc<AtomicBool>,
}

impl MockRequestService {
    pub fn add_request(&self, request: FundingRequest) {
        self.requests.lock().unwrap().insert(request.id, request);
    }

    pub fn status_of(&self, id: u64) -> Option<RequestStatus> {
        self.requests.lock().unwrap().get(&id).map(|r| r.status)
    }

    pub fn set_status(&self, id: u64, status: RequestStatus) {
        if let Some(request) = self.requests.lock().unwrap().get_mut(&id) {
            request.status = status;
        }
    }

    /// All pushes in order, including failed ones.
    pub fn pushes(&self) -> Vec<(u64, RequestStatus)> {
        self.pushes.lock().unwrap().clone()
    }

    /// Make the next `times` pushes for `id` fail.
    pub fn fail_pushes(&self, id: u64, times: usize) {
        self.failing_pushes.lock().unwrap().insert(id, times);
    }

    /// Make `fetch_status` report `status` for `id` while the summary still
    /// shows the stored one.
    pub fn override_fetched_status(&self, id: u64, status: RequestStatus) {
        self.fetched_overrides.lock().unwrap().insert(id, status);
    }

    pub fn set_summary_down(&self, down: bool) {
        self.summary_down.store(down, Ordering::SeqCst);
    }
}

#[async_trait]
impl RequestService for MockRequestService {
    async fn fetch_summary(&self, status: RequestStatus) -> RequestResult<Vec<Candidate>> {
        if self.summary_down.load(Ordering::SeqCst) {
            return Err(RequestServiceError::Unavailable("summary down".to_string()));
        }
        let entries = self
            .requests
            .lock()
            .unwrap()
            .values()
            .map(|r| serde_json::to_value(r).unwrap())
            .collect();
        Ok(select_candidates(entries, status))
    }

    async fn fetch_status(&self, id: u64) -> RequestResult<FundingRequest> {
        let mut request = self
            .requests
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or_else(|| RequestServiceError::Unavailable(format!("no request {}", id)))?;
        if let Some(status) = self.fetched_overrides.lock().unwrap().get(&id) {
            request.status = *status;
        }
        Ok(request)
    }

    async fn push_status(&self, id: u64, status: RequestStatus) -> RequestResult<()> {
        self.pushes.lock().unwrap().push((id, status));

        let mut failing = self.failing_pushes.lock().unwrap();
        if let Some(remaining) = failing.get_mut(&id) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(RequestServiceError::StatusUpdateFailed {
                    id,
                    status,
                    reason: "injected failure".to_string(),
                });
            }
        }
        drop(failing);

        self.set_status(id, status);
        Ok(())
    }
}

/// Chain keeping accounts in memory.
#[derive(Clone, Default)]
pub struct MockChain {
    accounts: Arc<Mutex<HashMap<Address, ChainAccount>>>,
    down: Arc<AtomicBool>,
}

impl MockChain {
    pub fn add_account(&self, address: Address, tx_count: u64) {
        self.accounts.lock().unwrap().insert(
            address,
            ChainAccount {
                address: address.to_hex(),
                balance: 1_000_000,
                tx_count,
                is_created: true,
                is_root: false,
            },
        );
    }

    pub fn has_account(&self, address: &Address) -> bool {
        self.accounts.lock().unwrap().contains_key(address)
    }

    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }
}

#[async_trait]
impl ChainQuery for MockChain {
    async fn fetch_account(&self, address: &Address) -> BlockchainResult<Option<ChainAccount>> {
        if self.down.load(Ordering::SeqCst) {
            return Err(BlockchainError::ChainUnavailable("node down".to_string()));
        }
        Ok(self.accounts.lock().unwrap().get(address).cloned())
    }
}

/// Submitter recording every transaction.
///
/// With `create_accounts`, accepted account creations appear on the linked
/// chain immediately.
#[derive(Clone, Default)]
pub struct MockSubmitter {
    submitted: Arc<Mutex<Vec<UnsignedTx>>>,
    reject: Arc<AtomicBool>,
    chain: Option<MockChain>,
}

impl MockSubmitter {
    pub fn create_accounts(chain: MockChain) -> Self {
        Self {
            chain: Some(chain),
            ..Self::default()
        }
    }

    pub fn submitted(&self) -> Vec<UnsignedTx> {
        self.submitted.lock().unwrap().clone()
    }

    pub fn set_reject(&self, reject: bool) {
        self.reject.store(reject, Ordering::SeqCst);
    }
}

#[async_trait]
impl Submitter for MockSubmitter {
    async fn submit(&self, tx: &UnsignedTx) -> BlockchainResult<TxReceipt> {
        if self.reject.load(Ordering::SeqCst) {
            return Err(BlockchainError::SubmissionRejected {
                kind: tx.kind(),
                code: 500,
                reason: "rejected by mock".to_string(),
            });
        }

        let mut submitted = self.submitted.lock().unwrap();
        submitted.push(tx.clone());
        let hash = TxHash([submitted.len() as u8; 32]);
        drop(submitted);

        if let (Some(chain), UnsignedTx::AccountCreate { target, .. }) = (&self.chain, tx) {
            chain.add_account(*target, 0);
        }

        Ok(TxReceipt {
            kind: tx.kind(),
            hash: Some(hash),
        })
    }

    fn strategy(&self) -> &'static str {
        "mock"
    }
}

/// Mocks wired into a [`Collaborators`].
pub struct Harness {
    pub requests: MockRequestService,
    pub chain: MockChain,
    pub submitter: MockSubmitter,
    pub issuer: Address,
    pub ctx: Collaborators,
}

impl Harness {
    /// Issuer account exists on chain with `issuer_tx_count` transactions.
    pub fn new(issuer_tx_count: u64) -> Self {
        let requests = MockRequestService::default();
        let chain = MockChain::default();
        let submitter = MockSubmitter::default();
        Self::with(requests, chain, submitter, issuer_tx_count)
    }

    pub fn with(
        requests: MockRequestService,
        chain: MockChain,
        submitter: MockSubmitter,
        issuer_tx_count: u64,
    ) -> Self {
        let wallet = Arc::new(Wallet::from_signing_key(test_signing_key()));
        let issuer = wallet.address();
        chain.add_account(issuer, issuer_tx_count);

        let ctx = Collaborators {
            requests: Arc::new(requests.clone()),
            chain: Arc::new(chain.clone()),
            submitter: Arc::new(submitter.clone()),
            builder: TxBuilder::new(wallet, &ChainConfig::default()),
            journal: SubmissionJournal::new(None),
        };

        Self {
            requests,
            chain,
            submitter,
            issuer,
            ctx,
        }
    }
}

/// 128-hex-character key derived from `seed`.
pub fn key_hex(seed: u8) -> String {
    hex::encode([seed; 64])
}

pub fn request(id: u64, seed: u8, amount: u64, status: RequestStatus) -> FundingRequest {
    FundingRequest {
        id,
        user_id: id,
        public_key: key_hex(seed),
        amount,
        status,
        max_amount: 0,
        token: String::new(),
        app_id: "app".to_string(),
    }
}
