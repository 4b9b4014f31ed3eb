use axum::{extract::State, Json};
use serde::Serialize;

use super::AdminState;
use crate::reconciler::{CycleReport, JournalEntry, LoopStatus};

#[derive(Debug, Serialize)]
pub struct LoopSummary {
    pub pending: usize,
    pub last_cycle: Option<CycleReport>,
}

#[derive(Debug, Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub uptime_secs: u64,
    pub accounts: LoopSummary,
    pub funds: LoopSummary,
    pub journal_entries: usize,
}

#[derive(Debug, Serialize)]
pub struct PendingSets {
    pub accounts: LoopStatus,
    pub funds: LoopStatus,
}

#[derive(Debug, Serialize)]
pub struct JournalRecord {
    pub request_id: u64,
    #[serde(flatten)]
    pub entry: JournalEntry,
}

pub async fn get_status(State(state): State<AdminState>) -> Json<SystemStatus> {
    let handle = &state.reconciler;
    let accounts = handle.accounts.borrow().clone();
    let funds = handle.funds.borrow().clone();

    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        uptime_secs: handle.uptime().as_secs(),
        accounts: LoopSummary {
            pending: accounts.pending.len(),
            last_cycle: accounts.last_cycle,
        },
        funds: LoopSummary {
            pending: funds.pending.len(),
            last_cycle: funds.last_cycle,
        },
        journal_entries: handle.journal.count(),
    })
}

pub async fn get_pending(State(state): State<AdminState>) -> Json<PendingSets> {
    let handle = &state.reconciler;
    let accounts = handle.accounts.borrow().clone();
    let funds = handle.funds.borrow().clone();
    Json(PendingSets { accounts, funds })
}

pub async fn get_journal(State(state): State<AdminState>) -> Json<Vec<JournalRecord>> {
    let records = state
        .reconciler
        .journal
        .entries()
        .into_iter()
        .map(|(request_id, entry)| JournalRecord { request_id, entry })
        .collect();
    Json(records)
}

#[cfg(test)]
mod tests {
    use super::super::{setup_admin_router, AdminState};
    use crate::blockchain::{Address, TxKind};
    use crate::reconciler::{JournalEntry, LoopStatus, ReconcilerHandle, SubmissionJournal};
    use crate::requests::Candidate;
    use std::time::Instant;
    use tokio::sync::watch;

    async fn spawn_admin() -> (String, watch::Sender<LoopStatus>, SubmissionJournal) {
        let (accounts_tx, accounts_rx) = watch::channel(LoopStatus::default());
        let (_funds_tx, funds_rx) = watch::channel(LoopStatus::default());
        let journal = SubmissionJournal::new(None);

        let state = AdminState {
            reconciler: ReconcilerHandle {
                accounts: accounts_rx,
                funds: funds_rx,
                journal: journal.clone(),
                started_at: Instant::now(),
            },
            api_key: "secret".into(),
        };

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, setup_admin_router(state)).await.unwrap();
        });

        (format!("http://{}", addr), accounts_tx, journal)
    }

    #[tokio::test]
    async fn test_requires_bearer_token() {
        let (base, _accounts, _journal) = spawn_admin().await;
        let client = reqwest::Client::new();

        let resp = client.get(format!("{}/admin/status", base)).send().await.unwrap();
        assert_eq!(resp.status(), 401);

        let resp = client
            .get(format!("{}/admin/status", base))
            .bearer_auth("wrong")
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 401);
    }

    #[tokio::test]
    async fn test_pending_and_journal_reflect_state() {
        let (base, accounts, journal) = spawn_admin().await;
        accounts.send_replace(LoopStatus {
            pending: vec![Candidate { id: 9, address: Address([9; 64]) }],
            last_cycle: None,
        });
        journal.record(
            12,
            JournalEntry {
                kind: TxKind::FundsTransfer,
                target: Address([1; 64]),
                tx_hash: None,
                amount: 30,
                submitted_at: 1_700_000_000,
            },
        );
        let client = reqwest::Client::new();

        let pending: serde_json::Value = client
            .get(format!("{}/admin/pending", base))
            .bearer_auth("secret")
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(pending["accounts"]["pending"][0]["id"], 9);
        assert!(pending["accounts"]["last_cycle"].is_null());
        assert_eq!(pending["funds"]["pending"].as_array().unwrap().len(), 0);

        let journal: serde_json::Value = client
            .get(format!("{}/admin/journal", base))
            .bearer_auth("secret")
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(journal[0]["request_id"], 12);
        assert_eq!(journal[0]["kind"], "funds_transfer");
        assert_eq!(journal[0]["amount"], 30);

        let status: serde_json::Value = client
            .get(format!("{}/admin/status", base))
            .bearer_auth("secret")
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(status["accounts"]["pending"], 1);
        assert_eq!(status["journal_entries"], 1);
    }
}
