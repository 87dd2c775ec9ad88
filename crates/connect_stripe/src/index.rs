// --- File: crates/connect_stripe/src/index.rs ---
//! Which dashboard account owns which Stripe objects.
//!
//! Stripe cannot list accounts by metadata, so the dashboard keeps its own
//! index. `ConnectIndex` is the seam to the host's storage; `MemoryIndex`
//! keeps everything in process.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[async_trait]
pub trait ConnectIndex: Send + Sync {
    async fn add_stripe_account(&self, account_id: &str, stripe_id: &str);

    async fn remove_stripe_account(&self, account_id: &str, stripe_id: &str);

    /// Stripe accounts of one dashboard account, newest first.
    async fn stripe_accounts(&self, account_id: &str) -> Vec<String>;

    /// Every indexed Stripe account, newest first.
    async fn all_stripe_accounts(&self) -> Vec<String>;

    async fn add_person(&self, stripe_id: &str, person_id: &str);

    async fn remove_person(&self, person_id: &str);

    async fn stripe_id_for_person(&self, person_id: &str) -> Option<String>;

    async fn add_payout(&self, stripe_id: &str, payout_id: &str);

    async fn stripe_id_for_payout(&self, payout_id: &str) -> Option<String>;
}

#[derive(Debug, Default)]
struct IndexData {
    // Newest last; readers reverse.
    accounts: HashMap<String, Vec<String>>,
    all_accounts: Vec<String>,
    persons: HashMap<String, String>,
    payouts: HashMap<String, String>,
}

#[derive(Debug, Default)]
pub struct MemoryIndex {
    data: RwLock<IndexData>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConnectIndex for MemoryIndex {
    async fn add_stripe_account(&self, account_id: &str, stripe_id: &str) {
        let mut data = self.data.write().await;
        let owned = data.accounts.entry(account_id.to_string()).or_default();
        if !owned.iter().any(|id| id == stripe_id) {
            owned.push(stripe_id.to_string());
        }
        if !data.all_accounts.iter().any(|id| id == stripe_id) {
            data.all_accounts.push(stripe_id.to_string());
        }
    }

    async fn remove_stripe_account(&self, account_id: &str, stripe_id: &str) {
        let mut data = self.data.write().await;
        if let Some(owned) = data.accounts.get_mut(account_id) {
            owned.retain(|id| id != stripe_id);
        }
        data.all_accounts.retain(|id| id != stripe_id);
        data.persons.retain(|_, owner| owner != stripe_id);
        data.payouts.retain(|_, owner| owner != stripe_id);
    }

    async fn stripe_accounts(&self, account_id: &str) -> Vec<String> {
        let data = self.data.read().await;
        data.accounts
            .get(account_id)
            .map(|ids| ids.iter().rev().cloned().collect())
            .unwrap_or_default()
    }

    async fn all_stripe_accounts(&self) -> Vec<String> {
        let data = self.data.read().await;
        data.all_accounts.iter().rev().cloned().collect()
    }

    async fn add_person(&self, stripe_id: &str, person_id: &str) {
        let mut data = self.data.write().await;
        data.persons
            .insert(person_id.to_string(), stripe_id.to_string());
    }

    async fn remove_person(&self, person_id: &str) {
        let mut data = self.data.write().await;
        data.persons.remove(person_id);
    }

    async fn stripe_id_for_person(&self, person_id: &str) -> Option<String> {
        self.data.read().await.persons.get(person_id).cloned()
    }

    async fn add_payout(&self, stripe_id: &str, payout_id: &str) {
        let mut data = self.data.write().await;
        data.payouts
            .insert(payout_id.to_string(), stripe_id.to_string());
    }

    async fn stripe_id_for_payout(&self, payout_id: &str) -> Option<String> {
        self.data.read().await.payouts.get(payout_id).cloned()
    }
}
