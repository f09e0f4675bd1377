use std::collections::HashMap;
use std::path::Path;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use super::{BalanceRow, BalanceStore, Ban, ClaimField, StoreError, UserId, Wallet};

#[derive(Debug, Default, Serialize, Deserialize)]
struct Tables {
    #[serde(default)]
    usernames: HashMap<UserId, String>,
    #[serde(default)]
    wallets: HashMap<UserId, Wallet>,
}

/// In-process [`BalanceStore`].
///
/// Every mutation happens under one write lock, so increments are atomic
/// across sessions sharing the store. Can be saved to and loaded from a JSON
/// file so the CLI keeps balances between runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a store previously written by [`save_json`](Self::save_json).
    /// A missing file yields an empty store.
    pub fn load_json(path: &Path) -> Result<Self, StoreError> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let contents = std::fs::read_to_string(path)?;
        let tables: Tables = serde_json::from_str(&contents)?;
        tracing::info!(
            path = %path.display(),
            wallets = tables.wallets.len(),
            "loaded balance store"
        );
        Ok(Self {
            tables: RwLock::new(tables),
        })
    }

    pub async fn save_json(&self, path: &Path) -> Result<(), StoreError> {
        let contents = {
            let tables = self.tables.read().await;
            serde_json::to_string_pretty(&*tables)?
        };
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, contents).await?;
        Ok(())
    }

    /// Record the display name used by the leaderboard
    pub async fn register_user(&self, user_id: &str, username: &str) {
        let mut tables = self.tables.write().await;
        tables
            .usernames
            .insert(user_id.to_string(), username.to_string());
    }
}

impl MemoryStore {
    async fn update_wallet(
        &self,
        user_id: &str,
        update: impl FnOnce(&mut Wallet),
    ) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        let wallet = tables
            .wallets
            .get_mut(user_id)
            .ok_or_else(|| StoreError::UnknownUser(user_id.to_string()))?;
        update(wallet);
        Ok(())
    }
}

impl BalanceStore for MemoryStore {
    async fn add_balance(&self, user_id: &str, amount: i64) -> Result<i64, StoreError> {
        let mut tables = self.tables.write().await;

        let Some(wallet) = tables.wallets.get_mut(user_id) else {
            if amount == 0 {
                return Ok(0);
            }
            if amount < 0 {
                return Err(StoreError::InsufficientBalance {
                    user_id: user_id.to_string(),
                    balance: 0,
                    change: amount,
                });
            }
            tables
                .wallets
                .insert(user_id.to_string(), Wallet::new(user_id, amount));
            return Ok(amount);
        };

        let balance = wallet
            .balance
            .checked_add(amount)
            .ok_or_else(|| StoreError::Overflow(user_id.to_string()))?;
        if balance < 0 {
            return Err(StoreError::InsufficientBalance {
                user_id: user_id.to_string(),
                balance: wallet.balance,
                change: amount,
            });
        }
        wallet.balance = balance;
        Ok(balance)
    }

    async fn get_wallet(&self, user_id: &str) -> Result<Option<Wallet>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.wallets.get(user_id).cloned())
    }

    async fn set_last_claim(
        &self,
        user_id: &str,
        field: ClaimField,
        at: NaiveDateTime,
    ) -> Result<(), StoreError> {
        self.update_wallet(user_id, |w| w.set_last_claim(field, at)).await
    }

    async fn set_ban(&self, user_id: &str, ban: Option<Ban>) -> Result<(), StoreError> {
        self.update_wallet(user_id, |w| w.ban = ban).await
    }

    async fn set_admin(&self, user_id: &str, is_admin: bool) -> Result<(), StoreError> {
        self.update_wallet(user_id, |w| w.is_admin = is_admin).await
    }

    async fn list_top_balances(
        &self,
        limit: usize,
        min_balance: i64,
    ) -> Result<Vec<BalanceRow>, StoreError> {
        let tables = self.tables.read().await;
        let mut rows: Vec<BalanceRow> = tables
            .wallets
            .values()
            .filter(|w| w.balance >= min_balance)
            .map(|w| BalanceRow {
                user_id: w.user_id.clone(),
                username: tables.usernames.get(&w.user_id).cloned().unwrap_or_default(),
                balance: w.balance,
            })
            .collect();

        // Ties are ordered by id so repeated queries agree
        rows.sort_by(|a, b| b.balance.cmp(&a.balance).then_with(|| a.user_id.cmp(&b.user_id)));
        rows.truncate(limit);
        Ok(rows)
    }
}
