//! The per-user context every feature operates in.
//!
//! A [`Session`] pairs the logged-in user with the shared [`BalanceStore`] and
//! a [`WalletCache`]. All coin movements go through it so validation, logging
//! and cache upkeep happen in one place.

mod cache;
mod user;

use std::sync::Arc;

use chrono::NaiveDateTime;
use spdm_types::WalletConfig;
use tracing::{debug, error, info};

use crate::error::{EconomyError, Notice};
use crate::limiter::duration_secs;
use crate::store::{BalanceStore, ClaimField, StoreError, Wallet};

pub use cache::WalletCache;
pub use user::{AuthUser, Role};

/// Result of a coin movement
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoinEvent {
    Earned {
        amount: i64,
        source: String,
        balance: i64,
    },
    Spent {
        amount: i64,
        item: String,
        balance: i64,
    },
    Refreshed {
        balance: i64,
    },
}

impl CoinEvent {
    pub fn balance(&self) -> i64 {
        match self {
            Self::Earned { balance, .. }
            | Self::Spent { balance, .. }
            | Self::Refreshed { balance } => *balance,
        }
    }

    /// The success message to show, if any. Refreshes are silent.
    pub fn notice(&self) -> Option<Notice> {
        match self {
            Self::Earned { amount, source, .. } => Some(Notice::success(
                "Success!",
                format!("You earned {amount} coins from {source}!"),
            )),
            Self::Spent { amount, item, .. } => Some(Notice::success(
                "Purchase successful!",
                format!("You spent {amount} coins on {item}"),
            )),
            Self::Refreshed { .. } => None,
        }
    }
}

pub struct Session<S> {
    store: Arc<S>,
    user: Option<AuthUser>,
    cache: WalletCache,
    starting_balance: i64,
}

impl<S: BalanceStore> Session<S> {
    pub fn new(store: Arc<S>, config: &WalletConfig) -> Self {
        let max_age = duration_secs(config.cache_max_age_secs);
        Self {
            store,
            user: None,
            cache: WalletCache::new(max_age),
            starting_balance: config.starting_balance,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    // --- Authentication ---

    pub fn login(&mut self, user: AuthUser) {
        info!(user = %user.id, username = %user.username, role = ?user.role, "login");
        self.cache.invalidate();
        self.user = Some(user);
    }

    /// Log in and apply what the store knows about the user: a ban refuses
    /// the login, and the role comes from the stored admin grant. Owners keep
    /// the role they were authenticated with.
    pub async fn sign_in(
        &mut self,
        user: AuthUser,
        now: NaiveDateTime,
    ) -> Result<&AuthUser, EconomyError> {
        let user_id = user.id.clone();
        self.login(user);
        let wallet = match self.fetch_wallet(&user_id, now).await {
            Ok(wallet) => wallet,
            Err(e) => {
                self.user = None;
                return Err(e);
            }
        };

        let user = self
            .user
            .as_mut()
            .ok_or(EconomyError::AuthRequired { action: "sign in" })?;
        if !user.role.is_owner() {
            user.role = if wallet.is_admin { Role::Admin } else { Role::User };
        }
        Ok(&*user)
    }

    pub fn logout(&mut self) -> Option<AuthUser> {
        self.cache.invalidate();
        let user = self.user.take();
        if let Some(user) = &user {
            info!(user = %user.id, "logout");
        }
        user
    }

    pub fn user(&self) -> Option<&AuthUser> {
        self.user.as_ref()
    }

    pub fn require_user(&self, action: &'static str) -> Result<&AuthUser, EconomyError> {
        self.user.as_ref().ok_or_else(|| {
            debug!(action, "rejected: not logged in");
            EconomyError::AuthRequired { action }
        })
    }

    pub fn require_admin(&self, action: &'static str) -> Result<&AuthUser, EconomyError> {
        let user = self.require_user(action)?;
        if !user.role.is_admin() {
            return Err(EconomyError::PermissionDenied(format!(
                "only admins can {action}"
            )));
        }
        Ok(user)
    }

    pub fn require_owner(&self, action: &'static str) -> Result<&AuthUser, EconomyError> {
        let user = self.require_user(action)?;
        if !user.role.is_owner() {
            return Err(EconomyError::PermissionDenied(format!(
                "only owners can {action}"
            )));
        }
        Ok(user)
    }

    // --- Wallet ---

    /// Current wallet, from the cache when fresh. Creates the wallet with the
    /// starting balance on first use. Banned users get [`EconomyError::Banned`].
    pub async fn wallet(&mut self, now: NaiveDateTime) -> Result<Wallet, EconomyError> {
        let user_id = self.require_user("view your wallet")?.id.clone();
        if let Some(wallet) = self.cache.get(now) {
            return Ok(wallet.clone());
        }
        self.fetch_wallet(&user_id, now).await
    }

    /// Cached wallet regardless of age, for display only
    pub fn cached_wallet(&self) -> Option<&Wallet> {
        self.cache.peek()
    }

    async fn fetch_wallet(
        &mut self,
        user_id: &str,
        now: NaiveDateTime,
    ) -> Result<Wallet, EconomyError> {
        let wallet = match self.store.get_wallet(user_id).await.map_err(log_store_error)? {
            Some(wallet) => wallet,
            None => {
                let balance = self
                    .store
                    .add_balance(user_id, self.starting_balance)
                    .await
                    .map_err(log_store_error)?;
                info!(user = user_id, balance, "created wallet");
                self.store
                    .get_wallet(user_id)
                    .await
                    .map_err(log_store_error)?
                    .unwrap_or_else(|| Wallet::new(user_id, balance))
            }
        };
        if let Some(ban) = &wallet.ban {
            debug!(user = user_id, banned_by = %ban.banned_by, "rejected: user is banned");
            self.cache.invalidate();
            return Err(EconomyError::Banned {
                reason: ban.reason.clone(),
            });
        }
        self.cache.store(wallet.clone(), now);
        Ok(wallet)
    }

    // --- Coin movements ---

    /// Credit `amount` coins earned from `source`
    pub async fn add_coins(
        &mut self,
        amount: i64,
        source: &str,
        now: NaiveDateTime,
    ) -> Result<CoinEvent, EconomyError> {
        let user_id = self.require_user("earn coins")?.id.clone();
        if amount <= 0 {
            return Err(EconomyError::InvalidAmount(amount));
        }

        // Make sure the wallet exists so the first credit doesn't skip the starting balance
        if self.cache.get(now).is_none() {
            self.fetch_wallet(&user_id, now).await?;
        }

        let balance = self
            .store
            .add_balance(&user_id, amount)
            .await
            .map_err(log_store_error)?;
        self.cache.apply_balance(balance);
        info!(user = %user_id, amount, source, balance, "coins earned");

        Ok(CoinEvent::Earned {
            amount,
            source: source.to_string(),
            balance,
        })
    }

    /// Debit `amount` coins for `item`
    pub async fn spend_coins(
        &mut self,
        amount: i64,
        item: &str,
        now: NaiveDateTime,
    ) -> Result<CoinEvent, EconomyError> {
        let user_id = self.require_user("make purchases")?.id.clone();
        if amount <= 0 {
            return Err(EconomyError::InvalidAmount(amount));
        }

        let wallet = self.wallet(now).await?;
        if wallet.balance < amount {
            return Err(EconomyError::InsufficientBalance {
                needed: amount,
                available: wallet.balance,
            });
        }

        let balance = match self.store.add_balance(&user_id, -amount).await {
            Ok(balance) => balance,
            // Cache was stale; the store has the final say
            Err(StoreError::InsufficientBalance { balance, .. }) => {
                self.cache.invalidate();
                return Err(EconomyError::InsufficientBalance {
                    needed: amount,
                    available: balance,
                });
            }
            Err(e) => return Err(log_store_error(e)),
        };
        self.cache.apply_balance(balance);
        info!(user = %user_id, amount, item, balance, "coins spent");

        Ok(CoinEvent::Spent {
            amount,
            item: item.to_string(),
            balance,
        })
    }

    /// Re-read the balance from the store without changing it
    pub async fn refresh(&mut self, now: NaiveDateTime) -> Result<CoinEvent, EconomyError> {
        let user_id = self.require_user("refresh your balance")?.id.clone();
        self.store
            .add_balance(&user_id, 0)
            .await
            .map_err(log_store_error)?;
        self.cache.invalidate();
        let wallet = self.fetch_wallet(&user_id, now).await?;
        Ok(CoinEvent::Refreshed {
            balance: wallet.balance,
        })
    }

    /// Persist a "last claimed" timestamp for the session user
    pub async fn record_claim(
        &mut self,
        field: ClaimField,
        at: NaiveDateTime,
    ) -> Result<(), EconomyError> {
        let user_id = self.require_user("claim rewards")?.id.clone();
        self.store
            .set_last_claim(&user_id, field, at)
            .await
            .map_err(log_store_error)?;
        self.cache.apply_claim(field, at);
        Ok(())
    }

    /// Drop the cached wallet, e.g. after an admin changed this user's balance
    pub fn invalidate_wallet(&mut self) {
        self.cache.invalidate();
    }
}

fn log_store_error(err: StoreError) -> EconomyError {
    error!(error = %err, "balance store call failed");
    EconomyError::Store(err)
}
