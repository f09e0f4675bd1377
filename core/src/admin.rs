//! Admin tools: balance adjustments, bans and admin grants.
//!
//! Owners may change any balance by any amount. Admins are limited to
//! `adjust_limit` coins per call in either direction. Only owners hand out or
//! revoke the admin role.

use chrono::NaiveDateTime;
use tracing::{error, info};

use crate::error::EconomyError;
use crate::session::Session;
use crate::store::{BalanceStore, Ban, StoreError, Wallet};

const DEFAULT_BAN_REASON: &str = "No reason provided";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceAdjustment {
    pub target: String,
    pub change: i64,
    pub balance: i64,
}

fn store_failure(admin: &str, target: &str, action: &str, err: StoreError) -> EconomyError {
    error!(admin, target, action, error = %err, "admin action failed");
    EconomyError::Store(err)
}

/// Wallet of an existing user. Admin tools never create wallets.
async fn target_wallet<S: BalanceStore>(
    session: &Session<S>,
    admin: &str,
    target: &str,
) -> Result<Wallet, EconomyError> {
    session
        .store()
        .get_wallet(target)
        .await
        .map_err(|e| store_failure(admin, target, "lookup", e))?
        .ok_or_else(|| EconomyError::NotFound {
            what: "user",
            id: target.to_string(),
        })
}

pub async fn adjust_balance<S: BalanceStore>(
    session: &mut Session<S>,
    target: &str,
    change: i64,
    limit: i64,
) -> Result<BalanceAdjustment, EconomyError> {
    let admin = session.require_admin("adjust balances")?.clone();
    if change == 0 {
        return Err(EconomyError::InvalidAmount(0));
    }
    if !admin.role.is_owner() && change.unsigned_abs() > limit.unsigned_abs() {
        return Err(EconomyError::PermissionDenied(format!(
            "admins can only give or remove up to {limit} coins at a time"
        )));
    }
    target_wallet(session, &admin.id, target).await?;

    let balance = match session.store().add_balance(target, change).await {
        Ok(balance) => balance,
        Err(StoreError::InsufficientBalance { balance, .. }) => {
            return Err(EconomyError::InsufficientBalance {
                needed: change.saturating_neg(),
                available: balance,
            });
        }
        Err(e) => return Err(store_failure(&admin.id, target, "adjust balance", e)),
    };

    if admin.id == target {
        session.invalidate_wallet();
    }
    info!(admin = %admin.id, target, change, balance, "balance adjusted");

    Ok(BalanceAdjustment {
        target: target.to_string(),
        change,
        balance,
    })
}

/// Ban `target`. A blank reason is recorded as "No reason provided".
pub async fn ban_user<S: BalanceStore>(
    session: &mut Session<S>,
    target: &str,
    reason: &str,
    now: NaiveDateTime,
) -> Result<Ban, EconomyError> {
    let admin = session.require_admin("ban users")?.clone();
    if admin.id == target {
        return Err(EconomyError::PermissionDenied(
            "you cannot ban yourself".to_string(),
        ));
    }

    let wallet = target_wallet(session, &admin.id, target).await?;
    if wallet.is_admin && !admin.role.is_owner() {
        return Err(EconomyError::PermissionDenied(
            "only owners can ban admins".to_string(),
        ));
    }
    if wallet.ban.is_some() {
        return Err(EconomyError::NotEligible(format!("{target} is already banned")));
    }

    let reason = match reason.trim() {
        "" => DEFAULT_BAN_REASON.to_string(),
        r => r.to_string(),
    };
    let ban = Ban {
        reason,
        banned_by: admin.id.clone(),
        banned_at: now,
    };
    session
        .store()
        .set_ban(target, Some(ban.clone()))
        .await
        .map_err(|e| store_failure(&admin.id, target, "ban", e))?;
    info!(admin = %admin.id, target, reason = %ban.reason, "user banned");
    Ok(ban)
}

/// Lift the ban on `target`. Returns the ban that was removed.
pub async fn unban_user<S: BalanceStore>(
    session: &mut Session<S>,
    target: &str,
) -> Result<Ban, EconomyError> {
    let admin = session.require_admin("unban users")?.clone();
    let ban = target_wallet(session, &admin.id, target)
        .await?
        .ban
        .ok_or_else(|| EconomyError::NotFound {
            what: "ban",
            id: target.to_string(),
        })?;

    session
        .store()
        .set_ban(target, None)
        .await
        .map_err(|e| store_failure(&admin.id, target, "unban", e))?;
    info!(admin = %admin.id, target, "user unbanned");
    Ok(ban)
}

/// Grant or revoke the admin role. Takes effect on the target's next sign-in.
pub async fn set_admin<S: BalanceStore>(
    session: &mut Session<S>,
    target: &str,
    is_admin: bool,
) -> Result<(), EconomyError> {
    let owner = session.require_owner("modify admin status")?.clone();
    target_wallet(session, &owner.id, target).await?;
    session
        .store()
        .set_admin(target, is_admin)
        .await
        .map_err(|e| store_failure(&owner.id, target, "set admin", e))?;
    info!(owner = %owner.id, target, is_admin, "admin status changed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{AuthUser, Role};
    use crate::store::MemoryStore;
    use chrono::NaiveDate;
    use spdm_types::WalletConfig;
    use std::sync::Arc;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 4, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    async fn setup(role: Role) -> (Arc<MemoryStore>, Session<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        store.add_balance("alice", 100).await.unwrap();
        let mut session = Session::new(store.clone(), &WalletConfig::default());
        session.login(AuthUser::new("mod", "Mod").with_role(role));
        (store, session)
    }

    #[tokio::test]
    async fn test_users_cannot_adjust() {
        let (_, mut session) = setup(Role::User).await;
        let err = adjust_balance(&mut session, "alice", 10, 500).await.unwrap_err();
        assert!(matches!(err, EconomyError::PermissionDenied(_)));
    }

    #[tokio::test]
    async fn test_admin_limit_and_owner_bypass() {
        let (_, mut admin) = setup(Role::Admin).await;
        assert!(adjust_balance(&mut admin, "alice", 501, 500).await.is_err());
        assert!(adjust_balance(&mut admin, "alice", -501, 500).await.is_err());
        let adjusted = adjust_balance(&mut admin, "alice", 500, 500).await.unwrap();
        assert_eq!(adjusted.balance, 600);

        let (_, mut owner) = setup(Role::Owner).await;
        let adjusted = adjust_balance(&mut owner, "alice", 5000, 500).await.unwrap();
        assert_eq!(adjusted.balance, 5100);
    }

    #[tokio::test]
    async fn test_cannot_go_below_zero() {
        let (store, mut admin) = setup(Role::Admin).await;
        let err = adjust_balance(&mut admin, "alice", -200, 500).await.unwrap_err();
        assert!(matches!(
            err,
            EconomyError::InsufficientBalance {
                needed: 200,
                available: 100
            }
        ));
        assert!(matches!(
            adjust_balance(&mut admin, "alice", 0, 500).await,
            Err(EconomyError::InvalidAmount(0))
        ));
        assert_eq!(store.get_wallet("alice").await.unwrap().unwrap().balance, 100);
    }

    #[tokio::test]
    async fn test_unknown_target_keeps_starting_balance() {
        let (store, mut admin) = setup(Role::Admin).await;
        let err = adjust_balance(&mut admin, "newbie", 50, 500).await.unwrap_err();
        assert!(matches!(err, EconomyError::NotFound { what: "user", .. }));
        assert!(store.get_wallet("newbie").await.unwrap().is_none());

        // Their first login still gets the starting balance
        let mut session = Session::new(store.clone(), &WalletConfig::default());
        session.login(AuthUser::new("newbie", "Newbie"));
        assert_eq!(session.wallet(now()).await.unwrap().balance, 100);
    }

    #[tokio::test]
    async fn test_ban_and_unban() {
        let (store, mut admin) = setup(Role::Admin).await;

        let ban = ban_user(&mut admin, "alice", "  ", now()).await.unwrap();
        assert_eq!(ban.reason, "No reason provided");
        assert_eq!(ban.banned_by, "mod");
        let err = ban_user(&mut admin, "alice", "again", now()).await.unwrap_err();
        assert!(matches!(err, EconomyError::NotEligible(_)));

        let mut alice = Session::new(store.clone(), &WalletConfig::default());
        let err = alice
            .sign_in(AuthUser::new("alice", "Alice"), now())
            .await
            .unwrap_err();
        assert!(matches!(err, EconomyError::Banned { .. }));

        let lifted = unban_user(&mut admin, "alice").await.unwrap();
        assert_eq!(lifted, ban);
        assert!(matches!(
            unban_user(&mut admin, "alice").await,
            Err(EconomyError::NotFound { what: "ban", .. })
        ));
        alice
            .sign_in(AuthUser::new("alice", "Alice"), now())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_ban_rules() {
        let (store, mut user) = setup(Role::User).await;
        assert!(matches!(
            ban_user(&mut user, "alice", "spam", now()).await,
            Err(EconomyError::PermissionDenied(_))
        ));

        let (_, mut admin) = setup(Role::Admin).await;
        assert!(ban_user(&mut admin, "mod", "oops", now()).await.is_err());
        assert!(matches!(
            ban_user(&mut admin, "ghost", "spam", now()).await,
            Err(EconomyError::NotFound { what: "user", .. })
        ));

        store.set_admin("alice", true).await.unwrap();
        assert!(matches!(
            ban_user(&mut admin, "alice", "spam", now()).await,
            Err(EconomyError::PermissionDenied(_))
        ));
    }

    #[tokio::test]
    async fn test_only_owners_grant_admin() {
        let (_, mut admin) = setup(Role::Admin).await;
        assert!(matches!(
            set_admin(&mut admin, "alice", true).await,
            Err(EconomyError::PermissionDenied(_))
        ));

        let (store, mut owner) = setup(Role::Owner).await;
        set_admin(&mut owner, "alice", true).await.unwrap();
        assert!(store.get_wallet("alice").await.unwrap().unwrap().is_admin);

        let mut alice = Session::new(store.clone(), &WalletConfig::default());
        let user = alice.sign_in(AuthUser::new("alice", "Alice"), now()).await.unwrap();
        assert_eq!(user.role, Role::Admin);

        set_admin(&mut owner, "alice", false).await.unwrap();
        assert!(!store.get_wallet("alice").await.unwrap().unwrap().is_admin);
        assert!(matches!(
            set_admin(&mut owner, "ghost", true).await,
            Err(EconomyError::NotFound { .. })
        ));
    }
}
