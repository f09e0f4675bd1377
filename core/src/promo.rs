//! Promo codes
//!
//! Admins create codes worth a fixed number of coins, optionally limited in
//! total uses and lifetime. Each user can redeem a given code once. Codes are
//! stored upper-case and matched case-insensitively.

use std::collections::HashSet;

use chrono::NaiveDateTime;
use rand::Rng;
use tracing::info;

use crate::error::EconomyError;
use crate::session::Session;
use crate::store::{BalanceStore, UserId};

const CODE_CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const GENERATED_LEN: usize = 8;
const MIN_CODE_LEN: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromoCode {
    pub id: u64,
    pub code: String,
    pub amount: u32,
    pub created_at: NaiveDateTime,
    pub created_by: UserId,
    pub expires_at: Option<NaiveDateTime>,
    pub is_active: bool,
    pub max_uses: Option<u32>,
    pub current_uses: u32,
    pub redeemed_by: HashSet<UserId>,
}

impl PromoCode {
    pub fn is_expired(&self, now: NaiveDateTime) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }

    pub fn is_exhausted(&self) -> bool {
        self.max_uses.is_some_and(|max| self.current_uses >= max)
    }
}

/// Admin input for [`PromoBook::create`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPromo {
    pub code: String,
    pub amount: i64,
    pub max_uses: Option<u32>,
    pub expires_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redemption {
    pub code: String,
    pub amount: u32,
    pub balance: i64,
}

/// Random 8 character code from `A-Z0-9`
pub fn generate_code<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..GENERATED_LEN)
        .map(|_| char::from(CODE_CHARS[rng.gen_range(0..CODE_CHARS.len())]))
        .collect()
}

fn normalize(code: &str) -> String {
    code.trim().to_uppercase()
}

#[derive(Debug, Clone, Default)]
pub struct PromoBook {
    codes: Vec<PromoCode>,
    next_id: u64,
}

impl PromoBook {
    pub fn new() -> Self {
        Self::default()
    }

    fn index_of(&self, id: u64) -> Result<usize, EconomyError> {
        self.codes
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| EconomyError::NotFound {
                what: "promo code",
                id: id.to_string(),
            })
    }

    // --- Admin ---

    pub fn create<S: BalanceStore>(
        &mut self,
        session: &Session<S>,
        new: NewPromo,
        now: NaiveDateTime,
    ) -> Result<&PromoCode, EconomyError> {
        let admin = session.require_admin("create promo codes")?.id.clone();

        let code = normalize(&new.code);
        if code.chars().count() < MIN_CODE_LEN {
            return Err(EconomyError::InvalidPromo(format!(
                "code must be at least {MIN_CODE_LEN} characters"
            )));
        }
        let amount = u32::try_from(new.amount)
            .ok()
            .filter(|a| *a >= 1)
            .ok_or(EconomyError::InvalidAmount(new.amount))?;
        if new.max_uses == Some(0) {
            return Err(EconomyError::InvalidPromo(
                "max uses must be at least 1".to_string(),
            ));
        }
        if self.codes.iter().any(|p| p.code == code) {
            return Err(EconomyError::InvalidPromo(format!("{code} already exists")));
        }

        self.next_id += 1;
        info!(admin = %admin, code = %code, amount, "promo code created");
        self.codes.push(PromoCode {
            id: self.next_id,
            code,
            amount,
            created_at: now,
            created_by: admin,
            expires_at: new.expires_at,
            is_active: true,
            max_uses: new.max_uses,
            current_uses: 0,
            redeemed_by: HashSet::new(),
        });
        let index = self.codes.len() - 1;
        Ok(&self.codes[index])
    }

    pub fn set_active<S: BalanceStore>(
        &mut self,
        session: &Session<S>,
        id: u64,
        active: bool,
    ) -> Result<(), EconomyError> {
        session.require_admin("update promo codes")?;
        let index = self.index_of(id)?;
        self.codes[index].is_active = active;
        info!(code = %self.codes[index].code, active, "promo code status changed");
        Ok(())
    }

    /// Flip a code's active flag. Returns the new state.
    pub fn toggle<S: BalanceStore>(
        &mut self,
        session: &Session<S>,
        id: u64,
    ) -> Result<bool, EconomyError> {
        session.require_admin("update promo codes")?;
        let active = !self.codes[self.index_of(id)?].is_active;
        self.set_active(session, id, active)?;
        Ok(active)
    }

    pub fn delete<S: BalanceStore>(
        &mut self,
        session: &Session<S>,
        id: u64,
    ) -> Result<PromoCode, EconomyError> {
        session.require_admin("delete promo codes")?;
        let index = self.index_of(id)?;
        let removed = self.codes.remove(index);
        info!(code = %removed.code, "promo code deleted");
        Ok(removed)
    }

    /// All codes, newest first
    pub fn list<S: BalanceStore>(
        &self,
        session: &Session<S>,
    ) -> Result<Vec<&PromoCode>, EconomyError> {
        session.require_admin("view promo codes")?;
        let mut codes: Vec<&PromoCode> = self.codes.iter().collect();
        codes.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(codes)
    }

    // --- Users ---

    pub async fn redeem<S: BalanceStore>(
        &mut self,
        session: &mut Session<S>,
        code: &str,
        now: NaiveDateTime,
    ) -> Result<Redemption, EconomyError> {
        let user_id = session.require_user("redeem promo codes")?.id.clone();
        let code = normalize(code);

        let index = self
            .codes
            .iter()
            .position(|p| p.code == code)
            .ok_or_else(|| EconomyError::InvalidPromo(format!("{code} does not exist")))?;
        let promo = &self.codes[index];
        let rejection = if !promo.is_active {
            Some("this code is no longer active")
        } else if promo.is_expired(now) {
            Some("this code has expired")
        } else if promo.is_exhausted() {
            Some("this code has reached its usage limit")
        } else if promo.redeemed_by.contains(&user_id) {
            Some("you have already used this code")
        } else {
            None
        };
        if let Some(reason) = rejection {
            return Err(EconomyError::InvalidPromo(reason.to_string()));
        }
        let amount = promo.amount;

        let event = session
            .add_coins(i64::from(amount), &format!("promo code {code}"), now)
            .await?;

        info!(user = %user_id, code = %code, amount, "promo code redeemed");
        let promo = &mut self.codes[index];
        promo.current_uses += 1;
        promo.redeemed_by.insert(user_id);

        Ok(Redemption {
            code,
            amount,
            balance: event.balance(),
        })
    }
}
