//! Economy errors and the user-facing notices they turn into.
//!
//! Every rejected or failed operation ends in an [`EconomyError`]. Callers
//! recover at their own boundary; the only thing that escapes to the user is
//! the [`Notice`] built from the error.

use chrono::NaiveDateTime;
use thiserror::Error;

use crate::store::StoreError;

/// Date format used in user-facing messages
pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Error)]
pub enum EconomyError {
    #[error("login required to {action}")]
    AuthRequired { action: &'static str },

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("account banned: {reason}")]
    Banned { reason: String },

    #[error("{feature} limit of {cap} reached for this period")]
    CapReached { feature: &'static str, cap: u32 },

    #[error("{amount} more would exceed the {feature} limit ({earned}/{cap})")]
    WouldExceed {
        feature: &'static str,
        earned: u32,
        amount: u32,
        cap: u32,
    },

    #[error("{0} already claimed for this period")]
    AlreadyClaimed(String),

    #[error("next claim available on {}", .next_eligible.format(DATE_FORMAT))]
    Cooldown { next_eligible: NaiveDateTime },

    #[error("stay on the reward page {remaining_secs} more seconds")]
    VisitTooShort { remaining_secs: u64 },

    #[error("not eligible: {0}")]
    NotEligible(String),

    #[error("invalid amount: {0}")]
    InvalidAmount(i64),

    #[error("insufficient coins: need {needed}, have {available}")]
    InsufficientBalance { needed: i64, available: i64 },

    #[error("invalid promo code: {0}")]
    InvalidPromo(String),

    #[error("{what} not found: {id}")]
    NotFound { what: &'static str, id: String },

    #[error("no keys available for {0}")]
    NoKeysAvailable(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Coarse classification of an [`EconomyError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Action needs a (privileged) logged-in user
    Auth,
    /// Cap, cooldown or eligibility rule blocked the action
    Limit,
    /// The balance store failed
    Remote,
    /// Input rejected before any store call
    Validation,
}

impl EconomyError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::AuthRequired { .. } | Self::PermissionDenied(_) | Self::Banned { .. } => {
                ErrorKind::Auth
            }
            Self::CapReached { .. }
            | Self::WouldExceed { .. }
            | Self::AlreadyClaimed(_)
            | Self::Cooldown { .. }
            | Self::VisitTooShort { .. }
            | Self::NotEligible(_) => ErrorKind::Limit,
            Self::Store(_) => ErrorKind::Remote,
            Self::InvalidAmount(_)
            | Self::InsufficientBalance { .. }
            | Self::InvalidPromo(_)
            | Self::NotFound { .. }
            | Self::NoKeysAvailable(_) => ErrorKind::Validation,
        }
    }

    pub fn notice(&self) -> Notice {
        Notice::from(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Error,
}

/// A user-visible message (what the web portal showed as a toast)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub title: String,
    pub description: String,
    pub severity: Severity,
}

impl Notice {
    pub fn success(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            severity: Severity::Success,
        }
    }

    pub fn info(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            severity: Severity::Info,
        }
    }

    pub fn error(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            severity: Severity::Error,
        }
    }
}

impl std::fmt::Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.title, self.description)
    }
}

impl From<&EconomyError> for Notice {
    fn from(err: &EconomyError) -> Self {
        match err {
            EconomyError::AuthRequired { action } => {
                Notice::error("Login required", format!("Please login to {action}"))
            }
            EconomyError::PermissionDenied(msg) => Notice::error("Not allowed", msg.clone()),
            EconomyError::Banned { reason } => Notice::error(
                "Account banned",
                format!("Your account has been banned: {reason}"),
            ),
            EconomyError::CapReached { feature, cap } => Notice::error(
                "Limit reached",
                format!("You've reached the limit of {cap} for {feature}. Come back later!"),
            ),
            EconomyError::WouldExceed { .. } => Notice::error("Limit reached", err.to_string()),
            EconomyError::AlreadyClaimed(what) => Notice::error(
                "Already claimed",
                format!("You've already claimed {what} for this period"),
            ),
            EconomyError::Cooldown { next_eligible } => Notice::error(
                "Reward Already Claimed",
                format!(
                    "You can claim your next reward on {}",
                    next_eligible.format(DATE_FORMAT)
                ),
            ),
            EconomyError::VisitTooShort { remaining_secs } => Notice::error(
                "Not enough time",
                format!(
                    "You need to stay on the reward page longer ({remaining_secs} more seconds needed)"
                ),
            ),
            EconomyError::InsufficientBalance { needed, .. } => Notice::error(
                "Insufficient coins",
                format!("You need {needed} coins for this"),
            ),
            // Remote failures never leak details
            EconomyError::Store(_) => {
                Notice::error("Error", "Something went wrong. Please try again.")
            }
            EconomyError::NotEligible(_)
            | EconomyError::InvalidAmount(_)
            | EconomyError::InvalidPromo(_)
            | EconomyError::NotFound { .. }
            | EconomyError::NoKeysAvailable(_) => Notice::error("Error", err.to_string()),
        }
    }
}
