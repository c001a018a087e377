//! Checkout state machine.

use serde::{Deserialize, Serialize};

/// The state of a checkout attempt.
///
/// State transitions:
/// ```text
/// Draft ──► Validating ──► Committed
///   │           │
///   └───────────┴──► Rejected
/// ```
///
/// `Validating` means the cart has passed validation and holds a pending
/// reservation awaiting commit. Validation failure and commit conflict
/// both end in `Rejected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CheckoutState {
    /// Checkout has been opened against a cart snapshot.
    #[default]
    Draft,

    /// Validation passed; a pending reservation awaits commit.
    Validating,

    /// Stock was decremented and the order recorded (terminal state).
    Committed,

    /// Validation failed or commit conflicted (terminal state).
    Rejected,
}

impl CheckoutState {
    /// Returns true if validation can run in this state.
    pub fn can_validate(&self) -> bool {
        matches!(self, CheckoutState::Draft)
    }

    /// Returns true if the reservation can be committed in this state.
    pub fn can_commit(&self) -> bool {
        matches!(self, CheckoutState::Validating)
    }

    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, CheckoutState::Committed | CheckoutState::Rejected)
    }

    /// Returns the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckoutState::Draft => "Draft",
            CheckoutState::Validating => "Validating",
            CheckoutState::Committed => "Committed",
            CheckoutState::Rejected => "Rejected",
        }
    }
}

impl std::fmt::Display for CheckoutState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
