use thiserror::Error;

use super::{format_cents, Cents};

/// Structural violations detected by the balance and settlement engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettlementError {
    #[error("Invalid expense '{title}': {reason}")]
    InvalidExpense { title: String, reason: String },

    #[error("Inconsistent ledger: balances net to {} instead of zero", format_cents(*.net))]
    InconsistentLedger { net: Cents },
}

impl SettlementError {
    pub fn invalid_expense(title: impl Into<String>, reason: impl Into<String>) -> Self {
        SettlementError::InvalidExpense {
            title: title.into(),
            reason: reason.into(),
        }
    }
}
