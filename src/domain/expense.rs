use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Cents, ParticipantId, SettlementError, TripId};

pub type ExpenseId = Uuid;

/// A single outlay made by one participant on behalf of a set of beneficiaries.
/// Expenses are never edited in place: an update builds a whole replacement record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expense {
    pub id: ExpenseId,
    pub trip_id: TripId,
    pub title: String,
    /// Amount in cents (always positive)
    pub amount_cents: Cents,
    /// Participant who paid
    pub payer: ParticipantId,
    /// Participants sharing the cost, never empty
    pub beneficiaries: BTreeSet<ParticipantId>,
    pub created_at: DateTime<Utc>,
}

impl Expense {
    /// Create a validated expense.
    pub fn new(
        trip_id: TripId,
        title: impl Into<String>,
        amount_cents: Cents,
        payer: impl Into<ParticipantId>,
        beneficiaries: impl IntoIterator<Item = ParticipantId>,
    ) -> Result<Self, SettlementError> {
        let expense = Self {
            id: Uuid::new_v4(),
            trip_id,
            title: title.into(),
            amount_cents,
            payer: payer.into(),
            beneficiaries: beneficiaries.into_iter().collect(),
            created_at: Utc::now(),
        };
        expense.validate()?;
        Ok(expense)
    }

    /// Build the full replacement for this record, keeping its identity.
    pub fn replaced_with(
        &self,
        title: impl Into<String>,
        amount_cents: Cents,
        payer: impl Into<ParticipantId>,
        beneficiaries: impl IntoIterator<Item = ParticipantId>,
    ) -> Result<Self, SettlementError> {
        let replacement = Self {
            id: self.id,
            trip_id: self.trip_id,
            title: title.into(),
            amount_cents,
            payer: payer.into(),
            beneficiaries: beneficiaries.into_iter().collect(),
            created_at: self.created_at,
        };
        replacement.validate()?;
        Ok(replacement)
    }

    pub fn validate(&self) -> Result<(), SettlementError> {
        if self.amount_cents <= 0 {
            return Err(SettlementError::invalid_expense(
                &self.title,
                "amount must be positive",
            ));
        }
        if self.beneficiaries.is_empty() {
            return Err(SettlementError::invalid_expense(
                &self.title,
                "at least one beneficiary is required",
            ));
        }
        Ok(())
    }

    /// Each beneficiary's share in cents, in ascending beneficiary order.
    ///
    /// The quotient goes to everyone and the leftover cents go one each to
    /// the first beneficiaries, so the shares always add up to the amount.
    pub fn shares(&self) -> Result<Vec<(&ParticipantId, Cents)>, SettlementError> {
        self.validate()?;
        let count = self.beneficiaries.len() as Cents;
        let base = self.amount_cents / count;
        let remainder = self.amount_cents % count;

        Ok(self
            .beneficiaries
            .iter()
            .enumerate()
            .map(|(i, participant)| {
                let extra = if (i as Cents) < remainder { 1 } else { 0 };
                (participant, base + extra)
            })
            .collect())
    }

    pub fn is_beneficiary(&self, participant: &str) -> bool {
        self.beneficiaries.contains(participant)
    }

    /// True if the participant paid for or shares in this expense.
    pub fn involves(&self, participant: &str) -> bool {
        self.payer == participant || self.is_beneficiary(participant)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<ParticipantId> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_create_expense() {
        let trip = Uuid::new_v4();
        let expense = Expense::new(trip, "Dinner", 3000, "alice", names(&["bob", "alice"])).unwrap();

        assert_eq!(expense.trip_id, trip);
        assert_eq!(expense.amount_cents, 3000);
        assert_eq!(expense.payer, "alice");
        assert!(expense.is_beneficiary("alice"));
        assert!(expense.is_beneficiary("bob"));
        assert!(!expense.is_beneficiary("carol"));
        assert!(expense.involves("alice"));
        assert!(!expense.involves("carol"));
    }

    #[test]
    fn test_duplicate_beneficiaries_collapse() {
        let expense = Expense::new(
            Uuid::new_v4(),
            "Taxi",
            1000,
            "alice",
            names(&["bob", "bob", "alice"]),
        )
        .unwrap();
        assert_eq!(expense.beneficiaries.len(), 2);
    }

    #[test]
    fn test_rejects_non_positive_amount() {
        let result = Expense::new(Uuid::new_v4(), "Free", 0, "alice", names(&["alice"]));
        assert!(matches!(
            result,
            Err(SettlementError::InvalidExpense { .. })
        ));

        let result = Expense::new(Uuid::new_v4(), "Refund", -500, "alice", names(&["alice"]));
        assert!(matches!(
            result,
            Err(SettlementError::InvalidExpense { .. })
        ));
    }

    #[test]
    fn test_rejects_empty_beneficiaries() {
        let result = Expense::new(Uuid::new_v4(), "Nobody", 1000, "alice", Vec::new());
        assert!(matches!(
            result,
            Err(SettlementError::InvalidExpense { .. })
        ));
    }

    #[test]
    fn test_shares_even_split() {
        let expense =
            Expense::new(Uuid::new_v4(), "Hotel", 3000, "a", names(&["a", "b", "c"])).unwrap();
        let shares: Vec<Cents> = expense.shares().unwrap().into_iter().map(|(_, s)| s).collect();
        assert_eq!(shares, vec![1000, 1000, 1000]);
    }

    #[test]
    fn test_shares_remainder_goes_to_first_beneficiaries() {
        let expense =
            Expense::new(Uuid::new_v4(), "Snacks", 1000, "c", names(&["c", "b", "a"])).unwrap();
        let shares = expense.shares().unwrap();

        assert_eq!(shares[0], (&"a".to_string(), 334));
        assert_eq!(shares[1], (&"b".to_string(), 333));
        assert_eq!(shares[2], (&"c".to_string(), 333));
        assert_eq!(shares.iter().map(|(_, s)| s).sum::<Cents>(), 1000);
    }

    #[test]
    fn test_shares_of_malformed_record_is_an_error() {
        let mut expense =
            Expense::new(Uuid::new_v4(), "Fuel", 4000, "a", names(&["a"])).unwrap();
        expense.beneficiaries.clear();
        assert!(expense.shares().is_err());
    }

    #[test]
    fn test_replacement_keeps_identity() {
        let original =
            Expense::new(Uuid::new_v4(), "Museum", 2400, "a", names(&["a", "b"])).unwrap();
        let replacement = original
            .replaced_with("Museum tickets", 3600, "b", names(&["a", "b", "c"]))
            .unwrap();

        assert_eq!(replacement.id, original.id);
        assert_eq!(replacement.trip_id, original.trip_id);
        assert_eq!(replacement.created_at, original.created_at);
        assert_eq!(replacement.amount_cents, 3600);
        assert_eq!(replacement.payer, "b");
        assert_eq!(original.amount_cents, 2400);
    }
}
