use std::collections::BTreeMap;

use super::{is_settled, Cents, Expense, ParticipantId, SettlementError};

/// Net position per participant: credit positive, debit negative.
/// Ordered by participant id so every consumer sees the same iteration order.
pub type Balances = BTreeMap<ParticipantId, Cents>;

/// Compute the net balance of every participant appearing in the expenses.
/// Balance = amounts paid - shares consumed
///
/// A malformed record (empty beneficiaries, non-positive amount) fails the
/// whole computation with `InvalidExpense`, as does a balance that would
/// leave the `Cents` range.
pub fn aggregate_balances(expenses: &[Expense]) -> Result<Balances, SettlementError> {
    let mut balances = Balances::new();

    for expense in expenses {
        let shares = expense.shares()?;
        let too_large = || SettlementError::invalid_expense(&expense.title, "amount too large");

        let paid = balances.entry(expense.payer.clone()).or_insert(0);
        *paid = paid
            .checked_add(expense.amount_cents)
            .ok_or_else(too_large)?;
        for (participant, share) in shares {
            let owed = balances.entry(participant.clone()).or_insert(0);
            *owed = owed.checked_sub(share).ok_or_else(too_large)?;
        }
    }

    Ok(balances)
}

/// Sum of all balances. Zero for any well-formed expense set.
pub fn net_total(balances: &Balances) -> Cents {
    sum_cents(balances.values().copied())
}

/// Sum amounts without intermediate overflow, saturating at the `Cents` bounds.
pub(crate) fn sum_cents(amounts: impl IntoIterator<Item = Cents>) -> Cents {
    let total: i128 = amounts.into_iter().map(i128::from).sum();
    Cents::try_from(total).unwrap_or(if total < 0 { Cents::MIN } else { Cents::MAX })
}

/// Fail with `InconsistentLedger` unless the balances net to zero.
pub fn ensure_balanced(balances: &Balances) -> Result<(), SettlementError> {
    let net = net_total(balances);
    if is_settled(net) {
        Ok(())
    } else {
        Err(SettlementError::InconsistentLedger { net })
    }
}

/// Balance for a single participant (absent = 0).
pub fn balance_of(balances: &Balances, participant: &str) -> Cents {
    balances.get(participant).copied().unwrap_or(0)
}
