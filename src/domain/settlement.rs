use std::cmp::Reverse;

use serde::{Deserialize, Serialize};

use super::balance::sum_cents;
use super::{
    aggregate_balances, ensure_balanced, is_settled, Balances, Cents, Expense, ParticipantId,
    SettlementError,
};

/// A proposed payment from a debtor to a creditor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reimbursement {
    pub from: ParticipantId,
    pub to: ParticipantId,
    /// Amount in cents (always positive)
    pub amount_cents: Cents,
}

/// Balances and the transfers that zero them, derived on demand and never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    pub balances: Balances,
    pub reimbursements: Vec<Reimbursement>,
}

impl Settlement {
    pub fn is_square(&self) -> bool {
        self.reimbursements.is_empty()
    }

    /// Total amount sent (negative) and received (positive) by a participant.
    pub fn net_transferred(&self, participant: &str) -> Cents {
        self.reimbursements.iter().fold(0, |net, r| {
            if r.from == participant {
                net - r.amount_cents
            } else if r.to == participant {
                net + r.amount_cents
            } else {
                net
            }
        })
    }
}

/// Turn balances into a sequence of transfers using greedy two-pointer matching.
///
/// Debtors are served most negative first, creditors largest surplus first.
/// Equal balances keep the map's order (ascending participant id). The result is
/// not guaranteed to use the fewest possible transfers.
pub fn plan_reimbursements(balances: &Balances) -> Result<Vec<Reimbursement>, SettlementError> {
    let mut debtors: Vec<(&ParticipantId, Cents)> = Vec::new();
    let mut creditors: Vec<(&ParticipantId, Cents)> = Vec::new();

    for (participant, &balance) in balances {
        if is_settled(balance) {
            continue;
        }
        if balance < 0 {
            debtors.push((participant, balance));
        } else {
            creditors.push((participant, balance));
        }
    }

    // sort_by_key is stable
    debtors.sort_by_key(|&(_, balance)| balance);
    creditors.sort_by_key(|&(_, balance)| Reverse(balance));

    let mut reimbursements = Vec::new();
    let mut d = 0;
    let mut c = 0;

    while d < debtors.len() && c < creditors.len() {
        let (debtor, owed) = debtors[d];
        let (creditor, surplus) = creditors[c];
        let transfer = owed.saturating_neg().min(surplus);

        reimbursements.push(Reimbursement {
            from: debtor.clone(),
            to: creditor.clone(),
            amount_cents: transfer,
        });

        debtors[d].1 += transfer;
        creditors[c].1 -= transfer;

        if is_settled(debtors[d].1) {
            d += 1;
        }
        if is_settled(creditors[c].1) {
            c += 1;
        }
    }

    let residual = sum_cents(
        debtors[d..]
            .iter()
            .chain(creditors[c..].iter())
            .map(|&(_, balance)| balance),
    );
    let undrained = debtors[d..]
        .iter()
        .chain(creditors[c..].iter())
        .any(|&(_, balance)| !is_settled(balance));

    if undrained {
        return Err(SettlementError::InconsistentLedger { net: residual });
    }

    Ok(reimbursements)
}

/// Aggregate the expenses and plan the transfers that settle them.
///
/// An empty expense list yields an empty settlement.
pub fn compute_settlement(expenses: &[Expense]) -> Result<Settlement, SettlementError> {
    let balances = aggregate_balances(expenses)?;
    ensure_balanced(&balances)?;
    let reimbursements = plan_reimbursements(&balances)?;

    Ok(Settlement {
        balances,
        reimbursements,
    })
}
