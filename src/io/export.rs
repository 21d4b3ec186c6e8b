use std::collections::BTreeMap;
use std::io::Write;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::application::TripService;
use crate::domain::{format_cents, Settlement};

/// Settlement as exchanged with other tools: every amount is a two-digit decimal string.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementReport {
    pub trip: String,
    pub computed_at: DateTime<Utc>,
    pub balances: BTreeMap<String, String>,
    pub reimbursements: Vec<ReimbursementLine>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReimbursementLine {
    pub from: String,
    pub to: String,
    pub amount: String,
}

impl SettlementReport {
    pub fn new(trip: impl Into<String>, settlement: &Settlement) -> Self {
        Self {
            trip: trip.into(),
            computed_at: Utc::now(),
            balances: settlement
                .balances
                .iter()
                .map(|(participant, balance)| (participant.clone(), format_cents(*balance)))
                .collect(),
            reimbursements: settlement
                .reimbursements
                .iter()
                .map(|r| ReimbursementLine {
                    from: r.from.clone(),
                    to: r.to.clone(),
                    amount: format_cents(r.amount_cents),
                })
                .collect(),
        }
    }
}

/// Exporter for writing trip data to CSV or JSON
pub struct Exporter<'a> {
    service: &'a TripService,
}

impl<'a> Exporter<'a> {
    pub fn new(service: &'a TripService) -> Self {
        Self { service }
    }

    /// Export a trip's expenses to CSV format
    pub async fn export_expenses_csv<W: Write>(&self, trip_title: &str, writer: W) -> Result<usize> {
        let expenses = self.service.list_expenses(trip_title).await?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record([
            "id",
            "created_at",
            "title",
            "amount",
            "payer",
            "beneficiaries",
        ])?;

        for expense in &expenses {
            let beneficiaries: Vec<&str> =
                expense.beneficiaries.iter().map(String::as_str).collect();
            csv_writer.write_record([
                expense.id.to_string(),
                expense.created_at.to_rfc3339(),
                expense.title.clone(),
                format_cents(expense.amount_cents),
                expense.payer.clone(),
                beneficiaries.join(";"),
            ])?;
        }

        csv_writer.flush()?;
        Ok(expenses.len())
    }

    /// Export the reimbursements that settle a trip to CSV format
    pub async fn export_settlement_csv<W: Write>(
        &self,
        trip_title: &str,
        writer: W,
    ) -> Result<usize> {
        let (_, settlement) = self.service.settle_trip(trip_title).await?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record(["from", "to", "amount"])?;
        for r in &settlement.reimbursements {
            csv_writer.write_record([
                r.from.as_str(),
                r.to.as_str(),
                format_cents(r.amount_cents).as_str(),
            ])?;
        }

        csv_writer.flush()?;
        Ok(settlement.reimbursements.len())
    }

    /// Export balances and reimbursements to JSON format
    pub async fn export_settlement_json<W: Write>(
        &self,
        trip_title: &str,
        mut writer: W,
    ) -> Result<SettlementReport> {
        let (trip, settlement) = self.service.settle_trip(trip_title).await?;
        let report = SettlementReport::new(trip.title, &settlement);

        serde_json::to_writer_pretty(&mut writer, &report)?;
        writeln!(writer)?;
        Ok(report)
    }
}
