// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use anyhow::Result;
use chrono::NaiveDate;
use tempfile::TempDir;
use tripsplit::application::TripService;
use tripsplit::domain::{Cents, Trip};

/// Helper to create a test service with a temporary database
pub async fn test_service() -> Result<(TripService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let service = TripService::init(db_path.to_str().unwrap()).await?;
    Ok((service, temp_dir))
}

/// Helper to parse a date string into NaiveDate
pub fn date(date_str: &str) -> NaiveDate {
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d").unwrap()
}

pub fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

/// Test fixture: standard trips
pub struct StandardTrips;

impl StandardTrips {
    /// Three friends on a long weekend
    pub async fn create_weekend(service: &TripService) -> Result<Trip> {
        Ok(service
            .create_trip(
                "Weekend".into(),
                date("2024-05-10"),
                date("2024-05-12"),
                names(&["A", "B", "C"]),
            )
            .await?)
    }

    /// Record an expense on the weekend trip
    pub async fn spend(
        service: &TripService,
        payer: &str,
        amount: Cents,
        beneficiaries: &[&str],
    ) -> Result<()> {
        service
            .record_expense("Weekend", "Shared".into(), amount, payer, names(beneficiaries))
            .await?;
        Ok(())
    }
}
