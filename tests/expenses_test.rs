mod common;

use anyhow::Result;
use common::{names, test_service, StandardTrips};
use tripsplit::application::{AppError, ExpenseUpdate};
use uuid::Uuid;

#[tokio::test]
async fn test_record_and_list_expenses() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let trip = StandardTrips::create_weekend(&service).await?;

    let dinner = service
        .record_expense("Weekend", "Dinner".into(), 7500, "B", names(&["A", "B"]))
        .await?;
    let taxi = service
        .record_expense("Weekend", "Taxi".into(), 1800, "C", names(&["C"]))
        .await?;

    let expenses = service.list_expenses("Weekend").await?;
    assert_eq!(expenses.len(), 2);
    assert!(expenses.iter().all(|e| e.trip_id == trip.id));
    assert!(expenses.iter().any(|e| e.id == dinner.id));
    assert!(expenses.iter().any(|e| e.id == taxi.id));

    let stored = service.get_expense(dinner.id).await?;
    assert_eq!(stored.title, "Dinner");
    assert_eq!(stored.payer, "B");
    assert_eq!(stored.beneficiaries.len(), 2);

    let info = service.get_trip_info("Weekend").await?;
    assert_eq!(info.expense_count, 2);
    assert_eq!(info.total_spent, 9300);

    Ok(())
}

#[tokio::test]
async fn test_no_beneficiaries_means_everyone() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardTrips::create_weekend(&service).await?;

    let expense = service
        .record_expense("Weekend", "Groceries".into(), 6000, "A", vec![])
        .await?;

    assert_eq!(expense.beneficiaries.len(), 3);
    assert!(expense.is_beneficiary("A"));
    assert!(expense.is_beneficiary("B"));
    assert!(expense.is_beneficiary("C"));

    Ok(())
}

#[tokio::test]
async fn test_participants_must_be_on_roster() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardTrips::create_weekend(&service).await?;

    let result = service
        .record_expense("Weekend", "Drinks".into(), 2000, "Z", names(&["A"]))
        .await;
    assert!(matches!(result, Err(AppError::UnknownParticipant { .. })));

    let result = service
        .record_expense("Weekend", "Drinks".into(), 2000, "A", names(&["A", "Z"]))
        .await;
    assert!(matches!(result, Err(AppError::UnknownParticipant { .. })));

    assert!(service.list_expenses("Weekend").await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_blank_beneficiaries_mean_everyone() -> Result<()> {
    let (service, _temp) = test_service().await?;
    service
        .create_trip(
            "Solo".into(),
            common::date("2024-01-01"),
            common::date("2024-01-02"),
            vec![],
        )
        .await?;
    service.add_participant("Solo", "solo").await?;

    // Blank names are dropped and the roster stands in for the whole group
    let expense = service
        .record_expense("Solo", "Ticket".into(), 500, "solo", names(&[" "]))
        .await?;
    assert_eq!(expense.beneficiaries.len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_update_expense_replaces_record() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let trip = StandardTrips::create_weekend(&service).await?;
    let original = service
        .record_expense("Weekend", "Hotel".into(), 30000, "A", vec![])
        .await?;

    let updated = service
        .update_expense(
            original.id,
            ExpenseUpdate {
                amount_cents: Some(24000),
                beneficiaries: Some(names(&["A", "B"])),
                ..Default::default()
            },
        )
        .await?;

    assert_eq!(updated.id, original.id);
    assert_eq!(updated.title, "Hotel");
    assert_eq!(updated.payer, "A");
    assert_eq!(updated.amount_cents, 24000);
    assert_eq!(updated.created_at, original.created_at);

    let stored = service.get_expense(original.id).await?;
    assert_eq!(stored.amount_cents, 24000);
    assert!(!stored.is_beneficiary("C"));

    let settlement = service.compute_settlement(trip.id).await?;
    assert_eq!(settlement.balances.get("A"), Some(&12000));
    assert_eq!(settlement.balances.get("B"), Some(&-12000));
    assert_eq!(settlement.balances.get("C"), None);

    Ok(())
}

#[tokio::test]
async fn test_update_expense_validates_like_new() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardTrips::create_weekend(&service).await?;
    let original = service
        .record_expense("Weekend", "Boat".into(), 5000, "B", vec![])
        .await?;

    let result = service
        .update_expense(
            original.id,
            ExpenseUpdate {
                amount_cents: Some(-5),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(result, Err(AppError::Settlement(_))));

    let result = service
        .update_expense(
            original.id,
            ExpenseUpdate {
                payer: Some("Z".into()),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(result, Err(AppError::UnknownParticipant { .. })));

    let stored = service.get_expense(original.id).await?;
    assert_eq!(stored, original);

    Ok(())
}

#[tokio::test]
async fn test_delete_expense() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardTrips::create_weekend(&service).await?;
    let expense = service
        .record_expense("Weekend", "Museum".into(), 3600, "C", vec![])
        .await?;

    let deleted = service.delete_expense(expense.id).await?;
    assert_eq!(deleted.id, expense.id);
    assert!(service.list_expenses("Weekend").await?.is_empty());

    let result = service.delete_expense(expense.id).await;
    assert!(matches!(result, Err(AppError::ExpenseNotFound(_))));

    let result = service.get_expense(Uuid::new_v4()).await;
    assert!(matches!(result, Err(AppError::ExpenseNotFound(_))));

    Ok(())
}

#[tokio::test]
async fn test_list_expenses_for_participant() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardTrips::create_weekend(&service).await?;
    let dinner = service
        .record_expense("Weekend", "Dinner".into(), 7500, "B", names(&["A", "B"]))
        .await?;
    let taxi = service
        .record_expense("Weekend", "Taxi".into(), 1800, "C", names(&["B"]))
        .await?;
    service
        .record_expense("Weekend", "Fuel".into(), 4000, "A", names(&["A"]))
        .await?;

    let for_b = service.list_expenses_for_participant("Weekend", "B").await?;
    let ids: Vec<_> = for_b.iter().map(|e| e.id).collect();
    assert_eq!(ids.len(), 2);
    assert!(ids.contains(&dinner.id));
    assert!(ids.contains(&taxi.id));

    let for_c = service.list_expenses_for_participant("Weekend", "C").await?;
    assert_eq!(for_c.len(), 1);
    assert_eq!(for_c[0].id, taxi.id);

    let result = service.list_expenses_for_participant("Weekend", "Z").await;
    assert!(matches!(result, Err(AppError::UnknownParticipant { .. })));

    Ok(())
}
