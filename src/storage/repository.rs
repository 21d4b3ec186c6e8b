use std::collections::BTreeSet;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{Row, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::domain::{
    Activity, ActivityKind, Cents, Expense, ExpenseId, ParticipantId, Trip, TripId,
};

use super::MIGRATION_001_INITIAL;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Repository for persisting and querying trips, activities and expenses.
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database at the given URL.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_INITIAL)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;
        Ok(())
    }

    /// Initialize a new database (connect + migrate).
    pub async fn init(database_url: &str) -> Result<Self> {
        let repo = Self::connect(database_url).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    // ========================
    // Trip operations
    // ========================

    pub async fn save_trip(&self, trip: &Trip) -> Result<()> {
        let participants_json = serde_json::to_string(&trip.participants)?;

        sqlx::query(
            r#"
            INSERT INTO trips (id, title, start_date, end_date, participants, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(trip.id.to_string())
        .bind(&trip.title)
        .bind(trip.start_date.format(DATE_FORMAT).to_string())
        .bind(trip.end_date.format(DATE_FORMAT).to_string())
        .bind(&participants_json)
        .bind(trip.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to save trip")?;
        Ok(())
    }

    pub async fn get_trip(&self, id: TripId) -> Result<Option<Trip>> {
        let row = sqlx::query(
            r#"
            SELECT id, title, start_date, end_date, participants, created_at
            FROM trips
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch trip")?;

        row.as_ref().map(Self::row_to_trip).transpose()
    }

    pub async fn get_trip_by_title(&self, title: &str) -> Result<Option<Trip>> {
        let row = sqlx::query(
            r#"
            SELECT id, title, start_date, end_date, participants, created_at
            FROM trips
            WHERE title = ?
            "#,
        )
        .bind(title)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch trip by title")?;

        row.as_ref().map(Self::row_to_trip).transpose()
    }

    /// List all trips, earliest start first.
    pub async fn list_trips(&self) -> Result<Vec<Trip>> {
        let rows = sqlx::query(
            r#"
            SELECT id, title, start_date, end_date, participants, created_at
            FROM trips
            ORDER BY start_date, title
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list trips")?;

        rows.iter().map(Self::row_to_trip).collect()
    }

    pub async fn update_trip_participants(
        &self,
        id: TripId,
        participants: &[ParticipantId],
    ) -> Result<()> {
        let participants_json = serde_json::to_string(participants)?;
        sqlx::query("UPDATE trips SET participants = ? WHERE id = ?")
            .bind(&participants_json)
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .context("Failed to update trip participants")?;
        Ok(())
    }

    fn row_to_trip(row: &sqlx::sqlite::SqliteRow) -> Result<Trip> {
        let id_str: String = row.get("id");
        let start_str: String = row.get("start_date");
        let end_str: String = row.get("end_date");
        let participants_json: String = row.get("participants");
        let created_at_str: String = row.get("created_at");

        Ok(Trip {
            id: Uuid::parse_str(&id_str).context("Invalid trip ID")?,
            title: row.get("title"),
            start_date: NaiveDate::parse_from_str(&start_str, DATE_FORMAT)
                .context("Invalid start_date")?,
            end_date: NaiveDate::parse_from_str(&end_str, DATE_FORMAT)
                .context("Invalid end_date")?,
            participants: serde_json::from_str(&participants_json)
                .context("Invalid participants list")?,
            created_at: DateTime::parse_from_rfc3339(&created_at_str)
                .context("Invalid created_at timestamp")?
                .with_timezone(&Utc),
        })
    }

    // ========================
    // Activity operations
    // ========================

    pub async fn save_activity(&self, activity: &Activity) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO activities (id, trip_id, name, date, kind, cost_cents)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(activity.id.to_string())
        .bind(activity.trip_id.to_string())
        .bind(&activity.name)
        .bind(activity.date.format(DATE_FORMAT).to_string())
        .bind(activity.kind.as_str())
        .bind(activity.cost_cents)
        .execute(&self.pool)
        .await
        .context("Failed to save activity")?;
        Ok(())
    }

    pub async fn list_activities_for_trip(&self, trip_id: TripId) -> Result<Vec<Activity>> {
        let rows = sqlx::query(
            r#"
            SELECT id, trip_id, name, date, kind, cost_cents
            FROM activities
            WHERE trip_id = ?
            ORDER BY date, name
            "#,
        )
        .bind(trip_id.to_string())
        .fetch_all(&self.pool)
        .await
        .context("Failed to list activities")?;

        rows.iter().map(Self::row_to_activity).collect()
    }

    fn row_to_activity(row: &sqlx::sqlite::SqliteRow) -> Result<Activity> {
        let id_str: String = row.get("id");
        let trip_id_str: String = row.get("trip_id");
        let date_str: String = row.get("date");
        let kind_str: String = row.get("kind");

        Ok(Activity {
            id: Uuid::parse_str(&id_str).context("Invalid activity ID")?,
            trip_id: Uuid::parse_str(&trip_id_str).context("Invalid trip ID")?,
            name: row.get("name"),
            date: NaiveDate::parse_from_str(&date_str, DATE_FORMAT)
                .context("Invalid activity date")?,
            kind: kind_str
                .parse::<ActivityKind>()
                .map_err(|e| anyhow::anyhow!(e))?,
            cost_cents: row.get("cost_cents"),
        })
    }

    // ========================
    // Expense operations
    // ========================

    pub async fn save_expense(&self, expense: &Expense) -> Result<()> {
        let beneficiaries_json = serde_json::to_string(&expense.beneficiaries)?;

        sqlx::query(
            r#"
            INSERT INTO expenses (id, trip_id, title, amount_cents, payer, beneficiaries, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(expense.id.to_string())
        .bind(expense.trip_id.to_string())
        .bind(&expense.title)
        .bind(expense.amount_cents)
        .bind(&expense.payer)
        .bind(&beneficiaries_json)
        .bind(expense.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to save expense")?;
        Ok(())
    }

    pub async fn get_expense(&self, id: ExpenseId) -> Result<Option<Expense>> {
        let row = sqlx::query(
            r#"
            SELECT id, trip_id, title, amount_cents, payer, beneficiaries, created_at
            FROM expenses
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch expense")?;

        row.as_ref().map(Self::row_to_expense).transpose()
    }

    /// All expenses of a trip in one read, oldest first.
    pub async fn list_expenses_for_trip(&self, trip_id: TripId) -> Result<Vec<Expense>> {
        let rows = sqlx::query(
            r#"
            SELECT id, trip_id, title, amount_cents, payer, beneficiaries, created_at
            FROM expenses
            WHERE trip_id = ?
            ORDER BY created_at, id
            "#,
        )
        .bind(trip_id.to_string())
        .fetch_all(&self.pool)
        .await
        .context("Failed to list expenses for trip")?;

        debug!(%trip_id, count = rows.len(), "loaded expenses");
        rows.iter().map(Self::row_to_expense).collect()
    }

    /// Overwrite every mutable column of a stored expense.
    /// Returns false if no expense has that ID.
    pub async fn replace_expense(&self, expense: &Expense) -> Result<bool> {
        let beneficiaries_json = serde_json::to_string(&expense.beneficiaries)?;

        let result = sqlx::query(
            r#"
            UPDATE expenses
            SET title = ?, amount_cents = ?, payer = ?, beneficiaries = ?
            WHERE id = ?
            "#,
        )
        .bind(&expense.title)
        .bind(expense.amount_cents)
        .bind(&expense.payer)
        .bind(&beneficiaries_json)
        .bind(expense.id.to_string())
        .execute(&self.pool)
        .await
        .context("Failed to replace expense")?;

        Ok(result.rows_affected() > 0)
    }

    /// Returns false if no expense has that ID.
    pub async fn delete_expense(&self, id: ExpenseId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM expenses WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .context("Failed to delete expense")?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn count_expenses_for_trip(&self, trip_id: TripId) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM expenses WHERE trip_id = ?")
            .bind(trip_id.to_string())
            .fetch_one(&self.pool)
            .await
            .context("Failed to count expenses")?;
        Ok(row.get("count"))
    }

    pub async fn sum_expenses_for_trip(&self, trip_id: TripId) -> Result<Cents> {
        let row = sqlx::query(
            "SELECT COALESCE(SUM(amount_cents), 0) as total FROM expenses WHERE trip_id = ?",
        )
        .bind(trip_id.to_string())
        .fetch_one(&self.pool)
        .await
        .context("Failed to sum expenses")?;
        Ok(row.get("total"))
    }

    fn row_to_expense(row: &sqlx::sqlite::SqliteRow) -> Result<Expense> {
        let id_str: String = row.get("id");
        let trip_id_str: String = row.get("trip_id");
        let beneficiaries_json: String = row.get("beneficiaries");
        let created_at_str: String = row.get("created_at");

        let beneficiaries: BTreeSet<ParticipantId> =
            serde_json::from_str(&beneficiaries_json).context("Invalid beneficiaries list")?;

        Ok(Expense {
            id: Uuid::parse_str(&id_str).context("Invalid expense ID")?,
            trip_id: Uuid::parse_str(&trip_id_str).context("Invalid trip ID")?,
            title: row.get("title"),
            amount_cents: row.get("amount_cents"),
            payer: row.get("payer"),
            beneficiaries,
            created_at: DateTime::parse_from_rfc3339(&created_at_str)
                .context("Invalid created_at timestamp")?
                .with_timezone(&Utc),
        })
    }
}
