use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::domain::{
    build_itinerary, compute_settlement, Activity, ActivityKind, Cents, Expense, ExpenseId,
    ItineraryDay, ParticipantId, Settlement, Trip, TripId,
};
use crate::storage::Repository;

use super::AppError;

/// Application service providing the trip and settlement use cases.
/// This is the primary interface for any client (CLI, API, TUI, etc.).
pub struct TripService {
    repo: Repository,
}

/// Trip summary with aggregate figures
pub struct TripInfo {
    pub trip: Trip,
    pub expense_count: i64,
    pub total_spent: Cents,
    pub activity_count: usize,
}

/// Replacement values for an existing expense. `None` keeps the current value;
/// an empty beneficiary list means everyone on the roster.
#[derive(Debug, Default)]
pub struct ExpenseUpdate {
    pub title: Option<String>,
    pub amount_cents: Option<Cents>,
    pub payer: Option<String>,
    pub beneficiaries: Option<Vec<String>>,
}

impl TripService {
    /// Create a new trip service with the given repository.
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// Initialize a new database at the given path.
    pub async fn init(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}?mode=rwc", database_path);
        let repo = Repository::init(&db_url).await?;
        Ok(Self::new(repo))
    }

    /// Connect to an existing database.
    pub async fn connect(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}", database_path);
        let repo = Repository::connect(&db_url).await?;
        Ok(Self::new(repo))
    }

    // ========================
    // Trip operations
    // ========================

    /// Create a new trip with its initial roster.
    pub async fn create_trip(
        &self,
        title: String,
        start_date: NaiveDate,
        end_date: NaiveDate,
        participants: Vec<String>,
    ) -> Result<Trip, AppError> {
        if end_date < start_date {
            return Err(AppError::InvalidDateRange {
                title,
                start: start_date,
                end: end_date,
            });
        }

        if self.repo.get_trip_by_title(&title).await?.is_some() {
            return Err(AppError::TripAlreadyExists(title));
        }

        let trip = Trip::new(title, start_date, end_date).with_participants(participants);
        self.repo.save_trip(&trip).await?;

        info!(trip_id = %trip.id, title = %trip.title, participants = trip.participants.len(), "created trip");
        Ok(trip)
    }

    /// Get a trip by title.
    pub async fn get_trip(&self, title: &str) -> Result<Trip, AppError> {
        self.repo
            .get_trip_by_title(title)
            .await?
            .ok_or_else(|| AppError::TripNotFound(title.to_string()))
    }

    pub async fn list_trips(&self) -> Result<Vec<Trip>, AppError> {
        Ok(self.repo.list_trips().await?)
    }

    /// Get a trip with its expense and activity totals.
    pub async fn get_trip_info(&self, title: &str) -> Result<TripInfo, AppError> {
        let trip = self.get_trip(title).await?;
        let expense_count = self.repo.count_expenses_for_trip(trip.id).await?;
        let total_spent = self.repo.sum_expenses_for_trip(trip.id).await?;
        let activity_count = self.repo.list_activities_for_trip(trip.id).await?.len();

        Ok(TripInfo {
            trip,
            expense_count,
            total_spent,
            activity_count,
        })
    }

    /// Add a participant to a trip's roster.
    pub async fn add_participant(&self, title: &str, name: &str) -> Result<Trip, AppError> {
        let mut trip = self.get_trip(title).await?;
        let name = name.trim();

        if name.is_empty() {
            return Err(AppError::EmptyParticipantName);
        }
        if !trip.add_participant(name) {
            return Err(AppError::ParticipantAlreadyExists {
                trip: trip.title,
                participant: name.to_string(),
            });
        }

        self.repo
            .update_trip_participants(trip.id, &trip.participants)
            .await?;
        info!(trip_id = %trip.id, participant = name, "added participant");
        Ok(trip)
    }

    // ========================
    // Itinerary operations
    // ========================

    /// Plan an activity on one day of the trip.
    pub async fn add_activity(
        &self,
        title: &str,
        name: String,
        date: NaiveDate,
        kind: ActivityKind,
        cost_cents: Option<Cents>,
    ) -> Result<Activity, AppError> {
        let trip = self.get_trip(title).await?;

        if !trip.contains_date(date) {
            return Err(AppError::ActivityOutsideTrip {
                trip: trip.title,
                date,
            });
        }

        let mut activity = Activity::new(trip.id, name, date, kind);
        if let Some(cost) = cost_cents {
            if cost < 0 {
                return Err(AppError::InvalidAmount(
                    "Activity cost cannot be negative".to_string(),
                ));
            }
            activity = activity.with_cost(cost);
        }

        self.repo.save_activity(&activity).await?;
        Ok(activity)
    }

    /// Day-by-day plan of the trip.
    pub async fn get_itinerary(&self, title: &str) -> Result<(Trip, Vec<ItineraryDay>), AppError> {
        let trip = self.get_trip(title).await?;
        let activities = self.repo.list_activities_for_trip(trip.id).await?;
        let days = build_itinerary(&trip, &activities);
        Ok((trip, days))
    }

    // ========================
    // Expense operations
    // ========================

    /// Record an expense paid by one participant for some (or all) of the others.
    pub async fn record_expense(
        &self,
        trip_title: &str,
        title: String,
        amount_cents: Cents,
        payer: &str,
        beneficiaries: Vec<String>,
    ) -> Result<Expense, AppError> {
        let trip = self.get_trip(trip_title).await?;
        let payer = Self::resolve_participant(&trip, payer)?;
        let beneficiaries = Self::resolve_beneficiaries(&trip, beneficiaries)?;

        let expense = Expense::new(trip.id, title, amount_cents, payer, beneficiaries)?;
        self.repo.save_expense(&expense).await?;

        info!(
            trip_id = %trip.id,
            expense_id = %expense.id,
            amount_cents = expense.amount_cents,
            "recorded expense"
        );
        Ok(expense)
    }

    pub async fn get_expense(&self, id: ExpenseId) -> Result<Expense, AppError> {
        self.repo
            .get_expense(id)
            .await?
            .ok_or_else(|| AppError::ExpenseNotFound(id.to_string()))
    }

    /// List a trip's expenses, oldest first.
    pub async fn list_expenses(&self, trip_title: &str) -> Result<Vec<Expense>, AppError> {
        let trip = self.get_trip(trip_title).await?;
        Ok(self.repo.list_expenses_for_trip(trip.id).await?)
    }

    /// List the expenses a participant paid for or shares in.
    pub async fn list_expenses_for_participant(
        &self,
        trip_title: &str,
        participant: &str,
    ) -> Result<Vec<Expense>, AppError> {
        let trip = self.get_trip(trip_title).await?;
        let participant = Self::resolve_participant(&trip, participant)?;
        let expenses = self.repo.list_expenses_for_trip(trip.id).await?;

        Ok(expenses
            .into_iter()
            .filter(|e| e.involves(&participant))
            .collect())
    }

    /// Replace an expense with an updated record, validated like a new one.
    pub async fn update_expense(
        &self,
        id: ExpenseId,
        update: ExpenseUpdate,
    ) -> Result<Expense, AppError> {
        let current = self.get_expense(id).await?;
        let trip = self
            .repo
            .get_trip(current.trip_id)
            .await?
            .ok_or_else(|| AppError::TripNotFound(current.trip_id.to_string()))?;

        let payer = match update.payer {
            Some(payer) => Self::resolve_participant(&trip, &payer)?,
            None => current.payer.clone(),
        };
        let beneficiaries = match update.beneficiaries {
            Some(list) => Self::resolve_beneficiaries(&trip, list)?,
            None => current.beneficiaries.iter().cloned().collect(),
        };

        let replacement = current.replaced_with(
            update.title.unwrap_or_else(|| current.title.clone()),
            update.amount_cents.unwrap_or(current.amount_cents),
            payer,
            beneficiaries,
        )?;

        if !self.repo.replace_expense(&replacement).await? {
            return Err(AppError::ExpenseNotFound(id.to_string()));
        }

        info!(expense_id = %id, "replaced expense");
        Ok(replacement)
    }

    pub async fn delete_expense(&self, id: ExpenseId) -> Result<Expense, AppError> {
        let expense = self.get_expense(id).await?;
        self.repo.delete_expense(id).await?;
        info!(expense_id = %id, "deleted expense");
        Ok(expense)
    }

    // ========================
    // Settlement
    // ========================

    /// Compute balances and reimbursements for a trip from one snapshot of its expenses.
    /// Nothing is stored; every call recomputes from scratch.
    pub async fn compute_settlement(&self, trip_id: TripId) -> Result<Settlement, AppError> {
        if self.repo.get_trip(trip_id).await?.is_none() {
            return Err(AppError::TripNotFound(trip_id.to_string()));
        }

        let expenses = self.repo.list_expenses_for_trip(trip_id).await?;

        match compute_settlement(&expenses) {
            Ok(settlement) => {
                debug!(
                    %trip_id,
                    expenses = expenses.len(),
                    participants = settlement.balances.len(),
                    transfers = settlement.reimbursements.len(),
                    "computed settlement"
                );
                Ok(settlement)
            }
            Err(e) => {
                warn!(%trip_id, error = %e, "settlement failed");
                Err(e.into())
            }
        }
    }

    /// Settlement for a trip looked up by title.
    pub async fn settle_trip(&self, title: &str) -> Result<(Trip, Settlement), AppError> {
        let trip = self.get_trip(title).await?;
        let settlement = self.compute_settlement(trip.id).await?;
        Ok((trip, settlement))
    }

    fn resolve_participant(trip: &Trip, name: &str) -> Result<ParticipantId, AppError> {
        let name = name.trim();
        if trip.has_participant(name) {
            Ok(name.to_string())
        } else {
            Err(AppError::UnknownParticipant {
                trip: trip.title.clone(),
                participant: name.to_string(),
            })
        }
    }

    /// An empty list stands for the whole roster.
    fn resolve_beneficiaries(
        trip: &Trip,
        names: Vec<String>,
    ) -> Result<Vec<ParticipantId>, AppError> {
        let names: Vec<&str> = names
            .iter()
            .map(|n| n.trim())
            .filter(|n| !n.is_empty())
            .collect();

        if names.is_empty() {
            return Ok(trip.participants.clone());
        }

        names
            .into_iter()
            .map(|name| Self::resolve_participant(trip, name))
            .collect()
    }
}
