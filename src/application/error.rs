use chrono::NaiveDate;
use thiserror::Error;

use crate::domain::SettlementError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Trip not found: {0}")]
    TripNotFound(String),

    #[error("Trip already exists: {0}")]
    TripAlreadyExists(String),

    #[error("Trip '{title}' ends ({end}) before it starts ({start})")]
    InvalidDateRange {
        title: String,
        start: NaiveDate,
        end: NaiveDate,
    },

    #[error("'{participant}' is not a participant of trip '{trip}'")]
    UnknownParticipant { trip: String, participant: String },

    #[error("'{participant}' already takes part in trip '{trip}'")]
    ParticipantAlreadyExists { trip: String, participant: String },

    #[error("Participant name cannot be empty")]
    EmptyParticipantName,

    #[error("Activity date {date} is outside trip '{trip}'")]
    ActivityOutsideTrip { trip: String, date: NaiveDate },

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Expense not found: {0}")]
    ExpenseNotFound(String),

    #[error(transparent)]
    Settlement(#[from] SettlementError),

    #[error("Database error: {0}")]
    Database(#[from] anyhow::Error),
}
