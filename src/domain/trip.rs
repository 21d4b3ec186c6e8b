use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Cents;

pub type TripId = Uuid;

/// Participants are identified by their username within a trip.
pub type ParticipantId = String;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trip {
    pub id: TripId,
    pub title: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Roster in the order participants joined
    pub participants: Vec<ParticipantId>,
    pub created_at: DateTime<Utc>,
}

impl Trip {
    pub fn new(title: String, start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            id: Uuid::new_v4(),
            title,
            start_date,
            end_date,
            participants: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Add participants, skipping blanks and names already on the roster.
    pub fn with_participants<I, S>(mut self, participants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for name in participants {
            self.add_participant(name.as_ref());
        }
        self
    }

    /// Returns false if the name was blank or already present.
    pub fn add_participant(&mut self, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() || self.has_participant(name) {
            return false;
        }
        self.participants.push(name.to_string());
        true
    }

    pub fn has_participant(&self, name: &str) -> bool {
        self.participants.iter().any(|p| p == name)
    }

    pub fn contains_date(&self, date: NaiveDate) -> bool {
        date >= self.start_date && date <= self.end_date
    }

    /// Number of calendar days covered, both ends included.
    pub fn duration_days(&self) -> i64 {
        (self.end_date - self.start_date).num_days() + 1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    Transport,
    Lodging,
    Activity,
    Meal,
}

impl ActivityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityKind::Transport => "transport",
            ActivityKind::Lodging => "lodging",
            ActivityKind::Activity => "activity",
            ActivityKind::Meal => "meal",
        }
    }
}

impl std::str::FromStr for ActivityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "transport" => Ok(ActivityKind::Transport),
            "lodging" => Ok(ActivityKind::Lodging),
            "activity" => Ok(ActivityKind::Activity),
            "meal" => Ok(ActivityKind::Meal),
            other => Err(format!("unknown activity kind: {}", other)),
        }
    }
}

impl std::fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A planned item on the trip itinerary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    pub id: Uuid,
    pub trip_id: TripId,
    pub name: String,
    pub date: NaiveDate,
    pub kind: ActivityKind,
    /// Planned cost, informational only (not part of the settlement)
    pub cost_cents: Option<Cents>,
}

impl Activity {
    pub fn new(trip_id: TripId, name: String, date: NaiveDate, kind: ActivityKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            trip_id,
            name,
            date,
            kind,
            cost_cents: None,
        }
    }

    pub fn with_cost(mut self, cost_cents: Cents) -> Self {
        self.cost_cents = Some(cost_cents);
        self
    }
}

/// Activities planned on one calendar day.
#[derive(Debug, Clone)]
pub struct ItineraryDay {
    pub date: NaiveDate,
    pub activities: Vec<Activity>,
    pub planned_cost: Cents,
}

/// Group activities by day, one entry per day of the trip.
/// Activities dated outside the trip are left out.
pub fn build_itinerary(trip: &Trip, activities: &[Activity]) -> Vec<ItineraryDay> {
    trip.start_date
        .iter_days()
        .take_while(|date| *date <= trip.end_date)
        .map(|date| {
            let mut day: Vec<Activity> = activities
                .iter()
                .filter(|a| a.date == date)
                .cloned()
                .collect();
            day.sort_by(|a, b| a.name.cmp(&b.name));
            let planned_cost = day.iter().filter_map(|a| a.cost_cents).sum();
            ItineraryDay {
                date,
                activities: day,
                planned_cost,
            }
        })
        .collect()
}
