//! Tracked-application data model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Passport validity class. The wire value doubles as the inline-keyboard
/// callback payload ("5" / "10" years).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Category {
    ShortValidity,
    LongValidity,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::ShortValidity => "5",
            Category::LongValidity => "10",
        }
    }

    pub fn from_callback(payload: &str) -> Option<Self> {
        match payload {
            "5" => Some(Category::ShortValidity),
            "10" => Some(Category::LongValidity),
            _ => None,
        }
    }
}

/// Intake progress of a tracked application. A record is only polled by the
/// reconcile loop once it reaches `Tracking`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum IntakeState {
    AwaitingNumber,
    AwaitingCity,
    Tracking,
}

impl IntakeState {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntakeState::AwaitingNumber => "AwaitingNumber",
            IntakeState::AwaitingCity => "AwaitingCity",
            IntakeState::Tracking => "Tracking",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackedApplication {
    pub id: String,
    pub user_id: i64,
    pub category: Category,
    pub state: IntakeState,
    pub application_number: Option<String>,
    pub city_id: Option<u32>,
    pub status: Option<String>,
    pub checks_since_change: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TrackedApplication {
    /// New record in the state right after category selection.
    pub fn new(user_id: i64, category: Category, now: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id,
            category,
            state: IntakeState::AwaitingNumber,
            application_number: None,
            city_id: None,
            status: None,
            checks_since_change: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the reconcile loop should poll this record.
    pub fn is_trackable(&self) -> bool {
        self.state == IntakeState::Tracking
    }
}
