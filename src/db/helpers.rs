use std::convert::TryFrom;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};

use crate::db::models::{Category, IntakeState};

pub fn to_u32(value: i64, field: &str) -> Result<u32> {
    u32::try_from(value).map_err(|_| anyhow!("{field} contains out-of-range value {value}"))
}

pub fn parse_datetime(value: &str, field: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("failed to parse {field}"))
}

pub fn parse_category(value: &str) -> Result<Category> {
    match value {
        "5" => Ok(Category::ShortValidity),
        "10" => Ok(Category::LongValidity),
        other => Err(anyhow!("unknown application category {other}")),
    }
}

pub fn parse_state(value: &str) -> Result<IntakeState> {
    match value {
        "AwaitingNumber" => Ok(IntakeState::AwaitingNumber),
        "AwaitingCity" => Ok(IntakeState::AwaitingCity),
        "Tracking" => Ok(IntakeState::Tracking),
        other => Err(anyhow!("unknown intake state {other}")),
    }
}
