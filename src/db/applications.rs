use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{params, Row};

use crate::db::{
    helpers::{parse_category, parse_datetime, parse_state, to_u32},
    models::{IntakeState, TrackedApplication},
    Database,
};

fn row_to_application(row: &Row) -> Result<TrackedApplication> {
    let category: String = row.get("category")?;
    let state: String = row.get("state")?;
    let city_id: Option<i64> = row.get("city_id")?;
    let checks: i64 = row.get("checks_since_change")?;
    let created_at: String = row.get("created_at")?;
    let updated_at: String = row.get("updated_at")?;

    Ok(TrackedApplication {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        category: parse_category(&category)?,
        state: parse_state(&state)?,
        application_number: row.get("application_number")?,
        city_id: city_id.map(|id| to_u32(id, "city_id")).transpose()?,
        status: row.get("status")?,
        checks_since_change: to_u32(checks, "checks_since_change")?,
        created_at: parse_datetime(&created_at, "created_at")?,
        updated_at: parse_datetime(&updated_at, "updated_at")?,
    })
}

impl Database {
    pub async fn insert_application(&self, application: &TrackedApplication) -> Result<()> {
        let record = application.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO applications (id, user_id, category, state, application_number, city_id, status, checks_since_change, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    record.id,
                    record.user_id,
                    record.category.as_str(),
                    record.state.as_str(),
                    record.application_number,
                    record.city_id.map(i64::from),
                    record.status,
                    i64::from(record.checks_since_change),
                    record.created_at.to_rfc3339(),
                    record.updated_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
        .await
    }

    pub async fn find_by_user(&self, user_id: i64) -> Result<Option<TrackedApplication>> {
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, category, state, application_number, city_id, status, checks_since_change, created_at, updated_at
                 FROM applications
                 WHERE user_id = ?1",
            )?;

            let mut rows = stmt.query(params![user_id])?;
            let application = match rows.next()? {
                Some(row) => Some(row_to_application(row)?),
                None => None,
            };
            Ok(application)
        })
        .await
    }

    pub async fn list_applications(&self) -> Result<Vec<TrackedApplication>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, category, state, application_number, city_id, status, checks_since_change, created_at, updated_at
                 FROM applications
                 ORDER BY created_at ASC",
            )?;

            let mut rows = stmt.query([])?;
            let mut applications = Vec::new();
            while let Some(row) = rows.next()? {
                applications.push(row_to_application(row)?);
            }

            Ok(applications)
        })
        .await
    }

    /// Short-validity intake: number and first status arrive together, the
    /// record goes straight to `Tracking` with one check on the clock.
    pub async fn begin_tracking_short(
        &self,
        application_id: &str,
        number: &str,
        status: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<()> {
        let application_id = application_id.to_string();
        let number = number.to_string();
        let status = status.to_string();
        self.execute(move |conn| {
            conn.execute(
                "UPDATE applications
                 SET application_number = ?1,
                     status = ?2,
                     checks_since_change = 1,
                     state = ?3,
                     updated_at = ?4
                 WHERE id = ?5",
                params![
                    number,
                    status,
                    IntakeState::Tracking.as_str(),
                    updated_at.to_rfc3339(),
                    application_id,
                ],
            )?;
            Ok(())
        })
        .await
    }

    /// Long-validity intake step one: store the number and wait for the city.
    pub async fn set_application_number(
        &self,
        application_id: &str,
        number: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<()> {
        let application_id = application_id.to_string();
        let number = number.to_string();
        self.execute(move |conn| {
            conn.execute(
                "UPDATE applications
                 SET application_number = ?1,
                     state = ?2,
                     updated_at = ?3
                 WHERE id = ?4",
                params![
                    number,
                    IntakeState::AwaitingCity.as_str(),
                    updated_at.to_rfc3339(),
                    application_id,
                ],
            )?;
            Ok(())
        })
        .await
    }

    /// Long-validity intake step two: city resolved, record becomes trackable.
    pub async fn set_city(
        &self,
        application_id: &str,
        city_id: u32,
        updated_at: DateTime<Utc>,
    ) -> Result<()> {
        let application_id = application_id.to_string();
        self.execute(move |conn| {
            conn.execute(
                "UPDATE applications
                 SET city_id = ?1,
                     state = ?2,
                     updated_at = ?3
                 WHERE id = ?4",
                params![
                    i64::from(city_id),
                    IntakeState::Tracking.as_str(),
                    updated_at.to_rfc3339(),
                    application_id,
                ],
            )?;
            Ok(())
        })
        .await
    }

    pub async fn update_poll_result(
        &self,
        application_id: &str,
        status: &str,
        checks_since_change: u32,
        updated_at: DateTime<Utc>,
    ) -> Result<()> {
        let application_id = application_id.to_string();
        let status = status.to_string();
        self.execute(move |conn| {
            conn.execute(
                "UPDATE applications
                 SET status = ?1,
                     checks_since_change = ?2,
                     updated_at = ?3
                 WHERE id = ?4",
                params![
                    status,
                    i64::from(checks_since_change),
                    updated_at.to_rfc3339(),
                    application_id,
                ],
            )?;
            Ok(())
        })
        .await
    }

    pub async fn update_checks_since_change(
        &self,
        application_id: &str,
        checks_since_change: u32,
        updated_at: DateTime<Utc>,
    ) -> Result<()> {
        let application_id = application_id.to_string();
        self.execute(move |conn| {
            conn.execute(
                "UPDATE applications
                 SET checks_since_change = ?1,
                     updated_at = ?2
                 WHERE id = ?3",
                params![
                    i64::from(checks_since_change),
                    updated_at.to_rfc3339(),
                    application_id,
                ],
            )?;
            Ok(())
        })
        .await
    }

    pub async fn delete_application(&self, application_id: &str) -> Result<()> {
        let application_id = application_id.to_string();
        self.execute(move |conn| {
            conn.execute(
                "DELETE FROM applications WHERE id = ?1",
                params![application_id],
            )?;
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    use crate::db::{Category, Database, IntakeState, TrackedApplication};

    fn temp_db() -> (tempfile::TempDir, Database) {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = Database::new(dir.path().join("passtrack.sqlite3")).expect("open db");
        (dir, db)
    }

    #[tokio::test]
    async fn insert_and_find_round_trip() {
        let (_dir, db) = temp_db();
        let record = TrackedApplication::new(42, Category::ShortValidity, Utc::now());
        db.insert_application(&record).await.unwrap();

        let found = db.find_by_user(42).await.unwrap().expect("record");
        assert_eq!(found.id, record.id);
        assert_eq!(found.category, Category::ShortValidity);
        assert_eq!(found.state, IntakeState::AwaitingNumber);
        assert_eq!(found.application_number, None);
        assert_eq!(found.checks_since_change, 0);
    }

    #[tokio::test]
    async fn user_id_is_unique() {
        let (_dir, db) = temp_db();
        let first = TrackedApplication::new(7, Category::ShortValidity, Utc::now());
        let second = TrackedApplication::new(7, Category::LongValidity, Utc::now());

        db.insert_application(&first).await.unwrap();
        assert!(db.insert_application(&second).await.is_err());
    }

    #[tokio::test]
    async fn long_validity_intake_updates() {
        let (_dir, db) = temp_db();
        let record = TrackedApplication::new(9, Category::LongValidity, Utc::now());
        db.insert_application(&record).await.unwrap();

        db.set_application_number(&record.id, "2000123456", Utc::now())
            .await
            .unwrap();
        let mid = db.find_by_user(9).await.unwrap().unwrap();
        assert_eq!(mid.state, IntakeState::AwaitingCity);
        assert_eq!(mid.application_number.as_deref(), Some("2000123456"));
        assert_eq!(mid.city_id, None);

        db.set_city(&record.id, 77, Utc::now()).await.unwrap();
        let done = db.find_by_user(9).await.unwrap().unwrap();
        assert_eq!(done.state, IntakeState::Tracking);
        assert_eq!(done.city_id, Some(77));
        assert!(done.is_trackable());
    }

    #[tokio::test]
    async fn delete_clears_record_for_fresh_start() {
        let (_dir, db) = temp_db();
        let record = TrackedApplication::new(5, Category::ShortValidity, Utc::now());
        db.insert_application(&record).await.unwrap();
        db.begin_tracking_short(&record.id, "A123", "В обработке", Utc::now())
            .await
            .unwrap();

        db.delete_application(&record.id).await.unwrap();
        assert!(db.find_by_user(5).await.unwrap().is_none());

        let fresh = TrackedApplication::new(5, Category::LongValidity, Utc::now());
        db.insert_application(&fresh).await.unwrap();
        let found = db.find_by_user(5).await.unwrap().unwrap();
        assert_eq!(found.application_number, None);
        assert_eq!(found.city_id, None);
    }
}
