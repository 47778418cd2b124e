pub mod types;

use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension};
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{RaghuError, Result};
pub use types::{FarmingRequest, Language, NewRequest, Rating};

const SELECT_COLUMNS: &str = "id, name, phone, location, soil_type, crop, issue_type,
     description, language, rating, answer, created_at, updated_at";

/// Document store for farming requests.  Every method is a single
/// statement, so each write is atomic on its own row.
#[derive(Clone)]
pub struct RequestStore {
    db: Arc<Mutex<Connection>>,
}

impl RequestStore {
    pub fn new(db: Arc<Mutex<Connection>>) -> Self {
        Self { db }
    }

    /// Insert a new request under a fresh id.  Fields are stored exactly
    /// as given.
    pub async fn insert(&self, req: &NewRequest) -> Result<FarmingRequest> {
        let id = Uuid::new_v4().to_string();
        let now = now();
        let language = Language::parse(&req.language);

        let db = self.db.lock().await;
        db.execute(
            "INSERT INTO farming_requests
                (id, name, phone, location, soil_type, crop, issue_type,
                 description, language, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)",
            rusqlite::params![
                id,
                req.name,
                req.phone,
                req.location,
                req.soil_type,
                req.crop,
                req.issue_type,
                req.description,
                language.as_str(),
                now,
            ],
        )?;
        debug!(id = %id, "farming request inserted");

        Ok(FarmingRequest {
            id,
            name: req.name.clone(),
            phone: req.phone.clone(),
            location: req.location.clone(),
            soil_type: req.soil_type.clone(),
            crop: req.crop.clone(),
            issue_type: req.issue_type.clone(),
            description: req.description.clone(),
            language,
            rating: None,
            answer: None,
            created_at: now.clone(),
            updated_at: now,
        })
    }

    pub async fn get(&self, id: &str) -> Result<Option<FarmingRequest>> {
        let db = self.db.lock().await;
        let record = db
            .query_row(
                &format!("SELECT {SELECT_COLUMNS} FROM farming_requests WHERE id = ?1"),
                [id],
                row_to_request,
            )
            .optional()?;
        Ok(record)
    }

    /// Overwrite the rating.  Errors with `NotFound` when no row matches.
    pub async fn set_rating(&self, id: &str, rating: Rating) -> Result<()> {
        let db = self.db.lock().await;
        let rows = db.execute(
            "UPDATE farming_requests SET rating = ?1, updated_at = ?2 WHERE id = ?3",
            rusqlite::params![rating.as_str(), now(), id],
        )?;
        if rows == 0 {
            return Err(RaghuError::NotFound(format!("request {id}")));
        }
        Ok(())
    }

    /// Remember a generated answer for later page loads.
    pub async fn set_answer(&self, id: &str, answer: &str) -> Result<()> {
        let db = self.db.lock().await;
        let rows = db.execute(
            "UPDATE farming_requests SET answer = ?1, updated_at = ?2 WHERE id = ?3",
            rusqlite::params![answer, now(), id],
        )?;
        if rows == 0 {
            return Err(RaghuError::NotFound(format!("request {id}")));
        }
        Ok(())
    }

    /// Cheap probe that the connection still answers queries.
    pub async fn health_check(&self) -> Result<()> {
        let db = self.db.lock().await;
        db.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
        Ok(())
    }

    /// Flush the write-ahead log before the process exits.
    pub async fn shutdown(&self) -> Result<()> {
        let db = self.db.lock().await;
        db.query_row("PRAGMA wal_checkpoint(TRUNCATE)", [], |_| Ok(()))?;
        info!("request store checkpointed");
        Ok(())
    }
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn row_to_request(row: &rusqlite::Row<'_>) -> rusqlite::Result<FarmingRequest> {
    let language: String = row.get(8)?;
    let rating: Option<String> = row.get(9)?;
    Ok(FarmingRequest {
        id: row.get(0)?,
        name: row.get(1)?,
        phone: row.get(2)?,
        location: row.get(3)?,
        soil_type: row.get(4)?,
        crop: row.get(5)?,
        issue_type: row.get(6)?,
        description: row.get(7)?,
        language: Language::parse(&language),
        // the CHECK constraint keeps unknown values out of the table
        rating: rating.and_then(|r| r.parse().ok()),
        answer: row.get(10)?,
        created_at: row.get(11)?,
        updated_at: row.get(12)?,
    })
}
