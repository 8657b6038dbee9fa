//! SQLite-backed rating store
//!
//! One table keyed by participant identity. Increments are written as SQL
//! expressions inside a transaction, so concurrent result reports touching the
//! same participant never lose an update.

use crate::config::StorageSettings;
use crate::error::Result;
use crate::rating::storage::{validate_updates, RatingStore, RatingUpdate};
use crate::types::{ParticipantId, Record};
use anyhow::Context;
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use tracing::{debug, info};

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS ratings (
    name TEXT PRIMARY KEY NOT NULL,
    rating REAL NOT NULL,
    wins INTEGER NOT NULL DEFAULT 0,
    losses INTEGER NOT NULL DEFAULT 0
)";

const INSERT_DEFAULT: &str =
    "INSERT OR IGNORE INTO ratings (name, rating, wins, losses) VALUES (?, ?, 0, 0)";

/// Durable rating store
#[derive(Debug, Clone)]
pub struct SqliteRatingStore {
    pool: SqlitePool,
    initial_rating: f64,
}

impl SqliteRatingStore {
    /// Open (creating if needed) the database described by `settings`
    pub async fn connect(settings: &StorageSettings, initial_rating: f64) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(&settings.database_url)
            .with_context(|| format!("Invalid database URL {}", settings.database_url))?
            .create_if_missing(true);

        let in_memory = settings.database_url.contains(":memory:");
        let mut pool_options = SqlitePoolOptions::new();
        if in_memory {
            // Every connection to :memory: is its own database
            pool_options = pool_options
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        } else {
            pool_options = pool_options.max_connections(settings.max_connections);
        }

        let pool = pool_options
            .connect_with(options)
            .await
            .context("Failed to create SQLite connection pool")?;

        info!(
            "Connected rating store - url: {}, in_memory: {}",
            settings.database_url, in_memory
        );

        Self::from_pool(pool, initial_rating).await
    }

    /// Private in-memory database (tests, dry runs)
    pub async fn in_memory(initial_rating: f64) -> Result<Self> {
        let settings = StorageSettings {
            database_url: "sqlite::memory:".to_string(),
            max_connections: 1,
        };
        Self::connect(&settings, initial_rating).await
    }

    /// Wrap an existing pool and make sure the schema exists
    pub async fn from_pool(pool: SqlitePool, initial_rating: f64) -> Result<Self> {
        sqlx::query(CREATE_TABLE)
            .execute(&pool)
            .await
            .context("Failed to create ratings table")?;

        Ok(Self {
            pool,
            initial_rating,
        })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl RatingStore for SqliteRatingStore {
    async fn get_rating(&self, participant_id: &str) -> Result<f64> {
        let rating = sqlx::query_scalar::<_, f64>("SELECT rating FROM ratings WHERE name = ?")
            .bind(participant_id)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("Failed to read rating of {}", participant_id))?;

        Ok(rating.unwrap_or(self.initial_rating))
    }

    async fn ensure_participant(&self, participant_id: &str) -> Result<bool> {
        let result = sqlx::query(INSERT_DEFAULT)
            .bind(participant_id)
            .bind(self.initial_rating)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to register {}", participant_id))?;

        let created = result.rows_affected() == 1;
        if created {
            debug!("Registered participant '{}'", participant_id);
        }
        Ok(created)
    }

    async fn apply_delta(&self, participant_id: &str, delta: f64, won: bool) -> Result<()> {
        self.apply_deltas(&[RatingUpdate {
            participant_id: participant_id.to_string(),
            delta,
            won,
        }])
        .await
    }

    async fn apply_deltas(&self, updates: &[RatingUpdate]) -> Result<()> {
        validate_updates(updates)?;

        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin rating transaction")?;

        for update in updates {
            sqlx::query(INSERT_DEFAULT)
                .bind(&update.participant_id)
                .bind(self.initial_rating)
                .execute(&mut *tx)
                .await
                .with_context(|| format!("Failed to register {}", update.participant_id))?;

            sqlx::query(
                "UPDATE ratings SET rating = rating + ?, wins = wins + ?, losses = losses + ? WHERE name = ?",
            )
            .bind(update.delta)
            .bind(i64::from(update.won))
            .bind(i64::from(!update.won))
            .bind(&update.participant_id)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to update rating of {}", update.participant_id))?;
        }

        // Dropping the transaction on an early return rolls everything back
        tx.commit()
            .await
            .context("Failed to commit rating transaction")?;

        debug!("Committed {} rating updates", updates.len());
        Ok(())
    }

    async fn all_ratings(&self) -> Result<Vec<(ParticipantId, f64)>> {
        let rows = sqlx::query_as::<_, (String, f64)>("SELECT name, rating FROM ratings ORDER BY name")
            .fetch_all(&self.pool)
            .await
            .context("Failed to read ratings")?;

        Ok(rows)
    }

    async fn get_record(&self, participant_id: &str) -> Result<Option<Record>> {
        let row = sqlx::query_as::<_, (i64, i64)>("SELECT wins, losses FROM ratings WHERE name = ?")
            .bind(participant_id)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("Failed to read record of {}", participant_id))?;

        Ok(row.map(|(wins, losses)| Record {
            wins: wins.max(0) as u64,
            losses: losses.max(0) as u64,
        }))
    }
}
