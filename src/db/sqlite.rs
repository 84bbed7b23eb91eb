use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};

use super::{AssessmentStore, CompletionWrite, ProfileStore, StoreError};
use crate::assessment::profile::SkillsProfile;
use crate::assessment::types::{Assessment, AssessmentStatus};

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS "assessments" (
    "id" TEXT PRIMARY KEY,
    "userId" TEXT NOT NULL,
    "status" TEXT NOT NULL,
    "document" TEXT NOT NULL,
    "updatedAt" TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS "idx_assessments_user" ON "assessments" ("userId");
CREATE TABLE IF NOT EXISTS "skills_profiles" (
    "learnerId" TEXT PRIMARY KEY,
    "document" TEXT NOT NULL,
    "updatedAt" TEXT NOT NULL
);
"#;

/// Assessment and profile documents stored as JSON in SQLite.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let in_memory = database_url.contains(":memory:");
        let mut options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .busy_timeout(Duration::from_secs(30));
        if !in_memory {
            options = options.journal_mode(SqliteJournalMode::Wal);
        }

        // each in-memory connection would otherwise open its own database
        let max_connections = if in_memory { 1 } else { 5 };
        let mut pool_options = SqlitePoolOptions::new().max_connections(max_connections);
        if in_memory {
            pool_options = pool_options.idle_timeout(None).max_lifetime(None);
        }
        let pool = pool_options
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.ensure_schema().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn ensure_schema(&self) -> Result<(), StoreError> {
        for stmt in SCHEMA_SQL.split(';') {
            let trimmed = stmt.trim();
            if trimmed.is_empty() {
                continue;
            }
            sqlx::query(trimmed).execute(&self.pool).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl AssessmentStore for SqliteStore {
    async fn load_assessment(&self, id: &str) -> Result<Option<Assessment>, StoreError> {
        let row = sqlx::query(r#"SELECT "document" FROM "assessments" WHERE "id" = ? LIMIT 1"#)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else { return Ok(None) };
        let document: String = row.try_get("document")?;
        Ok(Some(serde_json::from_str(&document)?))
    }

    async fn save_assessment(&self, assessment: &Assessment) -> Result<(), StoreError> {
        let document = serde_json::to_string(assessment)?;
        sqlx::query(
            r#"INSERT INTO "assessments" ("id","userId","status","document","updatedAt")
               VALUES (?,?,?,?,?)
               ON CONFLICT ("id") DO UPDATE SET
               "status" = excluded."status", "document" = excluded."document", "updatedAt" = excluded."updatedAt""#,
        )
        .bind(&assessment.id)
        .bind(&assessment.user_id)
        .bind(assessment.status.as_str())
        .bind(document)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn complete_if_in_progress(
        &self,
        completed: &Assessment,
    ) -> Result<CompletionWrite, StoreError> {
        let document = serde_json::to_string(completed)?;
        let affected = sqlx::query(
            r#"UPDATE "assessments" SET "status" = ?, "document" = ?, "updatedAt" = ?
               WHERE "id" = ? AND "status" = ?"#,
        )
        .bind(AssessmentStatus::Completed.as_str())
        .bind(document)
        .bind(Utc::now().to_rfc3339())
        .bind(&completed.id)
        .bind(AssessmentStatus::InProgress.as_str())
        .execute(&self.pool)
        .await?
        .rows_affected();

        if affected > 0 {
            return Ok(CompletionWrite::Applied);
        }

        let exists: Option<String> =
            sqlx::query_scalar(r#"SELECT "id" FROM "assessments" WHERE "id" = ?"#)
                .bind(&completed.id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(match exists {
            Some(_) => CompletionWrite::AlreadyCompleted,
            None => CompletionWrite::Missing,
        })
    }
}

#[async_trait]
impl ProfileStore for SqliteStore {
    async fn load_profile(&self, learner_id: &str) -> Result<Option<SkillsProfile>, StoreError> {
        let document: Option<String> = sqlx::query_scalar(
            r#"SELECT "document" FROM "skills_profiles" WHERE "learnerId" = ? LIMIT 1"#,
        )
        .bind(learner_id)
        .fetch_optional(&self.pool)
        .await?;

        document
            .map(|raw| serde_json::from_str(&raw).map_err(StoreError::from))
            .transpose()
    }

    async fn save_profile(&self, profile: &SkillsProfile) -> Result<(), StoreError> {
        let document = serde_json::to_string(profile)?;
        sqlx::query(
            r#"INSERT INTO "skills_profiles" ("learnerId","document","updatedAt")
               VALUES (?,?,?)
               ON CONFLICT ("learnerId") DO UPDATE SET
               "document" = excluded."document", "updatedAt" = excluded."updatedAt""#,
        )
        .bind(&profile.learner_id)
        .bind(document)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
