use anyhow::{anyhow, Result};
use serde::Deserialize;
use sqlx::Row;
use uuid::Uuid;

use crate::infra::catalog::{CatalogClient, CatalogExercise};
use crate::infra::db::Db;
use crate::domain::workout::Exercise;

/// Muscle groups known to the external catalog; used for the one-time seed.
const SEED_MUSCLES: &[&str] = &[
    "abdominals",
    "biceps",
    "calves",
    "chest",
    "forearms",
    "glutes",
    "hamstrings",
    "lats",
    "lower_back",
    "middle_back",
    "quadriceps",
    "traps",
    "triceps",
];

/// One exercise entry in a post request: either a reference to an existing
/// exercise by id, or an inline body to resolve by name.
#[derive(Debug, Clone, Deserialize)]
pub struct ExerciseEntryInput {
    pub id: Option<Uuid>,
    pub name: Option<String>,
    pub muscle: Option<String>,
    pub equipment: Option<String>,
    pub instructions: Option<String>,
    #[serde(default)]
    pub weight: f64,
    #[serde(default)]
    pub reps: i32,
    #[serde(default)]
    pub sets: i32,
}

#[derive(Clone)]
pub struct ExerciseService {
    db: Db,
    catalog: Option<CatalogClient>,
}

impl ExerciseService {
    pub fn new(db: Db, catalog: Option<CatalogClient>) -> Self {
        Self { db, catalog }
    }

    /// Resolve an entry to an exercise id inside the post-creation
    /// transaction. By id the row must be predefined or owned by the caller.
    /// By name a same-named predefined or caller-owned row is reused,
    /// otherwise a caller-owned row is upserted atomically so two concurrent
    /// requests converge on one id.
    pub async fn resolve_with_tx(
        &self,
        caller_id: Uuid,
        entry: &ExerciseEntryInput,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    ) -> Result<Uuid> {
        if let Some(exercise_id) = entry.id {
            let owner_id: Option<Option<Uuid>> =
                sqlx::query_scalar("SELECT owner_id FROM exercises WHERE id = $1")
                    .bind(exercise_id)
                    .fetch_optional(&mut **tx)
                    .await?;

            return match owner_id {
                None => Err(anyhow!("exercise not found")),
                Some(Some(owner)) if owner != caller_id => {
                    Err(anyhow!("exercise owned by another user"))
                }
                Some(_) => Ok(exercise_id),
            };
        }

        let name = entry
            .name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| anyhow!("exercise entry needs an id or a name"))?;

        let existing: Option<Uuid> = sqlx::query_scalar(
            "SELECT id FROM exercises \
             WHERE name = $1 AND (owner_id IS NULL OR owner_id = $2) \
             ORDER BY owner_id NULLS FIRST \
             LIMIT 1",
        )
        .bind(name)
        .bind(caller_id)
        .fetch_optional(&mut **tx)
        .await?;

        if let Some(id) = existing {
            return Ok(id);
        }

        let id: Uuid = sqlx::query_scalar(
            "INSERT INTO exercises (name, muscle, equipment, instructions, owner_id) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (owner_id, name) WHERE owner_id IS NOT NULL \
             DO UPDATE SET name = EXCLUDED.name \
             RETURNING id",
        )
        .bind(name)
        .bind(&entry.muscle)
        .bind(&entry.equipment)
        .bind(&entry.instructions)
        .bind(caller_id)
        .fetch_one(&mut **tx)
        .await?;

        Ok(id)
    }

    /// Predefined and caller-owned exercises for a muscle group. When nothing
    /// matches locally, fall back to the external catalog and persist the
    /// results as predefined rows.
    pub async fn search(&self, caller_id: Uuid, muscle: &str) -> Result<Vec<Exercise>> {
        let local = self.search_local(caller_id, muscle).await?;
        if !local.is_empty() {
            return Ok(local);
        }

        let catalog = match &self.catalog {
            Some(catalog) => catalog,
            None => return Ok(local),
        };

        let fetched = catalog.fetch_by_muscle(muscle).await?;
        if fetched.is_empty() {
            return Ok(local);
        }

        self.insert_predefined(&fetched).await?;
        self.search_local(caller_id, muscle).await
    }

    async fn search_local(&self, caller_id: Uuid, muscle: &str) -> Result<Vec<Exercise>> {
        let rows = sqlx::query(
            "SELECT id, name, muscle, equipment, instructions, owner_id, created_at \
             FROM exercises \
             WHERE (owner_id IS NULL OR owner_id = $1) \
               AND ($2 = '' OR muscle = $2) \
             ORDER BY name",
        )
        .bind(caller_id)
        .bind(muscle)
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| Exercise {
                id: row.get("id"),
                name: row.get("name"),
                muscle: row.get("muscle"),
                equipment: row.get("equipment"),
                instructions: row.get("instructions"),
                owner_id: row.get("owner_id"),
                created_at: row.get("created_at"),
            })
            .collect())
    }

    async fn insert_predefined(&self, exercises: &[CatalogExercise]) -> Result<()> {
        for exercise in exercises {
            sqlx::query(
                "INSERT INTO exercises (name, muscle, equipment, instructions, owner_id) \
                 VALUES ($1, $2, $3, $4, NULL) \
                 ON CONFLICT (name) WHERE owner_id IS NULL DO NOTHING",
            )
            .bind(&exercise.name)
            .bind(&exercise.muscle)
            .bind(&exercise.equipment)
            .bind(&exercise.instructions)
            .execute(self.db.pool())
            .await?;
        }
        Ok(())
    }

    /// One-time startup seed of the predefined catalog. Skipped when
    /// predefined rows already exist; failures are logged, never fatal.
    pub async fn seed_catalog(&self) -> Result<()> {
        let catalog = match &self.catalog {
            Some(catalog) => catalog,
            None => {
                tracing::info!("exercise catalog not configured, skipping seed");
                return Ok(());
            }
        };

        let existing: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM exercises WHERE owner_id IS NULL")
                .fetch_one(self.db.pool())
                .await?;
        if existing > 0 {
            tracing::debug!(existing, "predefined exercises present, skipping seed");
            return Ok(());
        }

        let mut seeded = 0usize;
        for muscle in SEED_MUSCLES {
            match catalog.fetch_by_muscle(muscle).await {
                Ok(exercises) => {
                    seeded += exercises.len();
                    self.insert_predefined(&exercises).await?;
                }
                Err(err) => {
                    tracing::warn!(error = ?err, muscle, "catalog fetch failed during seed");
                }
            }
        }

        tracing::info!(seeded, "exercise catalog seeded");
        Ok(())
    }
}
