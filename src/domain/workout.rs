use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Exercise {
    pub id: Uuid,
    pub name: String,
    pub muscle: Option<String>,
    pub equipment: Option<String>,
    pub instructions: Option<String>,
    pub owner_id: Option<Uuid>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// A dated set of exercise entries attached to a post.
#[derive(Debug, Clone, Serialize)]
pub struct Workout {
    pub id: Uuid,
    #[serde(with = "iso_date")]
    pub performed_on: Date,
    pub exercises: Vec<WorkoutEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkoutEntry {
    pub exercise_id: Uuid,
    pub name: String,
    pub muscle: Option<String>,
    pub equipment: Option<String>,
    pub weight: f64,
    pub reps: i32,
    pub sets: i32,
}
