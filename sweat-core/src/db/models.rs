use sqlx::FromRow;
use std::fmt;

/// Declared execution discipline of a session template. `Custom` is the
/// free-form default; the other three carry mode parameters in the session's
/// `repeat_rule` JSON blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(rename_all = "UPPERCASE")]
pub enum SessionType {
    Amrap,
    Hiit,
    Emom,
    Custom,
}

impl SessionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionType::Amrap => "AMRAP",
            SessionType::Hiit => "HIIT",
            SessionType::Emom => "EMOM",
            SessionType::Custom => "CUSTOM",
        }
    }
}

impl fmt::Display for SessionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Exercise models
#[derive(Debug, Clone, FromRow)]
pub struct Exercise {
    pub id: i64,
    pub name: String,
    pub category: Option<String>,
    pub description: Option<String>,
    pub is_custom: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

// Session models
#[derive(Debug, Clone, FromRow)]
pub struct Session {
    pub id: i64,
    pub name: String,
    #[sqlx(rename = "type")]
    pub session_type: SessionType,
    pub planned_at: Option<i64>,
    pub repeat_rule: Option<String>,
    pub notification_enabled: bool,
    pub notification_offset_minutes: Option<i64>,
    pub timezone: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Default)]
pub struct NewSession {
    pub name: String,
    pub session_type: Option<SessionType>,
    pub planned_at: Option<i64>,
    pub repeat_rule: Option<String>,
    pub notification_enabled: bool,
    pub notification_offset_minutes: Option<i64>,
    pub timezone: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
pub struct SessionExercise {
    pub id: i64,
    pub session_id: i64,
    pub exercise_id: Option<i64>,
    pub custom_name: Option<String>,
    pub order_index: i64,
    pub sets: Option<i64>,
    pub target_reps: Option<i64>,
    pub target_duration_seconds: Option<i64>,
    pub rest_seconds_between_sets: Option<i64>,
    pub work_seconds: Option<i64>,
    pub rest_seconds: Option<i64>,
    pub emom_interval_seconds: Option<i64>,
    pub notes: Option<String>,
    pub config_json: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct NewSessionExercise {
    pub session_id: i64,
    pub exercise_id: Option<i64>,
    pub custom_name: Option<String>,
    pub order_index: i64,
    pub sets: Option<i64>,
    pub target_reps: Option<i64>,
    pub target_duration_seconds: Option<i64>,
    pub rest_seconds_between_sets: Option<i64>,
    pub work_seconds: Option<i64>,
    pub rest_seconds: Option<i64>,
    pub emom_interval_seconds: Option<i64>,
    pub notes: Option<String>,
    pub config_json: Option<String>,
}

/// Session-exercise row joined with its linked exercise's display fields.
#[derive(Debug, Clone, FromRow)]
pub struct SessionExerciseDetail {
    pub id: i64,
    pub session_id: i64,
    pub exercise_id: Option<i64>,
    pub custom_name: Option<String>,
    pub order_index: i64,
    pub sets: Option<i64>,
    pub target_reps: Option<i64>,
    pub target_duration_seconds: Option<i64>,
    pub rest_seconds_between_sets: Option<i64>,
    pub work_seconds: Option<i64>,
    pub rest_seconds: Option<i64>,
    pub emom_interval_seconds: Option<i64>,
    pub notes: Option<String>,
    pub exercise_name: Option<String>,
    pub exercise_category: Option<String>,
    pub exercise_description: Option<String>,
}

// Program models
#[derive(Debug, Clone, FromRow)]
pub struct Program {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, FromRow)]
pub struct ProgramSession {
    pub id: i64,
    pub program_id: i64,
    pub session_id: i64,
    pub order_index: i64,
    pub created_at: i64,
}

// Workout history models
#[derive(Debug, Clone, FromRow)]
pub struct Workout {
    pub id: i64,
    pub session_id: Option<i64>,
    pub started_at: Option<i64>,
    pub ended_at: Option<i64>,
    pub total_time_seconds: Option<i64>,
    pub completed: bool,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
pub struct WorkoutExercise {
    pub id: i64,
    pub workout_id: i64,
    pub session_exercise_id: Option<i64>,
    pub exercise_id: Option<i64>,
    pub order_index: i64,
    pub total_reps: Option<i64>,
    pub total_duration_seconds: Option<i64>,
}

/// One recorded repetition unit: a manual set, a HIIT interval, or an EMOM
/// interval. Append-only during a live run.
#[derive(Debug, Clone, FromRow)]
pub struct WorkoutSet {
    pub id: i64,
    pub workout_exercise_id: i64,
    pub set_number: i64,
    pub reps: Option<i64>,
    pub weight_kg: Option<f64>,
    pub duration_seconds: Option<i64>,
    pub rest_seconds: Option<i64>,
    pub started_at: Option<i64>,
    pub ended_at: Option<i64>,
}

impl fmt::Display for WorkoutSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "set #{}", self.set_number)?;
        if let Some(reps) = self.reps {
            write!(f, " x {} reps", reps)?;
        }
        if let Some(duration) = self.duration_seconds {
            write!(f, " ({}s)", duration)?;
        }
        Ok(())
    }
}
