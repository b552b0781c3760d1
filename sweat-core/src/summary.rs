//! Read-only workout summaries, rebuilt from durable rows alone.
//!
//! Totals are recomputed from the workout-set rows rather than read from the
//! totals the runner wrote at finish time, so the same numbers come out
//! whether the process that ran the workout is still alive or not, and an
//! in-progress workout simply shows what has been recorded so far.

use std::collections::HashMap;

use sqlx::SqlitePool;

use crate::db::models::{SessionType, Workout};
use crate::db::operations::{
    find_last_workout_for_session, get_session, get_workout, list_session_exercises_detailed,
    list_sets_for_workout_exercise, list_workout_exercises,
};
use crate::error::Result;
use crate::plan::display_name;

#[derive(Debug, Clone, Copy)]
pub enum SummaryQuery {
    Workout(i64),
    LastForSession(i64),
}

/// One display line per workout exercise.
#[derive(Debug, Clone)]
pub struct SummaryRow {
    pub workout_exercise_id: i64,
    pub name: String,
    pub sets_count: usize,
    pub total_reps: i64,
    pub total_duration_seconds: i64,
}

#[derive(Debug, Clone)]
pub struct WorkoutSummary {
    pub workout: Workout,
    pub session_name: Option<String>,
    pub session_type: Option<SessionType>,
    pub rows: Vec<SummaryRow>,
}

/// Builds the summary, or `None` when the workout does not exist - the
/// explicit "nothing to show" marker, not an error.
pub async fn summarize(pool: &SqlitePool, query: SummaryQuery) -> Result<Option<WorkoutSummary>> {
    let workout = match query {
        SummaryQuery::Workout(id) => get_workout(pool, id).await?,
        SummaryQuery::LastForSession(id) => find_last_workout_for_session(pool, id).await?,
    };
    let Some(workout) = workout else {
        return Ok(None);
    };

    // The originating session may have been edited or deleted since; names
    // fall back to positional placeholders in that case.
    let mut names_by_session_exercise: HashMap<i64, String> = HashMap::new();
    let mut session_name = None;
    let mut session_type = None;
    if let Some(session_id) = workout.session_id {
        if let Some(session) = get_session(pool, session_id).await? {
            session_name = Some(session.name);
            session_type = Some(session.session_type);
            for (position, detail) in list_session_exercises_detailed(pool, session_id)
                .await?
                .iter()
                .enumerate()
            {
                names_by_session_exercise.insert(detail.id, display_name(detail, position));
            }
        }
    }

    let workout_exercises = list_workout_exercises(pool, workout.id).await?;
    let mut rows = Vec::with_capacity(workout_exercises.len());
    for (position, wex) in workout_exercises.iter().enumerate() {
        let sets = list_sets_for_workout_exercise(pool, wex.id).await?;
        let name = wex
            .session_exercise_id
            .and_then(|id| names_by_session_exercise.get(&id).cloned())
            .unwrap_or_else(|| format!("Exercise {}", position + 1));
        rows.push(SummaryRow {
            workout_exercise_id: wex.id,
            name,
            sets_count: sets.len(),
            total_reps: sets.iter().map(|s| s.reps.unwrap_or(0)).sum(),
            total_duration_seconds: sets.iter().map(|s| s.duration_seconds.unwrap_or(0)).sum(),
        });
    }

    Ok(Some(WorkoutSummary {
        workout,
        session_name,
        session_type,
        rows,
    }))
}
