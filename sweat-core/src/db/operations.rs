use sqlx::SqlitePool;

use crate::db::models::{
    Exercise, NewSession, NewSessionExercise, Program, ProgramSession, Session, SessionExercise,
    SessionExerciseDetail, SessionType, Workout, WorkoutExercise, WorkoutSet,
};
use crate::db::now_millis;
use crate::error::Result;

// Exercises

pub async fn create_exercise(
    pool: &SqlitePool,
    name: &str,
    category: Option<&str>,
    description: Option<&str>,
    is_custom: bool,
) -> Result<Exercise> {
    let exercise = sqlx::query_as::<_, Exercise>(
        "INSERT INTO exercises (name, category, description, is_custom)
         VALUES (?1, ?2, ?3, ?4) RETURNING *",
    )
    .bind(name)
    .bind(category)
    .bind(description)
    .bind(is_custom)
    .fetch_one(pool)
    .await?;
    Ok(exercise)
}

pub async fn get_exercise(pool: &SqlitePool, exercise_id: i64) -> Result<Option<Exercise>> {
    let exercise = sqlx::query_as::<_, Exercise>("SELECT * FROM exercises WHERE id = ?1")
        .bind(exercise_id)
        .fetch_optional(pool)
        .await?;
    Ok(exercise)
}

pub async fn list_exercises(pool: &SqlitePool) -> Result<Vec<Exercise>> {
    let exercises = sqlx::query_as::<_, Exercise>("SELECT * FROM exercises ORDER BY name ASC")
        .fetch_all(pool)
        .await?;
    Ok(exercises)
}

pub async fn update_exercise(
    pool: &SqlitePool,
    exercise_id: i64,
    name: &str,
    category: Option<&str>,
    description: Option<&str>,
) -> Result<Exercise> {
    let exercise = sqlx::query_as::<_, Exercise>(
        "UPDATE exercises SET name = ?1, category = ?2, description = ?3, updated_at = ?4
         WHERE id = ?5 RETURNING *",
    )
    .bind(name)
    .bind(category)
    .bind(description)
    .bind(now_millis())
    .bind(exercise_id)
    .fetch_one(pool)
    .await?;
    Ok(exercise)
}

/// Deletes an exercise. References from session-exercises and
/// workout-exercises are set to NULL by the schema, not cascaded.
pub async fn delete_exercise(pool: &SqlitePool, exercise_id: i64) -> Result<u64> {
    let result = sqlx::query("DELETE FROM exercises WHERE id = ?1")
        .bind(exercise_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

// Sessions

pub async fn create_session(pool: &SqlitePool, new: &NewSession) -> Result<Session> {
    let session = sqlx::query_as::<_, Session>(
        "INSERT INTO sessions (name, type, planned_at, repeat_rule, notification_enabled,
                               notification_offset_minutes, timezone)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7) RETURNING *",
    )
    .bind(&new.name)
    .bind(new.session_type.unwrap_or(SessionType::Custom))
    .bind(new.planned_at)
    .bind(&new.repeat_rule)
    .bind(new.notification_enabled)
    .bind(new.notification_offset_minutes)
    .bind(&new.timezone)
    .fetch_one(pool)
    .await?;
    Ok(session)
}

pub async fn get_session(pool: &SqlitePool, session_id: i64) -> Result<Option<Session>> {
    let session = sqlx::query_as::<_, Session>("SELECT * FROM sessions WHERE id = ?1")
        .bind(session_id)
        .fetch_optional(pool)
        .await?;
    Ok(session)
}

pub async fn list_sessions(pool: &SqlitePool) -> Result<Vec<Session>> {
    let sessions = sqlx::query_as::<_, Session>("SELECT * FROM sessions ORDER BY name ASC")
        .fetch_all(pool)
        .await?;
    Ok(sessions)
}

pub async fn update_session(
    pool: &SqlitePool,
    session_id: i64,
    name: &str,
    session_type: SessionType,
    repeat_rule: Option<&str>,
) -> Result<Session> {
    let session = sqlx::query_as::<_, Session>(
        "UPDATE sessions SET name = ?1, type = ?2, repeat_rule = ?3, updated_at = ?4
         WHERE id = ?5 RETURNING *",
    )
    .bind(name)
    .bind(session_type)
    .bind(repeat_rule)
    .bind(now_millis())
    .bind(session_id)
    .fetch_one(pool)
    .await?;
    Ok(session)
}

pub async fn delete_session(pool: &SqlitePool, session_id: i64) -> Result<u64> {
    let result = sqlx::query("DELETE FROM sessions WHERE id = ?1")
        .bind(session_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

// Session exercises

pub async fn create_session_exercise(
    pool: &SqlitePool,
    new: &NewSessionExercise,
) -> Result<SessionExercise> {
    let session_exercise = sqlx::query_as::<_, SessionExercise>(
        "INSERT INTO session_exercises (session_id, exercise_id, custom_name, order_index, sets,
                                        target_reps, target_duration_seconds,
                                        rest_seconds_between_sets, work_seconds, rest_seconds,
                                        emom_interval_seconds, notes, config_json)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13) RETURNING *",
    )
    .bind(new.session_id)
    .bind(new.exercise_id)
    .bind(&new.custom_name)
    .bind(new.order_index)
    .bind(new.sets)
    .bind(new.target_reps)
    .bind(new.target_duration_seconds)
    .bind(new.rest_seconds_between_sets)
    .bind(new.work_seconds)
    .bind(new.rest_seconds)
    .bind(new.emom_interval_seconds)
    .bind(&new.notes)
    .bind(&new.config_json)
    .fetch_one(pool)
    .await?;
    Ok(session_exercise)
}

pub async fn list_session_exercises(
    pool: &SqlitePool,
    session_id: i64,
) -> Result<Vec<SessionExercise>> {
    let rows = sqlx::query_as::<_, SessionExercise>(
        "SELECT * FROM session_exercises WHERE session_id = ?1 ORDER BY order_index ASC",
    )
    .bind(session_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Session exercises with the linked exercise's name, category and
/// description joined in, ordered by position.
pub async fn list_session_exercises_detailed(
    pool: &SqlitePool,
    session_id: i64,
) -> Result<Vec<SessionExerciseDetail>> {
    let rows = sqlx::query_as::<_, SessionExerciseDetail>(
        "SELECT se.id, se.session_id, se.exercise_id, se.custom_name, se.order_index, se.sets,
                se.target_reps, se.target_duration_seconds, se.rest_seconds_between_sets,
                se.work_seconds, se.rest_seconds, se.emom_interval_seconds, se.notes,
                e.name AS exercise_name, e.category AS exercise_category,
                e.description AS exercise_description
         FROM session_exercises se
         LEFT JOIN exercises e ON se.exercise_id = e.id
         WHERE se.session_id = ?1
         ORDER BY se.order_index ASC",
    )
    .bind(session_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn delete_session_exercise(pool: &SqlitePool, session_exercise_id: i64) -> Result<u64> {
    let result = sqlx::query("DELETE FROM session_exercises WHERE id = ?1")
        .bind(session_exercise_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

/// Rewrites the order indexes of a session's exercises to match the given id
/// sequence, contiguously from zero.
pub async fn reorder_session_exercises(
    pool: &SqlitePool,
    session_id: i64,
    ordered_ids: &[i64],
) -> Result<()> {
    let mut tx = pool.begin().await?;
    for (index, id) in ordered_ids.iter().enumerate() {
        sqlx::query("UPDATE session_exercises SET order_index = ?1 WHERE id = ?2 AND session_id = ?3")
            .bind(index as i64)
            .bind(id)
            .bind(session_id)
            .execute(&mut *tx)
            .await?;
    }
    tx.commit().await?;
    Ok(())
}

// Programs

pub async fn create_program(
    pool: &SqlitePool,
    name: &str,
    description: Option<&str>,
) -> Result<Program> {
    let program = sqlx::query_as::<_, Program>(
        "INSERT INTO programs (name, description) VALUES (?1, ?2) RETURNING *",
    )
    .bind(name)
    .bind(description)
    .fetch_one(pool)
    .await?;
    Ok(program)
}

pub async fn get_program(pool: &SqlitePool, program_id: i64) -> Result<Option<Program>> {
    let program = sqlx::query_as::<_, Program>("SELECT * FROM programs WHERE id = ?1")
        .bind(program_id)
        .fetch_optional(pool)
        .await?;
    Ok(program)
}

pub async fn list_programs(pool: &SqlitePool) -> Result<Vec<Program>> {
    let programs = sqlx::query_as::<_, Program>("SELECT * FROM programs ORDER BY name ASC")
        .fetch_all(pool)
        .await?;
    Ok(programs)
}

pub async fn delete_program(pool: &SqlitePool, program_id: i64) -> Result<u64> {
    let result = sqlx::query("DELETE FROM programs WHERE id = ?1")
        .bind(program_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

/// Attaches a session to a program at the given position. A session may
/// appear in several programs, or several times in the same program.
pub async fn add_session_to_program(
    pool: &SqlitePool,
    program_id: i64,
    session_id: i64,
    order_index: i64,
) -> Result<ProgramSession> {
    let link = sqlx::query_as::<_, ProgramSession>(
        "INSERT INTO program_sessions (program_id, session_id, order_index)
         VALUES (?1, ?2, ?3) RETURNING *",
    )
    .bind(program_id)
    .bind(session_id)
    .bind(order_index)
    .fetch_one(pool)
    .await?;
    Ok(link)
}

pub async fn list_sessions_for_program(
    pool: &SqlitePool,
    program_id: i64,
) -> Result<Vec<Session>> {
    let sessions = sqlx::query_as::<_, Session>(
        "SELECT s.* FROM sessions s
         JOIN program_sessions ps ON ps.session_id = s.id
         WHERE ps.program_id = ?1
         ORDER BY ps.order_index ASC",
    )
    .bind(program_id)
    .fetch_all(pool)
    .await?;
    Ok(sessions)
}

pub async fn remove_session_from_program(
    pool: &SqlitePool,
    program_session_id: i64,
) -> Result<u64> {
    let result = sqlx::query("DELETE FROM program_sessions WHERE id = ?1")
        .bind(program_session_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

// Workouts

pub async fn create_workout(
    pool: &SqlitePool,
    session_id: Option<i64>,
    started_at: i64,
) -> Result<Workout> {
    let workout = sqlx::query_as::<_, Workout>(
        "INSERT INTO workouts (session_id, started_at, completed)
         VALUES (?1, ?2, 0) RETURNING *",
    )
    .bind(session_id)
    .bind(started_at)
    .fetch_one(pool)
    .await?;
    Ok(workout)
}

pub async fn get_workout(pool: &SqlitePool, workout_id: i64) -> Result<Option<Workout>> {
    let workout = sqlx::query_as::<_, Workout>("SELECT * FROM workouts WHERE id = ?1")
        .bind(workout_id)
        .fetch_optional(pool)
        .await?;
    Ok(workout)
}

pub async fn list_workouts(pool: &SqlitePool) -> Result<Vec<Workout>> {
    let workouts =
        sqlx::query_as::<_, Workout>("SELECT * FROM workouts ORDER BY started_at DESC")
            .fetch_all(pool)
            .await?;
    Ok(workouts)
}

/// Most recent workout started for the session, whether or not it completed.
pub async fn find_last_workout_for_session(
    pool: &SqlitePool,
    session_id: i64,
) -> Result<Option<Workout>> {
    let workout = sqlx::query_as::<_, Workout>(
        "SELECT * FROM workouts WHERE session_id = ?1 ORDER BY started_at DESC LIMIT 1",
    )
    .bind(session_id)
    .fetch_optional(pool)
    .await?;
    Ok(workout)
}

// Workout exercises

pub async fn create_workout_exercise(
    pool: &SqlitePool,
    workout_id: i64,
    session_exercise_id: Option<i64>,
    exercise_id: Option<i64>,
    order_index: i64,
) -> Result<WorkoutExercise> {
    let workout_exercise = sqlx::query_as::<_, WorkoutExercise>(
        "INSERT INTO workout_exercises (workout_id, session_exercise_id, exercise_id, order_index)
         VALUES (?1, ?2, ?3, ?4) RETURNING *",
    )
    .bind(workout_id)
    .bind(session_exercise_id)
    .bind(exercise_id)
    .bind(order_index)
    .fetch_one(pool)
    .await?;
    Ok(workout_exercise)
}

pub async fn list_workout_exercises(
    pool: &SqlitePool,
    workout_id: i64,
) -> Result<Vec<WorkoutExercise>> {
    let rows = sqlx::query_as::<_, WorkoutExercise>(
        "SELECT * FROM workout_exercises WHERE workout_id = ?1 ORDER BY order_index ASC",
    )
    .bind(workout_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

// Workout sets

pub async fn add_workout_set(
    pool: &SqlitePool,
    workout_exercise_id: i64,
    set_number: i64,
    reps: Option<i64>,
    duration_seconds: Option<i64>,
    rest_seconds: Option<i64>,
) -> Result<WorkoutSet> {
    let set = sqlx::query_as::<_, WorkoutSet>(
        "INSERT INTO workout_sets (workout_exercise_id, set_number, reps, duration_seconds,
                                   rest_seconds)
         VALUES (?1, ?2, ?3, ?4, ?5) RETURNING *",
    )
    .bind(workout_exercise_id)
    .bind(set_number)
    .bind(reps)
    .bind(duration_seconds)
    .bind(rest_seconds)
    .fetch_one(pool)
    .await?;
    Ok(set)
}

pub async fn list_sets_for_workout_exercise(
    pool: &SqlitePool,
    workout_exercise_id: i64,
) -> Result<Vec<WorkoutSet>> {
    let sets = sqlx::query_as::<_, WorkoutSet>(
        "SELECT * FROM workout_sets WHERE workout_exercise_id = ?1 ORDER BY set_number ASC",
    )
    .bind(workout_exercise_id)
    .fetch_all(pool)
    .await?;
    Ok(sets)
}

/// Per-exercise totals computed by the runner at finish time.
#[derive(Debug, Clone, Copy)]
pub struct ExerciseTotals {
    pub workout_exercise_id: i64,
    pub total_reps: i64,
    pub total_duration_seconds: i64,
}

/// Writes the final totals and closes the workout row in one transaction, so
/// a failure leaves no partially-applied aggregate.
pub async fn finish_workout(
    pool: &SqlitePool,
    workout_id: i64,
    totals: &[ExerciseTotals],
    ended_at: i64,
    total_time_seconds: i64,
    notes: Option<&str>,
) -> Result<()> {
    let mut tx = pool.begin().await?;
    for t in totals {
        sqlx::query(
            "UPDATE workout_exercises SET total_reps = ?1, total_duration_seconds = ?2
             WHERE id = ?3",
        )
        .bind(t.total_reps)
        .bind(t.total_duration_seconds)
        .bind(t.workout_exercise_id)
        .execute(&mut *tx)
        .await?;
    }
    sqlx::query(
        "UPDATE workouts SET ended_at = ?1, total_time_seconds = ?2, completed = 1, notes = ?3
         WHERE id = ?4",
    )
    .bind(ended_at)
    .bind(total_time_seconds)
    .bind(notes)
    .bind(workout_id)
    .execute(&mut *tx)
    .await?;
    tx.commit().await?;
    Ok(())
}
