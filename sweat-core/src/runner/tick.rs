//! The per-second tick engine. One mode-polymorphic function keeps exactly
//! one timing authority active at a time; every branch mutates the in-memory
//! state before awaiting storage, so an aborted tick can only lose a
//! best-effort set row, never leave counters half-updated.

use log::warn;
use sqlx::SqlitePool;
use tokio::sync::Mutex;

use crate::db::now_millis;
use crate::db::operations::{
    ExerciseTotals, add_workout_set, finish_workout, list_sets_for_workout_exercise,
};
use crate::error::Result;
use crate::notify::{Notifier, RunnerEvent};
use crate::plan::Mode;
use crate::runner::state::{Phase, RunnerState, Status};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TickOutcome {
    Continue,
    /// A countdown reached zero; the caller must run [`finalize`].
    Finish,
}

pub(crate) async fn tick_once(
    state: &Mutex<RunnerState>,
    pool: &SqlitePool,
    notifier: &dyn Notifier,
) -> TickOutcome {
    let mut st = state.lock().await;

    match st.status {
        // No tick may observe a paused or finished runner.
        Status::Idle | Status::Paused => return TickOutcome::Continue,
        Status::Resting => {
            let remaining = st.rest_remaining_seconds.unwrap_or(0);
            if remaining > 1 {
                st.rest_remaining_seconds = Some(remaining - 1);
            } else {
                st.rest_remaining_seconds = None;
                st.status = Status::Running;
                notifier.notify(RunnerEvent::PhaseChanged);
            }
            return TickOutcome::Continue;
        }
        Status::Running => {}
    }

    match st.mode {
        Mode::Default => {
            st.elapsed_seconds += 1;
        }
        Mode::Amrap { .. } => {
            let remaining = (st.total_remaining_seconds.unwrap_or(0) - 1).max(0);
            st.total_remaining_seconds = Some(remaining);
            if remaining == 0 {
                return TickOutcome::Finish;
            }
        }
        Mode::Hiit {
            work_seconds,
            rest_seconds,
            ..
        } => {
            if let Some(total) = st.total_remaining_seconds {
                st.total_remaining_seconds = Some((total - 1).max(0));
            }
            let remaining = st.phase_remaining_seconds.unwrap_or(0);
            if remaining > 1 {
                st.phase_remaining_seconds = Some(remaining - 1);
            } else {
                match st.phase.unwrap_or(Phase::Work) {
                    Phase::Work => {
                        st.phase = Some(Phase::Rest);
                        st.phase_remaining_seconds = Some(rest_seconds);
                        notifier.notify(RunnerEvent::PhaseChanged);
                    }
                    Phase::Rest => {
                        // Interval complete: the set is attributed to the
                        // exercise that was current when the interval ran.
                        let logged = advance_rotation(&mut st);
                        st.phase = Some(Phase::Work);
                        st.phase_remaining_seconds = Some(work_seconds);
                        notifier.notify(RunnerEvent::PhaseChanged);
                        if let Some((workout_exercise_id, set_number)) = logged {
                            record_set_best_effort(
                                pool,
                                workout_exercise_id,
                                set_number,
                                None,
                                Some(work_seconds),
                            )
                            .await;
                            notifier.notify(RunnerEvent::SetRecorded);
                        }
                    }
                }
            }
            if st.total_remaining_seconds == Some(0) {
                return TickOutcome::Finish;
            }
        }
        Mode::Emom { interval_seconds } => {
            let remaining = st.emom_remaining_seconds.unwrap_or(interval_seconds);
            if remaining > 1 {
                st.emom_remaining_seconds = Some(remaining - 1);
            } else {
                let logged = advance_rotation(&mut st);
                st.emom_remaining_seconds = Some(interval_seconds);
                if let Some((workout_exercise_id, set_number)) = logged {
                    record_set_best_effort(pool, workout_exercise_id, set_number, None, None).await;
                    notifier.notify(RunnerEvent::SetRecorded);
                }
            }
        }
    }

    TickOutcome::Continue
}

/// Credits a set to the current exercise and rotates circularly to the next
/// one. Returns the row to record, or `None` on an empty exercise list.
fn advance_rotation(st: &mut RunnerState) -> Option<(i64, i64)> {
    let len = st.exercises.len();
    let ex = st.exercises.get_mut(st.current_exercise_index)?;
    let workout_exercise_id = ex.workout_exercise_id;
    let set_number = ex.current_set;
    ex.current_set += 1;
    st.current_exercise_index = (st.current_exercise_index + 1) % len;
    Some((workout_exercise_id, set_number))
}

/// Tick-path set recording is best-effort: losing one historical row is
/// preferable to stalling a live workout.
async fn record_set_best_effort(
    pool: &SqlitePool,
    workout_exercise_id: i64,
    set_number: i64,
    reps: Option<i64>,
    duration_seconds: Option<i64>,
) {
    if let Err(err) =
        add_workout_set(pool, workout_exercise_id, set_number, reps, duration_seconds, None).await
    {
        warn!(
            "failed to record set #{set_number} for workout exercise {workout_exercise_id}: {err}"
        );
    }
}

/// Recomputes every exercise's totals from its durable set rows, closes the
/// workout, and parks the runner in `Idle`. Storage failures abort before any
/// in-memory transition so the caller can retry.
pub(crate) async fn finalize(
    state: &Mutex<RunnerState>,
    pool: &SqlitePool,
    notes: Option<String>,
) -> Result<Option<i64>> {
    let mut st = state.lock().await;
    let Some(workout_id) = st.workout_id else {
        return Ok(None);
    };

    let mut totals = Vec::with_capacity(st.exercises.len());
    for ex in &st.exercises {
        let sets = list_sets_for_workout_exercise(pool, ex.workout_exercise_id).await?;
        totals.push(ExerciseTotals {
            workout_exercise_id: ex.workout_exercise_id,
            total_reps: sets.iter().map(|s| s.reps.unwrap_or(0)).sum(),
            total_duration_seconds: sets.iter().map(|s| s.duration_seconds.unwrap_or(0)).sum(),
        });
    }

    let ended_at = now_millis();
    let total_time_seconds = st
        .started_at
        .map(|started| ((ended_at - started) / 1000).max(0))
        .unwrap_or(0);
    finish_workout(
        pool,
        workout_id,
        &totals,
        ended_at,
        total_time_seconds,
        notes.as_deref(),
    )
    .await?;

    st.ended_at = Some(ended_at);
    st.status = Status::Idle;
    Ok(Some(workout_id))
}
