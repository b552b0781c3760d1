//! The session runner: a single state machine per live attempt, driving four
//! timing disciplines (free-form, AMRAP, HIIT, EMOM) over one shared
//! one-second tick loop while persisting workout history as it goes.
//!
//! Construct one `Runner` per attempt and discard it on navigation away;
//! only completed set rows are durable, mid-attempt state is memory-only.

mod state;
mod tick;

pub use state::{ExerciseRuntime, Phase, RunnerState, Status};

use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use log::error;
use sqlx::SqlitePool;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::db::now_millis;
use crate::db::operations::{add_workout_set, create_workout, create_workout_exercise};
use crate::error::Result;
use crate::notify::{NoopNotifier, Notifier, RunnerEvent};
use crate::plan::{Mode, SessionPlan};
use crate::runner::tick::TickOutcome;

pub struct Runner {
    pool: SqlitePool,
    notifier: Arc<dyn Notifier>,
    state: Arc<Mutex<RunnerState>>,
    ticker: StdMutex<Option<JoinHandle<()>>>,
}

impl Runner {
    pub fn new(pool: SqlitePool) -> Self {
        Self::with_notifier(pool, Arc::new(NoopNotifier))
    }

    pub fn with_notifier(pool: SqlitePool, notifier: Arc<dyn Notifier>) -> Self {
        Runner {
            pool,
            notifier,
            state: Arc::new(Mutex::new(RunnerState::default())),
            ticker: StdMutex::new(None),
        }
    }

    /// Resolves the session definition, creates the durable workout row and
    /// one workout-exercise per slot, seeds the mode counters and parks the
    /// runner in `Paused`. Each call is a fresh attempt: calling twice
    /// creates two workouts.
    pub async fn initialize(&self, session_id: i64) -> Result<()> {
        self.stop_ticker();

        let plan = SessionPlan::resolve(&self.pool, session_id).await?;
        let started_at = now_millis();
        let workout = create_workout(&self.pool, Some(session_id), started_at).await?;

        let mut exercises = Vec::with_capacity(plan.exercises.len());
        for ex in &plan.exercises {
            let workout_exercise = create_workout_exercise(
                &self.pool,
                workout.id,
                Some(ex.session_exercise_id),
                ex.exercise_id,
                ex.order_index,
            )
            .await?;
            exercises.push(ExerciseRuntime {
                session_exercise_id: ex.session_exercise_id,
                workout_exercise_id: workout_exercise.id,
                name: ex.name.clone(),
                order_index: ex.order_index,
                sets_target: ex.sets,
                target_reps: ex.target_reps,
                target_duration_seconds: ex.target_duration_seconds,
                rest_seconds_between_sets: ex.rest_seconds_between_sets,
                rest_seconds: ex.rest_seconds,
                notes: ex.notes.clone(),
                current_set: 1,
                pending_reps: 0,
            });
        }

        let mut st = self.state.lock().await;
        *st = RunnerState::default();
        st.session_id = Some(session_id);
        st.workout_id = Some(workout.id);
        st.started_at = workout.started_at.or(Some(started_at));
        st.mode = plan.mode;
        st.exercises = exercises;
        st.status = Status::Paused;
        match plan.mode {
            Mode::Default => {}
            Mode::Amrap { duration_seconds } => {
                st.total_remaining_seconds = Some(duration_seconds);
            }
            Mode::Hiit {
                work_seconds,
                total_duration_seconds,
                ..
            } => {
                st.phase = Some(Phase::Work);
                st.phase_remaining_seconds = Some(work_seconds);
                st.total_remaining_seconds = Some(total_duration_seconds);
            }
            Mode::Emom { interval_seconds } => {
                st.emom_remaining_seconds = Some(interval_seconds);
            }
        }
        Ok(())
    }

    /// Running/resting pauses; paused starts. A no-op before `initialize`.
    pub async fn toggle(&self) {
        let mut st = self.state.lock().await;
        match st.status {
            Status::Running | Status::Resting => {
                self.stop_ticker();
                st.status = Status::Paused;
                self.notifier.notify(RunnerEvent::Paused);
            }
            Status::Paused => {
                st.status = Status::Running;
                st.rest_remaining_seconds = None;
                self.start_ticker();
                self.notifier.notify(RunnerEvent::Started);
            }
            Status::Idle => {}
        }
    }

    /// Manual navigation; ignored under HIIT/EMOM where rotation is
    /// timer-driven and a manual jump would desync the interval cadence.
    pub async fn next_exercise(&self) {
        let mut st = self.state.lock().await;
        if !st.mode.allows_navigation() {
            return;
        }
        if st.current_exercise_index + 1 < st.exercises.len() {
            st.current_exercise_index += 1;
        }
    }

    pub async fn prev_exercise(&self) {
        let mut st = self.state.lock().await;
        if !st.mode.allows_navigation() {
            return;
        }
        if st.current_exercise_index > 0 {
            st.current_exercise_index -= 1;
        }
    }

    /// Adjusts the in-progress rep counter of the current exercise, floored
    /// at zero.
    pub async fn add_rep(&self, delta: i64) {
        let mut st = self.state.lock().await;
        if let Some(ex) = st.current_exercise_mut() {
            ex.pending_reps = (ex.pending_reps + delta).max(0);
        }
    }

    /// Records the in-progress set for the current exercise and advances to
    /// the next set, entering the between-sets rest countdown when the
    /// exercise defines one. No-op under HIIT and on empty sessions.
    pub async fn complete_set(&self) -> Result<()> {
        let mut st = self.state.lock().await;
        if matches!(st.mode, Mode::Hiit { .. }) || st.workout_id.is_none() {
            return Ok(());
        }
        let index = st.current_exercise_index;
        let Some(ex) = st.exercises.get(index) else {
            return Ok(());
        };
        let workout_exercise_id = ex.workout_exercise_id;
        let set_number = ex.current_set;
        let reps = (ex.pending_reps > 0).then_some(ex.pending_reps);
        let rest = ex
            .rest_seconds_between_sets
            .or(ex.rest_seconds)
            .filter(|r| *r > 0);

        add_workout_set(&self.pool, workout_exercise_id, set_number, reps, None, None).await?;

        let ex = &mut st.exercises[index];
        ex.current_set += 1;
        ex.pending_reps = 0;
        if let Some(rest) = rest {
            st.status = Status::Resting;
            st.rest_remaining_seconds = Some(rest);
        }
        self.notifier.notify(RunnerEvent::SetRecorded);
        Ok(())
    }

    /// Recomputes and writes final totals, closes the workout row and stops
    /// the tick source. Returns the workout id, or `None` when the runner
    /// was never initialized. On a storage failure nothing is applied and
    /// the runner keeps its prior state so the caller can retry.
    pub async fn finish(&self, notes: Option<String>) -> Result<Option<i64>> {
        let finished = tick::finalize(&self.state, &self.pool, notes).await?;
        if finished.is_some() {
            self.stop_ticker();
            self.notifier.notify(RunnerEvent::Finished);
        }
        Ok(finished)
    }

    /// Clears all in-memory state back to the pre-`initialize` shape and
    /// stops the tick source. Durable rows already written are untouched.
    pub async fn reset(&self) {
        self.stop_ticker();
        *self.state.lock().await = RunnerState::default();
    }

    /// Read-only copy of the live state for the presentation layer.
    pub async fn snapshot(&self) -> RunnerState {
        self.state.lock().await.clone()
    }

    fn start_ticker(&self) {
        let mut slot = self.ticker.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(handle) = slot.take() {
            handle.abort();
        }
        let state = Arc::clone(&self.state);
        let pool = self.pool.clone();
        let notifier = Arc::clone(&self.notifier);
        *slot = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick of a fresh interval completes immediately.
            interval.tick().await;
            loop {
                interval.tick().await;
                match tick::tick_once(&state, &pool, notifier.as_ref()).await {
                    TickOutcome::Continue => {}
                    TickOutcome::Finish => {
                        match tick::finalize(&state, &pool, None).await {
                            Ok(_) => {
                                notifier.notify(RunnerEvent::Finished);
                                break;
                            }
                            Err(err) => {
                                error!("auto-finish failed, retrying next tick: {err}");
                            }
                        }
                    }
                }
            }
        }));
    }

    fn stop_ticker(&self) {
        if let Some(handle) = self
            .ticker
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
        {
            handle.abort();
        }
    }
}

impl Drop for Runner {
    fn drop(&mut self) {
        self.stop_ticker();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{NewSession, NewSessionExercise, SessionType};
    use crate::db::operations::{
        create_session, create_session_exercise, get_workout, list_sets_for_workout_exercise,
        list_workout_exercises, list_workouts,
    };
    use crate::db::test_pool;

    async fn make_session(
        pool: &SqlitePool,
        session_type: SessionType,
        repeat_rule: Option<&str>,
        exercise_count: usize,
    ) -> i64 {
        let session = create_session(
            pool,
            &NewSession {
                name: "test session".into(),
                session_type: Some(session_type),
                repeat_rule: repeat_rule.map(str::to_string),
                ..Default::default()
            },
        )
        .await
        .expect("create session");
        for i in 0..exercise_count {
            create_session_exercise(
                pool,
                &NewSessionExercise {
                    session_id: session.id,
                    custom_name: Some(format!("Exercise {}", i + 1)),
                    order_index: i as i64,
                    ..Default::default()
                },
            )
            .await
            .expect("create session exercise");
        }
        session.id
    }

    /// Drives the tick engine directly, emulating the ticker task.
    async fn drive(runner: &Runner, ticks: usize) {
        for _ in 0..ticks {
            match tick::tick_once(&runner.state, &runner.pool, runner.notifier.as_ref()).await {
                TickOutcome::Continue => {}
                TickOutcome::Finish => {
                    tick::finalize(&runner.state, &runner.pool, None)
                        .await
                        .expect("auto-finish");
                }
            }
        }
    }

    async fn force_running(runner: &Runner) {
        runner.state.lock().await.status = Status::Running;
    }

    #[tokio::test]
    async fn initialize_creates_durable_rows_and_parks_paused() {
        let pool = test_pool().await;
        let session_id = make_session(&pool, SessionType::Custom, None, 2).await;
        let runner = Runner::new(pool.clone());

        runner.initialize(session_id).await.expect("initialize");

        let snap = runner.snapshot().await;
        assert_eq!(snap.status, Status::Paused);
        assert_eq!(snap.mode, Mode::Default);
        assert_eq!(snap.exercises.len(), 2);
        assert!(snap.exercises.iter().all(|e| e.current_set == 1));

        let workout_id = snap.workout_id.expect("workout created");
        let workout = get_workout(&pool, workout_id).await.expect("get").unwrap();
        assert!(!workout.completed);
        assert!(workout.started_at.is_some());
        let wexs = list_workout_exercises(&pool, workout_id).await.expect("wexs");
        assert_eq!(wexs.len(), 2);

        // A second initialize is a fresh attempt with its own workout row.
        runner.initialize(session_id).await.expect("re-initialize");
        assert_eq!(list_workouts(&pool).await.expect("list").len(), 2);
    }

    #[tokio::test]
    async fn hiit_cadence_logs_intervals_and_auto_finishes() {
        let pool = test_pool().await;
        let rule =
            r#"{"typeConfig":{"hiit":{"workSeconds":20,"restSeconds":10,"totalDurationSeconds":60}}}"#;
        let session_id = make_session(&pool, SessionType::Hiit, Some(rule), 2).await;
        let runner = Runner::new(pool.clone());
        runner.initialize(session_id).await.expect("initialize");
        force_running(&runner).await;

        drive(&runner, 30).await;
        let snap = runner.snapshot().await;
        assert_eq!(snap.total_remaining_seconds, Some(30));
        assert_eq!(snap.phase, Some(Phase::Work));
        assert_eq!(snap.phase_remaining_seconds, Some(20));
        assert_eq!(snap.current_exercise_index, 1);
        assert_eq!(snap.exercises[0].current_set, 2);

        let wexs = list_workout_exercises(&pool, snap.workout_id.unwrap())
            .await
            .expect("wexs");
        let sets0 = list_sets_for_workout_exercise(&pool, wexs[0].id)
            .await
            .expect("sets");
        assert_eq!(sets0.len(), 1);
        assert_eq!(sets0[0].set_number, 1);
        assert_eq!(sets0[0].duration_seconds, Some(20));
        assert!(
            list_sets_for_workout_exercise(&pool, wexs[1].id)
                .await
                .expect("sets")
                .is_empty()
        );

        drive(&runner, 30).await;
        let snap = runner.snapshot().await;
        assert_eq!(snap.status, Status::Idle);
        assert_eq!(snap.total_remaining_seconds, Some(0));

        let workout = get_workout(&pool, snap.workout_id.unwrap())
            .await
            .expect("get")
            .unwrap();
        assert!(workout.completed);

        // Both exercises got one 20s interval; finish aggregated durations.
        let wexs = list_workout_exercises(&pool, workout.id).await.expect("wexs");
        assert_eq!(wexs[0].total_duration_seconds, Some(20));
        assert_eq!(wexs[1].total_duration_seconds, Some(20));
    }

    #[tokio::test]
    async fn emom_rotation_wraps_circularly() {
        let pool = test_pool().await;
        let rule = r#"{"typeConfig":{"emom":{"intervalSeconds":45}}}"#;
        let session_id = make_session(&pool, SessionType::Emom, Some(rule), 3).await;
        let runner = Runner::new(pool.clone());
        runner.initialize(session_id).await.expect("initialize");
        force_running(&runner).await;

        drive(&runner, 45).await;
        let snap = runner.snapshot().await;
        assert_eq!(snap.current_exercise_index, 1);
        assert_eq!(snap.emom_remaining_seconds, Some(45));
        let wexs = list_workout_exercises(&pool, snap.workout_id.unwrap())
            .await
            .expect("wexs");
        let sets0 = list_sets_for_workout_exercise(&pool, wexs[0].id)
            .await
            .expect("sets");
        assert_eq!(sets0.len(), 1);
        assert_eq!(sets0[0].set_number, 1);
        assert_eq!(sets0[0].reps, None);
        assert_eq!(sets0[0].duration_seconds, None);

        drive(&runner, 90).await;
        let snap = runner.snapshot().await;
        assert_eq!(snap.current_exercise_index, 0);
        for wex in &wexs {
            let sets = list_sets_for_workout_exercise(&pool, wex.id)
                .await
                .expect("sets");
            assert_eq!(sets.len(), 1);
        }
    }

    #[tokio::test]
    async fn complete_set_records_reps_and_enters_rest() {
        let pool = test_pool().await;
        let session_id = make_session(&pool, SessionType::Custom, None, 1).await;
        // Re-create the slot with a between-sets rest.
        let runner = Runner::new(pool.clone());
        create_session_exercise(
            &pool,
            &NewSessionExercise {
                session_id,
                custom_name: Some("Weighted squat".into()),
                order_index: 1,
                rest_seconds_between_sets: Some(15),
                ..Default::default()
            },
        )
        .await
        .expect("session exercise");
        runner.initialize(session_id).await.expect("initialize");
        force_running(&runner).await;
        runner.next_exercise().await;

        runner.add_rep(5).await;
        runner.complete_set().await.expect("complete set");

        let snap = runner.snapshot().await;
        assert_eq!(snap.status, Status::Resting);
        assert_eq!(snap.rest_remaining_seconds, Some(15));
        assert_eq!(snap.exercises[1].current_set, 2);
        assert_eq!(snap.exercises[1].pending_reps, 0);

        let wex_id = snap.exercises[1].workout_exercise_id;
        let sets = list_sets_for_workout_exercise(&pool, wex_id)
            .await
            .expect("sets");
        assert_eq!(sets.len(), 1);
        assert_eq!(sets[0].reps, Some(5));

        // Rest counts down on its own and hands back to running.
        drive(&runner, 15).await;
        let snap = runner.snapshot().await;
        assert_eq!(snap.status, Status::Running);
        assert_eq!(snap.rest_remaining_seconds, None);
    }

    #[tokio::test]
    async fn pausing_freezes_counters_without_drift() {
        let pool = test_pool().await;
        let session_id = make_session(&pool, SessionType::Custom, None, 1).await;
        let runner = Runner::new(pool.clone());
        runner.initialize(session_id).await.expect("initialize");
        force_running(&runner).await;

        drive(&runner, 5).await;
        runner.toggle().await;
        assert_eq!(runner.snapshot().await.status, Status::Paused);

        // Ticks that slip through while paused must not count.
        drive(&runner, 7).await;
        assert_eq!(runner.snapshot().await.elapsed_seconds, 5);

        force_running(&runner).await;
        drive(&runner, 3).await;
        assert_eq!(runner.snapshot().await.elapsed_seconds, 8);
    }

    #[tokio::test]
    async fn finish_sums_reps_treating_missing_as_zero() {
        let pool = test_pool().await;
        let session_id = make_session(&pool, SessionType::Custom, None, 1).await;
        let runner = Runner::new(pool.clone());
        runner.initialize(session_id).await.expect("initialize");
        force_running(&runner).await;

        runner.add_rep(5).await;
        runner.complete_set().await.expect("set 1");
        runner.add_rep(8).await;
        runner.complete_set().await.expect("set 2");
        // No reps accumulated: recorded with reps omitted.
        runner.complete_set().await.expect("set 3");

        let workout_id = runner.finish(None).await.expect("finish").unwrap();
        let wexs = list_workout_exercises(&pool, workout_id).await.expect("wexs");
        assert_eq!(wexs[0].total_reps, Some(13));
        assert_eq!(wexs[0].total_duration_seconds, Some(0));

        let sets = list_sets_for_workout_exercise(&pool, wexs[0].id)
            .await
            .expect("sets");
        assert_eq!(sets.len(), 3);
        assert_eq!(sets[2].reps, None);
    }

    #[tokio::test]
    async fn amrap_countdown_auto_finishes_at_zero() {
        let pool = test_pool().await;
        let rule = r#"{"typeConfig":{"amrap":{"durationSeconds":10}}}"#;
        let session_id = make_session(&pool, SessionType::Amrap, Some(rule), 1).await;
        let runner = Runner::new(pool.clone());
        runner.initialize(session_id).await.expect("initialize");
        force_running(&runner).await;

        drive(&runner, 9).await;
        let snap = runner.snapshot().await;
        assert_eq!(snap.status, Status::Running);
        assert_eq!(snap.total_remaining_seconds, Some(1));

        drive(&runner, 1).await;
        let snap = runner.snapshot().await;
        assert_eq!(snap.status, Status::Idle);
        let workout = get_workout(&pool, snap.workout_id.unwrap())
            .await
            .expect("get")
            .unwrap();
        assert!(workout.completed);
    }

    #[tokio::test]
    async fn navigation_is_bounded_and_mode_gated() {
        let pool = test_pool().await;
        let session_id = make_session(&pool, SessionType::Custom, None, 2).await;
        let runner = Runner::new(pool.clone());
        runner.initialize(session_id).await.expect("initialize");

        runner.prev_exercise().await;
        assert_eq!(runner.snapshot().await.current_exercise_index, 0);
        runner.next_exercise().await;
        runner.next_exercise().await;
        assert_eq!(runner.snapshot().await.current_exercise_index, 1);
        runner.prev_exercise().await;
        assert_eq!(runner.snapshot().await.current_exercise_index, 0);

        let rule = r#"{"typeConfig":{"emom":{"intervalSeconds":30}}}"#;
        let emom_id = make_session(&pool, SessionType::Emom, Some(rule), 2).await;
        runner.initialize(emom_id).await.expect("initialize");
        runner.next_exercise().await;
        assert_eq!(runner.snapshot().await.current_exercise_index, 0);
    }

    #[tokio::test]
    async fn empty_session_still_finishes_cleanly() {
        let pool = test_pool().await;
        let session_id = make_session(&pool, SessionType::Custom, None, 0).await;
        let runner = Runner::new(pool.clone());
        runner.initialize(session_id).await.expect("initialize");
        force_running(&runner).await;

        runner.add_rep(3).await;
        runner.complete_set().await.expect("no-op");
        runner.next_exercise().await;
        drive(&runner, 4).await;

        let workout_id = runner.finish(None).await.expect("finish").unwrap();
        let workout = get_workout(&pool, workout_id).await.expect("get").unwrap();
        assert!(workout.completed);
        assert!(
            list_workout_exercises(&pool, workout_id)
                .await
                .expect("wexs")
                .is_empty()
        );
    }

    #[tokio::test]
    async fn finish_before_initialize_is_a_no_write_none() {
        let pool = test_pool().await;
        let runner = Runner::new(pool.clone());
        assert!(runner.finish(None).await.expect("finish").is_none());
        assert!(list_workouts(&pool).await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn emom_rotation_survives_a_failed_set_write() {
        let pool = test_pool().await;
        let rule = r#"{"typeConfig":{"emom":{"intervalSeconds":2}}}"#;
        let session_id = make_session(&pool, SessionType::Emom, Some(rule), 2).await;
        let runner = Runner::new(pool.clone());
        runner.initialize(session_id).await.expect("initialize");
        force_running(&runner).await;

        drive(&runner, 1).await;
        pool.close().await;
        // The boundary tick cannot persist its set, but the rotation must
        // still advance in memory instead of stalling the workout.
        drive(&runner, 1).await;

        let snap = runner.snapshot().await;
        assert_eq!(snap.current_exercise_index, 1);
        assert_eq!(snap.exercises[0].current_set, 2);
        assert_eq!(snap.emom_remaining_seconds, Some(2));
    }

    #[tokio::test]
    async fn reset_clears_memory_but_keeps_durable_rows() {
        let pool = test_pool().await;
        let session_id = make_session(&pool, SessionType::Custom, None, 1).await;
        let runner = Runner::new(pool.clone());
        runner.initialize(session_id).await.expect("initialize");
        let workout_id = runner.snapshot().await.workout_id.unwrap();

        runner.reset().await;
        let snap = runner.snapshot().await;
        assert_eq!(snap.status, Status::Idle);
        assert!(snap.workout_id.is_none());
        assert!(snap.exercises.is_empty());

        // The partially-run workout row is still there for recovery.
        assert!(get_workout(&pool, workout_id).await.expect("get").is_some());

        // Toggling a never-initialized runner stays idle.
        runner.toggle().await;
        assert_eq!(runner.snapshot().await.status, Status::Idle);
    }
}
