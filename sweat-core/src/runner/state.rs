use crate::plan::Mode;

/// Top-level runner status. `Resting` is only entered between sets in
/// free-form/AMRAP modes; HIIT and EMOM cycle work/rest internally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Idle,
    Running,
    Paused,
    Resting,
}

/// HIIT interval phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Work,
    Rest,
}

/// In-memory counters for one exercise slot of the live attempt.
#[derive(Debug, Clone)]
pub struct ExerciseRuntime {
    pub session_exercise_id: i64,
    pub workout_exercise_id: i64,
    pub name: String,
    pub order_index: i64,
    pub sets_target: Option<i64>,
    pub target_reps: Option<i64>,
    pub target_duration_seconds: Option<i64>,
    pub rest_seconds_between_sets: Option<i64>,
    pub rest_seconds: Option<i64>,
    pub notes: Option<String>,
    /// 1-based number of the set currently in progress.
    pub current_set: i64,
    /// Reps accumulated for the in-progress set, reset on `complete_set`.
    pub pending_reps: i64,
}

/// The whole observable state of a live attempt. Cloned out as the snapshot
/// the presentation layer reads; the runner is the only writer.
#[derive(Debug, Clone)]
pub struct RunnerState {
    pub session_id: Option<i64>,
    pub workout_id: Option<i64>,
    pub started_at: Option<i64>,
    pub ended_at: Option<i64>,
    pub status: Status,
    pub mode: Mode,
    pub elapsed_seconds: i64,
    pub rest_remaining_seconds: Option<i64>,
    pub phase: Option<Phase>,
    pub phase_remaining_seconds: Option<i64>,
    /// Countdown over the whole session (AMRAP duration or HIIT total).
    pub total_remaining_seconds: Option<i64>,
    pub emom_remaining_seconds: Option<i64>,
    pub exercises: Vec<ExerciseRuntime>,
    pub current_exercise_index: usize,
}

impl Default for RunnerState {
    fn default() -> Self {
        RunnerState {
            session_id: None,
            workout_id: None,
            started_at: None,
            ended_at: None,
            status: Status::Idle,
            mode: Mode::Default,
            elapsed_seconds: 0,
            rest_remaining_seconds: None,
            phase: None,
            phase_remaining_seconds: None,
            total_remaining_seconds: None,
            emom_remaining_seconds: None,
            exercises: Vec::new(),
            current_exercise_index: 0,
        }
    }
}

impl RunnerState {
    pub fn current_exercise(&self) -> Option<&ExerciseRuntime> {
        self.exercises.get(self.current_exercise_index)
    }

    pub(crate) fn current_exercise_mut(&mut self) -> Option<&mut ExerciseRuntime> {
        self.exercises.get_mut(self.current_exercise_index)
    }
}
