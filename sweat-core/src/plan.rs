//! Session definition model: resolves a stored session template into the
//! runtime mode and ordered exercise descriptors the runner executes.

use log::debug;
use serde::Deserialize;
use sqlx::SqlitePool;

use crate::db::models::{SessionExerciseDetail, SessionType};
use crate::db::operations::{get_session, list_session_exercises_detailed};
use crate::error::{Error, Result};

/// Default EMOM interval when the configuration omits one. Applied once here,
/// at resolution time; the tick path never re-derives it.
pub const DEFAULT_EMOM_INTERVAL_SECONDS: i64 = 60;

/// Resolved execution discipline with its parameters. Malformed or missing
/// configuration degrades to `Default` (free-form) instead of erroring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Default,
    Amrap {
        duration_seconds: i64,
    },
    Hiit {
        work_seconds: i64,
        rest_seconds: i64,
        total_duration_seconds: i64,
    },
    Emom {
        interval_seconds: i64,
    },
}

impl Mode {
    pub fn label(&self) -> &'static str {
        match self {
            Mode::Default => "DEFAULT",
            Mode::Amrap { .. } => "AMRAP",
            Mode::Hiit { .. } => "HIIT",
            Mode::Emom { .. } => "EMOM",
        }
    }

    /// Manual exercise navigation is only allowed where rotation is not
    /// timer-driven.
    pub fn allows_navigation(&self) -> bool {
        matches!(self, Mode::Default | Mode::Amrap { .. })
    }
}

// Wire shape of the session's `repeat_rule` blob. Only the sub-object
// matching the declared session type is ever read.
#[derive(Debug, Deserialize)]
struct RepeatRule {
    #[serde(rename = "typeConfig")]
    type_config: Option<TypeConfig>,
}

#[derive(Debug, Default, Deserialize)]
struct TypeConfig {
    hiit: Option<HiitParams>,
    amrap: Option<AmrapParams>,
    emom: Option<EmomParams>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HiitParams {
    work_seconds: Option<i64>,
    rest_seconds: Option<i64>,
    total_duration_seconds: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AmrapParams {
    duration_seconds: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EmomParams {
    interval_seconds: Option<i64>,
}

/// Runtime targets for one exercise slot. Fields irrelevant to the resolved
/// mode are nulled at construction so the runner never has to re-check.
#[derive(Debug, Clone)]
pub struct ExercisePlan {
    pub session_exercise_id: i64,
    pub exercise_id: Option<i64>,
    pub name: String,
    pub order_index: i64,
    pub sets: Option<i64>,
    pub target_reps: Option<i64>,
    pub target_duration_seconds: Option<i64>,
    pub rest_seconds_between_sets: Option<i64>,
    pub rest_seconds: Option<i64>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SessionPlan {
    pub session_id: i64,
    pub name: String,
    pub mode: Mode,
    pub exercises: Vec<ExercisePlan>,
}

impl SessionPlan {
    /// Loads the session and its ordered exercises and resolves the runner
    /// mode from the declared type plus the configuration blob.
    pub async fn resolve(pool: &SqlitePool, session_id: i64) -> Result<SessionPlan> {
        let session = get_session(pool, session_id)
            .await?
            .ok_or(Error::NotFound("session", session_id))?;
        let details = list_session_exercises_detailed(pool, session_id).await?;

        let mode = resolve_mode(session.session_type, session.repeat_rule.as_deref());
        let per_set_targets = matches!(mode, Mode::Default | Mode::Amrap { .. });

        let exercises = details
            .iter()
            .enumerate()
            .map(|(position, detail)| ExercisePlan {
                session_exercise_id: detail.id,
                exercise_id: detail.exercise_id,
                name: display_name(detail, position),
                order_index: detail.order_index,
                sets: detail.sets.filter(|_| per_set_targets),
                target_reps: detail.target_reps.filter(|_| per_set_targets),
                target_duration_seconds: detail.target_duration_seconds.filter(|_| per_set_targets),
                rest_seconds_between_sets: detail
                    .rest_seconds_between_sets
                    .filter(|_| per_set_targets),
                rest_seconds: detail.rest_seconds.filter(|_| per_set_targets),
                notes: detail.notes.clone(),
            })
            .collect();

        Ok(SessionPlan {
            session_id,
            name: session.name,
            mode,
            exercises,
        })
    }
}

/// Custom name first, then the linked exercise's name, then a positional
/// placeholder.
pub(crate) fn display_name(detail: &SessionExerciseDetail, position: usize) -> String {
    detail
        .custom_name
        .clone()
        .filter(|s| !s.is_empty())
        .or_else(|| detail.exercise_name.clone())
        .unwrap_or_else(|| format!("Exercise {}", position + 1))
}

fn resolve_mode(session_type: SessionType, repeat_rule: Option<&str>) -> Mode {
    let config = match repeat_rule.map(serde_json::from_str::<RepeatRule>) {
        Some(Ok(rule)) => rule.type_config.unwrap_or_default(),
        Some(Err(err)) => {
            // Malformed configuration degrades to free-form, never errors.
            debug!("unparsable repeat rule, falling back to free-form: {err}");
            return Mode::Default;
        }
        None => return Mode::Default,
    };

    match session_type {
        SessionType::Hiit => match config.hiit {
            Some(HiitParams {
                work_seconds: Some(work),
                rest_seconds: Some(rest),
                total_duration_seconds: Some(total),
            }) => Mode::Hiit {
                work_seconds: work,
                rest_seconds: rest,
                total_duration_seconds: total,
            },
            _ => Mode::Default,
        },
        SessionType::Amrap => match config.amrap {
            Some(AmrapParams {
                duration_seconds: Some(duration),
            }) => Mode::Amrap {
                duration_seconds: duration,
            },
            _ => Mode::Default,
        },
        SessionType::Emom => match config.emom {
            Some(params) => Mode::Emom {
                interval_seconds: params
                    .interval_seconds
                    .unwrap_or(DEFAULT_EMOM_INTERVAL_SECONDS),
            },
            None => Mode::Default,
        },
        SessionType::Custom => Mode::Default,
    }
}
