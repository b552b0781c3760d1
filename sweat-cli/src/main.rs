use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use log::debug;

use sweat::db;
use sweat::db::models::{NewSession, SessionType};
use sweat::db::operations::{
    create_exercise, create_program, create_session, delete_exercise, get_program, get_session,
    list_exercises, list_programs, list_sessions, list_sessions_for_program, list_workouts,
};
use sweat::plan::SessionPlan;
use sweat::summary::{SummaryQuery, WorkoutSummary, summarize};

#[derive(Parser, Debug)]
#[command(version, about = "sweat - Workout Tracker CLI", long_about = None)]
struct Args {
    /// Database path (defaults to DATABASE_URL, then ./sweat.db)
    #[arg(long)]
    database: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Manage the exercise library
    Exercise {
        #[command(subcommand)]
        command: ExerciseCommands,
    },
    /// Inspect session templates
    Session {
        #[command(subcommand)]
        command: SessionCommands,
    },
    /// Inspect multi-week programs
    Program {
        #[command(subcommand)]
        command: ProgramCommands,
    },
    /// List workout history, most recent first
    History,
    /// Show the per-exercise recap of a workout
    Summary {
        /// Workout to summarize
        #[arg(long, conflicts_with = "session_id")]
        workout_id: Option<i64>,
        /// Summarize the most recent workout of this session
        #[arg(long)]
        session_id: Option<i64>,
    },
}

#[derive(Subcommand, Debug)]
enum ExerciseCommands {
    Add {
        name: String,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
    List,
    Delete {
        id: i64,
    },
}

#[derive(Subcommand, Debug)]
enum SessionCommands {
    Add {
        name: String,
        /// AMRAP, HIIT, EMOM or CUSTOM
        #[arg(long, default_value = "CUSTOM")]
        r#type: String,
        /// Mode configuration blob, e.g. '{"typeConfig":{"amrap":{"durationSeconds":600}}}'
        #[arg(long)]
        config: Option<String>,
    },
    List,
    /// Show a session with its resolved runner mode and exercise targets
    Show {
        id: i64,
    },
}

#[derive(Subcommand, Debug)]
enum ProgramCommands {
    Add {
        name: String,
        #[arg(long)]
        description: Option<String>,
    },
    List,
    Show {
        id: i64,
    },
}

fn parse_session_type(value: &str) -> Result<SessionType> {
    match value.to_uppercase().as_str() {
        "AMRAP" => Ok(SessionType::Amrap),
        "HIIT" => Ok(SessionType::Hiit),
        "EMOM" => Ok(SessionType::Emom),
        "CUSTOM" => Ok(SessionType::Custom),
        other => bail!("unknown session type '{other}' (expected AMRAP, HIIT, EMOM or CUSTOM)"),
    }
}

fn format_duration(seconds: i64) -> String {
    if seconds >= 60 {
        format!("{}m{:02}s", seconds / 60, seconds % 60)
    } else {
        format!("{seconds}s")
    }
}

fn print_summary(summary: &WorkoutSummary) {
    let session_name = summary.session_name.as_deref().unwrap_or("(deleted session)");
    println!("Workout #{} - {}", summary.workout.id, session_name);
    if let Some(session_type) = summary.session_type {
        println!("  mode: {session_type}");
    }
    println!(
        "  total time: {}  completed: {}",
        format_duration(summary.workout.total_time_seconds.unwrap_or(0)),
        if summary.workout.completed { "yes" } else { "no" }
    );
    for row in &summary.rows {
        let mut parts = vec![format!("{} sets", row.sets_count)];
        if row.total_reps > 0 {
            parts.push(format!("{} reps", row.total_reps));
        }
        if row.total_duration_seconds > 0 {
            parts.push(format_duration(row.total_duration_seconds));
        }
        println!("  {} - {}", row.name, parts.join(", "));
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let _ = dotenv();
    let args = Args::parse();

    let database = args
        .database
        .or_else(|| std::env::var("DATABASE_URL").ok())
        .unwrap_or_else(|| "sweat.db".to_string());
    debug!("opening database at {database}");
    let pool = db::connect(&database).await?;

    match args.command {
        Commands::Exercise { command } => match command {
            ExerciseCommands::Add {
                name,
                category,
                description,
            } => {
                let exercise = create_exercise(
                    &pool,
                    &name,
                    category.as_deref(),
                    description.as_deref(),
                    true,
                )
                .await?;
                println!("created exercise #{}: {}", exercise.id, exercise.name);
            }
            ExerciseCommands::List => {
                for exercise in list_exercises(&pool).await? {
                    let category = exercise.category.as_deref().unwrap_or("-");
                    println!("#{:<4} {:<30} {}", exercise.id, exercise.name, category);
                }
            }
            ExerciseCommands::Delete { id } => {
                if delete_exercise(&pool, id).await? == 0 {
                    bail!("exercise {id} not found");
                }
                println!("deleted exercise #{id}");
            }
        },
        Commands::Session { command } => match command {
            SessionCommands::Add {
                name,
                r#type,
                config,
            } => {
                let session = create_session(
                    &pool,
                    &NewSession {
                        name,
                        session_type: Some(parse_session_type(&r#type)?),
                        repeat_rule: config,
                        ..Default::default()
                    },
                )
                .await?;
                println!(
                    "created session #{}: {} ({})",
                    session.id, session.name, session.session_type
                );
            }
            SessionCommands::List => {
                for session in list_sessions(&pool).await? {
                    println!(
                        "#{:<4} {:<30} {}",
                        session.id, session.name, session.session_type
                    );
                }
            }
            SessionCommands::Show { id } => {
                let session = get_session(&pool, id)
                    .await?
                    .ok_or_else(|| anyhow::anyhow!("session {id} not found"))?;
                let plan = SessionPlan::resolve(&pool, session.id).await?;
                println!("#{} {} - runs as {}", session.id, session.name, plan.mode.label());
                for exercise in &plan.exercises {
                    let mut targets = Vec::new();
                    if let Some(sets) = exercise.sets {
                        targets.push(format!("{sets} sets"));
                    }
                    if let Some(reps) = exercise.target_reps {
                        targets.push(format!("{reps} reps"));
                    }
                    if let Some(rest) = exercise.rest_seconds_between_sets {
                        targets.push(format!("{rest}s rest"));
                    }
                    let targets = if targets.is_empty() {
                        String::new()
                    } else {
                        format!(" ({})", targets.join(", "))
                    };
                    println!("  {}. {}{}", exercise.order_index + 1, exercise.name, targets);
                }
            }
        },
        Commands::Program { command } => match command {
            ProgramCommands::Add { name, description } => {
                let program = create_program(&pool, &name, description.as_deref()).await?;
                println!("created program #{}: {}", program.id, program.name);
            }
            ProgramCommands::List => {
                for program in list_programs(&pool).await? {
                    let description = program.description.as_deref().unwrap_or("-");
                    println!("#{:<4} {:<30} {}", program.id, program.name, description);
                }
            }
            ProgramCommands::Show { id } => {
                let program = get_program(&pool, id)
                    .await?
                    .ok_or_else(|| anyhow::anyhow!("program {id} not found"))?;
                println!("#{} {}", program.id, program.name);
                for (position, session) in list_sessions_for_program(&pool, program.id)
                    .await?
                    .iter()
                    .enumerate()
                {
                    println!(
                        "  {}. {} ({})",
                        position + 1,
                        session.name,
                        session.session_type
                    );
                }
            }
        },
        Commands::History => {
            for workout in list_workouts(&pool).await? {
                println!(
                    "#{:<4} session={:<6} {} {}",
                    workout.id,
                    workout
                        .session_id
                        .map(|id| id.to_string())
                        .unwrap_or_else(|| "-".to_string()),
                    format_duration(workout.total_time_seconds.unwrap_or(0)),
                    if workout.completed { "completed" } else { "in progress" }
                );
            }
        }
        Commands::Summary {
            workout_id,
            session_id,
        } => {
            let query = match (workout_id, session_id) {
                (Some(id), _) => SummaryQuery::Workout(id),
                (None, Some(id)) => SummaryQuery::LastForSession(id),
                (None, None) => bail!("pass --workout-id or --session-id"),
            };
            match summarize(&pool, query).await? {
                Some(summary) => print_summary(&summary),
                None => println!("nothing to show"),
            }
        }
    }

    Ok(())
}
