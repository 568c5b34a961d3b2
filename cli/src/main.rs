mod commands;
mod config;

use anyhow::Result;
use chrono::Local;
use clap::{Parser, Subcommand};
use std::process;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::commands::{
    LogKind, cmd_account_claim, cmd_account_coins, cmd_account_login, cmd_account_logout,
    cmd_account_show, cmd_account_sign_in, cmd_account_tasks, cmd_body_delete, cmd_body_list,
    cmd_body_log, cmd_body_metrics, cmd_body_update, cmd_bowel_log, cmd_bowel_update,
    cmd_daily_month, cmd_daily_reading, cmd_daily_record, cmd_daily_show, cmd_daily_week,
    cmd_log_delete, cmd_log_list, cmd_mood_log, cmd_mood_update, cmd_period_list, cmd_period_log,
    cmd_period_update, cmd_sleep_log, cmd_sleep_update, cmd_target_set, cmd_target_show,
    cmd_water_log, cmd_water_update, cmd_workout_delete, cmd_workout_list, cmd_workout_log,
    cmd_workout_totals,
};
use crate::config::Config;
use pacer_core::service::{DEFAULT_SIGN_IN_REWARD, PacerService};

#[derive(Parser)]
#[command(
    name = "pacer",
    version,
    about = "A local-first step counter and health log",
    long_about = "Tracks daily steps, workouts, body measurements and daily logs in a local \
                  database, with an optional account for sign-in rewards and tasks.\n\n\
                  Data lives in the platform data directory, or in $PACER_DATA_DIR when set."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record and review workouts
    Workout {
        #[command(subcommand)]
        command: WorkoutCommands,
    },
    /// Daily step totals
    Daily {
        #[command(subcommand)]
        command: DailyCommands,
    },
    /// Body measurements (weight, height, girths)
    Body {
        #[command(subcommand)]
        command: BodyCommands,
    },
    /// Water intake log
    Water {
        #[command(subcommand)]
        command: WaterCommands,
    },
    /// Bowel movement log
    Bowel {
        #[command(subcommand)]
        command: BowelCommands,
    },
    /// Mood log
    Mood {
        #[command(subcommand)]
        command: MoodCommands,
    },
    /// Sleep log
    Sleep {
        #[command(subcommand)]
        command: SleepCommands,
    },
    /// Menstrual cycle log
    Period {
        #[command(subcommand)]
        command: PeriodCommands,
    },
    /// Daily goals
    Target {
        #[command(subcommand)]
        command: TargetCommands,
    },
    /// Account, sign-in rewards and tasks
    Account {
        #[command(subcommand)]
        command: AccountCommands,
    },
}

#[derive(Subcommand)]
enum WorkoutCommands {
    /// Log a finished workout
    Log {
        /// Sport: indoor-run, outdoor-run, walk, hike, climb, cycling, fitness, other
        sport: String,
        /// Steps taken
        #[arg(short, long)]
        steps: i64,
        /// Duration in minutes
        #[arg(short, long)]
        minutes: i64,
        /// Calories burned
        #[arg(short, long)]
        calories: Option<f64>,
        /// Date (YYYY-MM-DD or today/yesterday/tomorrow, default: today)
        #[arg(long)]
        date: Option<String>,
        /// Start time (HH:MM, default: now for today, noon otherwise)
        #[arg(long)]
        time: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List workouts, oldest first
    List {
        /// Only this sport
        #[arg(short, long)]
        sport: Option<String>,
        /// Only the last N days
        #[arg(short, long)]
        days: Option<u32>,
        /// Only the first matching workout
        #[arg(long)]
        first: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Total steps and distance per sport
    Totals {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a workout by ID
    Delete {
        /// Workout ID
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum DailyCommands {
    /// Set the step total for a day
    Record {
        /// Steps for the day
        steps: i64,
        /// Date (YYYY-MM-DD or today/yesterday/tomorrow, default: today)
        #[arg(long)]
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Feed a cumulative pedometer reading
    Reading {
        /// Total steps reported by the sensor since boot
        total: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show steps for a day (default: today)
    Show {
        /// Date (YYYY-MM-DD or today/yesterday/tomorrow)
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the last seven days
    Week {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the step total for a month
    Month {
        /// Month (YYYY-MM, default: this month)
        month: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum BodyCommands {
    /// Log a measurement
    Log {
        /// Measurement: height, weight, chest, waist, hip, arm, thigh, calf, body
        kind: String,
        /// Value (e.g. 70.5)
        value: String,
        /// Unit (default: kg for weight, cm otherwise)
        #[arg(short, long)]
        unit: Option<String>,
        /// Date (YYYY-MM-DD or today/yesterday/tomorrow, default: today)
        #[arg(long)]
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List measurements of one kind, newest first
    List {
        /// Measurement kind
        kind: String,
        /// Maximum number of entries (0 = all)
        #[arg(short, long, default_value = "0")]
        limit: usize,
        /// Only the last N days (overrides --limit)
        #[arg(short, long)]
        days: Option<u32>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Change the value of a measurement
    Update {
        /// Record ID
        id: i64,
        /// New value
        value: String,
        /// New unit
        #[arg(short, long)]
        unit: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a measurement by ID
    Delete {
        /// Record ID
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show or edit height, weight, age and gender, with BMI and BMR
    Metrics {
        /// Height in cm
        #[arg(long)]
        height: Option<f64>,
        /// Weight in kg
        #[arg(long)]
        weight: Option<f64>,
        /// Age in years
        #[arg(long)]
        age: Option<i64>,
        /// male or female
        #[arg(long)]
        gender: Option<String>,
        /// Weight goal in kg
        #[arg(long)]
        weight_target: Option<i64>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum WaterCommands {
    /// Log a drink
    Log {
        /// Amount in ml
        amount: i64,
        /// Optional note
        #[arg(long)]
        note: Option<String>,
        /// Date (YYYY-MM-DD or today/yesterday/tomorrow, default: today)
        #[arg(long)]
        date: Option<String>,
        /// Time (HH:MM)
        #[arg(long)]
        time: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List recent entries
    List {
        /// Number of days to show
        #[arg(short, long, default_value = "7")]
        days: u32,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Change an entry; fields not given are kept
    Update {
        /// Entry ID
        id: i64,
        /// New amount in ml
        #[arg(long)]
        amount: Option<i64>,
        /// Replacement note
        #[arg(long)]
        note: Option<String>,
        /// New date (YYYY-MM-DD or today/yesterday/tomorrow)
        #[arg(long)]
        date: Option<String>,
        /// New time (HH:MM)
        #[arg(long)]
        time: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete an entry by ID
    Delete {
        /// Entry ID
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum BowelCommands {
    /// Log a bowel movement
    Log {
        /// Status (e.g. normal, hard, loose)
        status: String,
        /// Optional note
        #[arg(long)]
        note: Option<String>,
        /// Date (YYYY-MM-DD or today/yesterday/tomorrow, default: today)
        #[arg(long)]
        date: Option<String>,
        /// Time (HH:MM)
        #[arg(long)]
        time: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List recent entries
    List {
        /// Number of days to show
        #[arg(short, long, default_value = "7")]
        days: u32,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Change an entry; fields not given are kept
    Update {
        /// Entry ID
        id: i64,
        /// New status
        #[arg(long)]
        status: Option<String>,
        /// Replacement note
        #[arg(long)]
        note: Option<String>,
        /// New date (YYYY-MM-DD or today/yesterday/tomorrow)
        #[arg(long)]
        date: Option<String>,
        /// New time (HH:MM)
        #[arg(long)]
        time: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete an entry by ID
    Delete {
        /// Entry ID
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum MoodCommands {
    /// Log a mood score
    Log {
        /// Score from 1 (low) to 5 (great)
        score: i64,
        /// Optional note
        #[arg(long)]
        note: Option<String>,
        /// Date (YYYY-MM-DD or today/yesterday/tomorrow, default: today)
        #[arg(long)]
        date: Option<String>,
        /// Time (HH:MM)
        #[arg(long)]
        time: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List recent entries
    List {
        /// Number of days to show
        #[arg(short, long, default_value = "7")]
        days: u32,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Change an entry; fields not given are kept
    Update {
        /// Entry ID
        id: i64,
        /// New score from 1 to 5
        #[arg(long)]
        score: Option<i64>,
        /// Replacement note
        #[arg(long)]
        note: Option<String>,
        /// New date (YYYY-MM-DD or today/yesterday/tomorrow)
        #[arg(long)]
        date: Option<String>,
        /// New time (HH:MM)
        #[arg(long)]
        time: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete an entry by ID
    Delete {
        /// Entry ID
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum SleepCommands {
    /// Log a night of sleep
    Log {
        /// Bedtime (HH:MM)
        bedtime: String,
        /// Wake time (HH:MM)
        wake: String,
        /// Quality from 0 to 5
        #[arg(short, long, default_value = "3")]
        quality: i64,
        /// Optional note
        #[arg(long)]
        note: Option<String>,
        /// Wake-up date (YYYY-MM-DD or today/yesterday, default: today)
        #[arg(long)]
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List recent nights
    List {
        /// Number of days to show
        #[arg(short, long, default_value = "7")]
        days: u32,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Change an entry; fields not given are kept
    Update {
        /// Entry ID
        id: i64,
        /// New bedtime (HH:MM)
        #[arg(long)]
        bedtime: Option<String>,
        /// New wake time (HH:MM)
        #[arg(long)]
        wake: Option<String>,
        /// New quality from 0 to 5
        #[arg(short, long)]
        quality: Option<i64>,
        /// Replacement note
        #[arg(long)]
        note: Option<String>,
        /// New wake-up date
        #[arg(long)]
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete an entry by ID
    Delete {
        /// Entry ID
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum PeriodCommands {
    /// Log a period
    Log {
        /// First day (YYYY-MM-DD or today/yesterday)
        start: String,
        /// Last day (default: same as start)
        #[arg(long)]
        end: Option<String>,
        /// Cycle length in days
        #[arg(short, long, default_value = "28")]
        cycle: i64,
        /// Optional note
        #[arg(long)]
        note: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List recent periods, newest first
    List {
        /// Maximum number of entries (0 = all)
        #[arg(short, long, default_value = "6")]
        limit: u32,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Change an entry; fields not given are kept
    Update {
        /// Entry ID
        id: i64,
        /// New first day
        #[arg(long)]
        start: Option<String>,
        /// New last day
        #[arg(long)]
        end: Option<String>,
        /// New cycle length in days
        #[arg(short, long)]
        cycle: Option<i64>,
        /// Replacement note
        #[arg(long)]
        note: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete an entry by ID
    Delete {
        /// Entry ID
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum TargetCommands {
    /// Set a daily goal
    Set {
        /// Goal: steps, calories, exercise-time, activity-count, distance, weight
        key: String,
        /// Goal value
        value: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show all goals
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum AccountCommands {
    /// Log in, creating the account on first use
    Login {
        /// Account ID from the identity provider
        id: String,
        /// Secondary provider ID
        #[arg(long)]
        open_id: Option<String>,
        /// Display name
        #[arg(long)]
        name: Option<String>,
        /// Avatar URL
        #[arg(long)]
        avatar: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show profile, today's steps and the weekly trend
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Sign in for today and collect the reward
    SignIn {
        /// Coins to award
        #[arg(long, default_value_t = DEFAULT_SIGN_IN_REWARD)]
        reward: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List reward tasks
    Tasks {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Claim a completed task
    Claim {
        /// Task ID
        task_id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show coin history, newest first
    Coins {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Log out and forget the saved session
    Logout {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

#[allow(clippy::too_many_lines)]
async fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;
    let today = Local::now().date_naive();
    tracing::debug!(data_dir = %config.data_dir.display(), %today, "opening store");
    let mut svc = PacerService::open(&config.data_dir, config.sync, today).await?;
    svc.resume_session(today).await?;

    match cli.command {
        Commands::Workout { command } => match command {
            WorkoutCommands::Log {
                sport,
                steps,
                minutes,
                calories,
                date,
                time,
                json,
            } => {
                cmd_workout_log(
                    &svc,
                    &sport,
                    steps,
                    minutes,
                    calories,
                    date,
                    time.as_deref(),
                    json,
                )
                .await
            }
            WorkoutCommands::List {
                sport,
                days,
                first,
                json,
            } => cmd_workout_list(&svc, sport.as_deref(), days, first, json),
            WorkoutCommands::Totals { json } => cmd_workout_totals(&svc, json),
            WorkoutCommands::Delete { id, json } => cmd_workout_delete(&svc, id, json),
        },
        Commands::Daily { command } => match command {
            DailyCommands::Record { steps, date, json } => {
                cmd_daily_record(&svc, steps, date, json).await
            }
            DailyCommands::Reading { total, json } => cmd_daily_reading(&svc, total, json).await,
            DailyCommands::Show { date, json } => cmd_daily_show(&svc, date, json),
            DailyCommands::Week { json } => cmd_daily_week(&svc, json),
            DailyCommands::Month { month, json } => cmd_daily_month(&svc, month, json),
        },
        Commands::Body { command } => match command {
            BodyCommands::Log {
                kind,
                value,
                unit,
                date,
                json,
            } => cmd_body_log(&svc, &kind, &value, unit.as_deref(), date, json).await,
            BodyCommands::List {
                kind,
                limit,
                days,
                json,
            } => cmd_body_list(&svc, &kind, limit, days, json),
            BodyCommands::Update {
                id,
                value,
                unit,
                json,
            } => cmd_body_update(&svc, id, &value, unit.as_deref(), json),
            BodyCommands::Delete { id, json } => cmd_body_delete(&svc, id, json),
            BodyCommands::Metrics {
                height,
                weight,
                age,
                gender,
                weight_target,
                json,
            } => {
                cmd_body_metrics(
                    &mut svc,
                    height,
                    weight,
                    age,
                    gender.as_deref(),
                    weight_target,
                    json,
                )
                .await
            }
        },
        Commands::Water { command } => match command {
            WaterCommands::Log {
                amount,
                note,
                date,
                time,
                json,
            } => cmd_water_log(&svc, amount, note, date, time.as_deref(), json),
            WaterCommands::List { days, json } => cmd_log_list(&svc, LogKind::Water, days, json),
            WaterCommands::Update {
                id,
                amount,
                note,
                date,
                time,
                json,
            } => cmd_water_update(&svc, id, amount, note, date, time.as_deref(), json),
            WaterCommands::Delete { id, json } => cmd_log_delete(&svc, LogKind::Water, id, json),
        },
        Commands::Bowel { command } => match command {
            BowelCommands::Log {
                status,
                note,
                date,
                time,
                json,
            } => cmd_bowel_log(&svc, &status, note, date, time.as_deref(), json),
            BowelCommands::List { days, json } => cmd_log_list(&svc, LogKind::Bowel, days, json),
            BowelCommands::Update {
                id,
                status,
                note,
                date,
                time,
                json,
            } => cmd_bowel_update(
                &svc,
                id,
                status.as_deref(),
                note,
                date,
                time.as_deref(),
                json,
            ),
            BowelCommands::Delete { id, json } => cmd_log_delete(&svc, LogKind::Bowel, id, json),
        },
        Commands::Mood { command } => match command {
            MoodCommands::Log {
                score,
                note,
                date,
                time,
                json,
            } => cmd_mood_log(&svc, score, note, date, time.as_deref(), json),
            MoodCommands::List { days, json } => cmd_log_list(&svc, LogKind::Mood, days, json),
            MoodCommands::Update {
                id,
                score,
                note,
                date,
                time,
                json,
            } => cmd_mood_update(&svc, id, score, note, date, time.as_deref(), json),
            MoodCommands::Delete { id, json } => cmd_log_delete(&svc, LogKind::Mood, id, json),
        },
        Commands::Sleep { command } => match command {
            SleepCommands::Log {
                bedtime,
                wake,
                quality,
                note,
                date,
                json,
            } => cmd_sleep_log(&svc, &bedtime, &wake, quality, note, date, json),
            SleepCommands::List { days, json } => cmd_log_list(&svc, LogKind::Sleep, days, json),
            SleepCommands::Update {
                id,
                bedtime,
                wake,
                quality,
                note,
                date,
                json,
            } => cmd_sleep_update(&svc, id, bedtime, wake, quality, note, date, json),
            SleepCommands::Delete { id, json } => cmd_log_delete(&svc, LogKind::Sleep, id, json),
        },
        Commands::Period { command } => match command {
            PeriodCommands::Log {
                start,
                end,
                cycle,
                note,
                json,
            } => cmd_period_log(&svc, &start, end, cycle, note, json),
            PeriodCommands::List { limit, json } => cmd_period_list(&svc, limit, json),
            PeriodCommands::Update {
                id,
                start,
                end,
                cycle,
                note,
                json,
            } => cmd_period_update(&svc, id, start, end, cycle, note, json),
            PeriodCommands::Delete { id, json } => {
                cmd_log_delete(&svc, LogKind::Period, id, json)
            }
        },
        Commands::Target { command } => match command {
            TargetCommands::Set { key, value, json } => {
                cmd_target_set(&mut svc, &key, value, json).await
            }
            TargetCommands::Show { json } => cmd_target_show(&svc, json),
        },
        Commands::Account { command } => match command {
            AccountCommands::Login {
                id,
                open_id,
                name,
                avatar,
                json,
            } => cmd_account_login(&svc, &id, open_id, name, avatar, json).await,
            AccountCommands::Show { json } => cmd_account_show(&svc, json).await,
            AccountCommands::SignIn { reward, json } => {
                cmd_account_sign_in(&svc, reward, json).await
            }
            AccountCommands::Tasks { json } => cmd_account_tasks(&svc, json).await,
            AccountCommands::Claim { task_id, json } => {
                cmd_account_claim(&svc, task_id, json).await
            }
            AccountCommands::Coins { json } => cmd_account_coins(&svc, json),
            AccountCommands::Logout { json } => cmd_account_logout(&svc, json).await,
        },
    }
}
