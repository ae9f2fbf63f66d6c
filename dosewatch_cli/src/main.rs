use clap::{Parser, Subcommand};
use dosewatch_core::*;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

#[derive(Parser)]
#[command(name = "dosewatch")]
#[command(about = "Per-user dosage tracking with real-time risk classification", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Log an intake for the active user
    Log {
        /// Amount in ml (defaults to the configured dose)
        amount: Option<f64>,

        /// Optional note for this intake
        #[arg(long)]
        note: Option<String>,

        /// Record the intake as taken this many minutes ago
        #[arg(long)]
        minutes_ago: Option<i64>,
    },

    /// Show risk level, countdown, and 24-hour total
    Status,

    /// Show the intake history, newest first
    History {
        /// Export the history to a CSV file instead
        #[arg(long)]
        export: Option<PathBuf>,
    },

    /// Show session history with derived statistics
    Sessions,

    /// Close the open session without touching history
    NewSession,

    /// Wipe the active user's events and sessions
    Reset {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },

    /// Manage users
    User {
        #[command(subcommand)]
        command: UserCommands,
    },

    /// Show or change settings
    Settings {
        #[command(subcommand)]
        command: SettingsCommands,
    },

    /// Run the live countdown, ticking once per second
    Watch {
        /// Stop after this many seconds (default: run until Ctrl-C)
        #[arg(long)]
        seconds: Option<u64>,
    },
}

#[derive(Subcommand)]
enum UserCommands {
    /// List users, marking the active one
    List,
    /// Add a user and make them active
    Add { name: Option<String> },
    /// Remove a user by name
    Remove { name: String },
    /// Switch the active user by name
    Switch { name: String },
    /// Rename a user
    Rename { name: String, new_name: String },
}

#[derive(Subcommand)]
enum SettingsCommands {
    /// Print the current settings
    Show,
    /// Update settings; warning interval is clamped to the safe interval
    Set {
        #[arg(long)]
        safe_interval: Option<i64>,

        #[arg(long)]
        warning_interval: Option<i64>,

        #[arg(long)]
        default_dose: Option<f64>,

        #[arg(long)]
        max_daily: Option<f64>,

        #[arg(long)]
        sound: Option<bool>,
    },
}

fn main() -> Result<()> {
    dosewatch_core::logging::init();

    let cli = Cli::parse();

    let data_dir = match cli.data_dir {
        Some(dir) => dir,
        None => Config::load()?.data.data_dir,
    };
    tracing::debug!("Using data directory {:?}", data_dir);

    let mut engine = Engine::open(&data_dir);

    match cli.command {
        Commands::Log {
            amount,
            note,
            minutes_ago,
        } => cmd_log(&mut engine, amount, note, minutes_ago),
        Commands::Status => cmd_status(&engine),
        Commands::History { export } => cmd_history(&engine, export),
        Commands::Sessions => cmd_sessions(&engine),
        Commands::NewSession => {
            engine.start_new_session();
            println!("Closed the open session. Your next intake starts a new one.");
            Ok(())
        }
        Commands::Reset { yes } => cmd_reset(&mut engine, yes),
        Commands::User { command } => cmd_user(&mut engine, command),
        Commands::Settings { command } => cmd_settings(&mut engine, command),
        Commands::Watch { seconds } => cmd_watch(engine, seconds),
    }
}

fn cmd_log(
    engine: &mut Engine,
    amount: Option<f64>,
    note: Option<String>,
    minutes_ago: Option<i64>,
) -> Result<()> {
    let amount = amount.unwrap_or(engine.settings().default_dose_ml);
    let event = engine.add_intake(amount, note, minutes_ago);

    let view = engine.view();
    println!(
        "Logged {} ml for {} at {}.",
        event.amount_ml,
        view.user.name,
        event.taken_at.format("%H:%M")
    );
    if view.time_remaining_ms > 0 {
        println!(
            "Next safe window in {}.",
            format::format_countdown(view.time_remaining())
        );
    }
    Ok(())
}

fn cmd_status(engine: &Engine) -> Result<()> {
    let view = engine.view();

    println!("{} {}", view.user.emoji, view.user.name);
    println!("Status: {}", format::risk_label(view.risk_level));

    let Some(last) = view.last_event.as_ref() else {
        println!("No intakes recorded. Use `dosewatch log` to start tracking.");
        return Ok(());
    };

    let elapsed = engine.now() - last.taken_at;
    println!(
        "Last dose: {} ml, {} ago",
        last.amount_ml,
        format::format_time(elapsed)
    );
    if view.time_remaining_ms > 0 {
        println!(
            "Safe in: {}",
            format::format_countdown(view.time_remaining())
        );
    }
    println!(
        "Last 24h: {:.1} ml of {:.1} ml",
        view.total_24h_ml,
        engine.settings().max_daily_dose_ml
    );
    Ok(())
}

fn cmd_history(engine: &Engine, export: Option<PathBuf>) -> Result<()> {
    let view = engine.view();

    if let Some(path) = export {
        let written = csv_export::export_events(&view.events, &path)?;
        println!("Exported {} intake events to {}", written, path.display());
        return Ok(());
    }

    if view.events.is_empty() {
        println!("No intakes recorded.");
        return Ok(());
    }

    for event in &view.events {
        let note = event.note.as_deref().unwrap_or("");
        println!(
            "{}  {:>5.1} ml  {}",
            event.taken_at.format("%Y-%m-%d %H:%M"),
            event.amount_ml,
            note
        );
    }
    Ok(())
}

fn cmd_sessions(engine: &Engine) -> Result<()> {
    let view = engine.view();

    if view.sessions.is_empty() {
        println!("No sessions recorded.");
        return Ok(());
    }

    for session in &view.sessions {
        let open = view
            .current_session
            .as_ref()
            .is_some_and(|current| current.id == session.id);
        println!(
            "{}  {} intake{}, {:.1} ml over {:.1}h ({:.1} ml/h, {:.1} ml/intake){}",
            session.first_intake_at.format("%Y-%m-%d %H:%M"),
            session.intake_count,
            if session.intake_count != 1 { "s" } else { "" },
            session.total_ml,
            session.duration_hours,
            session.ml_per_hour,
            session.ml_per_intake,
            if open { "  [open]" } else { "" }
        );
    }
    Ok(())
}

fn cmd_reset(engine: &mut Engine, yes: bool) -> Result<()> {
    let name = engine.current_user().name.clone();

    if !yes {
        print!("Wipe all events and sessions for {}? [y/N] ", name);
        io::stdout().flush()?;
        let mut answer = String::new();
        io::stdin().read_line(&mut answer)?;
        if !answer.trim().eq_ignore_ascii_case("y") {
            println!("Aborted.");
            return Ok(());
        }
    }

    engine.reset_session();
    println!("Cleared all dosage data for {}.", name);
    Ok(())
}

fn cmd_user(engine: &mut Engine, command: UserCommands) -> Result<()> {
    match command {
        UserCommands::List => {
            let current = engine.current_user().id;
            for user in engine.users() {
                let marker = if user.id == current { "*" } else { " " };
                println!("{} {} {}", marker, user.emoji, user.name);
            }
            Ok(())
        }
        UserCommands::Add { name } => {
            let user = engine.add_user(name);
            println!("Added and switched to {}.", user.name);
            Ok(())
        }
        UserCommands::Remove { name } => {
            let Some(id) = engine.find_user_by_name(&name).map(|u| u.id) else {
                println!("No user named {:?}.", name);
                return Ok(());
            };
            if engine.remove_user(id) {
                println!("Removed {}.", name);
            } else {
                println!("Cannot remove the last remaining user.");
            }
            Ok(())
        }
        UserCommands::Switch { name } => {
            let Some(id) = engine.find_user_by_name(&name).map(|u| u.id) else {
                println!("No user named {:?}.", name);
                return Ok(());
            };
            engine.switch_user(id);
            println!("Switched to {}.", name);
            Ok(())
        }
        UserCommands::Rename { name, new_name } => {
            let Some(id) = engine.find_user_by_name(&name).map(|u| u.id) else {
                println!("No user named {:?}.", name);
                return Ok(());
            };
            engine.update_user(
                id,
                UserUpdate {
                    name: Some(new_name.clone()),
                    ..Default::default()
                },
            );
            println!("Renamed {} to {}.", name, new_name);
            Ok(())
        }
    }
}

fn cmd_settings(engine: &mut Engine, command: SettingsCommands) -> Result<()> {
    match command {
        SettingsCommands::Show => {
            let s = engine.settings();
            println!("safe_interval_min: {}", s.safe_interval_min);
            println!("warning_interval_min: {}", s.warning_interval_min);
            println!("default_dose_ml: {}", s.default_dose_ml);
            println!("max_daily_dose_ml: {}", s.max_daily_dose_ml);
            println!("sound_enabled: {}", s.sound_enabled);
            Ok(())
        }
        SettingsCommands::Set {
            safe_interval,
            warning_interval,
            default_dose,
            max_daily,
            sound,
        } => {
            engine.update_settings(SettingsUpdate {
                safe_interval_min: safe_interval,
                warning_interval_min: warning_interval,
                default_dose_ml: default_dose,
                max_daily_dose_ml: max_daily,
                sound_enabled: sound,
            });
            println!("Settings updated.");
            Ok(())
        }
    }
}

fn cmd_watch(engine: Engine, seconds: Option<u64>) -> Result<()> {
    let engine = Arc::new(Mutex::new(engine));
    let ticker = Ticker::spawn_per_second(Arc::clone(&engine));

    println!("Watching (Ctrl-C to stop)...");
    let started = std::time::Instant::now();
    loop {
        if let Some(limit) = seconds {
            if started.elapsed().as_secs() >= limit {
                break;
            }
        }
        {
            let engine = engine.lock().expect("engine poisoned");
            let view = engine.view();
            if let Some(last) = view.last_event.as_ref() {
                let elapsed = engine.now() - last.taken_at;
                println!(
                    "{}  elapsed {}  safe in {}",
                    format::risk_label(view.risk_level),
                    format::format_elapsed_hms(elapsed),
                    format::format_countdown(view.time_remaining())
                );
            } else {
                println!("{}  no intakes recorded", format::risk_label(view.risk_level));
            }
        }
        std::thread::sleep(std::time::Duration::from_secs(1));
    }

    ticker.stop();
    Ok(())
}
