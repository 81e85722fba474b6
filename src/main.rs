use std::process::ExitCode;

use rollcall::roll_call::{Clock, SystemClock};
use rollcall::{RollCallManager, Settings, Storage, db, models::student};

const DEMO_SCOPE: &str = "demo-class";

fn main() -> ExitCode {
    env_logger::init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let settings = Settings::from_env()?;

    let storage = Storage::open(&settings.db_path, settings.pool_size)?;
    // A failed migration leaves the schema untouched and aborts startup.
    let version = storage.apply_all_migrations()?;
    log::info!("Database schema at version {version}");

    if settings.seed_demo {
        let today = SystemClock.today();
        storage.transaction(|tx| db::seed_demo_roster(tx, DEMO_SCOPE, today))?;
    }

    let manager = RollCallManager::new(storage.clone(), settings.manager.clone());

    let args: Vec<String> = std::env::args().skip(1).collect();
    let output = match args.first().map(String::as_str) {
        None | Some("sessions") => serde_json::to_string_pretty(&manager.list_sessions()?)?,
        Some("students") => {
            let roster = storage.read(|conn| Ok(student::find_all(conn)?))?;
            serde_json::to_string_pretty(&roster)?
        }
        Some("show") => {
            let id = session_id_arg(&args)?;
            serde_json::to_string_pretty(&manager.session_view(id)?)?
        }
        Some("history") => {
            let id = session_id_arg(&args)?;
            serde_json::to_string_pretty(&manager.session_history(id)?)?
        }
        Some(other) => {
            return Err(format!(
                "unknown command '{other}', expected one of: sessions, students, show <id>, history <id>"
            )
            .into());
        }
    };
    println!("{output}");
    Ok(())
}

fn session_id_arg(args: &[String]) -> Result<i64, Box<dyn std::error::Error>> {
    let raw = args.get(1).ok_or("missing session id")?;
    Ok(raw.parse()?)
}
