//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `minutebook_core` linkage.
//! - Optionally open a meeting database and print its newest records.
//!
//! Database path: first argument, else `MINUTEBOOK_DB`.
//! File logging is enabled when `MINUTEBOOK_LOG_DIR` is set.

use minutebook_core::{
    close_db, core_version, default_log_level, init_logging, open_db, ping, MeetingService,
    SqliteMeetingRepository,
};
use std::env;
use std::error::Error;
use std::process::ExitCode;

const RECENT_LIMIT: u32 = 5;

fn main() -> ExitCode {
    println!("minutebook_core ping={}", ping());
    println!("minutebook_core version={}", core_version());

    if let Ok(log_dir) = env::var("MINUTEBOOK_LOG_DIR") {
        let level = env::var("MINUTEBOOK_LOG_LEVEL")
            .unwrap_or_else(|_| default_log_level().to_string());
        if let Err(err) = init_logging(&level, &log_dir) {
            eprintln!("logging disabled: {err}");
        }
    }

    let Some(path) = env::args().nth(1).or_else(|| env::var("MINUTEBOOK_DB").ok()) else {
        return ExitCode::SUCCESS;
    };

    match print_recent(&path) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn print_recent(path: &str) -> Result<(), Box<dyn Error>> {
    let mut conn = open_db(path)?;
    {
        let service = MeetingService::new(SqliteMeetingRepository::try_new(&mut conn)?);
        println!("meetings count={}", service.count()?);
        for meeting in service.list_all(Some(RECENT_LIMIT), 0)? {
            println!(
                "meeting id={} created_at={} key_points={} action_items={} decisions={} title={}",
                meeting.id,
                meeting.created_at,
                meeting.key_points.len(),
                meeting.action_items.len(),
                meeting.decisions.len(),
                meeting.title
            );
        }
    }
    close_db(conn)?;
    Ok(())
}
