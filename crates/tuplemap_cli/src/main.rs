//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `tuplemap_core` linkage with a deterministic sample read.
//! - Optionally enable file logging from `TUPLEMAP_LOG_LEVEL` / `TUPLEMAP_LOG_DIR`.

use log::warn;
use std::process::ExitCode;
use tuplemap_core::{
    default_log_level, init_logging, tuple, Header, MappedRelation, MemoryRelation, ObjectMapper,
    RelationError,
};

fn main() -> ExitCode {
    println!("tuplemap_core ping={}", tuplemap_core::ping());
    println!("tuplemap_core version={}", tuplemap_core::core_version());

    if let Ok(log_dir) = std::env::var("TUPLEMAP_LOG_DIR") {
        let level = std::env::var("TUPLEMAP_LOG_LEVEL")
            .unwrap_or_else(|_| default_log_level().to_string());
        if let Err(err) = init_logging(&level, &log_dir) {
            eprintln!("tuplemap_cli logging disabled: {err}");
        }
    }

    match print_sample() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            warn!("event=cli_sample module=cli status=error error={err}");
            eprintln!("tuplemap_cli sample failed: {err}");
            ExitCode::FAILURE
        }
    }
}

fn print_sample() -> Result<(), RelationError> {
    let header = Header::scalars(["id", "name"])?;
    let relation = MemoryRelation::new(
        header.clone(),
        vec![tuple![2, "Jane"], tuple![1, "John"], tuple![3, "Piotr"]],
    )?;
    let users = MappedRelation::new(relation, ObjectMapper::new("user", &header));

    users.sort()?.each(|user| println!("{}", user.to_json()))?;
    Ok(())
}
