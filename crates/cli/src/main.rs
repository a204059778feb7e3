//! Linkage CLI.
//!
//! Two modes:
//! - **Shell mode**: `linkage [flags] identify --email E --phone P` resolves
//!   one sighting against a fresh in-memory store and exits
//! - **Pipe mode**: `linkage [flags] < requests.jsonl` resolves one JSON
//!   request per stdin line against a single session store
//!
//! Logs go to stderr, filtered by `RUST_LOG` or the config's `log_filter`.

mod commands;
mod format;
mod pipe;

use std::io;
use std::path::{Path, PathBuf};
use std::process;

use linkage_core::{IdentifyRequest, LinkageError};
use linkage_engine::{Database, IdentityService, LinkageConfig, CONFIG_FILE_NAME};
use tracing_subscriber::EnvFilter;

use commands::build_cli;
use format::{format_error, format_response, OutputMode};

fn main() {
    let matches = build_cli().get_matches();

    let mode = if matches.get_flag("compact") {
        OutputMode::Compact
    } else {
        OutputMode::Pretty
    };

    if let Some(("init", sub)) = matches.subcommand() {
        let path = sub
            .get_one::<String>("path")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME));
        process::exit(run_init(&path, mode));
    }

    let config = match load_config(matches.get_one::<String>("config").map(Path::new)) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", format_error(&e, mode));
            process::exit(1);
        }
    };
    init_tracing(&config);

    let service = match Database::open(config) {
        Ok(db) => IdentityService::new(db),
        Err(e) => {
            eprintln!("{}", format_error(&e, mode));
            process::exit(1);
        }
    };

    let exit_code = match matches.subcommand() {
        Some(("identify", sub)) => {
            let request = IdentifyRequest::new(
                sub.get_one::<String>("email").map(String::as_str),
                sub.get_one::<String>("phone").map(String::as_str),
            );
            run_identify(&service, &request, mode)
        }
        _ => {
            let stdin = io::stdin();
            let mut stdout = io::stdout().lock();
            pipe::run_pipe(&service, stdin.lock(), &mut stdout, mode)
        }
    };

    service.database().shutdown();
    process::exit(exit_code);
}

/// Explicit `--config` must exist; otherwise `./linkage.toml` is used if present.
fn load_config(explicit: Option<&Path>) -> Result<LinkageConfig, LinkageError> {
    match explicit {
        Some(path) => LinkageConfig::from_file(path),
        None => {
            let default_path = Path::new(CONFIG_FILE_NAME);
            if default_path.exists() {
                LinkageConfig::from_file(default_path)
            } else {
                Ok(LinkageConfig::default())
            }
        }
    }
}

fn init_tracing(config: &LinkageConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_filter))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run_identify(service: &IdentityService, request: &IdentifyRequest, mode: OutputMode) -> i32 {
    match service.identify(request) {
        Ok(response) => {
            println!("{}", format_response(&response, mode));
            0
        }
        Err(e) => {
            eprintln!("{}", format_error(&e, mode));
            1
        }
    }
}

fn run_init(path: &Path, mode: OutputMode) -> i32 {
    match LinkageConfig::write_default_if_missing(path) {
        Ok(()) => {
            println!("{}", path.display());
            0
        }
        Err(e) => {
            eprintln!("{}", format_error(&e, mode));
            1
        }
    }
}
