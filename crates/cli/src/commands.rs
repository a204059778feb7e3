//! Clap command tree definition.

use clap::{Arg, ArgAction, Command};

/// Build the complete CLI command tree.
pub fn build_cli() -> Command {
    Command::new("linkage")
        .about("Resolve contact sightings into unified identities")
        .subcommand_required(false)
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("PATH")
                .help("Config file (default: ./linkage.toml if present)")
                .global(true),
        )
        .arg(
            Arg::new("compact")
                .long("compact")
                .help("Single-line JSON output")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .subcommand(build_identify())
        .subcommand(build_init())
}

fn build_identify() -> Command {
    Command::new("identify")
        .about("Resolve one sighting against an empty in-memory store")
        .arg(
            Arg::new("email")
                .long("email")
                .value_name("EMAIL")
                .help("Email address"),
        )
        .arg(
            Arg::new("phone")
                .long("phone")
                .value_name("PHONE")
                .help("Phone number"),
        )
}

fn build_init() -> Command {
    Command::new("init")
        .about("Write a commented default config file if none exists")
        .arg(
            Arg::new("path")
                .value_name("PATH")
                .help("Where to write (default: ./linkage.toml)"),
        )
}
