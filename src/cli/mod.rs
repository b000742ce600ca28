//! CLI argument parsing module
//!
//! Handles the command-line interface using clap, including:
//! - Configuration file selection
//! - Subcommand selection
//! - Output format selection (human/JSON)
//! - Verbosity and quiet modes

use anyhow::{anyhow, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};
use std::ffi::OsString;
use std::path::PathBuf;

/// Subcommands understood by the binary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliCommand {
    Status,
    Setup,
    Launch,
    Start,
    Stop,
    Save,
    Latest,
    Prune,
    Version,
    Run,
}

/// Parsed command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliArgs {
    pub config_path: Option<PathBuf>,
    pub verbosity: u8,
    pub quiet: bool,
    pub json: bool,
    pub command: CliCommand,
    /// `run` only: stop after this many ticks
    pub max_ticks: Option<u64>,
}

/// Version reported by `--version`
pub const VERSION: &str = concat!(env!("OBS_REPLAY_VERSION"), " (", env!("GIT_HASH"), ")");

fn build_command() -> Command {
    Command::new("obs-replay")
        .version(VERSION)
        .about("Control the OBS Studio replay buffer and bound the recordings folder")
        .long_about(
            "Drives a local OBS Studio instance over obs-websocket: launches OBS, keeps \
             the replay buffer running, saves replays on demand and deletes the oldest \
             recordings once the output folder exceeds its size limit.",
        )
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("PATH")
                .help("Configuration file (defaults to the user config directory)")
                .value_parser(clap::value_parser!(PathBuf))
                .global(true),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Increase log verbosity (-v debug, -vv trace)")
                .action(ArgAction::Count)
                .global(true),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .help("Only log warnings and errors")
                .action(ArgAction::SetTrue)
                .conflicts_with("verbose")
                .global(true),
        )
        .arg(
            Arg::new("json")
                .short('j')
                .long("json")
                .help("Output in JSON format (status, latest, prune)")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .subcommand(Command::new("status").about("Show OBS, connection, replay buffer and folder state"))
        .subcommand(
            Command::new("setup")
                .about("Enable the OBS WebSocket server and write the controller profile"),
        )
        .subcommand(Command::new("launch").about("Start OBS with the controller profile"))
        .subcommand(Command::new("start").about("Start the replay buffer"))
        .subcommand(Command::new("stop").about("Stop the replay buffer"))
        .subcommand(Command::new("save").about("Save the replay buffer and wait for the file"))
        .subcommand(Command::new("latest").about("Show the newest recording"))
        .subcommand(
            Command::new("prune").about("Delete the oldest recordings until under the size limit"),
        )
        .subcommand(Command::new("version").about("Show OBS and obs-websocket versions"))
        .subcommand(
            Command::new("run")
                .about("Keep OBS running, the replay buffer active and the folder bounded")
                .arg(
                    Arg::new("ticks")
                        .long("ticks")
                        .value_name("N")
                        .help("Stop after N checks instead of running until interrupted")
                        .value_parser(clap::value_parser!(u64).range(1..)),
                ),
        )
}

/// Parse process arguments
pub fn parse_args() -> Result<CliArgs> {
    from_matches(&build_command().get_matches())
}

/// Parse an explicit argument list; clap errors are returned, not printed
pub fn parse_from<I, T>(args: I) -> Result<CliArgs>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let matches = build_command().try_get_matches_from(args)?;
    from_matches(&matches)
}

fn from_matches(matches: &ArgMatches) -> Result<CliArgs> {
    let (name, sub) = matches
        .subcommand()
        .ok_or_else(|| anyhow!("No command given"))?;

    let command = match name {
        "status" => CliCommand::Status,
        "setup" => CliCommand::Setup,
        "launch" => CliCommand::Launch,
        "start" => CliCommand::Start,
        "stop" => CliCommand::Stop,
        "save" => CliCommand::Save,
        "latest" => CliCommand::Latest,
        "prune" => CliCommand::Prune,
        "version" => CliCommand::Version,
        "run" => CliCommand::Run,
        other => return Err(anyhow!("Unknown command: {}", other)),
    };

    let max_ticks = if command == CliCommand::Run {
        sub.get_one::<u64>("ticks").copied()
    } else {
        None
    };

    Ok(CliArgs {
        config_path: matches.get_one::<PathBuf>("config").cloned(),
        verbosity: matches.get_count("verbose"),
        quiet: matches.get_flag("quiet"),
        json: matches.get_flag("json"),
        command,
        max_ticks,
    })
}
