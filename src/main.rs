#![forbid(unsafe_code)]

use anyhow::{bail, Context, Result};
use log::warn;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use obs_replay::cli::{self, CliArgs, CliCommand};
use obs_replay::daemon::{self, DaemonOptions};
use obs_replay::output::{self, StatusReport};
use obs_replay::{logging, ControllerConfig, ObsController};

fn main() -> Result<()> {
    let args = cli::parse_args()?;
    logging::init_logger(args.verbosity, args.quiet);

    let config = ControllerConfig::load_or_default(args.config_path.as_deref())
        .context("Failed to load configuration")?;
    let mut controller = ObsController::new(config)?;

    match args.command {
        CliCommand::Status => status(&mut controller, &args),
        CliCommand::Setup => setup(&controller),
        CliCommand::Launch => {
            controller.launch_obs()?;
            // `launch` hands OBS over to the user
            controller.release_obs();
            println!("OBS is running.");
            Ok(())
        }
        CliCommand::Start => {
            connect(&mut controller)?;
            if !controller.start_replay_buffer()? {
                bail!("Replay buffer did not start");
            }
            println!("Replay buffer is active.");
            Ok(())
        }
        CliCommand::Stop => {
            connect(&mut controller)?;
            if !controller.stop_replay_buffer()? {
                bail!("Replay buffer did not stop");
            }
            println!("Replay buffer is stopped.");
            Ok(())
        }
        CliCommand::Save => {
            connect(&mut controller)?;
            if !controller.save_replay()? {
                bail!("Replay was not saved");
            }
            let latest = controller.get_latest_video();
            print!("{}", output::format_latest_human(&latest));
            Ok(())
        }
        CliCommand::Latest => {
            let latest = controller.get_latest_video();
            if args.json {
                println!("{}", output::format_latest_json(&latest)?);
            } else {
                print!("{}", output::format_latest_human(&latest));
            }
            Ok(())
        }
        CliCommand::Prune => {
            let report = controller.check_and_manage_folder_size();
            let max = controller.retention().config().max_total_bytes();
            if args.json {
                let current = controller.retention().total_size();
                println!("{}", output::format_prune_json(report.as_ref(), current)?);
            } else {
                print!("{}", output::format_prune_human(report.as_ref(), max));
            }
            Ok(())
        }
        CliCommand::Version => {
            connect(&mut controller)?;
            match controller.get_obs_version()? {
                Some(version) => {
                    println!("OBS Studio {}", version.obs_version);
                    println!("obs-websocket {}", version.obs_web_socket_version);
                    Ok(())
                }
                None => bail!("OBS did not report its version"),
            }
        }
        CliCommand::Run => run_daemon(&mut controller, &args),
    }
}

fn connect(controller: &mut ObsController) -> Result<()> {
    if !controller.connect()? {
        let settings = &controller.config().connection;
        bail!(
            "Could not connect to OBS WebSocket at {}:{}",
            settings.host,
            settings.port
        );
    }
    Ok(())
}

fn status(controller: &mut ObsController, args: &CliArgs) -> Result<()> {
    let state = controller.state()?;
    if state.process_running {
        if let Err(err) = controller.connect() {
            warn!("Could not connect for status: {}", err);
        }
    }

    let mut report = StatusReport::new(
        controller.state()?,
        controller.is_obs_installed(),
        controller.config().replay.output_dir.display().to_string(),
    );
    if controller.is_connected() {
        report.version = controller.get_obs_version()?;
        report.replay_buffer = controller.replay_buffer_status()?;
    }
    report.folder_bytes = controller.retention().total_size();
    report.max_folder_bytes = controller.retention().config().max_total_bytes();

    if args.json {
        println!("{}", output::format_status_json(&report)?);
    } else {
        print!("{}", output::format_status_human(&report));
    }
    Ok(())
}

fn setup(controller: &ObsController) -> Result<()> {
    if !controller.enable_websocket()? {
        bail!(
            "OBS settings not found at {}; start OBS once, then rerun setup",
            controller.paths().global_ini.display()
        );
    }
    controller
        .set_default_profile()
        .context("Failed to write the OBS profile")?;
    println!("OBS WebSocket enabled and profile written.");
    Ok(())
}

fn run_daemon(controller: &mut ObsController, args: &CliArgs) -> Result<()> {
    let interrupted = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(signal_hook::consts::SIGINT, interrupted.clone())
        .context("Failed to install SIGINT handler")?;
    signal_hook::flag::register(signal_hook::consts::SIGTERM, interrupted.clone())
        .context("Failed to install SIGTERM handler")?;

    let mut options = DaemonOptions::from_config(controller.config());
    options.max_ticks = args.max_ticks;
    options.config_path = args.config_path.clone();

    let ticks = daemon::run(controller, &options, &interrupted)?;
    println!("Stopped after {} check(s).", ticks);
    Ok(())
}
