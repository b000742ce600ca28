//! OBS bootstrap
//!
//! Prepares a local OBS installation for remote control:
//! - Detects the installed executable
//! - Turns on the obs-websocket server in `global.ini`
//! - Writes the controller's recording profile
//! - Launches and terminates the OBS process

pub mod ini;
pub mod launcher;

use log::{error, info};
use std::fs;
use std::path::Path;

use crate::error::ControllerError;
use crate::models::ConnectionSettings;
use self::ini::IniDocument;
pub use launcher::Launcher;

/// Profile template written by `set_default_profile`
const PROFILE_TEMPLATE: &str = include_str!("../../assets/profiles/basic.ini");

const WEBSOCKET_SECTION: &str = "OBSWebSocket";
const PROFILE_FILE: &str = "basic.ini";

pub fn is_obs_installed(executable: &Path) -> bool {
    let installed = executable.is_file();
    if !installed {
        info!("OBS executable not found at {}", executable.display());
    }
    installed
}

/// Enable the websocket server with the configured port and password.
/// Returns `false` when OBS has never written its `global.ini`.
pub fn enable_websocket(
    global_ini: &Path,
    settings: &ConnectionSettings,
) -> Result<bool, ControllerError> {
    if !global_ini.is_file() {
        error!(
            "OBS global settings not found at {}; start OBS once to create them",
            global_ini.display()
        );
        return Ok(false);
    }

    let mut doc = read_ini(global_ini)?;
    doc.set(WEBSOCKET_SECTION, "ServerEnabled", "true");
    doc.set(WEBSOCKET_SECTION, "ServerPort", &settings.port.to_string());
    match settings.password.as_deref() {
        Some(password) => {
            doc.set(WEBSOCKET_SECTION, "AuthRequired", "true");
            doc.set(WEBSOCKET_SECTION, "ServerPassword", password);
        }
        None => doc.set(WEBSOCKET_SECTION, "AuthRequired", "false"),
    }

    fs::write(global_ini, doc.render()).map_err(|err| ControllerError::io(global_ini, err))?;
    info!("Enabled OBS WebSocket server on port {}", settings.port);
    Ok(true)
}

/// Replace `<profiles_dir>/<profile>` with the bundled profile recording
/// into `output_dir`
pub fn set_default_profile(
    profiles_dir: &Path,
    profile: &str,
    output_dir: &Path,
) -> Result<(), ControllerError> {
    let mut doc = IniDocument::parse(PROFILE_TEMPLATE).map_err(|message| {
        ControllerError::MalformedIni {
            path: Path::new(PROFILE_FILE).to_path_buf(),
            message,
        }
    })?;

    // OBS accepts forward slashes on every platform
    let output = output_dir.to_string_lossy().replace('\\', "/");
    doc.set("General", "Name", profile);
    doc.set("SimpleOutput", "FilePath", &output);
    doc.set("AdvOut", "RecFilePath", &output);
    doc.set("AdvOut", "FFFilePath", &output);

    let destination = profiles_dir.join(profile);
    if destination.exists() {
        fs::remove_dir_all(&destination).map_err(|err| ControllerError::io(&destination, err))?;
        info!("Existing profile directory at {} has been removed.", destination.display());
    }
    fs::create_dir_all(&destination).map_err(|err| ControllerError::io(&destination, err))?;

    let target = destination.join(PROFILE_FILE);
    fs::write(&target, doc.render()).map_err(|err| ControllerError::io(&target, err))?;
    info!("Wrote OBS profile '{}' to {}", profile, destination.display());
    Ok(())
}

fn read_ini(path: &Path) -> Result<IniDocument, ControllerError> {
    let content = fs::read_to_string(path).map_err(|err| ControllerError::io(path, err))?;
    IniDocument::parse(&content).map_err(|message| ControllerError::MalformedIni {
        path: path.to_path_buf(),
        message,
    })
}
