//! obs-replay - OBS Studio replay buffer controller
//!
//! This library exposes the controller facade and the pieces it is built
//! from: process and connection guards, the obs-websocket client, replay
//! buffer control, recording retention, OBS bootstrap and the daemon loop.

pub mod bootstrap;
pub mod cli;
pub mod config;
pub mod connection;
pub mod constants;
pub mod controller;
pub mod daemon;
pub mod error;
pub mod logging;
pub mod models;
pub mod output;
pub mod process;
pub mod replay;
pub mod retention;
pub mod websocket;

pub use config::ControllerConfig;
pub use controller::ObsController;
pub use error::ControllerError;
