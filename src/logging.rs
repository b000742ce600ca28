//! Logger setup for the binary
//!
//! The library only uses the `log` facade; this installs `env_logger` as the
//! backend once at startup. `RUST_LOG` takes precedence over the flags.

use env_logger::{Builder, Env};
use log::LevelFilter;

/// Level implied by `-v` / `-q` counts
pub fn level_for(verbosity: u8, quiet: bool) -> LevelFilter {
    if quiet {
        return LevelFilter::Warn;
    }
    match verbosity {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

pub fn init_logger(verbosity: u8, quiet: bool) {
    let default_filter = level_for(verbosity, quiet).to_string().to_lowercase();
    let mut builder = Builder::from_env(Env::default().default_filter_or(default_filter));
    builder.format_timestamp_millis();
    // A second init (e.g. from tests) keeps the first logger
    let _ = builder.try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_for_flags() {
        assert_eq!(level_for(0, false), LevelFilter::Info);
        assert_eq!(level_for(1, false), LevelFilter::Debug);
        assert_eq!(level_for(3, false), LevelFilter::Trace);
        assert_eq!(level_for(2, true), LevelFilter::Warn);
    }
}
