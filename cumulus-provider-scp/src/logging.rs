//! Logger setup for hosts embedding the provider
//!
//! The library only emits through the `log` facade; a host that wants output
//! calls `init` once at startup.

use env_logger::{Builder, Env};

/// Environment variable holding the filter, e.g. `CUMULUS_LOG=cumulus_provider_scp=debug`
pub const LOG_ENV: &str = "CUMULUS_LOG";

const DEFAULT_FILTER: &str = "info";

fn builder() -> Builder {
    Builder::from_env(Env::new().filter_or(LOG_ENV, DEFAULT_FILTER))
}

/// Install the logger. Panics if another logger is already installed.
pub fn init() {
    builder().init();
}

/// Install the logger unless one is already installed
pub fn try_init() -> Result<(), log::SetLoggerError> {
    builder().try_init()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn try_init_twice_fails_gracefully() {
        let _ = try_init();
        assert!(try_init().is_err());
    }
}
