//! Environment configuration for the CLI
//!
//! | Variable | Effect |
//! |---|---|
//! | `BLOOM_TWEAK` | default seed tweak for `create` |
//! | `BLOOM_HASH_STRATEGY` | default strategy for `create` (`double` / `seeded`) |
//! | `BLOOM_LOG` | tracing filter directives, default `warn` |
//!
//! Invalid values are warned about and ignored.

use bloom_filters::{BloomConfig, HashStrategy};
use tracing::{info, warn};

pub const TWEAK_VAR: &str = "BLOOM_TWEAK";
pub const STRATEGY_VAR: &str = "BLOOM_HASH_STRATEGY";
pub const LOG_VAR: &str = "BLOOM_LOG";

/// Load defaults for new filters from the process environment
pub fn load_config() -> BloomConfig {
    load_config_from(|name| std::env::var(name).ok())
}

/// Same as [`load_config`], reading variables through `lookup`
pub fn load_config_from(lookup: impl Fn(&str) -> Option<String>) -> BloomConfig {
    let mut config = BloomConfig::default();

    if let Some(raw) = lookup(TWEAK_VAR) {
        match raw.trim().parse::<u32>() {
            Ok(tweak) => {
                config.tweak = tweak;
                info!("[bloom] Loaded seed tweak {} from {}", tweak, TWEAK_VAR);
            }
            Err(_) => warn!(
                "[bloom] {} must be an unsigned 32-bit integer, got {:?}",
                TWEAK_VAR, raw
            ),
        }
    }

    if let Some(raw) = lookup(STRATEGY_VAR) {
        match raw.trim().parse::<HashStrategy>() {
            Ok(strategy) => {
                config.strategy = strategy;
                info!("[bloom] Loaded hash strategy {} from {}", strategy, STRATEGY_VAR);
            }
            Err(e) => warn!("[bloom] Ignoring {}: {}", STRATEGY_VAR, e),
        }
    }

    config
}
