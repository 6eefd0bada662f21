// Configuration module for codeact
// Reads from environment variables with sensible defaults

use std::env;
use std::str::FromStr;
use std::sync::OnceLock;

/// Global configuration instance
static CONFIG: OnceLock<Config> = OnceLock::new();

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Pass cap per document for diagnostic-driven cleanup rules (CODEACT_CLEANUP_MAX_PASSES)
    pub cleanup_max_passes: usize,

    /// Upper clamp for call graph traversal depth (CODEACT_CALL_GRAPH_MAX_DEPTH)
    pub call_graph_max_depth: usize,

    /// Largest line-diff matrix computed exactly when counting edits (CODEACT_DIFF_MAX_CELLS)
    pub diff_max_cells: usize,

    /// Operations slower than this are logged (CODEACT_SLOW_OP_MS)
    pub slow_op_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cleanup_max_passes: 3,
            call_graph_max_depth: 4,
            diff_max_cells: 4_000_000,
            slow_op_ms: 250,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Self {
        let mut config = Config::default();
        override_from_env(
            "CODEACT_CLEANUP_MAX_PASSES",
            &mut config.cleanup_max_passes,
        );
        override_from_env(
            "CODEACT_CALL_GRAPH_MAX_DEPTH",
            &mut config.call_graph_max_depth,
        );
        override_from_env("CODEACT_DIFF_MAX_CELLS", &mut config.diff_max_cells);
        override_from_env("CODEACT_SLOW_OP_MS", &mut config.slow_op_ms);

        if config.cleanup_max_passes == 0 {
            log::warn!("CODEACT_CLEANUP_MAX_PASSES must be at least 1, using 1");
            config.cleanup_max_passes = 1;
        }
        if config.call_graph_max_depth == 0 {
            log::warn!("CODEACT_CALL_GRAPH_MAX_DEPTH must be at least 1, using 1");
            config.call_graph_max_depth = 1;
        }
        config
    }

    /// Get the global configuration instance
    pub fn get() -> &'static Config {
        CONFIG.get_or_init(Config::from_env)
    }
}

fn override_from_env<T>(name: &str, slot: &mut T)
where
    T: FromStr + std::fmt::Display,
{
    let Ok(val) = env::var(name) else {
        return;
    };
    match val.trim().parse() {
        Ok(parsed) => *slot = parsed,
        Err(_) => log::warn!("Invalid {name} value: {val}, using default: {slot}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.cleanup_max_passes, 3);
        assert_eq!(config.call_graph_max_depth, 4);
        assert_eq!(config.diff_max_cells, 4_000_000);
        assert_eq!(config.slow_op_ms, 250);
    }
}
