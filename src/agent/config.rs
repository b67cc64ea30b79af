// Agent configuration

use super::AgentConfig;
use tracing::warn;

/// Parse an environment variable, logging a warning if the value is present but invalid.
fn parse_env_var<T: std::str::FromStr>(name: &str, default: T) -> T {
    match std::env::var(name) {
        Ok(v) => match v.parse() {
            Ok(parsed) => parsed,
            Err(_) => {
                warn!(var = name, value = %v, "Invalid env var value, using default");
                default
            }
        },
        Err(_) => default,
    }
}

impl AgentConfig {
    /// Load from environment variables
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let mut config = AgentConfig::default();

        config.max_iterations = parse_env_var("PILOT_MAX_ITERATIONS", config.max_iterations);
        config.timeout_pause_secs =
            parse_env_var("PILOT_TIMEOUT_PAUSE_SECS", config.timeout_pause_secs);
        config.system_prompt = std::env::var("PILOT_SYSTEM_PROMPT")
            .ok()
            .filter(|s| !s.trim().is_empty());

        config
    }
}
