use crate::app_config::AppConfig;
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a configured value cannot be parsed.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files — useful for testing
/// or when the caller manages env setup.
///
/// # Errors
///
/// Returns `ConfigError` if a configured value cannot be parsed.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// This is the core parsing/validation logic, decoupled from the actual environment
/// so it can be tested with a pure `HashMap` lookup — no `set_var`/`remove_var` needed.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<usize>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let log_level = or_default("MGEN_LOG_LEVEL", "info");
    let portal_base_url = or_default("MGEN_PORTAL_BASE_URL", "https://www.mgen.fr");
    let member_api_base_url = or_default(
        "MGEN_MEMBER_API_BASE_URL",
        "https://api-adherent.mgen.fr/api",
    );
    let user_agent = or_default("MGEN_USER_AGENT", "mgen-agent/0.1 (member-data-extraction)");

    let request_timeout_secs = parse_u64("MGEN_REQUEST_TIMEOUT_SECS", "30")?;
    let poll_interval_ms = parse_u64("MGEN_POLL_INTERVAL_MS", "100")?;
    let wait_timeout_ms = parse_u64("MGEN_WAIT_TIMEOUT_MS", "10000")?;
    let auto_login_token_timeout_ms = parse_u64("MGEN_AUTO_LOGIN_TOKEN_TIMEOUT_MS", "30000")?;
    let interactive_login_timeout_ms = parse_u64("MGEN_INTERACTIVE_LOGIN_TIMEOUT_MS", "300000")?;

    let page_size_cap = parse_usize("MGEN_PAGE_SIZE_CAP", "20")?;
    let window_step_months = parse_u32("MGEN_WINDOW_STEP_MONTHS", "6")?;
    let empty_window_threshold = parse_u32("MGEN_EMPTY_WINDOW_THRESHOLD", "3")?;

    Ok(AppConfig {
        log_level,
        portal_base_url,
        member_api_base_url,
        user_agent,
        request_timeout_secs,
        poll_interval_ms,
        wait_timeout_ms,
        auto_login_token_timeout_ms,
        interactive_login_timeout_ms,
        page_size_cap,
        window_step_months,
        empty_window_threshold,
    })
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
