use std::env;

use dh_common::helpers::parse_boolean_flag;
use log::*;

pub const DEFAULT_MAX_JSON_DEPTH: usize = 10;
pub const DEFAULT_PIPELINE_WORKERS: usize = 2;
pub const DEFAULT_JOB_MAX_ATTEMPTS: i64 = 8;
pub const DEFAULT_JOB_RETRY_BASE_SECS: i64 = 5;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// Trust the X-Forwarded-For header when extracting the client IP.
    pub use_x_forwarded_for: bool,
    /// Trust the Forwarded header when extracting the client IP.
    pub use_forwarded: bool,
    /// Signature checks may only be skipped outside of production, and only on explicit request.
    pub skip_signature_checks: bool,
    pub max_json_depth: usize,
    pub pipeline_workers: usize,
    pub job_max_attempts: i64,
    pub job_retry_base_secs: i64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 4444,
            database_url: String::default(),
            use_x_forwarded_for: false,
            use_forwarded: false,
            skip_signature_checks: false,
            max_json_depth: DEFAULT_MAX_JSON_DEPTH,
            pipeline_workers: DEFAULT_PIPELINE_WORKERS,
            job_max_attempts: DEFAULT_JOB_MAX_ATTEMPTS,
            job_retry_base_secs: DEFAULT_JOB_RETRY_BASE_SECS,
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.into(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("DH_HOST").ok().unwrap_or_else(|| {
            error!("🪛️ DH_HOST is not set. Using 127.0.0.1.");
            "127.0.0.1".into()
        });
        let port = env::var("DH_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!("🪛️ {s} is not a valid port for DH_PORT. {e} Using 4444.");
                    4444
                })
            })
            .unwrap_or_else(|_| {
                error!("🪛️ DH_PORT is not set. Using 4444.");
                4444
            });
        let database_url = env::var("DH_DATABASE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ DH_DATABASE_URL is not set. Is a database configured?");
            String::default()
        });
        let use_x_forwarded_for = env_bool("DH_USE_X_FORWARDED_FOR");
        let use_forwarded = env_bool("DH_USE_FORWARDED");
        let skip_signature_checks = configure_signature_bypass();
        let max_json_depth = env_parsed("DH_MAX_JSON_DEPTH", DEFAULT_MAX_JSON_DEPTH);
        let pipeline_workers = env_parsed("DH_PIPELINE_WORKERS", DEFAULT_PIPELINE_WORKERS);
        let job_max_attempts = env_parsed("DH_JOB_MAX_ATTEMPTS", DEFAULT_JOB_MAX_ATTEMPTS);
        let job_retry_base_secs = env_parsed("DH_JOB_RETRY_BASE_SECS", DEFAULT_JOB_RETRY_BASE_SECS);
        Self {
            host,
            port,
            database_url,
            use_x_forwarded_for,
            use_forwarded,
            skip_signature_checks,
            max_json_depth,
            pipeline_workers,
            job_max_attempts,
            job_retry_base_secs,
        }
    }
}

/// The bypass is fail-closed. It requires DH_DEV_SKIP_SIGNATURES=1 AND an environment that is
/// explicitly not production. A missing DH_ENVIRONMENT counts as production.
fn configure_signature_bypass() -> bool {
    let requested = parse_boolean_flag(env::var("DH_DEV_SKIP_SIGNATURES").ok(), false);
    if !requested {
        return false;
    }
    let environment = env::var("DH_ENVIRONMENT").unwrap_or_else(|_| "production".into());
    if environment.trim().eq_ignore_ascii_case("production") {
        warn!("🪛️ DH_DEV_SKIP_SIGNATURES is set but DH_ENVIRONMENT is production. Ignoring it.");
        return false;
    }
    warn!("🪛️ Webhook signature checks are DISABLED ({environment} environment).");
    true
}

fn env_bool(var: &str) -> bool {
    parse_boolean_flag(env::var(var).ok(), false)
}

fn env_parsed<T: std::str::FromStr + std::fmt::Display + Copy>(var: &str, default: T) -> T
where T::Err: std::fmt::Display {
    match env::var(var) {
        Ok(s) => s.parse::<T>().unwrap_or_else(|e| {
            error!("🪛️ {s} is not a valid value for {var}. {e} Using {default}.");
            default
        }),
        Err(_) => default,
    }
}
