use std::{env, io::Write};

use farmstand_common::{parse_boolean_flag, Secret};
use farmstand_engine::{DEFAULT_CHECKOUT_ATTEMPTS, DEFAULT_DATABASE_URL};
use log::*;
use rand::{distributions::Alphanumeric, thread_rng, Rng};
use serde_json::json;
use tempfile::NamedTempFile;

use crate::errors::ServerError;

const DEFAULT_FSM_HOST: &str = "127.0.0.1";
const DEFAULT_FSM_PORT: u16 = 8370;
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 25;
const MIN_JWT_SECRET_LENGTH: usize = 16;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub db_max_connections: u32,
    pub auth: AuthConfig,
    /// When true, order status may only move forward: pending → confirmed → delivered, with cancellation allowed
    /// from pending and confirmed. When false, any status may replace any other.
    pub strict_status_transitions: bool,
    /// The total number of times a checkout is attempted when the store reports a transient conflict.
    pub checkout_attempts: u32,
    /// Run the embedded database migrations at startup.
    pub auto_migrate: bool,
    /// Browser origins allowed to call the API. Empty, or containing `*`, allows any origin.
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_FSM_HOST.to_string(),
            port: DEFAULT_FSM_PORT,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            db_max_connections: DEFAULT_DB_MAX_CONNECTIONS,
            auth: AuthConfig::default(),
            strict_status_transitions: false,
            checkout_attempts: DEFAULT_CHECKOUT_ATTEMPTS,
            auto_migrate: true,
            cors_origins: Vec::new(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("FSM_HOST").ok().unwrap_or_else(|| DEFAULT_FSM_HOST.into());
        let port = env::var("FSM_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for FSM_PORT. {e} Using the default, {DEFAULT_FSM_PORT}, instead."
                    );
                    DEFAULT_FSM_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_FSM_PORT);
        let database_url = database_url_or_default(env::var("FSM_DATABASE_URL").ok());
        let db_max_connections = parse_number("FSM_DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS);
        let auth = AuthConfig::try_from_env().unwrap_or_else(|e| {
            warn!(
                "🪛️ Could not load the authentication configuration from environment variables. {e}. Reverting to the \
                 default configuration."
            );
            AuthConfig::default()
        });
        let strict_status_transitions = parse_boolean_flag(env::var("FSM_STRICT_STATUS_TRANSITIONS").ok(), false);
        let checkout_attempts = parse_number("FSM_CHECKOUT_ATTEMPTS", DEFAULT_CHECKOUT_ATTEMPTS).max(1);
        let auto_migrate = parse_boolean_flag(env::var("FSM_AUTO_MIGRATE").ok(), true);
        let cors_origins = parse_origins(env::var("FSM_CORS_ORIGINS").ok());
        if cors_origins.is_empty() {
            info!("🪛️ FSM_CORS_ORIGINS is not set. Browsers on any origin may call the API.");
        }
        Self {
            host,
            port,
            database_url,
            db_max_connections,
            auth,
            strict_status_transitions,
            checkout_attempts,
            auto_migrate,
            cors_origins,
        }
    }
}

/// Splits a comma-separated origin list, dropping blanks and any trailing slashes.
fn parse_origins(value: Option<String>) -> Vec<String> {
    value
        .unwrap_or_default()
        .split(',')
        .map(|s| s.trim().trim_end_matches('/').to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn database_url_or_default(url: Option<String>) -> String {
    match url {
        Some(url) if !url.trim().is_empty() => url,
        _ => {
            warn!("🪛️ FSM_DATABASE_URL is not set. Using the default database at {DEFAULT_DATABASE_URL}.");
            DEFAULT_DATABASE_URL.to_string()
        },
    }
}

fn parse_number(var: &str, default: u32) -> u32 {
    env::var(var)
        .map_err(|_| info!("🪛️ {var} is not set. Using the default value of {default}."))
        .and_then(|s| {
            s.parse::<u32>().map_err(|e| warn!("🪛️ Invalid configuration value for {var}. {e}. Using {default}."))
        })
        .ok()
        .unwrap_or(default)
}

//-------------------------------------------------  AuthConfig  -------------------------------------------------------
#[derive(Clone, Debug)]
pub struct AuthConfig {
    /// The shared HS256 secret that the authentication service signs access tokens with.
    pub jwt_secret: Secret<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        let mut tmpfile = NamedTempFile::new().ok().and_then(|f| f.keep().ok());
        warn!(
            "🚨️🚨️🚨️ The JWT secret has not been set. I'm using a random value for this session. No token issued by \
             your authentication service will be accepted. 🚨️🚨️🚨️"
        );
        let secret = thread_rng().sample_iter(&Alphanumeric).take(48).map(char::from).collect::<String>();
        match &mut tmpfile {
            Some((f, p)) => {
                let key_data = json!({ "jwt_secret": secret }).to_string();
                match writeln!(f, "{key_data}") {
                    Ok(()) => warn!(
                        "🚨️🚨️🚨️ The JWT secret for this session was written to {}. If this is a production instance, \
                         you are doing it wrong! Set the FSM_JWT_SECRET environment variable instead. 🚨️🚨️🚨️",
                        p.to_str().unwrap_or("???")
                    ),
                    Err(e) => warn!("🪛️ Could not write the JWT secret to the temporary file. {e}"),
                }
            },
            None => {
                warn!("🪛️ Could not create a temporary file to store the JWT secret. ");
            },
        }
        Self { jwt_secret: Secret::new(secret) }
    }
}

impl AuthConfig {
    pub fn new<S: Into<String>>(secret: S) -> Self {
        Self { jwt_secret: Secret::new(secret.into()) }
    }

    pub fn try_from_env() -> Result<Self, ServerError> {
        let secret =
            env::var("FSM_JWT_SECRET").map_err(|e| ServerError::ConfigurationError(format!("{e} [FSM_JWT_SECRET]")))?;
        if secret.len() < MIN_JWT_SECRET_LENGTH {
            return Err(ServerError::ConfigurationError(format!(
                "FSM_JWT_SECRET must be at least {MIN_JWT_SECRET_LENGTH} characters long"
            )));
        }
        Ok(Self::new(secret))
    }
}

//-------------------------------------------------  ServerOptions  ----------------------------------------------------
/// A subset of the server configuration that is used to configure the server's behaviour. Generally we try to keep this
/// as small as possible, and exclude secrets to avoid passing sensitive information around the system.
#[derive(Clone, Copy, Debug)]
pub struct ServerOptions {
    pub strict_status_transitions: bool,
    pub checkout_attempts: u32,
}

impl ServerOptions {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            strict_status_transitions: config.strict_status_transitions,
            checkout_attempts: config.checkout_attempts,
        }
    }
}
