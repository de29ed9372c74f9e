use serde::Deserialize;
use shared::jwt::{JwtConfig, JwtError};
use std::net::SocketAddr;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub security: SecurityConfig,
    /// JWT authentication configuration
    pub jwt: JwtAuthConfig,
    /// Passcode delivery configuration
    #[serde(default)]
    pub email: EmailConfig,
    #[serde(default)]
    pub attendance: AttendanceConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

impl From<&DatabaseConfig> for persistence::db::DatabaseConfig {
    fn from(config: &DatabaseConfig) -> Self {
        Self {
            url: config.url.clone(),
            max_connections: config.max_connections,
            min_connections: config.min_connections,
            connect_timeout_secs: config.connect_timeout_secs,
            idle_timeout_secs: config.idle_timeout_secs,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    #[serde(default)]
    pub cors_origins: Vec<String>,

    /// Passcode requests allowed per email per hour (0 disables the limit)
    #[serde(default = "default_otp_rate_limit")]
    pub otp_rate_limit_per_hour: u32,

    /// Shared key for the device change review routes (empty disables them)
    #[serde(default)]
    pub admin_api_key: String,
}

#[derive(Clone, Deserialize)]
pub struct JwtAuthConfig {
    /// HS256 signing secret, used when no RSA key pair is configured
    #[serde(default)]
    pub secret: String,

    /// RSA private key in PEM format for signing tokens
    #[serde(default)]
    pub private_key: String,

    /// RSA public key in PEM format for verifying tokens
    #[serde(default)]
    pub public_key: String,

    /// Access token expiration in seconds (default: 86400 = 24 hours)
    #[serde(default = "default_token_expiry")]
    pub token_expiry_secs: i64,

    /// Leeway in seconds for clock skew tolerance (default: 30)
    #[serde(default = "default_jwt_leeway")]
    pub leeway_secs: u64,
}

impl std::fmt::Debug for JwtAuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtAuthConfig")
            .field("secret", &"[REDACTED]")
            .field("private_key", &"[REDACTED]")
            .field("public_key", &self.public_key.len())
            .field("token_expiry_secs", &self.token_expiry_secs)
            .field("leeway_secs", &self.leeway_secs)
            .finish()
    }
}

impl JwtAuthConfig {
    fn uses_rsa(&self) -> bool {
        !self.private_key.is_empty() && !self.public_key.is_empty()
    }

    /// Builds the signing config. An RSA key pair takes precedence over the secret.
    pub fn build(&self) -> Result<JwtConfig, JwtError> {
        if self.uses_rsa() {
            JwtConfig::from_rsa_pem(
                &self.private_key,
                &self.public_key,
                self.token_expiry_secs,
                self.leeway_secs,
            )
        } else {
            JwtConfig::from_secret(&self.secret, self.token_expiry_secs, self.leeway_secs)
        }
    }
}

/// Passcode delivery configuration.
#[derive(Clone, Deserialize)]
pub struct EmailConfig {
    /// Whether passcodes are delivered by email; when false they are only logged
    #[serde(default)]
    pub enabled: bool,

    /// Email provider: sendgrid or console (for development)
    #[serde(default = "default_email_provider")]
    pub provider: String,

    /// SendGrid API key (for sendgrid provider)
    #[serde(default)]
    pub sendgrid_api_key: String,

    /// Sender email address (From header)
    #[serde(default = "default_sender_email")]
    pub sender_email: String,

    /// Sender name (From header)
    #[serde(default = "default_sender_name")]
    pub sender_name: String,

    /// Upper bound on a single dispatch
    #[serde(default = "default_email_timeout")]
    pub timeout_secs: u64,
}

impl std::fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailConfig")
            .field("enabled", &self.enabled)
            .field("provider", &self.provider)
            .field("sendgrid_api_key", &"[REDACTED]")
            .field("sender_email", &self.sender_email)
            .field("sender_name", &self.sender_name)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: default_email_provider(),
            sendgrid_api_key: String::new(),
            sender_email: default_sender_email(),
            sender_name: default_sender_name(),
            timeout_secs: default_email_timeout(),
        }
    }
}

/// Attendance rules.
#[derive(Debug, Clone, Deserialize)]
pub struct AttendanceConfig {
    /// Maximum distance between student and teacher, inclusive
    #[serde(default = "default_max_distance")]
    pub max_distance_meters: f64,

    /// Lifetime of a QR session
    #[serde(default = "default_session_validity")]
    pub session_validity_secs: i64,

    /// Lifetime of a one-time passcode
    #[serde(default = "default_otp_validity")]
    pub otp_validity_secs: i64,

    /// Interval of the expired passcode cleanup job (0 disables it)
    #[serde(default = "default_otp_cleanup_interval")]
    pub otp_cleanup_interval_secs: u64,
}

impl Default for AttendanceConfig {
    fn default() -> Self {
        Self {
            max_distance_meters: default_max_distance(),
            session_validity_secs: default_session_validity(),
            otp_validity_secs: default_otp_validity(),
            otp_cleanup_interval_secs: default_otp_cleanup_interval(),
        }
    }
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_request_timeout() -> u64 {
    15
}
fn default_max_connections() -> u32 {
    20
}
fn default_min_connections() -> u32 {
    2
}
fn default_connect_timeout() -> u64 {
    5
}
fn default_idle_timeout() -> u64 {
    600
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "json".to_string()
}
fn default_otp_rate_limit() -> u32 {
    5
}
fn default_token_expiry() -> i64 {
    shared::jwt::DEFAULT_TOKEN_EXPIRY_SECS
}
fn default_jwt_leeway() -> u64 {
    shared::jwt::DEFAULT_LEEWAY_SECS
}
fn default_email_provider() -> String {
    "console".to_string()
}
fn default_sender_email() -> String {
    "noreply@attendance.local".to_string()
}
fn default_sender_name() -> String {
    "Smart Attendance".to_string()
}
fn default_email_timeout() -> u64 {
    10
}
fn default_max_distance() -> f64 {
    domain::services::DEFAULT_MAX_DISTANCE_METERS
}
fn default_session_validity() -> i64 {
    domain::services::DEFAULT_SESSION_VALIDITY_SECS
}
fn default_otp_validity() -> i64 {
    600
}
fn default_otp_cleanup_interval() -> u64 {
    900
}

/// Configuration validation error
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Loading order (later sources override earlier):
    /// 1. config/default.toml - base configuration with defaults
    /// 2. config/local.toml - local overrides (optional, not in git)
    /// 3. Environment variables with ATT__ prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("ATT")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("security.cors_origins")
                    .try_parsing(true),
            )
            .build()?;

        let cfg: Self = config.try_deserialize()?;
        cfg.validate()
            .map_err(|e| config::ConfigError::Message(e.to_string()))?;
        Ok(cfg)
    }

    /// Load configuration for testing with custom overrides.
    ///
    /// Builds from embedded defaults so tests do not depend on config files.
    #[cfg(test)]
    pub fn load_for_test(overrides: &[(&str, &str)]) -> Result<Self, config::ConfigError> {
        let defaults = r#"
            [server]
            host = "0.0.0.0"
            port = 8080
            request_timeout_secs = 15

            [database]
            url = ""
            max_connections = 20
            min_connections = 2
            connect_timeout_secs = 5
            idle_timeout_secs = 600

            [logging]
            level = "info"
            format = "json"

            [security]
            cors_origins = []
            otp_rate_limit_per_hour = 5
            admin_api_key = ""

            [jwt]
            secret = ""
            token_expiry_secs = 86400
            leeway_secs = 30

            [email]
            enabled = false
            provider = "console"

            [attendance]
            max_distance_meters = 20.0
            session_validity_secs = 600
            otp_validity_secs = 600
        "#;

        let mut builder = config::Config::builder()
            .add_source(config::File::from_str(defaults, config::FileFormat::Toml));

        for (key, value) in overrides {
            builder = builder.set_override(*key, *value)?;
        }

        builder.build()?.try_deserialize()
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.database.url.is_empty() {
            return Err(ConfigValidationError::MissingRequired(
                "ATT__DATABASE__URL environment variable must be set".to_string(),
            ));
        }

        if self.server.port == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "Server port cannot be 0".to_string(),
            ));
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigValidationError::InvalidValue(
                "min_connections cannot exceed max_connections".to_string(),
            ));
        }

        if self.jwt.secret.is_empty() && !self.jwt.uses_rsa() {
            return Err(ConfigValidationError::MissingRequired(
                "ATT__JWT__SECRET or an RSA key pair must be set".to_string(),
            ));
        }

        if self.jwt.token_expiry_secs <= 0 {
            return Err(ConfigValidationError::InvalidValue(
                "token_expiry_secs must be positive".to_string(),
            ));
        }

        if !(self.attendance.max_distance_meters > 0.0) {
            return Err(ConfigValidationError::InvalidValue(
                "max_distance_meters must be positive".to_string(),
            ));
        }

        if self.attendance.session_validity_secs <= 0 || self.attendance.otp_validity_secs <= 0 {
            return Err(ConfigValidationError::InvalidValue(
                "session and passcode validity must be positive".to_string(),
            ));
        }

        if self.email.enabled
            && self.email.provider == "sendgrid"
            && self.email.sendgrid_api_key.is_empty()
        {
            return Err(ConfigValidationError::MissingRequired(
                "ATT__EMAIL__SENDGRID_API_KEY must be set for the sendgrid provider".to_string(),
            ));
        }

        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.server.host, self.server.port).parse()
    }
}
