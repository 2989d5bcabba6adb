use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OtpConfig {
    pub ttl_seconds: i64,
    pub max_attempts: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    /// When unset, outgoing mail is only logged.
    pub api_url: Option<String>,
    pub api_key: String,
    pub from: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MediaConfig {
    pub endpoint: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
    pub public_url: String,
    pub prefix: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamConfig {
    pub timeout_seconds: u64,
    pub max_attempts: u32,
}

impl UpstreamConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
    pub jwt: JwtConfig,
    pub otp: OtpConfig,
    pub mail: MailConfig,
    pub media: MediaConfig,
    pub upstream: UpstreamConfig,
}

fn var_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parsed_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

fn split_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET").context("JWT_SECRET is not set")?,
            issuer: var_or("JWT_ISSUER", "retreat-hub"),
            audience: var_or("JWT_AUDIENCE", "retreat-hub-users"),
            ttl_minutes: parsed_or("JWT_TTL_MINUTES", 60 * 24),
        };
        let otp = OtpConfig {
            ttl_seconds: parsed_or("OTP_TTL_SECONDS", 5 * 60),
            max_attempts: parsed_or("OTP_MAX_ATTEMPTS", 5),
        };
        let mail = MailConfig {
            api_url: std::env::var("MAIL_API_URL").ok().filter(|v| !v.is_empty()),
            api_key: var_or("MAIL_API_KEY", ""),
            from: var_or("MAIL_FROM", "Retreat Center <no-reply@retreat.local>"),
        };
        let media = MediaConfig {
            endpoint: var_or("MEDIA_ENDPOINT", "http://localhost:9000"),
            bucket: var_or("MEDIA_BUCKET", "retreat-media"),
            access_key: var_or("MEDIA_ACCESS_KEY", ""),
            secret_key: var_or("MEDIA_SECRET_KEY", ""),
            region: var_or("MEDIA_REGION", "us-east-1"),
            public_url: var_or("MEDIA_PUBLIC_URL", "http://localhost:9000/retreat-media"),
            prefix: var_or("MEDIA_PREFIX", "uploads"),
        };
        let upstream = UpstreamConfig {
            timeout_seconds: parsed_or("UPSTREAM_TIMEOUT_SECONDS", 10),
            max_attempts: parsed_or("UPSTREAM_MAX_ATTEMPTS", 3),
        };
        Ok(Self {
            database_url,
            host: var_or("APP_HOST", "0.0.0.0"),
            port: parsed_or("APP_PORT", 8080),
            cors_origins: split_origins(&var_or("CORS_ORIGINS", "*")),
            jwt,
            otp,
            mail,
            media,
            upstream,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_origins_drops_blanks() {
        assert_eq!(
            split_origins(" https://a.example , ,https://b.example"),
            vec!["https://a.example".to_string(), "https://b.example".to_string()]
        );
        assert!(split_origins("").is_empty());
    }
}
