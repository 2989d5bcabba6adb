use std::sync::Arc;

use sqlx::PgPool;
use tracing::info;

use crate::{
    accounts::{AccountStore, PgAccountStore},
    auth::{jwt::JwtKeys, otp::OtpPolicy},
    config::AppConfig,
    mailer::{HttpMailer, LogMailer, Mailer},
    storage::{MediaStore, S3MediaStore},
    upstream::RetryPolicy,
};

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<AppConfig>,
    pub jwt: JwtKeys,
    pub otp: OtpPolicy,
    pub retry: RetryPolicy,
    pub accounts: Arc<dyn AccountStore>,
    pub mailer: Arc<dyn Mailer>,
    pub media: Arc<dyn MediaStore>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let db = sqlx::postgres::PgPoolOptions::new()
            .max_connections(10)
            .connect(&config.database_url)
            .await?;

        let mailer: Arc<dyn Mailer> = match &config.mail.api_url {
            Some(url) => Arc::new(HttpMailer::new(url, &config.mail)?),
            None => {
                info!("MAIL_API_URL not set; emails will only be logged");
                Arc::new(LogMailer)
            }
        };

        let media = Arc::new(S3MediaStore::new(&config.media).await?) as Arc<dyn MediaStore>;

        Ok(Self::from_parts(
            db.clone(),
            config,
            Arc::new(PgAccountStore::new(db)),
            mailer,
            media,
        ))
    }

    pub fn from_parts(
        db: PgPool,
        config: Arc<AppConfig>,
        accounts: Arc<dyn AccountStore>,
        mailer: Arc<dyn Mailer>,
        media: Arc<dyn MediaStore>,
    ) -> Self {
        Self {
            jwt: JwtKeys::new(&config.jwt),
            otp: OtpPolicy::from(&config.otp),
            retry: RetryPolicy::from(&config.upstream),
            db,
            config,
            accounts,
            mailer,
            media,
        }
    }

    /// State for tests: lazy pool, in-memory collaborators.
    #[cfg(test)]
    pub fn fake() -> Self {
        crate::testing::Harness::new().state
    }
}
