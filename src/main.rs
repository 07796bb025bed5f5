use std::sync::Arc;

mod app;
mod applications;
mod auth;
mod config;
mod db;
mod error;
mod jobs;
mod mail;
mod state;

use crate::config::AppConfig;
use crate::mail::{transport::mailer_from_config, MailWorker, RetryPolicy};
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "jobboard=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let config = Arc::new(AppConfig::from_env()?);

    let db = db::connect(&config.database_url).await?;
    db::migrate(&db).await?;

    let (app_state, outbox) = AppState::new(db, config.clone())?;

    let mailer = mailer_from_config(&config.mail)?;
    let worker = MailWorker::new(Arc::from(mailer), outbox, RetryPolicy::from_config(&config.mail));
    tokio::spawn(worker.run());

    let app = app::build_app(app_state);
    app::serve(app).await
}
