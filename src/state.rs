use std::sync::Arc;

use sqlx::PgPool;
use tokio::sync::mpsc;

use crate::auth::jwt::JwtKeys;
use crate::auth::repo::{PgUserStore, UserStore};
use crate::config::AppConfig;
use crate::mail::{MailQueue, OutgoingMail};

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn UserStore>,
    pub keys: JwtKeys,
    pub mail: MailQueue,
}

impl AppState {
    /// Builds the state around an existing pool. The returned receiver feeds the mail worker.
    pub fn new(
        db: PgPool,
        config: Arc<AppConfig>,
    ) -> anyhow::Result<(Self, mpsc::Receiver<OutgoingMail>)> {
        let keys = JwtKeys::new(&config.jwt)?;
        let (mail, outbox) = MailQueue::channel(config.mail.queue_capacity);
        let users = Arc::new(PgUserStore::new(db.clone())) as Arc<dyn UserStore>;
        Ok((
            Self {
                db,
                config,
                users,
                keys,
                mail,
            },
            outbox,
        ))
    }

    /// State backed by an in-memory user store and a lazy pool that never connects.
    /// The receiver exposes everything the workflows enqueue.
    #[cfg(test)]
    pub fn fake() -> (Self, mpsc::Receiver<OutgoingMail>) {
        use crate::auth::memory::MemoryUserStore;

        let config = Arc::new(AppConfig::for_tests());
        let db = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy(&config.database_url)
            .expect("lazy pool ok");
        let keys = JwtKeys::new(&config.jwt).expect("test jwt config is valid");
        let (mail, outbox) = MailQueue::channel(config.mail.queue_capacity);

        (
            Self {
                db,
                config,
                users: Arc::new(MemoryUserStore::new()),
                keys,
                mail,
            },
            outbox,
        )
    }
}
