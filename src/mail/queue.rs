//! Bounded outbound mail queue.
//!
//! Request handlers hand mail to [`MailQueue::enqueue`], which never waits.
//! A single [`MailWorker`] drains the queue and owns delivery retries.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, error, info, warn};

use super::transport::Mailer;
use crate::config::MailConfig;
use crate::error::AppError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Clone)]
pub struct MailQueue {
    tx: mpsc::Sender<OutgoingMail>,
}

impl MailQueue {
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<OutgoingMail>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }

    pub fn enqueue(&self, mail: OutgoingMail) -> Result<(), AppError> {
        match self.tx.try_send(mail) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(mail)) => {
                warn!(to = %mail.to, "mail queue full");
                Err(AppError::Mail("mail queue is full".into()))
            }
            Err(TrySendError::Closed(mail)) => {
                error!(to = %mail.to, "mail queue closed");
                Err(AppError::Mail("mail queue is closed".into()))
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
}

impl RetryPolicy {
    pub fn from_config(cfg: &MailConfig) -> Self {
        Self {
            max_attempts: cfg.max_attempts.max(1),
            initial_backoff: cfg.retry_backoff(),
        }
    }

    /// Delay before retry number `attempt` (1-based), doubling each time.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_backoff.saturating_mul(factor)
    }
}

pub struct MailWorker {
    mailer: Arc<dyn Mailer>,
    rx: mpsc::Receiver<OutgoingMail>,
    policy: RetryPolicy,
}

impl MailWorker {
    pub fn new(
        mailer: Arc<dyn Mailer>,
        rx: mpsc::Receiver<OutgoingMail>,
        policy: RetryPolicy,
    ) -> Self {
        Self { mailer, rx, policy }
    }

    /// Runs until every `MailQueue` handle has been dropped.
    pub async fn run(mut self) {
        info!(max_attempts = self.policy.max_attempts, "mail worker started");
        while let Some(mail) = self.rx.recv().await {
            self.deliver(&mail).await;
        }
        info!("mail worker stopped");
    }

    async fn deliver(&self, mail: &OutgoingMail) {
        for attempt in 1..=self.policy.max_attempts {
            match self.mailer.send(&mail.to, &mail.subject, &mail.body).await {
                Ok(()) => {
                    debug!(to = %mail.to, attempt, "mail delivered");
                    return;
                }
                Err(e) if attempt < self.policy.max_attempts => {
                    let delay = self.policy.backoff(attempt);
                    warn!(
                        to = %mail.to,
                        attempt,
                        error = %e,
                        ?delay,
                        "mail delivery failed; retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    error!(to = %mail.to, attempt, error = %e, "mail delivery failed; giving up");
                }
            }
        }
    }
}
