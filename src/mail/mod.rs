pub mod queue;
pub mod templates;
pub mod transport;

pub use queue::{MailQueue, MailWorker, OutgoingMail, RetryPolicy};
