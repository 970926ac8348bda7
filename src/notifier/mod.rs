//! Message delivery
//!
//! The monitor only knows two destinations: a group's channel and a member's
//! direct messages. What happens after the call returns is up to the transport.

pub mod log;
pub mod slack;

use async_trait::async_trait;

use crate::error::Result;

pub use self::log::LogNotifier;
pub use slack::SlackNotifier;

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_group_message(&self, group_id: &str, text: &str) -> Result<()>;

    async fn send_direct_message(&self, user_id: &str, text: &str) -> Result<()>;
}
