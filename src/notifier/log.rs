use async_trait::async_trait;
use tracing::info;

use super::Notifier;
use crate::error::Result;

/// Dry-run transport: logs every message instead of delivering it.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_group_message(&self, group_id: &str, text: &str) -> Result<()> {
        info!(group_id, "[dry-run] group message: {}", text);
        Ok(())
    }

    async fn send_direct_message(&self, user_id: &str, text: &str) -> Result<()> {
        info!(user_id, "[dry-run] direct message: {}", text);
        Ok(())
    }
}
