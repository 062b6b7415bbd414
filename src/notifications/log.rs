use async_trait::async_trait;

use super::{ChannelResult, DeletionWarning, NotificationChannel, mask_phone};

/// Channel that only logs warnings. Useful for dry runs and local setups.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogChannel;

#[async_trait]
impl NotificationChannel for LogChannel {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn send(&self, phone: &str, warning: &DeletionWarning) -> ChannelResult<()> {
        tracing::info!(
            channel = "log",
            phone = %mask_phone(phone),
            subject_name = %warning.subject_name,
            deletion_date = %warning.deletion_date,
            record_count = warning.record_count,
            "Deletion warning"
        );
        Ok(())
    }
}
