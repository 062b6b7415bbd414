//! In-memory channel for engine tests

use std::{collections::HashSet, sync::Mutex};

use async_trait::async_trait;

use super::{ChannelError, ChannelResult, DeletionWarning, NotificationChannel};

/// Records every send; fails for the configured phone numbers.
#[derive(Default)]
pub struct RecordingChannel {
    sent: Mutex<Vec<(String, DeletionWarning)>>,
    failing: HashSet<String>,
}

impl RecordingChannel {
    pub fn failing_for(phones: &[&str]) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            failing: phones.iter().map(|p| p.to_string()).collect(),
        }
    }

    pub fn sent(&self) -> Vec<(String, DeletionWarning)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_phones(&self) -> Vec<String> {
        let mut phones: Vec<String> = self.sent().into_iter().map(|(p, _)| p).collect();
        phones.sort();
        phones
    }
}

#[async_trait]
impl NotificationChannel for RecordingChannel {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn send(&self, phone: &str, warning: &DeletionWarning) -> ChannelResult<()> {
        if self.failing.contains(phone) {
            return Err(ChannelError::Status {
                status: 500,
                body: "simulated failure".to_string(),
            });
        }
        self.sent
            .lock()
            .unwrap()
            .push((phone.to_string(), warning.clone()));
        Ok(())
    }
}
