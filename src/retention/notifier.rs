//! Notify step: warn subjects and their contacts ahead of scheduled deletion.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Duration, Utc};
use futures::future::join_all;
use uuid::Uuid;

use crate::{
    config::RetentionConfig,
    db::{DbPool, DbResult},
    models::ArchivedConversationRecord,
    notifications::{DeletionWarning, NotificationChannel, mask_phone},
    observability::metrics,
};

/// Warnings go out this many days before `delete_after`.
pub const WARNING_LEAD_DAYS: i64 = 60;

/// Width of the warning window, matching the daily run cadence.
pub const WARNING_WINDOW_DAYS: i64 = 1;

/// Counts from one notify step.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct NotifyOutcome {
    /// Warnings delivered, one per phone number
    pub notified: u64,
    /// Sends the channel rejected
    pub failures: u64,
    /// Subjects with at least one record in the window
    pub subjects: u64,
}

/// The `[from, until)` window of `delete_after` values that get a warning at `now`.
pub fn warning_window(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let from = now + Duration::days(WARNING_LEAD_DAYS);
    (from, from + Duration::days(WARNING_WINDOW_DAYS))
}

/// Comparison key for phone numbers: digits only, with a `+44` prefix folded to `0`.
fn normalize_phone(phone: &str) -> String {
    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();
    match digits.strip_prefix("44") {
        Some(rest) if phone.trim_start().starts_with('+') => format!("0{rest}"),
        _ => digits,
    }
}

/// Collapse duplicate numbers, keeping the first spelling seen.
fn dedup_phones<I>(phones: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut seen = HashSet::new();
    phones
        .into_iter()
        .filter(|phone| {
            let key = normalize_phone(phone);
            !key.is_empty() && seen.insert(key)
        })
        .collect()
}

/// Send deletion warnings for archive copies entering the warning window.
///
/// Send failures are logged and counted; only store failures abort the step.
pub async fn notify_upcoming(
    db: &DbPool,
    channel: &dyn NotificationChannel,
    config: &RetentionConfig,
    now: DateTime<Utc>,
) -> DbResult<NotifyOutcome> {
    let archive = db.archived_conversations();
    let subjects = db.subjects();
    let (from, until) = warning_window(now);

    let due = archive
        .list_due_for_warning(from, until, config.deduplicate_warnings)
        .await?;

    let mut by_subject: BTreeMap<Uuid, Vec<ArchivedConversationRecord>> = BTreeMap::new();
    for record in due {
        by_subject.entry(record.subject_id).or_default().push(record);
    }

    let mut outcome = NotifyOutcome {
        subjects: by_subject.len() as u64,
        ..Default::default()
    };

    for (subject_id, records) in by_subject {
        let subject = subjects.get_by_id(subject_id).await?;
        let contacts = subjects.list_contacts(subject_id).await?;

        let phones = dedup_phones(
            subject
                .as_ref()
                .and_then(|s| s.phone.clone())
                .into_iter()
                .chain(contacts.into_iter().map(|c| c.phone)),
        );

        let deletion_date = records
            .iter()
            .filter_map(|r| r.delete_after)
            .min()
            .unwrap_or(from);
        let subject_name = subject
            .as_ref()
            .map(|s| s.display_name.clone())
            .unwrap_or_default();
        let warning = DeletionWarning::new(subject_name, deletion_date, records.len());

        if config.safety.dry_run {
            tracing::info!(
                subject_id = %subject_id,
                records = records.len(),
                phones = phones.len(),
                "DRY RUN: Would send deletion warning for {} record(s) due on {}",
                records.len(),
                warning.deletion_date
            );
            continue;
        }

        if phones.is_empty() {
            tracing::warn!(
                subject_id = %subject_id,
                records = records.len(),
                "No phone numbers on file for subject, skipping deletion warning"
            );
        }

        let sends = phones.iter().map(|phone| {
            let warning = &warning;
            async move { (phone, channel.send(phone, warning).await) }
        });

        for (phone, result) in join_all(sends).await {
            match result {
                Ok(()) => {
                    outcome.notified += 1;
                    metrics::record_notification("sent");
                }
                Err(e) => {
                    outcome.failures += 1;
                    metrics::record_notification("failed");
                    tracing::warn!(
                        subject_id = %subject_id,
                        phone = %mask_phone(phone),
                        channel = channel.name(),
                        error = %e,
                        "Failed to send deletion warning"
                    );
                }
            }
        }

        let ids: Vec<Uuid> = records.iter().map(|r| r.id).collect();
        archive.mark_notified(&ids, now).await?;
    }

    if outcome.notified > 0 {
        tracing::debug!(
            notified = outcome.notified,
            failures = outcome.failures,
            subjects = outcome.subjects,
            "Sent deletion warnings"
        );
        metrics::record_lifecycle_transition("notify", outcome.notified);
    }

    Ok(outcome)
}
