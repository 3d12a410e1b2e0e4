//! Apply staged actions against a catalog in rate-limited batches.

use std::time::Duration;

use futures::future::join_all;
use partsync_catalog::Catalog;
use partsync_core::{AppConfig, Collection};
use serde_json::Value;

use crate::action::{Action, Outcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutorConfig {
    /// Writes issued concurrently per batch.
    pub batch_size: usize,
    /// Pause between batches.
    pub batch_delay_ms: u64,
    /// Stamp `publishedAt` on created entries.
    pub publish: bool,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            batch_size: 50,
            batch_delay_ms: 100,
            publish: false,
        }
    }
}

impl ExecutorConfig {
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            batch_size: config.batch_size.max(1),
            batch_delay_ms: config.batch_delay_ms,
            publish: config.publish,
        }
    }
}

/// Outcomes of one tier, in action order.
#[derive(Debug, Clone, PartialEq)]
pub struct TierRun {
    pub outcomes: Vec<Outcome>,
    /// Set when the first batch failed entirely and the rest was not sent.
    pub aborted: bool,
}

/// Apply `actions` to `collection`.
///
/// Skips and rejections become outcomes without a request. Writes go out in
/// batches of `batch_size`, concurrently within a batch, with
/// `batch_delay_ms` between batches. A uniqueness conflict counts as skipped.
/// If every write of the first batch fails, the remaining writes are reported
/// as not sent and the run is flagged aborted.
pub async fn execute<C: Catalog>(
    catalog: &C,
    collection: Collection,
    actions: Vec<Action>,
    config: &ExecutorConfig,
) -> TierRun {
    let mut outcomes: Vec<Option<Outcome>> = vec![None; actions.len()];
    let mut writes = Vec::new();
    for (i, action) in actions.into_iter().enumerate() {
        match action {
            Action::Skip { label, reason } => outcomes[i] = Some(Outcome::Skipped { label, reason }),
            Action::Reject { label, reason } => {
                outcomes[i] = Some(Outcome::Error {
                    label,
                    message: reason,
                });
            }
            write => writes.push((i, write)),
        }
    }

    let publish_stamp = config
        .publish
        .then(|| Value::from(chrono::Utc::now().to_rfc3339()));
    let batch_size = config.batch_size.max(1);
    let total_batches = writes.len().div_ceil(batch_size);
    let mut aborted = false;

    for (batch_no, batch) in writes.chunks(batch_size).enumerate() {
        if aborted {
            for (i, action) in batch {
                outcomes[*i] = Some(Outcome::NotSent {
                    label: action.label().to_owned(),
                });
            }
            continue;
        }
        if batch_no > 0 && config.batch_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(config.batch_delay_ms)).await;
        }

        let results = join_all(
            batch
                .iter()
                .map(|(_, action)| apply(catalog, collection, action, publish_stamp.as_ref())),
        )
        .await;

        if batch_no == 0 && results.iter().all(Outcome::is_error) {
            aborted = true;
            tracing::error!(
                collection = %collection,
                failed = results.len(),
                remaining_batches = total_batches - 1,
                "first batch failed entirely; not sending the rest"
            );
        }
        for ((i, _), outcome) in batch.iter().zip(results) {
            outcomes[*i] = Some(outcome);
        }
        tracing::debug!(
            collection = %collection,
            batch = batch_no + 1,
            of = total_batches,
            "batch applied"
        );
    }

    TierRun {
        outcomes: outcomes.into_iter().flatten().collect(),
        aborted,
    }
}

async fn apply<C: Catalog>(
    catalog: &C,
    collection: Collection,
    action: &Action,
    publish_stamp: Option<&Value>,
) -> Outcome {
    match action {
        Action::Create { label, payload } => {
            let mut payload = payload.clone();
            if let (Some(stamp), Value::Object(map)) = (publish_stamp, &mut payload) {
                map.insert("publishedAt".to_owned(), stamp.clone());
            }
            match catalog.create(collection, &payload).await {
                Ok(entry) => {
                    tracing::debug!(collection = %collection, entity = %label, "created");
                    Outcome::Created {
                        label: label.clone(),
                        entry,
                    }
                }
                Err(e) if e.is_conflict() => Outcome::Skipped {
                    label: label.clone(),
                    reason: "already exists".to_owned(),
                },
                Err(e) => {
                    tracing::warn!(collection = %collection, entity = %label, error = %e, "create failed");
                    Outcome::Error {
                        label: label.clone(),
                        message: e.to_string(),
                    }
                }
            }
        }
        Action::Update { label, id, changes } => {
            match catalog.update(collection, *id, changes).await {
                Ok(entry) => Outcome::Updated {
                    label: label.clone(),
                    id: *id,
                    entry,
                },
                Err(e) => {
                    tracing::warn!(collection = %collection, entity = %label, id, error = %e, "update failed");
                    Outcome::Error {
                        label: label.clone(),
                        message: e.to_string(),
                    }
                }
            }
        }
        Action::Skip { label, reason } => Outcome::Skipped {
            label: label.clone(),
            reason: reason.clone(),
        },
        Action::Reject { label, reason } => Outcome::Error {
            label: label.clone(),
            message: reason.clone(),
        },
    }
}
