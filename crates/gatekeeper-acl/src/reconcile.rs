//! Applying a desired ACL to controllers.
//!
//! # Architecture
//!
//! Each device is reconciled by its own Tokio task. Tasks do not share any
//! mutable state: a task returns its [`Report`] (or the error that aborted
//! it) as its output, and the coordinator collects outputs from the
//! `JoinSet` as tasks finish. A semaphore bounds how many devices are being
//! talked to at once.
//!
//! ```text
//! ┌──────────┐
//! │ Device A │──── Result<Report> ───►┌─────────────┐
//! │ Task     │                        │             │
//! └──────────┘                        │   JoinSet   │──► ReconcileOutcome
//! ┌──────────┐                        │             │    { reports, errors }
//! │ Device B │──── Result<Report> ───►└─────────────┘
//! │ Task     │
//! └──────────┘
//! ```

use crate::{
    AclError, DeviceFailure, Result,
    diff::compare,
    fetch::{DEFAULT_MAX_EMPTY_SLOTS, fetch_cards},
    report::{Category, ConsolidatedReport, Report, Summary, consolidate, summarize},
};
use gatekeeper_core::{Acl, Card, CardNumber, CardSet, DeviceId};
use gatekeeper_device::{ControllerApi, DeviceError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Reconciler settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    /// Compute and report the changes without writing to any controller.
    pub dry_run: bool,

    /// Maximum number of devices reconciled at the same time.
    pub max_concurrent_devices: usize,

    /// Consecutive empty index slots tolerated while fetching a device.
    pub max_empty_slots: u32,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            dry_run: false,
            max_concurrent_devices: 4,
            max_empty_slots: DEFAULT_MAX_EMPTY_SLOTS,
        }
    }
}

impl ReconcileConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set dry-run mode
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Set the concurrency limit (at least one device)
    pub fn max_concurrent_devices(mut self, max: usize) -> Self {
        self.max_concurrent_devices = max.max(1);
        self
    }

    /// Set the empty-slot limit for fetches
    pub fn max_empty_slots(mut self, max: u32) -> Self {
        self.max_empty_slots = max;
        self
    }
}

/// Reconcile one device against its desired card set.
///
/// Fetches the device's cards, compares them with `desired` and writes or
/// deletes every card that differs. Each attempted card ends up in the
/// report under its diff category if the call succeeded, under `failed` if
/// the controller refused it, or under `errored` if the call raised an
/// error. Unchanged cards are never written.
///
/// In dry-run mode no write or delete is issued and every changed card is
/// reported under its diff category.
///
/// # Errors
///
/// Returns `AclError::Device` if the device's cards cannot be fetched.
/// Errors on individual writes are recorded in the report instead.
pub async fn apply<A: ControllerApi>(
    api: &A,
    device: DeviceId,
    desired: &CardSet,
    config: &ReconcileConfig,
) -> Result<Report> {
    let actual = fetch_cards(api, device, config.max_empty_slots).await?;
    let diff = compare(&actual, desired);

    let mut report = Report::default();
    report
        .unchanged
        .extend(diff.unchanged.iter().map(|card| card.card_number));

    if config.dry_run {
        report.updated.extend(diff.updated.iter().map(|card| card.card_number));
        report.added.extend(diff.added.iter().map(|card| card.card_number));
        report.deleted.extend(diff.deleted.iter().map(|card| card.card_number));
        return Ok(report);
    }

    for card in diff.updated {
        put(api, device, card, Category::Updated, &mut report).await;
    }

    for card in diff.added {
        put(api, device, card, Category::Added, &mut report).await;
    }

    for card in diff.deleted {
        let card = card.card_number;
        debug!(device = %device, card = %card, "Deleting card");
        let result = api.delete_card(device, card).await;
        classify(device, card, Category::Deleted, result, &mut report);
    }

    report.sort();
    Ok(report)
}

async fn put<A: ControllerApi>(
    api: &A,
    device: DeviceId,
    card: Card,
    category: Category,
    report: &mut Report,
) {
    let number = card.card_number;
    debug!(device = %device, card = %number, ?category, "Writing card");
    let result = api.put_card(device, card).await;
    classify(device, number, category, result, report);
}

fn classify(
    device: DeviceId,
    card: CardNumber,
    category: Category,
    result: gatekeeper_device::Result<bool>,
    report: &mut Report,
) {
    match result {
        Ok(true) => report.record(card, category),
        Ok(false) => {
            warn!(device = %device, card = %card, ?category, "Controller refused card write");
            report.record(card, Category::Failed);
        }
        Err(e) => {
            warn!(device = %device, card = %card, ?category, error = %e, "Card write failed");
            report.record_error(card, e);
        }
    }
}

/// Result of reconciling a whole ACL.
///
/// Devices whose task failed outright have no report; their failure is in
/// `errors` instead.
#[derive(Debug, Default)]
pub struct ReconcileOutcome {
    pub reports: BTreeMap<DeviceId, Report>,
    pub errors: Vec<DeviceFailure>,
}

impl ReconcileOutcome {
    /// Returns `true` if every device was reconciled and no card failed.
    pub fn is_success(&self) -> bool {
        self.errors.is_empty() && self.reports.values().all(Report::is_clean)
    }

    pub fn consolidate(&self) -> ConsolidatedReport {
        consolidate(&self.reports)
    }

    pub fn summarize(&self) -> BTreeMap<DeviceId, Summary> {
        summarize(&self.reports)
    }
}

/// Reconcile every device in `acl` concurrently.
///
/// A device-level failure (for example an unreachable controller) stops
/// only that device's task; the other devices run to completion. The call
/// returns once every task has finished.
///
/// # Examples
///
/// ```no_run
/// use gatekeeper_acl::{ReconcileConfig, put_acl};
/// use gatekeeper_core::Acl;
/// use gatekeeper_device::MockController;
/// use std::sync::Arc;
///
/// # async fn example(desired: Acl) {
/// let (api, _handle) = MockController::new();
/// let outcome = put_acl(Arc::new(api), desired, ReconcileConfig::default().dry_run(true)).await;
///
/// for (device, summary) in outcome.summarize() {
///     println!("{device}: {} added, {} deleted", summary.added, summary.deleted);
/// }
/// # }
/// ```
pub async fn put_acl<A>(api: Arc<A>, acl: Acl, config: ReconcileConfig) -> ReconcileOutcome
where
    A: ControllerApi + 'static,
{
    info!(
        devices = acl.len(),
        dry_run = config.dry_run,
        max_concurrent = config.max_concurrent_devices,
        "Reconciling ACL"
    );

    let semaphore = Arc::new(Semaphore::new(config.max_concurrent_devices.max(1)));
    let config = Arc::new(config);
    let mut tasks = JoinSet::new();
    let mut task_devices = HashMap::new();

    for (device, cards) in acl {
        let api = Arc::clone(&api);
        let semaphore = Arc::clone(&semaphore);
        let config = Arc::clone(&config);

        let handle = tasks.spawn(async move {
            let _permit = semaphore.acquire_owned().await.map_err(|_| {
                AclError::device(device, DeviceError::other("reconcile semaphore closed"))
            })?;
            apply(api.as_ref(), device, &cards, &config).await
        });
        task_devices.insert(handle.id(), device);
    }

    let mut outcome = ReconcileOutcome::default();

    while let Some(result) = tasks.join_next_with_id().await {
        match result {
            Ok((id, Ok(report))) => {
                let Some(&device) = task_devices.get(&id) else {
                    continue;
                };
                let summary = report.summary();
                info!(
                    device = %device,
                    unchanged = summary.unchanged,
                    updated = summary.updated,
                    added = summary.added,
                    deleted = summary.deleted,
                    failed = summary.failed,
                    errored = summary.errored,
                    "Device reconciled"
                );
                outcome.reports.insert(device, report);
            }
            Ok((id, Err(e))) => {
                let Some(&device) = task_devices.get(&id) else {
                    continue;
                };
                warn!(device = %device, error = %e, "Device reconcile failed");
                outcome.errors.push(DeviceFailure::new(device, e));
            }
            Err(join_error) => {
                let Some(&device) = task_devices.get(&join_error.id()) else {
                    continue;
                };
                let message = if join_error.is_cancelled() {
                    "task cancelled".to_string()
                } else {
                    panic_message(join_error.into_panic())
                };
                error!(device = %device, %message, "Device reconcile task panicked");
                outcome.errors.push(DeviceFailure::new(
                    device,
                    AclError::TaskPanicked { device, message },
                ));
            }
        }
    }

    outcome.errors.sort_by_key(|failure| failure.device);

    info!(
        reconciled = outcome.reports.len(),
        failed = outcome.errors.len(),
        "ACL reconcile complete"
    );

    outcome
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
