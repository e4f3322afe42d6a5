//! One monitor tick: evaluate every alert and act on state changes.
//!
//! Per tick, alerts are grouped by the user owning their hive so each user's
//! snapshots are fetched once. Groups run concurrently (bounded by
//! `workers`); alerts inside a group run in order. A failure is contained at
//! the narrowest scope that can absorb it: a failed snapshot fetch skips its
//! group, a failed alert is logged and the rest continue. Only failing to
//! list alerts aborts the tick.
//!
//! State writes are awaited per alert. Notifications are sent from their
//! own tasks and only collected once the whole group has been evaluated, so
//! a slow notifier delays the count, never the evaluation of later alerts.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::future::join_all;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn, Instrument};
use uuid::Uuid;

use hivewatch_core::config::MonitorConfig;
use hivewatch_core::{Alert, HiveId, Owner, Snapshot, SnapshotBatch, TriggerState, UserId};
use hivewatch_notify::{AlertContext, DispatchRequest, MessageTemplates, Notifier, TemplateContext};
use hivewatch_rules::{evaluate_detailed, parse_conditions, Condition};

use crate::error::MonitorError;
use crate::owners::OwnerDirectory;
use crate::snapshot::SnapshotProvider;
use crate::store::AlertStore;

/// Counters for one tick.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TickReport {
    /// Alerts listed from the store at the start of the tick.
    pub alerts_checked: usize,
    /// Alerts whose state flipped false→true.
    pub newly_triggered: usize,
    /// Notifications accepted by the notifier.
    pub notifications_sent: usize,
    /// Alerts whose state flipped true→false.
    pub resolved: usize,
    /// Alerts left unchanged because their hive had no snapshot.
    pub skipped_no_snapshot: usize,
    /// Alerts left unchanged because their hive has no owner.
    pub skipped_no_owner: usize,
    /// User groups whose snapshot fetch failed.
    pub groups_failed: usize,
    /// Alerts whose processing failed.
    pub alerts_failed: usize,
}

impl TickReport {
    fn merge(&mut self, other: TickReport) {
        self.alerts_checked += other.alerts_checked;
        self.newly_triggered += other.newly_triggered;
        self.notifications_sent += other.notifications_sent;
        self.resolved += other.resolved;
        self.skipped_no_snapshot += other.skipped_no_snapshot;
        self.skipped_no_owner += other.skipped_no_owner;
        self.groups_failed += other.groups_failed;
        self.alerts_failed += other.alerts_failed;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TickOutcome {
    Completed(TickReport),
    /// Another tick was still running.
    Skipped,
}

/// What happened to a single alert.
#[derive(Debug)]
enum AlertOutcome {
    NoSnapshot,
    Unchanged,
    /// The stored state moved since the tick read it; nothing written.
    Conflict,
    /// `pending` resolves to whether the notifier accepted the message;
    /// `None` when the owner has notifications off.
    Triggered { pending: Option<JoinHandle<bool>> },
    Resolved,
}

/// A user and the alerts on their hives.
struct UserGroup {
    owner: Owner,
    alerts: Vec<Alert>,
}

/// Evaluates all stored alerts against fresh snapshots.
pub struct AlertMonitor {
    store: Arc<dyn AlertStore>,
    owners: Arc<dyn OwnerDirectory>,
    snapshots: Arc<dyn SnapshotProvider>,
    notifier: Arc<dyn Notifier>,
    templates: Arc<MessageTemplates>,
    config: MonitorConfig,
    tick_guard: Mutex<()>,
}

impl AlertMonitor {
    pub fn new(
        store: Arc<dyn AlertStore>,
        owners: Arc<dyn OwnerDirectory>,
        snapshots: Arc<dyn SnapshotProvider>,
        notifier: Arc<dyn Notifier>,
        config: MonitorConfig,
    ) -> Self {
        Self {
            store,
            owners,
            snapshots,
            notifier,
            templates: Arc::new(MessageTemplates::default()),
            config,
            tick_guard: Mutex::new(()),
        }
    }

    /// Use custom subject/body templates for trigger notifications.
    pub fn with_templates(mut self, templates: MessageTemplates) -> Self {
        self.templates = Arc::new(templates);
        self
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Run exactly one tick, bounded by `tick_timeout`.
    ///
    /// Returns [`TickOutcome::Skipped`] without doing anything when a tick
    /// is already in progress.
    pub async fn run_once(&self) -> Result<TickOutcome, MonitorError> {
        let Ok(_guard) = self.tick_guard.try_lock() else {
            warn!("previous tick still running, skipping");
            return Ok(TickOutcome::Skipped);
        };

        let tick_id = Uuid::new_v4();
        let span = tracing::info_span!("tick", %tick_id);
        let started = std::time::Instant::now();

        let report = tokio::time::timeout(self.config.tick_timeout, self.tick())
            .instrument(span)
            .await
            .map_err(|_| MonitorError::TickTimeout(self.config.tick_timeout))??;

        info!(
            %tick_id,
            checked = report.alerts_checked,
            triggered = report.newly_triggered,
            notified = report.notifications_sent,
            resolved = report.resolved,
            no_snapshot = report.skipped_no_snapshot,
            no_owner = report.skipped_no_owner,
            groups_failed = report.groups_failed,
            alerts_failed = report.alerts_failed,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "tick complete"
        );
        Ok(TickOutcome::Completed(report))
    }

    async fn tick(&self) -> Result<TickReport, MonitorError> {
        let alerts = self.store.list_all().await.map_err(|e| {
            error!(error = %e, "failed to list alerts, aborting tick");
            e
        })?;

        let mut report = TickReport {
            alerts_checked: alerts.len(),
            ..TickReport::default()
        };
        if alerts.is_empty() {
            debug!("no alerts stored");
            return Ok(report);
        }

        let groups = self.group_by_owner(alerts, &mut report).await;

        let workers = self.config.workers.max(1);
        let group_reports: Vec<TickReport> = stream::iter(groups)
            .map(|group| self.process_group(group))
            .buffer_unordered(workers)
            .collect()
            .await;

        for group_report in group_reports {
            report.merge(group_report);
        }
        Ok(report)
    }

    /// Resolve owners once per distinct hive and bucket alerts by user.
    async fn group_by_owner(&self, alerts: Vec<Alert>, report: &mut TickReport) -> Vec<UserGroup> {
        let mut hive_owner: HashMap<HiveId, Option<Owner>> = HashMap::new();
        let mut groups: BTreeMap<UserId, UserGroup> = BTreeMap::new();

        for alert in alerts {
            if !hive_owner.contains_key(&alert.hive_id) {
                let owner = match self.owners.owner_of_hive(&alert.hive_id).await {
                    Ok(owner) => owner,
                    Err(e) => {
                        warn!(hive_id = %alert.hive_id, error = %e, "owner lookup failed");
                        None
                    }
                };
                hive_owner.insert(alert.hive_id.clone(), owner);
            }

            match hive_owner.get(&alert.hive_id).and_then(Option::as_ref) {
                Some(owner) => groups
                    .entry(owner.user_id.clone())
                    .or_insert_with(|| UserGroup {
                        owner: owner.clone(),
                        alerts: Vec::new(),
                    })
                    .alerts
                    .push(alert),
                None => {
                    warn!(alert_id = %alert.id, hive_id = %alert.hive_id, "hive has no owner, skipping alert");
                    report.skipped_no_owner += 1;
                }
            }
        }

        groups.into_values().collect()
    }

    async fn process_group(&self, group: UserGroup) -> TickReport {
        let UserGroup { owner, alerts } = group;
        let mut report = TickReport::default();

        // The user's hives per the directory, plus any hive an alert names.
        let mut hive_ids: BTreeSet<HiveId> = match self.owners.hives_of_user(&owner.user_id).await {
            Ok(hives) => hives.into_iter().collect(),
            Err(e) => {
                warn!(user_id = %owner.user_id, error = %e, "hive listing failed, using alert hives");
                BTreeSet::new()
            }
        };
        hive_ids.extend(alerts.iter().map(|a| a.hive_id.clone()));
        let hive_ids: Vec<HiveId> = hive_ids.into_iter().collect();

        let batch = match self.snapshots.snapshots_for_user(&owner, &hive_ids).await {
            Ok(batch) => batch,
            Err(e) => {
                warn!(
                    user_id = %owner.user_id,
                    alerts = alerts.len(),
                    error = %e,
                    "snapshot fetch failed, skipping user"
                );
                report.groups_failed = 1;
                return report;
            }
        };

        // Plain handles rather than a JoinSet: if the tick times out and this
        // future is dropped, sends already started keep running.
        let mut pending: Vec<JoinHandle<bool>> = Vec::new();

        for alert in alerts {
            let alert_id = alert.id.clone();
            match self.process_alert(&owner, alert, &batch).await {
                Ok(AlertOutcome::NoSnapshot) => report.skipped_no_snapshot += 1,
                Ok(AlertOutcome::Unchanged) | Ok(AlertOutcome::Conflict) => {}
                Ok(AlertOutcome::Triggered { pending: send }) => {
                    report.newly_triggered += 1;
                    pending.extend(send);
                }
                Ok(AlertOutcome::Resolved) => report.resolved += 1,
                Err(MonitorError::Store(e)) => {
                    error!(alert_id = %alert_id, error = %e, "failed to persist trigger state");
                    report.alerts_failed += 1;
                }
                Err(e) => {
                    warn!(alert_id = %alert_id, error = %e, "alert processing failed");
                    report.alerts_failed += 1;
                }
            }
        }

        for sent in join_all(pending).await {
            match sent {
                Ok(true) => report.notifications_sent += 1,
                Ok(false) => {}
                Err(e) => warn!(user_id = %owner.user_id, error = %e, "notification task failed"),
            }
        }

        report
    }

    async fn process_alert(
        &self,
        owner: &Owner,
        alert: Alert,
        batch: &SnapshotBatch,
    ) -> Result<AlertOutcome, MonitorError> {
        let Some(snapshot) = batch.get(&alert.hive_id) else {
            debug!(alert_id = %alert.id, hive_id = %alert.hive_id, "no snapshot for hive");
            return Ok(AlertOutcome::NoSnapshot);
        };

        let conditions = match parse_conditions(&alert.conditions) {
            Ok(parsed) => parsed.conditions,
            Err(e) => {
                info!(alert_id = %alert.id, error = %e, "unreadable conditions, treating as not triggered");
                Vec::new()
            }
        };

        let eval = evaluate_detailed(&conditions, snapshot);
        if eval.incomplete {
            debug!(alert_id = %alert.id, missing = ?eval.missing, "snapshot lacks parameters");
        }

        if eval.triggered == alert.is_triggered {
            return Ok(AlertOutcome::Unchanged);
        }

        debug!(
            alert_id = %alert.id,
            from = %alert.trigger_state(),
            to = %TriggerState::from(eval.triggered),
            "trigger state changed"
        );

        // The write runs detached and starts its own notification, so a
        // tick timeout cannot land between them.
        let commit = Commit {
            store: Arc::clone(&self.store),
            notifier: Arc::clone(&self.notifier),
            templates: Arc::clone(&self.templates),
            notify_timeout: self.config.notify_timeout,
            owner: owner.clone(),
            conditions,
            snapshot: snapshot.clone(),
            alert,
            triggered: eval.triggered,
        };
        tokio::spawn(commit.run().in_current_span())
            .await
            .map_err(|e| MonitorError::Task(e.to_string()))?
    }
}

/// Everything the detached commit step needs, owned.
struct Commit {
    store: Arc<dyn AlertStore>,
    notifier: Arc<dyn Notifier>,
    templates: Arc<MessageTemplates>,
    notify_timeout: Duration,
    owner: Owner,
    conditions: Vec<Condition>,
    snapshot: Snapshot,
    alert: Alert,
    triggered: bool,
}

impl Commit {
    async fn run(self) -> Result<AlertOutcome, MonitorError> {
        let applied = self
            .store
            .update_trigger_state(&self.alert.id, self.alert.is_triggered, self.triggered)
            .await?;
        if !applied {
            warn!(alert_id = %self.alert.id, "trigger state changed concurrently, write skipped");
            return Ok(AlertOutcome::Conflict);
        }

        if !self.triggered {
            info!(alert_id = %self.alert.id, "alert resolved");
            return Ok(AlertOutcome::Resolved);
        }

        info!(alert_id = %self.alert.id, hive_id = %self.alert.hive_id, "alert triggered");
        if !self.owner.notifications_enabled {
            debug!(alert_id = %self.alert.id, user_id = %self.owner.user_id, "owner has notifications off");
            return Ok(AlertOutcome::Triggered { pending: None });
        }

        let send = tokio::spawn(self.notify().in_current_span());
        Ok(AlertOutcome::Triggered {
            pending: Some(send),
        })
    }

    /// Send the trigger notification. Failures are logged, never returned:
    /// the state change stands either way.
    async fn notify(self) -> bool {
        let ctx = TemplateContext {
            alert: AlertContext {
                id: self.alert.id.clone(),
                name: self.alert.name.clone(),
                conditions: self.conditions.iter().map(ToString::to_string).collect(),
            },
            hive_id: self.alert.hive_id.clone(),
            readings: self
                .snapshot
                .iter()
                .map(|(parameter, value)| (parameter.to_string(), value))
                .collect(),
            now: Utc::now().to_rfc3339(),
        };

        let (subject, body) = match self.templates.render(&ctx) {
            Ok(rendered) => rendered,
            Err(e) => {
                warn!(alert_id = %self.alert.id, error = %e, "notification template failed");
                return false;
            }
        };

        let request = DispatchRequest {
            recipient: self.owner.email.clone(),
            subject,
            body,
            correlation_id: self.alert.id.clone(),
        };

        match tokio::time::timeout(self.notify_timeout, self.notifier.send(&request)).await {
            Ok(Ok(receipt)) => {
                info!(
                    alert_id = %self.alert.id,
                    channel = %receipt.channel,
                    notification_id = ?receipt.notification_id,
                    "notification accepted"
                );
                true
            }
            Ok(Err(e)) => {
                warn!(
                    alert_id = %self.alert.id,
                    channel = self.notifier.channel_name(),
                    error = %e,
                    "notification failed"
                );
                false
            }
            Err(_) => {
                warn!(
                    alert_id = %self.alert.id,
                    timeout = ?self.notify_timeout,
                    "notification timed out"
                );
                false
            }
        }
    }
}
