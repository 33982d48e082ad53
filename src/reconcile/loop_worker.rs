use std::{sync::Arc, time::Duration};

use log::{error, info, warn};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::{
    db::{Category, Database, TrackedApplication},
    locale::MessageCatalog,
    status::StatusSource,
    telegram::Notifier,
};

use super::policy::{decide, PollDecision};

pub async fn reconcile_loop(
    db: Database,
    status_source: Arc<dyn StatusSource>,
    notifier: Arc<dyn Notifier>,
    catalog: MessageCatalog,
    interval: Duration,
    stale_threshold: u32,
    cancel_token: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first interval tick fires immediately; skip it so a restart does
    // not double-poll right after the previous process's last pass.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                run_reconcile_pass(&db, status_source.as_ref(), notifier.as_ref(), &catalog, stale_threshold).await;
            }
            _ = cancel_token.cancelled() => {
                info!("reconcile loop shutting down");
                break;
            }
        }
    }
}

/// One full pass over the store. Records are handled independently: adapter
/// failures, send failures, and store failures each skip only the record
/// that hit them.
pub async fn run_reconcile_pass(
    db: &Database,
    status_source: &dyn StatusSource,
    notifier: &dyn Notifier,
    catalog: &MessageCatalog,
    stale_threshold: u32,
) {
    let applications = match db.list_applications().await {
        Ok(applications) => applications,
        Err(err) => {
            error!("reconcile pass could not list applications: {err:?}");
            return;
        }
    };

    let mut polled = 0usize;
    for application in &applications {
        if !application.is_trackable() {
            continue;
        }
        polled += 1;
        reconcile_one(db, status_source, notifier, catalog, stale_threshold, application).await;
    }

    if polled > 0 {
        info!("reconcile pass finished, {polled} application(s) polled");
    }
}

async fn reconcile_one(
    db: &Database,
    status_source: &dyn StatusSource,
    notifier: &dyn Notifier,
    catalog: &MessageCatalog,
    stale_threshold: u32,
    application: &TrackedApplication,
) {
    let Some(number) = application.application_number.as_deref() else {
        warn!(
            "application {} is marked Tracking without a number, skipping",
            application.id
        );
        return;
    };

    let poll_result = match application.category {
        Category::ShortValidity => status_source.lookup_status(number).await,
        Category::LongValidity => {
            let Some(city_id) = application.city_id else {
                warn!(
                    "application {} is marked Tracking without a city, skipping",
                    application.id
                );
                return;
            };
            status_source.lookup_status_in_city(number, city_id).await
        }
    };

    let polled_status = match poll_result {
        Ok(status) => status,
        Err(err) => {
            // Transient: the next tick retries with no state change.
            warn!(
                "status poll failed for application {}: {err:?}",
                application.id
            );
            return;
        }
    };

    let now = chrono::Utc::now();
    let decision = decide(
        application.status.as_deref(),
        application.checks_since_change,
        &polled_status,
        stale_threshold,
    );

    // Sends come first, mirroring the intake path, but a failed send never
    // rolls back the state that goes with it.
    match decision {
        PollDecision::Ready => {
            if let Err(err) = notifier
                .send_text(
                    application.user_id,
                    &catalog.text("your_document_is_ready"),
                )
                .await
            {
                error!(
                    "failed to notify chat {} about readiness: {err:?}",
                    application.user_id
                );
            }
            if let Err(err) = db.delete_application(&application.id).await {
                error!(
                    "failed to delete ready application {}: {err:?}",
                    application.id
                );
            } else {
                info!(
                    "application {} reached terminal status, tracking stopped",
                    application.id
                );
            }
        }
        PollDecision::Changed(status) => {
            if let Err(err) = notifier
                .send_text(
                    application.user_id,
                    &catalog.render("application_status_changed", &[("Status", &status)]),
                )
                .await
            {
                error!(
                    "failed to notify chat {} about status change: {err:?}",
                    application.user_id
                );
            }
            if let Err(err) = db
                .update_poll_result(&application.id, &status, 0, now)
                .await
            {
                error!(
                    "failed to persist new status for application {}: {err:?}",
                    application.id
                );
            }
        }
        PollDecision::StaleAlert => {
            if let Err(err) = notifier
                .send_text(
                    application.user_id,
                    &catalog.render(
                        "application_status_not_changed",
                        &[("Status", &polled_status)],
                    ),
                )
                .await
            {
                error!(
                    "failed to send stale alert to chat {}: {err:?}",
                    application.user_id
                );
            }
            if let Err(err) = db
                .update_checks_since_change(&application.id, 0, now)
                .await
            {
                error!(
                    "failed to reset check counter for application {}: {err:?}",
                    application.id
                );
            }
        }
        PollDecision::Count(checks) => {
            if let Err(err) = db
                .update_checks_since_change(&application.id, checks, now)
                .await
            {
                error!(
                    "failed to persist check counter for application {}: {err:?}",
                    application.id
                );
            }
        }
    }
}
