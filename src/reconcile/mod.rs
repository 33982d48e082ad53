//! Periodic status reconciliation: polls every trackable application on a
//! fixed interval and applies the change/stale notification policy.

use std::{sync::Arc, time::Duration};

use anyhow::{bail, Context, Result};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::{
    db::Database, locale::MessageCatalog, status::StatusSource, telegram::Notifier,
};

mod loop_worker;
mod policy;

pub use loop_worker::run_reconcile_pass;
pub use policy::{decide, PollDecision};

/// Owns the reconcile task: spawn on startup, cancel-and-join on shutdown.
pub struct ReconcileController {
    handle: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
}

impl ReconcileController {
    pub fn new() -> Self {
        Self {
            handle: None,
            cancel_token: None,
        }
    }

    pub fn start(
        &mut self,
        db: Database,
        status_source: Arc<dyn StatusSource>,
        notifier: Arc<dyn Notifier>,
        catalog: MessageCatalog,
        interval: Duration,
        stale_threshold: u32,
    ) -> Result<()> {
        if self.handle.is_some() {
            bail!("reconcile loop already running");
        }

        let cancel_token = CancellationToken::new();
        let token_clone = cancel_token.clone();

        let handle = tokio::spawn(loop_worker::reconcile_loop(
            db,
            status_source,
            notifier,
            catalog,
            interval,
            stale_threshold,
            token_clone,
        ));

        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
        Ok(())
    }

    pub async fn stop(&mut self) -> Result<()> {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }

        if let Some(handle) = self.handle.take() {
            handle
                .await
                .context("reconcile loop task failed to join")
                .map(|_| ())
        } else {
            Ok(())
        }
    }
}

impl Default for ReconcileController {
    fn default() -> Self {
        Self::new()
    }
}
