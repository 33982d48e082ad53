//! Conversation engine: maps each inbound chat event to at most one store
//! mutation and at most one outbound message, advancing the per-user intake
//! state machine (category selection → number entry → optional city entry →
//! tracking).

use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use log::{debug, error, info};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::{
    db::{Category, Database, IntakeState, TrackedApplication},
    locale::MessageCatalog,
    status::{is_ready_status, StatusSource, NOT_FOUND_STATUS},
    telegram::{ChatEvent, ChatEventKind, Notifier},
};

pub struct ConversationEngine {
    db: Database,
    status_source: Arc<dyn StatusSource>,
    notifier: Arc<dyn Notifier>,
    catalog: MessageCatalog,
}

impl ConversationEngine {
    pub fn new(
        db: Database,
        status_source: Arc<dyn StatusSource>,
        notifier: Arc<dyn Notifier>,
        catalog: MessageCatalog,
    ) -> Self {
        Self {
            db,
            status_source,
            notifier,
            catalog,
        }
    }

    pub async fn handle_event(&self, event: ChatEvent) -> Result<()> {
        match event.kind {
            ChatEventKind::Command(ref name) => self.handle_command(event.chat_id, name).await,
            ChatEventKind::Callback(ref payload) => {
                self.handle_category_selection(event.chat_id, payload).await
            }
            ChatEventKind::Text(ref body) => self.handle_text(event.chat_id, body).await,
        }
    }

    async fn handle_command(&self, chat_id: i64, name: &str) -> Result<()> {
        match name {
            "start" => match self.db.find_by_user(chat_id).await? {
                Some(record) => self.reply_already_tracking(chat_id, &record).await,
                None => {
                    let choices = vec![
                        (self.catalog.text("five_years"), "5".to_string()),
                        (self.catalog.text("ten_years"), "10".to_string()),
                    ];
                    self.notifier
                        .send_choice(
                            chat_id,
                            &self.catalog.text("please_select_passport_validity_period"),
                            &choices,
                        )
                        .await
                }
            },
            "remove" => match self.db.find_by_user(chat_id).await? {
                Some(record) => {
                    self.db.delete_application(&record.id).await?;
                    let number = record.application_number.as_deref().unwrap_or("-");
                    self.notifier
                        .send_text(
                            chat_id,
                            &self.catalog.render(
                                "your_application_was_deleted",
                                &[("ApplicationNumber", number)],
                            ),
                        )
                        .await
                }
                None => {
                    self.notifier
                        .send_text(chat_id, &self.catalog.text("no_active_application"))
                        .await
                }
            },
            other => {
                debug!("unknown command /{other} from chat {chat_id}");
                self.notifier
                    .send_text(chat_id, &self.catalog.text("unknown_command"))
                    .await
            }
        }
    }

    async fn handle_category_selection(&self, chat_id: i64, payload: &str) -> Result<()> {
        let Some(category) = Category::from_callback(payload) else {
            debug!("ignoring callback payload '{payload}' from chat {chat_id}");
            return Ok(());
        };

        // One tracked application per user: a stray second button press must
        // not create a second row.
        if let Some(record) = self.db.find_by_user(chat_id).await? {
            return self.reply_already_tracking(chat_id, &record).await;
        }

        let record = TrackedApplication::new(chat_id, category, Utc::now());
        self.db.insert_application(&record).await?;
        info!(
            "chat {chat_id} started tracking a {} application",
            category.as_str()
        );

        self.notifier
            .send_text(
                chat_id,
                &self.catalog.text("please_provide_application_number"),
            )
            .await
    }

    async fn handle_text(&self, chat_id: i64, body: &str) -> Result<()> {
        let Some(record) = self.db.find_by_user(chat_id).await? else {
            debug!("ignoring text from chat {chat_id} with no tracked application");
            return Ok(());
        };

        match (record.category, record.state) {
            (Category::ShortValidity, IntakeState::AwaitingNumber) => {
                self.enroll_short(chat_id, &record, body.trim()).await
            }
            (Category::LongValidity, IntakeState::AwaitingNumber) => {
                self.db
                    .set_application_number(&record.id, body.trim(), Utc::now())
                    .await?;
                self.notifier
                    .send_text(
                        chat_id,
                        &self.catalog.render(
                            "please_specify_the_city_where_you_submitted_the_application",
                            &[("Status", record.status.as_deref().unwrap_or(""))],
                        ),
                    )
                    .await
            }
            (Category::LongValidity, IntakeState::AwaitingCity) => {
                self.resolve_city(chat_id, &record, body.trim()).await
            }
            (_, IntakeState::Tracking) | (Category::ShortValidity, IntakeState::AwaitingCity) => {
                debug!("ignoring text from chat {chat_id} in state {:?}", record.state);
                Ok(())
            }
        }
    }

    /// Short-validity number entry performs the status lookup immediately;
    /// the record either becomes trackable, is deleted (already ready), or is
    /// left untouched so the user can retry.
    async fn enroll_short(
        &self,
        chat_id: i64,
        record: &TrackedApplication,
        number: &str,
    ) -> Result<()> {
        let status = match self.status_source.lookup_status(number).await {
            Ok(status) => status,
            Err(err) => {
                error!("intake status lookup failed for chat {chat_id}: {err:?}");
                return self
                    .notifier
                    .send_text(chat_id, &self.catalog.text("error_getting_status"))
                    .await;
            }
        };

        if status == NOT_FOUND_STATUS {
            return self
                .notifier
                .send_text(chat_id, &self.catalog.text("no_saved_application"))
                .await;
        }

        if is_ready_status(&status) {
            self.db.delete_application(&record.id).await?;
            return self
                .notifier
                .send_text(chat_id, &self.catalog.text("your_document_is_ready"))
                .await;
        }

        self.db
            .begin_tracking_short(&record.id, number, &status, Utc::now())
            .await?;
        self.notifier
            .send_text(
                chat_id,
                &self
                    .catalog
                    .render("application_saved", &[("Status", &status)]),
            )
            .await
    }

    async fn resolve_city(
        &self,
        chat_id: i64,
        record: &TrackedApplication,
        city_name: &str,
    ) -> Result<()> {
        let city_id = match self.status_source.lookup_city_id(city_name).await {
            Ok(Some(city_id)) => city_id,
            Ok(None) => {
                return self
                    .notifier
                    .send_text(chat_id, &self.catalog.text("the_city_was_not_found"))
                    .await;
            }
            Err(err) => {
                error!("city lookup failed for chat {chat_id}: {err:?}");
                return self
                    .notifier
                    .send_text(chat_id, &self.catalog.text("the_city_was_not_found"))
                    .await;
            }
        };

        self.db.set_city(&record.id, city_id, Utc::now()).await?;
        self.notifier
            .send_text(
                chat_id,
                &self.catalog.render(
                    "application_saved",
                    &[("Status", record.status.as_deref().unwrap_or(""))],
                ),
            )
            .await
    }

    async fn reply_already_tracking(
        &self,
        chat_id: i64,
        record: &TrackedApplication,
    ) -> Result<()> {
        let number = record.application_number.as_deref().unwrap_or("-");
        let status = record.status.as_deref().unwrap_or("");
        self.notifier
            .send_text(
                chat_id,
                &self.catalog.render(
                    "your_application_is_being_checked",
                    &[("ApplicationNumber", number), ("Status", status)],
                ),
            )
            .await
    }
}

/// Drains the inbound event channel one event at a time, in arrival order.
/// Failures are logged and never take the consumer down.
pub async fn run_event_consumer(
    engine: Arc<ConversationEngine>,
    mut events: mpsc::Receiver<ChatEvent>,
    cancel_token: CancellationToken,
) {
    loop {
        tokio::select! {
            maybe_event = events.recv() => {
                match maybe_event {
                    Some(event) => {
                        let chat_id = event.chat_id;
                        if let Err(err) = engine.handle_event(event).await {
                            error!("failed to handle event from chat {chat_id}: {err:?}");
                        }
                    }
                    None => break,
                }
            }
            _ = cancel_token.cancelled() => {
                info!("event consumer shutting down");
                break;
            }
        }
    }
}
