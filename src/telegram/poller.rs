use std::sync::Arc;

use log::{error, info};
use tokio::sync::mpsc;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;

use super::{ChatEvent, TelegramClient};

/// Delay before retrying after a failed `getUpdates` round.
const RETRY_DELAY_SECS: u64 = 5;

/// Long-polls the Bot API and feeds inbound events into the bounded channel
/// the conversation engine consumes from, preserving arrival order.
pub async fn run_update_poller(
    client: Arc<TelegramClient>,
    events: mpsc::Sender<ChatEvent>,
    cancel_token: CancellationToken,
) {
    let mut offset: i64 = 0;

    loop {
        let batch = tokio::select! {
            result = client.get_updates(offset) => result,
            _ = cancel_token.cancelled() => {
                info!("update poller shutting down");
                break;
            }
        };

        let updates = match batch {
            Ok(updates) => updates,
            Err(err) => {
                error!("getUpdates failed: {err:?}");
                tokio::select! {
                    _ = tokio::time::sleep(Duration::from_secs(RETRY_DELAY_SECS)) => continue,
                    _ = cancel_token.cancelled() => break,
                }
            }
        };

        for update in updates {
            offset = offset.max(update.update_id + 1);

            let Some(event) = update.into_event() else {
                continue;
            };

            if events.send(event).await.is_err() {
                info!("event consumer gone, update poller exiting");
                return;
            }
        }
    }
}
