use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use super::handlers::BotHandlers;
use super::telegram::{TelegramClient, Update};

/// Long-polling loop that hands each message to its own task
pub struct Dispatcher {
    telegram: Arc<TelegramClient>,
    handlers: Arc<BotHandlers>,
    poll_timeout_secs: u64,
    retry_delay: Duration,
}

impl Dispatcher {
    pub fn new(
        telegram: Arc<TelegramClient>,
        handlers: Arc<BotHandlers>,
        poll_timeout_secs: u64,
        retry_delay: Duration,
    ) -> Self {
        Self {
            telegram,
            handlers,
            poll_timeout_secs,
            retry_delay,
        }
    }

    /// Poll until `shutdown` resolves, then wait for in-flight replies
    pub async fn start_polling<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut offset: Option<i64> = None;
        let mut in_flight = JoinSet::new();

        info!("Start polling");
        loop {
            let polled = tokio::select! {
                _ = &mut shutdown => break,
                polled = self.telegram.get_updates(offset, self.poll_timeout_secs) => polled,
            };

            match polled {
                Ok(updates) => {
                    for update in updates {
                        offset = Some(update.update_id + 1);
                        self.dispatch(update, &mut in_flight);
                    }
                }
                Err(e) => {
                    error!("Failed to fetch updates: {}", e);
                    tokio::select! {
                        _ = &mut shutdown => break,
                        _ = tokio::time::sleep(self.retry_delay) => {}
                    }
                }
            }

            while let Some(finished) = in_flight.try_join_next() {
                if let Err(e) = finished {
                    error!("Message handler task failed: {}", e);
                }
            }
        }

        info!("Polling stopped, waiting for {} pending message(s)", in_flight.len());
        while let Some(finished) = in_flight.join_next().await {
            if let Err(e) = finished {
                error!("Message handler task failed: {}", e);
            }
        }
    }

    fn dispatch(&self, update: Update, in_flight: &mut JoinSet<()>) {
        let Some(message) = update.message else {
            debug!("Skipping update {} without a message", update.update_id);
            return;
        };

        let telegram = self.telegram.clone();
        let handlers = self.handlers.clone();
        in_flight.spawn(async move {
            let reply = handlers.handle_message(&message).await;
            if let Err(e) = telegram
                .send_message(message.chat.id, &reply, Some(message.message_id))
                .await
            {
                error!("Failed to reply in chat {}: {}", message.chat.id, e);
            }
        });
    }
}
