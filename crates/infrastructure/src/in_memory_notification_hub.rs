//! Process-local notification fan-out over tokio broadcast channels.
//!
//! Subscribers only see events published in the same process. Clients that
//! fall behind lose the lagged events and should reload their views.

use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use futures::Stream;
use futures::stream::select_all;
use medgate_application::{NotificationChannel, NotificationEvent, NotificationPublisher};
use medgate_core::AppResult;
use tokio::sync::broadcast;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;

const CHANNEL_CAPACITY: usize = 100;

/// Stream of events for one subscriber.
pub type NotificationStream = Pin<Box<dyn Stream<Item = NotificationEvent> + Send>>;

/// Notification hub keyed by user and group channels.
#[derive(Clone, Default)]
pub struct InMemoryNotificationHub {
    channels: Arc<DashMap<NotificationChannel, broadcast::Sender<NotificationEvent>>>,
}

impl InMemoryNotificationHub {
    /// Creates a hub with no channels.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn get_or_create_channel(
        &self,
        channel: &NotificationChannel,
    ) -> broadcast::Sender<NotificationEvent> {
        self.channels
            .entry(channel.clone())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .clone()
    }

    /// Subscribes to every listed channel and merges their events.
    #[must_use]
    pub fn subscribe(&self, channels: &[NotificationChannel]) -> NotificationStream {
        let streams = channels.iter().map(|channel| {
            let receiver = self.get_or_create_channel(channel).subscribe();
            BroadcastStream::new(receiver).filter_map(|result| result.ok())
        });

        Box::pin(select_all(streams))
    }
}

#[async_trait]
impl NotificationPublisher for InMemoryNotificationHub {
    async fn publish(
        &self,
        channel: NotificationChannel,
        event: NotificationEvent,
    ) -> AppResult<()> {
        let Some(sender) = self.channels.get(&channel).map(|entry| entry.clone()) else {
            tracing::debug!(channel = %channel, "no subscribers for notification");
            return Ok(());
        };

        match sender.send(event) {
            Ok(delivered) => {
                tracing::debug!(channel = %channel, delivered, "published notification");
            }
            Err(_) => {
                self.channels
                    .remove_if(&channel, |_, sender| sender.receiver_count() == 0);
                tracing::debug!(channel = %channel, "dropped channel without subscribers");
            }
        }

        Ok(())
    }
}
