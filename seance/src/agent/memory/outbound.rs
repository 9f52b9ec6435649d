use crate::topology;
use crate::wire::{QuestionMessage, ReplyMessage};
use async_trait::async_trait;
use lapin::{Channel, Error as LapinError};
use seance_rabbitmq::{Dispatch, Publisher};
use std::sync::Arc;
use tracing::error;

/// The outbound port of the coordinator: a reply aimed at one asker, or a
/// question broadcast to every brainer.
///
/// Both operations are deliberately infallible at this level. By the time a
/// publish happens, the store transition is already committed; a dropped
/// publish therefore only manifests as a client-side timeout at the asker,
/// whose retry lands on the cached-answer path.
#[async_trait]
pub trait Outbound: Send + Sync {
    /// Publishes one reply directly to the given reply queue, under the given
    /// correlation id.
    async fn reply(&self, reply_to: &str, correlation_id: &str, reply: ReplyMessage);

    /// Broadcasts a question to the brainers.
    async fn forward(&self, question: QuestionMessage);
}

/// The production [`Outbound`]: two publishers opened on one channel owned by
/// the coordinator task, so all publishes stay serialized behind it.
pub struct BusOutbound {
    replies: Publisher,
    broadcasts: Publisher,
}

impl BusOutbound {
    /// Opens both publishers on the given channel, declaring the brainer
    /// exchange along the way.
    pub async fn open(channel: Channel) -> Result<Self, LapinError> {
        let replies = Publisher::on_channel(channel.clone(), topology::reply_egress()).await?;
        let broadcasts =
            Publisher::on_channel(channel, topology::brainer_question_egress()).await?;

        Ok(Self {
            replies,
            broadcasts,
        })
    }
}

#[async_trait]
impl Outbound for BusOutbound {
    async fn reply(&self, reply_to: &str, correlation_id: &str, reply: ReplyMessage) {
        match Dispatch::json(&reply) {
            Ok(builder) => {
                self.replies
                    .publish(
                        builder
                            .with_routing_key(reply_to)
                            .with_correlation_id(correlation_id)
                            .build(),
                    )
                    .await;
            }
            Err(error) => error!(
                ?error,
                error_message = %error,
                "Failed to encode a reply",
            ),
        }
    }

    async fn forward(&self, question: QuestionMessage) {
        match Dispatch::json(&question) {
            Ok(builder) => self.broadcasts.publish(builder.build()).await,
            Err(error) => error!(
                ?error,
                error_message = %error,
                "Failed to encode a brainer broadcast",
            ),
        }
    }
}

/// Sharing an outbound across tasks (or keeping a handle on it from a test)
/// is a matter of wrapping it in an [`Arc`].
#[async_trait]
impl<O> Outbound for Arc<O>
where
    O: Outbound + ?Sized,
{
    async fn reply(&self, reply_to: &str, correlation_id: &str, reply: ReplyMessage) {
        O::reply(self, reply_to, correlation_id, reply).await
    }

    async fn forward(&self, question: QuestionMessage) {
        O::forward(self, question).await
    }
}
