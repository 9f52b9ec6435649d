use crate::agent::AgentError;
use crate::agent::memory::mailbox::{
    AskerQuestion, BrainerAnswer, MailboxSender, MemoryEnvelope,
};
use crate::wire::{AnswerMessage, QuestionMessage};
use seance_core::{AgentContext, AgentSpindown};
use seance_rabbitmq::{Envelope, JsonSubscriber};
use tracing::{info, warn};

/// Consumes asker questions off the durable question queue and feeds them
/// into the mailbox.
///
/// A delivery is acknowledged if and only if its envelope made it into the
/// mailbox, or if it was invalid and dropped. The ack sits *before* the
/// store commit on purpose: a crash between enqueue and commit loses the
/// envelope, and the asker's client-side timeout covers that window. Moving
/// the ack behind the commit would serialize this ingress behind every store
/// round-trip.
pub struct AskerIngress {
    subscriber: JsonSubscriber<QuestionMessage>,
    mailbox: MailboxSender,
}

/// Consumes brainer answers off the answer binding of the brainer exchange
/// and feeds them into the mailbox. Same acknowledgement contract as
/// [`AskerIngress`].
pub struct BrainerIngress {
    subscriber: JsonSubscriber<AnswerMessage>,
    mailbox: MailboxSender,
}

impl AskerIngress {
    /// Creates the ingress over an already subscribed queue.
    pub fn new(subscriber: JsonSubscriber<QuestionMessage>, mailbox: MailboxSender) -> Self {
        Self {
            subscriber,
            mailbox,
        }
    }

    /// Consumes deliveries until shutdown or until the bus connection is
    /// lost. Dropping `self` (and with it the mailbox sender) is what lets
    /// the coordinator finish draining.
    pub async fn run(mut self) -> Result<(), AgentError> {
        let _token = AgentSpindown::register("memory:asker_ingress");

        loop {
            let envelope = tokio::select! {
                biased;
                _ = AgentContext::terminated() => break,
                received = self.subscriber.receive() => match received {
                    Some(envelope) => envelope,
                    None => return Err(AgentError::ConnectionLost),
                },
            };

            self.receive_question(envelope).await;
        }

        info!("Asker ingress stopped consuming");

        Ok(())
    }

    /// Validates a single delivery, enqueues it if sound, and acknowledges it
    /// either way.
    async fn receive_question(&self, envelope: Envelope<QuestionMessage>) {
        // A question needs a non-empty body and complete reply metadata;
        // anything else is dropped and the asker times out client-side
        let question = envelope.payload().question.clone();
        let reply_to = envelope.reply_to().map(str::to_string);
        let correlation_id = envelope.correlation_id().map(str::to_string);

        match (question, reply_to, correlation_id) {
            (question, Some(reply_to), Some(correlation_id)) if !question.is_empty() => {
                let sent = self.mailbox.send(MemoryEnvelope::Question(AskerQuestion {
                    question,
                    reply_to,
                    correlation_id,
                }));

                // The coordinator never stops while the ingresses run; a send
                // failure means the process is already tearing down
                if sent.is_err() {
                    warn!("Mailbox closed; dropping an asker question");
                }
            }
            _ => {
                warn!(subscriber = envelope.subscriber(), "Dropping an invalid asker question");
            }
        }

        ack(&envelope).await;
    }
}

impl BrainerIngress {
    /// Creates the ingress over an already subscribed queue.
    pub fn new(subscriber: JsonSubscriber<AnswerMessage>, mailbox: MailboxSender) -> Self {
        Self {
            subscriber,
            mailbox,
        }
    }

    /// Consumes deliveries until shutdown or until the bus connection is
    /// lost.
    pub async fn run(mut self) -> Result<(), AgentError> {
        let _token = AgentSpindown::register("memory:brainer_ingress");

        loop {
            let envelope = tokio::select! {
                biased;
                _ = AgentContext::terminated() => break,
                received = self.subscriber.receive() => match received {
                    Some(envelope) => envelope,
                    None => return Err(AgentError::ConnectionLost),
                },
            };

            self.receive_answer(envelope).await;
        }

        info!("Brainer ingress stopped consuming");

        Ok(())
    }

    /// Validates a single delivery, enqueues it if sound, and acknowledges it
    /// either way.
    async fn receive_answer(&self, envelope: Envelope<AnswerMessage>) {
        let AnswerMessage { question, answer } = envelope.payload().clone();

        if question.is_empty() || answer.is_empty() {
            warn!(subscriber = envelope.subscriber(), "Dropping an invalid brainer answer");
        } else {
            let sent = self
                .mailbox
                .send(MemoryEnvelope::Answer(BrainerAnswer { question, answer }));

            if sent.is_err() {
                warn!("Mailbox closed; dropping a brainer answer");
            }
        }

        ack(&envelope).await;
    }
}

/// Acknowledges a delivery, logging (rather than propagating) a failed ack:
/// the broker will redeliver, and redelivery is idempotent downstream.
async fn ack<T>(envelope: &Envelope<T>) {
    if let Err(error) = envelope.ack().await {
        warn!(
            subscriber = envelope.subscriber(),
            ?error,
            error_message = %error,
            "Failed to acknowledge a delivery",
        );
    }
}
