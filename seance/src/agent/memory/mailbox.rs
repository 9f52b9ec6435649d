use tokio::sync::mpsc;

/// A question lifted off the bus by the asker ingress, pending coordination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AskerQuestion {
    /// The question text, raw as the asker typed it.
    pub question: String,
    /// The asker's reply queue.
    pub reply_to: String,
    /// The correlation id of this ask.
    pub correlation_id: String,
}

/// An answer lifted off the bus by the brainer ingress, pending coordination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrainerAnswer {
    /// The question text, raw as the brainer echoed it.
    pub question: String,
    /// The answer text, raw as the brainer typed it.
    pub answer: String,
}

/// The two envelope shapes carried by the memory's mailbox, dispatched at a
/// single site in the [`Coordinator`](crate::agent::memory::Coordinator).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemoryEnvelope {
    /// An asker wants a question answered.
    Question(AskerQuestion),
    /// A brainer answered a question.
    Answer(BrainerAnswer),
}

/// The producing half of the mailbox, cloned into each ingress.
pub type MailboxSender = mpsc::UnboundedSender<MemoryEnvelope>;

/// The consuming half of the mailbox, owned by the coordinator.
pub type MailboxReceiver = mpsc::UnboundedReceiver<MemoryEnvelope>;

/// Creates the memory's in-process mailbox: an ordered, unbounded,
/// multi-producer/single-consumer queue of envelopes.
///
/// Producers never block. Once every sender is dropped (the ingresses have
/// stopped), the receiver keeps yielding the buffered envelopes and then
/// returns `None`, which is exactly the drain-before-exit behavior the
/// shutdown sequence relies on.
pub fn mailbox() -> (MailboxSender, MailboxReceiver) {
    mpsc::unbounded_channel()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn question(text: &str) -> MemoryEnvelope {
        MemoryEnvelope::Question(AskerQuestion {
            question: text.to_string(),
            reply_to: "q.a1".to_string(),
            correlation_id: "c1".to_string(),
        })
    }

    #[tokio::test]
    async fn envelopes_are_consumed_in_enqueue_order() {
        // Given
        let (sender, mut receiver) = mailbox();

        // When
        sender.send(question("first")).unwrap();
        sender.send(question("second")).unwrap();

        // Then
        assert_eq!(receiver.recv().await, Some(question("first")));
        assert_eq!(receiver.recv().await, Some(question("second")));
    }

    #[tokio::test]
    async fn receiver_drains_buffered_envelopes_after_senders_drop() {
        // Given
        let (sender, mut receiver) = mailbox();
        sender.send(question("buffered")).unwrap();

        // When: every producer is gone before the consumer gets scheduled
        drop(sender);

        // Then: the buffered envelope still comes out, then the mailbox ends
        assert_eq!(receiver.recv().await, Some(question("buffered")));
        assert_eq!(receiver.recv().await, None);
    }
}
