use crate::agent::AgentError;
use crate::agent::memory::mailbox::{
    AskerQuestion, BrainerAnswer, MailboxReceiver, MemoryEnvelope,
};
use crate::agent::memory::outbound::Outbound;
use crate::agent::memory::store::QuestionStore;
use crate::wire::{QuestionMessage, ReplyMessage};
use seance_core::AgentSpindown;
use seance_mongo::normalize_question;
use tracing::{debug, error, info, warn};

/// The sole consumer of the memory's mailbox.
///
/// For every envelope the coordinator performs exactly one atomic store
/// operation and then publishes zero or more outbound messages based on what
/// the store returned. It never inspects ordering across the two ingresses;
/// whichever of a question and its answer reaches the store first, the
/// atomic conditional updates produce the same end state:
///
/// - question first: the asker lands in the pending set and the later answer
///   fans out to it;
/// - answer first: the answer is cached and the later question hits the
///   cached-answer branch and is replied to directly.
///
/// A failure while handling one envelope (store error, encode error, dropped
/// publish) is logged and absorbed; the loop always proceeds to the next
/// envelope.
pub struct Coordinator<S, O> {
    store: S,
    outbound: O,
    mailbox: MailboxReceiver,
}

impl<S, O> Coordinator<S, O>
where
    S: QuestionStore,
    O: Outbound,
{
    /// Creates a coordinator over its three collaborators.
    pub fn new(store: S, outbound: O, mailbox: MailboxReceiver) -> Self {
        Self {
            store,
            outbound,
            mailbox,
        }
    }

    /// Consumes the mailbox until it is drained.
    ///
    /// The coordinator does not watch the shutdown context itself: the
    /// ingresses stop producing and drop their senders, after which this loop
    /// naturally finishes whatever is still buffered and returns. That drain
    /// is what guarantees no acknowledged bus message dies in the mailbox.
    pub async fn run(mut self) -> Result<(), AgentError> {
        let _token = AgentSpindown::register("memory:coordinator");

        while let Some(envelope) = self.mailbox.recv().await {
            match envelope {
                MemoryEnvelope::Question(question) => self.handle_question(question).await,
                MemoryEnvelope::Answer(answer) => self.handle_answer(answer).await,
            }
        }

        info!("Coordinator drained the mailbox");

        Ok(())
    }

    /// Handles one asker question: one conditional upsert, then either a
    /// direct reply (cached answer) or a brainer broadcast.
    async fn handle_question(&self, question: AskerQuestion) {
        let normalized = normalize_question(&question.question);
        if normalized.is_empty() {
            warn!("Dropping a blank asker question");
            return;
        }

        let record = match self
            .store
            .enqueue_asker(&normalized, &question.reply_to, &question.correlation_id)
            .await
        {
            Ok(record) => record,
            Err(error) => {
                // The bus message is already acked; this envelope is lost and
                // the asker will retry on timeout
                error!(
                    question = normalized.as_str(),
                    ?error,
                    error_message = %error,
                    "Store failed while recording an asker question",
                );
                return;
            }
        };

        match record.answer {
            // The answer is already known: reply directly and leave the
            // cached record untouched
            Some(answer) if !answer.is_empty() => {
                debug!(
                    question = record.question.as_str(),
                    "Answering a known question from the store",
                );

                self.outbound
                    .reply(
                        &question.reply_to,
                        &question.correlation_id,
                        ReplyMessage {
                            question: record.question,
                            answer,
                        },
                    )
                    .await;
            }

            // No answer yet: forward to the brainers. Duplicate broadcasts
            // for a question that is already out are tolerated; dedup happens
            // at answer time, in the store
            _ => {
                debug!(
                    question = record.question.as_str(),
                    pending = record.pending_askers().len(),
                    "Forwarding an unanswered question to the brainers",
                );

                self.outbound
                    .forward(QuestionMessage {
                        question: record.question,
                    })
                    .await;
            }
        }
    }

    /// Handles one brainer answer: one conditional write-back, then one reply
    /// per asker that was pending before the write.
    async fn handle_answer(&self, answer: BrainerAnswer) {
        let normalized = normalize_question(&answer.question);
        let trimmed = answer.answer.trim();
        if normalized.is_empty() || trimmed.is_empty() {
            warn!("Dropping a blank brainer answer");
            return;
        }

        let settled = match self.store.settle_answer(&normalized, trimmed).await {
            Ok(settled) => settled,
            Err(error) => {
                error!(
                    question = normalized.as_str(),
                    ?error,
                    error_message = %error,
                    "Store failed while settling a brainer answer",
                );
                return;
            }
        };

        // A duplicate answer observed an already answered record, whose
        // pre-image carried no pending askers: the loop below fans out to no
        // one and the duplicate is silently absorbed
        if !settled.pending_askers.is_empty() {
            info!(
                question = settled.question.as_str(),
                pending = settled.pending_askers.len(),
                "Fanning an answer out to the pending askers",
            );
        }

        for asker in &settled.pending_askers {
            self.outbound
                .reply(
                    &asker.reply_to,
                    &asker.correlation_id,
                    ReplyMessage {
                        question: settled.question.clone(),
                        answer: settled.answer.clone(),
                    },
                )
                .await;
        }
    }
}
