use async_trait::async_trait;
use seance_mongo::{QuestionRecord, QuestionRepository, SettledAnswer, StoreError};
use std::sync::Arc;

/// The store port of the coordinator: the two atomic operations the whole
/// consistency model rests on.
///
/// The production implementation is [`QuestionRepository`]; tests drive the
/// coordinator with an in-memory implementation that mirrors the same
/// conditional semantics.
#[async_trait]
pub trait QuestionStore: Send + Sync {
    /// Atomically records an asker against a question and returns the
    /// post-image of the record: insert when absent, append when unanswered
    /// and the `reply_to` is new, otherwise leave untouched.
    async fn enqueue_asker(
        &self,
        question: &str,
        reply_to: &str,
        correlation_id: &str,
    ) -> Result<QuestionRecord, StoreError>;

    /// Atomically settles an answer and returns the askers that were pending
    /// immediately before the write: an unanswered record becomes
    /// `{question, answer}`, an answered record is untouched (and the
    /// returned pending list is then empty).
    async fn settle_answer(
        &self,
        question: &str,
        answer: &str,
    ) -> Result<SettledAnswer, StoreError>;
}

#[async_trait]
impl QuestionStore for QuestionRepository {
    async fn enqueue_asker(
        &self,
        question: &str,
        reply_to: &str,
        correlation_id: &str,
    ) -> Result<QuestionRecord, StoreError> {
        QuestionRepository::enqueue_asker(self, question, reply_to, correlation_id).await
    }

    async fn settle_answer(
        &self,
        question: &str,
        answer: &str,
    ) -> Result<SettledAnswer, StoreError> {
        QuestionRepository::settle_answer(self, question, answer).await
    }
}

/// Sharing a store across tasks (or keeping a handle on it from a test) is a
/// matter of wrapping it in an [`Arc`].
#[async_trait]
impl<S> QuestionStore for Arc<S>
where
    S: QuestionStore + ?Sized,
{
    async fn enqueue_asker(
        &self,
        question: &str,
        reply_to: &str,
        correlation_id: &str,
    ) -> Result<QuestionRecord, StoreError> {
        S::enqueue_asker(self, question, reply_to, correlation_id).await
    }

    async fn settle_answer(
        &self,
        question: &str,
        answer: &str,
    ) -> Result<SettledAnswer, StoreError> {
        S::settle_answer(self, question, answer).await
    }
}
