use crate::record::{PendingAsker, QuestionRecord, normalize_question};
use crate::Connector;
use mongodb::bson::{Bson, doc};
use mongodb::options::{IndexOptions, ReturnDocument};
use mongodb::{Collection, IndexModel};
use thiserror::Error;
use tracing::debug;

/// The data-access layer of the question store.
///
/// Both operations are single `findOneAndUpdate` calls with
/// aggregation-pipeline updates, which makes each of them an atomic
/// read-modify-write on the one document keyed by the normalized question.
/// There are no in-process locks anywhere: any number of store clients
/// (including multiple memory agents) may race on the same question, and the
/// document-level atomicity alone keeps the invariants intact.
pub struct QuestionRepository {
    collection: Collection<QuestionRecord>,
}

/// The outcome of settling an answer: the normalized question, the answer
/// that won (an earlier answer beats a later duplicate), and the askers that
/// were pending immediately before the write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettledAnswer {
    /// The normalized question text.
    pub question: String,
    /// The winning answer.
    pub answer: String,
    /// The askers that were pending before the write; empty when the answer
    /// was already known (a duplicate answer fans out to no one).
    pub pending_askers: Vec<PendingAsker>,
}

/// Represents a failure of a question store operation.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The question text was empty after normalization.
    #[error("question must not be empty")]
    EmptyQuestion,
    /// The answer text was empty after trimming.
    #[error("answer must not be empty")]
    EmptyAnswer,
    /// The underlying driver reported an error.
    #[error("MongoDB operation failed: {0}")]
    Driver(#[from] mongodb::error::Error),
    /// An upsert reported success but returned no document.
    #[error("the question store returned no document for an upsert")]
    MissingPostImage,
}

impl QuestionRepository {
    /// Creates a repository over the question collection of the given
    /// [`Connector`].
    pub fn new(connector: &Connector) -> Self {
        Self {
            collection: connector.collection(),
        }
    }

    /// Creates the unique index on the normalized question text. Repeatable;
    /// an existing identical index is a no-op on the server side.
    ///
    /// This is also the first round-trip to the deployment, so an unreachable
    /// store surfaces here, during agent initialization.
    pub async fn ensure_indexes(&self) -> Result<(), StoreError> {
        let index = IndexModel::builder()
            .keys(doc! { "question": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();

        self.collection.create_index(index).await?;

        Ok(())
    }
}

impl QuestionRepository {
    /// Atomically records an asker's interest in a question and returns the
    /// post-image of the record.
    ///
    /// In one server-side write:
    /// - an absent record is inserted with the asker as its only pending
    ///   entry;
    /// - an unanswered record gains the asker unless its `reply_to` is
    ///   already pending (the first correlation id wins);
    /// - an answered record is left untouched.
    ///
    /// The caller inspects the returned post-image: an answer means reply
    /// directly, no answer means forward to the brainers.
    pub async fn enqueue_asker(
        &self,
        question: &str,
        reply_to: &str,
        correlation_id: &str,
    ) -> Result<QuestionRecord, StoreError> {
        let question = normalize_question(question);
        if question.is_empty() {
            return Err(StoreError::EmptyQuestion);
        }

        let entry = doc! {
            "reply_to": reply_to,
            "correlation_id": correlation_id,
        };

        // One pipeline update covers all three states of the record. The
        // `$lte` against null is how a missing-or-null field is recognized
        // inside an aggregation expression.
        let pipeline = vec![doc! {
            "$set": {
                "pending_askers": {
                    "$switch": {
                        "branches": [
                            {
                                "case": { "$and": [
                                    { "$lte": ["$answer", Bson::Null] },
                                    { "$lte": ["$pending_askers", Bson::Null] },
                                ] },
                                "then": [entry.clone()],
                            },
                            {
                                "case": { "$and": [
                                    { "$lte": ["$answer", Bson::Null] },
                                    { "$not": { "$in": [
                                        reply_to,
                                        { "$ifNull": ["$pending_askers.reply_to", []] },
                                    ] } },
                                ] },
                                "then": { "$concatArrays": ["$pending_askers", [entry]] },
                            },
                        ],
                        "default": "$pending_askers",
                    },
                },
            },
        }];

        let post_image = self
            .collection
            .find_one_and_update(doc! { "question": &question }, pipeline)
            .upsert(true)
            .return_document(ReturnDocument::After)
            .await?
            .ok_or(StoreError::MissingPostImage)?;

        debug!(
            question = question.as_str(),
            answered = post_image.has_answer(),
            pending = post_image.pending_askers().len(),
            "Recorded an asker against a question",
        );

        Ok(post_image)
    }

    /// Atomically settles an answer for a question and returns the pre-image
    /// view needed for the fan-out.
    ///
    /// In one server-side write, an unanswered (or absent) record becomes
    /// `{question, answer}` with its pending askers dropped; an already
    /// answered record is left untouched. Because the returned pending askers
    /// come from the pre-image, a duplicate answer observes an already
    /// answered record, receives an empty pending list, and therefore fans
    /// out to no one: the first brainer to commit wins.
    pub async fn settle_answer(
        &self,
        question: &str,
        answer: &str,
    ) -> Result<SettledAnswer, StoreError> {
        let question = normalize_question(question);
        if question.is_empty() {
            return Err(StoreError::EmptyQuestion);
        }

        let answer = answer.trim().to_string();
        if answer.is_empty() {
            return Err(StoreError::EmptyAnswer);
        }

        let pipeline = vec![doc! {
            "$replaceWith": {
                "$cond": {
                    "if": { "$lte": ["$answer", Bson::Null] },
                    "then": {
                        "_id": "$_id",
                        "question": "$question",
                        "answer": &answer,
                    },
                    "else": "$$ROOT",
                },
            },
        }];

        let pre_image = self
            .collection
            .find_one_and_update(doc! { "question": &question }, pipeline)
            .upsert(true)
            .return_document(ReturnDocument::Before)
            .await?;

        let settled = match pre_image {
            // The record did not exist: the answer is now cached, nobody waited
            None => SettledAnswer {
                question,
                answer,
                pending_askers: Vec::new(),
            },

            // The record existed: an earlier answer wins over this one, and
            // the pre-image pending askers are the fan-out targets
            Some(record) => SettledAnswer {
                question,
                answer: record.answer.filter(|known| !known.is_empty()).unwrap_or(answer),
                pending_askers: record.pending_askers.unwrap_or_default(),
            },
        };

        debug!(
            question = settled.question.as_str(),
            pending = settled.pending_askers.len(),
            "Settled an answer for a question",
        );

        Ok(settled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Handle;

    /// Validation precedes any server round-trip, so these paths are
    /// observable against a client that never connects.
    async fn offline_repository() -> QuestionRepository {
        let connector = Connector::connect(Handle::default()).await.unwrap();

        QuestionRepository::new(&connector)
    }

    #[tokio::test]
    async fn blank_question_is_rejected_before_any_round_trip() {
        // Given
        let repository = offline_repository().await;

        // When
        let result = repository.enqueue_asker("   ", "q.a1", "c1").await;

        // Then
        assert!(matches!(result, Err(StoreError::EmptyQuestion)));
    }

    #[tokio::test]
    async fn blank_answer_is_rejected_before_any_round_trip() {
        // Given
        let repository = offline_repository().await;

        // When
        let result = repository.settle_answer("foo", "   ").await;

        // Then
        assert!(matches!(result, Err(StoreError::EmptyAnswer)));
    }
}
