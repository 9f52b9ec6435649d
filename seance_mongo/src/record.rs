use serde::{Deserialize, Serialize};

/// Normalizes a raw question into its store key form: surrounding whitespace
/// trimmed, all characters lowercased.
///
/// Normalization is idempotent; applying it to an already normalized question
/// yields the same string.
pub fn normalize_question(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// The persisted shape of a single question: its normalized text (the unique
/// key of the collection), the answer once one is known, and the askers still
/// waiting while the answer is outstanding.
///
/// An answered record never carries pending askers; settling the answer drops
/// them in the same atomic write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionRecord {
    /// The normalized question text.
    pub question: String,
    /// The answer, present once known; non-empty when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    /// The askers awaiting the answer; present only while `answer` is absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_askers: Option<Vec<PendingAsker>>,
}

/// One asker awaiting an answer: the queue to reply to and the correlation id
/// the reply must carry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingAsker {
    /// The asker's reply queue.
    pub reply_to: String,
    /// The correlation id of the original ask.
    pub correlation_id: String,
}

impl QuestionRecord {
    /// Reports whether this record carries a non-empty answer.
    pub fn has_answer(&self) -> bool {
        matches!(&self.answer, Some(answer) if !answer.is_empty())
    }

    /// Exposes the pending askers, treating an absent list as empty.
    pub fn pending_askers(&self) -> &[PendingAsker] {
        self.pending_askers.as_deref().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson;
    use pretty_assertions::assert_eq;

    #[test]
    fn normalization_trims_and_lowercases() {
        assert_eq!(normalize_question("  Capital of France?  "), "capital of france?");
    }

    #[test]
    fn normalization_is_idempotent() {
        // Given
        let raw = "  What is NTP  ";

        // When
        let once = normalize_question(raw);
        let twice = normalize_question(&once);

        // Then
        assert_eq!(once, twice);
    }

    #[test]
    fn record_without_answer_has_no_answer() {
        // Given
        let record = QuestionRecord {
            question: "foo".to_string(),
            answer: None,
            pending_askers: None,
        };

        // Then
        assert!(!record.has_answer());
        assert_eq!(record.pending_askers(), &[]);
    }

    #[test]
    fn record_deserializes_from_partial_document() {
        // Given: a freshly upserted document carries no answer and no askers
        let document = bson::doc! {
            "_id": bson::oid::ObjectId::new(),
            "question": "foo",
        };

        // When
        let record = bson::from_document::<QuestionRecord>(document).unwrap();

        // Then
        assert_eq!(
            record,
            QuestionRecord {
                question: "foo".to_string(),
                answer: None,
                pending_askers: None,
            },
        );
    }

    #[test]
    fn record_round_trips_through_bson() {
        // Given
        let record = QuestionRecord {
            question: "capital of france?".to_string(),
            answer: None,
            pending_askers: Some(vec![PendingAsker {
                reply_to: "q.a1".to_string(),
                correlation_id: "c1".to_string(),
            }]),
        };

        // When
        let document = bson::to_document(&record).unwrap();
        let back = bson::from_document::<QuestionRecord>(document).unwrap();

        // Then
        assert_eq!(back, record);
    }
}
