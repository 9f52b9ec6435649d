use serde::{Deserialize, Serialize};

/// A question in flight: published by an asker onto the durable question
/// queue, and re-published by a memory onto the brainer exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionMessage {
    /// The question text (raw on the asker leg, normalized on the brainer
    /// leg).
    pub question: String,
}

/// An answer produced by a brainer, published onto the brainer exchange for
/// whichever memory settles it first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerMessage {
    /// The question being answered, as the brainer received it.
    pub question: String,
    /// The answer text.
    pub answer: String,
}

/// A settled question/answer pair, published by a memory directly to an
/// asker's reply queue under the correlation id of the original ask.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyMessage {
    /// The normalized question text.
    pub question: String,
    /// The answer text.
    pub answer: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn question_message_round_trips() {
        // Given
        let message = QuestionMessage {
            question: "What is NTP".to_string(),
        };

        // When
        let json = serde_json::to_string(&message).unwrap();
        let back = serde_json::from_str::<QuestionMessage>(&json).unwrap();

        // Then
        assert_eq!(json, r#"{"question":"What is NTP"}"#);
        assert_eq!(back, message);
    }

    #[test]
    fn answer_message_requires_both_fields() {
        // When: the answer field is missing altogether
        let result = serde_json::from_str::<AnswerMessage>(r#"{"question":"foo"}"#);

        // Then: decoding fails, so the ingress acks and drops the delivery
        assert!(result.is_err());
    }
}
