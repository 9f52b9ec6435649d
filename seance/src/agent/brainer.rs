use crate::AppConfig;
use crate::agent::AgentError;
use crate::topology;
use crate::wire::{AnswerMessage, QuestionMessage};
use seance_core::AgentContext;
use seance_rabbitmq::{Connector, Dispatch, JsonSubscriber, Publisher};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, warn};

/// The brainer agent: a human-answered oracle.
///
/// Every memory broadcast lands on this agent's exclusive queue; the operator
/// is prompted per question, and a non-empty answer is published back onto
/// the answer key of the brainer exchange, where whichever memory settles it
/// first wins.
pub struct Brainer;

impl Brainer {
    /// Runs a brainer agent until shutdown or end of terminal input.
    pub async fn run(config: &AppConfig) -> Result<(), AgentError> {
        let bus = Connector::connect(&config.rabbitmq).await?;

        let mut questions = JsonSubscriber::<QuestionMessage>::subscribe_json(
            &bus,
            topology::brainer_question_ingress(),
        )
        .await?;
        let publisher = Publisher::open(&bus, topology::brainer_answer_egress()).await?;

        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        println!("Connection ready. Waiting for questions...");

        loop {
            let envelope = tokio::select! {
                biased;
                _ = AgentContext::terminated() => break,
                received = questions.receive() => match received {
                    Some(envelope) => envelope,
                    None => return Err(AgentError::ConnectionLost),
                },
            };

            // Ack up front: a question being pondered needs no redelivery,
            // and an unanswered one is simply skipped
            if let Err(error) = envelope.ack().await {
                warn!(
                    ?error,
                    error_message = %error,
                    "Failed to acknowledge a question",
                );
            }

            let question = envelope.into_payload().question;
            if question.is_empty() {
                warn!("Dropping a blank question broadcast");
                continue;
            }

            println!("************");
            println!("Question: {}", question);
            print!("Answer (enter to skip): ");
            let _ = std::io::stdout().flush();

            let line = tokio::select! {
                biased;
                _ = AgentContext::terminated() => break,
                line = lines.next_line() => line?,
            };

            let answer = match &line {
                Some(line) => line.trim(),
                // EOF on stdin ends the session
                None => break,
            };

            if answer.is_empty() {
                continue;
            }

            Self::answer(&publisher, question, answer).await;
        }

        bus.close().await;

        Ok(())
    }

    /// Publishes one answer onto the brainer exchange.
    async fn answer(publisher: &Publisher, question: String, answer: &str) {
        let message = AnswerMessage {
            question,
            answer: answer.to_string(),
        };

        match Dispatch::json(&message) {
            Ok(builder) => publisher.publish(builder.build()).await,
            Err(error) => error!(
                ?error,
                error_message = %error,
                "Failed to encode an answer",
            ),
        }
    }
}
