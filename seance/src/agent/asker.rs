use crate::AppConfig;
use crate::agent::AgentError;
use crate::topology;
use crate::wire::{QuestionMessage, ReplyMessage};
use seance_core::{AgentContext, AgentSpindown};
use seance_rabbitmq::{Connector, Dispatch, JsonSubscriber, Publisher};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, warn};
use uuid::Uuid;

/// The asker agent: a terminal front-end that publishes each typed question
/// onto the durable question queue and prints replies as they arrive.
///
/// One execution context, two cooperating tasks: a reply listener on an
/// exclusive server-named queue (whose broker-assigned name travels as the
/// `reply_to` of every ask), and the stdin loop below. Every ask carries a
/// fresh UUID correlation id; the reply queue stays stable for the lifetime
/// of the process, which is what makes the memory's per-queue dedup sound.
pub struct Asker;

impl Asker {
    /// Runs an asker agent until shutdown or end of terminal input.
    pub async fn run(config: &AppConfig) -> Result<(), AgentError> {
        // Heartbeats are disabled: the connection idles for however long the
        // human takes between questions
        let bus = Connector::connect(config.rabbitmq.clone().with_heartbeat(0)).await?;

        // The reply listener owns the exclusive queue all replies land on
        let replies =
            JsonSubscriber::<ReplyMessage>::subscribe_json(&bus, topology::reply_ingress())
                .await?;
        let reply_queue = replies.queue_name().to_string();

        // The question publisher declares the durable queue it targets
        let publisher = Publisher::open(&bus, topology::asker_question_egress()).await?;

        // Print replies in the background while the prompt loop runs
        let printer = tokio::spawn(Self::print_replies(replies));

        println!("Connection ready.");

        let outcome = Self::prompt_loop(&publisher, &reply_queue).await;

        // End of input terminates the whole agent, including the printer
        AgentContext::terminate();
        printer.await?;

        bus.close().await;

        outcome
    }

    /// Reads questions from the terminal until shutdown or EOF.
    async fn prompt_loop(publisher: &Publisher, reply_queue: &str) -> Result<(), AgentError> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        loop {
            print!("Your question? ");
            let _ = std::io::stdout().flush();

            let line = tokio::select! {
                biased;
                _ = AgentContext::terminated() => break,
                line = lines.next_line() => line?,
            };

            let question = match &line {
                Some(line) => line.trim(),
                // EOF on stdin ends the session
                None => break,
            };

            if question.is_empty() {
                continue;
            }

            Self::ask(publisher, reply_queue, question).await;
        }

        Ok(())
    }

    /// Publishes one question under a fresh correlation id.
    async fn ask(publisher: &Publisher, reply_queue: &str, question: &str) {
        let message = QuestionMessage {
            question: question.to_string(),
        };

        match Dispatch::json(&message) {
            Ok(builder) => {
                publisher
                    .publish(
                        builder
                            .with_reply_to(reply_queue)
                            .with_correlation_id(Uuid::new_v4().to_string())
                            .build(),
                    )
                    .await;
            }
            Err(error) => error!(
                ?error,
                error_message = %error,
                "Failed to encode a question",
            ),
        }
    }

    /// Prints incoming replies until shutdown or until the consumer stream
    /// ends.
    async fn print_replies(mut replies: JsonSubscriber<ReplyMessage>) {
        let _token = AgentSpindown::register("asker:replies");

        loop {
            let envelope = tokio::select! {
                biased;
                _ = AgentContext::terminated() => break,
                received = replies.receive() => match received {
                    Some(envelope) => envelope,
                    None => {
                        warn!("The reply stream ended");
                        break;
                    }
                },
            };

            if let Err(error) = envelope.ack().await {
                warn!(
                    ?error,
                    error_message = %error,
                    "Failed to acknowledge a reply",
                );
            }

            let reply = envelope.payload();
            println!("\n************");
            println!("Question: {}", reply.question);
            println!("Answer: {}", reply.answer);
            println!("************\n");
        }
    }
}
