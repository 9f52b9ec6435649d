use crate::AppConfig;
use crate::agent::AgentError;
use crate::topology;
use crate::wire::{AnswerMessage, QuestionMessage};
use seance_core::AgentContext;
use seance_mongo::QuestionRepository;
use seance_rabbitmq::{Connector, JsonSubscriber};
use tracing::info;

pub mod mailbox;
pub use self::mailbox::{AskerQuestion, BrainerAnswer, MemoryEnvelope, mailbox};

pub mod ingress;
pub use self::ingress::{AskerIngress, BrainerIngress};

pub mod coordinator;
pub use self::coordinator::Coordinator;

pub mod outbound;
pub use self::outbound::{BusOutbound, Outbound};

pub mod store;
pub use self::store::QuestionStore;

/// The memory agent: the deduplicating, caching relay between askers and
/// brainers.
///
/// Three cooperating tasks share one in-process mailbox:
///
/// - [`AskerIngress`] consumes the durable question queue and enqueues
///   validated questions;
/// - [`BrainerIngress`] consumes the answer binding of the brainer exchange
///   and enqueues validated answers;
/// - [`Coordinator`] is the sole mailbox consumer: one atomic store operation
///   per envelope, then zero or more outbound publishes.
///
/// On shutdown the ingresses stop consuming and drop their mailbox senders;
/// the coordinator keeps draining until the mailbox is empty, so nothing that
/// was acknowledged on the bus is silently discarded in-process.
pub struct Memory;

impl Memory {
    /// Runs a memory agent to completion: until shutdown, or until a fatal
    /// failure (lost connection, failed declarations).
    pub async fn run(config: &AppConfig) -> Result<(), AgentError> {
        // Both ingresses share one consuming connection, each on its own
        // channel. The publishing side gets a dedicated connection with
        // heartbeats disabled, since a reply may trail the last publish by
        // however long a human answer takes
        let consuming_bus = Connector::connect(&config.rabbitmq).await?;
        let publishing_bus = Connector::connect(config.rabbitmq.clone().with_heartbeat(0)).await?;
        let store = seance_mongo::Connector::connect(&config.mongodb).await?;

        // Bootstrap the store: the unique index is what makes one-record-per-
        // question hold across concurrent memory processes
        let repository = QuestionRepository::new(&store);
        repository.ensure_indexes().await?;

        // Subscribe both ingresses
        let asker_subscriber = JsonSubscriber::<QuestionMessage>::subscribe_json(
            &consuming_bus,
            topology::asker_question_ingress(),
        )
        .await?;
        let brainer_subscriber = JsonSubscriber::<AnswerMessage>::subscribe_json(
            &consuming_bus,
            topology::brainer_answer_ingress(),
        )
        .await?;

        // The coordinator owns a single outbound channel; both of its
        // publishers are opened on it, so publishes stay serialized
        let outbound = BusOutbound::open(publishing_bus.channel().await?).await?;

        // Wire the mailbox
        let (sender, receiver) = mailbox();

        info!("Memory agent ready; waiting for questions and answers");

        // Spawn the three tasks
        let asker_ingress =
            tokio::spawn(AskerIngress::new(asker_subscriber, sender.clone()).run());
        let brainer_ingress =
            tokio::spawn(BrainerIngress::new(brainer_subscriber, sender).run());
        let coordinator =
            tokio::spawn(Coordinator::new(repository, outbound, receiver).run());

        // Join all three; the ingresses return on shutdown (or a lost
        // connection), and the coordinator returns once the mailbox drains
        let outcome = tokio::try_join!(
            flatten(asker_ingress),
            flatten(brainer_ingress),
            flatten(coordinator),
        );

        // A fatal task failure must bring the whole agent down
        if outcome.is_err() {
            AgentContext::terminate();
        }

        // Close the external resources
        consuming_bus.close().await;
        publishing_bus.close().await;
        store.close().await;

        outcome.map(|_| ())
    }
}

/// Collapses a join result and a task result into one fallible outcome.
async fn flatten(
    handle: tokio::task::JoinHandle<Result<(), AgentError>>,
) -> Result<(), AgentError> {
    handle.await?
}
