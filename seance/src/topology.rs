use seance_rabbitmq::{Egress, Ingress};

/// The durable queue on which askers deposit their questions for the memory
/// agents.
pub const ASKER_QUESTION_QUEUE: &str = "asker_question";

/// The direct exchange carrying all brainer traffic, in both directions.
pub const BRAINER_EXCHANGE: &str = "brainer_question";

/// The routing key for questions forwarded from a memory to the brainers.
pub const ROUTING_KEY_QUESTION: &str = "question";

/// The routing key for answers sent from a brainer back to the memories.
pub const ROUTING_KEY_ANSWER: &str = "answer";

/// The inbound route of the memory's asker ingress: the durable question
/// queue, consumed with a prefetch of one so the broker meters the flow.
pub fn asker_question_ingress() -> Ingress {
    Ingress::builder()
        .with_name("asker_questions")
        .with_queue(ASKER_QUESTION_QUEUE)
        .durable()
        .with_prefetch_count(1)
        .build()
}

/// The inbound route of the memory's brainer ingress: an exclusive
/// server-named queue bound to the brainer exchange on the answer key.
pub fn brainer_answer_ingress() -> Ingress {
    Ingress::builder()
        .with_name("brainer_answers")
        .with_exchange(BRAINER_EXCHANGE)
        .with_binding_key(ROUTING_KEY_ANSWER)
        .exclusive()
        .build()
}

/// The inbound route of a brainer: an exclusive server-named queue bound to
/// the brainer exchange on the question key, so every brainer sees every
/// forwarded question.
pub fn brainer_question_ingress() -> Ingress {
    Ingress::builder()
        .with_name("brainer_questions")
        .with_exchange(BRAINER_EXCHANGE)
        .with_binding_key(ROUTING_KEY_QUESTION)
        .exclusive()
        .build()
}

/// The inbound route of an asker's reply listener: an exclusive server-named
/// queue whose broker-assigned name travels as the `reply_to` of every ask.
pub fn reply_ingress() -> Ingress {
    Ingress::builder().with_name("replies").exclusive().build()
}

/// The outbound route of an asker: straight to the durable question queue
/// through the default exchange. The asker declares the queue itself, so
/// questions survive even when no memory is up yet.
pub fn asker_question_egress() -> Egress {
    Egress::builder()
        .with_name("asker_questions")
        .with_routing_key(ASKER_QUESTION_QUEUE)
        .declaring_queue()
        .build()
}

/// The outbound route of a memory's brainer broadcast.
pub fn brainer_question_egress() -> Egress {
    Egress::builder()
        .with_name("brainer_questions")
        .with_exchange(BRAINER_EXCHANGE)
        .with_routing_key(ROUTING_KEY_QUESTION)
        .declaring_exchange()
        .build()
}

/// The outbound route of a brainer's answers.
pub fn brainer_answer_egress() -> Egress {
    Egress::builder()
        .with_name("brainer_answers")
        .with_exchange(BRAINER_EXCHANGE)
        .with_routing_key(ROUTING_KEY_ANSWER)
        .declaring_exchange()
        .build()
}

/// The outbound route of a memory's replies: the default exchange, with the
/// target queue supplied per dispatch as the routing key.
pub fn reply_egress() -> Egress {
    Egress::builder().with_name("replies").build()
}
