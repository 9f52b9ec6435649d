use std::sync::Arc;

/// Defines an inbound path for messages consumed from a RabbitMQ cluster: the
/// queue to declare (possibly server-named), its properties, the optional
/// direct exchange to declare and bind to, and the channel prefetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ingress {
    name: Arc<str>,
    queue: Arc<str>,
    durable: bool,
    exclusive: bool,
    auto_delete: bool,
    prefetch_count: Option<u16>,
    exchange: Option<Arc<str>>,
    binding_key: Arc<str>,
}

/// Defines an outbound path for messages published into a RabbitMQ cluster.
///
/// An empty `exchange` targets the built-in default exchange, where the
/// routing key addresses a queue directly; a dispatch-level routing key
/// override ([`Dispatch::routing_key`](crate::Dispatch)) takes precedence over
/// the egress-level key, which is how replies are steered to per-asker queues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Egress {
    name: Arc<str>,
    exchange: Arc<str>,
    routing_key: Arc<str>,
    declare_exchange: bool,
    declare_queue: bool,
}

impl Ingress {
    /// Creates a new [`IngressBuilder`].
    pub fn builder() -> IngressBuilder {
        IngressBuilder::new()
    }
}

impl Ingress {
    /// Reports the ingress name for this definition.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Reports the queue name to declare; an empty name requests a
    /// server-named queue.
    pub fn queue(&self) -> &str {
        &self.queue
    }

    /// Reports whether the queue is declared durable.
    pub fn durable(&self) -> bool {
        self.durable
    }

    /// Reports whether the queue is declared exclusive to this connection.
    pub fn exclusive(&self) -> bool {
        self.exclusive
    }

    /// Reports whether the queue is declared auto-delete.
    pub fn auto_delete(&self) -> bool {
        self.auto_delete
    }

    /// Reports the prefetch count to set on the consuming channel, if any.
    pub fn prefetch_count(&self) -> Option<u16> {
        self.prefetch_count
    }

    /// Reports the direct exchange to declare and bind the queue to, if any.
    pub fn exchange(&self) -> Option<&str> {
        self.exchange.as_deref()
    }

    /// Reports the binding key used when binding the queue to the exchange.
    pub fn binding_key(&self) -> &str {
        &self.binding_key
    }
}

/// Builds an [`Ingress`] incrementally.
#[derive(Debug)]
pub struct IngressBuilder {
    name: Arc<str>,
    queue: Arc<str>,
    durable: bool,
    exclusive: bool,
    auto_delete: bool,
    prefetch_count: Option<u16>,
    exchange: Option<Arc<str>>,
    binding_key: Arc<str>,
}

impl IngressBuilder {
    /// Creates a new [`Ingress`] builder: a server-named, non-durable,
    /// non-exclusive queue on the default exchange with no prefetch limit.
    pub fn new() -> Self {
        Self {
            name: Arc::from("default"),
            queue: Arc::from(""),
            durable: false,
            exclusive: false,
            auto_delete: false,
            prefetch_count: None,
            exchange: None,
            binding_key: Arc::from(""),
        }
    }

    /// Recreates this builder with the given ingress name.
    pub fn with_name(self, name: impl AsRef<str>) -> Self {
        Self {
            name: Arc::from(name.as_ref()),
            ..self
        }
    }

    /// Recreates this builder with the given queue name.
    pub fn with_queue(self, queue: impl AsRef<str>) -> Self {
        Self {
            queue: Arc::from(queue.as_ref()),
            ..self
        }
    }

    /// Recreates this builder with a durable queue.
    pub fn durable(self) -> Self {
        Self {
            durable: true,
            ..self
        }
    }

    /// Recreates this builder with an exclusive, auto-deleted, server-named
    /// queue (unless a queue name was given explicitly).
    pub fn exclusive(self) -> Self {
        Self {
            exclusive: true,
            auto_delete: true,
            ..self
        }
    }

    /// Recreates this builder with the given channel prefetch count.
    pub fn with_prefetch_count(self, prefetch_count: u16) -> Self {
        Self {
            prefetch_count: Some(prefetch_count),
            ..self
        }
    }

    /// Recreates this builder with the given direct exchange to declare and
    /// bind to.
    pub fn with_exchange(self, exchange: impl AsRef<str>) -> Self {
        Self {
            exchange: Some(Arc::from(exchange.as_ref())),
            ..self
        }
    }

    /// Recreates this builder with the given binding key.
    pub fn with_binding_key(self, binding_key: impl AsRef<str>) -> Self {
        Self {
            binding_key: Arc::from(binding_key.as_ref()),
            ..self
        }
    }

    /// Finalizes and returns the [`Ingress`].
    pub fn build(self) -> Ingress {
        Ingress {
            name: self.name,
            queue: self.queue,
            durable: self.durable,
            exclusive: self.exclusive,
            auto_delete: self.auto_delete,
            prefetch_count: self.prefetch_count,
            exchange: self.exchange,
            binding_key: self.binding_key,
        }
    }
}

impl Default for IngressBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Egress {
    /// Creates a new [`EgressBuilder`].
    pub fn builder() -> EgressBuilder {
        EgressBuilder::new()
    }
}

impl Egress {
    /// Reports the egress name for this definition.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Reports the egress exchange name (empty for the default exchange).
    pub fn exchange(&self) -> &str {
        &self.exchange
    }

    /// Reports the egress routing key.
    pub fn routing_key(&self) -> &str {
        &self.routing_key
    }

    /// Reports whether the publisher should declare the exchange (as a direct
    /// exchange) before publishing to it.
    pub fn declare_exchange(&self) -> bool {
        self.declare_exchange
    }

    /// Reports whether the publisher should declare its target queue (named
    /// by the routing key, durable) before publishing to it. Only meaningful
    /// on the default exchange, where the routing key addresses a queue.
    pub fn declare_queue(&self) -> bool {
        self.declare_queue
    }
}

/// Builds an [`Egress`] incrementally.
#[derive(Debug)]
pub struct EgressBuilder {
    name: Arc<str>,
    exchange: Arc<str>,
    routing_key: Arc<str>,
    declare_exchange: bool,
    declare_queue: bool,
}

impl EgressBuilder {
    /// Creates a new [`Egress`] builder targeting the default exchange with an
    /// empty routing key.
    pub fn new() -> Self {
        Self {
            name: Arc::from("default"),
            exchange: Arc::from(""),
            routing_key: Arc::from(""),
            declare_exchange: false,
            declare_queue: false,
        }
    }

    /// Recreates this builder with the given egress name.
    pub fn with_name(self, name: impl AsRef<str>) -> Self {
        Self {
            name: Arc::from(name.as_ref()),
            ..self
        }
    }

    /// Recreates this builder with the given exchange name.
    pub fn with_exchange(self, exchange: impl AsRef<str>) -> Self {
        Self {
            exchange: Arc::from(exchange.as_ref()),
            ..self
        }
    }

    /// Recreates this builder with the given routing key.
    pub fn with_routing_key(self, routing_key: impl AsRef<str>) -> Self {
        Self {
            routing_key: Arc::from(routing_key.as_ref()),
            ..self
        }
    }

    /// Recreates this builder with exchange declaration enabled.
    pub fn declaring_exchange(self) -> Self {
        Self {
            declare_exchange: true,
            ..self
        }
    }

    /// Recreates this builder with target queue declaration enabled.
    pub fn declaring_queue(self) -> Self {
        Self {
            declare_queue: true,
            ..self
        }
    }

    /// Finalizes and returns the [`Egress`].
    pub fn build(self) -> Egress {
        Egress {
            name: self.name,
            exchange: self.exchange,
            routing_key: self.routing_key,
            declare_exchange: self.declare_exchange,
            declare_queue: self.declare_queue,
        }
    }
}

impl Default for EgressBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn ingress_defaults() {
        // When
        let ingress = Ingress::builder().build();

        // Then
        assert_eq!(ingress.queue(), "");
        assert_eq!(ingress.exchange(), None);
        assert_eq!(ingress.prefetch_count(), None);
        assert!(!ingress.durable());
        assert!(!ingress.exclusive());
    }

    #[test]
    fn ingress_full() {
        // When
        let ingress = Ingress::builder()
            .with_name("answers")
            .with_exchange("brainer_question")
            .with_binding_key("answer")
            .exclusive()
            .build();

        // Then
        assert_eq!(ingress.name(), "answers");
        assert_eq!(ingress.exchange(), Some("brainer_question"));
        assert_eq!(ingress.binding_key(), "answer");
        assert!(ingress.exclusive());
        assert!(ingress.auto_delete());
    }

    #[test]
    fn egress_defaults_target_default_exchange() {
        // When
        let egress = Egress::builder().build();

        // Then
        assert_eq!(egress.exchange(), "");
        assert_eq!(egress.routing_key(), "");
        assert!(!egress.declare_exchange());
    }
}
