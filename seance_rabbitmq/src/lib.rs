#![deny(missing_docs)]
#![cfg_attr(test, deny(warnings))]

//! A thin transport layer over the `lapin` crate, shaped for the needs of the
//! seance agents: DSN-based connection handles, declarative inbound and
//! outbound routes, a decoding subscriber with manual acknowledgement, and a
//! fire-and-forget-capable publisher.

/// Exposes the connection handle (credentials + DSN composition).
mod handle;
pub use self::handle::{DsnChunks, Handle, HandleError};

/// Exposes the machinery for opening a connection and minting channels.
mod connector;
pub use self::connector::{ConnectError, Connector};

/// Exposes the inbound/outbound route definitions.
mod routing;
pub use self::routing::{Egress, EgressBuilder, Ingress, IngressBuilder};

/// Exposes the payload decoding seam.
mod decoder;
pub use self::decoder::{Decoder, JsonDecoder};

/// Exposes the incoming message wrapper.
mod envelope;
pub use self::envelope::Envelope;

/// Exposes the consuming side of the transport.
mod subscriber;
pub use self::subscriber::{DeclarationError, JsonSubscriber, Subscriber};

/// Exposes the publishing side of the transport.
mod publisher;
pub use self::publisher::{Dispatch, DispatchBuilder, Publisher, PublishingError};
