#![deny(missing_docs)]
#![cfg_attr(test, deny(warnings))]

//! The persistent question store of the seance fabric, layered over the
//! official `mongodb` driver.
//!
//! The store holds one document per normalized question, keyed by a unique
//! index, and exposes exactly two operations, both implemented as single
//! atomic `findOneAndUpdate` calls with aggregation-pipeline updates. That
//! atomicity is what the coordinating agent's consistency model rests on:
//! multiple store clients may race freely, and the first write to commit
//! wins.

/// Exposes the connection handle (credentials + DSN composition).
mod handle;
pub use self::handle::{Handle, HandleError};

/// Exposes the machinery for opening a client and reaching the collection.
mod connector;
pub use self::connector::Connector;

/// Exposes the persisted document shapes.
mod record;
pub use self::record::{PendingAsker, QuestionRecord, normalize_question};

/// Exposes the question repository with its two atomic operations.
mod repository;
pub use self::repository::{QuestionRepository, SettledAnswer, StoreError};
