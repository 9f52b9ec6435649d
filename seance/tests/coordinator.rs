//! Coordinator scenarios, driven end-to-end through the mailbox against an
//! in-memory store that mirrors the two conditional store operations and an
//! outbound recorder.

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use seance::agent::memory::{
    AskerQuestion, BrainerAnswer, Coordinator, MemoryEnvelope, Outbound, QuestionStore, mailbox,
};
use seance::wire::{QuestionMessage, ReplyMessage};
use seance_mongo::{PendingAsker, QuestionRecord, SettledAnswer, StoreError, normalize_question};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::{Arc, Mutex};

/// An in-memory question store with the same conditional semantics as the
/// production repository: insert-or-append-or-skip on ask, replace-once on
/// answer, pre-image pendings returned from the settle.
#[derive(Default)]
struct FakeStore {
    records: Mutex<HashMap<String, QuestionRecord>>,
    fail_next: Mutex<bool>,
}

impl FakeStore {
    fn seeded(records: impl IntoIterator<Item = QuestionRecord>) -> Arc<Self> {
        let store = Self::default();
        {
            let mut map = store.records.lock().unwrap();
            for record in records {
                map.insert(record.question.clone(), record);
            }
        }

        Arc::new(store)
    }

    fn fail_next(&self) {
        *self.fail_next.lock().unwrap() = true;
    }

    fn record(&self, question: &str) -> Option<QuestionRecord> {
        self.records.lock().unwrap().get(question).cloned()
    }

    fn assert_invariants(&self) {
        for (key, record) in self.records.lock().unwrap().iter() {
            // The key is the normalized question, and the record agrees
            assert_eq!(key, &record.question);
            assert_eq!(normalize_question(&record.question), record.question);

            // An answered record carries no pending askers
            if record.has_answer() {
                assert_eq!(record.pending_askers(), &[]);
            }

            // Pending reply queues are unique
            let mut seen = std::collections::HashSet::new();
            for asker in record.pending_askers() {
                assert!(
                    seen.insert(asker.reply_to.clone()),
                    "duplicate reply_to '{}' pending on '{}'",
                    asker.reply_to,
                    record.question,
                );
            }
        }
    }
}

#[async_trait]
impl QuestionStore for FakeStore {
    async fn enqueue_asker(
        &self,
        question: &str,
        reply_to: &str,
        correlation_id: &str,
    ) -> Result<QuestionRecord, StoreError> {
        if std::mem::take(&mut *self.fail_next.lock().unwrap()) {
            return Err(StoreError::MissingPostImage);
        }

        let question = normalize_question(question);
        if question.is_empty() {
            return Err(StoreError::EmptyQuestion);
        }

        let mut records = self.records.lock().unwrap();
        let record = records
            .entry(question.clone())
            .or_insert_with(|| QuestionRecord {
                question,
                answer: None,
                pending_askers: None,
            });

        if record.answer.is_none() {
            let pending = record.pending_askers.get_or_insert_with(Vec::new);
            if !pending.iter().any(|asker| asker.reply_to == reply_to) {
                pending.push(PendingAsker {
                    reply_to: reply_to.to_string(),
                    correlation_id: correlation_id.to_string(),
                });
            }
        }

        Ok(record.clone())
    }

    async fn settle_answer(
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

        let mut records = self.records.lock().unwrap();
        let settled = match records.entry(question.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(QuestionRecord {
                    question: question.clone(),
                    answer: Some(answer.clone()),
                    pending_askers: None,
                });

                SettledAnswer {
                    question,
                    answer,
                    pending_askers: Vec::new(),
                }
            }
            Entry::Occupied(mut slot) => {
                let record = slot.get_mut();

                match record.answer.clone() {
                    // The earlier answer wins; the duplicate observes no pendings
                    Some(known) => SettledAnswer {
                        question,
                        answer: known,
                        pending_askers: Vec::new(),
                    },
                    None => {
                        let pending = record.pending_askers.take().unwrap_or_default();
                        record.answer = Some(answer.clone());

                        SettledAnswer {
                            question,
                            answer,
                            pending_askers: pending,
                        }
                    }
                }
            }
        };

        Ok(settled)
    }
}

/// Everything the coordinator published, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Published {
    Reply {
        reply_to: String,
        correlation_id: String,
        reply: ReplyMessage,
    },
    Forward(QuestionMessage),
}

#[derive(Default)]
struct RecordingOutbound {
    published: Mutex<Vec<Published>>,
}

impl RecordingOutbound {
    fn published(&self) -> Vec<Published> {
        self.published.lock().unwrap().clone()
    }

    fn replies(&self) -> Vec<Published> {
        self.published()
            .into_iter()
            .filter(|entry| matches!(entry, Published::Reply { .. }))
            .collect()
    }

    fn forwards(&self) -> Vec<Published> {
        self.published()
            .into_iter()
            .filter(|entry| matches!(entry, Published::Forward(_)))
            .collect()
    }
}

#[async_trait]
impl Outbound for RecordingOutbound {
    async fn reply(&self, reply_to: &str, correlation_id: &str, reply: ReplyMessage) {
        self.published.lock().unwrap().push(Published::Reply {
            reply_to: reply_to.to_string(),
            correlation_id: correlation_id.to_string(),
            reply,
        });
    }

    async fn forward(&self, question: QuestionMessage) {
        self.published
            .lock()
            .unwrap()
            .push(Published::Forward(question));
    }
}

fn ask(question: &str, reply_to: &str, correlation_id: &str) -> MemoryEnvelope {
    MemoryEnvelope::Question(AskerQuestion {
        question: question.to_string(),
        reply_to: reply_to.to_string(),
        correlation_id: correlation_id.to_string(),
    })
}

fn answer(question: &str, answer: &str) -> MemoryEnvelope {
    MemoryEnvelope::Answer(BrainerAnswer {
        question: question.to_string(),
        answer: answer.to_string(),
    })
}

fn reply(reply_to: &str, correlation_id: &str, question: &str, answer: &str) -> Published {
    Published::Reply {
        reply_to: reply_to.to_string(),
        correlation_id: correlation_id.to_string(),
        reply: ReplyMessage {
            question: question.to_string(),
            answer: answer.to_string(),
        },
    }
}

fn forward(question: &str) -> Published {
    Published::Forward(QuestionMessage {
        question: question.to_string(),
    })
}

/// Feeds the given envelopes through a coordinator and runs it until the
/// mailbox drains.
async fn run_coordinator(
    store: &Arc<FakeStore>,
    envelopes: Vec<MemoryEnvelope>,
) -> Arc<RecordingOutbound> {
    let (sender, receiver) = mailbox();
    for envelope in envelopes {
        sender.send(envelope).unwrap();
    }
    drop(sender);

    let outbound = Arc::new(RecordingOutbound::default());

    Coordinator::new(Arc::clone(store), Arc::clone(&outbound), receiver)
        .run()
        .await
        .unwrap();

    store.assert_invariants();

    outbound
}

#[tokio::test]
async fn cache_hit_replies_without_broadcasting() {
    // Given: the store already knows the answer
    let store = FakeStore::seeded([QuestionRecord {
        question: "what is ntp".to_string(),
        answer: Some("network time protocol".to_string()),
        pending_askers: None,
    }]);

    // When: an asker asks the same question, differently cased
    let outbound = run_coordinator(&store, vec![ask("What is NTP", "q.a1", "c1")]).await;

    // Then: one direct reply, no brainer broadcast, record untouched
    assert_eq!(
        outbound.published(),
        vec![reply("q.a1", "c1", "what is ntp", "network time protocol")],
    );
    assert_eq!(
        store.record("what is ntp"),
        Some(QuestionRecord {
            question: "what is ntp".to_string(),
            answer: Some("network time protocol".to_string()),
            pending_askers: None,
        }),
    );
}

#[tokio::test]
async fn first_ask_records_the_asker_and_broadcasts() {
    // Given
    let store = FakeStore::seeded([]);

    // When
    let outbound =
        run_coordinator(&store, vec![ask("Capital of France?", "q.a1", "c1")]).await;

    // Then
    assert_eq!(outbound.published(), vec![forward("capital of france?")]);
    assert_eq!(
        store.record("capital of france?"),
        Some(QuestionRecord {
            question: "capital of france?".to_string(),
            answer: None,
            pending_askers: Some(vec![PendingAsker {
                reply_to: "q.a1".to_string(),
                correlation_id: "c1".to_string(),
            }]),
        }),
    );
}

#[tokio::test]
async fn answer_settles_and_replies_to_the_pending_asker() {
    // Given
    let store = FakeStore::seeded([]);

    // When: an ask, then the answer (with untrimmed, differently cased text)
    let outbound = run_coordinator(
        &store,
        vec![
            ask("Capital of France?", "q.a1", "c1"),
            answer("  Capital of France?  ", "Paris"),
        ],
    )
    .await;

    // Then: one broadcast, then one reply; the record is settled with no
    // pending askers left
    assert_eq!(
        outbound.published(),
        vec![
            forward("capital of france?"),
            reply("q.a1", "c1", "capital of france?", "Paris"),
        ],
    );
    assert_eq!(
        store.record("capital of france?"),
        Some(QuestionRecord {
            question: "capital of france?".to_string(),
            answer: Some("Paris".to_string()),
            pending_askers: None,
        }),
    );
}

#[tokio::test]
async fn answer_fans_out_to_every_pending_asker() {
    // Given
    let store = FakeStore::seeded([]);

    // When: two askers, then the answer
    let outbound = run_coordinator(
        &store,
        vec![
            ask("foo", "q.a1", "c1"),
            ask("foo", "q.a2", "c2"),
            answer("foo", "bar"),
        ],
    )
    .await;

    // Then: a broadcast per ask (broadcasts are not deduplicated), then one
    // reply per pending asker
    assert_eq!(outbound.forwards(), vec![forward("foo"), forward("foo")]);
    assert_eq!(
        outbound.replies(),
        vec![
            reply("q.a1", "c1", "foo", "bar"),
            reply("q.a2", "c2", "foo", "bar"),
        ],
    );
    assert_eq!(
        store.record("foo"),
        Some(QuestionRecord {
            question: "foo".to_string(),
            answer: Some("bar".to_string()),
            pending_askers: None,
        }),
    );
}

#[tokio::test]
async fn re_ask_from_the_same_reply_queue_is_deduplicated() {
    // Given
    let store = FakeStore::seeded([]);

    // When: the same asker re-asks with a fresh correlation id
    let outbound = run_coordinator(
        &store,
        vec![ask("foo", "q.a1", "c1"), ask("foo", "q.a1", "c2")],
    )
    .await;

    // Then: the pending set keeps exactly one entry, under the original
    // correlation id; the broadcast itself is not deduplicated
    assert_eq!(
        store.record("foo"),
        Some(QuestionRecord {
            question: "foo".to_string(),
            answer: None,
            pending_askers: Some(vec![PendingAsker {
                reply_to: "q.a1".to_string(),
                correlation_id: "c1".to_string(),
            }]),
        }),
    );
    assert_eq!(outbound.forwards().len(), 2);
}

#[tokio::test]
async fn duplicate_answer_is_absorbed() {
    // Given: the question is already settled
    let store = FakeStore::seeded([QuestionRecord {
        question: "foo".to_string(),
        answer: Some("bar".to_string()),
        pending_askers: None,
    }]);

    // When: a second brainer races in late with a different answer
    let outbound = run_coordinator(&store, vec![answer("foo", "baz")]).await;

    // Then: nothing is published and the first answer stands
    assert_eq!(outbound.published(), vec![]);
    assert_eq!(
        store.record("foo"),
        Some(QuestionRecord {
            question: "foo".to_string(),
            answer: Some("bar".to_string()),
            pending_askers: None,
        }),
    );
}

#[tokio::test]
async fn answer_arriving_before_any_ask_is_cached() {
    // Given
    let store = FakeStore::seeded([]);

    // When: the answer beats the question to the store
    let outbound = run_coordinator(
        &store,
        vec![answer("foo", "bar"), ask("foo", "q.a1", "c1")],
    )
    .await;

    // Then: no broadcast at all; the ask lands on the cached-answer path
    assert_eq!(outbound.published(), vec![reply("q.a1", "c1", "foo", "bar")]);
}

#[tokio::test]
async fn blank_questions_and_answers_are_dropped() {
    // Given
    let store = FakeStore::seeded([]);

    // When
    let outbound = run_coordinator(
        &store,
        vec![ask("   ", "q.a1", "c1"), answer("foo", "   ")],
    )
    .await;

    // Then: nothing is stored, nothing is published
    assert_eq!(outbound.published(), vec![]);
    assert_eq!(store.record(""), None);
    assert_eq!(store.record("foo"), None);
}

#[tokio::test]
async fn replaying_an_ask_leaves_the_store_unchanged() {
    // Given
    let store = FakeStore::seeded([]);

    // When: the same (question, reply queue) is replayed several times
    let _ = run_coordinator(
        &store,
        vec![
            ask("foo", "q.a1", "c1"),
            ask("foo", "q.a1", "c1"),
            ask("foo", "q.a1", "c1"),
        ],
    )
    .await;

    // Then: same state as a single ask
    assert_eq!(
        store.record("foo"),
        Some(QuestionRecord {
            question: "foo".to_string(),
            answer: None,
            pending_askers: Some(vec![PendingAsker {
                reply_to: "q.a1".to_string(),
                correlation_id: "c1".to_string(),
            }]),
        }),
    );
}

#[tokio::test]
async fn replaying_an_answer_fans_out_exactly_once() {
    // Given
    let store = FakeStore::seeded([]);

    // When
    let outbound = run_coordinator(
        &store,
        vec![
            ask("foo", "q.a1", "c1"),
            answer("foo", "bar"),
            answer("foo", "bar"),
            answer("foo", "bar"),
        ],
    )
    .await;

    // Then: a single reply despite three identical answers
    assert_eq!(outbound.replies(), vec![reply("q.a1", "c1", "foo", "bar")]);
}

#[tokio::test]
async fn a_store_failure_does_not_affect_subsequent_envelopes() {
    // Given
    let store = FakeStore::seeded([]);
    store.fail_next();

    // When: the first envelope hits a store error, the second is fine
    let outbound = run_coordinator(
        &store,
        vec![ask("doomed", "q.a1", "c1"), ask("foo", "q.a2", "c2")],
    )
    .await;

    // Then: the loop carried on; only the second ask took effect
    assert_eq!(store.record("doomed"), None);
    assert_eq!(outbound.published(), vec![forward("foo")]);
}
