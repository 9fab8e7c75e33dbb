//! Event source seam for the ingestion worker.
//!
//! The real queue (and its backoff/redelivery policy) is an external
//! collaborator. The worker only needs pull / ack / nack; a negative
//! acknowledgement hands the message back for redelivery. The in-memory
//! implementation backs tests and local runs.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

/// One delivered message. The `delivery_id` identifies this delivery, not
/// the underlying message: a redelivered message gets a new id.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub delivery_id: u64,
    pub payload: Vec<u8>,
}

pub trait EventSource: Send + Sync {
    /// Take the next available message, if any.
    fn pull(&self) -> Option<Delivery>;

    /// Positive acknowledgement: the message is done.
    fn ack(&self, delivery_id: u64);

    /// Negative acknowledgement: redeliver later.
    fn nack(&self, delivery_id: u64);
}

#[derive(Default)]
struct QueueState {
    ready: VecDeque<Vec<u8>>,
    in_flight: HashMap<u64, Vec<u8>>,
    next_id: u64,
}

/// In-memory queue with immediate redelivery of nacked messages.
#[derive(Default)]
pub struct InMemoryQueue {
    state: Mutex<QueueState>,
}

impl InMemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, payload: Vec<u8>) {
        self.state.lock().unwrap().ready.push_back(payload);
    }

    /// Messages currently awaiting pull (excludes in-flight).
    pub fn ready_len(&self) -> usize {
        self.state.lock().unwrap().ready.len()
    }

    pub fn in_flight_len(&self) -> usize {
        self.state.lock().unwrap().in_flight.len()
    }
}

impl EventSource for InMemoryQueue {
    fn pull(&self) -> Option<Delivery> {
        let mut state = self.state.lock().unwrap();
        let payload = state.ready.pop_front()?;
        state.next_id += 1;
        let delivery_id = state.next_id;
        state.in_flight.insert(delivery_id, payload.clone());
        Some(Delivery {
            delivery_id,
            payload,
        })
    }

    fn ack(&self, delivery_id: u64) {
        self.state.lock().unwrap().in_flight.remove(&delivery_id);
    }

    fn nack(&self, delivery_id: u64) {
        let mut state = self.state.lock().unwrap();
        if let Some(payload) = state.in_flight.remove(&delivery_id) {
            state.ready.push_back(payload);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ack_removes_message() {
        let queue = InMemoryQueue::new();
        queue.publish(b"one".to_vec());

        let delivery = queue.pull().unwrap();
        assert_eq!(delivery.payload, b"one");
        assert_eq!(queue.in_flight_len(), 1);

        queue.ack(delivery.delivery_id);
        assert_eq!(queue.in_flight_len(), 0);
        assert!(queue.pull().is_none());
    }

    #[test]
    fn nack_redelivers_with_new_id() {
        let queue = InMemoryQueue::new();
        queue.publish(b"retry-me".to_vec());

        let first = queue.pull().unwrap();
        queue.nack(first.delivery_id);

        let second = queue.pull().unwrap();
        assert_eq!(second.payload, b"retry-me");
        assert_ne!(first.delivery_id, second.delivery_id);
    }

    #[test]
    fn pull_order_is_fifo() {
        let queue = InMemoryQueue::new();
        queue.publish(b"a".to_vec());
        queue.publish(b"b".to_vec());

        assert_eq!(queue.pull().unwrap().payload, b"a");
        assert_eq!(queue.pull().unwrap().payload, b"b");
    }
}
