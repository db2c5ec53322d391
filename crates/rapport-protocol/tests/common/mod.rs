//! Test harness driving the processor and propagators over a MemoryStore
//!
//! Each transition keeps its own cursor into the change log, the way each
//! propagation worker keeps its own checkpoint.

#![allow(dead_code)]

use rapport_domain::{ChangeEvent, EdgeKey, EdgeState, Identity, RelationshipStore};
use rapport_protocol::{ActionProcessor, FriendAction, Outcome, Propagator, ProtocolError, Transition};
use rapport_store::MemoryStore;
use std::collections::HashMap;

/// Upper bound on events handled by one drain; the protocol needs far fewer
const DRAIN_LIMIT: usize = 64;

pub struct Harness {
    pub store: MemoryStore,
    cursors: HashMap<Transition, u64>,
    clock: u64,
    pub redeliver: bool,
    /// Set once a consumer handles an event while an earlier one is still
    /// waiting in another consumer
    pub overtaken: bool,
    /// Set once an action commits while events are still undelivered
    pub acted_in_flight: bool,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            store: MemoryStore::new(),
            cursors: HashMap::new(),
            clock: 0,
            redeliver: false,
            overtaken: false,
            acted_in_flight: false,
        }
    }

    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    fn cursor(&self, transition: Transition) -> u64 {
        self.cursors.get(&transition).copied().unwrap_or(0)
    }

    /// Run one action through the processor
    pub fn act(&mut self, action: FriendAction, actor: &str, target: &str) -> Outcome {
        if !self.undelivered().is_empty() {
            self.acted_in_flight = true;
        }
        let at = self.tick();
        ActionProcessor
            .process(&self.store, action, &Identity::new(actor), &Identity::new(target), at)
            .unwrap()
    }

    /// Routed events some consumer has not handled yet, in commit order
    pub fn undelivered(&self) -> Vec<ChangeEvent> {
        self.store
            .change_log()
            .unwrap()
            .into_iter()
            .filter(|e| Transition::route(e).is_some_and(|t| e.sequence > self.cursor(t)))
            .collect()
    }

    /// Events waiting for one consumer, in commit order
    pub fn pending(&self, transition: Transition) -> Vec<ChangeEvent> {
        self.undelivered()
            .into_iter()
            .filter(|e| Transition::route(e) == Some(transition))
            .collect()
    }

    /// Deliver one event to the propagator its filter routes to
    pub fn deliver(&mut self, event: &ChangeEvent) -> Result<Outcome, ProtocolError> {
        let Some(transition) = Transition::route(event) else {
            return Ok(Outcome::NoOp);
        };
        if self.undelivered().iter().any(|e| e.sequence < event.sequence) {
            self.overtaken = true;
        }
        let cursor = self.cursor(transition).max(event.sequence);
        self.cursors.insert(transition, cursor);

        let at = self.tick();
        let outcome = transition.propagate(&self.store, event, at)?;
        if self.redeliver {
            let at = self.tick();
            let replay = transition.propagate(&self.store, event, at)?;
            assert_eq!(replay, Outcome::NoOp, "redelivery of {:?} changed state", event);
        }
        Ok(outcome)
    }

    /// Deliver the given events in the given order
    pub fn deliver_all(&mut self, events: &[ChangeEvent]) -> Vec<Outcome> {
        events.iter().map(|e| self.deliver(e).unwrap()).collect()
    }

    /// Let one consumer handle its next event, if it has one
    pub fn step(&mut self, transition: Transition) -> Option<Outcome> {
        let event = self.pending(transition).into_iter().next()?;
        Some(self.deliver(&event).unwrap())
    }

    /// Deliver the oldest undelivered event across all consumers
    pub fn step_in_order(&mut self) -> Option<Outcome> {
        let event = self.undelivered().into_iter().next()?;
        Some(self.deliver(&event).unwrap())
    }

    /// Deliver every undelivered event in commit order until nothing changes
    pub fn drain(&mut self) -> Vec<Outcome> {
        let mut outcomes = Vec::new();
        for _ in 0..DRAIN_LIMIT {
            match self.step_in_order() {
                Some(outcome) => outcomes.push(outcome),
                None => return outcomes,
            }
        }
        panic!("propagation did not reach a fixed point");
    }

    pub fn state(&self, owner: &str, peer: &str) -> Option<EdgeState> {
        self.store
            .get_edge(&EdgeKey::new(owner, peer))
            .unwrap()
            .map(|e| e.state)
    }

    pub fn pair(&self, a: &str, b: &str) -> (Option<EdgeState>, Option<EdgeState>) {
        (self.state(a, b), self.state(b, a))
    }
}

/// Whether the pair is settled, or waiting only on the other peer to answer
pub fn is_consistent(pair: (Option<EdgeState>, Option<EdgeState>)) -> bool {
    use EdgeState::*;
    matches!(
        pair,
        (None, None)
            | (Some(Friends), Some(Friends))
            | (Some(Requested), Some(Pending))
            | (Some(Pending), Some(Requested))
    )
}
