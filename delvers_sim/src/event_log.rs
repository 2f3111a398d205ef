// Event queues: history, active, and the admission journal.
//
// - `active`: events waiting to be applied, front first. Each entry carries
//   its local Move progress (the index of the last waypoint reached), which is
//   per-replica transit state and never leaves the process.
// - `history`: every event that has completed, in completion order.
// - `journal`: every event admitted from the network, in admission order.
//   Events derived locally (the end-of-turn batch) are not journaled; a
//   replica that replays the journal derives them again at the same point.
//   The server hands the journal to joining clients.
//
// See also: `sim.rs` which drives these queues each tick.

use std::collections::VecDeque;

use crate::event::Event;

#[derive(Clone, Debug, PartialEq)]
pub struct ActiveEvent {
    pub event: Event,
    /// Index into a Move's path of the waypoint the creature last reached.
    /// Zero for every other event kind.
    pub waypoint: usize,
}

impl ActiveEvent {
    pub fn new(event: Event) -> Self {
        Self { event, waypoint: 0 }
    }
}

#[derive(Clone, Debug, Default)]
pub struct EventLog {
    history: Vec<Event>,
    active: VecDeque<ActiveEvent>,
    journal: Vec<Event>,
}

impl EventLog {
    /// Record an event that arrived over the network and queue it.
    pub fn admit(&mut self, event: Event) {
        self.journal.push(event.clone());
        self.active.push_back(ActiveEvent::new(event));
    }

    /// Put locally derived events at the front of the queue, keeping their
    /// order.
    pub fn splice_front(&mut self, batch: Vec<Event>) {
        for event in batch.into_iter().rev() {
            self.active.push_front(ActiveEvent::new(event));
        }
    }

    pub fn pop_front(&mut self) -> Option<ActiveEvent> {
        self.active.pop_front()
    }

    /// Return an unfinished event to the head of the queue.
    pub fn requeue(&mut self, entry: ActiveEvent) {
        self.active.push_front(entry);
    }

    pub fn complete(&mut self, event: Event) {
        self.history.push(event);
    }

    pub fn active(&self) -> impl Iterator<Item = &Event> {
        self.active.iter().map(|a| &a.event)
    }

    pub fn active_len(&self) -> usize {
        self.active.len()
    }

    pub fn history(&self) -> &[Event] {
        &self.history
    }

    pub fn journal(&self) -> &[Event] {
        &self.journal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PlayerId;

    #[test]
    fn splice_goes_ahead_of_admitted_events() {
        let mut log = EventLog::default();
        log.admit(Event::player_ready(PlayerId(1), false));
        log.splice_front(vec![Event::turn_change(false), Event::EnemyTurn]);

        let order: Vec<_> = log.active().cloned().collect();
        assert_eq!(
            order,
            vec![
                Event::turn_change(false),
                Event::EnemyTurn,
                Event::player_ready(PlayerId(1), false),
            ]
        );
        assert_eq!(log.journal(), &[Event::player_ready(PlayerId(1), false)]);
    }

    #[test]
    fn requeued_entry_keeps_progress() {
        let mut log = EventLog::default();
        log.admit(Event::EnemyTurn);
        log.admit(Event::turn_change(true));
        let mut head = log.pop_front().unwrap();
        head.waypoint = 2;
        log.requeue(head);
        let again = log.pop_front().unwrap();
        assert_eq!(again.waypoint, 2);
        assert_eq!(again.event, Event::EnemyTurn);
        log.complete(again.event);
        assert_eq!(log.history().len(), 1);
        assert_eq!(log.active_len(), 1);
    }
}
