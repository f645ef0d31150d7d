use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use crate::domain::utils::id::{ContentId, NodeId, UserId};

/// Something the control plane reacts to.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlEvent {
    /// A viewer starts a session. `server` defaults to the origin.
    ViewerArrival { user: UserId, content: ContentId, server: Option<NodeId> },
    /// Bytes received on the link `(src, dst)` since the last event.
    LinkTraffic { src: NodeId, dst: NodeId, bytes: u64 },
    MonitorTick,
    /// Turns every warmed cache server on.
    ActivateServers,
}

/// An event together with its simulated time in seconds.
#[derive(Debug, Clone, PartialEq)]
pub struct TimedEvent {
    pub at_s: f64,
    pub event: ControlEvent,
}

impl TimedEvent {
    pub fn new(at_s: f64, event: ControlEvent) -> Self {
        TimedEvent { at_s, event }
    }
}

#[derive(Debug)]
struct Scheduled {
    at_ms: u64,
    seq: u64,
    event: ControlEvent,
}

impl PartialEq for Scheduled {
    fn eq(&self, other: &Self) -> bool {
        (self.at_ms, self.seq) == (other.at_ms, other.seq)
    }
}

impl Eq for Scheduled {}

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Scheduled {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.at_ms, self.seq).cmp(&(other.at_ms, other.seq))
    }
}

/// Discrete event queue with millisecond resolution. Events scheduled for
/// the same instant come out in insertion order.
#[derive(Debug, Default)]
pub struct EventTimeline {
    queue: BinaryHeap<Reverse<Scheduled>>,
    now_ms: u64,
    seq: u64,
}

fn to_ms(seconds: f64) -> u64 {
    (seconds.max(0.0) * 1000.0).round() as u64
}

impl EventTimeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules `event` at `at_s`. Times in the past are clamped to now.
    pub fn schedule_at(&mut self, at_s: f64, event: ControlEvent) {
        let at_ms = to_ms(at_s).max(self.now_ms);
        self.queue.push(Reverse(Scheduled { at_ms, seq: self.seq, event }));
        self.seq += 1;
    }

    /// Schedules `event` `delay_s` seconds after the current clock.
    pub fn schedule_in(&mut self, delay_s: f64, event: ControlEvent) {
        self.schedule_at(self.now_s() + delay_s, event);
    }

    /// Removes the earliest event and advances the clock to it.
    pub fn pop(&mut self) -> Option<TimedEvent> {
        let Reverse(scheduled) = self.queue.pop()?;
        self.now_ms = scheduled.at_ms;
        Some(TimedEvent::new(self.now_s(), scheduled.event))
    }

    pub fn peek_time_s(&self) -> Option<f64> {
        self.queue.peek().map(|Reverse(scheduled)| scheduled.at_ms as f64 / 1000.0)
    }

    pub fn now_s(&self) -> f64 {
        self.now_ms as f64 / 1000.0
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_pop_in_time_then_insertion_order() {
        let mut timeline = EventTimeline::new();
        timeline.schedule_at(2.0, ControlEvent::MonitorTick);
        timeline.schedule_at(1.0, ControlEvent::ActivateServers);
        timeline.schedule_at(2.0, ControlEvent::ActivateServers);

        assert_eq!(timeline.pop(), Some(TimedEvent::new(1.0, ControlEvent::ActivateServers)));
        assert_eq!(timeline.pop(), Some(TimedEvent::new(2.0, ControlEvent::MonitorTick)));
        assert_eq!(timeline.pop(), Some(TimedEvent::new(2.0, ControlEvent::ActivateServers)));
        assert!(timeline.pop().is_none());
        assert_eq!(timeline.now_s(), 2.0);
    }

    #[test]
    fn test_past_events_are_clamped_to_now() {
        let mut timeline = EventTimeline::new();
        timeline.schedule_at(5.0, ControlEvent::MonitorTick);
        timeline.pop();

        timeline.schedule_at(1.0, ControlEvent::ActivateServers);
        assert_eq!(timeline.peek_time_s(), Some(5.0));
    }

    #[test]
    fn test_schedule_in_is_relative_to_the_clock() {
        let mut timeline = EventTimeline::new();
        timeline.schedule_at(1.5, ControlEvent::MonitorTick);
        timeline.pop();

        timeline.schedule_in(2.0, ControlEvent::MonitorTick);
        assert_eq!(timeline.peek_time_s(), Some(3.5));
    }
}
