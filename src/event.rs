//! Events and the buffered event queue.
//!
//! A device turns every changed object into one [`InputEvent`] and hands it to
//! an [`EventSink`]. The device decides order and content; storage belongs to
//! the sink.
//!
//! ## Value conventions
//! - **Axes:** calibrated physical value (`0..=65535` with default properties).
//! - **Buttons:** `0x80` pressed, `0x00` released.
//! - **Hat (POV):** `-1` centered, otherwise hundredths of a degree clockwise
//!   from up (`0`, `4500`, ... `31500`).

use crate::objects::ObjectId;
use std::collections::VecDeque;
use std::time::Instant;

/// Button value reported while pressed.
pub const BUTTON_PRESSED: i32 = 0x80;
pub const BUTTON_RELEASED: i32 = 0x00;
/// Hat value reported while centered.
pub const HAT_CENTERED: i32 = -1;

/// One calibrated change of one object.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InputEvent {
    pub object: ObjectId,
    /// Index into the active layout's object table.
    pub index: usize,
    pub value: i32,
    /// Capture time; shared by every event decoded from the same sample.
    pub at: Instant,
    /// Strictly increasing across all events of a session.
    pub sequence: u64,
}

/// Receiver of emitted events.
pub trait EventSink {
    fn push(&mut self, event: InputEvent);
}

impl EventSink for Vec<InputEvent> {
    fn push(&mut self, event: InputEvent) {
        Vec::push(self, event);
    }
}

/// Bounded FIFO of events, the "buffered data" view of a device.
///
/// When full, the oldest event is discarded and [`EventQueue::overflowed`]
/// reports it until the next drain.
#[derive(Debug)]
pub struct EventQueue {
    events: VecDeque<InputEvent>,
    capacity: usize,
    overflowed: bool,
}

impl EventQueue {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: VecDeque::with_capacity(capacity),
            capacity,
            overflowed: false,
        }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn overflowed(&self) -> bool {
        self.overflowed
    }

    /// Look at the oldest event without removing it.
    pub fn peek(&self) -> Option<&InputEvent> {
        self.events.front()
    }

    pub fn pop(&mut self) -> Option<InputEvent> {
        self.events.pop_front()
    }

    /// Take everything queued and clear the overflow flag.
    pub fn drain(&mut self) -> Vec<InputEvent> {
        self.overflowed = false;
        self.events.drain(..).collect()
    }

    pub fn clear(&mut self) {
        self.events.clear();
        self.overflowed = false;
    }
}

impl EventSink for EventQueue {
    fn push(&mut self, event: InputEvent) {
        if self.events.len() == self.capacity {
            self.events.pop_front();
            self.overflowed = true;
        }
        self.events.push_back(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ev(sequence: u64) -> InputEvent {
        InputEvent {
            object: ObjectId::button(0),
            index: 0,
            value: BUTTON_PRESSED,
            at: Instant::now(),
            sequence,
        }
    }

    #[test]
    fn queue_is_fifo() {
        let mut q = EventQueue::new(4);
        q.push(ev(1));
        q.push(ev(2));
        assert_eq!(q.len(), 2);
        assert_eq!(q.peek().map(|e| e.sequence), Some(1));
        assert_eq!(q.pop().map(|e| e.sequence), Some(1));
        assert_eq!(q.pop().map(|e| e.sequence), Some(2));
        assert!(q.pop().is_none());
    }

    #[test]
    fn overflow_drops_oldest_until_drained() {
        let mut q = EventQueue::new(2);
        for s in 1..=3 {
            q.push(ev(s));
        }
        assert!(q.overflowed());
        let seqs: Vec<u64> = q.drain().into_iter().map(|e| e.sequence).collect();
        assert_eq!(seqs, vec![2, 3]);
        assert!(!q.overflowed());
        assert!(q.is_empty());
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let mut q = EventQueue::new(0);
        q.push(ev(1));
        assert_eq!(q.capacity(), 1);
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn vec_is_a_sink() {
        let mut v: Vec<InputEvent> = Vec::new();
        EventSink::push(&mut v, ev(9));
        assert_eq!(v.len(), 1);
    }
}
