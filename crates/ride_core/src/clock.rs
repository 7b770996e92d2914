//! Discrete-event clock driving every timer in the orchestrator.
//!
//! Time is simulated milliseconds. Both scheduling primitives (repeating ticks
//! and one-shot deadlines) are plain events: a tick handler re-arms the next
//! tick itself, a deadline handler does not. Every scheduled event gets a
//! [TimerId] so the owning state machine can cancel it synchronously.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use bevy_ecs::prelude::Resource;

use crate::driver::DriverPhase;
use crate::rider::RiderPhase;

pub const ONE_SEC_MS: u64 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum EventKind {
    /// Rider-side 1 Hz tick (countdown, marker, minutes to destination).
    RiderTick,
    /// Rider-side phase deadline.
    RiderPhaseDeadline,
    /// Driver-side search delay elapsed: a request is found.
    DriverSearchDeadline,
    /// Driver-side request countdown tick.
    DriverRequestCountdown,
    /// Driver-side simulated drive step (toward pickup or dropoff).
    DriverDriveStep,
}

/// Which machine armed an event, and in which phase. Handlers compare the phase
/// against the machine's current phase before applying any effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventSubject {
    Rider(RiderPhase),
    Driver(DriverPhase),
}

/// Handle to a scheduled event. Ids increase monotonically, so they also encode
/// scheduling order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    pub id: TimerId,
    pub timestamp: u64,
    pub kind: EventKind,
    pub subject: Option<EventSubject>,
}

impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering to make BinaryHeap a min-heap by timestamp; ties pop
        // in scheduling order.
        other
            .timestamp
            .cmp(&self.timestamp)
            .then_with(|| other.id.cmp(&self.id))
    }
}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// The event currently being processed by the schedule.
#[derive(Debug, Clone, Copy, Resource)]
pub struct CurrentEvent(pub Event);

#[derive(Debug, Default, Resource)]
pub struct SimulationClock {
    now: u64,
    next_id: u64,
    events: BinaryHeap<Event>,
}

impl SimulationClock {
    pub fn now(&self) -> u64 {
        self.now
    }

    pub fn schedule_at(
        &mut self,
        timestamp: u64,
        kind: EventKind,
        subject: Option<EventSubject>,
    ) -> TimerId {
        debug_assert!(
            timestamp >= self.now,
            "event timestamp must be >= current time"
        );
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.events.push(Event {
            id,
            timestamp: timestamp.max(self.now),
            kind,
            subject,
        });
        id
    }

    pub fn schedule_in(
        &mut self,
        delay_ms: u64,
        kind: EventKind,
        subject: Option<EventSubject>,
    ) -> TimerId {
        self.schedule_at(self.now.saturating_add(delay_ms), kind, subject)
    }

    pub fn schedule_in_secs(
        &mut self,
        secs: u64,
        kind: EventKind,
        subject: Option<EventSubject>,
    ) -> TimerId {
        self.schedule_in(secs * ONE_SEC_MS, kind, subject)
    }

    /// Removes a pending event. Returns `false` if it already fired or was cancelled.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        let before = self.events.len();
        self.events.retain(|event| event.id != id);
        self.events.len() != before
    }

    pub fn is_pending(&self, id: TimerId) -> bool {
        self.events.iter().any(|event| event.id == id)
    }

    pub fn pop_next(&mut self) -> Option<Event> {
        let event = self.events.pop()?;
        self.now = event.timestamp;
        Some(event)
    }

    pub fn next_event_time(&self) -> Option<u64> {
        self.events.peek().map(|event| event.timestamp)
    }

    /// Moves `now` forward without processing anything. Never moves backwards
    /// and never past a pending event.
    pub fn advance_to(&mut self, timestamp: u64) {
        let limit = self.next_event_time().unwrap_or(u64::MAX);
        self.now = self.now.max(timestamp.min(limit));
    }

    pub fn pending_count(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// Timer handles owned by one state machine: at most one repeating tick and one
/// phase deadline. Arming a slot cancels whatever it held before.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TimerSlots {
    tick: Option<TimerId>,
    deadline: Option<TimerId>,
}

impl TimerSlots {
    pub fn arm_tick(
        &mut self,
        clock: &mut SimulationClock,
        delay_ms: u64,
        kind: EventKind,
        subject: EventSubject,
    ) {
        if let Some(previous) = self.tick.take() {
            clock.cancel(previous);
        }
        self.tick = Some(clock.schedule_in(delay_ms, kind, Some(subject)));
    }

    pub fn arm_deadline(
        &mut self,
        clock: &mut SimulationClock,
        delay_ms: u64,
        kind: EventKind,
        subject: EventSubject,
    ) {
        if let Some(previous) = self.deadline.take() {
            clock.cancel(previous);
        }
        self.deadline = Some(clock.schedule_in(delay_ms, kind, Some(subject)));
    }

    /// Forget a handle whose event is being processed right now.
    pub fn fired(&mut self, id: TimerId) {
        if self.tick == Some(id) {
            self.tick = None;
        }
        if self.deadline == Some(id) {
            self.deadline = None;
        }
    }

    pub fn cancel_all(&mut self, clock: &mut SimulationClock) {
        if let Some(tick) = self.tick.take() {
            clock.cancel(tick);
        }
        if let Some(deadline) = self.deadline.take() {
            clock.cancel(deadline);
        }
    }

    pub fn tick(&self) -> Option<TimerId> {
        self.tick
    }

    pub fn deadline(&self) -> Option<TimerId> {
        self.deadline
    }

    pub fn armed_count(&self) -> usize {
        usize::from(self.tick.is_some()) + usize::from(self.deadline.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_pops_events_in_time_order() {
        let mut clock = SimulationClock::default();
        clock.schedule_at(10, EventKind::RiderTick, None);
        clock.schedule_at(5, EventKind::RiderTick, None);
        clock.schedule_at(20, EventKind::RiderTick, None);

        let first = clock.pop_next().expect("first event");
        assert_eq!(first.timestamp, 5);
        assert_eq!(clock.now(), 5);

        let second = clock.pop_next().expect("second event");
        assert_eq!(second.timestamp, 10);
        assert_eq!(clock.now(), 10);

        let third = clock.pop_next().expect("third event");
        assert_eq!(third.timestamp, 20);
        assert_eq!(clock.now(), 20);

        assert!(clock.pop_next().is_none());
        assert!(clock.is_empty());
    }

    #[test]
    fn equal_timestamps_pop_in_scheduling_order() {
        let mut clock = SimulationClock::default();
        let deadline = clock.schedule_at(1000, EventKind::RiderPhaseDeadline, None);
        let tick = clock.schedule_at(1000, EventKind::RiderTick, None);

        assert_eq!(clock.pop_next().expect("first").id, deadline);
        assert_eq!(clock.pop_next().expect("second").id, tick);
    }

    #[test]
    fn cancelled_events_never_fire() {
        let mut clock = SimulationClock::default();
        let keep = clock.schedule_in_secs(1, EventKind::DriverSearchDeadline, None);
        let dropped = clock.schedule_in_secs(2, EventKind::DriverRequestCountdown, None);

        assert!(clock.cancel(dropped));
        assert!(!clock.cancel(dropped), "second cancel is a no-op");
        assert!(clock.is_pending(keep));

        assert_eq!(clock.pop_next().expect("kept").id, keep);
        assert!(clock.pop_next().is_none());
    }

    #[test]
    fn advance_to_stops_at_next_pending_event() {
        let mut clock = SimulationClock::default();
        clock.schedule_at(500, EventKind::RiderTick, None);
        clock.advance_to(2000);
        assert_eq!(clock.now(), 500);

        clock.pop_next();
        clock.advance_to(2000);
        assert_eq!(clock.now(), 2000);
        clock.advance_to(100);
        assert_eq!(clock.now(), 2000, "clock never moves backwards");
    }

    #[test]
    fn timer_slots_replace_previous_handles() {
        let mut clock = SimulationClock::default();
        let mut slots = TimerSlots::default();
        let subject = EventSubject::Rider(RiderPhase::InProgress);

        slots.arm_tick(&mut clock, ONE_SEC_MS, EventKind::RiderTick, subject);
        slots.arm_tick(&mut clock, ONE_SEC_MS, EventKind::RiderTick, subject);
        slots.arm_deadline(&mut clock, 10 * ONE_SEC_MS, EventKind::RiderPhaseDeadline, subject);
        assert_eq!(clock.pending_count(), 2);
        assert_eq!(slots.armed_count(), 2);

        slots.cancel_all(&mut clock);
        assert!(clock.is_empty());
        assert_eq!(slots.armed_count(), 0);
    }
}
