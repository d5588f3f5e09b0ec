//! Automatable parameter (gain) with a timeline of scheduled values.
//!
//! A parameter holds a default value plus a time-ordered list of automation
//! events. Its value at time `t` is:
//! - the value of the last event at or before `t`, or the default if none;
//! - linearly interpolated when the next event after `t` is a linear ramp,
//!   starting from the previous event's time and value.

#![allow(clippy::unwrap_used)] // Tests use unwrap for brevity

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::clock::Clock;

#[derive(Debug, Clone, Copy, PartialEq)]
enum AutomationEvent {
    /// Jump to `value` at `time`.
    SetValue { value: f32, time: f64 },
    /// Reach `value` at `time`, linearly from the previous event.
    LinearRamp { value: f32, time: f64 },
}

impl AutomationEvent {
    const fn time(&self) -> f64 {
        match self {
            Self::SetValue { time, .. } | Self::LinearRamp { time, .. } => *time,
        }
    }

    const fn value(&self) -> f32 {
        match self {
            Self::SetValue { value, .. } | Self::LinearRamp { value, .. } => *value,
        }
    }
}

#[derive(Debug)]
struct Timeline {
    default_value: f32,
    events: Vec<AutomationEvent>,
}

impl Timeline {
    fn value_at(&self, t: f64) -> f32 {
        let mut value = self.default_value;
        let mut anchor: Option<f64> = None;

        for event in &self.events {
            if event.time() <= t {
                value = event.value();
                anchor = Some(event.time());
                continue;
            }

            if let (AutomationEvent::LinearRamp { value: target, time: end }, Some(start)) =
                (event, anchor)
            {
                let span = end - start;
                if span > 0.0 {
                    #[allow(clippy::cast_possible_truncation)]
                    let progress = ((t - start) / span) as f32;
                    return (target - value).mul_add(progress, value);
                }
            }
            break;
        }

        value
    }

    fn insert(&mut self, event: AutomationEvent) {
        let idx = self.events.partition_point(|e| e.time() <= event.time());
        self.events.insert(idx, event);
    }

    fn cancel_from(&mut self, time: f64) {
        self.events.retain(|e| e.time() < time);
    }

    /// Drop events that can no longer affect values at or after `now`.
    fn compact(&mut self, now: f64) {
        let settled = self.events.partition_point(|e| e.time() <= now);
        if settled > 1 {
            self.events.drain(..settled - 1);
        }
    }
}

/// A shared, automatable `f32` parameter bound to an output clock.
///
/// Cloning shares the timeline: the control side schedules changes while the
/// mixer samples values as frames are rendered.
#[derive(Clone)]
pub struct AudioParam {
    timeline: Arc<Mutex<Timeline>>,
    clock: Clock,
}

impl AudioParam {
    pub fn new(default_value: f32, clock: Clock) -> Self {
        Self {
            timeline: Arc::new(Mutex::new(Timeline {
                default_value,
                events: Vec::new(),
            })),
            clock,
        }
    }

    /// Value at the clock's current time.
    pub fn value(&self) -> f32 {
        self.value_at(self.clock.now())
    }

    /// Value at an arbitrary time.
    pub fn value_at(&self, t: f64) -> f32 {
        self.timeline.lock().value_at(t)
    }

    /// Set the value immediately. Automation scheduled from now on is
    /// cancelled so the new value holds.
    pub fn set_value(&self, value: f32) {
        let now = self.clock.now();
        let mut timeline = self.timeline.lock();
        timeline.cancel_from(now);
        timeline.compact(now);
        timeline.default_value = value;
        timeline.insert(AutomationEvent::SetValue { value, time: now });
    }

    /// Jump to `value` at `time`.
    pub fn set_value_at_time(&self, value: f32, time: f64) {
        let mut timeline = self.timeline.lock();
        timeline.compact(self.clock.now());
        timeline.insert(AutomationEvent::SetValue { value, time });
    }

    /// Ramp linearly from the previous event to `value`, arriving at `time`.
    ///
    /// With no earlier event the ramp starts from the current value now.
    pub fn linear_ramp_to_value_at_time(&self, value: f32, time: f64) {
        let now = self.clock.now();
        let mut timeline = self.timeline.lock();
        timeline.compact(now);
        if !timeline.events.iter().any(|e| e.time() <= time) {
            let current = timeline.value_at(now);
            timeline.insert(AutomationEvent::SetValue {
                value: current,
                time: now,
            });
        }
        timeline.insert(AutomationEvent::LinearRamp { value, time });
    }

    /// Remove every event scheduled at or after `time`.
    pub fn cancel_scheduled_values(&self, time: f64) {
        self.timeline.lock().cancel_from(time);
    }

    /// Number of pending automation events.
    pub fn scheduled_events(&self) -> usize {
        self.timeline.lock().events.len()
    }

    /// Fill `out` with values sampled every `step` seconds from `start`,
    /// under a single lock.
    pub(crate) fn sample_block(&self, start: f64, step: f64, out: &mut [f32]) {
        let timeline = self.timeline.lock();
        for (i, value) in out.iter_mut().enumerate() {
            #[allow(clippy::cast_precision_loss)]
            let t = (i as f64).mul_add(step, start);
            *value = timeline.value_at(t);
        }
    }
}

impl fmt::Debug for AudioParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioParam")
            .field("value", &self.value())
            .field("scheduled_events", &self.scheduled_events())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn param(default_value: f32) -> (AudioParam, Clock) {
        let clock = Clock::new(1000);
        (AudioParam::new(default_value, clock.clone()), clock)
    }

    #[test]
    fn test_param_default_value() {
        let (gain, _) = param(0.5);
        assert!((gain.value() - 0.5).abs() < f32::EPSILON);
        assert_eq!(gain.scheduled_events(), 0);
    }

    #[test]
    fn test_set_value_at_time_holds_until_then() {
        let (gain, _) = param(1.0);
        gain.set_value_at_time(0.25, 2.0);
        assert!((gain.value_at(1.999) - 1.0).abs() < f32::EPSILON);
        assert!((gain.value_at(2.0) - 0.25).abs() < f32::EPSILON);
        assert!((gain.value_at(10.0) - 0.25).abs() < f32::EPSILON);
    }

    #[test]
    fn test_linear_ramp_interpolates() {
        let (gain, _) = param(1.0);
        gain.set_value_at_time(1.0, 0.0);
        gain.linear_ramp_to_value_at_time(0.0, 3.0);

        assert!((gain.value_at(0.0) - 1.0).abs() < 1e-6);
        assert!((gain.value_at(1.5) - 0.5).abs() < 1e-6);
        assert!(gain.value_at(3.0).abs() < 1e-6);
        assert!(gain.value_at(3.5).abs() < 1e-6);
    }

    #[test]
    fn test_ramp_without_anchor_starts_now() {
        let (gain, clock) = param(0.0);
        clock.advance(1000); // t = 1s
        gain.linear_ramp_to_value_at_time(1.0, 3.0);

        assert!(gain.value_at(1.0).abs() < 1e-6);
        assert!((gain.value_at(2.0) - 0.5).abs() < 1e-6);
        assert!((gain.value_at(3.0) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_set_value_cancels_pending_ramp() {
        let (gain, clock) = param(1.0);
        gain.set_value_at_time(1.0, 0.0);
        gain.linear_ramp_to_value_at_time(0.0, 3.0);

        clock.advance(1000);
        gain.set_value(0.0);
        assert!(gain.value().abs() < f32::EPSILON);
        assert!(gain.value_at(2.0).abs() < f32::EPSILON);

        gain.set_value(0.0);
        assert!(gain.value_at(5.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_cancel_scheduled_values() {
        let (gain, _) = param(1.0);
        gain.set_value_at_time(0.5, 1.0);
        gain.set_value_at_time(0.1, 2.0);
        gain.cancel_scheduled_values(1.5);

        assert_eq!(gain.scheduled_events(), 1);
        assert!((gain.value_at(5.0) - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_compaction_keeps_anchor() {
        let (gain, clock) = param(1.0);
        gain.set_value_at_time(1.0, 0.0);
        gain.set_value_at_time(0.8, 0.5);
        gain.linear_ramp_to_value_at_time(0.0, 4.0);

        clock.advance(2000); // t = 2s, mid-ramp
        gain.set_value_at_time(0.0, 10.0);

        // 0.0 event dropped, 0.5 anchor kept for the ramp
        assert_eq!(gain.scheduled_events(), 3);
        let expected = 0.8 - 0.8 * (1.5 / 3.5);
        assert!((gain.value_at(2.0) - expected as f32).abs() < 1e-6);
    }

    #[test]
    fn test_sample_block() {
        let (gain, _) = param(0.0);
        gain.set_value_at_time(0.0, 0.0);
        gain.linear_ramp_to_value_at_time(1.0, 0.004);

        let mut out = [0.0f32; 6];
        gain.sample_block(0.0, 0.001, &mut out);
        let expected = [0.0, 0.25, 0.5, 0.75, 1.0, 1.0];
        for (got, want) in out.iter().zip(expected) {
            assert!((got - want).abs() < 1e-5, "{got} != {want}");
        }
    }

    proptest! {
        #[test]
        fn prop_ramp_stays_between_endpoints(
            from in -2.0f32..2.0,
            to in -2.0f32..2.0,
            duration in 0.01f64..10.0,
            frac in 0.0f64..1.0,
        ) {
            let (gain, _) = param(from);
            gain.set_value_at_time(from, 0.0);
            gain.linear_ramp_to_value_at_time(to, duration);

            let value = gain.value_at(duration * frac);
            let (lo, hi) = if from <= to { (from, to) } else { (to, from) };
            prop_assert!(value >= lo - 1e-5 && value <= hi + 1e-5);
            prop_assert!((gain.value_at(duration) - to).abs() < 1e-5);
        }
    }
}
