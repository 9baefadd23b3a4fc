// THEORY:
// The `debouncer` module is the Transition Debouncer, the only stateful stage of the
// pipeline. Tracking is noisy: a cube hidden by a hand for a frame or two makes the
// matched configuration flicker to "nothing" and back. The debouncer turns the raw
// per-frame match into a clean log of configuration changes.
//
// Key architectural principles:
// 1.  **Explicit State**: everything carried between frames lives in `DebounceState`,
//     owned by one `TransitionDebouncer`, owned by one sequential run. Two runs never
//     share state, so independent sequences can be processed in parallel.
// 2.  **Change Detection**: a frame whose match equals the last emitted configuration
//     is ignored entirely, counter included. Any other frame bumps the counter.
// 3.  **Emission Rule**: under the default `Literal` policy an event is emitted
//     exactly when the frame matched a configuration different from the last one
//     emitted. A drop to "no configuration" is never reported, which is what keeps
//     short dropouts out of the log. `DropToAbsent` additionally reports a drop once
//     it has lasted longer than the missing-frame threshold.

use serde::{Deserialize, Serialize};
use tracing::info;

/// How a drop from a configuration to "no configuration" is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DebouncePolicy {
    /// Only transitions into a configuration are reported. Drops are never reported.
    #[default]
    Literal,
    /// Drops are reported too, once they outlast the missing-frame threshold.
    DropToAbsent,
}

/// One entry of the configuration-change log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Event time: the frame timestamp divided by the event time divisor, floored.
    pub time: i64,
    /// The configuration entered, or `None` for a reported drop.
    pub configuration: Option<String>,
}

/// The state carried from one frame to the next.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DebounceState {
    pub last_emitted: Option<String>,
    pub missing_frame_count: u32,
}

/// Decides which per-frame matches become events.
#[derive(Debug, Clone)]
pub struct TransitionDebouncer {
    state: DebounceState,
    missing_frame_threshold: u32,
    event_time_divisor: f64,
    policy: DebouncePolicy,
}

impl TransitionDebouncer {
    pub fn new(missing_frame_threshold: u32, event_time_divisor: f64, policy: DebouncePolicy) -> Self {
        Self {
            state: DebounceState::default(),
            missing_frame_threshold,
            event_time_divisor,
            policy,
        }
    }

    pub fn state(&self) -> &DebounceState {
        &self.state
    }

    /// Feeds one frame's match. Returns the event to append, if the frame is a
    /// reportable transition.
    pub fn observe(&mut self, timestamp: f64, matched: Option<&str>) -> Option<Event> {
        if matched == self.state.last_emitted.as_deref() {
            return None;
        }

        self.state.missing_frame_count = self.state.missing_frame_count.saturating_add(1);

        let sustained_drop = matched.is_none()
            && self.state.last_emitted.is_some()
            && self.state.missing_frame_count > self.missing_frame_threshold;

        let emit = match self.policy {
            // The sustained-absence clause of the legacy rule also requires a match,
            // so it never adds anything here.
            DebouncePolicy::Literal => matched.is_some(),
            DebouncePolicy::DropToAbsent => matched.is_some() || sustained_drop,
        };

        if !emit {
            return None;
        }

        let event = Event {
            time: self.event_time(timestamp),
            configuration: matched.map(str::to_string),
        };
        info!(
            time = event.time,
            from = self.state.last_emitted.as_deref().unwrap_or("-"),
            to = matched.unwrap_or("-"),
            "configuration changed"
        );
        self.state.last_emitted = event.configuration.clone();
        self.state.missing_frame_count = 0;
        Some(event)
    }

    fn event_time(&self, timestamp: f64) -> i64 {
        (timestamp / self.event_time_divisor).floor() as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn literal() -> TransitionDebouncer {
        TransitionDebouncer::new(2, 60.0, DebouncePolicy::Literal)
    }

    fn feed(debouncer: &mut TransitionDebouncer, frames: &[(f64, Option<&str>)]) -> Vec<Event> {
        frames
            .iter()
            .filter_map(|(ts, matched)| debouncer.observe(*ts, *matched))
            .collect()
    }

    fn event(time: i64, configuration: Option<&str>) -> Event {
        Event {
            time,
            configuration: configuration.map(str::to_string),
        }
    }

    #[test]
    fn first_match_emits_with_minute_time() {
        let mut debouncer = literal();
        let events = feed(&mut debouncer, &[(120.0, Some("F001"))]);
        assert_eq!(events, vec![event(2, Some("F001"))]);
        assert_eq!(debouncer.state().last_emitted.as_deref(), Some("F001"));
        assert_eq!(debouncer.state().missing_frame_count, 0);
    }

    #[test]
    fn repeated_match_emits_once() {
        let mut debouncer = literal();
        let events = feed(
            &mut debouncer,
            &[(0.0, Some("F001")), (1.0, Some("F001")), (2.0, Some("F001"))],
        );
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn short_dropout_is_not_reported() {
        let mut debouncer = literal();
        let events = feed(
            &mut debouncer,
            &[(0.0, Some("F001")), (60.0, None), (120.0, Some("F001"))],
        );
        assert_eq!(events, vec![event(0, Some("F001"))]);
    }

    #[test]
    fn long_dropout_is_not_reported_under_literal_policy() {
        let mut debouncer = literal();
        let frames: Vec<(f64, Option<&str>)> = std::iter::once((0.0, Some("F001")))
            .chain((1..10).map(|t| (t as f64, None)))
            .collect();
        assert_eq!(feed(&mut debouncer, &frames).len(), 1);
        assert_eq!(debouncer.state().missing_frame_count, 9);
    }

    #[test]
    fn counter_survives_return_to_same_configuration() {
        let mut debouncer = literal();
        feed(
            &mut debouncer,
            &[(0.0, Some("F001")), (1.0, None), (2.0, None), (3.0, Some("F001"))],
        );
        assert_eq!(debouncer.state().missing_frame_count, 2);
    }

    #[test]
    fn missing_frame_counter_saturates() {
        let mut debouncer = literal();
        feed(&mut debouncer, &[(0.0, Some("F001"))]);
        debouncer.state.missing_frame_count = u32::MAX - 1;
        feed(&mut debouncer, &[(1.0, None), (2.0, None), (3.0, None)]);
        assert_eq!(debouncer.state().missing_frame_count, u32::MAX);
    }

    #[test]
    fn switch_between_configurations_emits_each() {
        let mut debouncer = literal();
        let events = feed(
            &mut debouncer,
            &[(59.0, Some("F001")), (61.0, Some("F002")), (185.0, Some("F001"))],
        );
        assert_eq!(
            events,
            vec![event(0, Some("F001")), event(1, Some("F002")), event(3, Some("F001"))]
        );
    }

    #[test]
    fn nothing_before_first_match() {
        let mut debouncer = literal();
        assert!(feed(&mut debouncer, &[(0.0, None), (1.0, None)]).is_empty());
        assert_eq!(debouncer.state().missing_frame_count, 0);
    }

    #[test]
    fn drop_policy_reports_sustained_absence() {
        let mut debouncer = TransitionDebouncer::new(2, 60.0, DebouncePolicy::DropToAbsent);
        let events = feed(
            &mut debouncer,
            &[
                (0.0, Some("F001")),
                (60.0, None),
                (120.0, None),
                (180.0, None),
                (240.0, None),
            ],
        );
        assert_eq!(events, vec![event(0, Some("F001")), event(3, None)]);
        assert_eq!(debouncer.state().last_emitted, None);
    }

    #[test]
    fn drop_policy_ignores_short_dropout() {
        let mut debouncer = TransitionDebouncer::new(2, 60.0, DebouncePolicy::DropToAbsent);
        let events = feed(
            &mut debouncer,
            &[(0.0, Some("F001")), (60.0, None), (120.0, None), (180.0, Some("F001"))],
        );
        assert_eq!(events, vec![event(0, Some("F001"))]);
    }

    #[test]
    fn negative_timestamps_floor() {
        let mut debouncer = literal();
        assert_eq!(debouncer.observe(-1.0, Some("F001")), Some(event(-1, Some("F001"))));
    }

    #[test]
    fn policy_deserializes_from_snake_case() {
        let policy: DebouncePolicy = serde_json::from_str("\"drop_to_absent\"").unwrap();
        assert_eq!(policy, DebouncePolicy::DropToAbsent);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn label() -> impl Strategy<Value = Option<&'static str>> {
            proptest::option::of(prop_oneof![Just("F001"), Just("F002"), Just("F003")])
        }

        proptest! {
            #[test]
            fn events_never_repeat_a_configuration(matches in proptest::collection::vec(label(), 0..64)) {
                let mut debouncer = literal();
                let frames: Vec<(f64, Option<&str>)> =
                    matches.iter().enumerate().map(|(i, m)| (i as f64, *m)).collect();
                let events = feed(&mut debouncer, &frames);
                for pair in events.windows(2) {
                    prop_assert_ne!(&pair[0].configuration, &pair[1].configuration);
                }
                prop_assert!(events.iter().all(|e| e.configuration.is_some()));
            }

            #[test]
            fn runs_of_identical_matches_add_nothing(m in label(), repeats in 1usize..20) {
                let mut debouncer = literal();
                let first = debouncer.observe(0.0, m);
                for i in 0..repeats {
                    prop_assert_eq!(debouncer.observe(i as f64 + 1.0, m), None);
                }
                prop_assert_eq!(first.is_some(), m.is_some());
            }
        }
    }
}
