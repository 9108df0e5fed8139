use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use super::event::Severity;

/// Drops floods of identical events. Events sharing a severity and
/// message are counted inside a tumbling window; once the window has
/// admitted `first` of them, the rest are dropped until the window
/// rolls over.
pub struct Sampler {
    window: Duration,
    first: u64,
    state: Mutex<State>,
}

struct State {
    window_start: Instant,
    counts: HashMap<(Severity, String), u64>,
}

impl Sampler {
    pub fn new(window: Duration, first: u64) -> Self {
        Self {
            window,
            first,
            state: Mutex::new(State {
                window_start: Instant::now(),
                counts: HashMap::new(),
            }),
        }
    }

    /// Returns whether the event should pass through.
    pub fn admit(&self, severity: Severity, message: &str) -> bool {
        let mut state = self.state.lock();

        let now = Instant::now();
        if now.duration_since(state.window_start) >= self.window {
            state.window_start = now;
            state.counts.clear();
        }

        let seen = state
            .counts
            .entry((severity, message.to_string()))
            .or_insert(0);
        *seen += 1;
        *seen <= self.first
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admits_up_to_first_then_drops() {
        let sampler = Sampler::new(Duration::from_secs(60), 100);
        let admitted = (0..150)
            .filter(|_| sampler.admit(Severity::Info, "repeated"))
            .count();
        assert_eq!(admitted, 100);
    }

    #[test]
    fn test_distinct_messages_counted_independently() {
        let sampler = Sampler::new(Duration::from_secs(60), 2);
        assert!(sampler.admit(Severity::Info, "a"));
        assert!(sampler.admit(Severity::Info, "a"));
        assert!(!sampler.admit(Severity::Info, "a"));
        assert!(sampler.admit(Severity::Info, "b"));
    }

    #[test]
    fn test_same_message_different_severity_counted_independently() {
        let sampler = Sampler::new(Duration::from_secs(60), 1);
        assert!(sampler.admit(Severity::Info, "same"));
        assert!(!sampler.admit(Severity::Info, "same"));
        assert!(sampler.admit(Severity::Error, "same"));
    }

    #[test]
    fn test_window_rollover_resets_counts() {
        let sampler = Sampler::new(Duration::from_millis(20), 1);
        assert!(sampler.admit(Severity::Info, "tick"));
        assert!(!sampler.admit(Severity::Info, "tick"));
        std::thread::sleep(Duration::from_millis(30));
        assert!(sampler.admit(Severity::Info, "tick"));
    }
}
