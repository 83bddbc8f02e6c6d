use pairex_core::{Channel, KeyedResponse};
use tracing::debug;

/// Where a compound trial currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectorState {
    /// Waiting for both stimulus channels to finish playing.
    AwaitingMedia,
    /// Collecting the response to prompt `i`.
    Collecting(usize),
    Complete,
}

/// Per-trial state machine for compound trials: two asynchronous
/// media-completion signals, then N keyed responses collected strictly in
/// prompt order, then one aggregated emission.
///
/// The collector owns all of the trial's mutable state; nothing leaks into
/// closures or ambient variables. Timestamps are supplied by the caller so
/// the machine is clock-free and directly unit-testable.
///
/// Invariants: the cursor only advances after both channels are ready, and
/// `collected.len()` always equals the cursor.
#[derive(Debug)]
pub struct SequentialCollector {
    prompts: Vec<String>,
    allowed: Vec<char>,
    left_done: bool,
    right_done: bool,
    state: CollectorState,
    collected: Vec<KeyedResponse>,
    prompt_shown_at_ms: u64,
    taken: bool,
}

impl SequentialCollector {
    pub fn new(prompts: Vec<String>, allowed: Vec<char>) -> Self {
        Self {
            prompts,
            allowed,
            left_done: false,
            right_done: false,
            state: CollectorState::AwaitingMedia,
            collected: Vec::new(),
            prompt_shown_at_ms: 0,
            taken: false,
        }
    }

    /// Collector for compound trials whose stimuli need no playback (image
    /// pairs): prompting starts immediately.
    pub fn with_media_ready(prompts: Vec<String>, allowed: Vec<char>, now_ms: u64) -> Self {
        let mut collector = Self::new(prompts, allowed);
        collector.media_ready(Channel::Left, now_ms);
        collector.media_ready(Channel::Right, now_ms);
        collector
    }

    pub fn state(&self) -> CollectorState {
        self.state
    }

    pub fn is_complete(&self) -> bool {
        self.state == CollectorState::Complete
    }

    /// Prompt currently awaiting a response, if any.
    pub fn current_prompt(&self) -> Option<&str> {
        match self.state {
            CollectorState::Collecting(i) => self.prompts.get(i).map(String::as_str),
            _ => None,
        }
    }

    /// Marks one channel's playback as finished. Idempotent: a repeated
    /// signal for an already-finished channel is a no-op, and signals after
    /// prompting has begun are ignored. Prompting starts only once both
    /// channels have signalled, in whichever order they arrive.
    pub fn media_ready(&mut self, channel: Channel, now_ms: u64) {
        if self.state != CollectorState::AwaitingMedia {
            return;
        }
        match channel {
            Channel::Left => self.left_done = true,
            Channel::Right => self.right_done = true,
        }
        if self.left_done && self.right_done {
            if self.prompts.is_empty() {
                self.state = CollectorState::Complete;
            } else {
                self.state = CollectorState::Collecting(0);
                self.prompt_shown_at_ms = now_ms;
            }
        }
    }

    /// Feeds one keystroke. Keys outside the allowed alphabet, or arriving
    /// while media is still playing, are ignored without a state change.
    /// Returns true when the key advanced the machine.
    pub fn key(&mut self, key: char, now_ms: u64) -> bool {
        let CollectorState::Collecting(index) = self.state else {
            debug!(key = %key, state = ?self.state, "key ignored outside collection");
            return false;
        };
        if !self.allowed.contains(&key) {
            debug!(key = %key, prompt = index, "key outside response alphabet, ignored");
            return false;
        }

        self.collected.push(KeyedResponse {
            prompt: self.prompts[index].clone(),
            key,
            reaction_time_ms: now_ms.saturating_sub(self.prompt_shown_at_ms),
        });

        if index + 1 == self.prompts.len() {
            self.state = CollectorState::Complete;
        } else {
            self.state = CollectorState::Collecting(index + 1);
            self.prompt_shown_at_ms = now_ms;
        }
        true
    }

    /// Yields the aggregated responses exactly once after completion.
    pub fn take_responses(&mut self) -> Option<Vec<KeyedResponse>> {
        if self.state == CollectorState::Complete && !self.taken {
            self.taken = true;
            Some(std::mem::take(&mut self.collected))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prompts() -> Vec<String> {
        vec![
            "Who do you think is more dominant?".to_string(),
            "Who do you think is more trustworthy?".to_string(),
            "Who do you think is more honest?".to_string(),
            "Who do you think is taller?".to_string(),
        ]
    }

    fn collector() -> SequentialCollector {
        SequentialCollector::new(prompts(), vec!['1', '2'])
    }

    #[test]
    fn prompting_waits_for_both_channels_in_either_order() {
        for (first, second) in [(Channel::Left, Channel::Right), (Channel::Right, Channel::Left)] {
            let mut c = collector();
            c.media_ready(first, 100);
            assert_eq!(c.state(), CollectorState::AwaitingMedia);
            c.media_ready(second, 200);
            assert_eq!(c.state(), CollectorState::Collecting(0));
        }
    }

    #[test]
    fn repeated_media_signals_are_idempotent() {
        let mut c = collector();
        c.media_ready(Channel::Left, 100);
        c.media_ready(Channel::Left, 150);
        assert_eq!(c.state(), CollectorState::AwaitingMedia);
        c.media_ready(Channel::Right, 200);
        assert_eq!(c.state(), CollectorState::Collecting(0));
        // Late duplicates do not reset the prompt clock.
        c.media_ready(Channel::Right, 400);
        assert!(c.key('1', 500));
        assert_eq!(c.take_responses(), None);
        assert_eq!(c.state(), CollectorState::Collecting(1));
    }

    #[test]
    fn keys_before_media_are_ignored() {
        let mut c = collector();
        assert!(!c.key('1', 50));
        c.media_ready(Channel::Left, 100);
        assert!(!c.key('2', 120));
        c.media_ready(Channel::Right, 200);
        assert_eq!(c.state(), CollectorState::Collecting(0));
    }

    #[test]
    fn invalid_keys_do_not_advance_the_prompt() {
        let mut c = collector();
        c.media_ready(Channel::Left, 0);
        c.media_ready(Channel::Right, 0);
        assert!(!c.key('x', 100));
        assert!(!c.key('3', 150));
        assert_eq!(c.state(), CollectorState::Collecting(0));
        assert!(c.key('2', 200));
        assert_eq!(c.state(), CollectorState::Collecting(1));
    }

    #[test]
    fn responses_come_back_in_prompt_order_with_latencies() {
        let mut c = collector();
        c.media_ready(Channel::Right, 1_000);
        c.media_ready(Channel::Left, 1_000);
        assert!(c.key('1', 1_800));
        assert!(c.key('2', 2_100));
        assert!(c.key('2', 2_900));
        assert!(c.key('1', 3_000));
        assert!(c.is_complete());

        let responses = c.take_responses().unwrap();
        let expected: Vec<(String, char, u64)> = prompts()
            .into_iter()
            .zip([('1', 800), ('2', 300), ('2', 800), ('1', 100)])
            .map(|(p, (k, rt))| (p, k, rt))
            .collect();
        let got: Vec<(String, char, u64)> = responses
            .into_iter()
            .map(|r| (r.prompt, r.key, r.reaction_time_ms))
            .collect();
        assert_eq!(got, expected);
    }

    #[test]
    fn aggregated_responses_are_yielded_exactly_once() {
        let mut c = SequentialCollector::with_media_ready(prompts(), vec!['1', '2'], 0);
        for _ in 0..4 {
            c.key('1', 10);
        }
        assert!(c.take_responses().is_some());
        assert!(c.take_responses().is_none());
        // Further keys after completion are ignored.
        assert!(!c.key('1', 20));
    }

    #[test]
    fn abort_is_just_dropping_the_collector() {
        let mut c = collector();
        c.media_ready(Channel::Left, 0);
        c.media_ready(Channel::Right, 0);
        c.key('1', 100);
        // Incomplete: nothing can be taken, partial state dies with the value.
        assert_eq!(c.take_responses(), None);
        drop(c);
    }
}
