use crate::collector::SequentialCollector;
use crate::config::ExperimentConfig;
use crate::form::{FormError, RankingForm};
use pairex_core::{
    Channel, Modality, ParticipantContext, ResponseMode, ResultPayload, ResultRecord, TrialSpec,
};
use pairex_sink::ResultSink;
use pairex_timing::Clock;
use tracing::{debug, info};

/// Everything the runner can feed back to the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum TrialEvent {
    /// One stimulus channel finished playing.
    MediaEnded(Channel),
    Key(char),
    Rating { candidate: String, value: u8 },
    Rank { candidate: String, raw: String },
    /// The validator-gated submit control was activated.
    Submit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Running,
    Finished,
    Aborted,
}

/// Per-trial controller. Scoped to one trial and discarded on completion or
/// abort, so no mutable state crosses trial boundaries.
#[derive(Debug)]
enum Controller {
    /// Plain text screen; the continue key advances, nothing is emitted.
    Instruction,
    /// Discrete comparison trial: one prompt, one key.
    SingleKey { shown_at_ms: u64 },
    Sequential(SequentialCollector),
    Form(RankingForm),
}

/// Drives one participant through a built timeline.
///
/// The session owns the timeline cursor and the current trial's controller,
/// routes runner events to it, and on each completed trial submits exactly
/// one [`ResultRecord`] to the sink before advancing. Sink delivery is fire
/// and forget; the session never waits on it.
pub struct Session<C: Clock, S: ResultSink> {
    ctx: ParticipantContext,
    timeline: Vec<TrialSpec>,
    cursor: usize,
    controller: Option<Controller>,
    response_keys: Vec<char>,
    continue_key: char,
    rating_bounds: (u8, u8),
    clock: C,
    sink: S,
    status: SessionStatus,
}

impl<C: Clock, S: ResultSink> Session<C, S> {
    pub fn new(
        ctx: ParticipantContext,
        timeline: Vec<TrialSpec>,
        config: &ExperimentConfig,
        clock: C,
        sink: S,
    ) -> Self {
        let mut session = Self {
            ctx,
            timeline,
            cursor: 0,
            controller: None,
            response_keys: config.response_keys.clone(),
            continue_key: config.continue_key,
            rating_bounds: config
                .ranking
                .as_ref()
                .map(|r| r.rating_bounds)
                .unwrap_or((1, 7)),
            clock,
            sink,
            status: SessionStatus::Running,
        };
        if session.timeline.is_empty() {
            session.status = SessionStatus::Finished;
        } else {
            info!(
                participant = session.ctx.id,
                trials = session.timeline.len(),
                "session started"
            );
            session.enter_trial();
        }
        session
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn is_finished(&self) -> bool {
        self.status != SessionStatus::Running
    }

    pub fn participant(&self) -> &ParticipantContext {
        &self.ctx
    }

    /// The trial currently on screen, if the session is running.
    pub fn current(&self) -> Option<&TrialSpec> {
        match self.status {
            SessionStatus::Running => self.timeline.get(self.cursor),
            _ => None,
        }
    }

    /// Keys that count as responses on comparison trials.
    pub fn response_keys(&self) -> &[char] {
        &self.response_keys
    }

    /// Key that advances instruction screens.
    pub fn continue_key(&self) -> char {
        self.continue_key
    }

    pub fn rating_bounds(&self) -> (u8, u8) {
        self.rating_bounds
    }

    /// (current trial index, total trials), mirroring a progress bar.
    pub fn progress(&self) -> (usize, usize) {
        (self.cursor.min(self.timeline.len()), self.timeline.len())
    }

    /// Error from the last rejected form submission, for the runner to show.
    pub fn form_error(&self) -> Option<&FormError> {
        match &self.controller {
            Some(Controller::Form(form)) => form.last_error(),
            _ => None,
        }
    }

    /// Ends the session early. The current trial's partial state is
    /// discarded and no record is emitted for it.
    pub fn abort(&mut self) {
        if self.status == SessionStatus::Running {
            info!(
                participant = self.ctx.id,
                trial = self.cursor,
                "session aborted, partial trial discarded"
            );
            self.controller = None;
            self.status = SessionStatus::Aborted;
        }
    }

    pub fn handle_event(&mut self, event: TrialEvent) {
        if self.status != SessionStatus::Running {
            debug!(?event, "event after session end, ignored");
            return;
        }
        let now = self.clock.now_ms();
        let spec = self.timeline[self.cursor].clone();

        enum Advance {
            Stay,
            Skip,
            Record(ResultPayload),
        }

        let advance = match (&mut self.controller, event) {
            (Some(Controller::Instruction), TrialEvent::Key(k)) if k == self.continue_key => {
                Advance::Skip
            }
            (Some(Controller::SingleKey { shown_at_ms }), TrialEvent::Key(k))
                if self.response_keys.contains(&k) =>
            {
                let reaction_time_ms = now.saturating_sub(*shown_at_ms);
                Advance::Record(ResultPayload::Single {
                    modality: spec.modality,
                    left: spec.stimuli.first().cloned().unwrap_or_default(),
                    right: spec.stimuli.get(1).cloned().unwrap_or_default(),
                    prompt: spec.prompts.first().cloned().unwrap_or_default(),
                    prompt_index: spec.meta.prompt_index.unwrap_or(1),
                    key: k,
                    reaction_time_ms,
                })
            }
            (Some(Controller::Sequential(collector)), TrialEvent::MediaEnded(channel)) => {
                collector.media_ready(channel, now);
                match collector.take_responses() {
                    Some(responses) => Advance::Record(ResultPayload::Sequential {
                        left: spec.stimuli.first().cloned().unwrap_or_default(),
                        right: spec.stimuli.get(1).cloned().unwrap_or_default(),
                        item: spec.meta.item.unwrap_or(0),
                        responses,
                    }),
                    None => Advance::Stay,
                }
            }
            (Some(Controller::Sequential(collector)), TrialEvent::Key(k)) => {
                collector.key(k, now);
                match collector.take_responses() {
                    Some(responses) => Advance::Record(ResultPayload::Sequential {
                        left: spec.stimuli.first().cloned().unwrap_or_default(),
                        right: spec.stimuli.get(1).cloned().unwrap_or_default(),
                        item: spec.meta.item.unwrap_or(0),
                        responses,
                    }),
                    None => Advance::Stay,
                }
            }
            (Some(Controller::Form(form)), TrialEvent::Rating { candidate, value }) => {
                if let Err(e) = form.set_rating(&candidate, value) {
                    debug!(error = %e, "rating rejected");
                }
                Advance::Stay
            }
            (Some(Controller::Form(form)), TrialEvent::Rank { candidate, raw }) => {
                if let Err(e) = form.set_rank(&candidate, raw) {
                    debug!(error = %e, "rank field rejected");
                }
                Advance::Stay
            }
            (Some(Controller::Form(form)), TrialEvent::Submit) => match form.try_submit() {
                Ok(payload) => Advance::Record(ResultPayload::Form {
                    scenario: payload.scenario,
                    ratings: payload.ratings,
                    ranks: payload.ranks,
                    candidate_order: payload.candidate_order,
                }),
                Err(_) => Advance::Stay,
            },
            (_, event) => {
                debug!(?event, trial = self.cursor, "event ignored");
                Advance::Stay
            }
        };

        match advance {
            Advance::Stay => {}
            Advance::Skip => self.advance(),
            Advance::Record(payload) => {
                let record = ResultRecord {
                    participant_id: self.ctx.id,
                    condition: self.ctx.condition,
                    sequence: self.cursor,
                    block: spec.meta.block,
                    payload,
                };
                self.sink.submit(&record);
                info!(
                    participant = self.ctx.id,
                    sequence = record.sequence,
                    "trial completed"
                );
                self.advance();
            }
        }
    }

    fn advance(&mut self) {
        self.cursor += 1;
        if self.cursor >= self.timeline.len() {
            self.controller = None;
            self.status = SessionStatus::Finished;
            info!(participant = self.ctx.id, "session finished");
        } else {
            self.enter_trial();
        }
    }

    fn enter_trial(&mut self) {
        let spec = &self.timeline[self.cursor];
        let now = self.clock.now_ms();
        let controller = match spec.modality {
            Modality::Text => Controller::Instruction,
            Modality::Form => Controller::Form(RankingForm::new(
                spec.meta.scenario.clone().unwrap_or_default(),
                spec.meta.candidate_order.clone().unwrap_or_default(),
                self.rating_bounds,
            )),
            Modality::Image | Modality::Audio => match spec.mode {
                ResponseMode::Discrete => Controller::SingleKey { shown_at_ms: now },
                ResponseMode::Sequential => {
                    let collector = if spec.modality == Modality::Audio {
                        SequentialCollector::new(spec.prompts.clone(), self.response_keys.clone())
                    } else {
                        // Images need no playback; prompting starts at once.
                        SequentialCollector::with_media_ready(
                            spec.prompts.clone(),
                            self.response_keys.clone(),
                            now,
                        )
                    };
                    Controller::Sequential(collector)
                }
            },
        };
        debug!(
            trial = self.cursor,
            modality = ?spec.modality,
            "trial entered"
        );
        self.controller = Some(controller);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pairex_core::{BlockKey, Condition, TrialMeta};
    use pairex_sink::MemorySink;
    use pairex_timing::ManualClock;
    use std::sync::Arc;

    fn ctx() -> ParticipantContext {
        ParticipantContext {
            id: 7,
            condition: Condition::Female,
            block_order: vec![BlockKey::B, BlockKey::C, BlockKey::A],
        }
    }

    fn audio_spec() -> TrialSpec {
        TrialSpec {
            modality: Modality::Audio,
            stimuli: vec!["left.wav".into(), "right.wav".into()],
            prompts: vec!["more dominant?".into(), "more honest?".into()],
            mode: ResponseMode::Sequential,
            suppress_default_finish: false,
            meta: TrialMeta {
                block: Some(BlockKey::B),
                item: Some(3),
                pair: Some((2, 1)),
                ..TrialMeta::default()
            },
        }
    }

    fn session(
        timeline: Vec<TrialSpec>,
    ) -> (Session<Arc<ManualClock>, Arc<MemorySink>>, Arc<ManualClock>, Arc<MemorySink>) {
        let clock = Arc::new(ManualClock::new());
        let sink = Arc::new(MemorySink::new());
        let config = ExperimentConfig::default();
        let session = Session::new(ctx(), timeline, &config, clock.clone(), sink.clone());
        (session, clock, sink)
    }

    #[test]
    fn sequential_trial_emits_one_record_with_all_responses() {
        let (mut s, clock, sink) = session(vec![audio_spec()]);

        // Keys before both media signals are ignored.
        s.handle_event(TrialEvent::Key('1'));
        s.handle_event(TrialEvent::MediaEnded(Channel::Right));
        s.handle_event(TrialEvent::MediaEnded(Channel::Right));
        s.handle_event(TrialEvent::Key('2'));
        assert_eq!(s.status(), SessionStatus::Running);

        clock.set(1_000);
        s.handle_event(TrialEvent::MediaEnded(Channel::Left));
        clock.set(1_400);
        s.handle_event(TrialEvent::Key('1'));
        clock.set(1_900);
        s.handle_event(TrialEvent::Key('2'));

        assert_eq!(s.status(), SessionStatus::Finished);
        let records = sink.records();
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.participant_id, 7);
        assert_eq!(record.condition, Condition::Female);
        assert_eq!(record.block, Some(BlockKey::B));
        match &record.payload {
            ResultPayload::Sequential { item, responses, .. } => {
                assert_eq!(*item, 3);
                assert_eq!(responses.len(), 2);
                assert_eq!(responses[0].key, '1');
                assert_eq!(responses[0].reaction_time_ms, 400);
                assert_eq!(responses[1].key, '2');
                assert_eq!(responses[1].reaction_time_ms, 500);
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    fn discrete_trial_records_key_and_latency() {
        let spec = TrialSpec {
            modality: Modality::Image,
            stimuli: vec!["l.png".into(), "r.png".into()],
            prompts: vec!["taller?".into()],
            mode: ResponseMode::Discrete,
            suppress_default_finish: false,
            meta: TrialMeta {
                block: Some(BlockKey::A),
                prompt_index: Some(4),
                ..TrialMeta::default()
            },
        };
        let (mut s, clock, sink) = session(vec![spec]);

        clock.set(640);
        s.handle_event(TrialEvent::Key('x')); // outside alphabet, ignored
        assert_eq!(s.status(), SessionStatus::Running);
        s.handle_event(TrialEvent::Key('2'));

        let records = sink.records();
        assert_eq!(records.len(), 1);
        match &records[0].payload {
            ResultPayload::Single {
                key,
                reaction_time_ms,
                prompt_index,
                ..
            } => {
                assert_eq!(*key, '2');
                assert_eq!(*reaction_time_ms, 640);
                assert_eq!(*prompt_index, 4);
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    fn instruction_screens_emit_nothing() {
        let text = TrialSpec {
            modality: Modality::Text,
            stimuli: Vec::new(),
            prompts: vec!["Press SPACE to begin.".into()],
            mode: ResponseMode::Discrete,
            suppress_default_finish: false,
            meta: TrialMeta::default(),
        };
        let (mut s, _clock, sink) = session(vec![text]);
        s.handle_event(TrialEvent::Key('1')); // not the continue key
        assert_eq!(s.status(), SessionStatus::Running);
        s.handle_event(TrialEvent::Key(' '));
        assert_eq!(s.status(), SessionStatus::Finished);
        assert!(sink.is_empty());
    }

    #[test]
    fn form_trial_only_finishes_on_valid_submission() {
        let spec = TrialSpec {
            modality: Modality::Form,
            stimuli: Vec::new(),
            prompts: Vec::new(),
            mode: ResponseMode::Discrete,
            suppress_default_finish: true,
            meta: TrialMeta {
                scenario: Some("radio host".into()),
                candidate_order: Some(vec!["s1".into(), "s2".into(), "s3".into()]),
                ..TrialMeta::default()
            },
        };
        let (mut s, _clock, sink) = session(vec![spec]);

        for (candidate, rank) in [("s1", "1"), ("s2", "1"), ("s3", "3")] {
            s.handle_event(TrialEvent::Rank {
                candidate: candidate.into(),
                raw: rank.into(),
            });
        }
        s.handle_event(TrialEvent::Submit);
        assert_eq!(s.status(), SessionStatus::Running);
        assert_eq!(s.form_error(), Some(&FormError::DuplicateRanks));

        s.handle_event(TrialEvent::Rank {
            candidate: "s2".into(),
            raw: "2".into(),
        });
        s.handle_event(TrialEvent::Rating {
            candidate: "s1".into(),
            value: 5,
        });
        s.handle_event(TrialEvent::Submit);

        assert_eq!(s.status(), SessionStatus::Finished);
        let records = sink.records();
        assert_eq!(records.len(), 1);
        match &records[0].payload {
            ResultPayload::Form {
                ranks,
                ratings,
                candidate_order,
                ..
            } => {
                assert_eq!(ranks.len(), 3);
                assert_eq!(ratings["s1"], 5);
                assert_eq!(candidate_order, &vec!["s1", "s2", "s3"]);
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    fn abort_discards_partial_trial_state() {
        let (mut s, _clock, sink) = session(vec![audio_spec()]);
        s.handle_event(TrialEvent::MediaEnded(Channel::Left));
        s.handle_event(TrialEvent::MediaEnded(Channel::Right));
        s.handle_event(TrialEvent::Key('1')); // one of two prompts answered
        s.abort();

        assert_eq!(s.status(), SessionStatus::Aborted);
        assert!(sink.is_empty());
        // Events after the abort are ignored.
        s.handle_event(TrialEvent::Key('2'));
        assert!(sink.is_empty());
        assert!(s.current().is_none());
    }
}
