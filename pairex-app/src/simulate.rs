use pairex_core::{Channel, Modality, ResponseMode};
use pairex_experiment::{Session, TrialEvent};
use pairex_sink::ResultSink;
use pairex_timing::Clock;
use rand::Rng;
use rand::seq::{IndexedRandom, SliceRandom};
use tracing::{debug, warn};

/// Drives a session to completion as a cooperative scripted participant:
/// continue on text screens, random allowed key per prompt, a valid random
/// rank permutation on the form. Returns the number of trials passed.
pub fn run_scripted<C, S, R>(session: &mut Session<C, S>, rng: &mut R) -> usize
where
    C: Clock,
    S: ResultSink,
    R: Rng,
{
    let mut answered = 0usize;

    while let Some(spec) = session.current().cloned() {
        let (index, total) = session.progress();
        debug!(trial = index, total, modality = ?spec.modality, "answering");

        match spec.modality {
            Modality::Text => {
                let key = session.continue_key();
                session.handle_event(TrialEvent::Key(key));
            }
            Modality::Image | Modality::Audio => {
                if spec.mode == ResponseMode::Sequential && spec.modality == Modality::Audio {
                    session.handle_event(TrialEvent::MediaEnded(Channel::Right));
                    session.handle_event(TrialEvent::MediaEnded(Channel::Left));
                }
                for _ in 0..spec.prompts.len() {
                    let key = pick(session.response_keys(), rng);
                    session.handle_event(TrialEvent::Key(key));
                }
            }
            Modality::Form => {
                let candidates = spec.meta.candidate_order.clone().unwrap_or_default();
                let (lo, hi) = session.rating_bounds();
                let mut ranks: Vec<usize> = (1..=candidates.len()).collect();
                ranks.shuffle(rng);
                for (candidate, rank) in candidates.iter().zip(&ranks) {
                    session.handle_event(TrialEvent::Rating {
                        candidate: candidate.clone(),
                        value: rng.random_range(lo..=hi),
                    });
                    session.handle_event(TrialEvent::Rank {
                        candidate: candidate.clone(),
                        raw: rank.to_string(),
                    });
                }
                session.handle_event(TrialEvent::Submit);
            }
        }

        let (after, _) = session.progress();
        if after == index && !session.is_finished() {
            // A scripted answer should always advance; bail out rather than
            // spin if a config produces a trial we cannot satisfy.
            warn!(trial = index, "no progress on trial, stopping simulation");
            break;
        }
        answered += 1;
    }

    answered
}

fn pick<R: Rng>(keys: &[char], rng: &mut R) -> char {
    *keys.choose(rng).unwrap_or(&'1')
}
