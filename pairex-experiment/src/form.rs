use std::collections::{BTreeMap, HashSet};
use thiserror::Error;
use tracing::debug;

/// Rejection reasons surfaced to the participant. The three submission
/// errors carry the exact message shown next to the submit control.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    #[error("each candidate needs a valid numeric rank")]
    RankNotNumeric,
    #[error("ranks must be unique")]
    DuplicateRanks,
    #[error("use each rank from 1 to {expected} exactly once")]
    IncompleteRanks { expected: usize },
    #[error("rating for {candidate} must be between {min} and {max}")]
    RatingOutOfBounds {
        candidate: String,
        min: u8,
        max: u8,
    },
    #[error("unknown candidate {0}")]
    UnknownCandidate(String),
}

/// Validated output of a submitted ranking form.
#[derive(Debug, Clone, PartialEq)]
pub struct FormPayload {
    pub scenario: String,
    pub ratings: BTreeMap<String, u8>,
    pub ranks: BTreeMap<String, u8>,
    pub candidate_order: Vec<String>,
}

/// One ranking/rating form trial.
///
/// Field edits accumulate freely; nothing is committed until `try_submit`
/// passes all checks, and the participant may resubmit indefinitely. Only a
/// successful submission can finish the trial — the runner is expected to
/// suppress its generic finish control (`TrialSpec::suppress_default_finish`).
#[derive(Debug)]
pub struct RankingForm {
    scenario: String,
    /// Display order, shuffle included.
    candidates: Vec<String>,
    rating_bounds: (u8, u8),
    ratings: BTreeMap<String, u8>,
    ranks: BTreeMap<String, String>,
    last_error: Option<FormError>,
}

impl RankingForm {
    pub fn new(scenario: String, candidates: Vec<String>, rating_bounds: (u8, u8)) -> Self {
        Self {
            scenario,
            candidates,
            rating_bounds,
            ratings: BTreeMap::new(),
            ranks: BTreeMap::new(),
            last_error: None,
        }
    }

    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }

    /// Error from the last rejected submission, for the runner to display.
    pub fn last_error(&self) -> Option<&FormError> {
        self.last_error.as_ref()
    }

    /// Bounded rating entry; values outside the bounds are rejected at the
    /// widget boundary rather than at submission.
    pub fn set_rating(&mut self, candidate: &str, value: u8) -> Result<(), FormError> {
        if !self.candidates.iter().any(|c| c == candidate) {
            return Err(FormError::UnknownCandidate(candidate.to_string()));
        }
        let (min, max) = self.rating_bounds;
        if value < min || value > max {
            return Err(FormError::RatingOutOfBounds {
                candidate: candidate.to_string(),
                min,
                max,
            });
        }
        self.ratings.insert(candidate.to_string(), value);
        Ok(())
    }

    /// Stores the raw rank field text; parsing happens at submission.
    pub fn set_rank(&mut self, candidate: &str, raw: impl Into<String>) -> Result<(), FormError> {
        if !self.candidates.iter().any(|c| c == candidate) {
            return Err(FormError::UnknownCandidate(candidate.to_string()));
        }
        self.ranks.insert(candidate.to_string(), raw.into());
        Ok(())
    }

    /// Pure, synchronous submission gate: every rank must parse, ranks must
    /// be pairwise distinct, and together they must cover 1..=N exactly.
    /// A rejected submission changes nothing except the displayed error.
    pub fn try_submit(&mut self) -> Result<FormPayload, FormError> {
        match self.validate_ranks() {
            Ok(ranks) => {
                self.last_error = None;
                Ok(FormPayload {
                    scenario: self.scenario.clone(),
                    ratings: self.ratings.clone(),
                    ranks,
                    candidate_order: self.candidates.clone(),
                })
            }
            Err(e) => {
                debug!(error = %e, "form submission rejected");
                self.last_error = Some(e.clone());
                Err(e)
            }
        }
    }

    fn validate_ranks(&self) -> Result<BTreeMap<String, u8>, FormError> {
        let n = self.candidates.len();

        // Only entered fields are parsed; an untouched field is a
        // completeness problem, not a parse problem.
        let mut parsed = BTreeMap::new();
        for candidate in &self.candidates {
            if let Some(raw) = self.ranks.get(candidate) {
                let value: i64 = raw
                    .trim()
                    .parse()
                    .map_err(|_| FormError::RankNotNumeric)?;
                parsed.insert(candidate.clone(), value);
            }
        }

        let distinct: HashSet<i64> = parsed.values().copied().collect();
        if distinct.len() != parsed.len() {
            return Err(FormError::DuplicateRanks);
        }

        if parsed.len() != n || !parsed.values().all(|&v| v >= 1 && v <= n as i64) {
            return Err(FormError::IncompleteRanks { expected: n });
        }

        Ok(parsed
            .into_iter()
            .map(|(candidate, v)| (candidate, v as u8))
            .collect())
    }
}
