use pairex_core::{BlockKey, ResponseMode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("at least one block ordering is required")]
    NoOrderings,
    #[error("at least one prompt is required")]
    NoPrompts,
    #[error("at least one response key is required")]
    NoResponseKeys,
    #[error("block {0} appears in an ordering but has no {1} items")]
    MissingBlockTable(BlockKey, &'static str),
    #[error("ranking form needs at least two candidates")]
    TooFewCandidates,
    #[error("rating bounds ({0}, {1}) are inverted")]
    InvertedRatingBounds(u8, u8),
}

/// Setup for the validated ranking form shown at the end of the session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingConfig {
    pub scenario: String,
    pub candidates: Vec<String>,
    /// Shuffle candidate display order per participant. The shuffled order is
    /// recorded in the trial's metadata so the sequence stays replayable.
    pub shuffle_candidates: bool,
    pub rating_bounds: (u8, u8),
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            scenario: "Rank the speakers for the radio-host position.".to_string(),
            candidates: (1..=6).map(|n| format!("speaker{n:02}")).collect(),
            shuffle_candidates: true,
            rating_bounds: (1, 7),
        }
    }
}

/// Declarative specification tables for one experiment.
///
/// The defaults reproduce the original pairwise face/voice study: three
/// counterbalanced block orders, four prompts, keys 1/2, discrete image
/// trials and sequential audio trials.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    /// Counterbalancing table; participant id selects `orderings[id % K]`.
    pub orderings: Vec<Vec<BlockKey>>,
    pub image_blocks: BTreeMap<BlockKey, Vec<u32>>,
    pub audio_blocks: BTreeMap<BlockKey, Vec<u32>>,
    /// Variant pairs as (left, right).
    pub image_pairs: Vec<(u8, u8)>,
    pub audio_pairs: Vec<(u8, u8)>,
    pub prompts: Vec<String>,
    pub response_keys: Vec<char>,
    pub continue_key: char,
    pub image_mode: ResponseMode,
    pub audio_mode: ResponseMode,
    pub instructions: String,
    pub debrief: String,
    pub ranking: Option<RankingConfig>,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        use BlockKey::{A, B, C};
        Self {
            orderings: vec![vec![A, B, C], vec![B, C, A], vec![C, A, B]],
            image_blocks: BTreeMap::from([
                (A, vec![1, 2, 3]),
                (B, vec![4, 5, 6]),
                (C, vec![7, 8, 9, 10]),
            ]),
            audio_blocks: BTreeMap::from([
                (A, vec![1, 2, 3, 4, 5, 6]),
                (B, vec![7, 8, 9, 10, 11, 12, 13]),
                (C, vec![14, 15, 16, 17, 18, 19, 20]),
            ]),
            image_pairs: vec![(2, 1), (3, 1), (3, 2), (5, 4), (6, 4), (6, 5)],
            audio_pairs: vec![(2, 1), (3, 1), (3, 2)],
            prompts: vec![
                "Who do you think is more dominant?".to_string(),
                "Who do you think is more trustworthy?".to_string(),
                "Who do you think is more honest?".to_string(),
                "Who do you think is taller?".to_string(),
            ],
            response_keys: vec!['1', '2'],
            continue_key: ' ',
            image_mode: ResponseMode::Discrete,
            audio_mode: ResponseMode::Sequential,
            instructions: "The study proceeds in blocks. In each block you will first \
                see pairs of images followed by questions for each pair, then pairs of \
                audios followed by questions for each pair. Use keys 1 or 2 to respond. \
                Press SPACE to begin."
                .to_string(),
            debrief: "Thank you for participating! Your responses have been recorded."
                .to_string(),
            ranking: Some(RankingConfig::default()),
        }
    }
}

impl ExperimentConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Number of predefined block orderings (K in `id % K`).
    pub fn ordering_count(&self) -> usize {
        self.orderings.len()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.orderings.is_empty() {
            return Err(ConfigError::NoOrderings);
        }
        if self.prompts.is_empty() {
            return Err(ConfigError::NoPrompts);
        }
        if self.response_keys.is_empty() {
            return Err(ConfigError::NoResponseKeys);
        }
        for ordering in &self.orderings {
            for block in ordering {
                if !self.image_blocks.contains_key(block) {
                    return Err(ConfigError::MissingBlockTable(*block, "image"));
                }
                if !self.audio_blocks.contains_key(block) {
                    return Err(ConfigError::MissingBlockTable(*block, "audio"));
                }
            }
        }
        if let Some(ranking) = &self.ranking {
            if ranking.candidates.len() < 2 {
                return Err(ConfigError::TooFewCandidates);
            }
            let (lo, hi) = ranking.rating_bounds;
            if lo > hi {
                return Err(ConfigError::InvertedRatingBounds(lo, hi));
            }
        }
        Ok(())
    }
}
