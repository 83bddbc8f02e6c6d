use crate::participant::BlockKey;
use serde::{Deserialize, Serialize};

/// What kind of screen a trial presents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    /// Plain text screen (instructions, debrief); emits no result.
    Text,
    Image,
    Audio,
    Form,
}

/// How responses to a comparison trial are collected.
///
/// `Discrete` emits one single-response trial per prompt; `Sequential` keeps
/// all prompts on one screen and collects them one at a time after both
/// stimuli have finished playing. Two alternative configurations, not a
/// unified behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseMode {
    Discrete,
    Sequential,
}

/// Side of a stimulus pair on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Left,
    Right,
}

/// Metadata riding on a trial, recorded verbatim into its result so the
/// sequence can be reconstructed for analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrialMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block: Option<BlockKey>,
    /// Face or voice item number within the block.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item: Option<u32>,
    /// Variant pair as (left, right).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pair: Option<(u8, u8)>,
    /// 1-based prompt index for discrete-mode trials.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_index: Option<usize>,
    /// Display order of form candidates, including any shuffle applied at
    /// build time. Present on form trials only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidate_order: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scenario: Option<String>,
}

/// Immutable descriptor of one screen: what to show, what to ask, and how the
/// response is collected. Produced by the timeline builder, consumed by the
/// runner and the session driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialSpec {
    pub modality: Modality,
    /// Stimulus reference strings, left before right for pair trials. The
    /// engine constructs these; it never fetches or validates them.
    pub stimuli: Vec<String>,
    pub prompts: Vec<String>,
    pub mode: ResponseMode,
    /// Form trials only: the runner must hide its generic finish control so
    /// the validator-gated submit is the only way to end the trial.
    #[serde(default)]
    pub suppress_default_finish: bool,
    pub meta: TrialMeta,
}

impl TrialSpec {
    /// Whether completing this trial produces a `ResultRecord`.
    pub fn emits_result(&self) -> bool {
        self.modality != Modality::Text
    }
}
