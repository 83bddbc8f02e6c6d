use crate::participant::{BlockKey, Condition};
use crate::trial::Modality;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One keyed answer to one prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyedResponse {
    pub prompt: String,
    pub key: char,
    pub reaction_time_ms: u64,
}

/// Trial output, shaped by how the trial collected its responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResultPayload {
    /// Discrete comparison trial: one prompt, one key.
    Single {
        modality: Modality,
        left: String,
        right: String,
        prompt: String,
        prompt_index: usize,
        key: char,
        reaction_time_ms: u64,
    },
    /// Compound audio trial: all prompts answered on one screen.
    Sequential {
        left: String,
        right: String,
        item: u32,
        responses: Vec<KeyedResponse>,
    },
    /// Validated ranking form.
    Form {
        scenario: String,
        ratings: BTreeMap<String, u8>,
        ranks: BTreeMap<String, u8>,
        candidate_order: Vec<String>,
    },
}

/// Immutable output of one completed trial, destined for the logging sink.
/// Keyed by participant id and the trial's position in the timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub participant_id: u32,
    pub condition: Condition,
    /// Position of the trial in the built timeline.
    pub sequence: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block: Option<BlockKey>,
    pub payload: ResultPayload,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_round_trips_through_json() {
        let record = ResultRecord {
            participant_id: 7,
            condition: Condition::Female,
            sequence: 12,
            block: Some(BlockKey::B),
            payload: ResultPayload::Sequential {
                left: "all_audios/female_voice03_pitch2.wav".into(),
                right: "all_audios/female_voice03_pitch1.wav".into(),
                item: 3,
                responses: vec![KeyedResponse {
                    prompt: "Who do you think is more dominant?".into(),
                    key: '1',
                    reaction_time_ms: 812,
                }],
            },
        };

        let json = serde_json::to_string(&record).unwrap();
        let back: ResultRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn condition_and_block_serialize_lowercase() {
        assert_eq!(serde_json::to_string(&Condition::Male).unwrap(), "\"male\"");
        assert_eq!(serde_json::to_string(&BlockKey::C).unwrap(), "\"c\"");
    }
}
