use serde::{Deserialize, Serialize};
use std::fmt;

/// Label of one experiment block. Each block maps to disjoint stimulus-index
/// sets per modality in the config tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockKey {
    A,
    B,
    C,
}

impl BlockKey {
    pub fn label(&self) -> &'static str {
        match self {
            BlockKey::A => "a",
            BlockKey::B => "b",
            BlockKey::C => "c",
        }
    }
}

impl fmt::Display for BlockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Between-subject stimulus-set assignment, sampled once per session with a
/// fair coin. Names the recorded stimulus set, not the participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Condition {
    Male,
    Female,
}

impl Condition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Condition::Male => "male",
            Condition::Female => "female",
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-session assignment, created once at session start and immutable
/// thereafter. Threaded explicitly into every component that needs it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipantContext {
    pub id: u32,
    pub condition: Condition,
    pub block_order: Vec<BlockKey>,
}
