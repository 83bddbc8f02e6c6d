pub mod participant;
pub mod result;
pub mod trial;

pub use participant::{BlockKey, Condition, ParticipantContext};
pub use result::{KeyedResponse, ResultPayload, ResultRecord};
pub use trial::{Channel, Modality, ResponseMode, TrialMeta, TrialSpec};
