use crate::config::ExperimentConfig;
use pairex_core::{
    BlockKey, Condition, Modality, ParticipantContext, ResponseMode, TrialMeta, TrialSpec,
};
use rand::Rng;
use rand::seq::SliceRandom;
use tracing::{debug, warn};

/// Maps a (condition, item index, variant) triple to an asset reference
/// string. The engine only constructs these strings; fetching and existence
/// checks belong to the runner.
pub trait AssetResolver {
    fn image(&self, condition: Condition, item: u32, variant: u8) -> String;
    fn audio(&self, condition: Condition, item: u32, variant: u8) -> String;
}

/// File-name scheme of the recorded stimulus sets.
#[derive(Debug, Clone)]
pub struct StimulusFiles {
    pub image_dir: String,
    pub audio_dir: String,
}

impl Default for StimulusFiles {
    fn default() -> Self {
        Self {
            image_dir: "all_images".to_string(),
            audio_dir: "all_audios".to_string(),
        }
    }
}

impl AssetResolver for StimulusFiles {
    fn image(&self, condition: Condition, item: u32, variant: u8) -> String {
        format!("{}/{}_face{item:02}_{variant}.png", self.image_dir, condition)
    }

    fn audio(&self, condition: Condition, item: u32, variant: u8) -> String {
        format!(
            "{}/{}_voice{item:02}_pitch{variant}.wav",
            self.audio_dir, condition
        )
    }
}

/// Expands the declarative tables into a flat ordered sequence of trials.
///
/// For each block in the participant's order: every image item crossed with
/// every image pair, then every audio item crossed with every audio pair.
/// Discrete mode emits one spec per prompt; sequential mode emits one
/// compound spec carrying all prompts. The output order is significant and
/// never changed after building.
pub struct TimelineBuilder<'a, A: AssetResolver> {
    config: &'a ExperimentConfig,
    resolver: A,
}

impl<'a> TimelineBuilder<'a, StimulusFiles> {
    pub fn new(config: &'a ExperimentConfig) -> Self {
        Self::with_resolver(config, StimulusFiles::default())
    }
}

impl<'a, A: AssetResolver> TimelineBuilder<'a, A> {
    pub fn with_resolver(config: &'a ExperimentConfig, resolver: A) -> Self {
        Self { config, resolver }
    }

    /// Builds the full timeline for one participant. Deterministic for a
    /// fixed context and config; the only random draw is the ranking-form
    /// candidate shuffle, which is recorded in the spec's metadata.
    pub fn build<R: Rng>(&self, ctx: &ParticipantContext, rng: &mut R) -> Vec<TrialSpec> {
        let mut timeline = vec![self.text_trial(&self.config.instructions)];

        for &block in &ctx.block_order {
            self.push_pair_trials(&mut timeline, ctx, block, Modality::Image);
            self.push_pair_trials(&mut timeline, ctx, block, Modality::Audio);
        }

        if let Some(ranking) = &self.config.ranking {
            let mut order = ranking.candidates.clone();
            if ranking.shuffle_candidates {
                order.shuffle(rng);
            }
            timeline.push(TrialSpec {
                modality: Modality::Form,
                stimuli: Vec::new(),
                prompts: Vec::new(),
                mode: ResponseMode::Discrete,
                suppress_default_finish: true,
                meta: TrialMeta {
                    scenario: Some(ranking.scenario.clone()),
                    candidate_order: Some(order),
                    ..TrialMeta::default()
                },
            });
        }

        timeline.push(self.text_trial(&self.config.debrief));

        debug!(
            participant = ctx.id,
            trials = timeline.len(),
            "timeline built"
        );
        timeline
    }

    fn push_pair_trials(
        &self,
        timeline: &mut Vec<TrialSpec>,
        ctx: &ParticipantContext,
        block: BlockKey,
        modality: Modality,
    ) {
        let (table, pairs, mode) = match modality {
            Modality::Image => (
                &self.config.image_blocks,
                &self.config.image_pairs,
                self.config.image_mode,
            ),
            Modality::Audio => (
                &self.config.audio_blocks,
                &self.config.audio_pairs,
                self.config.audio_mode,
            ),
            _ => return,
        };
        let Some(items) = table.get(&block) else {
            // Validated configs always have the table entry.
            warn!(%block, ?modality, "block missing from stimulus table, skipping");
            return;
        };

        for &item in items {
            for &(left, right) in pairs {
                let stimuli = vec![
                    self.resolve(modality, ctx.condition, item, left),
                    self.resolve(modality, ctx.condition, item, right),
                ];
                let meta = TrialMeta {
                    block: Some(block),
                    item: Some(item),
                    pair: Some((left, right)),
                    ..TrialMeta::default()
                };
                match mode {
                    ResponseMode::Discrete => {
                        for (index, prompt) in self.config.prompts.iter().enumerate() {
                            timeline.push(TrialSpec {
                                modality,
                                stimuli: stimuli.clone(),
                                prompts: vec![prompt.clone()],
                                mode: ResponseMode::Discrete,
                                suppress_default_finish: false,
                                meta: TrialMeta {
                                    prompt_index: Some(index + 1),
                                    ..meta.clone()
                                },
                            });
                        }
                    }
                    ResponseMode::Sequential => {
                        timeline.push(TrialSpec {
                            modality,
                            stimuli: stimuli.clone(),
                            prompts: self.config.prompts.clone(),
                            mode: ResponseMode::Sequential,
                            suppress_default_finish: false,
                            meta,
                        });
                    }
                }
            }
        }
    }

    fn resolve(&self, modality: Modality, condition: Condition, item: u32, variant: u8) -> String {
        match modality {
            Modality::Image => self.resolver.image(condition, item, variant),
            _ => self.resolver.audio(condition, item, variant),
        }
    }

    fn text_trial(&self, text: &str) -> TrialSpec {
        TrialSpec {
            modality: Modality::Text,
            stimuli: Vec::new(),
            prompts: vec![text.to_string()],
            mode: ResponseMode::Discrete,
            suppress_default_finish: false,
            meta: TrialMeta::default(),
        }
    }
}
