use crate::config::ExperimentConfig;
use pairex_core::{Condition, ParticipantContext};
use rand::Rng;
use tracing::info;

/// Fallback range when no external identifier is supplied.
const FALLBACK_ID_MAX: u32 = 10_000;

/// Assigns a participant to a counterbalanced block order and a
/// between-subject condition.
///
/// The block order is deterministic in the identifier
/// (`orderings[id % K]`); the condition is a fair coin flip from the
/// injected rng, independent of the identifier. A missing identifier is
/// valid input and draws a random one so every session is assignable.
///
/// Callers must pass a validated config (non-empty `orderings`).
pub fn assign<R: Rng>(
    id: Option<u32>,
    config: &ExperimentConfig,
    rng: &mut R,
) -> ParticipantContext {
    let id = id.unwrap_or_else(|| rng.random_range(0..FALLBACK_ID_MAX));
    let block_order = config.orderings[id as usize % config.orderings.len()].clone();
    let condition = if rng.random_bool(0.5) {
        Condition::Male
    } else {
        Condition::Female
    };

    info!(id, %condition, ?block_order, "participant assigned");

    ParticipantContext {
        id,
        condition,
        block_order,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pairex_core::BlockKey::{A, B, C};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn block_order_is_id_mod_k() {
        let config = ExperimentConfig::default();
        let mut rng = StdRng::seed_from_u64(1);
        for id in 0..30 {
            let ctx = assign(Some(id), &config, &mut rng);
            assert_eq!(ctx.block_order, config.orderings[id as usize % 3]);
        }
    }

    #[test]
    fn id_seven_selects_the_second_ordering() {
        let config = ExperimentConfig::default();
        let mut rng = StdRng::seed_from_u64(2);
        let ctx = assign(Some(7), &config, &mut rng);
        assert_eq!(ctx.block_order, vec![B, C, A]);
    }

    #[test]
    fn assignment_is_stable_across_calls() {
        let config = ExperimentConfig::default();
        let mut rng = StdRng::seed_from_u64(3);
        let first = assign(Some(42), &config, &mut rng).block_order;
        let second = assign(Some(42), &config, &mut rng).block_order;
        assert_eq!(first, second);
        assert_eq!(first, vec![A, B, C]);
    }

    #[test]
    fn missing_id_draws_a_fallback_below_the_cap() {
        let config = ExperimentConfig::default();
        let mut rng = StdRng::seed_from_u64(4);
        let ctx = assign(None, &config, &mut rng);
        assert!(ctx.id < FALLBACK_ID_MAX);
        assert_eq!(ctx.block_order, config.orderings[ctx.id as usize % 3]);
    }

    #[test]
    fn coin_flip_hits_both_conditions() {
        let config = ExperimentConfig::default();
        let mut rng = StdRng::seed_from_u64(5);
        let conditions: Vec<Condition> = (0..64)
            .map(|_| assign(Some(0), &config, &mut rng).condition)
            .collect();
        assert!(conditions.contains(&Condition::Male));
        assert!(conditions.contains(&Condition::Female));
    }
}
