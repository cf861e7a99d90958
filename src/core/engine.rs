use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use tracing::debug;

use super::error::SimulationError;
use super::types::{SimulationParameters, SimulationResult, WealthPath};

// Draws are taken in trial-major order. Wealth is never clamped.
pub fn run_simulation<R: Rng + ?Sized>(
    params: &SimulationParameters,
    rng: &mut R,
) -> Result<SimulationResult, SimulationError> {
    params.validate()?;
    let returns = Normal::new(params.mean_return, params.volatility)
        .map_err(|_| SimulationError::invalid("volatility", "must be finite and >= 0"))?;

    debug!(
        mean_return = params.mean_return,
        volatility = params.volatility,
        starting_wealth = params.starting_wealth,
        periods = params.periods,
        trial_count = params.trial_count,
        "running simulation"
    );

    let mut final_wealths = Vec::with_capacity(params.trial_count);
    let mut path: WealthPath = Vec::with_capacity(params.periods + 1);

    for _ in 0..params.trial_count {
        path.clear();
        simulate_trial(params, &returns, rng, &mut path);
        final_wealths.push(path[path.len() - 1]);
    }

    Ok(SimulationResult {
        final_wealths,
        sample_path: path,
    })
}

pub fn run_simulation_seeded(
    params: &SimulationParameters,
    seed: u64,
) -> Result<SimulationResult, SimulationError> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    run_simulation(params, &mut rng)
}

fn simulate_trial<R: Rng + ?Sized>(
    params: &SimulationParameters,
    returns: &Normal<f64>,
    rng: &mut R,
    path: &mut WealthPath,
) {
    let mut wealth = params.starting_wealth;
    path.push(wealth);
    for _ in 0..params.periods {
        wealth *= 1.0 + returns.sample(rng);
        path.push(wealth);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::{any, prop_assert, prop_assert_eq, proptest};
    use rand::RngCore;

    fn assert_approx_tol(actual: f64, expected: f64, tol: f64) {
        assert!(
            (actual - expected).abs() <= tol,
            "expected {expected}, got {actual}, tolerance {tol}"
        );
    }

    fn sample_params() -> SimulationParameters {
        SimulationParameters {
            mean_return: 0.0378,
            volatility: 0.0761,
            starting_wealth: 10_000.0,
            periods: 12,
            trial_count: 1_000,
        }
    }

    #[test]
    fn result_shape_matches_parameters() {
        let params = sample_params();
        let result = run_simulation_seeded(&params, 42).expect("valid params");

        assert_eq!(result.final_wealths.len(), 1_000);
        assert_eq!(result.sample_path.len(), 13);
        assert_eq!(result.sample_path[0], 10_000.0);
    }

    #[test]
    fn last_final_wealth_is_end_of_sample_path() {
        let result = run_simulation_seeded(&sample_params(), 7).expect("valid params");
        let last_final = result.final_wealths[result.final_wealths.len() - 1];
        let last_path = result.sample_path[result.sample_path.len() - 1];
        assert_eq!(last_final, last_path);
    }

    #[test]
    fn zero_periods_leave_every_trial_at_starting_wealth() {
        let mut params = sample_params();
        params.periods = 0;

        let result = run_simulation_seeded(&params, 3).expect("valid params");
        assert_eq!(result.sample_path, vec![10_000.0]);
        assert!(result.final_wealths.iter().all(|&w| w == 10_000.0));
    }

    #[test]
    fn zero_volatility_compounds_deterministically() {
        let mut params = sample_params();
        params.volatility = 0.0;
        params.periods = 24;
        params.trial_count = 50;

        let expected = 10_000.0 * 1.0378_f64.powi(24);
        let result = run_simulation_seeded(&params, 11).expect("valid params");
        for wealth in &result.final_wealths {
            assert_approx_tol(*wealth, expected, expected * 1e-12);
        }
        for (t, wealth) in result.sample_path.iter().enumerate() {
            let hand = 10_000.0 * 1.0378_f64.powi(t as i32);
            assert_approx_tol(*wealth, hand, hand * 1e-12);
        }
    }

    #[test]
    fn fixed_seed_reruns_are_identical() {
        let params = sample_params();
        let a = run_simulation_seeded(&params, 123).expect("valid params");
        let b = run_simulation_seeded(&params, 123).expect("valid params");
        assert_eq!(a, b);

        let c = run_simulation_seeded(&params, 124).expect("valid params");
        assert_ne!(a.final_wealths, c.final_wealths);
    }

    #[test]
    fn injected_generator_is_advanced_once_per_period() {
        let mut params = sample_params();
        params.periods = 5;
        params.trial_count = 4;

        let mut shared = ChaCha8Rng::seed_from_u64(99);
        let first = run_simulation(&params, &mut shared).expect("valid params");
        let second = run_simulation(&params, &mut shared).expect("valid params");
        assert_ne!(first.final_wealths, second.final_wealths);

        // The second run continues the stream where the first stopped.
        params.trial_count = 8;
        let combined = run_simulation_seeded(&params, 99).expect("valid params");
        assert_eq!(&combined.final_wealths[..4], &first.final_wealths[..]);
        assert_eq!(&combined.final_wealths[4..], &second.final_wealths[..]);
        assert_eq!(combined.sample_path, second.sample_path);
    }

    #[test]
    fn extreme_volatility_is_not_clamped() {
        let mut params = sample_params();
        params.mean_return = 0.0;
        params.volatility = 3.0;
        params.periods = 6;
        params.trial_count = 2_000;

        let result = run_simulation_seeded(&params, 5).expect("valid params");
        assert!(result.final_wealths.iter().any(|&w| w < 0.0));
        assert!(result.final_wealths.iter().all(|w| w.is_finite()));
    }

    #[test]
    fn mean_log_growth_converges_to_periods_times_mean() {
        let params = SimulationParameters {
            mean_return: 0.01,
            volatility: 0.01,
            starting_wealth: 1_000.0,
            periods: 12,
            trial_count: 100_000,
        };

        let result = run_simulation_seeded(&params, 2024).expect("valid params");
        let mean_log = result
            .final_wealths
            .iter()
            .map(|w| (w / params.starting_wealth).ln())
            .sum::<f64>()
            / params.trial_count as f64;

        assert_approx_tol(mean_log, 12.0 * 0.01, 0.003);
    }

    #[test]
    fn rejects_zero_trials() {
        let mut params = sample_params();
        params.trial_count = 0;
        let err = run_simulation_seeded(&params, 1).expect_err("must reject zero trials");
        assert_eq!(err, SimulationError::invalid("trial_count", "must be >= 1"));
    }

    #[test]
    fn rejects_non_positive_starting_wealth() {
        let mut params = sample_params();
        params.starting_wealth = 0.0;
        let err = run_simulation_seeded(&params, 1).expect_err("must reject zero wealth");
        assert!(matches!(
            err,
            SimulationError::InvalidParameter {
                name: "starting_wealth",
                ..
            }
        ));
    }

    #[test]
    fn rejects_negative_volatility() {
        let mut params = sample_params();
        params.volatility = -0.01;
        let err = run_simulation_seeded(&params, 1).expect_err("must reject negative vol");
        assert!(matches!(
            err,
            SimulationError::InvalidParameter {
                name: "volatility",
                ..
            }
        ));
    }

    #[test]
    fn rejection_happens_before_any_draw() {
        let mut params = sample_params();
        params.trial_count = 0;

        let mut used = ChaCha8Rng::seed_from_u64(8);
        let _ = run_simulation(&params, &mut used);
        let mut fresh = ChaCha8Rng::seed_from_u64(8);
        assert_eq!(used.next_u64(), fresh.next_u64());
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(48))]

        #[test]
        fn prop_shapes_hold_for_valid_parameters(
            seed in any::<u64>(),
            mean_bp in -500i32..800,
            vol_bp in 0u32..2500,
            start in 1u32..1_000_000,
            periods in 0usize..60,
            trials in 1usize..80,
        ) {
            let params = SimulationParameters {
                mean_return: mean_bp as f64 / 10_000.0,
                volatility: vol_bp as f64 / 10_000.0,
                starting_wealth: start as f64,
                periods,
                trial_count: trials,
            };

            let result = run_simulation_seeded(&params, seed).expect("valid params");
            prop_assert_eq!(result.final_wealths.len(), trials);
            prop_assert_eq!(result.sample_path.len(), periods + 1);
            prop_assert_eq!(result.sample_path[0], start as f64);
            prop_assert_eq!(
                result.final_wealths[trials - 1],
                result.sample_path[periods]
            );
            prop_assert!(result.final_wealths.iter().all(|w| w.is_finite()));
        }
    }
}
