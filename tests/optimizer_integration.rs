//! Integration tests for plateau analysis and the greedy HMR optimizer.

mod common;

use common::{assert_close, at, build, inputs};
use pig_iron_balance::sim::event::ConverterEvent;
use pig_iron_balance::BalanceError;
use pig_iron_balance::scenario;
use pig_iron_balance::sim::kpi::marginal_cost;
use pig_iron_balance::sim::optimizer::{HmrOptimizer, OptimizerConfig};

#[test]
fn optimizer_saturates_plateau_converters() {
    pig_iron_balance::logging::init_test();
    let mut balance = common::two_spill_balance();
    let Ok(report) = HmrOptimizer::default().optimize(&mut balance) else {
        panic!("optimizer should converge");
    };

    assert_eq!(report.iterations, 1);
    assert_eq!(report.baseline_spills, 2);
    assert_close(report.baseline_value, 1930.0, 1e-6);
    assert_close(report.final_value, 1830.0, 1e-6);

    let hmrs = balance.hmrs();
    assert_close(hmrs[0], 1.0, 1e-9);
    assert_close(hmrs[1], 1.0, 1e-9);
    assert_close(hmrs[2], 1.0, 1e-12);

    let spills = balance.simulation().map(|s| s.spill_times()).unwrap_or_default();
    assert_eq!(spills, vec![at(175), at(201)]);
}

#[test]
fn latest_converter_takes_load_first() {
    let mut balance = common::two_spill_balance();
    let Ok(report) = HmrOptimizer::default().optimize(&mut balance) else {
        panic!("optimizer should converge");
    };
    let order: Vec<_> = report.adjustments.iter().map(|a| a.index).collect();
    assert_eq!(order, vec![1, 0]);
    assert!(report.adjustments.iter().all(|a| a.to > a.from));
}

/// One 0.5 charge at 30 min from 1325 t: a single spill at 80 min that a
/// 0.4 HMR raise retires, leaving the level exactly at the ceiling.
fn retirable_spill_balance() -> pig_iron_balance::PigIronBalance {
    build(inputs(1325.0, 600.0, vec![ConverterEvent::new(at(30), 0.5, "cv_1")]))
}

#[test]
fn retiring_a_spill_raises_the_marginal_cost() {
    let mut balance = retirable_spill_balance();
    let optimizer = HmrOptimizer::new(OptimizerConfig {
        unit_steel_price: 3.0,
        ..OptimizerConfig::default()
    });
    let Ok(report) = optimizer.optimize(&mut balance) else {
        panic!("optimizer should converge");
    };

    assert_eq!(report.iterations, 1);
    assert_close(balance.hmrs()[0], 0.9, 1e-9);
    assert_close(report.baseline_value, 1840.0, 1e-6);
    assert_close(report.final_value, 2000.0, 1e-6);

    // Cost is the marginal gain after each pass, not a monotone sequence.
    assert_eq!(report.cost_history.len(), report.iterations + 1);
    assert_eq!(report.cost_history[0], 0.0);
    assert_close(report.cost_history[1], 480.0, 1e-5);
    assert_close(
        report.total_cost,
        marginal_cost(report.final_value, report.baseline_value, 3.0),
        1e-9,
    );
    assert_eq!(balance.total_cost(), report.total_cost);

    assert_eq!(report.spill_history, vec![1, 0]);
    assert_close(report.headroom_history[0], 0.5, 1e-12);
    assert_close(report.headroom_history[1], 0.1, 1e-9);
}

#[test]
fn headroom_and_spills_never_grow_between_passes() {
    for mut balance in [common::two_spill_balance(), retirable_spill_balance()] {
        let Ok(report) = HmrOptimizer::default().optimize(&mut balance) else {
            panic!("optimizer should converge");
        };
        assert_eq!(report.headroom_history.len(), report.iterations + 1);
        assert!(report.headroom_history.windows(2).all(|w| w[1] < w[0]));
        assert!(report.spill_history.windows(2).all(|w| w[1] <= w[0]));
        assert!(report.cost_history.iter().all(|c| *c >= 0.0));
    }
}

#[test]
fn generated_scenarios_converge_within_converter_count() {
    for seed in [0, 7, 42, 158, 165] {
        let cfg = scenario::generate(seed);
        let Ok(mut balance) = cfg.build_balance() else {
            panic!("seed {seed} should build");
        };
        let Ok(report) = HmrOptimizer::new(cfg.optimizer_config()).optimize(&mut balance) else {
            panic!("seed {seed} should converge");
        };
        assert!(
            report.iterations <= balance.converters().len(),
            "seed {seed}: {} iterations for {} converters",
            report.iterations,
            balance.converters().len()
        );
        assert!(report.headroom_history.windows(2).all(|w| w[1] < w[0]));
        let plateaus = balance.virtual_plateaus().unwrap_or_default();
        assert!(plateaus.iter().all(|p| !p.can_be_optimized()));
    }
}

#[test]
fn second_run_finds_nothing_to_absorb() {
    let mut balance = common::two_spill_balance();
    assert!(HmrOptimizer::default().optimize(&mut balance).is_ok());
    let hmrs = balance.hmrs();

    let again = HmrOptimizer::default().optimize(&mut balance).ok();
    assert_eq!(again.map(|r| r.iterations), Some(0));
    assert_eq!(balance.hmrs(), hmrs);
}

#[test]
fn plateaus_after_optimization_are_not_absorbable() {
    let mut balance = common::two_spill_balance();
    assert!(HmrOptimizer::default().optimize(&mut balance).is_ok());
    let plateaus = balance.virtual_plateaus().unwrap_or_default();
    assert!(plateaus.iter().all(|p| !p.can_be_optimized()));
}

#[test]
fn converters_without_headroom_are_left_alone() {
    // Already at hmr.max: spills remain and nothing moves.
    let mut balance = build(inputs(
        1800.0,
        600.0,
        vec![ConverterEvent::new(at(60), 1.0, "cv_1")],
    ));
    let report = HmrOptimizer::default().optimize(&mut balance).ok();
    assert_eq!(report.as_ref().map(|r| r.iterations), Some(0));
    assert!(report.is_some_and(|r| r.final_spills > 0));
}

#[test]
fn optimize_requires_valid_balance_not_prior_simulation() {
    let mut balance = common::two_spill_balance();
    assert!(balance.simulation().is_none());
    assert!(!matches!(
        HmrOptimizer::default().optimize(&mut balance),
        Err(BalanceError::NotSimulated)
    ));
    assert!(balance.simulation().is_some());
}
