use std::time::Duration;

use approx::assert_relative_eq;
use matecarlo::benchmark::{BenchmarkConfig, OutputFormat, PlannedRun, run_benchmark};
use matecarlo::core::IntegrationError;
use matecarlo::engines::monte_carlo::{
    MonteCarloIntegrator, PartitionPolicy, ThreadPoolBackend, mc_integral_parallel,
    mc_integral_sequential,
};
use matecarlo::math::{CubicIntegral, FastRng, FastRngKind};

const ID: &str = "231RDB026";

fn problem() -> CubicIntegral {
    CubicIntegral::from_id(ID).expect("reference id parses")
}

#[test]
fn reference_id_maps_to_known_domain_and_integral() {
    let problem = problem();
    assert_eq!(
        (problem.cubic.a, problem.cubic.b, problem.cubic.c),
        (0, 2, 6)
    );
    let d = problem.domain;
    assert_eq!((d.xmin, d.xmax, d.ymin, d.ymax), (-1, 7, -21, 35));
    assert_relative_eq!(problem.area(), 448.0);
    assert_relative_eq!(problem.analytic_value(), -88.0 / 3.0, epsilon = 1e-12);
    assert!(problem.curve_fits_domain());
}

#[test]
fn sequential_estimate_within_two_percent_of_analytic() {
    let problem = problem();
    let exact = problem.analytic_value();
    for kind in [
        FastRngKind::Xoshiro256PlusPlus,
        FastRngKind::Pcg64,
        FastRngKind::StdRng,
    ] {
        let mut rng = FastRng::from_seed(kind, 2024);
        let estimate = mc_integral_sequential(&problem, 4_000_000, &mut rng).unwrap();
        let rel_err = ((estimate.value - exact) / exact).abs();
        assert!(
            rel_err <= 0.02,
            "kind={kind} mc={} exact={exact} rel_err={rel_err}",
            estimate.value
        );
    }
}

#[test]
fn parallel_estimate_matches_sequential_when_budget_divides() {
    let problem = problem();
    let exact = problem.analytic_value();
    let backend = ThreadPoolBackend::new(4).unwrap();

    let n = 4_000_000;
    let mut rng = FastRng::from_seed(FastRngKind::default(), 7);
    let seq = mc_integral_sequential(&problem, n, &mut rng).unwrap();
    let par = mc_integral_parallel(&problem, n, &backend, 7).unwrap();

    assert_eq!(par.samples_drawn, n);
    for value in [seq.value, par.value] {
        let rel_err = ((value - exact) / exact).abs();
        assert!(rel_err <= 0.02, "mc={value} exact={exact} rel_err={rel_err}");
    }
    assert!((seq.value - par.value).abs() <= 5.0 * (seq.stderr + par.stderr));
}

#[test]
fn clamped_curve_converges_to_clamped_reference() {
    // local minimum of x(x - 1)(x - 9) near x = 6.2 dips below ymin
    let problem = CubicIntegral::from_roots(0, 1, 9).unwrap();
    assert!(!problem.curve_fits_domain());

    let backend = ThreadPoolBackend::new(2).unwrap();
    let estimate = MonteCarloIntegrator::new(2_000_000, 99)
        .integrate_parallel(&problem, &backend)
        .unwrap();
    let reference = problem.reference_value();
    assert!(
        (estimate.value - reference).abs() <= 6.0 * estimate.stderr,
        "mc={} reference={reference} stderr={}",
        estimate.value,
        estimate.stderr
    );
}

#[test]
fn zero_samples_is_rejected_everywhere() {
    let problem = problem();
    let backend = ThreadPoolBackend::new(1).unwrap();
    let mut rng = FastRng::from_seed(FastRngKind::default(), 1);

    assert!(matches!(
        mc_integral_sequential(&problem, 0, &mut rng),
        Err(IntegrationError::InvalidArgument(_))
    ));
    assert!(matches!(
        mc_integral_parallel(&problem, 0, &backend, 1),
        Err(IntegrationError::InvalidArgument(_))
    ));
}

#[test]
fn truncation_draws_fewer_samples_but_divides_by_request() {
    let problem = problem();
    let backend = ThreadPoolBackend::new(2).unwrap();
    let integrator = MonteCarloIntegrator::new(10, 3).with_workers(4);

    let exact = integrator.integrate_parallel(&problem, &backend).unwrap();
    let truncated = integrator
        .clone()
        .with_partition(PartitionPolicy::Truncate)
        .integrate_parallel(&problem, &backend)
        .unwrap();

    assert_eq!(exact.samples_drawn, 10);
    assert_eq!(truncated.samples_drawn, 8);
    assert_eq!(truncated.samples_requested, 10);
    assert_relative_eq!(
        truncated.value,
        truncated.signed_count as f64 / 10.0 * 448.0,
        epsilon = 1e-12
    );
}

#[test]
fn fixed_seed_reproduces_both_estimators() {
    let problem = problem();
    let backend = ThreadPoolBackend::new(3).unwrap();
    let integrator = MonteCarloIntegrator::new(300_000, 55).with_rng_kind(FastRngKind::Pcg64);

    let s1 = integrator.integrate_sequential(&problem).unwrap();
    let s2 = integrator.integrate_sequential(&problem).unwrap();
    assert_eq!(s1.signed_count, s2.signed_count);

    let p1 = integrator.integrate_parallel(&problem, &backend).unwrap();
    let p2 = integrator.integrate_parallel(&problem, &backend).unwrap();
    assert_eq!(p1.signed_count, p2.signed_count);
    assert_eq!(p1.value, p2.value);
}

#[test]
fn integrator_generator_choice_reaches_parallel_workers() {
    let problem = problem();
    let backend = ThreadPoolBackend::new(2).unwrap();
    let counts: Vec<i64> = [
        FastRngKind::Xoshiro256PlusPlus,
        FastRngKind::Pcg64,
        FastRngKind::StdRng,
    ]
    .into_iter()
    .map(|kind| {
        MonteCarloIntegrator::new(100_000, 5)
            .with_rng_kind(kind)
            .integrate_parallel(&problem, &backend)
            .unwrap()
            .signed_count
    })
    .collect();
    assert_ne!(counts[0], counts[1]);
    assert_ne!(counts[0], counts[2]);
    assert_ne!(counts[1], counts[2]);
}

#[test]
fn benchmark_parallel_runs_follow_configured_generator() {
    let backend = ThreadPoolBackend::new(2).unwrap();
    let run = |rng_kind| {
        let config = BenchmarkConfig {
            rng_kind,
            ..BenchmarkConfig::default()
                .with_plan(vec![PlannedRun::parallel(100_000)])
                .with_seed(5)
                .with_output(OutputFormat::Json)
        };
        let mut out = Vec::new();
        run_benchmark(&config, &backend, &mut out).unwrap()[0]
            .estimate
            .signed_count
    };
    assert_ne!(run(FastRngKind::Xoshiro256PlusPlus), run(FastRngKind::Pcg64));
}

#[test]
fn deadline_aborts_long_runs() {
    let problem = problem();
    let backend = ThreadPoolBackend::new(2).unwrap();
    let integrator = MonteCarloIntegrator::new(1_000_000_000_000, 1).with_deadline(Duration::ZERO);

    assert!(matches!(
        integrator.integrate_sequential(&problem),
        Err(IntegrationError::DeadlineExceeded { .. })
    ));
    assert!(matches!(
        integrator.integrate_parallel(&problem, &backend),
        Err(IntegrationError::DeadlineExceeded { .. })
    ));
}

#[test]
fn benchmark_sweep_prints_every_run() {
    let backend = ThreadPoolBackend::new(2).unwrap();
    let config = BenchmarkConfig::default()
        .with_plan(vec![
            PlannedRun::sequential(10_000),
            PlannedRun::parallel(1_000),
            PlannedRun::parallel(100_000),
        ])
        .with_seed(5);

    let mut out = Vec::new();
    let reports = run_benchmark(&config, &backend, &mut out).unwrap();
    let text = String::from_utf8(out).unwrap();

    assert_eq!(reports.len(), 3);
    assert!(text.contains("a: 0, b: 2, c: 6"));
    assert!(text.contains("x_min: -1, x_max: 7, y_min: -21, y_max: 35"));
    assert!(text.contains("Sequential estimator with 10,000 points:"));
    assert!(text.contains("Parallel estimator with 100,000 points:"));
    for report in &reports {
        assert!(text.contains(&format!("Definite integral = {:.5}", report.estimate.value)));
    }
}

#[test]
fn benchmark_json_lines_parse_back() {
    let backend = ThreadPoolBackend::new(2).unwrap();
    let config = BenchmarkConfig::default()
        .with_plan(BenchmarkConfig::plan_for_sizes(&[2_000]))
        .with_seed(5)
        .with_output(OutputFormat::Json);

    let mut out = Vec::new();
    run_benchmark(&config, &backend, &mut out).unwrap();
    let text = String::from_utf8(out).unwrap();

    let estimators: Vec<String> = text
        .lines()
        .map(|line| {
            let value: serde_json::Value = serde_json::from_str(line).unwrap();
            value["estimator"].as_str().unwrap().to_string()
        })
        .collect();
    assert_eq!(estimators, ["sequential", "parallel"]);
}
