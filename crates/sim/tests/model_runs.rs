//! Integration tests running complete models through the builder.

use shoal_sim::model::config::{
    AgeingConfig, CategoryValues, DerivedConfig, DerivedQuantityConfig, DerivedQuantityKind,
    InitialisationPhaseKindConfig, IterativeConfig, LikelihoodKind, MortalityConstantRateConfig,
    ObservationConfig, ObservationKind, ProcessKindConfig, ProportionMethod, RecruitmentBevertonHoltConfig,
    RecruitmentConstantConfig, ReportConfig, StateCategoryByAgeConfig, YearValues,
};
use shoal_sim::processes::ProcessKind;
use shoal_sim::selectivity::SelectivityKind;
use shoal_sim::{Model, ModelBuilder, ModelError};

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

fn assert_close(actual: f64, expected: f64, tolerance: f64) {
    let scale = expected.abs().max(1.0);
    assert!(
        (actual - expected).abs() <= tolerance * scale,
        "expected {expected}, got {actual}"
    );
}

fn ageing(categories: &[&str]) -> ProcessKindConfig {
    ProcessKindConfig::Ageing(AgeingConfig {
        categories: strings(categories),
    })
}

fn mortality(categories: &[&str], m: f64) -> ProcessKindConfig {
    ProcessKindConfig::MortalityConstantRate(MortalityConstantRateConfig {
        categories: strings(categories),
        m: vec![m],
        selectivities: strings(&["one"]),
        time_step_ratio: Vec::new(),
    })
}

fn abundance(label: &str, categories: &[&str], selectivity: &str) -> DerivedQuantityConfig {
    DerivedQuantityConfig {
        label: label.to_string(),
        kind: DerivedQuantityKind::Abundance,
        categories: strings(categories),
        selectivities: strings(&[selectivity]),
        time_step: "annual".to_string(),
        time_step_proportion: 0.5,
        time_step_proportion_method: ProportionMethod::WeightedSum,
    }
}

const STAGES: [&str; 4] = ["immature.male", "mature.male", "immature.female", "mature.female"];

/// Four categories, constant recruitment into the immature stage and no
/// initialisation, so each cohort decays by natural mortality alone.
fn create_cohort_builder() -> ModelBuilder {
    ModelBuilder::new(1994, 2008, 1, 20)
        .plus_group(true)
        .category_format("stage.sex")
        .categories(&STAGES)
        .selectivity("one", SelectivityKind::Constant { c: 1.0 })
        .process("ageing", ageing(&STAGES))
        .process(
            "recruitment",
            ProcessKindConfig::RecruitmentConstant(RecruitmentConstantConfig {
                categories: strings(&["immature.male", "immature.female"]),
                proportions: vec![0.6, 0.4],
                r0: 100_000.0,
                age: Some(1),
            }),
        )
        .process("mortality", mortality(&STAGES, 0.065))
        .time_step("annual", &["ageing", "recruitment", "mortality"])
}

#[test]
fn test_cohorts_decay_by_natural_mortality() {
    let mut model = create_cohort_builder().build().unwrap();
    let report = model.run().unwrap();

    let partition = model.partition();
    let male = partition.category(partition.find("immature.male").unwrap());
    let female = partition.category(partition.find("immature.female").unwrap());

    // Fifteen years run, so ages 1..=15 hold one cohort each
    let survival = 1.0 - (-0.065f64).exp();
    let mut expected_male = 60_000.0;
    let mut expected_female = 40_000.0;
    for age in 1..=15u32 {
        expected_male -= survival * expected_male;
        expected_female -= survival * expected_female;
        let index = male.index_of_age(age).unwrap();
        assert_close(male.data()[index], expected_male, 1e-9);
        assert_close(female.data()[index], expected_female, 1e-9);
    }
    for age in 16..=20u32 {
        assert_eq!(male.data()[male.index_of_age(age).unwrap()], 0.0);
    }

    for name in ["mature.male", "mature.female"] {
        let category = partition.category(partition.find(name).unwrap());
        assert!(category.data().iter().all(|v| *v == 0.0));
    }

    assert_eq!(report.partition.len(), 4);
    assert!(report.initialisation.is_empty());
    assert_eq!(report.objective.total, 0.0);
}

#[test]
fn test_runs_are_deterministic() {
    let mut model = create_cohort_builder()
        .derived_quantity(abundance("total", &["*"], "one"))
        .build()
        .unwrap();

    let first = model.run().unwrap();
    let second = model.run().unwrap();
    assert_eq!(first, second);

    let mut copy = model.clone();
    assert_eq!(copy.run().unwrap(), first);
}

#[test]
fn test_model_loads_from_json_file() {
    let builder = create_cohort_builder();
    let json = serde_json::to_string_pretty(builder.config()).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.json");
    std::fs::write(&path, json).unwrap();

    let mut loaded = Model::from_json_file(&path).unwrap();
    let mut built = builder.build().unwrap();
    assert_eq!(loaded.run().unwrap(), built.run().unwrap());

    let missing = Model::from_json_file(dir.path().join("missing.json"));
    assert!(matches!(missing, Err(ModelError::Io(_))));
}

#[test]
fn test_state_category_by_age_sets_initial_numbers() {
    let mut model = ModelBuilder::new(2000, 2001, 1, 5)
        .categories(&["stock"])
        .selectivity("one", SelectivityKind::Constant { c: 1.0 })
        .process("ageing", ageing(&["stock"]))
        .time_step("annual", &["ageing"])
        .initialisation_phase(
            "state",
            InitialisationPhaseKindConfig::StateCategoryByAge(StateCategoryByAgeConfig {
                categories: strings(&["stock"]),
                min_age: 2,
                max_age: 4,
                n: vec![CategoryValues {
                    category: "stock".to_string(),
                    values: vec![10.0, 20.0, 30.0],
                }],
            }),
        )
        .build()
        .unwrap();

    let report = model.run().unwrap();

    // Two years of ageing without a plus group
    let partition = model.partition();
    let stock = partition.category(partition.find("stock").unwrap());
    assert_eq!(stock.data(), &[0.0, 0.0, 0.0, 10.0, 20.0]);
    assert_eq!(report.initialisation[0].years, 0);
}

fn create_iterative_builder(convergence_years: Vec<u32>, lambda: f64) -> ModelBuilder {
    ModelBuilder::new(2000, 2004, 1, 10)
        .plus_group(true)
        .categories(&["stock"])
        .selectivity("one", SelectivityKind::Constant { c: 1.0 })
        .process("ageing", ageing(&["stock"]))
        .process(
            "recruitment",
            ProcessKindConfig::RecruitmentConstant(RecruitmentConstantConfig {
                categories: strings(&["stock"]),
                proportions: vec![1.0],
                r0: 1000.0,
                age: None,
            }),
        )
        .process("mortality", mortality(&["stock"], 0.2))
        .time_step("annual", &["ageing", "recruitment", "mortality"])
        .initialisation_phase(
            "equilibrium",
            InitialisationPhaseKindConfig::Iterative(IterativeConfig {
                years: 200,
                convergence_years,
                lambda,
                insert_processes: Vec::new(),
                exclude_processes: Vec::new(),
            }),
        )
}

#[test]
fn test_iterative_phase_stops_at_convergence() {
    let mut model = create_iterative_builder(vec![5, 100], 1e-3).build().unwrap();
    let report = model.run().unwrap();

    let summary = &report.initialisation[0];
    assert_eq!(summary.label, "equilibrium");
    assert_eq!(summary.years, 100);
    assert_eq!(summary.converged, Some(true));
}

#[test]
fn test_iterative_phase_runs_all_years_without_checks() {
    let mut model = create_iterative_builder(Vec::new(), 1e-3).build().unwrap();
    let report = model.run().unwrap();

    let summary = &report.initialisation[0];
    assert_eq!(summary.years, 200);
    assert_eq!(summary.converged, None);

    // Equilibrium numbers below the plus group
    let partition = model.partition();
    let stock = partition.category(partition.find("stock").unwrap());
    let survival = (-0.2f64).exp();
    assert_close(stock.data()[0], 1000.0 * survival, 1e-9);
    assert_close(stock.data()[1], 1000.0 * survival.powi(2), 1e-9);
}

fn create_beverton_holt_builder(r0: Option<f64>, b0: Option<f64>) -> ModelBuilder {
    ModelBuilder::new(2000, 2009, 1, 20)
        .plus_group(true)
        .categories(&["stock"])
        .selectivity("one", SelectivityKind::Constant { c: 1.0 })
        .selectivity(
            "maturity",
            SelectivityKind::Logistic {
                a50: 5.0,
                ato95: 2.0,
                alpha: 1.0,
            },
        )
        .derived_quantity(abundance("ssb", &["stock"], "maturity"))
        .process("ageing", ageing(&["stock"]))
        .process(
            "recruitment",
            ProcessKindConfig::RecruitmentBevertonHolt(RecruitmentBevertonHoltConfig {
                categories: strings(&["stock"]),
                proportions: vec![1.0],
                r0,
                b0,
                steepness: 0.75,
                age: None,
                ssb: "ssb".to_string(),
                ssb_offset: None,
                recruitment_multipliers: vec![1.0],
                standardise_years: Vec::new(),
                b0_phase: None,
            }),
        )
        .process("mortality", mortality(&["stock"], 0.2))
        .time_step("annual", &["ageing", "recruitment", "mortality"])
        .initialisation_phase(
            "equilibrium",
            InitialisationPhaseKindConfig::Derived(DerivedConfig {
                insert_processes: Vec::new(),
                exclude_processes: Vec::new(),
                max_iterations: 1000,
            }),
        )
}

#[test]
fn test_beverton_holt_from_r0_stays_at_equilibrium() {
    let mut model = create_beverton_holt_builder(Some(1_000_000.0), None).build().unwrap();
    let report = model.run().unwrap();
    assert_eq!(report.initialisation[0].converged, Some(true));

    let ProcessKind::RecruitmentBevertonHolt(recruitment) = model.process("recruitment").unwrap().kind() else {
        panic!("expected Beverton-Holt recruitment");
    };
    let ssb = model.derived_quantity("ssb").unwrap();
    let b0 = ssb.last_value_from_initialisation(0).unwrap();
    assert!(b0 > 0.0);
    assert_close(recruitment.b0(), b0, 1e-12);

    // Unfished and at equilibrium, so every year recruits R0
    for (&year, &recruits) in recruitment.recruits() {
        assert_close(recruits / 1_000_000.0, 1.0, 1e-2);
        assert_close(ssb.value(year) / b0, 1.0, 1e-2);
    }
    assert_eq!(recruitment.recruits().len(), 10);
}

#[test]
fn test_beverton_holt_from_b0_scales_partition() {
    let mut model = create_beverton_holt_builder(None, Some(500_000.0)).build().unwrap();
    let report = model.run().unwrap();

    let ProcessKind::RecruitmentBevertonHolt(recruitment) = model.process("recruitment").unwrap().kind() else {
        panic!("expected Beverton-Holt recruitment");
    };
    assert!(recruitment.have_scaled());
    assert!(recruitment.r0() > 1.0);

    let ssb = model.derived_quantity("ssb").unwrap();
    assert_close(ssb.last_initialisation_value().unwrap() / 500_000.0, 1.0, 1e-2);
    // One extra year after scaling
    assert!(report.initialisation[0].years > 20);
}

#[test]
fn test_configuration_errors_are_reported_together() {
    let result = ModelBuilder::new(2000, 1990, 1, 10)
        .categories(&["stock"])
        .process("ageing", ageing(&["missing"]))
        .process("mortality", mortality(&["stock"], 0.2))
        .time_step("annual", &["ageing", "mortality", "unknown"])
        .build();

    let Err(error) = result else {
        panic!("expected configuration errors");
    };
    assert!(matches!(error, ModelError::Configuration(_)));
    let errors = error.config_errors().unwrap();
    // final year, unknown category, unknown selectivity, unknown process
    assert!(errors.len() >= 4, "{error}");
    assert!(errors.contains_location("model.final_year"));
}

/// Beverton-Holt recruitment with spawning biomass calculated in `ssb_step`.
fn create_two_step_builder(ssb_step: &str, ssb_offset: Option<u32>) -> ModelBuilder {
    ModelBuilder::new(2000, 2004, 1, 10)
        .plus_group(true)
        .categories(&["stock"])
        .selectivity("one", SelectivityKind::Constant { c: 1.0 })
        .derived_quantity(DerivedQuantityConfig {
            time_step: ssb_step.to_string(),
            ..abundance("ssb", &["stock"], "one")
        })
        .process("ageing", ageing(&["stock"]))
        .process(
            "recruitment",
            ProcessKindConfig::RecruitmentBevertonHolt(RecruitmentBevertonHoltConfig {
                categories: strings(&["stock"]),
                proportions: vec![1.0],
                r0: Some(1000.0),
                b0: None,
                steepness: 0.75,
                age: None,
                ssb: "ssb".to_string(),
                ssb_offset,
                recruitment_multipliers: vec![1.0],
                standardise_years: Vec::new(),
                b0_phase: None,
            }),
        )
        .process("mortality", mortality(&["stock"], 0.2))
        .initialisation_phase(
            "equilibrium",
            InitialisationPhaseKindConfig::Derived(DerivedConfig {
                insert_processes: Vec::new(),
                exclude_processes: Vec::new(),
                max_iterations: 1000,
            }),
        )
}

#[test]
fn test_ssb_offset_cannot_read_an_uncalculated_year() {
    let result = create_two_step_builder("winter", Some(0))
        .time_step("annual", &["ageing", "recruitment", "mortality"])
        .time_step("winter", &[])
        .build();

    let Err(error) = result else {
        panic!("expected a configuration error");
    };
    assert!(matches!(error, ModelError::Configuration(_)));
    assert!(error
        .config_errors()
        .unwrap()
        .contains_location("processes[recruitment].ssb_offset"));
}

#[test]
fn test_ssb_offset_of_zero_reads_the_current_year() {
    let mut model = create_two_step_builder("spawning", None)
        .time_step("spawning", &["mortality"])
        .time_step("annual", &["ageing", "recruitment"])
        .build()
        .unwrap();
    model.run().unwrap();

    let ProcessKind::RecruitmentBevertonHolt(recruitment) = model.process("recruitment").unwrap().kind() else {
        panic!("expected Beverton-Holt recruitment");
    };
    assert_eq!(recruitment.ssb_offset(), 0);
    let ssb = model.derived_quantity("ssb").unwrap();
    assert_eq!(recruitment.ssb_values().len(), 5);
    for (year, value) in recruitment.ssb_values() {
        assert_eq!(ssb.values()[year], *value);
    }
}

const SEXES: [&str; 2] = ["male", "female"];

/// Survivors after `years` of ageing into a plus group at age 20 and a
/// constant mortality `m`, starting from `initial` at ages 10 to 20.
fn expected_numbers(initial: &[f64], years: usize, m: f64) -> Vec<f64> {
    let survival = (-(years as f64) * m).exp();
    let last = initial.len() - 1;
    (0..initial.len())
        .map(|index| {
            if index == last {
                initial[last - years..].iter().sum::<f64>() * survival
            } else if index >= years {
                initial[index - years] * survival
            } else {
                0.0
            }
        })
        .collect()
}

#[test]
fn test_two_sex_ageing_and_mortality_by_year() {
    let male: Vec<f64> = (1..=11).map(|i| 100.0 * i as f64).collect();
    let female = vec![500.0; 11];
    let m = [0.1, 0.2];

    let mut model = ModelBuilder::new(2000, 2004, 10, 20)
        .plus_group(true)
        .categories(&SEXES)
        .selectivity("one", SelectivityKind::Constant { c: 1.0 })
        .process("ageing", ageing(&SEXES))
        .process(
            "mortality",
            ProcessKindConfig::MortalityConstantRate(MortalityConstantRateConfig {
                categories: strings(&SEXES),
                m: m.to_vec(),
                selectivities: strings(&["one"]),
                time_step_ratio: Vec::new(),
            }),
        )
        .time_step("annual", &["ageing", "mortality"])
        .initialisation_phase(
            "state",
            InitialisationPhaseKindConfig::StateCategoryByAge(StateCategoryByAgeConfig {
                categories: strings(&SEXES),
                min_age: 10,
                max_age: 20,
                n: vec![
                    CategoryValues {
                        category: "male".to_string(),
                        values: male.clone(),
                    },
                    CategoryValues {
                        category: "female".to_string(),
                        values: female.clone(),
                    },
                ],
            }),
        )
        .report(ReportConfig {
            label: "partition".to_string(),
            time_step: "annual".to_string(),
            categories: Vec::new(),
            years: Vec::new(),
        })
        .build()
        .unwrap();
    let report = model.run().unwrap();

    let snapshots = &report.reports[0].snapshots;
    assert_eq!(snapshots.len(), 5);
    for (years, (year, categories)) in (1..).zip(snapshots) {
        assert_eq!(*year, 1999 + years as u32);
        for (snapshot, (initial, m)) in categories.iter().zip([(&male, m[0]), (&female, m[1])]) {
            assert_eq!(snapshot.min_age, 10);
            let expected = expected_numbers(initial, years, m);
            for (actual, expected) in snapshot.values.iter().zip(&expected) {
                assert_close(*actual, *expected, 1e-12);
            }
        }
    }

    // Pinned: after five years the male plus group holds ages 15 to 20 of
    // the starting vector, 100 * (6 + 7 + 8 + 9 + 10 + 11) * exp(-0.5)
    let final_male = &report.partition[0];
    assert_eq!(final_male.category, "male");
    assert_close(final_male.values[10], 3_093.306_364_534_430_5, 1e-12);
    assert_close(final_male.values[5], 60.653_065_971_263_34, 1e-12);
    assert!(final_male.values[..5].iter().all(|v| *v == 0.0));
    assert_eq!(report.partition, snapshots[&2004]);
}

fn observation(label: &str, process: Option<&str>, proportion: f64) -> ObservationConfig {
    ObservationConfig {
        label: label.to_string(),
        kind: ObservationKind::Abundance,
        categories: strings(&["stock"]),
        selectivities: strings(&["one"]),
        time_step: "annual".to_string(),
        process: process.map(str::to_string),
        time_step_proportion: proportion,
        time_step_proportion_method: ProportionMethod::WeightedSum,
        catchability: 1.0,
        observed: vec![YearValues {
            year: 2000,
            values: vec![1000.0],
        }],
        error_values: vec![YearValues {
            year: 2000,
            values: vec![0.2],
        }],
        likelihood: LikelihoodKind::Lognormal,
    }
}

/// One year of ageing then mortality, watched from every executor position.
fn create_dispatch_builder() -> ModelBuilder {
    ModelBuilder::new(2000, 2000, 1, 5)
        .categories(&["stock"])
        .selectivity("one", SelectivityKind::Constant { c: 1.0 })
        .process("ageing", ageing(&["stock"]))
        .process("mortality", mortality(&["stock"], 0.2))
        .time_step("annual", &["ageing", "mortality"])
        .initialisation_phase(
            "state",
            InitialisationPhaseKindConfig::StateCategoryByAge(StateCategoryByAgeConfig {
                categories: strings(&["stock"]),
                min_age: 1,
                max_age: 5,
                n: vec![CategoryValues {
                    category: "stock".to_string(),
                    values: vec![100.0, 200.0, 300.0, 400.0, 500.0],
                }],
            }),
        )
        .observation(observation("before_ageing", Some("ageing"), 0.0))
        .observation(observation("after_ageing", Some("ageing"), 1.0))
        .observation(observation("block_start", None, 0.0))
        .observation(observation("block_end", None, 1.0))
        .report(ReportConfig {
            label: "end_of_year".to_string(),
            time_step: "annual".to_string(),
            categories: Vec::new(),
            years: Vec::new(),
        })
}

#[test]
fn test_executors_run_around_their_processes() {
    let mut model = create_dispatch_builder().build().unwrap();
    let report = model.run().unwrap();

    let expected = |label: &str| {
        let comparisons = model.observation(label).unwrap().comparisons();
        assert_eq!(comparisons.len(), 1);
        comparisons[0].expected
    };
    // Attached to ageing: the whole partition before, the oldest age lost after
    assert_eq!(expected("before_ageing"), 1500.0);
    assert_eq!(expected("after_ageing"), 1000.0);
    // The mortality block starts after ageing
    assert_eq!(expected("block_start"), 1000.0);
    assert_close(expected("block_end"), 1000.0 * (-0.2f64).exp(), 1e-12);

    // The year executor sees the end of the step
    let snapshot = &report.reports[0].snapshots[&2000];
    assert_eq!(snapshot, &report.partition);
    assert_eq!(snapshot[0].values[0], 0.0);
    assert_close(snapshot[0].values[1], 100.0 * (-0.2f64).exp(), 1e-12);
}

#[test]
fn test_full_iterations_start_from_a_clean_state() {
    let mut model = create_dispatch_builder()
        .estimate("process[mortality].m(1)", 0.01, 0.5)
        .build()
        .unwrap();

    let first = model.full_iteration().unwrap();
    let first_report = model.run().unwrap();
    assert_eq!(first_report.objective.total, first);

    model.set_estimate_values(&[0.4]).unwrap();
    let second = model.full_iteration().unwrap();
    assert_ne!(first, second);

    model.set_estimate_values(&[0.2]).unwrap();
    assert_eq!(model.full_iteration().unwrap(), first);
    assert_eq!(model.observation("block_end").unwrap().comparisons().len(), 1);
    assert_eq!(model.run().unwrap(), first_report);

    assert!(model.set_estimate_values(&[0.2, 0.3]).is_err());
}
