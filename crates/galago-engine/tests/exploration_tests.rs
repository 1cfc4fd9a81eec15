//! End-to-end exploration scenarios: a host program records constraints
//! through a session while the explorer derives fresh seeds by suffix
//! negation.

use std::collections::HashSet;

use galago_engine::explorer::{explore, ExploreOptions, HostError};
use galago_engine::report::{SessionReport, TerminatedReason};
use galago_expr::eval::{Assignment, Value};
use galago_runtime::recorder::CmpKind;
use galago_runtime::session::Session;
use galago_runtime::tag::Tag;

fn seeds(pairs: &[(&str, i64)]) -> Assignment {
    pairs
        .iter()
        .map(|(name, value)| (name.to_string(), Value::Int(*value)))
        .collect()
}

fn int_seed(assignment: &Assignment, name: &str) -> Result<i64, HostError> {
    assignment
        .get(name)
        .and_then(Value::as_int)
        .ok_or_else(|| HostError::from(format!("missing integer seed '{name}'")))
}

#[test]
fn five_case_select_explores_every_arm() {
    let session = Session::new();
    let mut executed_arms: HashSet<i32> = HashSet::new();

    let options = ExploreOptions {
        max_iterations: 10,
        ..ExploreOptions::default()
    };
    let report = explore(
        seeds(&[("choice", 0)]),
        |assignment| {
            let choice = int_seed(assignment, "choice")?;
            let tag = session
                .make_symbolic_int("choice", choice)
                .map_err(|err| HostError::from(err.to_string()))?;
            let arm = if (0..5).contains(&choice) { choice as i32 } else { -1 };
            let selected = session.switch_case(&tag, arm);
            if selected >= 0 {
                executed_arms.insert(selected);
            }
            Ok(session.flush())
        },
        &options,
    )
    .unwrap();

    assert_eq!(report.terminated_reason, TerminatedReason::Exhausted);
    assert_eq!(report.paths.len(), 5);

    let seeds_seen: HashSet<i64> = report
        .paths
        .iter()
        .map(|path| path.seeds["choice"].as_int().unwrap())
        .collect();
    assert_eq!(seeds_seen, HashSet::from([0, 1, 2, 3, 4]));

    for path in &report.paths {
        let value = path.seeds["choice"].as_int().unwrap();
        assert_eq!(
            path.rendered_constraints(),
            vec![format!("(choice == {value})")]
        );
    }
    assert_eq!(executed_arms, HashSet::from([0, 1, 2, 3, 4]));
}

#[test]
fn single_branch_explores_both_sides() {
    let session = Session::new();

    let report = explore(
        seeds(&[("x", 5)]),
        |assignment| {
            let x = int_seed(assignment, "x")?;
            let tag = session
                .make_symbolic_int("x", x)
                .map_err(|err| HostError::from(err.to_string()))?;
            let _taken = session.icmp_jump(x, 10, &tag, &Tag::empty(), CmpKind::Gt);
            Ok(session.flush())
        },
        &ExploreOptions::default(),
    )
    .unwrap();

    assert_eq!(report.terminated_reason, TerminatedReason::Exhausted);
    assert_eq!(report.paths.len(), 2);

    let not_taken = &report.paths[0];
    assert_eq!(not_taken.seeds["x"], Value::Int(5));
    assert_eq!(not_taken.rendered_constraints(), vec!["(x <= 10)"]);

    let taken = &report.paths[1];
    let flipped_seed = taken.seeds["x"].as_int().unwrap();
    assert!(flipped_seed > 10, "expected a seed above the threshold");
    assert_eq!(taken.rendered_constraints(), vec!["(x > 10)"]);
}

#[test]
fn conjunction_pruning_covers_three_regions() {
    let session = Session::new();

    let options = ExploreOptions {
        search_width: 1000,
        ..ExploreOptions::default()
    };
    let report = explore(
        seeds(&[("x", 0)]),
        |assignment| {
            let x = int_seed(assignment, "x")?;
            let tag = session
                .make_symbolic_int("x", x)
                .map_err(|err| HostError::from(err.to_string()))?;
            if session.icmp_jump(x, 0, &tag, &Tag::empty(), CmpKind::Ge) {
                session.icmp_jump(x, 100, &tag, &Tag::empty(), CmpKind::Lt);
            }
            Ok(session.flush())
        },
        &options,
    )
    .unwrap();

    assert_eq!(report.terminated_reason, TerminatedReason::Exhausted);
    assert_eq!(report.paths.len(), 3);

    let rendered: HashSet<Vec<String>> = report
        .paths
        .iter()
        .map(|path| path.rendered_constraints())
        .collect();
    let expected: HashSet<Vec<String>> = [
        vec!["(x >= 0)".to_string(), "(x < 100)".to_string()],
        vec!["(x >= 0)".to_string(), "(x >= 100)".to_string()],
        vec!["(x < 0)".to_string()],
    ]
    .into_iter()
    .collect();
    assert_eq!(rendered, expected);
}

#[test]
fn three_way_compare_explores_all_sign_buckets() {
    let session = Session::new();

    let report = explore(
        seeds(&[("x", 0)]),
        |assignment| {
            let x = int_seed(assignment, "x")?;
            let tag = session
                .make_symbolic_int("x", x)
                .map_err(|err| HostError::from(err.to_string()))?;
            let _sign = session.lcmp(x, 10, &tag, &Tag::empty());
            Ok(session.flush())
        },
        &ExploreOptions::default(),
    )
    .unwrap();

    assert_eq!(report.terminated_reason, TerminatedReason::Exhausted);
    assert_eq!(report.paths.len(), 3);

    let rendered: HashSet<String> = report
        .paths
        .iter()
        .flat_map(|path| path.rendered_constraints())
        .collect();
    assert_eq!(
        rendered,
        HashSet::from([
            "(x < 10)".to_string(),
            "(x == 10)".to_string(),
            "(x > 10)".to_string(),
        ])
    );
}

#[test]
fn two_variables_cover_the_full_branch_product() {
    let session = Session::new();

    let report = explore(
        seeds(&[("x", 0), ("y", 0)]),
        |assignment| {
            let x = int_seed(assignment, "x")?;
            let y = int_seed(assignment, "y")?;
            let tx = session
                .make_symbolic_int("x", x)
                .map_err(|err| HostError::from(err.to_string()))?;
            let ty = session
                .make_symbolic_int("y", y)
                .map_err(|err| HostError::from(err.to_string()))?;
            session.icmp_jump(x, 10, &tx, &Tag::empty(), CmpKind::Gt);
            session.icmp_jump(y, 5, &ty, &Tag::empty(), CmpKind::Lt);
            Ok(session.flush())
        },
        &ExploreOptions::default(),
    )
    .unwrap();

    assert_eq!(report.terminated_reason, TerminatedReason::Exhausted);
    assert_eq!(report.paths.len(), 4);

    let rendered: HashSet<Vec<String>> = report
        .paths
        .iter()
        .map(|path| path.rendered_constraints())
        .collect();
    let expected: HashSet<Vec<String>> = [
        vec!["(x <= 10)".to_string(), "(y < 5)".to_string()],
        vec!["(x <= 10)".to_string(), "(y >= 5)".to_string()],
        vec!["(x > 10)".to_string(), "(y < 5)".to_string()],
        vec!["(x > 10)".to_string(), "(y >= 5)".to_string()],
    ]
    .into_iter()
    .collect();
    assert_eq!(rendered, expected);
}

#[test]
fn path_condition_fingerprints_are_never_duplicated() {
    let session = Session::new();

    let report = explore(
        seeds(&[("x", 5)]),
        |assignment| {
            let x = int_seed(assignment, "x")?;
            let tag = session
                .make_symbolic_int("x", x)
                .map_err(|err| HostError::from(err.to_string()))?;
            session.icmp_jump(x, 10, &tag, &Tag::empty(), CmpKind::Gt);
            Ok(session.flush())
        },
        &ExploreOptions::default(),
    )
    .unwrap();

    let fingerprints: HashSet<u64> = report
        .paths
        .iter()
        .map(|path| path.path_condition.fingerprint())
        .collect();
    assert_eq!(fingerprints.len(), report.paths.len());
}

#[test]
fn max_iterations_bounds_the_number_of_executions() {
    let session = Session::new();

    let options = ExploreOptions {
        max_iterations: 3,
        ..ExploreOptions::default()
    };
    let report = explore(
        seeds(&[("choice", 0)]),
        |assignment| {
            let choice = int_seed(assignment, "choice")?;
            let tag = session
                .make_symbolic_int("choice", choice)
                .map_err(|err| HostError::from(err.to_string()))?;
            let arm = if (0..50).contains(&choice) { choice as i32 } else { -1 };
            session.switch_case(&tag, arm);
            Ok(session.flush())
        },
        &options,
    )
    .unwrap();

    assert_eq!(report.terminated_reason, TerminatedReason::MaxIterations);
    assert_eq!(report.iterations, 3);
    assert_eq!(report.paths.len(), 3);
}

#[test]
fn cancellation_between_iterations_is_honored() {
    let session = Session::new();
    let options = ExploreOptions::default();
    let cancel = options.cancel.clone();

    let report = explore(
        seeds(&[("choice", 0)]),
        |assignment| {
            let choice = int_seed(assignment, "choice")?;
            let tag = session
                .make_symbolic_int("choice", choice)
                .map_err(|err| HostError::from(err.to_string()))?;
            let arm = if (0..10).contains(&choice) { choice as i32 } else { -1 };
            session.switch_case(&tag, arm);
            // Request cancellation from inside the host; the explorer
            // notices before the next execution.
            cancel.cancel();
            Ok(session.flush())
        },
        &options,
    )
    .unwrap();

    assert_eq!(report.terminated_reason, TerminatedReason::Cancelled);
    assert_eq!(report.iterations, 1);
    assert_eq!(report.paths.len(), 1);
}

#[test]
fn session_report_reflects_the_exploration() {
    let session = Session::new();

    let report = explore(
        seeds(&[("x", 5)]),
        |assignment| {
            let x = int_seed(assignment, "x")?;
            let tag = session
                .make_symbolic_int("x", x)
                .map_err(|err| HostError::from(err.to_string()))?;
            session.icmp_jump(x, 10, &tag, &Tag::empty(), CmpKind::Gt);
            Ok(session.flush())
        },
        &ExploreOptions::default(),
    )
    .unwrap();

    let document = SessionReport::from_exploration(&report);
    assert_eq!(document.paths.len(), 2);
    assert_eq!(document.iterations, report.iterations);
    assert_eq!(document.terminated_reason, TerminatedReason::Exhausted);

    let json = serde_json::to_value(&document).unwrap();
    assert_eq!(json["terminated_reason"], "exhausted");
    assert_eq!(json["paths"][0]["seeds"]["x"], 5);
    assert_eq!(json["paths"][0]["constraints"][0], "(x <= 10)");
}
