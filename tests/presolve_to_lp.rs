//! # Presolve to relaxation
//!
//! End-to-end: a small integer program is presolved, the surviving constraint is materialized
//! as an LP row, and the flushed solver mirror is checked against the reduced problem.
use relax::constraint::presolve::presolve;
use relax::constraint::{ConstraintFlags, ConstraintSet};
use relax::data::elements::{BoundDirection, VariableType};
use relax::data::number::{Extended, Tolerance};
use relax::data::variable::{VariableSet, VariableStatus};
use relax::lp::LpRelaxation;
use relax::lp::interface::recording::RecordingSolver;

#[test]
fn reduced_problem_reaches_the_solver() {
    let tolerance = Tolerance::default();
    let mut variables = VariableSet::new(tolerance);
    for index in 0..3 {
        variables.add(
            format!("x{index}"),
            VariableType::Integer,
            1_f64,
            Extended::Finite(0_f64),
            Extended::Finite(10_f64),
        );
    }
    let mut constraints = ConstraintSet::new(tolerance);
    let equality = constraints.add(
        "balance",
        vec![(0, 2_f64), (1, 2_f64)],
        Extended::Finite(6_f64),
        Extended::Finite(6_f64),
        ConstraintFlags::default(),
    );
    let capacity = constraints.add(
        "capacity",
        vec![(0, 1_f64), (2, 1_f64)],
        Extended::MINUS_INFINITY,
        Extended::Finite(4_f64),
        ConstraintFlags::default(),
    );
    constraints.transform(equality, &mut variables);
    constraints.transform(capacity, &mut variables);

    let total = presolve(&mut constraints, &mut variables).unwrap();
    assert_eq!(total.aggregations, 1);
    assert_eq!(
        variables.variable(0).status(),
        &VariableStatus::Aggregated { variable: 1, scalar: -1_f64, constant: 3_f64 },
    );
    assert!(!constraints.is_alive(equality));
    assert!(constraints.is_alive(capacity));

    let mut lp = LpRelaxation::new(RecordingSolver::new(), tolerance);
    let row = constraints.materialize(capacity, &mut lp, &variables).unwrap();
    lp.add_row_to_lp(row);
    lp.flush().unwrap();
    assert!(lp.is_flushed());

    // Only the two surviving variables became columns.
    let solver = lp.solver();
    assert_eq!(solver.columns().len(), 2);
    let x1 = &solver.columns()[0];
    assert_eq!(x1.name, "x1");
    // The aggregation x0 = -x1 + 3 moved x0's objective onto x1.
    assert_eq!(x1.objective, 0_f64);
    assert_eq!((x1.lower, x1.upper), (0_f64, 3_f64));
    let x2 = &solver.columns()[1];
    assert_eq!(x2.name, "x2");
    assert_eq!(x2.objective, 1_f64);
    assert_eq!((x2.lower, x2.upper), (0_f64, 4_f64));

    // The capacity constraint arrives substituted: -x1 + x2 <= 1.
    assert_eq!(solver.rows().len(), 1);
    let mirrored = &solver.rows()[0];
    assert_eq!(mirrored.name, "capacity");
    assert_eq!(mirrored.rhs, 1_f64);
    assert!(mirrored.lhs <= -1e19);
    assert_eq!(mirrored.entries, vec![(0, -1_f64), (1, 1_f64)]);

    // The reduced row's activity range reflects the tightened domains.
    assert_eq!(
        lp.row_activity_bound(row, BoundDirection::Lower),
        Extended::Finite(-3_f64),
    );
    assert_eq!(
        lp.row_activity_bound(row, BoundDirection::Upper),
        Extended::Finite(4_f64),
    );
}
