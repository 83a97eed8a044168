//! End to end solver tests.
use ironsat::{lits, ExtendFormula, Lit, Solver};

fn all_passes_eager(solver: &mut Solver) {
    // Run inprocessing before the first conflict and after every conflict interval.
    solver.set_option("inprocess_interval", 0.0).unwrap();
}

#[test]
fn binary_contradiction() {
    let mut solver = Solver::new();
    solver.add_clause(&lits![1, 2]);
    solver.add_clause(&lits![-1, 2]);
    solver.add_clause(&lits![-2]);

    assert_eq!(solver.solve(), Some(false));
}

#[test]
fn assumption_failure() {
    let mut solver = Solver::new();
    solver.add_clause(&lits![-1, 2]);
    solver.add_clause(&lits![1, 2]);
    solver.add_clause(&lits![-2]);

    solver.assume(&lits![1]);
    assert_eq!(solver.solve(), Some(false));

    assert!(solver.failed(lits![1][0]));
    assert!(!solver.failed(lits![2][0]));
}

#[test]
fn assumption_failure_with_core() {
    let mut solver = Solver::new();
    solver.add_clause(&lits![-1, 2]);
    solver.add_clause(&lits![-2, 3]);
    solver.add_clause(&lits![-3, -1]);

    solver.assume(&lits![1]);
    assert_eq!(solver.solve(), Some(false));

    assert!(solver.failed(lits![1][0]));
    assert!(!solver.failed(lits![2][0]));

    let core = solver.failed_core().unwrap().to_vec();
    assert_eq!(core, lits![1].to_vec());

    // Without the assumption the formula is satisfiable again.
    solver.assume(&[]);
    assert_eq!(solver.solve(), Some(true));
}

#[test]
fn xor_chain_sat() {
    let mut solver = Solver::new();
    // x1 xor x2 xor x3 = 1
    solver.add_clause(&lits![1, 2, 3]);
    solver.add_clause(&lits![1, -2, -3]);
    solver.add_clause(&lits![-1, 2, -3]);
    solver.add_clause(&lits![-1, -2, 3]);

    assert_eq!(solver.solve(), Some(true));

    let value = |lit| solver.lit_value(lit).unwrap();
    let parity = value(lits![1][0]) ^ value(lits![2][0]) ^ value(lits![3][0]);
    assert!(parity);
}

#[test]
fn incremental_add_after_sat() {
    let mut solver = Solver::new();
    solver.add_clause(&lits![1, 2, 3]);
    solver.add_clause(&lits![1, -2, -3]);
    solver.add_clause(&lits![-1, 2, -3]);
    solver.add_clause(&lits![-1, -2, 3]);

    assert_eq!(solver.solve(), Some(true));

    solver.add_clause(&lits![-1]);
    assert_eq!(solver.solve(), Some(true));

    solver.add_clause(&lits![-2]);
    assert_eq!(solver.solve(), Some(true));

    solver.add_clause(&lits![-3]);
    assert_eq!(solver.solve(), Some(false));
}

#[test]
fn elimination_witness_reconstruction() {
    let mut solver = Solver::new();
    all_passes_eager(&mut solver);

    solver.add_clause(&lits![1, 2]);
    solver.add_clause(&lits![-1, 3]);

    assert_eq!(solver.solve(), Some(true));

    let value = |solver: &Solver, lit| solver.lit_value(lit).unwrap();

    // Both original clauses have to hold in the reconstructed model, whether or not variable 1
    // was eliminated internally.
    assert!(value(&solver, lits![1][0]) || value(&solver, lits![2][0]));
    assert!(!value(&solver, lits![1][0]) || value(&solver, lits![3][0]));
}

#[test]
fn reactivating_eliminated_variables() {
    let mut solver = Solver::new();
    all_passes_eager(&mut solver);

    solver.add_clause(&lits![1, 2]);
    solver.add_clause(&lits![-1, 3]);

    assert_eq!(solver.solve(), Some(true));

    // New clauses over the possibly eliminated variable restore its definition.
    solver.add_clause(&lits![-1]);
    solver.add_clause(&lits![-3]);
    assert_eq!(solver.solve(), Some(true));

    let value = |solver: &Solver, lit| solver.lit_value(lit).unwrap();
    assert!(!value(&solver, lits![1][0]));
    assert!(value(&solver, lits![2][0]));
    assert!(!value(&solver, lits![3][0]));

    solver.add_clause(&lits![-2]);
    assert_eq!(solver.solve(), Some(false));
}

#[test]
fn assumptions_on_eliminated_variables() {
    let mut solver = Solver::new();
    all_passes_eager(&mut solver);

    solver.add_clause(&lits![1, 2]);
    solver.add_clause(&lits![-1, 3]);

    assert_eq!(solver.solve(), Some(true));

    solver.assume(&lits![1, -3]);
    assert_eq!(solver.solve(), Some(false));
    assert!(solver.failed(lits![1][0]) || solver.failed(lits![-3][0]));

    solver.assume(&lits![1, 3]);
    assert_eq!(solver.solve(), Some(true));
    assert_eq!(solver.lit_value(lits![1][0]), Some(true));
    assert_eq!(solver.lit_value(lits![3][0]), Some(true));
}

#[test]
fn forced_restarts_keep_the_verdict() {
    let sat_clauses = [
        lits![1, 2, 3].to_vec(),
        lits![-1, 2].to_vec(),
        lits![-2, 3].to_vec(),
        lits![-3, 4, 5].to_vec(),
        lits![-4, -5].to_vec(),
    ];
    let unsat_clauses = [
        lits![1, 2].to_vec(),
        lits![1, -2].to_vec(),
        lits![-1, 2].to_vec(),
        lits![-1, -2].to_vec(),
    ];

    for (clauses, expected) in [(&sat_clauses[..], true), (&unsat_clauses[..], false)].iter() {
        let mut default_solver = Solver::new();
        let mut restarting_solver = Solver::new();

        // Restart after every conflict.
        restarting_solver.set_option("restart_interval", 1.0).unwrap();
        restarting_solver.set_option("restart_margin", 1.0).unwrap();
        restarting_solver
            .set_option("stable_restart_scale", 1.0)
            .unwrap();

        for clause in clauses.iter() {
            default_solver.add_clause(clause);
            restarting_solver.add_clause(clause);
        }

        assert_eq!(default_solver.solve(), Some(*expected));
        assert_eq!(restarting_solver.solve(), Some(*expected));
    }
}

#[test]
fn repeated_solves_are_stable() {
    let mut solver = Solver::new();
    solver.add_clause(&lits![1, 2, 3]);
    solver.add_clause(&lits![-1, -2]);

    let first = solver.solve();
    assert_eq!(first, Some(true));
    assert_eq!(solver.solve(), first);
    assert_eq!(solver.solve(), first);
}

#[test]
fn freeze_protects_variables() {
    let mut solver = Solver::new();
    all_passes_eager(&mut solver);

    for i in 1..=4isize {
        solver.freeze(ironsat::Var::from_dimacs(i));
    }

    solver.add_clause(&lits![1, 2]);
    solver.add_clause(&lits![-1, 3]);
    solver.add_clause(&lits![-3, 4]);

    assert_eq!(solver.solve(), Some(true));

    // Frozen variables stay queryable and assumable in both polarities.
    solver.assume(&lits![1]);
    assert_eq!(solver.solve(), Some(true));
    assert_eq!(solver.lit_value(lits![3][0]), Some(true));
    assert_eq!(solver.lit_value(lits![4][0]), Some(true));

    solver.assume(&lits![-1]);
    assert_eq!(solver.solve(), Some(true));
    assert_eq!(solver.lit_value(lits![2][0]), Some(true));

    for i in 1..=4isize {
        solver.melt(ironsat::Var::from_dimacs(i));
    }
}

#[test]
fn larger_pigeon_hole_with_inprocessing() {
    // 5 pigeons into 4 holes, unsatisfiable.
    let pigeons = 5isize;
    let holes = 4isize;
    let var = |p: isize, h: isize| Lit::from_dimacs(p * holes + h + 1 - holes);

    let mut formula = ironsat::CnfFormula::new();
    for p in 1..=pigeons {
        let clause: Vec<Lit> = (0..holes).map(|h| var(p, h)).collect();
        formula.add_clause(&clause);
    }
    for h in 0..holes {
        for p1 in 1..=pigeons {
            for p2 in (p1 + 1)..=pigeons {
                formula.add_clause(&[!var(p1, h), !var(p2, h)]);
            }
        }
    }

    let mut solver = Solver::new();
    all_passes_eager(&mut solver);
    solver.add_formula(&formula);
    assert_eq!(solver.solve(), Some(false));
}
