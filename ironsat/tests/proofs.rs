//! Proof output tests.
use std::io::Read;

use anyhow::Result;

use ironsat::proof::ProofFormat;
use ironsat::{lits, Solver};

fn unsat_proof(format: ProofFormat) -> Result<String> {
    let file = tempfile::NamedTempFile::new()?;

    let mut solver = Solver::new();
    solver.write_proof(file.reopen()?, format);

    solver.add_clause(&lits![1, 2]);
    solver.add_clause(&lits![-1, 2]);
    solver.add_clause(&lits![-2]);

    assert_eq!(solver.solve(), Some(false));

    solver.close_proof();

    let mut proof = String::new();
    file.reopen()?.read_to_string(&mut proof)?;
    Ok(proof)
}

#[test]
fn drat_proof_ends_in_the_empty_clause() -> Result<()> {
    let proof = unsat_proof(ProofFormat::Drat)?;

    assert!(!proof.is_empty());
    assert!(proof.lines().any(|line| line.trim() == "0"));

    // Every line is an addition or a deletion terminated by zero.
    for line in proof.lines() {
        let line = line.trim();
        let body = line.strip_prefix("d ").unwrap_or(line);
        assert!(body.ends_with('0'));
        for token in body.split_whitespace() {
            token.parse::<i64>().unwrap();
        }
    }

    Ok(())
}

#[test]
fn binary_drat_proof_is_tagged() -> Result<()> {
    let file = tempfile::NamedTempFile::new()?;

    let mut solver = Solver::new();
    solver.write_proof(file.reopen()?, ProofFormat::BinaryDrat);

    solver.add_clause(&lits![1, 2]);
    solver.add_clause(&lits![-1, 2]);
    solver.add_clause(&lits![-2]);

    assert_eq!(solver.solve(), Some(false));
    solver.close_proof();

    let mut proof = vec![];
    file.reopen()?.read_to_end(&mut proof)?;

    assert!(!proof.is_empty());
    assert!(proof[0] == b'a' || proof[0] == b'd');
    // The empty clause step is an 'a' tag directly followed by the terminating zero.
    assert!(proof.windows(2).any(|pair| pair == b"a\0"));

    Ok(())
}

#[test]
fn lrat_proof_has_ids_and_antecedents() -> Result<()> {
    let proof = unsat_proof(ProofFormat::Lrat)?;

    assert!(!proof.is_empty());

    let mut empty_clause_seen = false;

    for line in proof.lines() {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        assert!(!tokens.is_empty());

        // Both additions and deletions start with a clause id.
        tokens[0].parse::<u64>().unwrap();

        if tokens[1] == "d" {
            continue;
        }

        // <id> <lits> 0 <antecedents> 0
        let zeros = tokens.iter().filter(|&&token| token == "0").count();
        assert!(zeros >= 2);

        if tokens[1] == "0" {
            // The empty clause must cite its antecedents.
            empty_clause_seen = true;
            assert!(tokens.len() > 3);
        }
    }

    assert!(empty_clause_seen);

    Ok(())
}

#[test]
fn frat_proof_is_finalized() -> Result<()> {
    let proof = unsat_proof(ProofFormat::Frat)?;

    assert!(proof.lines().any(|line| line.starts_with("o ")));
    assert!(proof.lines().any(|line| line.starts_with("a ")));
    assert!(proof.lines().any(|line| line.starts_with("f ")));

    Ok(())
}

#[test]
fn veripb_proof_concludes_unsat() -> Result<()> {
    let proof = unsat_proof(ProofFormat::VeriPb)?;

    assert!(proof.starts_with("pseudo-Boolean proof version 2.0\n"));
    assert!(proof.contains("\nf 3\n"));
    assert!(proof.lines().any(|line| line.starts_with("rup ")));
    assert!(proof.contains("conclusion UNSAT"));
    assert!(proof.trim_end().ends_with("end pseudo-Boolean proof"));

    Ok(())
}

#[test]
fn proofs_with_inprocessing_stay_well_formed() -> Result<()> {
    let file = tempfile::NamedTempFile::new()?;

    let mut solver = Solver::new();
    solver.write_proof(file.reopen()?, ProofFormat::Lrat);
    solver.set_option("inprocess_interval", 0.0).unwrap();

    // 4 pigeons into 3 holes.
    for p in 0..4isize {
        solver.add_clause(&[
            ironsat::Lit::from_dimacs(p * 3 + 1),
            ironsat::Lit::from_dimacs(p * 3 + 2),
            ironsat::Lit::from_dimacs(p * 3 + 3),
        ]);
    }
    for h in 1..=3isize {
        for p1 in 0..4isize {
            for p2 in (p1 + 1)..4isize {
                solver.add_clause(&[
                    ironsat::Lit::from_dimacs(-(p1 * 3 + h)),
                    ironsat::Lit::from_dimacs(-(p2 * 3 + h)),
                ]);
            }
        }
    }

    assert_eq!(solver.solve(), Some(false));
    solver.close_proof();

    let mut proof = String::new();
    file.reopen()?.read_to_string(&mut proof)?;

    assert!(!proof.is_empty());
    for line in proof.lines() {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        tokens[0].parse::<u64>().unwrap();
        assert_eq!(*tokens.last().unwrap(), "0");
    }

    Ok(())
}
