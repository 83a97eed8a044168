//! VeriPB proof writing.
//!
//! Clauses are emitted as pseudo-Boolean constraints. Derived clauses are justified by reverse
//! unit propagation (`rup`) statements and the proof concludes with an explicit `conclusion`
//! block naming the final conflict constraint.
use std::io::{self, BufWriter, Write};

use ironsat_formula::Lit;

use super::ClauseId;

/// Writes VeriPB proofs in the text format.
pub struct VeriPbTracer {
    target: BufWriter<Box<dyn Write>>,
    original_count: u64,
    header_done: bool,
}

impl VeriPbTracer {
    pub fn new(target: Box<dyn Write>) -> VeriPbTracer {
        VeriPbTracer {
            target: BufWriter::new(target),
            original_count: 0,
            header_done: false,
        }
    }

    fn write_clause_terms(&mut self, lits: &[Lit]) -> io::Result<()> {
        for &lit in lits {
            self.target.write_all(b"1 ")?;
            if lit.is_negative() {
                self.target.write_all(b"~")?;
            }
            self.target.write_all(b"x")?;
            itoa::write(&mut self.target, lit.index() + 1)?;
            self.target.write_all(b" ")?;
        }
        self.target.write_all(b">= 1 ;")?;
        Ok(())
    }

    /// Write the header once all original clauses are known.
    fn ensure_header(&mut self) -> io::Result<()> {
        if self.header_done {
            return Ok(());
        }
        self.header_done = true;
        self.target
            .write_all(b"pseudo-Boolean proof version 2.0\n")?;
        self.target.write_all(b"f ")?;
        itoa::write(&mut self.target, self.original_count)?;
        self.target.write_all(b"\n")?;
        Ok(())
    }

    pub fn add_original_clause(&mut self, _id: ClauseId, _lits: &[Lit]) -> io::Result<()> {
        // Original constraints are loaded by the checker from the formula, only their number is
        // needed here.
        self.original_count += 1;
        Ok(())
    }

    pub fn add_derived_clause(&mut self, _id: ClauseId, lits: &[Lit]) -> io::Result<()> {
        self.ensure_header()?;
        self.target.write_all(b"rup ")?;
        self.write_clause_terms(lits)?;
        self.target.write_all(b"\n")?;
        Ok(())
    }

    pub fn delete_clause(&mut self, id: ClauseId) -> io::Result<()> {
        self.ensure_header()?;
        self.target.write_all(b"del id ")?;
        itoa::write(&mut self.target, id)?;
        self.target.write_all(b"\n")?;
        Ok(())
    }

    pub fn conclude_unsat(&mut self, conflict_id: ClauseId) -> io::Result<()> {
        self.ensure_header()?;
        self.target.write_all(b"output NONE\n")?;
        self.target.write_all(b"conclusion UNSAT : ")?;
        itoa::write(&mut self.target, conflict_id)?;
        self.target.write_all(b"\n")?;
        self.target.write_all(b"end pseudo-Boolean proof\n")?;
        Ok(())
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.target.flush()
    }
}
