//! FRAT proof writing.
//!
//! FRAT extends DRAT by original clause markers, clause ids, optional antecedent hints and
//! finalization lines for all clauses still present when the proof concludes.
use std::io::{self, BufWriter, Write};

use ironsat_formula::Lit;

use super::ClauseId;

/// Writes FRAT proofs in the text format.
pub struct FratTracer {
    target: BufWriter<Box<dyn Write>>,
}

impl FratTracer {
    pub fn new(target: Box<dyn Write>) -> FratTracer {
        FratTracer {
            target: BufWriter::new(target),
        }
    }

    fn write_id_and_lits(&mut self, id: ClauseId, lits: &[Lit]) -> io::Result<()> {
        itoa::write(&mut self.target, id)?;
        self.target.write_all(b" ")?;
        for &lit in lits {
            itoa::write(&mut self.target, lit.to_dimacs())?;
            self.target.write_all(b" ")?;
        }
        self.target.write_all(b"0")?;
        Ok(())
    }

    pub fn add_original_clause(&mut self, id: ClauseId, lits: &[Lit]) -> io::Result<()> {
        self.target.write_all(b"o ")?;
        self.write_id_and_lits(id, lits)?;
        self.target.write_all(b"\n")?;
        Ok(())
    }

    pub fn add_derived_clause(
        &mut self,
        id: ClauseId,
        lits: &[Lit],
        chain: &[ClauseId],
    ) -> io::Result<()> {
        self.target.write_all(b"a ")?;
        self.write_id_and_lits(id, lits)?;
        if !chain.is_empty() {
            self.target.write_all(b" l ")?;
            for &antecedent in chain {
                itoa::write(&mut self.target, antecedent)?;
                self.target.write_all(b" ")?;
            }
            self.target.write_all(b"0")?;
        }
        self.target.write_all(b"\n")?;
        Ok(())
    }

    pub fn delete_clause(&mut self, id: ClauseId, lits: &[Lit]) -> io::Result<()> {
        self.target.write_all(b"d ")?;
        self.write_id_and_lits(id, lits)?;
        self.target.write_all(b"\n")?;
        Ok(())
    }

    pub fn finalize_clause(&mut self, id: ClauseId, lits: &[Lit]) -> io::Result<()> {
        self.target.write_all(b"f ")?;
        self.write_id_and_lits(id, lits)?;
        self.target.write_all(b"\n")?;
        Ok(())
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.target.flush()
    }
}
