//! LRAT proof writing.
//!
//! Each addition step carries the new clause id and the antecedent clause ids whose unit
//! propagation derives the clause. Deletions are buffered and emitted as a single deletion line
//! before the next addition, tagged with the most recently added id.
use std::io::{self, BufWriter, Write};

use ironsat_formula::Lit;

use super::ClauseId;

/// Writes LRAT proofs in the text format.
pub struct LratTracer {
    target: BufWriter<Box<dyn Write>>,
    latest_id: ClauseId,
    delete_ids: Vec<ClauseId>,
}

impl LratTracer {
    pub fn new(target: Box<dyn Write>) -> LratTracer {
        LratTracer {
            target: BufWriter::new(target),
            latest_id: 0,
            delete_ids: vec![],
        }
    }

    fn flush_deletions(&mut self) -> io::Result<()> {
        if self.delete_ids.is_empty() {
            return Ok(());
        }
        itoa::write(&mut self.target, self.latest_id)?;
        self.target.write_all(b" d ")?;
        for &id in self.delete_ids.iter() {
            itoa::write(&mut self.target, id)?;
            self.target.write_all(b" ")?;
        }
        self.target.write_all(b"0\n")?;
        self.delete_ids.clear();
        Ok(())
    }

    pub fn add_derived_clause(
        &mut self,
        id: ClauseId,
        lits: &[Lit],
        chain: &[ClauseId],
    ) -> io::Result<()> {
        self.flush_deletions()?;
        self.latest_id = id;

        itoa::write(&mut self.target, id)?;
        self.target.write_all(b" ")?;
        for &lit in lits {
            itoa::write(&mut self.target, lit.to_dimacs())?;
            self.target.write_all(b" ")?;
        }
        self.target.write_all(b"0 ")?;
        for &antecedent in chain {
            itoa::write(&mut self.target, antecedent)?;
            self.target.write_all(b" ")?;
        }
        self.target.write_all(b"0\n")?;
        Ok(())
    }

    pub fn delete_clause(&mut self, id: ClauseId) -> io::Result<()> {
        // Deletions are pushed off until the next addition, as the line is tagged with the
        // latest added id.
        self.delete_ids.push(id);
        Ok(())
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.flush_deletions()?;
        self.target.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use ironsat_formula::lits;

    #[test]
    fn additions_and_grouped_deletions() {
        struct SharedWriter(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);
        impl Write for SharedWriter {
            fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
                self.0.lock().unwrap().extend_from_slice(buf);
                Ok(buf.len())
            }
            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let shared = std::sync::Arc::new(std::sync::Mutex::new(vec![]));
        let mut tracer = LratTracer::new(Box::new(SharedWriter(shared.clone())));

        tracer.add_derived_clause(4, &lits![1, -2], &[1, 2]).unwrap();
        tracer.delete_clause(1).unwrap();
        tracer.delete_clause(2).unwrap();
        tracer.add_derived_clause(5, &lits![], &[4, 3]).unwrap();
        tracer.flush().unwrap();

        let out = shared.lock().unwrap().clone();
        assert_eq!(out, b"4 1 -2 0 1 2 0\n4 d 1 2 0\n5 0 4 3 0\n");
    }
}
