//! DRAT proof writing.
//!
//! In the text format each step is a line of literals terminated by zero, with deletions
//! prefixed by `d`. In the binary format each step is a one byte tag (`a` or `d`) followed by
//! LEB128 encoded literal codes (`2 * var + sign`, 1-based) terminated by a zero byte.
use std::io::{self, BufWriter, Write};

use ironsat_formula::Lit;

/// Writes DRAT proofs in the text or binary format.
pub struct DratTracer {
    target: BufWriter<Box<dyn Write>>,
    binary: bool,
}

impl DratTracer {
    pub fn new(target: Box<dyn Write>, binary: bool) -> DratTracer {
        DratTracer {
            target: BufWriter::new(target),
            binary,
        }
    }

    pub fn add_derived_clause(&mut self, lits: &[Lit]) -> io::Result<()> {
        if self.binary {
            self.target.write_all(b"a")?;
            write_binary_lits(&mut self.target, lits)?;
        } else {
            write_lits(&mut self.target, lits)?;
        }
        Ok(())
    }

    pub fn delete_clause(&mut self, lits: &[Lit]) -> io::Result<()> {
        if self.binary {
            self.target.write_all(b"d")?;
            write_binary_lits(&mut self.target, lits)?;
        } else {
            self.target.write_all(b"d ")?;
            write_lits(&mut self.target, lits)?;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.target.flush()
    }
}

/// Writes the literals of a clause for a step in a text DRAT proof.
pub(crate) fn write_lits(target: &mut impl Write, lits: &[Lit]) -> io::Result<()> {
    for &lit in lits {
        itoa::write(&mut *target, lit.to_dimacs())?;
        target.write_all(b" ")?;
    }
    target.write_all(b"0\n")?;
    Ok(())
}

/// Writes the literals of a clause for a step in a binary DRAT proof.
pub(crate) fn write_binary_lits(target: &mut impl Write, lits: &[Lit]) -> io::Result<()> {
    for &lit in lits {
        let code = 2 * (lit.index() as u64 + 1) + lit.is_negative() as u64;
        leb128::write::unsigned(target, code)?;
    }
    target.write_all(&[0])?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use ironsat_formula::lits;

    fn collect(binary: bool, steps: impl FnOnce(&mut DratTracer)) -> Vec<u8> {
        let buf: Vec<u8> = vec![];
        let shared = std::sync::Arc::new(std::sync::Mutex::new(buf));
        let writer = shared.clone();

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

        let mut tracer = DratTracer::new(Box::new(SharedWriter(writer)), binary);
        steps(&mut tracer);
        tracer.flush().unwrap();
        let out = shared.lock().unwrap().clone();
        out
    }

    #[test]
    fn text_format() {
        let out = collect(false, |tracer| {
            tracer.add_derived_clause(&lits![1, -2]).unwrap();
            tracer.delete_clause(&lits![-3]).unwrap();
        });
        assert_eq!(out, b"1 -2 0\nd -3 0\n");
    }

    #[test]
    fn binary_format() {
        let out = collect(true, |tracer| {
            tracer.add_derived_clause(&lits![1, -2]).unwrap();
            tracer.delete_clause(&lits![63]).unwrap();
        });
        assert_eq!(out, b"a\x02\x05\x00d\x7e\x00");
    }
}
