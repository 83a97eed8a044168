//! Proof tracing.
//!
//! Every clause of the solver carries a unique 64 bit id. The solver reports clause additions,
//! derivations and deletions to a set of attached tracers at the exact moment the corresponding
//! state mutation happens, so every derived clause is reverse-unit-propagation derivable from
//! the clauses present at the time of the event.
//!
//! Derivations optionally carry the antecedent clause ids in propagation order. They are
//! collected during conflict analysis and inprocessing only when an attached tracer requires
//! them.
pub mod drat;
pub mod frat;
pub mod lrat;
pub mod veripb;

use std::io::{self, Write};

use partial_ref::{partial, PartialRef};

use log::warn;

use ironsat_formula::{Lit, Var};

use crate::clause::ClauseRef;
use crate::context::{
    AssignmentP, BinaryClausesP, ClauseAllocP, ClauseDbP, Context, ProofP, VariablesP,
};

/// Integer type used for unique clause ids.
pub type ClauseId = u64;

/// Proof formats that can be generated during solving.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum ProofFormat {
    Drat,
    BinaryDrat,
    Lrat,
    Frat,
    VeriPb,
}

/// A connected proof tracer.
///
/// The set of supported tracers is fixed, so dynamic dispatch is replaced by this tagged union.
pub enum Tracer {
    Drat(drat::DratTracer),
    Lrat(lrat::LratTracer),
    Frat(frat::FratTracer),
    VeriPb(veripb::VeriPbTracer),
}

impl Tracer {
    /// Create a tracer writing the given format to the given target.
    pub fn new(target: Box<dyn Write>, format: ProofFormat) -> Tracer {
        match format {
            ProofFormat::Drat => Tracer::Drat(drat::DratTracer::new(target, false)),
            ProofFormat::BinaryDrat => Tracer::Drat(drat::DratTracer::new(target, true)),
            ProofFormat::Lrat => Tracer::Lrat(lrat::LratTracer::new(target)),
            ProofFormat::Frat => Tracer::Frat(frat::FratTracer::new(target)),
            ProofFormat::VeriPb => Tracer::VeriPb(veripb::VeriPbTracer::new(target)),
        }
    }

    /// Whether this tracer needs antecedent chains for derived clauses.
    pub fn antecedents_required(&self) -> bool {
        match self {
            Tracer::Drat(_) => false,
            Tracer::Lrat(_) => true,
            Tracer::Frat(_) => true,
            Tracer::VeriPb(_) => false,
        }
    }

    fn add_original_clause(&mut self, id: ClauseId, lits: &[Lit]) -> io::Result<()> {
        match self {
            Tracer::Drat(_) => Ok(()),
            Tracer::Lrat(_) => Ok(()),
            Tracer::Frat(tracer) => tracer.add_original_clause(id, lits),
            Tracer::VeriPb(tracer) => tracer.add_original_clause(id, lits),
        }
    }

    fn add_derived_clause(
        &mut self,
        id: ClauseId,
        lits: &[Lit],
        chain: &[ClauseId],
    ) -> io::Result<()> {
        match self {
            Tracer::Drat(tracer) => tracer.add_derived_clause(lits),
            Tracer::Lrat(tracer) => tracer.add_derived_clause(id, lits, chain),
            Tracer::Frat(tracer) => tracer.add_derived_clause(id, lits, chain),
            Tracer::VeriPb(tracer) => tracer.add_derived_clause(id, lits),
        }
    }

    fn delete_clause(&mut self, id: ClauseId, lits: &[Lit]) -> io::Result<()> {
        match self {
            Tracer::Drat(tracer) => tracer.delete_clause(lits),
            Tracer::Lrat(tracer) => tracer.delete_clause(id),
            Tracer::Frat(tracer) => tracer.delete_clause(id, lits),
            Tracer::VeriPb(tracer) => tracer.delete_clause(id),
        }
    }

    fn finalize_clause(&mut self, id: ClauseId, lits: &[Lit]) -> io::Result<()> {
        match self {
            Tracer::Frat(tracer) => tracer.finalize_clause(id, lits),
            _ => Ok(()),
        }
    }

    fn conclude_unsat(&mut self, conflict_id: ClauseId) -> io::Result<()> {
        match self {
            Tracer::Drat(_) => Ok(()),
            Tracer::Lrat(_) => Ok(()),
            Tracer::Frat(_) => Ok(()),
            Tracer::VeriPb(tracer) => tracer.conclude_unsat(conflict_id),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Tracer::Drat(tracer) => tracer.flush(),
            Tracer::Lrat(tracer) => tracer.flush(),
            Tracer::Frat(tracer) => tracer.flush(),
            Tracer::VeriPb(tracer) => tracer.flush(),
        }
    }
}

/// Proof tracing.
///
/// Allocates clause ids and forwards proof events to the connected tracers. Ids are assigned
/// even without connected tracers, their cost is negligible.
#[derive(Default)]
pub struct Proof {
    tracers: Vec<Tracer>,
    next_id: ClauseId,
    /// Id of the unit clause assigning each variable, for variables fixed at level 0.
    unit_ids: Vec<Option<ClauseId>>,
    /// Id of the derived empty clause.
    empty_id: Option<ClauseId>,
    /// Buffer for mapping solver literals to user literals.
    lit_buf: Vec<Lit>,
    /// Set after an io error, stops all further tracing.
    failed: bool,
}

impl Proof {
    /// Update structures for a new variable count.
    pub fn set_var_count(&mut self, count: usize) {
        self.unit_ids.resize(count, None);
    }

    /// Connect a tracer.
    pub fn add_tracer(&mut self, tracer: Tracer) {
        self.tracers.push(tracer);
    }

    /// Disconnect all tracers, flushing them first.
    pub fn close(&mut self) {
        for tracer in self.tracers.iter_mut() {
            if let Err(err) = tracer.flush() {
                warn!("error writing proof: {}", err);
            }
        }
        self.tracers.clear();
    }

    /// Whether any tracer is connected.
    pub fn is_active(&self) -> bool {
        !self.tracers.is_empty() && !self.failed
    }

    /// Whether derived clauses need antecedent chains.
    pub fn antecedents_required(&self) -> bool {
        !self.failed && self.tracers.iter().any(Tracer::antecedents_required)
    }

    /// Allocate a fresh clause id.
    pub fn new_clause_id(&mut self) -> ClauseId {
        self.next_id += 1;
        self.next_id
    }

    /// The unit clause id assigning the given variable at level 0.
    pub fn unit_id(&self, var: Var) -> Option<ClauseId> {
        self.unit_ids[var.index()]
    }

    /// Record the unit clause id assigning the given variable at level 0.
    pub fn set_unit_id(&mut self, var: Var, id: ClauseId) {
        self.unit_ids[var.index()] = Some(id);
    }

    /// The id of the derived empty clause, if any.
    pub fn empty_id(&self) -> Option<ClauseId> {
        self.empty_id
    }

    fn handle_result(&mut self, result: io::Result<()>) {
        if let Err(err) = result {
            warn!("error writing proof, proof tracing disabled: {}", err);
            self.failed = true;
            self.tracers.clear();
        }
    }

    fn for_tracers(&mut self, mut event: impl FnMut(&mut Tracer) -> io::Result<()>) {
        if self.failed {
            return;
        }
        let mut result = Ok(());
        for tracer in self.tracers.iter_mut() {
            result = event(tracer);
            if result.is_err() {
                break;
            }
        }
        self.handle_result(result);
    }
}

/// Map solver literals into the proof's literal buffer as user literals.
fn map_lits(mut ctx: partial!(Context, mut ProofP, VariablesP), lits: &[Lit]) {
    let (proof, ctx) = ctx.split_part_mut(ProofP);
    let variables = ctx.part(VariablesP);
    proof.lit_buf.clear();
    proof
        .lit_buf
        .extend(lits.iter().map(|&lit| variables.user_from_solver_lit(lit)));
}

/// Allocate an id for an original clause and emit its addition.
pub fn add_original_clause(
    mut ctx: partial!(Context, mut ProofP, VariablesP),
    lits: &[Lit],
) -> ClauseId {
    map_lits(ctx.borrow(), lits);
    let proof = ctx.part_mut(ProofP);
    let id = proof.new_clause_id();
    let lit_buf = std::mem::take(&mut proof.lit_buf);
    proof.for_tracers(|tracer| tracer.add_original_clause(id, &lit_buf));
    proof.lit_buf = lit_buf;
    id
}

/// Allocate an id for a derived clause and emit its derivation.
///
/// The antecedent chain may be empty when no connected tracer requires antecedents.
pub fn add_derived_clause(
    mut ctx: partial!(Context, mut ProofP, VariablesP),
    lits: &[Lit],
    chain: &[ClauseId],
) -> ClauseId {
    map_lits(ctx.borrow(), lits);
    let proof = ctx.part_mut(ProofP);
    let id = proof.new_clause_id();
    if lits.is_empty() {
        proof.empty_id = Some(id);
    }
    let lit_buf = std::mem::take(&mut proof.lit_buf);
    proof.for_tracers(|tracer| tracer.add_derived_clause(id, &lit_buf, chain));
    proof.lit_buf = lit_buf;
    id
}

/// Emit the deletion of a clause.
pub fn delete_clause(
    mut ctx: partial!(Context, mut ProofP, VariablesP),
    id: ClauseId,
    lits: &[Lit],
) {
    map_lits(ctx.borrow(), lits);
    let proof = ctx.part_mut(ProofP);
    let lit_buf = std::mem::take(&mut proof.lit_buf);
    proof.for_tracers(|tracer| tracer.delete_clause(id, &lit_buf));
    proof.lit_buf = lit_buf;
}

/// Emit the deletion of a long clause stored in the arena.
pub fn delete_long_clause(
    mut ctx: partial!(Context, mut ProofP, ClauseAllocP, VariablesP),
    cref: ClauseRef,
) {
    let (alloc, mut ctx) = ctx.split_part(ClauseAllocP);
    let clause = alloc.clause(cref);
    delete_clause(ctx.borrow(), clause.header().id(), clause.lits());
}

/// Emit the finalization of a clause that is still present when the proof concludes.
pub fn finalize_clause(
    mut ctx: partial!(Context, mut ProofP, VariablesP),
    id: ClauseId,
    lits: &[Lit],
) {
    map_lits(ctx.borrow(), lits);
    let proof = ctx.part_mut(ProofP);
    let lit_buf = std::mem::take(&mut proof.lit_buf);
    proof.for_tracers(|tracer| tracer.finalize_clause(id, &lit_buf));
    proof.lit_buf = lit_buf;
}

/// Emit the conclusion of an unsatisfiability proof.
pub fn conclude_unsat(mut ctx: partial!(Context, mut ProofP), conflict_id: ClauseId) {
    let proof = ctx.part_mut(ProofP);
    proof.for_tracers(|tracer| tracer.conclude_unsat(conflict_id));
    proof.for_tracers(Tracer::flush);
}

/// Finalize and disconnect all tracers.
///
/// Formats with clause finalization get one event per clause still present: the long clauses,
/// the binary clauses, the level 0 units and the empty clause if one was derived.
pub fn close_proof(
    mut ctx: partial!(
        Context,
        mut ProofP,
        AssignmentP,
        BinaryClausesP,
        ClauseAllocP,
        ClauseDbP,
        VariablesP,
    ),
) {
    if ctx.part(ProofP).is_active() {
        let var_count = ctx.part(AssignmentP).assignment().len();

        // Level 0 units.
        for index in 0..var_count {
            let var = Var::from_index(index);
            if let Some(id) = ctx.part(ProofP).unit_id(var) {
                if let Some(value) = ctx.part(AssignmentP).var_value(var) {
                    finalize_clause(ctx.borrow(), id, &[var.lit(value)]);
                }
            }
        }

        // Binary clauses, each reported once.
        for code in 0..var_count * 2 {
            let lit = Lit::from_code(code);
            let clause_lit = !lit;
            let entries: Vec<_> = ctx.part(BinaryClausesP).implied(lit).to_vec();
            for entry in entries {
                if clause_lit < entry.implied {
                    finalize_clause(ctx.borrow(), entry.id, &[clause_lit, entry.implied]);
                }
            }
        }

        // Long clauses.
        let crefs: Vec<_> = ctx.part(ClauseDbP).clauses.clone();
        for cref in crefs {
            let (id, lits) = {
                let clause = ctx.part(ClauseAllocP).clause(cref);
                if clause.header().deleted() {
                    continue;
                }
                (clause.header().id(), clause.lits().to_vec())
            };
            finalize_clause(ctx.borrow(), id, &lits);
        }

        if let Some(id) = ctx.part(ProofP).empty_id() {
            finalize_clause(ctx.borrow(), id, &[]);
        }
    }

    ctx.part_mut(ProofP).close();
}
