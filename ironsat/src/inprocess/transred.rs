//! Transitive reduction of the binary implication graph.
//!
//! A binary clause `(a, b)` is the implication `!a -> b`. When another path from `!a` to `b`
//! exists in the binary implication graph the clause is transitive and can be removed without
//! changing the reachability relation. Irredundant clauses may only be shown transitive via
//! other irredundant clauses. Hyper-binary resolvents are skipped, they are already produced
//! from existing implications.
use partial_ref::{partial, PartialRef};

use log::debug;

use ironsat_formula::Lit;

use crate::context::{AssignmentP, BinaryClausesP, TmpFlagsP};
use crate::proof::{self, ClauseId};

use super::pass_context;

/// Limit of graph edges explored per clause.
const SEARCH_LIMIT: usize = 10_000;

/// Remove transitive binary clauses.
pub fn transitive_reduction(mut ctx: pass_context!()) {
    let var_count = ctx.part(AssignmentP).assignment().len();

    let mut transitive: Vec<(Lit, Lit, ClauseId)> = vec![];
    let mut work: Vec<Lit> = vec![];

    for code in 0..var_count * 2 {
        let src = Lit::from_code(code);

        if ctx.part(AssignmentP).lit_value(src).is_some() {
            continue;
        }

        let entries: Vec<_> = ctx.part(BinaryClausesP).implied(src).to_vec();

        for entry in entries {
            if entry.hyper {
                continue;
            }
            let dst = entry.implied;
            if ctx.part(AssignmentP).lit_value(dst).is_some() {
                continue;
            }

            // BFS from src to dst avoiding the checked clause itself.
            let irredundant = !entry.redundant;

            let found = {
                let (tmp, bctx) = ctx.borrow().split_part_mut(TmpFlagsP);
                let binary = bctx.part(BinaryClausesP);
                let flags = &mut tmp.flags;

                work.clear();
                work.push(src);
                flags[src.code()] = true;

                let mut found = false;
                let mut steps = 0;
                let mut next = 0;

                'search: while next < work.len() {
                    let lit = work[next];
                    next += 1;

                    for other in binary.implied(lit) {
                        if other.id == entry.id {
                            continue;
                        }
                        if irredundant && other.redundant {
                            continue;
                        }
                        steps += 1;
                        if steps > SEARCH_LIMIT {
                            break 'search;
                        }
                        if other.implied == dst {
                            found = true;
                            break 'search;
                        }
                        if !flags[other.implied.code()] {
                            flags[other.implied.code()] = true;
                            work.push(other.implied);
                        }
                    }
                }

                for &lit in work.iter() {
                    flags[lit.code()] = false;
                }

                found
            };

            if found {
                transitive.push((!src, dst, entry.id));
                // Remove right away so later checks do not use the removed clause.
                proof::delete_clause(ctx.borrow(), entry.id, &[!src, dst]);
                ctx.part_mut(BinaryClausesP)
                    .remove_binary_clause([!src, dst], entry.id);
            }
        }
    }

    if !transitive.is_empty() {
        debug!("transitive reduction removed {} clauses", transitive.len());
    }
}
