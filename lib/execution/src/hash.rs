//! Deterministic hashing of bindings restricted to a variable list.

use rdf_junction_model::{Binding, Variable};
use rustc_hash::FxHasher;
use std::hash::Hasher;

/// Hashes `binding` over `variables`, producing the bucket key used by the hash join
/// operators.
///
/// The hash combines the canonical string form of each variable's bound term in the
/// given variable order, with a sentinel for unbound variables. Two bindings that
/// agree on all hashed variables produce the same key regardless of how the bindings
/// store their entries internally. The converse does not hold: collisions are
/// expected, and every probe re-checks full compatibility before emitting a result.
pub fn hash_bindings(binding: &Binding, variables: &[Variable]) -> u64 {
    let mut hasher = FxHasher::default();
    for variable in variables {
        match binding.get(variable) {
            Some(term) => {
                hasher.write_u8(1);
                hasher.write(term.to_string().as_bytes());
            }
            None => hasher.write_u8(0),
        }
    }
    hasher.finish()
}
