//! Per-value divergence results.

use std::fmt;

use crate::{
    analysis::{JoinSemiLattice, Uniformity},
    ir::{Function, Instruction, ValueId},
    utils::BitSet,
};

/// One divergence bit per SSA value of a function.
///
/// The table starts with every value uniform. The only mutation is
/// [`DivergenceTable::raise`], which can turn a bit on but never off, so a
/// value proven divergent stays divergent for the rest of the run.
///
/// # Examples
///
/// ```rust
/// use lanescope::analysis::{DivergenceTable, Uniformity};
/// use lanescope::ir::ValueId;
///
/// let mut table = DivergenceTable::new(4);
/// assert!(table.raise(ValueId::new(2), Uniformity::Divergent));
/// assert!(!table.raise(ValueId::new(2), Uniformity::Uniform));
/// assert!(table.is_divergent(ValueId::new(2)));
/// assert_eq!(table.divergent_count(), 1);
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct DivergenceTable {
    bits: BitSet,
}

impl DivergenceTable {
    /// Creates a table of `len` uniform values.
    #[must_use]
    pub fn new(len: usize) -> Self {
        Self {
            bits: BitSet::new(len),
        }
    }

    /// Returns the number of values covered.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.bits.len()
    }

    /// Returns `true` if the table covers no values.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.bits.len() == 0
    }

    /// Joins `value`'s entry with `fact`, returning `true` if it flipped to divergent.
    ///
    /// # Panics
    ///
    /// Panics if `value` is outside the table.
    pub fn raise(&mut self, value: ValueId, fact: Uniformity) -> bool {
        let joined = self.uniformity(value).join(&fact);
        joined.is_divergent() && self.bits.insert(value.index())
    }

    /// Returns the classification of `value`.
    ///
    /// # Panics
    ///
    /// Panics if `value` is outside the table.
    #[must_use]
    pub fn uniformity(&self, value: ValueId) -> Uniformity {
        Uniformity::from_divergent(self.bits.contains(value.index()))
    }

    /// Returns `true` if `value` may differ across invocations.
    ///
    /// # Panics
    ///
    /// Panics if `value` is outside the table.
    #[must_use]
    pub fn is_divergent(&self, value: ValueId) -> bool {
        self.bits.contains(value.index())
    }

    /// Returns `true` if `value` is the same in every invocation.
    ///
    /// # Panics
    ///
    /// Panics if `value` is outside the table.
    #[must_use]
    pub fn is_uniform(&self, value: ValueId) -> bool {
        !self.is_divergent(value)
    }

    /// Returns the number of divergent values.
    #[must_use]
    pub fn divergent_count(&self) -> usize {
        self.bits.count()
    }

    /// Returns the number of uniform values.
    #[must_use]
    pub fn uniform_count(&self) -> usize {
        self.len() - self.divergent_count()
    }

    /// Returns the divergent values in increasing index order.
    pub fn divergent_values(&self) -> impl Iterator<Item = ValueId> + '_ {
        self.bits.iter().map(ValueId::new)
    }
}

impl fmt::Debug for DivergenceTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DivergenceTable")
            .field("len", &self.len())
            .field("divergent", &self.bits)
            .finish()
    }
}

/// A function dump with every definition tagged `div` or `con`.
///
/// Created by [`Function::display_with`].
pub struct AnnotatedFunction<'a> {
    func: &'a Function,
    table: &'a DivergenceTable,
}

impl fmt::Display for AnnotatedFunction<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.func.write_tagged(f, &|instr: &Instruction| {
            let defs = instr.defs();
            if defs.is_empty() {
                None
            } else if defs.iter().any(|&d| self.table.is_divergent(d)) {
                Some("div")
            } else {
                Some("con")
            }
        })
    }
}

impl Function {
    /// Returns a dump of this function annotated with divergence results.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use lanescope::{analysis::analyze, ir::{FunctionBuilder, IntrinsicOp}};
    ///
    /// let mut b = FunctionBuilder::new("main");
    /// b.intrinsic(IntrinsicOp::LoadLocalInvocationIndex, &[], 1);
    /// let func = b.finish()?;
    /// let table = analyze(&func);
    ///
    /// let text = func.display_with(&table).to_string();
    /// assert!(text.contains("div %0 = @load_local_invocation_index ()"));
    /// # Ok::<(), lanescope::Error>(())
    /// ```
    #[must_use]
    pub fn display_with<'a>(&'a self, table: &'a DivergenceTable) -> AnnotatedFunction<'a> {
        AnnotatedFunction { func: self, table }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_table_is_uniform() {
        let table = DivergenceTable::new(3);
        assert_eq!(table.len(), 3);
        assert!(!table.is_empty());
        assert_eq!(table.uniform_count(), 3);
        assert!(table.is_uniform(ValueId::new(1)));
        assert_eq!(table.uniformity(ValueId::new(1)), Uniformity::Uniform);
    }

    #[test]
    fn test_raise_is_monotone() {
        let mut table = DivergenceTable::new(3);
        assert!(!table.raise(ValueId::new(0), Uniformity::Uniform));
        assert!(table.raise(ValueId::new(0), Uniformity::Divergent));
        assert!(!table.raise(ValueId::new(0), Uniformity::Divergent));
        assert!(!table.raise(ValueId::new(0), Uniformity::Uniform));
        assert!(table.is_divergent(ValueId::new(0)));
    }

    #[test]
    fn test_divergent_values() {
        let mut table = DivergenceTable::new(70);
        table.raise(ValueId::new(65), Uniformity::Divergent);
        table.raise(ValueId::new(4), Uniformity::Divergent);
        let values: Vec<_> = table.divergent_values().collect();
        assert_eq!(values, vec![ValueId::new(4), ValueId::new(65)]);
        assert_eq!(table.uniform_count(), 68);
    }
}
