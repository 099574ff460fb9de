//! The uniformity lattice.
//!
//! Divergence analysis tracks one bit of information per value, ordered
//! `Uniform ⊑ Divergent`. The join of two elements is divergent if either one
//! is. A value starts uniform (the optimistic bottom) and may be raised once;
//! this height-one lattice is what bounds the number of fixed-point rounds.
//!
//! ```text
//!     Divergent   (top: may differ across lanes)
//!         |
//!      Uniform    (bottom: same in every lane)
//! ```

use std::fmt::Debug;

use strum::{Display, IntoStaticStr};

/// A join semi-lattice with a join (least upper bound) operation.
///
/// The join operation combines the facts known about several inputs into the
/// least specific fact that covers all of them.
///
/// It must satisfy:
///
/// - **Idempotent**: `x.join(x) = x`
/// - **Commutative**: `x.join(y) = y.join(x)`
/// - **Associative**: `x.join(y.join(z)) = (x.join(y)).join(z)`
pub trait JoinSemiLattice: Clone + Debug + PartialEq {
    /// Computes the join (least upper bound) of two lattice elements.
    #[must_use]
    fn join(&self, other: &Self) -> Self;

    /// Returns `true` if this is the top element.
    ///
    /// Once top is reached, further joins cannot change the value.
    fn is_top(&self) -> bool;
}

/// Whether a value is the same in every invocation of a group.
///
/// # Examples
///
/// ```rust
/// use lanescope::analysis::{JoinSemiLattice, Uniformity};
///
/// let u = Uniformity::Uniform;
/// let d = Uniformity::Divergent;
/// assert_eq!(u.join(&d), Uniformity::Divergent);
/// assert_eq!(u.join(&u), Uniformity::Uniform);
/// assert!(d.is_top());
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Display, IntoStaticStr,
)]
#[strum(serialize_all = "lowercase")]
pub enum Uniformity {
    /// Identical across all invocations
    #[default]
    Uniform,
    /// May differ across invocations
    Divergent,
}

impl Uniformity {
    /// Maps a divergence flag onto the lattice.
    #[must_use]
    pub const fn from_divergent(divergent: bool) -> Self {
        if divergent {
            Self::Divergent
        } else {
            Self::Uniform
        }
    }

    /// Returns `true` for [`Uniformity::Divergent`].
    #[must_use]
    pub const fn is_divergent(self) -> bool {
        matches!(self, Self::Divergent)
    }

    /// Joins every element of `items`, starting from `Uniform`.
    pub fn join_all(items: impl IntoIterator<Item = Self>) -> Self {
        items
            .into_iter()
            .fold(Self::Uniform, |acc, item| acc.join(&item))
    }
}

impl JoinSemiLattice for Uniformity {
    fn join(&self, other: &Self) -> Self {
        (*self).max(*other)
    }

    fn is_top(&self) -> bool {
        self.is_divergent()
    }
}
