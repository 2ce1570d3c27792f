//! Interpolation bases and the per-region basis registry.

use std::rc::Rc;

use indexmap::IndexMap;
use smallvec::SmallVec;

use crate::error::MeshError;

/// One-dimensional interpolation function along a single xi direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BasisFunction {
    /// Single value over the element.
    Constant,
    /// Two-node Lagrange.
    LinearLagrange,
    /// Three-node Lagrange.
    QuadraticLagrange,
    /// Four-node Lagrange.
    CubicLagrange,
    /// Two nodes, value and first derivative at each.
    CubicHermite,
    /// Linear simplex, coupled with the other simplex directions.
    LinearSimplex,
}

impl BasisFunction {
    fn nodes_along_xi(self) -> usize {
        match self {
            BasisFunction::Constant => 1,
            BasisFunction::LinearLagrange | BasisFunction::CubicHermite => 2,
            BasisFunction::QuadraticLagrange => 3,
            BasisFunction::CubicLagrange => 4,
            BasisFunction::LinearSimplex => 0,
        }
    }
}

/// A tensor product of per-xi basis functions.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct BasisType {
    functions: SmallVec<[BasisFunction; 3]>,
}

impl BasisType {
    /// Build a basis of up to three directions.
    ///
    /// Simplex directions are coupled, so a basis uses either none or at
    /// least two of them.
    pub fn new(functions: &[BasisFunction]) -> Result<Self, MeshError> {
        if functions.is_empty() || functions.len() > 3 {
            return Err(MeshError::invalid_argument(format!(
                "basis needs 1 to 3 directions, got {}",
                functions.len()
            )));
        }
        let simplex = functions
            .iter()
            .filter(|f| **f == BasisFunction::LinearSimplex)
            .count();
        if simplex == 1 {
            return Err(MeshError::invalid_argument(
                "a simplex basis must couple at least two directions",
            ));
        }
        Ok(Self {
            functions: functions.iter().copied().collect(),
        })
    }

    /// Linear Lagrange in every one of `dimension` directions.
    pub fn linear_lagrange(dimension: usize) -> Result<Self, MeshError> {
        Self::new(&vec![BasisFunction::LinearLagrange; dimension])
    }

    /// Number of xi directions.
    pub fn dimension(&self) -> usize {
        self.functions.len()
    }

    /// Per-direction functions.
    pub fn functions(&self) -> &[BasisFunction] {
        &self.functions
    }

    /// Number of nodes the basis interpolates between.
    pub fn number_of_nodes(&self) -> usize {
        let simplex = self
            .functions
            .iter()
            .filter(|f| **f == BasisFunction::LinearSimplex)
            .count();
        let tensor: usize = self
            .functions
            .iter()
            .filter(|f| **f != BasisFunction::LinearSimplex)
            .map(|f| f.nodes_along_xi())
            .product();
        if simplex > 0 {
            tensor * (simplex + 1)
        } else {
            tensor
        }
    }
}

/// Interned bases owned by a root region.
#[derive(Debug, Default)]
pub struct BasisRegistry {
    bases: IndexMap<BasisType, Rc<BasisType>>,
}

impl BasisRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the registered basis equal to `basis`, registering it if
    /// needed.
    pub fn get(&mut self, basis: BasisType) -> Rc<BasisType> {
        Rc::clone(
            self.bases
                .entry(basis)
                .or_insert_with_key(|key| Rc::new(key.clone())),
        )
    }

    /// Number of distinct bases registered.
    pub fn len(&self) -> usize {
        self.bases.len()
    }

    /// True if no basis has been registered.
    pub fn is_empty(&self) -> bool {
        self.bases.is_empty()
    }
}
