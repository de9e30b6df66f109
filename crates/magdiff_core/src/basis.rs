//! Shape functions for tensor-product quadrilaterals.

use crate::error::{MagError, MagResult};

/// Generator of 1-D shape functions of a given degree on [-1, 1].
pub trait Basis1D {
    /// Writes the `degree + 1` values and derivatives at `xi`.
    fn evaluate(&self, degree: usize, xi: f64, values: &mut [f64], derivatives: &mut [f64]);
}

/// Lagrange polynomials on equally spaced nodes -1 = x_0 < ... < x_p = 1.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LagrangeBasis1D;

impl Basis1D for LagrangeBasis1D {
    fn evaluate(&self, degree: usize, xi: f64, values: &mut [f64], derivatives: &mut [f64]) {
        let n = degree + 1;
        if degree == 0 {
            values[0] = 1.0;
            derivatives[0] = 0.0;
            return;
        }
        let node = |k: usize| -1.0 + 2.0 * k as f64 / degree as f64;

        for k in 0..n {
            let xk = node(k);
            let mut value = 1.0;
            let mut derivative = 0.0;
            for l in 0..n {
                if l == k {
                    continue;
                }
                let denom = xk - node(l);
                let mut term = 1.0 / denom;
                for m in 0..n {
                    if m != k && m != l {
                        term *= (xi - node(m)) / (xk - node(m));
                    }
                }
                derivative += term;
                value *= (xi - node(l)) / denom;
            }
            values[k] = value;
            derivatives[k] = derivative;
        }
    }
}

/// Per-node (xi index, eta index) table, row 0 for xi and row 1 for eta.
pub type NodeOrder = [Vec<usize>; 2];

/// Lexicographic ordering with the xi index varying fastest.
pub fn quad_node_order(degree: [usize; 2]) -> NodeOrder {
    let mut order = [Vec::new(), Vec::new()];
    for j in 0..=degree[1] {
        for i in 0..=degree[0] {
            order[0].push(i);
            order[1].push(j);
        }
    }
    order
}

pub(crate) fn validate_node_order(order: &NodeOrder, degree: [usize; 2], nodes: usize) -> MagResult<()> {
    let expected = (degree[0] + 1) * (degree[1] + 1);
    if nodes != expected {
        return Err(MagError::InvalidElement(format!(
            "degree {:?} needs {} nodes, got {}",
            degree, expected, nodes
        )));
    }
    for dir in 0..2 {
        if order[dir].len() != expected {
            return Err(MagError::InvalidElement(format!(
                "node order row {} has {} entries, expected {}",
                dir,
                order[dir].len(),
                expected
            )));
        }
        if order[dir].iter().any(|&idx| idx > degree[dir]) {
            return Err(MagError::InvalidElement(format!(
                "node order row {} exceeds degree {}",
                dir, degree[dir]
            )));
        }
    }
    Ok(())
}
