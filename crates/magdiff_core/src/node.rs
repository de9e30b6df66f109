use serde::{Deserialize, Serialize};

/// Highest time derivative present in the governing equation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeOrder {
    Static,
    First,
    Second,
}

impl TimeOrder {
    pub fn order(self) -> usize {
        match self {
            TimeOrder::Static => 0,
            TimeOrder::First => 1,
            TimeOrder::Second => 2,
        }
    }
}

/// Mesh node carrying one scalar unknown (the azimuthal vector potential).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Position (r, z).
    pub x: [f64; 2],
    pub u: f64,
    pub v: f64,
    pub a: f64,
    /// Concentrated nodal source, subtracted from the residual.
    pub load: f64,
    pub constrained: bool,
    /// Equation number, assigned to free nodes only.
    pub equation: Option<usize>,
}

impl Node {
    pub fn new(r: f64, z: f64) -> Self {
        Self {
            x: [r, z],
            u: 0.0,
            v: 0.0,
            a: 0.0,
            load: 0.0,
            constrained: false,
            equation: None,
        }
    }

    /// Fix the unknown to `value` (Dirichlet condition).
    pub fn set_constraint(&mut self, value: f64) {
        self.constrained = true;
        self.u = value;
        self.v = 0.0;
        self.a = 0.0;
    }

    pub fn release_constraint(&mut self) {
        self.constrained = false;
    }
}
