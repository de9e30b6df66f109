pub mod jiles_atherton;
pub mod linear;

pub use jiles_atherton::{
    ComponentHistory, HystereticMaterial, JaParameters, ParameterSource, PointHistory,
};
pub use linear::LinearMaterial;

use crate::error::MagResult;
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

pub const VACUUM_PERMEABILITY: f64 = 4.0e-7 * PI;
pub const VACUUM_PERMITTIVITY: f64 = 8.854187817e-12;

/// Whether an evaluation may overwrite the quadrature-point history.
///
/// `Trial` is used for every Newton iteration and leaves history untouched.
/// `Commit` is issued exactly once per time step, after convergence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EvalMode {
    Trial,
    Commit,
}

impl EvalMode {
    pub fn is_commit(self) -> bool {
        matches!(self, EvalMode::Commit)
    }
}

/// Properties shared by every material kind.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MaterialProps {
    pub id: usize,
    /// Absolute permeability mu_r * mu_0.
    pub mu0: f64,
    pub sigma: f64,
    pub eps: f64,
}

/// Magnetization and its derivative with respect to B, per (r, z) component.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Response {
    pub magnetization: Vector2<f64>,
    pub dm: Vector2<f64>,
}

impl Response {
    pub fn zero() -> Self {
        Self {
            magnetization: Vector2::zeros(),
            dm: Vector2::zeros(),
        }
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::zero()
    }
}

/// A region material. Element code only looks at [`Material::has_hysteresis`].
#[derive(Debug, Clone)]
pub enum Material {
    Linear(LinearMaterial),
    Hysteretic(HystereticMaterial),
}

impl Material {
    pub fn props(&self) -> &MaterialProps {
        match self {
            Material::Linear(m) => m.props(),
            Material::Hysteretic(m) => m.props(),
        }
    }

    pub fn id(&self) -> usize {
        self.props().id
    }

    pub fn mu0(&self) -> f64 {
        self.props().mu0
    }

    pub fn sigma(&self) -> f64 {
        self.props().sigma
    }

    pub fn eps(&self) -> f64 {
        self.props().eps
    }

    pub fn has_hysteresis(&self) -> bool {
        matches!(self, Material::Hysteretic(_))
    }

    /// Number of history slots, `None` for history-free materials.
    pub fn history_capacity(&self) -> Option<usize> {
        match self {
            Material::Linear(_) => None,
            Material::Hysteretic(m) => Some(m.quadrature_points()),
        }
    }

    /// Evaluate the constitutive response at quadrature point `point`.
    pub fn evaluate(&mut self, b: Vector2<f64>, point: usize, mode: EvalMode) -> MagResult<Response> {
        match self {
            Material::Linear(m) => {
                let (_, dm) = m.evaluate(b);
                Ok(Response {
                    magnetization: Vector2::zeros(),
                    dm,
                })
            }
            Material::Hysteretic(m) => m.evaluate(b, point, mode),
        }
    }

    /// Response of the most recent evaluation.
    pub fn current(&self) -> Response {
        match self {
            Material::Linear(_) => Response::zero(),
            Material::Hysteretic(m) => m.current(),
        }
    }
}

impl From<LinearMaterial> for Material {
    fn from(value: LinearMaterial) -> Self {
        Material::Linear(value)
    }
}

impl From<HystereticMaterial> for Material {
    fn from(value: HystereticMaterial) -> Self {
        Material::Hysteretic(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capability_flag_follows_variant() {
        let linear: Material = LinearMaterial::new(100.0, 1.0, 5.0e6, 1).into();
        let hysteretic: Material = HystereticMaterial::new(5.0e6, 9, 2).into();
        assert!(!linear.has_hysteresis());
        assert!(hysteretic.has_hysteresis());
        assert_eq!(linear.history_capacity(), None);
        assert_eq!(hysteretic.history_capacity(), Some(9));
        assert_eq!(hysteretic.id(), 2);
    }

    #[test]
    fn linear_variant_reports_zero_magnetization() {
        let mut material: Material = LinearMaterial::new(1.0, 1.0, 0.0, 3).into();
        let response = material
            .evaluate(Vector2::new(0.4, -1.2), 1000, EvalMode::Commit)
            .expect("linear evaluation");
        assert_eq!(response, Response::zero());
        assert_eq!(material.current(), Response::zero());
    }
}
