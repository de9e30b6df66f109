use super::{MaterialProps, VACUUM_PERMEABILITY, VACUUM_PERMITTIVITY};
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

/// Constant-permeability material without history.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearMaterial {
    props: MaterialProps,
}

impl LinearMaterial {
    pub fn new(relative_permeability: f64, relative_permittivity: f64, sigma: f64, id: usize) -> Self {
        Self {
            props: MaterialProps {
                id,
                mu0: relative_permeability * VACUUM_PERMEABILITY,
                sigma,
                eps: relative_permittivity * VACUUM_PERMITTIVITY,
            },
        }
    }

    pub fn props(&self) -> &MaterialProps {
        &self.props
    }

    pub fn permeability(&self) -> f64 {
        self.props.mu0
    }

    /// Returns the permeability and a zero magnetization tangent, whatever `B` is.
    pub fn evaluate(&self, _b: Vector2<f64>) -> (f64, Vector2<f64>) {
        (self.props.mu0, Vector2::zeros())
    }
}
