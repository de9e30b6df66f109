use thiserror::Error;

/// Local, fatal failures raised by the constitutive and element layers.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MagError {
    #[error("Quadrature point {point} out of range (material holds {capacity} points)")]
    PointOutOfRange { point: usize, capacity: usize },

    #[error("Field component {0} out of range (expected 0 or 1)")]
    ComponentOutOfRange(usize),

    #[error("Invalid element: {0}")]
    InvalidElement(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Material {0} not found")]
    MaterialNotFound(usize),
}

pub type MagResult<T> = Result<T, MagError>;
