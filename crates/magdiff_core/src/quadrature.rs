use crate::error::{MagError, MagResult};

/// Gauss-Legendre abscissae and weights on [-1, 1], indexed by point count.
const GAUSS_1D: [&[(f64, f64)]; 5] = [
    &[(0.0, 2.0)],
    &[(-0.5773502691896257, 1.0), (0.5773502691896257, 1.0)],
    &[
        (-0.7745966692414834, 0.5555555555555556),
        (0.0, 0.8888888888888888),
        (0.7745966692414834, 0.5555555555555556),
    ],
    &[
        (-0.8611363115940526, 0.3478548451374538),
        (-0.3399810435848563, 0.6521451548625461),
        (0.3399810435848563, 0.6521451548625461),
        (0.8611363115940526, 0.3478548451374538),
    ],
    &[
        (-0.906179845938664, 0.23692688505618908),
        (-0.5384693101056831, 0.47862867049936647),
        (0.0, 0.5688888888888889),
        (0.5384693101056831, 0.47862867049936647),
        (0.906179845938664, 0.23692688505618908),
    ],
];

/// Integration point in reference coordinates (xi, eta).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuadraturePoint {
    pub xi: [f64; 2],
    pub weight: f64,
}

/// Tensor-product Gauss rule. Points are ordered with xi varying fastest.
#[derive(Debug, Clone, PartialEq)]
pub struct GaussQuadrature {
    counts: [usize; 2],
    points: Vec<QuadraturePoint>,
}

impl GaussQuadrature {
    pub fn new(counts: [usize; 2]) -> MagResult<Self> {
        let rule_xi = gauss_1d(counts[0])?;
        let rule_eta = gauss_1d(counts[1])?;

        let mut points = Vec::with_capacity(counts[0] * counts[1]);
        for &(eta, w_eta) in rule_eta {
            for &(xi, w_xi) in rule_xi {
                points.push(QuadraturePoint {
                    xi: [xi, eta],
                    weight: w_xi * w_eta,
                });
            }
        }
        Ok(Self { counts, points })
    }

    pub fn counts(&self) -> [usize; 2] {
        self.counts
    }

    pub fn points(&self) -> &[QuadraturePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

fn gauss_1d(count: usize) -> MagResult<&'static [(f64, f64)]> {
    if count == 0 || count > GAUSS_1D.len() {
        return Err(MagError::InvalidParameter(format!(
            "Gauss rule needs 1 to {} points per direction, got {}",
            GAUSS_1D.len(),
            count
        )));
    }
    Ok(GAUSS_1D[count - 1])
}
