//! Axisymmetric magnetic vector-potential element.
//!
//! The unknown is the azimuthal potential `u = A_θ` on the (r, z) half-plane.
//! Flux density is recovered as `B = (-∂u/∂z, ∂u/∂r + u/r)` and the weak form
//! is integrated with the volume measure `2π r dr dz`.

use crate::basis::{validate_node_order, Basis1D, LagrangeBasis1D, NodeOrder};
use crate::error::{MagError, MagResult};
use crate::material::{EvalMode, Material, Response};
use crate::node::{Node, TimeOrder};
use crate::quadrature::GaussQuadrature;
use nalgebra::{DMatrix, DVector, Matrix2, Vector2};
use std::f64::consts::PI;
use std::ops::Range;

/// External source density `f(position, time)`.
pub type BodyLoad = Box<dyn Fn(Vector2<f64>, f64) -> f64 + Send + Sync>;

/// Field data at one quadrature point. Rebuilt on every visit.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSnapshot {
    pub u: f64,
    /// (∂u/∂r, ∂u/∂z)
    pub grad_u: Vector2<f64>,
    pub v: f64,
    pub a: f64,
    /// Physical position (r, z).
    pub x: Vector2<f64>,
    pub n: DVector<f64>,
    /// Row 0: ∂N/∂r, row 1: ∂N/∂z.
    pub dn: DMatrix<f64>,
    /// Quadrature weight × |J| × 2πr.
    pub factor: f64,
}

/// Axisymmetric curl of the azimuthal potential.
pub fn flux_density(s: &FieldSnapshot) -> Vector2<f64> {
    Vector2::new(-s.grad_u[1], s.grad_u[0] + s.u / s.x[0])
}

/// Element contributions: stiffness, damping, mass and residual.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalMatrices {
    pub k: DMatrix<f64>,
    pub d: DMatrix<f64>,
    pub m: DMatrix<f64>,
    pub r: DVector<f64>,
}

impl LocalMatrices {
    pub fn zeros(n: usize) -> Self {
        Self {
            k: DMatrix::zeros(n, n),
            d: DMatrix::zeros(n, n),
            m: DMatrix::zeros(n, n),
            r: DVector::zeros(n),
        }
    }
}

pub struct AxisymmetricMagneticElement<B: Basis1D = LagrangeBasis1D> {
    nodes: Vec<usize>,
    degree: [usize; 2],
    basis: B,
    node_order: NodeOrder,
    material: usize,
    rule: GaussQuadrature,
    time_order: TimeOrder,
    history_offset: usize,
    body_load: Option<BodyLoad>,
}

impl<B: Basis1D> AxisymmetricMagneticElement<B> {
    /// `nodes` are mesh node indices listed in `node_order`; `material` is an
    /// index into the mesh's material table.
    pub fn new(
        nodes: Vec<usize>,
        degree: [usize; 2],
        basis: B,
        node_order: NodeOrder,
        material: usize,
        rule: GaussQuadrature,
    ) -> MagResult<Self> {
        validate_node_order(&node_order, degree, nodes.len())?;
        if rule.is_empty() {
            return Err(MagError::InvalidElement("empty quadrature rule".into()));
        }
        Ok(Self {
            nodes,
            degree,
            basis,
            node_order,
            material,
            rule,
            time_order: TimeOrder::Static,
            history_offset: 0,
            body_load: None,
        })
    }

    pub fn nodes(&self) -> &[usize] {
        &self.nodes
    }

    pub fn material(&self) -> usize {
        self.material
    }

    pub fn rule(&self) -> &GaussQuadrature {
        &self.rule
    }

    pub fn time_order(&self) -> TimeOrder {
        self.time_order
    }

    pub fn set_time_order(&mut self, order: TimeOrder) {
        self.time_order = order;
    }

    /// First material history slot used by this element.
    pub fn set_history_offset(&mut self, offset: usize) {
        self.history_offset = offset;
    }

    /// Material history slots visited by this element, one per quadrature point.
    pub fn history_range(&self) -> Range<usize> {
        self.history_offset..self.history_offset + self.rule.len()
    }

    pub fn set_body_load<F>(&mut self, load: F)
    where
        F: Fn(Vector2<f64>, f64) -> f64 + Send + Sync + 'static,
    {
        self.body_load = Some(Box::new(load));
    }

    pub fn clear_body_load(&mut self) {
        self.body_load = None;
    }

    fn body_load(&self, x: Vector2<f64>, t: f64) -> f64 {
        self.body_load.as_ref().map_or(0.0, |f| f(x, t))
    }

    /// Interpolate geometry and nodal fields at quadrature point `ig`.
    pub fn snapshot(&self, nodes: &[Node], ig: usize) -> MagResult<FieldSnapshot> {
        let qp = self.rule.points().get(ig).ok_or_else(|| {
            MagError::InvalidElement(format!(
                "quadrature point {ig} out of range for a {}-point rule",
                self.rule.len()
            ))
        })?;

        let [p, q] = self.degree;
        let (mut n_xi, mut dn_xi) = (vec![0.0; p + 1], vec![0.0; p + 1]);
        let (mut n_eta, mut dn_eta) = (vec![0.0; q + 1], vec![0.0; q + 1]);
        self.basis.evaluate(p, qp.xi[0], &mut n_xi, &mut dn_xi);
        self.basis.evaluate(q, qp.xi[1], &mut n_eta, &mut dn_eta);

        let nn = self.nodes.len();
        let mut n: DVector<f64> = DVector::zeros(nn);
        let mut dn_ref: DMatrix<f64> = DMatrix::zeros(2, nn);
        let mut jac: Matrix2<f64> = Matrix2::zeros();
        let mut x: Vector2<f64> = Vector2::zeros();
        let (mut u, mut v, mut a) = (0.0, 0.0, 0.0);

        for k in 0..nn {
            let (i, j) = (self.node_order[0][k], self.node_order[1][k]);
            n[k] = n_xi[i] * n_eta[j];
            dn_ref[(0, k)] = dn_xi[i] * n_eta[j];
            dn_ref[(1, k)] = n_xi[i] * dn_eta[j];

            let node = nodes.get(self.nodes[k]).ok_or_else(|| {
                MagError::InvalidElement(format!("node {} does not exist", self.nodes[k]))
            })?;
            for row in 0..2 {
                for col in 0..2 {
                    jac[(row, col)] += dn_ref[(row, k)] * node.x[col];
                }
            }
            x[0] += n[k] * node.x[0];
            x[1] += n[k] * node.x[1];
            u += n[k] * node.u;
            v += n[k] * node.v;
            a += n[k] * node.a;
        }

        // Either orientation is valid; only a collapsed mapping is rejected.
        let det = jac.determinant();
        if det == 0.0 || !det.is_finite() {
            return Err(MagError::InvalidElement(format!(
                "degenerate Jacobian determinant {det:e} at quadrature point {ig}"
            )));
        }
        let inv = jac
            .try_inverse()
            .ok_or_else(|| MagError::InvalidElement("singular element mapping".into()))?;

        let mut dn: DMatrix<f64> = DMatrix::zeros(2, nn);
        let mut grad_u: Vector2<f64> = Vector2::zeros();
        for k in 0..nn {
            for row in 0..2 {
                dn[(row, k)] = inv[(row, 0)] * dn_ref[(0, k)] + inv[(row, 1)] * dn_ref[(1, k)];
                grad_u[row] += dn[(row, k)] * nodes[self.nodes[k]].u;
            }
        }

        Ok(FieldSnapshot {
            u,
            grad_u,
            v,
            a,
            x,
            n,
            dn,
            factor: qp.weight * det.abs() * 2.0 * PI * x[0],
        })
    }

    /// Tangent entry (i, j). The hysteretic correction is the derivative of
    /// the magnetization source terms in [`Self::residual`].
    pub fn stiffness(
        &self,
        s: &FieldSnapshot,
        material: &Material,
        response: &Response,
        i: usize,
        j: usize,
    ) -> f64 {
        let r = s.x[0];
        let (ni, nj) = (s.n[i], s.n[j]);
        let (dri, drj) = (s.dn[(0, i)], s.dn[(0, j)]);
        let (dzi, dzj) = (s.dn[(1, i)], s.dn[(1, j)]);

        let radial = dri * drj + ni * drj / r + dri * nj / r + ni * nj / (r * r);
        let axial = dzi * dzj;

        let mut k = (radial + axial) / material.mu0();
        if material.has_hysteresis() {
            k -= response.dm[1] * radial;
            k -= response.dm[0] * axial;
        }
        k * s.factor
    }

    pub fn damping(&self, s: &FieldSnapshot, material: &Material, i: usize, j: usize) -> f64 {
        s.n[i] * s.n[j] * material.sigma() * s.factor
    }

    pub fn mass(&self, s: &FieldSnapshot, material: &Material, i: usize, j: usize) -> f64 {
        s.n[i] * s.n[j] * material.eps() * s.factor
    }

    pub fn residual(
        &self,
        s: &FieldSnapshot,
        material: &Material,
        response: &Response,
        i: usize,
        t: f64,
    ) -> f64 {
        let r = s.x[0];
        let ni = s.n[i];
        let (dri, dzi) = (s.dn[(0, i)], s.dn[(1, i)]);
        let hoop = ni / r + dri;

        let mut res = (dzi * s.grad_u[1] + hoop * (s.u / r + s.grad_u[0])) / material.mu0();
        if material.has_hysteresis() {
            res += response.magnetization[0] * dzi;
            res -= response.magnetization[1] * hoop;
        }
        if self.time_order.order() > 0 {
            res += ni * s.v * material.sigma();
        }
        if self.time_order == TimeOrder::Second {
            res += ni * s.a * material.eps();
        }
        res -= ni * self.body_load(s.x, t);
        res * s.factor
    }

    /// Integrate all four contributions, evaluating `material` once per
    /// quadrature point in `mode`.
    pub fn evaluate(
        &self,
        nodes: &[Node],
        material: &mut Material,
        t: f64,
        mode: EvalMode,
    ) -> MagResult<LocalMatrices> {
        let nn = self.nodes.len();
        let mut local = LocalMatrices::zeros(nn);

        for ig in 0..self.rule.len() {
            let s = self.snapshot(nodes, ig)?;
            let response = material.evaluate(flux_density(&s), self.history_offset + ig, mode)?;

            for i in 0..nn {
                local.r[i] += self.residual(&s, material, &response, i, t);
                for j in 0..nn {
                    local.k[(i, j)] += self.stiffness(&s, material, &response, i, j);
                    local.d[(i, j)] += self.damping(&s, material, i, j);
                    local.m[(i, j)] += self.mass(&s, material, i, j);
                }
            }
        }
        Ok(local)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basis::quad_node_order;
    use crate::material::{HystereticMaterial, LinearMaterial};

    fn assert_err_contains<T>(result: MagResult<T>, needle: &str) {
        let Err(err) = result else {
            panic!("expected error containing \"{needle}\"");
        };
        let message = format!("{err}");
        assert!(
            message.contains(needle),
            "expected error to contain \"{needle}\", got \"{message}\""
        );
    }

    /// Bilinear element on r ∈ [1, 2], z ∈ [0, 1].
    fn unit_element() -> (Vec<Node>, AxisymmetricMagneticElement) {
        let nodes = vec![
            Node::new(1.0, 0.0),
            Node::new(2.0, 0.0),
            Node::new(1.0, 1.0),
            Node::new(2.0, 1.0),
        ];
        let element = AxisymmetricMagneticElement::new(
            vec![0, 1, 2, 3],
            [1, 1],
            LagrangeBasis1D,
            quad_node_order([1, 1]),
            0,
            GaussQuadrature::new([2, 2]).expect("rule"),
        )
        .expect("element");
        (nodes, element)
    }

    fn air() -> Material {
        LinearMaterial::new(1.0, 1.0, 2.0, 0).into()
    }

    #[test]
    fn residual_vanishes_at_equilibrium_for_linear_material() {
        let (nodes, mut element) = unit_element();
        element.set_time_order(TimeOrder::Second);
        let mut material = air();
        let local = element
            .evaluate(&nodes, &mut material, 0.0, EvalMode::Trial)
            .expect("evaluate");
        assert!(local.r.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn uniform_axial_field_is_recovered() {
        let (mut nodes, element) = unit_element();
        let b0 = 0.8;
        for node in &mut nodes {
            node.u = 0.5 * b0 * node.x[0];
        }
        for ig in 0..element.rule().len() {
            let s = element.snapshot(&nodes, ig).expect("snapshot");
            let b = flux_density(&s);
            assert!(b[0].abs() < 1e-12);
            assert!((b[1] - b0).abs() < 1e-12);
        }
    }

    #[test]
    fn linear_residual_equals_stiffness_times_potential() {
        let (mut nodes, element) = unit_element();
        let values = [0.3, -0.1, 0.7, 0.2];
        for (node, &value) in nodes.iter_mut().zip(values.iter()) {
            node.u = value;
        }
        let mut material = air();
        let local = element
            .evaluate(&nodes, &mut material, 0.0, EvalMode::Trial)
            .expect("evaluate");

        let u = DVector::from_column_slice(&values);
        let ku = &local.k * &u;
        let scale = local.r.amax();
        for i in 0..4 {
            assert!((ku[i] - local.r[i]).abs() < 1e-10 * scale);
        }
        assert!((&local.k - local.k.transpose()).amax() < 1e-9 * local.k.amax());
    }

    #[test]
    fn damping_and_mass_integrate_revolved_volume() {
        let (nodes, element) = unit_element();
        let mut material = air();
        let local = element
            .evaluate(&nodes, &mut material, 0.0, EvalMode::Trial)
            .expect("evaluate");
        // ∫ 2πr dr dz over [1,2]×[0,1] = 3π
        let volume = 3.0 * PI;
        assert!((local.d.sum() - 2.0 * volume).abs() < 1e-12);
        assert!((local.m.sum() - material.eps() * volume).abs() < 1e-20);
    }

    #[test]
    fn mirrored_node_ordering_integrates_the_same_volume() {
        let (_, element) = unit_element();
        let mirrored = vec![
            Node::new(2.0, 0.0),
            Node::new(1.0, 0.0),
            Node::new(2.0, 1.0),
            Node::new(1.0, 1.0),
        ];
        let mut material = air();
        let local = element
            .evaluate(&mirrored, &mut material, 0.0, EvalMode::Trial)
            .expect("mirrored cell");
        let volume = 3.0 * PI;
        assert!((local.d.sum() - 2.0 * volume).abs() < 1e-12);
        assert!((local.m.sum() - material.eps() * volume).abs() < 1e-20);
        for i in 0..4 {
            assert!(local.k[(i, i)] > 0.0);
        }
    }

    #[test]
    fn collapsed_cell_is_rejected() {
        let (_, element) = unit_element();
        let collapsed = vec![
            Node::new(1.0, 0.0),
            Node::new(2.0, 0.0),
            Node::new(1.0, 0.0),
            Node::new(2.0, 0.0),
        ];
        assert_err_contains(element.snapshot(&collapsed, 0), "degenerate Jacobian");
    }

    #[test]
    fn body_load_enters_residual_with_negative_sign() {
        let (nodes, mut element) = unit_element();
        element.set_body_load(|_, t| 2.0 + t);
        let mut material = air();
        let local = element
            .evaluate(&nodes, &mut material, 1.0, EvalMode::Trial)
            .expect("evaluate");
        assert!((local.r.sum() + 3.0 * 3.0 * PI).abs() < 1e-12);

        element.clear_body_load();
        let local = element
            .evaluate(&nodes, &mut material, 1.0, EvalMode::Trial)
            .expect("evaluate");
        assert_eq!(local.r.sum(), 0.0);
    }

    #[test]
    fn time_terms_follow_declared_order() {
        let (mut nodes, mut element) = unit_element();
        for node in &mut nodes {
            node.v = 1.0;
            node.a = 1.0;
        }
        let mut material = air();

        let statik = element
            .evaluate(&nodes, &mut material, 0.0, EvalMode::Trial)
            .expect("evaluate");
        assert_eq!(statik.r.sum(), 0.0);

        element.set_time_order(TimeOrder::First);
        let first = element
            .evaluate(&nodes, &mut material, 0.0, EvalMode::Trial)
            .expect("evaluate");
        assert!((first.r.sum() - 2.0 * 3.0 * PI).abs() < 1e-12);

        element.set_time_order(TimeOrder::Second);
        let second = element
            .evaluate(&nodes, &mut material, 0.0, EvalMode::Trial)
            .expect("evaluate");
        let expected = (2.0 + material.eps()) * 3.0 * PI;
        assert!((second.r.sum() - expected).abs() < 1e-12);
    }

    #[test]
    fn hysteretic_tangent_softens_stiffness_without_touching_history() {
        let (mut nodes, element) = unit_element();
        for node in &mut nodes {
            node.u = 0.25 * node.x[0] + 0.1 * node.x[1];
        }
        let mut linear: Material = LinearMaterial::new(1.0, 1.0, 0.0, 0).into();
        let mut hysteretic: Material = HystereticMaterial::new(0.0, 4, 0).into();

        let k_lin = element
            .evaluate(&nodes, &mut linear, 0.0, EvalMode::Trial)
            .expect("linear")
            .k;
        let local = element
            .evaluate(&nodes, &mut hysteretic, 0.0, EvalMode::Trial)
            .expect("hysteretic");

        for i in 0..4 {
            assert!(local.k[(i, i)] < k_lin[(i, i)]);
        }
        if let Material::Hysteretic(m) = &hysteretic {
            for point in 0..4 {
                assert_eq!(m.history(point).expect("slot")[1].b, 0.0);
            }
        }
        assert!((&local.k - local.k.transpose()).amax() < 1e-9 * local.k.amax());
    }

    #[test]
    fn commit_pass_writes_element_history_slots() {
        let (mut nodes, mut element) = unit_element();
        for node in &mut nodes {
            node.u = 0.25 * node.x[0];
        }
        element.set_history_offset(4);
        let mut material: Material = HystereticMaterial::new(0.0, 8, 0).into();
        element
            .evaluate(&nodes, &mut material, 0.0, EvalMode::Commit)
            .expect("commit");

        let Material::Hysteretic(m) = &material else {
            panic!("expected hysteretic material");
        };
        for point in 0..4 {
            assert_eq!(m.history(point).expect("slot")[1].b, 0.0);
        }
        for point in element.history_range() {
            assert!((m.history(point).expect("slot")[1].b - 0.5).abs() < 1e-12);
        }
    }

    #[test]
    fn history_slots_beyond_material_capacity_are_fatal() {
        let (nodes, mut element) = unit_element();
        element.set_history_offset(2);
        let mut material: Material = HystereticMaterial::new(0.0, 4, 0).into();
        assert_err_contains(
            element.evaluate(&nodes, &mut material, 0.0, EvalMode::Trial),
            "out of range",
        );
    }

    #[test]
    fn rejects_inconsistent_construction() {
        assert_err_contains(
            AxisymmetricMagneticElement::new(
                vec![0, 1, 2],
                [1, 1],
                LagrangeBasis1D,
                quad_node_order([1, 1]),
                0,
                GaussQuadrature::new([2, 2]).expect("rule"),
            ),
            "needs 4 nodes",
        );

        let (nodes, element) = unit_element();
        assert_err_contains(element.snapshot(&nodes[..2], 0), "does not exist");
        assert_err_contains(element.snapshot(&nodes, 4), "out of range");
    }
}
