//! Newton iteration per time step with a single commit pass after convergence.

use crate::assembly::{GlobalSystem, Mesh};
use crate::material::EvalMode;
use crate::node::TimeOrder;
use anyhow::{anyhow, bail, Context, Result};
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

/// Newmark parameters for the second-order scheme (average acceleration).
const NEWMARK_BETA: f64 = 0.25;
const NEWMARK_GAMMA: f64 = 0.5;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct NewtonSettings {
    pub max_steps: usize,
    pub damping: f64,
    /// Convergence threshold on ‖R‖ relative to max(1, ‖R₀‖).
    pub tolerance: f64,
}

impl Default for NewtonSettings {
    fn default() -> Self {
        Self {
            max_steps: 25,
            damping: 1.0,
            tolerance: 1e-8,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SolverSettings {
    pub newton: NewtonSettings,
    pub dt: f64,
    pub steps: usize,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            newton: NewtonSettings::default(),
            dt: 1.0e-6,
            steps: 10,
        }
    }
}

impl SolverSettings {
    fn validate(&self) -> Result<()> {
        if self.newton.max_steps == 0 {
            bail!("max_steps must be greater than zero.");
        }
        if self.newton.damping <= 0.0 {
            bail!("damping must be positive.");
        }
        if self.newton.tolerance <= 0.0 {
            bail!("tolerance must be positive.");
        }
        if self.dt <= 0.0 || !self.dt.is_finite() {
            bail!("dt must be positive.");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StepReport {
    pub time: f64,
    pub iterations: usize,
    pub residual_norm: f64,
}

/// Nodal state at the start of a step, per free equation.
struct StepStart {
    u: DVector<f64>,
    v: DVector<f64>,
    a: DVector<f64>,
}

/// Drives a mesh through time. Trial assemblies during Newton iteration,
/// exactly one commit assembly per converged step.
pub struct TransientSolver {
    settings: SolverSettings,
    order: TimeOrder,
    time: f64,
}

impl TransientSolver {
    pub fn new(mesh: &mut Mesh, settings: SolverSettings) -> Result<Self> {
        settings.validate()?;
        if mesh.number_equations() == 0 {
            bail!("Mesh has no free equations.");
        }
        Ok(Self {
            settings,
            order: mesh.time_order(),
            time: 0.0,
        })
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    /// Run all configured steps.
    pub fn run(&mut self, mesh: &mut Mesh) -> Result<Vec<StepReport>> {
        let mut reports = Vec::with_capacity(self.settings.steps);
        for step in 0..self.settings.steps {
            let report = self
                .step(mesh)
                .with_context(|| format!("Time step {} failed.", step + 1))?;
            reports.push(report);
        }
        Ok(reports)
    }

    /// Advance one step of size `dt`. On failure the nodal values are
    /// restored and no history is committed.
    pub fn step(&mut self, mesh: &mut Mesh) -> Result<StepReport> {
        let t = self.time + self.settings.dt;
        let start = capture(mesh);
        let report = match self.solve_at(mesh, t, &start) {
            Ok(report) => report,
            Err(err) => {
                restore(mesh, &start);
                return Err(err);
            }
        };

        mesh.assemble(t, EvalMode::Commit)
            .context("Commit pass failed after convergence.")?;
        self.time = t;
        Ok(report)
    }

    fn solve_at(&self, mesh: &mut Mesh, t: f64, start: &StepStart) -> Result<StepReport> {
        let newton = self.settings.newton;
        let (c_d, c_m) = self.rate_coefficients();

        let mut u = start.u.clone();
        self.update_rates(mesh, &u, start);
        let mut system = mesh.assemble(t, EvalMode::Trial)?;
        let mut residual_norm = system.r.norm();
        let reference = residual_norm.max(1.0);
        let mut iterations = 0usize;

        loop {
            log::debug!("t = {t:e}, iteration {iterations}: ‖R‖ = {residual_norm:e}");
            if residual_norm <= newton.tolerance * reference {
                break;
            }

            if iterations >= newton.max_steps {
                log::warn!(
                    "Newton iteration stalled at t = {t:e} with ‖R‖ = {residual_norm:e}"
                );
                bail!(
                    "Newton solver failed to converge in {} steps (‖R‖ = {}).",
                    newton.max_steps,
                    residual_norm
                );
            }

            let jacobian = effective_jacobian(&system, c_d, c_m);
            let delta = solve_linear_system(jacobian, &system.r)
                .context("Failed to solve linear system during Newton iteration.")?;
            u -= delta * newton.damping;

            iterations += 1;
            self.update_rates(mesh, &u, start);
            system = mesh.assemble(t, EvalMode::Trial)?;
            residual_norm = system.r.norm();
        }

        Ok(StepReport {
            time: t,
            iterations,
            residual_norm,
        })
    }

    /// d(v)/d(u) and d(a)/d(u) of the integration scheme.
    fn rate_coefficients(&self) -> (f64, f64) {
        let dt = self.settings.dt;
        match self.order {
            TimeOrder::Static => (0.0, 0.0),
            TimeOrder::First => (1.0 / dt, 0.0),
            TimeOrder::Second => (
                NEWMARK_GAMMA / (NEWMARK_BETA * dt),
                1.0 / (NEWMARK_BETA * dt * dt),
            ),
        }
    }

    /// Write `u` and the consistent velocity/acceleration onto the free nodes.
    fn update_rates(&self, mesh: &mut Mesh, u: &DVector<f64>, start: &StepStart) {
        let dt = self.settings.dt;
        for node in &mut mesh.nodes {
            let Some(eq) = node.equation else { continue };
            node.u = u[eq];
            match self.order {
                TimeOrder::Static => {}
                TimeOrder::First => {
                    node.v = (u[eq] - start.u[eq]) / dt;
                }
                TimeOrder::Second => {
                    let a = (u[eq] - start.u[eq] - dt * start.v[eq]) / (NEWMARK_BETA * dt * dt)
                        - (0.5 / NEWMARK_BETA - 1.0) * start.a[eq];
                    node.a = a;
                    node.v = start.v[eq]
                        + dt * ((1.0 - NEWMARK_GAMMA) * start.a[eq] + NEWMARK_GAMMA * a);
                }
            }
        }
    }
}

fn capture(mesh: &Mesh) -> StepStart {
    let n = mesh.equations();
    let mut start = StepStart {
        u: DVector::zeros(n),
        v: DVector::zeros(n),
        a: DVector::zeros(n),
    };
    for node in &mesh.nodes {
        if let Some(eq) = node.equation {
            start.u[eq] = node.u;
            start.v[eq] = node.v;
            start.a[eq] = node.a;
        }
    }
    start
}

fn restore(mesh: &mut Mesh, start: &StepStart) {
    for node in &mut mesh.nodes {
        if let Some(eq) = node.equation {
            node.u = start.u[eq];
            node.v = start.v[eq];
            node.a = start.a[eq];
        }
    }
}

fn effective_jacobian(system: &GlobalSystem, c_d: f64, c_m: f64) -> DMatrix<f64> {
    let mut jacobian = system.k.clone();
    if c_d != 0.0 {
        jacobian += &system.d * c_d;
    }
    if c_m != 0.0 {
        jacobian += &system.m * c_m;
    }
    jacobian
}

fn solve_linear_system(jacobian: DMatrix<f64>, residual: &DVector<f64>) -> Result<DVector<f64>> {
    jacobian
        .lu()
        .solve(residual)
        .ok_or_else(|| anyhow!("Jacobian is singular."))
}
