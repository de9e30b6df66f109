//! Jiles-Atherton hysteresis with per-quadrature-point history.
//!
//! Each quadrature point owns a [`PointHistory`] slot holding the last
//! committed `(B, H, M, dM/dB)` for the radial and axial components. The
//! magnetization ODE is integrated from the committed state to the requested
//! flux density with a fixed number of semi-implicit substeps; a `Trial`
//! evaluation returns the result without touching the slot, a `Commit`
//! evaluation writes it back.

use super::{EvalMode, MaterialProps, Response, VACUUM_PERMEABILITY, VACUUM_PERMITTIVITY};
use crate::anhysteretic::{langevin, langevin_derivative};
use crate::error::{MagError, MagResult};
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

pub const SUBSTEPS: usize = 400;
pub const AMBIENT_TEMPERATURE: f64 = 298.0;
/// Reference temperature of the empirical parameter fits.
pub const CURIE_TEMPERATURE: f64 = 1.0213513430455913e3;

/// Last-substep magnetization jump, relative to `ms`, above which a warning is logged.
const SUBSTEP_WARN_FRACTION: f64 = 1.0e-3;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JaParameters {
    /// Anhysteretic shape parameter (A/m).
    pub a: f64,
    /// Mean-field coupling.
    pub alpha: f64,
    /// Reversibility coefficient.
    pub c: f64,
    /// Saturation magnetization (A/m).
    pub ms: f64,
    /// Pinning coefficient (A/m).
    pub k: f64,
}

impl JaParameters {
    /// Power-law fits in the reduced temperature `T / CURIE_TEMPERATURE`.
    ///
    /// Returns `None` at or above the Curie point, where the material is
    /// nonmagnetic.
    pub fn calibrated(temperature: f64) -> Option<Self> {
        if temperature >= CURIE_TEMPERATURE {
            return None;
        }
        let s = 1.0 - temperature / CURIE_TEMPERATURE;
        Some(Self {
            ms: 1.6666270496980909e6 * s.powf(2.0588027319169142e-1),
            a: 1.1065973379588542e1_f64.exp() * s.powf(1.7544087504777564e-1),
            alpha: (-2.7711734827753376e0_f64).exp() * s.powf(-1.1702805122223958e-1),
            c: (-1.339064360358903e0_f64).exp() * s.powf(-3.4877155040447291e-2),
            k: 8.8017026926921e0_f64.exp() * s.powf(2.4926461785971135e-1),
        })
    }

    fn validate(&self) -> MagResult<()> {
        let values = [self.a, self.alpha, self.c, self.ms, self.k];
        if values.iter().any(|v| !v.is_finite()) {
            return Err(MagError::InvalidParameter(
                "Jiles-Atherton parameters must be finite".into(),
            ));
        }
        if self.a <= 0.0 {
            return Err(MagError::InvalidParameter("a must be positive".into()));
        }
        if self.c <= -1.0 {
            return Err(MagError::InvalidParameter("c must be greater than -1".into()));
        }
        if self.k < 0.0 {
            return Err(MagError::InvalidParameter("k must not be negative".into()));
        }
        if self.k == 0.0 && self.c == 0.0 {
            return Err(MagError::InvalidParameter(
                "k and c cannot both be zero (the susceptibility is 0/0 from a virgin state)".into(),
            ));
        }
        Ok(())
    }
}

/// Where the parameters come from on every evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ParameterSource {
    /// Recalibrated from the current temperature.
    Calibrated,
    /// Used verbatim below the Curie point, whatever the temperature.
    Fixed(JaParameters),
}

/// Committed state of one field component at one quadrature point.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ComponentHistory {
    pub b: f64,
    pub h: f64,
    pub m: f64,
    pub dm: f64,
}

/// Radial and axial component history of one quadrature point.
pub type PointHistory = [ComponentHistory; 2];

#[derive(Debug, Clone, Copy)]
struct ComponentUpdate {
    state: ComponentHistory,
    delta: f64,
}

#[derive(Debug, Clone)]
pub struct HystereticMaterial {
    props: MaterialProps,
    source: ParameterSource,
    params: Option<JaParameters>,
    temperature: f64,
    history: Vec<PointHistory>,
    current: Response,
    delta: f64,
}

impl HystereticMaterial {
    /// `quadrature_points` sizes the history arena; every element using this
    /// material addresses a disjoint range of it.
    pub fn new(sigma: f64, quadrature_points: usize, id: usize) -> Self {
        Self {
            props: MaterialProps {
                id,
                mu0: VACUUM_PERMEABILITY,
                sigma,
                eps: VACUUM_PERMITTIVITY,
            },
            source: ParameterSource::Calibrated,
            params: JaParameters::calibrated(AMBIENT_TEMPERATURE),
            temperature: AMBIENT_TEMPERATURE,
            history: vec![PointHistory::default(); quadrature_points],
            current: Response::zero(),
            delta: 1.0,
        }
    }

    pub fn props(&self) -> &MaterialProps {
        &self.props
    }

    pub fn quadrature_points(&self) -> usize {
        self.history.len()
    }

    /// Pin the parameters, bypassing the temperature fit.
    pub fn update_parameters(&mut self, a: f64, alpha: f64, c: f64, ms: f64, k: f64) -> MagResult<()> {
        self.set_parameters(JaParameters { a, alpha, c, ms, k })
    }

    pub fn set_parameters(&mut self, params: JaParameters) -> MagResult<()> {
        params.validate()?;
        self.source = ParameterSource::Fixed(params);
        self.params = self.active_parameters();
        Ok(())
    }

    /// Return to temperature-calibrated parameters.
    pub fn use_calibration(&mut self) {
        self.source = ParameterSource::Calibrated;
        self.params = JaParameters::calibrated(self.temperature);
    }

    pub fn parameter_source(&self) -> ParameterSource {
        self.source
    }

    /// Parameters of the most recent calibration, `None` above the Curie point.
    pub fn parameters(&self) -> Option<JaParameters> {
        self.params
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    /// Set the temperature supplied by a coupled thermal field.
    pub fn set_temperature(&mut self, temperature: f64) {
        self.temperature = temperature;
    }

    /// Recompute parameters for `temperature`. Returns `false` when the
    /// material is nonmagnetic there.
    pub fn calibrate(&mut self, temperature: f64) -> bool {
        self.temperature = temperature;
        self.params = self.active_parameters();
        self.params.is_some()
    }

    pub fn current(&self) -> Response {
        self.current
    }

    /// Loop direction of the last integrated component.
    pub fn delta(&self) -> f64 {
        self.delta
    }

    pub fn history(&self, point: usize) -> MagResult<&PointHistory> {
        self.history.get(point).ok_or(MagError::PointOutOfRange {
            point,
            capacity: self.history.len(),
        })
    }

    /// Forget every committed state (demagnetised start).
    pub fn reset_history(&mut self) {
        for slot in &mut self.history {
            *slot = PointHistory::default();
        }
        self.current = Response::zero();
        self.delta = 1.0;
    }

    /// Parameters in force at the current temperature. Both sources are
    /// nonmagnetic at or above the Curie point.
    fn active_parameters(&self) -> Option<JaParameters> {
        if self.temperature >= CURIE_TEMPERATURE {
            return None;
        }
        match self.source {
            ParameterSource::Calibrated => JaParameters::calibrated(self.temperature),
            ParameterSource::Fixed(params) => Some(params),
        }
    }

    /// Trial response at `point` without mutating anything.
    pub fn respond(&self, b: Vector2<f64>, point: usize) -> MagResult<Response> {
        let prev = self.history(point)?;
        let Some(params) = self.active_parameters() else {
            return Ok(Response::zero());
        };
        let mut response = Response::zero();
        for component in 0..2 {
            let update = integrate_component(&params, self.props.mu0, &prev[component], b[component]);
            response.magnetization[component] = update.state.m;
            response.dm[component] = update.state.dm;
        }
        Ok(response)
    }

    /// Evaluate one component and record the result as current. History is
    /// written only for [`EvalMode::Commit`].
    pub fn evaluate_component(
        &mut self,
        b: f64,
        component: usize,
        point: usize,
        mode: EvalMode,
    ) -> MagResult<(f64, f64)> {
        if component > 1 {
            return Err(MagError::ComponentOutOfRange(component));
        }
        let capacity = self.history.len();
        if point >= capacity {
            return Err(MagError::PointOutOfRange { point, capacity });
        }

        self.calibrate(self.temperature);
        let Some(params) = self.params else {
            self.current.magnetization[component] = 0.0;
            self.current.dm[component] = 0.0;
            return Ok((0.0, 0.0));
        };

        let update = integrate_component(
            &params,
            self.props.mu0,
            &self.history[point][component],
            b,
        );
        self.delta = update.delta;
        self.current.magnetization[component] = update.state.m;
        self.current.dm[component] = update.state.dm;

        if mode.is_commit() {
            self.history[point][component] = update.state;
            log::trace!(
                "material {} committed point {} component {}: B = {}, M = {}",
                self.props.id,
                point,
                component,
                b,
                update.state.m
            );
        }
        Ok((update.state.m, update.state.dm))
    }

    /// Evaluate the radial and axial components independently.
    pub fn evaluate(&mut self, b: Vector2<f64>, point: usize, mode: EvalMode) -> MagResult<Response> {
        self.evaluate_component(b[0], 0, point, mode)?;
        self.evaluate_component(b[1], 1, point, mode)?;
        Ok(self.current)
    }
}

/// Integrate dM/dB from the committed state `prev` up to `b`.
fn integrate_component(
    params: &JaParameters,
    mu0: f64,
    prev: &ComponentHistory,
    b: f64,
) -> ComponentUpdate {
    let delta = if b < prev.b { -1.0 } else { 1.0 };

    if b == prev.b {
        return ComponentUpdate {
            state: ComponentHistory { b, ..*prev },
            delta,
        };
    }

    let step = (b - prev.b) / SUBSTEPS as f64;
    let c1 = 1.0 / (1.0 + params.c);
    let mut barr = prev.b;
    let mut h = prev.h;
    let mut mu1 = prev.m;
    let mut dmu1 = prev.dm;

    for _ in 0..SUBSTEPS {
        let he = h + params.alpha * mu1;
        let x = he / params.a;
        let man = params.ms * langevin(x);
        let mut dman = params.ms / params.a * langevin_derivative(x);
        dman /= 1.0 - params.alpha * dman;

        dmu1 = c1 * (man - mu1)
            / (delta * params.k - params.alpha * (man - mu1) + params.c * c1 * dman);
        if dmu1 < 0.0 {
            dmu1 = -dmu1;
        }
        dmu1 /= mu0 * (1.0 + dmu1);

        mu1 += dmu1 * step;
        barr += step;
        h = barr / mu0 - mu1;
    }

    let last_increment = (dmu1 * step).abs();
    if !mu1.is_finite() || last_increment > SUBSTEP_WARN_FRACTION * params.ms.abs() {
        log::warn!(
            "Jiles-Atherton substepping from B = {} to B = {} ended with M = {} (last increment {:.3e})",
            prev.b,
            b,
            mu1,
            last_increment
        );
    }

    ComponentUpdate {
        state: ComponentHistory {
            b,
            h,
            m: mu1,
            dm: dmu1,
        },
        delta,
    }
}
