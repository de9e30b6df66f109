//! B–H loop tracing for a single material point under sinusoidal excitation.

use crate::material::{EvalMode, HystereticMaterial};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Component driven by the tracer (axial).
const TRACE_COMPONENT: usize = 1;
const TRACE_POINT: usize = 0;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LoopSettings {
    /// Peak flux density (T).
    pub amplitude: f64,
    pub steps_per_cycle: usize,
    pub cycles: usize,
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self {
            amplitude: 1.0,
            steps_per_cycle: 200,
            cycles: 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BhPoint {
    pub b: f64,
    pub h: f64,
    pub m: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BhLoop {
    pub points: Vec<BhPoint>,
    pub steps_per_cycle: usize,
}

impl BhLoop {
    /// Points of the last full cycle.
    pub fn final_cycle(&self) -> &[BhPoint] {
        let n = self.steps_per_cycle.min(self.points.len());
        &self.points[self.points.len() - n..]
    }

    /// Enclosed area of the final cycle in the H–B plane (J/m³ per cycle).
    pub fn area(&self) -> f64 {
        let cycle = self.final_cycle();
        let n = cycle.len();
        if n < 3 {
            return 0.0;
        }
        let twice: f64 = (0..n)
            .map(|i| {
                let p = cycle[i];
                let q = cycle[(i + 1) % n];
                p.h * q.b - q.h * p.b
            })
            .sum();
        0.5 * twice.abs()
    }

    /// Largest |M| reached over the whole trace.
    pub fn peak_magnetization(&self) -> f64 {
        self.points.iter().fold(0.0, |acc, p| acc.max(p.m.abs()))
    }
}

fn validate(settings: &LoopSettings) -> Result<()> {
    if !settings.amplitude.is_finite() || settings.amplitude <= 0.0 {
        bail!("amplitude must be positive.");
    }
    if settings.steps_per_cycle < 4 {
        bail!("steps_per_cycle must be at least 4.");
    }
    if settings.cycles == 0 {
        bail!("cycles must be greater than zero.");
    }
    Ok(())
}

/// Drive `B(t) = amplitude·sin(2πt)` through point 0 of `material`,
/// committing every sample. The trace starts from the material's current
/// history; call [`HystereticMaterial::reset_history`] for a virgin curve.
pub fn trace_loop(material: &mut HystereticMaterial, settings: LoopSettings) -> Result<BhLoop> {
    validate(&settings)?;
    if material.quadrature_points() == 0 {
        bail!("Material has no history slots to trace.");
    }

    let samples = settings.steps_per_cycle * settings.cycles;
    let mut points = Vec::with_capacity(samples);
    for i in 1..=samples {
        let t = i as f64 / settings.steps_per_cycle as f64;
        let b = settings.amplitude * (2.0 * PI * t).sin();
        let (m, _) = material
            .evaluate_component(b, TRACE_COMPONENT, TRACE_POINT, EvalMode::Commit)
            .with_context(|| format!("Loop sample {i} failed."))?;
        let h = material.history(TRACE_POINT)?[TRACE_COMPONENT].h;
        points.push(BhPoint { b, h, m });
    }

    log::debug!(
        "traced {} samples at amplitude {} T",
        points.len(),
        settings.amplitude
    );
    Ok(BhLoop {
        points,
        steps_per_cycle: settings.steps_per_cycle,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::JaParameters;

    fn ambient() -> JaParameters {
        JaParameters::calibrated(298.0).expect("below Curie")
    }

    fn loop_area(k: f64) -> f64 {
        let p = ambient();
        let mut material = HystereticMaterial::new(0.0, 1, 1);
        material
            .update_parameters(p.a, p.alpha, p.c, p.ms, k)
            .expect("parameters");
        let settings = LoopSettings {
            amplitude: 0.5,
            steps_per_cycle: 80,
            cycles: 3,
        };
        trace_loop(&mut material, settings).expect("trace").area()
    }

    #[test]
    fn loop_area_shrinks_with_pinning() {
        let k = ambient().k;
        let full = loop_area(k);
        let tenth = loop_area(k / 10.0);
        let hundredth = loop_area(k / 100.0);
        assert!(full > 0.0);
        assert!(tenth < full / 5.0, "k/10 area {tenth} vs {full}");
        assert!(hundredth < tenth, "k/100 area {hundredth} vs {tenth}");
    }

    #[test]
    fn trace_records_every_sample_and_stays_bounded() {
        let mut material = HystereticMaterial::new(0.0, 1, 1);
        let settings = LoopSettings {
            amplitude: 1.5,
            steps_per_cycle: 40,
            cycles: 2,
        };
        let trace = trace_loop(&mut material, settings).expect("trace");
        assert_eq!(trace.points.len(), 80);
        assert_eq!(trace.final_cycle().len(), 40);

        let ms = ambient().ms;
        assert!(trace.peak_magnetization() > 0.0);
        assert!(trace.peak_magnetization() < 1.01 * ms);
        for p in &trace.points {
            assert!(p.h.is_finite() && p.m.is_finite());
        }
    }

    #[test]
    fn rejects_degenerate_settings() {
        let mut material = HystereticMaterial::new(0.0, 1, 1);
        let bad = LoopSettings {
            steps_per_cycle: 2,
            ..LoopSettings::default()
        };
        let err = trace_loop(&mut material, bad).unwrap_err();
        assert!(err.to_string().contains("steps_per_cycle"));

        let mut empty = HystereticMaterial::new(0.0, 0, 1);
        assert!(trace_loop(&mut empty, LoopSettings::default()).is_err());
    }
}
