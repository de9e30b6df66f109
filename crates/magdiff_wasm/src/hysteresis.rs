//! B–H loop tracing exposed to JavaScript.

use anyhow::{anyhow, Result};
use magdiff_core::hysteresis_loop::{trace_loop, BhLoop, LoopSettings};
use magdiff_core::material::jiles_atherton::AMBIENT_TEMPERATURE;
use magdiff_core::material::{HystereticMaterial, JaParameters};
use serde::Serialize;
use serde_wasm_bindgen::{from_value, to_value};
use wasm_bindgen::prelude::*;

#[derive(Serialize)]
struct LoopPayload {
    b: Vec<f64>,
    h: Vec<f64>,
    m: Vec<f64>,
    area: f64,
}

/// Trace a B–H loop from a demagnetised state. `params` may be `null`, in
/// which case the ambient-temperature calibration is used.
#[wasm_bindgen]
pub fn trace_bh_loop(params: JsValue, settings: JsValue) -> Result<JsValue, JsValue> {
    console_error_panic_hook::set_once();

    let params: Option<JaParameters> = if params.is_null() || params.is_undefined() {
        None
    } else {
        Some(
            from_value(params)
                .map_err(|e| JsValue::from_str(&format!("Invalid parameters: {}", e)))?,
        )
    };
    let settings: LoopSettings = from_value(settings)
        .map_err(|e| JsValue::from_str(&format!("Invalid loop settings: {}", e)))?;

    let trace = run_trace(params, settings)
        .map_err(|e| JsValue::from_str(&format!("Loop tracing failed: {:#}", e)))?;

    to_value(&payload(&trace)).map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}

fn run_trace(params: Option<JaParameters>, settings: LoopSettings) -> Result<BhLoop> {
    let mut material = HystereticMaterial::new(0.0, 1, 0);
    let params = match params {
        Some(params) => params,
        None => JaParameters::calibrated(AMBIENT_TEMPERATURE)
            .ok_or_else(|| anyhow!("Ambient temperature is above the Curie point."))?,
    };
    material.set_parameters(params)?;
    trace_loop(&mut material, settings)
}

fn payload(trace: &BhLoop) -> LoopPayload {
    LoopPayload {
        b: trace.points.iter().map(|p| p.b).collect(),
        h: trace.points.iter().map(|p| p.h).collect(),
        m: trace.points.iter().map(|p| p.m).collect(),
        area: trace.area(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_trace_uses_ambient_calibration() {
        let settings = LoopSettings {
            amplitude: 0.5,
            steps_per_cycle: 40,
            cycles: 2,
        };
        let trace = run_trace(None, settings).expect("trace");
        let out = payload(&trace);
        assert_eq!(out.b.len(), 80);
        assert_eq!(out.h.len(), out.m.len());
        assert!(out.area > 0.0);
    }

    #[test]
    fn invalid_parameters_fail() {
        let mut params = JaParameters::calibrated(AMBIENT_TEMPERATURE).expect("ambient");
        params.a = 0.0;
        let err = run_trace(Some(params), LoopSettings::default()).unwrap_err();
        assert!(err.to_string().contains("a must be positive"));
    }
}
