//! Jiles-Atherton material handle for JavaScript callers.

use anyhow::Result;
use magdiff_core::material::{EvalMode, HystereticMaterial};
use nalgebra::Vector2;
use wasm_bindgen::prelude::*;

#[wasm_bindgen]
pub struct WasmHystereticMaterial {
    inner: HystereticMaterial,
}

#[wasm_bindgen]
impl WasmHystereticMaterial {
    #[wasm_bindgen(constructor)]
    pub fn new(sigma: f64, quadrature_points: u32, id: u32) -> WasmHystereticMaterial {
        console_error_panic_hook::set_once();
        WasmHystereticMaterial {
            inner: HystereticMaterial::new(sigma, quadrature_points as usize, id as usize),
        }
    }

    pub fn set_parameters(
        &mut self,
        a: f64,
        alpha: f64,
        c: f64,
        ms: f64,
        k: f64,
    ) -> Result<(), JsValue> {
        self.inner
            .update_parameters(a, alpha, c, ms, k)
            .map_err(|e| JsValue::from_str(&format!("Invalid parameters: {}", e)))
    }

    /// Return to the temperature-calibrated parameters.
    pub fn use_calibration(&mut self) {
        self.inner.use_calibration();
    }

    pub fn set_temperature(&mut self, temperature: f64) {
        self.inner.set_temperature(temperature);
    }

    pub fn get_temperature(&self) -> f64 {
        self.inner.temperature()
    }

    /// Returns `[Mr, Mz, dMr, dMz]`. History is written only when `commit` is set.
    pub fn evaluate(&mut self, br: f64, bz: f64, point: u32, commit: bool) -> Result<Vec<f64>, JsValue> {
        self.evaluate_packed(br, bz, point as usize, commit)
            .map_err(|e| JsValue::from_str(&format!("Evaluation failed: {}", e)))
    }

    pub fn reset(&mut self) {
        self.inner.reset_history();
    }
}

impl WasmHystereticMaterial {
    fn evaluate_packed(&mut self, br: f64, bz: f64, point: usize, commit: bool) -> Result<Vec<f64>> {
        let mode = if commit { EvalMode::Commit } else { EvalMode::Trial };
        let response = self.inner.evaluate(Vector2::new(br, bz), point, mode)?;
        Ok(vec![
            response.magnetization[0],
            response.magnetization[1],
            response.dm[0],
            response.dm[1],
        ])
    }
}
