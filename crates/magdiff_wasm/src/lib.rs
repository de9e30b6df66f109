//! WASM bindings for the magdiff core library.

mod hysteresis;
mod material;

pub use hysteresis::trace_bh_loop;
pub use material::WasmHystereticMaterial;

use js_sys::Float64Array;
use magdiff_core::anhysteretic::langevin;
use wasm_bindgen::prelude::*;

/// Samples of the Langevin function at `xs`, for plotting the anhysteretic shape.
#[wasm_bindgen]
pub fn langevin_curve(xs: Vec<f64>) -> Float64Array {
    let values = sample_langevin(&xs);
    Float64Array::from(values.as_slice())
}

pub(crate) fn sample_langevin(xs: &[f64]) -> Vec<f64> {
    xs.iter().map(|&x| langevin(x)).collect()
}
