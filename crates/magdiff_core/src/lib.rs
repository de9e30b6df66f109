//! The `magdiff_core` crate provides the numerical engine for transient
//! axisymmetric magnetic diffusion in ferromagnetic parts.
//!
//! Key components:
//! - **Anhysteretic**: Langevin function and its derivative, stable near zero.
//! - **Material**: Linear media and the Jiles-Atherton hysteresis model with
//!   per-quadrature-point history and explicit `Trial`/`Commit` evaluation.
//! - **Element**: Axisymmetric vector-potential element kernels (K, D, M, R).
//! - **Assembly / Solver**: Global assembly and a Newton time-stepper that
//!   commits history once per converged step.
//! - **Hysteresis loop**: B–H loop tracing for material characterisation.
pub mod anhysteretic;
pub mod assembly;
pub mod basis;
pub mod element;
pub mod error;
pub mod hysteresis_loop;
pub mod material;
pub mod node;
pub mod quadrature;
pub mod solver;
