//! # Protein Workbench Core Library
//!
//! Configuration, synthetic data and denoising transforms for protein
//! structure learning experiments.
//!
//! ## Layout
//!
//! - **[`config`]: Run Configuration.** Composes YAML/TOML documents through
//!   `defaults:` lists and overrides into closed trees that can only grow
//!   inside an explicit edit scope. Composition state lives in a
//!   [`config::ConfigContext`] owned by the caller.
//!
//! - **[`protein`]: Structures and Batches.** The atom37 protein
//!   representation, random structures with ideal backbone geometry, and
//!   batches with membership indices and cached neighbour graphs.
//!
//! - **[`geometry`]**: RMSD, torsions and NeRF atom placement.
//!
//! - **[`transforms`]: Denoising Corruptions.** Torsional, coordinate and
//!   sequence noise, instantiated by name through a
//!   [`transforms::TransformRegistry`].
//!
//! - **[`harness`]: Test Harness.** Config fixtures with test defaults and the
//!   transform runner that checks a corruption produces a measurable change.

pub mod config;
pub mod geometry;
pub mod harness;
pub mod protein;
pub mod transforms;
