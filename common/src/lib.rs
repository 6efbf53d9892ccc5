//! Shared pure logic for the config synchronizer
//!
//! Config rendering and artifact naming rules, kept free of I/O so the
//! control plane and the one-shot CLI share one definition of the on-disk
//! format.

pub mod artifact;
pub mod render;

pub use render::{render, DEFAULT_CLUSTER_DOMAIN};
