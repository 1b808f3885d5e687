//! Core pipeline for the metas dashboard: load tabular sources, filter
//! and group by period/rep, derive the handful of ratio and gap
//! metrics, and format rows and chart series for display. The binary in
//! `main.rs` drives this as a strict one-way pipeline, rerun from
//! scratch on every filter change.

pub mod aggregate;
pub mod error;
pub mod loader;
pub mod metrics;
pub mod output;
pub mod present;
pub mod types;
pub mod util;
