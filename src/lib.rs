//! Core entry point for the lca_report crate.
//!
//! The crate turns an assessment input and the indicators predicted for it into a single-page PDF
//! report with an input echo, the rounded indicators, two charts and a list of recommendations.

pub mod builder;
pub mod chart;
pub mod fonts;
pub mod layout;
pub mod model;
pub mod predict;
pub mod recommend;

pub use builder::{RenderedReport, ReportBuilder, ReportError};
pub use model::{InputRecord, PredictionResult};
