//! apiduel - paired REST vs GraphQL benchmark with statistical analysis
//!
//! The runner measures every query tier against both API styles in
//! randomized, paced trials. The analyzer gates on Shapiro-Wilk normality to
//! choose between a paired t-test and the Wilcoxon signed-rank test, then
//! reports differences and Cohen's d per tier for response time (RQ1) and
//! payload size (RQ2).

pub mod analysis;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod csv_output;
pub mod error;
pub mod executor;
pub mod json_output;
pub mod observation;
pub mod report;
pub mod runner;
pub mod stats;
