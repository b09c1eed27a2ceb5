//! Hypothesis-testing engine for segmented insurance books.
//!
//! A book of policies is enriched into per-policy risk metrics (claim
//! frequency, severity, margin), then a battery of statistical tests is run
//! across segmentation attributes. Outcomes are serialisable and feed the
//! `report` binary.

pub mod balance;
pub mod battery;
pub mod config;
pub mod dataset;
pub mod error;
pub mod interpret;
pub mod result;
pub mod runner;
pub mod stats;
pub mod synthetic;
