//! wyschooldata core: Wyoming public-school enrollment data access.
//!
//! This crate contains:
//! - Year-range validation against the provider's published bounds
//! - Single-year fetch, decoded once into a canonical wide schema
//! - Multi-year batches with all-or-nothing semantics and deterministic order
//! - Wide-to-tidy reshaping driven by a versioned subgroup catalog
//! - Provider implementations (in-memory/fixture, HTTP) behind one trait

pub mod client;
pub mod combine;
pub mod config;
pub mod data;
pub mod domain;
pub mod error;
pub mod fetch;
pub mod tidy;
pub mod upstream;
pub mod years;

pub use client::EnrollmentClient;
pub use config::{ClientConfig, ConfigError};
pub use domain::{
    EnrollmentRecord, EntityType, GradeLevel, TidyDiagnostic, TidyExtract, TidyRecord,
    WideExtract, YearRange,
};
pub use error::EnrollmentError;
