//! Core types for the contagion sentinel.

pub mod request;
pub mod supplier;
pub mod verdict;

pub use request::{AuditRequest, RequestError};
pub use supplier::{DependencyRecord, SupplierRecord, Tier};
pub use verdict::{AnalysisKind, AuditStatus, Verdict};
