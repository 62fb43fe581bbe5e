//! Structural validation of definitions.
//!
//! Validation reports defects as data instead of failing on the first one:
//! a definition with three problems yields three [`Finding`]s. Only
//! [`validate_strict`] turns findings into an error.
//!
//! # Example
//!
//! ```rust
//! use statewalk::core::Graph;
//! use statewalk::validation::{validate, FindingKind};
//!
//! let graph = Graph::new("empty");
//! let findings = validate(&graph, graph.root());
//! assert_eq!(findings[0].kind, FindingKind::NoStartState);
//! assert_eq!(findings[1].kind, FindingKind::NoEndState);
//! ```

mod findings;
mod rules;

pub use findings::{Finding, FindingKind};
pub use rules::{check, is_valid, validate, validate_strict, Checked};
