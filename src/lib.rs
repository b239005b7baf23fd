//! Prerequisite parsing for module catalogues
//!
//! Module prerequisites and preclusions are written as free text. This crate
//! turns that text into boolean trees over module codes, builds a "requires"
//! tree for every module, and inverts those trees into the set of modules
//! each module unlocks.

pub mod domain;
pub use domain::{Expression, ModuleCode, Operator, Rules};

/// Prerequisite text to expression parsing.
pub mod parser;
pub use parser::parse_prerequisite;

/// Preclusion text resolution.
pub mod preclusion;
pub use preclusion::{Preclusions, resolve_preclusions};

/// Dependency trees and their inversion.
pub mod dependency;
pub use dependency::{DependencyTree, LockedModules};

/// Whole-catalogue processing.
pub mod catalogue;
pub use catalogue::{Catalogue, ModuleRecord, ProcessedModule};
