//! Domain models for prerequisite parsing.
//!
//! This module contains the value types shared by every stage of the
//! pipeline: module codes, boolean expressions over them, and the rule tables
//! that steer parsing.

/// Module code validation and extraction.
pub mod module_code;
pub use module_code::{InvalidModuleCodeError, ModuleCode};

/// Boolean expressions over module codes.
pub mod expression;
pub use expression::{Expression, Operator};

mod rules;
pub use rules::{PreclusionGroup, PrerequisiteException, Rules, RulesError};
