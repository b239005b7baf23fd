//! Preclusion resolution
//!
//! Preclusion text is not parsed as an expression: every module code it
//! mentions is a preclusion, regardless of the words around it.

use std::collections::BTreeSet;

use serde::Serialize;
use tracing::debug;

use crate::domain::{ModuleCode, Rules};

/// The outcome of resolving a module's preclusion text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Preclusions {
    /// The modules precluded, never including the module itself.
    Resolved(BTreeSet<ModuleCode>),
    /// Nothing could be extracted; the original text is kept for review.
    Unresolved(String),
}

impl Preclusions {
    /// Whether no codes could be extracted.
    #[must_use]
    pub const fn is_unresolved(&self) -> bool {
        matches!(self, Self::Unresolved(_))
    }
}

/// Extracts the modules precluded by `text` for the module `own_code`.
///
/// Placeholder codes standing for a group of modules are expanded, the
/// module's own code is removed, and any hand-recorded preclusions are added.
/// When nothing is left, the original text is returned unchanged.
///
/// ```
/// use modmaven::{Preclusions, Rules, resolve_preclusions};
///
/// let Preclusions::Resolved(codes) = resolve_preclusions("XX3311", "CM3311", &Rules::default())
/// else {
///     panic!("expected codes");
/// };
/// assert!(codes.iter().any(|code| code.as_str() == "ST3311"));
/// assert!(!codes.iter().any(|code| code.as_str() == "CM3311"));
/// ```
#[must_use]
pub fn resolve_preclusions(text: &str, own_code: &str, rules: &Rules) -> Preclusions {
    let mut resolved = BTreeSet::new();

    for code in ModuleCode::find_all(text) {
        match rules.equivalence_group(&code) {
            Some(expansion) => resolved.extend(expansion.iter().cloned()),
            None => {
                resolved.insert(code);
            }
        }
    }

    resolved.retain(|code| code.as_str() != own_code);
    resolved.extend(rules.manual_preclusions(own_code).iter().cloned());

    if resolved.is_empty() {
        debug!(module = own_code, "no module codes in preclusion");
        Preclusions::Unresolved(text.to_string())
    } else {
        Preclusions::Resolved(resolved)
    }
}

/// Resolves a module's preclusions, taking group membership into account.
///
/// A module that belongs to a preclusion group is precluded by every other
/// member of the group, whatever its text says. Otherwise the text, if any,
/// goes through [`resolve_preclusions`]. A group with no member besides the
/// module itself is ignored.
#[must_use]
pub fn resolve_module_preclusions(
    own_code: &str,
    text: Option<&str>,
    rules: &Rules,
) -> Option<Preclusions> {
    if let Some(group) = rules.preclusion_group(own_code) {
        let members: BTreeSet<ModuleCode> = group
            .modules
            .iter()
            .filter(|code| code.as_str() != own_code)
            .cloned()
            .collect();
        if !members.is_empty() {
            debug!(module = own_code, group = %group.name, "using preclusion group");
            return Some(Preclusions::Resolved(members));
        }
        debug!(module = own_code, group = %group.name, "preclusion group has no other members");
    }

    text.map(|text| resolve_preclusions(text, own_code, rules))
}
