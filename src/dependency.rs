//! Dependency trees and locked modules
//!
//! A [`DependencyTree`] spells out everything a module requires: its root is
//! the module, operator nodes mirror the prerequisite expression, and each
//! required module is expanded into its own tree in turn.
//!
//! [`LockedModules`] is the inverse relation. A module is locked by every
//! module that names it directly in its prerequisite, looking through
//! operator nodes but not into other modules' subtrees.

use std::collections::{HashMap, VecDeque};

use serde::Serialize;
use tracing::debug;

use crate::domain::{Expression, Operator};

/// A module and, recursively, the modules it requires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyTree {
    /// A module code, or `and`/`or` for operator nodes.
    pub name: String,
    /// Requirements, in the order they appear in the prerequisite.
    pub children: Vec<DependencyTree>,
}

impl DependencyTree {
    /// A node with no children.
    #[must_use]
    pub fn leaf(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            children: Vec::new(),
        }
    }

    /// Builds the full requirement tree for `code`.
    ///
    /// `prerequisites` maps every known module to its parsed prerequisite.
    /// Modules without an entry, or whose prerequisite is opaque text, have no
    /// children. A module that requires itself, directly or through others,
    /// is expanded only once along any path.
    #[must_use]
    pub fn build<'a>(code: &'a str, prerequisites: &'a HashMap<String, Expression>) -> Self {
        build_module(code, prerequisites, &mut Vec::new())
    }

    /// Whether this node is an `and`/`or` node rather than a module.
    #[must_use]
    pub fn is_operator(&self) -> bool {
        [Operator::And, Operator::Or]
            .iter()
            .any(|operator| self.name == operator.label())
    }

    /// The modules this tree's root requires directly.
    ///
    /// Walks breadth-first through operator nodes and stops at the first
    /// module on every branch.
    #[must_use]
    pub fn immediate_modules(&self) -> Vec<&str> {
        let mut queue: VecDeque<&Self> = self.children.iter().collect();
        let mut modules = Vec::new();

        while let Some(node) = queue.pop_front() {
            if node.is_operator() {
                queue.extend(&node.children);
            } else {
                modules.push(node.name.as_str());
            }
        }

        modules
    }
}

fn build_module<'a>(
    code: &'a str,
    prerequisites: &'a HashMap<String, Expression>,
    path: &mut Vec<&'a str>,
) -> DependencyTree {
    if path.contains(&code) {
        debug!(module = code, "prerequisite cycle, not expanding again");
        return DependencyTree::leaf(code);
    }

    let Some(expression) = prerequisites.get(code) else {
        return DependencyTree::leaf(code);
    };

    path.push(code);
    let children = match expression {
        Expression::Node(operator, children) => {
            vec![build_operator(*operator, children, prerequisites, path)]
        }
        other => match other.single_code() {
            Some(single) => vec![build_module(single, prerequisites, path)],
            None => Vec::new(),
        },
    };
    path.pop();

    DependencyTree {
        name: code.to_string(),
        children,
    }
}

fn build_operator<'a>(
    operator: Operator,
    children: &'a [Expression],
    prerequisites: &'a HashMap<String, Expression>,
    path: &mut Vec<&'a str>,
) -> DependencyTree {
    let mut nodes = Vec::with_capacity(children.len());
    for child in children {
        nodes.push(match child {
            Expression::Node(inner, grandchildren) => {
                build_operator(*inner, grandchildren, prerequisites, path)
            }
            Expression::Leaf(code) => build_module(code.as_str(), prerequisites, path),
            Expression::Opaque(text) => build_module(text, prerequisites, path),
        });
    }

    DependencyTree {
        name: operator.label().to_string(),
        children: nodes,
    }
}

/// For each module, the modules that list it as an immediate prerequisite.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LockedModules(HashMap<String, Vec<String>>);

impl LockedModules {
    /// Inverts a set of dependency trees.
    ///
    /// Every immediate module `C` of a tree rooted at `R` records `R` as a
    /// dependent, provided `is_known(C)`. Dependents are kept in order of first
    /// insertion, without duplicates. Unknown modules are skipped.
    pub fn invert<'a>(
        trees: impl IntoIterator<Item = &'a DependencyTree>,
        is_known: impl Fn(&str) -> bool,
    ) -> Self {
        let mut locked = Self::default();

        for tree in trees {
            for prerequisite in tree.immediate_modules() {
                if is_known(prerequisite) {
                    locked.insert(prerequisite, &tree.name);
                } else {
                    debug!(module = %tree.name, prerequisite, "skipping unknown prerequisite");
                }
            }
        }

        locked
    }

    fn insert(&mut self, prerequisite: &str, dependent: &str) {
        let dependents = self.0.entry(prerequisite.to_string()).or_default();
        if !dependents.iter().any(|existing| existing == dependent) {
            dependents.push(dependent.to_string());
        }
    }

    /// The modules locked by `code`, or an empty slice.
    #[must_use]
    pub fn get(&self, code: &str) -> &[String] {
        self.0.get(code).map_or(&[], Vec::as_slice)
    }

    /// The number of modules that lock at least one other module.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no module locks any other.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
