//! Boolean prerequisite expressions over module codes.

use std::fmt;

use serde::{Deserialize, Serialize, ser::SerializeMap};

use crate::domain::{ModuleCode, module_code};

/// A boolean connective joining two or more requirements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operator {
    /// Every child is required.
    And,
    /// Any one child is sufficient.
    Or,
}

impl Operator {
    /// Reduction rank. Lower ranks bind tighter, so `AND` groups before `OR`.
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::And => 0,
            Self::Or => 1,
        }
    }

    /// The lowercase word used in trees and serialised output.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::And => "and",
            Self::Or => "or",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A parsed prerequisite.
///
/// Operator nodes keep their children in the order they were read from the
/// source text. After [`Expression::flatten`], no node has a direct child node
/// with the same operator, and every node has at least two children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expression {
    /// A single required module.
    Leaf(ModuleCode),
    /// An operator applied to an ordered list of children.
    Node(Operator, Vec<Expression>),
    /// Text that could not be (or must not be) parsed, kept verbatim.
    Opaque(String),
}

impl Expression {
    /// Builds a node from module codes, collapsing it to a leaf when only one
    /// code is given. Returns `None` for an empty list.
    #[must_use]
    pub fn from_codes(operator: Operator, codes: &[ModuleCode]) -> Option<Self> {
        match codes {
            [] => None,
            [single] => Some(Self::Leaf(single.clone())),
            _ => Some(Self::Node(
                operator,
                codes.iter().cloned().map(Self::Leaf).collect(),
            )),
        }
    }

    /// Collapses redundant nesting.
    ///
    /// A child node that shares its parent's operator is replaced by its own
    /// children, spliced in at the same position. Single-child nodes are
    /// replaced by that child.
    #[must_use]
    pub fn flatten(self) -> Self {
        let Self::Node(operator, children) = self else {
            return self;
        };

        let mut children = children
            .into_iter()
            .map(Self::flatten)
            .fold(Vec::new(), |mut spliced, child| {
                match child {
                    Self::Node(inner, grandchildren) if inner == operator => {
                        spliced.extend(grandchildren);
                    }
                    other => spliced.push(other),
                }
                spliced
            });

        if children.len() == 1 {
            children.remove(0)
        } else {
            Self::Node(operator, children)
        }
    }

    /// Whether this is an unparsed passthrough.
    #[must_use]
    pub const fn is_opaque(&self) -> bool {
        matches!(self, Self::Opaque(_))
    }

    /// Whether this expression is just `raw` itself, i.e. a leaf or opaque
    /// value whose text equals the original string.
    #[must_use]
    pub fn is_verbatim(&self, raw: &str) -> bool {
        match self {
            Self::Leaf(code) => code.as_str() == raw,
            Self::Opaque(text) => text == raw,
            Self::Node(..) => false,
        }
    }

    /// Whether this is opaque text that happens to be exactly one module code.
    pub(crate) fn single_code(&self) -> Option<&str> {
        match self {
            Self::Leaf(code) => Some(code.as_str()),
            Self::Opaque(text) if module_code::is_single(text) => Some(text),
            _ => None,
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Leaf(code) => write!(f, "{code}"),
            Self::Opaque(text) => f.write_str(text),
            Self::Node(operator, children) => {
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        write!(f, " {operator} ")?;
                    }
                    if matches!(child, Self::Node(..)) {
                        write!(f, "({child})")?;
                    } else {
                        write!(f, "{child}")?;
                    }
                }
                Ok(())
            }
        }
    }
}

impl Serialize for Expression {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            Self::Leaf(code) => serializer.serialize_str(code),
            Self::Opaque(text) => serializer.serialize_str(text),
            Self::Node(operator, children) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry(operator.label(), children)?;
                map.end()
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use serde_json::json;

    use super::*;

    fn leaf(code: &str) -> Expression {
        Expression::Leaf(ModuleCode::try_from(code).unwrap())
    }

    fn and(children: Vec<Expression>) -> Expression {
        Expression::Node(Operator::And, children)
    }

    fn or(children: Vec<Expression>) -> Expression {
        Expression::Node(Operator::Or, children)
    }

    /// Panics if any node has fewer than two children or a child node using
    /// its own operator.
    pub(crate) fn assert_no_same_operator_nesting(expression: &Expression) {
        if let Expression::Node(operator, children) = expression {
            assert!(children.len() >= 2, "node with fewer than two children");
            for child in children {
                if let Expression::Node(inner, _) = child {
                    assert_ne!(inner, operator, "nested {operator} under {operator}");
                }
                assert_no_same_operator_nesting(child);
            }
        }
    }

    #[test]
    fn flatten_splices_left_deep_chain() {
        let nested = and(vec![
            and(vec![and(vec![leaf("CS3241"), leaf("PC1221")]), leaf("MA1521")]),
            leaf("MA1101R"),
        ]);

        assert_eq!(
            nested.flatten(),
            and(vec![
                leaf("CS3241"),
                leaf("PC1221"),
                leaf("MA1521"),
                leaf("MA1101R")
            ])
        );
    }

    #[test]
    fn flatten_splices_in_place() {
        let nested = or(vec![
            leaf("CS1010"),
            or(vec![leaf("CS1101S"), leaf("CS1010E")]),
            leaf("CS1010S"),
        ]);

        assert_eq!(
            nested.flatten(),
            or(vec![
                leaf("CS1010"),
                leaf("CS1101S"),
                leaf("CS1010E"),
                leaf("CS1010S")
            ])
        );
    }

    #[test]
    fn flatten_keeps_alternating_operators() {
        let nested = and(vec![
            or(vec![leaf("MA1101R"), or(vec![leaf("MA1506"), leaf("MA1508")])]),
            and(vec![leaf("CS1231"), leaf("CS2040")]),
        ]);
        let flat = nested.flatten();

        assert_eq!(
            flat,
            and(vec![
                or(vec![leaf("MA1101R"), leaf("MA1506"), leaf("MA1508")]),
                leaf("CS1231"),
                leaf("CS2040"),
            ])
        );
        assert_no_same_operator_nesting(&flat);
    }

    #[test]
    fn flatten_collapses_single_child() {
        assert_eq!(and(vec![leaf("CS1010")]).flatten(), leaf("CS1010"));
    }

    #[test]
    fn display_parenthesises_nested_nodes() {
        let expression = and(vec![leaf("CS1010"), or(vec![leaf("MA1101R"), leaf("MA1506")])]);
        assert_eq!(expression.to_string(), "CS1010 and (MA1101R or MA1506)");
    }

    #[test]
    fn serialises_nodes_as_single_key_maps() {
        let expression = or(vec![leaf("CS2100"), and(vec![leaf("CS2106"), leaf("EE2007")])]);
        assert_eq!(
            serde_json::to_value(&expression).unwrap(),
            json!({"or": ["CS2100", {"and": ["CS2106", "EE2007"]}]})
        );
        assert_eq!(
            serde_json::to_value(Expression::Opaque("Grade B".into())).unwrap(),
            json!("Grade B")
        );
    }

    #[test]
    fn verbatim_compares_against_raw_text() {
        assert!(leaf("CS1010").is_verbatim("CS1010"));
        assert!(!leaf("CS1010").is_verbatim("CS1010 or its equivalent"));
        assert!(Expression::Opaque("A-level".into()).is_verbatim("A-level"));
        assert!(!and(vec![leaf("CS1010"), leaf("CS1020")]).is_verbatim("CS1010"));
    }

    #[test]
    fn from_codes_collapses_short_lists() {
        assert_eq!(Expression::from_codes(Operator::And, &[]), None);
        let single = [ModuleCode::try_from("ID2105").unwrap()];
        assert_eq!(Expression::from_codes(Operator::Or, &single), Some(leaf("ID2105")));
    }
}
