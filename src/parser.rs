//! Prerequisite parsing
//!
//! Parsing runs in three stages:
//!
//! 1. [`normalize`] rewrites the raw text into a canonical form, or refuses
//!    to when the text is prose rather than an expression.
//! 2. [`tokenize`] and [`to_postfix`] turn the canonical text into a postfix
//!    token stream, dropping operators that cannot be read as binary.
//! 3. [`build_expression`] reduces the postfix stream to a flattened
//!    [`Expression`].
//!
//! None of the stages fail. Text that cannot be parsed comes back unchanged
//! as [`Expression::Opaque`].

use tracing::debug;

use crate::domain::{Expression, Rules};

mod build;
mod normalize;
mod postfix;

pub use build::build_expression;
pub use normalize::normalize;
pub use postfix::{Token, to_postfix, tokenize};

/// Parses a free-text prerequisite for the module `own_code`.
///
/// Hand-written exceptions in `rules` take precedence over everything else.
/// Otherwise the text is normalised, tokenised and reduced; if any stage
/// leaves no module code behind, the original text is returned as
/// [`Expression::Opaque`].
///
/// ```
/// use modmaven::{Rules, parse_prerequisite};
///
/// let expression = parse_prerequisite("CS2100 or CS2106", "CS3210", &Rules::default());
/// assert_eq!(expression.to_string(), "CS2100 or CS2106");
/// ```
#[must_use]
pub fn parse_prerequisite(text: &str, own_code: &str, rules: &Rules) -> Expression {
    if let Some(exception) = rules.prerequisite_exception(text) {
        debug!(module = own_code, "using hand-written prerequisite");
        return exception;
    }

    let Some(normalized) = normalize(text, own_code, rules) else {
        return Expression::Opaque(text.to_string());
    };

    let postfix = to_postfix(tokenize(&normalized));
    if !postfix.iter().any(Token::is_code) {
        debug!(module = own_code, "no module codes in prerequisite");
        return Expression::Opaque(text.to_string());
    }

    build_expression(postfix).unwrap_or_else(|| Expression::Opaque(text.to_string()))
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;
    use crate::domain::{ModuleCode, Operator, expression::tests::assert_no_same_operator_nesting};

    fn leaf(code: &str) -> Expression {
        Expression::Leaf(ModuleCode::try_from(code).unwrap())
    }

    fn node(operator: Operator, codes: &[&str]) -> Expression {
        Expression::Node(operator, codes.iter().map(|code| leaf(code)).collect())
    }

    fn parse(text: &str, own_code: &str) -> Expression {
        parse_prerequisite(text, own_code, &Rules::default())
    }

    #[test]
    fn four_way_conjunction_from_exception_table() {
        assert_eq!(
            parse("CS3241, PC1221, MA1521 and MA1101R", "CS4247"),
            node(Operator::And, &["CS3241", "PC1221", "MA1521", "MA1101R"])
        );
    }

    #[test]
    fn four_way_conjunction_without_exception_table() {
        let rules: Rules =
            toml::from_str("_version = \"1\"\nprerequisite_exceptions = []\n").unwrap();
        assert_eq!(
            parse_prerequisite("CS3241, PC1221, MA1521 and MA1101R", "CS4247", &rules),
            node(Operator::And, &["CS3241", "PC1221", "MA1521", "MA1101R"])
        );
    }

    #[test]
    fn simple_disjunction() {
        assert_eq!(
            parse("CS2100 or CS2106", "CS3210"),
            node(Operator::Or, &["CS2100", "CS2106"])
        );
    }

    #[test]
    fn and_binds_tighter_than_or() {
        assert_eq!(
            parse("CS1010 or CS1101S and MA1101R", "CS2040"),
            Expression::Node(
                Operator::Or,
                vec![leaf("CS1010"), node(Operator::And, &["CS1101S", "MA1101R"])]
            )
        );
    }

    #[test]
    fn brackets_group_before_precedence() {
        assert_eq!(
            parse("[CS1010 or CS1101S] and {MA1101R or MA1506}", "CS2040"),
            Expression::Node(
                Operator::And,
                vec![
                    node(Operator::Or, &["CS1010", "CS1101S"]),
                    node(Operator::Or, &["MA1101R", "MA1506"]),
                ]
            )
        );
    }

    #[test_case("CS1010/CS1101S", Operator::Or; "slash")]
    #[test_case("CS1010; CS1101S", Operator::And; "semicolon")]
    #[test_case("CS1010 & CS1101S", Operator::And; "ampersand")]
    fn symbols_become_operators(text: &str, operator: Operator) {
        assert_eq!(parse(text, "CS2040"), node(operator, &["CS1010", "CS1101S"]));
    }

    #[test]
    fn comma_takes_the_next_operator() {
        assert_eq!(
            parse("CS1010, CS1010E or CS1010S", "CS2030"),
            node(Operator::Or, &["CS1010", "CS1010E", "CS1010S"])
        );
    }

    #[test]
    fn noise_phrase_is_dropped() {
        assert_eq!(parse("CS1010 or its equivalent", "CS2030"), leaf("CS1010"));
    }

    #[test]
    fn own_code_is_removed() {
        assert_eq!(parse("CS2030 and CS2040", "CS2030"), leaf("CS2040"));
    }

    #[test]
    fn descriptive_words_are_ignored() {
        assert_eq!(
            parse("Students must have passed CS1010 and MA1101R", "CS2040"),
            node(Operator::And, &["CS1010", "MA1101R"])
        );
    }

    #[test_case("Grade B in CS1010"; "grade")]
    #[test_case("H2 Mathematics or CS1010"; "a-level subject")]
    #[test_case("USP students only, CS1010"; "programme")]
    #[test_case("Cohort 2019 and before: CS1010"; "cohort")]
    fn restricted_text_is_kept_verbatim(text: &str) {
        assert_eq!(parse(text, "CS2040"), Expression::Opaque(text.to_string()));
    }

    #[test_case("Nil"; "nil")]
    #[test_case(""; "empty")]
    #[test_case("Pass any level 1000 module"; "prose")]
    fn text_without_codes_is_kept_verbatim(text: &str) {
        assert_eq!(parse(text, "CS2040"), Expression::Opaque(text.to_string()));
    }

    #[test]
    fn opaque_exception_is_returned_verbatim() {
        let text = "For Applied Chemistry Students: Polymer Chemistry II (CM3265). For Chemistry \
                    students: Organic Reaction Mechanisms (CM3221).";
        assert_eq!(parse(text, "CM4282"), Expression::Opaque(text.to_string()));
    }

    #[test]
    fn spaced_faculty_prefix_is_joined() {
        assert_eq!(
            parse("MUT 1201 and MUA 1163", "MUT2201"),
            node(Operator::And, &["MUT1201", "MUA1163"])
        );
    }

    #[test]
    fn stray_code_without_operator_is_dropped() {
        assert_eq!(
            parse("CS1010 CS1020 and CS1030", "CS2040"),
            node(Operator::And, &["CS1020", "CS1030"])
        );
    }

    #[test_case("CS1010 and CS1020 and CS1030 or CS1040 and CS1050"; "mixed chain")]
    #[test_case("CS1010 or CS1101S and MA1101R or MA1506"; "or around and")]
    #[test_case("[CS1010 or (CS1101S or CS1010E)] and (MA1101R and MA1506)"; "nested brackets")]
    #[test_case("((CS1010 and CS1020) and (CS1030 and CS1040)) or CS1050"; "redundant brackets")]
    #[test_case("CS3241, PC1221, MA1521 and MA1101R or CS2040"; "commas")]
    fn parsed_trees_are_flat(text: &str) {
        let expression = parse(text, "XX9999");
        assert!(matches!(expression, Expression::Node(..)));
        assert_no_same_operator_nesting(&expression);
    }
}
