use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::domain::{Operator, Rules, module_code::MODULE_CODE_PATTERN};

/// Faculty prefixes that are sometimes separated from their digits by one or
/// more spaces.
static SPACED_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("(MUT|CE|ME|MUA) +").expect("prefix pattern is valid"));

/// A phrase that carries no requirement of its own.
const NOISE: &str = "or its equivalent";

/// A comma with no later operator word reads as "and".
const DEFAULT_COMMA_OPERATOR: Operator = Operator::And;

/// Either a module reference followed by a comma, or an operator word.
static COMMA_OR_OPERATOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"{MODULE_CODE_PATTERN}\)?, | and | or "))
        .expect("comma pattern is valid")
});

/// The operator word as it appears in canonical text, padded with spaces.
const fn infix(operator: Operator) -> &'static str {
    match operator {
        Operator::And => " and ",
        Operator::Or => " or ",
    }
}

/// Rewrites raw prerequisite text into canonical form.
///
/// Returns `None` when the text contains restricted vocabulary and must be
/// kept verbatim. Otherwise:
///
/// - `{`/`[` and `}`/`]` become `(` and `)`
/// - `/` becomes ` or `; `;` and `&` become ` and `
/// - the module's own code is removed
/// - spaced faculty prefixes (`MUT 1201`) are joined
/// - the phrase "or its equivalent" is removed
/// - a comma after a module reference is replaced by the nearest operator word
///   that follows it, or ` and ` when none does
///
/// Comma resolution is a heuristic: sentences that mix operators can be
/// misread, and no attempt is made to do better.
#[must_use]
pub fn normalize(text: &str, own_code: &str, rules: &Rules) -> Option<String> {
    if let Some(marker) = rules.restricted_marker(text) {
        debug!(module = own_code, marker, "restricted vocabulary in prerequisite");
        return None;
    }

    let mut normalized: String = text
        .chars()
        .map(|c| match c {
            '{' | '[' => '(',
            '}' | ']' => ')',
            other => other,
        })
        .collect();

    for (symbol, operator) in [("/", Operator::Or), (";", Operator::And), ("&", Operator::And)] {
        normalized = normalized.replace(symbol, infix(operator));
    }

    if !own_code.is_empty() {
        normalized = normalized.replace(own_code, "");
    }

    normalized = SPACED_PREFIX.replace_all(&normalized, "$1").into_owned();

    normalized = normalized.replace(NOISE, "");

    Some(resolve_commas(&normalized))
}

fn operator_word(word: &str) -> Option<Operator> {
    match word {
        " and " => Some(Operator::And),
        " or " => Some(Operator::Or),
        _ => None,
    }
}

/// Replaces each `CODE, ` (or `CODE), `) with `CODE` plus the first operator
/// word appearing after it.
fn resolve_commas(text: &str) -> String {
    let matches: Vec<_> = COMMA_OR_OPERATOR.find_iter(text).collect();

    let mut resolved = String::with_capacity(text.len());
    let mut copied = 0;

    for (i, m) in matches.iter().enumerate() {
        let Some(reference) = m.as_str().strip_suffix(", ") else {
            continue;
        };

        let operator = matches[i + 1..]
            .iter()
            .find_map(|later| operator_word(later.as_str()))
            .unwrap_or(DEFAULT_COMMA_OPERATOR);

        resolved.push_str(&text[copied..m.start()]);
        resolved.push_str(reference);
        resolved.push_str(infix(operator));
        copied = m.end();
    }

    resolved.push_str(&text[copied..]);
    resolved
}
