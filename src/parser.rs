//! This module wraps the `pest` grammar for the two structured value forms of the
//! description language: set notation and program lines.

use pest::{error::Error, Parser as PestParser};
use pest_derive::Parser as PestParser;

/// Derives a `PestParser` for the line grammar defined in `grammar.pest`.
#[derive(PestParser)]
#[grammar = "grammar.pest"]
pub struct DescriptionParser;

/// The raw fields of a program line, split on the first `=` and then on commas.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTransition {
    pub lhs: Vec<String>,
    pub rhs: Vec<String>,
}

/// Splits a set value such as `{a,b,c}` into its items.
///
/// Whitespace must already have been removed from `value`. `{}` yields no items; an
/// item between two adjacent commas is returned as an empty string.
pub fn parse_set(value: &str) -> Result<Vec<String>, Box<Error<Rule>>> {
    let pairs = DescriptionParser::parse(Rule::set, value).map_err(Box::new)?;

    Ok(pairs
        .flatten()
        .filter(|p| p.as_rule() == Rule::set_item)
        .map(|p| p.as_str().to_string())
        .collect())
}

/// Splits a program line into its left and right fields. Fields are trimmed.
pub fn parse_transition(line: &str) -> Result<RawTransition, Box<Error<Rule>>> {
    let pairs = DescriptionParser::parse(Rule::transition, line).map_err(Box::new)?;
    let mut raw = RawTransition {
        lhs: Vec::new(),
        rhs: Vec::new(),
    };

    for pair in pairs.flatten() {
        match pair.as_rule() {
            Rule::lhs_field => raw.lhs.push(pair.as_str().trim().to_string()),
            Rule::rhs_field => raw.rhs.push(pair.as_str().trim().to_string()),
            _ => {}
        }
    }

    Ok(raw)
}
