//! Dependency extraction
//!
//! The model never evaluates expressions. It only needs the identifier paths
//! an expression mentions, with their byte spans so that a rename can rewrite
//! them in place.

use std::ops::Range;

use pest::error::LineColLocation;
use pest::Parser;
use pest_derive::Parser;
use thiserror::Error;

#[derive(Parser)]
#[grammar = "expression/wdl_expression.pest"]
struct WdlExpressionParser;

/// One dotted identifier path found in an expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedIdentifier {
    /// e.g. `step1.out.left`
    pub path: String,
    /// Byte range of the path in the expression text
    pub span: Range<usize>,
}

/// Expression text that could not be parsed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid expression at line {line}, col {column}: {message}")]
pub struct ExtractError {
    pub line: usize,
    pub column: usize,
    pub message: String,
}

impl From<pest::error::Error<Rule>> for ExtractError {
    fn from(err: pest::error::Error<Rule>) -> Self {
        let (line, column) = match err.line_col {
            LineColLocation::Pos(pos) => pos,
            LineColLocation::Span(start, _) => start,
        };
        Self {
            line,
            column,
            message: err.variant.message().to_string(),
        }
    }
}

/// Pure function from expression text to the identifier paths it depends on
///
/// Injected into the [`Model`](crate::model::Model) so the graph carries no
/// grammar of its own.
pub trait DependencyExtractor {
    fn extract(&self, text: &str) -> Result<Vec<ExtractedIdentifier>, ExtractError>;
}

/// Default extractor backed by the pest WDL expression grammar
#[derive(Debug, Clone, Copy, Default)]
pub struct PestExtractor;

impl DependencyExtractor for PestExtractor {
    fn extract(&self, text: &str) -> Result<Vec<ExtractedIdentifier>, ExtractError> {
        let pairs = WdlExpressionParser::parse(Rule::expression, text)?;
        Ok(pairs
            .flatten()
            .filter(|pair| pair.as_rule() == Rule::path)
            .map(|pair| {
                let span = pair.as_span();
                ExtractedIdentifier {
                    path: span.as_str().to_string(),
                    span: span.start()..span.end(),
                }
            })
            .collect())
    }
}

impl<F> DependencyExtractor for F
where
    F: Fn(&str) -> Result<Vec<ExtractedIdentifier>, ExtractError>,
{
    fn extract(&self, text: &str) -> Result<Vec<ExtractedIdentifier>, ExtractError> {
        self(text)
    }
}
