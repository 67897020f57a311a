//! RDF terms and their SPARQL serialisation.
//!
//! User-supplied text only ever reaches a statement as a [`Literal`], and a
//! literal can only be rendered through [`escape_literal`]. IRIs coming from
//! outside (headers, configuration) go through [`Iri::new`], which rejects
//! anything outside the SPARQL `IRIREF` production.

use regex::Regex;
use std::{borrow::Cow, fmt};
use thiserror::Error;

const IRI_PATTERN: &str = r#"^[A-Za-z][A-Za-z0-9+.\-]*:[^\x00-\x20<>"{}|^`\\]*$"#;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TermError {
    #[error("invalid IRI: {0}")]
    InvalidIri(String),
}

/// An absolute IRI.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Iri(Cow<'static, str>);

impl Iri {
    /// Validate and wrap an IRI.
    ///
    /// # Errors
    /// Returns [`TermError::InvalidIri`] if `value` is not a valid `IRIREF`.
    pub fn new(value: impl Into<String>) -> Result<Self, TermError> {
        let value = value.into();
        if Regex::new(IRI_PATTERN).is_ok_and(|regex| regex.is_match(&value)) {
            Ok(Self(Cow::Owned(value)))
        } else {
            Err(TermError::InvalidIri(value))
        }
    }

    /// Wrap a compile-time IRI without validation. Only for vocabulary constants.
    #[must_use]
    pub const fn from_static(value: &'static str) -> Self {
        Self(Cow::Borrowed(value))
    }

    /// Append `suffix` to this IRI and validate the result.
    ///
    /// # Errors
    /// Returns [`TermError::InvalidIri`] if the joined value is not a valid IRI.
    pub fn join(&self, suffix: &str) -> Result<Self, TermError> {
        Self::new(format!("{}{suffix}", self.0))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Iri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>", self.0)
    }
}

/// A literal value with an optional datatype or language tag.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Literal {
    value: String,
    datatype: Option<Iri>,
    language: Option<String>,
}

impl Literal {
    #[must_use]
    pub fn string(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            datatype: None,
            language: None,
        }
    }

    #[must_use]
    pub fn typed(value: impl Into<String>, datatype: Iri) -> Self {
        Self {
            value: value.into(),
            datatype: Some(datatype),
            language: None,
        }
    }

    /// Language-tagged literal. Tags outside `[A-Za-z0-9-]` are dropped.
    #[must_use]
    pub fn tagged(value: impl Into<String>, language: &str) -> Self {
        let language = (!language.is_empty()
            && language
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() || ch == '-'))
        .then(|| language.to_string());
        Self {
            value: value.into(),
            datatype: None,
            language,
        }
    }

    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    #[must_use]
    pub fn datatype(&self) -> Option<&Iri> {
        self.datatype.as_ref()
    }

    #[must_use]
    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\"", escape_literal(&self.value))?;
        if let Some(datatype) = &self.datatype {
            write!(f, "^^{datatype}")
        } else if let Some(language) = &self.language {
            write!(f, "@{language}")
        } else {
            Ok(())
        }
    }
}

/// A concrete RDF term.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Term {
    Iri(Iri),
    Literal(Literal),
    Blank(String),
}

impl Term {
    #[must_use]
    pub fn as_iri(&self) -> Option<&Iri> {
        match self {
            Self::Iri(iri) => Some(iri),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            Self::Literal(literal) => Some(literal),
            _ => None,
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Iri(iri) => iri.fmt(f),
            Self::Literal(literal) => literal.fmt(f),
            Self::Blank(label) => write!(f, "_:{label}"),
        }
    }
}

impl From<Iri> for Term {
    fn from(iri: Iri) -> Self {
        Self::Iri(iri)
    }
}

impl From<Literal> for Term {
    fn from(literal: Literal) -> Self {
        Self::Literal(literal)
    }
}

/// A query variable. Names are fixed in code, never taken from input.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Var(Cow<'static, str>);

impl Var {
    #[must_use]
    pub const fn named(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    /// Numbered variable, e.g. `old3`, for generated patterns.
    #[must_use]
    pub fn indexed(prefix: &'static str, index: usize) -> Self {
        Self(Cow::Owned(format!("{prefix}{index}")))
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "?{}", self.0)
    }
}

/// Either side of a triple pattern: a bound term or a variable.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PatternTerm {
    Term(Term),
    Var(Var),
}

impl fmt::Display for PatternTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Term(term) => term.fmt(f),
            Self::Var(var) => var.fmt(f),
        }
    }
}

impl From<Var> for PatternTerm {
    fn from(var: Var) -> Self {
        Self::Var(var)
    }
}

impl From<Term> for PatternTerm {
    fn from(term: Term) -> Self {
        Self::Term(term)
    }
}

impl From<Iri> for PatternTerm {
    fn from(iri: Iri) -> Self {
        Self::Term(Term::Iri(iri))
    }
}

impl From<Literal> for PatternTerm {
    fn from(literal: Literal) -> Self {
        Self::Term(Term::Literal(literal))
    }
}

/// Escape a string for use between double quotes in a SPARQL literal.
#[must_use]
pub fn escape_literal(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\'' => escaped.push_str("\\'"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            '\u{8}' => escaped.push_str("\\b"),
            '\u{c}' => escaped.push_str("\\f"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iri_accepts_absolute_iris() {
        assert!(Iri::new("http://mu.semte.ch/sessions/6f1d").is_ok());
        assert!(Iri::new("urn:uuid:1234").is_ok());
    }

    #[test]
    fn iri_rejects_injection_attempts() {
        for value in [
            "http://example.com/> } ; DROP ALL ; {",
            "http://example.com/a b",
            "http://example.com/\"",
            "relative/path",
            "",
            "http://example.com/{x}",
        ] {
            assert_eq!(
                Iri::new(value),
                Err(TermError::InvalidIri(value.to_string())),
                "{value} should be rejected"
            );
        }
    }

    #[test]
    fn iri_join_validates_suffix() {
        let base = Iri::from_static("http://example.com/accounts/");
        assert_eq!(
            base.join("42").map(|iri| iri.to_string()),
            Ok("<http://example.com/accounts/42>".to_string())
        );
        assert!(base.join("4 2").is_err());
    }

    #[test]
    fn escape_literal_handles_quotes_backslashes_and_newlines() {
        assert_eq!(escape_literal(r#"a"b"#), r#"a\"b"#);
        assert_eq!(escape_literal(r"a\b"), r"a\\b");
        assert_eq!(escape_literal("a\nb\r\tc"), r"a\nb\r\tc");
        assert_eq!(escape_literal("O'Brien"), r"O\'Brien");
    }

    #[test]
    fn literal_renders_datatype_and_language() {
        let typed = Literal::typed(
            "2024-01-01T00:00:00Z",
            Iri::from_static("http://www.w3.org/2001/XMLSchema#dateTime"),
        );
        assert_eq!(
            typed.to_string(),
            "\"2024-01-01T00:00:00Z\"^^<http://www.w3.org/2001/XMLSchema#dateTime>"
        );
        assert_eq!(Literal::tagged("hallo", "nl").to_string(), "\"hallo\"@nl");
        assert_eq!(Literal::tagged("x", "n l\"").to_string(), "\"x\"");
    }

    #[test]
    fn literal_cannot_break_out_of_quotes() {
        let hostile = Literal::string("\" } ; DELETE WHERE { ?s ?p ?o } #");
        assert_eq!(
            hostile.to_string(),
            r#""\" } ; DELETE WHERE { ?s ?p ?o } #""#
        );
    }
}
