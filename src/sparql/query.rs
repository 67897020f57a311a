//! Typed `SELECT` and update statements.
//!
//! Statements are plain values: the HTTP transport renders them to SPARQL
//! text through `Display`, the in-memory store evaluates them directly.

use super::term::{Iri, PatternTerm, Term, Var};
use std::fmt;

/// A fully bound statement.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Triple {
    pub subject: Iri,
    pub predicate: Iri,
    pub object: Term,
}

impl Triple {
    #[must_use]
    pub fn new(subject: Iri, predicate: Iri, object: impl Into<Term>) -> Self {
        Self {
            subject,
            predicate,
            object: object.into(),
        }
    }
}

impl fmt::Display for Triple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {} .", self.subject, self.predicate, self.object)
    }
}

/// A triple whose subject and object may be variables.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TriplePattern {
    pub subject: PatternTerm,
    pub predicate: Iri,
    pub object: PatternTerm,
}

impl TriplePattern {
    #[must_use]
    pub fn new(
        subject: impl Into<PatternTerm>,
        predicate: Iri,
        object: impl Into<PatternTerm>,
    ) -> Self {
        Self {
            subject: subject.into(),
            predicate,
            object: object.into(),
        }
    }

    fn has_variables(&self) -> bool {
        matches!(self.subject, PatternTerm::Var(_)) || matches!(self.object, PatternTerm::Var(_))
    }
}

impl From<Triple> for TriplePattern {
    fn from(triple: Triple) -> Self {
        Self::new(triple.subject, triple.predicate, triple.object)
    }
}

impl fmt::Display for TriplePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {} .", self.subject, self.predicate, self.object)
    }
}

/// `SELECT DISTINCT` over one or more named graphs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Select {
    variables: Vec<Var>,
    graphs: Vec<Iri>,
    values: Vec<(Var, Term)>,
    required: Vec<TriplePattern>,
    optional: Vec<Vec<TriplePattern>>,
    limit: Option<usize>,
}

impl Select {
    #[must_use]
    pub fn new(variables: impl IntoIterator<Item = Var>) -> Self {
        Self {
            variables: variables.into_iter().collect(),
            graphs: Vec::new(),
            values: Vec::new(),
            required: Vec::new(),
            optional: Vec::new(),
            limit: None,
        }
    }

    /// Add a `FROM` graph. Duplicates are ignored so a shared users/sessions
    /// graph does not double the rows.
    #[must_use]
    pub fn from(mut self, graph: &Iri) -> Self {
        if !self.graphs.contains(graph) {
            self.graphs.push(graph.clone());
        }
        self
    }

    /// Pre-bind a variable to a term (`VALUES`).
    #[must_use]
    pub fn bind(mut self, var: Var, term: impl Into<Term>) -> Self {
        self.values.push((var, term.into()));
        self
    }

    #[must_use]
    pub fn pattern(mut self, pattern: TriplePattern) -> Self {
        self.required.push(pattern);
        self
    }

    #[must_use]
    pub fn optional(mut self, group: Vec<TriplePattern>) -> Self {
        if !group.is_empty() {
            self.optional.push(group);
        }
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub fn variables(&self) -> &[Var] {
        &self.variables
    }

    #[must_use]
    pub fn graphs(&self) -> &[Iri] {
        &self.graphs
    }

    #[must_use]
    pub fn values(&self) -> &[(Var, Term)] {
        &self.values
    }

    #[must_use]
    pub fn required(&self) -> &[TriplePattern] {
        &self.required
    }

    #[must_use]
    pub fn optional_groups(&self) -> &[Vec<TriplePattern>] {
        &self.optional
    }

    #[must_use]
    pub fn limit_value(&self) -> Option<usize> {
        self.limit
    }
}

impl fmt::Display for Select {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SELECT DISTINCT")?;
        for var in &self.variables {
            write!(f, " {var}")?;
        }
        for graph in &self.graphs {
            write!(f, " FROM {graph}")?;
        }
        write!(f, " WHERE {{")?;
        if !self.values.is_empty() {
            write!(f, " VALUES (")?;
            for (var, _) in &self.values {
                write!(f, " {var}")?;
            }
            write!(f, " ) {{ (")?;
            for (_, term) in &self.values {
                write!(f, " {term}")?;
            }
            write!(f, " ) }}")?;
        }
        for pattern in &self.required {
            write!(f, " {pattern}")?;
        }
        for group in &self.optional {
            write!(f, " OPTIONAL {{")?;
            for pattern in group {
                write!(f, " {pattern}")?;
            }
            write!(f, " }}")?;
        }
        write!(f, " }}")?;
        if let Some(limit) = self.limit {
            write!(f, " LIMIT {limit}")?;
        }
        Ok(())
    }
}

/// A single update request against one graph.
///
/// Each delete pattern is matched on its own: a pattern with variables sits in
/// its own `OPTIONAL` group, so a predicate that is already absent never stops
/// the other patterns from being deleted. Inserts are applied after deletes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Update {
    graph: Iri,
    delete: Vec<TriplePattern>,
    insert: Vec<Triple>,
}

impl Update {
    #[must_use]
    pub fn new(graph: &Iri) -> Self {
        Self {
            graph: graph.clone(),
            delete: Vec::new(),
            insert: Vec::new(),
        }
    }

    #[must_use]
    pub fn delete(mut self, patterns: impl IntoIterator<Item = TriplePattern>) -> Self {
        self.delete.extend(patterns);
        self
    }

    #[must_use]
    pub fn insert(mut self, triples: impl IntoIterator<Item = Triple>) -> Self {
        self.insert.extend(triples);
        self
    }

    #[must_use]
    pub fn graph(&self) -> &Iri {
        &self.graph
    }

    #[must_use]
    pub fn delete_patterns(&self) -> &[TriplePattern] {
        &self.delete
    }

    #[must_use]
    pub fn insert_triples(&self) -> &[Triple] {
        &self.insert
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.delete.is_empty() && self.insert.is_empty()
    }

    /// Operation name used for tracing spans.
    #[must_use]
    pub fn operation(&self) -> &'static str {
        match (self.delete.is_empty(), self.insert.is_empty()) {
            (true, _) => "INSERT DATA",
            (false, true) => "DELETE",
            (false, false) => "DELETE/INSERT",
        }
    }
}

impl fmt::Display for Update {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.delete.is_empty() {
            write!(f, "INSERT DATA {{ GRAPH {} {{", self.graph)?;
            for triple in &self.insert {
                write!(f, " {triple}")?;
            }
            return write!(f, " }} }}");
        }

        write!(f, "WITH {} DELETE {{", self.graph)?;
        for pattern in &self.delete {
            write!(f, " {pattern}")?;
        }
        write!(f, " }}")?;
        if !self.insert.is_empty() {
            write!(f, " INSERT {{")?;
            for triple in &self.insert {
                write!(f, " {triple}")?;
            }
            write!(f, " }}")?;
        }
        write!(f, " WHERE {{")?;
        for pattern in self.delete.iter().filter(|pattern| pattern.has_variables()) {
            write!(f, " OPTIONAL {{ {pattern} }}")?;
        }
        write!(f, " }}")
    }
}
