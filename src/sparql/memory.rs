//! In-process graph store.
//!
//! Evaluates the same [`Select`] and [`Update`] values the HTTP transport
//! renders: basic graph pattern joins, `OPTIONAL` left joins, `VALUES`
//! pre-bindings and graph scoping. Used by the test-suite and by
//! `--store memory` for local development.

use super::{GraphStore, Iri, PatternTerm, Row, Select, StoreError, Term, Triple, TriplePattern, Update};
use std::{
    collections::BTreeSet,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex, MutexGuard,
    },
};
use tracing::{debug, info_span};

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct Quad {
    graph: Iri,
    subject: Iri,
    predicate: Iri,
    object: Term,
}

#[derive(Debug, Default)]
struct Inner {
    quads: Mutex<BTreeSet<Quad>>,
    failing_updates: AtomicUsize,
    failing_after: Mutex<Option<usize>>,
}

/// Cheaply cloneable handle; clones share the same data.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    inner: Arc<Inner>,
    atomic_updates: bool,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_atomic_updates(mut self, atomic_updates: bool) -> Self {
        self.atomic_updates = atomic_updates;
        self
    }

    /// Make the next `count` updates fail with [`StoreError::Unavailable`].
    pub fn fail_next_updates(&self, count: usize) {
        self.inner.failing_updates.store(count, Ordering::SeqCst);
    }

    /// Let `successes` more updates through, then fail every update after
    /// that until [`MemoryStore::recover`] is called.
    pub fn fail_after_updates(&self, successes: usize) {
        if let Ok(mut guard) = self.inner.failing_after.lock() {
            *guard = Some(successes);
        }
    }

    /// Clear any injected failures.
    pub fn recover(&self) {
        self.inner.failing_updates.store(0, Ordering::SeqCst);
        if let Ok(mut guard) = self.inner.failing_after.lock() {
            *guard = None;
        }
    }

    /// Number of statements across all graphs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.quads().map_or(0, |quads| quads.len())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All objects of `subject predicate ?o` in `graph`.
    #[must_use]
    pub fn objects(&self, graph: &Iri, subject: &Iri, predicate: &Iri) -> Vec<Term> {
        self.quads().map_or_else(
            |_| Vec::new(),
            |quads| {
                quads
                    .iter()
                    .filter(|quad| {
                        &quad.graph == graph && &quad.subject == subject && &quad.predicate == predicate
                    })
                    .map(|quad| quad.object.clone())
                    .collect()
            },
        )
    }

    fn quads(&self) -> Result<MutexGuard<'_, BTreeSet<Quad>>, StoreError> {
        self.inner
            .quads
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }

    fn injected_failure(&self) -> Option<StoreError> {
        let failing = self.inner.failing_updates.load(Ordering::SeqCst);
        if failing > 0 {
            self.inner.failing_updates.store(failing - 1, Ordering::SeqCst);
            return Some(StoreError::Unavailable("injected update failure".to_string()));
        }

        let mut guard = self.inner.failing_after.lock().ok()?;
        match guard.as_mut() {
            Some(0) => Some(StoreError::Unavailable("injected update failure".to_string())),
            Some(remaining) => {
                *remaining -= 1;
                None
            }
            None => None,
        }
    }

    fn evaluate(&self, select: &Select) -> Result<Vec<Row>, StoreError> {
        let quads = self.quads()?;
        let scope: Vec<&Quad> = quads
            .iter()
            .filter(|quad| select.graphs().is_empty() || select.graphs().contains(&quad.graph))
            .collect();

        let mut seed = Row::new();
        for (var, term) in select.values() {
            seed.insert(var.name().to_string(), term.clone());
        }

        let mut rows = join(&scope, vec![seed], select.required());

        for group in select.optional_groups() {
            rows = rows
                .into_iter()
                .flat_map(|row| {
                    let extended = join(&scope, vec![row.clone()], group);
                    if extended.is_empty() {
                        vec![row]
                    } else {
                        extended
                    }
                })
                .collect();
        }

        let mut projected: Vec<Row> = Vec::new();
        for row in rows {
            let row: Row = select
                .variables()
                .iter()
                .filter_map(|var| {
                    row.get(var.name())
                        .map(|term| (var.name().to_string(), term.clone()))
                })
                .collect();
            if !projected.contains(&row) {
                projected.push(row);
            }
        }

        if let Some(limit) = select.limit_value() {
            projected.truncate(limit);
        }

        Ok(projected)
    }
}

impl GraphStore for MemoryStore {
    async fn query(&self, select: &Select) -> Result<Vec<Row>, StoreError> {
        let _span = info_span!("db.query", db.system = "memory", db.operation = "SELECT").entered();
        let rows = self.evaluate(select)?;
        debug!("Query returned {} rows", rows.len());
        Ok(rows)
    }

    async fn update(&self, update: &Update) -> Result<(), StoreError> {
        let _span = info_span!(
            "db.query",
            db.system = "memory",
            db.operation = update.operation()
        )
        .entered();

        if let Some(err) = self.injected_failure() {
            return Err(err);
        }

        let mut quads = self.quads()?;
        let graph = update.graph();

        let doomed: Vec<Quad> = {
            let scope: Vec<&Quad> = quads.iter().filter(|quad| &quad.graph == graph).collect();
            update
                .delete_patterns()
                .iter()
                .flat_map(|pattern| {
                    scope
                        .iter()
                        .filter(|quad| matches(pattern, quad, &Row::new()).is_some())
                        .map(|quad| (*quad).clone())
                        .collect::<Vec<_>>()
                })
                .collect()
        };
        for quad in &doomed {
            quads.remove(quad);
        }

        for Triple {
            subject,
            predicate,
            object,
        } in update.insert_triples().iter().cloned()
        {
            quads.insert(Quad {
                graph: graph.clone(),
                subject,
                predicate,
                object,
            });
        }

        debug!(
            "Update removed {} and inserted {} statements",
            doomed.len(),
            update.insert_triples().len()
        );
        Ok(())
    }

    fn atomic_updates(&self) -> bool {
        self.atomic_updates
    }
}

fn join(scope: &[&Quad], mut rows: Vec<Row>, patterns: &[TriplePattern]) -> Vec<Row> {
    for pattern in patterns {
        rows = rows
            .iter()
            .flat_map(|row| scope.iter().filter_map(move |quad| matches(pattern, quad, row)))
            .collect();
        if rows.is_empty() {
            break;
        }
    }
    rows
}

/// Match one pattern against one quad under the bindings in `row`, returning
/// the extended row on success.
fn matches(pattern: &TriplePattern, quad: &Quad, row: &Row) -> Option<Row> {
    if pattern.predicate != quad.predicate {
        return None;
    }
    let mut row = row.clone();
    bind(&pattern.subject, &Term::Iri(quad.subject.clone()), &mut row)?;
    bind(&pattern.object, &quad.object, &mut row)?;
    Some(row)
}

fn bind(pattern: &PatternTerm, value: &Term, row: &mut Row) -> Option<()> {
    match pattern {
        PatternTerm::Term(term) => (term == value).then_some(()),
        PatternTerm::Var(var) => match row.get(var.name()) {
            Some(bound) => (bound == value).then_some(()),
            None => {
                row.insert(var.name().to_string(), value.clone());
                Some(())
            }
        },
    }
}
