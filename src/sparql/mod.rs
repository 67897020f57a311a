//! Graph store access.
//!
//! The store is reached through exactly two primitives, [`GraphStore::query`]
//! and [`GraphStore::update`]. Each call is atomic on its own; nothing spans
//! two calls.

pub mod client;
pub mod memory;
pub mod query;
pub mod term;

pub use client::SparqlClient;
pub use memory::MemoryStore;
pub use query::{Select, Triple, TriplePattern, Update};
pub use term::{Iri, Literal, PatternTerm, Term, TermError, Var};

use std::{collections::BTreeMap, future::Future};
use thiserror::Error;

/// One solution of a `SELECT`, keyed by variable name.
pub type Row = BTreeMap<String, Term>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("graph store unavailable: {0}")]
    Unavailable(String),
    #[error("graph store rejected the request with status {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("invalid graph store response: {0}")]
    Decode(String),
}

pub trait GraphStore: Send + Sync {
    /// Run a `SELECT` and return its rows in store order.
    fn query(&self, select: &Select) -> impl Future<Output = Result<Vec<Row>, StoreError>> + Send;

    /// Apply a delete and/or insert as a single request.
    fn update(&self, update: &Update) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Whether a single [`Update`] carrying both deletes and inserts is
    /// applied atomically by this store.
    fn atomic_updates(&self) -> bool {
        false
    }
}

/// Store selected at startup.
#[derive(Debug, Clone)]
pub enum Backend {
    Sparql(SparqlClient),
    Memory(MemoryStore),
}

impl GraphStore for Backend {
    async fn query(&self, select: &Select) -> Result<Vec<Row>, StoreError> {
        match self {
            Self::Sparql(client) => client.query(select).await,
            Self::Memory(store) => store.query(select).await,
        }
    }

    async fn update(&self, update: &Update) -> Result<(), StoreError> {
        match self {
            Self::Sparql(client) => client.update(update).await,
            Self::Memory(store) => store.update(update).await,
        }
    }

    fn atomic_updates(&self) -> bool {
        match self {
            Self::Sparql(client) => client.atomic_updates(),
            Self::Memory(store) => store.atomic_updates(),
        }
    }
}
