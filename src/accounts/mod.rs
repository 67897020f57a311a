//! Account and credential persistence.
//!
//! An account is a set of facts in the users graph. Reads go through
//! [`Directory`], every write goes through [`Transaction`], and
//! [`AccountService`] composes both into the account lifecycle.

pub mod codec;
pub mod directory;
pub mod error;
pub mod hasher;
pub mod service;
pub mod transaction;

pub use codec::{AccountRecord, AccountStatus, CodecError, Credentials};
pub use directory::{Directory, Filter};
pub use error::AccountError;
pub use hasher::{CredentialHasher, DigestScheme, HashError};
pub use service::{AccountChanges, AccountService, PasswordChange, RegisteredAccount, Registration};
pub use transaction::Transaction;

use crate::{
    sparql::{Iri, TermError},
    vocab,
};

/// Where accounts live and how new resources are named.
#[derive(Clone, Debug)]
pub struct AccountsConfig {
    users_graph: Iri,
    sessions_graph: Iri,
    resource_base: Iri,
    auto_login: bool,
}

impl AccountsConfig {
    /// Users and sessions share `users_graph` until told otherwise.
    #[must_use]
    pub fn new(users_graph: Iri) -> Self {
        Self {
            sessions_graph: users_graph.clone(),
            users_graph,
            resource_base: Iri::from_static(vocab::DEFAULT_RESOURCE_BASE),
            auto_login: false,
        }
    }

    #[must_use]
    pub fn with_sessions_graph(mut self, graph: Iri) -> Self {
        self.sessions_graph = graph;
        self
    }

    #[must_use]
    pub fn with_resource_base(mut self, base: Iri) -> Self {
        self.resource_base = base;
        self
    }

    /// Bind the caller's session to a freshly registered account.
    #[must_use]
    pub fn with_auto_login(mut self, enabled: bool) -> Self {
        self.auto_login = enabled;
        self
    }

    #[must_use]
    pub fn users_graph(&self) -> &Iri {
        &self.users_graph
    }

    #[must_use]
    pub fn sessions_graph(&self) -> &Iri {
        &self.sessions_graph
    }

    #[must_use]
    pub fn resource_base(&self) -> &Iri {
        &self.resource_base
    }

    #[must_use]
    pub fn auto_login(&self) -> bool {
        self.auto_login
    }

    /// # Errors
    /// Returns [`TermError::InvalidIri`] if the minted IRI is invalid.
    pub fn user_iri(&self, id: &str) -> Result<Iri, TermError> {
        self.resource_base.join(&format!("users/{id}"))
    }

    /// # Errors
    /// Returns [`TermError::InvalidIri`] if the minted IRI is invalid.
    pub fn account_iri(&self, id: &str) -> Result<Iri, TermError> {
        self.resource_base.join(&format!("accounts/{id}"))
    }
}

impl Default for AccountsConfig {
    fn default() -> Self {
        Self::new(Iri::from_static(vocab::DEFAULT_GRAPH))
    }
}
