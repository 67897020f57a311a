//! # Registrar (account registration over a graph store)
//!
//! `registrar` manages end-user accounts whose state lives entirely in an
//! external SPARQL graph store: registration, credential storage and
//! verification, password rotation, and deactivation. It keeps nothing in
//! memory between requests.
//!
//! ## Storage model
//!
//! Users (`foaf:Person`) and accounts (`foaf:OnlineAccount`) are sets of
//! statements in the users graph. Session bindings (`session:account`) live
//! in the sessions graph, which defaults to the users graph.
//!
//! - **Mutable fields** are changed by deleting the old statements and
//!   inserting new ones; `dct:modified` is rewritten with every change.
//! - **Nicknames** are trimmed, lowercased and unique across all accounts,
//!   active or not. Uniqueness is re-checked after every write that claims a
//!   nickname and the losing write is rolled back.
//! - **Deactivation** is a status change; accounts are never deleted.
//!
//! ## Credentials
//!
//! Passwords are hashed with Argon2id over `password || application secret ||
//! account salt`. Salt and digest are always replaced together. Digests in
//! the older hex SHA-256 format are still accepted on verification.

pub mod accounts;
pub mod api;
pub mod cli;
pub mod sparql;
pub mod vocab;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
