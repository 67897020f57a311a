use crate::{
    accounts::{AccountService, AccountsConfig, CredentialHasher},
    api,
    cli::commands::{
        accounts,
        store::{self, StoreKind},
    },
    sparql::{Backend, MemoryStore, SparqlClient},
};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub store: store::Options,
    pub accounts: accounts::Options,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the store client cannot be built, the hash cost is
/// invalid, or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let backend = backend(&args.store)?;

    let cost = args.accounts.hash_cost;
    let hasher = CredentialHasher::new(args.accounts.application_secret)
        .with_cost(cost.memory_kib, cost.iterations, cost.parallelism)
        .context("invalid password hash parameters")?;

    let mut config = AccountsConfig::new(args.accounts.users_graph)
        .with_resource_base(args.accounts.resource_base)
        .with_auto_login(args.accounts.auto_login);
    if let Some(sessions_graph) = args.accounts.sessions_graph {
        config = config.with_sessions_graph(sessions_graph);
    }

    debug!(
        users_graph = %config.users_graph(),
        sessions_graph = %config.sessions_graph(),
        auto_login = config.auto_login(),
        "accounts configured"
    );

    let service = Arc::new(AccountService::new(backend, hasher, config));

    if let Err(err) = service.ping().await {
        warn!("graph store is not reachable yet: {}", err);
    }

    api::new(args.port, service).await
}

fn backend(options: &store::Options) -> Result<Backend> {
    match options.kind {
        StoreKind::Sparql => {
            info!(
                "Using SPARQL store at {} (updates: {})",
                options.query_endpoint, options.update_endpoint
            );
            let client = SparqlClient::new(
                options.query_endpoint.clone(),
                options.update_endpoint.clone(),
                options.timeout,
            )
            .context("failed to build SPARQL client")?
            .with_atomic_updates(options.atomic_updates);
            Ok(Backend::Sparql(client))
        }
        StoreKind::Memory => {
            warn!("Using the in-memory store, accounts will not survive a restart");
            Ok(Backend::Memory(
                MemoryStore::new().with_atomic_updates(options.atomic_updates),
            ))
        }
    }
}
