use crate::{sparql::Iri, vocab};
use anyhow::{Context, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};
use secrecy::SecretString;

pub const ARG_USERS_GRAPH: &str = "users-graph";
pub const ARG_SESSIONS_GRAPH: &str = "sessions-graph";
pub const ARG_RESOURCE_BASE: &str = "resource-base";
pub const ARG_APPLICATION_SECRET: &str = "application-secret";
pub const ARG_AUTO_LOGIN: &str = "auto-login";
pub const ARG_HASH_MEMORY_KIB: &str = "hash-memory-kib";
pub const ARG_HASH_ITERATIONS: &str = "hash-iterations";
pub const ARG_HASH_PARALLELISM: &str = "hash-parallelism";

/// Argon2id cost parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HashCost {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

#[derive(Debug)]
pub struct Options {
    pub users_graph: Iri,
    pub sessions_graph: Option<Iri>,
    pub resource_base: Iri,
    pub application_secret: SecretString,
    pub auto_login: bool,
    pub hash_cost: HashCost,
}

impl Options {
    /// Parse account arguments from matches.
    ///
    /// # Errors
    /// Returns an error if the secret is missing or a graph IRI is invalid.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        let get_non_empty = |id: &str| {
            matches
                .get_one::<String>(id)
                .cloned()
                .filter(|v| !v.trim().is_empty())
        };
        let iri = |id: &str, value: String| {
            Iri::new(value).with_context(|| format!("invalid --{id}"))
        };

        let application_secret = match get_non_empty(ARG_APPLICATION_SECRET) {
            Some(secret) => SecretString::from(secret),
            None => anyhow::bail!("missing required argument: --{ARG_APPLICATION_SECRET}"),
        };

        let users_graph = iri(
            ARG_USERS_GRAPH,
            get_non_empty(ARG_USERS_GRAPH).unwrap_or_else(|| vocab::DEFAULT_GRAPH.to_string()),
        )?;
        let sessions_graph = get_non_empty(ARG_SESSIONS_GRAPH)
            .map(|value| iri(ARG_SESSIONS_GRAPH, value))
            .transpose()?;
        let resource_base = iri(
            ARG_RESOURCE_BASE,
            get_non_empty(ARG_RESOURCE_BASE)
                .unwrap_or_else(|| vocab::DEFAULT_RESOURCE_BASE.to_string()),
        )?;

        let cost = |id: &str, default: u32| matches.get_one::<u32>(id).copied().unwrap_or(default);

        Ok(Self {
            users_graph,
            sessions_graph,
            resource_base,
            application_secret,
            auto_login: matches.get_flag(ARG_AUTO_LOGIN),
            hash_cost: HashCost {
                memory_kib: cost(ARG_HASH_MEMORY_KIB, 19_456),
                iterations: cost(ARG_HASH_ITERATIONS, 2),
                parallelism: cost(ARG_HASH_PARALLELISM, 1),
            },
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_USERS_GRAPH)
                .long(ARG_USERS_GRAPH)
                .help("Named graph holding users and accounts")
                .env("REGISTRAR_USERS_GRAPH")
                .default_value(vocab::DEFAULT_GRAPH),
        )
        .arg(
            Arg::new(ARG_SESSIONS_GRAPH)
                .long(ARG_SESSIONS_GRAPH)
                .help("Named graph holding session bindings (default: the users graph)")
                .env("REGISTRAR_SESSIONS_GRAPH"),
        )
        .arg(
            Arg::new(ARG_RESOURCE_BASE)
                .long(ARG_RESOURCE_BASE)
                .help("Base IRI for minted user and account resources")
                .env("REGISTRAR_RESOURCE_BASE")
                .default_value(vocab::DEFAULT_RESOURCE_BASE),
        )
        .arg(
            Arg::new(ARG_APPLICATION_SECRET)
                .long(ARG_APPLICATION_SECRET)
                .help("Application-wide secret mixed into every password digest")
                .env("REGISTRAR_APPLICATION_SECRET")
                .hide_env_values(true),
        )
        .arg(
            Arg::new(ARG_AUTO_LOGIN)
                .long(ARG_AUTO_LOGIN)
                .help("Bind the caller's session to the account it registers")
                .env("REGISTRAR_AUTO_LOGIN_ON_REGISTRATION")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new(ARG_HASH_MEMORY_KIB)
                .long(ARG_HASH_MEMORY_KIB)
                .help("Argon2id memory cost in KiB")
                .env("REGISTRAR_HASH_MEMORY_KIB")
                .default_value("19456")
                .value_parser(clap::value_parser!(u32)),
        )
        .arg(
            Arg::new(ARG_HASH_ITERATIONS)
                .long(ARG_HASH_ITERATIONS)
                .help("Argon2id iterations")
                .env("REGISTRAR_HASH_ITERATIONS")
                .default_value("2")
                .value_parser(clap::value_parser!(u32)),
        )
        .arg(
            Arg::new(ARG_HASH_PARALLELISM)
                .long(ARG_HASH_PARALLELISM)
                .help("Argon2id lanes")
                .env("REGISTRAR_HASH_PARALLELISM")
                .default_value("1")
                .value_parser(clap::value_parser!(u32)),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    const VARS: [&str; 8] = [
        "REGISTRAR_USERS_GRAPH",
        "REGISTRAR_SESSIONS_GRAPH",
        "REGISTRAR_RESOURCE_BASE",
        "REGISTRAR_APPLICATION_SECRET",
        "REGISTRAR_AUTO_LOGIN_ON_REGISTRATION",
        "REGISTRAR_HASH_MEMORY_KIB",
        "REGISTRAR_HASH_ITERATIONS",
        "REGISTRAR_HASH_PARALLELISM",
    ];

    fn parse(args: &[&str]) -> Result<Options> {
        let command = with_args(Command::new("registrar"));
        let mut argv = vec!["registrar"];
        argv.extend_from_slice(args);
        Options::parse(&command.try_get_matches_from(argv)?)
    }

    fn cleared<F: FnOnce() -> R, R>(f: F) -> R {
        temp_env::with_vars_unset(VARS, f)
    }

    #[test]
    fn secret_is_required() {
        let err = cleared(|| parse(&[])).err().map(|e| e.to_string());
        assert_eq!(
            err.as_deref(),
            Some("missing required argument: --application-secret")
        );

        let blank = temp_env::with_var("REGISTRAR_APPLICATION_SECRET", Some("  "), || parse(&[]));
        assert!(blank.is_err());
    }

    #[test]
    fn defaults() -> Result<()> {
        let options = cleared(|| parse(&["--application-secret", "s3cr3t"]))?;
        assert_eq!(options.users_graph.as_str(), vocab::DEFAULT_GRAPH);
        assert!(options.sessions_graph.is_none());
        assert_eq!(options.resource_base.as_str(), vocab::DEFAULT_RESOURCE_BASE);
        assert_eq!(options.application_secret.expose_secret(), "s3cr3t");
        assert!(!options.auto_login);
        assert_eq!(
            options.hash_cost,
            HashCost {
                memory_kib: 19_456,
                iterations: 2,
                parallelism: 1
            }
        );
        Ok(())
    }

    #[test]
    fn environment_is_honoured() -> Result<()> {
        let options = temp_env::with_vars(
            [
                ("REGISTRAR_APPLICATION_SECRET", Some("from-env")),
                ("REGISTRAR_USERS_GRAPH", Some("http://example.com/users")),
                ("REGISTRAR_SESSIONS_GRAPH", Some("http://example.com/sessions")),
                ("REGISTRAR_AUTO_LOGIN_ON_REGISTRATION", Some("true")),
                ("REGISTRAR_HASH_ITERATIONS", Some("4")),
            ],
            || parse(&[]),
        )?;
        assert_eq!(options.users_graph.as_str(), "http://example.com/users");
        assert_eq!(
            options.sessions_graph.as_ref().map(Iri::as_str),
            Some("http://example.com/sessions")
        );
        assert!(options.auto_login);
        assert_eq!(options.hash_cost.iterations, 4);
        Ok(())
    }

    #[test]
    fn secret_is_hidden_from_debug() -> Result<()> {
        let options = cleared(|| parse(&["--application-secret", "do-not-print"]))?;
        assert!(!format!("{options:?}").contains("do-not-print"));
        Ok(())
    }

    #[test]
    fn invalid_graph_is_rejected() {
        let result = cleared(|| {
            parse(&["--application-secret", "s", "--users-graph", "not an iri"])
        });
        assert!(result.is_err());
    }
}
