use anyhow::{Context, Result};
use clap::{builder::PossibleValuesParser, Arg, ArgAction, ArgMatches, Command};
use std::time::Duration;
use url::Url;

pub const ARG_STORE: &str = "store";
pub const ARG_SPARQL_ENDPOINT: &str = "sparql-endpoint";
pub const ARG_SPARQL_UPDATE_ENDPOINT: &str = "sparql-update-endpoint";
pub const ARG_STORE_TIMEOUT: &str = "store-timeout";
pub const ARG_ATOMIC_UPDATES: &str = "atomic-updates";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreKind {
    Sparql,
    Memory,
}

#[derive(Debug)]
pub struct Options {
    pub kind: StoreKind,
    pub query_endpoint: Url,
    pub update_endpoint: Url,
    pub timeout: Duration,
    pub atomic_updates: bool,
}

impl Options {
    /// Parse graph store arguments from matches.
    ///
    /// # Errors
    /// Returns an error if an endpoint is not a valid URL.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        let kind = match matches.get_one::<String>(ARG_STORE).map(String::as_str) {
            Some("memory") => StoreKind::Memory,
            _ => StoreKind::Sparql,
        };

        let query_endpoint = matches
            .get_one::<String>(ARG_SPARQL_ENDPOINT)
            .context(format!("missing required argument: --{ARG_SPARQL_ENDPOINT}"))?;
        let query_endpoint =
            Url::parse(query_endpoint).with_context(|| format!("invalid --{ARG_SPARQL_ENDPOINT}: {query_endpoint}"))?;

        // The update endpoint falls back to the query endpoint.
        let update_endpoint = match matches
            .get_one::<String>(ARG_SPARQL_UPDATE_ENDPOINT)
            .filter(|value| !value.trim().is_empty())
        {
            Some(value) => Url::parse(value)
                .with_context(|| format!("invalid --{ARG_SPARQL_UPDATE_ENDPOINT}: {value}"))?,
            None => query_endpoint.clone(),
        };

        let timeout = matches.get_one::<u64>(ARG_STORE_TIMEOUT).copied().unwrap_or(10);

        Ok(Self {
            kind,
            query_endpoint,
            update_endpoint,
            timeout: Duration::from_secs(timeout),
            atomic_updates: matches.get_flag(ARG_ATOMIC_UPDATES),
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_STORE)
                .long(ARG_STORE)
                .help("Graph store backend")
                .env("REGISTRAR_STORE")
                .default_value("sparql")
                .value_parser(PossibleValuesParser::new(["sparql", "memory"])),
        )
        .arg(
            Arg::new(ARG_SPARQL_ENDPOINT)
                .long(ARG_SPARQL_ENDPOINT)
                .help("SPARQL query endpoint")
                .env("REGISTRAR_SPARQL_ENDPOINT")
                .default_value("http://database:8890/sparql"),
        )
        .arg(
            Arg::new(ARG_SPARQL_UPDATE_ENDPOINT)
                .long(ARG_SPARQL_UPDATE_ENDPOINT)
                .help("SPARQL update endpoint (default: the query endpoint)")
                .env("REGISTRAR_SPARQL_UPDATE_ENDPOINT"),
        )
        .arg(
            Arg::new(ARG_STORE_TIMEOUT)
                .long(ARG_STORE_TIMEOUT)
                .help("Timeout in seconds for every graph store request")
                .env("REGISTRAR_STORE_TIMEOUT")
                .default_value("10")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new(ARG_ATOMIC_UPDATES)
                .long(ARG_ATOMIC_UPDATES)
                .help("The store applies a combined DELETE/INSERT request atomically")
                .env("REGISTRAR_ATOMIC_UPDATES")
                .action(ArgAction::SetTrue),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Options> {
        let command = with_args(Command::new("registrar"));
        let mut argv = vec!["registrar"];
        argv.extend_from_slice(args);
        Options::parse(&command.try_get_matches_from(argv)?)
    }

    fn cleared<F: FnOnce() -> R, R>(f: F) -> R {
        temp_env::with_vars(
            [
                ("REGISTRAR_STORE", None::<&str>),
                ("REGISTRAR_SPARQL_ENDPOINT", None),
                ("REGISTRAR_SPARQL_UPDATE_ENDPOINT", None),
                ("REGISTRAR_STORE_TIMEOUT", None),
                ("REGISTRAR_ATOMIC_UPDATES", None),
            ],
            f,
        )
    }

    #[test]
    fn defaults() -> Result<()> {
        let options = cleared(|| parse(&[]))?;
        assert_eq!(options.kind, StoreKind::Sparql);
        assert_eq!(options.query_endpoint.as_str(), "http://database:8890/sparql");
        assert_eq!(options.update_endpoint, options.query_endpoint);
        assert_eq!(options.timeout, Duration::from_secs(10));
        assert!(!options.atomic_updates);
        Ok(())
    }

    #[test]
    fn separate_update_endpoint_and_flags() -> Result<()> {
        let options = cleared(|| {
            parse(&[
                "--store",
                "memory",
                "--sparql-update-endpoint",
                "http://database:8890/update",
                "--store-timeout",
                "3",
                "--atomic-updates",
            ])
        })?;
        assert_eq!(options.kind, StoreKind::Memory);
        assert_eq!(options.update_endpoint.as_str(), "http://database:8890/update");
        assert_eq!(options.timeout, Duration::from_secs(3));
        assert!(options.atomic_updates);
        Ok(())
    }

    #[test]
    fn environment_is_honoured() -> Result<()> {
        let options = temp_env::with_vars(
            [
                ("REGISTRAR_SPARQL_ENDPOINT", Some("http://virtuoso:8890/sparql")),
                ("REGISTRAR_ATOMIC_UPDATES", Some("true")),
                ("REGISTRAR_STORE_TIMEOUT", Some("30")),
            ],
            || parse(&[]),
        )?;
        assert_eq!(options.query_endpoint.as_str(), "http://virtuoso:8890/sparql");
        assert!(options.atomic_updates);
        assert_eq!(options.timeout, Duration::from_secs(30));
        Ok(())
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(cleared(|| parse(&["--sparql-endpoint", "not a url"])).is_err());
        assert!(cleared(|| parse(&["--store", "postgres"])).is_err());
        assert!(cleared(|| parse(&["--store-timeout", "0"])).is_err());
    }
}
