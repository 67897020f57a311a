//! SPARQL 1.1 Protocol client.

use super::{GraphStore, Iri, Literal, Row, Select, StoreError, Term, Update};
use crate::APP_USER_AGENT;
use reqwest::{
    header::{ACCEPT, CONTENT_TYPE},
    Client,
};
use serde::Deserialize;
use std::{collections::HashMap, time::Duration};
use tracing::{debug, error, info_span, Instrument};
use url::Url;

const SPARQL_QUERY: &str = "application/sparql-query";
const SPARQL_UPDATE: &str = "application/sparql-update";
const SPARQL_RESULTS_JSON: &str = "application/sparql-results+json";

#[derive(Debug, Clone)]
pub struct SparqlClient {
    client: Client,
    query_endpoint: Url,
    update_endpoint: Url,
    timeout: Duration,
    atomic_updates: bool,
}

impl SparqlClient {
    /// Build a client for the given endpoints. Every request is bounded by
    /// `timeout`.
    ///
    /// # Errors
    /// Returns [`StoreError::Unavailable`] if the HTTP client cannot be built.
    pub fn new(query_endpoint: Url, update_endpoint: Url, timeout: Duration) -> Result<Self, StoreError> {
        let client = Client::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|err| StoreError::Unavailable(format!("failed to build HTTP client: {err}")))?;

        Ok(Self {
            client,
            query_endpoint,
            update_endpoint,
            timeout,
            atomic_updates: false,
        })
    }

    /// Declare that the endpoint applies a combined DELETE/INSERT request
    /// atomically.
    #[must_use]
    pub fn with_atomic_updates(mut self, atomic_updates: bool) -> Self {
        self.atomic_updates = atomic_updates;
        self
    }

    #[must_use]
    pub fn query_endpoint(&self) -> &Url {
        &self.query_endpoint
    }

    fn transport_error(&self, err: &reqwest::Error) -> StoreError {
        if err.is_timeout() {
            StoreError::Unavailable(format!(
                "request timed out after {}s",
                self.timeout.as_secs_f32()
            ))
        } else {
            StoreError::Unavailable(err.to_string())
        }
    }

    async fn post(&self, endpoint: &Url, content_type: &str, body: String) -> Result<String, StoreError> {
        let response = self
            .client
            .post(endpoint.as_str())
            .header(CONTENT_TYPE, content_type)
            .header(ACCEPT, SPARQL_RESULTS_JSON)
            .body(body)
            .send()
            .await
            .map_err(|err| self.transport_error(&err))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|err| self.transport_error(&err))?;

        if !status.is_success() {
            error!("Graph store returned {}: {}", status, text);
            return Err(StoreError::Rejected {
                status: status.as_u16(),
                body: text,
            });
        }

        Ok(text)
    }
}

impl GraphStore for SparqlClient {
    async fn query(&self, select: &Select) -> Result<Vec<Row>, StoreError> {
        let statement = select.to_string();
        let span = info_span!(
            "db.query",
            db.system = "sparql",
            db.operation = "SELECT",
            db.statement = statement.as_str()
        );
        let body = self
            .post(&self.query_endpoint, SPARQL_QUERY, statement)
            .instrument(span)
            .await?;

        let rows = decode_results(&body)?;
        debug!("Query returned {} rows", rows.len());
        Ok(rows)
    }

    async fn update(&self, update: &Update) -> Result<(), StoreError> {
        if update.is_empty() {
            return Ok(());
        }

        // Updates carry digests and salts, so the statement stays out of the span.
        let statement = update.to_string();
        let span = info_span!(
            "db.query",
            db.system = "sparql",
            db.operation = update.operation()
        );
        self.post(&self.update_endpoint, SPARQL_UPDATE, statement)
            .instrument(span)
            .await?;

        Ok(())
    }

    fn atomic_updates(&self) -> bool {
        self.atomic_updates
    }
}

#[derive(Deserialize)]
struct SparqlResults {
    results: ResultSet,
}

#[derive(Deserialize)]
struct ResultSet {
    bindings: Vec<HashMap<String, JsonTerm>>,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
enum JsonTerm {
    Uri {
        value: String,
    },
    Literal {
        value: String,
        datatype: Option<String>,
        #[serde(rename = "xml:lang")]
        language: Option<String>,
    },
    TypedLiteral {
        value: String,
        datatype: String,
    },
    Bnode {
        value: String,
    },
}

impl TryFrom<JsonTerm> for Term {
    type Error = StoreError;

    fn try_from(term: JsonTerm) -> Result<Self, Self::Error> {
        let iri = |value: String| Iri::new(value).map_err(|err| StoreError::Decode(err.to_string()));

        Ok(match term {
            JsonTerm::Uri { value } => Self::Iri(iri(value)?),
            JsonTerm::Literal {
                value,
                datatype: Some(datatype),
                ..
            }
            | JsonTerm::TypedLiteral { value, datatype } => {
                Self::Literal(Literal::typed(value, iri(datatype)?))
            }
            JsonTerm::Literal {
                value,
                datatype: None,
                language: Some(language),
            } => Self::Literal(Literal::tagged(value, &language)),
            JsonTerm::Literal { value, .. } => Self::Literal(Literal::string(value)),
            JsonTerm::Bnode { value } => Self::Blank(value),
        })
    }
}

/// Decode an `application/sparql-results+json` document into rows.
///
/// # Errors
/// Returns [`StoreError::Decode`] if the body is not a results document.
pub fn decode_results(body: &str) -> Result<Vec<Row>, StoreError> {
    let results: SparqlResults =
        serde_json::from_str(body).map_err(|err| StoreError::Decode(err.to_string()))?;

    results
        .results
        .bindings
        .into_iter()
        .map(|binding| {
            binding
                .into_iter()
                .map(|(name, term)| Term::try_from(term).map(|term| (name, term)))
                .collect::<Result<Row, StoreError>>()
        })
        .collect()
}
