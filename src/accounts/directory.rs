//! Read path.

use super::{
    codec::{self, AccountRecord, AccountStatus, Credentials, ID, MODIFIED, NICKNAME, PASSWORD, SALT, STATUS, URI},
    AccountError, AccountsConfig,
};
use crate::{
    sparql::{GraphStore, Iri, Literal, Row, Select, TriplePattern, Var},
    vocab,
};
use tracing::warn;

const ACCOUNT: Var = Var::named("account");

/// Which accounts a lookup may return.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Filter {
    ActiveOnly,
    AnyStatus,
}

pub struct Directory<'a, S> {
    store: &'a S,
    config: &'a AccountsConfig,
}

impl<'a, S: GraphStore> Directory<'a, S> {
    #[must_use]
    pub fn new(store: &'a S, config: &'a AccountsConfig) -> Self {
        Self { store, config }
    }

    /// Accounts holding `nickname`, regardless of status.
    ///
    /// # Errors
    /// Returns [`AccountError::Store`] or [`AccountError::Codec`].
    pub async fn by_nickname(&self, nickname: &str) -> Result<Vec<AccountRecord>, AccountError> {
        let select = self
            .account_select(&[NICKNAME])
            .bind(NICKNAME, Literal::string(codec::normalize_nickname(nickname)));
        self.accounts(&select).await
    }

    /// IRIs of every account holding `nickname`.
    ///
    /// Only the type and the nickname are required, so an account whose
    /// other fields are being rewritten still counts.
    ///
    /// # Errors
    /// Returns [`AccountError::Store`] or [`AccountError::Codec`].
    pub async fn nickname_holders(&self, nickname: &str) -> Result<Vec<Iri>, AccountError> {
        let select = Select::new([URI])
            .from(self.config.users_graph())
            .pattern(TriplePattern::new(URI, vocab::RDF_TYPE, vocab::FOAF_ONLINE_ACCOUNT))
            .pattern(TriplePattern::new(
                URI,
                vocab::FOAF_ACCOUNT_NAME,
                Literal::string(codec::normalize_nickname(nickname)),
            ));
        let rows = self.store.query(&select).await?;
        rows.iter()
            .map(|row| Ok(codec::iri_binding(row, &URI)?.clone()))
            .collect()
    }

    /// An account exists once it has a type and a uuid; nickname and status
    /// may be missing while they are rewritten.
    ///
    /// # Errors
    /// [`AccountError::FieldsUnavailable`] if the account exists but its
    /// nickname or status is absent. Store and codec failures propagate.
    pub async fn by_id(&self, id: &str, filter: Filter) -> Result<Option<AccountRecord>, AccountError> {
        let select = match filter {
            Filter::ActiveOnly => self
                .account_select(&[STATUS])
                .bind(STATUS, AccountStatus::Active.iri()),
            Filter::AnyStatus => self.account_select(&[]),
        };
        let select = select.bind(ID, Literal::string(id));
        Ok(self.accounts(&select).await?.into_iter().next())
    }

    /// IRI of the account with `id`, whatever state its other fields are in.
    ///
    /// # Errors
    /// Returns [`AccountError::Store`] or [`AccountError::Codec`].
    pub async fn account_uri(&self, id: &str) -> Result<Option<Iri>, AccountError> {
        let select = Select::new([URI])
            .from(self.config.users_graph())
            .bind(ID, Literal::string(id))
            .pattern(TriplePattern::new(URI, vocab::RDF_TYPE, vocab::FOAF_ONLINE_ACCOUNT))
            .pattern(TriplePattern::new(URI, vocab::MU_UUID, ID));
        let rows = self.store.query(&select).await?;
        match rows.first() {
            Some(row) => Ok(Some(codec::iri_binding(row, &URI)?.clone())),
            None => Ok(None),
        }
    }

    /// # Errors
    /// [`AccountError::FieldsUnavailable`] if the account exists but its
    /// nickname or status is absent. Store and codec failures propagate.
    pub async fn by_uri(&self, uri: &Iri) -> Result<Option<AccountRecord>, AccountError> {
        let select = self.account_select(&[]).bind(URI, uri.clone());
        Ok(self.accounts(&select).await?.into_iter().next())
    }

    /// Follow `session:account` in the sessions graph, then read the account
    /// from the users graph.
    ///
    /// # Errors
    /// Returns [`AccountError::Store`] or [`AccountError::Codec`].
    pub async fn account_bound_to_session(&self, session: &Iri) -> Result<Option<AccountRecord>, AccountError> {
        let select = Select::new([ACCOUNT])
            .from(self.config.sessions_graph())
            .pattern(TriplePattern::new(session.clone(), vocab::SESSION_ACCOUNT, ACCOUNT));
        let rows = self.store.query(&select).await?;
        if rows.len() > 1 {
            warn!("Session {} is bound to {} accounts", session.as_str(), rows.len());
        }
        let Some(row) = rows.first() else {
            return Ok(None);
        };
        let account = codec::iri_binding(row, &ACCOUNT)?;
        self.by_uri(account).await
    }

    /// Stored digest and salt of `account`.
    ///
    /// # Errors
    /// [`AccountError::NotFound`] if the account does not exist, and
    /// [`AccountError::CredentialsUnavailable`] if either half is absent or
    /// more than one value is present.
    pub async fn credentials_for(&self, account: &Iri) -> Result<Credentials, AccountError> {
        let select = Select::new([PASSWORD, SALT])
            .from(self.config.users_graph())
            .bind(URI, account.clone())
            .pattern(TriplePattern::new(URI, vocab::RDF_TYPE, vocab::FOAF_ONLINE_ACCOUNT))
            .optional(vec![TriplePattern::new(URI, vocab::ACCOUNT_PASSWORD, PASSWORD)])
            .optional(vec![TriplePattern::new(URI, vocab::ACCOUNT_SALT, SALT)]);
        let rows = self.store.query(&select).await?;

        match rows.as_slice() {
            [] => Err(AccountError::NotFound(format!(
                "No account found for {}",
                account.as_str()
            ))),
            [row] if row.contains_key(PASSWORD.name()) && row.contains_key(SALT.name()) => {
                Ok(Credentials::new(
                    codec::literal_binding(row, &PASSWORD)?.value().to_string(),
                    codec::literal_binding(row, &SALT)?.value().to_string(),
                ))
            }
            _ => {
                warn!(
                    "Credentials for {} are incomplete ({} rows)",
                    account.as_str(),
                    rows.len()
                );
                Err(AccountError::CredentialsUnavailable(account.as_str().to_string()))
            }
        }
    }

    /// Cheapest query that proves the store answers.
    ///
    /// # Errors
    /// Returns [`AccountError::Store`] if the store is unreachable.
    pub async fn ping(&self) -> Result<(), AccountError> {
        let select = Select::new([URI])
            .from(self.config.users_graph())
            .pattern(TriplePattern::new(URI, vocab::RDF_TYPE, vocab::FOAF_ONLINE_ACCOUNT))
            .limit(1);
        self.store.query(&select).await?;
        Ok(())
    }

    /// Type and uuid are always required. Nickname and status are required
    /// only when listed in `required`; a variable bound with `VALUES` must be
    /// listed, or an account lacking that field would match anything.
    fn account_select(&self, required: &[Var]) -> Select {
        let mut select = Select::new([URI, ID, NICKNAME, STATUS, MODIFIED])
            .from(self.config.users_graph())
            .pattern(TriplePattern::new(URI, vocab::RDF_TYPE, vocab::FOAF_ONLINE_ACCOUNT))
            .pattern(TriplePattern::new(URI, vocab::MU_UUID, ID));
        for (predicate, var) in [(vocab::FOAF_ACCOUNT_NAME, NICKNAME), (vocab::ACCOUNT_STATUS, STATUS)] {
            let pattern = TriplePattern::new(URI, predicate, var.clone());
            select = if required.contains(&var) {
                select.pattern(pattern)
            } else {
                select.optional(vec![pattern])
            };
        }
        select.optional(vec![TriplePattern::new(URI, vocab::DCT_MODIFIED, MODIFIED)])
    }

    async fn accounts(&self, select: &Select) -> Result<Vec<AccountRecord>, AccountError> {
        let rows: Vec<Row> = self.store.query(select).await?;
        let mut accounts: Vec<AccountRecord> = Vec::with_capacity(rows.len());
        for row in &rows {
            if !row.contains_key(NICKNAME.name()) || !row.contains_key(STATUS.name()) {
                let uri = codec::iri_binding(row, &URI)?;
                warn!("Account {} is missing its nickname or status", uri.as_str());
                return Err(AccountError::FieldsUnavailable(uri.as_str().to_string()));
            }
            let account = codec::decode_account(row)?;
            // Several rows per account only while `dct:modified` is being rewritten.
            if !accounts.iter().any(|known| known.uri == account.uri) {
                accounts.push(account);
            }
        }
        Ok(accounts)
    }
}
