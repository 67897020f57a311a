//! Typed account records and their statement form.

use crate::{
    sparql::{Iri, Literal, Row, Term, TermError, Triple, Var},
    vocab,
};
use std::fmt;
use thiserror::Error;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use uuid::Uuid;

pub(crate) const URI: Var = Var::named("uri");
pub(crate) const ID: Var = Var::named("id");
pub(crate) const NICKNAME: Var = Var::named("nickname");
pub(crate) const STATUS: Var = Var::named("status");
pub(crate) const MODIFIED: Var = Var::named("modified");
pub(crate) const PASSWORD: Var = Var::named("password");
pub(crate) const SALT: Var = Var::named("salt");

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("missing binding ?{0}")]
    MissingBinding(String),
    #[error("binding ?{binding} is not {expected}")]
    UnexpectedTerm { binding: String, expected: &'static str },
    #[error("unknown account status {0}")]
    UnknownStatus(String),
    #[error("invalid timestamp: {0}")]
    Timestamp(String),
    #[error(transparent)]
    Iri(#[from] TermError),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccountStatus {
    Active,
    Inactive,
}

impl AccountStatus {
    #[must_use]
    pub fn iri(self) -> Iri {
        match self {
            Self::Active => vocab::STATUS_ACTIVE,
            Self::Inactive => vocab::STATUS_INACTIVE,
        }
    }

    /// # Errors
    /// Returns [`CodecError::UnknownStatus`] for any other IRI.
    pub fn from_iri(iri: &Iri) -> Result<Self, CodecError> {
        if *iri == vocab::STATUS_ACTIVE {
            Ok(Self::Active)
        } else if *iri == vocab::STATUS_INACTIVE {
            Ok(Self::Inactive)
        } else {
            Err(CodecError::UnknownStatus(iri.as_str().to_string()))
        }
    }
}

/// Stored digest and salt. Always written and deleted together.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    digest: String,
    salt: String,
}

impl Credentials {
    #[must_use]
    pub fn new(digest: String, salt: String) -> Self {
        Self { digest, salt }
    }

    #[must_use]
    pub fn digest(&self) -> &str {
        &self.digest
    }

    #[must_use]
    pub fn salt(&self) -> &str {
        &self.salt
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("digest", &"***")
            .field("salt", &"***")
            .finish()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserRecord {
    pub uri: Iri,
    pub id: String,
    pub name: String,
    pub account: Iri,
}

/// Account about to be created.
#[derive(Clone, Debug)]
pub struct NewAccount {
    pub uri: Iri,
    pub id: String,
    pub nickname: String,
    pub credentials: Credentials,
}

/// Account as read back from the store. Credentials are fetched separately.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccountRecord {
    pub uri: Iri,
    pub id: String,
    pub nickname: String,
    pub status: AccountStatus,
    pub modified: Option<OffsetDateTime>,
}

impl AccountRecord {
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == AccountStatus::Active
    }
}

/// Trimmed and lowercased.
#[must_use]
pub fn normalize_nickname(nickname: &str) -> String {
    nickname.trim().to_lowercase()
}

/// Fresh opaque identifier for users, accounts and session bindings.
#[must_use]
pub fn allocate_id() -> String {
    Uuid::new_v4().to_string()
}

/// Current time, whole seconds.
///
/// # Errors
/// Returns [`CodecError::Timestamp`] if the clock value cannot be truncated.
pub fn now() -> Result<OffsetDateTime, CodecError> {
    OffsetDateTime::now_utc()
        .replace_nanosecond(0)
        .map_err(|err| CodecError::Timestamp(err.to_string()))
}

/// `"…"^^xsd:dateTime` in RFC 3339.
///
/// # Errors
/// Returns [`CodecError::Timestamp`] if the value cannot be formatted.
pub fn timestamp(at: OffsetDateTime) -> Result<Literal, CodecError> {
    let value = at
        .format(&Rfc3339)
        .map_err(|err| CodecError::Timestamp(err.to_string()))?;
    Ok(Literal::typed(value, vocab::XSD_DATE_TIME))
}

/// # Errors
/// Returns [`CodecError::Timestamp`] if the literal is not RFC 3339.
pub fn parse_timestamp(literal: &Literal) -> Result<OffsetDateTime, CodecError> {
    OffsetDateTime::parse(literal.value(), &Rfc3339).map_err(|err| CodecError::Timestamp(err.to_string()))
}

/// Statements describing a new user.
///
/// # Errors
/// Returns [`CodecError::Timestamp`] if `created` cannot be formatted.
pub fn encode_user(user: &UserRecord, created: OffsetDateTime) -> Result<Vec<Triple>, CodecError> {
    let stamp = timestamp(created)?;
    let subject = &user.uri;
    Ok(vec![
        Triple::new(subject.clone(), vocab::RDF_TYPE, vocab::FOAF_PERSON),
        Triple::new(subject.clone(), vocab::MU_UUID, Literal::string(&user.id)),
        Triple::new(subject.clone(), vocab::FOAF_NAME, Literal::string(&user.name)),
        Triple::new(subject.clone(), vocab::FOAF_ACCOUNT, user.account.clone()),
        Triple::new(subject.clone(), vocab::DCT_CREATED, stamp.clone()),
        Triple::new(subject.clone(), vocab::DCT_MODIFIED, stamp),
    ])
}

/// Statements describing a new, active account.
///
/// # Errors
/// Returns [`CodecError::Timestamp`] if `created` cannot be formatted.
pub fn encode_account(account: &NewAccount, created: OffsetDateTime) -> Result<Vec<Triple>, CodecError> {
    let stamp = timestamp(created)?;
    let subject = &account.uri;
    let mut triples = vec![
        Triple::new(subject.clone(), vocab::RDF_TYPE, vocab::FOAF_ONLINE_ACCOUNT),
        Triple::new(subject.clone(), vocab::MU_UUID, Literal::string(&account.id)),
        Triple::new(
            subject.clone(),
            vocab::FOAF_ACCOUNT_NAME,
            Literal::string(normalize_nickname(&account.nickname)),
        ),
        Triple::new(subject.clone(), vocab::ACCOUNT_STATUS, AccountStatus::Active.iri()),
        Triple::new(subject.clone(), vocab::DCT_CREATED, stamp.clone()),
        Triple::new(subject.clone(), vocab::DCT_MODIFIED, stamp),
    ];
    triples.extend(
        credential_fields(&account.credentials)
            .into_iter()
            .map(|(predicate, object)| Triple::new(subject.clone(), predicate, object)),
    );
    Ok(triples)
}

/// Digest and salt as one field group.
#[must_use]
pub fn credential_fields(credentials: &Credentials) -> Vec<(Iri, Term)> {
    vec![
        (
            vocab::ACCOUNT_PASSWORD,
            Literal::string(credentials.digest()).into(),
        ),
        (vocab::ACCOUNT_SALT, Literal::string(credentials.salt()).into()),
    ]
}

#[must_use]
pub fn nickname_field(nickname: &str) -> (Iri, Term) {
    (
        vocab::FOAF_ACCOUNT_NAME,
        Literal::string(normalize_nickname(nickname)).into(),
    )
}

#[must_use]
pub fn status_field(status: AccountStatus) -> (Iri, Term) {
    (vocab::ACCOUNT_STATUS, status.iri().into())
}

/// Map a row binding `?uri ?id ?nickname ?status` and optionally `?modified`.
///
/// # Errors
/// Returns a [`CodecError`] if a required binding is missing or has the
/// wrong kind of term.
pub fn decode_account(row: &Row) -> Result<AccountRecord, CodecError> {
    let modified = match row.get(MODIFIED.name()) {
        Some(_) => Some(parse_timestamp(literal_binding(row, &MODIFIED)?)?),
        None => None,
    };

    Ok(AccountRecord {
        uri: iri_binding(row, &URI)?.clone(),
        id: literal_binding(row, &ID)?.value().to_string(),
        nickname: literal_binding(row, &NICKNAME)?.value().to_string(),
        status: AccountStatus::from_iri(iri_binding(row, &STATUS)?)?,
        modified,
    })
}

pub(crate) fn iri_binding<'r>(row: &'r Row, var: &Var) -> Result<&'r Iri, CodecError> {
    binding(row, var)?
        .as_iri()
        .ok_or_else(|| CodecError::UnexpectedTerm {
            binding: var.name().to_string(),
            expected: "an IRI",
        })
}

pub(crate) fn literal_binding<'r>(row: &'r Row, var: &Var) -> Result<&'r Literal, CodecError> {
    binding(row, var)?
        .as_literal()
        .ok_or_else(|| CodecError::UnexpectedTerm {
            binding: var.name().to_string(),
            expected: "a literal",
        })
}

fn binding<'r>(row: &'r Row, var: &Var) -> Result<&'r Term, CodecError> {
    row.get(var.name())
        .ok_or_else(|| CodecError::MissingBinding(var.name().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use time::macros::datetime;

    const ACCOUNT: Iri = Iri::from_static("http://example.com/accounts/42");
    const USER: Iri = Iri::from_static("http://example.com/users/7");

    fn row(bindings: &[(&Var, Term)]) -> Row {
        bindings
            .iter()
            .map(|(var, term)| (var.name().to_string(), term.clone()))
            .collect()
    }

    #[test]
    fn nicknames_are_trimmed_and_lowercased() {
        assert_eq!(normalize_nickname("  Jane "), "jane");
        assert_eq!(normalize_nickname("ÉLODIE"), "élodie");
        assert_eq!(normalize_nickname("jane"), "jane");
    }

    #[test]
    fn allocated_ids_are_unique_uuids() -> Result<()> {
        let first = allocate_id();
        let second = allocate_id();
        assert_ne!(first, second);
        Uuid::parse_str(&first)?;
        Ok(())
    }

    #[test]
    fn timestamps_are_typed_rfc3339() -> Result<()> {
        let literal = timestamp(datetime!(2024-03-01 12:30:05 UTC))?;
        assert_eq!(literal.value(), "2024-03-01T12:30:05Z");
        assert_eq!(literal.datatype(), Some(&vocab::XSD_DATE_TIME));
        assert_eq!(parse_timestamp(&literal)?, datetime!(2024-03-01 12:30:05 UTC));
        Ok(())
    }

    #[test]
    fn now_has_whole_seconds() -> Result<()> {
        assert_eq!(now()?.nanosecond(), 0);
        Ok(())
    }

    #[test]
    fn user_text_is_escaped_when_rendered() -> Result<()> {
        let user = UserRecord {
            uri: USER,
            id: "7".to_string(),
            name: "O\"Brien\" } ; DROP ALL\n\\".to_string(),
            account: ACCOUNT,
        };
        let triples = encode_user(&user, datetime!(2024-03-01 0:00 UTC))?;
        let rendered = triples
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" ");
        assert!(rendered.contains(r#""O\"Brien\" } ; DROP ALL\n\\""#));
        Ok(())
    }

    #[test]
    fn account_encoding_normalizes_nickname_and_starts_active() -> Result<()> {
        let account = NewAccount {
            uri: ACCOUNT,
            id: "42".to_string(),
            nickname: " Jane".to_string(),
            credentials: Credentials::new("digest".to_string(), "salt".to_string()),
        };
        let triples = encode_account(&account, datetime!(2024-03-01 0:00 UTC))?;
        assert!(triples.contains(&Triple::new(
            ACCOUNT,
            vocab::FOAF_ACCOUNT_NAME,
            Literal::string("jane")
        )));
        assert!(triples.contains(&Triple::new(
            ACCOUNT,
            vocab::ACCOUNT_STATUS,
            vocab::STATUS_ACTIVE
        )));
        assert!(triples.contains(&Triple::new(
            ACCOUNT,
            vocab::ACCOUNT_PASSWORD,
            Literal::string("digest")
        )));
        assert!(triples.contains(&Triple::new(ACCOUNT, vocab::ACCOUNT_SALT, Literal::string("salt"))));
        Ok(())
    }

    #[test]
    fn decode_account_reads_required_and_optional_bindings() -> Result<()> {
        let stamp = timestamp(datetime!(2024-03-01 0:00 UTC))?;
        let record = decode_account(&row(&[
            (&URI, ACCOUNT.into()),
            (&ID, Literal::string("42").into()),
            (&NICKNAME, Literal::string("jane").into()),
            (&STATUS, vocab::STATUS_INACTIVE.into()),
            (&MODIFIED, stamp.into()),
        ]))?;
        assert_eq!(record.uri, ACCOUNT);
        assert_eq!(record.status, AccountStatus::Inactive);
        assert!(!record.is_active());
        assert_eq!(record.modified, Some(datetime!(2024-03-01 0:00 UTC)));

        let without_modified = decode_account(&row(&[
            (&URI, ACCOUNT.into()),
            (&ID, Literal::string("42").into()),
            (&NICKNAME, Literal::string("jane").into()),
            (&STATUS, vocab::STATUS_ACTIVE.into()),
        ]))?;
        assert_eq!(without_modified.modified, None);
        Ok(())
    }

    #[test]
    fn decode_account_never_defaults_missing_or_malformed_bindings() {
        let missing_status = row(&[
            (&URI, ACCOUNT.into()),
            (&ID, Literal::string("42").into()),
            (&NICKNAME, Literal::string("jane").into()),
        ]);
        assert!(matches!(
            decode_account(&missing_status),
            Err(CodecError::MissingBinding(name)) if name == "status"
        ));

        let literal_uri = row(&[
            (&URI, Literal::string("not an iri").into()),
            (&ID, Literal::string("42").into()),
            (&NICKNAME, Literal::string("jane").into()),
            (&STATUS, vocab::STATUS_ACTIVE.into()),
        ]);
        assert!(matches!(
            decode_account(&literal_uri),
            Err(CodecError::UnexpectedTerm { .. })
        ));

        let odd_status = row(&[
            (&URI, ACCOUNT.into()),
            (&ID, Literal::string("42").into()),
            (&NICKNAME, Literal::string("jane").into()),
            (&STATUS, USER.into()),
        ]);
        assert!(matches!(
            decode_account(&odd_status),
            Err(CodecError::UnknownStatus(_))
        ));
    }

    #[test]
    fn credentials_debug_is_redacted() {
        let credentials = Credentials::new("digest-value".to_string(), "salt-value".to_string());
        let rendered = format!("{credentials:?}");
        assert!(!rendered.contains("digest-value"));
        assert!(!rendered.contains("salt-value"));
    }
}
