//! Account lifecycle: registration, deactivation, updates and password changes.

use super::{
    codec::{self, AccountRecord, AccountStatus, NewAccount, UserRecord},
    AccountError, AccountsConfig, CredentialHasher, Directory, Filter, Transaction,
};
use crate::{
    sparql::{GraphStore, Iri, Literal, Triple},
    vocab,
};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info, warn};

const NICKNAME_BLANK: &str = "Nickname might not be blank";
const NICKNAME_TAKEN: &str = "Nickname already exists";
const PASSWORD_BLANK: &str = "Password might not be blank";
const PASSWORD_MISMATCH: &str = "Password and password confirmation do not match";
const NAME_IMMUTABLE: &str = "User name cannot be updated";
const NOT_LOGGED_IN: &str = "No account is bound to this session";
const ACCOUNT_INACTIVE: &str = "Account is not active";
const WRONG_OLD_PASSWORD: &str = "incorrect old password";

#[derive(Debug)]
pub struct Registration {
    pub name: String,
    pub nickname: String,
    pub password: SecretString,
    pub password_confirmation: SecretString,
    /// Session to bind the new account to when auto-login is enabled.
    pub session: Option<Iri>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegisteredAccount {
    pub id: String,
    pub uri: Iri,
    pub name: String,
    pub nickname: String,
    pub session_bound: bool,
}

/// Partial update. `None` leaves a field group untouched.
#[derive(Debug, Default)]
pub struct AccountChanges {
    pub nickname: Option<String>,
    pub password: Option<SecretString>,
    pub password_confirmation: Option<SecretString>,
    pub name: Option<String>,
}

#[derive(Debug)]
pub struct PasswordChange {
    pub old_password: SecretString,
    pub new_password: SecretString,
    pub new_password_confirmation: SecretString,
}

#[derive(Debug)]
pub struct AccountService<S> {
    store: S,
    hasher: CredentialHasher,
    config: AccountsConfig,
}

impl<S: GraphStore> AccountService<S> {
    #[must_use]
    pub fn new(store: S, hasher: CredentialHasher, config: AccountsConfig) -> Self {
        Self { store, hasher, config }
    }

    #[must_use]
    pub fn config(&self) -> &AccountsConfig {
        &self.config
    }

    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    fn directory(&self) -> Directory<'_, S> {
        Directory::new(&self.store, &self.config)
    }

    fn transaction(&self) -> Transaction<'_, S> {
        Transaction::new(&self.store)
    }

    /// Create a user and its active account.
    ///
    /// # Errors
    /// [`AccountError::Validation`] for a blank or taken nickname, a blank
    /// password or a confirmation mismatch, including a nickname lost to a
    /// concurrent registration. Store, codec and hasher failures propagate.
    pub async fn register(&self, registration: Registration) -> Result<RegisteredAccount, AccountError> {
        let nickname = codec::normalize_nickname(&registration.nickname);
        if nickname.is_empty() {
            return Err(AccountError::validation(NICKNAME_BLANK));
        }
        if !self.directory().nickname_holders(&nickname).await?.is_empty() {
            return Err(AccountError::validation(NICKNAME_TAKEN));
        }
        check_new_password(&registration.password, &registration.password_confirmation)?;

        let credentials = self.hasher.credentials(&registration.password)?;

        let user_id = codec::allocate_id();
        let account_id = codec::allocate_id();
        let user_uri = self.config.user_iri(&user_id).map_err(codec::CodecError::from)?;
        let account_uri = self.config.account_iri(&account_id).map_err(codec::CodecError::from)?;

        let created = codec::now()?;
        let mut triples = codec::encode_user(
            &UserRecord {
                uri: user_uri,
                id: user_id,
                name: registration.name.clone(),
                account: account_uri.clone(),
            },
            created,
        )?;
        triples.extend(codec::encode_account(
            &NewAccount {
                uri: account_uri.clone(),
                id: account_id.clone(),
                nickname: nickname.clone(),
                credentials,
            },
            created,
        )?);

        let graph = self.config.users_graph();
        self.transaction().create(graph, triples.clone()).await?;

        if self.nickname_contested(&nickname, &account_uri).await? {
            warn!("Nickname {} registered concurrently, rolling back {}", nickname, account_uri.as_str());
            self.transaction().remove(graph, triples).await?;
            return Err(AccountError::validation(NICKNAME_TAKEN));
        }

        let mut session_bound = false;
        if self.config.auto_login() {
            if let Some(session) = &registration.session {
                if let Err(err) = self.bind_session(session, &account_uri).await {
                    warn!("Binding session failed, rolling back {}: {}", account_uri.as_str(), err);
                    if let Err(rollback) = self.transaction().remove(graph, triples).await {
                        warn!("Rollback of {} failed: {}", account_uri.as_str(), rollback);
                    }
                    return Err(err);
                }
                session_bound = true;
            }
        }

        info!("Registered account {}", account_id);
        Ok(RegisteredAccount {
            id: account_id,
            uri: account_uri,
            name: registration.name,
            nickname,
            session_bound,
        })
    }

    /// Mark an account inactive. Repeating the call only refreshes
    /// `dct:modified`.
    ///
    /// # Errors
    /// [`AccountError::NotFound`] if no account has `id`.
    pub async fn deactivate(&self, id: &str) -> Result<(), AccountError> {
        // Only type and uuid are needed, so a status lost mid-rewrite is repaired here.
        let account = self
            .directory()
            .account_uri(id)
            .await?
            .ok_or_else(|| AccountError::NotFound(format!("No account found with id {id}")))?;
        self.set_inactive(&account).await
    }

    /// Deactivate the account bound to `session`.
    ///
    /// # Errors
    /// [`AccountError::Authentication`] if no account is bound.
    pub async fn deactivate_own(&self, session: &Iri) -> Result<(), AccountError> {
        let account = self
            .directory()
            .account_bound_to_session(session)
            .await?
            .ok_or_else(|| AccountError::authentication(NOT_LOGGED_IN))?;
        self.set_inactive(&account.uri).await
    }

    /// Change nickname and/or password of an active account.
    ///
    /// # Errors
    /// [`AccountError::NotFound`] if no active account has `id`, and
    /// [`AccountError::Validation`] for a name change, a blank or taken
    /// nickname, a blank password or a confirmation mismatch.
    pub async fn update(&self, id: &str, changes: AccountChanges) -> Result<(), AccountError> {
        let account = self
            .directory()
            .by_id(id, Filter::ActiveOnly)
            .await?
            .ok_or_else(|| AccountError::NotFound(format!("No active account found with id {id}")))?;

        if changes.name.is_some() {
            return Err(AccountError::validation(NAME_IMMUTABLE));
        }

        let nickname = match &changes.nickname {
            Some(requested) => {
                let nickname = codec::normalize_nickname(requested);
                if nickname.is_empty() {
                    return Err(AccountError::validation(NICKNAME_BLANK));
                }
                let holders = self.directory().nickname_holders(&nickname).await?;
                if holders.iter().any(|holder| *holder != account.uri) {
                    return Err(AccountError::validation(NICKNAME_TAKEN));
                }
                (nickname != account.nickname).then_some(nickname)
            }
            None => None,
        };

        let credentials = match &changes.password {
            Some(password) => {
                let empty = SecretString::from("");
                let confirmation = changes.password_confirmation.as_ref().unwrap_or(&empty);
                check_new_password(password, confirmation)?;
                Some(self.hasher.credentials(password)?)
            }
            None => None,
        };

        if nickname.is_none() && credentials.is_none() {
            debug!("Nothing to update for account {}", account.id);
            return Ok(());
        }

        // The nickname is claimed and re-checked before the password moves, so
        // a lost race leaves the credentials untouched.
        let graph = self.config.users_graph();
        if let Some(nickname) = nickname {
            self.transaction()
                .replace_fields(graph, &account.uri, vec![codec::nickname_field(&nickname)])
                .await?;
            if self.nickname_contested(&nickname, &account.uri).await? {
                warn!(
                    "Nickname {} claimed concurrently, reverting {} to {}",
                    nickname, account.id, account.nickname
                );
                self.transaction()
                    .replace_fields(graph, &account.uri, vec![codec::nickname_field(&account.nickname)])
                    .await?;
                return Err(AccountError::validation(NICKNAME_TAKEN));
            }
        }

        if let Some(credentials) = &credentials {
            self.transaction()
                .replace_fields(graph, &account.uri, codec::credential_fields(credentials))
                .await?;
        }

        info!("Updated account {}", account.id);
        Ok(())
    }

    /// Rotate the password of the account bound to `session` after checking
    /// the old one.
    ///
    /// # Errors
    /// [`AccountError::Authentication`] if the session is unbound, the account
    /// inactive or the old password wrong; [`AccountError::CredentialsUnavailable`]
    /// while stored credentials are incomplete; [`AccountError::Validation`]
    /// for a blank or unconfirmed new password.
    pub async fn change_own_password(&self, session: &Iri, change: PasswordChange) -> Result<(), AccountError> {
        let directory = self.directory();
        let account = directory
            .account_bound_to_session(session)
            .await?
            .ok_or_else(|| AccountError::authentication(NOT_LOGGED_IN))?;
        if !account.is_active() {
            return Err(AccountError::authentication(ACCOUNT_INACTIVE));
        }

        let stored = directory.credentials_for(&account.uri).await?;
        let verified = self.hasher.verify(
            change.old_password.expose_secret(),
            stored.salt(),
            stored.digest(),
        )?;
        if !verified {
            return Err(AccountError::authentication(WRONG_OLD_PASSWORD));
        }

        check_new_password(&change.new_password, &change.new_password_confirmation)?;
        let credentials = self.hasher.credentials(&change.new_password)?;
        self.transaction()
            .replace_fields(
                self.config.users_graph(),
                &account.uri,
                codec::credential_fields(&credentials),
            )
            .await?;

        info!("Changed password of account {}", account.id);
        Ok(())
    }

    /// Check a plaintext password against an account's stored credentials.
    ///
    /// # Errors
    /// [`AccountError::NotFound`] or [`AccountError::CredentialsUnavailable`]
    /// from the credential lookup, and hasher failures.
    pub async fn verify_password(&self, account: &AccountRecord, password: &SecretString) -> Result<bool, AccountError> {
        let stored = self.directory().credentials_for(&account.uri).await?;
        Ok(self
            .hasher
            .verify(password.expose_secret(), stored.salt(), stored.digest())?)
    }

    /// # Errors
    /// Returns [`AccountError::Store`] if the store does not answer.
    pub async fn ping(&self) -> Result<(), AccountError> {
        self.directory().ping().await
    }

    async fn set_inactive(&self, account: &Iri) -> Result<(), AccountError> {
        self.transaction()
            .replace_fields(
                self.config.users_graph(),
                account,
                vec![codec::status_field(AccountStatus::Inactive)],
            )
            .await?;
        info!("Deactivated account {}", account.as_str());
        Ok(())
    }

    /// Point `session` at `account`, dropping any earlier binding.
    async fn bind_session(&self, session: &Iri, account: &Iri) -> Result<(), AccountError> {
        self.transaction()
            .replace_fields(
                self.config.sessions_graph(),
                session,
                vec![
                    (vocab::SESSION_ACCOUNT, account.clone().into()),
                    (vocab::MU_UUID, Literal::string(codec::allocate_id()).into()),
                ],
            )
            .await?;
        debug!("Bound session {} to {}", session.as_str(), account.as_str());
        Ok(())
    }

    /// Whether an account other than `owner` also holds `nickname`.
    async fn nickname_contested(&self, nickname: &str, owner: &Iri) -> Result<bool, AccountError> {
        let holders = self.directory().nickname_holders(nickname).await?;
        Ok(holders.iter().any(|holder| holder != owner))
    }
}

fn check_new_password(password: &SecretString, confirmation: &SecretString) -> Result<(), AccountError> {
    if password.expose_secret().is_empty() {
        return Err(AccountError::validation(PASSWORD_BLANK));
    }
    if password.expose_secret() != confirmation.expose_secret() {
        return Err(AccountError::validation(PASSWORD_MISMATCH));
    }
    Ok(())
}
