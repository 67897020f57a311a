//! Write path. Every change to a stored fact goes through here.

use super::{codec, AccountError};
use crate::{
    sparql::{GraphStore, Iri, Term, Triple, TriplePattern, Update, Var},
    vocab,
};
use tracing::{debug, error, warn};

pub struct Transaction<'a, S> {
    store: &'a S,
}

impl<'a, S: GraphStore> Transaction<'a, S> {
    #[must_use]
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Insert a fresh set of statements in one request.
    ///
    /// If the insert fails, a best-effort delete of exactly those statements
    /// is issued before the insert error is returned.
    ///
    /// # Errors
    /// Returns [`AccountError::Store`] with the insert failure.
    pub async fn create(&self, graph: &Iri, triples: Vec<Triple>) -> Result<(), AccountError> {
        let insert = Update::new(graph).insert(triples.iter().cloned());
        match self.store.update(&insert).await {
            Ok(()) => Ok(()),
            Err(err) => {
                error!("Failed to insert {} statements: {}", triples.len(), err);
                let cleanup = Update::new(graph).delete(triples.into_iter().map(TriplePattern::from));
                if let Err(cleanup_err) = self.store.update(&cleanup).await {
                    warn!("Cleanup after failed insert also failed: {}", cleanup_err);
                }
                Err(err.into())
            }
        }
    }

    /// Replace the values of `fields` on `subject` and rewrite `dct:modified`.
    ///
    /// Every listed predicate loses all of its current values, then receives
    /// the given one. Unless the store applies combined requests atomically
    /// this is two requests, and a failure between them leaves the fields
    /// absent.
    ///
    /// # Errors
    /// Returns [`AccountError::Store`] if either request fails, or
    /// [`AccountError::Codec`] if the timestamp cannot be encoded.
    pub async fn replace_fields(
        &self,
        graph: &Iri,
        subject: &Iri,
        fields: Vec<(Iri, Term)>,
    ) -> Result<(), AccountError> {
        let stamp = codec::timestamp(codec::now()?)?;

        let mut predicates: Vec<Iri> = Vec::with_capacity(fields.len() + 1);
        for predicate in fields
            .iter()
            .map(|(predicate, _)| predicate)
            .chain(std::iter::once(&vocab::DCT_MODIFIED))
        {
            if !predicates.contains(predicate) {
                predicates.push(predicate.clone());
            }
        }

        let delete: Vec<TriplePattern> = predicates
            .into_iter()
            .enumerate()
            .map(|(index, predicate)| {
                TriplePattern::new(subject.clone(), predicate, Var::indexed("old", index))
            })
            .collect();

        let insert: Vec<Triple> = fields
            .into_iter()
            .map(|(predicate, object)| Triple::new(subject.clone(), predicate, object))
            .chain(std::iter::once(Triple::new(
                subject.clone(),
                vocab::DCT_MODIFIED,
                stamp,
            )))
            .collect();

        if self.store.atomic_updates() {
            debug!("Replacing {} fields on {} atomically", insert.len(), subject.as_str());
            self.store
                .update(&Update::new(graph).delete(delete).insert(insert))
                .await?;
            return Ok(());
        }

        self.store.update(&Update::new(graph).delete(delete)).await?;
        if let Err(err) = self.store.update(&Update::new(graph).insert(insert)).await {
            error!(
                "Deleted fields on {} but failed to insert replacements: {}",
                subject.as_str(),
                err
            );
            return Err(err.into());
        }
        Ok(())
    }

    /// Delete exactly `triples`.
    ///
    /// # Errors
    /// Returns [`AccountError::Store`] if the request fails.
    pub async fn remove(&self, graph: &Iri, triples: Vec<Triple>) -> Result<(), AccountError> {
        let delete = Update::new(graph).delete(triples.into_iter().map(TriplePattern::from));
        self.store.update(&delete).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sparql::{Literal, MemoryStore};
    use anyhow::Result;

    const GRAPH: Iri = Iri::from_static("http://mu.semte.ch/application");
    const OTHER_GRAPH: Iri = Iri::from_static("http://mu.semte.ch/graphs/other");
    const ACCOUNT: Iri = Iri::from_static("http://example.com/accounts/1");

    fn account_triples() -> Vec<Triple> {
        vec![
            Triple::new(ACCOUNT, vocab::FOAF_ACCOUNT_NAME, Literal::string("jane")),
            Triple::new(ACCOUNT, vocab::ACCOUNT_PASSWORD, Literal::string("digest")),
            Triple::new(ACCOUNT, vocab::ACCOUNT_SALT, Literal::string("salt")),
            Triple::new(ACCOUNT, vocab::ACCOUNT_STATUS, vocab::STATUS_ACTIVE),
        ]
    }

    #[tokio::test]
    async fn create_inserts_all_statements() -> Result<()> {
        let store = MemoryStore::new();
        Transaction::new(&store).create(&GRAPH, account_triples()).await?;
        assert_eq!(store.len(), 4);
        Ok(())
    }

    #[tokio::test]
    async fn failed_create_leaves_nothing_behind() {
        let store = MemoryStore::new();
        store.fail_next_updates(1);
        let result = Transaction::new(&store).create(&GRAPH, account_triples()).await;
        assert!(matches!(result, Err(AccountError::Store(_))));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn replace_fields_touches_only_named_predicates() -> Result<()> {
        let store = MemoryStore::new();
        let tx = Transaction::new(&store);
        tx.create(&GRAPH, account_triples()).await?;

        tx.replace_fields(
            &GRAPH,
            &ACCOUNT,
            vec![(vocab::FOAF_ACCOUNT_NAME, Literal::string("janet").into())],
        )
        .await?;

        assert_eq!(
            store.objects(&GRAPH, &ACCOUNT, &vocab::FOAF_ACCOUNT_NAME),
            vec![Term::from(Literal::string("janet"))]
        );
        assert_eq!(
            store.objects(&GRAPH, &ACCOUNT, &vocab::ACCOUNT_PASSWORD),
            vec![Term::from(Literal::string("digest"))]
        );
        assert_eq!(store.objects(&GRAPH, &ACCOUNT, &vocab::DCT_MODIFIED).len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn replace_fields_keeps_a_single_modified_value() -> Result<()> {
        let store = MemoryStore::new();
        let tx = Transaction::new(&store);
        tx.create(&GRAPH, account_triples()).await?;
        for status in [vocab::STATUS_INACTIVE, vocab::STATUS_INACTIVE] {
            tx.replace_fields(&GRAPH, &ACCOUNT, vec![(vocab::ACCOUNT_STATUS, status.into())])
                .await?;
        }
        assert_eq!(store.objects(&GRAPH, &ACCOUNT, &vocab::DCT_MODIFIED).len(), 1);
        assert_eq!(
            store.objects(&GRAPH, &ACCOUNT, &vocab::ACCOUNT_STATUS),
            vec![Term::from(vocab::STATUS_INACTIVE)]
        );
        Ok(())
    }

    #[tokio::test]
    async fn replace_fields_is_scoped_to_graph() -> Result<()> {
        let store = MemoryStore::new();
        let tx = Transaction::new(&store);
        tx.create(&GRAPH, account_triples()).await?;
        tx.create(&OTHER_GRAPH, account_triples()).await?;

        tx.replace_fields(
            &GRAPH,
            &ACCOUNT,
            vec![(vocab::ACCOUNT_STATUS, vocab::STATUS_INACTIVE.into())],
        )
        .await?;

        assert_eq!(
            store.objects(&OTHER_GRAPH, &ACCOUNT, &vocab::ACCOUNT_STATUS),
            vec![Term::from(vocab::STATUS_ACTIVE)]
        );
        Ok(())
    }

    #[tokio::test]
    async fn failure_between_delete_and_insert_leaves_fields_absent() -> Result<()> {
        let store = MemoryStore::new();
        let tx = Transaction::new(&store);
        tx.create(&GRAPH, account_triples()).await?;

        store.fail_after_updates(1);
        let result = tx
            .replace_fields(
                &GRAPH,
                &ACCOUNT,
                vec![
                    (vocab::ACCOUNT_PASSWORD, Literal::string("new-digest").into()),
                    (vocab::ACCOUNT_SALT, Literal::string("new-salt").into()),
                ],
            )
            .await;
        store.recover();

        assert!(matches!(result, Err(AccountError::Store(_))));
        assert!(store.objects(&GRAPH, &ACCOUNT, &vocab::ACCOUNT_PASSWORD).is_empty());
        assert!(store.objects(&GRAPH, &ACCOUNT, &vocab::ACCOUNT_SALT).is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn atomic_store_never_exposes_absent_fields() -> Result<()> {
        let store = MemoryStore::new().with_atomic_updates(true);
        let tx = Transaction::new(&store);
        tx.create(&GRAPH, account_triples()).await?;

        store.fail_next_updates(1);
        let result = tx
            .replace_fields(
                &GRAPH,
                &ACCOUNT,
                vec![(vocab::ACCOUNT_PASSWORD, Literal::string("new-digest").into())],
            )
            .await;

        assert!(result.is_err());
        assert_eq!(
            store.objects(&GRAPH, &ACCOUNT, &vocab::ACCOUNT_PASSWORD),
            vec![Term::from(Literal::string("digest"))]
        );
        Ok(())
    }

    #[tokio::test]
    async fn remove_deletes_exact_statements() -> Result<()> {
        let store = MemoryStore::new();
        let tx = Transaction::new(&store);
        tx.create(&GRAPH, account_triples()).await?;
        tx.remove(
            &GRAPH,
            vec![Triple::new(ACCOUNT, vocab::FOAF_ACCOUNT_NAME, Literal::string("jane"))],
        )
        .await?;
        assert_eq!(store.len(), 3);
        assert!(store.objects(&GRAPH, &ACCOUNT, &vocab::FOAF_ACCOUNT_NAME).is_empty());
        Ok(())
    }
}
