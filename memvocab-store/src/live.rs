//! Live (reactive) queries.
//!
//! A [`LiveQuery`] couples a read expression to the store's change feed:
//! the query runs once immediately, then re-runs after every committed
//! write that touches one of its collections, publishing each snapshot to
//! a watch channel. `current()` stays `None` until the first snapshot
//! lands, which doubles as the loading state. Dropping the handle aborts
//! the background task, so writes that complete afterwards go nowhere
//! instead of firing into a dead subscriber.

use crate::cards::CardStore;
use crate::db::{Collection, VocabDb};
use crate::decks::DeckStore;
use memvocab_core::{Card, CardRepository, CoreError, DeckRepository, DeckWithAmount};
use std::future::Future;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

pub struct LiveQuery<T> {
    rx: watch::Receiver<Option<T>>,
    task: JoinHandle<()>,
}

impl<T: Clone + Send + Sync + 'static> LiveQuery<T> {
    /// Subscribe `query` to every collection in `collections`. The query is
    /// re-evaluated from scratch on each matching change; a new filter
    /// parameter means dropping this handle and constructing a new one, so
    /// no stale snapshot can outlive its parameters.
    pub fn new<F, Fut>(db: &VocabDb, collections: Vec<Collection>, query: F) -> Self
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, CoreError>> + Send,
    {
        let mut changes = db.subscribe();
        let (tx, rx) = watch::channel(None);

        let task = tokio::spawn(async move {
            loop {
                match query().await {
                    Ok(snapshot) => {
                        if tx.send(Some(snapshot)).is_err() {
                            // Every receiver is gone.
                            return;
                        }
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "live query evaluation failed, keeping last snapshot");
                    }
                }

                loop {
                    match changes.recv().await {
                        Ok(ev) if collections.contains(&ev.collection) => break,
                        Ok(_) => continue,
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::debug!(skipped, "live query lagged, coalescing to one re-query");
                            break;
                        }
                        Err(broadcast::error::RecvError::Closed) => return,
                    }
                }
            }
        });

        Self { rx, task }
    }

    /// Latest snapshot, or `None` while the first evaluation is in flight.
    pub fn current(&self) -> Option<T> {
        self.rx.borrow().clone()
    }

    pub fn is_loading(&self) -> bool {
        self.rx.borrow().is_none()
    }

    /// Wait for the next snapshot. Returns `None` once the store (and with
    /// it the publishing task) has gone away.
    pub async fn next(&mut self) -> Option<T> {
        if self.rx.changed().await.is_err() {
            return None;
        }
        self.rx.borrow_and_update().clone()
    }
}

impl<T> Drop for LiveQuery<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl CardStore {
    /// Live view of one deck's cards.
    pub fn live_by_deck(&self, deck_id: &str) -> LiveQuery<Vec<Card>> {
        let repo = self.clone();
        let deck_id = deck_id.to_string();
        LiveQuery::new(self.db(), vec![Collection::Cards], move || {
            let repo = repo.clone();
            let deck_id = deck_id.clone();
            async move { repo.get_by_deck(&deck_id).await }
        })
    }

    /// Live search; each distinct query string is its own subscription.
    pub fn live_search(&self, query: &str, deck_id: Option<&str>) -> LiveQuery<Vec<Card>> {
        let repo = self.clone();
        let query = query.to_string();
        let deck_id = deck_id.map(str::to_string);
        LiveQuery::new(self.db(), vec![Collection::Cards], move || {
            let repo = repo.clone();
            let query = query.clone();
            let deck_id = deck_id.clone();
            async move { repo.search(&query, deck_id.as_deref()).await }
        })
    }

    pub fn live_count(&self, deck_id: Option<&str>) -> LiveQuery<usize> {
        let repo = self.clone();
        let deck_id = deck_id.map(str::to_string);
        LiveQuery::new(self.db(), vec![Collection::Cards], move || {
            let repo = repo.clone();
            let deck_id = deck_id.clone();
            async move { repo.count(deck_id.as_deref()).await }
        })
    }
}

impl DeckStore {
    /// Live view of all decks. Card writes re-trigger it too, since the
    /// computed `amount` depends on the card collection.
    pub fn live_all(&self) -> LiveQuery<Vec<DeckWithAmount>> {
        let repo = self.clone();
        LiveQuery::new(
            self.db(),
            vec![Collection::Decks, Collection::Cards],
            move || {
                let repo = repo.clone();
                async move { repo.get_all().await }
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use memvocab_core::{Card, Deck};
    use std::sync::Arc;
    use std::time::Duration;

    fn stores() -> (DeckStore, CardStore) {
        let db = Arc::new(VocabDb::in_memory());
        (DeckStore::new(db.clone()), CardStore::new(db))
    }

    fn card(id: &str, deck_id: &str, word: &str) -> Card {
        let mut c = Card::new(deck_id, word, word);
        c.id = id.into();
        c
    }

    async fn settled<T: Clone + Send + Sync + 'static>(live: &mut LiveQuery<T>) -> T {
        tokio::time::timeout(Duration::from_secs(2), live.next())
            .await
            .expect("live query timed out")
            .expect("live query task ended")
    }

    #[tokio::test]
    async fn snapshot_updates_after_writes_without_resubscribing() {
        let (_, cards) = stores();
        let mut live = cards.live_by_deck("d1");

        assert!(settled(&mut live).await.is_empty());

        cards.add(&card("c1", "d1", "Tak")).await.unwrap();
        assert_eq!(settled(&mut live).await.len(), 1);

        cards
            .save_all(&[card("c2", "d1", "Nie"), card("c3", "d1", "Tak")], Some("d1"))
            .await
            .unwrap();
        let snapshot = settled(&mut live).await;
        assert_eq!(snapshot.len(), 2);
        assert!(snapshot.iter().all(|c| c.id != "c1"));
    }

    #[tokio::test]
    async fn differently_filtered_subscriptions_stay_independent() {
        let (_, cards) = stores();
        let mut live_d1 = cards.live_by_deck("d1");
        let mut live_d2 = cards.live_by_deck("d2");
        settled(&mut live_d1).await;
        settled(&mut live_d2).await;

        cards.add(&card("c1", "d1", "Tak")).await.unwrap();

        assert_eq!(settled(&mut live_d1).await.len(), 1);
        // The other subscription re-ran too, and still correctly sees nothing.
        assert!(settled(&mut live_d2).await.is_empty());
    }

    #[tokio::test]
    async fn deck_view_reacts_to_card_writes() {
        let (decks, cards) = stores();
        let mut deck = Deck::new("Greetings", "Polish", "English");
        deck.id = "d1".into();
        decks.save(&deck).await.unwrap();

        let mut live = decks.live_all();
        let first = settled(&mut live).await;
        assert_eq!(first[0].amount, 0);

        cards.add(&card("c1", "d1", "Tak")).await.unwrap();
        let second = settled(&mut live).await;
        assert_eq!(second[0].amount, 1);
    }

    #[tokio::test]
    async fn live_search_tracks_matching_subset() {
        let (_, cards) = stores();
        let mut live = cards.live_search("tak", None);
        assert!(settled(&mut live).await.is_empty());

        cards.add(&card("c1", "d1", "Tak")).await.unwrap();
        cards.add(&card("c2", "d1", "Nie")).await.unwrap();

        // Each write re-runs the query; wait until the subset contains the hit.
        let mut snapshot = settled(&mut live).await;
        while snapshot.len() != 1 {
            snapshot = settled(&mut live).await;
        }
        assert_eq!(snapshot[0].id, "c1");
    }

    #[tokio::test]
    async fn dropped_handle_stops_its_task() {
        let (_, cards) = stores();
        let mut live = cards.live_by_deck("d1");
        settled(&mut live).await;
        drop(live);

        // A write after the subscriber is gone must not error.
        cards.add(&card("c1", "d1", "Tak")).await.unwrap();
        assert_eq!(cards.count(None).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn loading_until_first_snapshot() {
        let (_, cards) = stores();
        let mut live = cards.live_by_deck("d1");
        // Freshly constructed handles may not have evaluated yet; after the
        // first snapshot they are no longer loading.
        settled(&mut live).await;
        assert!(!live.is_loading());
        assert!(live.current().is_some());
    }
}
