//! Infinite-scroll aggregation of paginated listings.
//!
//! One [`Feed`] owns the accumulated items for one active query key.
//! Changing the key discards everything and restarts from page zero;
//! within a key's lifetime the list only grows, in server order, with
//! duplicates dropped. The machine is pure state — network drivers sit
//! in the domain modules and feed pages in through [`Feed::complete`].

use std::collections::HashSet;
use std::future::Future;

use crate::error::Error;
use crate::page::{Keyed, Page};

/// Permission to fetch one specific page for one specific query epoch.
///
/// Handed out by [`Feed::begin_fetch`] only when no fetch is in flight
/// and more pages remain, so holding a ticket proves the request is not
/// a duplicate. A ticket outlives a query change harmlessly: the feed
/// ignores completions stamped with a superseded epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub struct FetchTicket {
    page: u32,
    epoch: u64,
}

impl FetchTicket {
    /// Zero-based page number to request.
    #[must_use]
    pub fn page(&self) -> u32 {
        self.page
    }
}

/// Deduplicated, order-preserving accumulation of pages for one query.
///
/// `Q` is the query key (search term, filter, ...); `T` the listed item.
pub struct Feed<Q, T: Keyed> {
    query: Q,
    /// Bumped on every key change; stale tickets carry an older value.
    epoch: u64,
    items: Vec<T>,
    seen: HashSet<T::Key>,
    next_page: u32,
    in_flight: bool,
    exhausted: bool,
    total_elements: Option<u64>,
}

impl<Q: PartialEq, T: Keyed> Feed<Q, T> {
    #[must_use]
    pub fn new(query: Q) -> Self {
        Self {
            query,
            epoch: 0,
            items: Vec::new(),
            seen: HashSet::new(),
            next_page: 0,
            in_flight: false,
            exhausted: false,
            total_elements: None,
        }
    }

    #[must_use]
    pub fn query(&self) -> &Q {
        &self.query
    }

    /// Switch to a new query key, discarding all accumulated pages.
    ///
    /// Returns `true` when the key actually changed; an identical key is
    /// a no-op so repeated UI events don't wipe the list.
    pub fn set_query(&mut self, query: Q) -> bool {
        if self.query == query {
            return false;
        }
        self.query = query;
        self.restart();
        true
    }

    fn restart(&mut self) {
        self.epoch += 1;
        self.items.clear();
        self.seen.clear();
        self.next_page = 0;
        self.in_flight = false;
        self.exhausted = false;
        self.total_elements = None;
    }

    /// Claim the next page fetch, if one is due.
    ///
    /// Returns `None` while a fetch is already in flight or once the
    /// server has reported the last page — a scroll signal arriving in
    /// either state is simply ignored.
    pub fn begin_fetch(&mut self) -> Option<FetchTicket> {
        if self.in_flight || self.exhausted {
            return None;
        }
        self.in_flight = true;
        Some(FetchTicket {
            page: self.next_page,
            epoch: self.epoch,
        })
    }

    /// Fold a fetched page into the feed.
    ///
    /// Content is appended in server order; an item whose key already
    /// appeared on an earlier page is dropped, first occurrence wins.
    /// Completions for a superseded query key are discarded whole.
    pub fn complete(&mut self, ticket: FetchTicket, page: Page<T>) {
        if ticket.epoch != self.epoch {
            tracing::debug!(page = ticket.page, "dropping page for a superseded query");
            return;
        }
        self.in_flight = false;
        self.next_page = page.page_number + 1;
        self.total_elements = Some(page.total_elements);
        if page.is_last {
            self.exhausted = true;
        }
        for item in page.content {
            if self.seen.insert(item.key()) {
                self.items.push(item);
            }
        }
    }

    /// Release the in-flight claim after a failed fetch so the caller
    /// may retry. Stale tickets are ignored.
    pub fn fail(&mut self, ticket: FetchTicket) {
        if ticket.epoch == self.epoch {
            self.in_flight = false;
        }
    }

    /// Run one fetch round against `fetch`, folding the result in.
    ///
    /// Returns `Ok(false)` when nothing was due (in flight or
    /// exhausted); errors release the claim and propagate unchanged.
    ///
    /// # Errors
    ///
    /// Whatever `fetch` returns, untouched — the feed never retries.
    pub async fn pump<F, Fut>(&mut self, fetch: F) -> Result<bool, Error>
    where
        F: FnOnce(u32) -> Fut,
        Fut: Future<Output = Result<Page<T>, Error>>,
    {
        let Some(ticket) = self.begin_fetch() else {
            return Ok(false);
        };
        match fetch(ticket.page()).await {
            Ok(page) => {
                self.complete(ticket, page);
                Ok(true)
            }
            Err(e) => {
                self.fail(ticket);
                Err(e)
            }
        }
    }

    /// The flattened, deduplicated sequence accumulated so far.
    #[must_use]
    pub fn items(&self) -> &[T] {
        &self.items
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// True while a page request is outstanding — the trailing-loader
    /// flag.
    #[must_use]
    pub fn is_fetching(&self) -> bool {
        self.in_flight
    }

    #[must_use]
    pub fn has_more(&self) -> bool {
        !self.exhausted
    }

    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Server-reported total for the current key, once a page arrived.
    #[must_use]
    pub fn total_elements(&self) -> Option<u64> {
        self.total_elements
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Item(u32);

    impl Keyed for Item {
        type Key = u32;

        fn key(&self) -> u32 {
            self.0
        }
    }

    fn page(ids: &[u32], number: u32, last: bool) -> Page<Item> {
        Page::new(ids.iter().map(|&i| Item(i)).collect(), number, last, 3, 9)
    }

    fn ids(feed: &Feed<&str, Item>) -> Vec<u32> {
        feed.items().iter().map(|i| i.0).collect()
    }

    #[test]
    fn folds_pages_in_order() {
        let mut feed = Feed::new("q");
        let t = feed.begin_fetch().unwrap();
        assert_eq!(t.page(), 0);
        feed.complete(t, page(&[1, 2, 3], 0, false));

        let t = feed.begin_fetch().unwrap();
        assert_eq!(t.page(), 1);
        feed.complete(t, page(&[4, 5], 1, true));

        assert_eq!(ids(&feed), vec![1, 2, 3, 4, 5]);
        assert!(feed.is_exhausted());
        assert_eq!(feed.total_elements(), Some(9));
    }

    #[test]
    fn overlapping_page_boundary_dedups_first_wins() {
        // Concurrent server-side writes can shift item boundaries
        // between fetches and re-serve an id on the next page.
        let mut feed = Feed::new("q");
        let t = feed.begin_fetch().unwrap();
        feed.complete(t, page(&[1, 2, 3], 0, false));
        let t = feed.begin_fetch().unwrap();
        feed.complete(t, page(&[3, 4, 5], 1, false));

        assert_eq!(ids(&feed), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn single_fetch_in_flight() {
        let mut feed: Feed<&str, Item> = Feed::new("q");
        let first = feed.begin_fetch().unwrap();
        assert!(feed.begin_fetch().is_none());
        assert!(feed.is_fetching());

        feed.complete(first, page(&[1], 0, false));
        assert!(!feed.is_fetching());
        assert!(feed.begin_fetch().is_some());
    }

    #[test]
    fn exhausted_feed_ignores_further_scroll_signals() {
        let mut feed = Feed::new("q");
        let t = feed.begin_fetch().unwrap();
        feed.complete(t, page(&[1, 2], 0, true));

        assert!(!feed.has_more());
        assert!(feed.begin_fetch().is_none());
    }

    #[test]
    fn failed_fetch_releases_claim() {
        let mut feed: Feed<&str, Item> = Feed::new("q");
        let t = feed.begin_fetch().unwrap();
        feed.fail(t);
        assert!(!feed.is_fetching());
        assert!(feed.begin_fetch().is_some());
    }

    #[test]
    fn query_change_discards_accumulated_pages() {
        let mut feed = Feed::new("old");
        let t = feed.begin_fetch().unwrap();
        feed.complete(t, page(&[1, 2, 3], 0, false));

        assert!(feed.set_query("new"));
        assert!(feed.is_empty());
        assert!(feed.has_more());
        assert_eq!(feed.total_elements(), None);
        assert_eq!(feed.begin_fetch().unwrap().page(), 0);
    }

    #[test]
    fn unchanged_query_keeps_pages() {
        let mut feed = Feed::new("same");
        let t = feed.begin_fetch().unwrap();
        feed.complete(t, page(&[1], 0, false));

        assert!(!feed.set_query("same"));
        assert_eq!(feed.len(), 1);
    }

    #[test]
    fn stale_ticket_completion_is_discarded() {
        let mut feed = Feed::new("old");
        let stale = feed.begin_fetch().unwrap();
        feed.set_query("new");
        feed.complete(stale, page(&[9, 9, 9], 0, true));

        assert!(feed.is_empty());
        assert!(feed.has_more());
        // The new key still gets its own page 0.
        assert_eq!(feed.begin_fetch().unwrap().page(), 0);
    }

    #[test]
    fn stale_ticket_failure_keeps_new_claim() {
        let mut feed: Feed<&str, Item> = Feed::new("old");
        let stale = feed.begin_fetch().unwrap();
        feed.set_query("new");
        let fresh = feed.begin_fetch().unwrap();
        feed.fail(stale);
        // The stale failure must not release the fresh claim.
        assert!(feed.is_fetching());
        feed.complete(fresh, page(&[1], 0, true));
        assert_eq!(feed.len(), 1);
    }

    #[tokio::test]
    async fn pump_fetches_and_folds() {
        let mut feed = Feed::new("q");
        let grew = feed
            .pump(|n| async move {
                assert_eq!(n, 0);
                Ok(page(&[1, 2], 0, false))
            })
            .await
            .unwrap();
        assert!(grew);
        assert_eq!(ids(&feed), vec![1, 2]);
    }

    #[tokio::test]
    async fn pump_on_exhausted_feed_is_a_no_op() {
        let mut feed = Feed::new("q");
        let t = feed.begin_fetch().unwrap();
        feed.complete(t, page(&[1], 0, true));

        let grew = feed
            .pump(|_| async move { panic!("must not fetch past the last page") })
            .await
            .unwrap();
        assert!(!grew);
    }

    #[tokio::test]
    async fn pump_error_propagates_and_releases_claim() {
        let mut feed: Feed<&str, Item> = Feed::new("q");
        let err = feed
            .pump(|_| async move { Err(Error::NotFound) })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound));
        assert!(!feed.is_fetching());
    }
}
