//! Coupon catalog: browsing, search, detail, and issuance.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::client::{ApiClient, Scope};
use crate::error::Error;
use crate::feed::Feed;
use crate::page::{Keyed, Page};
use crate::types::CouponId;

/// Items per catalog page, matching the backend's listing size.
pub const CATALOG_PAGE_SIZE: u32 = 10;

/// Catalog filter accepted by the listing endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CouponFilter {
    #[default]
    All,
    Ready,
    Issuing,
    Closed,
}

impl CouponFilter {
    /// Wire value for the `filterType` query parameter.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => "ALL",
            Self::Ready => "READY",
            Self::Issuing => "ISSUING",
            Self::Closed => "CLOSED",
        }
    }
}

/// A limited-quantity, time-windowed promotional entitlement.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct Coupon {
    pub id: CouponId,
    pub brand: String,
    pub title: String,
    pub summary: String,
    pub total_quantity: u32,
    pub issued_quantity: u32,
    /// Start of the issuance window.
    #[serde(with = "time::serde::rfc3339")]
    pub start_at: OffsetDateTime,
    /// End of the issuance window.
    #[serde(with = "time::serde::rfc3339")]
    pub end_at: OffsetDateTime,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl Coupon {
    /// Coupons left to claim.
    ///
    /// The quantity invariant (`issued <= total`) is server-enforced;
    /// a violation shows up here as a negative count on purpose rather
    /// than being clamped out of sight.
    #[must_use]
    pub fn remaining(&self) -> i64 {
        i64::from(self.total_quantity) - i64::from(self.issued_quantity)
    }

    #[must_use]
    pub fn is_sold_out(&self) -> bool {
        self.remaining() <= 0
    }

    /// Fraction of the stock already issued, for progress display.
    #[must_use]
    pub fn issued_ratio(&self) -> f64 {
        if self.total_quantity == 0 {
            0.0
        } else {
            f64::from(self.issued_quantity) / f64::from(self.total_quantity)
        }
    }

    /// Stage of this coupon at `now`, derived from the issuance window
    /// and the remaining stock.
    #[must_use]
    pub fn status_at(&self, now: OffsetDateTime) -> CouponStatus {
        if now < self.start_at {
            CouponStatus::Ready
        } else if now <= self.end_at && self.remaining() > 0 {
            CouponStatus::Issuing
        } else {
            CouponStatus::Closed
        }
    }
}

impl Keyed for Coupon {
    type Key = CouponId;

    fn key(&self) -> CouponId {
        self.id
    }
}

/// Lifecycle stage of a catalog coupon, derived client-side from the
/// window and stock. Not to be confused with the wallet's
/// server-authoritative status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CouponStatus {
    /// Issuance has not opened yet.
    Ready,
    /// Open and in stock.
    Issuing,
    /// Window over or stock exhausted.
    Closed,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct IssueRequest {
    coupon_id: CouponId,
}

impl ApiClient {
    /// Fetch one page of the coupon catalog.
    ///
    /// # Errors
    ///
    /// [`Error::Http`] on transport failure; [`Error::Api`] /
    /// [`Error::Decode`] on a malformed reply.
    pub async fn list_coupons(
        &self,
        page: u32,
        search: &str,
        filter: CouponFilter,
    ) -> Result<Page<Coupon>, Error> {
        let page: Page<Coupon> = self
            .get_with(
                "coupons",
                &[
                    ("page", page.to_string()),
                    ("size", CATALOG_PAGE_SIZE.to_string()),
                    ("search", search.to_string()),
                    ("filterType", filter.as_str().to_string()),
                ],
                Scope::Service,
            )
            .await?;
        page.flag_suspect();
        Ok(page)
    }

    /// Fetch one coupon, serving the cached copy when the detail was
    /// read before and no issuance invalidated it since.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] when the id does not exist.
    pub async fn coupon_detail(&self, id: CouponId) -> Result<Coupon, Error> {
        if let Some(hit) = self.cache.detail(id) {
            tracing::debug!(coupon = %id, "coupon detail served from cache");
            return Ok(hit);
        }
        let coupon: Coupon = self
            .get(&format!("coupons/{id}"), Scope::Service)
            .await?;
        self.cache.store_detail(&coupon);
        Ok(coupon)
    }

    /// Claim a coupon for the signed-in account.
    ///
    /// On success the cached detail for this coupon and every cached
    /// wallet listing are invalidated, so the next reads reflect the
    /// claim. Catalog feeds are left untouched until re-fetched.
    ///
    /// # Errors
    ///
    /// [`Error::Conflict`] when the coupon is sold out or was already
    /// claimed by this account; [`Error::SessionExpired`] when not
    /// signed in.
    pub async fn issue_coupon(&self, id: CouponId) -> Result<(), Error> {
        self.post_unit("coupon-issues", &IssueRequest { coupon_id: id }, Scope::Service)
            .await?;
        self.cache.invalidate_issued(id);
        tracing::info!(coupon = %id, "coupon issued");
        Ok(())
    }
}

// ── Infinite scroll ────────────────────────────────────────────────

/// Search and filter selection identifying one catalog listing session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogQuery {
    pub search: String,
    pub filter: CouponFilter,
}

/// Infinite-scroll aggregation over the coupon catalog.
///
/// Call [`load_more`](Self::load_more) from the scroll-proximity
/// signal; duplicate signals while a page is in flight are absorbed,
/// and nothing is fetched past the last page.
pub struct CatalogFeed {
    feed: Feed<CatalogQuery, Coupon>,
}

impl Default for CatalogFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl CatalogFeed {
    #[must_use]
    pub fn new() -> Self {
        Self {
            feed: Feed::new(CatalogQuery::default()),
        }
    }

    /// Replace the search term. Returns `true` when the listing was
    /// restarted (accumulated pages discarded).
    pub fn set_search(&mut self, search: impl Into<String>) -> bool {
        let mut query = self.feed.query().clone();
        query.search = search.into();
        self.feed.set_query(query)
    }

    /// Replace the filter. Returns `true` when the listing was
    /// restarted.
    pub fn set_filter(&mut self, filter: CouponFilter) -> bool {
        let mut query = self.feed.query().clone();
        query.filter = filter;
        self.feed.set_query(query)
    }

    /// Fetch and fold the next catalog page, if one is due.
    ///
    /// # Errors
    ///
    /// Propagates the listing operation's error unchanged; the feed
    /// stays retryable.
    pub async fn load_more(&mut self, client: &ApiClient) -> Result<bool, Error> {
        let query = self.feed.query().clone();
        self.feed
            .pump(|page| client.list_coupons(page, &query.search, query.filter))
            .await
    }

    #[must_use]
    pub fn coupons(&self) -> &[Coupon] {
        self.feed.items()
    }

    /// Trailing-loader flag.
    #[must_use]
    pub fn is_fetching(&self) -> bool {
        self.feed.is_fetching()
    }

    #[must_use]
    pub fn has_more(&self) -> bool {
        self.feed.has_more()
    }

    #[must_use]
    pub fn total_elements(&self) -> Option<u64> {
        self.feed.total_elements()
    }
}
