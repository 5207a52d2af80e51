//! The signed-in user's wallet of claimed coupons.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::client::{ApiClient, Scope};
use crate::error::Error;
use crate::page::{Keyed, Page};
use crate::types::{CouponId, IssuedCouponId};

/// Usage state of a claimed coupon.
///
/// Server-authoritative: the backend decides when a coupon flips to
/// used or expired, and the client never recomputes it from the expiry
/// stamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MyCouponStatus {
    Available,
    Used,
    Expired,
}

/// Wallet listing filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WalletFilter {
    #[default]
    All,
    Available,
    Used,
    Expired,
}

impl WalletFilter {
    /// Wire value for the `status` query parameter.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => "ALL",
            Self::Available => "AVAILABLE",
            Self::Used => "USED",
            Self::Expired => "EXPIRED",
        }
    }
}

/// A coupon held in the wallet.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct MyCoupon {
    pub id: IssuedCouponId,
    /// The catalog coupon this was claimed from.
    pub coupon_id: CouponId,
    pub brand: String,
    pub title: String,
    pub summary: String,
    pub total_quantity: u32,
    pub issued_quantity: u32,
    /// When the claimed coupon stops being usable.
    #[serde(with = "time::serde::rfc3339")]
    pub expire_at: OffsetDateTime,
    pub status: MyCouponStatus,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl MyCoupon {
    #[must_use]
    pub fn is_usable(&self) -> bool {
        self.status == MyCouponStatus::Available
    }
}

impl Keyed for MyCoupon {
    type Key = IssuedCouponId;

    fn key(&self) -> IssuedCouponId {
        self.id
    }
}

impl ApiClient {
    /// List the wallet, filtered by usage state and search term.
    ///
    /// Results are cached per (filter, search) key and served from
    /// cache until a successful issuance invalidates them.
    ///
    /// # Errors
    ///
    /// [`Error::SessionExpired`] when not signed in; [`Error::Http`] /
    /// [`Error::Decode`] on transport or payload faults.
    pub async fn my_coupons(
        &self,
        filter: WalletFilter,
        search: &str,
    ) -> Result<Page<MyCoupon>, Error> {
        let key = (filter, search.to_string());
        if let Some(hit) = self.cache.wallet(&key) {
            tracing::debug!(filter = filter.as_str(), "wallet served from cache");
            return Ok(hit);
        }
        let page: Page<MyCoupon> = self
            .get_with(
                "my/coupons",
                &[("status", filter.as_str()), ("search", search)],
                Scope::Service,
            )
            .await?;
        page.flag_suspect();
        self.cache.store_wallet(key, &page);
        Ok(page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_wire_values() {
        assert_eq!(WalletFilter::All.as_str(), "ALL");
        assert_eq!(WalletFilter::Available.as_str(), "AVAILABLE");
        assert_eq!(WalletFilter::Used.as_str(), "USED");
        assert_eq!(WalletFilter::Expired.as_str(), "EXPIRED");
    }

    #[test]
    fn status_decodes_screaming_case() {
        assert_eq!(
            serde_json::from_str::<MyCouponStatus>("\"AVAILABLE\"").unwrap(),
            MyCouponStatus::Available
        );
        assert_eq!(
            serde_json::from_str::<MyCouponStatus>("\"EXPIRED\"").unwrap(),
            MyCouponStatus::Expired
        );
        assert!(serde_json::from_str::<MyCouponStatus>("\"available\"").is_err());
    }

    #[test]
    fn decodes_wire_my_coupon() {
        let json = r#"{
            "id": 900,
            "couponId": 3,
            "brand": "CAFE",
            "title": "Americano",
            "summary": "One tall americano",
            "totalQuantity": 500,
            "issuedQuantity": 123,
            "expireAt": "2026-06-30T23:59:59Z",
            "status": "USED"
        }"#;
        let c: MyCoupon = serde_json::from_str(json).unwrap();
        assert_eq!(c.id, IssuedCouponId(900));
        assert_eq!(c.coupon_id, CouponId(3));
        assert_eq!(c.status, MyCouponStatus::Used);
        assert!(!c.is_usable());
        assert!(c.image_url.is_none());
    }
}
