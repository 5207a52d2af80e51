//! Read-through cache for the views a successful issuance can stale.
//!
//! Coupon detail and wallet listings are the two read models that
//! disagree with each other after a claim: the detail's issued count
//! and the wallet's contents both change server-side. Issuance drops
//! the affected entries so the next read refetches; catalog feeds are
//! left alone and stay stale until their own refetch.

use dashmap::DashMap;

use crate::catalog::Coupon;
use crate::page::Page;
use crate::types::CouponId;
use crate::wallet::{MyCoupon, WalletFilter};

/// One wallet listing key: (status filter, search term).
pub(crate) type WalletKey = (WalletFilter, String);

pub(crate) struct QueryCache {
    details: DashMap<CouponId, Coupon>,
    wallet: DashMap<WalletKey, Page<MyCoupon>>,
}

impl QueryCache {
    pub(crate) fn new() -> Self {
        Self {
            details: DashMap::new(),
            wallet: DashMap::new(),
        }
    }

    pub(crate) fn detail(&self, id: CouponId) -> Option<Coupon> {
        self.details.get(&id).map(|entry| entry.value().clone())
    }

    pub(crate) fn store_detail(&self, coupon: &Coupon) {
        self.details.insert(coupon.id, coupon.clone());
    }

    pub(crate) fn wallet(&self, key: &WalletKey) -> Option<Page<MyCoupon>> {
        self.wallet.get(key).map(|entry| entry.value().clone())
    }

    pub(crate) fn store_wallet(&self, key: WalletKey, page: &Page<MyCoupon>) {
        self.wallet.insert(key, page.clone());
    }

    /// Drop everything a successful claim of `id` makes stale: that
    /// coupon's detail and every wallet listing.
    pub(crate) fn invalidate_issued(&self, id: CouponId) {
        self.details.remove(&id);
        self.wallet.clear();
    }
}
