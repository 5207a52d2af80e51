use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};

/// Catalog coupon identifier.
///
/// Assigned by the backend; stable across catalog pages and the detail
/// endpoint, and the value posted when claiming a coupon.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, From, Into,
)]
#[serde(transparent)]
pub struct CouponId(pub i64);

/// Identifier of one claimed coupon in a user's wallet.
///
/// Distinct from [`CouponId`]: the same catalog coupon claimed by two
/// users yields two different issued ids.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, From, Into,
)]
#[serde(transparent)]
pub struct IssuedCouponId(pub i64);

/// Account identifier assigned by the backend at signup.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, From, Into,
)]
#[serde(transparent)]
pub struct UserId(pub i64);

/// Account record returned by the auth endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    /// Display name shown in the wallet header.
    pub name: String,
}
