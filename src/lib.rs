#![doc = include_str!("../README.md")]

pub mod auth;
mod cache;
pub mod catalog;
pub mod client;
pub mod config;
pub mod error;
pub mod feed;
pub mod page;
pub mod session;
pub mod types;
pub mod wallet;

// Re-exports for convenient access
pub use auth::{AuthSession, LoginRequest, SignupRequest};
pub use catalog::{
    CATALOG_PAGE_SIZE, CatalogFeed, CatalogQuery, Coupon, CouponFilter, CouponStatus,
};
pub use client::ApiClient;
pub use config::ApiConfig;
pub use error::Error;
pub use feed::{Feed, FetchTicket};
pub use page::{Keyed, Page};
pub use session::{
    FileStorage, MemoryStorage, NoopEvents, PersistedSession, Session, SessionEvents,
    SessionStore, TokenStorage,
};
pub use types::{CouponId, IssuedCouponId, User, UserId};
pub use wallet::{MyCoupon, MyCouponStatus, WalletFilter};
