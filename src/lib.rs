//! A REST service for managing a catalog of sellable items.
//!
//! Requests flow from [`feature::item::item_api`] through the
//! [`feature::item::item_service::ItemService`] to an
//! [`feature::item::item_repository::ItemRepository`].

pub mod feature;
pub mod infra;
pub mod server;
