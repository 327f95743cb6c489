//! The item entity.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use utoipa::ToSchema;

/// Whether an item can currently be sold.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum ItemStatus {
    /// In stock.
    Active,
    /// Out of stock.
    Inactive,
}

impl ItemStatus {
    /// The status an item with `stock` units has.
    pub fn for_stock(stock: i64) -> Self {
        if stock == 0 {
            Self::Inactive
        } else {
            Self::Active
        }
    }

    /// The stored representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Inactive => "INACTIVE",
        }
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A string that is not a known [`ItemStatus`].
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
#[error("unknown item status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for ItemStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("ACTIVE") {
            Ok(Self::Active)
        } else if s.eq_ignore_ascii_case("INACTIVE") {
            Ok(Self::Inactive)
        } else {
            Err(UnknownStatus(s.to_string()))
        }
    }
}

/// The caller supplied fields of an item.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ItemFields {
    /// Unique item code.
    pub code: String,
    /// Display title.
    pub title: String,
    /// Free text description.
    pub description: String,
    /// Price in the smallest currency unit.
    pub price: i64,
    /// Units in stock.
    pub stock: i64,
}

/// A catalog item.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    /// The item's id, `0` until the item has been stored.
    #[schema(example = 1)]
    pub id: i64,
    /// Unique item code.
    #[schema(example = "SKU-0001")]
    pub code: String,
    /// Display title.
    #[schema(example = "Mechanical keyboard")]
    pub title: String,
    /// Free text description.
    #[schema(example = "A keyboard with brown switches")]
    pub description: String,
    /// Price in the smallest currency unit.
    #[schema(example = 15990)]
    pub price: i64,
    /// Units in stock.
    #[schema(example = 3)]
    pub stock: i64,
    /// Derived from `stock`.
    pub status: ItemStatus,
    /// When the item was created.
    pub created_at: DateTime<Utc>,
    /// When the item was last changed.
    pub updated_at: DateTime<Utc>,
}

/// The current time at the microsecond precision of `TIMESTAMPTZ`.
fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

impl Item {
    /// Builds an unsaved item. Does not validate.
    pub fn new(fields: ItemFields) -> Self {
        let now = now();
        Self {
            id: 0,
            status: ItemStatus::for_stock(fields.stock),
            code: fields.code,
            title: fields.title,
            description: fields.description,
            price: fields.price,
            stock: fields.stock,
            created_at: now,
            updated_at: now,
        }
    }

    /// Sets the stock level and the status that follows from it.
    pub fn update_stock(&mut self, stock: i64) {
        self.stock = stock;
        self.status = ItemStatus::for_stock(stock);
        self.updated_at = now();
    }

    /// Replaces every mutable field.
    pub fn update_fields(&mut self, fields: ItemFields) {
        self.code = fields.code;
        self.title = fields.title;
        self.description = fields.description;
        self.price = fields.price;
        self.update_stock(fields.stock);
    }
}

/// One page of items.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PagedItems {
    /// Number of pages available with the requested page size.
    pub total_pages: i64,
    /// Items on this page, most recently updated first.
    pub items: Vec<Item>,
}
