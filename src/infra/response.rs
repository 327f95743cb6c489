//! The success envelope.

use crate::feature::item::item_model::{Item, PagedItems};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A successful response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[aliases(ItemResponse = ApiResponse<Item>, PagedItemsResponse = ApiResponse<PagedItems>)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct ApiResponse<T> {
    /// Always `true`.
    pub success: bool,
    /// A human readable note about what happened.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// The payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    /// A response carrying only data.
    pub fn data(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
        }
    }

    /// A response carrying data and a message.
    pub fn with_message(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    /// A response carrying only a message.
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_fields_are_omitted() {
        let json = serde_json::to_value(ApiResponse::message("item deleted")).unwrap();
        assert_eq!(
            serde_json::json!({ "success": true, "message": "item deleted" }),
            json
        );
    }
}
