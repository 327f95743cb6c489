//! OpenAPI configuration.

use crate::feature::{
    info::info_api,
    item::{item_api, item_model},
};
use crate::infra::{error, response};
use utoipa::OpenApi;

/// OpenApi configuration.
#[derive(OpenApi)]
#[openapi(
    paths(
        info_api::info,
        item_api::create_item,
        item_api::get_item,
        item_api::update_item,
        item_api::delete_item,
        item_api::list_items,
    ),
    components(
        schemas(
            info_api::AppInfo,
            item_api::ItemRequest,
            item_model::Item,
            item_model::ItemStatus,
            item_model::PagedItems,
            response::ItemResponse,
            response::PagedItemsResponse,
            error::ErrorBody,
            error::ErrorKind,
        )
    ),
    tags((name = "items", description = "Catalog item management"))
)]
#[derive(Clone, Copy, Debug)]
pub struct ApiDoc;
