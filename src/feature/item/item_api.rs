//! The item API implementation.

use super::item_model::{Item, ItemFields, ItemStatus, PagedItems};
use crate::infra::{
    error::{ApiResult, ClientError},
    extract::{Json, Query, ValidJson},
    pagination::lenient_int,
    response::ApiResponse,
    state::{AppState, DynItemService},
};
use axum::{extract::State, Router};
use axum_extra::routing::{RouterExt, TypedPath};
use http::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::instrument;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

/// The item API endpoints.
pub fn routes() -> Router<AppState> {
    Router::new()
        .typed_post(create_item)
        .typed_get(get_item)
        .typed_put(update_item)
        .typed_delete(delete_item)
        .typed_get(list_items)
}

#[derive(Deserialize, TypedPath)]
#[typed_path("/items", rejection(ClientError))]
struct Items;

#[derive(Deserialize, TypedPath)]
#[typed_path("/items/:id", rejection(ClientError))]
struct ItemsId(i64);

/// The body for creating or replacing an item.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema, Validate)]
pub struct ItemRequest {
    /// Unique item code.
    #[schema(example = "SKU-0001")]
    #[validate(length(min = 1))]
    pub code: String,
    /// Display title.
    #[schema(example = "Mechanical keyboard")]
    #[validate(length(min = 1))]
    pub title: String,
    /// Free text description.
    #[schema(example = "A keyboard with brown switches")]
    #[validate(length(min = 1))]
    pub description: String,
    /// Price in the smallest currency unit.
    #[schema(example = 15990)]
    #[validate(range(min = 1))]
    pub price: i64,
    /// Units in stock.
    #[schema(example = 3)]
    #[validate(range(min = 0))]
    pub stock: i64,
}

impl From<ItemRequest> for ItemFields {
    fn from(request: ItemRequest) -> Self {
        ItemFields {
            code: request.code,
            title: request.title,
            description: request.description,
            price: request.price,
            stock: request.stock,
        }
    }
}

/// Filtering and paging of the item list.
///
/// Unparsable numbers fall back to the defaults.
#[derive(Clone, Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListParams {
    /// Only items with this status (`ACTIVE` or `INACTIVE`).
    status: Option<String>,
    /// Items per page, 10 by default and at most 20.
    #[serde(default, deserialize_with = "lenient_int")]
    limit: Option<i64>,
    /// 1-indexed page number.
    #[serde(default, deserialize_with = "lenient_int")]
    page: Option<i64>,
}

impl ListParams {
    fn status(&self) -> Result<Option<ItemStatus>, ClientError> {
        match self.status.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(status) => status
                .parse::<ItemStatus>()
                .map(Some)
                .map_err(|e| ClientError::BadRequest(e.to_string())),
        }
    }
}

/// Creates a new item.
#[utoipa::path(
    post,
    path = "/v1/items",
    request_body = ItemRequest,
    responses(
        (status = 201, description = "Created", body = crate::infra::response::ItemResponse),
        (status = 400, description = "Bad Request", body = crate::infra::error::ErrorBody),
        (status = 409, description = "Conflict", body = crate::infra::error::ErrorBody),
        (status = 500, description = "Internal Server Error", body = crate::infra::error::ErrorBody),
    )
)]
#[instrument(skip_all)]
async fn create_item(
    Items: Items,
    State(items): State<DynItemService>,
    ValidJson(request): ValidJson<ItemRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<Item>>)> {
    let item = items.create_item(request.into_inner().into()).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message("item created", item)),
    ))
}

/// Gets an item.
#[utoipa::path(
    get,
    path = "/v1/items/{id}",
    params(("id" = i64, Path, description = "Item id")),
    responses(
        (status = 200, description = "Ok", body = crate::infra::response::ItemResponse),
        (status = 400, description = "Bad Request", body = crate::infra::error::ErrorBody),
        (status = 404, description = "Not Found", body = crate::infra::error::ErrorBody),
        (status = 500, description = "Internal Server Error", body = crate::infra::error::ErrorBody),
    )
)]
#[instrument(skip(items))]
async fn get_item(
    ItemsId(id): ItemsId,
    State(items): State<DynItemService>,
) -> ApiResult<Json<ApiResponse<Item>>> {
    let item = items.get_item(id).await?;
    Ok(Json(ApiResponse::data(item)))
}

/// Replaces an item.
#[utoipa::path(
    put,
    path = "/v1/items/{id}",
    params(("id" = i64, Path, description = "Item id")),
    request_body = ItemRequest,
    responses(
        (status = 200, description = "Ok", body = crate::infra::response::ItemResponse),
        (status = 400, description = "Bad Request", body = crate::infra::error::ErrorBody),
        (status = 404, description = "Not Found", body = crate::infra::error::ErrorBody),
        (status = 409, description = "Conflict", body = crate::infra::error::ErrorBody),
        (status = 500, description = "Internal Server Error", body = crate::infra::error::ErrorBody),
    )
)]
#[instrument(skip(items, request))]
async fn update_item(
    ItemsId(id): ItemsId,
    State(items): State<DynItemService>,
    ValidJson(request): ValidJson<ItemRequest>,
) -> ApiResult<Json<ApiResponse<Item>>> {
    let item = items.update_item(id, request.into_inner().into()).await?;
    Ok(Json(ApiResponse::with_message("item updated", item)))
}

/// Deletes an item.
#[utoipa::path(
    delete,
    path = "/v1/items/{id}",
    params(("id" = i64, Path, description = "Item id")),
    responses(
        (status = 200, description = "Ok", body = crate::infra::response::ItemResponse),
        (status = 400, description = "Bad Request", body = crate::infra::error::ErrorBody),
        (status = 404, description = "Not Found", body = crate::infra::error::ErrorBody),
        (status = 500, description = "Internal Server Error", body = crate::infra::error::ErrorBody),
    )
)]
#[instrument(skip(items))]
async fn delete_item(
    ItemsId(id): ItemsId,
    State(items): State<DynItemService>,
) -> ApiResult<Json<ApiResponse<()>>> {
    items.delete_item(id).await?;
    Ok(Json(ApiResponse::message("item deleted")))
}

/// Lists items, most recently updated first.
#[utoipa::path(
    get,
    path = "/v1/items",
    params(ListParams),
    responses(
        (status = 200, description = "Success", body = crate::infra::response::PagedItemsResponse),
        (status = 400, description = "Unknown status", body = crate::infra::error::ErrorBody),
        (status = 500, description = "Internal error", body = crate::infra::error::ErrorBody),
    )
)]
#[instrument(skip_all)]
async fn list_items(
    Items: Items,
    State(items): State<DynItemService>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<ApiResponse<PagedItems>>> {
    let status = params.status()?;
    let page = items
        .list_items(status, params.limit.unwrap_or(0), params.page.unwrap_or(0))
        .await?;
    Ok(Json(ApiResponse::data(page)))
}
