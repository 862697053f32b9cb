//! Product API handlers

use axum::Json;
use axum::extract::{Path, Query, State};
use chrono::Local;
use serde::Deserialize;

use shared::error::{AppError, AppResult, ErrorCode};

use crate::api::AppJson;
use crate::core::ServerState;
use crate::db::models::{Product, ProductCreate};
use crate::db::repository::ProductRepository;
use crate::services::{ConsumeOutcome, ProductRef, VerifyOutcome};

/// Query for `GET /productos/verificar`: exactly one of the two
/// parameters identifies the product
#[derive(Debug, Deserialize)]
pub struct VerifyQuery {
    pub uuid: Option<String>,
    pub url: Option<String>,
}

/// POST /productos/insertar
pub async fn insert(
    State(state): State<ServerState>,
    AppJson(payload): AppJson<ProductCreate>,
) -> AppResult<Json<Product>> {
    let repo = ProductRepository::new(state.get_db(), state.ids.clone());
    let product = repo.create(payload).await?;

    tracing::info!(
        product = %product.key(),
        lot = %product.lot_name,
        "Product inserted"
    );

    Ok(Json(product))
}

/// GET /productos/{uuid}
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(uuid): Path<String>,
) -> AppResult<Json<Product>> {
    let repo = ProductRepository::new(state.get_db(), state.ids.clone());
    let product = repo
        .find_by_id(&uuid)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::ProductNotFound).with_detail("uuid", uuid))?;

    Ok(Json(product))
}

/// GET /productos/verificar?uuid=... | ?url=...
///
/// When both parameters are present the uuid wins.
pub async fn verify(
    State(state): State<ServerState>,
    Query(query): Query<VerifyQuery>,
) -> AppResult<Json<VerifyOutcome>> {
    let reference = match (query.uuid, query.url) {
        (Some(uuid), _) => ProductRef::Uuid(uuid),
        (None, Some(url)) => ProductRef::ImageUrl(url),
        (None, None) => {
            return Err(AppError::invalid_request(
                "Either 'uuid' or 'url' query parameter is required",
            ));
        }
    };

    let today = Local::now().date_naive();
    let outcome = state.expiry.verify(reference, today).await?;
    Ok(Json(outcome))
}

/// POST /productos/salida/{uuid}
pub async fn consume(
    State(state): State<ServerState>,
    Path(uuid): Path<String>,
) -> AppResult<Json<ConsumeOutcome>> {
    let today = Local::now().date_naive();
    let outcome = state.expiry.check_and_consume(&uuid, today).await?;
    Ok(Json(outcome))
}
