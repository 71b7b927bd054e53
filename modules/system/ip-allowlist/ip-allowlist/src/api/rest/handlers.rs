use std::sync::Arc;

use axum::Extension;
use axum::Json;
use axum::extract::Path;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use portal_security::Identity;

use super::dto::{AllowListEntryDto, CreateAllowListEntryRequest, UpdateAllowListEntryRequest};
use super::error::ApiError;
use crate::domain::AllowListService;

pub async fn list_entries(
    Extension(svc): Extension<Arc<AllowListService>>,
) -> Result<Json<Vec<AllowListEntryDto>>, ApiError> {
    let entries = svc.list().await?;
    Ok(Json(entries.into_iter().map(Into::into).collect()))
}

pub async fn create_entry(
    Extension(svc): Extension<Arc<AllowListService>>,
    Extension(identity): Extension<Identity>,
    payload: Result<Json<CreateAllowListEntryRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AllowListEntryDto>), ApiError> {
    let Json(req) = payload?;
    let entry = svc
        .add(req.into(), Some(identity.user_id().to_owned()))
        .await?;
    Ok((StatusCode::CREATED, Json(entry.into())))
}

pub async fn update_entry(
    Extension(svc): Extension<Arc<AllowListService>>,
    Path(id): Path<i64>,
    payload: Result<Json<UpdateAllowListEntryRequest>, JsonRejection>,
) -> Result<Json<AllowListEntryDto>, ApiError> {
    let Json(req) = payload?;
    let entry = svc.update(id, req.into()).await?;
    Ok(Json(entry.into()))
}

pub async fn delete_entry(
    Extension(svc): Extension<Arc<AllowListService>>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    svc.remove(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
