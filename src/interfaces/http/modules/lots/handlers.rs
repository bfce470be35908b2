//! Lot, capacity and spot HTTP handlers

use axum::extract::{Path, State};
use axum::Extension;

use super::dto::*;
use crate::application::ParkingEngine;
use crate::domain::Principal;
use crate::interfaces::http::common::{ok, ApiResponse, ApiResult, ValidatedJson};
use crate::interfaces::http::modules::reservations::dto::{AllocateRequest, ReservationDto};

#[utoipa::path(
    get,
    path = "/api/v1/lots",
    tag = "Lots",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "All lots with spot counts", body = ApiResponse<Vec<LotDto>>))
)]
pub async fn list_lots(State(engine): State<ParkingEngine>) -> ApiResult<Vec<LotDto>> {
    let lots = engine.list_lots().await?;
    ok(lots.into_iter().map(LotDto::from).collect())
}

#[utoipa::path(
    post,
    path = "/api/v1/lots",
    tag = "Lots",
    security(("bearer_auth" = [])),
    request_body = CreateLotRequest,
    responses(
        (status = 200, description = "Lot created", body = ApiResponse<LotDto>),
        (status = 400, description = "Invalid price"),
        (status = 403, description = "Admin only"),
        (status = 422, description = "Validation error")
    )
)]
pub async fn create_lot(
    State(engine): State<ParkingEngine>,
    Extension(principal): Extension<Principal>,
    ValidatedJson(body): ValidatedJson<CreateLotRequest>,
) -> ApiResult<LotDto> {
    let lot = engine.create_lot(&principal, body.into()).await?;
    ok(lot.into())
}

#[utoipa::path(
    get,
    path = "/api/v1/lots/{id}",
    tag = "Lots",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Lot ID")),
    responses(
        (status = 200, description = "Lot with spot counts", body = ApiResponse<LotDto>),
        (status = 404, description = "Lot not found")
    )
)]
pub async fn get_lot(State(engine): State<ParkingEngine>, Path(id): Path<i32>) -> ApiResult<LotDto> {
    let view = engine.get_lot(id).await?;
    ok(view.into())
}

#[utoipa::path(
    delete,
    path = "/api/v1/lots/{id}",
    tag = "Lots",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Lot ID")),
    responses(
        (status = 200, description = "Deleted lot", body = ApiResponse<LotDto>),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Lot not found"),
        (status = 409, description = "A spot is reserved or occupied")
    )
)]
pub async fn delete_lot(
    State(engine): State<ParkingEngine>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i32>,
) -> ApiResult<LotDto> {
    let lot = engine.delete_lot(&principal, id).await?;
    ok(lot.into())
}

#[utoipa::path(
    post,
    path = "/api/v1/lots/{id}/grow",
    tag = "Capacity",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Lot ID")),
    request_body = SpotCountRequest,
    responses(
        (status = 200, description = "Lot after growing", body = ApiResponse<LotDto>),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Lot not found")
    )
)]
pub async fn grow_lot(
    State(engine): State<ParkingEngine>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i32>,
    ValidatedJson(body): ValidatedJson<SpotCountRequest>,
) -> ApiResult<LotDto> {
    let lot = engine.grow(&principal, id, body.count).await?;
    ok(lot.into())
}

#[utoipa::path(
    post,
    path = "/api/v1/lots/{id}/shrink",
    tag = "Capacity",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Lot ID")),
    request_body = SpotCountRequest,
    responses(
        (status = 200, description = "Lot after shrinking", body = ApiResponse<LotDto>),
        (status = 403, description = "Admin only"),
        (status = 409, description = "Not enough available spots")
    )
)]
pub async fn shrink_lot(
    State(engine): State<ParkingEngine>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i32>,
    ValidatedJson(body): ValidatedJson<SpotCountRequest>,
) -> ApiResult<LotDto> {
    let lot = engine.shrink(&principal, id, body.count).await?;
    ok(lot.into())
}

#[utoipa::path(
    put,
    path = "/api/v1/lots/{id}/capacity",
    tag = "Capacity",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Lot ID")),
    request_body = ResizeRequest,
    responses(
        (status = 200, description = "Lot at the requested capacity", body = ApiResponse<LotDto>),
        (status = 403, description = "Admin only"),
        (status = 409, description = "Not enough available spots to shrink")
    )
)]
pub async fn resize_lot(
    State(engine): State<ParkingEngine>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i32>,
    ValidatedJson(body): ValidatedJson<ResizeRequest>,
) -> ApiResult<LotDto> {
    let lot = engine.resize(&principal, id, body.capacity).await?;
    ok(lot.into())
}

#[utoipa::path(
    get,
    path = "/api/v1/lots/{id}/spots",
    tag = "Spots",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Lot ID")),
    responses(
        (status = 200, description = "Spots ordered by id", body = ApiResponse<Vec<SpotDto>>),
        (status = 404, description = "Lot not found")
    )
)]
pub async fn list_spots(
    State(engine): State<ParkingEngine>,
    Path(id): Path<i32>,
) -> ApiResult<Vec<SpotDto>> {
    let spots = engine.list_spots(id).await?;
    ok(spots.into_iter().map(SpotDto::from).collect())
}

#[utoipa::path(
    get,
    path = "/api/v1/lots/{id}/spots/details",
    tag = "Spots",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Lot ID")),
    responses(
        (status = 200, description = "Spots with their active reservation", body = ApiResponse<Vec<SpotDetailDto>>),
        (status = 403, description = "Admin only")
    )
)]
pub async fn list_spot_details(
    State(engine): State<ParkingEngine>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i32>,
) -> ApiResult<Vec<SpotDetailDto>> {
    let details = engine.list_spots_with_reservations(&principal, id).await?;
    ok(details.into_iter().map(SpotDetailDto::from).collect())
}

#[utoipa::path(
    post,
    path = "/api/v1/lots/{id}/reservations",
    tag = "Reservations",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Lot ID")),
    request_body = AllocateRequest,
    responses(
        (status = 200, description = "Reservation on the lowest free spot", body = ApiResponse<ReservationDto>),
        (status = 404, description = "Lot not found"),
        (status = 409, description = "No available spots")
    )
)]
pub async fn allocate(
    State(engine): State<ParkingEngine>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i32>,
    ValidatedJson(body): ValidatedJson<AllocateRequest>,
) -> ApiResult<ReservationDto> {
    let start_time = body.start_time_utc();
    let reservation = engine
        .allocate(&principal, id, start_time, body.vehicle_number)
        .await?;
    ok(reservation.into())
}
