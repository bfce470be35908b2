//! Reservation HTTP handlers

use axum::extract::{Path, Query, State};
use axum::Extension;

use super::dto::*;
use crate::application::ParkingEngine;
use crate::domain::Principal;
use crate::interfaces::http::common::{ok, ApiResponse, ApiResult, ValidatedJson};

#[utoipa::path(
    get,
    path = "/api/v1/reservations",
    tag = "Reservations",
    security(("bearer_auth" = [])),
    params(ListReservationsQuery),
    responses(
        (status = 200, description = "Reservations, newest first", body = ApiResponse<Vec<ReservationDto>>),
        (status = 403, description = "`all=true` requires admin")
    )
)]
pub async fn list_reservations(
    State(engine): State<ParkingEngine>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<ListReservationsQuery>,
) -> ApiResult<Vec<ReservationDto>> {
    let reservations = if query.all {
        engine.list_all_reservations(&principal).await?
    } else {
        engine.list_my_reservations(&principal).await?
    };
    ok(reservations.into_iter().map(ReservationDto::from).collect())
}

#[utoipa::path(
    get,
    path = "/api/v1/reservations/{id}",
    tag = "Reservations",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Reservation ID")),
    responses(
        (status = 200, description = "Reservation", body = ApiResponse<ReservationDto>),
        (status = 404, description = "Not found or not yours")
    )
)]
pub async fn get_reservation(
    State(engine): State<ParkingEngine>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i32>,
) -> ApiResult<ReservationDto> {
    let reservation = engine.get_reservation(&principal, id).await?;
    ok(reservation.into())
}

#[utoipa::path(
    post,
    path = "/api/v1/reservations/{id}/check-in",
    tag = "Reservations",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Reservation ID")),
    responses(
        (status = 200, description = "Spot is now occupied", body = ApiResponse<ReservationDto>),
        (status = 404, description = "Not found or not yours"),
        (status = 409, description = "Already checked in or no longer active")
    )
)]
pub async fn check_in(
    State(engine): State<ParkingEngine>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i32>,
) -> ApiResult<ReservationDto> {
    let reservation = engine.check_in(&principal, id).await?;
    ok(reservation.into())
}

#[utoipa::path(
    post,
    path = "/api/v1/reservations/{id}/check-out",
    tag = "Reservations",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Reservation ID")),
    request_body = CheckOutRequest,
    responses(
        (status = 200, description = "Completed reservation with cost", body = ApiResponse<ReservationDto>),
        (status = 400, description = "End before start"),
        (status = 404, description = "Not found or not yours"),
        (status = 409, description = "Not checked in or no longer active")
    )
)]
pub async fn check_out(
    State(engine): State<ParkingEngine>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i32>,
    ValidatedJson(body): ValidatedJson<CheckOutRequest>,
) -> ApiResult<ReservationDto> {
    let reservation = engine
        .check_out(&principal, id, body.end_time_utc())
        .await?;
    ok(reservation.into())
}

#[utoipa::path(
    delete,
    path = "/api/v1/reservations/{id}",
    tag = "Reservations",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Reservation ID")),
    responses(
        (status = 200, description = "Snapshot of the cancelled reservation", body = ApiResponse<ReservationDto>),
        (status = 404, description = "Not found or not yours"),
        (status = 409, description = "Checked in or no longer active")
    )
)]
pub async fn cancel_reservation(
    State(engine): State<ParkingEngine>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i32>,
) -> ApiResult<ReservationDto> {
    let reservation = engine.cancel(&principal, id).await?;
    ok(reservation.into())
}
