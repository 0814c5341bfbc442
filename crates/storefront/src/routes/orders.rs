//! Order history and returns.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Serialize;
use tracing::instrument;

use aerox_core::{OrderId, OrderStatus};

use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::Order;
use crate::services::OrderError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct MyOrdersResponse {
    pub orders: Vec<Order>,
}

/// GET /api/my-orders
///
/// # Errors
///
/// 500 on store failure.
pub async fn my_orders(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<MyOrdersResponse>> {
    let orders = state.orders().list_for_user(user.id).await?;
    Ok(Json(MyOrdersResponse { orders }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnResponse {
    pub message: &'static str,
    pub order_id: OrderId,
    pub status: OrderStatus,
}

/// POST /api/return/{orderId}
///
/// An id that is not a UUID cannot name an order, so it is a 404.
///
/// # Errors
///
/// 404, 403, or 400 when the order is missing, foreign, or already returned.
#[instrument(skip_all, fields(user_id = %user.id, order_id = %order_id))]
pub async fn initiate_return(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(order_id): Path<String>,
) -> Result<Json<ReturnResponse>> {
    let order_id: OrderId = order_id
        .parse()
        .map_err(|_| AppError::from(OrderError::NotFound))?;

    state.orders().initiate_return(order_id, user.id).await?;

    Ok(Json(ReturnResponse {
        message: "Return initiated successfully.",
        order_id,
        status: OrderStatus::ReturnInitiated,
    }))
}
