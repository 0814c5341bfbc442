//! Checkout route handlers.
//!
//! - `POST /api/checkout`: signed-in, recorded as paid immediately
//! - `POST /api/smart-checkout`: any shopper, optional account creation
//! - `POST /api/create-payment-intent`: Stripe-backed, order written by the
//!   webhook

use axum::{Json, extract::State, http::StatusCode};
use rust_decimal::Decimal;
use serde::Serialize;
use tower_sessions::Session;
use tracing::instrument;

use aerox_core::{Email, OrderId, OrderStatus, UserId};

use crate::error::Result;
use crate::middleware::{AppJson, OptionalAuth, RequireAuth, set_current_user};
use crate::services::{CheckoutRequest, PlacedOrder};
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderCreatedResponse {
    pub message: &'static str,
    pub order_id: OrderId,
    pub status: OrderStatus,
    #[serde(rename = "total_price", with = "rust_decimal::serde::float")]
    pub total_price: Decimal,
}

impl OrderCreatedResponse {
    fn new(placed: &PlacedOrder) -> Self {
        Self {
            message: "Order created successfully.",
            order_id: placed.order_id,
            status: OrderStatus::Processed,
            total_price: placed.total,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SmartCheckoutResponse {
    #[serde(flatten)]
    pub order: OrderCreatedResponse,
    pub is_new_account: bool,
    pub is_guest: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<Email>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntentResponse {
    pub client_secret: String,
}

/// POST /api/checkout
///
/// # Errors
///
/// 400 on invalid items or address, 401 without a session.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn checkout(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    AppJson(body): AppJson<CheckoutRequest>,
) -> Result<(StatusCode, Json<OrderCreatedResponse>)> {
    let placed = state.checkout().checkout(&user, &body).await?;
    Ok((StatusCode::CREATED, Json(OrderCreatedResponse::new(&placed))))
}

/// POST /api/smart-checkout
///
/// A shopper who creates an account here is logged in by the response.
///
/// # Errors
///
/// 400 on invalid input, 409 with `EMAIL_EXISTS` for a taken email.
#[instrument(skip_all)]
pub async fn smart_checkout(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    AppJson(body): AppJson<CheckoutRequest>,
) -> Result<(StatusCode, Json<SmartCheckoutResponse>)> {
    let placed = state.checkout().smart_checkout(user.as_ref(), &body).await?;

    let email = match &placed.new_session {
        Some(new_user) => {
            set_current_user(&session, new_user).await?;
            Some(new_user.email.clone())
        }
        None => None,
    };

    Ok((
        StatusCode::CREATED,
        Json(SmartCheckoutResponse {
            order: OrderCreatedResponse::new(&placed),
            is_new_account: placed.is_new_account,
            is_guest: placed.user_id.is_none(),
            user_id: placed.user_id.filter(|_| placed.is_new_account),
            email,
        }),
    ))
}

/// POST /api/create-payment-intent
///
/// # Errors
///
/// 400 on invalid input, 409 for a taken account email, 500 if Stripe
/// refuses the intent.
#[instrument(skip_all)]
pub async fn create_payment_intent(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    AppJson(body): AppJson<CheckoutRequest>,
) -> Result<Json<PaymentIntentResponse>> {
    let client_secret = state
        .checkout()
        .create_payment_intent(user.as_ref(), &body)
        .await?;
    Ok(Json(PaymentIntentResponse { client_secret }))
}
