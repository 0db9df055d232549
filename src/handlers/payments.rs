use std::str::FromStr;

use actix_web::{web, HttpResponse};
use bigdecimal::BigDecimal;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::application::payment_service::{PaymentCallback, PaymentOutcome};
use crate::errors::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct PaymentCallbackRequest {
    pub order_number: String,
    /// Amount actually paid, as a decimal string.
    pub amount: String,
    pub transaction_id: String,
}

impl PaymentCallbackRequest {
    fn into_callback(self) -> Result<PaymentCallback, AppError> {
        if self.order_number.trim().is_empty() || self.transaction_id.trim().is_empty() {
            return Err(AppError::BadRequest(
                "order_number and transaction_id are required".to_string(),
            ));
        }
        let amount = BigDecimal::from_str(self.amount.trim())
            .map_err(|_| AppError::BadRequest(format!("invalid amount '{}'", self.amount)))?;
        Ok(PaymentCallback {
            order_number: self.order_number.trim().to_string(),
            amount,
            transaction_id: self.transaction_id.trim().to_string(),
        })
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PaymentCallbackResponse {
    pub order_number: String,
    pub status: String,
    /// True when the order had already been paid and nothing changed.
    pub duplicate: bool,
}

/// POST /payments/callback
///
/// Called by the payment provider once a payment settles. Safe to retry.
#[utoipa::path(
    post,
    path = "/payments/callback",
    request_body = PaymentCallbackRequest,
    responses(
        (status = 200, description = "Payment recorded", body = PaymentCallbackResponse),
        (status = 404, description = "Unknown order number"),
        (status = 409, description = "Order was cancelled before the payment arrived"),
        (status = 422, description = "Paid amount differs from the order total"),
    ),
    tag = "payments"
)]
pub async fn payment_callback(
    state: web::Data<AppState>,
    body: web::Json<PaymentCallbackRequest>,
) -> Result<HttpResponse, AppError> {
    let callback = body.into_inner().into_callback()?;

    let outcome =
        web::block(move || state.payments.confirm_payment(callback, Utc::now())).await??;

    let (order, duplicate) = match outcome {
        PaymentOutcome::Applied(order) => (order, false),
        PaymentOutcome::AlreadyPaid(order) => (order, true),
    };
    Ok(HttpResponse::Ok().json(PaymentCallbackResponse {
        order_number: order.number,
        status: order.status.as_str().to_string(),
        duplicate,
    }))
}
