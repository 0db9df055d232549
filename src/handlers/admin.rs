use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::order::{Actor, OrderSearch, OrderStatistics, PageRequest};
use crate::errors::AppError;
use crate::handlers::identity::StaffId;
use crate::handlers::orders::{
    default_page, default_page_size, parse_status, ListOrdersResponse, OrderResponse,
    OrderStatusResponse,
};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_page_size")]
    pub page_size: i64,
    pub status: Option<String>,
    /// Substring of the order number.
    pub number: Option<String>,
    pub phone: Option<String>,
    pub begin_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ReasonRequest {
    pub reason: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StatisticsResponse {
    pub to_be_confirmed: i64,
    pub confirmed: i64,
    pub in_delivery: i64,
}

impl From<OrderStatistics> for StatisticsResponse {
    fn from(s: OrderStatistics) -> Self {
        StatisticsResponse {
            to_be_confirmed: s.to_be_confirmed,
            confirmed: s.confirmed,
            in_delivery: s.in_delivery,
        }
    }
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// GET /admin/orders
#[utoipa::path(
    get,
    path = "/admin/orders",
    params(
        ("page" = Option<i64>, Query, description = "Page number (1-based, default 1)"),
        ("page_size" = Option<i64>, Query, description = "Items per page (default 10, max 100)"),
        ("status" = Option<String>, Query, description = "Status filter"),
        ("number" = Option<String>, Query, description = "Order number fragment"),
        ("phone" = Option<String>, Query, description = "Consignee phone"),
        ("begin_time" = Option<String>, Query, description = "Submitted at or after (RFC 3339)"),
        ("end_time" = Option<String>, Query, description = "Submitted at or before (RFC 3339)"),
    ),
    responses(
        (status = 200, description = "Matching orders", body = ListOrdersResponse),
    ),
    tag = "admin"
)]
pub async fn search_orders(
    state: web::Data<AppState>,
    _staff: StaffId,
    query: web::Query<SearchParams>,
) -> Result<HttpResponse, AppError> {
    let params = query.into_inner();
    let filter = OrderSearch {
        user_id: None,
        status: parse_status(params.status)?,
        number: blank_to_none(params.number),
        phone: blank_to_none(params.phone),
        submitted_from: params.begin_time,
        submitted_to: params.end_time,
    };
    let page = PageRequest::new(params.page, params.page_size);

    let result = web::block(move || state.queries.search(&filter, page)).await??;

    Ok(HttpResponse::Ok().json(ListOrdersResponse::new(result, page)))
}

/// GET /admin/orders/statistics
///
/// Open order counts for the back-office dashboard.
#[utoipa::path(
    get,
    path = "/admin/orders/statistics",
    responses(
        (status = 200, description = "Counts per open status", body = StatisticsResponse),
    ),
    tag = "admin"
)]
pub async fn order_statistics(
    state: web::Data<AppState>,
    _staff: StaffId,
) -> Result<HttpResponse, AppError> {
    let stats = web::block(move || state.queries.statistics()).await??;

    Ok(HttpResponse::Ok().json(StatisticsResponse::from(stats)))
}

/// GET /admin/orders/{id}
#[utoipa::path(
    get,
    path = "/admin/orders/{id}",
    params(
        ("id" = Uuid, Path, description = "Order UUID"),
    ),
    responses(
        (status = 200, description = "Order found", body = OrderResponse),
        (status = 404, description = "Order not found"),
    ),
    tag = "admin"
)]
pub async fn admin_order_detail(
    state: web::Data<AppState>,
    staff: StaffId,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();

    let view = web::block(move || state.queries.detail(order_id, Actor::Staff(staff.0))).await??;

    Ok(HttpResponse::Ok().json(OrderResponse::from(view)))
}

/// PUT /admin/orders/{id}/confirm
#[utoipa::path(
    put,
    path = "/admin/orders/{id}/confirm",
    params(
        ("id" = Uuid, Path, description = "Order UUID"),
    ),
    responses(
        (status = 200, description = "Order confirmed", body = OrderStatusResponse),
        (status = 409, description = "Order is not awaiting confirmation"),
    ),
    tag = "admin"
)]
pub async fn confirm_order(
    state: web::Data<AppState>,
    staff: StaffId,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();

    let order = web::block(move || state.orders.confirm(order_id, Utc::now())).await??;

    log::info!("staff {} confirmed order {}", staff.0, order.number);
    Ok(HttpResponse::Ok().json(OrderStatusResponse::from(order)))
}

/// PUT /admin/orders/{id}/reject
///
/// Turns down a paid order. The payment is marked refunded.
#[utoipa::path(
    put,
    path = "/admin/orders/{id}/reject",
    params(
        ("id" = Uuid, Path, description = "Order UUID"),
    ),
    request_body = ReasonRequest,
    responses(
        (status = 200, description = "Order rejected", body = OrderStatusResponse),
        (status = 400, description = "Missing reason"),
        (status = 409, description = "Order is not awaiting confirmation"),
    ),
    tag = "admin"
)]
pub async fn reject_order(
    state: web::Data<AppState>,
    staff: StaffId,
    path: web::Path<Uuid>,
    body: web::Json<ReasonRequest>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();
    let reason = body.into_inner().reason;

    let order = web::block(move || state.orders.reject(order_id, reason, Utc::now())).await??;

    log::info!("staff {} rejected order {}", staff.0, order.number);
    Ok(HttpResponse::Ok().json(OrderStatusResponse::from(order)))
}

/// PUT /admin/orders/{id}/cancel
#[utoipa::path(
    put,
    path = "/admin/orders/{id}/cancel",
    params(
        ("id" = Uuid, Path, description = "Order UUID"),
    ),
    request_body = ReasonRequest,
    responses(
        (status = 200, description = "Order cancelled", body = OrderStatusResponse),
        (status = 400, description = "Missing reason"),
        (status = 409, description = "Order already dispatched or finished"),
    ),
    tag = "admin"
)]
pub async fn admin_cancel_order(
    state: web::Data<AppState>,
    staff: StaffId,
    path: web::Path<Uuid>,
    body: web::Json<ReasonRequest>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();
    let reason = body.into_inner().reason;

    let order = web::block(move || {
        state
            .orders
            .cancel(order_id, Actor::Staff(staff.0), Some(reason), Utc::now())
    })
    .await??;

    log::info!("staff {} cancelled order {}", staff.0, order.number);
    Ok(HttpResponse::Ok().json(OrderStatusResponse::from(order)))
}

/// PUT /admin/orders/{id}/dispatch
#[utoipa::path(
    put,
    path = "/admin/orders/{id}/dispatch",
    params(
        ("id" = Uuid, Path, description = "Order UUID"),
    ),
    responses(
        (status = 200, description = "Order out for delivery", body = OrderStatusResponse),
        (status = 409, description = "Order is not confirmed"),
    ),
    tag = "admin"
)]
pub async fn dispatch_order(
    state: web::Data<AppState>,
    staff: StaffId,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();

    let order = web::block(move || state.orders.dispatch(order_id, Utc::now())).await??;

    log::info!("staff {} dispatched order {}", staff.0, order.number);
    Ok(HttpResponse::Ok().json(OrderStatusResponse::from(order)))
}

/// PUT /admin/orders/{id}/complete
#[utoipa::path(
    put,
    path = "/admin/orders/{id}/complete",
    params(
        ("id" = Uuid, Path, description = "Order UUID"),
    ),
    responses(
        (status = 200, description = "Order delivered", body = OrderStatusResponse),
        (status = 409, description = "Order is not in delivery"),
    ),
    tag = "admin"
)]
pub async fn complete_order(
    state: web::Data<AppState>,
    staff: StaffId,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();

    let order = web::block(move || state.orders.complete(order_id, Utc::now())).await??;

    log::info!("staff {} completed order {}", staff.0, order.number);
    Ok(HttpResponse::Ok().json(OrderStatusResponse::from(order)))
}
