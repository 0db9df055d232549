use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::application::submission_service::SubmitOrder;
use crate::domain::order::{Actor, ListResult, Order, OrderItem, OrderView, PageRequest, SubmissionReceipt};
use crate::domain::state_machine::OrderStatus;
use crate::errors::AppError;
use crate::handlers::identity::CustomerId;
use crate::state::AppState;

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
pub struct SubmitOrderRequest {
    pub address_book_id: Uuid,
    pub remark: Option<String>,
    pub estimated_delivery_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SubmitOrderResponse {
    pub id: Uuid,
    pub order_number: String,
    /// Decimal total as a string, e.g. "78.50"
    pub amount: String,
    pub order_time: DateTime<Utc>,
}

impl From<SubmissionReceipt> for SubmitOrderResponse {
    fn from(r: SubmissionReceipt) -> Self {
        SubmitOrderResponse {
            id: r.order_id,
            order_number: r.order_number,
            amount: r.amount.to_string(),
            order_time: r.order_time,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderItemResponse {
    pub id: Uuid,
    pub product_kind: String,
    pub product_id: Uuid,
    pub dish_flavor: Option<String>,
    pub name: String,
    pub image: Option<String>,
    pub amount: String,
    pub number: i32,
}

impl From<OrderItem> for OrderItemResponse {
    fn from(i: OrderItem) -> Self {
        OrderItemResponse {
            id: i.id,
            product_kind: i.key.kind.as_str().to_string(),
            product_id: i.key.product_id,
            dish_flavor: i.key.flavor,
            name: i.name,
            image: i.image,
            amount: i.unit_price.to_string(),
            number: i.quantity,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderResponse {
    pub id: Uuid,
    pub number: String,
    pub user_id: Uuid,
    pub status: String,
    pub pay_status: String,
    pub consignee: String,
    pub phone: String,
    pub address: String,
    pub remark: Option<String>,
    pub order_time: DateTime<Utc>,
    pub checkout_time: Option<DateTime<Utc>>,
    pub estimated_delivery_time: Option<DateTime<Utc>>,
    pub amount: String,
    pub cancel_reason: Option<String>,
    pub cancel_time: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub delivery_time: Option<DateTime<Utc>>,
    pub items: Vec<OrderItemResponse>,
}

impl From<OrderView> for OrderResponse {
    fn from(v: OrderView) -> Self {
        let o = v.order;
        OrderResponse {
            id: o.id,
            number: o.number,
            user_id: o.user_id,
            status: o.status.as_str().to_string(),
            pay_status: o.pay_status.as_str().to_string(),
            consignee: o.address.consignee,
            phone: o.address.phone,
            address: o.address.detail,
            remark: o.remark,
            order_time: o.order_time,
            checkout_time: o.checkout_time,
            estimated_delivery_time: o.estimated_delivery_time,
            amount: o.amount.to_string(),
            cancel_reason: o.cancel_reason,
            cancel_time: o.cancel_time,
            rejection_reason: o.rejection_reason,
            delivery_time: o.delivery_time,
            items: v.items.into_iter().map(OrderItemResponse::from).collect(),
        }
    }
}

/// Status after a state change.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderStatusResponse {
    pub id: Uuid,
    pub status: String,
    pub pay_status: String,
}

impl From<Order> for OrderStatusResponse {
    fn from(o: Order) -> Self {
        OrderStatusResponse {
            id: o.id,
            status: o.status.as_str().to_string(),
            pay_status: o.pay_status.as_str().to_string(),
        }
    }
}

// ── Pagination ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    /// Page number (1-based). Defaults to 1.
    #[serde(default = "default_page")]
    pub page: i64,
    /// Number of items per page. Defaults to 10, maximum 100.
    #[serde(default = "default_page_size")]
    pub page_size: i64,
    /// Only orders in this status, e.g. `TO_BE_CONFIRMED`.
    pub status: Option<String>,
}

pub(crate) fn default_page() -> i64 {
    1
}

pub(crate) fn default_page_size() -> i64 {
    10
}

pub(crate) fn parse_status(status: Option<String>) -> Result<Option<OrderStatus>, AppError> {
    status
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<OrderStatus>()
                .map_err(|_| AppError::BadRequest(format!("unknown order status '{s}'")))
        })
        .transpose()
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ListOrdersResponse {
    pub items: Vec<OrderResponse>,
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
}

impl ListOrdersResponse {
    pub(crate) fn new(result: ListResult, page: PageRequest) -> Self {
        ListOrdersResponse {
            items: result.items.into_iter().map(OrderResponse::from).collect(),
            total: result.total,
            page: page.page,
            page_size: page.page_size,
        }
    }
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// POST /user/orders
///
/// Turns the caller's cart into an order awaiting payment. The order, its
/// items and the cart drain are written in one transaction.
#[utoipa::path(
    post,
    path = "/user/orders",
    request_body = SubmitOrderRequest,
    responses(
        (status = 201, description = "Order created", body = SubmitOrderResponse),
        (status = 400, description = "Empty cart or foreign address"),
        (status = 409, description = "Cart changed during submission; retry"),
    ),
    tag = "orders"
)]
pub async fn submit_order(
    state: web::Data<AppState>,
    user: CustomerId,
    body: web::Json<SubmitOrderRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    let request = SubmitOrder {
        user_id: user.0,
        address_id: body.address_book_id,
        remark: body.remark,
        estimated_delivery_time: body.estimated_delivery_time,
    };

    let receipt = web::block(move || state.submission.submit(request, Utc::now())).await??;

    Ok(HttpResponse::Created().json(SubmitOrderResponse::from(receipt)))
}

/// GET /user/orders
///
/// The caller's orders, newest first, with their items.
#[utoipa::path(
    get,
    path = "/user/orders",
    params(
        ("page" = Option<i64>, Query, description = "Page number (1-based, default 1)"),
        ("page_size" = Option<i64>, Query, description = "Items per page (default 10, max 100)"),
        ("status" = Option<String>, Query, description = "Status filter"),
    ),
    responses(
        (status = 200, description = "Paginated order history", body = ListOrdersResponse),
    ),
    tag = "orders"
)]
pub async fn order_history(
    state: web::Data<AppState>,
    user: CustomerId,
    query: web::Query<HistoryParams>,
) -> Result<HttpResponse, AppError> {
    let params = query.into_inner();
    let status = parse_status(params.status)?;
    let page = PageRequest::new(params.page, params.page_size);

    let result = web::block(move || state.queries.history(user.0, page, status)).await??;

    Ok(HttpResponse::Ok().json(ListOrdersResponse::new(result, page)))
}

/// GET /user/orders/{id}
#[utoipa::path(
    get,
    path = "/user/orders/{id}",
    params(
        ("id" = Uuid, Path, description = "Order UUID"),
    ),
    responses(
        (status = 200, description = "Order found", body = OrderResponse),
        (status = 403, description = "Order belongs to another user"),
        (status = 404, description = "Order not found"),
    ),
    tag = "orders"
)]
pub async fn order_detail(
    state: web::Data<AppState>,
    user: CustomerId,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();

    let view =
        web::block(move || state.queries.detail(order_id, Actor::Customer(user.0))).await??;

    Ok(HttpResponse::Ok().json(OrderResponse::from(view)))
}

/// PUT /user/orders/{id}/cancel
///
/// Allowed while the order awaits payment or staff confirmation. A paid order
/// is marked refunded.
#[utoipa::path(
    put,
    path = "/user/orders/{id}/cancel",
    params(
        ("id" = Uuid, Path, description = "Order UUID"),
    ),
    responses(
        (status = 200, description = "Order cancelled", body = OrderStatusResponse),
        (status = 403, description = "Order belongs to another user"),
        (status = 409, description = "Order can no longer be cancelled by the customer"),
    ),
    tag = "orders"
)]
pub async fn cancel_order(
    state: web::Data<AppState>,
    user: CustomerId,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();

    let order = web::block(move || {
        state
            .orders
            .cancel(order_id, Actor::Customer(user.0), None, Utc::now())
    })
    .await??;

    Ok(HttpResponse::Ok().json(OrderStatusResponse::from(order)))
}

/// POST /user/orders/{id}/repeat
///
/// Puts the order's items back into the cart at current catalog prices.
#[utoipa::path(
    post,
    path = "/user/orders/{id}/repeat",
    params(
        ("id" = Uuid, Path, description = "Order UUID"),
    ),
    responses(
        (status = 204, description = "Cart refilled"),
        (status = 403, description = "Order belongs to another user"),
        (status = 404, description = "Order or one of its products not found"),
    ),
    tag = "orders"
)]
pub async fn repeat_order(
    state: web::Data<AppState>,
    user: CustomerId,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();

    web::block(move || state.queries.repeat(order_id, user.0, Utc::now())).await??;

    Ok(HttpResponse::NoContent().finish())
}

/// POST /user/orders/{id}/remind
///
/// Asks staff to hurry up with an open order.
#[utoipa::path(
    post,
    path = "/user/orders/{id}/remind",
    params(
        ("id" = Uuid, Path, description = "Order UUID"),
    ),
    responses(
        (status = 202, description = "Staff notified"),
        (status = 409, description = "Order already finished"),
    ),
    tag = "orders"
)]
pub async fn remind_order(
    state: web::Data<AppState>,
    user: CustomerId,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();

    web::block(move || state.queries.remind(order_id, user.0)).await??;

    Ok(HttpResponse::Accepted().finish())
}
