pub mod admin;
pub mod cart;
pub mod identity;
pub mod orders;
pub mod payments;

use actix_web::web;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        cart::add_to_cart,
        cart::subtract_from_cart,
        cart::list_cart,
        cart::clear_cart,
        orders::submit_order,
        orders::order_history,
        orders::order_detail,
        orders::cancel_order,
        orders::repeat_order,
        orders::remind_order,
        admin::search_orders,
        admin::order_statistics,
        admin::admin_order_detail,
        admin::confirm_order,
        admin::reject_order,
        admin::admin_cancel_order,
        admin::dispatch_order,
        admin::complete_order,
        payments::payment_callback,
    ),
    components(schemas(
        cart::CartItemRequest,
        cart::CartLineResponse,
        cart::CartSubtractResponse,
        orders::SubmitOrderRequest,
        orders::SubmitOrderResponse,
        orders::OrderItemResponse,
        orders::OrderResponse,
        orders::OrderStatusResponse,
        orders::ListOrdersResponse,
        admin::ReasonRequest,
        admin::StatisticsResponse,
        payments::PaymentCallbackRequest,
        payments::PaymentCallbackResponse,
    )),
    tags(
        (name = "cart", description = "Customer shopping cart"),
        (name = "orders", description = "Customer orders"),
        (name = "admin", description = "Back-office order handling"),
        (name = "payments", description = "Payment provider callbacks"),
    )
)]
pub struct ApiDoc;

/// Registers every route. `/statistics` is registered ahead of `/{id}`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/user")
            .service(
                web::scope("/cart")
                    .route("", web::get().to(cart::list_cart))
                    .route("", web::delete().to(cart::clear_cart))
                    .route("/add", web::post().to(cart::add_to_cart))
                    .route("/sub", web::post().to(cart::subtract_from_cart)),
            )
            .service(
                web::scope("/orders")
                    .route("", web::post().to(orders::submit_order))
                    .route("", web::get().to(orders::order_history))
                    .route("/{id}", web::get().to(orders::order_detail))
                    .route("/{id}/cancel", web::put().to(orders::cancel_order))
                    .route("/{id}/repeat", web::post().to(orders::repeat_order))
                    .route("/{id}/remind", web::post().to(orders::remind_order)),
            ),
    )
    .service(
        web::scope("/admin/orders")
            .route("", web::get().to(admin::search_orders))
            .route("/statistics", web::get().to(admin::order_statistics))
            .route("/{id}", web::get().to(admin::admin_order_detail))
            .route("/{id}/confirm", web::put().to(admin::confirm_order))
            .route("/{id}/reject", web::put().to(admin::reject_order))
            .route("/{id}/cancel", web::put().to(admin::admin_cancel_order))
            .route("/{id}/dispatch", web::put().to(admin::dispatch_order))
            .route("/{id}/complete", web::put().to(admin::complete_order)),
    )
    .route(
        "/payments/callback",
        web::post().to(payments::payment_callback),
    );
}
