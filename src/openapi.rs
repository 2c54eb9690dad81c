use utoipa::OpenApi;

use crate::application::sales_service::{CategorySales, ProductSales, SalesSummary};
use crate::domain::cart::{Cart, PendingCheckout};
use crate::domain::order::{CartItem, Customer, Order, OrderStatus, SalesRecord};
use crate::domain::payment::PaymentDetails;
use crate::domain::pricing::Totals;
use crate::domain::product::Product;
use crate::handlers::{self, CartItemRequest, ErrorResponse};

#[derive(OpenApi)]
#[openapi(
    info(title = "Storefront checkout API"),
    paths(
        handlers::orders::create_order,
        handlers::orders::get_order,
        handlers::orders::list_orders,
        handlers::orders::fulfill_order,
        handlers::orders::send_confirmation_email,
        handlers::payments::create_payment_intent,
        handlers::payments::stripe_webhook,
        handlers::products::list_products,
        handlers::products::get_product,
        handlers::products::create_product,
        handlers::products::update_product,
        handlers::products::delete_product,
        handlers::cart::get_cart,
        handlers::cart::add_item,
        handlers::cart::update_item,
        handlers::cart::remove_item,
        handlers::cart::clear_cart,
        handlers::cart::quote,
        handlers::checkout::checkout,
        handlers::sales::list_sales,
        handlers::sales::sales_summary,
    ),
    components(schemas(
        Order,
        OrderStatus,
        Customer,
        CartItem,
        Cart,
        PendingCheckout,
        Totals,
        SalesRecord,
        SalesSummary,
        ProductSales,
        CategorySales,
        Product,
        PaymentDetails,
        CartItemRequest,
        ErrorResponse,
        handlers::orders::CreateOrderRequest,
        handlers::orders::OrderEnvelope,
        handlers::orders::ListOrdersResponse,
        handlers::orders::ConfirmationEmailRequest,
        handlers::orders::ConfirmationEmailResponse,
        handlers::payments::CreatePaymentIntentRequest,
        handlers::payments::CreatePaymentIntentResponse,
        handlers::payments::CustomerDetails,
        handlers::payments::WebhookAck,
        handlers::products::ProductRequest,
        handlers::products::CreateProductRequest,
        handlers::cart::UpdateQuantityRequest,
        handlers::checkout::CheckoutBody,
    )),
    tags(
        (name = "orders", description = "Order records and fulfilment"),
        (name = "products", description = "Product catalog"),
        (name = "cart", description = "Session carts and price quotes"),
        (name = "checkout", description = "Cart to paid order"),
        (name = "payments", description = "Payment intents and provider webhooks"),
        (name = "sales", description = "Per-unit sales ledger"),
    )
)]
pub struct ApiDoc;
