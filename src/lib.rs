pub mod application;
pub mod config;
pub mod db;
pub mod domain;
pub mod errors;
pub mod handlers;
pub mod infrastructure;
pub mod openapi;
pub mod schema;

use std::sync::Arc;

use actix_web::{middleware::Logger, web, App, HttpResponse, HttpServer};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use serde_json::json;
use thiserror::Error;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use application::cart_service::CartService;
use application::catalog_service::CatalogService;
use application::checkout_service::CheckoutService;
use application::order_service::OrderService;
use application::payment_service::PaymentService;
use application::sales_service::SalesService;
use application::webhook_service::WebhookService;
use config::{AppConfig, ConfigError};
use domain::payment::{PaymentError, PaymentGateway};
use domain::ports::{CartStore, Notifier, OrderRepository, ProductRepository};
use errors::AppError;
use infrastructure::cart_store::DieselCartStore;
use infrastructure::memory::{
    InMemoryCartStore, InMemoryOrderRepository, InMemoryProductRepository,
};
use infrastructure::notifier::LogNotifier;
use infrastructure::order_repo::DieselOrderRepository;
use infrastructure::product_repo::DieselProductRepository;
use infrastructure::sandbox::SandboxGateway;
use infrastructure::stripe::{StripeConfig, StripeGateway};

pub use db::{create_pool, DbPool};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("database pool: {0}")]
    Pool(#[from] r2d2::Error),
    #[error("migrations: {0}")]
    Migration(String),
    #[error("payment gateway: {0}")]
    Gateway(#[from] PaymentError),
}

/// Run any pending Diesel migrations against the pool's database.
pub fn run_migrations(pool: &DbPool) -> Result<(), StartupError> {
    let mut conn = pool.get()?;
    conn.run_pending_migrations(MIGRATIONS)
        .map_err(|e| StartupError::Migration(e.to_string()))?;
    Ok(())
}

/// The adapters behind the application services.
#[derive(Clone)]
pub struct Ports {
    pub orders: Arc<dyn OrderRepository>,
    pub carts: Arc<dyn CartStore>,
    pub products: Arc<dyn ProductRepository>,
    pub gateway: Arc<dyn PaymentGateway>,
    pub notifier: Arc<dyn Notifier>,
}

impl Ports {
    /// Picks Postgres when a database URL is configured and Stripe when a
    /// secret key is, falling back to the in-memory stores and the sandbox
    /// gateway otherwise.
    pub fn from_config(config: &AppConfig) -> Result<Self, StartupError> {
        let (orders, carts, products): (
            Arc<dyn OrderRepository>,
            Arc<dyn CartStore>,
            Arc<dyn ProductRepository>,
        ) = match &config.database_url {
            Some(url) => {
                let pool = create_pool(url)?;
                run_migrations(&pool)?;
                log::info!("Using Postgres order, cart and product stores");
                (
                    Arc::new(DieselOrderRepository::new(pool.clone())),
                    Arc::new(DieselCartStore::new(pool.clone())),
                    Arc::new(DieselProductRepository::new(pool)),
                )
            }
            None => {
                log::warn!("DATABASE_URL not set, orders, carts and products are kept in memory");
                (
                    Arc::new(InMemoryOrderRepository::new()),
                    Arc::new(InMemoryCartStore::new()),
                    Arc::new(InMemoryProductRepository::seeded()),
                )
            }
        };

        let gateway: Arc<dyn PaymentGateway> = match &config.stripe_secret_key {
            Some(key) => Arc::new(StripeGateway::new(StripeConfig {
                secret_key: key.clone(),
                api_base: config.stripe_api_base.clone(),
                timeout: config.payment_timeout,
                minimum_amount: config.min_payment_amount.clone(),
            })?),
            None => {
                log::warn!("STRIPE_SECRET_KEY not set, using the sandbox payment gateway");
                Arc::new(SandboxGateway::new(config.min_payment_amount.clone()))
            }
        };
        log::info!("Payment gateway: {}", gateway.name());

        Ok(Self {
            orders,
            carts,
            products,
            gateway,
            notifier: Arc::new(LogNotifier),
        })
    }

    /// In-memory stores with the sandbox gateway.
    pub fn in_memory(config: &AppConfig) -> Self {
        Self {
            orders: Arc::new(InMemoryOrderRepository::new()),
            carts: Arc::new(InMemoryCartStore::new()),
            products: Arc::new(InMemoryProductRepository::seeded()),
            gateway: Arc::new(SandboxGateway::new(config.min_payment_amount.clone())),
            notifier: Arc::new(LogNotifier),
        }
    }
}

/// Shared application services, handed to every worker.
#[derive(Clone)]
pub struct AppState {
    pub orders: Arc<OrderService>,
    pub carts: Arc<CartService>,
    pub catalog: Arc<CatalogService>,
    pub payments: Arc<PaymentService>,
    pub checkout: Arc<CheckoutService>,
    pub webhooks: Arc<WebhookService>,
    pub sales: Arc<SalesService>,
}

impl AppState {
    pub fn new(config: &AppConfig, ports: Ports) -> Self {
        let pricing = Arc::new(config.pricing.clone());
        if config.stripe_webhook_secret.is_none() {
            log::warn!("STRIPE_WEBHOOK_SECRET not set, webhook deliveries will be rejected");
        }

        Self {
            orders: Arc::new(OrderService::new(
                ports.orders.clone(),
                ports.products.clone(),
                ports.notifier.clone(),
                pricing.clone(),
                config.currency.clone(),
            )),
            carts: Arc::new(CartService::new(
                ports.carts.clone(),
                ports.products.clone(),
                pricing.clone(),
            )),
            catalog: Arc::new(CatalogService::new(ports.products.clone())),
            payments: Arc::new(PaymentService::new(
                ports.gateway.clone(),
                config.currency.clone(),
            )),
            checkout: Arc::new(CheckoutService::new(
                ports.orders.clone(),
                ports.carts,
                ports.products.clone(),
                ports.gateway,
                ports.notifier.clone(),
                pricing,
                config.currency.clone(),
                config.payment_timeout,
            )),
            webhooks: Arc::new(WebhookService::new(
                ports.orders.clone(),
                ports.notifier,
                config.stripe_webhook_secret.clone(),
            )),
            sales: Arc::new(SalesService::new(ports.orders, ports.products)),
        }
    }
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "status": "ok" }))
}

/// Registers the API routes, the health check and the Swagger UI.
pub fn configure(cfg: &mut web::ServiceConfig) {
    use handlers::{cart, checkout, orders, payments, products, sales};

    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _req| AppError::BadRequest(err.to_string()).into()),
    )
    .app_data(
        web::QueryConfig::default()
            .error_handler(|err, _req| AppError::BadRequest(err.to_string()).into()),
    )
    .app_data(
        web::PathConfig::default()
            .error_handler(|err, _req| AppError::BadRequest(err.to_string()).into()),
    )
    .route("/health", web::get().to(health))
    .service(
        web::scope("/api")
            .route(
                "/create-payment-intent",
                web::post().to(payments::create_payment_intent),
            )
            .route("/stripe-webhook", web::post().to(payments::stripe_webhook))
            .route(
                "/send-confirmation-email",
                web::post().to(orders::send_confirmation_email),
            )
            .route("/orders", web::post().to(orders::create_order))
            .route("/orders", web::get().to(orders::list_orders))
            .route("/orders/{id}", web::get().to(orders::get_order))
            .route("/orders/{id}/fulfill", web::post().to(orders::fulfill_order))
            .route("/products", web::get().to(products::list_products))
            .route("/products", web::post().to(products::create_product))
            .route("/products/{id}", web::get().to(products::get_product))
            .route("/products/{id}", web::put().to(products::update_product))
            .route("/products/{id}", web::delete().to(products::delete_product))
            .route("/cart/{session}", web::get().to(cart::get_cart))
            .route("/cart/{session}", web::delete().to(cart::clear_cart))
            .route("/cart/{session}/items", web::post().to(cart::add_item))
            .route(
                "/cart/{session}/items/{product_id}",
                web::put().to(cart::update_item),
            )
            .route(
                "/cart/{session}/items/{product_id}",
                web::delete().to(cart::remove_item),
            )
            .route("/cart/{session}/quote", web::get().to(cart::quote))
            .route("/checkout/{session}", web::post().to(checkout::checkout))
            .route("/sales", web::get().to(sales::list_sales))
            .route("/sales/summary", web::get().to(sales::sales_summary)),
    )
    .service(
        SwaggerUi::new("/swagger-ui/{_:.*}")
            .url("/api-docs/openapi.json", openapi::ApiDoc::openapi()),
    );
}

/// Build and return an actix-web `Server` bound to `host:port`.
///
/// The caller is responsible for `.await`-ing (or `tokio::spawn`-ing) the
/// returned server.
pub fn build_server(
    state: AppState,
    host: &str,
    port: u16,
) -> std::io::Result<actix_web::dev::Server> {
    let state = web::Data::new(state);
    Ok(HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(Logger::default())
            .configure(configure)
    })
    .bind((host.to_string(), port))?
    .run())
}
