pub mod application;
pub mod db;
pub mod domain;
pub mod errors;
pub mod handlers;
pub mod infrastructure;
pub mod schema;

use actix_web::{middleware::Logger, web, App, HttpServer};
use bigdecimal::BigDecimal;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use application::effects::SideEffectOrchestrator;
use application::engine::StateTransitionEngine;
use application::payment::PaymentGatewayAdapter;
use infrastructure::catalog_repo::DieselCatalog;
use infrastructure::chat_repo::DieselChatProvisioner;
use infrastructure::effects_queue::EffectQueue;
use infrastructure::email::HttpEmailSink;
use infrastructure::gateway::HttpPaymentGateway;
use infrastructure::notification_repo::DieselNotificationSink;
use infrastructure::order_repo::DieselOrderRepository;
use infrastructure::user_repo::DieselUserStore;

pub use db::{create_pool, DbPool};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Run any pending Diesel migrations against the pool's database.
pub fn run_migrations(pool: &DbPool) {
    let mut conn = pool.get().expect("Failed to get DB connection for migrations");
    conn.run_pending_migrations(MIGRATIONS)
        .expect("Failed to run database migrations");
}

/// Everything read from the environment at boot.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub gateway_url: String,
    pub gateway_key_id: String,
    pub gateway_key_secret: String,
    pub gateway_currency: String,
    pub email_relay_url: String,
    pub shipping_fee: BigDecimal,
}

/// The engine as wired in production: Diesel-backed ports, HTTP gateway and
/// email relay, effects on the background queue.
pub type AppEngine = StateTransitionEngine<
    DieselOrderRepository,
    DieselCatalog,
    DieselUserStore,
    HttpPaymentGateway,
    EffectQueue,
>;

pub fn build_engine(pool: DbPool, config: &AppConfig) -> AppEngine {
    let repo = DieselOrderRepository::new(pool.clone());
    let catalog = DieselCatalog::new(pool.clone());
    let users = DieselUserStore::new(pool.clone());

    let orchestrator = SideEffectOrchestrator::new(
        repo.clone(),
        catalog.clone(),
        users.clone(),
        DieselNotificationSink::new(pool.clone()),
        HttpEmailSink::new(config.email_relay_url.clone()),
        DieselChatProvisioner::new(pool),
    );
    let effects = EffectQueue::start(orchestrator);

    let gateway = HttpPaymentGateway::new(
        config.gateway_url.clone(),
        config.gateway_key_id.clone(),
        config.gateway_key_secret.clone(),
    );
    let payments = PaymentGatewayAdapter::new(
        gateway,
        config.gateway_key_secret.clone(),
        config.gateway_currency.clone(),
    );

    StateTransitionEngine::new(
        repo,
        catalog,
        users,
        payments,
        effects,
        config.shipping_fee.clone(),
    )
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::orders::create_order,
        handlers::orders::get_order,
        handlers::orders::list_orders,
        handlers::orders::approve_order,
        handlers::orders::reject_order,
        handlers::orders::set_customization_price,
        handlers::orders::advance_fulfillment,
        handlers::orders::send_delivery_reminder,
        handlers::payments::initiate_payment,
        handlers::payments::confirm_payment,
    ),
    components(schemas(
        handlers::orders::CreateOrderRequest,
        handlers::orders::CreateOrderItemRequest,
        handlers::orders::ReviewRequest,
        handlers::orders::CustomizationPriceRequest,
        handlers::orders::AdvanceFulfillmentRequest,
        handlers::orders::OrderResponse,
        handlers::orders::OrderItemResponse,
        handlers::orders::ListOrdersResponse,
        handlers::payments::PaymentSessionResponse,
        handlers::payments::ConfirmPaymentRequest,
    ))
)]
pub struct ApiDoc;

/// Build and return an actix-web `Server` bound to `host:port`.
///
/// The caller is responsible for `.await`-ing (or `tokio::spawn`-ing) the
/// returned server.
pub fn build_server(
    engine: AppEngine,
    host: &str,
    port: u16,
) -> std::io::Result<actix_web::dev::Server> {
    let engine = web::Data::new(engine);
    Ok(HttpServer::new(move || {
        App::new()
            .app_data(engine.clone())
            .wrap(Logger::default())
            .service(
                web::scope("/orders")
                    .route("", web::post().to(handlers::orders::create_order))
                    .route("", web::get().to(handlers::orders::list_orders))
                    .route("/{id}", web::get().to(handlers::orders::get_order))
                    .route("/{id}/approve", web::post().to(handlers::orders::approve_order))
                    .route("/{id}/reject", web::post().to(handlers::orders::reject_order))
                    .route(
                        "/{id}/customization-price",
                        web::post().to(handlers::orders::set_customization_price),
                    )
                    .route(
                        "/{id}/fulfillment",
                        web::post().to(handlers::orders::advance_fulfillment),
                    )
                    .route(
                        "/{id}/delivery-reminder",
                        web::post().to(handlers::orders::send_delivery_reminder),
                    )
                    .route("/{id}/payment", web::post().to(handlers::payments::initiate_payment)),
            )
            .service(
                web::scope("/payments")
                    .route("/confirm", web::post().to(handlers::payments::confirm_payment)),
            )
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", ApiDoc::openapi()),
            )
    })
    .bind((host.to_string(), port))?
    .run())
}
