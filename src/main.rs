use bigdecimal::BigDecimal;
use dotenvy::dotenv;
use fulfillment_service::{build_engine, build_server, create_pool, run_migrations, AppConfig};
use std::env;
use std::str::FromStr;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = env::var("PORT")
        .unwrap_or_else(|_| "8080".to_string())
        .parse()
        .expect("PORT must be a valid number");

    let config = AppConfig {
        gateway_url: env::var("GATEWAY_URL").expect("GATEWAY_URL must be set"),
        gateway_key_id: env::var("GATEWAY_KEY_ID").expect("GATEWAY_KEY_ID must be set"),
        gateway_key_secret: env::var("GATEWAY_KEY_SECRET").expect("GATEWAY_KEY_SECRET must be set"),
        gateway_currency: env::var("GATEWAY_CURRENCY").unwrap_or_else(|_| "INR".to_string()),
        email_relay_url: env::var("EMAIL_RELAY_URL").expect("EMAIL_RELAY_URL must be set"),
        shipping_fee: BigDecimal::from_str(&env::var("SHIPPING_FEE").unwrap_or_else(|_| "0".to_string()))
            .expect("SHIPPING_FEE must be a valid decimal"),
    };

    let pool = create_pool(&database_url, 10);
    run_migrations(&pool);

    let engine = build_engine(pool, &config);

    log::info!("Starting server at http://{}:{}", host, port);

    build_server(engine, &host, port)?.await
}
