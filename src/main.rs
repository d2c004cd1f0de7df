use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use clap::Parser;
use log::info;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use pow_ledger::{api, blockchain, Blockchain, ServerConfig, Wallet};

// Initialize the ledger with a fresh wallet receiving the mining rewards
fn initialize_blockchain(config: &ServerConfig) -> Blockchain {
    let miner_wallet = Wallet::new();

    info!("private_key {}", miner_wallet.private_key_hex());
    info!("public_key {}", miner_wallet.public_key_hex());
    info!("blockchain_address {}", miner_wallet.address());

    Blockchain::with_config(miner_wallet.address().clone(), config.ledger_config())
}

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::get_chain,
        api::handlers::get_transactions,
        api::handlers::create_transaction,
        api::handlers::mine_block,
        api::handlers::get_total_amount,
        api::handlers::create_wallet,
        api::handlers::create_wallet_transaction
    ),
    components(
        schemas(
            blockchain::Block,
            blockchain::Transaction,
            blockchain::Address,
            blockchain::DigitalSignature,
            blockchain::ChainView,
            api::handlers::MessageResponse,
            api::handlers::TransactionsResponse,
            api::handlers::TransactionRequest,
            api::handlers::MineResponse,
            api::handlers::AmountResponse,
            api::handlers::WalletResponse,
            api::handlers::WalletTransactionRequest
        )
    ),
    tags(
        (name = "ledger", description = "Proof-of-work ledger API endpoints")
    ),
    info(
        title = "Ledger API",
        version = "0.1.0",
        description = "A single-authority proof-of-work ledger",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    )
)]
struct ApiDoc;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::parse();

    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or(config.log_level.as_str()));

    let blockchain = web::Data::new(initialize_blockchain(&config));
    let (host, port) = config.bind_address();

    info!(
        "Starting HTTP server at http://{}:{} (difficulty {})",
        host,
        port,
        blockchain.config().difficulty
    );

    HttpServer::new(move || {
        // Configure CORS
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        let openapi = ApiDoc::openapi();

        App::new()
            .wrap(middleware::Logger::default())
            .wrap(cors)
            .app_data(blockchain.clone())
            .configure(api::configure_routes)
            .service(SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", openapi))
    })
    .bind((host, port))?
    .run()
    .await?;

    Ok(())
}
