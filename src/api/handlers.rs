use actix_web::{web, HttpResponse, Responder};
use log::{error, warn};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::blockchain::crypto::public_key_from_hex;
use crate::blockchain::{Address, Block, Blockchain, ChainView, DigitalSignature, Transaction, Wallet};

/// Data structure for the blockchain state
pub type BlockchainData = web::Data<Blockchain>;

/// Generic outcome message
#[derive(Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    /// "success" or "fail"
    pub message: String,
}

impl MessageResponse {
    fn success() -> Self {
        MessageResponse {
            message: "success".to_string(),
        }
    }

    fn fail() -> Self {
        MessageResponse {
            message: "fail".to_string(),
        }
    }
}

/// Response for the pending transactions endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct TransactionsResponse {
    /// The pending transactions
    pub transactions: Vec<Transaction>,

    /// The number of pending transactions
    pub length: usize,
}

/// Request for the transaction endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct TransactionRequest {
    /// The sender's address
    pub sender_blockchain_address: String,

    /// The recipient's address
    pub recipient_blockchain_address: String,

    /// The amount to transfer
    pub value: f64,

    /// The sender's public key, hex encoded X || Y
    pub sender_public_key: String,

    /// Signature over the transaction, hex encoded r || s
    pub signature: String,
}

/// Response for the mine endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct MineResponse {
    /// The message
    pub message: String,

    /// The newly mined block
    pub block: Block,
}

/// Query for the amount endpoint
#[derive(Serialize, Deserialize)]
pub struct AmountQuery {
    pub blockchain_address: String,
}

/// Response for the amount endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct AmountResponse {
    /// Balance computed from the chain
    pub amount: f64,
}

/// Response for the create wallet endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct WalletResponse {
    /// The wallet's private key (hex encoded)
    pub private_key: String,

    /// The wallet's public key (hex encoded X || Y)
    pub public_key: String,

    /// The wallet's address
    pub blockchain_address: String,
}

/// Request for the wallet transaction endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct WalletTransactionRequest {
    /// The sender's private key (hex encoded)
    pub sender_private_key: String,

    /// The sender's public key (hex encoded X || Y)
    pub sender_public_key: String,

    /// The sender's address
    pub sender_blockchain_address: String,

    /// The recipient's address
    pub recipient_blockchain_address: String,

    /// The amount to transfer
    pub value: f64,
}

fn bad_request(message: impl Into<String>) -> HttpResponse {
    HttpResponse::BadRequest().json(serde_json::json!({
        "message": "fail",
        "error": message.into(),
    }))
}

/// Get the full blockchain
#[utoipa::path(
    get,
    path = "/api/v1/chain",
    responses(
        (status = 200, description = "Blockchain retrieved successfully", body = ChainView)
    )
)]
pub async fn get_chain(blockchain: BlockchainData) -> impl Responder {
    HttpResponse::Ok().json(blockchain.chain_view())
}

/// Get all pending transactions
#[utoipa::path(
    get,
    path = "/api/v1/transactions",
    responses(
        (status = 200, description = "Pending transactions retrieved successfully", body = TransactionsResponse)
    )
)]
pub async fn get_transactions(blockchain: BlockchainData) -> impl Responder {
    let transactions = blockchain.transaction_pool();

    HttpResponse::Ok().json(TransactionsResponse {
        length: transactions.len(),
        transactions,
    })
}

/// Submit a signed transaction
///
/// Adds the transaction to the pool if its signature verifies
#[utoipa::path(
    post,
    path = "/api/v1/transactions",
    request_body = TransactionRequest,
    responses(
        (status = 201, description = "Transaction added to the pool", body = MessageResponse),
        (status = 400, description = "Invalid transaction data", body = MessageResponse)
    )
)]
pub async fn create_transaction(
    blockchain: BlockchainData,
    transaction_req: web::Json<TransactionRequest>,
) -> impl Responder {
    let sender = Address(transaction_req.sender_blockchain_address.clone());
    let recipient = Address(transaction_req.recipient_blockchain_address.clone());

    // Rewards are only ever issued by the ledger itself
    if Transaction::new(sender.clone(), recipient.clone(), 0.0).is_reward() {
        warn!("Refusing externally submitted reward transaction");
        return bad_request("Reserved sender address");
    }

    let public_key = match public_key_from_hex(&transaction_req.sender_public_key) {
        Ok(public_key) => public_key,
        Err(err) => return bad_request(format!("Invalid public key: {}", err)),
    };
    let signature = DigitalSignature(transaction_req.signature.clone());

    let admitted = blockchain.submit_transaction(
        &sender,
        &recipient,
        transaction_req.value,
        Some(&public_key),
        Some(&signature),
    );

    if admitted {
        HttpResponse::Created().json(MessageResponse::success())
    } else {
        HttpResponse::BadRequest().json(MessageResponse::fail())
    }
}

/// Mine a new block
///
/// Runs the proof of work search on the blocking thread pool
#[utoipa::path(
    post,
    path = "/api/v1/mine",
    responses(
        (status = 200, description = "Block mined successfully", body = MineResponse),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn mine_block(blockchain: BlockchainData) -> impl Responder {
    let miner = blockchain.clone();

    match web::block(move || miner.mine()).await {
        Ok(block) => HttpResponse::Ok().json(MineResponse {
            message: "success".to_string(),
            block,
        }),
        Err(err) => {
            error!("Mining task failed: {}", err);
            HttpResponse::InternalServerError().json(MessageResponse::fail())
        }
    }
}

/// Get the balance of an address
#[utoipa::path(
    get,
    path = "/api/v1/amount",
    params(
        ("blockchain_address" = String, Query, description = "Address to total up")
    ),
    responses(
        (status = 200, description = "Balance computed successfully", body = AmountResponse)
    )
)]
pub async fn get_total_amount(blockchain: BlockchainData, query: web::Query<AmountQuery>) -> impl Responder {
    let address = Address(query.into_inner().blockchain_address);

    HttpResponse::Ok().json(AmountResponse {
        amount: blockchain.balance(&address),
    })
}

/// Create a new wallet
///
/// The private key is not kept by the server and must be stored by the caller
#[utoipa::path(
    post,
    path = "/api/v1/wallet",
    responses(
        (status = 201, description = "Wallet created successfully", body = WalletResponse)
    )
)]
pub async fn create_wallet() -> impl Responder {
    let wallet = Wallet::new();

    HttpResponse::Created().json(WalletResponse {
        private_key: wallet.private_key_hex(),
        public_key: wallet.public_key_hex(),
        blockchain_address: wallet.address().0.clone(),
    })
}

/// Sign a transaction with a wallet's keys and submit it
#[utoipa::path(
    post,
    path = "/api/v1/wallet/transaction",
    request_body = WalletTransactionRequest,
    responses(
        (status = 201, description = "Transaction signed and added to the pool", body = MessageResponse),
        (status = 400, description = "Invalid wallet or transaction data", body = MessageResponse)
    )
)]
pub async fn create_wallet_transaction(
    blockchain: BlockchainData,
    wallet_req: web::Json<WalletTransactionRequest>,
) -> impl Responder {
    let wallet = match Wallet::from_private_key_hex(&wallet_req.sender_private_key) {
        Ok(wallet) => wallet,
        Err(err) => return bad_request(format!("Invalid private key: {}", err)),
    };

    if wallet.public_key_hex() != wallet_req.sender_public_key.to_lowercase() {
        return bad_request("Private key does not match public key");
    }

    let recipient = Address(wallet_req.recipient_blockchain_address.clone());
    if !recipient.has_valid_checksum() {
        return bad_request("Invalid recipient address");
    }

    let transaction = Transaction::new(
        Address(wallet_req.sender_blockchain_address.clone()),
        recipient,
        wallet_req.value,
    );

    let signature = match transaction.sign(&wallet) {
        Ok(signature) => signature,
        Err(err) => return bad_request(format!("Failed to sign transaction: {}", err)),
    };

    let admitted = blockchain.submit_transaction(
        &transaction.sender,
        &transaction.recipient,
        transaction.value,
        Some(wallet.public_key()),
        Some(&signature),
    );

    if admitted {
        HttpResponse::Created().json(MessageResponse::success())
    } else {
        HttpResponse::BadRequest().json(MessageResponse::fail())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::configure_routes;
    use crate::config::{LedgerConfig, MINING_SENDER};
    use actix_web::http::StatusCode;
    use actix_web::{test, App};

    fn ledger() -> Blockchain {
        Blockchain::with_config(Address::from("miner"), LedgerConfig::default().with_difficulty(1))
    }

    fn signed_request(sender: &Wallet, recipient: &Wallet, value: f64) -> TransactionRequest {
        let transaction = Transaction::new(sender.address().clone(), recipient.address().clone(), value);
        let signature = transaction.sign(sender).unwrap();

        TransactionRequest {
            sender_blockchain_address: sender.address().0.clone(),
            recipient_blockchain_address: recipient.address().0.clone(),
            value,
            sender_public_key: sender.public_key_hex(),
            signature: signature.0,
        }
    }

    #[actix_web::test]
    async fn test_submit_mine_and_query() {
        let blockchain = ledger();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(blockchain.clone()))
                .configure(configure_routes),
        )
        .await;

        let sender = Wallet::new();
        let recipient = Wallet::new();

        let req = test::TestRequest::post()
            .uri("/api/v1/transactions")
            .set_json(signed_request(&sender, &recipient, 1.0))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let req = test::TestRequest::get().uri("/api/v1/transactions").to_request();
        let pending: TransactionsResponse = test::call_and_read_body_json(&app, req).await;
        assert_eq!(pending.length, 1);

        let req = test::TestRequest::post().uri("/api/v1/mine").to_request();
        let mined: MineResponse = test::call_and_read_body_json(&app, req).await;
        assert_eq!(mined.block.transactions.len(), 2);
        assert!(mined.block.hash_hex().starts_with('0'));

        let req = test::TestRequest::get().uri("/api/v1/chain").to_request();
        let chain: ChainView = test::call_and_read_body_json(&app, req).await;
        assert_eq!(chain.chains.len(), 2);

        let uri = format!("/api/v1/amount?blockchain_address={}", recipient.address());
        let req = test::TestRequest::get().uri(&uri).to_request();
        let amount: AmountResponse = test::call_and_read_body_json(&app, req).await;
        assert_eq!(amount.amount, 1.0);
    }

    #[actix_web::test]
    async fn test_rejects_bad_signature() {
        let blockchain = ledger();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(blockchain.clone()))
                .configure(configure_routes),
        )
        .await;

        let sender = Wallet::new();
        let recipient = Wallet::new();
        let mut request = signed_request(&sender, &recipient, 1.0);
        request.value = 2.0;

        let req = test::TestRequest::post()
            .uri("/api/v1/transactions")
            .set_json(request)
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(blockchain.transaction_pool().is_empty());
    }

    #[actix_web::test]
    async fn test_rejects_reward_sender() {
        let blockchain = ledger();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(blockchain.clone()))
                .configure(configure_routes),
        )
        .await;

        let sender = Wallet::new();
        let recipient = Wallet::new();
        let mut request = signed_request(&sender, &recipient, 1.0);
        request.sender_blockchain_address = MINING_SENDER.to_string();

        let req = test::TestRequest::post()
            .uri("/api/v1/transactions")
            .set_json(request)
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(blockchain.transaction_pool().is_empty());
    }

    #[actix_web::test]
    async fn test_wallet_flow() {
        let blockchain = ledger();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(blockchain.clone()))
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::post().uri("/api/v1/wallet").to_request();
        let sender: WalletResponse = test::call_and_read_body_json(&app, req).await;
        let req = test::TestRequest::post().uri("/api/v1/wallet").to_request();
        let recipient: WalletResponse = test::call_and_read_body_json(&app, req).await;

        let restored = Wallet::from_private_key_hex(&sender.private_key).unwrap();
        assert_eq!(restored.address().0, sender.blockchain_address);

        let req = test::TestRequest::post()
            .uri("/api/v1/wallet/transaction")
            .set_json(WalletTransactionRequest {
                sender_private_key: sender.private_key.clone(),
                sender_public_key: sender.public_key.clone(),
                sender_blockchain_address: sender.blockchain_address.clone(),
                recipient_blockchain_address: recipient.blockchain_address.clone(),
                value: 3.5,
            })
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let pool = blockchain.transaction_pool();
        assert_eq!(pool.len(), 1);
        assert_eq!(pool[0].recipient.0, recipient.blockchain_address);

        let req = test::TestRequest::post()
            .uri("/api/v1/wallet/transaction")
            .set_json(WalletTransactionRequest {
                sender_private_key: sender.private_key,
                sender_public_key: sender.public_key,
                sender_blockchain_address: sender.blockchain_address,
                recipient_blockchain_address: "not-an-address".to_string(),
                value: 1.0,
            })
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
