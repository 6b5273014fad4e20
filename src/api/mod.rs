//! Intake API
//!
//! HTTP surface the indexer delivers batches to. Every response uses the
//! `{success, data, error}` envelope.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};
use warp::{http::{Method, StatusCode}, Filter, Rejection, Reply};

use crate::address::format_hash;
use crate::config::ApiConfig;
use crate::entities::Transaction;
use crate::handlers::{EntityDispatcher, IndexedBatch};
use crate::repositories::TransactionRepository;

// ============================================================================
// SHARED REQUEST/RESPONSE STRUCTURES
// ============================================================================

/// Standardized response structure for all API endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// Whether the request was successful
    pub success: bool,
    /// Response data (if successful)
    pub data: Option<T>,
    /// Error message (if failed)
    pub error: Option<String>,
}

/// Queued or sent transaction as shown by `GET /transactions`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionView {
    pub id: u64,
    pub chain_id: u64,
    pub from_address: String,
    pub to_address: String,
    pub encoded_data: String,
    pub gas_price: String,
    pub gas: Option<String>,
    pub nonce: Option<String>,
    pub transaction_hash: Option<String>,
    pub message_hash: Option<String>,
}

impl From<&Transaction> for TransactionView {
    fn from(transaction: &Transaction) -> Self {
        Self {
            id: transaction.id,
            chain_id: transaction.chain_id,
            from_address: transaction.from_address.to_string(),
            to_address: transaction.to_address.to_string(),
            encoded_data: format!("0x{}", hex::encode(&transaction.encoded_data)),
            gas_price: transaction.gas_price.to_string(),
            gas: transaction.gas.map(|g| g.to_string()),
            nonce: transaction.nonce.map(|n| n.to_string()),
            transaction_hash: transaction.transaction_hash.as_ref().map(format_hash),
            message_hash: transaction.message_hash.as_ref().map(format_hash),
        }
    }
}

// ============================================================================
// API HANDLERS
// ============================================================================

/// Handler for `POST /batches`.
///
/// The body is parsed here rather than with `warp::body::json()` so that a malformed
/// batch is reported with the serde message.
///
/// # Arguments
///
/// * `body` - Raw request body
/// * `dispatcher` - Routes the batch to the entity handlers
///
/// # Returns
///
/// * `Ok(warp::Reply)` - JSON response with the `BatchReport`, or the handler error
/// * `Err(warp::Rejection)` - The body is not a valid batch
pub async fn post_batch_handler(
    body: warp::hyper::body::Bytes,
    dispatcher: Arc<EntityDispatcher>,
) -> Result<warp::reply::Response, warp::Rejection> {
    let batch: IndexedBatch = serde_json::from_slice(&body)
        .map_err(|e| warp::reject::custom(JsonDeserializeError(format!("Invalid batch: {}", e))))?;

    if batch.is_empty() {
        warn!("Received an empty indexed batch");
    }

    match dispatcher.handle(&batch).await {
        Ok(report) => Ok(warp::reply::json(&ApiResponse {
            success: true,
            data: Some(report),
            error: None,
        })
        .into_response()),
        Err(e) => {
            error!("Failed to handle indexed batch: {:#}", e);
            Ok(warp::reply::with_status(
                warp::reply::json(&ApiResponse::<()> {
                    success: false,
                    data: None,
                    error: Some(format!("{:#}", e)),
                }),
                StatusCode::UNPROCESSABLE_ENTITY,
            )
            .into_response())
        }
    }
}

/// Handler for `GET /transactions`: every stored transaction, oldest first.
pub async fn get_transactions_handler(
    transactions: Arc<TransactionRepository>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let views: Vec<TransactionView> = transactions.all().await.iter().map(TransactionView::from).collect();

    Ok(warp::reply::json(&ApiResponse {
        success: true,
        data: Some(views),
        error: None,
    }))
}

// ============================================================================
// WARP FILTER HELPERS
// ============================================================================

/// Creates a warp filter that provides access to the entity dispatcher.
pub fn with_dispatcher(
    dispatcher: Arc<EntityDispatcher>,
) -> impl Filter<Extract = (Arc<EntityDispatcher>,), Error = std::convert::Infallible> + Clone {
    warp::any().map(move || dispatcher.clone())
}

/// Creates a warp filter that provides access to the transaction repository.
pub fn with_transactions(
    transactions: Arc<TransactionRepository>,
) -> impl Filter<Extract = (Arc<TransactionRepository>,), Error = std::convert::Infallible> + Clone {
    warp::any().map(move || transactions.clone())
}

/// Rejection raised when a request body cannot be deserialized.
#[derive(Debug)]
pub struct JsonDeserializeError(pub String);

impl warp::reject::Reject for JsonDeserializeError {}

// ============================================================================
// CORS CONFIGURATION
// ============================================================================

/// Creates a CORS filter based on the configured allowed origins.
fn create_cors_filter(allowed_origins: &[String]) -> warp::cors::Builder {
    let methods = vec![Method::GET, Method::POST, Method::OPTIONS];

    if allowed_origins.contains(&"*".to_string()) {
        warp::cors()
            .allow_any_origin()
            .allow_methods(methods.clone())
            .allow_headers(vec!["content-type"])
    } else {
        let origins: Vec<&str> = allowed_origins.iter().map(|s| s.as_str()).collect();
        warp::cors()
            .allow_origins(origins)
            .allow_methods(methods)
            .allow_headers(vec!["content-type"])
    }
}

// ============================================================================
// REJECTION HANDLER
// ============================================================================

/// Global rejection handler for all API routes.
///
/// Converts warp rejections into the standard response envelope with a matching
/// HTTP status code.
pub async fn handle_rejection(rej: Rejection) -> Result<impl Reply, std::convert::Infallible> {
    let (status, message) = if let Some(err) = rej.find::<JsonDeserializeError>() {
        (StatusCode::BAD_REQUEST, err.0.clone())
    } else if rej.is_not_found() {
        (StatusCode::NOT_FOUND, "Endpoint not found".to_string())
    } else if rej.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed".to_string())
    } else if rej.find::<warp::reject::PayloadTooLarge>().is_some() {
        (StatusCode::PAYLOAD_TOO_LARGE, "Payload too large".to_string())
    } else {
        error!("Unhandled rejection: {:?}", rej);
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
    };

    Ok(warp::reply::with_status(
        warp::reply::json(&ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(message),
        }),
        status,
    ))
}

// ============================================================================
// API SERVER IMPLEMENTATION
// ============================================================================

/// Largest accepted batch body.
const MAX_BATCH_BYTES: u64 = 16 * 1024 * 1024;

/// REST API server receiving indexed batches.
pub struct ApiServer {
    config: ApiConfig,
    dispatcher: Arc<EntityDispatcher>,
    transactions: Arc<TransactionRepository>,
}

impl ApiServer {
    /// Creates a new API server.
    ///
    /// # Arguments
    ///
    /// * `config` - Bind address and CORS settings
    /// * `dispatcher` - Handles delivered batches
    pub fn new(config: ApiConfig, dispatcher: Arc<EntityDispatcher>) -> Self {
        let transactions = dispatcher.repositories().transaction.clone();
        Self {
            config,
            dispatcher,
            transactions,
        }
    }

    /// Starts the API server and serves requests until the future is dropped.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - Server stopped
    /// * `Err(anyhow::Error)` - The configured address is invalid
    pub async fn run(&self) -> Result<()> {
        info!("Starting API server on {}:{}", self.config.host, self.config.port);

        let routes = self.create_routes();

        let addr: std::net::SocketAddr = format!("{}:{}", self.config.host, self.config.port)
            .parse()
            .context("Failed to parse API server address")?;

        warp::serve(routes).run(addr).await;

        Ok(())
    }

    /// Creates all API routes for the server.
    pub(crate) fn create_routes(
        &self,
    ) -> impl Filter<Extract = impl warp::Reply, Error = std::convert::Infallible> + Clone {
        // Health check endpoint - returns service status
        let health = warp::path("health").and(warp::get()).map(|| {
            warp::reply::json(&ApiResponse::<String> {
                success: true,
                data: Some("Facilitator is running".to_string()),
                error: None,
            })
        });

        // Batch intake endpoint - applies one indexer delivery
        let batches = warp::path("batches")
            .and(warp::path::end())
            .and(warp::post())
            .and(warp::body::content_length_limit(MAX_BATCH_BYTES))
            .and(warp::body::bytes())
            .and(with_dispatcher(self.dispatcher.clone()))
            .and_then(post_batch_handler);

        // Transaction queue endpoint
        let transactions = warp::path("transactions")
            .and(warp::path::end())
            .and(warp::get())
            .and(with_transactions(self.transactions.clone()))
            .and_then(get_transactions_handler);

        health
            .or(batches)
            .or(transactions)
            .with(create_cors_filter(&self.config.cors_origins))
            .recover(handle_rejection)
    }

    /// Public method for testing - exposes routes for integration tests
    #[allow(dead_code)] // Used by tests
    pub fn test_routes(&self) -> impl Filter<Extract = impl warp::Reply, Error = std::convert::Infallible> + Clone {
        self.create_routes()
    }
}
