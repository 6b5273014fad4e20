//! Cross-Chain Facilitator Service
//!
//! Confirms deposits and withdraws between an origin gateway and its auxiliary
//! cogateway.
//!
//! ## Overview
//!
//! The facilitator:
//! 1. Receives indexed contract events on `POST /batches`
//! 2. Proves the source gateway on the destination chain once its state root is anchored
//! 3. Confirms each pending message with a storage proof of its outbox slot
//!
//! ## Security Requirements
//!
//! **CRITICAL**: This service holds the facilitator account key and pays gas on both
//! chains. Keep the key in the environment and restrict access to the intake API.

use anyhow::Result;
use tracing::info;

use facilitator::config::Config;
use facilitator::Facilitator;

// ============================================================================
// MAIN APPLICATION ENTRY POINT
// ============================================================================

/// Main application entry point that initializes and runs the facilitator.
///
/// This function:
/// 1. Initializes logging and tracing
/// 2. Loads configuration from TOML file
/// 3. Builds and seeds the facilitator
/// 4. Runs it until shutdown
#[tokio::main]
async fn main() -> Result<()> {
    // Initialize structured logging for debugging and monitoring
    tracing_subscriber::fmt::init();

    info!("Starting Cross-Chain Facilitator");

    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|arg| arg == "--help" || arg == "-h") {
        println!("Cross-Chain Facilitator");
        println!();
        println!("Usage: facilitator [OPTIONS]");
        println!();
        println!("Options:");
        println!("  --config <path>   Use custom config file path");
        println!("  --help, -h        Show this help message");
        println!();
        println!("Environment variables:");
        println!("  FACILITATOR_CONFIG_PATH      Path to config file (default: config/facilitator.toml)");
        println!("  FACILITATOR_PRIVATE_KEY      Facilitator key (name set by facilitator.private_key_env)");
        println!("  FACILITATOR__<SECTION>__<KEY> Override any config value");
        return Ok(());
    }

    let mut config_path = None;

    let mut i = 1; // Skip program name
    while i < args.len() {
        if args[i] == "--config" && i + 1 < args.len() {
            config_path = Some(args[i + 1].clone());
            i += 1;
        }
        i += 1;
    }

    if let Some(path) = config_path {
        std::env::set_var("FACILITATOR_CONFIG_PATH", &path);
        info!("Using custom config: {}", path);
    }

    // Load configuration from config/facilitator.toml (or FACILITATOR_CONFIG_PATH)
    let config = Config::load()?;
    info!("Configuration loaded successfully");

    let facilitator = Facilitator::new(config).await?;
    info!("Facilitator initialized successfully");

    // Runs until Ctrl-C
    facilitator.run().await
}
