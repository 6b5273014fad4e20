//! Request Transfer Utility
//!
//! Starts a cross-chain transfer from the facilitator account, for local testing:
//! approves the gateway to spend the token, then calls `deposit` on the origin gateway
//! or `withdraw` on the auxiliary cogateway. Each transaction is sent and mined before
//! the next one.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --bin request_transfer -- deposit --token 0x... --amount 1000 \
//!     --beneficiary 0x... [--fee-gas-price 0] [--fee-gas-limit 0] [--config <path>]
//! ```

use anyhow::{Context, Result};
use ethereum_types::U256;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use facilitator::address::{format_hash, parse_u256, GlobalAddress};
use facilitator::config::{ChainConfig, Config};
use facilitator::crypto::CryptoService;
use facilitator::entities::MessageType;
use facilitator::evm_client::{ChainRpc, EvmClient};
use facilitator::executor::TransactionExecutor;
use facilitator::gateway_calls::{self, TransferRequest};
use facilitator::repositories::TransactionRepository;

const RECEIPT_POLL_INTERVAL: Duration = Duration::from_secs(1);
const RECEIPT_ATTEMPTS: u32 = 120;

struct Args {
    direction: MessageType,
    token: GlobalAddress,
    amount: U256,
    beneficiary: GlobalAddress,
    fee_gas_price: U256,
    fee_gas_limit: U256,
}

fn print_usage() {
    println!("Request Transfer");
    println!();
    println!("Usage: request_transfer <deposit|withdraw> [OPTIONS]");
    println!();
    println!("Options:");
    println!("  --token <address>        Value token (deposit) or utility token (withdraw)");
    println!("  --amount <number>        Amount to transfer");
    println!("  --beneficiary <address>  Receiver on the other chain");
    println!("  --fee-gas-price <number> Facilitator reward gas price (default 0)");
    println!("  --fee-gas-limit <number> Facilitator reward gas limit (default 0)");
    println!("  --config <path>          Use custom config file path");
    println!("  --help, -h               Show this help message");
}

fn parse_args(args: &[String]) -> Result<Args> {
    let direction = match args.get(1).map(String::as_str) {
        Some("deposit") => MessageType::Deposit,
        Some("withdraw") => MessageType::Withdraw,
        other => anyhow::bail!("Expected 'deposit' or 'withdraw', got {:?}", other),
    };

    let mut token = None;
    let mut amount = None;
    let mut beneficiary = None;
    let mut fee_gas_price = U256::zero();
    let mut fee_gas_limit = U256::zero();

    let mut i = 2;
    while i < args.len() {
        let value = args
            .get(i + 1)
            .with_context(|| format!("Missing value for {}", args[i]))?;
        match args[i].as_str() {
            "--token" => token = Some(GlobalAddress::from_str(value).context("Invalid --token")?),
            "--amount" => amount = Some(parse_u256(value).context("Invalid --amount")?),
            "--beneficiary" => beneficiary = Some(GlobalAddress::from_str(value).context("Invalid --beneficiary")?),
            "--fee-gas-price" => fee_gas_price = parse_u256(value).context("Invalid --fee-gas-price")?,
            "--fee-gas-limit" => fee_gas_limit = parse_u256(value).context("Invalid --fee-gas-limit")?,
            "--config" => std::env::set_var("FACILITATOR_CONFIG_PATH", value),
            other => anyhow::bail!("Unknown option {}", other),
        }
        i += 2;
    }

    Ok(Args {
        direction,
        token: token.context("--token is required")?,
        amount: amount.context("--amount is required")?,
        beneficiary: beneficiary.context("--beneficiary is required")?,
        fee_gas_price,
        fee_gas_limit,
    })
}

/// Sends the oldest queued transaction and waits until it is mined.
async fn send_and_wait(executor: &TransactionExecutor, client: &EvmClient, label: &str) -> Result<()> {
    let sent = executor
        .execute_next()
        .await?
        .with_context(|| format!("No queued {} transaction", label))?;
    let hash = sent
        .transaction_hash
        .with_context(|| format!("{} transaction has no hash", label))?;
    info!("{} sent: {}", label, format_hash(&hash));

    let receipt = client
        .wait_for_receipt(&hash, RECEIPT_POLL_INTERVAL, RECEIPT_ATTEMPTS)
        .await
        .with_context(|| format!("{} was not mined", label))?;
    info!("{} mined in block {:?}", label, receipt.block_number);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 || args.iter().any(|arg| arg == "--help" || arg == "-h") {
        print_usage();
        return Ok(());
    }
    let args = parse_args(&args)?;

    let config = Config::load()?;
    let crypto_service = Arc::new(CryptoService::new(&config)?);

    let (chain, gateway): (&ChainConfig, GlobalAddress) = match args.direction {
        MessageType::Deposit => (&config.origin, config.origin_gateway()?),
        MessageType::Withdraw => (&config.auxiliary, config.auxiliary_cogateway()?),
    };

    let client = Arc::new(
        EvmClient::new(&chain.rpc_url, chain.chain_id, config.facilitator.rpc_timeout())
            .with_context(|| format!("Failed to create client for {}", chain.name))?,
    );
    let rpc: Arc<dyn ChainRpc> = client.clone();
    let executor = TransactionExecutor::new(
        Arc::new(TransactionRepository::new()),
        rpc,
        crypto_service,
        chain.gas_price(),
        config.facilitator.polling_interval(),
    )?;

    let request = TransferRequest {
        amount: args.amount,
        beneficiary: args.beneficiary,
        fee_gas_price: args.fee_gas_price,
        fee_gas_limit: args.fee_gas_limit,
        token: args.token,
    };
    let (label, transfer_data) = match args.direction {
        MessageType::Deposit => ("deposit", gateway_calls::deposit(&request)),
        MessageType::Withdraw => ("withdraw", gateway_calls::withdraw(&request)),
    };

    info!(
        "Requesting {} of {} {} from {} on {}",
        label,
        args.amount,
        args.token,
        executor.from_address(),
        chain.name
    );

    executor
        .add(args.token, gateway_calls::approve(&gateway, args.amount))
        .await?;
    send_and_wait(&executor, &client, "approve").await?;

    executor.add(gateway, transfer_data).await?;
    send_and_wait(&executor, &client, label).await?;

    println!("{} requested on {}", label, chain.name);
    Ok(())
}
