//! Get Facilitator Address
//!
//! This binary reads the facilitator configuration and prints the Ethereum address of
//! the facilitator key. The account must be funded on both chains, since it pays gas
//! for every proof and confirmation the facilitator submits.

use anyhow::Result;
use facilitator::config::Config;
use facilitator::crypto::CryptoService;

fn main() -> Result<()> {
    // Load config
    let config = Config::load()?;

    // Create crypto service
    let crypto = CryptoService::new(&config)?;

    let address = crypto.get_ethereum_address()?;

    println!("{}", address);

    Ok(())
}
