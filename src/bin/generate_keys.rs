//! secp256k1 Key Generation Utility
//!
//! This binary generates a new facilitator key and prints its Ethereum address.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --bin generate_keys
//! ```
//!
//! Export the private key in the environment variable named by
//! `facilitator.private_key_env` (default `FACILITATOR_PRIVATE_KEY`) and fund the
//! address on both chains.

use anyhow::Result;
use facilitator::crypto::CryptoService;
use rand::Rng;

fn main() -> Result<()> {
    let mut rng = rand::rngs::OsRng;

    // A random 32-byte string is a valid scalar with overwhelming probability
    let (private_key_hex, service) = loop {
        let mut secret_key_bytes = [0u8; 32];
        rng.fill(&mut secret_key_bytes);
        let private_key_hex = format!("0x{}", hex::encode(secret_key_bytes));
        if let Ok(service) = CryptoService::from_private_key_hex(&private_key_hex) {
            break (private_key_hex, service);
        }
    };

    println!("Generated secp256k1 Key:");
    println!("Private Key (hex): {}", private_key_hex);
    println!("Address: {}", service.get_ethereum_address()?);
    println!();
    println!("Export the private key as FACILITATOR_PRIVATE_KEY and fund the address on both chains.");

    Ok(())
}
