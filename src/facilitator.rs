//! Facilitator Module
//!
//! Wires the repositories, proof generators, executors and services together and
//! runs them alongside the intake API.
//!
//! ## Architecture
//!
//! The facilitator:
//! 1. Seeds the gateway pair and both anchors
//! 2. Attaches the confirm services to the Gateway repository and the prove service
//!    to the Anchor repository
//! 3. Starts one transaction executor per chain
//! 4. Serves `POST /batches` until Ctrl-C, then stops the executors

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{error, info};

use crate::api::ApiServer;
use crate::config::Config;
use crate::crypto::CryptoService;
use crate::evm_client::{ChainRpc, EvmClient};
use crate::executor::TransactionExecutor;
use crate::handlers::EntityDispatcher;
use crate::proof::ProofGenerator;
use crate::repositories::Repositories;
use crate::seed::SeedData;
use crate::services::prove_gateway::ChainEndpoints;
use crate::services::{ConfirmDepositService, ConfirmWithdrawService, ProveGatewayService};

/// Proof generator and executor of one chain.
#[derive(Clone)]
struct ChainComponents {
    proof_generator: Arc<ProofGenerator>,
    executor: Arc<TransactionExecutor>,
}

impl ChainComponents {
    fn endpoints(&self) -> ChainEndpoints {
        ChainEndpoints {
            proof_generator: self.proof_generator.clone(),
            executor: self.executor.clone(),
        }
    }
}

/// The running facilitator for one gateway pair.
pub struct Facilitator {
    config: Config,
    repositories: Arc<Repositories>,
    dispatcher: Arc<EntityDispatcher>,
    origin: ChainComponents,
    auxiliary: ChainComponents,
}

impl Facilitator {
    /// Creates a facilitator talking to the configured JSON-RPC nodes.
    ///
    /// # Returns
    ///
    /// * `Ok(Facilitator)` - Seeded and wired
    /// * `Err(anyhow::Error)` - The key is missing or a component could not be built
    pub async fn new(config: Config) -> Result<Self> {
        let timeout = config.facilitator.rpc_timeout();
        let origin_rpc = EvmClient::new(&config.origin.rpc_url, config.origin.chain_id, timeout)
            .context("Failed to create origin chain client")?;
        let auxiliary_rpc = EvmClient::new(&config.auxiliary.rpc_url, config.auxiliary.chain_id, timeout)
            .context("Failed to create auxiliary chain client")?;
        let crypto_service = CryptoService::new(&config)?;

        Self::with_clients(config, Arc::new(origin_rpc), Arc::new(auxiliary_rpc), Arc::new(crypto_service)).await
    }

    /// Creates a facilitator over the given chain clients.
    ///
    /// # Arguments
    ///
    /// * `config` - Validated configuration
    /// * `origin_rpc` - Origin chain
    /// * `auxiliary_rpc` - Auxiliary chain
    /// * `crypto_service` - Facilitator key, used on both chains
    pub async fn with_clients(
        config: Config,
        origin_rpc: Arc<dyn ChainRpc>,
        auxiliary_rpc: Arc<dyn ChainRpc>,
        crypto_service: Arc<CryptoService>,
    ) -> Result<Self> {
        let repositories = Arc::new(Repositories::new());
        let polling_interval = config.facilitator.polling_interval();
        let outbox_offset = config.gateway.outbox_offset;

        let origin = ChainComponents {
            proof_generator: Arc::new(ProofGenerator::new(origin_rpc.clone(), outbox_offset)),
            executor: Arc::new(TransactionExecutor::new(
                repositories.transaction.clone(),
                origin_rpc,
                crypto_service.clone(),
                config.origin.gas_price(),
                polling_interval,
            )?),
        };
        let auxiliary = ChainComponents {
            proof_generator: Arc::new(ProofGenerator::new(auxiliary_rpc.clone(), outbox_offset)),
            executor: Arc::new(TransactionExecutor::new(
                repositories.transaction.clone(),
                auxiliary_rpc,
                crypto_service,
                config.auxiliary.gas_price(),
                polling_interval,
            )?),
        };

        let seed = SeedData::from_config(&config)?;
        seed.populate(&repositories).await.context("Failed to seed repositories")?;

        let confirm_deposit = ConfirmDepositService::new(
            seed.origin_gateway,
            repositories.message.clone(),
            repositories.deposit_intent.clone(),
            origin.proof_generator.clone(),
            auxiliary.executor.clone(),
        );
        let confirm_withdraw = ConfirmWithdrawService::new(
            seed.auxiliary_cogateway,
            repositories.message.clone(),
            repositories.withdraw_intent.clone(),
            repositories.token_pair.clone(),
            auxiliary.proof_generator.clone(),
            origin.executor.clone(),
        );
        let prove_gateway = ProveGatewayService::new(
            repositories.gateway.clone(),
            repositories.message.clone(),
            origin.endpoints(),
            auxiliary.endpoints(),
        );

        repositories.gateway.attach(Arc::new(confirm_deposit)).await?;
        repositories.gateway.attach(Arc::new(confirm_withdraw)).await?;
        repositories.anchor.attach(Arc::new(prove_gateway)).await?;

        let dispatcher = Arc::new(EntityDispatcher::new(repositories.clone(), config.allow_list()?));

        info!(
            "Facilitator ready for gateway {} and cogateway {} as {}",
            seed.origin_gateway,
            seed.auxiliary_cogateway,
            origin.executor.from_address()
        );

        Ok(Self {
            config,
            repositories,
            dispatcher,
            origin,
            auxiliary,
        })
    }

    pub fn repositories(&self) -> &Arc<Repositories> {
        &self.repositories
    }

    pub fn dispatcher(&self) -> &Arc<EntityDispatcher> {
        &self.dispatcher
    }

    pub fn origin_executor(&self) -> &Arc<TransactionExecutor> {
        &self.origin.executor
    }

    pub fn auxiliary_executor(&self) -> &Arc<TransactionExecutor> {
        &self.auxiliary.executor
    }

    pub fn api_server(&self) -> ApiServer {
        ApiServer::new(self.config.api.clone(), self.dispatcher.clone())
    }

    /// Runs the executors and the intake API until Ctrl-C.
    pub async fn run(&self) -> Result<()> {
        let origin_loop = self.origin.executor.start();
        let auxiliary_loop = self.auxiliary.executor.start();
        let api = self.api_server();

        let outcome = tokio::select! {
            result = api.run() => result,
            signal = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
                signal.context("Failed to listen for shutdown signal")
            }
        };

        self.origin.executor.stop();
        self.auxiliary.executor.stop();
        for (chain, handle) in [("origin", origin_loop), ("auxiliary", auxiliary_loop)] {
            if let Err(e) = handle.await {
                error!("Executor task for {} chain failed: {}", chain, e);
            }
        }

        info!("Facilitator stopped");
        outcome
    }
}
