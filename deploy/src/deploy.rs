use std::sync::Arc;

use anyhow::Result;
use ethers::{
    abi::Token,
    contract::ContractFactory,
    middleware::SignerMiddleware,
    providers::{Http, Middleware, Provider},
    signers::{LocalWallet, Signer},
    types::{TransactionReceipt, H160, H256},
    utils::{format_ether, hex},
};
use serde::Serialize;

use crate::{
    contracts::{NFTMARKETPLACE_ABI, NFTMARKETPLACE_BYTECODE},
    utils::{self, EthClient},
    verify::Verifier,
};

pub const CONTRACT_NAME: &str = "NFTMarketplace";

/// One machine-readable line per deployment, logged after mining.
#[derive(Debug, Serialize)]
pub struct DeploymentSummary {
    pub contract: &'static str,
    pub address: H160,
    pub transaction_hash: H256,
    pub block_number: Option<u64>,
    pub chain_id: u64,
}

pub struct VerifyOptions {
    pub api_key: Option<String>,
    pub source: Option<String>,
    pub contract_name: String,
    pub compiler_version: String,
    pub optimizer_runs: Option<u32>,
}

pub struct Deploy {
    client: Arc<EthClient>,
    chain_id: u64,
    confirmations: u64,
    legacy: bool,
    skip_verify: bool,
}

impl Deploy {
    pub async fn new(
        rpc: &str,
        sk: &str,
        confirmations: u64,
        legacy: bool,
        skip_verify: bool,
    ) -> Result<Self> {
        let wallet = LocalWallet::from_bytes(&hex::decode(sk.strip_prefix("0x").unwrap_or(sk))?)?;
        let provider = Provider::<Http>::try_from(rpc)?;
        let chain_id = provider.get_chainid().await?.as_u64();

        let client = Arc::new(SignerMiddleware::new(
            provider,
            wallet.with_chain_id(chain_id),
        ));

        Ok(Self {
            client,
            chain_id,
            confirmations,
            legacy,
            skip_verify,
        })
    }

    pub async fn run(&self, constructor_args: &[String], verify: VerifyOptions) -> Result<()> {
        let deployer = self.client.address();
        println!("Deploying contracts with account: {:?}", deployer);
        let balance = self.client.get_balance(deployer, None).await?;
        println!("Account balance: {} ETH", format_ether(balance));

        let tokens = utils::parse_constructor_args(&NFTMARKETPLACE_ABI, constructor_args)?;
        let (address, receipt) = self.deploy_marketplace(tokens.clone()).await?;
        println!("{} deployed to: {:?}", CONTRACT_NAME, address);

        let summary = DeploymentSummary {
            contract: CONTRACT_NAME,
            address,
            transaction_hash: receipt.transaction_hash,
            block_number: receipt.block_number.map(|n| n.as_u64()),
            chain_id: self.chain_id,
        };
        log::info!("deployment summary:{}", serde_json::to_string(&summary)?);

        if should_verify(self.chain_id, self.skip_verify) {
            println!(
                "Waiting for {} confirmations before verification...",
                self.confirmations
            );
            utils::wait_for_confirmations(
                self.client.clone(),
                receipt.transaction_hash,
                self.confirmations,
            )
            .await?;

            // Verification failure must not fail the deployment.
            match self.verify_marketplace(address, &tokens, verify).await {
                Ok(()) => println!("Contract verified on Etherscan!"),
                Err(e) => log::warn!("verification error:{:?}", e),
            }
        }

        Ok(())
    }

    async fn deploy_marketplace(
        &self,
        tokens: Vec<Token>,
    ) -> Result<(H160, TransactionReceipt)> {
        let factory = ContractFactory::new(
            NFTMARKETPLACE_ABI.clone(),
            NFTMARKETPLACE_BYTECODE.clone(),
            self.client.clone(),
        );
        let mut deployer = factory.deploy(tokens)?;
        if self.legacy {
            deployer = deployer.legacy();
        }
        let (contract, receipt) = deployer.send_with_receipt().await?;
        Ok((contract.address(), receipt))
    }

    async fn verify_marketplace(
        &self,
        address: H160,
        tokens: &[Token],
        opts: VerifyOptions,
    ) -> Result<()> {
        let Some(api_key) = opts.api_key else {
            log::warn!("no etherscan api key configured, skipping verification");
            return Ok(());
        };
        let Some(source) = opts.source else {
            log::warn!("no flattened source provided, skipping verification");
            return Ok(());
        };

        Verifier::new(
            self.chain_id,
            api_key,
            address,
            opts.contract_name,
            source,
            opts.compiler_version,
        )
        .with_optimizer_runs(opts.optimizer_runs)
        .with_constructor_arguments(utils::encode_constructor_args(tokens))
        .verify()
        .await
    }
}

/// Verification runs only against public networks and only when not
/// explicitly disabled.
pub fn should_verify(chain_id: u64, skip_verify: bool) -> bool {
    !skip_verify && !utils::is_dev_chain(chain_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_chains_never_verify() {
        assert!(!should_verify(1337, false));
        assert!(!should_verify(31337, false));
    }

    #[test]
    fn public_chains_verify_unless_skipped() {
        assert!(should_verify(1, false));
        assert!(should_verify(11155111, false));
        assert!(!should_verify(1, true));
    }

    #[test]
    fn summary_serializes_address_and_chain() {
        let summary = DeploymentSummary {
            contract: CONTRACT_NAME,
            address: H160::zero(),
            transaction_hash: H256::zero(),
            block_number: Some(10),
            chain_id: 11155111,
        };
        let json: serde_json::Value =
            serde_json::from_str(&serde_json::to_string(&summary).unwrap()).unwrap();
        assert_eq!(json["contract"], "NFTMarketplace");
        assert_eq!(
            json["address"],
            "0x0000000000000000000000000000000000000000"
        );
        assert_eq!(json["block_number"], 10);
        assert_eq!(json["chain_id"], 11155111);
    }
}
