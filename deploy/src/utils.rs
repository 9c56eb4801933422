use std::{sync::Arc, time::Duration};

use anyhow::{anyhow, Result};
use ethers::{
    abi::{
        token::{LenientTokenizer, Tokenizer},
        Abi, Token,
    },
    middleware::SignerMiddleware,
    providers::{Http, Middleware, Provider},
    signers::LocalWallet,
    types::{TransactionReceipt, H256},
    utils::hex,
};
use tokio::time::sleep;

pub type EthClient = SignerMiddleware<Provider<Http>, LocalWallet>;

/// Chain ids used by local development nodes (ganache, hardhat/anvil).
pub fn is_dev_chain(chain_id: u64) -> bool {
    matches!(chain_id, 1337 | 31337)
}

pub fn parse_constructor_args(abi: &Abi, values: &[String]) -> Result<Vec<Token>> {
    let params = abi.constructor().map(|c| c.inputs.as_slice()).unwrap_or(&[]);
    if params.len() != values.len() {
        return Err(anyhow!(
            "constructor expects {} argument(s), got {}",
            params.len(),
            values.len()
        ));
    }
    params
        .iter()
        .zip(values)
        .map(|(param, value)| {
            LenientTokenizer::tokenize(&param.kind, value)
                .map_err(|e| anyhow!("invalid value {:?} for {} ({}): {}", value, param.name, param.kind, e))
        })
        .collect()
}

/// ABI-encoded constructor arguments as unprefixed hex, the form the
/// explorer's verification endpoint expects. None when the constructor
/// takes no arguments.
pub fn encode_constructor_args(tokens: &[Token]) -> Option<String> {
    if tokens.is_empty() {
        return None;
    }
    Some(hex::encode(ethers::abi::encode(tokens)))
}

pub async fn wait_for_confirmations(
    client: Arc<EthClient>,
    transaction_hash: H256,
    confirmations: u64,
) -> Result<()> {
    let receipt = get_transaction_receipt(client.clone(), transaction_hash).await?;
    let included = receipt
        .block_number
        .ok_or(anyhow!("transaction not yet mined"))?
        .as_u64();
    loop {
        let current = client.get_block_number().await?.as_u64();
        if current + 1 >= included + confirmations {
            return Ok(());
        }
        sleep(Duration::from_secs(1)).await;
    }
}

pub async fn get_transaction_receipt(
    client: Arc<EthClient>,
    transaction_hash: H256,
) -> Result<TransactionReceipt> {
    client
        .get_transaction_receipt(transaction_hash)
        .await?
        .ok_or(anyhow!("transaction receipt not found"))
}
