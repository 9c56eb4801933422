use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use crate::{
    deploy::{Deploy, VerifyOptions},
    verify,
};

#[derive(Debug, Parser)]
pub struct CommandLine {
    /// JSON-RPC endpoint of the target network.
    #[clap(short, long, env = "RPC_URL")]
    rpc: String,

    /// Deployer secret key, hex with optional 0x prefix.
    #[clap(long, env = "PRIVATE_KEY", hide_env_values = true)]
    sk: String,

    /// Constructor arguments, one value per parameter.
    #[clap(long, num_args = 0.., value_name = "VALUE")]
    constructor_args: Vec<String>,

    /// Confirmations to wait for before attempting verification.
    #[clap(short, long, default_value_t = 5)]
    confirmations: u64,

    /// Issue a pre-EIP-1559 deployment transaction.
    #[clap(long)]
    legacy: bool,

    /// Never attempt explorer verification.
    #[clap(long)]
    skip_verify: bool,

    #[clap(long, env = "ETHERSCAN_API_KEY", hide_env_values = true)]
    etherscan_api_key: Option<String>,

    /// Flattened contract source to submit for verification.
    #[clap(long)]
    source: Option<PathBuf>,

    /// Fully qualified contract name, File.sol:Name form.
    #[clap(long, default_value = "contracts/NFTMarketplace.sol:NFTMarketplace")]
    contract_name: String,

    #[clap(long, default_value = "v0.8.20+commit.a1b79de6")]
    compiler_version: String,

    #[clap(long)]
    optimizer_runs: Option<u32>,
}

impl CommandLine {
    pub async fn execute(self) -> Result<()> {
        let source = match &self.source {
            Some(path) => Some(verify::load_source(path)?),
            None => None,
        };

        let deploy = Deploy::new(
            &self.rpc,
            &self.sk,
            self.confirmations,
            self.legacy,
            self.skip_verify,
        )
        .await?;

        deploy
            .run(
                &self.constructor_args,
                VerifyOptions {
                    api_key: self.etherscan_api_key,
                    source,
                    contract_name: self.contract_name,
                    compiler_version: self.compiler_version,
                    optimizer_runs: self.optimizer_runs,
                },
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_with_defaults() {
        let cmd = CommandLine::try_parse_from([
            "deploy",
            "--rpc",
            "http://127.0.0.1:8545",
            "--sk",
            "0x0123",
        ])
        .unwrap();
        assert_eq!(cmd.confirmations, 5);
        assert!(!cmd.legacy);
        assert!(!cmd.skip_verify);
        assert!(cmd.constructor_args.is_empty());
        assert_eq!(
            cmd.contract_name,
            "contracts/NFTMarketplace.sol:NFTMarketplace"
        );
    }

    #[test]
    fn parses_constructor_args_list() {
        let cmd = CommandLine::try_parse_from([
            "deploy",
            "--rpc",
            "http://127.0.0.1:8545",
            "--sk",
            "0x0123",
            "--constructor-args",
            "42",
            "0x000000000000000000000000000000000000dEaD",
            "--confirmations",
            "2",
            "--skip-verify",
        ])
        .unwrap();
        assert_eq!(cmd.constructor_args.len(), 2);
        assert_eq!(cmd.confirmations, 2);
        assert!(cmd.skip_verify);
    }
}
