use std::{path::Path, time::Duration};

use anyhow::{anyhow, Context, Result};
use ethers::{
    etherscan::{
        verify::{CodeFormat, VerifyContract},
        Client,
    },
    types::{Chain, H160},
};
use tokio::time::sleep;

const STATUS_POLL_INTERVAL: Duration = Duration::from_secs(10);
const STATUS_POLL_ATTEMPTS: usize = 12;

/// Single-file source verification against the connected chain's
/// Etherscan-family explorer. Built once per deployment, consumed by
/// [`Verifier::verify`].
pub struct Verifier {
    chain_id: u64,
    api_key: String,
    address: H160,
    contract_name: String,
    source: String,
    compiler_version: String,
    optimizer_runs: Option<u32>,
    constructor_arguments: Option<String>,
}

impl Verifier {
    pub fn new(
        chain_id: u64,
        api_key: String,
        address: H160,
        contract_name: String,
        source: String,
        compiler_version: String,
    ) -> Self {
        Self {
            chain_id,
            api_key,
            address,
            contract_name,
            source,
            compiler_version,
            optimizer_runs: None,
            constructor_arguments: None,
        }
    }

    pub fn with_optimizer_runs(mut self, runs: Option<u32>) -> Self {
        self.optimizer_runs = runs;
        self
    }

    pub fn with_constructor_arguments(mut self, arguments: Option<String>) -> Self {
        self.constructor_arguments = arguments;
        self
    }

    pub async fn verify(self) -> Result<()> {
        let chain = Chain::try_from(self.chain_id)
            .map_err(|_| anyhow!("no known explorer for chain id {}", self.chain_id))?;
        let client = Client::new(chain, self.api_key)?;

        let mut request = VerifyContract::new(
            self.address,
            self.contract_name,
            self.source,
            self.compiler_version,
        )
        .code_format(CodeFormat::SingleFile)
        .constructor_arguments(self.constructor_arguments)
        .optimization(self.optimizer_runs.is_some());
        if let Some(runs) = self.optimizer_runs {
            request = request.runs(runs);
        }

        let submission = client.submit_contract_verification(&request).await?;
        if submission.status == "0" {
            if already_verified(&submission.result) {
                log::info!("contract already verified");
                return Ok(());
            }
            return Err(anyhow!(
                "verification submission rejected: {}",
                submission.result
            ));
        }
        let guid = submission.result;
        log::info!("verification submitted, guid:{}", guid);

        for _ in 0..STATUS_POLL_ATTEMPTS {
            sleep(STATUS_POLL_INTERVAL).await;
            let status = client.check_contract_verification_status(&guid).await?;
            if is_pending(&status.result) {
                log::info!("verification pending");
                continue;
            }
            if verification_passed(&status.status, &status.result) {
                return Ok(());
            }
            return Err(anyhow!("verification failed: {}", status.result));
        }
        Err(anyhow!(
            "verification still pending after {} status checks",
            STATUS_POLL_ATTEMPTS
        ))
    }
}

pub fn load_source(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .with_context(|| format!("failed to read source file {}", path.display()))
}

fn already_verified(result: &str) -> bool {
    let result = result.to_ascii_lowercase();
    result.contains("already verified")
}

fn is_pending(result: &str) -> bool {
    result == "Pending in queue"
}

fn verification_passed(status: &str, result: &str) -> bool {
    status == "1" || result.starts_with("Pass") || already_verified(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn recognizes_already_verified_responses() {
        assert!(already_verified("Contract source code already verified"));
        assert!(already_verified("Already Verified"));
        assert!(!already_verified("Unable to verify"));
    }

    #[test]
    fn recognizes_pending_status() {
        assert!(is_pending("Pending in queue"));
        assert!(!is_pending("Pass - Verified"));
    }

    #[test]
    fn interprets_terminal_status() {
        assert!(verification_passed("1", "Pass - Verified"));
        assert!(verification_passed("0", "Already Verified"));
        assert!(!verification_passed("0", "Fail - Unable to verify"));
    }

    #[test]
    fn loads_source_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "pragma solidity ^0.8.20;").unwrap();
        let source = load_source(file.path()).unwrap();
        assert!(source.contains("pragma solidity"));
    }

    #[test]
    fn missing_source_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_source(&dir.path().join("Flat.sol")).unwrap_err();
        assert!(err.to_string().contains("Flat.sol"));
    }
}
