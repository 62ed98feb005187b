use std::sync::Arc;

use alloy::{
    network::Ethereum,
    node_bindings::{Anvil, AnvilInstance},
    primitives::{Address, U256},
    providers::{DynProvider, Provider, ext::AnvilApi as _},
    signers::local::PrivateKeySigner,
};
use anyhow::Context as _;

use crate::contracts::Matchers::{self, MatchersInstance};

/// 100 ETH in wei.
const INITIAL_BALANCE: u128 = 100_000_000_000_000_000_000;

/// Node the suites talk to: either an `anvil` process owned by the suite, or an
/// already running node.
#[derive(Debug, Clone)]
pub(crate) struct Node {
    rpc_url: String,
    // Dropping the instance kills the process.
    _anvil: Option<Arc<AnvilInstance>>,
}

impl Node {
    pub fn spawn() -> anyhow::Result<Self> {
        let anvil = Anvil::new()
            .try_spawn()
            .context("Failed to spawn anvil, is it installed?")?;
        tracing::info!("Spawned anvil at: {}", anvil.endpoint());
        Ok(Self {
            rpc_url: anvil.endpoint(),
            _anvil: Some(Arc::new(anvil)),
        })
    }

    pub fn connect(rpc_url: &str) -> Self {
        Self {
            rpc_url: rpc_url.to_string(),
            _anvil: None,
        }
    }

    pub fn provider(&self, signer: PrivateKeySigner) -> anyhow::Result<DynProvider<Ethereum>> {
        let url = self
            .rpc_url
            .parse()
            .with_context(|| format!("Invalid RPC URL: {}", self.rpc_url))?;
        Ok(alloy::providers::builder::<Ethereum>()
            .with_recommended_fillers()
            .wallet(signer)
            .on_http(url)
            .erased())
    }

    pub async fn fund(&self, provider: &DynProvider<Ethereum>, account: Address) -> anyhow::Result<()> {
        provider
            .anvil_set_balance(account, U256::from(INITIAL_BALANCE))
            .await
            .with_context(|| format!("Unable to fund {account}"))?;
        anyhow::ensure!(
            provider.get_balance(account).await? > U256::ZERO,
            "Balance of {account} should be greater than 0",
        );
        Ok(())
    }

    pub async fn deploy_matchers(
        &self,
        provider: &DynProvider<Ethereum>,
    ) -> anyhow::Result<MatchersInstance<(), DynProvider<Ethereum>>> {
        let matchers = Matchers::deploy(provider.clone())
            .await
            .context("Can't deploy Matchers")?;
        tracing::info!("Deployed Matchers contract at: {:?}", matchers.address());
        Ok(matchers)
    }
}
