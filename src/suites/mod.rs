pub(crate) mod helpers;
pub(crate) mod reverted;
pub(crate) mod reverted_without_reason_string;

#[derive(Debug, Clone)]
pub(crate) struct TestConfig {
    pub rpc_url: String,
}

impl TestConfig {
    /// Reads `RPC_URL` from the environment, falling back to `default_url`.
    pub fn from_env(default_url: &str) -> Self {
        let rpc_url = std::env::var("RPC_URL").unwrap_or_else(|_| default_url.to_string());
        Self { rpc_url }
    }
}
