use crate::suites::TestConfig;
use tracing_subscriber::{layer::SubscriberExt as _, util::SubscriberInitExt as _};

mod assertions;
mod contracts;
mod harness;
mod revert;
mod suites;
mod utils;

const DEFAULT_URL: &str = "http://127.0.0.1:8545";

fn init_tracing() {
    let env_filter =
        tracing_subscriber::filter::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            let app_name = env!("CARGO_PKG_NAME").replace('-', "_");
            let filter = format!("{app_name}=info");
            tracing_subscriber::filter::EnvFilter::new(filter)
        });
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().without_time())
        .with(env_filter)
        .init();
}

#[tokio::main]
async fn main() {
    init_tracing();

    let config = TestConfig::from_env(DEFAULT_URL);
    let mut tester = harness::Tester::new(config);
    tester.add_suite(suites::reverted_without_reason_string::RevertedWithoutReasonString::spawned());
    tester.add_suite(suites::reverted_without_reason_string::RevertedWithoutReasonString::connected());
    tester.add_suite(suites::reverted::RevertMatchers::spawned());
    tester.add_suite(suites::reverted::RevertMatchers::connected());

    if let Err(err) = tester.run().await {
        tracing::error!(err = ?err, "Test run failed");
        std::process::exit(1);
    }
}
