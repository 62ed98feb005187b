//! Minimal end-to-end test runner.
//!
//! A [`Suite`] is a constructor that prepares shared state (node connection, funded
//! accounts) plus a list of named test cases run against that state. Suites and cases
//! run sequentially; failures are logged and reported once all suites are done.

use std::{future::Future, pin::Pin, time::Instant};

use crate::suites::TestConfig;

pub(crate) type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

type Constructor<S> = for<'a> fn(&'a TestConfig) -> BoxFuture<'a, anyhow::Result<S>>;
type CaseFn<S> = for<'a> fn(&'a S) -> BoxFuture<'a, anyhow::Result<()>>;

struct TestCase<S> {
    name: &'static str,
    run: CaseFn<S>,
}

pub(crate) struct Suite<S> {
    name: String,
    constructor: Constructor<S>,
    cases: Vec<TestCase<S>>,
}

impl<S> Suite<S> {
    pub(crate) fn new(name: impl Into<String>, constructor: Constructor<S>) -> Self {
        Self {
            name: name.into(),
            constructor,
            cases: Vec::new(),
        }
    }

    pub(crate) fn case(mut self, name: &'static str, run: CaseFn<S>) -> Self {
        self.cases.push(TestCase { name, run });
        self
    }
}

#[derive(Debug, Default)]
pub(crate) struct Report {
    passed: usize,
    failed: Vec<String>,
}

#[async_trait::async_trait]
trait RunnableSuite: Send + Sync {
    async fn run(&self, config: &TestConfig, report: &mut Report);
}

#[async_trait::async_trait]
impl<S: Send + Sync + 'static> RunnableSuite for Suite<S> {
    async fn run(&self, config: &TestConfig, report: &mut Report) {
        tracing::info!("Running suite: {}", self.name);
        let state = match (self.constructor)(config).await {
            Ok(state) => state,
            Err(err) => {
                tracing::error!(suite = %self.name, err = ?err, "Suite setup failed");
                report
                    .failed
                    .extend(self.cases.iter().map(|case| format!("{} > {}", self.name, case.name)));
                return;
            }
        };

        for case in &self.cases {
            let started = Instant::now();
            match (case.run)(&state).await {
                Ok(()) => {
                    tracing::info!(elapsed = ?started.elapsed(), "✓ {}", case.name);
                    report.passed += 1;
                }
                Err(err) => {
                    tracing::error!(err = ?err, "✗ {}", case.name);
                    report.failed.push(format!("{} > {}", self.name, case.name));
                }
            }
        }
    }
}

pub(crate) struct Tester {
    config: TestConfig,
    suites: Vec<Box<dyn RunnableSuite>>,
}

impl Tester {
    pub(crate) fn new(config: TestConfig) -> Self {
        Self {
            config,
            suites: Vec::new(),
        }
    }

    pub(crate) fn add_suite<S: Send + Sync + 'static>(&mut self, suite: Suite<S>) {
        self.suites.push(Box::new(suite));
    }

    pub(crate) async fn run(&self) -> anyhow::Result<()> {
        let mut report = Report::default();
        for suite in &self.suites {
            suite.run(&self.config, &mut report).await;
        }

        tracing::info!(
            passed = report.passed,
            failed = report.failed.len(),
            "Test run finished"
        );
        if !report.failed.is_empty() {
            anyhow::bail!(
                "{} test(s) failed:\n{}",
                report.failed.len(),
                report.failed.join("\n")
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[derive(Default)]
    struct Counter(AtomicUsize);

    impl Counter {
        async fn bump(&self) -> anyhow::Result<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn fail(&self) -> anyhow::Result<()> {
            anyhow::bail!("failed after {} runs", self.0.load(Ordering::SeqCst))
        }
    }

    fn config() -> TestConfig {
        TestConfig {
            rpc_url: "http://127.0.0.1:8545".to_string(),
        }
    }

    async fn new_counter(_config: &TestConfig) -> anyhow::Result<Counter> {
        Ok(Counter::default())
    }

    async fn no_node(_config: &TestConfig) -> anyhow::Result<Counter> {
        anyhow::bail!("no node")
    }

    #[tokio::test]
    async fn reports_failed_cases() {
        let suite = Suite::<Counter>::new("counter", |config| Box::pin(new_counter(config)))
            .case("bump", |c| Box::pin(c.bump()))
            .case("fail", |c| Box::pin(c.fail()))
            .case("bump again", |c| Box::pin(c.bump()));

        let mut report = Report::default();
        suite.run(&config(), &mut report).await;
        assert_eq!(report.passed, 2);
        assert_eq!(report.failed, vec!["counter > fail".to_string()]);
    }

    #[tokio::test]
    async fn failed_setup_fails_every_case() {
        let suite = Suite::<Counter>::new("broken", |config| Box::pin(no_node(config)))
            .case("bump", |c| Box::pin(c.bump()));

        let mut tester = Tester::new(config());
        tester.add_suite(suite);
        let err = tester.run().await.unwrap_err();
        assert!(err.to_string().contains("broken > bump"));
    }
}
