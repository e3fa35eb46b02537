//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`], a full [`AppContext`] whose engine is a scripted
//! stand-in, and [`TestHarness::with_server`] which starts Axum on a random
//! port for HTTP-level testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

use rp_core::config::Config;
use rp_engine::{Engine, EngineFactory, LogEntry, Logger, ToolRegistry};
use rp_server::context::AppContext;
use rp_server::router::build_router;

/// Engine that "transcodes" by prefixing the input with the argument string.
pub struct EchoEngine {
    logger: Logger,
    gate: Option<Arc<Notify>>,
    fail_transcode: bool,
    files: Vec<(String, Vec<u8>)>,
}

#[async_trait]
impl Engine for EchoEngine {
    async fn load(&mut self) -> rp_core::Result<()> {
        (self.logger)(LogEntry::info("echo engine ready"));
        Ok(())
    }

    async fn write(&mut self, name: &str, data: &[u8]) -> rp_core::Result<()> {
        self.files.push((name.to_string(), data.to_vec()));
        Ok(())
    }

    async fn transcode(&mut self, input: &str, output: &str, args: &str) -> rp_core::Result<()> {
        (self.logger)(LogEntry::stderr(format!("args: {args}")));
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if self.fail_transcode {
            return Err(rp_core::Error::tool("ffmpeg", "exited with status 1"));
        }
        let source = self
            .files
            .iter()
            .find(|(n, _)| n == input)
            .map(|(_, d)| d.clone())
            .ok_or_else(|| rp_core::Error::not_found("file", input))?;
        let mut out = format!("[{args}]").into_bytes();
        out.extend_from_slice(&source);
        self.files.push((output.to_string(), out));
        Ok(())
    }

    async fn read(&mut self, name: &str) -> rp_core::Result<Vec<u8>> {
        self.files
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, d)| d.clone())
            .ok_or_else(|| rp_core::Error::not_found("file", name))
    }
}

#[derive(Default)]
pub struct EchoFactory {
    pub gate: Option<Arc<Notify>>,
    pub fail_transcode: bool,
    pub created: AtomicUsize,
}

impl EngineFactory for EchoFactory {
    fn create(&self, logger: Logger) -> Box<dyn Engine> {
        self.created.fetch_add(1, Ordering::SeqCst);
        Box::new(EchoEngine {
            logger,
            gate: self.gate.clone(),
            fail_transcode: self.fail_transcode,
            files: Vec::new(),
        })
    }
}

pub struct TestHarness {
    pub ctx: AppContext,
    pub factory: Arc<EchoFactory>,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_factory(EchoFactory::default())
    }

    pub fn with_factory(factory: EchoFactory) -> Self {
        Self::with_parts(Config::default(), factory)
    }

    pub fn with_parts(config: Config, factory: EchoFactory) -> Self {
        let factory = Arc::new(factory);
        let ctx = AppContext::new(
            config,
            Arc::clone(&factory) as Arc<dyn EngineFactory>,
            Arc::new(ToolRegistry::default()),
        );
        Self { ctx, factory }
    }

    /// Start an Axum server on a random port and return the harness together
    /// with the bound socket address.
    pub async fn with_server() -> (Self, SocketAddr) {
        Self::new().serve().await
    }

    pub async fn serve(self) -> (Self, SocketAddr) {
        let app = build_router(self.ctx.clone(), None);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind random port");
        let addr = listener.local_addr().expect("failed to get local addr");

        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        (self, addr)
    }

    /// Poll the form until `done` holds or a few seconds pass.
    pub async fn wait_for(&self, done: impl Fn(&rp_form::FormSnapshot) -> bool) -> rp_form::FormSnapshot {
        for _ in 0..200 {
            let snap = self.ctx.form.snapshot();
            if done(&snap) {
                return snap;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("form did not reach the expected state: {:?}", self.ctx.form.snapshot());
    }
}

/// Multipart body with one file part.
pub fn upload(name: &str, data: &[u8]) -> reqwest::multipart::Form {
    reqwest::multipart::Form::new().part(
        "file",
        reqwest::multipart::Part::bytes(data.to_vec()).file_name(name.to_string()),
    )
}
