//! Tool Bridge 통합 테스트 - in-memory provider 사용
//!
//! `cargo test -p forge-core --test bridge_test`

use async_trait::async_trait;
use forge_core::{McpTool, PatternRedactor, ProviderConnector, ToolBridge, ToolProvider};
use forge_foundation::{BridgeConfig, Error, Result, ServerConfig};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// How a mock server behaves
#[derive(Clone, Default)]
struct MockSpec {
    tools: Vec<McpTool>,
    /// Delay before answering `call_tool`
    delay: Option<Duration>,
    fail_connect: bool,
    fail_list: bool,
}

#[derive(Default)]
struct Observed {
    connects: Mutex<Vec<String>>,
    calls: Mutex<Vec<(String, String, Value)>>,
    closed: Mutex<Vec<String>>,
    tokens: Mutex<Vec<CancellationToken>>,
}

struct MockProvider {
    server: String,
    spec: MockSpec,
    observed: Arc<Observed>,
}

#[async_trait]
impl ToolProvider for MockProvider {
    fn server(&self) -> &str {
        &self.server
    }

    async fn list_tools(&self) -> Result<Vec<McpTool>> {
        if self.spec.fail_list {
            return Err(Error::Protocol("tools/list exploded".into()));
        }
        Ok(self.spec.tools.clone())
    }

    async fn call_tool(&self, name: &str, args: Value, cancel: CancellationToken) -> Result<Value> {
        self.observed
            .calls
            .lock()
            .push((self.server.clone(), name.to_string(), args.clone()));
        self.observed.tokens.lock().push(cancel);
        if let Some(delay) = self.spec.delay {
            tokio::time::sleep(delay).await;
        }
        if name == "fail" {
            return Err(Error::tool_execution(name, "provider said no"));
        }
        if name == "reject" {
            return Err(Error::tool_execution(name, format!("owner {} not allowed", args["owner"])));
        }
        Ok(json!({ "tool": name, "echo": args }))
    }

    async fn close(&self) -> Result<()> {
        self.observed.closed.lock().push(self.server.clone());
        Ok(())
    }
}

struct MockConnector {
    specs: HashMap<String, MockSpec>,
    observed: Arc<Observed>,
}

#[async_trait]
impl ProviderConnector for MockConnector {
    async fn connect(&self, config: &ServerConfig) -> Result<Arc<dyn ToolProvider>> {
        self.observed.connects.lock().push(config.name.clone());
        let spec = self.specs.get(&config.name).cloned().unwrap_or_default();
        if spec.fail_connect {
            return Err(Error::connection(&config.name, "refused"));
        }
        Ok(Arc::new(MockProvider {
            server: config.name.clone(),
            spec,
            observed: Arc::clone(&self.observed),
        }))
    }
}

fn tool(name: &str) -> McpTool {
    McpTool::new(name, format!("{} tool", name), json!({"type": "object"}))
}

fn bridge(config: BridgeConfig, specs: Vec<(&str, MockSpec)>) -> (ToolBridge, Arc<Observed>) {
    let observed = Arc::new(Observed::default());
    let connector = MockConnector {
        specs: specs
            .into_iter()
            .map(|(name, spec)| (name.to_string(), spec))
            .collect(),
        observed: Arc::clone(&observed),
    };
    (
        ToolBridge::new(config).with_connector(Arc::new(connector)),
        observed,
    )
}

fn k8s_spec() -> MockSpec {
    MockSpec {
        tools: vec![tool("list_pods"), tool("get_logs"), tool("fail")],
        ..Default::default()
    }
}

#[tokio::test]
async fn test_initialize_registers_qualified_names() {
    let (bridge, _) = bridge(
        BridgeConfig::default(),
        vec![
            ("k8s", k8s_spec()),
            ("github", MockSpec { tools: vec![tool("list_pods")], ..Default::default() }),
        ],
    );
    bridge
        .initialize(&[ServerConfig::new("k8s", "x"), ServerConfig::new("github", "y")])
        .await
        .expect("initialize failed");

    let names: Vec<_> = bridge
        .list_tools()
        .await
        .into_iter()
        .map(|t| t.qualified_name)
        .collect();
    assert_eq!(
        names,
        vec!["k8s__list_pods", "k8s__get_logs", "k8s__fail", "github__list_pods"]
    );
    assert_eq!(bridge.list_servers().await, vec!["k8s", "github"]);
    assert_eq!(bridge.server_tools("github").await.unwrap().len(), 1);
    assert!(matches!(
        bridge.server_tools("gitlab").await,
        Err(Error::UnknownServer(_))
    ));
}

#[tokio::test]
async fn test_duplicate_server_fails_before_connecting() {
    let (bridge, observed) = bridge(BridgeConfig::default(), vec![("k8s", k8s_spec())]);
    let result = bridge
        .initialize(&[ServerConfig::new("k8s", "a"), ServerConfig::new("k8s", "b")])
        .await;

    assert!(matches!(result, Err(Error::DuplicateServer(name)) if name == "k8s"));
    assert!(observed.connects.lock().is_empty());
    assert!(!bridge.is_initialized().await);
}

#[tokio::test]
async fn test_duplicate_tool_rejected() {
    let (bridge, observed) = bridge(
        BridgeConfig::default(),
        vec![("k8s", MockSpec { tools: vec![tool("a"), tool("a")], ..Default::default() })],
    );
    let result = bridge.initialize(&[ServerConfig::new("k8s", "x")]).await;

    assert!(matches!(result, Err(Error::DuplicateTool(name)) if name == "k8s__a"));
    assert_eq!(*observed.closed.lock(), vec!["k8s"]);
}

#[tokio::test]
async fn test_partial_failure_cleans_up() {
    let (bridge, observed) = bridge(
        BridgeConfig::default(),
        vec![
            ("k8s", k8s_spec()),
            ("broken", MockSpec { fail_connect: true, ..Default::default() }),
        ],
    );
    let result = bridge
        .initialize(&[ServerConfig::new("k8s", "x"), ServerConfig::new("broken", "y")])
        .await;

    assert!(matches!(result, Err(Error::Connection { .. })));
    assert_eq!(*observed.closed.lock(), vec!["k8s"]);
    assert!(bridge.list_tools().await.is_empty());
    assert!(bridge.list_servers().await.is_empty());
    assert!(!bridge.is_initialized().await);

    // a failed bridge can be initialised again
    let (bridge, _) = bridge_with_k8s();
    bridge.initialize(&[ServerConfig::new("k8s", "x")]).await.unwrap();
    assert!(bridge.is_initialized().await);
}

#[tokio::test]
async fn test_list_failure_closes_provider() {
    let (bridge, observed) = bridge(
        BridgeConfig::default(),
        vec![("k8s", MockSpec { fail_list: true, ..Default::default() })],
    );
    let result = bridge.initialize(&[ServerConfig::new("k8s", "x")]).await;
    assert!(matches!(result, Err(Error::Connection { server, .. }) if server == "k8s"));
    assert_eq!(*observed.closed.lock(), vec!["k8s"]);
}

fn bridge_with_k8s() -> (ToolBridge, Arc<Observed>) {
    bridge(BridgeConfig::default(), vec![("k8s", k8s_spec())])
}

#[tokio::test]
async fn test_unknown_tool_never_reaches_provider() {
    let (bridge, observed) = bridge_with_k8s();
    bridge.initialize(&[ServerConfig::new("k8s", "x")]).await.unwrap();

    let result = bridge.call_tool("k8s__delete_cluster", json!({})).await;
    assert!(matches!(result, Err(Error::UnknownTool(name)) if name == "k8s__delete_cluster"));
    assert!(observed.calls.lock().is_empty());
}

#[tokio::test]
async fn test_call_passes_through() {
    let (bridge, observed) = bridge_with_k8s();
    bridge.initialize(&[ServerConfig::new("k8s", "x")]).await.unwrap();

    let result = bridge
        .call_tool("k8s__list_pods", json!({"namespace": "web"}))
        .await
        .unwrap();
    assert_eq!(result, json!({"tool": "list_pods", "echo": {"namespace": "web"}}));

    let calls = observed.calls.lock();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0], ("k8s".to_string(), "list_pods".to_string(), json!({"namespace": "web"})));
}

#[tokio::test]
async fn test_tool_error_tagged_with_qualified_name() {
    let (bridge, _) = bridge_with_k8s();
    bridge.initialize(&[ServerConfig::new("k8s", "x")]).await.unwrap();

    match bridge.call_tool("k8s__fail", json!({})).await {
        Err(Error::ToolExecution { tool, message }) => {
            assert_eq!(tool, "k8s__fail");
            assert_eq!(message, "provider said no");
        }
        other => panic!("unexpected: {:?}", other),
    }
}

#[tokio::test]
async fn test_slow_provider_times_out() {
    let (bridge, observed) = bridge(
        BridgeConfig::default(),
        vec![(
            "slow",
            MockSpec {
                tools: vec![tool("wait")],
                delay: Some(Duration::from_secs(30)),
                ..Default::default()
            },
        )],
    );
    bridge
        .initialize(&[ServerConfig::new("slow", "x").timeout_ms(50)])
        .await
        .unwrap();

    let started = Instant::now();
    let result = bridge.call_tool("slow__wait", json!({})).await;
    let elapsed = started.elapsed();

    match result {
        Err(Error::CallTimeout { qualified_name, budget_ms }) => {
            assert_eq!(qualified_name, "slow__wait");
            assert_eq!(budget_ms, 50);
        }
        other => panic!("unexpected: {:?}", other),
    }
    assert!(elapsed >= Duration::from_millis(50));
    assert!(elapsed < Duration::from_secs(5), "took {:?}", elapsed);

    // the provider was told the call was abandoned
    let tokens = observed.tokens.lock();
    assert_eq!(tokens.len(), 1);
    assert!(tokens[0].is_cancelled());
}

#[tokio::test]
async fn test_fast_call_leaves_no_timer() {
    let (bridge, observed) = bridge(
        BridgeConfig::default().default_timeout_ms(100),
        vec![("k8s", k8s_spec())],
    );
    bridge.initialize(&[ServerConfig::new("k8s", "x")]).await.unwrap();

    bridge.call_tool("k8s__list_pods", json!({})).await.unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert!(!observed.tokens.lock()[0].is_cancelled());
}

#[tokio::test]
async fn test_redaction_round_trip() {
    let (bridge, observed) = bridge(BridgeConfig::default(), vec![("k8s", k8s_spec())]);
    let bridge = bridge.with_redactor(Arc::new(PatternRedactor::with_defaults()));
    bridge.initialize(&[ServerConfig::new("k8s", "x")]).await.unwrap();

    let result = bridge
        .call_tool("k8s__list_pods", json!({"owner": "ops@example.com"}))
        .await
        .unwrap();

    // provider saw the placeholder, the caller gets the original back
    assert_eq!(observed.calls.lock()[0].2, json!({"owner": "[REDACTED_0]"}));
    assert_eq!(result["echo"]["owner"], "ops@example.com");
}

#[tokio::test]
async fn test_redaction_restored_in_tool_error() {
    let spec = MockSpec { tools: vec![tool("reject")], ..Default::default() };
    let (bridge, observed) = bridge(BridgeConfig::default(), vec![("k8s", spec)]);
    let bridge = bridge.with_redactor(Arc::new(PatternRedactor::with_defaults()));
    bridge.initialize(&[ServerConfig::new("k8s", "x")]).await.unwrap();

    let err = bridge
        .call_tool("k8s__reject", json!({"owner": "ops@example.com"}))
        .await
        .unwrap_err();

    assert_eq!(observed.calls.lock()[0].2, json!({"owner": "[REDACTED_0]"}));
    match err {
        Error::ToolExecution { tool, message } => {
            assert_eq!(tool, "k8s__reject");
            assert_eq!(message, "owner \"ops@example.com\" not allowed");
        }
        other => panic!("unexpected: {:?}", other),
    }
}

#[tokio::test]
async fn test_close_is_idempotent_and_clears_manifest() {
    let (bridge, observed) = bridge_with_k8s();
    bridge.initialize(&[ServerConfig::new("k8s", "x")]).await.unwrap();

    let first = bridge.manifest().await;
    let second = bridge.manifest().await;
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.tool_count(), 3);

    bridge.close().await.unwrap();
    bridge.close().await.unwrap();
    assert_eq!(*observed.closed.lock(), vec!["k8s"]);
    assert!(bridge.manifest().await.is_empty());
    assert!(matches!(
        bridge.call_tool("k8s__list_pods", json!({})).await,
        Err(Error::UnknownTool(_))
    ));
}

#[tokio::test]
async fn test_double_initialize_rejected() {
    let (bridge, _) = bridge_with_k8s();
    bridge.initialize(&[ServerConfig::new("k8s", "x")]).await.unwrap();
    let again = bridge.initialize(&[ServerConfig::new("k8s", "x")]).await;
    assert!(matches!(again, Err(Error::Config(_))));
}

#[tokio::test]
async fn test_initialize_configured() -> anyhow::Result<()> {
    let config = BridgeConfig::default().server(ServerConfig::new("k8s", "x"));
    let (bridge, _) = bridge(config, vec![("k8s", k8s_spec())]);
    bridge.initialize_configured().await?;
    assert_eq!(bridge.list_tools().await.len(), 3);
    Ok(())
}
