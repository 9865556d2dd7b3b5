//! Bridge → codegen → sandbox, end to end with in-memory providers
//!
//! `cargo test -p forge-sandbox --test bridge_e2e_test`

use async_trait::async_trait;
use forge_core::{CodegenManager, McpTool, ProviderConnector, ToolBridge, ToolProvider};
use forge_foundation::config::SandboxSettings;
use forge_foundation::{BridgeConfig, Error, Result, ServerConfig};
use forge_sandbox::{CapabilitySet, SandboxSession, ToolInvoker, Workspace};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

struct KubeProvider {
    calls: Arc<Mutex<Vec<(String, Value)>>>,
}

#[async_trait]
impl ToolProvider for KubeProvider {
    fn server(&self) -> &str {
        "k8s"
    }

    async fn list_tools(&self) -> Result<Vec<McpTool>> {
        Ok(vec![
            McpTool::new(
                "list_pods",
                "List pods in a namespace",
                json!({"type": "object", "properties": {"namespace": {"type": "string"}}}),
            ),
            McpTool::new(
                "get_pod",
                "Get one pod by name",
                json!({"type": "object", "properties": {"name": {"type": "string"}}, "required": ["name"]}),
            ),
            McpTool::new("restart", "Restart a deployment", json!({"type": "object"})),
            McpTool::new("hang", "Never answers in time", json!({"type": "object"})),
        ])
    }

    async fn call_tool(&self, name: &str, args: Value, _cancel: CancellationToken) -> Result<Value> {
        self.calls.lock().push((name.to_string(), args.clone()));
        match name {
            "list_pods" => Ok(json!({"items": [{"name": "api-0", "phase": "Running"}]})),
            "get_pod" => Ok(json!({"name": args["name"], "phase": "Running"})),
            "hang" => {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(Value::Null)
            }
            _ => Err(Error::tool_execution(name, "deployment not found")),
        }
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

struct KubeConnector {
    calls: Arc<Mutex<Vec<(String, Value)>>>,
}

#[async_trait]
impl ProviderConnector for KubeConnector {
    async fn connect(&self, _config: &ServerConfig) -> Result<Arc<dyn ToolProvider>> {
        Ok(Arc::new(KubeProvider {
            calls: Arc::clone(&self.calls),
        }))
    }
}

/// Records what reaches the bridge before delegating to it
struct Tap {
    bridge: Arc<ToolBridge>,
    seen: Mutex<Vec<(String, Value)>>,
}

#[async_trait]
impl ToolInvoker for Tap {
    async fn invoke(&self, qualified_name: &str, args: Value) -> Result<Value> {
        self.seen.lock().push((qualified_name.to_string(), args.clone()));
        self.bridge.call_tool(qualified_name, args).await
    }
}

struct Harness {
    dir: TempDir,
    bridge: Arc<ToolBridge>,
    provider_calls: Arc<Mutex<Vec<(String, Value)>>>,
}

async fn harness() -> anyhow::Result<Harness> {
    let provider_calls = Arc::new(Mutex::new(Vec::new()));
    let config = BridgeConfig::new()
        .default_timeout_ms(200)
        .server(ServerConfig::new("k8s", "kube-mcp"));
    let bridge = ToolBridge::new(config).with_connector(Arc::new(KubeConnector {
        calls: Arc::clone(&provider_calls),
    }));
    bridge.initialize_configured().await?;

    Ok(Harness {
        dir: TempDir::new()?,
        bridge: Arc::new(bridge),
        provider_calls,
    })
}

#[tokio::test]
async fn test_list_pods_through_bridge() -> anyhow::Result<()> {
    let h = harness().await?;
    let tap = Arc::new(Tap {
        bridge: Arc::clone(&h.bridge),
        seen: Mutex::new(Vec::new()),
    });
    let caps = CapabilitySet::builder(Arc::clone(&tap) as Arc<dyn ToolInvoker>)
        .manifest(h.bridge.manifest().await)
        .workspace(Workspace::new(h.dir.path())?)
        .build();

    let mut session = SandboxSession::create(caps, SandboxSettings::default()).await?;
    let value = session.run_code("return tools.kubernetes.listPods({})").await?;

    assert_eq!(value, json!({"items": [{"name": "api-0", "phase": "Running"}]}));
    assert_eq!(
        *tap.seen.lock(),
        vec![("k8s__list_pods".to_string(), json!({}))]
    );
    assert_eq!(
        *h.provider_calls.lock(),
        vec![("list_pods".to_string(), json!({}))]
    );
    assert!(h.provider_calls.lock().iter().all(|(name, _)| name != "get_pod"));
    Ok(())
}

#[tokio::test]
async fn test_sibling_tools_route_to_their_own_names() -> anyhow::Result<()> {
    let h = harness().await?;
    let names: Vec<_> = h.bridge.list_tools().await.iter().map(|t| t.qualified_name.clone()).collect();
    assert!(names.contains(&"k8s__list_pods".to_string()));
    assert!(names.contains(&"k8s__get_pod".to_string()));

    let caps = CapabilitySet::from_bridge(Arc::clone(&h.bridge)).await.build();
    let mut session = SandboxSession::create(caps, SandboxSettings::default()).await?;
    let value = session
        .run_code("return tools.kubernetes.getPod({ name: \"api-0\" })")
        .await?;

    assert_eq!(value, json!({"name": "api-0", "phase": "Running"}));
    assert_eq!(
        *h.provider_calls.lock(),
        vec![("get_pod".to_string(), json!({"name": "api-0"}))]
    );
    Ok(())
}

#[tokio::test]
async fn test_generated_stubs_run_in_sandbox() -> anyhow::Result<()> {
    let h = harness().await?;
    let generated = h.dir.path().join("generated");
    let report = CodegenManager::new(&generated)
        .generate(&h.bridge.list_tools().await)
        .await?;
    assert_eq!(report.tools, 4);

    let caps = CapabilitySet::from_bridge(Arc::clone(&h.bridge))
        .await
        .workspace(Workspace::new(h.dir.path())?)
        .build();
    let mut session = SandboxSession::create(caps, SandboxSettings::default()).await?;

    let value = session
        .run_code(
            "import { listPods } from \"./generated/servers/k8s/index.js\";\nimport { listTools } from \"./generated/runtime.js\";\nconst pods = await listPods({ namespace: \"prod\" });\nreturn { count: pods.items.length, tools: listTools(\"k8s\").map((t) => t.qualifiedName) };",
        )
        .await?;

    assert_eq!(
        value,
        json!({
            "count": 1,
            "tools": ["k8s__list_pods", "k8s__get_pod", "k8s__restart", "k8s__hang"],
        })
    );
    assert_eq!(
        *h.provider_calls.lock(),
        vec![("list_pods".to_string(), json!({"namespace": "prod"}))]
    );
    Ok(())
}

#[tokio::test]
async fn test_bridge_errors_reach_script_typed() -> anyhow::Result<()> {
    let h = harness().await?;
    let caps = CapabilitySet::from_bridge(Arc::clone(&h.bridge)).await.build();
    let mut session = SandboxSession::create(caps, SandboxSettings::default()).await?;

    let caught = session
        .run_code(
            "try {\n  await tools.kubernetes.restart({ name: \"web\" });\n} catch (e) {\n  return { kind: e.kind, origin: e.origin, message: e.message };\n}",
        )
        .await?;
    assert_eq!(caught["kind"], "ToolExecutionError");
    assert_eq!(caught["origin"], json!({"type": "tool", "name": "k8s__restart"}));
    assert!(caught["message"].as_str().unwrap_or_default().contains("deployment not found"));

    let err = session
        .run_code("return await callTool(\"k8s__hang\", {});")
        .await
        .unwrap_err();
    assert!(
        matches!(err, Error::CallTimeout { ref qualified_name, budget_ms: 200 } if qualified_name == "k8s__hang"),
        "{err}"
    );
    Ok(())
}
