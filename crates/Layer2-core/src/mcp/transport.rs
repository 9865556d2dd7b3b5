//! MCP Transport - 전송 계층 구현
//!
//! MCP 서버와의 통신을 위한 전송 계층
//! - Stdio: 로컬 프로세스와 stdin/stdout 통신 (newline-delimited JSON-RPC)
//!
//! A request whose caller gives up (cancellation token fired, or the request
//! future dropped by an outer timeout) is *abandoned*: the pending slot is
//! released and the server receives `notifications/cancelled`.

use super::types::{
    JsonRpcError, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse,
};
use async_trait::async_trait;
use forge_foundation::{Error, Result, ServerConfig};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

type PendingMap = Arc<Mutex<HashMap<u64, oneshot::Sender<JsonRpcResponse>>>>;

/// MCP Transport trait
#[async_trait]
pub trait McpTransport: Send + Sync {
    /// 요청 전송 및 응답 수신; `cancel` 이 발동하면 요청을 포기
    async fn request(
        &self,
        method: &str,
        params: Option<Value>,
        cancel: &CancellationToken,
    ) -> Result<Value>;

    /// 알림 전송 (응답 없음)
    async fn notify(&self, method: &str, params: Option<Value>) -> Result<()>;

    /// 연결 종료
    async fn close(&self) -> Result<()>;

    /// 연결 상태 확인
    fn is_connected(&self) -> bool;
}

/// Stdio Transport - 프로세스 기반 통신
pub struct StdioTransport {
    server: String,

    /// 요청 ID 카운터
    request_id: AtomicU64,

    /// 자식 프로세스
    child: tokio::sync::Mutex<Option<Child>>,

    /// stdin writer
    stdin_tx: mpsc::Sender<String>,

    /// 대기 중인 요청들 (id -> response sender)
    pending_requests: PendingMap,

    /// 연결 상태
    connected: Arc<AtomicBool>,
}

impl StdioTransport {
    /// 새 stdio transport 생성 및 프로세스 시작
    pub async fn spawn(config: &ServerConfig) -> Result<Self> {
        info!(
            "Spawning MCP process for '{}': {} {:?}",
            config.name, config.command, config.args
        );

        let mut cmd = Command::new(&config.command);
        cmd.args(&config.args)
            .envs(config.expanded_env())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| {
            Error::connection(
                &config.name,
                format!("failed to spawn '{}': {}", config.command, e),
            )
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| Error::connection(&config.name, "failed to capture stdin"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::connection(&config.name, "failed to capture stdout"))?;
        let stderr = child.stderr.take();

        // 요청 전송용 채널
        let (stdin_tx, mut stdin_rx) = mpsc::channel::<String>(32);

        let pending_requests: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let connected = Arc::new(AtomicBool::new(true));

        // stdin writer task
        let connected_for_writer = Arc::clone(&connected);
        let mut stdin_writer = stdin;
        tokio::spawn(async move {
            while let Some(msg) = stdin_rx.recv().await {
                if let Err(e) = stdin_writer.write_all(msg.as_bytes()).await {
                    error!("Failed to write to stdin: {}", e);
                    connected_for_writer.store(false, Ordering::SeqCst);
                    break;
                }
                if let Err(e) = stdin_writer.flush().await {
                    error!("Failed to flush stdin: {}", e);
                    connected_for_writer.store(false, Ordering::SeqCst);
                    break;
                }
            }
        });

        // stdout reader task
        let pending_for_reader = Arc::clone(&pending_requests);
        let connected_for_reader = Arc::clone(&connected);
        let reply_tx = stdin_tx.clone();
        let server = config.name.clone();
        let mut reader = BufReader::new(stdout).lines();
        tokio::spawn(async move {
            while let Ok(Some(line)) = reader.next_line().await {
                debug!(server = %server, "MCP stdout: {}", line);
                dispatch_line(&line, &pending_for_reader, &reply_tx);
            }
            connected_for_reader.store(false, Ordering::SeqCst);
            // 남은 요청은 sender drop 으로 실패 처리
            pending_for_reader.lock().clear();
            info!("MCP stdout reader for '{}' finished", server);
        });

        // stderr drain task
        if let Some(stderr) = stderr {
            let server = config.name.clone();
            let mut lines = BufReader::new(stderr).lines();
            tokio::spawn(async move {
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!(server = %server, "MCP stderr: {}", line);
                }
            });
        }

        Ok(Self {
            server: config.name.clone(),
            request_id: AtomicU64::new(1),
            child: tokio::sync::Mutex::new(Some(child)),
            stdin_tx,
            pending_requests,
            connected,
        })
    }

    /// 다음 요청 ID 생성
    fn next_id(&self) -> u64 {
        self.request_id.fetch_add(1, Ordering::SeqCst)
    }

    fn encode<T: serde::Serialize>(&self, message: &T) -> Result<String> {
        let mut line = serde_json::to_string(message)?;
        line.push('\n');
        Ok(line)
    }
}

/// Route one stdout line: responses complete pending requests, server
/// requests are refused, notifications are logged
fn dispatch_line(line: &str, pending: &PendingMap, reply_tx: &mpsc::Sender<String>) {
    let value: Value = match serde_json::from_str(line) {
        Ok(v) => v,
        Err(e) => {
            debug!("Non-JSON-RPC line or parse error: {}", e);
            return;
        }
    };

    if let Some(method) = value.get("method").and_then(Value::as_str) {
        match value.get("id") {
            Some(id) => {
                debug!("Refusing server request '{}'", method);
                let reply = JsonRpcResponse::error_reply(id.clone(), JsonRpcError::method_not_found(method));
                if let Ok(mut text) = serde_json::to_string(&reply) {
                    text.push('\n');
                    let _ = reply_tx.try_send(text);
                }
            }
            None => debug!("Server notification: {}", method),
        }
        return;
    }

    match serde_json::from_value::<JsonRpcResponse>(value) {
        Ok(response) => {
            if let Some(id) = response.numeric_id() {
                if let Some(sender) = pending.lock().remove(&id) {
                    let _ = sender.send(response);
                } else {
                    debug!("Dropping response for abandoned request {}", id);
                }
            }
        }
        Err(e) => debug!("Malformed JSON-RPC response: {}", e),
    }
}

/// Releases a pending slot when the request does not complete normally and
/// tells the server the request was abandoned
struct PendingGuard<'a> {
    id: u64,
    pending: &'a PendingMap,
    stdin_tx: &'a mpsc::Sender<String>,
    completed: bool,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        if self.completed {
            return;
        }
        if self.pending.lock().remove(&self.id).is_none() {
            return;
        }
        let notification = JsonRpcNotification::new(
            "notifications/cancelled",
            Some(json!({ "requestId": self.id, "reason": "abandoned by caller" })),
        );
        if let Ok(mut text) = serde_json::to_string(&notification) {
            text.push('\n');
            if self.stdin_tx.try_send(text).is_err() {
                warn!("Could not deliver cancellation for request {}", self.id);
            }
        }
    }
}

#[async_trait]
impl McpTransport for StdioTransport {
    async fn request(
        &self,
        method: &str,
        params: Option<Value>,
        cancel: &CancellationToken,
    ) -> Result<Value> {
        if !self.is_connected() {
            return Err(Error::connection(&self.server, "MCP transport not connected"));
        }

        let id = self.next_id();
        let request = JsonRpcRequest::new(id, method, params);
        let msg = self.encode(&request)?;

        // 응답 수신 채널 생성
        let (tx, rx) = oneshot::channel();
        self.pending_requests.lock().insert(id, tx);
        let mut guard = PendingGuard {
            id,
            pending: &self.pending_requests,
            stdin_tx: &self.stdin_tx,
            completed: false,
        };

        debug!("Sending MCP request: {}", msg.trim_end());
        self.stdin_tx
            .send(msg)
            .await
            .map_err(|e| Error::connection(&self.server, format!("failed to send request: {}", e)))?;

        let response = tokio::select! {
            response = rx => response.map_err(|_| {
                Error::connection(&self.server, "MCP response channel closed")
            })?,
            _ = cancel.cancelled() => {
                debug!("MCP request {} ({}) cancelled", id, method);
                return Err(Error::Protocol(format!("request '{}' cancelled", method)));
            }
        };
        guard.completed = true;

        // 에러 확인
        if let Some(error) = response.error {
            return Err(Error::Protocol(format!(
                "MCP error {}: {}",
                error.code, error.message
            )));
        }

        Ok(response.result.unwrap_or(Value::Null))
    }

    async fn notify(&self, method: &str, params: Option<Value>) -> Result<()> {
        if !self.is_connected() {
            return Err(Error::connection(&self.server, "MCP transport not connected"));
        }

        let msg = self.encode(&JsonRpcNotification::new(method, params))?;
        self.stdin_tx
            .send(msg)
            .await
            .map_err(|e| Error::connection(&self.server, format!("failed to send notification: {}", e)))?;

        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.connected.store(false, Ordering::SeqCst);
        self.pending_requests.lock().clear();

        // 프로세스 종료
        let mut child_guard = self.child.lock().await;
        if let Some(mut child) = child_guard.take() {
            let _ = child.kill().await;
        }

        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}
