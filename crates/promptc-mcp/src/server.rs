//! MCP server implementation.
//!
//! One request is read, handled and answered before the next line is read.
//! Malformed or over-long lines are logged and skipped; notifications get no
//! response.

use crate::error::McpError;
use crate::protocol::*;
use crate::tools::{self, ToolCall};
use promptc_audit::{AuditCategory, AuditEvent, AuditHub, AuditResult};
use promptc_core::PromptRequest;
use promptc_runtime::{MetricsStore, Router, TemplateStore};
use serde_json::{Value, json};
use std::sync::RwLock;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::Instant;

/// Audit actor used until the host identifies itself.
const DEFAULT_CLIENT: &str = "mcp-host";
const ENGINE_ACTOR: &str = "promptc-engine";

/// Longest protocol line accepted, newline excluded.
pub const MAX_LINE_BYTES: usize = 1024 * 1024;

/// The MCP server.
pub struct McpServer {
    router: Router,
    templates: TemplateStore,
    metrics: MetricsStore,
    hub: AuditHub,
    client: RwLock<String>,
}

impl McpServer {
    pub fn new(
        router: Router,
        templates: TemplateStore,
        metrics: MetricsStore,
        hub: AuditHub,
    ) -> Self {
        Self {
            router,
            templates,
            metrics,
            hub,
            client: RwLock::new(DEFAULT_CLIENT.to_string()),
        }
    }

    /// Serve newline-delimited JSON-RPC until the reader is exhausted.
    pub async fn run<R, W>(&self, mut reader: R, mut writer: W) -> Result<(), McpError>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut buf = Vec::new();
        loop {
            buf.clear();
            let read = (&mut reader)
                .take(MAX_LINE_BYTES as u64 + 1)
                .read_until(b'\n', &mut buf)
                .await?;
            if read == 0 {
                break;
            }

            if buf.len() > MAX_LINE_BYTES && buf.last() != Some(&b'\n') {
                let skipped = buf.len() + skip_line(&mut reader).await?;
                tracing::warn!(
                    bytes = skipped,
                    limit = MAX_LINE_BYTES,
                    "Skipping over-long protocol line"
                );
                continue;
            }

            let line = buf.trim_ascii();
            if line.is_empty() {
                continue;
            }

            let request: JsonRpcRequest = match serde_json::from_slice(line) {
                Ok(request) => request,
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        bytes = line.len(),
                        "Skipping malformed protocol line"
                    );
                    continue;
                }
            };

            if let Some(response) = self.handle_request(request).await {
                let mut out = serde_json::to_vec(&response)?;
                out.push(b'\n');
                writer.write_all(&out).await?;
                writer.flush().await?;
            }
        }

        tracing::info!("Protocol input closed");
        Ok(())
    }

    /// Handle one request. Returns `None` for notifications.
    pub async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        if request.is_notification() {
            tracing::debug!(method = %request.method, "Notification received");
            return None;
        }
        let id = request.id.clone();

        let response = match request.method.as_str() {
            "initialize" => self.handle_initialize(id, request.params),
            "ping" => JsonRpcResponse::success(id, json!({})),
            "tools/list" => self.handle_list_tools(id),
            "tools/call" => self.handle_call_tool(id, request.params).await,
            "shutdown" => self.handle_shutdown(id),
            _ => JsonRpcResponse::error(
                id,
                codes::METHOD_NOT_FOUND,
                format!("Method not found: {}", request.method),
            ),
        };
        Some(response)
    }

    fn handle_initialize(&self, id: Option<Value>, params: Option<Value>) -> JsonRpcResponse {
        let params: InitializeParams = params
            .and_then(|p| serde_json::from_value(p).ok())
            .unwrap_or_default();

        if let Some(client) = params.client_info {
            tracing::info!(
                client = %client.name,
                version = client.version.as_deref().unwrap_or("-"),
                "Host connected"
            );
            *self
                .client
                .write()
                .unwrap_or_else(|poisoned| poisoned.into_inner()) = client.name;
        }

        let result = json!({
            "protocolVersion": PROTOCOL_VERSION,
            "serverInfo": {
                "name": "promptc",
                "version": env!("CARGO_PKG_VERSION")
            },
            "capabilities": {
                "tools": {
                    "listChanged": false
                }
            }
        });
        JsonRpcResponse::success(id, result)
    }

    fn handle_list_tools(&self, id: Option<Value>) -> JsonRpcResponse {
        let result = ListToolsResponse {
            tools: tools::definitions(),
        };
        match serde_json::to_value(result) {
            Ok(value) => JsonRpcResponse::success(id, value),
            Err(e) => JsonRpcResponse::error(id, codes::INVALID_PARAMS, e.to_string()),
        }
    }

    async fn handle_call_tool(&self, id: Option<Value>, params: Option<Value>) -> JsonRpcResponse {
        let client = self.client_name();

        let params: CallToolParams = match params.map(serde_json::from_value) {
            Some(Ok(params)) => params,
            Some(Err(e)) => {
                self.parse_error(&client, e.to_string()).await;
                let message = format!("Invalid params: {}", e);
                return JsonRpcResponse::error(id, codes::INVALID_PARAMS, message);
            }
            None => {
                self.parse_error(&client, "missing params".to_string()).await;
                return JsonRpcResponse::error(id, codes::INVALID_PARAMS, "Missing params");
            }
        };

        let correlation_id = uuid::Uuid::new_v4().to_string();
        let started = Instant::now();

        self.hub
            .publish(
                AuditEvent::builder(AuditCategory::Protocol, "TOOL_INVOKED", client.as_str())
                    .resource(params.name.as_str())
                    .correlation_id(Some(correlation_id.clone()))
                    .build(),
            )
            .await;

        let outcome = match ToolCall::parse(&params.name, params.arguments) {
            Ok(call) => self.execute(call, &correlation_id).await,
            Err(e) => Err(e),
        };
        let latency_ms = started.elapsed().as_millis() as u64;

        let (response, result, detail) = match outcome {
            Ok(text) => (CallToolResponse::text(text), AuditResult::Ok, None),
            Err(e) => {
                tracing::warn!(tool = %params.name, error = %e, "Tool call failed");
                let message = e.to_string();
                (
                    CallToolResponse::error(format!("Error: {}", message)),
                    AuditResult::Fail,
                    Some(message),
                )
            }
        };

        let mut event =
            AuditEvent::builder(AuditCategory::Protocol, "TOOL_COMPLETED", client.as_str())
                .resource(params.name.as_str())
                .result(result)
                .latency_ms(latency_ms)
                .correlation_id(Some(correlation_id));
        if let Some(detail) = detail {
            event = event.detail(detail);
        }
        self.hub.publish(event.build()).await;

        match serde_json::to_value(response) {
            Ok(value) => JsonRpcResponse::success(id, value),
            Err(e) => JsonRpcResponse::error(id, codes::INVALID_PARAMS, e.to_string()),
        }
    }

    async fn execute(&self, call: ToolCall, correlation_id: &str) -> Result<String, McpError> {
        match call {
            ToolCall::GetTemplate { template_name } => {
                self.get_template(&template_name, correlation_id).await
            }
            ToolCall::OptimizePrompt(request) => {
                self.optimize_prompt(request, correlation_id).await
            }
        }
    }

    async fn get_template(&self, name: &str, correlation_id: &str) -> Result<String, McpError> {
        match self.templates.get(name) {
            Some(template) => {
                self.metrics.record_template_use(name);
                self.template_event("TEMPLATE_READ", name, AuditResult::Ok, correlation_id)
                    .await;
                Ok(template.content)
            }
            None => {
                self.template_event("TEMPLATE_NOT_FOUND", name, AuditResult::Fail, correlation_id)
                    .await;
                Err(McpError::TemplateNotFound {
                    name: name.to_string(),
                })
            }
        }
    }

    async fn optimize_prompt(
        &self,
        mut request: PromptRequest,
        correlation_id: &str,
    ) -> Result<String, McpError> {
        if let Some(name) = request.template_name.clone() {
            match self.templates.get(&name) {
                Some(template) => {
                    request.task = template.content;
                    self.metrics.record_template_use(&name);
                    self.template_event("TEMPLATE_APPLIED", &name, AuditResult::Ok, correlation_id)
                        .await;
                }
                None => {
                    // Unknown template: keep the caller's task.
                    let result = AuditResult::Warn;
                    self.template_event("TEMPLATE_NOT_FOUND", &name, result, correlation_id)
                        .await;
                }
            }
        }

        let outcome = self.router.process(&request, Some(correlation_id)).await?;
        tracing::debug!(
            path = ?outcome.path,
            provider = outcome.provider.as_deref().unwrap_or("-"),
            score = outcome.analysis.score,
            latency_ms = outcome.latency_ms,
            "Prompt compiled"
        );
        Ok(outcome.text)
    }

    fn handle_shutdown(&self, id: Option<Value>) -> JsonRpcResponse {
        tracing::info!("MCP server shutdown requested");
        JsonRpcResponse::success(id, json!(null))
    }

    async fn template_event(
        &self,
        action: &str,
        name: &str,
        result: AuditResult,
        correlation_id: &str,
    ) {
        self.hub
            .publish(
                AuditEvent::builder(AuditCategory::Template, action, ENGINE_ACTOR)
                    .resource(name)
                    .result(result)
                    .correlation_id(Some(correlation_id.to_string()))
                    .build(),
            )
            .await;
    }

    async fn parse_error(&self, client: &str, detail: String) {
        tracing::warn!(error = %detail, "Unparsable tools/call params");
        self.hub
            .publish(
                AuditEvent::builder(AuditCategory::Protocol, "TOOL_PARSE_ERROR", client)
                    .result(AuditResult::Fail)
                    .detail(detail)
                    .build(),
            )
            .await;
    }

    fn client_name(&self) -> String {
        self.client
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

/// Discard input up to and including the next newline. Returns the
/// number of bytes dropped.
async fn skip_line<R: AsyncBufRead + Unpin>(reader: &mut R) -> std::io::Result<usize> {
    let mut skipped = 0;
    loop {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            return Ok(skipped);
        }
        match available.iter().position(|b| *b == b'\n') {
            Some(end) => {
                reader.consume(end + 1);
                return Ok(skipped + end + 1);
            }
            None => {
                let len = available.len();
                reader.consume(len);
                skipped += len;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use promptc_core::{RouterConfig, Template, TemplateTable};
    use promptc_runtime::NodeHealth;

    fn server_with(table: TemplateTable) -> (McpServer, MetricsStore, AuditHub) {
        let metrics = MetricsStore::in_memory();
        let hub = AuditHub::in_memory();
        let router = Router::new(
            RouterConfig::default(),
            metrics.clone(),
            NodeHealth::offline(),
            hub.clone(),
        );
        let templates = TemplateStore::in_memory(table);
        let server = McpServer::new(router, templates, metrics.clone(), hub.clone());
        (server, metrics, hub)
    }

    fn greet_table() -> TemplateTable {
        let mut table = TemplateTable::new();
        table.insert(
            "greet".into(),
            Template {
                description: "d".into(),
                content: "Write a warm welcome message for new customers of the bakery".into(),
            },
        );
        table
    }

    fn request(id: i64, method: &str, params: Option<Value>) -> JsonRpcRequest {
        JsonRpcRequest {
            jsonrpc: "2.0".to_string(),
            id: Some(json!(id)),
            method: method.to_string(),
            params,
        }
    }

    fn call(id: i64, name: &str, arguments: Value) -> JsonRpcRequest {
        request(id, "tools/call", Some(json!({ "name": name, "arguments": arguments })))
    }

    fn tool_result(response: JsonRpcResponse) -> CallToolResponse {
        serde_json::from_value(response.result.expect("result")).unwrap()
    }

    fn text_of(result: &CallToolResponse) -> &str {
        match &result.content[0] {
            ToolContent::Text { text } => text,
        }
    }

    #[tokio::test]
    async fn test_initialize() {
        let (server, _, _) = server_with(TemplateTable::new());
        let response = server
            .handle_request(request(
                1,
                "initialize",
                Some(json!({ "clientInfo": { "name": "claude-desktop", "version": "1.0" } })),
            ))
            .await
            .unwrap();

        let result = response.result.unwrap();
        assert_eq!(result["protocolVersion"], "2024-11-05");
        assert_eq!(result["serverInfo"]["name"], "promptc");
        assert_eq!(result["serverInfo"]["version"], env!("CARGO_PKG_VERSION"));
        assert_eq!(server.client_name(), "claude-desktop");
    }

    #[tokio::test]
    async fn test_notification_gets_no_response() {
        let (server, _, _) = server_with(TemplateTable::new());
        let notification = JsonRpcRequest {
            jsonrpc: "2.0".to_string(),
            id: None,
            method: "notifications/initialized".to_string(),
            params: None,
        };
        assert!(server.handle_request(notification).await.is_none());
    }

    #[tokio::test]
    async fn test_ping_and_unknown_method() {
        let (server, _, _) = server_with(TemplateTable::new());

        let pong = server.handle_request(request(2, "ping", None)).await.unwrap();
        assert_eq!(pong.result, Some(json!({})));

        let missing = server
            .handle_request(request(3, "resources/list", None))
            .await
            .unwrap();
        assert_eq!(missing.error.unwrap().code, codes::METHOD_NOT_FOUND);
        assert_eq!(missing.id, Some(json!(3)));
    }

    #[tokio::test]
    async fn test_list_tools() {
        let (server, _, _) = server_with(TemplateTable::new());
        let response = server.handle_request(request(1, "tools/list", None)).await.unwrap();
        let tools = response.result.unwrap()["tools"].as_array().unwrap().clone();
        assert_eq!(tools.len(), 2);
        assert_eq!(tools[0]["name"], "get_template");
        assert!(tools[1]["inputSchema"]["properties"]["template_name"].is_object());
    }

    #[tokio::test]
    async fn test_invalid_call_params() {
        let (server, _, hub) = server_with(TemplateTable::new());
        let response = server
            .handle_request(request(4, "tools/call", Some(json!({ "arguments": {} }))))
            .await
            .unwrap();

        assert_eq!(response.error.unwrap().code, codes::INVALID_PARAMS);
        let history = hub.history();
        assert_eq!(history.len(), 1);
        assert!(history[0].contains("TOOL_PARSE_ERROR"));
        assert!(history[0].contains("result=FAIL"));
    }

    #[tokio::test]
    async fn test_get_template_counts_use() {
        let (server, metrics, hub) = server_with(greet_table());
        let response = server
            .handle_request(call(5, "get_template", json!({ "template_name": "greet" })))
            .await
            .unwrap();

        let result = tool_result(response);
        assert!(!result.is_error);
        assert!(text_of(&result).starts_with("Write a warm welcome"));
        assert_eq!(metrics.snapshot().template_calls["greet"], 1);

        let history = hub.history();
        assert!(history[0].contains("TOOL_INVOKED"));
        assert!(history.iter().any(|l| l.contains("TEMPLATE_READ")));
        assert!(history.last().unwrap().contains("TOOL_COMPLETED"));
    }

    #[tokio::test]
    async fn test_missing_template_is_tool_error() {
        let (server, metrics, _) = server_with(TemplateTable::new());
        let response = server
            .handle_request(call(6, "get_template", json!({ "template_name": "nope" })))
            .await
            .unwrap();

        assert!(response.error.is_none());
        let result = tool_result(response);
        assert!(result.is_error);
        assert!(text_of(&result).contains("template not found: nope"));
        assert!(metrics.snapshot().template_calls.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_tool_is_tool_error() {
        let (server, _, _) = server_with(TemplateTable::new());
        let response = server
            .handle_request(call(7, "drop_tables", json!({})))
            .await
            .unwrap();
        let result = tool_result(response);
        assert!(result.is_error);
        assert!(text_of(&result).contains("tool not found"));
    }

    #[tokio::test]
    async fn test_optimize_prompt_degraded_without_providers() {
        let (server, metrics, _) = server_with(TemplateTable::new());
        let response = server
            .handle_request(call(8, "optimize_prompt", json!({ "role": "", "task": "short" })))
            .await
            .unwrap();

        let result = tool_result(response);
        assert!(!result.is_error);
        assert!(text_of(&result).contains("### TASK\nshort"));

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.inference_count, 1);
        assert_eq!(snapshot.inference_success, 1);
        assert_eq!(snapshot.cloud_calls, 0);
    }

    #[tokio::test]
    async fn test_optimize_prompt_applies_template() {
        let (server, metrics, hub) = server_with(greet_table());
        let response = server
            .handle_request(call(
                9,
                "optimize_prompt",
                json!({ "role": "Copywriter", "task": "ignored", "template_name": "greet" }),
            ))
            .await
            .unwrap();

        let result = tool_result(response);
        let text = text_of(&result);
        assert!(text.contains("Write a warm welcome"));
        assert!(!text.contains("ignored"));
        assert_eq!(metrics.snapshot().template_calls["greet"], 1);
        assert!(hub.history().iter().any(|l| l.contains("TEMPLATE_APPLIED")));
    }

    #[tokio::test]
    async fn test_optimize_prompt_unknown_template_keeps_task() {
        let (server, metrics, hub) = server_with(TemplateTable::new());
        let response = server
            .handle_request(call(
                10,
                "optimize_prompt",
                json!({ "task": "keep me", "template_name": "ghost" }),
            ))
            .await
            .unwrap();

        let result = tool_result(response);
        assert!(!result.is_error);
        assert!(text_of(&result).contains("keep me"));
        assert!(metrics.snapshot().template_calls.is_empty());
        assert!(
            hub.history()
                .iter()
                .any(|l| l.contains("TEMPLATE_NOT_FOUND") && l.contains("result=WARN"))
        );
    }

    #[tokio::test]
    async fn test_oversized_prompt_is_tool_error() {
        let (server, metrics, hub) = server_with(TemplateTable::new());
        let response = server
            .handle_request(call(11, "optimize_prompt", json!({ "task": "x".repeat(200 * 1024) })))
            .await
            .unwrap();

        let result = tool_result(response);
        assert!(result.is_error);
        assert!(text_of(&result).contains("byte limit"));
        assert_eq!(metrics.snapshot().inference_count, 0);
        assert!(hub.history().iter().any(|l| l.contains("PROMPT_REJECTED")));
    }

    #[tokio::test]
    async fn test_over_long_line_is_skipped() {
        let (server, _metrics, _hub) = server_with(TemplateTable::new());

        let mut input = vec![b'x'; MAX_LINE_BYTES + 10];
        input.push(b'\n');
        input.extend_from_slice(b"{\"jsonrpc\":\"2.0\",\"id\":7,\"method\":\"ping\"}\n");
        // exactly at the limit is still read as one line
        let ping: &[u8] = b"{\"jsonrpc\":\"2.0\",\"id\":8,\"method\":\"ping\"}";
        input.extend(std::iter::repeat_n(b' ', MAX_LINE_BYTES - ping.len()));
        input.extend_from_slice(ping);
        input.push(b'\n');

        let mut output = Vec::new();
        server.run(input.as_slice(), &mut output).await.unwrap();

        let lines: Vec<Value> = output
            .split(|b| *b == b'\n')
            .filter(|l| !l.is_empty())
            .map(|l| serde_json::from_slice(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["id"], 7);
        assert_eq!(lines[1]["id"], 8);
    }

    #[tokio::test]
    async fn test_skip_line_stops_after_newline() {
        let mut reader: &[u8] = b"abcdef\nnext";
        assert_eq!(skip_line(&mut reader).await.unwrap(), 7);
        assert_eq!(reader, b"next");
        assert_eq!(skip_line(&mut reader).await.unwrap(), 4);
        assert!(reader.is_empty());
    }
}
