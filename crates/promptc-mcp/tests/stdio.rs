//! Drives the protocol loop end to end over an in-memory duplex stream.

use promptc_audit::AuditHub;
use promptc_core::RouterConfig;
use promptc_mcp::McpServer;
use promptc_runtime::{MetricsStore, NodeHealth, Router, TemplateStore};
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

fn server() -> (McpServer, MetricsStore, AuditHub) {
    let metrics = MetricsStore::in_memory();
    let hub = AuditHub::in_memory();
    let router = Router::new(
        RouterConfig::default(),
        metrics.clone(),
        NodeHealth::offline(),
        hub.clone(),
    );
    let templates = TemplateStore::in_memory(Default::default());
    (
        McpServer::new(router, templates, metrics.clone(), hub.clone()),
        metrics,
        hub,
    )
}

#[tokio::test]
async fn test_session_over_duplex() {
    let (server, metrics, hub) = server();
    let (client, server_io) = tokio::io::duplex(64 * 1024);
    let (server_read, server_write) = tokio::io::split(server_io);

    let serve = tokio::spawn(async move {
        server
            .run(BufReader::new(server_read), server_write)
            .await
    });

    let (client_read, mut client_write) = tokio::io::split(client);
    let input = [
        json!({"jsonrpc": "2.0", "id": 1, "method": "initialize",
               "params": {"clientInfo": {"name": "test-host"}}})
        .to_string(),
        json!({"jsonrpc": "2.0", "method": "notifications/initialized"}).to_string(),
        "this is not json".to_string(),
        String::new(),
        json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"}).to_string(),
        json!({"jsonrpc": "2.0", "id": 3, "method": "tools/call",
               "params": {"name": "optimize_prompt", "arguments": {"role": "", "task": "short"}}})
        .to_string(),
        json!({"jsonrpc": "2.0", "id": 4, "method": "nope"}).to_string(),
    ];
    for line in &input {
        client_write.write_all(line.as_bytes()).await.unwrap();
        client_write.write_all(b"\n").await.unwrap();
    }
    client_write.shutdown().await.unwrap();
    drop(client_write);

    let mut lines = BufReader::new(client_read).lines();
    let mut responses = Vec::new();
    while let Some(line) = lines.next_line().await.unwrap() {
        responses.push(serde_json::from_str::<Value>(&line).unwrap());
    }

    serve.await.unwrap().unwrap();

    // notification, malformed and blank lines produce nothing
    let ids: Vec<_> = responses.iter().map(|r| r["id"].clone()).collect();
    assert_eq!(ids, vec![json!(1), json!(2), json!(3), json!(4)]);

    assert_eq!(responses[0]["result"]["serverInfo"]["name"], "promptc");
    assert_eq!(responses[1]["result"]["tools"].as_array().unwrap().len(), 2);
    assert_eq!(responses[2]["result"]["isError"], false);
    assert_eq!(
        responses[2]["result"]["content"][0]["text"],
        "### TASK\nshort"
    );
    assert_eq!(responses[3]["error"]["code"], -32601);

    assert_eq!(metrics.snapshot().inference_success, 1);
    assert!(
        hub.history()
            .iter()
            .any(|l| l.contains("TOOL_INVOKED") && l.contains("test-host"))
    );
}
