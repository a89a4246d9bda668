//! Health and cache administration integration tests.

mod common;

use anyhow::Result;
use serde_json::json;

use common::{TestServer, result_json};

#[tokio::test]
async fn test_health_degraded_without_api_key() -> Result<()> {
    let server = TestServer::start().await?;

    let health = server.health().await?;
    assert_eq!(health["status"], "degraded");
    assert_eq!(health["configuration"]["provider.api_key"], false);
    assert!(health["timestamp"].is_string());
    assert!(health["computed_at"].is_string());
    assert_eq!(health["caches"].as_array().map(|c| c.len()), Some(3));

    assert_eq!(server.upstream.call_count(), 0);

    Ok(())
}

#[tokio::test]
async fn test_health_healthy_with_api_key() -> Result<()> {
    let server = TestServer::start_configured().await?;

    let health = server.health().await?;
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["configuration"]["provider.api_key"], true);

    Ok(())
}

#[tokio::test]
async fn test_health_served_from_snapshot() -> Result<()> {
    let server = TestServer::start().await?;

    let first = server.health().await?;
    let second = server.health().await?;

    assert_eq!(second["freshness"], "fresh");
    assert_eq!(second["computed_at"], first["computed_at"]);

    Ok(())
}

#[tokio::test]
async fn test_health_check_tool_makes_no_upstream_calls() -> Result<()> {
    let server = TestServer::start().await?;
    let mut session = server.connect().await?;

    let result = session.call_tool("health_check", json!({})).await?;
    assert_ne!(result["isError"], true);
    assert_eq!(result_json(&result)?["status"], "degraded");
    assert_eq!(server.upstream.call_count(), 0);

    Ok(())
}

#[tokio::test]
async fn test_cache_stats_empty_detailed() -> Result<()> {
    let server = TestServer::start().await?;
    let mut session = server.connect().await?;

    let result = session
        .call_tool("cache_stats", json!({"detailed": true}))
        .await?;
    let stats = result_json(&result)?;

    for family in ["search", "extract", "finance"] {
        assert_eq!(stats["families"][family]["total"], 0, "family {}", family);
        assert_eq!(stats["families"][family]["valid"], 0);
        assert_eq!(stats["families"][family]["expired"], 0);
    }
    assert_eq!(stats["totals"]["total"], 0);
    assert_eq!(stats["recommendations"], json!([]));

    Ok(())
}

#[tokio::test]
async fn test_cache_stats_counts_provider_results() -> Result<()> {
    let server = TestServer::start_configured().await?;
    let mut session = server.connect().await?;

    session
        .call_tool("quote", json!({"symbol": "AAPL"}))
        .await?;
    session
        .call_tool("quote", json!({"symbol": "aapl"}))
        .await?;

    let stats = result_json(&session.call_tool("cache_stats", json!({})).await?)?;
    assert_eq!(stats["families"]["finance"]["total"], 1);
    assert_eq!(stats["families"]["finance"]["hits"], 1);
    assert_eq!(stats["families"]["finance"]["misses"], 1);
    assert_eq!(stats["families"]["search"]["total"], 0);

    Ok(())
}

#[tokio::test]
async fn test_clear_cache_is_idempotent() -> Result<()> {
    let server = TestServer::start_configured().await?;
    let mut session = server.connect().await?;

    session
        .call_tool("search", json!({"query": "kestrel"}))
        .await?;

    let first = session
        .call_tool("clear_cache", json!({"scope": "search"}))
        .await?;
    assert_ne!(first["isError"], true);
    assert_eq!(result_json(&first)?["total_cleared"], 1);

    let second = session
        .call_tool("clear_cache", json!({"scope": "search"}))
        .await?;
    assert_ne!(second["isError"], true);
    assert_eq!(result_json(&second)?["total_cleared"], 0);

    let again = session
        .call_tool("search", json!({"query": "kestrel"}))
        .await?;
    assert_eq!(common::cached(&again), Some(false));
    assert_eq!(server.upstream.call_count(), 2);

    Ok(())
}

#[tokio::test]
async fn test_clear_cache_unknown_scope() -> Result<()> {
    let server = TestServer::start().await?;
    let mut session = server.connect().await?;

    let result = session
        .call_tool("clear_cache", json!({"scope": "weather"}))
        .await?;
    assert_eq!(result["isError"], true);
    assert_eq!(result_json(&result)?["error"], "validation_error");

    Ok(())
}
