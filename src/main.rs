//! 无界面演示：用 Scripted 客户端跑一单理赔场景，打印事件流与透明日志

use std::sync::Arc;

use anyhow::Result;

use clerk::agent;
use clerk::config::load_config;
use clerk::core::reveal;
use clerk::pipeline::{Item, Reference};
use clerk::provider::{
    ClaimsProvider, InMemoryItemRepository, ReasoningProvider, RecordingActionExecutor,
    StaticReferenceRepository,
};
use clerk::ConsoleController;

#[tokio::main]
async fn main() -> Result<()> {
    clerk::observability::init();
    let cfg = load_config(None).unwrap_or_default();

    let mut items = InMemoryItemRepository::new();
    items.insert(
        Item::new("CLM-1001", "claim")
            .with_field("buildDays", 12)
            .with_field("authorizedDays", 10)
            .with_field("state", "Texas")
            .with_field("providerEligible", true),
    );

    let mut references = StaticReferenceRepository::new();
    references.insert(
        "claim",
        Reference::new("plan-doc-p9", "policy_document", "Page 9"),
    );

    let provider = Arc::new(ClaimsProvider::new(
        Arc::new(items),
        Arc::new(references),
        Arc::new(RecordingActionExecutor::new()),
        agent::from_config(&cfg.agent),
    ));

    let (console, rx) = ConsoleController::new(provider.clone());
    let mut rx = if cfg.console.reveal {
        reveal::decorate(rx, cfg.console.reveal_chunk_chars)
    } else {
        rx
    };

    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match serde_json::to_string(&event) {
                Ok(line) => println!("{line}"),
                Err(e) => eprintln!("event encode error: {e}"),
            }
        }
    });

    console.bind("CLM-1001");
    console.start_run().await?;
    console.send_chat("Why was this claim denied?").await;

    if let Some(run_id) = console.current_run_id() {
        if let Some(entries) = console.transparency_log(&run_id) {
            println!("--- transparency log ---");
            for entry in entries {
                println!("{}", serde_json::to_string(&entry)?);
            }
        }
    }

    // 演示动作执行：最终建议的第一个动作交给外部执行器，结果以 ActionResult 带回
    if let Some(recommendation) = console.recommendation() {
        if let Some(action) = recommendation.actions.first() {
            let item = provider.get_item("CLM-1001").await?;
            let result = provider
                .execute_action(&action.action_type, &item, &recommendation)
                .await?;
            tracing::info!(
                action = %action.action_type,
                success = result.success,
                "action executed"
            );
        }
    }

    drop(console);
    let _ = printer.await;
    Ok(())
}
