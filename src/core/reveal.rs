//! 渐进展示装饰器（纯展示模拟）
//!
//! 把步骤叙述切成小段插在完整 Step 事件之前，制造打字机效果。
//! 只在事件流上做包装：不触碰步骤列表与透明日志，装饰与否最终状态一致。

use tokio::sync::mpsc;

use crate::core::events::ConsoleEvent;

/// 包装事件接收端：每个 Step 事件前按 chunk_chars 逐段发出 StepText，
/// Step 事件本身原样转发，其余事件直通
pub fn decorate(
    mut upstream: mpsc::UnboundedReceiver<ConsoleEvent>,
    chunk_chars: usize,
) -> mpsc::UnboundedReceiver<ConsoleEvent> {
    let (tx, rx) = mpsc::unbounded_channel();
    let chunk_chars = chunk_chars.max(1);

    tokio::spawn(async move {
        while let Some(event) = upstream.recv().await {
            if let ConsoleEvent::Step { record } = &event {
                let chars: Vec<char> = record.narrative.chars().collect();
                for chunk in chars.chunks(chunk_chars) {
                    let text: String = chunk.iter().collect();
                    if tx
                        .send(ConsoleEvent::StepText {
                            index: record.index,
                            text,
                        })
                        .is_err()
                    {
                        return;
                    }
                }
            }
            if tx.send(event).is_err() {
                return;
            }
        }
    });

    rx
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::step::{StepOutcome, StepRecord};
    use serde_json::json;

    fn step(index: usize, narrative: &str) -> StepRecord {
        StepRecord {
            index,
            title: format!("Step {index}"),
            narrative: narrative.to_string(),
            agent: "Test Agent".to_string(),
            confidence: None,
            references: Vec::new(),
            outcome: StepOutcome::Success { detail: json!({}) },
        }
    }

    #[tokio::test]
    async fn test_decorated_stream_converges_to_same_step_list() {
        let (tx, rx) = mpsc::unbounded_channel();
        let originals = vec![step(0, "first narrative"), step(1, "second one")];
        for s in &originals {
            tx.send(ConsoleEvent::Step { record: s.clone() }).unwrap();
        }
        drop(tx);

        let mut decorated = decorate(rx, 4);
        let mut revealed: Vec<String> = vec![String::new(), String::new()];
        let mut final_steps = Vec::new();
        while let Some(ev) = decorated.recv().await {
            match ev {
                ConsoleEvent::StepText { index, text } => revealed[index].push_str(&text),
                ConsoleEvent::Step { record } => final_steps.push(record),
                _ => {}
            }
        }

        // 切片拼回原叙述，完整步骤列表与未装饰时一致
        assert_eq!(revealed[0], "first narrative");
        assert_eq!(revealed[1], "second one");
        assert_eq!(final_steps, originals);
    }

    #[tokio::test]
    async fn test_non_step_events_pass_through() {
        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(ConsoleEvent::ChatDone).unwrap();
        drop(tx);

        let mut decorated = decorate(rx, 6);
        assert!(matches!(
            decorated.recv().await,
            Some(ConsoleEvent::ChatDone)
        ));
        assert!(decorated.recv().await.is_none());
    }
}
