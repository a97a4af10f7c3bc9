//! 流式控制台控制器：运行生命周期状态机
//!
//! 一个控制器实例绑定一个条目、对接一个提供方实例。绑定变更时：
//! 世代计数自增、旧运行的取消令牌触发、步骤与建议清空、单次运行守卫复位。
//! 每个异步回调在创建时捕获当时的世代，执行前校验当前世代：这是防止
//! 已取消运行继续改状态的唯一机制（陈旧回调失效，而非抢占中断）。
//! 并排查看两个条目需要两个互不共享可变状态的控制器实例。

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::audit::LogEntry;
use crate::core::error::EngineError;
use crate::core::events::ConsoleEvent;
use crate::core::state::ConsolePhase;
use crate::pipeline::item::Item;
use crate::pipeline::recommendation::Recommendation;
use crate::pipeline::run::RunResult;
use crate::pipeline::step::StepRecord;
use crate::provider::{ChatContext, ReasonEvent, ReasoningProvider};

struct ConsoleInner {
    phase: ConsolePhase,
    bound_item_id: Option<String>,
    item: Option<Item>,
    steps: Vec<StepRecord>,
    recommendation: Option<Recommendation>,
    /// 留存的运行结果（透明日志按 run_id 查询）
    runs: HashMap<Uuid, RunResult>,
    current_run: Option<Uuid>,
    /// 单次运行守卫：绑定条目同一时刻至多一个活动运行
    running: bool,
    cancel: CancellationToken,
}

impl ConsoleInner {
    fn reset(&mut self) {
        self.cancel.cancel();
        self.cancel = CancellationToken::new();
        self.item = None;
        self.steps.clear();
        self.recommendation = None;
        self.current_run = None;
        self.running = false;
        self.phase = ConsolePhase::Idle;
    }
}

/// 流式控制台控制器
pub struct ConsoleController {
    provider: Arc<dyn ReasoningProvider>,
    events: mpsc::UnboundedSender<ConsoleEvent>,
    /// 世代计数：每次绑定自增，陈旧回调据此失效
    generation: Arc<AtomicU64>,
    inner: Arc<Mutex<ConsoleInner>>,
}

impl ConsoleController {
    /// 创建控制器与宿主事件接收端
    pub fn new(
        provider: Arc<dyn ReasoningProvider>,
    ) -> (Self, mpsc::UnboundedReceiver<ConsoleEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let controller = Self {
            provider,
            events: tx,
            generation: Arc::new(AtomicU64::new(0)),
            inner: Arc::new(Mutex::new(ConsoleInner {
                phase: ConsolePhase::Idle,
                bound_item_id: None,
                item: None,
                steps: Vec::new(),
                recommendation: None,
                runs: HashMap::new(),
                current_run: None,
                running: false,
                cancel: CancellationToken::new(),
            })),
        };
        (controller, rx)
    }

    fn lock(&self) -> MutexGuard<'_, ConsoleInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    fn send_event(&self, event: ConsoleEvent) {
        let _ = self.events.send(event);
    }

    /// 绑定条目。条目 id 变更时重置全部运行状态并使旧回调失效；
    /// 绑定同一条目为 no-op。
    pub fn bind(&self, item_id: &str) {
        let mut inner = self.lock();
        if inner.bound_item_id.as_deref() == Some(item_id) {
            return;
        }
        self.generation.fetch_add(1, Ordering::SeqCst);
        inner.reset();
        inner.bound_item_id = Some(item_id.to_string());
        drop(inner);
        self.send_event(ConsoleEvent::Phase {
            phase: ConsolePhase::Idle,
        });
    }

    /// 启动推理运行。已有活动运行时为 no-op（再入保护）。
    pub async fn start_run(&self) -> Result<(), EngineError> {
        let (generation, item_id, cancel) = {
            let mut inner = self.lock();
            if inner.running {
                return Ok(());
            }
            let item_id = inner
                .bound_item_id
                .clone()
                .ok_or_else(|| EngineError::NotFound("no item bound".to_string()))?;
            inner.running = true;
            inner.phase = ConsolePhase::LoadingItem;
            (
                self.generation.load(Ordering::SeqCst),
                item_id,
                inner.cancel.clone(),
            )
        };
        self.send_event(ConsoleEvent::Phase {
            phase: ConsolePhase::LoadingItem,
        });

        let item = match self.provider.get_item(&item_id).await {
            Ok(item) => item,
            Err(e) => {
                if self.is_current(generation) {
                    {
                        let mut inner = self.lock();
                        inner.running = false;
                        inner.phase = ConsolePhase::Idle;
                    }
                    self.send_event(ConsoleEvent::RunError {
                        text: e.to_string(),
                    });
                    self.send_event(ConsoleEvent::Phase {
                        phase: ConsolePhase::Idle,
                    });
                }
                return Err(e);
            }
        };

        if !self.is_current(generation) || cancel.is_cancelled() {
            return Err(EngineError::Cancelled);
        }
        {
            let mut inner = self.lock();
            inner.item = Some(item.clone());
            inner.phase = ConsolePhase::Reasoning;
        }
        self.send_event(ConsoleEvent::Phase {
            phase: ConsolePhase::Reasoning,
        });

        // 回调捕获启动时的世代；绑定变更后的事件一律丢弃
        let gen_counter = self.generation.clone();
        let inner_arc = self.inner.clone();
        let tx = self.events.clone();
        let on_event = move |event: ReasonEvent| {
            if gen_counter.load(Ordering::SeqCst) != generation {
                return;
            }
            match event {
                ReasonEvent::Step { record } => {
                    if let Ok(mut inner) = inner_arc.lock() {
                        inner.steps.push(record.clone());
                    }
                    let _ = tx.send(ConsoleEvent::Step { record });
                }
                ReasonEvent::Final { recommendation } => {
                    if let Ok(mut inner) = inner_arc.lock() {
                        inner.recommendation = Some(recommendation.clone());
                    }
                    let _ = tx.send(ConsoleEvent::Recommendation { recommendation });
                }
            }
        };

        let result = self.provider.execute_reasoning(&item, &on_event).await;

        if !self.is_current(generation) {
            return Err(EngineError::Cancelled);
        }

        match result {
            Ok(run) => {
                let fault = run.fault.clone();
                let phase = if fault.is_some() {
                    ConsolePhase::Complete
                } else {
                    ConsolePhase::AwaitingChat
                };
                {
                    let mut inner = self.lock();
                    inner.running = false;
                    inner.current_run = Some(run.run_id);
                    inner.phase = phase;
                    inner.runs.insert(run.run_id, run);
                }
                if let Some(fault) = fault {
                    self.send_event(ConsoleEvent::RunError { text: fault });
                }
                self.send_event(ConsoleEvent::Phase { phase });
                Ok(())
            }
            Err(e) => {
                {
                    let mut inner = self.lock();
                    inner.running = false;
                    inner.phase = ConsolePhase::Idle;
                }
                self.send_event(ConsoleEvent::RunError {
                    text: e.to_string(),
                });
                self.send_event(ConsoleEvent::Phase {
                    phase: ConsolePhase::Idle,
                });
                Err(e)
            }
        }
    }

    /// 聊天子通道：以最近条目 + 累计步骤 + 最新建议为上下文。
    /// 失败按轮次兜底为助手可见消息，不向宿主传播。
    pub async fn send_chat(&self, text: &str) {
        let generation = self.generation.load(Ordering::SeqCst);
        let context = {
            let inner = self.lock();
            ChatContext {
                item: inner.item.clone(),
                steps: inner.steps.clone(),
                recommendation: inner.recommendation.clone(),
            }
        };
        self.send_event(ConsoleEvent::ChatMessage {
            role: "user".to_string(),
            text: text.to_string(),
            references: Vec::new(),
        });

        let gen_counter = self.generation.clone();
        let tx = self.events.clone();
        let on_token = move |token: &str| {
            if gen_counter.load(Ordering::SeqCst) != generation {
                return;
            }
            let _ = tx.send(ConsoleEvent::ChatToken {
                text: token.to_string(),
            });
        };

        match self
            .provider
            .send_chat_message(text, &context, &on_token)
            .await
        {
            Ok(response) => {
                if self.is_current(generation) {
                    self.send_event(ConsoleEvent::ChatMessage {
                        role: "assistant".to_string(),
                        text: response.text,
                        references: response.references,
                    });
                    self.send_event(ConsoleEvent::ChatDone);
                }
            }
            Err(e) => {
                if self.is_current(generation) {
                    self.send_event(ConsoleEvent::ChatMessage {
                        role: "assistant".to_string(),
                        text: format!("I could not answer that: {e}"),
                        references: Vec::new(),
                    });
                    self.send_event(ConsoleEvent::ChatDone);
                }
            }
        }
    }

    pub fn phase(&self) -> ConsolePhase {
        self.lock().phase
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// 当前已累计的步骤快照
    pub fn steps(&self) -> Vec<StepRecord> {
        self.lock().steps.clone()
    }

    pub fn recommendation(&self) -> Option<Recommendation> {
        self.lock().recommendation.clone()
    }

    pub fn current_run_id(&self) -> Option<Uuid> {
        self.lock().current_run
    }

    /// 指定运行的透明日志
    pub fn transparency_log(&self, run_id: &Uuid) -> Option<Vec<LogEntry>> {
        self.lock()
            .runs
            .get(run_id)
            .map(|r| r.log.entries().to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;

    /// 计数并放慢的提供方替身
    struct SlowProvider {
        runs_started: AtomicUsize,
    }

    #[async_trait]
    impl ReasoningProvider for SlowProvider {
        fn name(&self) -> &'static str {
            "slow"
        }

        async fn get_item(&self, item_id: &str) -> Result<Item, EngineError> {
            Ok(Item::new(item_id, "case"))
        }

        async fn execute_reasoning(
            &self,
            item: &Item,
            _on_event: crate::provider::OnEvent<'_>,
        ) -> Result<RunResult, EngineError> {
            self.runs_started.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
            let mut run = RunResult::new("test", item.id.clone());
            run.completed = true;
            Ok(run)
        }
    }

    #[tokio::test]
    async fn test_reentrant_start_is_noop() {
        let provider = Arc::new(SlowProvider {
            runs_started: AtomicUsize::new(0),
        });
        let (console, _rx) = ConsoleController::new(provider.clone());
        console.bind("X-1");

        let (a, b) = tokio::join!(console.start_run(), console.start_run());
        assert!(a.is_ok());
        assert!(b.is_ok());
        assert_eq!(provider.runs_started.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_rebinding_resets_state_and_advances_generation() {
        let provider = Arc::new(SlowProvider {
            runs_started: AtomicUsize::new(0),
        });
        let (console, _rx) = ConsoleController::new(provider);
        console.bind("X-1");
        let g1 = console.generation();
        console.start_run().await.unwrap();
        assert_eq!(console.phase(), ConsolePhase::AwaitingChat);

        console.bind("X-2");
        assert_eq!(console.generation(), g1 + 1);
        assert!(console.steps().is_empty());
        assert!(console.recommendation().is_none());
        assert_eq!(console.phase(), ConsolePhase::Idle);

        // 绑定同一条目不重置
        let g2 = console.generation();
        console.bind("X-2");
        assert_eq!(console.generation(), g2);
    }

    #[tokio::test]
    async fn test_start_without_binding_fails() {
        let provider = Arc::new(SlowProvider {
            runs_started: AtomicUsize::new(0),
        });
        let (console, _rx) = ConsoleController::new(provider);
        assert!(matches!(
            console.start_run().await,
            Err(EngineError::NotFound(_))
        ));
    }
}
