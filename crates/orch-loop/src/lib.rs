//! Reasoning Loop (spec.md §4.E): owns the entire query lifecycle. One
//! loop skeleton, parameterized by a [`strategy::Strategy`] selected from
//! `mode`, ties together the sandbox, tool registry, dispatcher, response
//! parser, LLM client, and session logger.

pub mod strategy;

use std::sync::Arc;
use std::time::{Duration, Instant};

use orch_config::Config;
use orch_core::{
    HistoryEntry, InteractionHistory, Mode, OrchestratorError, SessionId, ToolContext, ToolResult,
    MISSING_TOOL,
};
use orch_dispatch::Dispatcher;
use orch_llm::{Chat, ChatOptions, Message};
use orch_logger::{Category, SessionLogger, ToolExecutionRecord};
use orch_sandbox::Sandbox;
use orch_tools::ToolRegistry;
use tokio_util::sync::CancellationToken;

/// How many past turns are replayed into the next prompt; bounds prompt
/// growth without losing recent context.
const HISTORY_WINDOW: usize = 6;

/// What the loop returns to its caller once a session finishes, caps out,
/// or is cancelled.
#[derive(Debug, Clone)]
pub struct LoopOutcome {
    pub session_id: SessionId,
    pub response: String,
    pub iterations: u32,
    pub truncated: bool,
}

#[derive(thiserror::Error, Debug)]
pub enum LoopError {
    #[error(transparent)]
    Orchestrator(#[from] OrchestratorError),
    #[error("unknown mode '{0}'")]
    UnknownMode(String),
    #[error("operation cancelled")]
    Cancelled,
}

/// Wires every component together for one long-lived process; a single
/// instance serves any number of sessions, sequentially per session and
/// concurrently across sessions (spec.md §5).
pub struct ReasoningLoop {
    sandbox: Arc<Sandbox>,
    registry: Arc<ToolRegistry>,
    dispatcher: Dispatcher,
    llm: Arc<dyn Chat>,
    strategies: std::collections::HashMap<String, strategy::Strategy>,
    default_model: String,
    temperature: Option<f64>,
    max_tokens: Option<u32>,
    llm_timeout: Duration,
}

impl ReasoningLoop {
    pub fn new(config: &Config, sandbox: Arc<Sandbox>, registry: Arc<ToolRegistry>, llm: Arc<dyn Chat>) -> Self {
        let backend = config.default_backend();
        Self {
            dispatcher: Dispatcher::new(registry.clone()),
            sandbox,
            registry,
            llm,
            strategies: strategy::registry(&config.strategy_defaults),
            default_model: backend.default_model.clone(),
            temperature: backend.temperature,
            max_tokens: backend.max_tokens,
            llm_timeout: Duration::from_secs(60),
        }
    }

    /// Runs one query to completion: builds a prompt each iteration,
    /// awaits the LLM, parses the response, dispatches a tool or advances
    /// to the next step, and terminates on completion, cap exhaustion, or
    /// cancellation.
    pub async fn run(
        &self,
        session_id: SessionId,
        query: &str,
        mode: Mode,
        cancellation: CancellationToken,
    ) -> Result<LoopOutcome, LoopError> {
        let strategy = self
            .strategies
            .get(mode.as_str())
            .ok_or_else(|| LoopError::UnknownMode(mode.as_str().to_string()))?
            .clone();

        let session_dir = self.sandbox.session_root(&session_id).map_err(OrchestratorError::from)?;
        let logger = SessionLogger::new(&session_dir);
        logger.log(Category::SessionInfo, 0, &format!("session started, mode={}", mode.as_str()));

        let mut history = InteractionHistory::default();
        let mut pending_turn = query.to_string();
        let mut truncated = false;
        let mut iteration = 0u32;

        loop {
            if cancellation.is_cancelled() {
                logger.log(Category::SessionInfo, iteration, "cancelled");
                return Err(LoopError::Cancelled);
            }
            if iteration >= strategy.max_iterations {
                truncated = true;
                break;
            }
            iteration += 1;

            let prompt = self.build_prompt(&strategy, &session_id, &session_dir, &history, &pending_turn)?;
            logger.log(Category::Interaction, iteration, &format!("prompt turn:\n{pending_turn}"));

            let messages = self.build_messages(&strategy, &prompt, &history);
            let options = ChatOptions {
                temperature: self.temperature,
                max_tokens: self.max_tokens,
                stop_sequences: None,
                timeout: Some(self.llm_timeout),
            };

            let raw_response = tokio::select! {
                _ = cancellation.cancelled() => {
                    logger.log(Category::SessionInfo, iteration, "cancelled mid LLM call");
                    return Err(LoopError::Cancelled);
                }
                result = self.chat_with_retry(&messages, &options, &logger, iteration) => {
                    match result {
                        Ok(text) => text,
                        Err(e) => {
                            logger.log(Category::SessionInfo, iteration, &format!("LLM call failed after retry: {e}"));
                            return Err(LoopError::Orchestrator(OrchestratorError::LlmTransport(e.to_string())));
                        }
                    }
                }
            };
            logger.log(Category::Interaction, iteration, &format!("response:\n{raw_response}"));

            let outcome = orch_parser::parse(&raw_response);
            let decision = outcome.record;
            if let Some(problem) = decision.validate().into_iter().next() {
                logger.log(Category::SessionInfo, iteration, &format!("malformed decision: {problem}"));
            }

            let mut tool_result = None;
            if decision.task_complete {
                let response = decision.response.clone().unwrap_or_default();
                logger.log(Category::Action, iteration, "task complete");
                history.push(HistoryEntry {
                    iteration,
                    prompt,
                    raw_response,
                    decision,
                    tool_result,
                });
                return Ok(LoopOutcome { session_id, response, iterations: iteration, truncated: false });
            } else if decision.requires_tool {
                let tool_name = decision.tool.clone().unwrap_or_else(|| MISSING_TOOL.to_string());
                logger.log(Category::Action, iteration, &format!("dispatching tool '{tool_name}'"));

                let mut ctx = ToolContext::new(session_id.clone());
                ctx.parameters = decision.parameters.clone();
                let started = Instant::now();
                let dispatcher = self.dispatcher.clone();
                let dispatch_name = tool_name.clone();
                // Tools may perform blocking I/O (e.g. `RepoDownload`'s
                // synchronous HTTP fetch), which would panic if run
                // directly on this tokio worker thread.
                let result = tokio::task::spawn_blocking(move || {
                    let mut ctx = ctx;
                    dispatcher.dispatch(&dispatch_name, &mut ctx)
                })
                .await
                .unwrap_or_else(|join_err| {
                    ToolResult::failed(format!("tool task panicked: {join_err}"), "dispatch", 0)
                });
                logger.log_tool_execution_detailed(&ToolExecutionRecord {
                    timestamp: chrono::Utc::now().to_rfc3339(),
                    iteration,
                    tool: &tool_name,
                    method: &result.method_used,
                    success: result.success,
                    duration_ms: started.elapsed().as_millis() as u64,
                    error: result.error.as_deref(),
                });
                logger.log(
                    Category::ToolExecution,
                    iteration,
                    &format!("{tool_name}: success={} output={}", result.success, result.output),
                );

                pending_turn = if result.success {
                    format!("Tool '{tool_name}' result: {}", result.output)
                } else {
                    format!("Tool '{tool_name}' failed: {}", result.error.clone().unwrap_or_default())
                };
                tool_result = Some(result);
            } else {
                pending_turn = decision.next_step.clone().unwrap_or_default();
                logger.log(Category::Plan, iteration, &format!("next step: {pending_turn}"));
            }

            history.push(HistoryEntry {
                iteration,
                prompt,
                raw_response,
                decision,
                tool_result,
            });
        }

        let response = history.last_non_empty_response().unwrap_or_default().to_string();
        logger.log(Category::SessionInfo, iteration, "iteration budget exhausted");
        Ok(LoopOutcome { session_id, response, iterations: iteration, truncated })
    }

    /// Retries the LLM call once on transport failure before surfacing,
    /// per spec.md §7(4) ("LLMTransportError ... retried once per call,
    /// then surfaced").
    async fn chat_with_retry(
        &self,
        messages: &[Message],
        options: &ChatOptions,
        logger: &SessionLogger,
        iteration: u32,
    ) -> Result<String, orch_llm::LlmError> {
        match self.llm.chat(&self.default_model, messages, options).await {
            Ok((text, _usage)) => Ok(text),
            Err(first_err) => {
                logger.log(
                    Category::SessionInfo,
                    iteration,
                    &format!("LLM call failed, retrying once: {first_err}"),
                );
                self.llm
                    .chat(&self.default_model, messages, options)
                    .await
                    .map(|(text, _usage)| text)
            }
        }
    }

    fn build_prompt(
        &self,
        strategy: &strategy::Strategy,
        session_id: &SessionId,
        session_dir: &std::path::Path,
        history: &InteractionHistory,
        pending_turn: &str,
    ) -> Result<String, LoopError> {
        let cwd = self.sandbox.current_dir(session_id).map_err(OrchestratorError::from)?;
        let mut prompt = String::new();
        prompt.push_str(strategy.system_preamble);
        prompt.push('\n');
        prompt.push_str(strategy.completion_hint);
        prompt.push_str("\n\nAvailable tools:\n");
        prompt.push_str(&self.registry.catalogue());
        prompt.push_str(&format!(
            "\nSession root: {}\nCurrent directory: {}\n",
            session_dir.display(),
            cwd.display()
        ));
        if !history.entries.is_empty() {
            prompt.push_str("\nRecent history:\n");
            for entry in history.recent(HISTORY_WINDOW) {
                prompt.push_str(&format!("- iteration {}: {}\n", entry.iteration, entry.raw_response));
            }
        }
        prompt.push_str(&format!("\nCurrent turn:\n{pending_turn}\n"));
        Ok(prompt)
    }

    fn build_messages(&self, strategy: &strategy::Strategy, prompt: &str, _history: &InteractionHistory) -> Vec<Message> {
        vec![Message::system(strategy.system_preamble), Message::user(prompt)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct ScriptedChat {
        responses: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Chat for ScriptedChat {
        async fn chat(
            &self,
            _model: &str,
            _messages: &[Message],
            _options: &ChatOptions,
        ) -> Result<(String, Option<orch_llm::TokenUsage>), orch_llm::LlmError> {
            let mut responses = self.responses.lock().unwrap();
            if responses.is_empty() {
                return Ok((r#"{"taskComplete": true, "response": "default"}"#.to_string(), None));
            }
            Ok((responses.remove(0), None))
        }
    }

    struct FlakyChat {
        failures_remaining: Mutex<u32>,
        response: String,
    }

    #[async_trait]
    impl Chat for FlakyChat {
        async fn chat(
            &self,
            _model: &str,
            _messages: &[Message],
            _options: &ChatOptions,
        ) -> Result<(String, Option<orch_llm::TokenUsage>), orch_llm::LlmError> {
            let mut remaining = self.failures_remaining.lock().unwrap();
            if *remaining > 0 {
                *remaining -= 1;
                return Err(orch_llm::LlmError::Network("connection reset".to_string()));
            }
            Ok((self.response.clone(), None))
        }
    }

    fn test_config() -> Config {
        let raw = r#"{
            "DefaultClient": "ollama",
            "Backends": {"ollama": {"BaseUrl": "http://localhost:11434", "DefaultModel": "llama3"}}
        }"#;
        Config::from_json_str(raw).unwrap()
    }

    #[tokio::test]
    async fn completes_in_one_iteration_when_the_model_answers_immediately() {
        let dir = tempfile::tempdir().unwrap();
        let sandbox = Arc::new(Sandbox::new(dir.path()));
        let registry = Arc::new(orch_tools::builtin::register_all(sandbox.clone()).unwrap());
        let llm = Arc::new(ScriptedChat {
            responses: Mutex::new(vec![r#"{"taskComplete": true, "response": "4"}"#.to_string()]),
        });
        let reasoning_loop = ReasoningLoop::new(&test_config(), sandbox, registry, llm);

        let session_id = SessionId::parse("s1").unwrap();
        let outcome = reasoning_loop
            .run(session_id, "what is 2+2?", Mode::Single, CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome.response, "4");
        assert_eq!(outcome.iterations, 1);
        assert!(!outcome.truncated);
    }

    #[tokio::test]
    async fn dispatches_a_tool_then_completes() {
        let dir = tempfile::tempdir().unwrap();
        let sandbox = Arc::new(Sandbox::new(dir.path()));
        let registry = Arc::new(orch_tools::builtin::register_all(sandbox.clone()).unwrap());
        let llm = Arc::new(ScriptedChat {
            responses: Mutex::new(vec![
                r#"{"requiresTool": true, "tool": "ArithmeticTool", "parameters": {"lhs": 2, "op": "+", "rhs": 2}}"#
                    .to_string(),
                r#"{"taskComplete": true, "response": "the sum is 4"}"#.to_string(),
            ]),
        });
        let reasoning_loop = ReasoningLoop::new(&test_config(), sandbox, registry, llm);

        let session_id = SessionId::parse("s2").unwrap();
        let outcome = reasoning_loop
            .run(session_id, "compute 2+2", Mode::Single, CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome.response, "the sum is 4");
        assert_eq!(outcome.iterations, 2);
    }

    #[tokio::test]
    async fn a_single_transport_failure_is_retried_and_recovered() {
        let dir = tempfile::tempdir().unwrap();
        let sandbox = Arc::new(Sandbox::new(dir.path()));
        let registry = Arc::new(orch_tools::builtin::register_all(sandbox.clone()).unwrap());
        let llm = Arc::new(FlakyChat {
            failures_remaining: Mutex::new(1),
            response: r#"{"taskComplete": true, "response": "recovered"}"#.to_string(),
        });
        let reasoning_loop = ReasoningLoop::new(&test_config(), sandbox, registry, llm);

        let session_id = SessionId::parse("s5").unwrap();
        let outcome = reasoning_loop
            .run(session_id, "anything", Mode::Single, CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome.response, "recovered");
        assert_eq!(outcome.iterations, 1);
    }

    #[tokio::test]
    async fn a_second_consecutive_transport_failure_is_surfaced() {
        let dir = tempfile::tempdir().unwrap();
        let sandbox = Arc::new(Sandbox::new(dir.path()));
        let registry = Arc::new(orch_tools::builtin::register_all(sandbox.clone()).unwrap());
        let llm = Arc::new(FlakyChat {
            failures_remaining: Mutex::new(2),
            response: r#"{"taskComplete": true, "response": "unreachable"}"#.to_string(),
        });
        let reasoning_loop = ReasoningLoop::new(&test_config(), sandbox, registry, llm);

        let session_id = SessionId::parse("s6").unwrap();
        let result = reasoning_loop
            .run(session_id, "anything", Mode::Single, CancellationToken::new())
            .await;

        assert!(matches!(result, Err(LoopError::Orchestrator(OrchestratorError::LlmTransport(_)))));
    }

    #[tokio::test]
    async fn exhausting_the_budget_returns_the_last_non_empty_response_truncated() {
        let dir = tempfile::tempdir().unwrap();
        let sandbox = Arc::new(Sandbox::new(dir.path()));
        let registry = Arc::new(orch_tools::builtin::register_all(sandbox.clone()).unwrap());
        let llm = Arc::new(ScriptedChat {
            responses: Mutex::new(vec![
                r#"{"nextStep": "keep going", "response": "still working"}"#.to_string(),
                r#"{"nextStep": "keep going", "response": "still working 2"}"#.to_string(),
                r#"{"nextStep": "keep going", "response": "still working 3"}"#.to_string(),
            ]),
        });
        let reasoning_loop = ReasoningLoop::new(&test_config(), sandbox, registry, llm);

        let session_id = SessionId::parse("s3").unwrap();
        let outcome = reasoning_loop
            .run(session_id, "an open ended task", Mode::Single, CancellationToken::new())
            .await
            .unwrap();

        assert!(outcome.truncated);
        assert_eq!(outcome.iterations, 3);
        assert_eq!(outcome.response, "still working 3");
    }

    #[tokio::test]
    async fn cancellation_before_the_first_iteration_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let sandbox = Arc::new(Sandbox::new(dir.path()));
        let registry = Arc::new(orch_tools::builtin::register_all(sandbox.clone()).unwrap());
        let llm = Arc::new(ScriptedChat { responses: Mutex::new(vec![]) });
        let reasoning_loop = ReasoningLoop::new(&test_config(), sandbox, registry, llm);

        let token = CancellationToken::new();
        token.cancel();
        let session_id = SessionId::parse("s4").unwrap();
        let result = reasoning_loop.run(session_id, "anything", Mode::Single, token).await;
        assert!(matches!(result, Err(LoopError::Cancelled)));
    }
}
