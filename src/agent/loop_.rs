// Agent loop - drives the model and the tool server until the model stops calling tools

use crate::artifacts::ArtifactStore;
use crate::brain::{Brain, BrainError, ContentBlock, MessageRequest, MessageResponse, RequestBuilder};
use crate::mcp::{ToolTransport, catalog, is_timeout_marker};
use crate::transcript::{Entry, approx_size};

use super::error::AgentError;
use super::messages::to_messages;
use super::types::{AgentConfig, LoopState, RunOutcome, Session, Termination};

use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Model access used by the loop (implemented by `Brain`, mocked in tests)
#[async_trait]
pub trait BrainRef: Send + Sync {
    async fn infer(&self, request: MessageRequest) -> Result<MessageResponse, BrainError>;
    fn model(&self) -> &str;
    fn max_output_tokens(&self) -> u32;
    fn temperature(&self) -> Option<f32>;
}

#[async_trait]
impl BrainRef for Brain {
    async fn infer(&self, request: MessageRequest) -> Result<MessageResponse, BrainError> {
        Brain::infer(self, request).await
    }

    fn model(&self) -> &str {
        Brain::model(self)
    }

    fn max_output_tokens(&self) -> u32 {
        Brain::max_output_tokens(self)
    }

    fn temperature(&self) -> Option<f32> {
        Brain::temperature(self)
    }
}

/// Orchestrates one conversation turn: model call, tool calls, repeat
pub struct AgentLoop<B, T> {
    brain: B,
    transport: T,
    artifacts: ArtifactStore,
    config: AgentConfig,
}

impl<B: BrainRef, T: ToolTransport> AgentLoop<B, T> {
    pub fn new(brain: B, transport: T, artifacts: ArtifactStore, config: AgentConfig) -> Self {
        Self {
            brain,
            transport,
            artifacts,
            config,
        }
    }

    pub fn brain(&self) -> &B {
        &self.brain
    }

    /// Consume the loop, returning the tool transport for shutdown
    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Run `input` through the model until it answers without tool calls or
    /// `max_iterations` model calls have been made.
    ///
    /// The model's text goes to the session transcript and the log; nothing
    /// is returned besides how the run ended. On error the transcript may end
    /// with a tool call that has no result, so the session should be dropped.
    /// `system_prompt` overrides the configured one for this run.
    pub async fn run(
        &self,
        session: &mut Session,
        input: &str,
        system_prompt: Option<&str>,
    ) -> Result<RunOutcome, AgentError> {
        if input.trim().is_empty() {
            return Err(AgentError::EmptyInput);
        }
        let system_prompt = system_prompt.or(self.config.system_prompt.as_deref());

        info!(session = %session.id, input = %input, "user input");
        session.transcript.push(Entry::user_text(input))?;

        let mut iterations = 0;
        let mut state = LoopState::AwaitingModel;

        loop {
            state = match state {
                LoopState::AwaitingModel if iterations >= self.config.max_iterations => {
                    warn!(
                        session = %session.id,
                        iterations = iterations,
                        "iteration cap reached with tool calls still pending"
                    );
                    LoopState::Done(Termination::IterationCap)
                }
                LoopState::AwaitingModel => {
                    debug!(session = %session.id, iteration = iterations, "requesting model turn");
                    iterations += 1;
                    match self.query_model(session, system_prompt).await {
                        Ok(response) => LoopState::ExecutingTools {
                            pending: response.content.into(),
                            tool_called: false,
                        },
                        Err(e) => LoopState::Aborted(e),
                    }
                }
                LoopState::ExecutingTools {
                    mut pending,
                    tool_called,
                } => match pending.pop_front() {
                    None if tool_called => LoopState::AwaitingModel,
                    None => LoopState::Done(Termination::Completed),
                    Some(block) => match self.apply_block(session, block).await {
                        Ok(called) => LoopState::ExecutingTools {
                            pending,
                            tool_called: tool_called || called,
                        },
                        Err(e) => LoopState::Aborted(e),
                    },
                },
                LoopState::Done(termination) => {
                    info!(
                        session = %session.id,
                        iterations = iterations,
                        termination = ?termination,
                        "run finished"
                    );
                    return Ok(RunOutcome {
                        termination,
                        iterations,
                    });
                }
                LoopState::Aborted(e) => {
                    warn!(session = %session.id, error = %e, "run aborted");
                    return Err(e);
                }
            };
        }
    }

    /// Send the compacted transcript with the current tool catalog
    async fn query_model(
        &self,
        session: &Session,
        system_prompt: Option<&str>,
    ) -> Result<MessageResponse, AgentError> {
        let view = session.transcript.compacted();
        debug!(
            entries = session.transcript.len(),
            kept = view.len(),
            full_bytes = approx_size(session.transcript.entries()),
            compacted_bytes = approx_size(&view),
            "compacted transcript"
        );

        // Tool sets may change between turns, so the catalog is not cached.
        let tools = self
            .transport
            .list_tools()
            .await
            .map_err(AgentError::ToolCatalog)?;

        let mut builder = RequestBuilder::new(self.brain.model())
            .max_tokens(self.brain.max_output_tokens())
            .messages(to_messages(&view))
            .tools(catalog::adapt(&tools));
        if let Some(system) = system_prompt {
            builder = builder.system(system);
        }
        if let Some(temp) = self.brain.temperature() {
            builder = builder.temperature(temp);
        }
        let request = builder.build().map_err(AgentError::RequestBuild)?;

        let response = self.brain.infer(request).await?;
        debug!(
            blocks = response.content.len(),
            tool_calls = response.tool_use_count(),
            "model turn received"
        );
        Ok(response)
    }

    /// Record one response block; returns whether it was a tool call
    async fn apply_block(&self, session: &mut Session, block: ContentBlock) -> Result<bool, AgentError> {
        match block {
            ContentBlock::Text { text } => {
                info!(session = %session.id, text = %text, "assistant");
                session.transcript.push(Entry::assistant_text(text))?;
                Ok(false)
            }
            ContentBlock::ToolUse { id, name, input } => {
                self.execute_tool(session, id, name, input).await?;
                Ok(true)
            }
            ContentBlock::Thinking { .. } | ContentBlock::RedactedThinking => {
                debug!("skipping thinking block");
                Ok(false)
            }
            ContentBlock::ToolResult { .. } | ContentBlock::Other => {
                warn!("ignoring unexpected block in model response");
                Ok(false)
            }
        }
    }

    /// Record the call, run it, and record its materialized result
    async fn execute_tool(
        &self,
        session: &mut Session,
        id: String,
        name: String,
        input: serde_json::Value,
    ) -> Result<(), AgentError> {
        // Recording first rejects a reused id before anything runs.
        session
            .transcript
            .push(Entry::tool_call(id.clone(), name.clone(), input.clone()))?;

        info!(session = %session.id, tool = %name, id = %id, args = %input, "calling tool");
        let result = self
            .transport
            .call_tool(&name, input)
            .await
            .map_err(|source| AgentError::Tool {
                name: name.clone(),
                source,
            })?;
        debug!(tool = %name, blocks = result.content.len(), is_error = result.is_error, "tool result");

        if is_timeout_marker(&result.content) {
            warn!(
                tool = %name,
                pause_secs = self.config.timeout_pause_secs,
                "tool reported a timeout, pausing before continuing"
            );
            tokio::time::sleep(Duration::from_secs(self.config.timeout_pause_secs)).await;
            info!(tool = %name, "resuming after timeout pause");
        }

        let content = self.artifacts.materialize(&result.content).await;
        let entry = if result.is_error {
            Entry::tool_error(id, content)
        } else {
            Entry::tool_result(id, content)
        };
        session.transcript.push(entry)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::ArtifactConfig;
    use crate::brain::{Role, types::StopReason};
    use crate::mcp::{CallToolResult, McpError, RawBlock, ToolDescriptor};
    use crate::transcript::{ResultBlock, TranscriptError};
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tempfile::TempDir;
    use tokio_test::{assert_err, assert_ok};

    /// Mock brain replaying canned responses and recording requests
    struct MockBrain {
        responses: Mutex<VecDeque<MessageResponse>>,
        requests: Mutex<Vec<MessageRequest>>,
    }

    impl MockBrain {
        fn new(responses: Vec<MessageResponse>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn requests(&self) -> Vec<MessageRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl BrainRef for MockBrain {
        async fn infer(&self, request: MessageRequest) -> Result<MessageResponse, BrainError> {
            self.requests.lock().unwrap().push(request);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| BrainError::ModelError("No more responses".to_string()))
        }

        fn model(&self) -> &str {
            "test-model"
        }

        fn max_output_tokens(&self) -> u32 {
            4000
        }

        fn temperature(&self) -> Option<f32> {
            Some(0.4)
        }
    }

    /// Mock tool server returning canned results in order
    struct MockTransport {
        results: Mutex<VecDeque<Result<CallToolResult, McpError>>>,
        calls: Mutex<Vec<String>>,
    }

    impl MockTransport {
        fn new(results: Vec<Result<CallToolResult, McpError>>) -> Self {
            Self {
                results: Mutex::new(results.into()),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ToolTransport for MockTransport {
        async fn list_tools(&self) -> crate::mcp::Result<Vec<ToolDescriptor>> {
            Ok(vec![ToolDescriptor {
                name: "browser_click".to_string(),
                description: Some("Click an element".to_string()),
                input_schema: json!({"type": "object"}),
            }])
        }

        async fn call_tool(
            &self,
            name: &str,
            _arguments: serde_json::Value,
        ) -> crate::mcp::Result<CallToolResult> {
            self.calls.lock().unwrap().push(name.to_string());
            self.results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(CallToolResult::text("ok")))
        }
    }

    fn response(content: Vec<ContentBlock>) -> MessageResponse {
        let stop_reason = if content.iter().any(|b| matches!(b, ContentBlock::ToolUse { .. })) {
            StopReason::ToolUse
        } else {
            StopReason::EndTurn
        };
        MessageResponse {
            id: "msg".to_string(),
            content,
            model: "test-model".to_string(),
            role: Role::Assistant,
            stop_reason: Some(stop_reason),
            usage: None,
        }
    }

    fn text(t: &str) -> ContentBlock {
        ContentBlock::text(t)
    }

    fn tool_use(id: &str, name: &str) -> ContentBlock {
        ContentBlock::ToolUse {
            id: id.to_string(),
            name: name.to_string(),
            input: json!({"ref": id}),
        }
    }

    fn agent(
        brain: MockBrain,
        transport: MockTransport,
        dir: &TempDir,
    ) -> AgentLoop<MockBrain, MockTransport> {
        let artifacts = ArtifactStore::new(ArtifactConfig {
            dir: dir.path().join("screenshots"),
            prefix: "screenshot".to_string(),
        });
        AgentLoop::new(brain, transport, artifacts, AgentConfig::default())
    }

    #[tokio::test]
    async fn test_text_only_turn_completes() {
        let tmp = TempDir::new().unwrap();
        let agent = agent(
            MockBrain::new(vec![response(vec![text("Hello!")])]),
            MockTransport::new(vec![]),
            &tmp,
        );

        let mut session = Session::new();
        let outcome = assert_ok!(agent.run(&mut session, "Hi", None).await);

        assert_eq!(outcome.termination, Termination::Completed);
        assert_eq!(outcome.iterations, 1);
        assert_eq!(
            session.transcript.entries(),
            &[Entry::user_text("Hi"), Entry::assistant_text("Hello!")]
        );
    }

    #[tokio::test]
    async fn test_tool_turn_then_answer() {
        let tmp = TempDir::new().unwrap();
        let agent = agent(
            MockBrain::new(vec![
                response(vec![text("Clicking."), tool_use("t1", "browser_click")]),
                response(vec![text("Done.")]),
            ]),
            MockTransport::new(vec![Ok(CallToolResult::text("clicked"))]),
            &tmp,
        );

        let mut session = Session::new();
        let outcome = agent.run(&mut session, "click login", Some("Be brief.")).await.unwrap();

        assert!(outcome.is_complete());
        assert_eq!(outcome.iterations, 2);
        assert_eq!(
            session.transcript.entries(),
            &[
                Entry::user_text("click login"),
                Entry::assistant_text("Clicking."),
                Entry::tool_call("t1", "browser_click", json!({"ref": "t1"})),
                Entry::tool_result("t1", vec![ResultBlock::text("clicked")]),
                Entry::assistant_text("Done."),
            ]
        );

        let requests = agent.brain.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].system.as_deref(), Some("Be brief."));
        assert_eq!(requests[0].temperature, Some(0.4));
        assert_eq!(requests[0].tools.as_ref().unwrap()[0].name, "browser_click");
    }

    #[tokio::test]
    async fn test_tools_run_sequentially_in_emitted_order() {
        let tmp = TempDir::new().unwrap();
        let agent = agent(
            MockBrain::new(vec![
                response(vec![
                    tool_use("a", "browser_navigate"),
                    text("then"),
                    tool_use("b", "browser_type"),
                ]),
                response(vec![text("ok")]),
            ]),
            MockTransport::new(vec![]),
            &tmp,
        );

        let mut session = Session::new();
        agent.run(&mut session, "go", None).await.unwrap();

        assert_eq!(agent.transport.calls(), vec!["browser_navigate", "browser_type"]);
        let kinds: Vec<_> = session
            .transcript
            .entries()
            .iter()
            .map(|e| match e {
                Entry::UserText { .. } => "user",
                Entry::AssistantText { .. } => "text",
                Entry::AssistantToolCall { .. } => "call",
                Entry::ToolResult { .. } => "result",
            })
            .collect();
        assert_eq!(kinds, vec!["user", "call", "result", "text", "call", "result", "text"]);
    }

    #[tokio::test]
    async fn test_iteration_cap_stops_without_error() {
        let tmp = TempDir::new().unwrap();
        let responses = (0..12)
            .map(|i| response(vec![tool_use(&format!("t{}", i), "browser_click")]))
            .collect();
        let agent = agent(MockBrain::new(responses), MockTransport::new(vec![]), &tmp);

        let mut session = Session::new();
        let outcome = assert_ok!(agent.run(&mut session, "loop forever", None).await);

        assert_eq!(outcome.termination, Termination::IterationCap);
        assert_eq!(outcome.iterations, 10);
        assert_eq!(agent.brain.requests().len(), 10);
        assert_eq!(agent.transport.calls().len(), 10);
        // user + 10 call/result pairs
        assert_eq!(session.transcript.len(), 21);
        assert!(session.transcript.pending_calls().is_empty());
    }

    #[tokio::test]
    async fn test_answer_on_last_allowed_iteration_completes() {
        let tmp = TempDir::new().unwrap();
        let mut responses: Vec<_> = (0..9)
            .map(|i| response(vec![tool_use(&format!("t{}", i), "browser_click")]))
            .collect();
        responses.push(response(vec![text("finished")]));
        let agent = agent(MockBrain::new(responses), MockTransport::new(vec![]), &tmp);

        let mut session = Session::new();
        let outcome = agent.run(&mut session, "go", None).await.unwrap();
        assert_eq!(outcome.termination, Termination::Completed);
        assert_eq!(outcome.iterations, 10);
    }

    #[tokio::test]
    async fn test_requests_use_compacted_transcript() {
        let tmp = TempDir::new().unwrap();
        let agent = agent(
            MockBrain::new(vec![
                response(vec![tool_use("t1", "browser_click")]),
                response(vec![tool_use("t2", "browser_click")]),
                response(vec![text("done")]),
            ]),
            MockTransport::new(vec![]),
            &tmp,
        );

        let mut session = Session::new();
        agent.run(&mut session, "go", None).await.unwrap();

        let requests = agent.brain.requests();
        let last = &requests[2].messages;
        let tool_ids: Vec<_> = last
            .iter()
            .flat_map(|m| m.content.iter())
            .filter_map(|b| match b {
                ContentBlock::ToolUse { id, .. } => Some(id.as_str()),
                ContentBlock::ToolResult { tool_use_id, .. } => Some(tool_use_id.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(tool_ids, vec!["t2", "t2"]);
        // The authoritative transcript keeps everything.
        assert_eq!(session.transcript.len(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_marker_pauses() {
        let tmp = TempDir::new().unwrap();
        let agent = agent(
            MockBrain::new(vec![
                response(vec![tool_use("t1", "browser_navigate")]),
                response(vec![text("retrying later")]),
            ]),
            MockTransport::new(vec![Ok(CallToolResult::text("Timeout: navigation exceeded"))]),
            &tmp,
        );

        let mut session = Session::new();
        let start = tokio::time::Instant::now();
        let outcome = agent.run(&mut session, "open page", None).await.unwrap();

        assert!(start.elapsed() >= Duration::from_secs(10));
        assert!(outcome.is_complete());
        assert_eq!(session.transcript.len(), 4);
        assert_eq!(
            session.transcript.entries()[2],
            Entry::tool_result("t1", vec![ResultBlock::text("Timeout: navigation exceeded")])
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_pause_without_marker() {
        let tmp = TempDir::new().unwrap();
        let agent = agent(
            MockBrain::new(vec![
                response(vec![tool_use("t1", "browser_navigate")]),
                response(vec![text("done")]),
            ]),
            MockTransport::new(vec![]),
            &tmp,
        );

        let mut session = Session::new();
        let start = tokio::time::Instant::now();
        agent.run(&mut session, "open page", None).await.unwrap();
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_image_result_saved_and_referenced() {
        let tmp = TempDir::new().unwrap();
        let agent = agent(
            MockBrain::new(vec![
                response(vec![tool_use("t1", "browser_take_screenshot")]),
                response(vec![text("Here it is.")]),
            ]),
            MockTransport::new(vec![Ok(CallToolResult {
                content: vec![
                    RawBlock::Text {
                        text: "Screenshot of viewport".to_string(),
                    },
                    RawBlock::Image {
                        data: "iVBORw0KGgo=".to_string(),
                        mime_type: "image/png".to_string(),
                    },
                ],
                is_error: false,
            })]),
            &tmp,
        );

        let mut session = Session::new();
        agent.run(&mut session, "screenshot", None).await.unwrap();

        let Entry::ToolResult { content, .. } = &session.transcript.entries()[2] else {
            panic!("expected tool result");
        };
        let ResultBlock::ImageRef { path, .. } = &content[1] else {
            panic!("expected image reference");
        };
        assert!(path.exists());

        // The model only ever sees text for the image.
        let second = &agent.brain.requests()[1];
        let serialized = serde_json::to_string(&second.messages).unwrap();
        assert!(serialized.contains("Image saved to:"));
        assert!(!serialized.contains("iVBORw0KGgo="));
    }

    #[tokio::test]
    async fn test_tool_failure_aborts() {
        let tmp = TempDir::new().unwrap();
        let agent = agent(
            MockBrain::new(vec![
                response(vec![tool_use("t1", "browser_click")]),
                response(vec![text("unreachable")]),
            ]),
            MockTransport::new(vec![Err(McpError::Service {
                method: "tools/call",
                message: "Transport closed".to_string(),
            })]),
            &tmp,
        );

        let mut session = Session::new();
        let err = assert_err!(agent.run(&mut session, "go", None).await);
        assert!(matches!(err, AgentError::Tool { ref name, .. } if name == "browser_click"));
        assert_eq!(agent.brain.requests().len(), 1);
        assert_eq!(session.transcript.pending_calls(), vec!["t1"]);
    }

    #[tokio::test]
    async fn test_inference_failure_aborts() {
        let tmp = TempDir::new().unwrap();
        let agent = agent(MockBrain::new(vec![]), MockTransport::new(vec![]), &tmp);

        let mut session = Session::new();
        let err = agent.run(&mut session, "go", None).await.unwrap_err();
        assert!(matches!(err, AgentError::Inference(BrainError::ModelError(_))));
        assert_eq!(session.transcript.len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_call_id_never_executed_twice() {
        let tmp = TempDir::new().unwrap();
        let agent = agent(
            MockBrain::new(vec![response(vec![
                tool_use("same", "browser_click"),
                tool_use("same", "browser_click"),
            ])]),
            MockTransport::new(vec![]),
            &tmp,
        );

        let mut session = Session::new();
        let err = agent.run(&mut session, "go", None).await.unwrap_err();
        assert!(matches!(
            err,
            AgentError::Protocol(TranscriptError::DuplicateCall(ref id)) if id == "same"
        ));
        assert_eq!(agent.transport.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_zero_iterations_makes_no_call() {
        let tmp = TempDir::new().unwrap();
        let mut agent = agent(MockBrain::new(vec![]), MockTransport::new(vec![]), &tmp);
        agent.config.max_iterations = 0;

        let mut session = Session::new();
        let outcome = agent.run(&mut session, "go", None).await.unwrap();
        assert_eq!(outcome.termination, Termination::IterationCap);
        assert_eq!(outcome.iterations, 0);
        assert!(agent.brain.requests().is_empty());
    }

    #[tokio::test]
    async fn test_blank_input_rejected_before_recording() {
        let tmp = TempDir::new().unwrap();
        let agent = agent(MockBrain::new(vec![]), MockTransport::new(vec![]), &tmp);

        let mut session = Session::new();
        for input in ["", "   \n"] {
            let err = agent.run(&mut session, input, None).await.unwrap_err();
            assert!(matches!(err, AgentError::EmptyInput));
        }
        assert!(session.transcript.is_empty());
        assert!(agent.brain.requests().is_empty());
    }

    #[tokio::test]
    async fn test_configured_system_prompt_used_by_default() {
        let tmp = TempDir::new().unwrap();
        let mut agent = agent(
            MockBrain::new(vec![response(vec![text("a")]), response(vec![text("b")])]),
            MockTransport::new(vec![]),
            &tmp,
        );
        agent.config.system_prompt = Some("You are a browser tester.".to_string());

        let mut session = Session::new();
        agent.run(&mut session, "one", None).await.unwrap();
        agent.run(&mut session, "two", Some("Override.")).await.unwrap();

        let requests = agent.brain.requests();
        assert_eq!(requests[0].system.as_deref(), Some("You are a browser tester."));
        assert_eq!(requests[1].system.as_deref(), Some("Override."));
    }

    #[tokio::test]
    async fn test_tool_error_recorded_with_flag() {
        let tmp = TempDir::new().unwrap();
        let agent = agent(
            MockBrain::new(vec![
                response(vec![tool_use("t1", "browser_click")]),
                response(vec![text("It failed.")]),
            ]),
            MockTransport::new(vec![Ok(CallToolResult {
                content: vec![RawBlock::Text {
                    text: "element not found".to_string(),
                }],
                is_error: true,
            })]),
            &tmp,
        );

        let mut session = Session::new();
        let outcome = agent.run(&mut session, "click", None).await.unwrap();
        assert!(outcome.is_complete());
        assert_eq!(
            session.transcript.entries()[2],
            Entry::tool_error("t1", vec![ResultBlock::text("element not found")])
        );
    }

    #[tokio::test]
    async fn test_session_continues_across_runs() {
        let tmp = TempDir::new().unwrap();
        let agent = agent(
            MockBrain::new(vec![
                response(vec![text("first answer")]),
                response(vec![text("second answer")]),
            ]),
            MockTransport::new(vec![]),
            &tmp,
        );

        let mut session = Session::new();
        agent.run(&mut session, "one", None).await.unwrap();
        agent.run(&mut session, "two", None).await.unwrap();

        assert_eq!(session.transcript.len(), 4);
        let second = &agent.brain.requests()[1];
        assert_eq!(second.messages.len(), 3);
        assert_eq!(second.messages[0].role, Role::User);
    }
}
