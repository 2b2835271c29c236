//! End-to-end behavior of the tool-loop agent against a scripted model.

use async_trait::async_trait;
use deskflow_agent::{AgentBuilder, ApprovalPolicy, SystemPromptAddendum};
use deskflow_core::{Content, Llm, LlmRequest, LlmResponse, LlmResponseStream, ROLE_MODEL, transcript};
use deskflow_graph::{Decision, GraphError, MemoryCheckpointer, RunConfig};
use deskflow_model::MockLlm;
use deskflow_tool::FunctionTool;
use futures::StreamExt;
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

fn ticket_tool(calls: Arc<AtomicUsize>) -> Arc<FunctionTool> {
    Arc::new(FunctionTool::new("get_ticket", "Fetch a ticket by id", move |args: Value| {
        let calls = calls.clone();
        async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(json!({"id": args["id"], "title": "Broken printer", "status": "open"}))
        }
    }))
}

fn delete_tool(calls: Arc<AtomicUsize>) -> Arc<FunctionTool> {
    Arc::new(FunctionTool::new("delete_ticket", "Delete a ticket by id", move |_args: Value| {
        let calls = calls.clone();
        async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(json!({"deleted": true}))
        }
    }))
}

#[tokio::test]
async fn direct_answer_skips_tools() {
    let model = Arc::new(MockLlm::new("mock").reply("Hello, how can I help?"));
    let agent = AgentBuilder::new("helper", model)
        .system_prompt("You are a helper.")
        .build()
        .unwrap();

    let out = agent
        .invoke(transcript::user_turn("hi"), RunConfig::new("s1"))
        .await
        .unwrap();

    assert_eq!(transcript::final_model_text(&out).as_deref(), Some("Hello, how can I help?"));
}

#[tokio::test]
async fn tool_call_round_trip() {
    let calls = Arc::new(AtomicUsize::new(0));
    let model = Arc::new(
        MockLlm::new("mock")
            .reply_with_call("get_ticket", json!({"id": 7}))
            .reply("Ticket 7 is the broken printer, still open."),
    );

    let agent = AgentBuilder::new("helper", model)
        .tool(ticket_tool(calls.clone()))
        .build()
        .unwrap();

    let out = agent
        .invoke(transcript::user_turn("show ticket 7"), RunConfig::new("s1"))
        .await
        .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let messages = transcript::messages(&out);
    // user, assistant call, tool result, assistant answer
    assert_eq!(messages.len(), 4);
    assert_eq!(messages[2].role, deskflow_core::ROLE_FUNCTION);
    assert_eq!(
        transcript::final_model_text(&out).as_deref(),
        Some("Ticket 7 is the broken printer, still open.")
    );
}

#[tokio::test]
async fn guarded_tool_pauses_then_approve_executes() {
    let calls = Arc::new(AtomicUsize::new(0));
    let model = Arc::new(
        MockLlm::new("mock")
            .reply_with_call("delete_ticket", json!({"id": 9}))
            .reply("Ticket 9 deleted."),
    );

    let agent = AgentBuilder::new("helper", model)
        .tool(delete_tool(calls.clone()))
        .approval(ApprovalPolicy::new().guard("delete_ticket", "Permanently deletes a ticket"))
        .checkpointer(Arc::new(MemoryCheckpointer::new()))
        .build()
        .unwrap();

    let result = agent.invoke(transcript::user_turn("delete ticket 9"), RunConfig::new("s1")).await;
    let Err(GraphError::Paused(paused)) = result else {
        panic!("expected pause, got {result:?}");
    };
    assert_eq!(paused.request.tool_name, "delete_ticket");
    assert_eq!(paused.request.args, json!({"id": 9}));
    assert_eq!(paused.request.description, "Permanently deletes a ticket");
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    let out = agent.resume("s1", Decision::Approve).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(transcript::final_model_text(&out).as_deref(), Some("Ticket 9 deleted."));
}

#[tokio::test]
async fn guarded_tool_reject_never_executes() {
    let calls = Arc::new(AtomicUsize::new(0));
    let model = Arc::new(
        MockLlm::new("mock")
            .reply_with_call("delete_ticket", json!({"id": 9}))
            .reply("Understood, the ticket was left untouched."),
    );

    let agent = AgentBuilder::new("helper", model)
        .tool(delete_tool(calls.clone()))
        .approval(ApprovalPolicy::new().guard("delete_ticket", "Permanently deletes a ticket"))
        .checkpointer(Arc::new(MemoryCheckpointer::new()))
        .build()
        .unwrap();

    let _ = agent.invoke(transcript::user_turn("delete ticket 9"), RunConfig::new("s1")).await;
    let out = agent.resume("s1", Decision::Reject).await.unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 0);

    // The model saw the rejection notice as a tool message.
    let messages = transcript::messages(&out);
    let tool_msg = messages.iter().find(|m| m.role == deskflow_core::ROLE_FUNCTION).unwrap();
    assert!(serde_json::to_string(&tool_msg).unwrap().contains("rejected"));
    assert_eq!(
        transcript::final_model_text(&out).as_deref(),
        Some("Understood, the ticket was left untouched.")
    );
}

#[tokio::test]
async fn unguarded_tools_never_pause() {
    let calls = Arc::new(AtomicUsize::new(0));
    let model = Arc::new(
        MockLlm::new("mock")
            .reply_with_call("get_ticket", json!({"id": 1}))
            .reply("done"),
    );

    let agent = AgentBuilder::new("helper", model)
        .tool(ticket_tool(calls.clone()))
        .approval(ApprovalPolicy::new().guard("delete_ticket", "Permanently deletes a ticket"))
        .checkpointer(Arc::new(MemoryCheckpointer::new()))
        .build()
        .unwrap();

    let out = agent.invoke(transcript::user_turn("show ticket 1"), RunConfig::new("s1")).await;
    assert!(out.is_ok());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn runaway_tool_loop_hits_the_call_limit() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut model = MockLlm::new("mock");
    for _ in 0..20 {
        model = model.reply_with_call("get_ticket", json!({"id": 1}));
    }

    let agent = AgentBuilder::new("helper", Arc::new(model))
        .tool(ticket_tool(calls))
        .model_call_limit(3)
        .build()
        .unwrap();

    let result = agent.invoke(transcript::user_turn("loop"), RunConfig::new("s1")).await;
    assert!(matches!(result, Err(GraphError::StepLimitExceeded(_))));
}

/// Records the system instruction each call saw, then delegates to a mock.
struct Recording {
    inner: MockLlm,
    prompts: std::sync::Mutex<Vec<String>>,
}

#[async_trait]
impl Llm for Recording {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn generate(&self, req: LlmRequest, stream: bool) -> deskflow_core::Result<LlmResponseStream> {
        self.prompts.lock().unwrap().push(req.system_instruction.clone().unwrap_or_default());
        self.inner.generate(req, stream).await
    }
}

#[tokio::test]
async fn middleware_rewrites_the_system_prompt() {
    let model = Arc::new(Recording {
        inner: MockLlm::new("mock").reply("ok"),
        prompts: std::sync::Mutex::new(Vec::new()),
    });

    let agent = AgentBuilder::new("helper", model.clone())
        .system_prompt("Base prompt.")
        .middleware(Arc::new(SystemPromptAddendum::new("## Available Skills\n- refunds")))
        .build()
        .unwrap();

    agent.invoke(transcript::user_turn("hi"), RunConfig::new("s1")).await.unwrap();

    let prompts = model.prompts.lock().unwrap();
    assert!(prompts[0].starts_with("Base prompt."));
    assert!(prompts[0].contains("## Available Skills"));
}

#[tokio::test]
async fn streaming_chunks_carry_the_agent_name() {
    let chunk = |text: &str| LlmResponse {
        content: Some(Content::new(ROLE_MODEL).with_text(text)),
        partial: true,
        turn_complete: false,
        finish_reason: None,
    };
    let model = Arc::new(MockLlm::new("mock").call(vec![
        chunk("Tick"),
        chunk("et looks fine."),
        LlmResponse { turn_complete: true, ..Default::default() },
    ]));

    let agent = Arc::new(
        AgentBuilder::new("supervisor", model).system_prompt("x").build().unwrap(),
    );

    let events: Vec<_> = agent
        .stream(transcript::user_turn("check"), RunConfig::new("s1"))
        .collect::<Vec<_>>()
        .await
        .into_iter()
        .map(Result::unwrap)
        .collect();

    let chunks: Vec<(String, String)> = events
        .iter()
        .filter_map(|e| match e {
            deskflow_graph::GraphEvent::Chunk { node, content } => {
                Some((node.clone(), content.clone()))
            }
            _ => None,
        })
        .collect();

    assert_eq!(chunks.len(), 2);
    assert!(chunks.iter().all(|(node, _)| node == "supervisor"));
    assert_eq!(chunks[0].1, "Tick");
}
