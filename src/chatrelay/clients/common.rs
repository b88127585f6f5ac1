//! Shared wire plumbing for OpenAI-compatible chat endpoints.
//!
//! Both the local Ollama runtime and the cloud providers speak the same
//! `/chat/completions` dialect, so a single request builder, response
//! decoder, and SSE stream decoder serve every [`ClientWrapper`]
//! implementation in this crate.

use std::collections::BTreeMap;
use std::collections::VecDeque;
use std::pin::Pin;

use futures_util::{Stream, StreamExt};
use serde::{Deserialize, Serialize};

use crate::client_wrapper::{
    ChunkStream, CompletionError, FinishReason, Message, MessageChunk, Role, ToolCall,
    ToolCallDelta,
};
use crate::tool_invoker::ToolDescriptor;

/// One message in the wire format.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiMessage {
    pub role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ApiToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

/// A fully materialized tool call in the wire format.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiToolCall {
    pub id: String,
    #[serde(rename = "type")]
    pub call_type: String,
    pub function: ApiFunction,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiFunction {
    pub name: String,
    pub arguments: String,
}

/// A tool offer in the wire format (`{"type":"function","function":{...}}`).
#[derive(Debug, Serialize)]
pub struct ApiToolSpec {
    #[serde(rename = "type")]
    pub spec_type: String,
    pub function: ApiFunctionSpec,
}

#[derive(Debug, Serialize)]
pub struct ApiFunctionSpec {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// Request body for `/chat/completions`.
#[derive(Debug, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ApiMessage>,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ApiToolSpec>>,
    /// Always `"auto"` when tools are offered: the backend decides whether
    /// to call a tool, it is never forced.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
pub struct ChatChoice {
    pub message: ApiMessage,
    #[allow(dead_code)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct StreamDelta {
    content: Option<String>,
    tool_calls: Option<Vec<StreamToolCallDelta>>,
}

#[derive(Debug, Deserialize)]
struct StreamToolCallDelta {
    index: usize,
    id: Option<String>,
    function: Option<StreamFunctionDelta>,
}

#[derive(Debug, Deserialize)]
struct StreamFunctionDelta {
    name: Option<String>,
    arguments: Option<String>,
}

fn role_to_wire(role: Role) -> &'static str {
    match role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::Tool => "tool",
    }
}

/// Convert domain messages and tool descriptors into a request body.
pub fn build_request(
    model: &str,
    messages: &[Message],
    tools: Option<&[ToolDescriptor]>,
    stream: bool,
) -> ChatRequest {
    let api_messages = messages
        .iter()
        .map(|msg| ApiMessage {
            role: role_to_wire(msg.role).to_string(),
            content: msg.content.clone(),
            tool_calls: if msg.tool_calls.is_empty() {
                None
            } else {
                Some(
                    msg.tool_calls
                        .iter()
                        .map(|tc| ApiToolCall {
                            id: tc.id.clone(),
                            call_type: "function".to_string(),
                            function: ApiFunction {
                                name: tc.name.clone(),
                                arguments: tc.arguments.clone(),
                            },
                        })
                        .collect(),
                )
            },
            tool_call_id: msg.tool_call_id.clone(),
        })
        .collect();

    let api_tools = tools.filter(|t| !t.is_empty()).map(|descriptors| {
        descriptors
            .iter()
            .map(|d| ApiToolSpec {
                spec_type: "function".to_string(),
                function: ApiFunctionSpec {
                    name: d.name.clone(),
                    description: d.description.clone(),
                    parameters: d.input_schema.clone(),
                },
            })
            .collect::<Vec<_>>()
    });

    let tool_choice = api_tools.as_ref().map(|_| "auto".to_string());

    ChatRequest {
        model: model.to_string(),
        messages: api_messages,
        stream,
        tools: api_tools,
        tool_choice,
    }
}

/// Convert a wire assistant message back into the domain type.
pub fn message_from_wire(api: ApiMessage) -> Message {
    Message {
        role: Role::Assistant,
        content: api.content,
        tool_calls: api
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|tc| ToolCall {
                id: tc.id,
                name: tc.function.name,
                arguments: tc.function.arguments,
            })
            .collect(),
        tool_call_id: None,
    }
}

/// Issue a materialized chat request and decode the assistant message.
pub async fn send_chat(
    http: &reqwest::Client,
    base_url: &str,
    api_key: &str,
    request: &ChatRequest,
) -> Result<Message, CompletionError> {
    let response = post_chat(http, base_url, api_key, request).await?;

    let body: ChatResponse = response
        .json()
        .await
        .map_err(|e| CompletionError::MalformedResponse(e.to_string()))?;

    let choice = body
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| CompletionError::MalformedResponse("response had no choices".into()))?;

    Ok(message_from_wire(choice.message))
}

/// Issue a streaming chat request and decode the SSE response into a lazy
/// [`ChunkStream`].  The stream is finite, non-restartable, and must be
/// consumed exactly once, in arrival order.
pub async fn send_chat_stream(
    http: &reqwest::Client,
    base_url: &str,
    api_key: &str,
    request: &ChatRequest,
) -> Result<ChunkStream, CompletionError> {
    let response = post_chat(http, base_url, api_key, request).await?;
    Ok(sse_chunk_stream(response.bytes_stream()))
}

async fn post_chat(
    http: &reqwest::Client,
    base_url: &str,
    api_key: &str,
    request: &ChatRequest,
) -> Result<reqwest::Response, CompletionError> {
    let url = format!("{}/chat/completions", base_url.trim_end_matches('/'));

    let mut builder = http.post(&url).json(request);
    if !api_key.is_empty() {
        builder = builder.bearer_auth(api_key);
    }

    let response = builder.send().await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_else(|_| "<no body>".into());
        log::error!("chat completion request to {} failed: {} {}", url, status, body);
        return Err(CompletionError::Api {
            status: status.as_u16(),
            body,
        });
    }

    Ok(response)
}

/// One decoded server-sent event line.
enum SseEvent {
    /// Keep reading: comment, blank line, or a field we do not use.
    Ignore,
    Chunk(MessageChunk),
    Done,
    Error(CompletionError),
}

/// Decode one SSE line (without the trailing newline) into an event.
fn decode_sse_line(line: &str) -> SseEvent {
    let payload = match line.strip_prefix("data:").map(str::trim_start) {
        Some(payload) => payload,
        None => return SseEvent::Ignore,
    };

    if payload == "[DONE]" {
        return SseEvent::Done;
    }
    if payload.is_empty() {
        return SseEvent::Ignore;
    }

    match serde_json::from_str::<StreamChunk>(payload) {
        Ok(chunk) => {
            let choice = match chunk.choices.into_iter().next() {
                Some(choice) => choice,
                None => return SseEvent::Ignore,
            };

            let tool_call_deltas = choice
                .delta
                .tool_calls
                .unwrap_or_default()
                .into_iter()
                .map(|tc| {
                    let (name, arguments) = match tc.function {
                        Some(f) => (f.name, f.arguments),
                        None => (None, None),
                    };
                    ToolCallDelta {
                        index: tc.index,
                        id: tc.id,
                        name,
                        arguments,
                    }
                })
                .collect();

            let chunk = MessageChunk {
                content: choice.delta.content.unwrap_or_default(),
                tool_call_deltas,
                finish_reason: choice.finish_reason.as_deref().map(FinishReason::from_wire),
            };

            // Role-only preamble deltas carry nothing consumers care about.
            if chunk.content.is_empty()
                && chunk.tool_call_deltas.is_empty()
                && chunk.finish_reason.is_none()
            {
                return SseEvent::Ignore;
            }

            SseEvent::Chunk(chunk)
        }
        Err(_) => {
            // Mid-stream error objects arrive as data payloads too.
            SseEvent::Error(CompletionError::Stream(format!(
                "unparseable stream payload: {}",
                payload
            )))
        }
    }
}

/// Wrap a byte stream of SSE frames into a stream of [`MessageChunk`]s.
///
/// Lines are split on `\n` from an internal buffer, so frames fragmented or
/// coalesced by the transport decode identically.
fn sse_chunk_stream<S, B, E>(bytes: S) -> ChunkStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    struct State<S> {
        bytes: Pin<Box<S>>,
        buffer: Vec<u8>,
        queued: VecDeque<Result<MessageChunk, CompletionError>>,
        done: bool,
    }

    let state = State {
        bytes: Box::pin(bytes),
        buffer: Vec::new(),
        queued: VecDeque::new(),
        done: false,
    };

    Box::pin(futures_util::stream::unfold(state, |mut st| async move {
        loop {
            if let Some(item) = st.queued.pop_front() {
                return Some((item, st));
            }
            if st.done {
                return None;
            }

            match st.bytes.next().await {
                Some(Ok(frame)) => {
                    st.buffer.extend_from_slice(frame.as_ref());
                    while let Some(pos) = st.buffer.iter().position(|&b| b == b'\n') {
                        let line = String::from_utf8_lossy(&st.buffer[..pos]).trim().to_string();
                        st.buffer.drain(..=pos);
                        match decode_sse_line(&line) {
                            SseEvent::Ignore => {}
                            SseEvent::Chunk(chunk) => st.queued.push_back(Ok(chunk)),
                            SseEvent::Done => {
                                st.done = true;
                                break;
                            }
                            SseEvent::Error(err) => {
                                st.queued.push_back(Err(err));
                                st.done = true;
                                break;
                            }
                        }
                    }
                }
                Some(Err(err)) => {
                    st.queued
                        .push_back(Err(CompletionError::Stream(err.to_string())));
                    st.done = true;
                }
                None => {
                    st.done = true;
                    // A final line without a trailing newline still counts.
                    if !st.buffer.is_empty() {
                        let line = String::from_utf8_lossy(&st.buffer).trim().to_string();
                        st.buffer.clear();
                        match decode_sse_line(&line) {
                            SseEvent::Ignore | SseEvent::Done => {}
                            SseEvent::Chunk(chunk) => st.queued.push_back(Ok(chunk)),
                            SseEvent::Error(err) => st.queued.push_back(Err(err)),
                        }
                    }
                }
            }
        }
    }))
}

/// Reassembles tool calls from fragments streamed across chunks.
///
/// Fragments carrying the same index belong to the same call; their argument
/// pieces concatenate in arrival order.  `finish()` returns the calls in
/// index order.
///
/// The agent loop dispatches off materialized responses and never needs
/// this; it serves callers that consume tool-bearing streams from
/// [`ClientWrapper::send_message_stream`](crate::client_wrapper::ClientWrapper::send_message_stream)
/// directly.
#[derive(Default)]
pub struct ToolCallAccumulator {
    partial: BTreeMap<usize, (String, String, String)>,
}

impl ToolCallAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one fragment into the accumulator.
    pub fn push(&mut self, delta: &ToolCallDelta) {
        let entry = self
            .partial
            .entry(delta.index)
            .or_insert_with(|| (String::new(), String::new(), String::new()));
        if let Some(id) = &delta.id {
            entry.0.push_str(id);
        }
        if let Some(name) = &delta.name {
            entry.1.push_str(name);
        }
        if let Some(arguments) = &delta.arguments {
            entry.2.push_str(arguments);
        }
    }

    /// True when no fragment has been seen.
    pub fn is_empty(&self) -> bool {
        self.partial.is_empty()
    }

    /// Consume the accumulator and return the reassembled calls in index order.
    pub fn finish(self) -> Vec<ToolCall> {
        self.partial
            .into_values()
            .map(|(id, name, arguments)| ToolCall {
                id,
                name,
                arguments,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn build_request_serializes_tool_offer() {
        let messages = vec![Message::user("Get the stock price of AAPL.")];
        let tools = vec![ToolDescriptor::new(
            "get_stock_price",
            "Returns the current price of a stock",
            json!({ "type": "object", "properties": { "ticker": { "type": "string" } } }),
        )];

        let request = build_request("gpt-oss:20b", &messages, Some(&tools), false);
        let body = serde_json::to_value(&request).unwrap();

        assert_eq!(body["model"], "gpt-oss:20b");
        assert_eq!(body["stream"], false);
        assert_eq!(body["tool_choice"], "auto");
        assert_eq!(body["tools"][0]["type"], "function");
        assert_eq!(body["tools"][0]["function"]["name"], "get_stock_price");
        assert!(body["messages"][0].get("tool_calls").is_none());
    }

    #[test]
    fn build_request_omits_empty_tool_offer() {
        let messages = vec![Message::user("hello")];
        let request = build_request("m", &messages, Some(&[]), true);
        let body = serde_json::to_value(&request).unwrap();
        assert!(body.get("tools").is_none());
        assert!(body.get("tool_choice").is_none());
    }

    #[test]
    fn decode_sse_line_handles_spacing_variants() {
        for line in [
            r#"data: {"choices":[{"delta":{"content":"Hello"},"finish_reason":null}]}"#,
            r#"data:{"choices":[{"delta":{"content":"Hello"},"finish_reason":null}]}"#,
        ] {
            match decode_sse_line(line) {
                SseEvent::Chunk(chunk) => assert_eq!(chunk.content, "Hello"),
                _ => panic!("expected a chunk for {}", line),
            }
        }

        assert!(matches!(decode_sse_line("data: [DONE]"), SseEvent::Done));
        assert!(matches!(decode_sse_line(""), SseEvent::Ignore));
        assert!(matches!(decode_sse_line(": keepalive"), SseEvent::Ignore));
    }

    #[test]
    fn decode_sse_line_surfaces_finish_reason() {
        let line = r#"data: {"choices":[{"delta":{},"finish_reason":"stop"}]}"#;
        match decode_sse_line(line) {
            SseEvent::Chunk(chunk) => {
                assert_eq!(chunk.finish_reason, Some(FinishReason::Stop));
                assert!(chunk.content.is_empty());
            }
            _ => panic!("expected a chunk"),
        }
    }

    #[test]
    fn decode_sse_line_decodes_tool_call_fragments() {
        let line = r#"data: {"choices":[{"delta":{"tool_calls":[{"index":0,"id":"call_1","function":{"name":"get_stock_price","arguments":"{\"tick"}}]},"finish_reason":null}]}"#;
        match decode_sse_line(line) {
            SseEvent::Chunk(chunk) => {
                assert_eq!(chunk.tool_call_deltas.len(), 1);
                let delta = &chunk.tool_call_deltas[0];
                assert_eq!(delta.index, 0);
                assert_eq!(delta.id.as_deref(), Some("call_1"));
                assert_eq!(delta.name.as_deref(), Some("get_stock_price"));
                assert_eq!(delta.arguments.as_deref(), Some("{\"tick"));
            }
            _ => panic!("expected a chunk"),
        }
    }

    #[test]
    fn decode_sse_line_flags_unparseable_payloads() {
        let line = r#"data: {"error":{"message":"model overloaded"}}"#;
        assert!(matches!(decode_sse_line(line), SseEvent::Error(_)));
    }

    #[tokio::test]
    async fn sse_stream_reassembles_split_frames() {
        // One logical line split across two transport frames, plus a second
        // complete line and the terminator coalesced into one frame.
        let frames: Vec<Result<&[u8], std::io::Error>> = vec![
            Ok(br#"data: {"choices":[{"delta":{"con"#.as_slice()),
            Ok(br#"tent":"Hi"},"finish_reason":null}]}"#.as_slice()),
            Ok(b"\ndata: {\"choices\":[{\"delta\":{},\"finish_reason\":\"stop\"}]}\ndata: [DONE]\n".as_slice()),
        ];

        let mut stream = sse_chunk_stream(futures_util::stream::iter(frames));

        let first = stream.next().await.unwrap().unwrap();
        assert_eq!(first.content, "Hi");

        let second = stream.next().await.unwrap().unwrap();
        assert_eq!(second.finish_reason, Some(FinishReason::Stop));

        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn sse_stream_decodes_final_line_without_trailing_newline() {
        let frames: Vec<Result<&[u8], std::io::Error>> = vec![Ok(
            br#"data: {"choices":[{"delta":{"content":"tail"},"finish_reason":null}]}"#.as_slice(),
        )];

        let mut stream = sse_chunk_stream(futures_util::stream::iter(frames));

        let only = stream.next().await.unwrap().unwrap();
        assert_eq!(only.content, "tail");
        assert!(stream.next().await.is_none());
    }

    #[test]
    fn accumulator_reassembles_fragments_by_index() {
        let mut acc = ToolCallAccumulator::new();
        assert!(acc.is_empty());

        // Interleaved fragments of two calls.
        acc.push(&ToolCallDelta {
            index: 1,
            id: Some("call_b".into()),
            name: Some("second".into()),
            arguments: Some("{\"y\":".into()),
        });
        acc.push(&ToolCallDelta {
            index: 0,
            id: Some("call_a".into()),
            name: Some("first".into()),
            arguments: Some("{\"x\"".into()),
        });
        acc.push(&ToolCallDelta {
            index: 0,
            arguments: Some(":1}".into()),
            ..Default::default()
        });
        acc.push(&ToolCallDelta {
            index: 1,
            arguments: Some("2}".into()),
            ..Default::default()
        });

        let calls = acc.finish();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].id, "call_a");
        assert_eq!(calls[0].arguments, "{\"x\":1}");
        assert_eq!(calls[1].name, "second");
        assert_eq!(calls[1].arguments, "{\"y\":2}");
    }
}
