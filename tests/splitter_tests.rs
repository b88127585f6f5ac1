use std::time::Duration;

use async_trait::async_trait;

use chatrelay::client_wrapper::{ChunkStream, CompletionError, FinishReason, MessageChunk};
use chatrelay::stream_splitter::{split_stream, SplitSink, Splitter};

/// Records every callback in arrival order.
#[derive(Default)]
struct RecordingSink {
    events: Vec<String>,
}

#[async_trait]
impl SplitSink for RecordingSink {
    async fn on_visible_token(&mut self, text: &str) {
        self.events.push(format!("visible:{}", text));
    }

    async fn on_reasoning_start(&mut self) {
        self.events.push("reasoning_start".to_string());
    }

    async fn on_reasoning_token(&mut self, text: &str) {
        self.events.push(format!("reasoning:{}", text));
    }

    async fn on_reasoning_end(&mut self, elapsed: Duration) {
        assert!(elapsed < Duration::from_secs(1), "timer should be near zero");
        self.events.push("reasoning_end".to_string());
    }
}

fn stream_of(items: Vec<Result<MessageChunk, CompletionError>>) -> ChunkStream {
    Box::pin(futures_util::stream::iter(items))
}

fn content_chunks(tokens: &[&str]) -> Vec<Result<MessageChunk, CompletionError>> {
    tokens
        .iter()
        .map(|t| Ok(MessageChunk::content(*t)))
        .collect()
}

#[tokio::test]
async fn demultiplexes_reasoning_from_visible_answer() {
    let mut chunks = content_chunks(&["Hello ", "<think>", "pondering", "</think>", "World"]);
    chunks.push(Ok(MessageChunk::finished(FinishReason::Stop)));

    let mut splitter = Splitter::new();
    let mut sink = RecordingSink::default();
    split_stream(stream_of(chunks), &mut splitter, &mut sink)
        .await
        .unwrap();

    assert_eq!(
        sink.events,
        vec![
            "visible:Hello ",
            "reasoning_start",
            "reasoning:pondering",
            "reasoning_end",
            "visible:World",
        ]
    );
    assert!(splitter.is_finished());
}

#[tokio::test]
async fn stream_exhaustion_mid_reasoning_flushes_the_block() {
    let chunks = content_chunks(&["<think>", "half a thought"]);

    let mut splitter = Splitter::new();
    let mut sink = RecordingSink::default();
    split_stream(stream_of(chunks), &mut splitter, &mut sink)
        .await
        .unwrap();

    assert_eq!(
        sink.events,
        vec!["reasoning_start", "reasoning:half a thought", "reasoning_end"]
    );
    assert!(splitter.is_finished());
}

#[tokio::test]
async fn mid_stream_error_terminates_early_with_partial_output() {
    let chunks = vec![
        Ok(MessageChunk::content("partial ")),
        Err(CompletionError::Stream("connection dropped".into())),
        Ok(MessageChunk::content("never seen")),
    ];

    let mut splitter = Splitter::new();
    let mut sink = RecordingSink::default();
    let err = split_stream(stream_of(chunks), &mut splitter, &mut sink)
        .await
        .err()
        .expect("expected stream error");

    assert!(matches!(err, CompletionError::Stream(_)));
    // Whatever already streamed stays delivered; nothing after the failure does.
    assert_eq!(sink.events, vec!["visible:partial "]);
}

#[tokio::test]
async fn nothing_is_routed_after_the_stop_chunk() {
    let chunks = vec![
        Ok(MessageChunk::content("answer")),
        Ok(MessageChunk::finished(FinishReason::Stop)),
        Ok(MessageChunk::content("trailing")),
    ];

    let mut splitter = Splitter::new();
    let mut sink = RecordingSink::default();
    split_stream(stream_of(chunks), &mut splitter, &mut sink)
        .await
        .unwrap();

    assert_eq!(sink.events, vec!["visible:answer"]);
}
