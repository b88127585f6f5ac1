//! Response Stream Splitter
//!
//! Demultiplexes a completion chunk stream into a "reasoning" sub-stream and
//! a "visible answer" sub-stream.  Reasoning blocks are delimited by literal
//! sentinel tokens the model emits inline (by default `<think>` and
//! `</think>`); the splitter times each block so the sink can report how
//! long the model thought.
//!
//! The pure routing logic lives in [`Splitter`], a state machine fed one
//! chunk at a time with no lookahead; it can be tested without any UI or
//! async machinery.  [`split_stream`] is the side-effecting driver that
//! consumes a [`ChunkStream`] exactly once and forwards events to an
//! injected [`SplitSink`].
//!
//! Sentinels must match a chunk's content exactly: a sentinel split across
//! two chunks is not detected.  This mirrors how the supported model
//! families emit the markers as standalone tokens and is an accepted
//! approximation, not a robustness guarantee.
//!
//! If the stream ends while a reasoning block is open, the block's content
//! has already been routed to the reasoning sink and a closing
//! [`SplitEvent::ReasoningEnd`] is synthesized, so no output is lost.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures_util::StreamExt;

use crate::client_wrapper::{ChunkStream, CompletionError, FinishReason, MessageChunk};

/// Default opening sentinel for reasoning blocks.
pub const DEFAULT_OPEN_SENTINEL: &str = "<think>";
/// Default closing sentinel for reasoning blocks.
pub const DEFAULT_CLOSE_SENTINEL: &str = "</think>";

/// A routing decision produced by [`Splitter::feed`].
#[derive(Clone, Debug, PartialEq)]
pub enum SplitEvent {
    /// Content destined for the visible answer stream.
    Visible(String),
    /// A reasoning block opened.
    ReasoningStart,
    /// Content destined for the reasoning stream.
    Reasoning(String),
    /// A reasoning block closed after the given wall-clock time.
    ReasoningEnd(Duration),
    /// The stream terminated; no further events will follow.
    Done,
}

#[derive(Clone, Copy, PartialEq)]
enum Route {
    Visible,
    Reasoning,
}

/// Single-pass state machine that routes chunk content between the visible
/// and reasoning streams.
pub struct Splitter {
    open_sentinel: String,
    close_sentinel: String,
    route: Route,
    opened_at: Option<Instant>,
    finished: bool,
}

impl Splitter {
    /// Build a splitter with the default `<think>` sentinels.
    pub fn new() -> Self {
        Self::with_sentinels(DEFAULT_OPEN_SENTINEL, DEFAULT_CLOSE_SENTINEL)
    }

    /// Build a splitter with custom sentinel literals, for model families
    /// that use different reasoning markers.
    pub fn with_sentinels(open: impl Into<String>, close: impl Into<String>) -> Self {
        Self {
            open_sentinel: open.into(),
            close_sentinel: close.into(),
            route: Route::Visible,
            opened_at: None,
            finished: false,
        }
    }

    /// True once a terminal chunk has been seen or [`finish`](Splitter::finish) ran.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Route one chunk, returning the events it produced in order.
    ///
    /// A chunk with `finish_reason == Stop`, or an empty content token,
    /// terminates the stream regardless of the current route.  A terminal
    /// chunk that still carries content has that content routed first.
    pub fn feed(&mut self, chunk: &MessageChunk) -> Vec<SplitEvent> {
        if self.finished {
            return Vec::new();
        }

        if chunk.content.is_empty() {
            return self.finish();
        }

        let token = chunk.content.as_str();
        let mut events = match self.route {
            Route::Visible if token == self.open_sentinel => {
                self.route = Route::Reasoning;
                self.opened_at = Some(Instant::now());
                vec![SplitEvent::ReasoningStart]
            }
            Route::Visible => vec![SplitEvent::Visible(token.to_string())],
            Route::Reasoning if token == self.close_sentinel => {
                self.route = Route::Visible;
                let elapsed = self
                    .opened_at
                    .take()
                    .map(|t| t.elapsed())
                    .unwrap_or_default();
                vec![SplitEvent::ReasoningEnd(elapsed)]
            }
            Route::Reasoning => vec![SplitEvent::Reasoning(token.to_string())],
        };

        if chunk.finish_reason == Some(FinishReason::Stop) {
            events.extend(self.finish());
        }
        events
    }

    /// Flush the state machine at end of stream.
    ///
    /// Closes an unterminated reasoning block (the documented policy: its
    /// content stays on the reasoning stream) and emits [`SplitEvent::Done`].
    pub fn finish(&mut self) -> Vec<SplitEvent> {
        if self.finished {
            return Vec::new();
        }
        self.finished = true;

        let mut events = Vec::new();
        if self.route == Route::Reasoning {
            let elapsed = self
                .opened_at
                .take()
                .map(|t| t.elapsed())
                .unwrap_or_default();
            events.push(SplitEvent::ReasoningEnd(elapsed));
            self.route = Route::Visible;
        }
        events.push(SplitEvent::Done);
        events
    }
}

impl Default for Splitter {
    fn default() -> Self {
        Self::new()
    }
}

/// Destination callbacks for split output.  Implemented by the caller's UI
/// layer; the splitter itself never touches a UI.
#[async_trait]
pub trait SplitSink: Send {
    /// A fragment of the visible answer arrived.
    async fn on_visible_token(&mut self, text: &str);
    /// A reasoning block opened.
    async fn on_reasoning_start(&mut self);
    /// A fragment of reasoning content arrived.
    async fn on_reasoning_token(&mut self, text: &str);
    /// A reasoning block closed after `elapsed` wall-clock time.
    async fn on_reasoning_end(&mut self, elapsed: Duration);
}

/// Consume a chunk stream exactly once, routing every fragment through the
/// splitter into the sink.
///
/// A mid-stream [`CompletionError`] terminates the visible stream early and
/// propagates to the caller; whatever had already streamed stays delivered,
/// with no completion marker.
pub async fn split_stream(
    mut chunks: ChunkStream,
    splitter: &mut Splitter,
    sink: &mut dyn SplitSink,
) -> Result<(), CompletionError> {
    while let Some(item) = chunks.next().await {
        let chunk = item?;
        for event in splitter.feed(&chunk) {
            if dispatch(sink, event).await {
                return Ok(());
            }
        }
    }

    for event in splitter.finish() {
        if dispatch(sink, event).await {
            break;
        }
    }
    Ok(())
}

/// Forward one event to the sink; true when the stream is done.
async fn dispatch(sink: &mut dyn SplitSink, event: SplitEvent) -> bool {
    match event {
        SplitEvent::Visible(text) => sink.on_visible_token(&text).await,
        SplitEvent::ReasoningStart => sink.on_reasoning_start().await,
        SplitEvent::Reasoning(text) => sink.on_reasoning_token(&text).await,
        SplitEvent::ReasoningEnd(elapsed) => sink.on_reasoning_end(elapsed).await,
        SplitEvent::Done => return true,
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed_all(splitter: &mut Splitter, tokens: &[&str]) -> Vec<SplitEvent> {
        let mut events = Vec::new();
        for token in tokens {
            events.extend(splitter.feed(&MessageChunk::content(*token)));
        }
        events
    }

    #[test]
    fn routes_reasoning_between_sentinels() {
        let mut splitter = Splitter::new();
        let mut events = feed_all(
            &mut splitter,
            &["Hello ", "<think>", "pondering", "</think>", "World"],
        );
        events.extend(splitter.feed(&MessageChunk::finished(FinishReason::Stop)));

        assert_eq!(events.len(), 6);
        assert_eq!(events[0], SplitEvent::Visible("Hello ".into()));
        assert_eq!(events[1], SplitEvent::ReasoningStart);
        assert_eq!(events[2], SplitEvent::Reasoning("pondering".into()));
        assert!(matches!(events[3], SplitEvent::ReasoningEnd(elapsed) if elapsed < Duration::from_secs(1)));
        assert_eq!(events[4], SplitEvent::Visible("World".into()));
        assert_eq!(events[5], SplitEvent::Done);
        assert!(splitter.is_finished());
    }

    #[test]
    fn empty_token_terminates_regardless_of_route() {
        let mut splitter = Splitter::new();
        feed_all(&mut splitter, &["<think>", "hmm"]);

        let events = splitter.feed(&MessageChunk::content(""));
        assert!(matches!(events[0], SplitEvent::ReasoningEnd(_)));
        assert_eq!(events[1], SplitEvent::Done);
    }

    #[test]
    fn unterminated_block_is_flushed_as_reasoning() {
        let mut splitter = Splitter::new();
        let events = feed_all(&mut splitter, &["<think>", "half a thought"]);
        assert_eq!(events[1], SplitEvent::Reasoning("half a thought".into()));

        let tail = splitter.finish();
        assert!(matches!(tail[0], SplitEvent::ReasoningEnd(_)));
        assert_eq!(tail[1], SplitEvent::Done);
    }

    #[test]
    fn sentinel_must_match_exactly() {
        let mut splitter = Splitter::new();
        // A sentinel fused with other text in one chunk is not a marker.
        let events = feed_all(&mut splitter, &["<think>extra"]);
        assert_eq!(events, vec![SplitEvent::Visible("<think>extra".into())]);
    }

    #[test]
    fn custom_sentinels_are_honored() {
        let mut splitter = Splitter::with_sentinels("<reasoning>", "</reasoning>");
        let events = feed_all(&mut splitter, &["<reasoning>", "mull", "</reasoning>"]);
        assert_eq!(events[0], SplitEvent::ReasoningStart);
        assert_eq!(events[1], SplitEvent::Reasoning("mull".into()));
        assert!(matches!(events[2], SplitEvent::ReasoningEnd(_)));
    }

    #[test]
    fn terminal_chunk_content_is_routed_before_finishing() {
        let mut splitter = Splitter::new();
        let chunk = MessageChunk {
            content: "tail".to_string(),
            finish_reason: Some(FinishReason::Stop),
            ..Default::default()
        };

        let events = splitter.feed(&chunk);
        assert_eq!(events[0], SplitEvent::Visible("tail".into()));
        assert_eq!(events[1], SplitEvent::Done);
        assert!(splitter.is_finished());
    }

    #[test]
    fn feeding_after_finish_is_a_no_op() {
        let mut splitter = Splitter::new();
        splitter.feed(&MessageChunk::finished(FinishReason::Stop));
        assert!(splitter.feed(&MessageChunk::content("late")).is_empty());
        assert!(splitter.finish().is_empty());
    }
}
