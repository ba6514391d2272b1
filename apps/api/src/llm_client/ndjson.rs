//! Newline-delimited JSON decoding for streamed backend responses.
//!
//! Works over any stream of byte chunks; chunk boundaries need not line up
//! with line boundaries.

use bytes::Bytes;
use futures::{stream, Stream, StreamExt};

use crate::llm_client::{EventStream, GenerateChunk, GenerationEvent, LlmError};

struct DecoderState<S> {
    chunks: S,
    buffer: Vec<u8>,
    eof: bool,
    finished: bool,
}

impl<S> DecoderState<S> {
    /// Pops the next complete, non-blank line. After EOF the unterminated tail
    /// counts as a line.
    fn next_line(&mut self) -> Option<Vec<u8>> {
        loop {
            let line = match self.buffer.iter().position(|&b| b == b'\n') {
                Some(pos) => {
                    let mut line: Vec<u8> = self.buffer.drain(..=pos).collect();
                    line.pop();
                    line
                }
                None if self.eof && !self.buffer.is_empty() => std::mem::take(&mut self.buffer),
                None => return None,
            };
            if !line.trim_ascii().is_empty() {
                return Some(line);
            }
        }
    }
}

/// Parses a single NDJSON line into a generation event.
pub fn parse_line(line: &[u8]) -> Result<GenerationEvent, LlmError> {
    let chunk: GenerateChunk = serde_json::from_slice(line.trim_ascii())?;
    Ok(GenerationEvent {
        fragment: chunk.response,
        is_final: chunk.done,
    })
}

/// Turns a byte stream into a stream of generation events.
///
/// The stream ends right after the first `done = true` line; anything the
/// backend sends after it is never read. A line that is not a valid chunk ends
/// the stream with `LlmError::Parse`, and EOF before a final line ends it with
/// `LlmError::Truncated`.
pub fn decode_events<S, E>(chunks: S) -> EventStream
where
    S: Stream<Item = Result<Bytes, E>> + Send + Unpin + 'static,
    E: Into<LlmError> + Send + 'static,
{
    let state = DecoderState {
        chunks,
        buffer: Vec::new(),
        eof: false,
        finished: false,
    };

    stream::unfold(state, |mut state| async move {
        if state.finished {
            return None;
        }
        loop {
            if let Some(line) = state.next_line() {
                let event = parse_line(&line);
                state.finished = match &event {
                    Ok(event) => event.is_final,
                    Err(_) => true,
                };
                return Some((event, state));
            }

            if state.eof {
                state.finished = true;
                return Some((Err(LlmError::Truncated), state));
            }

            match state.chunks.next().await {
                Some(Ok(bytes)) => state.buffer.extend_from_slice(&bytes),
                Some(Err(e)) => {
                    state.finished = true;
                    return Some((Err(e.into()), state));
                }
                None => state.eof = true,
            }
        }
    })
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunks(parts: &[&'static str]) -> impl Stream<Item = Result<Bytes, LlmError>> + Unpin {
        stream::iter(
            parts
                .iter()
                .map(|p| Ok(Bytes::from_static(p.as_bytes())))
                .collect::<Vec<_>>(),
        )
    }

    async fn collect(parts: &[&'static str]) -> Vec<Result<GenerationEvent, LlmError>> {
        decode_events(chunks(parts)).collect().await
    }

    fn line(response: &str, done: bool) -> String {
        format!(
            "{{\"model\":\"m\",\"created_at\":\"2024-01-01T00:00:00Z\",\"response\":{},\"done\":{}}}\n",
            serde_json::to_string(response).unwrap(),
            done
        )
    }

    fn leak(s: String) -> &'static str {
        Box::leak(s.into_boxed_str())
    }

    #[tokio::test]
    async fn test_lines_split_across_chunks() {
        let full = leak(format!("{}{}", line("Hel", false), line("lo", true)));
        let (a, b) = full.split_at(17);
        let events = collect(&[a, b]).await;
        let events: Vec<GenerationEvent> = events.into_iter().map(Result::unwrap).collect();
        assert_eq!(
            events,
            vec![
                GenerationEvent { fragment: "Hel".into(), is_final: false },
                GenerationEvent { fragment: "lo".into(), is_final: true },
            ]
        );
    }

    #[tokio::test]
    async fn test_blank_lines_skipped_and_unterminated_tail_decoded() {
        let last = line("", true);
        let tail = leak(last.trim_end().to_string());
        let first = leak(line("# Summary", false));
        let events = collect(&[first, "\n  \n", tail]).await;
        assert_eq!(events.len(), 2);
        assert!(events[1].as_ref().unwrap().is_final);
    }

    #[tokio::test]
    async fn test_nothing_read_after_final_line() {
        let body = leak(format!("{}{}", line("done", true), "this is not json\n"));
        let events = collect(&[body]).await;
        assert_eq!(events.len(), 1);
        assert!(events[0].as_ref().unwrap().is_final);
    }

    #[tokio::test]
    async fn test_eof_without_final_is_truncated() {
        let body = leak(format!("{}{}", line("a", false), line("b", false)));
        let events = collect(&[body]).await;
        assert_eq!(events.len(), 3);
        assert!(matches!(events[2], Err(LlmError::Truncated)));
    }

    #[tokio::test]
    async fn test_malformed_line_stops_stream() {
        let body = leak(format!("{}{}{}", line("a", false), "{oops}\n", line("b", true)));
        let events = collect(&[body]).await;
        assert_eq!(events.len(), 2);
        assert!(matches!(events[1], Err(LlmError::Parse(_))));
    }

    #[tokio::test]
    async fn test_empty_body_is_truncated() {
        let events = collect(&[]).await;
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], Err(LlmError::Truncated)));
    }
}
