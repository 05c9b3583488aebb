//! Server-sent event decoding (Bytes -> typed frames).

use crate::{BoxStream, Error, ErrorContext};
use bytes::Bytes;
use futures::{stream, StreamExt};
use serde::de::DeserializeOwned;

/// Upper bound for a single buffered line, to stop a misbehaving peer from
/// growing the buffer without limit.
const MAX_LINE_BYTES: usize = 1024 * 1024;

/// Incremental SSE decoder:
/// - splits the byte stream into lines (tolerating `\r\n`)
/// - keeps only `data:` lines, skipping comments and other fields
/// - stops on the done signal (default `[DONE]`)
/// - fails the stream on a payload that does not parse
///
/// Bytes are buffered until a full line is available, so multi-byte UTF-8
/// characters split across network reads are decoded intact.
#[derive(Debug, Clone)]
pub struct SseDecoder {
    prefix: String,
    done_signal: String,
}

impl Default for SseDecoder {
    fn default() -> Self {
        Self::new(None, None)
    }
}

impl SseDecoder {
    pub fn new(prefix: Option<String>, done_signal: Option<String>) -> Self {
        Self {
            prefix: prefix.unwrap_or_else(|| "data:".to_string()),
            done_signal: done_signal.unwrap_or_else(|| "[DONE]".to_string()),
        }
    }

    /// Decodes `input` into a stream of `T`. The stream ends at the done signal
    /// or at EOF, and yields an error (then ends) on a malformed frame.
    pub fn decode<T>(&self, input: BoxStream<'static, Bytes>) -> BoxStream<'static, T>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let prefix = self.prefix.clone();
        let done_signal = self.done_signal.clone();

        let stream = stream::unfold(
            Some((input, Vec::<u8>::new())),
            move |state| {
                let prefix = prefix.clone();
                let done_signal = done_signal.clone();
                async move {
                    let (mut input, mut buf) = state?;
                    loop {
                        if let Some(pos) = buf.iter().position(|b| *b == b'\n') {
                            let line: Vec<u8> = buf.drain(..=pos).collect();
                            let line = String::from_utf8_lossy(&line);
                            match parse_line::<T>(&line, &prefix, &done_signal) {
                                Frame::Skip => continue,
                                Frame::Done => return None,
                                Frame::Item(item) => return Some((item, Some((input, buf)))),
                            }
                        }

                        if buf.len() > MAX_LINE_BYTES {
                            let err = Error::protocol_with_context(
                                "event stream line exceeds limit",
                                ErrorContext::new().with_details(format!("{} bytes", buf.len())),
                            );
                            return Some((Err(err), None));
                        }

                        match input.next().await {
                            Some(Ok(bytes)) => buf.extend_from_slice(&bytes),
                            Some(Err(e)) => return Some((Err(e), None)),
                            None => {
                                // EOF: the last line may lack its newline.
                                if buf.is_empty() {
                                    return None;
                                }
                                let line = String::from_utf8_lossy(&buf).into_owned();
                                return match parse_line::<T>(&line, &prefix, &done_signal) {
                                    Frame::Item(item) => Some((item, None)),
                                    Frame::Skip | Frame::Done => None,
                                };
                            }
                        }
                    }
                }
            },
        );

        Box::pin(stream)
    }
}

enum Frame<T> {
    Skip,
    Done,
    Item(crate::PipeResult<T>),
}

fn parse_line<T: DeserializeOwned>(line: &str, prefix: &str, done_signal: &str) -> Frame<T> {
    let line = line.trim_end_matches(['\r', '\n']);
    let Some(payload) = line.strip_prefix(prefix) else {
        // Blank separators, `event:`, `id:` and `:` comments.
        return Frame::Skip;
    };
    let payload = payload.trim();
    if payload.is_empty() {
        return Frame::Skip;
    }
    if payload == done_signal {
        return Frame::Done;
    }
    match serde_json::from_str::<T>(payload) {
        Ok(v) => Frame::Item(Ok(v)),
        Err(e) => Frame::Item(Err(Error::protocol_with_context(
            "failed to parse stream frame",
            ErrorContext::new()
                .with_details(e.to_string())
                .with_source("sse_decoder"),
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChatCompletionChunk;
    use futures::StreamExt;

    fn bytes_stream(parts: Vec<&'static [u8]>) -> BoxStream<'static, Bytes> {
        Box::pin(stream::iter(
            parts.into_iter().map(|p| Ok(Bytes::from_static(p))),
        ))
    }

    #[tokio::test]
    async fn decodes_frames_split_across_reads() {
        let body = "data: {\"id\":\"a\",\"choices\":[{\"index\":0,\"delta\":{\"content\":\"岗位\"}}]}\n\n";
        let raw = body.as_bytes();
        // Split inside the multi-byte characters.
        let cut = body.find("岗").unwrap() + 1;
        let (a, b) = raw.split_at(cut);
        let input: BoxStream<'static, Bytes> = Box::pin(stream::iter(vec![
            Ok(Bytes::copy_from_slice(a)),
            Ok(Bytes::copy_from_slice(b)),
            Ok(Bytes::from_static(b"data: [DONE]\n\n")),
        ]));

        let chunks: Vec<_> = SseDecoder::default()
            .decode::<ChatCompletionChunk>(input)
            .collect()
            .await;
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].as_ref().unwrap().content(), Some("岗位"));
    }

    #[tokio::test]
    async fn stops_at_done_and_skips_comments() {
        let input = bytes_stream(vec![
            b": keep-alive\n\n",
            b"event: message\r\ndata: {\"choices\":[]}\r\n\r\n",
            b"data: [DONE]\n\n",
            b"data: {\"choices\":[]}\n\n",
        ]);
        let items: Vec<_> = SseDecoder::default()
            .decode::<ChatCompletionChunk>(input)
            .collect()
            .await;
        assert_eq!(items.len(), 1);
        assert!(items[0].is_ok());
    }

    #[tokio::test]
    async fn malformed_frame_is_an_error_and_ends_stream() {
        let input = bytes_stream(vec![b"data: {not json}\n\n", b"data: {\"choices\":[]}\n\n"]);
        let items: Vec<_> = SseDecoder::default()
            .decode::<ChatCompletionChunk>(input)
            .collect()
            .await;
        assert_eq!(items.len(), 1);
        assert!(matches!(items[0], Err(Error::Protocol { .. })));
    }
}
