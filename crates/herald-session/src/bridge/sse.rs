//! Line-oriented Server-Sent Events decoding for the pairing feed.

use std::fmt::Display;

use bytes::{Bytes, BytesMut};
use futures::Stream;
use tokio_stream::StreamExt;
use tracing::warn;

/// Yield the `data:` payload of every SSE line in `byte_stream`.
///
/// Comments, non-data fields and empty payloads are skipped. A trailing line
/// without a newline is still delivered when the stream ends.
pub(crate) fn parse_sse_lines<S, E>(byte_stream: S) -> impl Stream<Item = String> + Send
where
    S: Stream<Item = Result<Bytes, E>> + Send + Unpin + 'static,
    E: Display + Send + 'static,
{
    futures::stream::unfold(
        (byte_stream, BytesMut::with_capacity(1024), false),
        |(mut stream, mut buffer, done)| async move {
            if done {
                return None;
            }

            loop {
                if let Some(newline_pos) = buffer.iter().position(|&b| b == b'\n') {
                    let mut line_bytes = buffer.split_to(newline_pos + 1);
                    line_bytes.truncate(line_bytes.len() - 1);
                    if line_bytes.last() == Some(&b'\r') {
                        line_bytes.truncate(line_bytes.len() - 1);
                    }

                    let Ok(line) = std::str::from_utf8(&line_bytes) else {
                        continue;
                    };
                    if let Some(data) = extract_sse_data(line) {
                        return Some((data, (stream, buffer, false)));
                    }
                    continue;
                }

                match stream.next().await {
                    Some(Ok(chunk)) => buffer.extend_from_slice(&chunk),
                    Some(Err(e)) => {
                        warn!(error = %e, "pairing feed read error");
                        return None;
                    }
                    None => {
                        let data = std::str::from_utf8(&buffer)
                            .ok()
                            .and_then(|rest| extract_sse_data(rest.trim()));
                        buffer.clear();
                        return data.map(|d| (d, (stream, buffer, true)));
                    }
                }
            }
        },
    )
}

fn extract_sse_data(line: &str) -> Option<String> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with(':') {
        return None;
    }

    let data = trimmed
        .strip_prefix("data: ")
        .or_else(|| trimmed.strip_prefix("data:"))?
        .trim();

    (!data.is_empty()).then(|| data.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    type Chunk = Result<Bytes, std::io::Error>;

    async fn collect(chunks: Vec<Chunk>) -> Vec<String> {
        parse_sse_lines(futures::stream::iter(chunks)).collect().await
    }

    #[test]
    fn extract_data_with_and_without_space() {
        assert_eq!(extract_sse_data("data: {\"a\":1}"), Some("{\"a\":1}".into()));
        assert_eq!(extract_sse_data("data:{\"a\":1}"), Some("{\"a\":1}".into()));
    }

    #[test]
    fn extract_skips_comments_and_other_fields() {
        assert_eq!(extract_sse_data(": keep-alive"), None);
        assert_eq!(extract_sse_data("event: pairing"), None);
        assert_eq!(extract_sse_data("data:"), None);
        assert_eq!(extract_sse_data(""), None);
    }

    #[tokio::test]
    async fn events_split_across_chunks() {
        let out = collect(vec![
            Ok(Bytes::from("data: {\"kind\":\"co")),
            Ok(Bytes::from("de\",\"code\":\"X\"}\n\n: ping\n\ndata: {\"kind\":\"timeout\"}\r\n")),
        ])
        .await;
        assert_eq!(
            out,
            vec![
                "{\"kind\":\"code\",\"code\":\"X\"}".to_owned(),
                "{\"kind\":\"timeout\"}".to_owned(),
            ]
        );
    }

    #[tokio::test]
    async fn trailing_line_is_delivered() {
        let out = collect(vec![Ok(Bytes::from("data: {\"kind\":\"timeout\"}"))]).await;
        assert_eq!(out, vec!["{\"kind\":\"timeout\"}".to_owned()]);
    }

    #[tokio::test]
    async fn read_error_ends_stream() {
        let out = collect(vec![
            Ok(Bytes::from("data: 1\n")),
            Err(std::io::Error::other("reset")),
            Ok(Bytes::from("data: 2\n")),
        ])
        .await;
        assert_eq!(out, vec!["1".to_owned()]);
    }
}
