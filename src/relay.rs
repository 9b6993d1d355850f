//! Chunking and pacing of completed responses.
//!
//! Upstream calls are request/response; the relay re-emits the finished
//! text as small ordered chunks with brief pauses so the client perceives
//! incremental generation. Concatenating the chunks reproduces the text
//! exactly.

use bytes::Bytes;
use futures::Stream;
use std::pin::Pin;
use std::time::Duration;
use tokio::time::sleep;

pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<Bytes, actix_web::Error>>>>;

/// Characters per emitted chunk
pub const CHUNK_CHARS: usize = 8;
/// Pause after this many chunks
pub const CHUNKS_PER_PAUSE: usize = 4;
/// Pacing delay between chunk groups
pub const PAUSE: Duration = Duration::from_millis(1);

/// Split on char boundaries so multi-byte text never tears mid-codepoint
pub fn chunk_text(text: &str) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(CHUNK_CHARS)
        .map(|chunk| chunk.iter().collect())
        .collect()
}

pub fn relay(text: String) -> ChunkStream {
    Box::pin(async_stream::stream! {
        for (i, chunk) in chunk_text(&text).into_iter().enumerate() {
            yield Ok(Bytes::from(chunk));
            if (i + 1) % CHUNKS_PER_PAUSE == 0 {
                sleep(PAUSE).await;
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    async fn collect(stream: ChunkStream) -> String {
        let chunks: Vec<Bytes> = stream.map(|r| r.unwrap()).collect().await;
        let bytes: Vec<u8> = chunks.iter().flat_map(|b| b.iter().copied()).collect();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn test_chunk_text_empty() {
        assert!(chunk_text("").is_empty());
    }

    #[test]
    fn test_chunk_text_single_char() {
        assert_eq!(chunk_text("a"), vec!["a"]);
    }

    #[test]
    fn test_chunk_text_reconstructs_long_text() {
        let text = "The quick brown fox jumps over the lazy dog";
        let chunks = chunk_text(text);
        assert!(chunks.len() > 1);
        assert!(chunks[..chunks.len() - 1]
            .iter()
            .all(|c| c.chars().count() == CHUNK_CHARS));
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn test_chunk_text_keeps_multibyte_chars_whole() {
        let text = "héllo wörld — ответ 日本語テキスト";
        assert_eq!(chunk_text(text).concat(), text);
    }

    #[tokio::test]
    async fn test_relay_stream_reconstructs_text() {
        let text = "streaming is simulated, ordering is not".to_string();
        assert_eq!(collect(relay(text.clone())).await, text);
    }

    #[tokio::test]
    async fn test_relay_stream_empty_text_closes_immediately() {
        let mut stream = relay(String::new());
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_relay_stream_single_char() {
        assert_eq!(collect(relay("x".to_string())).await, "x");
    }
}
