//! Common streaming infrastructure for chat backends
//!
//! Every backend reads its response through [`ChunkStream`], decodes it with a
//! [`StreamDecoder`] and folds fragments into a [`TranscriptAccumulator`]. The
//! processing loop lives here once so both wire formats behave identically.

use crate::accumulator::{AccumulationMode, TranscriptAccumulator};
use crate::decoder::{FrameFormat, StreamDecoder, StreamEvent};
use crate::types::StreamError;
use crate::TranscriptCallback;
use anyhow::Result;
use async_trait::async_trait;
use reqwest::Response;
use tracing::debug;

/// Source of raw response chunks
#[async_trait]
pub trait ChunkStream: Send {
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>>;
}

/// Real HTTP response chunk stream
pub struct HttpChunkStream {
    pub response: Response,
}

impl HttpChunkStream {
    pub fn new(response: Response) -> Self {
        Self { response }
    }
}

#[async_trait]
impl ChunkStream for HttpChunkStream {
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>> {
        match self.response.chunk().await {
            Ok(Some(chunk)) => Ok(Some(chunk.to_vec())),
            Ok(None) => Ok(None),
            Err(e) => Err(anyhow::anyhow!("HTTP chunk error: {}", e)),
        }
    }
}

/// Consume `stream` until the transport ends or the decoder sees a terminator.
///
/// `on_update` receives the full transcript after every fragment. Returns the
/// final transcript.
pub async fn process_stream<F: FrameFormat>(
    stream: &mut dyn ChunkStream,
    mut decoder: StreamDecoder<F>,
    mode: AccumulationMode,
    on_update: &mut TranscriptCallback<'_>,
) -> Result<String> {
    let mut transcript = TranscriptAccumulator::new(mode);

    while !decoder.is_finished() {
        let events = match stream.next_chunk().await? {
            Some(chunk) => decoder.push(&chunk),
            None => {
                let events = decoder.finish();
                apply_events(events, &mut transcript, on_update)?;
                break;
            }
        };
        apply_events(events, &mut transcript, on_update)?;
    }

    debug!(
        "Stream finished with {} characters",
        transcript.text().chars().count()
    );
    Ok(transcript.into_text())
}

fn apply_events(
    events: Vec<StreamEvent>,
    transcript: &mut TranscriptAccumulator,
    on_update: &mut TranscriptCallback<'_>,
) -> Result<()> {
    for event in events {
        match event {
            StreamEvent::Fragment(fragment) => {
                let text = transcript.apply(&fragment);
                on_update(text)?;
            }
            StreamEvent::Error(message) => return Err(StreamError::Backend(message).into()),
            StreamEvent::Done => break,
        }
    }
    Ok(())
}
