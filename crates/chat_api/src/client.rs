use std::future::Future;
use std::sync::{atomic::AtomicBool, atomic::Ordering, Arc};
use std::time::Duration;

use futures_util::stream::{self, BoxStream};
use futures_util::StreamExt;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Response};

use crate::config::ChatApiConfig;
use crate::decode::decode_record;
use crate::error::{parse_error_message, ChatApiError, DecodeError};
use crate::events::StreamEvent;
use crate::headers::build_headers;
use crate::line_buffer::{LineBuffer, Utf8ChunkDecoder};
use crate::payload::ChatSubmission;
use crate::url::resolve_stream_url;

/// Cooperative cancellation flag shared between a turn and its transport.
pub type CancellationSignal = Arc<AtomicBool>;

/// Response body as UTF-8 text chunks, in arrival order.
pub type TextChunkStream = BoxStream<'static, Result<String, ChatApiError>>;

const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(25);

#[derive(Debug)]
pub struct ChatApiClient {
    http: Client,
    config: ChatApiConfig,
}

/// Every record of one stream, decoded.
#[derive(Debug, Clone, Default)]
pub struct StreamResult {
    pub events: Vec<StreamEvent>,
    pub decode_failures: Vec<DecodeError>,
}

impl ChatApiClient {
    pub fn new(config: ChatApiConfig) -> Result<Self, ChatApiError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build()?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &ChatApiConfig {
        &self.config
    }

    pub fn stream_url(&self, tenant_id: &str, user_id: &str) -> Result<String, ChatApiError> {
        resolve_stream_url(&self.config.base_url, tenant_id, user_id)
            .map(String::from)
            .map_err(|error| ChatApiError::InvalidBaseUrl(format!("{}: {error}", self.config.base_url)))
    }

    pub fn build_headers(&self) -> Result<HeaderMap, ChatApiError> {
        let headers = build_headers(&self.config, None);
        let mut out = HeaderMap::new();
        for (key, value) in headers {
            out.insert(
                HeaderName::from_bytes(key.as_bytes())
                    .map_err(|_| ChatApiError::InvalidHeader(format!("invalid header key: {key}")))?,
                HeaderValue::from_str(&value).map_err(|_| {
                    ChatApiError::InvalidHeader(format!("invalid header value for {key}"))
                })?,
            );
        }
        Ok(out)
    }

    pub fn build_request(
        &self,
        submission: &ChatSubmission,
    ) -> Result<reqwest::RequestBuilder, ChatApiError> {
        let context = &submission.context;
        if context.tenant_id.trim().is_empty() {
            return Err(ChatApiError::MissingIdentity("tenantId"));
        }
        if context.user_id.trim().is_empty() {
            return Err(ChatApiError::MissingIdentity("userId"));
        }

        let url = self.stream_url(&context.tenant_id, &context.user_id)?;
        tracing::debug!(%url, session_id = %submission.session_id, "opening chat stream");
        Ok(self
            .http
            .post(url)
            .headers(self.build_headers()?)
            .json(submission))
    }

    /// Send the submission and return the response body as text chunks.
    ///
    /// Non-success statuses fail with [`ChatApiError::Status`]. The returned
    /// stream does not observe `cancellation` itself; wrap each pull in
    /// [`await_or_cancel`].
    pub async fn open_stream(
        &self,
        submission: &ChatSubmission,
        cancellation: Option<&CancellationSignal>,
    ) -> Result<TextChunkStream, ChatApiError> {
        if is_cancelled(cancellation) {
            return Err(ChatApiError::Cancelled);
        }

        let request = self.build_request(submission)?.send();
        let response = await_or_cancel(request, cancellation).await??;

        let status = response.status();
        if !status.is_success() {
            let body = await_or_cancel(response.text(), cancellation)
                .await?
                .unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "chat stream request rejected");
            return Err(ChatApiError::Status(status, parse_error_message(status, &body)));
        }

        Ok(text_chunks(response))
    }

    /// Drain a whole stream, decoding every record and handing it to `on_record`.
    pub async fn stream_with_handler<F>(
        &self,
        submission: &ChatSubmission,
        cancellation: Option<&CancellationSignal>,
        mut on_record: F,
    ) -> Result<(), ChatApiError>
    where
        F: FnMut(Result<StreamEvent, DecodeError>),
    {
        let mut chunks = self.open_stream(submission, cancellation).await?;
        let mut buffer = LineBuffer::default();

        while let Some(chunk) = await_or_cancel(chunks.next(), cancellation).await? {
            let chunk = chunk?;
            for record in buffer.feed(&chunk) {
                on_record(decode_record(&record));
            }
        }

        if let Some(record) = buffer.finish() {
            on_record(decode_record(&record));
        }

        Ok(())
    }

    pub async fn stream(
        &self,
        submission: &ChatSubmission,
        cancellation: Option<&CancellationSignal>,
    ) -> Result<StreamResult, ChatApiError> {
        let mut result = StreamResult::default();
        self.stream_with_handler(submission, cancellation, |record| match record {
            Ok(event) => result.events.push(event),
            Err(error) => result.decode_failures.push(error),
        })
        .await?;

        Ok(result)
    }
}

fn text_chunks(response: Response) -> TextChunkStream {
    let bytes = response.bytes_stream().boxed();
    stream::unfold(
        Some((bytes, Utf8ChunkDecoder::default())),
        |state| async move {
            let (mut bytes, mut decoder) = state?;
            loop {
                match bytes.next().await {
                    Some(Ok(chunk)) => {
                        let text = decoder.decode(&chunk);
                        if text.is_empty() {
                            continue;
                        }
                        return Some((Ok(text), Some((bytes, decoder))));
                    }
                    Some(Err(error)) => {
                        return Some((Err(ChatApiError::StreamClosed(error.to_string())), None))
                    }
                    None => return decoder.finish().map(|tail| (Ok(tail), None)),
                }
            }
        },
    )
    .boxed()
}

pub fn is_cancelled(cancel: Option<&CancellationSignal>) -> bool {
    cancel.is_some_and(|token| token.load(Ordering::Acquire))
}

/// Await `future`, failing with [`ChatApiError::Cancelled`] once the signal is set.
pub async fn await_or_cancel<F>(
    future: F,
    cancellation: Option<&CancellationSignal>,
) -> Result<F::Output, ChatApiError>
where
    F: Future,
{
    if cancellation.is_none() {
        return Ok(future.await);
    }

    let mut future = Box::pin(future);

    loop {
        if is_cancelled(cancellation) {
            return Err(ChatApiError::Cancelled);
        }

        if let Ok(output) = tokio::time::timeout(CANCEL_POLL_INTERVAL, &mut future).await {
            if is_cancelled(cancellation) {
                return Err(ChatApiError::Cancelled);
            }
            return Ok(output);
        }
    }
}
