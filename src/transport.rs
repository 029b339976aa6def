use chat_api::{CancellationSignal, ChatApiClient, ChatApiError, ChatSubmission, TextChunkStream};
use futures_util::future::BoxFuture;

/// Opens the text chunk source for one turn.
///
/// Implementations should observe `cancel` while connecting. Once the stream
/// is returned, the runtime polls it under the same signal.
pub trait ChatTransport: Send + Sync + 'static {
    fn open(
        &self,
        submission: ChatSubmission,
        cancel: CancellationSignal,
    ) -> BoxFuture<'_, Result<TextChunkStream, ChatApiError>>;
}

impl ChatTransport for ChatApiClient {
    fn open(
        &self,
        submission: ChatSubmission,
        cancel: CancellationSignal,
    ) -> BoxFuture<'_, Result<TextChunkStream, ChatApiError>> {
        Box::pin(async move { self.open_stream(&submission, Some(&cancel)).await })
    }
}
