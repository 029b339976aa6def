//! Incremental response consumer for the NetCourier chat assistant.
//!
//! [`turn::TurnController`] owns the transcript and the lifecycle of the one
//! outstanding turn. Text chunks from a [`transport::ChatTransport`] pass
//! through the line buffer and event decoder from `chat_api`, and the decoded
//! events are folded into a [`transcript::Transcript`] by the merge rules in
//! [`transcript`]. [`runtime::ChatRuntime`] is the async driver that connects
//! the two.

pub mod config;
pub mod logging;
pub mod runtime;
pub mod session;
pub mod transcript;
pub mod transport;
pub mod turn;

pub use config::{ConfigError, WidgetConfig};
pub use runtime::{ChatRuntime, TurnOutcome};
pub use session::SessionIdentity;
pub use transcript::{apply, Message, MergeOutcome, Transcript};
pub use transport::ChatTransport;
pub use turn::{
    CancelHandle, ChunkReport, TurnController, TurnId, TurnPhase, TurnSnapshot, TurnState,
    TurnTicket,
};
