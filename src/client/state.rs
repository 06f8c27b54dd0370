//! Connection state for the NNTP transport

/// Lifecycle of the single connection owned by the transport
///
/// `Idle -> AwaitingResponse` when a command is written, back to `Idle` when its
/// response is framed. Any transport failure or deadline expiry drops back to
/// `Disconnected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No usable stream
    Disconnected,
    /// Stream open, greeting not yet framed
    Connecting,
    /// Ready for the next command
    Idle,
    /// A command is in flight
    AwaitingResponse,
}
