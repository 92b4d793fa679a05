#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Writing the command frame to the transport failed.
    WriteFailure,
    /// Reading from the transport failed.
    ReadFailure,
    /// No valid response frame arrived within the transaction deadline.
    /// Carries the number of bytes captured before the deadline; the bytes
    /// themselves are logged for diagnostics.
    Timeout { captured: usize },
    /// A frame decoded cleanly but its payload did not have the shape the
    /// requested command calls for.
    UnexpectedReply,
}
