#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    #[error("Illegal fin value or reserved bits set")]
    IllegalFin,

    #[error("Illegal opcode value")]
    IllegalOpCode,

    #[error("Frame payload of {0} bytes exceeds the limit of {1} bytes")]
    TooLarge(u64, usize),

    #[error("Continuation frame without a fragmented message in progress")]
    UnexpectedContinuation,

    #[error("Not enough data to parse")]
    NotEnoughData,
}
