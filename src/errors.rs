use std::fmt::Display;

/// Ways the single-result register can be misused.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum StaleAccess
{
    /// A drain was requested but nothing has been built.
    NoPendingResult,
    /// A build was requested while an earlier result is still waiting to be drained.
    ResultPending,
    /// The caller's `nxgrid` does not match the pending result.
    LengthMismatch { expected: usize, found: usize },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum XGError
{
    AllocationFailure { requested_bytes: usize },
    InvalidGridShape { what: &'static str, expected: usize, found: usize },
    InvalidRowWindow { jstart: usize, jend: usize, ny: usize },
    /// A cell edge steps a full turn of longitude or more, so the cell has no outline.
    InvalidCellSpan { cell: usize },
    StaleResultAccess(StaleAccess),
    StaleScratch,
    ReleasedCells,
    BoundExceeded { nxgrid: usize, upbound: usize },
    SerializationFailed,
    DeserializationFailed,
    LZ4DecompressionFailed,
    FileIOError,
    ReadBufferFailed,
    WriteBufferFailed,
}
impl std::error::Error for XGError {}

impl XGError
{
    /// Errors that abort a whole coupling run. Everything else stays local to one tile pair.
    pub fn is_fatal(&self) -> bool
    {
        matches!(self, XGError::AllocationFailure { .. } | XGError::InvalidGridShape { .. })
    }

    pub(crate) fn shape(what: &'static str, expected: usize, found: usize) -> Self
    {
        XGError::InvalidGridShape { what, expected, found }
    }
}

impl From<std::collections::TryReserveError> for XGError
{
    fn from(_: std::collections::TryReserveError) -> Self {
        // the std error does not expose the requested size
        XGError::AllocationFailure { requested_bytes: usize::MAX }
    }
}

impl Display for XGError
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self
        {
            XGError::AllocationFailure { requested_bytes } if *requested_bytes == usize::MAX =>
                write!(f, "allocation failure"),
            XGError::AllocationFailure { requested_bytes } =>
                write!(f, "allocation failure: {requested_bytes} bytes requested"),
            XGError::InvalidGridShape { what, expected, found } =>
                write!(f, "invalid grid shape: {what} has length {found}, expected {expected}"),
            XGError::InvalidRowWindow { jstart, jend, ny } =>
                write!(f, "row window [{jstart}, {jend}] is outside a grid with {ny} rows"),
            XGError::InvalidCellSpan { cell } =>
                write!(f, "cell {cell} spans a full turn of longitude between adjacent corners"),
            XGError::StaleResultAccess(StaleAccess::LengthMismatch { expected, found }) =>
                write!(f, "stale result access: pending result has {expected} cells, caller asked for {found}"),
            XGError::StaleResultAccess(kind) => write!(f, "stale result access: {kind:?}"),
            XGError::BoundExceeded { nxgrid, upbound } =>
                write!(f, "exchange grid has {nxgrid} cells but the upper bound was {upbound}"),
            _ => write!(f, "{:?}", *self),
        }
    }
}
