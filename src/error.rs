//! Unified error types for the SensorBeacon firmware.
//!
//! A single `Error` enum that every subsystem converts into, keeping the
//! control loop's escalation path uniform.  All variants are `Copy` so
//! they pass through the tick and event paths without allocation.
//!
//! Only *fatal* conditions ever escape the core as `Err`.  Transient and
//! peer-caused failures are absorbed where they happen (see the
//! individual components) and surface only in the log and the metrics.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The advertising service rejected a configure/start/stop request.
    Advertising(AdvError),
    /// An analog conversion failed or produced an implausible value.
    Sensor(SensorError),
    /// A GATT notification could not be handed to the stack.
    Notify(NotifyError),
    /// A GATT attribute value could not be updated.
    SetValue(SetValueError),
    /// The link layer rejected a security or disconnect request.
    Link(LinkError),
    /// The peer manager failed to delete or persist bonding material.
    Bond(BondError),
    /// Peripheral or stack initialisation failed.
    Init(&'static str),
    /// Configuration is invalid.
    Config(&'static str),
    /// Unrecoverable condition; the only correct reaction is a reset.
    Fatal(FatalCause),
}

impl Error {
    /// Whether this error must end in the halt-and-report path.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal(_) | Self::Init(_))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Advertising(e) => write!(f, "advertising: {e}"),
            Self::Sensor(e) => write!(f, "sensor: {e}"),
            Self::Notify(e) => write!(f, "notify: {e}"),
            Self::SetValue(e) => write!(f, "set value: {e}"),
            Self::Link(e) => write!(f, "link: {e}"),
            Self::Bond(e) => write!(f, "bond: {e}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Fatal(cause) => write!(f, "fatal: {cause}"),
        }
    }
}

impl core::error::Error for Error {}

// ---------------------------------------------------------------------------
// Advertising errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvError {
    /// The stack is busy with a previous request; try again later.
    Busy,
    /// No advertising set or memory is available.
    ResourceExhausted,
    /// Request not valid in the current stack state (e.g. while connected).
    InvalidState,
    /// Raw stack error code.
    Stack(i32),
}

impl fmt::Display for AdvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Busy => write!(f, "stack busy"),
            Self::ResourceExhausted => write!(f, "resources exhausted"),
            Self::InvalidState => write!(f, "invalid state"),
            Self::Stack(rc) => write!(f, "stack error (rc={rc})"),
        }
    }
}

impl From<AdvError> for Error {
    fn from(e: AdvError) -> Self {
        Self::Advertising(e)
    }
}

// ---------------------------------------------------------------------------
// Sensor errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// The converter is still busy with a previous conversion.
    NotReady,
    /// ADC read returned an error.
    AdcReadFailed,
    /// Reading is outside the physically plausible range.
    OutOfRange,
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotReady => write!(f, "converter not ready"),
            Self::AdcReadFailed => write!(f, "ADC read failed"),
            Self::OutOfRange => write!(f, "reading out of range"),
        }
    }
}

impl From<SensorError> for Error {
    fn from(e: SensorError) -> Self {
        Self::Sensor(e)
    }
}

// ---------------------------------------------------------------------------
// GATT errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyError {
    /// The peer handle does not refer to a live connection.
    PeerInvalid,
    /// Payload exceeds the characteristic's declared length.
    PayloadTooLarge,
    /// Raw stack error code.
    Stack(i32),
}

impl fmt::Display for NotifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PeerInvalid => write!(f, "peer invalid"),
            Self::PayloadTooLarge => write!(f, "payload too large"),
            Self::Stack(rc) => write!(f, "stack error (rc={rc})"),
        }
    }
}

impl From<NotifyError> for Error {
    fn from(e: NotifyError) -> Self {
        Self::Notify(e)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetValueError {
    /// Characteristic is not registered with the stack (yet).
    NotFound,
    /// Value exceeds the characteristic's declared length.
    TooLarge,
}

impl fmt::Display for SetValueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "characteristic not found"),
            Self::TooLarge => write!(f, "value too large"),
        }
    }
}

impl From<SetValueError> for Error {
    fn from(e: SetValueError) -> Self {
        Self::SetValue(e)
    }
}

// ---------------------------------------------------------------------------
// Link and bonding errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkError {
    /// The handle no longer refers to a live connection.
    NotConnected,
    /// Raw stack error code.
    Stack(i32),
}

impl fmt::Display for LinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotConnected => write!(f, "not connected"),
            Self::Stack(rc) => write!(f, "stack error (rc={rc})"),
        }
    }
}

impl From<LinkError> for Error {
    fn from(e: LinkError) -> Self {
        Self::Link(e)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BondError {
    /// Bond storage has no free space left, even after compaction.
    NoSpace,
    /// Raw peer-manager error code.
    Stack(i32),
}

impl fmt::Display for BondError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoSpace => write!(f, "bond storage full"),
            Self::Stack(rc) => write!(f, "peer manager error (rc={rc})"),
        }
    }
}

impl From<BondError> for Error {
    fn from(e: BondError) -> Self {
        Self::Bond(e)
    }
}

// ---------------------------------------------------------------------------
// Fatal causes
// ---------------------------------------------------------------------------

/// Why the firmware decided to halt.  Reported once, then the SoC resets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FatalCause {
    /// Advertising could not be started even after the allowed retries.
    AdvertisingUnavailable(AdvError),
    /// Bond storage could not be recovered by garbage collection.
    BondStorage(BondError),
    /// Bond deletion failed; pairing can never succeed again.
    BondDeletion(BondError),
    /// The radio stack reported an internal error.
    StackFault(i32),
}

impl fmt::Display for FatalCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AdvertisingUnavailable(e) => write!(f, "advertising unavailable ({e})"),
            Self::BondStorage(e) => write!(f, "bond storage unrecoverable ({e})"),
            Self::BondDeletion(e) => write!(f, "bond deletion failed ({e})"),
            Self::StackFault(code) => write!(f, "radio stack fault (code={code})"),
        }
    }
}

impl From<FatalCause> for Error {
    fn from(cause: FatalCause) -> Self {
        Self::Fatal(cause)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
