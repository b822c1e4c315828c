use crate::sink::MatrixSink;
use std::fmt;

/// Why there is no matrix to write to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Absence {
    /// The host platform has no Sense HAT bus.
    Unsupported,
    /// The platform should have one, but opening or writing to it failed.
    InitFailed(String),
}

impl fmt::Display for Absence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Absence::Unsupported => f.write_str("platform unsupported"),
            Absence::InitFailed(reason) => write!(f, "initialization failed: {reason}"),
        }
    }
}

/// The hardware capability handed to the controller at construction.
///
/// Decided once at startup; the controller never probes the platform itself.
#[derive(Debug)]
pub enum Hardware {
    Present(MatrixSink),
    Absent(Absence),
}

/// Copyable view of [`Hardware`] for status queries.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HardwareStatus {
    Present,
    Absent(Absence),
}

impl Hardware {
    #[inline]
    pub fn is_present(&self) -> bool {
        matches!(self, Hardware::Present(_))
    }

    pub fn status(&self) -> HardwareStatus {
        match self {
            Hardware::Present(_) => HardwareStatus::Present,
            Hardware::Absent(why) => HardwareStatus::Absent(why.clone()),
        }
    }

    /// The sink, if present.
    #[inline]
    pub fn sink_mut(&mut self) -> Option<&mut MatrixSink> {
        match self {
            Hardware::Present(sink) => Some(sink),
            Hardware::Absent(_) => None,
        }
    }
}

impl fmt::Display for HardwareStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HardwareStatus::Present => f.write_str("present"),
            HardwareStatus::Absent(why) => write!(f, "absent ({why})"),
        }
    }
}
