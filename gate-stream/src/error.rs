// Unless explicitly stated otherwise all files in this repository are licensed under the
// MIT/Apache-2.0 License, at your convenience
//
// This product includes software developed at Datadog (https://www.datadoghq.com/). Copyright 2020 Datadog, Inc.
//
use std::fmt;
use thiserror::Error;

/// Result type alias that all gate-stream public API functions can use.
pub type Result<T> = std::result::Result<T, GateError>;

/// Resource Type used for errors that `Closed` and `WouldBlock` and includes
/// extra diagnostic data for richer error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceType {
    /// A [`LocalSubject`](crate::LocalSubject) that already completed or
    /// failed.
    Subject,
    /// The multi-producer channel feeding a
    /// [`GateReceiver`](crate::shared::GateReceiver).
    Channel,
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceType::Subject => f.write_str("Subject"),
            ResourceType::Channel => f.write_str("Channel"),
        }
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
/// Composite error type for the event sources built around the gate.
///
/// The gate itself never fails: errors coming from an upstream stream are
/// forwarded untouched and never wrapped into this type.
pub enum GateError {
    /// The resource no longer accepts events.
    #[error("{0} is closed")]
    Closed(ResourceType),

    /// Accepting the event right now would require waiting for capacity.
    #[error("Resource would block. {0} is full")]
    WouldBlock(ResourceType),
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn error_messages() {
        assert_eq!(
            GateError::Closed(ResourceType::Subject).to_string(),
            "Subject is closed"
        );
        assert_eq!(
            GateError::WouldBlock(ResourceType::Channel).to_string(),
            "Resource would block. Channel is full"
        );
    }

    fn publish_into_closed() -> Result<()> {
        Err(GateError::Closed(ResourceType::Channel))?;
        Ok(())
    }

    #[test]
    fn propagates_with_question_mark() {
        assert_eq!(
            publish_into_closed(),
            Err(GateError::Closed(ResourceType::Channel))
        );
    }
}
