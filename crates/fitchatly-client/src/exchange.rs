use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Where the send flow currently is. `WaitingForAssistant` is reachable
/// only from a `Sending` that succeeded on a private channel, and every
/// path out of it lands back on `Idle`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExchangeState {
    #[default]
    Idle,
    /// Step A (the user's message) is in flight.
    Sending,
    /// Step B (the assistant's reply) is in flight.
    WaitingForAssistant,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid exchange transition: {from:?} -> {to}")]
pub struct InvalidTransition {
    pub from: ExchangeState,
    pub to: &'static str,
}

impl ExchangeState {
    pub fn begin_send(self) -> Result<ExchangeState, InvalidTransition> {
        match self {
            ExchangeState::Idle => Ok(ExchangeState::Sending),
            from => Err(InvalidTransition { from, to: "Sending" }),
        }
    }

    /// Step A succeeded. Private channels move on to the assistant leg,
    /// public channels are done.
    pub fn sent(self, private: bool) -> Result<ExchangeState, InvalidTransition> {
        match self {
            ExchangeState::Sending if private => Ok(ExchangeState::WaitingForAssistant),
            ExchangeState::Sending => Ok(ExchangeState::Idle),
            from => Err(InvalidTransition { from, to: "WaitingForAssistant" }),
        }
    }

    /// Step A failed; the exchange is over.
    pub fn send_failed(self) -> Result<ExchangeState, InvalidTransition> {
        match self {
            ExchangeState::Sending => Ok(ExchangeState::Idle),
            from => Err(InvalidTransition { from, to: "Idle" }),
        }
    }

    /// Step B settled, successfully or not.
    pub fn assistant_settled(self) -> Result<ExchangeState, InvalidTransition> {
        match self {
            ExchangeState::WaitingForAssistant => Ok(ExchangeState::Idle),
            from => Err(InvalidTransition { from, to: "Idle" }),
        }
    }

    pub fn is_sending(self) -> bool {
        self == ExchangeState::Sending
    }

    pub fn is_waiting_for_assistant(self) -> bool {
        self == ExchangeState::WaitingForAssistant
    }

    /// True while either leg of an exchange is in flight.
    pub fn is_busy(self) -> bool {
        self != ExchangeState::Idle
    }
}
