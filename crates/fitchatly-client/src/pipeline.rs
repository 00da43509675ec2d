use fitchatly_types::api::MessageResponse;
use fitchatly_types::channel::is_private_channel;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::api::ApiClient;
use crate::error::ClientError;
use crate::exchange::{ExchangeState, InvalidTransition};

/// Events a UI subscribes to while the pipeline works.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum PipelineEvent {
    /// The exchange moved to a new state.
    StateChanged { state: ExchangeState },

    /// A channel's message list was refetched after a persistence step.
    MessagesRefreshed {
        channel_id: String,
        messages: Vec<MessageResponse>,
    },

    /// Something went wrong; carries the error's message text.
    Notice { message: String },
}

impl PipelineEvent {
    /// Returns the channel_id if this event is scoped to a specific channel.
    pub fn channel_id(&self) -> Option<&str> {
        match self {
            Self::MessagesRefreshed { channel_id, .. } => Some(channel_id),
            _ => None,
        }
    }
}

/// Drives the two-step message exchange and reports progress as events.
///
/// `send` runs Step A (persist the user's message), refetches the channel
/// so the sender's own message shows up right away, and on private
/// channels follows with Step B (the assistant's reply) plus a second
/// refetch. The state always returns to `Idle`, whatever Step B did.
pub struct DeliveryPipeline {
    api: ApiClient,
    state: ExchangeState,
    events: mpsc::UnboundedSender<PipelineEvent>,
}

impl DeliveryPipeline {
    /// The receiver side carries every event the pipeline emits; dropping
    /// it is fine, events are then discarded.
    pub fn new(api: ApiClient) -> (Self, mpsc::UnboundedReceiver<PipelineEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let pipeline = Self {
            api,
            state: ExchangeState::Idle,
            events: tx,
        };
        (pipeline, rx)
    }

    pub fn state(&self) -> ExchangeState {
        self.state
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// Mutable access for auth flows (`register`/`login` store the token).
    pub fn api_mut(&mut self) -> &mut ApiClient {
        &mut self.api
    }

    /// Run a full exchange. Returns the persisted user message; the
    /// assistant's reply, when there is one, arrives via the second
    /// `MessagesRefreshed` event. A Step B failure is reported as a
    /// `Notice` but does not fail the call, the user's message is already
    /// in. A send while another exchange is in flight is rejected.
    pub async fn send(
        &mut self,
        channel_id: &str,
        content: &str,
    ) -> Result<MessageResponse, ClientError> {
        let sending = self.state.begin_send().map_err(|_| ClientError::Busy)?;
        self.set_state(sending);

        let message = match self.api.send_message(channel_id, content).await {
            Ok(message) => message,
            Err(err) => {
                self.advance(self.state.send_failed());
                self.notice(err.to_string());
                return Err(err);
            }
        };
        debug!(channel_id, message_id = %message.id, "Message persisted");

        let private = is_private_channel(channel_id);
        self.advance(self.state.sent(private));
        self.refresh(channel_id).await;

        if private {
            if let Err(err) = self.api.assistant_reply(channel_id, &message.content).await {
                self.notice(format!("Assistant reply failed: {err}"));
            }
            self.advance(self.state.assistant_settled());
            self.refresh(channel_id).await;
        }

        Ok(message)
    }

    /// Refetch a channel's messages and publish them. Failures become a
    /// `Notice` rather than an error, a stale list is not fatal.
    pub async fn refresh(&mut self, channel_id: &str) {
        match self.api.messages(channel_id).await {
            Ok(messages) => self.emit(PipelineEvent::MessagesRefreshed {
                channel_id: channel_id.to_string(),
                messages,
            }),
            Err(err) => self.notice(format!("Failed to refresh messages: {err}")),
        }
    }

    fn advance(&mut self, next: Result<ExchangeState, InvalidTransition>) {
        match next {
            Ok(state) => self.set_state(state),
            // Unreachable while `send` holds exclusive access; recover to a
            // known state rather than wedging the pipeline.
            Err(err) => {
                warn!("{err}; resetting to idle");
                self.set_state(ExchangeState::Idle);
            }
        }
    }

    fn set_state(&mut self, next: ExchangeState) {
        if self.state != next {
            self.state = next;
            self.emit(PipelineEvent::StateChanged { state: next });
        }
    }

    fn notice(&self, message: impl Into<String>) {
        self.emit(PipelineEvent::Notice { message: message.into() });
    }

    fn emit(&self, event: PipelineEvent) {
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_serialize_with_a_type_tag() {
        let event = PipelineEvent::StateChanged {
            state: ExchangeState::WaitingForAssistant,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "StateChanged");
        assert_eq!(json["data"]["state"], "WaitingForAssistant");
    }

    #[test]
    fn refresh_events_are_channel_scoped() {
        let event = PipelineEvent::MessagesRefreshed {
            channel_id: "private-u1-strength".into(),
            messages: vec![],
        };
        assert_eq!(event.channel_id(), Some("private-u1-strength"));
        let notice = PipelineEvent::Notice { message: "nope".into() };
        assert_eq!(notice.channel_id(), None);
    }
}
