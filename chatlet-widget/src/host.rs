/**
 * CANAL HÔTE - Messagerie widget ↔ page hôte
 *
 * RÔLE :
 * Le widget vit embarqué dans une page hôte et ne lui parle qu'à travers
 * un canal de messages restreint. Côté sortant, HostChannel porte les
 * commandes (minimize, restore, show, hide, ready, callbacks) ; côté
 * entrant, HostEvent décrit ce que la page hôte pousse au widget.
 *
 * FONCTIONNEMENT :
 * - Commandes sérialisées en JSON taggé sur chatlet/widget/command@v1
 * - Événements hôte reçus sur chatlet/host/event@v1
 * - Envoi fire-and-forget : un échec est loggé, jamais propagé
 */

use rumqttc::{AsyncClient, QoS};
use serde::{Deserialize, Serialize};

pub const WIDGET_COMMAND_TOPIC: &str = "chatlet/widget/command@v1";
pub const HOST_EVENT_TOPIC: &str = "chatlet/host/event@v1";

/// Callbacks notifiés à la page hôte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallbackEvent {
    #[serde(rename = "no-agent-online")]
    NoAgentOnline,
}

/// Commandes émises par le widget vers la page hôte
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "camelCase")]
pub enum HostCommand {
    MinimizeWindow,
    RestoreWindow,
    ShowWidget,
    HideWidget,
    Ready,
    Callback { event: CallbackEvent },
}

/// Événements poussés par la page hôte vers le widget
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum HostEvent {
    /// document.visibilitychange côté page hôte
    VisibilityChanged,
    /// Navigation demandée par la page hôte
    Navigate { path: String },
    MinimizeWidget,
    MaximizeWidget,
    SetCustomField { key: String, value: String },
    SetGuestToken { token: String },
}

/// Frontière parentCall du widget d'origine : injectée dans le
/// contrôleur, doublée en test par un canal enregistreur.
pub trait HostChannel: Send + Sync + 'static {
    fn call(&self, command: HostCommand);
}

/// Canal de production : publication MQTT non bloquante.
/// try_publish pour rester synchrone ; la file du client absorbe
/// les rafales, un débordement est loggé et perdu.
pub struct MqttHostChannel {
    client: AsyncClient,
}

impl MqttHostChannel {
    pub fn new(client: AsyncClient) -> Self {
        Self { client }
    }
}

impl HostChannel for MqttHostChannel {
    fn call(&self, command: HostCommand) {
        let payload = match serde_json::to_string(&command) {
            Ok(payload) => payload,
            Err(e) => {
                eprintln!("[host] failed to encode command: {}", e);
                return;
            }
        };
        if let Err(e) = self
            .client
            .try_publish(WIDGET_COMMAND_TOPIC, QoS::AtLeastOnce, false, payload)
        {
            eprintln!("[host] failed to publish command: {:?}", e);
        }
    }
}

/// Canal de test : enregistre les commandes émises
#[cfg(test)]
#[derive(Default)]
pub struct RecordingChannel {
    calls: parking_lot::Mutex<Vec<HostCommand>>,
}

#[cfg(test)]
impl RecordingChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<HostCommand> {
        self.calls.lock().clone()
    }

    pub fn count(&self, command: &HostCommand) -> usize {
        self.calls.lock().iter().filter(|c| *c == command).count()
    }
}

#[cfg(test)]
impl HostChannel for RecordingChannel {
    fn call(&self, command: HostCommand) {
        self.calls.lock().push(command);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_wire_format() {
        let json = serde_json::to_value(&HostCommand::MinimizeWindow).unwrap();
        assert_eq!(json, serde_json::json!({ "command": "minimizeWindow" }));

        let json = serde_json::to_value(&HostCommand::Callback { event: CallbackEvent::NoAgentOnline }).unwrap();
        assert_eq!(json, serde_json::json!({ "command": "callback", "event": "no-agent-online" }));
    }

    #[test]
    fn test_host_event_wire_format() {
        let event: HostEvent =
            serde_json::from_str(r#"{ "event": "setGuestToken", "token": "abc" }"#).unwrap();
        assert_eq!(event, HostEvent::SetGuestToken { token: "abc".to_string() });

        let event: HostEvent = serde_json::from_str(r#"{ "event": "visibilityChanged" }"#).unwrap();
        assert_eq!(event, HostEvent::VisibilityChanged);
    }
}
