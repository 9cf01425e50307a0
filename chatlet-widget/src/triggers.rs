/**
 * TRIGGER ENGINE - Messages proactifs du widget
 *
 * RÔLE :
 * Évalue les triggers configurés côté serveur (temps passé sur la page,
 * URL visitée) et met en file les messages proactifs à afficher au
 * visiteur. Le contrôleur racine consulte la file pour décider, entre
 * autres, de court-circuiter le formulaire d'inscription.
 *
 * FONCTIONNEMENT :
 * - Triggers enregistrés depuis WidgetConfig après chargement
 * - time-on-site : tâche tokio qui dort puis tire le trigger
 * - page-url : comparaison avec l'URL courante au moment de process_triggers
 * - run_once : un trigger déjà tiré ne retire jamais
 */

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "kebab-case")]
pub enum TriggerCondition {
    /// Tire après `value` secondes de présence sur la page
    TimeOnSite { value: u64 },
    /// Tire si l'URL courante contient `value`
    PageUrl { value: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "kebab-case")]
pub enum TriggerAction {
    SendMessage { sender: String, msg: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TriggerConf {
    pub id: String,
    pub enabled: bool,
    pub run_once: bool,
    pub conditions: Vec<TriggerCondition>,
    pub actions: Vec<TriggerAction>,
}

impl Default for TriggerConf {
    fn default() -> Self {
        Self {
            id: String::new(),
            enabled: true,
            run_once: false,
            conditions: vec![],
            actions: vec![],
        }
    }
}

/// Message proactif en attente d'affichage
#[derive(Debug, Clone, PartialEq)]
pub struct TriggerMessage {
    pub trigger_id: String,
    pub sender: String,
    pub msg: String,
}

#[derive(Default)]
struct EngineInner {
    registered: Vec<TriggerConf>,
    /// Ids des triggers run_once déjà tirés
    fired: HashSet<String>,
    /// Messages en attente d'affichage
    queued: Vec<TriggerMessage>,
    current_url: String,
}

/// Moteur de triggers, instance injectée dans le contrôleur racine.
#[derive(Clone, Default)]
pub struct TriggerEngine {
    inner: Arc<Mutex<EngineInner>>,
}

impl TriggerEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remplace les triggers connus (appelé après chaque chargement config)
    pub fn register(&self, triggers: Vec<TriggerConf>) {
        self.inner.lock().registered = triggers;
    }

    pub fn set_current_url(&self, url: &str) {
        self.inner.lock().current_url = url.to_string();
    }

    /// Évalue les triggers en attente. Les conditions page-url sont
    /// tranchées immédiatement ; time-on-site programme une tâche qui
    /// tirera le trigger à échéance.
    pub fn process_triggers(&self) {
        let pending: Vec<TriggerConf> = {
            let inner = self.inner.lock();
            inner
                .registered
                .iter()
                .filter(|t| t.enabled && !(t.run_once && inner.fired.contains(&t.id)))
                .cloned()
                .collect()
        };

        for trigger in pending {
            for condition in &trigger.conditions {
                match condition {
                    TriggerCondition::PageUrl { value } => {
                        let matched = self.inner.lock().current_url.contains(value.as_str());
                        if matched {
                            self.fire(&trigger);
                        }
                    }
                    TriggerCondition::TimeOnSite { value } => {
                        let engine = self.clone();
                        let trigger = trigger.clone();
                        let delay = Duration::from_secs(*value);
                        tokio::task::spawn(async move {
                            tokio::time::sleep(delay).await;
                            engine.fire(&trigger);
                        });
                    }
                }
            }
        }
    }

    /// Met en file les actions du trigger. Protégé contre le double tir
    /// des triggers run_once (une tâche time-on-site peut arriver après
    /// qu'une condition page-url a déjà tiré).
    fn fire(&self, trigger: &TriggerConf) {
        let mut inner = self.inner.lock();
        if trigger.run_once && inner.fired.contains(&trigger.id) {
            return;
        }
        inner.fired.insert(trigger.id.clone());
        for action in &trigger.actions {
            match action {
                TriggerAction::SendMessage { sender, msg } => {
                    inner.queued.push(TriggerMessage {
                        trigger_id: trigger.id.clone(),
                        sender: sender.clone(),
                        msg: msg.clone(),
                    });
                }
            }
        }
        eprintln!("[triggers] fired {}", trigger.id);
    }

    /// Des messages proactifs attendent d'être montrés au visiteur
    pub fn show_trigger_messages(&self) -> bool {
        !self.inner.lock().queued.is_empty()
    }

    /// Vide la file pour affichage par la route trigger-messages
    pub fn consume_messages(&self) -> Vec<TriggerMessage> {
        std::mem::take(&mut self.inner.lock().queued)
    }

    pub fn reset(&self) {
        let mut inner = self.inner.lock();
        inner.fired.clear();
        inner.queued.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page_url_trigger(id: &str, fragment: &str) -> TriggerConf {
        TriggerConf {
            id: id.to_string(),
            run_once: true,
            conditions: vec![TriggerCondition::PageUrl { value: fragment.to_string() }],
            actions: vec![TriggerAction::SendMessage {
                sender: "agent".to_string(),
                msg: "need help?".to_string(),
            }],
            ..TriggerConf::default()
        }
    }

    #[test]
    fn test_page_url_trigger_queues_message() {
        let engine = TriggerEngine::new();
        engine.register(vec![page_url_trigger("t1", "/pricing")]);
        engine.set_current_url("https://example.org/pricing/pro");

        assert!(!engine.show_trigger_messages());
        engine.process_triggers();
        assert!(engine.show_trigger_messages());

        let messages = engine.consume_messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].trigger_id, "t1");
        assert!(!engine.show_trigger_messages());
    }

    #[test]
    fn test_run_once_fires_once() {
        let engine = TriggerEngine::new();
        engine.register(vec![page_url_trigger("t1", "/")]);
        engine.set_current_url("https://example.org/");

        engine.process_triggers();
        engine.process_triggers();
        assert_eq!(engine.consume_messages().len(), 1);
    }

    #[test]
    fn test_disabled_trigger_is_ignored() {
        let engine = TriggerEngine::new();
        let mut trigger = page_url_trigger("t1", "/");
        trigger.enabled = false;
        engine.register(vec![trigger]);
        engine.set_current_url("https://example.org/");

        engine.process_triggers();
        assert!(!engine.show_trigger_messages());
    }

    #[tokio::test]
    async fn test_time_on_site_fires_after_delay() {
        let engine = TriggerEngine::new();
        engine.register(vec![TriggerConf {
            id: "t2".to_string(),
            run_once: true,
            conditions: vec![TriggerCondition::TimeOnSite { value: 0 }],
            actions: vec![TriggerAction::SendMessage {
                sender: "agent".to_string(),
                msg: "hello".to_string(),
            }],
            ..TriggerConf::default()
        }]);

        engine.process_triggers();
        assert!(!engine.show_trigger_messages());

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(engine.show_trigger_messages());
    }

    #[test]
    fn test_trigger_conf_from_yaml() {
        let yaml = r#"
id: welcome
run_once: true
conditions:
  - name: time-on-site
    value: 30
actions:
  - name: send-message
    sender: agent
    msg: "Welcome!"
"#;
        let conf: TriggerConf = serde_yaml::from_str(yaml).unwrap();
        assert!(conf.enabled);
        assert_eq!(conf.conditions, vec![TriggerCondition::TimeOnSite { value: 30 }]);
    }
}
