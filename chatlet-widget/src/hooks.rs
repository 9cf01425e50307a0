use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::custom_fields::CustomFields;
use crate::host::HostEvent;
use crate::store::Store;

/// API exposée à la page hôte : traduit les événements entrants en
/// mutations du store et des champs personnalisés.
///
/// Pas de reset : les hooks n'ont aucun état propre au montage, seul le
/// flag initialized borne la fenêtre pendant laquelle les événements
/// sont pris en compte.
#[derive(Clone)]
pub struct Hooks {
    store: Store,
    custom_fields: CustomFields,
    initialized: Arc<AtomicBool>,
}

impl Hooks {
    pub fn new(store: Store, custom_fields: CustomFields) -> Self {
        Self {
            store,
            custom_fields,
            initialized: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn init(&self) {
        self.initialized.store(true, Ordering::SeqCst);
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    /// Applique un événement hôte. Ignoré (et loggé) avant init.
    pub fn handle(&self, event: HostEvent) {
        if !self.is_initialized() {
            eprintln!("[hooks] dropped event before init: {:?}", event);
            return;
        }
        match event {
            HostEvent::MinimizeWidget => {
                self.store.dispatch(|s| s.minimized = true);
            }
            HostEvent::MaximizeWidget => {
                self.store.dispatch(|s| s.minimized = false);
            }
            HostEvent::SetCustomField { key, value } => {
                self.custom_fields.set_field(&key, &value);
            }
            HostEvent::SetGuestToken { token } => {
                self.store.dispatch(move |s| s.user.token = Some(token));
            }
            // VisibilityChanged et Navigate sont routés en amont,
            // vers le watcher et le router respectivement
            HostEvent::VisibilityChanged | HostEvent::Navigate { .. } => {}
        }
    }
}
