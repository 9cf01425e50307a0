use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Identifiant opaque rendu par add_listener, requis pour la désinscription
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenerId(Uuid);

type Listener = Arc<dyn Fn() + Send + Sync>;

/// Relais headless de l'événement visibilitychange de la page hôte.
/// La page hôte pousse l'événement via le canal MQTT ; notify() prévient
/// tous les listeners enregistrés, dont le handler de bascule du
/// contrôleur racine.
#[derive(Clone, Default)]
pub struct VisibilityWatcher {
    listeners: Arc<Mutex<HashMap<Uuid, Listener>>>,
}

impl VisibilityWatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_listener(&self, listener: impl Fn() + Send + Sync + 'static) -> ListenerId {
        let id = Uuid::new_v4();
        self.listeners.lock().insert(id, Arc::new(listener));
        ListenerId(id)
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.listeners.lock().remove(&id.0).is_some()
    }

    /// Signale un changement de visibilité de la page hôte.
    /// Les listeners sont clonés hors du verrou avant appel : un listener
    /// peut lui-même s'inscrire ou se désinscrire sans interbloquer.
    pub fn notify(&self) {
        let listeners: Vec<Listener> = self.listeners.lock().values().cloned().collect();
        for listener in listeners {
            listener();
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_add_notify_remove() {
        let watcher = VisibilityWatcher::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let h = hits.clone();
        let id = watcher.add_listener(move || {
            h.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(watcher.listener_count(), 1);

        watcher.notify();
        watcher.notify();
        assert_eq!(hits.load(Ordering::SeqCst), 2);

        assert!(watcher.remove_listener(id));
        watcher.notify();
        assert_eq!(hits.load(Ordering::SeqCst), 2);
        assert!(!watcher.remove_listener(id));
    }
}
