use parking_lot::Mutex;
use std::sync::Arc;

use crate::config::WidgetConfig;
use crate::i18n::TextDirection;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GdprState {
    pub accepted: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserState {
    /// Token visiteur : présent une fois le visiteur enregistré
    pub token: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Alert {
    pub id: String,
}

/// État complet du widget. Toute mutation passe par Store::dispatch,
/// sur le modèle du store du widget d'origine.
#[derive(Debug, Clone, PartialEq)]
pub struct WidgetState {
    pub config: WidgetConfig,
    pub gdpr: GdprState,
    pub user: UserState,
    /// Un trigger a déjà ouvert le widget pour ce visiteur
    pub triggered: bool,
    pub minimized: bool,
    pub undocked: bool,
    pub expanded: bool,
    /// Le widget est visible dans la page hôte
    pub visible: bool,
    pub alerts: Vec<Alert>,
    /// Analogue headless de document.dir
    pub document_dir: TextDirection,
}

impl Default for WidgetState {
    fn default() -> Self {
        Self {
            config: WidgetConfig::default(),
            gdpr: GdprState::default(),
            user: UserState::default(),
            triggered: false,
            minimized: true,
            undocked: false,
            expanded: false,
            visible: true,
            alerts: vec![],
            document_dir: TextDirection::Ltr,
        }
    }
}

/// Store partagé : clone léger, mutations sérialisées par le mutex.
#[derive(Clone)]
pub struct Store {
    inner: Arc<Mutex<WidgetState>>,
}

impl Store {
    pub fn new(initial: WidgetState) -> Self {
        Self { inner: Arc::new(Mutex::new(initial)) }
    }

    /// Applique une mutation atomique à l'état
    pub fn dispatch(&self, mutate: impl FnOnce(&mut WidgetState)) {
        let mut state = self.inner.lock();
        mutate(&mut state);
    }

    /// Copie de l'état courant, hors verrou pour les lecteurs
    pub fn snapshot(&self) -> WidgetState {
        self.inner.lock().clone()
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new(WidgetState::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state() {
        let state = WidgetState::default();
        assert!(state.minimized);
        assert!(state.visible);
        assert!(!state.undocked);
        assert!(state.user.token.is_none());
    }

    #[test]
    fn test_dispatch_replaces_config_whole() {
        let store = Store::default();
        let mut config = WidgetConfig::default();
        config.online = true;

        let next = config.clone();
        store.dispatch(move |s| s.config = next);

        assert_eq!(store.snapshot().config, config);
    }
}
