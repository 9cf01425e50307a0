/**
 * CONTRÔLEUR RACINE - Cycle de vie du widget livechat
 *
 * RÔLE :
 * Orchestration du montage du widget : direction du texte, chargement
 * config, triggers, visibilité, champs personnalisés, présence, hooks,
 * notifications à la page hôte, et règles de redirection au routage.
 *
 * FONCTIONNEMENT :
 * - mount() déroule les trois effets du widget d'origine, dans l'ordre
 * - le chargement config bascule un signal watch de readiness ;
 *   l'évaluation des redirections attend ce signal au lieu d'un délai
 *   arbitraire
 * - chaque navigation incrémente une génération ; une évaluation
 *   différée issue d'une navigation dépassée est abandonnée
 *
 * RÈGLES DE REDIRECTION (premier match gagne) :
 * 1. GDPR exigé et non accepté        -> /gdpr
 * 2. aucun agent en ligne             -> callback hôte + /leave-message
 * 3. racine + formulaire d'inscription -> /register
 * 4. sinon, la route demandée s'affiche
 */

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

use crate::config::ConfigLoader;
use crate::custom_fields::CustomFields;
use crate::hooks::Hooks;
use crate::host::{CallbackEvent, HostChannel, HostCommand};
use crate::i18n::Translations;
use crate::presence::UserPresence;
use crate::router::{Route, Router};
use crate::store::Store;
use crate::triggers::TriggerEngine;
use crate::visibility::{ListenerId, VisibilityWatcher};

pub struct WidgetRoot<L: ConfigLoader, C: HostChannel> {
    store: Store,
    loader: Arc<L>,
    channel: Arc<C>,
    translations: Arc<Translations>,
    triggers: TriggerEngine,
    custom_fields: CustomFields,
    presence: UserPresence,
    hooks: Hooks,
    visibility: VisibilityWatcher,
    router: Router,
    /// Passe à true une fois le chargement config résolu (succès ou non)
    ready_tx: Arc<watch::Sender<bool>>,
    ready_rx: watch::Receiver<bool>,
    /// Génération de navigation : seule l'évaluation la plus récente compte
    nav_generation: Arc<AtomicU64>,
    visibility_listener: Arc<Mutex<Option<ListenerId>>>,
}

impl<L: ConfigLoader, C: HostChannel> Clone for WidgetRoot<L, C> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            loader: self.loader.clone(),
            channel: self.channel.clone(),
            translations: self.translations.clone(),
            triggers: self.triggers.clone(),
            custom_fields: self.custom_fields.clone(),
            presence: self.presence.clone(),
            hooks: self.hooks.clone(),
            visibility: self.visibility.clone(),
            router: self.router.clone(),
            ready_tx: self.ready_tx.clone(),
            ready_rx: self.ready_rx.clone(),
            nav_generation: self.nav_generation.clone(),
            visibility_listener: self.visibility_listener.clone(),
        }
    }
}

impl<L: ConfigLoader, C: HostChannel> WidgetRoot<L, C> {
    pub fn new(store: Store, loader: L, channel: Arc<C>, translations: Translations) -> Self {
        let custom_fields = CustomFields::new();
        let hooks = Hooks::new(store.clone(), custom_fields.clone());
        let (ready_tx, ready_rx) = watch::channel(false);
        Self {
            store,
            loader: Arc::new(loader),
            channel,
            translations: Arc::new(translations),
            triggers: TriggerEngine::new(),
            custom_fields,
            presence: UserPresence::new(),
            hooks,
            visibility: VisibilityWatcher::new(),
            router: Router::new(),
            ready_tx: Arc::new(ready_tx),
            ready_rx,
            nav_generation: Arc::new(AtomicU64::new(0)),
            visibility_listener: Arc::new(Mutex::new(None)),
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn triggers(&self) -> &TriggerEngine {
        &self.triggers
    }

    pub fn visibility(&self) -> &VisibilityWatcher {
        &self.visibility
    }

    pub fn hooks(&self) -> &Hooks {
        &self.hooks
    }

    pub fn custom_fields(&self) -> &CustomFields {
        &self.custom_fields
    }

    pub fn presence(&self) -> &UserPresence {
        &self.presence
    }

    /// Monte le widget : les trois effets du composant d'origine, dans
    /// l'ordre, puis branchement du handler de route.
    pub fn mount(&self) {
        // Effet A : direction du document d'après le mot localisé "yes"
        let dir = self.translations.direction();
        self.store.dispatch(move |s| s.document_dir = dir);

        // Effet B : chargement config, triggers, visibilité, état fenêtre
        let this = self.clone();
        tokio::task::spawn(async move {
            match this.loader.load().await {
                Ok(config) => {
                    this.triggers.register(config.triggers.clone());
                    this.store.dispatch(move |s| s.config = config);
                    this.triggers.process_triggers();
                }
                Err(e) => eprintln!("[widget] chargement config échoué: {}", e),
            }
            // readiness même en échec : les redirections s'évaluent
            // sur la config par défaut plutôt que jamais
            let _ = this.ready_tx.send(true);
        });

        self.triggers.process_triggers();

        let store = self.store.clone();
        let toggle_visible = move || {
            store.dispatch(|s| s.visible = !s.visible);
        };

        let snapshot = self.store.snapshot();
        self.channel.call(if snapshot.minimized {
            HostCommand::MinimizeWindow
        } else {
            HostCommand::RestoreWindow
        });
        self.channel.call(if snapshot.visible {
            HostCommand::ShowWidget
        } else {
            HostCommand::HideWidget
        });

        let listener_id = self.visibility.add_listener(toggle_visible.clone());
        *self.visibility_listener.lock() = Some(listener_id);
        // synchronisation initiale, comme le widget d'origine
        toggle_visible();

        // Effet C : sous-systèmes visiteur puis signal ready à l'hôte
        self.custom_fields.init();
        self.presence.init();
        self.hooks.init();
        self.channel.call(HostCommand::Ready);

        // Handler de route : chaque navigation passe par handle_route
        let this = self.clone();
        self.router.on_change(move |url| this.handle_route(url));
    }

    /// Démonte le widget : désinscription du listener de visibilité,
    /// teardown champs personnalisés et présence, fenêtre re-minimisée.
    /// Les hooks n'ont pas de teardown (aucun état par montage).
    pub fn unmount(&self) {
        // invalide les évaluations de route encore en vol
        self.nav_generation.fetch_add(1, Ordering::SeqCst);

        if let Some(id) = self.visibility_listener.lock().take() {
            self.visibility.remove_listener(id);
        }
        self.custom_fields.reset();
        self.presence.reset();
        self.store.dispatch(|s| {
            s.minimized = true;
            s.undocked = false;
        });
    }

    /// Invoqué à chaque navigation, y compris l'initiale. L'évaluation
    /// est différée jusqu'à la readiness de la config ; si une
    /// navigation plus récente survient entre-temps, celle-ci est
    /// abandonnée.
    fn handle_route(&self, url: String) {
        let generation = self.nav_generation.fetch_add(1, Ordering::SeqCst) + 1;
        let this = self.clone();
        tokio::task::spawn(async move {
            let mut ready = this.ready_rx.clone();
            if ready.wait_for(|ready| *ready).await.is_err() {
                return;
            }
            if this.nav_generation.load(Ordering::SeqCst) != generation {
                // une navigation plus récente a eu lieu, évaluation périmée
                return;
            }
            this.evaluate_redirect(&url);
        });
    }

    /// Les règles de redirection, dans l'ordre strict, premier match
    /// gagne. L'évaluation d'une route déjà atteinte par redirection ne
    /// re-déclenche ni callback ni navigation.
    fn evaluate_redirect(&self, url: &str) {
        let snapshot = self.store.snapshot();
        let settings = &snapshot.config.settings;

        if settings.force_accept_data_processing_consent && !snapshot.gdpr.accepted {
            self.router.navigate(Route::Gdpr);
            return;
        }

        if !snapshot.config.online {
            if url != Route::LeaveMessage.path() {
                self.channel.call(HostCommand::Callback { event: CallbackEvent::NoAgentOnline });
                self.router.navigate(Route::LeaveMessage);
            }
            return;
        }

        let show_department = snapshot
            .config
            .departments
            .iter()
            .any(|dept| dept.show_on_registration);
        let any_field_visible = settings.name_field_registration_form
            || settings.email_field_registration_form
            || show_department;
        let show_registration_form = snapshot.user.token.is_none()
            && settings.registration_form
            && any_field_visible
            && !self.triggers.show_trigger_messages();

        if url == Route::Chat.path() && show_registration_form {
            self.router.navigate(Route::Register);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Department, StaticLoader, WidgetConfig};
    use crate::host::RecordingChannel;
    use std::time::Duration;

    const NO_AGENT: HostCommand = HostCommand::Callback { event: CallbackEvent::NoAgentOnline };

    fn online_config() -> WidgetConfig {
        let mut config = WidgetConfig::default();
        config.online = true;
        config
    }

    fn root_with(
        loader: StaticLoader,
    ) -> (WidgetRoot<StaticLoader, RecordingChannel>, Arc<RecordingChannel>) {
        let channel = Arc::new(RecordingChannel::new());
        let root = WidgetRoot::new(Store::default(), loader, channel.clone(), Translations::new("en"));
        (root, channel)
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(30)).await;
    }

    #[tokio::test]
    async fn test_mount_notifies_host_and_signals_ready() {
        let (root, channel) = root_with(StaticLoader::new(online_config()));
        root.mount();
        settle().await;

        let calls = channel.calls();
        // minimized=true et visible=true par défaut
        assert_eq!(calls[0], HostCommand::MinimizeWindow);
        assert_eq!(calls[1], HostCommand::ShowWidget);
        assert_eq!(calls[2], HostCommand::Ready);
        assert!(root.hooks().is_initialized());
        assert!(root.presence().is_initialized());
    }

    #[tokio::test]
    async fn test_gdpr_redirect_wins_over_everything() {
        let mut config = WidgetConfig::default();
        config.settings.force_accept_data_processing_consent = true;
        config.online = false; // même hors-ligne, le GDPR prime

        let (root, channel) = root_with(StaticLoader::new(config));
        root.mount();
        settle().await;

        root.router().start();
        settle().await;

        assert_eq!(root.router().current(), Route::Gdpr);
        assert_eq!(channel.count(&NO_AGENT), 0);
    }

    #[tokio::test]
    async fn test_gdpr_accepted_does_not_redirect() {
        let mut config = online_config();
        config.settings.force_accept_data_processing_consent = true;

        let (root, _channel) = root_with(StaticLoader::new(config));
        root.mount();
        root.store().dispatch(|s| s.gdpr.accepted = true);
        settle().await;

        root.router().start();
        settle().await;

        assert_eq!(root.router().current(), Route::Chat);
    }

    #[tokio::test]
    async fn test_offline_redirects_and_fires_callback_exactly_once() {
        let (root, channel) = root_with(StaticLoader::new(WidgetConfig::default()));
        root.mount();
        settle().await;

        root.router().start();
        settle().await;

        assert_eq!(root.router().current(), Route::LeaveMessage);
        assert_eq!(channel.count(&NO_AGENT), 1);
    }

    #[tokio::test]
    async fn test_root_redirects_to_registration_form() {
        let mut config = online_config();
        config.settings.registration_form = true;
        config.settings.name_field_registration_form = true;

        let (root, _channel) = root_with(StaticLoader::new(config));
        root.mount();
        settle().await;

        root.router().start();
        settle().await;

        assert_eq!(root.router().current(), Route::Register);
    }

    #[tokio::test]
    async fn test_department_flag_alone_shows_registration() {
        let mut config = online_config();
        config.settings.registration_form = true;
        config.departments = vec![Department {
            id: "support".to_string(),
            name: "Support".to_string(),
            show_on_registration: true,
        }];

        let (root, _channel) = root_with(StaticLoader::new(config));
        root.mount();
        settle().await;

        root.router().start();
        settle().await;

        assert_eq!(root.router().current(), Route::Register);
    }

    #[tokio::test]
    async fn test_known_user_skips_registration() {
        let mut config = online_config();
        config.settings.registration_form = true;
        config.settings.name_field_registration_form = true;

        let (root, _channel) = root_with(StaticLoader::new(config));
        root.mount();
        root.store().dispatch(|s| s.user.token = Some("tok-1".to_string()));
        settle().await;

        root.router().start();
        settle().await;

        assert_eq!(root.router().current(), Route::Chat);
    }

    #[tokio::test]
    async fn test_queued_trigger_message_suppresses_registration() {
        use crate::triggers::{TriggerAction, TriggerCondition, TriggerConf};

        let mut config = online_config();
        config.settings.registration_form = true;
        config.settings.name_field_registration_form = true;
        config.triggers = vec![TriggerConf {
            id: "welcome".to_string(),
            conditions: vec![TriggerCondition::PageUrl { value: "/pricing".to_string() }],
            actions: vec![TriggerAction::SendMessage {
                sender: "agent".to_string(),
                msg: "hi".to_string(),
            }],
            ..TriggerConf::default()
        }];

        let (root, _channel) = root_with(StaticLoader::new(config));
        root.triggers().set_current_url("https://example.org/pricing");
        root.mount();
        settle().await;

        root.router().start();
        settle().await;

        assert_eq!(root.router().current(), Route::Chat);
    }

    #[tokio::test]
    async fn test_visibility_toggle_pair_is_identity() {
        let (root, _channel) = root_with(StaticLoader::new(online_config()));
        root.mount();
        settle().await;

        let before = root.store().snapshot().visible;
        root.visibility().notify();
        assert_eq!(root.store().snapshot().visible, !before);
        root.visibility().notify();
        assert_eq!(root.store().snapshot().visible, before);
    }

    #[tokio::test]
    async fn test_stale_deferred_evaluation_is_dropped() {
        // config lente : deux navigations partent avant la readiness,
        // seule la plus récente doit être évaluée
        let (root, channel) = root_with(StaticLoader::with_delay(WidgetConfig::default(), 80));
        root.mount();

        root.router().start();
        root.router().navigate(Route::SwitchDepartment);
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(root.router().current(), Route::LeaveMessage);
        assert_eq!(channel.count(&NO_AGENT), 1);
    }

    #[tokio::test]
    async fn test_unmount_restores_minimized_state_and_listener() {
        let (root, _channel) = root_with(StaticLoader::new(online_config()));
        root.mount();
        settle().await;

        root.store().dispatch(|s| {
            s.minimized = false;
            s.undocked = true;
        });
        assert_eq!(root.visibility().listener_count(), 1);

        root.unmount();
        let state = root.store().snapshot();
        assert!(state.minimized);
        assert!(!state.undocked);
        assert_eq!(root.visibility().listener_count(), 0);
        assert!(!root.presence().is_initialized());
        // les hooks restent en place : pas d'état par montage
        assert!(root.hooks().is_initialized());
    }
}
