use parking_lot::Mutex;
use std::sync::Arc;

/// Les sept écrans du widget. Chat est la route par défaut : tout
/// chemin inconnu retombe dessus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Chat,
    ChatFinished,
    Gdpr,
    LeaveMessage,
    Register,
    SwitchDepartment,
    TriggerMessages,
}

impl Route {
    pub fn path(self) -> &'static str {
        match self {
            Route::Chat => "/",
            Route::ChatFinished => "/chat-finished",
            Route::Gdpr => "/gdpr",
            Route::LeaveMessage => "/leave-message",
            Route::Register => "/register",
            Route::SwitchDepartment => "/switch-department",
            Route::TriggerMessages => "/trigger-messages",
        }
    }

    pub fn from_path(path: &str) -> Route {
        match path {
            "/chat-finished" => Route::ChatFinished,
            "/gdpr" => Route::Gdpr,
            "/leave-message" => Route::LeaveMessage,
            "/register" => Route::Register,
            "/switch-department" => Route::SwitchDepartment,
            "/trigger-messages" => Route::TriggerMessages,
            _ => Route::Chat,
        }
    }
}

type ChangeHandler = Arc<dyn Fn(String) + Send + Sync>;

struct RouterInner {
    current: Route,
    on_change: Option<ChangeHandler>,
}

/// Routeur minimal : une route courante et un callback de changement,
/// invoqué à chaque navigation y compris l'initiale (start).
#[derive(Clone)]
pub struct Router {
    inner: Arc<Mutex<RouterInner>>,
}

impl Router {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(RouterInner { current: Route::Chat, on_change: None })),
        }
    }

    pub fn on_change(&self, handler: impl Fn(String) + Send + Sync + 'static) {
        self.inner.lock().on_change = Some(Arc::new(handler));
    }

    pub fn current(&self) -> Route {
        self.inner.lock().current
    }

    /// Déclenche l'évaluation de la route initiale
    pub fn start(&self) {
        let (route, handler) = {
            let inner = self.inner.lock();
            (inner.current, inner.on_change.clone())
        };
        if let Some(handler) = handler {
            handler(route.path().to_string());
        }
    }

    /// Navigue vers une route. No-op si la route ne change pas : une
    /// redirection vers la route courante ne doit pas réalimenter le
    /// handler en boucle. Le handler est appelé hors verrou.
    pub fn navigate(&self, route: Route) {
        let handler = {
            let mut inner = self.inner.lock();
            if inner.current == route {
                return;
            }
            inner.current = route;
            inner.on_change.clone()
        };
        if let Some(handler) = handler {
            handler(route.path().to_string());
        }
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}
