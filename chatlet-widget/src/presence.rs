use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use time::OffsetDateTime;
use tokio::task::JoinHandle;

const DEFAULT_AWAY_AFTER_SECONDS: i64 = 300;

#[derive(Default)]
struct Inner {
    initialized: bool,
    last_activity: Option<OffsetDateTime>,
    away: bool,
    monitor: Option<JoinHandle<()>>,
}

/// Présence du visiteur : online tant qu'une activité récente est vue,
/// away au-delà du seuil. Le moniteur est une tâche tokio arrêtée au
/// reset (démontage du widget).
#[derive(Clone)]
pub struct UserPresence {
    inner: Arc<Mutex<Inner>>,
    away_after_seconds: i64,
}

impl UserPresence {
    pub fn new() -> Self {
        Self::with_away_after(DEFAULT_AWAY_AFTER_SECONDS)
    }

    pub fn with_away_after(away_after_seconds: i64) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
            away_after_seconds,
        }
    }

    /// Démarre le suivi d'activité. Idempotent : un deuxième init ne
    /// relance pas de moniteur.
    pub fn init(&self) {
        let mut inner = self.inner.lock();
        if inner.initialized {
            return;
        }
        inner.initialized = true;
        inner.last_activity = Some(OffsetDateTime::now_utc());
        inner.away = false;

        let this = self.clone();
        inner.monitor = Some(tokio::task::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(5));
            loop {
                interval.tick().await;
                let mut inner = this.inner.lock();
                if let Some(last) = inner.last_activity {
                    let idle = (OffsetDateTime::now_utc() - last).whole_seconds();
                    if idle >= this.away_after_seconds && !inner.away {
                        inner.away = true;
                        eprintln!("[presence] visitor away after {}s idle", idle);
                    }
                }
            }
        }));
    }

    /// Signale une activité du visiteur
    pub fn touch(&self) {
        let mut inner = self.inner.lock();
        inner.last_activity = Some(OffsetDateTime::now_utc());
        inner.away = false;
    }

    pub fn is_away(&self) -> bool {
        self.inner.lock().away
    }

    pub fn is_initialized(&self) -> bool {
        self.inner.lock().initialized
    }

    /// Arrête le moniteur et oublie l'activité
    pub fn reset(&self) {
        let mut inner = self.inner.lock();
        if let Some(monitor) = inner.monitor.take() {
            monitor.abort();
        }
        inner.initialized = false;
        inner.last_activity = None;
        inner.away = false;
    }
}

impl Default for UserPresence {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_init_touch_reset_cycle() {
        let presence = UserPresence::new();
        assert!(!presence.is_initialized());

        presence.init();
        assert!(presence.is_initialized());
        assert!(!presence.is_away());

        presence.touch();
        assert!(!presence.is_away());

        presence.reset();
        assert!(!presence.is_initialized());
    }

    #[tokio::test]
    async fn test_double_init_is_idempotent() {
        let presence = UserPresence::new();
        presence.init();
        presence.init();
        presence.reset();
        // pas de moniteur orphelin : un seul handle était enregistré
        assert!(!presence.is_initialized());
    }
}
