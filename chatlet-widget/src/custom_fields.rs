use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Default)]
struct Inner {
    initialized: bool,
    /// Champs posés avant init, rejoués au moment de l'init
    pending: Vec<(String, String)>,
    fields: HashMap<String, String>,
}

/// Champs personnalisés attachés au visiteur par la page hôte
/// (plan tarifaire, id de compte...). La page hôte peut pousser des
/// champs avant que le widget soit monté : ils sont mis en attente
/// puis appliqués à l'init.
#[derive(Clone, Default)]
pub struct CustomFields {
    inner: Arc<Mutex<Inner>>,
}

impl CustomFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn init(&self) {
        let mut inner = self.inner.lock();
        inner.initialized = true;
        let pending = std::mem::take(&mut inner.pending);
        for (key, value) in pending {
            inner.fields.insert(key, value);
        }
    }

    pub fn set_field(&self, key: &str, value: &str) {
        let mut inner = self.inner.lock();
        if inner.initialized {
            inner.fields.insert(key.to_string(), value.to_string());
        } else {
            inner.pending.push((key.to_string(), value.to_string()));
        }
    }

    pub fn fields(&self) -> HashMap<String, String> {
        self.inner.lock().fields.clone()
    }

    pub fn reset(&self) {
        let mut inner = self.inner.lock();
        inner.initialized = false;
        inner.pending.clear();
        inner.fields.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fields_set_before_init_are_flushed_on_init() {
        let fields = CustomFields::new();
        fields.set_field("plan", "pro");
        assert!(fields.fields().is_empty());

        fields.init();
        assert_eq!(fields.fields().get("plan").map(String::as_str), Some("pro"));

        fields.set_field("account", "42");
        assert_eq!(fields.fields().len(), 2);
    }

    #[test]
    fn test_reset_clears_everything() {
        let fields = CustomFields::new();
        fields.init();
        fields.set_field("plan", "pro");
        fields.reset();

        assert!(fields.fields().is_empty());
        // après reset, les nouveaux champs repartent en attente
        fields.set_field("plan", "free");
        assert!(fields.fields().is_empty());
    }
}
