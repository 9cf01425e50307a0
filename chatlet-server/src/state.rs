use parking_lot::Mutex;
use std::sync::Arc;

/// État partagé entre les tâches tokio et les handlers axum.
/// parking_lot plutôt que std::sync : pas de poisoning, lock() direct.
pub type Shared<T> = Arc<Mutex<T>>;

pub fn new_state<T>(value: T) -> Shared<T> {
    Arc::new(Mutex::new(value))
}
