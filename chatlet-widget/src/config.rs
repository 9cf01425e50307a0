use serde::{Deserialize, Serialize};
use std::future::Future;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::triggers::TriggerConf;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Réglages du formulaire d'inscription et du consentement GDPR
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WidgetSettings {
    pub registration_form: bool,
    pub name_field_registration_form: bool,
    pub email_field_registration_form: bool,
    pub force_accept_data_processing_consent: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Department {
    pub id: String,
    pub name: String,
    /// Le département apparaît dans le formulaire d'inscription
    pub show_on_registration: bool,
}

/// Configuration du widget, possédée par le store.
/// Remplacée en bloc à chaque chargement, jamais mutée champ par champ.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WidgetConfig {
    pub settings: WidgetSettings,
    pub online: bool,
    pub enabled: bool,
    pub departments: Vec<Department>,
    pub triggers: Vec<TriggerConf>,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            settings: WidgetSettings::default(),
            online: false,
            enabled: true,
            departments: vec![],
            triggers: vec![],
        }
    }
}

/// Source de configuration injectée dans le contrôleur.
/// Le contrôleur signale la readiness une fois load() résolu, que le
/// chargement ait abouti ou non.
pub trait ConfigLoader: Send + Sync + 'static {
    fn load(&self) -> impl Future<Output = Result<WidgetConfig, ConfigError>> + Send;
}

/// Chargement depuis un fichier YAML, comportement identique au serveur :
/// fichier absent ou vide = config par défaut, YAML invalide = erreur.
pub struct YamlConfigLoader {
    path: PathBuf,
}

impl YamlConfigLoader {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self { path: path.as_ref().to_path_buf() }
    }

    pub fn from_env() -> Self {
        let path = std::env::var("CHATLET_WIDGET_CONFIG").unwrap_or_else(|_| "widget.yaml".into());
        Self::new(path)
    }
}

impl ConfigLoader for YamlConfigLoader {
    async fn load(&self) -> Result<WidgetConfig, ConfigError> {
        if !self.path.exists() {
            eprintln!("[widget] pas de {:?}, usage config par défaut", self.path);
            return Ok(WidgetConfig::default());
        }
        let txt = fs::read_to_string(&self.path).await?;
        if txt.trim().is_empty() {
            return Ok(WidgetConfig::default());
        }
        Ok(serde_yaml::from_str(&txt)?)
    }
}

/// Loader de test : rend une config fixe après un délai optionnel
#[cfg(test)]
pub struct StaticLoader {
    pub config: WidgetConfig,
    pub delay_ms: u64,
}

#[cfg(test)]
impl StaticLoader {
    pub fn new(config: WidgetConfig) -> Self {
        Self { config, delay_ms: 0 }
    }

    pub fn with_delay(config: WidgetConfig, delay_ms: u64) -> Self {
        Self { config, delay_ms }
    }
}

#[cfg(test)]
impl ConfigLoader for StaticLoader {
    async fn load(&self) -> Result<WidgetConfig, ConfigError> {
        if self.delay_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(self.delay_ms)).await;
        }
        Ok(self.config.clone())
    }
}
