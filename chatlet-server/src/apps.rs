/**
 * APPS ENGINE - Registre des apps tierces installées sur le serveur
 *
 * RÔLE :
 * Ce module tient le registre des apps tierces : découverte des manifests,
 * statut d'exécution détaillé, activation/désactivation manuelle ou automatique.
 *
 * FONCTIONNEMENT :
 * - Apps décrites par un manifest {app}.json dans le dossier apps-installed/
 * - Statuts alignés sur le cycle de vie du moteur : enabled (auto/manuel),
 *   disabled (manuel, licence, erreur de compilation, erreur runtime)
 * - Manifest invalide = app enregistrée en CompilerErrorDisabled, jamais ignorée
 *
 * UTILITÉ DANS CHATLET :
 * 🎯 Statistiques : le rapport apps lit ce registre via AppsEngine
 * 🎯 Administration : enable/disable exposés par l'API REST
 * 🎯 Observabilité : chaque changement de statut est horodaté
 *
 * EXEMPLE APP MANIFEST :
 * ```json
 * {
 *   "id": "5c3f2a...",
 *   "name": "github-notifier",
 *   "version": "1.2.0",
 *   "permissions": ["message.write"],
 *   "auto_enable": true
 * }
 * ```
 */

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tokio::fs;
use uuid::Uuid;

/// Erreurs possibles lors des opérations sur les apps
#[derive(Debug, thiserror::Error)]
pub enum AppsError {
    #[error("App not found: {0}")]
    NotFound(String),
    #[error("App already enabled: {0}")]
    AlreadyEnabled(String),
    #[error("App manifest error: {0}")]
    ManifestError(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Statut d'exécution d'une app, aligné sur le cycle de vie du moteur.
/// Les helpers is_enabled/is_disabled définissent les deux familles
/// utilisées par les filtres et les statistiques.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppStatus {
    /// App construite mais pas encore initialisée
    Constructed,
    /// App initialisée, en attente d'activation
    Initialized,
    /// Activée automatiquement au démarrage
    AutoEnabled,
    /// Activée manuellement par un administrateur
    ManuallyEnabled,
    /// Désactivée par le moteur
    Disabled,
    /// Désactivée volontairement par un administrateur
    ManuallyDisabled,
    /// Désactivée : le manifest ou le code ne compile pas
    CompilerErrorDisabled,
    /// Désactivée : licence invalide
    InvalidLicenseDisabled,
    /// Désactivée : erreur à l'exécution
    ErrorDisabled,
}

impl AppStatus {
    pub fn is_enabled(self) -> bool {
        matches!(self, AppStatus::AutoEnabled | AppStatus::ManuallyEnabled)
    }

    pub fn is_disabled(self) -> bool {
        matches!(
            self,
            AppStatus::Disabled
                | AppStatus::ManuallyDisabled
                | AppStatus::CompilerErrorDisabled
                | AppStatus::InvalidLicenseDisabled
                | AppStatus::ErrorDisabled
        )
    }
}

/// Manifest décrivant une app installée
/// Fichier {app}.json dans le dossier apps-installed/
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppManifest {
    /// Identifiant unique de l'app (fourni par le marketplace)
    pub id: String,
    /// Nom human-readable
    pub name: String,
    /// Version sémantique de l'app
    pub version: String,
    /// Description human-readable
    pub description: Option<String>,
    /// Permissions demandées au moteur
    pub permissions: Vec<String>,
    /// Activation automatique au boot du serveur
    pub auto_enable: bool,
}

impl Default for AppManifest {
    fn default() -> Self {
        Self {
            id: "unknown".to_string(),
            name: "unknown".to_string(),
            version: "0.0.0".to_string(),
            description: None,
            permissions: vec![],
            auto_enable: false,
        }
    }
}

/// Une app connue du registre : manifest + statut courant
#[derive(Debug, Clone)]
pub struct AppRecord {
    pub manifest: AppManifest,
    pub status: AppStatus,
    pub installed_at: OffsetDateTime,
    pub last_status_change: Option<OffsetDateTime>,
    /// Raison du dernier passage en échec, le cas échéant
    pub failure_reason: Option<String>,
    /// ID unique d'instance (pour debugging/logging)
    pub instance_id: String,
}

impl AppRecord {
    fn new(manifest: AppManifest, status: AppStatus) -> Self {
        Self {
            manifest,
            status,
            installed_at: OffsetDateTime::now_utc(),
            last_status_change: None,
            failure_reason: None,
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    fn set_status(&mut self, status: AppStatus) {
        self.status = status;
        self.last_status_change = Some(OffsetDateTime::now_utc());
        if !matches!(
            status,
            AppStatus::CompilerErrorDisabled | AppStatus::ErrorDisabled | AppStatus::InvalidLicenseDisabled
        ) {
            self.failure_reason = None;
        }
    }
}

/// Filtre de sélection pour AppsManager::get
/// Sans critère, toutes les apps connues sont retournées.
#[derive(Debug, Clone, Copy, Default)]
pub struct AppFilter {
    pub enabled: Option<bool>,
    pub disabled: Option<bool>,
}

impl AppFilter {
    fn matches(&self, record: &AppRecord) -> bool {
        if let Some(enabled) = self.enabled {
            if record.status.is_enabled() != enabled {
                return false;
            }
        }
        if let Some(disabled) = self.disabled {
            if record.status.is_disabled() != disabled {
                return false;
            }
        }
        true
    }
}

/// Registre central des apps installées
/// Point d'entrée unique pour lifecycle et requêtes
pub struct AppsManager {
    /// Map app_id -> record
    apps: HashMap<String, AppRecord>,
    /// Dossier contenant les manifests
    apps_dir: PathBuf,
}

impl AppsManager {
    pub fn new<P: AsRef<Path>>(apps_dir: P) -> Self {
        Self {
            apps: HashMap::new(),
            apps_dir: apps_dir.as_ref().to_path_buf(),
        }
    }

    /// Scanne le dossier apps-installed/ et charge tous les manifests.
    /// Un manifest illisible produit une app en CompilerErrorDisabled,
    /// identifiée par le nom du fichier : elle compte comme installée
    /// et comme échec dans les statistiques.
    pub async fn discover_apps(&mut self) -> Result<Vec<String>, AppsError> {
        let mut discovered = Vec::new();
        let mut entries = fs::read_dir(&self.apps_dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }
            let Some(filename) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match self.load_manifest(&path).await {
                Ok(manifest) => {
                    let status = if manifest.auto_enable {
                        AppStatus::AutoEnabled
                    } else {
                        AppStatus::Initialized
                    };
                    let app_id = manifest.id.clone();
                    self.apps.insert(app_id.clone(), AppRecord::new(manifest, status));
                    discovered.push(app_id.clone());
                    eprintln!("[apps] discovered: {} (from {})", app_id, filename);
                }
                Err(e) => {
                    eprintln!("[apps] failed to load manifest {}: {}", filename, e);
                    let manifest = AppManifest {
                        id: filename.to_string(),
                        name: filename.to_string(),
                        ..AppManifest::default()
                    };
                    let mut record = AppRecord::new(manifest, AppStatus::CompilerErrorDisabled);
                    record.failure_reason = Some(e.to_string());
                    self.apps.insert(filename.to_string(), record);
                    discovered.push(filename.to_string());
                }
            }
        }

        Ok(discovered)
    }

    /// Charge un manifest d'app depuis un fichier JSON
    async fn load_manifest<P: AsRef<Path>>(&self, path: P) -> Result<AppManifest, AppsError> {
        let content = fs::read_to_string(path).await?;
        let manifest: AppManifest = serde_json::from_str(&content)?;

        // Validation basique
        if manifest.id.is_empty() {
            return Err(AppsError::ManifestError("id cannot be empty".to_string()));
        }
        if manifest.name.is_empty() {
            return Err(AppsError::ManifestError("name cannot be empty".to_string()));
        }

        Ok(manifest)
    }

    /// Installe une app déjà construite, sans passer par un manifest
    pub fn install(&mut self, manifest: AppManifest, status: AppStatus) -> String {
        let app_id = manifest.id.clone();
        self.apps.insert(app_id.clone(), AppRecord::new(manifest, status));
        app_id
    }

    /// Sélectionne les apps correspondant au filtre
    pub fn get(&self, filter: &AppFilter) -> Vec<&AppRecord> {
        self.apps.values().filter(|r| filter.matches(r)).collect()
    }

    pub fn get_app(&self, app_id: &str) -> Option<&AppRecord> {
        self.apps.get(app_id)
    }

    pub fn len(&self) -> usize {
        self.apps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.apps.is_empty()
    }

    /// Active une app par son id
    pub fn enable_app(&mut self, app_id: &str, manual: bool) -> Result<(), AppsError> {
        let record = self
            .apps
            .get_mut(app_id)
            .ok_or_else(|| AppsError::NotFound(app_id.to_string()))?;

        if record.status.is_enabled() {
            return Err(AppsError::AlreadyEnabled(app_id.to_string()));
        }

        record.set_status(if manual {
            AppStatus::ManuallyEnabled
        } else {
            AppStatus::AutoEnabled
        });
        eprintln!("[apps] enabled {} (instance {})", app_id, record.instance_id);
        Ok(())
    }

    /// Désactive une app. `manual` distingue le choix d'un administrateur
    /// d'une désactivation décidée par le moteur : seule la seconde compte
    /// comme échec dans les statistiques.
    pub fn disable_app(&mut self, app_id: &str, manual: bool) -> Result<(), AppsError> {
        let record = self
            .apps
            .get_mut(app_id)
            .ok_or_else(|| AppsError::NotFound(app_id.to_string()))?;

        record.set_status(if manual {
            AppStatus::ManuallyDisabled
        } else {
            AppStatus::Disabled
        });
        eprintln!("[apps] disabled {} (manual: {})", app_id, manual);
        Ok(())
    }

    /// Passe une app en échec runtime avec sa raison
    pub fn mark_failed(&mut self, app_id: &str, reason: &str) -> Result<(), AppsError> {
        let record = self
            .apps
            .get_mut(app_id)
            .ok_or_else(|| AppsError::NotFound(app_id.to_string()))?;

        record.set_status(AppStatus::ErrorDisabled);
        record.failure_reason = Some(reason.to_string());
        eprintln!("[apps] {} marked failed: {}", app_id, reason);
        Ok(())
    }

    /// Liste toutes les apps avec leur état, pour l'API
    pub fn list_apps(&self) -> Vec<AppInfo> {
        self.apps
            .values()
            .map(|r| AppInfo {
                id: r.manifest.id.clone(),
                name: r.manifest.name.clone(),
                version: r.manifest.version.clone(),
                status: r.status,
                installed_at: r.installed_at.format(&Rfc3339).unwrap_or_default(),
                installed_for_seconds: (OffsetDateTime::now_utc() - r.installed_at)
                    .whole_seconds()
                    .max(0),
                failure_reason: r.failure_reason.clone(),
            })
            .collect()
    }
}

/// Informations publiques d'une app pour les APIs
#[derive(Debug, Serialize)]
pub struct AppInfo {
    pub id: String,
    pub name: String,
    pub version: String,
    pub status: AppStatus,
    pub installed_at: String, // format RFC3339 pour l'API
    pub installed_for_seconds: i64,
    pub failure_reason: Option<String>,
}

/// Façade injectée dans le reporter de statistiques et l'API.
/// Tant que initialize() n'a pas abouti, manager() rend None :
/// c'est l'état "manager not ready" que les statistiques traduisent
/// en compteurs absents.
pub struct AppsEngine {
    manager: Option<AppsManager>,
}

impl AppsEngine {
    pub fn new() -> Self {
        Self { manager: None }
    }

    /// Découvre les apps et rend le moteur opérationnel
    pub async fn initialize<P: AsRef<Path>>(&mut self, apps_dir: P) -> Result<Vec<String>, AppsError> {
        let mut manager = AppsManager::new(apps_dir);
        let discovered = manager.discover_apps().await?;
        self.manager = Some(manager);
        Ok(discovered)
    }

    /// Rend le moteur opérationnel avec un manager déjà peuplé
    pub fn initialize_with(&mut self, manager: AppsManager) {
        self.manager = Some(manager);
    }

    pub fn is_initialized(&self) -> bool {
        self.manager.is_some()
    }

    pub fn manager(&self) -> Option<&AppsManager> {
        self.manager.as_ref()
    }

    pub fn manager_mut(&mut self) -> Option<&mut AppsManager> {
        self.manager.as_mut()
    }
}

impl Default for AppsEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest(id: &str) -> AppManifest {
        AppManifest {
            id: id.to_string(),
            name: id.to_string(),
            version: "1.0.0".to_string(),
            ..AppManifest::default()
        }
    }

    #[test]
    fn test_status_families() {
        assert!(AppStatus::AutoEnabled.is_enabled());
        assert!(AppStatus::ManuallyEnabled.is_enabled());
        assert!(!AppStatus::Initialized.is_enabled());
        assert!(AppStatus::ManuallyDisabled.is_disabled());
        assert!(AppStatus::ErrorDisabled.is_disabled());
        assert!(!AppStatus::AutoEnabled.is_disabled());
    }

    #[test]
    fn test_filter_enabled_disabled() {
        let mut manager = AppsManager::new("./unused");
        manager.install(manifest("a"), AppStatus::AutoEnabled);
        manager.install(manifest("b"), AppStatus::ManuallyEnabled);
        manager.install(manifest("c"), AppStatus::ManuallyDisabled);
        manager.install(manifest("d"), AppStatus::ErrorDisabled);
        manager.install(manifest("e"), AppStatus::Initialized);

        assert_eq!(manager.get(&AppFilter::default()).len(), 5);
        assert_eq!(manager.get(&AppFilter { enabled: Some(true), ..Default::default() }).len(), 2);
        assert_eq!(manager.get(&AppFilter { disabled: Some(true), ..Default::default() }).len(), 2);
        // Initialized n'est ni enabled ni disabled
        assert_eq!(manager.get(&AppFilter { enabled: Some(false), disabled: Some(false) }).len(), 1);
    }

    #[test]
    fn test_enable_disable_cycle() {
        let mut manager = AppsManager::new("./unused");
        manager.install(manifest("a"), AppStatus::Initialized);

        manager.enable_app("a", true).unwrap();
        assert_eq!(manager.get_app("a").unwrap().status, AppStatus::ManuallyEnabled);
        assert!(matches!(manager.enable_app("a", true), Err(AppsError::AlreadyEnabled(_))));

        manager.disable_app("a", false).unwrap();
        assert_eq!(manager.get_app("a").unwrap().status, AppStatus::Disabled);

        assert!(matches!(manager.enable_app("zz", true), Err(AppsError::NotFound(_))));
    }

    #[test]
    fn test_mark_failed_keeps_reason() {
        let mut manager = AppsManager::new("./unused");
        manager.install(manifest("a"), AppStatus::AutoEnabled);
        manager.mark_failed("a", "runtime panic in handler").unwrap();

        let record = manager.get_app("a").unwrap();
        assert_eq!(record.status, AppStatus::ErrorDisabled);
        assert_eq!(record.failure_reason.as_deref(), Some("runtime panic in handler"));

        // la raison disparaît quand l'app repart
        manager.enable_app("a", true).unwrap();
        assert!(manager.get_app("a").unwrap().failure_reason.is_none());
    }

    #[tokio::test]
    async fn test_discover_apps_with_invalid_manifest() {
        let dir = std::env::temp_dir().join(format!("chatlet-apps-{}", Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("good.json"),
            r#"{"id":"good","name":"good","version":"1.0.0","description":null,"permissions":[],"auto_enable":true}"#,
        )
        .unwrap();
        std::fs::write(dir.join("broken.json"), "{ not json").unwrap();
        std::fs::write(dir.join("ignored.txt"), "nope").unwrap();

        let mut engine = AppsEngine::new();
        assert!(!engine.is_initialized());
        let discovered = engine.initialize(&dir).await.unwrap();
        assert_eq!(discovered.len(), 2);

        let manager = engine.manager().unwrap();
        assert_eq!(manager.get_app("good").unwrap().status, AppStatus::AutoEnabled);
        let broken = manager.get_app("broken").unwrap();
        assert_eq!(broken.status, AppStatus::CompilerErrorDisabled);
        assert!(broken.failure_reason.is_some());

        std::fs::remove_dir_all(&dir).ok();
    }
}
