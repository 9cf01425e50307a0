use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServerConfig {
    /// Version de l'API marketplace exposée par le moteur d'apps.
    /// Valeur statique : reprise telle quelle dans les statistiques,
    /// indépendamment de l'état du manager.
    pub marketplace_api_version: String,
    /// Dossier contenant les manifests {app}.json
    pub apps_dir: String,
    pub http_port: u16,
    pub mqtt: Option<MqttConf>,
    /// Intervalle de publication du rapport apps sur la télémétrie
    pub telemetry_interval_seconds: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MqttConf {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            marketplace_api_version: "1.0.0".into(),
            apps_dir: "./apps-installed".into(),
            http_port: 8080,
            mqtt: Some(MqttConf { host: "localhost".into(), port: 1883 }),
            telemetry_interval_seconds: 300,
        }
    }
}

pub async fn load_config() -> ServerConfig {
    let path = std::env::var("CHATLET_SERVER_CONFIG").unwrap_or_else(|_| "server.yaml".into());
    if Path::new(&path).exists() {
        let txt = fs::read_to_string(&path).await.unwrap_or_default();
        if txt.trim().is_empty() { return ServerConfig::default(); }
        serde_yaml::from_str(&txt).unwrap_or_else(|e| {
            eprintln!("[server] config invalide: {e}");
            ServerConfig::default()
        })
    } else {
        eprintln!("[server] pas de server.yaml, usage config par défaut");
        ServerConfig::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.http_port, 8080);
        assert_eq!(config.telemetry_interval_seconds, 300);
        assert!(config.mqtt.is_some());
    }

    #[test]
    fn test_config_from_yaml() {
        let yaml = r#"
marketplace_api_version: "2.3.1"
apps_dir: "/srv/chatlet/apps"
http_port: 9090
mqtt:
  host: broker.local
  port: 1884
telemetry_interval_seconds: 60
"#;
        let config: ServerConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.marketplace_api_version, "2.3.1");
        assert_eq!(config.http_port, 9090);
        assert_eq!(config.mqtt.unwrap().port, 1884);
    }
}
