use rumqttc::{AsyncClient, MqttOptions, QoS};
use std::time::Duration;
use tokio::task;

use crate::apps::AppsEngine;
use crate::config::{MqttConf, ServerConfig};
use crate::state::Shared;
use crate::statistics::get_apps_statistics;

/// Démarre la publication périodique du rapport apps sur la télémétrie.
/// Même boucle que le health publisher du kernel : interval + poll MQTT,
/// reconnexion silencieuse après pause en cas d'erreur.
pub fn spawn_telemetry_publisher(engine: Shared<AppsEngine>, config: ServerConfig) {
    task::spawn(async move {
        let mqtt_cfg = config
            .mqtt
            .clone()
            .unwrap_or_else(|| MqttConf { host: "localhost".into(), port: 1883 });

        let mut opts = MqttOptions::new("chatlet-server-telemetry", &mqtt_cfg.host, mqtt_cfg.port);
        opts.set_keep_alive(Duration::from_secs(15));

        let (client, mut eventloop) = AsyncClient::new(opts, 10);

        let mut interval =
            tokio::time::interval(Duration::from_secs(config.telemetry_interval_seconds.max(1)));

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let summary = {
                        let engine = engine.lock();
                        get_apps_statistics(&engine, &config.marketplace_api_version)
                    };
                    if let Ok(payload) = serde_json::to_string(&summary) {
                        if let Err(e) = client.publish("chatlet/telemetry/apps@v1", QoS::AtLeastOnce, false, payload).await {
                            eprintln!("[telemetry] failed to publish: {:?}", e);
                        } else {
                            println!("[telemetry] published apps report (installed: {:?}, active: {:?}, failed: {:?})",
                                    summary.total_installed, summary.total_active, summary.total_failed);
                        }
                    }
                },
                event = eventloop.poll() => {
                    match event {
                        Ok(_) => {}, // Ignore normal MQTT events
                        Err(e) => {
                            eprintln!("[telemetry] MQTT error: {:?}", e);
                            tokio::time::sleep(Duration::from_secs(2)).await;
                        }
                    }
                }
            }
        }
    });
}
