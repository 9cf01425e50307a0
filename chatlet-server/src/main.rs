/**
 * CHATLET SERVER - Point d'entrée du serveur
 *
 * RÔLE : Orchestration des modules : config, apps engine, statistiques,
 * API REST et télémétrie MQTT. Bootstrap avec gestion d'erreurs et logging.
 *
 * ARCHITECTURE : Registre d'apps en mémoire + API Axum + publication
 * périodique du rapport apps sur la télémétrie.
 */

mod apps;
mod config;
mod http;
mod state;
mod statistics;
mod telemetry;

use crate::apps::AppsEngine;
use crate::config::{load_config, ServerConfig};
use crate::http::AppState;
use crate::state::{new_state, Shared};

use anyhow::Context;
use std::net::SocketAddr;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Charger les variables d'environnement depuis .env (si présent)
    dotenvy::dotenv().ok(); // Ok si .env n'existe pas

    let cfg_loaded: ServerConfig = load_config().await;
    let cfg: Shared<ServerConfig> = new_state(cfg_loaded.clone());

    // apps engine
    std::fs::create_dir_all(&cfg_loaded.apps_dir).unwrap_or_else(|e| {
        eprintln!("[server] warning: failed to create apps dir: {}", e);
    });

    let mut engine = AppsEngine::new();
    match engine.initialize(&cfg_loaded.apps_dir).await {
        Ok(discovered) => {
            println!("[server] discovered {} apps", discovered.len());
        }
        Err(e) => {
            // Le moteur reste non initialisé : les statistiques publieront
            // des compteurs absents plutôt que des zéros.
            eprintln!("[server] failed to initialize apps engine: {}", e);
        }
    }
    let engine = new_state(engine);

    // publication périodique du rapport apps
    if cfg_loaded.mqtt.is_some() {
        telemetry::spawn_telemetry_publisher(engine.clone(), cfg_loaded.clone());
    } else {
        eprintln!("[server] pas de conf MQTT, télémétrie désactivée");
    }

    // fabrique l'état unique pour Axum
    let app_state = AppState { engine, cfg };

    // HTTP
    let app = http::build_router(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], cfg_loaded.http_port));
    println!("[server] listening on http://{addr}");
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("bind {addr}"))?;
    axum::serve(listener, app).await.context("http server")?;
    Ok(())
}
