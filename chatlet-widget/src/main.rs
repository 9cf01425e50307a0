/**
 * CHATLET WIDGET - Point d'entrée du contrôleur widget
 *
 * RÔLE : Bootstrap du widget headless : config, traductions, canal hôte
 * MQTT, montage du contrôleur racine, puis boucle d'événements hôte.
 *
 * ARCHITECTURE : le widget publie ses commandes sur
 * chatlet/widget/command@v1 et consomme les événements de la page hôte
 * sur chatlet/host/event@v1 (visibilité, navigation, hooks).
 */

mod app;
mod config;
mod custom_fields;
mod hooks;
mod host;
mod i18n;
mod presence;
mod router;
mod store;
mod triggers;
mod visibility;

use anyhow::Context;
use rumqttc::{AsyncClient, Event, Incoming, MqttOptions, QoS};
use std::sync::Arc;
use std::time::Duration;

use crate::app::WidgetRoot;
use crate::config::YamlConfigLoader;
use crate::host::{HostEvent, MqttHostChannel, HOST_EVENT_TOPIC};
use crate::i18n::Translations;
use crate::router::Route;
use crate::store::{Store, WidgetState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Charger les variables d'environnement depuis .env (si présent)
    dotenvy::dotenv().ok(); // Ok si .env n'existe pas

    let lang = std::env::var("CHATLET_WIDGET_LANG").unwrap_or_else(|_| "en".into());
    let translations = Translations::new(&lang);

    // Canal hôte : broker poussé par la page hôte via l'environnement
    let mqtt_host = std::env::var("CHATLET_MQTT_HOST").unwrap_or_else(|_| "localhost".into());
    let mqtt_port = std::env::var("CHATLET_MQTT_PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(1883);

    let mut opts = MqttOptions::new("chatlet-widget", &mqtt_host, mqtt_port);
    opts.set_keep_alive(Duration::from_secs(15));
    let (client, mut eventloop) = AsyncClient::new(opts, 10);
    client
        .subscribe(HOST_EVENT_TOPIC, QoS::AtLeastOnce)
        .await
        .context("subscribe host events")?;

    let store = Store::new(WidgetState::default());
    let channel = Arc::new(MqttHostChannel::new(client));
    let root = WidgetRoot::new(store, YamlConfigLoader::from_env(), channel, translations);

    root.mount();
    root.router().start();
    println!("[widget] mounted, listening for host events");

    // Démontage propre sur Ctrl-C
    let shutdown_root = root.clone();
    tokio::task::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            shutdown_root.unmount();
            println!("[widget] unmounted");
            std::process::exit(0);
        }
    });

    // Boucle d'événements hôte
    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Incoming::Publish(p))) if p.topic == HOST_EVENT_TOPIC => {
                let Ok(txt) = String::from_utf8(p.payload.to_vec()) else {
                    continue;
                };
                match serde_json::from_str::<HostEvent>(&txt) {
                    Ok(HostEvent::VisibilityChanged) => root.visibility().notify(),
                    Ok(HostEvent::Navigate { path }) => {
                        root.router().navigate(Route::from_path(&path));
                    }
                    Ok(event) => root.hooks().handle(event),
                    Err(_) => eprintln!("[widget] événement hôte JSON invalide: {txt}"),
                }
            }
            Ok(_) => {}
            Err(e) => {
                eprintln!("[widget] MQTT erreur: {:?}", e);
                tokio::time::sleep(Duration::from_secs(2)).await;
            }
        }
    }
}
