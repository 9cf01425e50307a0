use serde::Serialize;

use crate::apps::{AppFilter, AppStatus, AppsEngine};

/// Rapport plat consommé par la télémétrie.
/// Les compteurs sont None tant que le moteur d'apps n'est pas prêt :
/// "indisponible" et "zéro app" sont deux états distincts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppsStatisticsSummary {
    pub engine_version: String,
    pub total_installed: Option<usize>,
    pub total_active: Option<usize>,
    pub total_failed: Option<usize>,
}

/// Construit le rapport apps. Lecture pure : aucun cache, aucun effet,
/// un rapport frais à chaque appel.
///
/// - installed : toutes les apps connues du registre
/// - active    : apps enabled (auto ou manuel)
/// - failed    : apps disabled SAUF celles désactivées volontairement
///               par un administrateur
pub fn get_apps_statistics(engine: &AppsEngine, engine_version: &str) -> AppsStatisticsSummary {
    let engine_version = engine_version.to_string();

    let Some(manager) = engine.manager() else {
        return AppsStatisticsSummary {
            engine_version,
            total_installed: None,
            total_active: None,
            total_failed: None,
        };
    };

    let total_installed = manager.get(&AppFilter::default()).len();
    let total_active = manager
        .get(&AppFilter { enabled: Some(true), ..Default::default() })
        .len();
    let total_failed = manager
        .get(&AppFilter { disabled: Some(true), ..Default::default() })
        .into_iter()
        .filter(|record| record.status != AppStatus::ManuallyDisabled)
        .count();

    AppsStatisticsSummary {
        engine_version,
        total_installed: Some(total_installed),
        total_active: Some(total_active),
        total_failed: Some(total_failed),
    }
}
