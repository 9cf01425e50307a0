use std::collections::HashMap;

/// Sens d'écriture du document hôte
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TextDirection {
    #[default]
    Ltr,
    Rtl,
}

/// Détecte un texte écrit de droite à gauche : présence d'un caractère
/// des blocs hébreu/arabe ou d'une marque directionnelle RTL.
pub fn is_rtl(text: &str) -> bool {
    text.chars().any(|c| {
        matches!(c,
            '\u{0590}'..='\u{07FF}'
            | '\u{200F}'
            | '\u{202B}'
            | '\u{202E}'
            | '\u{FB1D}'..='\u{FDFD}'
            | '\u{FE70}'..='\u{FEFC}'
        )
    })
}

/// Bundle de traductions minimal : langue -> clé -> texte, avec repli
/// sur l'anglais puis sur la clé elle-même (comportement i18next).
pub struct Translations {
    lang: String,
    bundles: HashMap<String, HashMap<String, String>>,
}

impl Translations {
    pub fn new(lang: &str) -> Self {
        let mut bundles: HashMap<String, HashMap<String, String>> = HashMap::new();

        let mut en = HashMap::new();
        en.insert("yes".to_string(), "yes".to_string());
        en.insert("no".to_string(), "no".to_string());
        bundles.insert("en".to_string(), en);

        let mut fr = HashMap::new();
        fr.insert("yes".to_string(), "oui".to_string());
        fr.insert("no".to_string(), "non".to_string());
        bundles.insert("fr".to_string(), fr);

        let mut ar = HashMap::new();
        ar.insert("yes".to_string(), "نعم".to_string());
        ar.insert("no".to_string(), "لا".to_string());
        bundles.insert("ar".to_string(), ar);

        let mut he = HashMap::new();
        he.insert("yes".to_string(), "כן".to_string());
        he.insert("no".to_string(), "לא".to_string());
        bundles.insert("he".to_string(), he);

        Self { lang: lang.to_string(), bundles }
    }

    pub fn t(&self, key: &str) -> String {
        self.bundles
            .get(&self.lang)
            .and_then(|b| b.get(key))
            .or_else(|| self.bundles.get("en").and_then(|b| b.get(key)))
            .cloned()
            .unwrap_or_else(|| key.to_string())
    }

    /// Sens d'écriture de la langue courante, d'après le mot localisé
    /// pour "yes" (même heuristique que le widget d'origine)
    pub fn direction(&self) -> TextDirection {
        if is_rtl(&self.t("yes")) {
            TextDirection::Rtl
        } else {
            TextDirection::Ltr
        }
    }
}
