use std::collections::{BTreeMap, HashMap};

use once_cell::sync::Lazy;
use serde_json::Value;

use crate::models::Language;

/// Looks user-facing text up by key. Parameters replace `{{name}}`
/// placeholders in the resolved string.
pub trait Translator: Send + Sync {
    fn translate(&self, key: &str, params: &[(&str, &str)]) -> String;

    fn language(&self) -> Language;

    fn text(&self, key: &str) -> String {
        self.translate(key, &[])
    }
}

pub type Entries = BTreeMap<String, String>;

static DICTIONARIES: Lazy<HashMap<Language, Entries>> = Lazy::new(|| {
    Language::ALL
        .into_iter()
        .map(|language| (language, load(language)))
        .collect()
});

fn source(language: Language) -> &'static str {
    match language {
        Language::En => include_str!("../locales/en.json"),
        Language::Ru => include_str!("../locales/ru.json"),
        Language::Kg => include_str!("../locales/kg.json"),
    }
}

fn load(language: Language) -> Entries {
    let tree: Value =
        serde_json::from_str(source(language)).expect("bundled locale file is valid json");
    let mut entries = Entries::new();
    flatten("", &tree, &mut entries);
    entries
}

fn flatten(prefix: &str, node: &Value, out: &mut Entries) {
    match node {
        Value::Object(map) => {
            for (key, child) in map {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                flatten(&path, child, out);
            }
        }
        Value::String(text) => {
            out.insert(prefix.to_string(), text.clone());
        }
        other => {
            out.insert(prefix.to_string(), other.to_string());
        }
    }
}

fn interpolate(template: &str, params: &[(&str, &str)]) -> String {
    params
        .iter()
        .fold(template.to_string(), |text, (name, value)| {
            text.replace(&format!("{{{{{name}}}}}"), value)
        })
}

/// Bundled dictionaries for the site languages. Lookups fall back to Russian
/// and finally to the key itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct Dictionary {
    language: Language,
}

impl Dictionary {
    pub const FALLBACK: Language = Language::Ru;

    pub fn new(language: Language) -> Self {
        Self { language }
    }

    pub fn entries(language: Language) -> &'static Entries {
        &DICTIONARIES[&language]
    }

    pub fn lookup(&self, key: &str) -> Option<&'static str> {
        Self::entries(self.language)
            .get(key)
            .or_else(|| Self::entries(Self::FALLBACK).get(key))
            .map(String::as_str)
    }
}

impl Translator for Dictionary {
    fn translate(&self, key: &str, params: &[(&str, &str)]) -> String {
        match self.lookup(key) {
            Some(template) => interpolate(template, params),
            None => key.to_string(),
        }
    }

    fn language(&self) -> Language {
        self.language
    }
}
