//! Per-feature property policy
//!
//! A single scan over a feature's properties sorts them into five buckets
//! (worldview, class, language, hidden, other) and decides whether the
//! feature survives. A surviving feature is re-emitted once per applicable
//! worldview with its geometry and id copied verbatim.

use crate::encoding::builder::{FeatureBuilder, LayerBuilder};
use crate::encoding::reader::FeatureReader;
use crate::encoding::Value;
use crate::error::Result;

use super::LocalizeOptions;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    PassThrough,
    Localized,
}

#[derive(Debug, Clone)]
enum LanguageMode {
    /// `languages == ["all"]`: keep every language variant
    All,
    /// Requested languages in precedence order; may be empty
    Selection(Vec<String>),
}

#[derive(Debug, Clone)]
enum WorldviewMode {
    /// `worldviews == ["ALL"]`: pass the compatible value through unchanged
    All,
    /// Requested worldviews in emission order
    Selection(Vec<String>),
}

/// Precomputed key names and mode flags for one localize operation
pub(crate) struct Policy {
    mode: Mode,
    hidden_prefix: String,
    language_property: String,
    hidden_language_prefix: String,
    local_key: String,
    script_key: String,
    hidden_script_key: String,
    class_property: String,
    hidden_class_property: String,
    worldview_property: String,
    hidden_worldview_property: String,
    languages: LanguageMode,
    worldviews: WorldviewMode,
    omit_scripts: Vec<String>,
}

enum Scan {
    Dropped,
    Survive(FeatureProps),
}

/// Accumulated bucket results for one surviving feature
struct FeatureProps {
    /// Pass-through: every kept property in source order.
    /// Localized: the non-categorical carry-through properties.
    ordered: Vec<(String, Value)>,
    /// Winning class value, localized mode only
    class: Option<Value>,
    /// Language results in emission order, localized mode only
    language: Vec<(String, Value)>,
    /// One entry per emitted copy; `None` emits without a worldview property
    worldviews: Vec<Option<String>>,
}

impl Policy {
    pub(crate) fn new(options: &LocalizeOptions) -> Self {
        let mode = if options.languages.is_some() || options.worldviews.is_some() {
            Mode::Localized
        } else {
            Mode::PassThrough
        };
        let languages = match &options.languages {
            Some(requested) if requested.len() == 1 && requested[0] == "all" => LanguageMode::All,
            Some(requested) => LanguageMode::Selection(requested.clone()),
            None => LanguageMode::Selection(Vec::new()),
        };
        let worldviews = match &options.worldviews {
            Some(requested) if requested.len() == 1 && requested[0] == "ALL" => WorldviewMode::All,
            Some(requested) => WorldviewMode::Selection(requested.clone()),
            None => WorldviewMode::Selection(vec![options.worldview_default.clone()]),
        };
        Self {
            mode,
            hidden_prefix: options.hidden_prefix.clone(),
            language_property: options.language_property.clone(),
            hidden_language_prefix: format!("{}{}", options.hidden_prefix, options.language_property),
            local_key: format!("{}_local", options.language_property),
            script_key: format!("{}_script", options.language_property),
            hidden_script_key: format!(
                "{}{}_script",
                options.hidden_prefix, options.language_property
            ),
            class_property: options.class_property.clone(),
            hidden_class_property: format!("{}{}", options.hidden_prefix, options.class_property),
            worldview_property: options.worldview_property.clone(),
            hidden_worldview_property: format!(
                "{}{}",
                options.hidden_prefix, options.worldview_property
            ),
            languages,
            worldviews,
            omit_scripts: options.omit_scripts.clone(),
        }
    }

    /// Scan one feature and emit zero or more rewritten copies into `dest`
    pub(crate) fn apply(
        &self,
        feature: &FeatureReader<'_, '_>,
        dest: &mut LayerBuilder,
    ) -> Result<()> {
        match self.scan(feature)? {
            Scan::Dropped => Ok(()),
            Scan::Survive(props) => {
                self.emit(feature, dest, props);
                Ok(())
            }
        }
    }

    fn scan(&self, feature: &FeatureReader<'_, '_>) -> Result<Scan> {
        let localized = self.mode == Mode::Localized;
        let mut ordered: Vec<(String, Value)> = Vec::new();
        let mut class_plain: Option<Value> = None;
        let mut class_hidden: Option<Value> = None;
        let mut language: Vec<(String, Value)> = Vec::new();
        let mut worldview: Option<String> = None;

        for property in feature.properties() {
            let (key, value) = property?;
            if key == self.worldview_property || key == self.hidden_worldview_property {
                let hidden = key == self.hidden_worldview_property;
                let compatible = hidden == localized;
                if compatible {
                    match value.as_str() {
                        Some(v) => {
                            if localized {
                                worldview = Some(v.to_owned());
                            } else {
                                ordered.push((key.to_owned(), value));
                            }
                        }
                        None => return Ok(Scan::Dropped),
                    }
                } else {
                    // an incompatible worldview tag only survives as "all"
                    match value.as_str() {
                        Some("all") => {}
                        _ => return Ok(Scan::Dropped),
                    }
                }
            } else if key == self.class_property {
                if localized {
                    class_plain = Some(value);
                } else {
                    ordered.push((key.to_owned(), value));
                }
            } else if key == self.hidden_class_property {
                if localized {
                    class_hidden = Some(value);
                }
            } else if key.starts_with(&self.hidden_language_prefix) {
                if localized {
                    language.push((key.to_owned(), value));
                }
            } else if key.starts_with(&self.language_property) {
                if localized {
                    language.push((key.to_owned(), value));
                } else {
                    ordered.push((key.to_owned(), value));
                }
            } else if key.starts_with(&self.hidden_prefix) {
                // hidden non-categorical properties drop in every mode
            } else {
                ordered.push((key.to_owned(), value));
            }
        }

        let worldviews = match (&self.mode, worldview) {
            (Mode::PassThrough, _) | (Mode::Localized, None) => vec![None],
            (Mode::Localized, Some(value)) => match &self.worldviews {
                WorldviewMode::All => vec![Some(value)],
                WorldviewMode::Selection(requested) => {
                    let tokens: Vec<&str> = value.split(',').collect();
                    let mut emitted: Vec<Option<String>> = requested
                        .iter()
                        .filter(|w| tokens.contains(&w.as_str()))
                        .map(|w| Some(w.clone()))
                        .collect();
                    if tokens.contains(&"all")
                        && !emitted.iter().any(|w| w.as_deref() == Some("all"))
                    {
                        emitted.push(Some("all".to_owned()));
                    }
                    if emitted.is_empty() {
                        return Ok(Scan::Dropped);
                    }
                    emitted
                }
            },
        };

        let (class, language) = if localized {
            (
                class_hidden.or(class_plain),
                match &self.languages {
                    LanguageMode::All => self.collect_all_languages(&language),
                    LanguageMode::Selection(requested) => {
                        self.select_language(&language, requested)
                    }
                },
            )
        } else {
            (None, Vec::new())
        };

        Ok(Scan::Survive(FeatureProps {
            ordered,
            class,
            language,
            worldviews,
        }))
    }

    /// Language selection for an explicit language list: interleave the plain
    /// and hidden variant of each requested language, then fall back to the
    /// untranslated name.
    fn select_language(
        &self,
        language: &[(String, Value)],
        requested: &[String],
    ) -> Vec<(String, Value)> {
        let get = |key: &str| {
            language
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, value)| value)
        };
        let original = get(&self.language_property).cloned();

        let mut selected: Option<Value> = None;
        'requested: for lang in requested {
            for candidate in [
                format!("{}_{}", self.language_property, lang),
                format!("{}_{}", self.hidden_language_prefix, lang),
            ] {
                if let Some(value) = get(&candidate) {
                    selected = Some(value.clone());
                    break 'requested;
                }
            }
        }
        if selected.is_none() {
            selected = original.clone();
        }

        let mut out = Vec::new();
        if let Some(selected_value) = &selected {
            out.push((self.language_property.clone(), selected_value.clone()));
        }
        if let Some(original_value) = &original {
            let script = get(&self.script_key).or_else(|| get(&self.hidden_script_key));
            let omitted = script
                .and_then(|s| s.as_str())
                .is_some_and(|s| self.omit_scripts.iter().any(|omit| omit == s));
            let local = if omitted {
                selected.clone().unwrap_or_else(|| original_value.clone())
            } else {
                original_value.clone()
            };
            out.push((self.local_key.clone(), local));
        }
        out
    }

    /// `languages == ["all"]`: copy every variant under its prefix-stripped
    /// name, hidden values winning over plain ones, omitting variants whose
    /// value repeats the untranslated name.
    fn collect_all_languages(&self, language: &[(String, Value)]) -> Vec<(String, Value)> {
        let get = |key: &str| {
            language
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, value)| value)
        };
        let original = get(&self.language_property).cloned();

        let mut variants: Vec<(String, Value, bool)> = Vec::new();
        for (key, value) in language {
            let (cleaned, hidden) = match key.strip_prefix(&self.hidden_prefix) {
                Some(stripped) => (stripped, true),
                None => (key.as_str(), false),
            };
            if cleaned == self.language_property
                || cleaned == self.local_key
                || cleaned == self.script_key
            {
                continue;
            }
            if let Some(original_value) = &original {
                if value == original_value {
                    continue;
                }
            }
            match variants.iter_mut().find(|(k, _, _)| k == cleaned) {
                Some(existing) => {
                    if hidden && !existing.2 {
                        existing.1 = value.clone();
                        existing.2 = true;
                    }
                }
                None => variants.push((cleaned.to_owned(), value.clone(), hidden)),
            }
        }

        let mut out: Vec<(String, Value)> = Vec::new();
        if let Some(original_value) = &original {
            out.push((self.language_property.clone(), original_value.clone()));
        }
        out.extend(variants.into_iter().map(|(key, value, _)| (key, value)));
        if let Some(original_value) = original {
            out.push((self.local_key.clone(), original_value));
        }
        out
    }

    fn emit(&self, feature: &FeatureReader<'_, '_>, dest: &mut LayerBuilder, props: FeatureProps) {
        for worldview in &props.worldviews {
            let mut builder = FeatureBuilder::new(feature.geom_type());
            if let Some(id) = feature.id() {
                builder.set_id(id);
            }
            builder.set_raw_geometry(feature.geometry());
            for (key, value) in &props.ordered {
                builder.add_property(key.clone(), value.clone());
            }
            if let Some(class) = &props.class {
                builder.add_property(self.class_property.clone(), class.clone());
            }
            for (key, value) in &props.language {
                builder.add_property(key.clone(), value.clone());
            }
            if let Some(worldview) = worldview {
                builder.add_property(
                    self.worldview_property.clone(),
                    Value::String(worldview.clone()),
                );
            }
            builder.commit(dest);
        }
    }
}
