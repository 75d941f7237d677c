//! Tile localization
//!
//! Rewrites a tile's feature properties for a language and worldview policy:
//! features that do not apply to the selected worldviews are pruned, hidden
//! "shadow" properties are promoted to first-class names or dropped, and each
//! surviving feature is re-emitted with the requested language as its
//! principal name property.

pub(crate) mod properties;

use serde::{Deserialize, Serialize};
use std::borrow::Cow;

use crate::encoding::builder::{LayerBuilder, TileBuilder};
use crate::encoding::compression::{is_compressed, Compressor, Decompressor};
use crate::encoding::reader::TileReader;
use crate::error::{Error, Result};

use self::properties::Policy;

/// Default hidden-property prefix
pub const DEFAULT_HIDDEN_PREFIX: &str = "_mbx_";
/// Default language property
pub const DEFAULT_LANGUAGE_PROPERTY: &str = "name";
/// Default worldview property
pub const DEFAULT_WORLDVIEW_PROPERTY: &str = "worldview";
/// Default worldview applied when only languages are requested
pub const DEFAULT_WORLDVIEW: &str = "US";
/// Default class property
pub const DEFAULT_CLASS_PROPERTY: &str = "class";

/// Localization options
///
/// When neither `languages` nor `worldviews` is present the tile is processed
/// in pass-through mode: hidden-prefixed properties are dropped and features
/// carrying an incompatible worldview are removed, but nothing is rewritten.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct LocalizeOptions {
    /// Prefix marking shadow properties
    pub hidden_prefix: String,
    /// Scripts whose local name is replaced by the selected language value
    pub omit_scripts: Vec<String>,
    /// Requested languages in precedence order; `["all"]` keeps every
    /// language variant
    pub languages: Option<Vec<String>>,
    /// Property holding the feature name
    pub language_property: String,
    /// Requested worldviews in emission order; `["ALL"]` keeps every
    /// worldview
    pub worldviews: Option<Vec<String>>,
    /// Property holding the worldview tag
    pub worldview_property: String,
    /// Worldview assumed when `languages` is set without `worldviews`
    pub worldview_default: String,
    /// Property holding the feature class
    pub class_property: String,
    /// Gzip the output when it is non-empty
    pub compress: bool,
}

impl Default for LocalizeOptions {
    fn default() -> Self {
        Self {
            hidden_prefix: DEFAULT_HIDDEN_PREFIX.to_owned(),
            omit_scripts: Vec::new(),
            languages: None,
            language_property: DEFAULT_LANGUAGE_PROPERTY.to_owned(),
            worldviews: None,
            worldview_property: DEFAULT_WORLDVIEW_PROPERTY.to_owned(),
            worldview_default: DEFAULT_WORLDVIEW.to_owned(),
            class_property: DEFAULT_CLASS_PROPERTY.to_owned(),
            compress: false,
        }
    }
}

impl LocalizeOptions {
    /// Check the option strings the way the request boundary does
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("hidden_prefix", &self.hidden_prefix),
            ("language_property", &self.language_property),
            ("worldview_property", &self.worldview_property),
            ("worldview_default", &self.worldview_default),
            ("class_property", &self.class_property),
        ] {
            if value.is_empty() {
                return Err(Error::Validation(format!(
                    "'{name}' must be a non-empty string"
                )));
            }
        }
        for (name, values) in [
            ("omit_scripts", Some(&self.omit_scripts)),
            ("languages", self.languages.as_ref()),
            ("worldviews", self.worldviews.as_ref()),
        ] {
            if let Some(values) = values {
                if values.iter().any(String::is_empty) {
                    return Err(Error::Validation(format!(
                        "'{name}' must contain only non-empty strings"
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Rewrite a tile according to `options`
pub fn localize(data: &[u8], options: &LocalizeOptions) -> Result<Vec<u8>> {
    options.validate()?;

    let decoded: Cow<'_, [u8]> = if is_compressed(data) {
        Cow::Owned(Decompressor::new().decompress(data)?)
    } else {
        Cow::Borrowed(data)
    };

    let policy = Policy::new(options);
    let reader = TileReader::parse(decoded.as_ref())?;
    let mut builder = TileBuilder::new();

    for layer in reader.layers() {
        let layer = layer?;
        let mut dest = LayerBuilder::new(layer.name(), layer.version(), layer.extent());
        for feature in layer.features() {
            policy.apply(&feature, &mut dest)?;
        }
        builder.add_layer(dest);
    }

    let buffer = builder.serialize()?;
    if options.compress {
        Compressor::new().compress(&buffer)
    } else {
        Ok(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = LocalizeOptions::default();
        assert_eq!(options.hidden_prefix, "_mbx_");
        assert_eq!(options.language_property, "name");
        assert_eq!(options.worldview_property, "worldview");
        assert_eq!(options.worldview_default, "US");
        assert_eq!(options.class_property, "class");
        assert!(options.languages.is_none());
        assert!(options.worldviews.is_none());
        assert!(!options.compress);
        options.validate().unwrap();
    }

    #[test]
    fn test_empty_strings_rejected() {
        let options = LocalizeOptions {
            language_property: String::new(),
            ..Default::default()
        };
        assert!(options.validate().is_err());

        let options = LocalizeOptions {
            languages: Some(vec!["en".to_owned(), String::new()]),
            ..Default::default()
        };
        assert!(options.validate().is_err());
    }

    #[test]
    fn test_empty_input() {
        let out = localize(&[], &LocalizeOptions::default()).unwrap();
        assert!(out.is_empty());
    }
}
