use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {config_path}: {source}")]
    ConfigReadError {
        config_path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {config_path}: {source}")]
    ConfigParseError {
        config_path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid dimension value: {0:?}")]
    InvalidDimension(String),
}

/// Editor colour theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

/// A width/height option as written by the embedder: absolute pixels,
/// a percentage of the container, or `auto` (fill the container).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Dimension {
    #[default]
    Auto,
    Pixels(f64),
    Percent(f64),
}

impl Dimension {
    pub fn parse(input: &str) -> Result<Self, ConfigError> {
        let s = input.trim();
        if s.eq_ignore_ascii_case("auto") {
            return Ok(Dimension::Auto);
        }
        if let Some(pct) = s.strip_suffix('%') {
            return pct
                .trim()
                .parse::<f64>()
                .map(Dimension::Percent)
                .map_err(|_| ConfigError::InvalidDimension(input.to_string()));
        }
        let px = s.strip_suffix("px").unwrap_or(s).trim();
        px.parse::<f64>()
            .map(Dimension::Pixels)
            .map_err(|_| ConfigError::InvalidDimension(input.to_string()))
    }

    /// Resolve against the container extent on that axis.
    pub fn resolve(&self, container: f64) -> f64 {
        match self {
            Dimension::Auto => container,
            Dimension::Pixels(px) => *px,
            Dimension::Percent(pct) => container * pct / 100.0,
        }
    }
}

impl Serialize for Dimension {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let s = match self {
            Dimension::Auto => "auto".to_string(),
            Dimension::Pixels(px) => format!("{px}px"),
            Dimension::Percent(pct) => format!("{pct}%"),
        };
        serializer.serialize_str(&s)
    }
}

impl<'de> Deserialize<'de> for Dimension {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Dimension::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Style options as supplied by the embedder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleOptions {
    pub width: Dimension,
    pub height: Dimension,
    pub font_family: String,
    pub font_size: f64,
    pub line_height: f64,
}

impl Default for StyleOptions {
    fn default() -> Self {
        Self {
            width: Dimension::Auto,
            height: Dimension::Auto,
            font_family: "monospace".to_string(),
            font_size: 14.0,
            line_height: 22.0,
        }
    }
}

/// Style after resolving `auto`/percentage dimensions against the container.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedStyle {
    pub width: f64,
    pub height: f64,
    pub font_family: String,
    pub font_size: f64,
    pub line_height: f64,
}

impl StyleOptions {
    pub fn resolve(&self, container_width: f64, container_height: f64) -> ResolvedStyle {
        ResolvedStyle {
            width: self.width.resolve(container_width),
            height: self.height.resolve(container_height),
            font_family: self.font_family.clone(),
            font_size: self.font_size,
            line_height: self.line_height.max(self.font_size),
        }
    }
}

/// Options object accepted on editor mount.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorOptions {
    pub theme: Theme,
    pub style: StyleOptions,
    pub line_number: bool,
}

impl EditorOptions {
    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<Option<Self>, ConfigError> {
        let config_path = config_path.as_ref();
        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(config_path).map_err(|source| {
            ConfigError::ConfigReadError {
                config_path: config_path.to_path_buf(),
                source,
            }
        })?;

        let options: EditorOptions =
            toml::from_str(&content).map_err(|source| ConfigError::ConfigParseError {
                config_path: config_path.to_path_buf(),
                source,
            })?;

        Ok(Some(options))
    }

    pub fn load() -> Result<Option<Self>, ConfigError> {
        Self::load_from_path(Self::config_path())
    }

    pub fn save_to_path<P: AsRef<Path>>(&self, config_path: P) -> anyhow::Result<()> {
        let config_path = config_path.as_ref();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        let config_dir = shellexpand::tilde("~/.config/markdown-scribe");
        PathBuf::from(config_dir.as_ref()).join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parse_dimension_variants() {
        assert_eq!(Dimension::parse("auto").unwrap(), Dimension::Auto);
        assert_eq!(Dimension::parse("Auto").unwrap(), Dimension::Auto);
        assert_eq!(Dimension::parse("640px").unwrap(), Dimension::Pixels(640.0));
        assert_eq!(Dimension::parse("640").unwrap(), Dimension::Pixels(640.0));
        assert_eq!(Dimension::parse("75%").unwrap(), Dimension::Percent(75.0));
        assert!(Dimension::parse("wat").is_err());
    }

    #[test]
    fn resolve_style_against_container() {
        let style = StyleOptions {
            width: Dimension::Percent(50.0),
            height: Dimension::Auto,
            ..Default::default()
        };
        let resolved = style.resolve(800.0, 600.0);
        assert_eq!(resolved.width, 400.0);
        assert_eq!(resolved.height, 600.0);
    }

    #[test]
    fn line_height_never_below_font_size() {
        let style = StyleOptions {
            font_size: 30.0,
            line_height: 20.0,
            ..Default::default()
        };
        let resolved = style.resolve(100.0, 100.0);
        assert_eq!(resolved.line_height, 30.0);
    }

    #[test]
    fn toml_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let options = EditorOptions {
            theme: Theme::Dark,
            style: StyleOptions {
                width: Dimension::Pixels(720.0),
                ..Default::default()
            },
            line_number: true,
        };
        options.save_to_path(&path).unwrap();

        let loaded = EditorOptions::load_from_path(&path).unwrap().unwrap();
        assert_eq!(loaded, options);
    }

    #[test]
    fn load_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = EditorOptions::load_from_path(dir.path().join("nope.toml")).unwrap();
        assert_eq!(loaded, None);
    }
}
