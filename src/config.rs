use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use crate::input::InputSet;
use crate::inline::OutputFormat;

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct InlineConfig {
    #[serde(default)]
    pub inputs: InputsConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Input locations. Explicit per-collection paths win over `dir`.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct InputsConfig {
    pub dir: Option<String>,
    pub statements: Option<String>,
    pub categorical: Option<String>,
    pub contextual: Option<String>,
    pub sequences: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct OutputConfig {
    pub format: Option<OutputFormat>,
    pub path: Option<String>,
    pub compact: Option<bool>,
    pub skip_errors: Option<bool>,
    pub jobs: Option<usize>,
}

impl InputsConfig {
    /// Overlay `other` on top of `self`; set fields in `other` win
    pub fn merged_with(&self, other: &InputsConfig) -> InputsConfig {
        InputsConfig {
            dir: other.dir.clone().or_else(|| self.dir.clone()),
            statements: other.statements.clone().or_else(|| self.statements.clone()),
            categorical: other.categorical.clone().or_else(|| self.categorical.clone()),
            contextual: other.contextual.clone().or_else(|| self.contextual.clone()),
            sequences: other.sequences.clone().or_else(|| self.sequences.clone()),
        }
    }

    /// Resolve to concrete paths. Every collection needs either its own
    /// path or a `dir` to fall back on.
    pub fn resolve(&self) -> anyhow::Result<InputSet> {
        let defaults = self.dir.as_deref().map(|dir| InputSet::from_dir(Path::new(dir)));

        let pick = |explicit: &Option<String>, fallback: Option<&PathBuf>, name: &str| -> anyhow::Result<PathBuf> {
            match (explicit, fallback) {
                (Some(path), _) => Ok(PathBuf::from(path)),
                (None, Some(path)) => Ok(path.clone()),
                (None, None) => anyhow::bail!("no path for {} (set --{} or --input-dir)", name, name),
            }
        };

        Ok(InputSet {
            statements: pick(&self.statements, defaults.as_ref().map(|d| &d.statements), "statements")?,
            categorical: pick(&self.categorical, defaults.as_ref().map(|d| &d.categorical), "categorical")?,
            contextual: pick(&self.contextual, defaults.as_ref().map(|d| &d.contextual), "contextual")?,
            sequences: pick(&self.sequences, defaults.as_ref().map(|d| &d.sequences), "sequences")?,
        })
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("vrs-inline.toml")
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<InlineConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: InlineConfig = toml::from_str(&contents)?;
    Ok(Some(config))
}

pub fn write_config(path: &Path, config: &InlineConfig, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("config already exists at {} (use --force to overwrite)", path.display());
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}

/// Starting point written by `vrs-inline init`
pub fn template_config() -> InlineConfig {
    InlineConfig {
        inputs: InputsConfig {
            dir: Some("data".to_string()),
            ..Default::default()
        },
        output: OutputConfig {
            format: Some(OutputFormat::Json),
            path: Some("gk-pilot.json".to_string()),
            compact: Some(false),
            skip_errors: Some(false),
            jobs: Some(1),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_config_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_config(Some(&dir.path().join("absent.toml"))).unwrap().is_none());
    }

    #[test]
    fn test_write_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vrs-inline.toml");

        write_config(&path, &template_config(), false).unwrap();
        let loaded = load_config(Some(&path)).unwrap().unwrap();
        assert_eq!(loaded, template_config());

        // refuses to clobber without force
        assert!(write_config(&path, &InlineConfig::default(), false).is_err());
        write_config(&path, &InlineConfig::default(), true).unwrap();
        assert_eq!(load_config(Some(&path)).unwrap().unwrap(), InlineConfig::default());
    }

    #[test]
    fn test_parse_partial_config() {
        let config: InlineConfig = toml::from_str(
            r#"
            [inputs]
            dir = "/data/clinvar"
            statements = "/data/stmts_before.json"

            [output]
            format = "ndjson"
            "#,
        )
        .unwrap();

        assert_eq!(config.output.format, Some(OutputFormat::Ndjson));
        let inputs = config.inputs.resolve().unwrap();
        assert_eq!(inputs.statements, PathBuf::from("/data/stmts_before.json"));
        assert_eq!(inputs.categorical, PathBuf::from("/data/clinvar/catvars.json"));
    }

    #[test]
    fn test_resolve_requires_every_path() {
        let inputs = InputsConfig {
            statements: Some("s.json".to_string()),
            ..Default::default()
        };
        let err = inputs.resolve().unwrap_err();
        assert!(err.to_string().contains("categorical"));
    }

    #[test]
    fn test_merge_prefers_overrides() {
        let base = InputsConfig {
            dir: Some("base".to_string()),
            sequences: Some("base-seq.json".to_string()),
            ..Default::default()
        };
        let cli = InputsConfig {
            sequences: Some("cli-seq.json".to_string()),
            ..Default::default()
        };

        let merged = base.merged_with(&cli);
        assert_eq!(merged.dir.as_deref(), Some("base"));
        assert_eq!(merged.sequences.as_deref(), Some("cli-seq.json"));
    }
}
