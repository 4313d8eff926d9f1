//! Load a settings object from the config locations.

use std::{
    env,
    path::{Path, PathBuf},
};

use config::{Config, Environment, File};
use eyre::{eyre, Context, Result};

use super::{RawSettings, Settings};

const DEFAULT_CONFIG_DIR: &str = "./config";
const ENV_PREFIX: &str = "SA";

/// Deserialize and validate settings from the config locations.
pub fn load_settings() -> Result<Settings> {
    let config_files: Vec<PathBuf> = env::var("CONFIG_FILES")
        .map(|s| s.split(',').map(PathBuf::from).collect())
        .unwrap_or_default();
    let environment = Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true);

    let raw = load_raw_settings(Path::new(DEFAULT_CONFIG_DIR), &config_files, environment)?;
    let settings = raw.parse().context("Invalid settings")?;
    tracing::debug!(?settings, "Loaded settings");
    Ok(settings)
}

fn json_files_in(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(vec![]);
    }
    let mut files = vec![];
    for entry in dir.read_dir().context("Failed to open config directory")? {
        let path = entry.context("Failed to read config directory")?.path();
        if path.is_file() && path.extension() == Some("json".as_ref()) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

pub(super) fn load_raw_settings(
    config_dir: &Path,
    config_files: &[PathBuf],
    environment: Environment,
) -> Result<RawSettings> {
    let mut builder = Config::builder();

    // Default config files, in name order
    for path in json_files_in(config_dir)? {
        builder = builder.add_source(File::from(path));
    }

    // Additional user specified config files
    for p in config_files {
        if p.is_file() {
            if p.extension() == Some("json".as_ref()) {
                builder = builder.add_source(File::from(p.clone()));
            } else {
                return Err(eyre!(
                    "Provided config path via CONFIG_FILES is of an unsupported type ({p:?})"
                ));
            }
        } else if !p.exists() {
            return Err(eyre!(
                "Provided config path via CONFIG_FILES does not exist ({p:?})"
            ));
        } else {
            return Err(eyre!(
                "Provided config path via CONFIG_FILES is not a file ({p:?})"
            ));
        }
    }

    let config = builder
        .add_source(environment)
        .build()
        .context("Failed to load config sources")?;

    config
        .try_deserialize::<RawSettings>()
        .context("Config deserialization error")
}

#[cfg(test)]
mod tests {
    use std::fs;

    use maplit::hashmap;

    use super::*;

    fn no_env() -> Environment {
        Environment::with_prefix("SA_LOADER_TEST_UNSET")
    }

    #[test]
    fn later_files_override_earlier_ones() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("a.json"),
            r#"{"projectId": "from-a", "chainId": 1}"#,
        )
        .unwrap();
        fs::write(dir.path().join("b.json"), r#"{"projectId": "from-b"}"#).unwrap();
        fs::write(dir.path().join("ignored.toml"), "projectId = 'nope'").unwrap();

        let raw = load_raw_settings(dir.path(), &[], no_env()).unwrap();
        assert_eq!(raw.project_id.as_deref(), Some("from-b"));
        assert_eq!(raw.chain_id, Some(1));
    }

    #[test]
    fn extra_files_override_the_config_directory() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("base.json"), r#"{"projectId": "base"}"#).unwrap();
        let extra = tempfile::tempdir().unwrap();
        let extra_file = extra.path().join("override.json");
        fs::write(
            &extra_file,
            r#"{"projectId": "override", "tracing": {"level": "debug"}}"#,
        )
        .unwrap();

        let raw = load_raw_settings(dir.path(), &[extra_file], no_env()).unwrap();
        assert_eq!(raw.project_id.as_deref(), Some("override"));
        assert_eq!(raw.tracing.level, super::super::Level::Debug);
    }

    #[test]
    fn missing_extra_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_raw_settings(
            dir.path(),
            &[dir.path().join("missing.json")],
            no_env(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn missing_config_directory_is_fine() {
        let raw = load_raw_settings(Path::new("./definitely/not/here"), &[], no_env()).unwrap();
        assert!(raw.project_id.is_none());
    }

    #[test]
    fn environment_overrides_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("base.json"),
            r#"{"projectId": "from-file", "maxAwaitRounds": 5}"#,
        )
        .unwrap();
        let environment = Environment::with_prefix("SA")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
            .source(Some(hashmap! {
                "SA_PROJECTID".to_owned() => "from-env".to_owned(),
                "SA_TRACING__LEVEL".to_owned() => "trace".to_owned(),
            }));

        let raw = load_raw_settings(dir.path(), &[], environment).unwrap();
        assert_eq!(raw.project_id.as_deref(), Some("from-env"));
        assert_eq!(raw.max_await_rounds, Some(5));
        assert_eq!(raw.tracing.level, super::super::Level::Trace);
    }
}
