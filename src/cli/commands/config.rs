//! Config command implementation.

use crate::cli::{ConfigAction, Output};
use crate::config::Settings;
use anyhow::Result;
use std::path::Path;

/// Run the config command.
///
/// `file_settings` are the settings as read from `config_path`; `settings` also
/// carry the command-line overrides. Only the former are ever written back.
pub fn run_config(
    action: &ConfigAction,
    config_path: &Path,
    file_settings: &Settings,
    settings: &Settings,
) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let toml_str = toml::to_string_pretty(settings)
                .map_err(|e| anyhow::anyhow!("Failed to serialize config: {}", e))?;
            println!("{}", toml_str);
        }

        ConfigAction::Init => {
            if config_path.exists() {
                Output::warning(&format!("Config already exists at {:?}", config_path));
            } else {
                file_settings.save_to(&config_path.to_path_buf())?;
                Output::success(&format!("Created default config at {:?}", config_path));
            }
        }

        ConfigAction::Path => {
            println!("{}", config_path.display());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_writes_to_given_path_without_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let file_settings = Settings::default();
        let mut settings = file_settings.clone();
        settings.corpus.path = "override.txt".to_string();

        run_config(&ConfigAction::Init, &path, &file_settings, &settings).unwrap();

        let saved = Settings::load_from(Some(&path)).unwrap();
        assert_eq!(saved.corpus.path, Settings::default().corpus.path);
    }

    #[test]
    fn test_init_keeps_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[rag]\ntop_k = 3\n").unwrap();

        let settings = Settings::default();
        run_config(&ConfigAction::Init, &path, &settings, &settings).unwrap();

        let saved = Settings::load_from(Some(&path)).unwrap();
        assert_eq!(saved.rag.top_k, 3);
    }
}
