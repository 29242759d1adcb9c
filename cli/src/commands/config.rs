use std::path::Path;

use anyhow::{Result, anyhow};
use clap::Subcommand;
use relay_dispatch::{RelayCliFlags, RelayConfig, default_relay_config_path};

#[derive(Subcommand, PartialEq, Debug)]
pub enum ConfigCommands {
    /// Write a config file with the default settings
    Init {
        /// Overwrite an existing file
        #[arg(long, default_value_t = false)]
        force: bool,
    },
    /// Show the effective configuration, overrides included
    Show,
}

impl ConfigCommands {
    pub fn run(self, config_path: Option<&Path>) -> Result<String> {
        let path = config_path
            .map(Path::to_path_buf)
            .unwrap_or_else(default_relay_config_path);

        match self {
            ConfigCommands::Init { force } => {
                if path.exists() && !force {
                    return Err(anyhow!(
                        "config already exists at {} (use --force to overwrite)",
                        path.display()
                    ));
                }

                RelayConfig::default().save(Some(&path))?;
                Ok(format!("Wrote default config to {}", path.display()))
            }
            ConfigCommands::Show => {
                let config = RelayConfig::load(Some(&path), &RelayCliFlags::default())?;
                toml::to_string_pretty(&config)
                    .map_err(|e| anyhow!("failed to render config: {}", e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ConfigCommands;

    #[test]
    fn init_then_show() {
        let dir = match tempfile::tempdir() {
            Ok(dir) => dir,
            Err(error) => panic!("tempdir failed: {error}"),
        };
        let path = dir.path().join("relay.toml");

        if let Err(error) = (ConfigCommands::Init { force: false }).run(Some(&path)) {
            panic!("init failed: {error}");
        }
        let shown = match ConfigCommands::Show.run(Some(&path)) {
            Ok(shown) => shown,
            Err(error) => panic!("show failed: {error}"),
        };

        assert!(shown.contains("[broadcast]"));
        assert!(shown.contains("preview_limit = 100"));
    }

    #[test]
    fn init_refuses_to_overwrite() {
        let dir = match tempfile::tempdir() {
            Ok(dir) => dir,
            Err(error) => panic!("tempdir failed: {error}"),
        };
        let path = dir.path().join("relay.toml");
        if let Err(error) = std::fs::write(&path, "[broadcast]\n") {
            panic!("write failed: {error}");
        }

        assert!(ConfigCommands::Init { force: false }.run(Some(&path)).is_err());
        assert!(ConfigCommands::Init { force: true }.run(Some(&path)).is_ok());
    }
}
