//! Configuration
//!
//! Team rosters, protected branches and service endpoints live in
//! `~/.config/pr-pilot/config.toml`. A missing file loads defaults so the
//! local-only commands work out of the box.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Filename within the config directory
const CONFIG_FILE: &str = "config.toml";

/// Flux kanban settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct FluxConfig {
    /// GraphQL endpoint
    pub api_url: String,
    /// Board URL prefix used when commenting card links on PRs
    pub board_url: String,
    /// Stage that holds cards ready to publish
    pub publish_stage: String,
    /// Stage cards move to once every PR is merged
    pub merged_stage: String,
}

impl Default for FluxConfig {
    fn default() -> Self {
        Self {
            api_url: "https://isengard.fluxcontrol.com.br/api/graphql".to_string(),
            board_url: String::new(),
            publish_stage: String::new(),
            merged_stage: String::new(),
        }
    }
}

/// Google Sheets reporting settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct SheetsConfig {
    /// Spreadsheet receiving merged-PR report rows
    pub spreadsheet_id: String,
    /// Target range, e.g. "Merged!A:D"
    pub range: String,
}

/// Tool configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct Config {
    /// GitHub organization the aggregation commands query
    pub organization: String,
    /// Team name -> member logins
    pub teams: BTreeMap<String, Vec<String>>,
    /// Logins whose approval counts as a quality review
    pub quality_team: Vec<String>,
    /// Branches never touched by cleanup commands
    pub protected_branches: Vec<String>,
    /// Committer email prefixes belonging to bots, skipped when picking
    /// the workflow run to report
    pub bot_emails: Vec<String>,
    /// Flux settings
    pub flux: FluxConfig,
    /// Sheets settings
    pub sheets: SheetsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            organization: String::new(),
            teams: BTreeMap::new(),
            quality_team: Vec::new(),
            protected_branches: [
                "master",
                "main",
                "homolog",
                "production",
                "qa",
                "development",
                "preview",
            ]
            .iter()
            .map(ToString::to_string)
            .collect(),
            bot_emails: Vec::new(),
            flux: FluxConfig::default(),
            sheets: SheetsConfig::default(),
        }
    }
}

impl Config {
    /// Load from the default location, or defaults when the file is missing
    pub fn load() -> Result<Self> {
        Self::load_from(&default_path()?)
    }

    /// Load from an explicit path (tests use this)
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read {}: {e}", path.display())))?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse {}: {e}", path.display())))
    }

    /// The organization, or a config error telling the user to set it
    pub fn require_organization(&self) -> Result<&str> {
        if self.organization.is_empty() {
            return Err(Error::Config(
                "set `organization` in config.toml to use this command".to_string(),
            ));
        }
        Ok(&self.organization)
    }

    /// Roster for a team name
    pub fn team(&self, name: &str) -> Result<&[String]> {
        self.teams
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| Error::Config(format!("unknown team `{name}`")))
    }

    /// Team names in declaration order
    pub fn team_names(&self) -> Vec<&str> {
        self.teams.keys().map(String::as_str).collect()
    }
}

/// Path of the config file under the platform config directory
pub fn default_path() -> Result<PathBuf> {
    let dir = dirs::config_dir()
        .ok_or_else(|| Error::Config("could not locate the config directory".to_string()))?;
    Ok(dir.join("pr-pilot").join(CONFIG_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_loads_defaults() {
        let temp = TempDir::new().unwrap();
        let config = Config::load_from(&temp.path().join("nope.toml")).unwrap();
        assert!(config.organization.is_empty());
        assert!(config.protected_branches.contains(&"master".to_string()));
    }

    #[test]
    fn parses_teams_and_flux() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(CONFIG_FILE);
        std::fs::write(
            &path,
            r#"
organization = "acme"
quality_team = ["carol"]

[teams]
platform = ["alice", "bob"]

[flux]
api_url = "https://flux.example.com/api/graphql"
board_url = "https://flux.example.com/#/board/b1"
publish_stage = "stage-publish"
merged_stage = "stage-merged"
"#,
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.organization, "acme");
        assert_eq!(config.team("platform").unwrap(), ["alice", "bob"]);
        assert_eq!(config.flux.publish_stage, "stage-publish");
        assert!(config.team("ghosts").is_err());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(CONFIG_FILE);
        std::fs::write(&path, "organizaton = \"typo\"\n").unwrap();
        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn require_organization_errors_when_unset() {
        let config = Config::default();
        assert!(config.require_organization().is_err());
    }
}
