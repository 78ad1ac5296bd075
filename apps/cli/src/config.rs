use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use accounting_core::{IdentityResolver, IdentityRule, IdentityRuleError};
use serde::Deserialize;

use crate::args::CliArgs;

const DEFAULT_SQLITE_DB: &str = "pbs.db";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("read config {}: {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("parse config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("unknown storage engine '{0}', valid values are: sqlite, mysql")]
    UnknownEngine(String),
    #[error("storage engine '{0}' is not available in this build")]
    UnsupportedEngine(String),
    #[error("identity rules: {0}")]
    Rules(#[from] IdentityRuleError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageEngine {
    Sqlite,
}

impl FromStr for StorageEngine {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "sqlite" => Ok(Self::Sqlite),
            "mysql" => Err(ConfigError::UnsupportedEngine(value.to_string())),
            other => Err(ConfigError::UnknownEngine(other.to_string())),
        }
    }
}

/// `[database]` table of the config file. Every key overrides the command line.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseSection {
    pub engine: Option<String>,
    pub db: Option<String>,
    pub host: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
}

/// `[identity]` table of the config file, or the whole standalone rules file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RulesSection {
    #[serde(default)]
    pub rules: Vec<IdentityRule>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(default)]
    pub database: DatabaseSection,
    pub identity: Option<RulesSection>,
}

#[derive(Clone)]
pub struct StoreConfig {
    pub engine: StorageEngine,
    pub db: String,
    pub host: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
}

impl std::fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreConfig")
            .field("engine", &self.engine)
            .field("db", &self.db)
            .field("host", &self.host)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Everything a run needs, resolved once at startup.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub store: StoreConfig,
    pub create_table: bool,
    pub resolver: IdentityResolver,
    pub logs: Vec<PathBuf>,
}

fn load_toml<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

pub fn resolve(args: &CliArgs) -> Result<RunConfig, ConfigError> {
    let file = match &args.config_file {
        Some(path) => load_toml::<ConfigFile>(path)?,
        None => ConfigFile::default(),
    };
    let database = file.database;

    let engine = database
        .engine
        .as_deref()
        .unwrap_or(args.engine.as_str())
        .parse::<StorageEngine>()?;
    let db = database
        .db
        .or_else(|| args.db.clone())
        .unwrap_or_else(|| match engine {
            StorageEngine::Sqlite => DEFAULT_SQLITE_DB.to_string(),
        });
    let store = StoreConfig {
        engine,
        db,
        host: database.host.or_else(|| args.host.clone()),
        user: database.user.or_else(|| args.user.clone()),
        password: database.password.or_else(|| args.password.clone()),
    };

    let rules = match (file.identity, &args.identity_rules) {
        (Some(section), _) => Some(section.rules),
        (None, Some(path)) => Some(load_toml::<RulesSection>(path)?.rules),
        (None, None) => None,
    };
    let resolver = match rules {
        Some(rules) => IdentityResolver::new(rules)?,
        None => IdentityResolver::builtin(),
    };

    Ok(RunConfig {
        store,
        create_table: args.create_table,
        resolver,
        logs: args.logs.clone(),
    })
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    fn parse(args: &[&str]) -> CliArgs {
        CliArgs::parse_from(std::iter::once("pbs-accounting").chain(args.iter().copied()))
    }

    fn write(dir: &Path, name: &str, contents: &str) -> String {
        let path = dir.join(name);
        fs::write(&path, contents).expect("write file");
        path.to_string_lossy().to_string()
    }

    #[test]
    fn defaults_to_sqlite_file() {
        let config = resolve(&parse(&["a.log", "b.log"])).expect("config");
        assert_eq!(config.store.engine, StorageEngine::Sqlite);
        assert_eq!(config.store.db, DEFAULT_SQLITE_DB);
        assert!(!config.create_table);
        assert_eq!(config.logs.len(), 2);
        assert_eq!(config.resolver, IdentityResolver::builtin());
    }

    #[test]
    fn command_line_values_are_used() {
        let config = resolve(&parse(&["-c", "-D", "/tmp/acct.db", "-u", "pbs", "x.log"]))
            .expect("config");
        assert!(config.create_table);
        assert_eq!(config.store.db, "/tmp/acct.db");
        assert_eq!(config.store.user.as_deref(), Some("pbs"));
    }

    #[test]
    fn config_file_overrides_command_line() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = write(
            dir.path(),
            "pbs.toml",
            r#"
            [database]
            db = "/srv/pbs.db"
            user = "reader"
            password = "secret"
            "#,
        );
        let config =
            resolve(&parse(&["-f", &path, "-D", "ignored.db", "-u", "pbs"])).expect("config");
        assert_eq!(config.store.db, "/srv/pbs.db");
        assert_eq!(config.store.user.as_deref(), Some("reader"));
        assert_eq!(config.store.password.as_deref(), Some("secret"));
        assert!(!format!("{:?}", config.store).contains("secret"));
    }

    #[test]
    fn rejects_unknown_and_unsupported_engines() {
        assert!(matches!(
            resolve(&parse(&["-e", "oracle"])),
            Err(ConfigError::UnknownEngine(name)) if name == "oracle"
        ));
        assert!(matches!(
            resolve(&parse(&["-e", "mysql"])),
            Err(ConfigError::UnsupportedEngine(_))
        ));
    }

    #[test]
    fn rejects_unrecognized_config_options() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = write(dir.path(), "pbs.toml", "[database]\ntimescale = \"weekly\"\n");
        assert!(matches!(
            resolve(&parse(&["-f", &path])),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn missing_config_file_is_an_error() {
        assert!(matches!(
            resolve(&parse(&["-f", "/nonexistent/pbs.toml"])),
            Err(ConfigError::Read { .. })
        ));
    }

    #[test]
    fn identity_rules_come_from_config_or_rules_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let rules = write(
            dir.path(),
            "rules.toml",
            r#"
            [[rules]]
            groups = ["hpc"]
            vo = "campus"
            "#,
        );
        let config = resolve(&parse(&["--identity-rules", &rules])).expect("config");
        assert_eq!(config.resolver.resolve("u", "hpc").vo, "campus");
        assert_eq!(config.resolver.resolve("atlasprd", "x").vo, "x");

        let file = write(
            dir.path(),
            "pbs.toml",
            r#"
            [[identity.rules]]
            users = ["svc"]
            vo = "ops"
            role = "service"
            "#,
        );
        let config =
            resolve(&parse(&["-f", &file, "--identity-rules", &rules])).expect("config");
        assert_eq!(config.resolver.rules().len(), 1);
        assert_eq!(config.resolver.resolve("svc", "hpc").role, "service");
    }

    #[test]
    fn invalid_identity_rule_is_a_config_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let rules = write(dir.path(), "rules.toml", "[[rules]]\nvo = \"atlas\"\n");
        assert!(matches!(
            resolve(&parse(&["--identity-rules", &rules])),
            Err(ConfigError::Rules(IdentityRuleError::EmptyMatcher { index: 0 }))
        ));
    }
}
