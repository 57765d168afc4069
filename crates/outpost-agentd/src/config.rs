use std::{
    collections::HashSet,
    net::SocketAddr,
    path::{Path, PathBuf},
    time::Duration,
};

use outpost_api::ControlConfig;
use outpost_model::{ExecUser, ProcKind, ProcSpec, RestartPolicy};
use outpost_observe::LoggerConfig;
use serde::Deserialize;
use thiserror::Error;

/// Environment variable overriding [`DEFAULT_CONFIG_PATH`].
pub const CONFIG_ENV: &str = "OUTPOST_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "/opt/outpost/config.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("authKey must not be empty")]
    EmptyAuthKey,
    #[error("duplicate process name: {0}")]
    DuplicateProcess(String),
    #[error("process {0}: exec must not be empty")]
    EmptyExec(String),
    #[error("process {process}: unknown dependency {after}")]
    UnknownAfter { process: String, after: String },
}

/// Daemon configuration file.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentConfig {
    pub auth_key: String,
    #[serde(default = "default_listen")]
    pub listen_addr: SocketAddr,
    #[serde(default = "default_interior")]
    pub interior_addr: SocketAddr,
    #[serde(default = "default_upstream")]
    pub upstream_addr: String,
    #[serde(default = "default_cert")]
    pub tls_cert: PathBuf,
    #[serde(default = "default_key")]
    pub tls_key: PathBuf,
    #[serde(default)]
    pub logging: LoggerConfig,
    #[serde(default)]
    pub processes: Vec<ProcessConfig>,
}

/// One supervised process.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessConfig {
    pub name: String,
    pub exec: PathBuf,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub restart: RestartPolicy,
    /// Fixed restart delay; jitter when absent.
    #[serde(default)]
    pub restart_delay_ms: Option<u64>,
    #[serde(default)]
    pub user: ExecUser,
    #[serde(default)]
    pub kind: ProcKind,
    /// Names of processes that must be started (daemons) or finished (one-shots) first.
    #[serde(default)]
    pub after: Vec<String>,
}

fn default_listen() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8521))
}

fn default_interior() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 2000))
}

fn default_upstream() -> String {
    "127.0.0.1:9000".to_string()
}

fn default_cert() -> PathBuf {
    PathBuf::from("/opt/outpost/server.crt")
}

fn default_key() -> PathBuf {
    PathBuf::from("/opt/outpost/server.key")
}

impl AgentConfig {
    /// Path from `OUTPOST_CONFIG`, or the default location.
    pub fn path_from_env() -> PathBuf {
        std::env::var_os(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw)
    }

    /// Parses and validates.
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let cfg: Self = serde_json::from_str(raw)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auth_key.is_empty() {
            return Err(ConfigError::EmptyAuthKey);
        }

        let mut names = HashSet::new();
        for p in &self.processes {
            if !names.insert(p.name.as_str()) {
                return Err(ConfigError::DuplicateProcess(p.name.clone()));
            }
            if p.exec.as_os_str().is_empty() {
                return Err(ConfigError::EmptyExec(p.name.clone()));
            }
        }
        for p in &self.processes {
            if let Some(after) = p.after.iter().find(|a| !names.contains(a.as_str())) {
                return Err(ConfigError::UnknownAfter {
                    process: p.name.clone(),
                    after: after.clone(),
                });
            }
        }
        Ok(())
    }

    pub fn control_config(&self) -> ControlConfig {
        ControlConfig {
            listen_addr: self.listen_addr,
            upstream_addr: self.upstream_addr.clone(),
            tls_cert: self.tls_cert.clone(),
            tls_key: self.tls_key.clone(),
            ..Default::default()
        }
    }
}

impl ProcessConfig {
    pub fn to_spec(&self) -> ProcSpec {
        let spec = ProcSpec::new(&self.exec)
            .with_args(self.args.iter().cloned())
            .with_description(self.name.clone())
            .with_user(self.user)
            .with_restart(self.restart)
            .with_kind(self.kind);
        match self.restart_delay_ms {
            Some(ms) => spec.with_restart_delay(Duration::from_millis(ms)),
            None => spec.with_random_delay(),
        }
    }
}

#[cfg(test)]
mod tests {
    use outpost_model::RestartDelay;

    use super::*;

    const SAMPLE: &str = r#"{
        "authKey": "secret",
        "listenAddr": "0.0.0.0:9443",
        "logging": { "format": "json", "level": "debug" },
        "processes": [
            { "name": "setup", "exec": "/opt/outpost/bin/runner", "args": ["--setup"],
              "restart": "never", "user": "privileged", "kind": "oneShot" },
            { "name": "launcher", "exec": "/opt/outpost/bin/runner", "args": ["--launcher"],
              "restart": "onFailure", "restartDelayMs": 1500, "after": ["setup"] }
        ]
    }"#;

    #[test]
    fn parses_sample_with_defaults() {
        let cfg = AgentConfig::from_json(SAMPLE).unwrap();
        assert_eq!(cfg.listen_addr, "0.0.0.0:9443".parse().unwrap());
        assert_eq!(cfg.interior_addr, "127.0.0.1:2000".parse().unwrap());
        assert_eq!(cfg.upstream_addr, "127.0.0.1:9000");
        assert_eq!(cfg.tls_cert, PathBuf::from("/opt/outpost/server.crt"));
        assert_eq!(cfg.logging.level, "debug");
        assert_eq!(cfg.processes.len(), 2);
        assert_eq!(cfg.processes[1].after, vec!["setup".to_string()]);
    }

    #[test]
    fn process_to_spec() {
        let cfg = AgentConfig::from_json(SAMPLE).unwrap();

        let setup = cfg.processes[0].to_spec();
        assert_eq!(setup.kind(), ProcKind::OneShot);
        assert_eq!(setup.restart(), RestartPolicy::Never);
        assert_eq!(setup.user(), ExecUser::Privileged);
        assert_eq!(setup.delay(), RestartDelay::Jitter);
        assert_eq!(setup.description(), "setup");

        let launcher = cfg.processes[1].to_spec();
        assert_eq!(launcher.kind(), ProcKind::Daemon);
        assert_eq!(launcher.restart(), RestartPolicy::OnFailure);
        assert_eq!(launcher.delay(), RestartDelay::Fixed(Duration::from_millis(1500)));
        assert_eq!(launcher.args(), ["--launcher".to_string()]);
    }

    #[test]
    fn one_shot_with_default_restart_is_demoted() {
        let raw = r#"{"authKey":"k","processes":[{"name":"a","exec":"/bin/true","kind":"oneShot"}]}"#;
        let spec = AgentConfig::from_json(raw).unwrap().processes[0].to_spec();
        assert_eq!(spec.kind(), ProcKind::OneShot);
        assert_eq!(spec.restart(), RestartPolicy::OnFailure);
    }

    #[test]
    fn rejects_empty_auth_key() {
        let err = AgentConfig::from_json(r#"{"authKey":""}"#).unwrap_err();
        assert!(matches!(err, ConfigError::EmptyAuthKey));
    }

    #[test]
    fn rejects_missing_auth_key() {
        let err = AgentConfig::from_json("{}").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn rejects_duplicate_names() {
        let raw = r#"{"authKey":"k","processes":[
            {"name":"a","exec":"/bin/true"},{"name":"a","exec":"/bin/false"}]}"#;
        let err = AgentConfig::from_json(raw).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateProcess(n) if n == "a"));
    }

    #[test]
    fn rejects_empty_exec() {
        let raw = r#"{"authKey":"k","processes":[{"name":"a","exec":""}]}"#;
        let err = AgentConfig::from_json(raw).unwrap_err();
        assert!(matches!(err, ConfigError::EmptyExec(n) if n == "a"));
    }

    #[test]
    fn rejects_unknown_after() {
        let raw = r#"{"authKey":"k","processes":[{"name":"a","exec":"/bin/true","after":["ghost"]}]}"#;
        let err = AgentConfig::from_json(raw).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownAfter { after, .. } if after == "ghost"));
    }

    #[test]
    fn load_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("config.json");
        let err = AgentConfig::load(&missing).unwrap_err();
        assert!(err.to_string().contains("config.json"));

        std::fs::write(&missing, SAMPLE).unwrap();
        assert!(AgentConfig::load(&missing).is_ok());
    }
}
