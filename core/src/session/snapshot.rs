use std::fs;
use std::path::PathBuf;

use serde::Deserialize;
use serde_json::Map;
use serde_json::Value;

use super::CookieJar;
use super::CookieStore;
use super::RuntimeConfig;
use super::SessionError;
use super::SessionProvider;

/// On-disk session snapshot exported from a signed-in host.
#[derive(Debug, Default, Deserialize)]
struct SnapshotFile {
    #[serde(default)]
    ytcfg: Option<Value>,
    #[serde(default)]
    cookies: String,
}

/// Session backed by a JSON snapshot file.
///
/// The file is re-read on every call so an updated export is picked up by
/// the next mutation without restarting.
#[derive(Debug, Clone)]
pub struct SnapshotSession {
    file_path: PathBuf,
}

impl SnapshotSession {
    pub fn with_path(path: PathBuf) -> Self {
        Self { file_path: path }
    }

    fn read_snapshot(&self) -> Result<SnapshotFile, SessionError> {
        let content = fs::read_to_string(&self.file_path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn read_cookies(&self) -> CookieJar {
        match self.read_snapshot() {
            Ok(snapshot) => CookieJar::parse(&snapshot.cookies),
            Err(err) => {
                tracing::debug!(path = %self.file_path.display(), "no cookies in session snapshot: {err}");
                CookieJar::default()
            }
        }
    }
}

impl SessionProvider for SnapshotSession {
    fn current_config(&self) -> Result<RuntimeConfig, SessionError> {
        if !self.file_path.exists() {
            return Err(SessionError::Unavailable);
        }
        let snapshot = self.read_snapshot()?;
        let values: Option<&Map<String, Value>> = snapshot.ytcfg.as_ref().and_then(Value::as_object);
        RuntimeConfig::from_host_values(values)
    }
}

impl CookieStore for SnapshotSession {
    fn cookie_jar(&self) -> CookieJar {
        self.read_cookies()
    }
}
