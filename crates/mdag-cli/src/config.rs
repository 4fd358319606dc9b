use std::path::Path;

use anyhow::Context;
use mdag_crypto::HashAlgorithm;
use mdag_dag::DagConfig;
use mdag_store::FsStoreConfig;
use serde::{Deserialize, Serialize};

/// Contents of a `--config` file.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub dag: DagConfig,
    pub store: FsStoreConfig,
}

impl FileConfig {
    /// Read `path`, or return defaults when no file is given.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }
}

/// Settings a store is bound to once its first DAG is added, kept in
/// `format.toml` at the store root.
///
/// Digests are only meaningful under the algorithm that produced them, so
/// later commands read it from here instead of from flags or `[dag]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreFormat {
    pub hash: HashAlgorithm,
}

impl StoreFormat {
    const FILE: &'static str = "format.toml";

    /// The recorded format, or `None` for a store nothing was added to.
    pub fn load(store: &Path) -> anyhow::Result<Option<Self>> {
        let path = store.join(Self::FILE);
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| format!("reading store format {}", path.display()))
            }
        };
        toml::from_str(&text)
            .map(Some)
            .with_context(|| format!("parsing store format {}", path.display()))
    }

    pub fn save(&self, store: &Path) -> anyhow::Result<()> {
        let path = store.join(Self::FILE);
        let text = toml::to_string(self).context("serializing store format")?;
        std::fs::write(&path, text)
            .with_context(|| format!("writing store format {}", path.display()))
    }
}
