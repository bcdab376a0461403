use anyhow::{
    Context,
    Result,
    anyhow,
};
use chrono::Utc;
use serde::{
    Deserialize,
    Serialize,
};
use std::{
    collections::BTreeMap,
    fs,
    path::{
        Path,
        PathBuf,
    },
};

pub const SESSION_ROOT: &str = "~/.presale";
const SESSION_FILE: &str = "session.json";

/// On-disk layout of a session file.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreContents {
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub entries: BTreeMap<String, String>,
}

/// Durable string key-value store backed by a single JSON file.
#[derive(Clone, Debug)]
pub struct SessionFileStore {
    path: PathBuf,
}

impl SessionFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = ensure_store(path.into())?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<StoreContents> {
        read_contents(&self.path)
    }

    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let contents = read_contents(&self.path)?;
        Ok(contents.entries.get(key).cloned())
    }

    pub fn set(&self, key: &str, value: impl Into<String>) -> Result<()> {
        let mut contents = read_contents(&self.path)?;
        contents.entries.insert(key.to_string(), value.into());
        contents.updated_at = Some(Utc::now().to_rfc3339());
        write_contents(&self.path, &contents)
    }
}

pub fn resolve_store_path(raw: Option<&str>) -> PathBuf {
    match raw {
        Some(raw) => PathBuf::from(shellexpand::tilde(raw).into_owned()),
        None => default_store_path(),
    }
}

pub fn default_store_path() -> PathBuf {
    PathBuf::from(shellexpand::tilde(SESSION_ROOT).into_owned()).join(SESSION_FILE)
}

fn ensure_store(path: PathBuf) -> Result<PathBuf> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        fs::create_dir_all(parent).with_context(|| {
            format!("Failed to create session directory {}", parent.display())
        })?;
    }

    if !path.exists() {
        fs::write(&path, b"").with_context(|| {
            format!("Failed to initialize session file at {}", path.display())
        })?;
    }

    Ok(path)
}

fn read_contents(path: impl AsRef<Path>) -> Result<StoreContents> {
    let path = path.as_ref();
    let data = fs::read(path)
        .with_context(|| format!("Failed to read session file {}", path.display()))?;
    if data.iter().all(u8::is_ascii_whitespace) {
        return Ok(StoreContents::default());
    }
    serde_json::from_slice::<StoreContents>(&data).map_err(|e| {
        anyhow!(
            "Failed to parse session file {}; expected a JSON object: {e}",
            path.display()
        )
    })
}

fn write_contents(path: impl AsRef<Path>, contents: &StoreContents) -> Result<()> {
    let path = path.as_ref();
    let json = serde_json::to_vec_pretty(contents)
        .context("Failed to serialize session contents")?;
    let staging = path.with_extension("json.tmp");
    fs::write(&staging, json).context("Failed to write session file")?;
    fs::rename(&staging, path).context("Failed to replace session file")?;
    Ok(())
}
