//! Hardware catalog: sources and the explicit per-process cache

use futures::future::{join_all, BoxFuture};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

use crate::models::{Board, Extruder, Hotend, PrinterDefinition, Probe};
use crate::{ConfigResult, ConfiguratorError};

/// Prefix of the comment lines carrying catalog metadata in `.cfg` entries
pub const METADATA_PREFIX: &str = "#@";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CatalogKind {
    Boards,
    Hotends,
    Extruders,
    Probes,
    Printers,
}

impl CatalogKind {
    pub const ALL: [CatalogKind; 5] = [
        CatalogKind::Boards,
        CatalogKind::Hotends,
        CatalogKind::Extruders,
        CatalogKind::Probes,
        CatalogKind::Printers,
    ];

    /// Directory below the configuration root holding this category
    pub fn directory(&self) -> &'static str {
        match self {
            CatalogKind::Boards => "boards",
            CatalogKind::Hotends => "hotends",
            CatalogKind::Extruders => "extruders",
            CatalogKind::Probes => "z-probe",
            CatalogKind::Printers => "printers",
        }
    }

    /// Definition file inside each entry directory; `None` for `.cfg` categories
    pub fn definition_file(&self) -> Option<&'static str> {
        match self {
            CatalogKind::Boards => Some("board-definition.json"),
            CatalogKind::Printers => Some("printer-definition.json"),
            _ => None,
        }
    }
}

impl fmt::Display for CatalogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CatalogKind::Boards => "boards",
            CatalogKind::Hotends => "hotends",
            CatalogKind::Extruders => "extruders",
            CatalogKind::Probes => "probes",
            CatalogKind::Printers => "printers",
        };
        f.write_str(name)
    }
}

impl FromStr for CatalogKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "boards" => Ok(CatalogKind::Boards),
            "hotends" => Ok(CatalogKind::Hotends),
            "extruders" => Ok(CatalogKind::Extruders),
            "probes" | "z-probe" => Ok(CatalogKind::Probes),
            "printers" => Ok(CatalogKind::Printers),
            _ => Err(format!("Invalid catalog: {}", s)),
        }
    }
}

/// Entries of one catalog category
#[derive(Debug, Clone)]
pub enum CatalogEntries {
    Boards(Arc<Vec<Board>>),
    Hotends(Arc<Vec<Hotend>>),
    Extruders(Arc<Vec<Extruder>>),
    Probes(Arc<Vec<Probe>>),
    Printers(Arc<Vec<PrinterDefinition>>),
}

impl CatalogEntries {
    pub fn empty(kind: CatalogKind) -> Self {
        match kind {
            CatalogKind::Boards => CatalogEntries::Boards(Arc::default()),
            CatalogKind::Hotends => CatalogEntries::Hotends(Arc::default()),
            CatalogKind::Extruders => CatalogEntries::Extruders(Arc::default()),
            CatalogKind::Probes => CatalogEntries::Probes(Arc::default()),
            CatalogKind::Printers => CatalogEntries::Printers(Arc::default()),
        }
    }

    pub fn kind(&self) -> CatalogKind {
        match self {
            CatalogEntries::Boards(_) => CatalogKind::Boards,
            CatalogEntries::Hotends(_) => CatalogKind::Hotends,
            CatalogEntries::Extruders(_) => CatalogKind::Extruders,
            CatalogEntries::Probes(_) => CatalogKind::Probes,
            CatalogEntries::Printers(_) => CatalogKind::Printers,
        }
    }

    pub fn len(&self) -> usize {
        self.ids().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn ids(&self) -> Vec<&str> {
        fn collect<T: CatalogEntry>(entries: &[T]) -> Vec<&str> {
            entries.iter().map(CatalogEntry::id).collect()
        }
        match self {
            CatalogEntries::Boards(entries) => collect(entries),
            CatalogEntries::Hotends(entries) => collect(entries),
            CatalogEntries::Extruders(entries) => collect(entries),
            CatalogEntries::Probes(entries) => collect(entries),
            CatalogEntries::Printers(entries) => collect(entries),
        }
    }

    /// JSON view of the entries for listing
    pub fn to_json(&self) -> serde_json::Result<serde_json::Value> {
        match self {
            CatalogEntries::Boards(entries) => serde_json::to_value(entries.as_ref()),
            CatalogEntries::Hotends(entries) => serde_json::to_value(entries.as_ref()),
            CatalogEntries::Extruders(entries) => serde_json::to_value(entries.as_ref()),
            CatalogEntries::Probes(entries) => serde_json::to_value(entries.as_ref()),
            CatalogEntries::Printers(entries) => serde_json::to_value(entries.as_ref()),
        }
    }
}

/// A catalog entry identified by its file or directory name
pub trait CatalogEntry {
    fn id(&self) -> &str;
    fn set_id(&mut self, id: String);
}

macro_rules! impl_catalog_entry {
    ($($entry:ty),*) => {
        $(impl CatalogEntry for $entry {
            fn id(&self) -> &str {
                &self.id
            }

            fn set_id(&mut self, id: String) {
                self.id = id;
            }
        })*
    };
}

impl_catalog_entry!(Board, Hotend, Extruder, Probe, PrinterDefinition);

/// Looks up an entry by ID
pub fn find_entry<'a, T: CatalogEntry>(entries: &'a [T], id: &str) -> Option<&'a T> {
    entries.iter().find(|entry| entry.id() == id)
}

/// Where catalog entries come from
pub trait CatalogSource: Send + Sync {
    fn load(&self, kind: CatalogKind) -> BoxFuture<'_, ConfigResult<CatalogEntries>>;
}

/// Catalog read from the configuration directory
#[derive(Debug, Clone)]
pub struct DirectoryCatalog {
    root: PathBuf,
}

impl DirectoryCatalog {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    #[instrument(skip(self), fields(root = %self.root.display()))]
    async fn load_kind(&self, kind: CatalogKind) -> ConfigResult<CatalogEntries> {
        let entries = match kind {
            CatalogKind::Boards => CatalogEntries::Boards(Arc::new(self.load_entries(kind).await?)),
            CatalogKind::Hotends => {
                CatalogEntries::Hotends(Arc::new(self.load_entries(kind).await?))
            }
            CatalogKind::Extruders => {
                CatalogEntries::Extruders(Arc::new(self.load_entries(kind).await?))
            }
            CatalogKind::Probes => CatalogEntries::Probes(Arc::new(self.load_entries(kind).await?)),
            CatalogKind::Printers => {
                CatalogEntries::Printers(Arc::new(self.load_entries(kind).await?))
            }
        };
        debug!("Loaded {} {} entries", entries.len(), kind);
        Ok(entries)
    }

    async fn load_entries<T>(&self, kind: CatalogKind) -> ConfigResult<Vec<T>>
    where
        T: CatalogEntry + DeserializeOwned,
    {
        let directory = self.root.join(kind.directory());
        let candidates = list_candidates(&directory, kind).await?;

        let parsed = join_all(
            candidates
                .into_iter()
                .map(|(id, path)| async move { (read_entry::<T>(kind, &path).await, id, path) }),
        )
        .await;

        let mut entries = Vec::with_capacity(parsed.len());
        for (result, id, path) in parsed {
            match result {
                Ok(mut entry) => {
                    entry.set_id(id);
                    entries.push(entry);
                }
                Err(e) => warn!("Skipping invalid {} entry {}: {}", kind, path.display(), e),
            }
        }
        Ok(entries)
    }
}

impl CatalogSource for DirectoryCatalog {
    fn load(&self, kind: CatalogKind) -> BoxFuture<'_, ConfigResult<CatalogEntries>> {
        Box::pin(self.load_kind(kind))
    }
}

/// `(id, path)` of every entry candidate in a category directory, sorted by id
async fn list_candidates(
    directory: &Path,
    kind: CatalogKind,
) -> ConfigResult<Vec<(String, PathBuf)>> {
    let mut dir = match tokio::fs::read_dir(directory).await {
        Ok(dir) => dir,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!("Catalog directory {} does not exist", directory.display());
            return Ok(Vec::new());
        }
        Err(e) => return Err(ConfiguratorError::io(directory, e)),
    };

    let mut candidates = Vec::new();
    while let Some(entry) = dir
        .next_entry()
        .await
        .map_err(|e| ConfiguratorError::io(directory, e))?
    {
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
            continue;
        };

        match kind.definition_file() {
            Some(definition) => {
                if path.is_dir() {
                    candidates.push((name, path.join(definition)));
                }
            }
            None => {
                if path.extension().and_then(|e| e.to_str()) == Some("cfg") {
                    candidates.push((name, path));
                }
            }
        }
    }

    candidates.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(candidates)
}

async fn read_entry<T: DeserializeOwned>(kind: CatalogKind, path: &Path) -> ConfigResult<T> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ConfiguratorError::io(path, e))?;

    match kind.definition_file() {
        Some(_) => serde_json::from_str(&content)
            .map_err(|e| ConfiguratorError::Validation(format!("{}: {}", path.display(), e))),
        None => parse_cfg_metadata(&content)
            .map_err(|e| ConfiguratorError::Validation(format!("{}: {}", path.display(), e))),
    }
}

/// Parses the TOML document carried on `#@` lines of a Klipper `.cfg` file
pub fn parse_cfg_metadata<T: DeserializeOwned>(content: &str) -> Result<T, String> {
    let metadata: Vec<&str> = content
        .lines()
        .filter_map(|line| line.trim_start().strip_prefix(METADATA_PREFIX))
        .map(|line| line.strip_prefix(' ').unwrap_or(line))
        .collect();

    if metadata.is_empty() {
        return Err("no catalog metadata found".to_string());
    }

    toml::from_str(&metadata.join("\n")).map_err(|e| e.to_string())
}

/// In-memory catalog
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    entries: HashMap<CatalogKind, CatalogEntries>,
}

impl StaticCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_boards(mut self, boards: Vec<Board>) -> Self {
        self.insert(CatalogEntries::Boards(Arc::new(boards)));
        self
    }

    pub fn with_hotends(mut self, hotends: Vec<Hotend>) -> Self {
        self.insert(CatalogEntries::Hotends(Arc::new(hotends)));
        self
    }

    pub fn with_extruders(mut self, extruders: Vec<Extruder>) -> Self {
        self.insert(CatalogEntries::Extruders(Arc::new(extruders)));
        self
    }

    pub fn with_probes(mut self, probes: Vec<Probe>) -> Self {
        self.insert(CatalogEntries::Probes(Arc::new(probes)));
        self
    }

    pub fn with_printers(mut self, printers: Vec<PrinterDefinition>) -> Self {
        self.insert(CatalogEntries::Printers(Arc::new(printers)));
        self
    }

    pub fn insert(&mut self, entries: CatalogEntries) {
        self.entries.insert(entries.kind(), entries);
    }
}

impl CatalogSource for StaticCatalog {
    fn load(&self, kind: CatalogKind) -> BoxFuture<'_, ConfigResult<CatalogEntries>> {
        let entries = self
            .entries
            .get(&kind)
            .cloned()
            .unwrap_or_else(|| CatalogEntries::empty(kind));
        Box::pin(async move { Ok(entries) })
    }
}

/// Lazily populated catalog cache, passed by reference through the pipeline
pub struct CatalogCache {
    source: Arc<dyn CatalogSource>,
    entries: RwLock<HashMap<CatalogKind, CatalogEntries>>,
}

impl CatalogCache {
    pub fn new(source: Arc<dyn CatalogSource>) -> Self {
        Self {
            source,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn from_directory(root: impl Into<PathBuf>) -> Self {
        Self::new(Arc::new(DirectoryCatalog::new(root)))
    }

    /// Cached entries, loading the category on first use
    pub async fn get(&self, kind: CatalogKind) -> ConfigResult<CatalogEntries> {
        if let Some(entries) = self.entries.read().await.get(&kind) {
            return Ok(entries.clone());
        }
        // Concurrent first users may both load; they store equivalent values.
        self.populate(kind).await
    }

    /// Loads a category from the source and replaces the cached value
    pub async fn populate(&self, kind: CatalogKind) -> ConfigResult<CatalogEntries> {
        let entries = self.source.load(kind).await?;
        self.entries.write().await.insert(kind, entries.clone());
        Ok(entries)
    }

    pub async fn invalidate(&self, kind: CatalogKind) {
        self.entries.write().await.remove(&kind);
    }

    pub async fn invalidate_all(&self) {
        self.entries.write().await.clear();
    }

    /// Stores pre-built entries without consulting the source
    pub async fn seed(&self, entries: CatalogEntries) {
        self.entries.write().await.insert(entries.kind(), entries);
    }

    pub async fn is_cached(&self, kind: CatalogKind) -> bool {
        self.entries.read().await.contains_key(&kind)
    }

    pub async fn boards(&self) -> ConfigResult<Arc<Vec<Board>>> {
        match self.get(CatalogKind::Boards).await? {
            CatalogEntries::Boards(entries) => Ok(entries),
            other => Err(mismatch(CatalogKind::Boards, &other)),
        }
    }

    pub async fn hotends(&self) -> ConfigResult<Arc<Vec<Hotend>>> {
        match self.get(CatalogKind::Hotends).await? {
            CatalogEntries::Hotends(entries) => Ok(entries),
            other => Err(mismatch(CatalogKind::Hotends, &other)),
        }
    }

    pub async fn extruders(&self) -> ConfigResult<Arc<Vec<Extruder>>> {
        match self.get(CatalogKind::Extruders).await? {
            CatalogEntries::Extruders(entries) => Ok(entries),
            other => Err(mismatch(CatalogKind::Extruders, &other)),
        }
    }

    pub async fn probes(&self) -> ConfigResult<Arc<Vec<Probe>>> {
        match self.get(CatalogKind::Probes).await? {
            CatalogEntries::Probes(entries) => Ok(entries),
            other => Err(mismatch(CatalogKind::Probes, &other)),
        }
    }

    pub async fn printers(&self) -> ConfigResult<Arc<Vec<PrinterDefinition>>> {
        match self.get(CatalogKind::Printers).await? {
            CatalogEntries::Printers(entries) => Ok(entries),
            other => Err(mismatch(CatalogKind::Printers, &other)),
        }
    }
}

fn mismatch(expected: CatalogKind, got: &CatalogEntries) -> ConfiguratorError {
    ConfiguratorError::Configuration(format!(
        "Catalog source returned {} entries when {} were requested",
        got.kind(),
        expected
    ))
}

/// Printers of `manufacturer` first, then everything else, each group by name
pub fn sort_printers(printers: &mut [PrinterDefinition], manufacturer: &str) {
    printers.sort_by(|a, b| {
        let a_foreign = a.manufacturer != manufacturer;
        let b_foreign = b.manufacturer != manufacturer;
        a_foreign.cmp(&b_foreign).then_with(|| a.name.cmp(&b.name))
    });
}
