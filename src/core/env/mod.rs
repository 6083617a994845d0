//! Environment hierarchy.
//!
//! A package is a directory tree of environments:
//!
//! ```text
//! <base>/
//! ├── env/
//! │   └── prod/                  # main environment
//! │       ├── configstore.json   # its store
//! │       └── eu/                # sub-environment "prod/eu"
//! │           ├── override.json
//! │           └── dublin/        # "prod/eu/dublin"
//! │               └── override.json
//! └── template/                  # template sources
//! ```
//!
//! An [`EnvPath`] names one level; resolving it yields the store of the main
//! environment plus the override layers of every level below it, root first.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::core::client::{Client, InitOptions};
use crate::core::constants::{ENV_DIR, GITKEEP, OVERRIDE_FILE, STORE_FILE, TEMPLATE_DIR};
use crate::core::store;
use crate::core::types::Overrides;
use crate::core::validation::{validate_key, validate_segment};
use crate::error::{ConflictError, Error, NotFoundError, Result, ValidationError};

pub mod copy;
pub mod tree;

pub use copy::{copy, CopyOptions};
pub use tree::{build_tree, Tree, TreeNode};

/// A parsed environment reference: `main[/sub1[/sub2...]]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EnvPath {
    segments: Vec<String>,
}

impl EnvPath {
    /// Parse a slash-separated environment reference.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` for an empty reference or an invalid segment.
    pub fn parse(s: &str) -> Result<Self> {
        let trimmed = s.trim_end_matches('/');
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyEnvironment.into());
        }

        let segments: Vec<String> = trimmed.split('/').map(str::to_string).collect();
        for segment in &segments {
            validate_segment(s, segment)?;
        }
        Ok(Self { segments })
    }

    /// The main environment name.
    pub fn main(&self) -> &str {
        &self.segments[0]
    }

    /// Sub-environment segments, root first.
    pub fn subs(&self) -> &[String] {
        &self.segments[1..]
    }

    /// All segments including the main environment.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Whether this names a main environment.
    pub fn is_main(&self) -> bool {
        self.segments.len() == 1
    }

    /// Nesting depth; 0 for a main environment.
    pub fn depth(&self) -> usize {
        self.segments.len() - 1
    }

    /// The path one level below this one.
    pub fn child(&self, name: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.push(name.to_string());
        Self { segments }
    }

    /// The path one level up, if any.
    pub fn parent(&self) -> Option<Self> {
        if self.is_main() {
            return None;
        }
        Some(Self {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    /// The main environment this path belongs to.
    pub fn root(&self) -> Self {
        Self {
            segments: vec![self.segments[0].clone()],
        }
    }
}

impl std::fmt::Display for EnvPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.segments.join("/"))
    }
}

/// Files backing a resolved environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    /// Directory of the resolved level.
    pub dir: PathBuf,
    /// Store of the main environment.
    pub store: PathBuf,
    /// Override layers, root to leaf.
    pub overrides: Vec<PathBuf>,
}

/// A package of environments rooted at a base directory.
#[derive(Debug, Clone)]
pub struct Package {
    base: PathBuf,
}

impl Package {
    /// Refer to an existing package. Nothing is checked until used.
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    /// Create the package skeleton (`env/` and `template/`).
    ///
    /// Existing directories are left alone.
    pub fn init(base: impl Into<PathBuf>) -> Result<Self> {
        let package = Self::new(base);
        for dir in [package.env_root(), package.template_dir()] {
            std::fs::create_dir_all(&dir).map_err(|e| Error::file(&dir, e))?;
            let keep = dir.join(GITKEEP);
            if !keep.exists() {
                std::fs::write(&keep, "").map_err(|e| Error::file(&keep, e))?;
            }
        }
        debug!(base = %package.base.display(), "package initialized");
        Ok(package)
    }

    /// Base directory.
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Directory holding the main environments.
    pub fn env_root(&self) -> PathBuf {
        self.base.join(ENV_DIR)
    }

    /// Directory holding template sources.
    pub fn template_dir(&self) -> PathBuf {
        self.base.join(TEMPLATE_DIR)
    }

    /// Directory of an environment level (whether or not it exists).
    pub fn dir(&self, env: &EnvPath) -> PathBuf {
        env.segments()
            .iter()
            .fold(self.env_root(), |dir, segment| dir.join(segment))
    }

    /// Whether the directory for `env` exists.
    pub fn exists(&self, env: &EnvPath) -> bool {
        self.dir(env).is_dir()
    }

    /// Check every level of `env` top-down and collect its files.
    ///
    /// # Errors
    ///
    /// Returns `NotFoundError::Environment` when the main environment is
    /// absent, or `NotFoundError::SubEnvironment` naming the first absent
    /// level below it.
    pub fn resolve(&self, env: &EnvPath) -> Result<Resolved> {
        let mut dir = self.env_root().join(env.main());
        if !dir.is_dir() {
            return Err(NotFoundError::Environment(env.main().to_string()).into());
        }
        let store = dir.join(STORE_FILE);

        let mut overrides = Vec::with_capacity(env.depth());
        let mut walked = env.root();
        for segment in env.subs() {
            walked = walked.child(segment);
            dir = dir.join(segment);
            if !dir.is_dir() {
                return Err(NotFoundError::SubEnvironment(walked.to_string()).into());
            }
            overrides.push(dir.join(OVERRIDE_FILE));
        }

        Ok(Resolved {
            dir,
            store,
            overrides,
        })
    }

    /// Open a client over the resolved store and override layers.
    pub fn open(&self, env: &EnvPath, ignore_role: bool) -> Result<Client> {
        let resolved = self.resolve(env)?;
        debug!(env = %env, layers = resolved.overrides.len(), "opening environment");
        Client::open(&resolved.store, &resolved.overrides, ignore_role)
    }

    /// Main environment names, sorted.
    pub fn environments(&self) -> Result<Vec<String>> {
        list_dirs(&self.env_root())
    }

    /// Direct sub-environments of `env`, sorted.
    pub fn sub_environments(&self, env: &EnvPath) -> Result<Vec<String>> {
        let resolved = self.resolve(env)?;
        list_dirs(&resolved.dir)
    }

    /// Create an environment level.
    ///
    /// A main environment gets a new store (removed again if initialization
    /// fails); a sub-environment gets an empty override layer and requires
    /// its parent to exist.
    ///
    /// # Errors
    ///
    /// Returns `ConflictError::EnvironmentExists` if the level already exists.
    pub fn create(&self, env: &EnvPath, options: &InitOptions) -> Result<()> {
        if self.exists(env) {
            return Err(ConflictError::EnvironmentExists(env.to_string()).into());
        }

        let dir = self.dir(env);
        match env.parent() {
            None => {
                std::fs::create_dir_all(&dir).map_err(|e| Error::file(&dir, e))?;
                if let Err(e) = Client::init(&dir, options) {
                    if std::fs::remove_dir(&dir).is_err() {
                        warn!(dir = %dir.display(), "failed to clean up after initialization error, remove it manually");
                    }
                    return Err(e);
                }
            }
            Some(parent) => {
                self.resolve(&parent)?;
                std::fs::create_dir(&dir).map_err(|e| Error::file(&dir, e))?;
                save_override(&dir.join(OVERRIDE_FILE), &Overrides::new())?;
            }
        }

        debug!(env = %env, "environment created");
        Ok(())
    }

    /// Load the override layer of a sub-environment.
    pub fn load_override(&self, env: &EnvPath) -> Result<Overrides> {
        let resolved = self.resolve_sub(env)?;
        load_override(&resolved.dir.join(OVERRIDE_FILE))
    }

    /// Replace the override layer of a sub-environment.
    pub fn save_override(&self, env: &EnvPath, overrides: &Overrides) -> Result<()> {
        let resolved = self.resolve_sub(env)?;
        save_override(&resolved.dir.join(OVERRIDE_FILE), overrides)
    }

    /// Set one override value in a sub-environment.
    ///
    /// The key must already exist as a non-secret key in the main
    /// environment's store, so that the environment stays loadable.
    pub fn set_override(&self, env: &EnvPath, key: &str, value: &str) -> Result<()> {
        validate_key(key)?;
        let resolved = self.resolve_sub(env)?;
        let layer = resolved.dir.join(OVERRIDE_FILE);

        let base = store::load(&resolved.store)?;
        check_override_key(&base, key, &layer)?;

        let mut overrides = load_override(&layer)?;
        overrides.insert(key.to_string(), value.to_string());
        save_override(&layer, &overrides)
    }

    /// Remove one override value from a sub-environment.
    ///
    /// # Errors
    ///
    /// Returns `NotFoundError::Key` if the layer does not override `key`.
    pub fn unset_override(&self, env: &EnvPath, key: &str) -> Result<()> {
        validate_key(key)?;
        let resolved = self.resolve_sub(env)?;
        let layer = resolved.dir.join(OVERRIDE_FILE);

        let mut overrides = load_override(&layer)?;
        if overrides.remove(key).is_none() {
            return Err(NotFoundError::Key(key.to_string()).into());
        }
        save_override(&layer, &overrides)
    }

    /// Template source files (hidden files skipped), sorted by name.
    pub fn templates(&self) -> Result<Vec<PathBuf>> {
        let dir = self.template_dir();
        if !dir.is_dir() {
            return Err(NotFoundError::Directory(dir).into());
        }
        let mut files = Vec::new();
        for entry in std::fs::read_dir(&dir).map_err(|e| Error::file(&dir, e))? {
            let entry = entry.map_err(|e| Error::file(&dir, e))?;
            let path = entry.path();
            if path.is_file() && !is_hidden(&path) {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    fn resolve_sub(&self, env: &EnvPath) -> Result<Resolved> {
        if env.is_main() {
            return Err(ValidationError::InvalidEnvironment {
                env: env.to_string(),
                reason: "not a sub-environment".to_string(),
            }
            .into());
        }
        self.resolve(env)
    }
}

/// Check that an override layer may target `key` in `base`.
///
/// # Errors
///
/// `ConflictError::UnknownOverrideKey` if the store lacks the key,
/// `ConflictError::SecretOverrideKey` if the key is secret.
pub fn check_override_key(base: &store::Document, key: &str, layer: &Path) -> Result<()> {
    match base.data.get(key) {
        None => Err(ConflictError::UnknownOverrideKey {
            key: key.to_string(),
            layer: layer.to_path_buf(),
        }
        .into()),
        Some(entry) if entry.is_secret => Err(ConflictError::SecretOverrideKey {
            key: key.to_string(),
            layer: layer.to_path_buf(),
        }
        .into()),
        Some(_) => Ok(()),
    }
}

/// Read an override layer file.
pub fn load_override(path: &Path) -> Result<Overrides> {
    let contents = std::fs::read_to_string(path).map_err(|e| Error::file(path, e))?;
    serde_json::from_str(&contents).map_err(|e| store::format_error(path, &contents, e))
}

/// Write an override layer file as 2-space indented JSON.
pub fn save_override(path: &Path, overrides: &Overrides) -> Result<()> {
    let contents = serde_json::to_string_pretty(overrides)?;
    std::fs::write(path, contents).map_err(|e| Error::file(path, e))
}

/// Visible subdirectories of `dir`, sorted.
pub fn list_dirs(dir: &Path) -> Result<Vec<String>> {
    let mut dirs = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(|e| Error::file(dir, e))? {
        let entry = entry.map_err(|e| Error::file(dir, e))?;
        let path = entry.path();
        if path.is_dir() && !is_hidden(&path) {
            dirs.push(entry.file_name().to_string_lossy().to_string());
        }
    }
    dirs.sort();
    Ok(dirs)
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .map(|n| n.to_string_lossy().starts_with('.'))
        .unwrap_or(false)
}

/// Override layers loaded at most once per directory.
#[derive(Debug, Default)]
pub struct OverrideCache {
    layers: HashMap<PathBuf, Overrides>,
}

impl OverrideCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override layer of the sub-environment directory `dir`.
    pub fn get(&mut self, dir: &Path) -> Result<&Overrides> {
        if !self.layers.contains_key(dir) {
            let layer = load_override(&dir.join(OVERRIDE_FILE))?;
            self.layers.insert(dir.to_path_buf(), layer);
        }
        Ok(&self.layers[dir])
    }

    /// Number of layers loaded so far.
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}
