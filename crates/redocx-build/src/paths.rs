//! Mapping from watched input documents to rendered artifact paths.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

/// Separator between the output directory and the input path in a watch token.
const ENTRY_SEPARATOR: char = ':';

/// Errors raised while turning startup arguments into a [`PathTable`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Malformed watch entry '{0}': expected <outputDir>:<inputPath>")]
    MalformedEntry(String),

    #[error("Input file does not exist: {}", .0.display())]
    MissingInput(PathBuf),

    #[error("Input file registered twice: {}", .0.display())]
    DuplicateInput(PathBuf),

    #[error("Inputs {} and {} both render to {}", .first.display(), .second.display(), .artifact)]
    ArtifactCollision {
        artifact: String,
        first: PathBuf,
        second: PathBuf,
    },
}

/// A single `outputDir:inputPath` association given at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEntry {
    /// Source document to watch
    pub input_path: PathBuf,

    /// Directory, relative to the base output directory, that receives the artifact
    pub output_dir: String,
}

impl WatchEntry {
    /// Parse an `outputDir:inputPath` token.
    ///
    /// Exactly one separator is accepted. The output directory may be empty,
    /// which selects the unprefixed fallback artifact name.
    pub fn parse(token: &str) -> Result<Self, ConfigError> {
        let mut parts = token.split(ENTRY_SEPARATOR);

        match (parts.next(), parts.next(), parts.next()) {
            (Some(output_dir), Some(input), None) if !input.is_empty() => Ok(Self {
                input_path: PathBuf::from(input),
                output_dir: output_dir.to_string(),
            }),
            _ => Err(ConfigError::MalformedEntry(token.to_string())),
        }
    }

    /// Fail unless the input path names an existing regular file.
    pub fn check_exists(&self) -> Result<(), ConfigError> {
        match fs::metadata(&self.input_path) {
            Ok(meta) if meta.is_file() => Ok(()),
            _ => Err(ConfigError::MissingInput(self.input_path.clone())),
        }
    }
}

/// Source and rendered file extensions, without the leading dot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extensions {
    pub source: String,
    pub rendered: String,
}

impl Default for Extensions {
    fn default() -> Self {
        Self {
            source: "yaml".to_string(),
            rendered: "html".to_string(),
        }
    }
}

impl Extensions {
    /// Base name of `path` with the source extension removed.
    fn stem(&self, path: &Path) -> String {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        if self.source.is_empty() {
            return name;
        }

        let suffix = format!(".{}", self.source);
        match name.strip_suffix(&suffix) {
            Some(stem) => stem.to_string(),
            None => name,
        }
    }

    /// Replace every `.<source>` occurrence in `path` with `.<rendered>`.
    pub fn to_rendered(&self, path: &str) -> String {
        if self.source.is_empty() {
            return path.to_string();
        }
        path.replace(
            &format!(".{}", self.source),
            &format!(".{}", self.rendered),
        )
    }
}

/// Immutable table of watched inputs and their output directories.
///
/// Built once at startup and shared read-only between the watcher and the
/// builder.
#[derive(Debug, Clone)]
pub struct PathTable {
    entries: BTreeMap<PathBuf, String>,
    canonical: HashMap<PathBuf, PathBuf>,
    extensions: Extensions,
}

impl PathTable {
    /// Parse startup tokens, check every input exists, and build the table.
    pub fn from_args<S: AsRef<str>>(
        tokens: &[S],
        extensions: Extensions,
    ) -> Result<Self, ConfigError> {
        let entries = tokens
            .iter()
            .map(|token| {
                let entry = WatchEntry::parse(token.as_ref())?;
                entry.check_exists()?;
                Ok(entry)
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        Self::from_entries(entries, extensions)
    }

    /// Build a table from already parsed entries.
    ///
    /// Rejects inputs registered more than once and inputs whose artifact
    /// paths would overwrite each other.
    pub fn from_entries(
        entries: impl IntoIterator<Item = WatchEntry>,
        extensions: Extensions,
    ) -> Result<Self, ConfigError> {
        let mut table = Self {
            entries: BTreeMap::new(),
            canonical: HashMap::new(),
            extensions,
        };

        for entry in entries {
            if table.entries.contains_key(&entry.input_path) {
                return Err(ConfigError::DuplicateInput(entry.input_path));
            }

            // Two spellings of one file share a single OS watch.
            if let Ok(canonical) = entry.input_path.canonicalize() {
                if table.canonical.contains_key(&canonical) {
                    return Err(ConfigError::DuplicateInput(entry.input_path));
                }
                table.canonical.insert(canonical, entry.input_path.clone());
            }

            table.entries.insert(entry.input_path, entry.output_dir);
        }

        let mut artifacts: HashMap<String, &PathBuf> = HashMap::new();
        for input in table.entries.keys() {
            let artifact = table.artifact_path(input);
            if let Some(first) = artifacts.insert(artifact.clone(), input) {
                return Err(ConfigError::ArtifactCollision {
                    artifact,
                    first: first.clone(),
                    second: input.clone(),
                });
            }
        }

        Ok(table)
    }

    /// Artifact path, relative to the base output directory, for `input`.
    ///
    /// Registered inputs map to `<outputDir>/<stem>.<rendered>`. Anything else
    /// maps to the bare stem with no directory and no extension.
    pub fn artifact_path(&self, input: &Path) -> String {
        let name = self.extensions.stem(input);

        match self.entries.get(input) {
            Some(dir) if !dir.is_empty() => {
                format!("{}/{}.{}", dir, name, self.extensions.rendered)
            }
            _ => name,
        }
    }

    /// Map a path reported by the file system back to its registered input.
    pub fn resolve(&self, path: &Path) -> Option<&Path> {
        if let Some((input, _)) = self.entries.get_key_value(path) {
            return Some(input.as_path());
        }

        let canonical = path.canonicalize().ok()?;
        self.canonical.get(&canonical).map(PathBuf::as_path)
    }

    /// Registered inputs, in sorted order.
    pub fn inputs(&self) -> impl Iterator<Item = &Path> {
        self.entries.keys().map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }
}
