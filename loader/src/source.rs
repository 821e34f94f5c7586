use std::collections::{HashMap, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use protodiff_schema::{DescriptorPool, SchemaFile};
use tracing::debug;

use crate::{
    error::SchemaError,
    parser::parse_schema,
    resolver::resolve_schema,
    tokenizer::tokenize_schema,
    utils::quote,
};

/// Where schema text comes from. Paths are virtual, `/`-separated and
/// relative to the tree's root, the same form `import` statements use.
pub trait SourceTree {
    fn open(&self, path: &str) -> Result<String, SchemaError>;
}

/// Serves files from a directory on disk.
#[derive(Debug, Clone)]
pub struct DiskSourceTree {
    root: PathBuf,
}

impl DiskSourceTree {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        DiskSourceTree { root: root.into() }
    }
}

impl SourceTree for DiskSourceTree {
    fn open(&self, path: &str) -> Result<String, SchemaError> {
        match fs::read_to_string(self.root.join(path)) {
            Ok(text) => Ok(text),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(SchemaError::FileNotFound(path.to_string())),
            Err(e) => Err(SchemaError::Io(e)),
        }
    }
}

/// Serves files from memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySourceTree {
    files: HashMap<String, String>,
}

impl MemorySourceTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, path: &str, text: &str) -> &mut Self {
        self.files.insert(path.to_string(), text.to_string());
        self
    }

    pub fn with(mut self, path: &str, text: &str) -> Self {
        self.add(path, text);
        self
    }
}

impl SourceTree for MemorySourceTree {
    fn open(&self, path: &str) -> Result<String, SchemaError> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| SchemaError::FileNotFound(path.to_string()))
    }
}

/// Loads a file and everything it imports into one descriptor pool.
pub struct Importer<T: SourceTree> {
    tree:        T,
    pool:        DescriptorPool,
    loaded:      HashSet<String>,
    in_progress: Vec<String>,
}

impl<T: SourceTree> Importer<T> {
    pub fn new(tree: T) -> Self {
        Importer {
            tree,
            pool:        DescriptorPool::new(),
            loaded:      HashSet::new(),
            in_progress: Vec::new(),
        }
    }

    /// Loads `path` and its transitive imports. Each file is read once.
    pub fn import(mut self, path: &str) -> Result<SchemaFile, SchemaError> {
        let mut file = self.load(path)?;
        file.pool = self.pool;
        Ok(file)
    }

    /// Returns the file's own metadata; its types go into `self.pool`.
    fn load(&mut self, path: &str) -> Result<SchemaFile, SchemaError> {
        if let Some(pos) = self.in_progress.iter().position(|p| p == path) {
            let mut chain = self.in_progress[pos..].to_vec();
            chain.push(path.to_string());
            return Err(SchemaError::ImportCycle(chain.join(" -> ")));
        }

        debug!(file = path, "loading schema file");
        let text = self.tree.open(path)?;
        let tokens = tokenize_schema(&text).map_err(|e| e.in_file(path))?;
        let proto = parse_schema(&tokens).map_err(|e| e.in_file(path))?;

        self.in_progress.push(path.to_string());
        for import in &proto.imports {
            if self.loaded.contains(&import.path) {
                continue;
            }
            debug!(file = path, import = %import.path, "resolving import");
            match self.load(&import.path) {
                Ok(_) => {}
                Err(SchemaError::FileNotFound(missing)) if missing == import.path => {
                    return Err(SchemaError::Diagnostic {
                        file:   path.to_string(),
                        line:   import.line,
                        column: import.column,
                        msg:    format!("Import {} was not found or had errors.", quote(&import.path)),
                    });
                }
                Err(e) => return Err(e),
            }
        }
        self.in_progress.pop();

        let top = resolve_schema(&proto, &mut self.pool).map_err(|e| e.in_file(path))?;
        self.loaded.insert(path.to_string());

        let mut file = SchemaFile::new(path, proto.package.clone());
        file.dependencies = proto.imports.iter().map(|i| i.path.clone()).collect();
        file.messages = top.messages;
        file.enums = top.enums;
        Ok(file)
    }
}

/// Loads `file_path` from the tree rooted at `root_dir`.
///
/// `file_path` is taken relative to `root_dir`; a path that already starts
/// with `root_dir` has that prefix removed first.
pub fn load_schema(file_path: impl AsRef<Path>, root_dir: impl AsRef<Path>) -> Result<SchemaFile, SchemaError> {
    let root = root_dir.as_ref();
    let file_path = file_path.as_ref();
    let relative = file_path.strip_prefix(root).unwrap_or(file_path);
    let virtual_path = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");

    Importer::new(DiskSourceTree::new(root)).import(&virtual_path)
}
