//! Resource references a component (or its user script) can reach for.
//!
//! Connection management lives outside the core; a component only receives a
//! [`ResourceRuntime`] that hands out either a relational [`DataSource`] or a
//! [`Directory`] for byte-stream access by path.

use crate::error::{ComponentError, Result};
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

/// Query/execute access to a relational database.
pub trait DataSource: Send + Sync {
    /// Run a statement, returning the number of affected rows.
    fn execute(&self, sql: &str) -> Result<usize>;

    /// Run a query, returning each row as a JSON object.
    fn query(&self, sql: &str) -> Result<Vec<serde_json::Value>>;
}

/// Byte-stream access to files addressed by relative path.
pub trait Directory: Send + Sync {
    fn read(&self, path: &str) -> Result<Box<dyn Read + Send>>;

    fn write(&self, path: &str, append: bool) -> Result<Box<dyn Write + Send>>;

    fn exists(&self, path: &str) -> Result<bool>;

    /// Delete a file, returning false if it did not exist.
    fn delete(&self, path: &str) -> Result<bool>;
}

#[derive(Clone)]
pub enum ResourceReference {
    DataSource(Arc<dyn DataSource>),
    Directory(Arc<dyn Directory>),
}

/// A configured resource attached to a flow step.
#[derive(Clone)]
pub struct ResourceRuntime {
    pub id: String,
    pub name: String,
    reference: ResourceReference,
}

impl fmt::Debug for ResourceRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.reference {
            ResourceReference::DataSource(_) => "data_source",
            ResourceReference::Directory(_) => "directory",
        };
        f.debug_struct("ResourceRuntime")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("kind", &kind)
            .finish()
    }
}

impl ResourceRuntime {
    pub fn new(id: impl Into<String>, name: impl Into<String>, reference: ResourceReference) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            reference,
        }
    }

    pub fn data_source(id: impl Into<String>, source: Arc<dyn DataSource>) -> Self {
        let id = id.into();
        Self::new(id.clone(), id, ResourceReference::DataSource(source))
    }

    pub fn directory(id: impl Into<String>, directory: Arc<dyn Directory>) -> Self {
        let id = id.into();
        Self::new(id.clone(), id, ResourceReference::Directory(directory))
    }

    pub fn reference(&self) -> &ResourceReference {
        &self.reference
    }

    pub fn as_data_source(&self) -> Option<Arc<dyn DataSource>> {
        match &self.reference {
            ResourceReference::DataSource(source) => Some(Arc::clone(source)),
            ResourceReference::Directory(_) => None,
        }
    }

    pub fn as_directory(&self) -> Option<Arc<dyn Directory>> {
        match &self.reference {
            ResourceReference::Directory(directory) => Some(Arc::clone(directory)),
            ResourceReference::DataSource(_) => None,
        }
    }
}

/// Directory resource backed by the local filesystem.
#[derive(Debug, Clone)]
pub struct LocalDirectory {
    root: PathBuf,
}

impl LocalDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a relative path below the root; absolute paths and `..` are refused.
    fn resolve(&self, path: &str) -> Result<PathBuf> {
        let relative = Path::new(path);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));

        if path.is_empty() || escapes {
            return Err(ComponentError::Resource(format!(
                "Path '{}' must be relative to directory {}",
                path,
                self.root.display()
            )));
        }

        Ok(self.root.join(relative))
    }
}

impl Directory for LocalDirectory {
    fn read(&self, path: &str) -> Result<Box<dyn Read + Send>> {
        let file = File::open(self.resolve(path)?)?;
        Ok(Box::new(file))
    }

    fn write(&self, path: &str, append: bool) -> Result<Box<dyn Write + Send>> {
        let full = self.resolve(path)?;
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .append(append)
            .truncate(!append)
            .open(full)?;
        Ok(Box::new(file))
    }

    fn exists(&self, path: &str) -> Result<bool> {
        Ok(self.resolve(path)?.exists())
    }

    fn delete(&self, path: &str) -> Result<bool> {
        let full = self.resolve(path)?;
        if !full.exists() {
            return Ok(false);
        }
        fs::remove_file(full)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::TempDir;

    #[test]
    fn test_local_directory_write_read() {
        let tmp = TempDir::new().unwrap();
        let dir = LocalDirectory::new(tmp.path());

        {
            let mut out = dir.write("nested/data.txt", false).unwrap();
            out.write_all(b"hello").unwrap();
        }
        {
            let mut out = dir.write("nested/data.txt", true).unwrap();
            out.write_all(b" world").unwrap();
        }

        let mut contents = String::new();
        dir.read("nested/data.txt").unwrap().read_to_string(&mut contents).unwrap();
        assert_eq!(contents, "hello world");
        assert!(dir.exists("nested/data.txt").unwrap());
    }

    #[test]
    fn test_local_directory_delete() {
        let tmp = TempDir::new().unwrap();
        let dir = LocalDirectory::new(tmp.path());
        dir.write("a.txt", false).unwrap().write_all(b"x").unwrap();

        assert!(dir.delete("a.txt").unwrap());
        assert!(!dir.delete("a.txt").unwrap());
        assert!(!dir.exists("a.txt").unwrap());
    }

    #[test]
    fn test_local_directory_rejects_escaping_paths() {
        let tmp = TempDir::new().unwrap();
        let dir = LocalDirectory::new(tmp.path());

        assert!(matches!(dir.read("../etc/passwd"), Err(ComponentError::Resource(_))));
        assert!(matches!(dir.exists("/etc/passwd"), Err(ComponentError::Resource(_))));
        assert!(matches!(dir.write("", false), Err(ComponentError::Resource(_))));
    }

    #[test]
    fn test_resource_runtime_kinds() {
        let tmp = TempDir::new().unwrap();
        let resource = ResourceRuntime::directory("files", Arc::new(LocalDirectory::new(tmp.path())));

        assert!(resource.as_directory().is_some());
        assert!(resource.as_data_source().is_none());
        assert!(format!("{:?}", resource).contains("directory"));
    }
}
