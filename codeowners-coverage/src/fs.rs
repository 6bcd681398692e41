//! Filesystem-shaped sources the walker can traverse.
//!
//! Paths handed to and returned from a [`Filesystem`] are slash-separated
//! and relative to its root, which is itself named [`ROOT`].

use std::{
    collections::{BTreeMap, HashSet},
    fs, io,
    path::{Path, PathBuf},
};

use tracing::warn;

/// The path of the root of every [`Filesystem`].
pub const ROOT: &str = ".";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Dir,
    Symlink,
    Other,
}

/// What a filesystem knows about a single entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryInfo {
    name: String,
    kind: EntryKind,
}

impl EntryInfo {
    pub fn new(name: impl Into<String>, kind: EntryKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    /// The final path component.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> EntryKind {
        self.kind
    }

    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Dir
    }
}

/// The primitives a tree walk needs from its data source.
pub trait Filesystem {
    fn stat(&self, path: &str) -> io::Result<EntryInfo>;

    /// The entries directly inside `path`, in the order the walk should
    /// visit them.
    fn list_children(&self, path: &str) -> io::Result<Vec<EntryInfo>>;

    fn read_to_string(&self, path: &str) -> io::Result<String>;

    fn join(&self, base: &str, name: &str) -> String {
        join_path(base, name)
    }
}

impl<T: Filesystem + ?Sized> Filesystem for &T {
    fn stat(&self, path: &str) -> io::Result<EntryInfo> {
        (**self).stat(path)
    }

    fn list_children(&self, path: &str) -> io::Result<Vec<EntryInfo>> {
        (**self).list_children(path)
    }

    fn read_to_string(&self, path: &str) -> io::Result<String> {
        (**self).read_to_string(path)
    }

    fn join(&self, base: &str, name: &str) -> String {
        (**self).join(base, name)
    }
}

/// Join a relative path and a name with `/`. Joining onto the root yields
/// the bare name.
pub fn join_path(base: &str, name: &str) -> String {
    if base.is_empty() || base == ROOT {
        name.to_owned()
    } else {
        format!("{}/{}", base.trim_end_matches('/'), name)
    }
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty() && *s != ROOT)
}

fn basename(path: &str) -> &str {
    segments(path).last().unwrap_or(ROOT)
}

/// A directory on the host filesystem. Symbolic links are reported as such
/// and never followed, and children are listed in name order.
#[derive(Debug, Clone)]
pub struct OsFs {
    root: PathBuf,
}

impl OsFs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> PathBuf {
        segments(path).fold(self.root.clone(), |acc, segment| acc.join(segment))
    }
}

fn kind_of(file_type: fs::FileType) -> EntryKind {
    if file_type.is_dir() {
        EntryKind::Dir
    } else if file_type.is_file() {
        EntryKind::File
    } else if file_type.is_symlink() {
        EntryKind::Symlink
    } else {
        EntryKind::Other
    }
}

impl Filesystem for OsFs {
    fn stat(&self, path: &str) -> io::Result<EntryInfo> {
        let metadata = fs::symlink_metadata(self.resolve(path))?;
        Ok(EntryInfo::new(basename(path), kind_of(metadata.file_type())))
    }

    fn list_children(&self, path: &str) -> io::Result<Vec<EntryInfo>> {
        let mut children = Vec::new();
        for entry in fs::read_dir(self.resolve(path))? {
            let entry = entry?;
            // Paths are UTF-8 strings; a lossy name would not resolve back to
            // the entry.
            let name = match entry.file_name().into_string() {
                Ok(name) => name,
                Err(raw) => {
                    warn!(dir = %path, name = ?raw, "skipping entry with a non-UTF-8 name");
                    continue;
                }
            };
            children.push(EntryInfo::new(name, kind_of(entry.file_type()?)));
        }
        children.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(children)
    }

    fn read_to_string(&self, path: &str) -> io::Result<String> {
        fs::read_to_string(self.resolve(path))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct NodeId(usize);

#[derive(Debug, Clone)]
enum NodeData {
    File(String),
    Dir(BTreeMap<String, NodeId>),
}

#[derive(Debug, Clone)]
struct Node {
    name: String,
    data: NodeData,
}

/// An in-memory tree. Children are listed in name order. Individual paths
/// can be made to fail on `stat` or on listing, to exercise error handling.
#[derive(Debug, Clone)]
pub struct MemFs {
    nodes: Vec<Node>,
    failing_stats: HashSet<String>,
    failing_lists: HashSet<String>,
}

impl MemFs {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                name: ROOT.to_owned(),
                data: NodeData::Dir(BTreeMap::new()),
            }],
            failing_stats: HashSet::new(),
            failing_lists: HashSet::new(),
        }
    }

    fn root_id() -> NodeId {
        NodeId(0)
    }

    /// Create a directory and any missing parents.
    pub fn create_dir_all(&mut self, path: &str) -> io::Result<()> {
        let mut current = Self::root_id();
        for segment in segments(path) {
            current = self.child_dir(current, segment)?;
        }
        Ok(())
    }

    /// Create or overwrite a file, creating missing parent directories.
    pub fn write_file(&mut self, path: &str, contents: impl Into<String>) -> io::Result<()> {
        let all = segments(path).collect::<Vec<_>>();
        let Some((name, parents)) = all.split_last() else {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "cannot write to the root",
            ));
        };

        let mut current = Self::root_id();
        for segment in parents {
            current = self.child_dir(current, segment)?;
        }

        let contents = contents.into();
        let existing = match &self.nodes[current.0].data {
            NodeData::Dir(children) => children.get(*name).copied(),
            NodeData::File(_) => return Err(not_a_directory(path)),
        };
        match existing {
            Some(id) => match &mut self.nodes[id.0].data {
                NodeData::File(old) => *old = contents,
                NodeData::Dir(_) => {
                    return Err(io::Error::new(
                        io::ErrorKind::Other,
                        format!("{path}: is a directory"),
                    ))
                }
            },
            None => {
                self.insert_child(current, name, NodeData::File(contents));
            }
        }
        Ok(())
    }

    /// Make every subsequent `stat` of `path` fail.
    pub fn fail_stat(&mut self, path: &str) {
        self.failing_stats.insert(normalize(path));
    }

    /// Make every subsequent listing of `path` fail.
    pub fn fail_list(&mut self, path: &str) {
        self.failing_lists.insert(normalize(path));
    }

    fn child_dir(&mut self, parent: NodeId, name: &str) -> io::Result<NodeId> {
        let existing = match &self.nodes[parent.0].data {
            NodeData::Dir(children) => children.get(name).copied(),
            NodeData::File(_) => return Err(not_a_directory(&self.nodes[parent.0].name)),
        };
        match existing {
            Some(id) => match self.nodes[id.0].data {
                NodeData::Dir(_) => Ok(id),
                NodeData::File(_) => Err(not_a_directory(name)),
            },
            None => Ok(self.insert_child(parent, name, NodeData::Dir(BTreeMap::new()))),
        }
    }

    fn insert_child(&mut self, parent: NodeId, name: &str, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            name: name.to_owned(),
            data,
        });
        if let NodeData::Dir(children) = &mut self.nodes[parent.0].data {
            children.insert(name.to_owned(), id);
        }
        id
    }

    fn lookup(&self, path: &str) -> io::Result<&Node> {
        let mut current = Self::root_id();
        for segment in segments(path) {
            current = match &self.nodes[current.0].data {
                NodeData::Dir(children) => *children.get(segment).ok_or_else(|| not_found(path))?,
                NodeData::File(_) => return Err(not_found(path)),
            };
        }
        Ok(&self.nodes[current.0])
    }
}

impl Default for MemFs {
    fn default() -> Self {
        Self::new()
    }
}

impl Filesystem for MemFs {
    fn stat(&self, path: &str) -> io::Result<EntryInfo> {
        if self.failing_stats.contains(&normalize(path)) {
            return Err(injected(path));
        }
        let node = self.lookup(path)?;
        Ok(EntryInfo::new(basename(path), node_kind(node)))
    }

    fn list_children(&self, path: &str) -> io::Result<Vec<EntryInfo>> {
        if self.failing_lists.contains(&normalize(path)) {
            return Err(injected(path));
        }
        match &self.lookup(path)?.data {
            NodeData::Dir(children) => Ok(children
                .values()
                .map(|id| {
                    let child = &self.nodes[id.0];
                    EntryInfo::new(child.name.clone(), node_kind(child))
                })
                .collect()),
            NodeData::File(_) => Err(not_a_directory(path)),
        }
    }

    fn read_to_string(&self, path: &str) -> io::Result<String> {
        match &self.lookup(path)?.data {
            NodeData::File(contents) => Ok(contents.clone()),
            NodeData::Dir(_) => Err(io::Error::new(
                io::ErrorKind::Other,
                format!("{path}: is a directory"),
            )),
        }
    }
}

fn node_kind(node: &Node) -> EntryKind {
    match node.data {
        NodeData::File(_) => EntryKind::File,
        NodeData::Dir(_) => EntryKind::Dir,
    }
}

fn normalize(path: &str) -> String {
    let joined = segments(path).collect::<Vec<_>>().join("/");
    if joined.is_empty() {
        ROOT.to_owned()
    } else {
        joined
    }
}

fn not_found(path: &str) -> io::Error {
    io::Error::new(io::ErrorKind::NotFound, format!("{path}: no such file or directory"))
}

fn not_a_directory(path: &str) -> io::Error {
    io::Error::new(io::ErrorKind::Other, format!("{path}: not a directory"))
}

fn injected(path: &str) -> io::Error {
    io::Error::new(io::ErrorKind::PermissionDenied, format!("{path}: permission denied"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_path() {
        assert_eq!(join_path(".", "a"), "a");
        assert_eq!(join_path("", "a"), "a");
        assert_eq!(join_path("a", "b"), "a/b");
        assert_eq!(join_path("a/", "b"), "a/b");
    }

    #[test]
    fn test_memfs_tree() {
        let mut fs = MemFs::new();
        fs.create_dir_all("src/empty").unwrap();
        fs.write_file("src/main.rs", "fn main() {}").unwrap();
        fs.write_file("README.md", "").unwrap();

        assert!(fs.stat(ROOT).unwrap().is_dir());
        assert_eq!(fs.stat("src/main.rs").unwrap(), EntryInfo::new("main.rs", EntryKind::File));
        assert_eq!(fs.read_to_string("src/main.rs").unwrap(), "fn main() {}");

        let names = fs
            .list_children(ROOT)
            .unwrap()
            .into_iter()
            .map(|e| e.name().to_owned())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["README.md", "src"]);

        let names = fs
            .list_children("src")
            .unwrap()
            .into_iter()
            .map(|e| e.name().to_owned())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["empty", "main.rs"]);
    }

    #[test]
    fn test_memfs_errors() {
        let mut fs = MemFs::new();
        fs.write_file("file", "").unwrap();

        assert_eq!(fs.stat("missing").unwrap_err().kind(), io::ErrorKind::NotFound);
        assert!(fs.list_children("file").is_err());
        assert!(fs.write_file("file/child", "").is_err());
        assert!(fs.create_dir_all("file").is_err());

        fs.fail_stat("./file");
        assert_eq!(
            fs.stat("file").unwrap_err().kind(),
            io::ErrorKind::PermissionDenied
        );

        fs.fail_list(ROOT);
        assert!(fs.list_children(".").is_err());
    }

    #[test]
    fn test_osfs() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("b/c")).unwrap();
        std::fs::write(dir.path().join("b/c/file.txt"), "hello").unwrap();
        std::fs::write(dir.path().join("a.txt"), "").unwrap();

        let fs = OsFs::new(dir.path());
        assert!(fs.stat(ROOT).unwrap().is_dir());
        assert_eq!(
            fs.stat("b/c/file.txt").unwrap(),
            EntryInfo::new("file.txt", EntryKind::File)
        );
        assert_eq!(fs.read_to_string("b/c/file.txt").unwrap(), "hello");
        assert_eq!(
            fs.list_children(ROOT).unwrap(),
            vec![
                EntryInfo::new("a.txt", EntryKind::File),
                EntryInfo::new("b", EntryKind::Dir)
            ]
        );
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_osfs_skips_non_utf8_names() {
        use std::{ffi::OsStr, os::unix::ffi::OsStrExt};

        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("ok.js"), "").unwrap();
        std::fs::write(dir.path().join(OsStr::from_bytes(b"bad\xff.js")), "").unwrap();

        let fs = OsFs::new(dir.path());
        assert_eq!(
            fs.list_children(ROOT).unwrap(),
            vec![EntryInfo::new("ok.js", EntryKind::File)]
        );

        let table = crate::OwnershipTable::parse("*.js @js").unwrap();
        let summary =
            crate::compute_coverage(&crate::Walker::new(&fs), &table, |_| false).unwrap();
        assert_eq!(summary.total_files(), 1);
        assert_eq!(summary.covered_files(), 1);
    }
}
