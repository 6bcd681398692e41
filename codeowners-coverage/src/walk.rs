//! Pre-order, depth-first traversal over any [`Filesystem`].
//!
//! The walk uses an explicit stack rather than recursion, so arbitrarily
//! deep trees cannot overflow the call stack. Siblings are visited in the
//! order [`Filesystem::list_children`] returns them.

use std::io;

use thiserror::Error;
use tracing::{trace, warn};

use crate::fs::{EntryKind, Filesystem, ROOT};

/// What the walk should do after a node has been visited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WalkSignal {
    #[default]
    Continue,
    /// Don't descend into this directory. On a node that failed to stat,
    /// suppresses the error instead.
    SkipSubtree,
    /// Stop the walk and return an error.
    Abort,
}

#[derive(Debug, Error)]
pub enum WalkError {
    #[error("failed to stat {path}: {source}")]
    Stat {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to list {path}: {source}")]
    ReadDir {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("walk aborted at {path}")]
    Aborted { path: String },
}

/// A node handed to the visitor.
#[derive(Debug)]
pub struct Visit<'a> {
    path: &'a str,
    kind: Option<EntryKind>,
    error: Option<&'a io::Error>,
}

impl<'a> Visit<'a> {
    pub fn path(&self) -> &'a str {
        self.path
    }

    /// The entry kind, or `None` if the entry could not be stat-ed.
    pub fn kind(&self) -> Option<EntryKind> {
        self.kind
    }

    pub fn is_dir(&self) -> bool {
        self.kind == Some(EntryKind::Dir)
    }

    /// Set when the entry could not be stat-ed, or, for a directory, when
    /// its children could not be listed.
    pub fn error(&self) -> Option<&'a io::Error> {
        self.error
    }
}

struct Pending {
    path: String,
    depth: usize,
}

/// Walks a [`Filesystem`] from a root path, visiting every node before its
/// descendants.
pub struct Walker<'fs, F: ?Sized> {
    fs: &'fs F,
    root: String,
    skip_dir_names: Vec<String>,
}

impl<'fs, F: Filesystem + ?Sized> Walker<'fs, F> {
    /// A walker over the whole of `fs`. No directories are skipped.
    pub fn new(fs: &'fs F) -> Self {
        Self {
            fs,
            root: ROOT.to_owned(),
            skip_dir_names: Vec::new(),
        }
    }

    pub fn root(mut self, root: impl Into<String>) -> Self {
        self.root = root.into();
        self
    }

    /// Never visit, or descend into, directories below the root with this
    /// name.
    pub fn skip_dir_name(mut self, name: impl Into<String>) -> Self {
        self.skip_dir_names.push(name.into());
        self
    }

    pub fn skip_dir_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.skip_dir_names.extend(names.into_iter().map(Into::into));
        self
    }

    /// Walk the tree, calling `visit` for every node.
    ///
    /// - A failed stat of the root is reported to `visit` and always fatal.
    /// - A directory whose children cannot be listed is still visited, with
    ///   the error attached; unless `visit` aborts, the walk carries on
    ///   without descending into it.
    /// - A child that cannot be stat-ed is visited with the error attached.
    ///   The error is fatal unless `visit` returns
    ///   [`WalkSignal::SkipSubtree`].
    pub fn walk<V>(&self, mut visit: V) -> Result<(), WalkError>
    where
        V: FnMut(&Visit<'_>) -> WalkSignal,
    {
        let mut stack = vec![Pending {
            path: self.root.clone(),
            depth: 0,
        }];

        while let Some(Pending { path, depth }) = stack.pop() {
            let info = match self.fs.stat(&path) {
                Ok(info) => info,
                Err(err) => {
                    warn!(path = %path, error = %err, "failed to stat entry");
                    let signal = visit(&Visit {
                        path: &path,
                        kind: None,
                        error: Some(&err),
                    });
                    if depth > 0 && signal == WalkSignal::SkipSubtree {
                        continue;
                    }
                    return Err(WalkError::Stat { path, source: err });
                }
            };

            if !info.is_dir() {
                trace!(path = %path, "visiting file");
                let signal = visit(&Visit {
                    path: &path,
                    kind: Some(info.kind()),
                    error: None,
                });
                if signal == WalkSignal::Abort {
                    return Err(WalkError::Aborted { path });
                }
                continue;
            }

            if depth > 0 && self.skip_dir_names.iter().any(|name| name == info.name()) {
                trace!(path = %path, "skipping directory");
                continue;
            }

            let children = self.fs.list_children(&path);
            trace!(path = %path, "visiting directory");
            let signal = visit(&Visit {
                path: &path,
                kind: Some(EntryKind::Dir),
                error: children.as_ref().err(),
            });

            match (signal, children) {
                (WalkSignal::Abort, Err(err)) => {
                    return Err(WalkError::ReadDir { path, source: err })
                }
                (WalkSignal::Abort, Ok(_)) => return Err(WalkError::Aborted { path }),
                (_, Err(err)) => {
                    warn!(path = %path, error = %err, "failed to list directory");
                }
                (WalkSignal::SkipSubtree, Ok(_)) => {}
                (WalkSignal::Continue, Ok(children)) => {
                    // Reversed so the first child is popped first.
                    stack.extend(children.iter().rev().map(|child| Pending {
                        path: self.fs.join(&path, child.name()),
                        depth: depth + 1,
                    }));
                }
            }
        }

        Ok(())
    }
}
