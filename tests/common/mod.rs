#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::fs;
use std::path::{Path, PathBuf};

use sync_relocate::{Filesystem, FsError, NativeFs};

/// Build a source folder with `a.txt`, `b.txt` and `sub/c.txt`.
pub fn populated_source(root: &Path) -> PathBuf {
    let src = root.join("Documents");
    fs::create_dir_all(src.join("sub")).unwrap();
    fs::write(src.join("a.txt"), b"alpha").unwrap();
    fs::write(src.join("b.txt"), b"beta").unwrap();
    fs::write(src.join("sub").join("c.txt"), b"gamma").unwrap();
    src
}

pub fn names(dir: &Path) -> Vec<String> {
    let mut v: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    v.sort();
    v
}

pub fn is_link(path: &Path) -> bool {
    sync_relocate::fs_ops::is_dir_link(path)
}

pub fn running_as_root() -> bool {
    #[cfg(unix)]
    {
        unsafe { libc::geteuid() == 0 }
    }
    #[cfg(not(unix))]
    {
        false
    }
}

fn injected(path: &Path) -> FsError {
    FsError::Io {
        path: path.to_path_buf(),
        detail: "injected failure".into(),
    }
}

fn copy_tree(from: &Path, to: &Path) {
    if from.is_dir() {
        fs::create_dir(to).unwrap();
        for entry in fs::read_dir(from).unwrap() {
            let entry = entry.unwrap();
            copy_tree(&entry.path(), &to.join(entry.file_name()));
        }
    } else {
        fs::copy(from, to).unwrap();
    }
}

/// `NativeFs` wrapper that counts calls and fails chosen operations.
#[derive(Default)]
pub struct FailingFs {
    pub inner: NativeFs,
    /// Fail every move of an entry with this file name.
    pub fail_move_of: Option<String>,
    /// Fail every move whose destination lies inside this directory.
    pub fail_moves_into: Option<PathBuf>,
    pub fail_create_link: bool,
    pub fail_remove_link: bool,
    /// Copy this entry over, delete one file from the original, then fail.
    pub split_move_of: Option<String>,
    /// Fail listing this directory once any entry has moved.
    pub fail_list_after_moves: Option<PathBuf>,
    /// Report this as every link's target.
    pub resolve_override: Option<PathBuf>,
    pub moves: Cell<usize>,
    pub link_calls: Cell<usize>,
    pub calls: RefCell<Vec<String>>,
}

impl FailingFs {
    pub fn new() -> Self {
        Self::default()
    }

    fn note(&self, what: &str, path: &Path) {
        self.calls
            .borrow_mut()
            .push(format!("{what} {}", path.display()));
    }

    /// Number of mutating calls made so far.
    pub fn mutations(&self) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|c| !c.starts_with("list") && !c.starts_with("resolve"))
            .count()
    }
}

impl Filesystem for FailingFs {
    fn move_entry(&self, from: &Path, to: &Path) -> Result<(), FsError> {
        self.note("move", from);
        if let Some(name) = &self.fail_move_of {
            if from.file_name().is_some_and(|n| n.to_string_lossy() == name.as_str()) {
                return Err(injected(from));
            }
        }
        if let Some(dir) = &self.fail_moves_into {
            if to.starts_with(dir) {
                return Err(injected(to));
            }
        }
        if let Some(name) = &self.split_move_of {
            if from.file_name().is_some_and(|n| n.to_string_lossy() == name.as_str()) {
                copy_tree(from, to);
                if let Some(first) = self.inner.list_entries(from).unwrap().first() {
                    fs::remove_file(first).unwrap();
                }
                return Err(injected(from));
            }
        }
        self.moves.set(self.moves.get() + 1);
        self.inner.move_entry(from, to)
    }

    fn create_dir_link(&self, link: &Path, target: &Path) -> Result<(), FsError> {
        self.note("link", link);
        self.link_calls.set(self.link_calls.get() + 1);
        if self.fail_create_link {
            return Err(injected(link));
        }
        self.inner.create_dir_link(link, target)
    }

    fn remove_dir_link(&self, link: &Path) -> Result<(), FsError> {
        self.note("unlink", link);
        if self.fail_remove_link {
            return Err(injected(link));
        }
        self.inner.remove_dir_link(link)
    }

    fn resolve_link(&self, link: &Path) -> Result<PathBuf, FsError> {
        self.note("resolve", link);
        let real = self.inner.resolve_link(link)?;
        Ok(self.resolve_override.clone().unwrap_or(real))
    }

    fn is_dir_link(&self, path: &Path) -> bool {
        self.inner.is_dir_link(path)
    }

    fn create_dir(&self, path: &Path) -> Result<(), FsError> {
        self.note("mkdir", path);
        self.inner.create_dir(path)
    }

    fn remove_empty_dir(&self, path: &Path) -> Result<(), FsError> {
        self.note("rmdir", path);
        self.inner.remove_empty_dir(path)
    }

    fn list_entries(&self, dir: &Path) -> Result<Vec<PathBuf>, FsError> {
        self.note("list", dir);
        if self.moves.get() > 0 && self.fail_list_after_moves.as_deref() == Some(dir) {
            return Err(injected(dir));
        }
        self.inner.list_entries(dir)
    }
}

/// Canonical temp root, so links and comparisons see the same spelling.
pub fn root_of(td: &tempfile::TempDir) -> PathBuf {
    fs::canonicalize(td.path()).unwrap()
}

pub fn make_link(link: &Path, target: &Path) {
    sync_relocate::platform::create_dir_link(link, target).unwrap();
}
