use crate::error::{AnalyzerError, Result};
use std::ffi::OsString;
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Marker file that turns a directory into an importable package.
pub const PACKAGE_MARKER: &str = "__init__.py";

/// A Python source file read from disk: its path, graph id and line-split text.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: PathBuf,
    pub id: String,
    pub text: String,
    pub lines: Vec<String>,
}

impl SourceFile {
    pub fn read(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| AnalyzerError::io(path, e))?;
        Ok(Self::from_source(path, text))
    }

    pub fn from_source(path: &Path, text: String) -> Self {
        let lines = text.lines().map(str::to_string).collect();
        Self {
            path: normalize(path),
            id: path_id(path),
            text,
            lines,
        }
    }

    /// Directory holding this file, used as the base for relative imports.
    pub fn parent_dir(&self) -> PathBuf {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }
}

/// Lexically normalizes a path: drops `.` components and folds `..` into the
/// preceding component where possible. Does not touch the filesystem.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out: Vec<Component> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(component),
            },
            other => out.push(other),
        }
    }

    if out.is_empty() {
        return PathBuf::from(".");
    }
    out.iter().collect()
}

/// `path` expressed relative to `base`. Both must be normalized absolute
/// paths on the same root, otherwise there is no relative form.
pub fn relative_to(path: &Path, base: &Path) -> Option<PathBuf> {
    let path: Vec<Component> = path.components().collect();
    let base: Vec<Component> = base.components().collect();
    let common = path.iter().zip(&base).take_while(|(a, b)| a == b).count();
    if common == 0 {
        return None;
    }

    let mut out = PathBuf::new();
    for _ in common..base.len() {
        out.push("..");
    }
    for component in &path[common..] {
        out.push(component);
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    Some(out)
}

/// Graph id of a local file: its normalized path with forward slashes.
pub fn path_id(path: &Path) -> String {
    normalize(path).to_string_lossy().replace('\\', "/")
}

/// `path` with `.py` appended to its last component (`pkg/mod` -> `pkg/mod.py`).
pub fn with_py_suffix(path: &Path) -> PathBuf {
    let mut raw: OsString = path.as_os_str().to_owned();
    raw.push(".py");
    PathBuf::from(raw)
}

pub fn is_valid_module(path: &Path) -> bool {
    path.is_file() && path.extension().is_some_and(|ext| ext == "py")
}

pub fn is_valid_package(path: &Path) -> bool {
    path.is_dir() && path.join(PACKAGE_MARKER).is_file()
}

/// Maps a dotted import name onto a relative filesystem path.
///
/// Leading dots become parent steps: one dot is the current package, each
/// further dot climbs a directory (`..a.b` -> `../a/b`, `.` -> `.`).
pub fn dotted_to_path(dotted: &str) -> PathBuf {
    let stripped = dotted.trim_start_matches('.');
    let dots = dotted.len() - stripped.len();

    let mut path = PathBuf::new();
    for _ in 1..dots {
        path.push("..");
    }
    for part in stripped.split('.').filter(|part| !part.is_empty()) {
        path.push(part);
    }

    if path.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        path
    }
}

/// File stem used as the display name of an entry file (`src/app.py` -> `app`).
pub fn file_stem(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("unknown")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_normalize_folds_dots() {
        assert_eq!(normalize(Path::new("./proj/./b.py")), PathBuf::from("proj/b.py"));
        assert_eq!(normalize(Path::new("proj/sub/../b.py")), PathBuf::from("proj/b.py"));
        assert_eq!(normalize(Path::new("../x/y.py")), PathBuf::from("../x/y.py"));
        assert_eq!(normalize(Path::new("proj/..")), PathBuf::from("."));
        assert_eq!(normalize(Path::new("/a/../../b")), PathBuf::from("/b"));
    }

    #[test]
    fn test_relative_to() {
        let base = Path::new("/work/tools");
        assert_eq!(
            relative_to(Path::new("/work/tools/proj"), base),
            Some(PathBuf::from("proj"))
        );
        assert_eq!(
            relative_to(Path::new("/tmp/x/proj"), base),
            Some(PathBuf::from("../../tmp/x/proj"))
        );
        assert_eq!(relative_to(Path::new("/work"), base), Some(PathBuf::from("..")));
        assert_eq!(relative_to(base, base), Some(PathBuf::from(".")));
        assert_eq!(relative_to(Path::new("proj"), base), None);
    }

    #[test]
    fn test_dotted_to_path() {
        assert_eq!(dotted_to_path("a.b.c"), PathBuf::from("a/b/c"));
        assert_eq!(dotted_to_path(".mod"), PathBuf::from("mod"));
        assert_eq!(dotted_to_path("..pkg.mod"), PathBuf::from("../pkg/mod"));
        assert_eq!(dotted_to_path("."), PathBuf::from("."));
        assert_eq!(dotted_to_path(".."), PathBuf::from(".."));
    }

    #[test]
    fn test_with_py_suffix() {
        assert_eq!(with_py_suffix(Path::new("pkg/mod")), PathBuf::from("pkg/mod.py"));
    }

    #[test]
    fn test_module_and_package_checks() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("pkg")).unwrap();
        fs::create_dir_all(root.join("plain")).unwrap();
        fs::write(root.join("pkg/__init__.py"), "").unwrap();
        fs::write(root.join("mod.py"), "").unwrap();
        fs::write(root.join("notes.txt"), "").unwrap();

        assert!(is_valid_package(&root.join("pkg")));
        assert!(!is_valid_package(&root.join("plain")));
        assert!(is_valid_module(&root.join("mod.py")));
        assert!(!is_valid_module(&root.join("notes.txt")));
        assert!(!is_valid_module(&root.join("missing.py")));
    }

    #[test]
    fn test_source_file_lines_and_parent() {
        let file = SourceFile::from_source(Path::new("proj/a.py"), "import os\nx = 1\n".to_string());
        assert_eq!(file.id, "proj/a.py");
        assert_eq!(file.lines, vec!["import os", "x = 1"]);
        assert_eq!(file.parent_dir(), PathBuf::from("proj"));

        let top = SourceFile::from_source(Path::new("main.py"), String::new());
        assert_eq!(top.parent_dir(), PathBuf::from("."));
    }
}
