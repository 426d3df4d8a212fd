//! Section-based key/value file reader.
//!
//! The dialect is the classic INI form layer files have always used:
//!
//! ```text
//! # comment
//! [conv1]
//! type = conv
//! inputs = data
//! filterSize: 5      ; inline comment
//! ```
//!
//! Sections and keys keep their declaration order. A `[DEFAULT]` section
//! supplies values to every other section that does not define them.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::config::section::ConfigSection;
use crate::error::{CompileError, Result};

/// Name of the section whose keys are inherited by every other section.
pub const DEFAULT_SECTION: &str = "DEFAULT";

/// A parsed config file: named sections in declaration order.
#[derive(Clone, Debug, Default)]
pub struct ConfigFile {
    path: PathBuf,
    sections: Vec<ConfigSection>,
    index: HashMap<String, usize>,
}

/// Where the parser is currently writing keys.
#[derive(Clone, Copy)]
enum Target {
    Default,
    Section(usize),
}

impl ConfigFile {
    /// Read and parse the file at `path`.
    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(CompileError::MissingFile {
                path: path.to_path_buf(),
            });
        }
        let text = std::fs::read_to_string(path).map_err(|source| CompileError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text, path)
    }

    /// Parse `text`. `path` is only used in diagnostics.
    pub fn parse(text: &str, path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let mut file = ConfigFile {
            path,
            sections: Vec::new(),
            index: HashMap::new(),
        };
        let mut defaults = ConfigSection::new(DEFAULT_SECTION);
        let mut target: Option<Target> = None;
        let mut last_key: Option<String> = None;

        for (lineno, line) in text.lines().enumerate() {
            let lineno = lineno + 1;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with(';') {
                continue;
            }

            // Indented lines continue the previous value.
            if line.starts_with(char::is_whitespace) {
                if let (Some(t), Some(key)) = (target, last_key.as_deref()) {
                    let section = match t {
                        Target::Default => &mut defaults,
                        Target::Section(i) => &mut file.sections[i],
                    };
                    if let Some(value) = section.raw_mut(key) {
                        value.push('\n');
                        value.push_str(trimmed);
                        continue;
                    }
                }
            }

            if let Some(header) = trimmed.strip_prefix('[') {
                // Anything after the closing bracket, such as a comment, is ignored.
                let Some(name) = header.find(']').map(|end| header[..end].trim()) else {
                    return Err(file.syntax(lineno, "unterminated section header"));
                };
                if name.is_empty() {
                    return Err(file.syntax(lineno, "empty section name"));
                }
                target = Some(if name == DEFAULT_SECTION {
                    Target::Default
                } else {
                    Target::Section(file.open_section(name))
                });
                last_key = None;
                continue;
            }

            let Some(t) = target else {
                return Err(file.syntax(lineno, "key/value line before any section header"));
            };
            let Some(split) = trimmed.find(['=', ':']) else {
                return Err(file.syntax(lineno, "expected 'key = value' or 'key: value'"));
            };
            let key = trimmed[..split].trim();
            if key.is_empty() {
                return Err(file.syntax(lineno, "empty key"));
            }
            let value = strip_inline_comment(&trimmed[split + 1..]).trim();

            let section = match t {
                Target::Default => &mut defaults,
                Target::Section(i) => &mut file.sections[i],
            };
            section.insert(key, value);
            last_key = Some(key.to_string());
        }

        for section in &mut file.sections {
            for (key, value) in defaults.iter() {
                if !section.contains_key(key) {
                    section.insert(key, value);
                }
            }
        }

        Ok(file)
    }

    /// Path the file was read from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sections in declaration order.
    pub fn sections(&self) -> &[ConfigSection] {
        &self.sections
    }

    pub fn section(&self, name: &str) -> Option<&ConfigSection> {
        self.index.get(name).map(|&i| &self.sections[i])
    }

    pub fn has_section(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Section names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.sections.iter().map(ConfigSection::name)
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    fn open_section(&mut self, name: &str) -> usize {
        if let Some(&i) = self.index.get(name) {
            return i;
        }
        self.sections.push(ConfigSection::new(name));
        let i = self.sections.len() - 1;
        self.index.insert(name.to_string(), i);
        i
    }

    fn syntax(&self, line: usize, message: &str) -> CompileError {
        CompileError::Syntax {
            path: self.path.clone(),
            line,
            message: message.to_string(),
        }
    }
}

/// Cut a `;` comment from a value, but only when whitespace precedes it.
fn strip_inline_comment(value: &str) -> &str {
    match value.find(';') {
        Some(pos) if pos > 0 && value[..pos].ends_with(char::is_whitespace) => &value[..pos],
        _ => value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    const LAYERS: &str = "\
# layer definitions
[data]
type = data
dataIdx = 0

[conv1]
type=conv
inputs=data
filterSize: 5   ; odd sizes only
channels = 3

[fc10]
type = fc
inputs = conv1
";

    #[test]
    fn test_sections_keep_declaration_order() {
        let cfg = ConfigFile::parse(LAYERS, "layers.cfg").unwrap();
        let names: Vec<&str> = cfg.names().collect();
        assert_eq!(names, vec!["data", "conv1", "fc10"]);

        let conv = cfg.section("conv1").unwrap();
        let keys: Vec<&str> = conv.keys().collect();
        assert_eq!(keys, vec!["type", "inputs", "filtersize", "channels"]);
        assert_eq!(conv.get_int("filterSize").unwrap(), 5);
    }

    #[test]
    fn test_reopened_section_overrides_in_place() {
        let text = "[a]\nx = 1\ny = 2\n[b]\nz = 3\n[a]\nx = 9\n";
        let cfg = ConfigFile::parse(text, "t.cfg").unwrap();
        assert_eq!(cfg.len(), 2);
        let a = cfg.section("a").unwrap();
        assert_eq!(a.iter().collect::<Vec<_>>(), vec![("x", "9"), ("y", "2")]);
    }

    #[test]
    fn test_default_section_is_inherited() {
        let text = "[DEFAULT]\nmomW = 0.9\n[conv1]\nepsW = 0.001\n[conv2]\nmomW = 0.5\n";
        let cfg = ConfigFile::parse(text, "params.cfg").unwrap();
        assert!(!cfg.has_section(DEFAULT_SECTION));
        assert_eq!(cfg.section("conv1").unwrap().get_float("momW").unwrap(), 0.9);
        assert_eq!(cfg.section("conv2").unwrap().get_float("momW").unwrap(), 0.5);
    }

    #[test]
    fn test_continuation_lines() {
        let text = "[fc]\ninitW = 0.01,\n  0.02\n";
        let cfg = ConfigFile::parse(text, "t.cfg").unwrap();
        assert_eq!(cfg.section("fc").unwrap().raw("initW"), Some("0.01,\n0.02"));
        assert_eq!(
            cfg.section("fc").unwrap().get_float_list("initW").unwrap(),
            vec![0.01, 0.02]
        );
    }

    #[test]
    fn test_trailing_text_after_header() {
        let text = "[conv1]   # first conv\ntype = conv\n[fc10] ; classifier\ntype = fc\n";
        let cfg = ConfigFile::parse(text, "layers.cfg").unwrap();
        assert_eq!(cfg.names().collect::<Vec<_>>(), vec!["conv1", "fc10"]);
        assert_eq!(cfg.section("fc10").unwrap().raw("type"), Some("fc"));
    }

    #[test]
    fn test_semicolon_without_whitespace_is_kept() {
        assert_eq!(strip_inline_comment("a;b"), "a;b");
        assert_eq!(strip_inline_comment("a ;b"), "a ");
        assert_eq!(strip_inline_comment(";b"), ";b");
    }

    #[test]
    fn test_syntax_errors_carry_line_numbers() {
        let err = ConfigFile::parse("x = 1\n", "t.cfg").unwrap_err();
        assert!(matches!(err, CompileError::Syntax { line: 1, .. }));

        let err = ConfigFile::parse("[a]\n\nnot a pair\n", "t.cfg").unwrap_err();
        assert!(matches!(err, CompileError::Syntax { line: 3, .. }));
        assert!(err.to_string().starts_with("t.cfg:3:"));

        let err = ConfigFile::parse("[a\n", "t.cfg").unwrap_err();
        assert!(matches!(err, CompileError::Syntax { line: 1, .. }));
    }

    #[test]
    fn test_read_missing_file() {
        let dir = tempdir().expect("failed to create tempdir");
        let path = dir.path().join("nope.cfg");
        let err = ConfigFile::read(&path).unwrap_err();
        assert!(matches!(err, CompileError::MissingFile { path: ref p } if *p == path));
    }

    #[test]
    fn test_read_from_disk() {
        let dir = tempdir().expect("failed to create tempdir");
        let path = dir.path().join("layers.cfg");
        fs::write(&path, LAYERS).expect("failed to write layer file");

        let cfg = ConfigFile::read(&path).unwrap();
        assert_eq!(cfg.path(), path.as_path());
        assert_eq!(cfg.len(), 3);
        assert_eq!(cfg.section("data").unwrap().get_int("dataIdx").unwrap(), 0);
    }

    #[test]
    fn test_read_directory_is_io_error() {
        let dir = tempdir().expect("failed to create tempdir");
        let err = ConfigFile::read(dir.path()).unwrap_err();
        assert!(matches!(err, CompileError::Io { .. }));
    }
}
