//! Rewriting of figure references.
//!
//! Preprint servers generally want all files in a single directory.
//! Each `\includegraphics{dir/sub/name.ext}` reference is rewritten to the flattened
//!     local name `dir_sub_name.ext`, and a [FigureCopy] is recorded so that the file
//!     can later be copied into the output directory under that name.
//! Folding the directory into the name avoids collisions between figures with
//!     the same name in different directories.

use std::path::{Path, PathBuf};

/// Extension given to figures whose reference has no extension.
pub const DEFAULT_EXTENSION: &str = "pdf";

/// A figure that needs to be copied into the output directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FigureCopy {
    /// File name of the figure, as referenced.
    pub name: String,
    /// Directory of the figure, as referenced. This may be empty.
    pub directory: String,
    /// Name of the figure in the output directory.
    pub new_name: String,
}

/// Result of rewriting the figure references in a document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Figures {
    /// The document with all figure references rewritten.
    pub text: String,
    /// Figures to copy, in order of appearance.
    pub copies: Vec<FigureCopy>,
    /// Directories declared with `\graphicspath`.
    pub graphics_paths: Vec<String>,
}

/// Rewrite all figure references in the source.
pub fn rewrite(source: &str) -> Figures {
    let mut text = String::with_capacity(source.len());
    let mut copies = vec![];
    let mut rest = source;
    while let Some(argument) = next_includegraphics(rest) {
        let copy = FigureCopy::new(rest[argument.clone()].trim());
        text.push_str(&rest[..argument.start]);
        text.push_str(&copy.new_name);
        copies.push(copy);
        rest = &rest[argument.end..];
    }
    text.push_str(rest);
    Figures {
        text,
        copies,
        graphics_paths: graphics_paths(source),
    }
}

/// Parse the directories in the first `\graphicspath{{a/}{b/}}` declaration.
pub fn graphics_paths(source: &str) -> Vec<String> {
    let mut paths = vec![];
    let Some(i) = source.find("\\graphicspath") else {
        return paths;
    };
    let Some(mut rest) = source[i + "\\graphicspath".len()..]
        .trim_start()
        .strip_prefix('{')
    else {
        return paths;
    };
    loop {
        rest = rest.trim_start();
        let Some(group) = rest.strip_prefix('{') else {
            break;
        };
        let Some(close) = group.find('}') else {
            break;
        };
        paths.push(group[..close].to_string());
        rest = &group[close + 1..];
    }
    paths
}

/// Find the argument of the next `\includegraphics` command.
///
/// Returns the span of the path inside the braces.
fn next_includegraphics(source: &str) -> Option<std::ops::Range<usize>> {
    const COMMAND: &str = "\\includegraphics";
    let mut offset = 0;
    loop {
        let start = offset + source[offset..].find(COMMAND)?;
        offset = start + COMMAND.len();
        let mut rest = &source[offset..];
        if rest.starts_with(|c: char| c.is_ascii_alphabetic()) {
            // A different command, like \includegraphicsx.
            continue;
        }
        rest = rest.strip_prefix('*').unwrap_or(rest).trim_start();
        if rest.starts_with('[') {
            let Some(end) = skip_brackets(rest) else {
                continue;
            };
            rest = rest[end..].trim_start();
        }
        let Some(argument) = rest.strip_prefix('{') else {
            continue;
        };
        let Some(close) = argument.find('}') else {
            continue;
        };
        let argument_start = source.len() - argument.len();
        return Some(argument_start..argument_start + close);
    }
}

/// Returns the index just past the `]` matching the `[` at the start of the string.
fn skip_brackets(s: &str) -> Option<usize> {
    let mut depth = 0_usize;
    for (i, c) in s.char_indices() {
        match c {
            '[' => depth += 1,
            ']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
    }
    None
}

impl FigureCopy {
    /// Build the copy task for a figure path as it appears in a reference.
    pub fn new(path: &str) -> FigureCopy {
        let (directory, name) = match path.rfind('/') {
            None => ("", path),
            Some(i) => (&path[..i], &path[i + 1..]),
        };
        let folded = directory.trim_start_matches(['.', '/']);
        let new_name = if folded.is_empty() {
            name.to_string()
        } else {
            format!("{}_{}", folded.replace([' ', '/'], "_"), name)
        };
        FigureCopy {
            name: name.to_string(),
            directory: directory.to_string(),
            new_name,
        }
    }

    /// Path of the figure relative to the project root, ignoring graphics paths.
    pub fn source_path(&self) -> PathBuf {
        Path::new(&self.directory).join(&self.name)
    }

    /// Return this copy task with [DEFAULT_EXTENSION] added if the figure name has no extension.
    pub fn with_default_extension(&self) -> FigureCopy {
        if Path::new(&self.name).extension().is_some() {
            return self.clone();
        }
        FigureCopy {
            name: format!("{}.{DEFAULT_EXTENSION}", self.name),
            directory: self.directory.clone(),
            new_name: format!("{}.{DEFAULT_EXTENSION}", self.new_name),
        }
    }

    /// Copy the figure into the output directory.
    ///
    /// The figure is searched for in the project root first and then in each graphics path,
    ///     like LaTeX does.
    /// The first candidate that is copied successfully wins.
    pub fn copy(&self, root: &Path, graphics_paths: &[String], output_dir: &Path) -> FigureOutcome {
        let copy = self.with_default_extension();
        let destination = output_dir.join(&copy.new_name);
        let mut attempted = vec![];
        let search_dirs = std::iter::once("./").chain(graphics_paths.iter().map(String::as_str));
        for search_dir in search_dirs {
            let candidate = root.join(search_dir).join(copy.source_path());
            let result = std::fs::copy(&candidate, &destination);
            attempted.push(candidate);
            if result.is_ok() {
                return FigureOutcome {
                    new_name: copy.new_name,
                    attempted,
                    copied: true,
                };
            }
        }
        FigureOutcome {
            new_name: copy.new_name,
            attempted,
            copied: false,
        }
    }
}

/// Outcome of copying one figure.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FigureOutcome {
    /// Name of the figure in the output directory.
    pub new_name: String,
    /// Every path that was tried, in order.
    /// If the copy succeeded, the last path is the one that was copied.
    pub attempted: Vec<PathBuf>,
    pub copied: bool,
}

impl FigureOutcome {
    /// Path the figure was copied from, if the copy succeeded.
    pub fn copied_from(&self) -> Option<&Path> {
        if self.copied {
            self.attempted.last().map(PathBuf::as_path)
        } else {
            None
        }
    }
}
