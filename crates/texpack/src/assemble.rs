//! Assembly of the output directory.
//!
//! This module runs the whole pipeline:
//!
//! 1. Read the top-level document.
//! 2. Strip comments. This happens before expanding includes so that
//!     commented-out directives are not expanded.
//! 3. Expand `\input` and `\include` directives.
//! 4. Strip comments again, to clean up the included files.
//! 5. Rewrite figure references.
//! 6. Create the output directory and copy the style files, figures,
//!     bibliography and extra files into it.
//! 7. Write the document.
//! 8. If no bibliography was copied, try to regenerate it.
//!
//! Only a failure to read or write the document, a failure to create the output directory,
//!     and unresolved includes stop the run.
//! Anything else that goes wrong is reported and the affected artifact is left out.

use crate::bibliography::Toolchain;
use crate::error::Error;
use crate::extras;
use crate::figures::{self, FigureOutcome};
use crate::fs::RealFileSystem;
use crate::include::Includer;
use crate::report::{Event, Reporter};
use crate::strip::{Lexer, State};
use std::path::{Path, PathBuf};

/// Extensions of the style, class and bibliography style files copied from the project root.
pub const STYLE_EXTENSIONS: [&str; 3] = ["bst", "sty", "cls"];

/// Suffix added to the stem of the document and of its bibliography in the output directory.
pub const OUTPUT_SUFFIX: &str = "_strip";

/// Options for a run of the pipeline.
#[derive(Clone, Debug)]
pub struct Options {
    /// Directory containing the document and everything it refers to.
    pub root: PathBuf,
    /// File name of the top-level document, relative to the root.
    pub file_name: String,
    /// Name of the output directory, which is created inside the root.
    pub output_dir_name: String,
    /// Whether the content of each `\include` is wrapped in `\clearpage` commands.
    pub clearpage: bool,
    /// Toolchain used to regenerate a missing bibliography.
    /// If `None`, a missing bibliography is just reported.
    pub toolchain: Option<Toolchain>,
}

impl Options {
    /// Default options for the document at the provided path.
    ///
    /// The root is the directory containing the document,
    ///     and the output directory is named after the current time.
    pub fn new(source_path: &Path) -> Options {
        let root = match source_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let file_name = source_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        Options {
            root,
            file_name,
            output_dir_name: output_dir_name(chrono::Local::now()),
            clearpage: true,
            toolchain: Some(Default::default()),
        }
    }

    fn stem(&self) -> &str {
        self.file_name
            .strip_suffix(".tex")
            .unwrap_or(&self.file_name)
    }
}

/// Name of the output directory for a run at the provided time.
pub fn output_dir_name<Tz: chrono::TimeZone>(time: chrono::DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!("arxiv-{}", time.format("%a-%b-%d-%H-%M-%S-%Y"))
}

/// What a successful run produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Summary {
    pub output_dir: PathBuf,
    /// Path of the stripped document in the output directory.
    pub document: PathBuf,
    pub figures: Vec<FigureOutcome>,
    /// Path of the bibliography in the output directory, if there is one.
    pub bibliography: Option<PathBuf>,
}

/// Strip comments, reporting documents that end inside an environment or make-at block.
pub fn strip_reporting(source: &str, file_name: &str, reporter: &mut dyn Reporter) -> String {
    let mut lexer = Lexer::new(source);
    let stripped: String = lexer
        .by_ref()
        .filter(|token| token.kept)
        .map(|token| token.value)
        .collect();
    let unterminated = match lexer.state() {
        State::Initial | State::LineComment => None,
        State::CommentEnv => Some("a comment environment; the rest of the document was dropped"),
        State::Verbatim => Some("a verbatim environment"),
        State::MakeAtBlock | State::MakeAtLineComment => Some("a \\makeatletter block"),
    };
    if let Some(unterminated) = unterminated {
        reporter.report(Event::Warning(format!("`{file_name}` ends inside {unterminated}")));
    }
    stripped
}

/// Run the pipeline.
pub fn run(options: &Options, reporter: &mut dyn Reporter) -> Result<Summary, Error> {
    let source_path = options.root.join(&options.file_name);
    reporter.report(Event::step(format!("reading {}", source_path.display())));
    let source = std::fs::read_to_string(&source_path)
        .map_err(|err| Error::io(format!("could not read `{}`", source_path.display()), err))?;

    reporter.report(Event::step("stripping comments"));
    let source = strip_reporting(&source, &options.file_name, reporter);

    reporter.report(Event::step("expanding includes"));
    let source = Includer::new(&RealFileSystem, &options.root)
        .clearpage(options.clearpage)
        .expand(Path::new(&options.file_name), &source)?;

    reporter.report(Event::step("stripping comments again"));
    let source = strip_reporting(&source, &options.file_name, reporter);

    reporter.report(Event::step("finding figures"));
    let figures = figures::rewrite(&source);

    let output_dir = options.root.join(&options.output_dir_name);
    reporter.report(Event::step(format!("making directory {}", output_dir.display())));
    std::fs::create_dir(&output_dir)
        .map_err(|err| Error::io(format!("could not create `{}`", output_dir.display()), err))?;

    reporter.report(Event::step("copying class/style files"));
    copy_style_files(&options.root, &output_dir, reporter);

    reporter.report(Event::step("copying figures"));
    let figure_outcomes: Vec<FigureOutcome> = figures
        .copies
        .iter()
        .map(|copy| {
            let outcome = copy.copy(&options.root, &figures.graphics_paths, &output_dir);
            match outcome.copied_from() {
                Some(from) => reporter.report(Event::Copied {
                    from: from.to_path_buf(),
                    to: outcome.new_name.clone(),
                }),
                None => reporter.report(Event::omitted(
                    copy.with_default_extension().source_path().display().to_string(),
                    format!(
                        "not found; tried {}",
                        outcome
                            .attempted
                            .iter()
                            .map(|p| format!["`{}`", p.display()])
                            .collect::<Vec<String>>()
                            .join(", ")
                    ),
                )),
            }
            outcome
        })
        .collect();

    reporter.report(Event::step("copying bbl file"));
    let stem = options.stem();
    let bbl_name = format!("{stem}{OUTPUT_SUFFIX}.bbl");
    let mut bibliography = copy_file(
        &options.root.join(format!("{stem}.bbl")),
        &output_dir,
        &bbl_name,
        reporter,
    );

    copy_extra_files(&options.root, &output_dir, reporter);

    let tex_name = format!("{stem}{OUTPUT_SUFFIX}.tex");
    let document = output_dir.join(&tex_name);
    reporter.report(Event::step(format!("writing {tex_name}")));
    std::fs::write(&document, &figures.text)
        .map_err(|err| Error::io(format!("could not write `{}`", document.display()), err))?;

    if bibliography.is_none() {
        if let Some(toolchain) = &options.toolchain {
            reporter.report(Event::step("attempting to generate bbl file"));
            match toolchain.regenerate_bbl(&options.root, &output_dir, &tex_name) {
                Ok(path) => {
                    reporter.report(Event::step(format!("generated {bbl_name}")));
                    bibliography = Some(path);
                }
                Err(err) => reporter.report(Event::omitted(bbl_name, err.to_string())),
            }
        }
    }

    Ok(Summary {
        output_dir,
        document,
        figures: figure_outcomes,
        bibliography,
    })
}

/// List the files in a directory with the provided extension, sorted by path.
pub fn files_with_extension(dir: &Path, extension: &str) -> std::io::Result<Vec<PathBuf>> {
    let mut files = vec![];
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().and_then(std::ffi::OsStr::to_str) == Some(extension) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn copy_style_files(root: &Path, output_dir: &Path, reporter: &mut dyn Reporter) {
    for extension in STYLE_EXTENSIONS {
        let files = match files_with_extension(root, extension) {
            Ok(files) => files,
            Err(err) => {
                reporter.report(Event::omitted(format!("*.{extension}"), err.to_string()));
                continue;
            }
        };
        for file in files {
            if let Some(name) = file.file_name().map(|name| name.to_string_lossy().into_owned()) {
                copy_file(&file, output_dir, &name, reporter);
            }
        }
    }
}

fn copy_extra_files(root: &Path, output_dir: &Path, reporter: &mut dyn Reporter) {
    let list_path = root.join(extras::FILE_NAME);
    let list = match std::fs::read_to_string(&list_path) {
        Ok(list) => list,
        Err(_) => {
            reporter.report(Event::omitted(extras::FILE_NAME, "not found"));
            return;
        }
    };
    reporter.report(Event::step("copying extra files"));
    for path in extras::parse(&list) {
        let file = root.join(&path);
        let Some(name) = path.file_name().map(|name| name.to_string_lossy().into_owned()) else {
            reporter.report(Event::omitted(path.display().to_string(), "not a file"));
            continue;
        };
        if !file.is_file() {
            reporter.report(Event::omitted(path.display().to_string(), "not found"));
            continue;
        }
        copy_file(&file, output_dir, &name, reporter);
    }
}

/// Copy a file into the output directory, reporting the outcome.
fn copy_file(
    from: &Path,
    output_dir: &Path,
    name: &str,
    reporter: &mut dyn Reporter,
) -> Option<PathBuf> {
    let to = output_dir.join(name);
    match std::fs::copy(from, &to) {
        Ok(_) => {
            reporter.report(Event::Copied {
                from: from.to_path_buf(),
                to: name.to_string(),
            });
            Some(to)
        }
        Err(err) => {
            let reason = match err.kind() {
                std::io::ErrorKind::NotFound => "not found".to_string(),
                _ => err.to_string(),
            };
            reporter.report(Event::omitted(from.display().to_string(), reason));
            None
        }
    }
}
