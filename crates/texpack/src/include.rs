//! Expansion of `\input` and `\include` directives.
//!
//! The includer replaces each directive with the contents of the file it refers to,
//!     producing a single flattened document.
//! Only `\input` nests:
//!     `\input` directives inside included files are expanded recursively,
//!     while `\include` directives are only expanded in the top-level document.
//! This mirrors LaTeX, where `\include` cannot be nested.
//!
//! Each included file has its comments stripped before it is scanned for directives.
//!
//! A directive's argument is resolved relative to the project root by trying
//!     the argument as written and then with each of the extensions in [EXTENSIONS].

use crate::error::{Directive, Error};
use crate::fs::FileSystem;
use std::ops::Range;
use std::path::{Path, PathBuf};

/// Extensions tried, in order, when the argument of a directive is not a file.
pub const EXTENSIONS: [&str; 2] = ["tex", "tikz"];

/// Expands inclusion directives.
pub struct Includer<'a> {
    file_system: &'a dyn FileSystem,
    root: PathBuf,
    clearpage: bool,
    /// Files currently being expanded, outermost first.
    chain: Vec<PathBuf>,
}

impl<'a> Includer<'a> {
    /// Create a new includer that resolves files relative to the provided root.
    pub fn new<P: Into<PathBuf>>(file_system: &'a dyn FileSystem, root: P) -> Self {
        Self {
            file_system,
            root: root.into(),
            clearpage: true,
            chain: vec![],
        }
    }

    /// Set whether the content of each `\include` is wrapped in `\clearpage` commands.
    ///
    /// This is on by default, because LaTeX starts and ends each included file on a new page.
    pub fn clearpage(mut self, clearpage: bool) -> Self {
        self.clearpage = clearpage;
        self
    }

    /// Expand all directives in the source of the top-level document.
    ///
    /// The path of the top-level document is used to detect files that include it.
    pub fn expand(&mut self, source_path: &Path, source: &str) -> Result<String, Error> {
        self.chain.clear();
        self.chain.push(self.root.join(source_path));
        let result = self.expand_text(source, true);
        self.chain.clear();
        result
    }

    fn expand_text(&mut self, source: &str, top_level: bool) -> Result<String, Error> {
        let mut output = String::with_capacity(source.len());
        let mut rest = source;
        while let Some((span, directive, name)) = next_directive(rest, top_level) {
            output.push_str(&rest[..span.start]);
            let path = self.resolve(directive, name)?;
            let content = self.expand_file(path)?;
            let wrap = directive == Directive::Include && self.clearpage;
            if wrap {
                output.push_str("\\clearpage\n");
            }
            output.push_str(&content);
            if wrap {
                output.push_str("\\clearpage\n");
            }
            rest = &rest[span.end..];
        }
        output.push_str(rest);
        Ok(output)
    }

    fn expand_file(&mut self, path: PathBuf) -> Result<String, Error> {
        if self.chain.contains(&path) {
            let mut chain = self.chain.clone();
            chain.push(path);
            return Err(Error::IncludeCycle { chain });
        }
        let source = self
            .file_system
            .read_to_string(&path)
            .map_err(|err| Error::io(format!("could not read `{}`", path.display()), err))?;
        // Commented-out directives in the file must not be expanded.
        let source = crate::strip::strip(&source);
        self.chain.push(path);
        let result = self.expand_text(&source, false);
        self.chain.pop();
        result
    }

    fn resolve(&self, directive: Directive, name: &str) -> Result<PathBuf, Error> {
        let mut tried = vec![];
        let candidates = std::iter::once(name.to_string())
            .chain(EXTENSIONS.iter().map(|extension| format!("{name}.{extension}")));
        for candidate in candidates {
            let path = self.root.join(candidate);
            if self.file_system.is_file(&path) {
                return Ok(path);
            }
            tried.push(path);
        }
        Err(Error::Unresolved {
            directive,
            name: name.to_string(),
            tried,
        })
    }
}

/// Find the next directive in the source.
///
/// Returns the span of the whole directive, the directive, and its argument.
/// The argument must be closed on the same line; otherwise the directive is ignored.
fn next_directive(source: &str, include_allowed: bool) -> Option<(Range<usize>, Directive, &str)> {
    let mut offset = 0;
    loop {
        let i = offset + source[offset..].find('\\')?;
        let rest = &source[i..];
        let matched = if rest.starts_with("\\input{") {
            Some((Directive::Input, "\\input{".len()))
        } else if include_allowed && rest.starts_with("\\include{") {
            Some((Directive::Include, "\\include{".len()))
        } else {
            None
        };
        if let Some((directive, prefix_len)) = matched {
            let argument_start = i + prefix_len;
            let argument = &source[argument_start..];
            if let Some(close) = argument.find(['}', '\n']) {
                if argument[close..].starts_with('}') {
                    let span = i..argument_start + close + 1;
                    return Some((span, directive, &argument[..close]));
                }
            }
        }
        offset = i + 1;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::fs::InMemoryFileSystem;

    const ROOT: &str = "/project";

    fn expand(files: &[(&str, &str)], source: &str, clearpage: bool) -> Result<String, Error> {
        let mut fs = InMemoryFileSystem::new(ROOT);
        for (path, content) in files {
            fs.add_file(path, content);
        }
        Includer::new(&fs, ROOT)
            .clearpage(clearpage)
            .expand(Path::new("main.tex"), source)
    }

    macro_rules! include_tests {
        ($( ($name: ident, $files: expr, $source: expr, $want: expr $(,)? ), )+ ) => {
            $(
                #[test]
                fn $name() {
                    let got = expand(&$files, $source, true).unwrap();
                    let want: String = $want.into();
                    similar_asserts::assert_eq!(got: got, want: want);
                }
            )+
        };
    }

    include_tests!(
        (no_directives, [], "plain\ntext", "plain\ntext"),
        (
            input_with_tex_extension_resolved,
            [("chapter1.tex", "Chapter one\n")],
            "a\n\\input{chapter1}\nb",
            "a\nChapter one\n\nb",
        ),
        (
            input_with_explicit_extension,
            [("chapter1.tex", "Chapter one")],
            "\\input{chapter1.tex}",
            "Chapter one",
        ),
        (
            input_with_tikz_extension_resolved,
            [("plot.tikz", "\\draw (0,0) -- (1,1);")],
            "\\input{plot}",
            "\\draw (0,0) -- (1,1);",
        ),
        (
            commented_out_input_in_included_file,
            [("a.tex", "A\n% \\input{gone}\n")],
            "\\input{a}",
            "A\n%\n",
        ),
        (
            input_in_comment_environment_of_included_file,
            [("a.tex", "A\n\\begin{comment}\n\\input{gone}\n\\end{comment}\nB")],
            "\\input{a}",
            "A\n\nB",
        ),
        (
            exact_name_preferred,
            [("data", "exact"), ("data.tex", "with extension")],
            "\\input{data}",
            "exact",
        ),
        (
            input_in_subdirectory,
            [("sections/intro.tex", "Intro")],
            "[\\input{sections/intro}]",
            "[Intro]",
        ),
        (
            nested_input,
            [("a.tex", "A(\\input{b})"), ("b.tex", "B")],
            "\\input{a}",
            "A(B)",
        ),
        (
            diamond_is_not_a_cycle,
            [("a.tex", "\\input{c}"), ("b.tex", "\\input{c}"), ("c.tex", "C")],
            "\\input{a}\\input{b}",
            "CC",
        ),
        (
            include_wraps_with_clearpage,
            [("ch.tex", "Chapter\n")],
            "\\include{ch}",
            "\\clearpage\nChapter\n\\clearpage\n",
        ),
        (
            include_expands_nested_input,
            [("ch.tex", "\\input{sec}"), ("sec.tex", "Section")],
            "\\include{ch}",
            "\\clearpage\nSection\\clearpage\n",
        ),
        (
            include_does_not_nest,
            [("ch.tex", "\\include{other}")],
            "\\include{ch}",
            "\\clearpage\n\\include{other}\\clearpage\n",
        ),
        (
            include_inside_input_is_not_expanded,
            [("a.tex", "\\include{other}")],
            "\\input{a}",
            "\\include{other}",
        ),
        (
            includegraphics_is_not_a_directive,
            [],
            "\\includegraphics{fig}\\inputencoding{utf8}",
            "\\includegraphics{fig}\\inputencoding{utf8}",
        ),
        (
            unclosed_argument_is_ignored,
            [],
            "\\input{broken\n}",
            "\\input{broken\n}",
        ),
    );

    #[test]
    fn include_without_clearpage() {
        let got = expand(&[("ch.tex", "Chapter")], "\\include{ch}", false).unwrap();
        assert_eq!(got, "Chapter");
    }

    #[test]
    fn missing_file() {
        let err = expand(&[], "\\input{missing}", true).unwrap_err();
        match err {
            Error::Unresolved {
                directive,
                name,
                tried,
            } => {
                assert_eq!(directive, Directive::Input);
                assert_eq!(name, "missing");
                let want: Vec<PathBuf> = vec![
                    "/project/missing".into(),
                    "/project/missing.tex".into(),
                    "/project/missing.tikz".into(),
                ];
                assert_eq!(tried, want);
            }
            err => panic!("unexpected error: {err}"),
        }
    }

    #[test]
    fn missing_file_in_nested_input() {
        let err = expand(&[("a.tex", "\\input{b}")], "\\input{a}", true).unwrap_err();
        assert!(matches!(err, Error::Unresolved { name, .. } if name == "b"));
    }

    #[test]
    fn cycle() {
        let files = [("a.tex", "\\input{b}"), ("b.tex", "\\input{a}")];
        let err = expand(&files, "\\input{a}", true).unwrap_err();
        match err {
            Error::IncludeCycle { chain } => {
                let want: Vec<PathBuf> = vec![
                    "/project/main.tex".into(),
                    "/project/a.tex".into(),
                    "/project/b.tex".into(),
                    "/project/a.tex".into(),
                ];
                assert_eq!(chain, want);
            }
            err => panic!("unexpected error: {err}"),
        }
    }

    #[test]
    fn top_level_document_included_by_itself() {
        let err = expand(&[("main.tex", "\\input{main}")], "\\input{main}", true).unwrap_err();
        assert!(matches!(err, Error::IncludeCycle { chain } if chain.len() == 2));
    }
}
