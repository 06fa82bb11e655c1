//! Errors that stop a run.
//!
//! Missing optional artifacts and toolchain failures are reported as an
//!     [Event](crate::report::Event) instead.

use std::path::PathBuf;

/// Inclusion directive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Directive {
    /// `\input{...}`
    Input,
    /// `\include{...}`
    Include,
}

impl Directive {
    pub fn name(&self) -> &'static str {
        match self {
            Directive::Input => "\\input",
            Directive::Include => "\\include",
        }
    }
}

#[derive(Debug)]
pub enum Error {
    /// The target of an inclusion directive could not be found.
    Unresolved {
        directive: Directive,
        name: String,
        /// Every path that was tried, in order.
        tried: Vec<PathBuf>,
    },

    /// A file includes itself, possibly through other files.
    IncludeCycle {
        /// The chain of files, starting and ending with the same file.
        chain: Vec<PathBuf>,
    },

    /// A filesystem operation failed.
    Io {
        title: String,
        underlying_error: std::io::Error,
    },
}

impl Error {
    pub(crate) fn io(title: String, underlying_error: std::io::Error) -> Error {
        Error::Io {
            title,
            underlying_error,
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Unresolved {
                directive,
                name,
                tried,
            } => {
                write!(
                    f,
                    "could not find the file `{}` referenced by {}; tried ",
                    name,
                    directive.name()
                )?;
                let tried = tried
                    .iter()
                    .map(|p| format!["`{}`", p.display()])
                    .collect::<Vec<String>>()
                    .join(", ");
                write!(f, "{tried}")
            }
            Error::IncludeCycle { chain } => {
                let chain = chain
                    .iter()
                    .map(|p| format!["`{}`", p.display()])
                    .collect::<Vec<String>>()
                    .join(" -> ");
                write!(f, "files include each other in a cycle: {chain}")
            }
            Error::Io {
                title,
                underlying_error,
            } => write!(f, "{title}: {underlying_error}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io {
                underlying_error, ..
            } => Some(underlying_error),
            _ => None,
        }
    }
}
