//! # texpack
//!
//! This crate prepares a LaTeX project for submission to a preprint server.
//! It produces a single self-contained document with all comments removed,
//!     together with exactly the files the document needs:
//!     figures, style and class files, and the bibliography.
//!
//! The main pieces are:
//!
//! - [strip](mod@strip): a lexical comment stripper that understands escaped percent signs,
//!     `comment` and `verbatim` environments, and `\makeatletter` blocks.
//!
//! - [include]: expansion of `\input` and `\include` directives.
//!
//! - [figures]: rewriting of `\includegraphics` references to flattened local names.
//!
//! - [assemble]: the pipeline that ties everything together and fills the output directory.
//!
//! ```
//! let source = "\\makeatletter\n%keep this\n\\makeatother\n%drop this\n";
//! assert_eq!(
//!     texpack::strip(source),
//!     "\\makeatletter\n%keep this\n\\makeatother\n%\n",
//! );
//! ```

pub mod assemble;
pub mod bibliography;
pub mod color;
pub mod error;
pub mod extras;
pub mod figures;
pub mod fs;
pub mod include;
pub mod report;
pub mod strip;

pub use error::Error;
pub use strip::strip;
