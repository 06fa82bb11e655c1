//! Regeneration of the bibliography using an external toolchain.
//!
//! Preprint servers usually don't run BibTeX, so the output directory must contain
//!     the generated `.bbl` file.
//! When the project has no `.bbl` file the toolchain is run to produce one:
//!     LaTeX writes the `.aux` file and BibTeX turns it into the `.bbl` file.
//! Both run in a fresh temporary directory that is removed however the run ends.

use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// The external programs used to regenerate the bibliography.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Toolchain {
    /// LaTeX program followed by any leading arguments.
    pub latex: Vec<String>,
    /// BibTeX program followed by any leading arguments.
    pub bibtex: Vec<String>,
    /// Maximum running time of each program.
    pub timeout: Duration,
}

impl Default for Toolchain {
    fn default() -> Self {
        Toolchain {
            latex: vec!["pdflatex".into()],
            bibtex: vec!["bibtex".into()],
            timeout: Duration::from_secs(120),
        }
    }
}

#[derive(Debug)]
pub enum ToolchainError {
    /// The program could not be started.
    Spawn {
        program: String,
        underlying_error: std::io::Error,
    },
    /// The program exited unsuccessfully.
    ExitStatus { program: String, status: ExitStatus },
    /// The program did not finish in time and was killed.
    Timeout { program: String, timeout: Duration },
    /// The toolchain finished but did not produce the expected file.
    MissingOutput { path: PathBuf },
    Io {
        title: String,
        underlying_error: std::io::Error,
    },
}

impl std::fmt::Display for ToolchainError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ToolchainError::Spawn {
                program,
                underlying_error,
            } => write!(f, "could not run `{program}`: {underlying_error}"),
            ToolchainError::ExitStatus { program, status } => {
                write!(f, "`{program}` failed ({status})")
            }
            ToolchainError::Timeout { program, timeout } => write!(
                f,
                "`{program}` did not finish within {} seconds",
                timeout.as_secs_f64()
            ),
            ToolchainError::MissingOutput { path } => {
                write!(f, "`{}` was not generated", path.display())
            }
            ToolchainError::Io {
                title,
                underlying_error,
            } => write!(f, "{title}: {underlying_error}"),
        }
    }
}

impl std::error::Error for ToolchainError {}

impl Toolchain {
    /// Regenerate the `.bbl` file of a document that has been written to the output directory.
    ///
    /// The project's `.bib` and `.bst` files are made available to BibTeX.
    /// On success the `.bbl` file is copied next to the document and its path is returned.
    pub fn regenerate_bbl(
        &self,
        project_root: &Path,
        output_dir: &Path,
        tex_file_name: &str,
    ) -> Result<PathBuf, ToolchainError> {
        let work_dir = tempfile::TempDir::new().map_err(|err| ToolchainError::Io {
            title: "could not create a temporary directory".into(),
            underlying_error: err,
        })?;

        let mut latex = command(&self.latex)?;
        latex
            .args(["-interaction", "nonstopmode", "-recorder", "-output-directory"])
            .arg(work_dir.path())
            .arg(tex_file_name)
            .current_dir(output_dir);
        run_with_timeout(&mut latex, self.timeout)?;

        for extension in ["bib", "bst"] {
            let files = crate::assemble::files_with_extension(project_root, extension)
                .map_err(|err| ToolchainError::Io {
                    title: format!("could not list `{}`", project_root.display()),
                    underlying_error: err,
                })?;
            for file in files {
                copy(&file, work_dir.path())?;
            }
        }

        let stem = tex_file_name.strip_suffix(".tex").unwrap_or(tex_file_name);
        let mut bibtex = command(&self.bibtex)?;
        bibtex
            .arg(format!("{stem}.aux"))
            .current_dir(work_dir.path());
        run_with_timeout(&mut bibtex, self.timeout)?;

        let generated = work_dir.path().join(format!("{stem}.bbl"));
        if !generated.is_file() {
            return Err(ToolchainError::MissingOutput { path: generated });
        }
        copy(&generated, output_dir)
    }
}

fn command(command_line: &[String]) -> Result<Command, ToolchainError> {
    let Some((program, args)) = command_line.split_first() else {
        return Err(ToolchainError::Spawn {
            program: String::new(),
            underlying_error: std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "no program specified",
            ),
        });
    };
    let mut command = Command::new(program);
    command.args(args);
    Ok(command)
}

/// Copy a file into a directory, keeping its name.
fn copy(file: &Path, dir: &Path) -> Result<PathBuf, ToolchainError> {
    let destination = match file.file_name() {
        None => dir.to_path_buf(),
        Some(name) => dir.join(name),
    };
    match std::fs::copy(file, &destination) {
        Ok(_) => Ok(destination),
        Err(err) => Err(ToolchainError::Io {
            title: format!("could not copy `{}`", file.display()),
            underlying_error: err,
        }),
    }
}

/// Run a command to completion, killing it if it runs for longer than the timeout.
///
/// The command gets no input and its output is discarded.
pub fn run_with_timeout(command: &mut Command, timeout: Duration) -> Result<(), ToolchainError> {
    let program = command.get_program().to_string_lossy().into_owned();
    let mut child = command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|err| ToolchainError::Spawn {
            program: program.clone(),
            underlying_error: err,
        })?;
    let deadline = Instant::now() + timeout;
    loop {
        match child.try_wait() {
            Ok(Some(status)) if status.success() => return Ok(()),
            Ok(Some(status)) => return Err(ToolchainError::ExitStatus { program, status }),
            Ok(None) => {}
            Err(err) => {
                let _ = child.kill();
                return Err(ToolchainError::Io {
                    title: format!("could not wait for `{program}`"),
                    underlying_error: err,
                });
            }
        }
        let now = Instant::now();
        if now >= deadline {
            // The child may have exited in the meantime, in which case killing it fails.
            let _ = child.kill();
            let _ = child.wait();
            return Err(ToolchainError::Timeout { program, timeout });
        }
        std::thread::sleep(POLL_INTERVAL.min(deadline - now));
    }
}

#[cfg(all(test, unix))]
mod test {
    use super::*;

    fn sh(script: &str, name: &str) -> Vec<String> {
        vec!["sh".into(), "-c".into(), script.into(), name.into()]
    }

    #[test]
    fn run_success() {
        let result = run_with_timeout(&mut Command::new("true"), Duration::from_secs(10));
        assert!(result.is_ok());
    }

    #[test]
    fn run_non_zero_exit() {
        let result = run_with_timeout(&mut Command::new("false"), Duration::from_secs(10));
        assert!(
            matches!(result, Err(ToolchainError::ExitStatus { program, .. }) if program == "false")
        );
    }

    #[test]
    fn run_timeout() {
        let start = Instant::now();
        let mut command = Command::new("sh");
        command.args(["-c", "exec sleep 10"]);
        let result = run_with_timeout(&mut command, Duration::from_millis(100));
        assert!(matches!(result, Err(ToolchainError::Timeout { .. })));
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn run_missing_program() {
        let mut command = Command::new("texpack-test-no-such-program");
        let result = run_with_timeout(&mut command, Duration::from_secs(10));
        assert!(matches!(result, Err(ToolchainError::Spawn { .. })));
    }

    #[test]
    fn regenerate_bbl() {
        let project = tempfile::TempDir::new().unwrap();
        let output = tempfile::TempDir::new().unwrap();
        std::fs::write(project.path().join("refs.bib"), "@book{knuth}").unwrap();
        std::fs::write(output.path().join("paper_strip.tex"), "").unwrap();
        let toolchain = Toolchain {
            latex: sh(r#"test -f "$6" && touch "$5/${6%.tex}.aux""#, "latex"),
            bibtex: sh(
                r#"test -f refs.bib && test -f "$1" && echo generated > "${1%.aux}.bbl""#,
                "bibtex",
            ),
            timeout: Duration::from_secs(10),
        };

        let got = toolchain
            .regenerate_bbl(project.path(), output.path(), "paper_strip.tex")
            .unwrap();

        assert_eq!(got, output.path().join("paper_strip.bbl"));
        assert_eq!(std::fs::read_to_string(got).unwrap(), "generated\n");
    }

    #[test]
    fn regenerate_bbl_without_output() {
        let project = tempfile::TempDir::new().unwrap();
        let output = tempfile::TempDir::new().unwrap();
        let toolchain = Toolchain {
            latex: sh("exit 0", "latex"),
            bibtex: sh("exit 0", "bibtex"),
            timeout: Duration::from_secs(10),
        };

        let result = toolchain.regenerate_bbl(project.path(), output.path(), "paper_strip.tex");

        assert!(matches!(result, Err(ToolchainError::MissingOutput { .. })));
        assert!(!output.path().join("paper_strip.bbl").exists());
    }

    #[test]
    fn regenerate_bbl_latex_failure() {
        let project = tempfile::TempDir::new().unwrap();
        let output = tempfile::TempDir::new().unwrap();
        let toolchain = Toolchain {
            latex: sh("exit 1", "latex"),
            bibtex: sh("exit 0", "bibtex"),
            timeout: Duration::from_secs(10),
        };

        let result = toolchain.regenerate_bbl(project.path(), output.path(), "paper_strip.tex");

        assert!(matches!(result, Err(ToolchainError::ExitStatus { .. })));
    }
}
