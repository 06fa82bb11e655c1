use clap::Parser;
use texpack::color::Colorize;
use texpack::report::{Event, Reporter};

fn main() {
    if let Err(err) = Cli::parse().run() {
        if !err.is_empty() {
            eprintln!("{} {err}", "Error:".bold().bright_red());
        }
        std::process::exit(1);
    }
}

/// Prepare a LaTeX project for submission to a preprint server like arXiv.
///
/// The top-level document is stripped of comments, its \input and \include
///     directives are expanded, and its figure references are rewritten to flat local names.
/// The result is written to a new directory named after the current time,
///     together with the figures, the style and class files in the project directory,
///     the bibliography (.bbl) file, and any files listed in extra.txt.
///
/// If the project has no .bbl file, LaTeX and BibTeX are run to generate one.
/// A failure here, like a missing figure, is reported but does not stop the run.
#[derive(Debug, clap::Parser)]
#[command(
    name = "texpack",
    version = "0.1",
    about,
    long_about,
    max_term_width(100)
)]
struct Cli {
    /// Path to the top-level .tex file.
    source: std::path::PathBuf,

    /// Maximum number of seconds each toolchain program may run for.
    #[arg(long, default_value_t = 120)]
    toolchain_timeout: u64,

    /// Do not try to generate a missing .bbl file.
    #[arg(long)]
    no_bibliography: bool,

    /// LaTeX program used to generate a missing .bbl file.
    #[arg(long, default_value = "pdflatex")]
    latex: String,

    /// BibTeX program used to generate a missing .bbl file.
    #[arg(long, default_value = "bibtex")]
    bibtex: String,

    /// Do not wrap the content of \include directives in \clearpage commands.
    #[arg(long)]
    no_clearpage: bool,
}

impl Cli {
    fn run(self) -> Result<(), String> {
        let mut options = texpack::assemble::Options::new(&self.source);
        options.clearpage = !self.no_clearpage;
        options.toolchain = if self.no_bibliography {
            None
        } else {
            Some(texpack::bibliography::Toolchain {
                latex: vec![self.latex],
                bibtex: vec![self.bibtex],
                timeout: std::time::Duration::from_secs(self.toolchain_timeout),
            })
        };
        let summary =
            texpack::assemble::run(&options, &mut Terminal).map_err(|err| err.to_string())?;
        Terminal.report(Event::Step(format!("done: {}", summary.output_dir.display())));
        Ok(())
    }
}

const PREFIX: &str = "[texpack]";

/// Reporter that prints events to standard out.
struct Terminal;

impl Reporter for Terminal {
    fn report(&mut self, event: Event) {
        match event {
            Event::Step(message) => println!("{} {message}", PREFIX.bold().bright_green()),
            Event::Copied { from, to } => {
                let line = format!("          {} -> {to}", from.display());
                println!("{}", line.as_str().dimmed());
            }
            Event::Omitted { artifact, reason } => println!(
                "{} skipping {artifact}: {reason}",
                PREFIX.bold().bright_yellow()
            ),
            Event::Warning(message) => {
                println!("{} warning: {message}", PREFIX.bold().bright_yellow())
            }
        }
    }
}
