//! Progress and omission reports.
//!
//! A run of the pipeline reports what it is doing step by step,
//!     and names every optional artifact it had to leave out.
//! Reports go through the [Reporter] trait so that the binary can print them to the
//!     terminal and tests can collect them.

use std::path::PathBuf;

/// Something worth telling the operator about.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// A pipeline step started.
    Step(String),
    /// A file was copied into the output directory.
    Copied {
        from: PathBuf,
        /// Name of the file in the output directory.
        to: String,
    },
    /// An optional artifact was left out of the output directory.
    Omitted {
        artifact: String,
        reason: String,
    },
    /// Something looks wrong but the run can continue.
    Warning(String),
}

impl Event {
    pub(crate) fn step<S: Into<String>>(message: S) -> Event {
        Event::Step(message.into())
    }

    pub(crate) fn omitted<A: Into<String>, R: Into<String>>(artifact: A, reason: R) -> Event {
        Event::Omitted {
            artifact: artifact.into(),
            reason: reason.into(),
        }
    }
}

/// Receiver of events.
pub trait Reporter {
    fn report(&mut self, event: Event);
}

impl Reporter for Vec<Event> {
    fn report(&mut self, event: Event) {
        self.push(event);
    }
}
