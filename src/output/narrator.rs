//! Console narration with an optional log-file mirror
//!
//! Every user-facing line of a run goes through a [`Narrator`]. Once the run log
//! is attached with [`Narrator::mirror_to`], each line is written verbatim to both
//! the console sink and the log file, so the log alone tells the story of the run.

use std::fmt::Display;
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Prefix that tells the reader what kind of line follows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Marker {
    /// Plain line, no prefix
    Plain,
    Success,
    Warning,
    /// A record not present in the previous snapshot
    New,
    /// A record already present in the previous snapshot
    Seen,
    Error,
    /// Record counts
    Count,
    /// Searching or comparing
    Search,
    /// A URL about to be crawled
    Url,
    /// A snapshot file
    File,
    /// End of pagination
    End,
    /// A deleted file
    Delete,
}

impl Marker {
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Plain => "",
            Self::Success => "✅",
            Self::Warning => "⚠️",
            Self::New => "🆕",
            Self::Seen => "🔁",
            Self::Error => "❌",
            Self::Count => "📦",
            Self::Search => "🔍",
            Self::Url => "🌐",
            Self::File => "📄",
            Self::End => "🔚",
            Self::Delete => "🗑️",
        }
    }
}

/// Writes narration lines to a console sink and, optionally, to a log file
pub struct Narrator<W: Write = io::Stdout> {
    console: W,
    mirror: Option<(PathBuf, File)>,
}

impl Narrator<io::Stdout> {
    /// Narrator writing to standard output
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> Narrator<W> {
    pub fn new(console: W) -> Self {
        Self {
            console,
            mirror: None,
        }
    }

    /// Starts copying every following line into a freshly created file at `path`
    ///
    /// An existing file at `path` is truncated.
    pub fn mirror_to(&mut self, path: &Path) -> io::Result<()> {
        let file = File::create(path)?;
        self.mirror = Some((path.to_path_buf(), file));
        Ok(())
    }

    /// Path of the log file currently mirrored to, if any
    pub fn mirror_path(&self) -> Option<&Path> {
        self.mirror.as_ref().map(|(path, _)| path.as_path())
    }

    /// Stops mirroring and closes the log file
    pub fn stop_mirroring(&mut self) {
        self.mirror = None;
    }

    /// Writes one line prefixed with the marker's symbol
    pub fn say(&mut self, marker: Marker, message: impl Display) {
        let line = match marker {
            Marker::Plain => format!("{}\n", message),
            _ => format!("{} {}\n", marker.symbol(), message),
        };
        self.write_raw(&line);
    }

    /// Writes an empty line
    pub fn blank(&mut self) {
        self.write_raw("\n");
    }

    /// Writes text exactly as given to both sinks
    ///
    /// Write failures never abort a run; they are logged and the other sink is
    /// still written.
    pub fn write_raw(&mut self, text: &str) {
        if let Err(e) = self
            .console
            .write_all(text.as_bytes())
            .and_then(|_| self.console.flush())
        {
            tracing::warn!("Failed to write to console: {}", e);
        }

        if let Some((path, file)) = self.mirror.as_mut() {
            if let Err(e) = file.write_all(text.as_bytes()).and_then(|_| file.flush()) {
                tracing::warn!("Failed to write to log {}: {}", path.display(), e);
            }
        }
    }

    /// Consumes the narrator and returns the console sink
    pub fn into_console(self) -> W {
        self.console
    }
}
