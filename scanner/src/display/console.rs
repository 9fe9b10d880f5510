use std::io::{self, Stdout, Write};
use tracing::debug;

use super::traits::Display;
use super::DisplayError;

const TITLE: &str = "Decoded QR Code";

/// Console rendition of the text surface.
///
/// `clear`/`append` edit an in-memory buffer; `refresh` redraws the buffer
/// once after each change and flushes the writer.
pub struct ConsoleDisplay<W: Write> {
    out: W,
    content: String,
    dirty: bool,
    destroyed: bool,
}

impl ConsoleDisplay<Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> ConsoleDisplay<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            content: String::new(),
            dirty: false,
            destroyed: false,
        }
    }

    #[cfg(test)]
    fn content(&self) -> &str {
        &self.content
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Display for ConsoleDisplay<W> {
    fn clear(&mut self) -> Result<(), DisplayError> {
        self.content.clear();
        self.dirty = true;
        Ok(())
    }

    fn append(&mut self, text: &str) -> Result<(), DisplayError> {
        self.content.push_str(text);
        self.dirty = true;
        Ok(())
    }

    fn refresh(&mut self) -> Result<(), DisplayError> {
        if self.destroyed {
            return Ok(());
        }
        if self.dirty {
            writeln!(self.out, "--- {TITLE} ---")?;
            writeln!(self.out, "{}", self.content)?;
            self.dirty = false;
            debug!(chars = self.content.chars().count(), "console display redrawn");
        }
        self.out.flush()?;
        Ok(())
    }

    fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        let _ = writeln!(self.out, "--- {TITLE}: closed ---");
        let _ = self.out.flush();
    }

    fn name(&self) -> &str {
        "console"
    }
}
