use std::{
    collections::HashMap,
    io::{self, BufRead},
    path::PathBuf,
};

use rustyline::error::ReadlineError;

/// The engine's input collaborator: hands back one line of user text per
/// request, or `None` once the source is exhausted (end of file, Ctrl-C).
pub trait InputSource {
    fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>>;
}

/// Plain reader-backed input, used for piped stdin and for tests.
pub struct LineInput<R: BufRead>(pub R);

impl<R: BufRead> InputSource for LineInput<R> {
    fn read_line(&mut self, _prompt: &str) -> io::Result<Option<String>> {
        let mut line = String::new();
        if self.0.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(|ch| ch == '\n' || ch == '\r').to_string()))
    }
}

/// Interactive input with line editing, for the terminal binary.
pub struct ReadlineInput {
    editor: rustyline::Editor<()>,
}

impl ReadlineInput {
    pub fn new() -> Self {
        Self {
            editor: rustyline::Editor::new(),
        }
    }
}

impl Default for ReadlineInput {
    fn default() -> Self {
        Self::new()
    }
}

impl InputSource for ReadlineInput {
    fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>> {
        match self.editor.readline(prompt) {
            Ok(line) => Ok(Some(line)),
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => Ok(None),
            Err(err) => Err(io::Error::new(io::ErrorKind::Other, err)),
        }
    }
}

/// The engine's loader collaborator: resolves a `RUN(path)` argument to
/// script text.
pub trait Loader {
    fn load(&self, path: &str) -> io::Result<String>;
}

/// Loads scripts from disk, resolving relative paths against a base
/// directory (normally the including script's directory).
pub struct FsLoader {
    base: PathBuf,
}

impl FsLoader {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }
}

impl Loader for FsLoader {
    fn load(&self, path: &str) -> io::Result<String> {
        std::fs::read_to_string(self.base.join(path))
    }
}

/// In-memory loader, handy for tests and embedding.
impl Loader for HashMap<String, String> {
    fn load(&self, path: &str) -> io::Result<String> {
        self.get(path).cloned().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("no script at {:?}", path))
        })
    }
}
