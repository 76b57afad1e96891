use std::collections::HashMap;

/// The engine's native functions. Scripts cannot define functions of their
/// own; these two are the whole vocabulary, and both need access to the
/// interpreter itself (the jump pointer, the loader), so they are a closed
/// enum rather than function pointers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    /// `GOTO(label)`: jump to the first top-level block carrying the label.
    Goto,
    /// `RUN(path)`: load, parse, and run another script, then merge its
    /// context into the caller's.
    Run,
}

#[derive(Debug)]
pub struct Builtins {
    entries: HashMap<&'static str, Builtin>,
}

impl Builtins {
    pub fn standard() -> Self {
        Self {
            entries: HashMap::from([("GOTO", Builtin::Goto), ("RUN", Builtin::Run)]),
        }
    }

    /// Calls to names not registered here are skipped by the interpreter.
    pub fn lookup(&self, name: &str) -> Option<Builtin> {
        self.entries.get(name).copied()
    }
}
