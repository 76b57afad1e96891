mod builtins;
mod context;
mod error;
mod io;
mod template;

pub use context::Context;
pub use error::RuntimeError;
pub use io::{FsLoader, InputSource, LineInput, Loader, ReadlineInput};

use std::{io::Write, rc::Rc};

use itertools::Itertools;
use tracing::{debug, warn};

use crate::{
    ast::{Block, ChoicesBlock, Effect, FunctionCall, Program, TextBlock},
    value::Value,
};
use builtins::{Builtin, Builtins};

/// One run of one program: the program, the instruction pointer into its
/// top-level blocks, a jump recorded by GOTO for the next advance, and the
/// frame's own variable context.
struct Frame {
    program: Rc<Program>,
    pointer: usize,
    jump: Option<usize>,
    context: Context,
}

impl Frame {
    fn new(program: Rc<Program>) -> Self {
        Self {
            program,
            pointer: 0,
            jump: None,
            context: Context::new(),
        }
    }
}

/// Walks a parsed program, writing displayed text to `output`, asking
/// `input` for choice selections, and resolving `RUN` paths through
/// `loader`. Sub-programs started by `RUN` get their own frame and context;
/// a finished frame merges its context into its parent's.
pub struct Interpreter<'io, Out: Write, In: InputSource, L: Loader> {
    output: &'io mut Out,
    input: &'io mut In,
    loader: &'io L,
    builtins: Builtins,
    frames: Vec<Frame>,
}

impl<'io, Out: Write, In: InputSource, L: Loader> Interpreter<'io, Out, In, L> {
    pub fn new(output: &'io mut Out, input: &'io mut In, loader: &'io L) -> Self {
        Self {
            output,
            input,
            loader,
            builtins: Builtins::standard(),
            frames: Vec::new(),
        }
    }

    /// Runs a program to completion and yields its final context.
    pub fn run(&mut self, program: Program) -> Result<Context, RuntimeError> {
        self.frames.push(Frame::new(Rc::new(program)));
        let context = self.run_to_depth(0)?;
        Ok(context.expect("popping the root frame yields its context"))
    }

    /// Drives the frame stack until it shrinks back to `depth` frames.
    /// Returns the popped context only when the stack empties entirely, i.e.
    /// when the root frame finishes.
    fn run_to_depth(&mut self, depth: usize) -> Result<Option<Context>, RuntimeError> {
        while self.frames.len() > depth {
            let (program, pointer) = {
                let frame = self.current_frame();
                (Rc::clone(&frame.program), frame.pointer)
            };
            if pointer >= program.blocks.len() {
                let done = self.frames.pop().expect("the loop guarantees a frame");
                match self.frames.last_mut() {
                    Some(parent) => parent.context.merge(done.context),
                    None => return Ok(Some(done.context)),
                }
                continue;
            }
            if let Err(err) = self.run_block(&program.blocks[pointer]) {
                if err.is_fatal() {
                    return Err(err);
                }
                // A failed text display skips the rest of its block; the run
                // resumes at the next top-level node.
                tracing::error!("{}", err);
            }
            let frame = self.current_frame_mut();
            match frame.jump.take() {
                Some(target) => frame.pointer = target,
                None => frame.pointer += 1,
            }
        }
        Ok(None)
    }

    fn run_block(&mut self, block: &Block) -> Result<(), RuntimeError> {
        match block {
            Block::Text(text) => self.show_text(text),
            Block::Choices(choices) => self.run_choices(choices),
            Block::If(if_statement) => {
                // An absent predicate is false; so is anything that is not
                // exactly the boolean true.
                let truthy = self
                    .context()
                    .get(&if_statement.predicate.name)
                    .map_or(false, Value::is_true);
                let branch = if truthy {
                    &if_statement.then_blocks
                } else {
                    &if_statement.else_blocks
                };
                for block in branch {
                    self.run_block(block)?;
                }
                Ok(())
            }
            Block::Effects(effects) => self.apply_effects(&effects.effects),
            Block::Var(definition) => {
                self.context_mut()
                    .bind(&definition.identifier.name, definition.value.clone());
                Ok(())
            }
            Block::Call(call) => self.call_function(call),
        }
    }

    fn show_text(&mut self, block: &TextBlock) -> Result<(), RuntimeError> {
        let rendered =
            template::fill_in_templates(&block.text, self.context()).map_err(|name| {
                RuntimeError::UnboundTemplateVariable {
                    name,
                    found_at: block.source_span,
                    source_code: self.current_frame().program.source_reference.clone(),
                }
            })?;
        writeln!(self.output, "{}", rendered)?;
        Ok(())
    }

    fn run_choices(&mut self, block: &ChoicesBlock) -> Result<(), RuntimeError> {
        let menu = block
            .choices
            .iter()
            .enumerate()
            .map(|(index, choice)| format!("{}) {}", index, choice.description))
            .join("\n");
        writeln!(self.output, "{}", menu)?;

        let selected = loop {
            let line = self
                .input
                .read_line("")?
                .ok_or(RuntimeError::InputClosed)?;
            let line = line.trim();
            // Only a plain run of digits counts, so "-1" and "+1" re-prompt
            // just like "left" does.
            let parsed = if !line.is_empty() && line.chars().all(|ch| ch.is_ascii_digit()) {
                line.parse::<usize>().ok()
            } else {
                None
            };
            match parsed {
                Some(index) if index < block.choices.len() => break index,
                _ => writeln!(self.output, "Invalid input, please specify number")?,
            }
        };

        let choice = &block.choices[selected];
        self.apply_effects(&choice.effects)?;
        if let Some(text) = &choice.text {
            self.show_text(text)?;
        }
        Ok(())
    }

    fn apply_effects(&mut self, effects: &[Effect]) -> Result<(), RuntimeError> {
        for effect in effects {
            match effect {
                Effect::Var(definition) => {
                    self.context_mut()
                        .bind(&definition.identifier.name, definition.value.clone());
                }
                Effect::Call(call) => self.call_function(call)?,
            }
        }
        Ok(())
    }

    fn call_function(&mut self, call: &FunctionCall) -> Result<(), RuntimeError> {
        match self.builtins.lookup(&call.name.name) {
            Some(Builtin::Goto) => {
                self.goto(&call.argument.to_string());
                Ok(())
            }
            Some(Builtin::Run) => self.run_subprogram(&call.argument.to_string(), call),
            None => {
                warn!("call to unknown function {:?} skipped", call.name.name);
                Ok(())
            }
        }
    }

    /// Points the current frame at the first top-level block labeled
    /// `label`. A miss is a logged no-op.
    fn goto(&mut self, label: &str) {
        let frame = self.current_frame_mut();
        let target = frame
            .program
            .blocks
            .iter()
            .position(|block| block.label().map_or(false, |l| l.name == label));
        match target {
            Some(index) => frame.jump = Some(index),
            None => warn!("GOTO target {:?} not found, continuing", label),
        }
    }

    /// Loads, parses, and runs another script in a fresh frame with an empty
    /// context, synchronously: when this returns, the callee has finished
    /// and its bindings are merged into the current context.
    fn run_subprogram(&mut self, path: &str, call: &FunctionCall) -> Result<(), RuntimeError> {
        let caller_source = self.current_frame().program.source_reference.clone();
        let text = self
            .loader
            .load(path)
            .map_err(|cause| RuntimeError::LoadFailure {
                path: path.to_string(),
                cause,
                found_at: call.source_span,
                source_code: caller_source.clone(),
            })?;
        let program =
            crate::parse(path, &text).map_err(|cause| RuntimeError::SubprogramSyntax {
                path: path.to_string(),
                cause: Box::new(cause),
                found_at: call.source_span,
                source_code: caller_source,
            })?;
        debug!("running sub-program {:?}", path);
        let depth = self.frames.len();
        self.frames.push(Frame::new(Rc::new(program)));
        self.run_to_depth(depth)?;
        Ok(())
    }

    fn current_frame(&self) -> &Frame {
        self.frames
            .last()
            .expect("a frame is always active while blocks run")
    }

    fn current_frame_mut(&mut self) -> &mut Frame {
        self.frames
            .last_mut()
            .expect("a frame is always active while blocks run")
    }

    fn context(&self) -> &Context {
        &self.current_frame().context
    }

    fn context_mut(&mut self) -> &mut Context {
        &mut self.current_frame_mut().context
    }
}
