#![forbid(unsafe_code)]

use std::collections::HashMap;

use serde::Serialize;
use tracing::{debug, trace};
use udash_ast::{Instruction, Literal, Program, Token, TokenId};
use udash_geom::{Matrix, Point, Rect};

use crate::analyze::Provenance;
use crate::canvas::{Canvas, Pattern};
use crate::config::{UnresolvedSymbol, VmConfig};
use crate::error::{ErrorKind, Result, VmError};
use crate::guard::SaveGuard;
use crate::opcodes::{self, Opcode};
use crate::{Environment, Value};

/// Words the dispatcher handles before consulting the opcode table.
pub const CONTROL_WORDS: [&str; 5] = ["loop", "define", "call", "unquote", "load"];

/// Output of the `.` and `!` debug opcodes.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum DebugRecord {
    Value(Value),
    Stack(Vec<Value>),
}

#[derive(Clone, Copy)]
struct Frame<'p> {
    program: &'p Program,
    env: &'p Environment,
}

type Scope = HashMap<String, Value>;

/// The stack machine.
///
/// A `Vm` is meant to live for one render: build it, `run` the entry label,
/// then read back the stack, debug records and transforms. State is kept
/// after a failed run so the host can show where it stopped.
#[derive(Clone, Debug)]
pub struct Vm {
    config: VmConfig,
    // Slot 0 is the root context marker; it is never popped.
    stack: Vec<Value>,
    scopes: Vec<Scope>,
    // Slot 0 is the viewport.
    layout: Vec<Rect>,
    debug_output: Vec<DebugRecord>,
    transforms: HashMap<TokenId, Matrix>,
    current: Option<TokenId>,
    depth: usize,
    pub(crate) provenance: Option<Provenance>,
}

impl Default for Vm {
    fn default() -> Self {
        Self::new(VmConfig::default())
    }
}

impl Vm {
    pub fn new(config: VmConfig) -> Self {
        let layout = vec![config.viewport];
        Self {
            config,
            stack: vec![Value::Context],
            scopes: vec![Scope::new()],
            layout,
            debug_output: Vec::new(),
            transforms: HashMap::new(),
            current: None,
            depth: 0,
            provenance: None,
        }
    }

    pub(crate) fn with_provenance(config: VmConfig) -> Self {
        let mut vm = Self::new(config);
        vm.provenance = Some(Provenance::new());
        vm
    }

    pub fn config(&self) -> &VmConfig {
        &self.config
    }

    /// Operands, bottom first. The root context marker is not included.
    pub fn stack(&self) -> &[Value] {
        &self.stack[1..]
    }

    pub fn debug_output(&self) -> &[DebugRecord] {
        &self.debug_output
    }

    /// Canvas transform recorded right after `token` last executed as part
    /// of a label body.
    pub fn transform_of(&self, token: TokenId) -> Option<Matrix> {
        self.transforms.get(&token).copied()
    }

    /// Innermost layout rectangle.
    pub fn layout(&self) -> Rect {
        self.layout_top()
    }

    pub fn layout_stack(&self) -> &[Rect] {
        &self.layout
    }

    /// Looks `name` up in the scope chain, innermost first.
    pub fn local(&self, name: &str) -> Option<&Value> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    /// Back to the freshly-constructed state, keeping the configuration.
    pub fn reset(&mut self) {
        let traced = self.provenance.is_some();
        *self = Self::new(self.config.clone());
        if traced {
            self.provenance = Some(Provenance::new());
        }
    }

    /// Runs `label` of `program` against `canvas`.
    ///
    /// Saves the program leaves open are restored before returning, and a
    /// `restore` never pops state the caller saved.
    pub fn run(
        &mut self,
        program: &Program,
        label: &str,
        env: &Environment,
        canvas: &mut dyn Canvas,
    ) -> Result<()> {
        if let Some(provenance) = &mut self.provenance {
            provenance.clear_records();
        }
        let frame = Frame { program, env };
        let mut guard = SaveGuard::new(canvas);
        let result = self.call_label(frame, label, &mut guard);
        debug!(
            label,
            ok = result.is_ok(),
            stack = self.stack().len(),
            unmatched_saves = guard.open_saves(),
            "run finished"
        );
        result
    }

    /// Executes a single opcode outside of any program.
    pub fn apply(&mut self, name: &str, canvas: &mut dyn Canvas) -> Result<()> {
        let Some(op) = opcodes::lookup(name) else {
            return Err(ErrorKind::UnknownLabel {
                name: name.to_string(),
            }
            .into());
        };
        self.apply_opcode(name, op, canvas)
    }

    fn call_label(&mut self, frame: Frame<'_>, name: &str, canvas: &mut dyn Canvas) -> Result<()> {
        let Some(body) = frame.program.label(name) else {
            return Err(ErrorKind::UnknownLabel {
                name: name.to_string(),
            }
            .into());
        };
        debug!(label = name, depth = self.depth, "call");
        self.nested(|vm| {
            for instruction in body {
                vm.execute(frame, instruction, canvas)?;
                vm.transforms.insert(instruction.token_id(), canvas.matrix());
            }
            Ok(())
        })
    }

    // Runs `f` one level deeper with a fresh scope, restoring the current
    // token afterwards.
    fn nested(&mut self, f: impl FnOnce(&mut Self) -> Result<()>) -> Result<()> {
        if self.depth >= self.config.max_depth {
            return Err(ErrorKind::DepthLimit {
                limit: self.config.max_depth,
            }
            .into());
        }
        self.depth += 1;
        self.scopes.push(Scope::new());
        let saved = self.current;

        let result = f(self);

        self.current = saved;
        self.scopes.pop();
        self.depth -= 1;
        result
    }

    fn execute(&mut self, frame: Frame<'_>, instruction: &Instruction, canvas: &mut dyn Canvas) -> Result<()> {
        let id = instruction.token_id();
        let token = frame.program.token(id);
        self.current = Some(id);
        if let Some(provenance) = &mut self.provenance {
            provenance.begin(id);
        }

        let result = match instruction {
            Instruction::List { items, .. } => {
                trace!(token = %token, tier = "list", "exec");
                let value = list_value(frame.program, items);
                self.push(value);
                Ok(())
            }
            Instruction::Token(_) => self.execute_token(frame, token, canvas),
        };
        result.map_err(|err| err.at(token))
    }

    fn execute_token(&mut self, frame: Frame<'_>, token: &Token, canvas: &mut dyn Canvas) -> Result<()> {
        match token.symbol() {
            Some(word) => self.dispatch(frame, word, canvas),
            None => {
                trace!(token = %token, tier = "push", "exec");
                self.push(Value::from(&token.literal));
                Ok(())
            }
        }
    }

    fn dispatch(&mut self, frame: Frame<'_>, word: &str, canvas: &mut dyn Canvas) -> Result<()> {
        match word {
            "loop" => return self.run_loop(frame, canvas),
            "define" => return self.define(frame),
            "call" => {
                let name = self.pop_string()?;
                return self.call_label(frame, &name, canvas);
            }
            "unquote" => {
                let body = self.pop_list()?;
                return self.nested(|vm| vm.run_quotation(frame, &body, canvas));
            }
            "load" => return self.load(frame),
            _ => {}
        }

        if let Some(op) = opcodes::lookup(word) {
            trace!(word, tier = "opcode", "exec");
            return self.apply_opcode(word, op, canvas);
        }
        if let Some(value) = self.local(word).cloned() {
            trace!(word, tier = "local", "exec");
            self.push(value);
            return Ok(());
        }
        if let Some(value) = frame.env.get(word) {
            trace!(word, tier = "env", "exec");
            self.push(value.clone());
            return Ok(());
        }
        if frame.program.has_label(word) {
            trace!(word, tier = "label", "exec");
            return self.call_label(frame, word, canvas);
        }
        if let Some(rest) = word.strip_prefix(':').filter(|rest| !rest.is_empty()) {
            trace!(word, tier = "quote", "exec");
            self.push(Value::from(&Literal::infer(rest)));
            return Ok(());
        }

        match self.config.unresolved {
            UnresolvedSymbol::Quote => {
                trace!(word, tier = "push", "exec");
                self.push(Value::String(word.to_string()));
                Ok(())
            }
            UnresolvedSymbol::Reject => Err(ErrorKind::UnknownLabel {
                name: word.to_string(),
            }
            .into()),
        }
    }

    fn apply_opcode(&mut self, name: &str, op: &Opcode, canvas: &mut dyn Canvas) -> Result<()> {
        // Checked up front so an underflow leaves stack and canvas untouched.
        if self.operand_count() < op.arity {
            return Err(ErrorKind::StackUnderflow.into());
        }
        // Opcodes consume at most `arity` operands; put them back on failure.
        let floor = self.stack.len() - op.arity;
        let operands = self.stack[floor..].to_vec();
        let shadow = self.provenance.as_ref().map(|p| p.tail(floor));
        if let Err(err) = (op.run)(self, canvas) {
            self.stack.truncate(floor);
            self.stack.extend(operands);
            if let (Some(provenance), Some(shadow)) = (&mut self.provenance, shadow) {
                provenance.restore_tail(floor, shadow);
            }
            return Err(err);
        }
        if let Some(provenance) = &mut self.provenance {
            match name {
                "save" => provenance.saves += 1,
                // Unmatched restores are dropped by the save guard.
                "restore" => provenance.saves = provenance.saves.saturating_sub(1),
                _ => {}
            }
        }
        Ok(())
    }

    fn run_loop(&mut self, frame: Frame<'_>, canvas: &mut dyn Canvas) -> Result<()> {
        let body = self.pop()?;
        let collection = self.pop_list()?;
        match body {
            Value::String(label) => {
                for item in collection {
                    self.push(item);
                    self.call_label(frame, &label, canvas)?;
                }
                Ok(())
            }
            Value::List(quotation) => {
                for item in collection {
                    self.push(item);
                    self.nested(|vm| vm.run_quotation(frame, &quotation, canvas))?;
                }
                Ok(())
            }
            other => Err(VmError::type_mismatch("String or List", other.type_name())),
        }
    }

    // Strings dispatch as words, anything else is data.
    fn run_quotation(&mut self, frame: Frame<'_>, items: &[Value], canvas: &mut dyn Canvas) -> Result<()> {
        for item in items {
            match item {
                Value::String(word) => self.dispatch(frame, word, canvas)?,
                other => self.push(other.clone()),
            }
        }
        Ok(())
    }

    fn define(&mut self, frame: Frame<'_>) -> Result<()> {
        let name = self.pop_string()?;
        let value = self.pop()?;
        let taken = opcodes::lookup(&name).is_some()
            || CONTROL_WORDS.contains(&name.as_str())
            || frame.env.contains(&name)
            || frame.program.has_label(&name)
            || self.local(&name).is_some();
        if taken {
            return Err(ErrorKind::Redefinition { name }.into());
        }
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name, value);
        }
        Ok(())
    }

    fn load(&mut self, frame: Frame<'_>) -> Result<()> {
        let name = self.pop_string()?;
        let value = self.local(&name).or_else(|| frame.env.get(&name)).cloned();
        match value {
            Some(value) => {
                self.push(value);
                Ok(())
            }
            None => Err(ErrorKind::UnknownLabel { name }.into()),
        }
    }

    // --- operand stack

    pub(crate) fn operand_count(&self) -> usize {
        self.stack.len() - 1
    }

    pub(crate) fn push(&mut self, value: Value) {
        if let Some(provenance) = &mut self.provenance {
            provenance.on_push(self.current);
        }
        self.stack.push(value);
    }

    pub(crate) fn pop(&mut self) -> Result<Value> {
        if self.operand_count() == 0 {
            return Err(ErrorKind::StackUnderflow.into());
        }
        if let Some(provenance) = &mut self.provenance {
            provenance.on_pop(self.current);
        }
        self.stack
            .pop()
            .ok_or_else(|| ErrorKind::StackUnderflow.into())
    }

    /// Copy of the `n`-th operand below the top.
    pub(crate) fn peek(&mut self, n: usize) -> Result<Value> {
        if n >= self.operand_count() {
            return Err(ErrorKind::StackUnderflow.into());
        }
        let index = self.stack.len() - 1 - n;
        if let Some(provenance) = &mut self.provenance {
            provenance.on_peek(index, self.current);
        }
        Ok(self.stack[index].clone())
    }

    // Physical top, root marker included.
    fn peek_top(&mut self) -> &Value {
        let index = self.stack.len() - 1;
        if let Some(provenance) = &mut self.provenance {
            provenance.on_peek(index, self.current);
        }
        &self.stack[index]
    }

    fn require_top(&mut self, marker: Value) -> Result<()> {
        let top = self.peek_top();
        if *top == marker {
            Ok(())
        } else {
            Err(VmError::type_mismatch(marker.type_name(), top.type_name()))
        }
    }

    pub(crate) fn require_context(&mut self) -> Result<()> {
        self.require_top(Value::Context)
    }

    pub(crate) fn require_path(&mut self) -> Result<()> {
        self.require_top(Value::Path)
    }

    pub(crate) fn top_is_path(&mut self) -> bool {
        matches!(self.peek_top(), Value::Path)
    }

    pub(crate) fn pop_number(&mut self) -> Result<f64> {
        match self.pop()? {
            Value::Number(n) => Ok(n),
            other => Err(VmError::type_mismatch("Number", other.type_name())),
        }
    }

    pub(crate) fn pop_point(&mut self) -> Result<Point> {
        match self.pop()? {
            Value::Point(p) => Ok(p),
            other => Err(VmError::type_mismatch("Point", other.type_name())),
        }
    }

    pub(crate) fn pop_string(&mut self) -> Result<String> {
        match self.pop()? {
            Value::String(s) => Ok(s),
            other => Err(VmError::type_mismatch("String", other.type_name())),
        }
    }

    pub(crate) fn pop_list(&mut self) -> Result<Vec<Value>> {
        match self.pop()? {
            Value::List(items) => Ok(items),
            other => Err(VmError::type_mismatch("List", other.type_name())),
        }
    }

    pub(crate) fn pop_pattern(&mut self) -> Result<Pattern> {
        match self.pop()? {
            Value::Pattern(p) => Ok(p),
            other => Err(VmError::type_mismatch("Pattern", other.type_name())),
        }
    }

    pub(crate) fn pop_path(&mut self) -> Result<()> {
        match self.pop()? {
            Value::Path => Ok(()),
            other => Err(VmError::type_mismatch("Path", other.type_name())),
        }
    }

    // --- layout stack

    pub(crate) fn layout_top(&self) -> Rect {
        self.layout.last().copied().unwrap_or(self.config.viewport)
    }

    pub(crate) fn push_layout(&mut self, rect: Rect) {
        self.layout.push(rect);
    }

    pub(crate) fn pop_layout(&mut self) -> Result<()> {
        if self.layout.len() <= 1 {
            return Err(ErrorKind::LayoutUnderflow.into());
        }
        self.layout.pop();
        Ok(())
    }

    pub(crate) fn record_debug(&mut self, record: DebugRecord) {
        self.debug_output.push(record);
    }
}

fn list_value(program: &Program, items: &[Instruction]) -> Value {
    Value::List(
        items
            .iter()
            .map(|item| match item {
                Instruction::Token(id) => Value::from(&program.token(*id).literal),
                Instruction::List { items, .. } => list_value(program, items),
            })
            .collect(),
    )
}
