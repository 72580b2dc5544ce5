#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use crate::canvas::Canvas;
use crate::error::VmError;
use crate::opcodes::opcode_names;
use crate::Vm;

/// Which opcodes could run next without failing.
#[derive(Clone, Debug, Default)]
pub struct Allowable {
    pub allowed: Vec<&'static str>,
    pub rejected: BTreeMap<&'static str, VmError>,
}

impl Allowable {
    pub fn is_allowed(&self, name: &str) -> bool {
        self.allowed.contains(&name)
    }
}

/// Tries every opcode against copies of `vm` and `canvas`, leaving both
/// untouched.
///
/// Expects the state a finished run leaves behind, so nothing has to be
/// re-executed.
pub fn allowable<C: Canvas + Clone>(vm: &Vm, canvas: &C) -> Allowable {
    let mut out = Allowable::default();
    for name in opcode_names() {
        let mut vm = vm.clone();
        let mut canvas = canvas.clone();
        match vm.apply(name, &mut canvas) {
            Ok(()) => out.allowed.push(name),
            Err(err) => {
                out.rejected.insert(name, err);
            }
        }
    }
    out
}
