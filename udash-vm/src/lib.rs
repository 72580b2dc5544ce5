#![forbid(unsafe_code)]

mod allowable;
mod analyze;
mod canvas;
mod config;
mod env;
mod error;
mod guard;
mod opcodes;
mod recorder;
mod value;
mod vm;

pub use allowable::{allowable, Allowable};
pub use analyze::Analyzer;
pub use canvas::{Canvas, LineCap, LineJoin, Pattern};
pub use config::{ConfigError, ConfigFile, UnresolvedSymbol, VmConfig};
pub use env::{EnvError, Environment};
pub use error::{ErrorKind, VmError};
pub use guard::SaveGuard;
pub use opcodes::{is_opcode, opcode_arity, opcode_names};
pub use recorder::{DrawOp, Recorder};
pub use value::Value;
pub use vm::{DebugRecord, Vm, CONTROL_WORDS};
