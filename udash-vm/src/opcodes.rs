#![forbid(unsafe_code)]

use std::collections::HashMap;
use std::f64::consts::{PI, TAU};
use std::sync::LazyLock;
use std::time::{SystemTime, UNIX_EPOCH};

use udash_geom::{Point, Rect};

use crate::canvas::{Canvas, LineCap, LineJoin, Pattern};
use crate::error::{Result, VmError};
use crate::vm::DebugRecord;
use crate::{Value, Vm};

pub(crate) type OpFn = fn(&mut Vm, &mut dyn Canvas) -> Result<()>;

/// A built-in word: how many operands it needs, and what it does.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Opcode {
    pub arity: usize,
    pub(crate) run: OpFn,
}

// Ranges longer than this are almost certainly a typo in the step.
const MAX_RANGE_LEN: f64 = 1_000_000.0;

static OPCODES: LazyLock<HashMap<&'static str, Opcode>> = LazyLock::new(build);

pub(crate) fn lookup(name: &str) -> Option<&'static Opcode> {
    OPCODES.get(name)
}

/// Names of all built-in opcodes, sorted.
pub fn opcode_names() -> Vec<&'static str> {
    let mut names: Vec<_> = OPCODES.keys().copied().collect();
    names.sort_unstable();
    names
}

pub fn opcode_arity(name: &str) -> Option<usize> {
    lookup(name).map(|op| op.arity)
}

pub fn is_opcode(name: &str) -> bool {
    OPCODES.contains_key(name)
}

#[derive(Default)]
struct Table(HashMap<&'static str, Opcode>);

impl Table {
    fn add(&mut self, name: &'static str, arity: usize, run: OpFn) {
        self.0.insert(name, Opcode { arity, run });
    }
}

fn build() -> HashMap<&'static str, Opcode> {
    let mut t = Table::default();

    // stack
    t.add("drop", 1, |vm, _| vm.pop().map(|_| ()));
    t.add("dup", 1, |vm, _| {
        let top = vm.peek(0)?;
        vm.push(top);
        Ok(())
    });
    t.add("swap", 2, |vm, _| {
        let a = vm.pop()?;
        let b = vm.pop()?;
        vm.push(a);
        vm.push(b);
        Ok(())
    });
    t.add("rel", 1, |vm, _| {
        let n = vm.pop_number()?;
        let index = as_index(n)?;
        let value = vm.peek(index)?;
        vm.push(value);
        Ok(())
    });

    // arithmetic
    t.add("+", 2, |vm, _| binary(vm, |a, b| a + b));
    t.add("-", 2, |vm, _| binary(vm, |a, b| a - b));
    t.add("*", 2, |vm, _| binary(vm, |a, b| a * b));
    t.add("/", 2, |vm, _| divide(vm, |a, b| a / b));
    t.add("%", 2, |vm, _| divide(vm, |a, b| a - b * (a / b).floor()));
    t.add("min", 2, |vm, _| numeric(vm, f64::min));
    t.add("max", 2, |vm, _| numeric(vm, f64::max));
    t.add("abs", 1, |vm, _| unary(vm, f64::abs));
    t.add("sin", 1, |vm, _| unary(vm, f64::sin));
    t.add("cos", 1, |vm, _| unary(vm, f64::cos));
    t.add("pi", 0, |vm, _| {
        vm.push(Value::Number(PI));
        Ok(())
    });
    t.add("time", 0, |vm, _| {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or_default();
        vm.push(Value::Number(now));
        Ok(())
    });

    // data
    t.add("range", 3, |vm, _| {
        let step = vm.pop_number()?;
        let upper = vm.pop_number()?;
        let lower = vm.pop_number()?;
        if step.is_nan() || step <= 0.0 {
            return Err(VmError::invalid(format!("range step must be positive, got {step}")));
        }
        let count = ((upper - lower) / step).ceil().max(0.0);
        if !count.is_finite() || count > MAX_RANGE_LEN {
            return Err(VmError::invalid("range too long"));
        }
        let items = (0..count as usize)
            .map(|i| Value::Number(lower + i as f64 * step))
            .collect();
        vm.push(Value::List(items));
        Ok(())
    });
    t.add("point", 2, |vm, _| {
        let y = vm.pop_number()?;
        let x = vm.pop_number()?;
        vm.push(Value::Point(Point::new(x, y)));
        Ok(())
    });
    t.add("unpack", 1, |vm, _| match vm.pop()? {
        Value::Point(p) => {
            vm.push(Value::Number(p.y));
            vm.push(Value::Number(p.x));
            Ok(())
        }
        Value::Rect(r) => {
            vm.push(Value::Number(r.height));
            vm.push(Value::Number(r.width));
            vm.push(Value::Point(r.center));
            Ok(())
        }
        other => Err(VmError::type_mismatch("Point or Rect", other.type_name())),
    });
    t.add("len", 1, |vm, _| {
        let len = match vm.pop()? {
            Value::List(items) => items.len() as f64,
            Value::String(s) => s.chars().count() as f64,
            Value::Point(p) => p.length(),
            other => return Err(VmError::type_mismatch("List, String or Point", other.type_name())),
        };
        vm.push(Value::Number(len));
        Ok(())
    });

    // patterns
    t.add("rgb", 3, |vm, _| {
        let b = vm.pop_number()?;
        let g = vm.pop_number()?;
        let r = vm.pop_number()?;
        vm.require_context()?;
        vm.push(Value::Pattern(Pattern::rgb(r, g, b)));
        Ok(())
    });
    t.add("rgba", 4, |vm, _| {
        let a = vm.pop_number()?;
        let b = vm.pop_number()?;
        let g = vm.pop_number()?;
        let r = vm.pop_number()?;
        vm.require_context()?;
        vm.push(Value::Pattern(Pattern::rgba(r, g, b, a)));
        Ok(())
    });

    // path construction
    t.add("circle", 1, |vm, canvas| {
        let radius = vm.pop_number()?;
        maybe_start_path(vm);
        canvas.arc(Point::ORIGIN, radius, 0.0, TAU);
        Ok(())
    });
    t.add("arc", 3, |vm, canvas| {
        let end = vm.pop_number()?;
        let start = vm.pop_number()?;
        let radius = vm.pop_number()?;
        maybe_start_path(vm);
        canvas.arc(Point::ORIGIN, radius, start, end);
        Ok(())
    });
    t.add("rectangle", 2, |vm, canvas| {
        let h = vm.pop_number()?;
        let w = vm.pop_number()?;
        maybe_start_path(vm);
        vm.require_path()?;
        canvas.rectangle(Point::new(w * -0.5, h * -0.5), w, h);
        Ok(())
    });
    t.add("round_rectangle", 3, |vm, canvas| {
        let radius = vm.pop_number()?;
        let h = vm.pop_number()?;
        let w = vm.pop_number()?;
        if radius < 0.0 {
            return Err(VmError::invalid(format!("negative corner radius {radius}")));
        }
        maybe_start_path(vm);
        round_rectangle(canvas, w, h, radius);
        Ok(())
    });
    t.add("moveto", 1, |vm, canvas| {
        let to = vm.pop_point()?;
        maybe_start_path(vm);
        canvas.move_to(to);
        Ok(())
    });
    t.add("lineto", 1, |vm, canvas| {
        let to = vm.pop_point()?;
        maybe_start_path(vm);
        canvas.line_to(to);
        Ok(())
    });
    t.add("curveto", 3, |vm, canvas| {
        let to = vm.pop_point()?;
        let c2 = vm.pop_point()?;
        let c1 = vm.pop_point()?;
        vm.require_path()?;
        canvas.curve_to(c1, c2, to);
        Ok(())
    });
    t.add("close", 1, |vm, canvas| {
        vm.require_path()?;
        canvas.close_path();
        Ok(())
    });
    t.add("new", 0, |vm, canvas| {
        vm.require_context()?;
        vm.push(Value::Path);
        canvas.new_path();
        Ok(())
    });
    t.add("subpath", 0, |vm, canvas| {
        vm.push(Value::Path);
        canvas.new_sub_path();
        Ok(())
    });

    // path consumption
    t.add("fill", 1, |vm, canvas| consume_path(vm, canvas, |c| c.fill()));
    t.add("stroke", 1, |vm, canvas| consume_path(vm, canvas, |c| c.stroke()));
    t.add("clip", 1, |vm, canvas| consume_path(vm, canvas, |c| c.clip()));

    // graphics state
    t.add("source", 1, |vm, canvas| {
        let pattern = vm.pop_pattern()?;
        vm.require_context()?;
        canvas.set_source(pattern);
        Ok(())
    });
    t.add("linewidth", 1, |vm, canvas| {
        let width = vm.pop_number()?;
        vm.require_context()?;
        canvas.set_line_width(width);
        Ok(())
    });
    t.add("linejoin", 1, |vm, canvas| {
        let name = vm.pop_string()?;
        let join = LineJoin::from_name(&name)
            .ok_or_else(|| VmError::invalid(format!("unknown line join `{name}`")))?;
        vm.require_context()?;
        canvas.set_line_join(join);
        Ok(())
    });
    t.add("linecap", 1, |vm, canvas| {
        let name = vm.pop_string()?;
        let cap = LineCap::from_name(&name)
            .ok_or_else(|| VmError::invalid(format!("unknown line cap `{name}`")))?;
        vm.require_context()?;
        canvas.set_line_cap(cap);
        Ok(())
    });
    t.add("save", 0, |_, canvas| {
        canvas.save();
        Ok(())
    });
    t.add("restore", 0, |_, canvas| {
        canvas.restore();
        Ok(())
    });
    t.add("translate", 1, |vm, canvas| {
        let by = vm.pop_point()?;
        vm.require_context()?;
        canvas.translate(by);
        Ok(())
    });
    t.add("rotate", 1, |vm, canvas| {
        let radians = vm.pop_number()?;
        vm.require_context()?;
        canvas.rotate(radians);
        Ok(())
    });
    t.add("scale", 2, |vm, canvas| {
        let sy = vm.pop_number()?;
        let sx = vm.pop_number()?;
        vm.require_context()?;
        canvas.scale(sx, sy);
        Ok(())
    });
    t.add("paint", 0, |vm, canvas| {
        vm.require_context()?;
        canvas.paint();
        Ok(())
    });

    // debug
    t.add(".", 1, |vm, _| {
        let top = vm.peek(0)?;
        vm.record_debug(DebugRecord::Value(top));
        Ok(())
    });
    t.add("!", 0, |vm, _| {
        let snapshot = vm.stack().to_vec();
        vm.record_debug(DebugRecord::Stack(snapshot));
        Ok(())
    });

    // layout queries
    t.add("bounds", 0, |vm, _| push_layout_value(vm, |r| Value::Rect(*r)));
    t.add("center", 0, |vm, _| push_layout_value(vm, |r| Value::Point(r.center)));
    t.add("top", 0, |vm, _| push_layout_value(vm, |r| Value::Number(r.north().y)));
    t.add("bottom", 0, |vm, _| push_layout_value(vm, |r| Value::Number(r.south().y)));
    t.add("left", 0, |vm, _| push_layout_value(vm, |r| Value::Number(r.west().x)));
    t.add("right", 0, |vm, _| push_layout_value(vm, |r| Value::Number(r.east().x)));
    t.add("width", 0, |vm, _| push_layout_value(vm, |r| Value::Number(r.width)));
    t.add("height", 0, |vm, _| push_layout_value(vm, |r| Value::Number(r.height)));
    t.add("radius", 0, |vm, _| push_layout_value(vm, |r| Value::Number(r.radius())));
    t.add("north", 0, |vm, _| push_anchor(vm, Rect::north));
    t.add("south", 0, |vm, _| push_anchor(vm, Rect::south));
    t.add("east", 0, |vm, _| push_anchor(vm, Rect::east));
    t.add("west", 0, |vm, _| push_anchor(vm, Rect::west));
    t.add("northeast", 0, |vm, _| push_anchor(vm, Rect::northeast));
    t.add("southeast", 0, |vm, _| push_anchor(vm, Rect::southeast));
    t.add("northwest", 0, |vm, _| push_anchor(vm, Rect::northwest));
    t.add("southwest", 0, |vm, _| push_anchor(vm, Rect::southwest));

    // layout stack
    t.add("inset", 1, |vm, _| split_layout(vm, Rect::inset));
    t.add("pop", 0, |vm, _| vm.pop_layout());
    t.add("split_left", 1, |vm, _| split_layout(vm, Rect::split_left));
    t.add("split_right", 1, |vm, _| split_layout(vm, Rect::split_right));
    t.add("split_top", 1, |vm, _| split_layout(vm, Rect::split_top));
    t.add("split_bottom", 1, |vm, _| split_layout(vm, Rect::split_bottom));

    t.0
}

fn as_index(n: f64) -> Result<usize> {
    if n < 0.0 || n.fract() != 0.0 || !n.is_finite() {
        return Err(VmError::invalid(format!("`{n}` is not a stack index")));
    }
    Ok(n as usize)
}

// Number or Point on either side; a Number is broadcast against a Point.
fn arith(a: Value, b: Value, f: fn(f64, f64) -> f64) -> Result<Value> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => Ok(Value::Number(f(x, y))),
        (Value::Point(p), Value::Point(q)) => Ok(Value::Point(p.zip_with(q, f))),
        (Value::Point(p), Value::Number(y)) => Ok(Value::Point(p.map(|x| f(x, y)))),
        (Value::Number(x), Value::Point(q)) => Ok(Value::Point(q.map(|y| f(x, y)))),
        (Value::Number(_) | Value::Point(_), other) | (other, _) => {
            Err(VmError::type_mismatch("Number or Point", other.type_name()))
        }
    }
}

fn binary(vm: &mut Vm, f: fn(f64, f64) -> f64) -> Result<()> {
    let b = vm.pop()?;
    let a = vm.pop()?;
    let result = arith(a, b, f)?;
    vm.push(result);
    Ok(())
}

fn divide(vm: &mut Vm, f: fn(f64, f64) -> f64) -> Result<()> {
    let b = vm.pop()?;
    let a = vm.pop()?;
    let zero = match &b {
        Value::Number(y) => *y == 0.0,
        Value::Point(q) => q.x == 0.0 || q.y == 0.0,
        _ => false,
    };
    if zero {
        return Err(VmError::invalid("division by zero"));
    }
    let result = arith(a, b, f)?;
    vm.push(result);
    Ok(())
}

fn numeric(vm: &mut Vm, f: fn(f64, f64) -> f64) -> Result<()> {
    let b = vm.pop_number()?;
    let a = vm.pop_number()?;
    vm.push(Value::Number(f(a, b)));
    Ok(())
}

fn unary(vm: &mut Vm, f: fn(f64) -> f64) -> Result<()> {
    let result = match vm.pop()? {
        Value::Number(x) => Value::Number(f(x)),
        Value::Point(p) => Value::Point(p.map(f)),
        other => return Err(VmError::type_mismatch("Number or Point", other.type_name())),
    };
    vm.push(result);
    Ok(())
}

fn maybe_start_path(vm: &mut Vm) {
    if !vm.top_is_path() {
        vm.push(Value::Path);
    }
}

fn consume_path(vm: &mut Vm, canvas: &mut dyn Canvas, op: fn(&mut dyn Canvas)) -> Result<()> {
    vm.pop_path()?;
    vm.require_context()?;
    op(canvas);
    Ok(())
}

// Four quarter arcs joined by straight edges, centered on the origin.
fn round_rectangle(canvas: &mut dyn Canvas, w: f64, h: f64, radius: f64) {
    let bounds = Rect::new(Point::ORIGIN, w, h);
    let corners = bounds.inset(radius);
    let (top, bottom) = (bounds.north().y, bounds.south().y);
    let (left, right) = (bounds.west().x, bounds.east().x);
    let (nw, ne, se, sw) = (
        corners.northwest(),
        corners.northeast(),
        corners.southeast(),
        corners.southwest(),
    );

    canvas.new_sub_path();
    canvas.arc(nw, radius, PI, PI * 1.5);
    canvas.line_to(Point::new(ne.x, top));
    canvas.arc(ne, radius, PI * 1.5, TAU);
    canvas.line_to(Point::new(right, se.y));
    canvas.arc(se, radius, 0.0, PI * 0.5);
    canvas.line_to(Point::new(sw.x, bottom));
    canvas.arc(sw, radius, PI * 0.5, PI);
    canvas.line_to(Point::new(left, nw.y));
    canvas.close_path();
}

fn push_layout_value(vm: &mut Vm, f: fn(&Rect) -> Value) -> Result<()> {
    let value = f(&vm.layout_top());
    vm.push(value);
    Ok(())
}

fn push_anchor(vm: &mut Vm, anchor: fn(&Rect) -> Point) -> Result<()> {
    let point = anchor(&vm.layout_top());
    vm.push(Value::Point(point));
    Ok(())
}

fn split_layout(vm: &mut Vm, split: fn(&Rect, f64) -> Rect) -> Result<()> {
    let amount = vm.pop_number()?;
    let rect = split(&vm.layout_top(), amount);
    vm.push_layout(rect);
    Ok(())
}
