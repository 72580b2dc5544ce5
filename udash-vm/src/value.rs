#![forbid(unsafe_code)]

use std::fmt;

use serde::Serialize;
use udash_ast::Literal;
use udash_geom::{Point, Rect};

use crate::canvas::Pattern;

/// A value on the operand stack.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Value {
    Number(f64),
    Point(Point),
    List(Vec<Value>),
    /// Marks an open path under construction.
    Path,
    /// Marks a drawing context. The root of every stack is one.
    Context,
    Pattern(Pattern),
    String(String),
    Rect(Rect),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "Number",
            Value::Point(_) => "Point",
            Value::List(_) => "List",
            Value::Path => "Path",
            Value::Context => "Context",
            Value::Pattern(_) => "Pattern",
            Value::String(_) => "String",
            Value::Rect(_) => "Rect",
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&Literal> for Value {
    fn from(literal: &Literal) -> Self {
        match literal {
            Literal::Integer(i) => Value::Number(*i as f64),
            Literal::Float(f) => Value::Number(*f),
            Literal::Point(p) => Value::Point(*p),
            Literal::Symbol(s) => Value::String(s.clone()),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<Point> for Value {
    fn from(p: Point) -> Self {
        Value::Point(p)
    }
}

impl From<Rect> for Value {
    fn from(r: Rect) -> Self {
        Value::Rect(r)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

impl PartialEq<f64> for Value {
    fn eq(&self, other: &f64) -> bool {
        self.as_number() == Some(*other)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{n}"),
            Value::Point(p) => write!(f, "{p}"),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Value::Path => f.write_str("<Path>"),
            Value::Context => f.write_str("<Context>"),
            Value::Pattern(p) => write!(f, "{p}"),
            Value::String(s) => f.write_str(s),
            Value::Rect(r) => write!(f, "{r}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literals_become_values() {
        assert_eq!(Value::from(&Literal::Integer(3)), Value::Number(3.0));
        assert_eq!(Value::from(&Literal::infer("(1,2)")), Value::Point(Point::new(1.0, 2.0)));
        assert_eq!(Value::from(&Literal::infer("round")), Value::from("round"));
    }

    #[test]
    fn display_is_compact() {
        let v = Value::from(vec![Value::Number(1.0), Value::Path, Value::from("x")]);
        assert_eq!(v.to_string(), "[1, <Path>, x]");
        assert_eq!(Value::Number(2.5).to_string(), "2.5");
    }
}
