#![forbid(unsafe_code)]

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::Serialize;
use udash_geom::Point;

/// The value a source lexeme parses to.
///
/// Inference order: integer, float, point literal `(x,y)`, symbol. Numeric
/// literals compare (and hash) by numeric value, so `Integer(3)` equals
/// `Float(3.0)`.
#[derive(Clone, Debug, Serialize)]
#[serde(untagged)]
pub enum Literal {
    Integer(i64),
    Float(f64),
    Point(Point),
    Symbol(String),
}

impl Literal {
    pub fn infer(text: &str) -> Self {
        if let Ok(i) = text.parse::<i64>() {
            return Literal::Integer(i);
        }
        if let Ok(f) = text.parse::<f64>() {
            return Literal::Float(f);
        }
        if let Some(p) = parse_point(text) {
            return Literal::Point(p);
        }
        Literal::Symbol(text.to_string())
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Literal::Integer(i) => Some(*i as f64),
            Literal::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_symbol(&self) -> Option<&str> {
        match self {
            Literal::Symbol(s) => Some(s),
            _ => None,
        }
    }
}

// `(x,y)` with optional sign and fraction on each component.
fn parse_point(text: &str) -> Option<Point> {
    let inner = text.strip_prefix('(')?.strip_suffix(')')?;
    let (x, y) = inner.split_once(',')?;
    Some(Point::new(parse_plain_decimal(x)?, parse_plain_decimal(y)?))
}

fn parse_plain_decimal(s: &str) -> Option<f64> {
    let digits = s.strip_prefix('-').unwrap_or(s);
    let (int, frac) = match digits.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (digits, None),
    };
    let all_digits = |part: &str| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());
    if !all_digits(int) || frac.is_some_and(|f| !all_digits(f)) {
        return None;
    }
    s.parse().ok()
}

impl PartialEq for Literal {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Literal::Integer(a), Literal::Integer(b)) => a == b,
            (Literal::Symbol(a), Literal::Symbol(b)) => a == b,
            (Literal::Point(a), Literal::Point(b)) => a == b,
            _ => match (self.as_number(), other.as_number()) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            },
        }
    }
}

impl PartialEq<f64> for Literal {
    fn eq(&self, other: &f64) -> bool {
        self.as_number() == Some(*other)
    }
}

impl PartialEq<i64> for Literal {
    fn eq(&self, other: &i64) -> bool {
        self.as_number() == Some(*other as f64)
    }
}

impl PartialEq<str> for Literal {
    fn eq(&self, other: &str) -> bool {
        self.as_symbol() == Some(other)
    }
}

impl PartialEq<&str> for Literal {
    fn eq(&self, other: &&str) -> bool {
        self.as_symbol() == Some(*other)
    }
}

impl Hash for Literal {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Literal::Integer(_) | Literal::Float(_) => {
                0u8.hash(state);
                let n = self.as_number().unwrap_or_default();
                if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
                    (n as i64).hash(state);
                } else {
                    n.to_bits().hash(state);
                }
            }
            Literal::Point(p) => {
                1u8.hash(state);
                p.x.to_bits().hash(state);
                p.y.to_bits().hash(state);
            }
            Literal::Symbol(s) => {
                2u8.hash(state);
                s.hash(state);
            }
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Integer(i) => write!(f, "{i}"),
            Literal::Float(x) => write!(f, "{x:?}"),
            Literal::Point(p) => write!(f, "{p}"),
            Literal::Symbol(s) => f.write_str(s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;

    fn hash_of(l: &Literal) -> u64 {
        let mut h = DefaultHasher::new();
        l.hash(&mut h);
        h.finish()
    }

    #[test]
    fn infers_integer_before_float() {
        assert!(matches!(Literal::infer("42"), Literal::Integer(42)));
        assert!(matches!(Literal::infer("-7"), Literal::Integer(-7)));
        assert!(matches!(Literal::infer("2.5"), Literal::Float(f) if f == 2.5));
        assert!(matches!(Literal::infer("1e3"), Literal::Float(f) if f == 1000.0));
    }

    #[test]
    fn large_integers_compare_exactly() {
        assert_ne!(
            Literal::infer("9007199254740993"),
            Literal::infer("9007199254740992")
        );
        assert_eq!(Literal::Integer(3), Literal::Float(3.0));
    }

    #[test]
    fn infers_point_literals() {
        assert_eq!(Literal::infer("(1,-2.5)"), Literal::Point(Point::new(1.0, -2.5)));
        assert!(matches!(Literal::infer("(1, 2)"), Literal::Symbol(_)));
        assert!(matches!(Literal::infer("(inf,1)"), Literal::Symbol(_)));
    }

    #[test]
    fn everything_else_is_a_symbol() {
        assert_eq!(Literal::infer("moveto"), "moveto");
        assert_eq!(Literal::infer("+"), "+");
        assert_eq!(Literal::infer(":x"), ":x");
    }

    #[test]
    fn numeric_literals_compare_by_value() {
        assert_eq!(Literal::Integer(3), Literal::Float(3.0));
        assert_eq!(hash_of(&Literal::Integer(3)), hash_of(&Literal::Float(3.0)));
        assert_eq!(Literal::infer("3"), 3.0);
        assert_eq!(Literal::infer("3"), 3i64);
        assert_ne!(Literal::infer("3"), Literal::Symbol("3".into()));
    }

    #[test]
    fn float_display_reparses_as_float() {
        let lit = Literal::Float(2.0);
        assert!(matches!(Literal::infer(&lit.to_string()), Literal::Float(f) if f == 2.0));
    }
}
