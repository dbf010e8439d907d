//! Syntax nodes, field values, and primitive literals.

use serde::{Serialize, Serializer};
use std::fmt;

use super::kind::NodeKind;

/// Start position of a node in the source text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Span {
    /// 1-indexed line.
    pub line: usize,
    /// 0-indexed byte column.
    pub column: usize,
}

/// The value of one named field of a [`SyntaxNode`].
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// A single child node.
    Node(Box<SyntaxNode>),
    /// An ordered sequence of values (usually nodes).
    List(Vec<FieldValue>),
    /// A primitive value: identifier, literal, flag.
    Leaf(Literal),
    /// An optional field that is not set.
    Absent,
}

impl FieldValue {
    pub fn node(node: SyntaxNode) -> Self {
        FieldValue::Node(Box::new(node))
    }

    /// A list of child nodes.
    pub fn nodes(nodes: impl IntoIterator<Item = SyntaxNode>) -> Self {
        FieldValue::List(nodes.into_iter().map(FieldValue::node).collect())
    }

    pub fn optional(node: Option<SyntaxNode>) -> Self {
        node.map(FieldValue::node).unwrap_or(FieldValue::Absent)
    }

    pub fn str(value: impl Into<String>) -> Self {
        FieldValue::Leaf(Literal::Str(value.into()))
    }

    pub fn as_node(&self) -> Option<&SyntaxNode> {
        match self {
            FieldValue::Node(node) => Some(node),
            _ => None,
        }
    }

    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            FieldValue::Leaf(literal) => Some(literal),
            _ => None,
        }
    }
}

/// One node of a parsed Python syntax tree.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntaxNode {
    pub kind: NodeKind,
    pub span: Span,
    /// Named fields in Python's declaration order.
    pub fields: Vec<(&'static str, FieldValue)>,
}

impl SyntaxNode {
    /// A node with no fields yet.
    pub fn new(kind: NodeKind, span: Span) -> Self {
        Self {
            kind,
            span,
            fields: Vec::new(),
        }
    }

    /// Append a field, builder style.
    pub fn with(mut self, name: &'static str, value: FieldValue) -> Self {
        self.fields.push((name, value));
        self
    }

    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(field, _)| *field == name)
            .map(|(_, value)| value)
    }

    /// The child node stored in `name`, if that field holds a single node.
    pub fn child(&self, name: &str) -> Option<&SyntaxNode> {
        self.field(name).and_then(FieldValue::as_node)
    }

    /// The string stored in `name`, if that field holds a string leaf.
    pub fn str_field(&self, name: &str) -> Option<&str> {
        match self.field(name)?.as_literal()? {
            Literal::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Number of nodes in this subtree, this node included.
    pub fn subtree_size(&self) -> usize {
        let mut count = 0;
        let mut stack: Vec<&FieldValue> = Vec::new();
        let mut pending = vec![self];
        while let Some(node) = pending.pop() {
            count += 1;
            stack.extend(node.fields.iter().map(|(_, value)| value));
            while let Some(value) = stack.pop() {
                match value {
                    FieldValue::Node(child) => pending.push(child),
                    FieldValue::List(items) => stack.extend(items),
                    FieldValue::Leaf(_) | FieldValue::Absent => {}
                }
            }
        }
        count
    }
}

// Deep trees would otherwise drop one stack frame per level.
impl Drop for SyntaxNode {
    fn drop(&mut self) {
        let nested =
            |value: &FieldValue| matches!(value, FieldValue::Node(_) | FieldValue::List(_));
        if !self.fields.iter().any(|(_, value)| nested(value)) {
            return;
        }

        let mut stack: Vec<FieldValue> = self.fields.drain(..).map(|(_, value)| value).collect();
        while let Some(value) = stack.pop() {
            match value {
                FieldValue::Node(mut node) => {
                    stack.extend(node.fields.drain(..).map(|(_, value)| value));
                }
                FieldValue::List(items) => stack.extend(items),
                FieldValue::Leaf(_) | FieldValue::Absent => {}
            }
        }
    }
}

/// A primitive value held by a leaf field.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Str(String),
    Bytes(Vec<u8>),
    Int(i64),
    /// An integer literal too large for `i64`, kept as its decimal digits.
    BigInt(String),
    Float(f64),
    /// The imaginary part of a complex literal such as `2j`.
    Complex(f64),
    Bool(bool),
    None,
    Ellipsis,
}

impl fmt::Display for Literal {
    /// Formats the value the way Python's `repr` would.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Str(s) => write_str_repr(f, s),
            Literal::Bytes(bytes) => write_bytes_repr(f, bytes),
            Literal::Int(n) => write!(f, "{}", n),
            Literal::BigInt(digits) => f.write_str(digits),
            Literal::Float(x) => write_float_repr(f, *x, true),
            Literal::Complex(imag) => {
                write_float_repr(f, *imag, false)?;
                f.write_str("j")
            }
            Literal::Bool(true) => f.write_str("True"),
            Literal::Bool(false) => f.write_str("False"),
            Literal::None => f.write_str("None"),
            Literal::Ellipsis => f.write_str("Ellipsis"),
        }
    }
}

impl Serialize for Literal {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Literal::Str(s) => serializer.serialize_str(s),
            Literal::Int(n) => serializer.serialize_i64(*n),
            Literal::Float(x) => serializer.serialize_f64(*x),
            Literal::Bool(b) => serializer.serialize_bool(*b),
            Literal::None => serializer.serialize_none(),
            other => serializer.collect_str(other),
        }
    }
}

/// Shortest round-trip digits, switching to `1e+16` / `1e-05` form outside
/// `1e-4 <= |x| < 1e16`. Integral floats get `.0` when `point_zero` is set.
fn write_float_repr(f: &mut fmt::Formatter<'_>, x: f64, point_zero: bool) -> fmt::Result {
    if x.is_nan() {
        return f.write_str("nan");
    }
    if x.is_infinite() {
        return f.write_str(if x > 0.0 { "inf" } else { "-inf" });
    }

    let scientific = format!("{:e}", x.abs());
    let (mantissa, exponent) = scientific.split_once('e').unwrap_or((&scientific, "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();
    let sign = if x.is_sign_negative() { "-" } else { "" };

    // Digits before the decimal point in positional form.
    let point = exponent + 1;
    if point <= -4 || point > 16 {
        let exp_sign = if exponent < 0 { '-' } else { '+' };
        return write!(f, "{}{}e{}{:02}", sign, mantissa, exp_sign, exponent.abs());
    }

    f.write_str(sign)?;
    let point = point.max(0) as usize;
    if exponent < 0 {
        let zeros = (-exponent - 1) as usize;
        write!(f, "0.{}{}", "0".repeat(zeros), digits)
    } else if point >= digits.len() {
        let zeros = point - digits.len();
        write!(f, "{}{}", digits, "0".repeat(zeros))?;
        if point_zero {
            f.write_str(".0")?;
        }
        Ok(())
    } else {
        write!(f, "{}.{}", &digits[..point], &digits[point..])
    }
}

fn write_str_repr(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    let quote = if s.contains('\'') && !s.contains('"') {
        '"'
    } else {
        '\''
    };
    write!(f, "{}", quote)?;
    for c in s.chars() {
        match c {
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\r' => f.write_str("\\r")?,
            '\t' => f.write_str("\\t")?,
            c if c == quote => write!(f, "\\{}", c)?,
            c if (c as u32) < 0x20 || c as u32 == 0x7f => write!(f, "\\x{:02x}", c as u32)?,
            c => write!(f, "{}", c)?,
        }
    }
    write!(f, "{}", quote)
}

fn write_bytes_repr(f: &mut fmt::Formatter<'_>, bytes: &[u8]) -> fmt::Result {
    let quote = if bytes.contains(&b'\'') && !bytes.contains(&b'"') {
        b'"'
    } else {
        b'\''
    };
    write!(f, "b{}", quote as char)?;
    for &b in bytes {
        match b {
            b'\\' => f.write_str("\\\\")?,
            b'\n' => f.write_str("\\n")?,
            b'\r' => f.write_str("\\r")?,
            b'\t' => f.write_str("\\t")?,
            b if b == quote => write!(f, "\\{}", b as char)?,
            0x20..=0x7e => write!(f, "{}", b as char)?,
            b => write!(f, "\\x{:02x}", b)?,
        }
    }
    write!(f, "{}", quote as char)
}
