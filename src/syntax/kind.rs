//! Node kinds, named after Python's `ast` classes.

use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

macro_rules! node_kinds {
    ($($variant:ident => $name:literal,)*) => {
        /// The grammar category of a syntax node.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum NodeKind {
            $($variant,)*
        }

        impl NodeKind {
            /// Every kind, in declaration order.
            pub const ALL: &'static [NodeKind] = &[$(NodeKind::$variant,)*];

            /// The Python class name of this kind.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(NodeKind::$variant => $name,)*
                }
            }
        }

        impl FromStr for NodeKind {
            type Err = UnknownKind;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($name => Ok(NodeKind::$variant),)*
                    _ => Err(UnknownKind(s.to_string())),
                }
            }
        }
    };
}

node_kinds! {
    Module => "Module",

    // Statements
    FunctionDef => "FunctionDef",
    AsyncFunctionDef => "AsyncFunctionDef",
    ClassDef => "ClassDef",
    Return => "Return",
    Delete => "Delete",
    Assign => "Assign",
    TypeAlias => "TypeAlias",
    AugAssign => "AugAssign",
    AnnAssign => "AnnAssign",
    For => "For",
    AsyncFor => "AsyncFor",
    While => "While",
    If => "If",
    With => "With",
    AsyncWith => "AsyncWith",
    Match => "Match",
    Raise => "Raise",
    Try => "Try",
    TryStar => "TryStar",
    Assert => "Assert",
    Import => "Import",
    ImportFrom => "ImportFrom",
    Global => "Global",
    Nonlocal => "Nonlocal",
    Expr => "Expr",
    Pass => "Pass",
    Break => "Break",
    Continue => "Continue",

    // Expressions
    BoolOp => "BoolOp",
    NamedExpr => "NamedExpr",
    BinOp => "BinOp",
    UnaryOp => "UnaryOp",
    Lambda => "Lambda",
    IfExp => "IfExp",
    Dict => "Dict",
    Set => "Set",
    ListComp => "ListComp",
    SetComp => "SetComp",
    DictComp => "DictComp",
    GeneratorExp => "GeneratorExp",
    Await => "Await",
    Yield => "Yield",
    YieldFrom => "YieldFrom",
    Compare => "Compare",
    Call => "Call",
    FormattedValue => "FormattedValue",
    JoinedStr => "JoinedStr",
    Constant => "Constant",
    Attribute => "Attribute",
    Subscript => "Subscript",
    Starred => "Starred",
    Name => "Name",
    List => "List",
    Tuple => "Tuple",
    Slice => "Slice",

    // Match patterns
    MatchValue => "MatchValue",
    MatchSingleton => "MatchSingleton",
    MatchSequence => "MatchSequence",
    MatchMapping => "MatchMapping",
    MatchClass => "MatchClass",
    MatchStar => "MatchStar",
    MatchAs => "MatchAs",
    MatchOr => "MatchOr",

    // Type parameters
    TypeVar => "TypeVar",
    ParamSpec => "ParamSpec",
    TypeVarTuple => "TypeVarTuple",

    // Expression contexts
    Load => "Load",
    Store => "Store",
    Del => "Del",

    // Boolean operators
    And => "And",
    Or => "Or",

    // Binary operators
    Add => "Add",
    Sub => "Sub",
    Mult => "Mult",
    MatMult => "MatMult",
    Div => "Div",
    Mod => "Mod",
    Pow => "Pow",
    LShift => "LShift",
    RShift => "RShift",
    BitOr => "BitOr",
    BitXor => "BitXor",
    BitAnd => "BitAnd",
    FloorDiv => "FloorDiv",

    // Unary operators
    Invert => "Invert",
    Not => "Not",
    UAdd => "UAdd",
    USub => "USub",

    // Comparison operators
    Eq => "Eq",
    NotEq => "NotEq",
    Lt => "Lt",
    LtE => "LtE",
    Gt => "Gt",
    GtE => "GtE",
    Is => "Is",
    IsNot => "IsNot",
    In => "In",
    NotIn => "NotIn",

    // Helper nodes
    Comprehension => "comprehension",
    ExceptHandler => "ExceptHandler",
    Arguments => "arguments",
    Arg => "arg",
    Keyword => "keyword",
    Alias => "alias",
    WithItem => "withitem",
    MatchCase => "match_case",
}

impl NodeKind {
    /// Binary operator kind for a tree-sitter operator token.
    pub fn binary_operator(token: &str) -> Option<Self> {
        Some(match token {
            "+" => NodeKind::Add,
            "-" => NodeKind::Sub,
            "*" => NodeKind::Mult,
            "@" => NodeKind::MatMult,
            "/" => NodeKind::Div,
            "%" => NodeKind::Mod,
            "**" => NodeKind::Pow,
            "<<" => NodeKind::LShift,
            ">>" => NodeKind::RShift,
            "|" => NodeKind::BitOr,
            "^" => NodeKind::BitXor,
            "&" => NodeKind::BitAnd,
            "//" => NodeKind::FloorDiv,
            _ => return None,
        })
    }

    pub fn unary_operator(token: &str) -> Option<Self> {
        Some(match token {
            "+" => NodeKind::UAdd,
            "-" => NodeKind::USub,
            "~" => NodeKind::Invert,
            "not" => NodeKind::Not,
            _ => return None,
        })
    }

    /// Comparison operator kind. Multi-word operators are joined by a single space.
    pub fn comparison_operator(token: &str) -> Option<Self> {
        Some(match token {
            "==" => NodeKind::Eq,
            "!=" => NodeKind::NotEq,
            "<" => NodeKind::Lt,
            "<=" => NodeKind::LtE,
            ">" => NodeKind::Gt,
            ">=" => NodeKind::GtE,
            "is" => NodeKind::Is,
            "is not" => NodeKind::IsNot,
            "in" => NodeKind::In,
            "not in" => NodeKind::NotIn,
            _ => return None,
        })
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl Serialize for NodeKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// A kind name that no [`NodeKind`] carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownKind(pub String);

impl fmt::Display for UnknownKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown node kind `{}`", self.0)
    }
}

impl std::error::Error for UnknownKind {}
