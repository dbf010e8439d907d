//! Lowering from tree-sitter's concrete Python tree to `ast`-shaped nodes.
//!
//! tree-sitter keeps every token and nests sugar the way the grammar reads
//! (`elif` clauses, left-leaning `and` chains, decorated definitions). The
//! lowering folds those into the shapes Python's own `ast` module produces,
//! with fields in its declaration order.

use tree_sitter::Node;

use super::literal::{decode_bytes, decode_str, parse_number, raw_bytes, StringPrefix};
use crate::error::{AstGraphError, Result};
use crate::syntax::{FieldValue, Literal, NodeKind, Span, SyntaxNode};

/// Deepest statement/expression nesting accepted before parsing fails.
pub const MAX_NESTING: usize = 256;

/// Expression context: whether a name is read, assigned, or deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Ctx {
    Load,
    Store,
    Del,
}

impl Ctx {
    fn node(self, span: Span) -> FieldValue {
        let kind = match self {
            Ctx::Load => NodeKind::Load,
            Ctx::Store => NodeKind::Store,
            Ctx::Del => NodeKind::Del,
        };
        FieldValue::node(SyntaxNode::new(kind, span))
    }
}

/// Lower a tree-sitter `module` node.
pub fn lower_module(root: Node<'_>, source: &[u8]) -> Result<SyntaxNode> {
    let mut lowerer = Lowerer { source, depth: 0 };
    let body = lowerer.block(root)?;
    Ok(SyntaxNode::new(NodeKind::Module, span(root))
        .with("body", FieldValue::nodes(body))
        .with("type_ignores", FieldValue::List(Vec::new())))
}

struct Lowerer<'s> {
    source: &'s [u8],
    depth: usize,
}

/// Pieces of a string literal before they are assembled into a node.
enum StrPart {
    Text(String),
    Bytes(Vec<u8>),
    Formatted(SyntaxNode),
}

/// Parameters collected while walking a parameter list.
#[derive(Default)]
struct ArgumentsBuilder {
    posonlyargs: Vec<SyntaxNode>,
    args: Vec<SyntaxNode>,
    vararg: Option<SyntaxNode>,
    kwonlyargs: Vec<SyntaxNode>,
    kw_defaults: Vec<FieldValue>,
    kwarg: Option<SyntaxNode>,
    defaults: Vec<SyntaxNode>,
    keyword_only: bool,
}

impl ArgumentsBuilder {
    fn push(&mut self, arg: SyntaxNode, default: Option<SyntaxNode>) {
        if self.keyword_only {
            self.kwonlyargs.push(arg);
            self.kw_defaults.push(FieldValue::optional(default));
        } else {
            self.args.push(arg);
            self.defaults.extend(default);
        }
    }

    fn finish(self, span: Span) -> SyntaxNode {
        SyntaxNode::new(NodeKind::Arguments, span)
            .with("posonlyargs", FieldValue::nodes(self.posonlyargs))
            .with("args", FieldValue::nodes(self.args))
            .with("vararg", FieldValue::optional(self.vararg))
            .with("kwonlyargs", FieldValue::nodes(self.kwonlyargs))
            .with("kw_defaults", FieldValue::List(self.kw_defaults))
            .with("kwarg", FieldValue::optional(self.kwarg))
            .with("defaults", FieldValue::nodes(self.defaults))
    }
}

/// A `for_in_clause` whose trailing `if_clause`s are still being collected.
struct PendingComprehension {
    span: Span,
    target: SyntaxNode,
    iter: SyntaxNode,
    ifs: Vec<SyntaxNode>,
    is_async: bool,
}

impl<'s> Lowerer<'s> {
    fn text(&self, node: Node<'_>) -> &'s str {
        node.utf8_text(self.source).unwrap_or_default()
    }

    fn slice(&self, start: usize, end: usize) -> &'s str {
        self.source
            .get(start..end)
            .and_then(|bytes| std::str::from_utf8(bytes).ok())
            .unwrap_or_default()
    }

    fn enter(&mut self, node: Node<'_>) -> Result<()> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            let at = span(node);
            return Err(AstGraphError::syntax(at.line, at.column, "too deeply nested"));
        }
        Ok(())
    }

    // ─── Statements ─────────────────────────────────────────────

    fn block(&mut self, node: Node<'_>) -> Result<Vec<SyntaxNode>> {
        named_children(node)
            .into_iter()
            .map(|child| self.statement(child))
            .collect()
    }

    fn suite(&mut self, node: Option<Node<'_>>) -> Result<FieldValue> {
        match node {
            Some(block) => Ok(FieldValue::nodes(self.block(block)?)),
            None => Ok(FieldValue::List(Vec::new())),
        }
    }

    fn statement(&mut self, node: Node<'_>) -> Result<SyntaxNode> {
        self.enter(node)?;
        let result = self.statement_inner(node);
        self.depth -= 1;
        result
    }

    fn statement_inner(&mut self, node: Node<'_>) -> Result<SyntaxNode> {
        let at = span(node);
        let stmt = match node.kind() {
            "expression_statement" => self.expression_statement(node)?,
            "return_statement" => {
                let value = match named_children(node).first() {
                    Some(&value) => Some(self.expr(value, Ctx::Load)?),
                    None => None,
                };
                SyntaxNode::new(NodeKind::Return, at).with("value", FieldValue::optional(value))
            }
            "delete_statement" => {
                let mut targets = Vec::new();
                for child in named_children(node) {
                    if child.kind() == "expression_list" {
                        for item in named_children(child) {
                            targets.push(self.expr(item, Ctx::Del)?);
                        }
                    } else {
                        targets.push(self.expr(child, Ctx::Del)?);
                    }
                }
                SyntaxNode::new(NodeKind::Delete, at).with("targets", FieldValue::nodes(targets))
            }
            "raise_statement" => {
                let cause = node.child_by_field_name("cause");
                let exc = named_children(node)
                    .into_iter()
                    .find(|child| Some(child.id()) != cause.map(|c| c.id()));
                SyntaxNode::new(NodeKind::Raise, at)
                    .with("exc", self.optional_expr(exc)?)
                    .with("cause", self.optional_expr(cause)?)
            }
            "assert_statement" => {
                let children = named_children(node);
                let test = first(node, &children)?;
                SyntaxNode::new(NodeKind::Assert, at)
                    .with("test", FieldValue::node(self.expr(test, Ctx::Load)?))
                    .with("msg", self.optional_expr(children.get(1).copied())?)
            }
            "pass_statement" => SyntaxNode::new(NodeKind::Pass, at),
            "break_statement" => SyntaxNode::new(NodeKind::Break, at),
            "continue_statement" => SyntaxNode::new(NodeKind::Continue, at),
            "global_statement" | "nonlocal_statement" => {
                let kind = if node.kind() == "global_statement" {
                    NodeKind::Global
                } else {
                    NodeKind::Nonlocal
                };
                let names = named_children(node)
                    .into_iter()
                    .map(|name| FieldValue::str(self.text(name)))
                    .collect();
                SyntaxNode::new(kind, at).with("names", FieldValue::List(names))
            }
            "import_statement" => {
                SyntaxNode::new(NodeKind::Import, at).with("names", self.import_names(node))
            }
            "import_from_statement" | "future_import_statement" => self.import_from(node),
            "if_statement" => self.if_statement(node)?,
            "for_statement" => {
                let kind = if has_token(node, "async") {
                    NodeKind::AsyncFor
                } else {
                    NodeKind::For
                };
                SyntaxNode::new(kind, at)
                    .with("target", self.required(node, "left", Ctx::Store)?)
                    .with("iter", self.required(node, "right", Ctx::Load)?)
                    .with("body", self.suite(node.child_by_field_name("body"))?)
                    .with("orelse", self.else_suite(node.child_by_field_name("alternative"))?)
                    .with("type_comment", FieldValue::Absent)
            }
            "while_statement" => SyntaxNode::new(NodeKind::While, at)
                .with("test", self.required(node, "condition", Ctx::Load)?)
                .with("body", self.suite(node.child_by_field_name("body"))?)
                .with("orelse", self.else_suite(node.child_by_field_name("alternative"))?),
            "try_statement" => self.try_statement(node)?,
            "with_statement" => self.with_statement(node)?,
            "function_definition" => self.function_def(node, Vec::new())?,
            "class_definition" => self.class_def(node, Vec::new())?,
            "decorated_definition" => self.decorated(node)?,
            "match_statement" => self.match_statement(node)?,
            "type_alias_statement" => self.type_alias(node)?,
            "print_statement" | "exec_statement" => return Err(python2_statement(node)),
            other => return Err(unsupported(node, other)),
        };
        Ok(stmt)
    }

    fn expression_statement(&mut self, node: Node<'_>) -> Result<SyntaxNode> {
        let at = span(node);
        let children = named_children(node);
        let value = match children.as_slice() {
            [single] => match single.kind() {
                "assignment" => return self.assignment(*single),
                "augmented_assignment" => return self.augmented_assignment(*single),
                _ => self.expr(*single, Ctx::Load)?,
            },
            [] => return Err(missing(node, "expression")),
            many => {
                let elts = self.exprs(many, Ctx::Load)?;
                tuple(elts, Ctx::Load, at)
            }
        };
        Ok(SyntaxNode::new(NodeKind::Expr, at).with("value", FieldValue::node(value)))
    }

    fn assignment(&mut self, node: Node<'_>) -> Result<SyntaxNode> {
        let at = span(node);
        let left = field(node, "left")?;

        if let Some(annotation) = node.child_by_field_name("type") {
            let simple = i64::from(left.kind() == "identifier");
            return Ok(SyntaxNode::new(NodeKind::AnnAssign, at)
                .with("target", FieldValue::node(self.expr(left, Ctx::Store)?))
                .with("annotation", FieldValue::node(self.expr(annotation, Ctx::Load)?))
                .with("value", self.optional_expr(node.child_by_field_name("right"))?)
                .with("simple", FieldValue::Leaf(Literal::Int(simple))));
        }

        let mut targets = vec![self.expr(left, Ctx::Store)?];
        let mut right = field(node, "right")?;
        while right.kind() == "assignment" && right.child_by_field_name("type").is_none() {
            targets.push(self.expr(field(right, "left")?, Ctx::Store)?);
            right = field(right, "right")?;
        }

        Ok(SyntaxNode::new(NodeKind::Assign, at)
            .with("targets", FieldValue::nodes(targets))
            .with("value", FieldValue::node(self.expr(right, Ctx::Load)?))
            .with("type_comment", FieldValue::Absent))
    }

    fn augmented_assignment(&mut self, node: Node<'_>) -> Result<SyntaxNode> {
        let operator = field(node, "operator")?;
        let op = NodeKind::binary_operator(operator.kind().trim_end_matches('='))
            .ok_or_else(|| unsupported(operator, operator.kind()))?;
        Ok(SyntaxNode::new(NodeKind::AugAssign, span(node))
            .with("target", self.required(node, "left", Ctx::Store)?)
            .with("op", operator_node(op, operator))
            .with("value", self.required(node, "right", Ctx::Load)?))
    }

    fn if_statement(&mut self, node: Node<'_>) -> Result<SyntaxNode> {
        let test = self.required(node, "condition", Ctx::Load)?;
        let body = self.suite(node.child_by_field_name("consequence"))?;

        // Fold `elif`/`else` from the end so each `elif` nests in the previous `orelse`.
        let mut orelse = FieldValue::List(Vec::new());
        for alternative in field_children(node, "alternative").into_iter().rev() {
            match alternative.kind() {
                "else_clause" => orelse = self.else_suite(Some(alternative))?,
                "elif_clause" => {
                    let nested = SyntaxNode::new(NodeKind::If, span(alternative))
                        .with("test", self.required(alternative, "condition", Ctx::Load)?)
                        .with("body", self.suite(alternative.child_by_field_name("consequence"))?)
                        .with("orelse", orelse);
                    orelse = FieldValue::nodes([nested]);
                }
                _ => {}
            }
        }

        Ok(SyntaxNode::new(NodeKind::If, span(node))
            .with("test", test)
            .with("body", body)
            .with("orelse", orelse))
    }

    fn else_suite(&mut self, clause: Option<Node<'_>>) -> Result<FieldValue> {
        let body = clause.and_then(|clause| {
            clause
                .child_by_field_name("body")
                .or_else(|| child_of_kind(clause, "block"))
        });
        self.suite(body)
    }

    fn try_statement(&mut self, node: Node<'_>) -> Result<SyntaxNode> {
        let mut handlers = Vec::new();
        let mut orelse = FieldValue::List(Vec::new());
        let mut finalbody = FieldValue::List(Vec::new());
        let mut star = false;

        for child in named_children(node) {
            match child.kind() {
                "except_clause" => handlers.push(self.except_handler(child)?),
                "except_group_clause" => {
                    star = true;
                    handlers.push(self.except_handler(child)?);
                }
                "else_clause" => orelse = self.else_suite(Some(child))?,
                "finally_clause" => finalbody = self.suite(child_of_kind(child, "block"))?,
                _ => {}
            }
        }

        let kind = if star { NodeKind::TryStar } else { NodeKind::Try };
        Ok(SyntaxNode::new(kind, span(node))
            .with("body", self.suite(node.child_by_field_name("body"))?)
            .with("handlers", FieldValue::nodes(handlers))
            .with("orelse", orelse)
            .with("finalbody", finalbody))
    }

    fn except_handler(&mut self, node: Node<'_>) -> Result<SyntaxNode> {
        let children = named_children(node);
        let exprs: Vec<Node<'_>> = children
            .iter()
            .copied()
            .filter(|child| child.kind() != "block")
            .collect();

        let mut handled = node.child_by_field_name("value").or(exprs.first().copied());
        let mut alias = node.child_by_field_name("alias").or(exprs.get(1).copied());
        if let Some(pattern) = handled.filter(|n| n.kind() == "as_pattern") {
            let (value, target) = split_as_pattern(pattern);
            handled = value;
            alias = target;
        }

        let name = match alias {
            Some(alias) => FieldValue::str(self.text(alias)),
            None => FieldValue::Absent,
        };
        Ok(SyntaxNode::new(NodeKind::ExceptHandler, span(node))
            .with("type", self.optional_expr(handled)?)
            .with("name", name)
            .with("body", self.suite(child_of_kind(node, "block"))?))
    }

    fn with_statement(&mut self, node: Node<'_>) -> Result<SyntaxNode> {
        let kind = if has_token(node, "async") {
            NodeKind::AsyncWith
        } else {
            NodeKind::With
        };

        let mut items = Vec::new();
        let clause = child_of_kind(node, "with_clause");
        for item in clause.map(named_children).unwrap_or_default() {
            if item.kind() != "with_item" {
                continue;
            }
            let value = match item.child_by_field_name("value") {
                Some(value) => value,
                None => first(item, &named_children(item))?,
            };
            let (context, target) = if value.kind() == "as_pattern" {
                split_as_pattern(value)
            } else {
                (Some(value), None)
            };
            let context = context.ok_or_else(|| missing(item, "context expression"))?;
            items.push(
                SyntaxNode::new(NodeKind::WithItem, span(item))
                    .with("context_expr", FieldValue::node(self.expr(context, Ctx::Load)?))
                    .with("optional_vars", self.optional_target(target)?),
            );
        }

        Ok(SyntaxNode::new(kind, span(node))
            .with("items", FieldValue::nodes(items))
            .with("body", self.suite(node.child_by_field_name("body"))?)
            .with("type_comment", FieldValue::Absent))
    }

    fn function_def(&mut self, node: Node<'_>, decorators: Vec<SyntaxNode>) -> Result<SyntaxNode> {
        let kind = if has_token(node, "async") {
            NodeKind::AsyncFunctionDef
        } else {
            NodeKind::FunctionDef
        };
        let name = self.text(field(node, "name")?);
        let args = self.arguments(node.child_by_field_name("parameters"), span(node))?;

        Ok(SyntaxNode::new(kind, span(node))
            .with("name", FieldValue::str(name))
            .with("args", FieldValue::node(args))
            .with("body", self.suite(node.child_by_field_name("body"))?)
            .with("decorator_list", FieldValue::nodes(decorators))
            .with("returns", self.optional_expr(node.child_by_field_name("return_type"))?)
            .with("type_comment", FieldValue::Absent)
            .with("type_params", self.type_params(node.child_by_field_name("type_parameters"))?))
    }

    fn class_def(&mut self, node: Node<'_>, decorators: Vec<SyntaxNode>) -> Result<SyntaxNode> {
        let name = self.text(field(node, "name")?);
        let (bases, keywords) = match node.child_by_field_name("superclasses") {
            Some(superclasses) => self.call_arguments(superclasses)?,
            None => (Vec::new(), Vec::new()),
        };

        Ok(SyntaxNode::new(NodeKind::ClassDef, span(node))
            .with("name", FieldValue::str(name))
            .with("bases", FieldValue::nodes(bases))
            .with("keywords", FieldValue::nodes(keywords))
            .with("body", self.suite(node.child_by_field_name("body"))?)
            .with("decorator_list", FieldValue::nodes(decorators))
            .with("type_params", self.type_params(node.child_by_field_name("type_parameters"))?))
    }

    fn decorated(&mut self, node: Node<'_>) -> Result<SyntaxNode> {
        let mut decorators = Vec::new();
        for decorator in named_children(node) {
            if decorator.kind() == "decorator" {
                let expression = first(decorator, &named_children(decorator))?;
                decorators.push(self.expr(expression, Ctx::Load)?);
            }
        }

        let definition = field(node, "definition")?;
        match definition.kind() {
            "function_definition" => self.function_def(definition, decorators),
            "class_definition" => self.class_def(definition, decorators),
            other => Err(unsupported(definition, other)),
        }
    }

    fn import_names(&self, node: Node<'_>) -> FieldValue {
        let names = field_children(node, "name")
            .into_iter()
            .map(|name| self.alias(name))
            .collect::<Vec<_>>();
        FieldValue::nodes(names)
    }

    fn alias(&self, node: Node<'_>) -> SyntaxNode {
        let (name, asname) = match node.kind() {
            "aliased_import" => (
                node.child_by_field_name("name").map(|n| self.text(n)).unwrap_or_default(),
                node.child_by_field_name("alias")
                    .map(|n| FieldValue::str(self.text(n)))
                    .unwrap_or(FieldValue::Absent),
            ),
            _ => (self.text(node), FieldValue::Absent),
        };
        SyntaxNode::new(NodeKind::Alias, span(node))
            .with("name", FieldValue::str(name))
            .with("asname", asname)
    }

    fn import_from(&self, node: Node<'_>) -> SyntaxNode {
        let (module, level) = match node.child_by_field_name("module_name") {
            Some(module) if module.kind() == "relative_import" => {
                let level = child_of_kind(module, "import_prefix")
                    .map(|prefix| self.text(prefix).matches('.').count())
                    .unwrap_or(0);
                let name = child_of_kind(module, "dotted_name")
                    .map(|name| FieldValue::str(self.text(name)))
                    .unwrap_or(FieldValue::Absent);
                (name, level)
            }
            Some(module) => (FieldValue::str(self.text(module)), 0),
            None => (FieldValue::str("__future__"), 0),
        };

        let names = match child_of_kind(node, "wildcard_import") {
            Some(star) => FieldValue::nodes([SyntaxNode::new(NodeKind::Alias, span(star))
                .with("name", FieldValue::str("*"))
                .with("asname", FieldValue::Absent)]),
            None => self.import_names(node),
        };

        SyntaxNode::new(NodeKind::ImportFrom, span(node))
            .with("module", module)
            .with("names", names)
            .with("level", FieldValue::Leaf(Literal::Int(level as i64)))
    }

    fn match_statement(&mut self, node: Node<'_>) -> Result<SyntaxNode> {
        let subjects = field_children(node, "subject");
        let subject = match subjects.as_slice() {
            [single] => self.expr(*single, Ctx::Load)?,
            [] => return Err(missing(node, "subject")),
            many => {
                let elts = self.exprs(many, Ctx::Load)?;
                tuple(elts, Ctx::Load, span(many[0]))
            }
        };

        let mut cases = Vec::new();
        let body = node.child_by_field_name("body");
        for case in body.map(named_children).unwrap_or_default() {
            if case.kind() != "case_clause" {
                continue;
            }
            let guard = match case.child_by_field_name("guard") {
                Some(clause) => Some(self.expr(first(clause, &named_children(clause))?, Ctx::Load)?),
                None => None,
            };
            let pattern = self.case_patterns(case)?;
            cases.push(
                SyntaxNode::new(NodeKind::MatchCase, span(case))
                    .with("pattern", FieldValue::node(pattern))
                    .with("guard", FieldValue::optional(guard))
                    .with("body", self.suite(case.child_by_field_name("consequence"))?),
            );
        }

        Ok(SyntaxNode::new(NodeKind::Match, span(node))
            .with("subject", FieldValue::node(subject))
            .with("cases", FieldValue::nodes(cases)))
    }

    fn type_alias(&mut self, node: Node<'_>) -> Result<SyntaxNode> {
        let left = unwrap_type(field(node, "left")?)?;
        let (name, params) = if left.kind() == "generic_type" {
            let name = first(left, &named_children(left))?;
            (name, child_of_kind(left, "type_parameter"))
        } else {
            (left, None)
        };
        if name.kind() != "identifier" {
            return Err(unsupported(name, name.kind()));
        }

        Ok(SyntaxNode::new(NodeKind::TypeAlias, span(node))
            .with("name", FieldValue::node(name_node(self.text(name), Ctx::Store, span(name))))
            .with("type_params", self.type_params(params)?)
            .with("value", self.required(node, "right", Ctx::Load)?))
    }

    /// `[T: int, *Ts, **P]` on a definition or alias.
    fn type_params(&mut self, list: Option<Node<'_>>) -> Result<FieldValue> {
        let mut params = Vec::new();
        for param in list.map(named_children).unwrap_or_default() {
            let param = unwrap_type(param)?;
            let at = span(param);
            let lowered = match param.kind() {
                "identifier" => SyntaxNode::new(NodeKind::TypeVar, at)
                    .with("name", FieldValue::str(self.text(param)))
                    .with("bound", FieldValue::Absent),
                "constrained_type" => {
                    let children = named_children(param);
                    let [name, bound] = children.as_slice() else {
                        return Err(missing(param, "bound"));
                    };
                    let name = unwrap_type(*name)?;
                    if name.kind() != "identifier" {
                        return Err(unsupported(name, name.kind()));
                    }
                    SyntaxNode::new(NodeKind::TypeVar, at)
                        .with("name", FieldValue::str(self.text(name)))
                        .with("bound", FieldValue::node(self.expr(*bound, Ctx::Load)?))
                }
                "splat_type" => {
                    let name = first(param, &named_children(param))?;
                    let kind = if has_token(param, "**") {
                        NodeKind::ParamSpec
                    } else {
                        NodeKind::TypeVarTuple
                    };
                    SyntaxNode::new(kind, at).with("name", FieldValue::str(self.text(name)))
                }
                other => return Err(unsupported(param, other)),
            };
            params.push(lowered);
        }
        Ok(FieldValue::nodes(params))
    }

    // ─── Patterns ───────────────────────────────────────────────

    /// `case a, b:` matches a sequence, as does a trailing comma.
    fn case_patterns(&mut self, case: Node<'_>) -> Result<SyntaxNode> {
        let patterns: Vec<Node<'_>> = named_children(case)
            .into_iter()
            .filter(|child| child.kind() == "case_pattern")
            .collect();
        match patterns.as_slice() {
            [single] if !has_token(case, ",") => self.pattern(*single),
            [] => Err(missing(case, "pattern")),
            many => {
                let lowered = many
                    .iter()
                    .map(|p| self.pattern(*p))
                    .collect::<Result<Vec<_>>>()?;
                Ok(SyntaxNode::new(NodeKind::MatchSequence, span(many[0]))
                    .with("patterns", FieldValue::nodes(lowered)))
            }
        }
    }

    fn pattern(&mut self, node: Node<'_>) -> Result<SyntaxNode> {
        self.enter(node)?;
        let result = self.pattern_inner(node);
        self.depth -= 1;
        result
    }

    fn pattern_inner(&mut self, node: Node<'_>) -> Result<SyntaxNode> {
        let at = span(node);
        let pattern = match node.kind() {
            "case_pattern" => return self.pattern_pieces(node, &all_children(node)),
            "as_pattern" => {
                let inner = child_of_kind(node, "case_pattern")
                    .ok_or_else(|| missing(node, "pattern"))?;
                let name = named_children(node)
                    .into_iter()
                    .rfind(|child| child.kind() == "identifier")
                    .ok_or_else(|| missing(node, "name"))?;
                SyntaxNode::new(NodeKind::MatchAs, at)
                    .with("pattern", FieldValue::node(self.pattern(inner)?))
                    .with("name", FieldValue::str(self.text(name)))
            }
            "union_pattern" => {
                let mut alternatives = Vec::new();
                self.union_alternatives(node, &mut alternatives)?;
                SyntaxNode::new(NodeKind::MatchOr, at)
                    .with("patterns", FieldValue::nodes(alternatives))
            }
            "list_pattern" | "tuple_pattern" => {
                let items: Vec<Node<'_>> = named_children(node)
                    .into_iter()
                    .filter(|child| child.kind() == "case_pattern")
                    .collect();
                // `(p)` only groups.
                if let ("tuple_pattern", [single]) = (node.kind(), items.as_slice()) {
                    if !has_token(node, ",") {
                        return self.pattern(*single);
                    }
                }
                let lowered = items
                    .iter()
                    .map(|item| self.pattern(*item))
                    .collect::<Result<Vec<_>>>()?;
                SyntaxNode::new(NodeKind::MatchSequence, at)
                    .with("patterns", FieldValue::nodes(lowered))
            }
            "dict_pattern" => self.mapping_pattern(node)?,
            "class_pattern" => self.class_pattern(node)?,
            "splat_pattern" => {
                if has_token(node, "**") {
                    return Err(unsupported(node, "**"));
                }
                SyntaxNode::new(NodeKind::MatchStar, at).with("name", self.capture_name(node))
            }
            "string" | "concatenated_string" | "integer" | "float" | "complex_pattern" => {
                SyntaxNode::new(NodeKind::MatchValue, at)
                    .with("value", FieldValue::node(self.pattern_value(node, &[node])?))
            }
            "true" => singleton(Literal::Bool(true), at),
            "false" => singleton(Literal::Bool(false), at),
            "none" => singleton(Literal::None, at),
            "dotted_name" => {
                let names = named_children(node);
                match names.as_slice() {
                    [single] => {
                        let name = match self.text(*single) {
                            "_" => FieldValue::Absent,
                            name => FieldValue::str(name),
                        };
                        SyntaxNode::new(NodeKind::MatchAs, at)
                            .with("pattern", FieldValue::Absent)
                            .with("name", name)
                    }
                    _ => SyntaxNode::new(NodeKind::MatchValue, at)
                        .with("value", FieldValue::node(self.dotted_value(node)?)),
                }
            }
            other => return Err(unsupported(node, other)),
        };
        Ok(pattern)
    }

    /// One pattern spelled by a run of sibling tokens, such as `-` `1` or `_`.
    fn pattern_pieces(&mut self, parent: Node<'_>, pieces: &[Node<'_>]) -> Result<SyntaxNode> {
        match pieces {
            [single] if !single.is_named() && single.kind() == "_" => {
                Ok(SyntaxNode::new(NodeKind::MatchAs, span(*single))
                    .with("pattern", FieldValue::Absent)
                    .with("name", FieldValue::Absent))
            }
            [single] => self.pattern(*single),
            [minus, _] if minus.kind() == "-" => {
                let value = self.pattern_value(parent, pieces)?;
                Ok(SyntaxNode::new(NodeKind::MatchValue, span(*minus))
                    .with("value", FieldValue::node(value)))
            }
            [] => Err(missing(parent, "pattern")),
            [unexpected, ..] => Err(unsupported(*unexpected, unexpected.kind())),
        }
    }

    /// `a | b | c` is one `MatchOr` with three alternatives.
    fn union_alternatives(&mut self, node: Node<'_>, out: &mut Vec<SyntaxNode>) -> Result<()> {
        for pieces in split_tokens(&all_children(node), "|") {
            match pieces.as_slice() {
                [nested] if nested.kind() == "union_pattern" => {
                    self.union_alternatives(*nested, out)?;
                }
                _ => out.push(self.pattern_pieces(node, &pieces)?),
            }
        }
        Ok(())
    }

    fn mapping_pattern(&mut self, node: Node<'_>) -> Result<SyntaxNode> {
        let mut keys = Vec::new();
        let mut patterns = Vec::new();
        let mut rest = FieldValue::Absent;

        let children = all_children(node);
        let inner = children
            .get(1..children.len().saturating_sub(1))
            .unwrap_or_default();
        for entry in split_tokens(inner, ",") {
            if let [splat] = entry.as_slice() {
                if splat.kind() == "splat_pattern" {
                    rest = self.capture_name(*splat);
                    continue;
                }
            }
            let colon = entry
                .iter()
                .position(|piece| !piece.is_named() && piece.kind() == ":")
                .ok_or_else(|| missing(node, "`:`"))?;
            let (key, value) = entry.split_at(colon);
            keys.push(self.pattern_value(node, key)?);
            let value = value
                .get(1)
                .copied()
                .ok_or_else(|| missing(node, "value pattern"))?;
            patterns.push(self.pattern(value)?);
        }

        Ok(SyntaxNode::new(NodeKind::MatchMapping, span(node))
            .with("keys", FieldValue::nodes(keys))
            .with("patterns", FieldValue::nodes(patterns))
            .with("rest", rest))
    }

    fn class_pattern(&mut self, node: Node<'_>) -> Result<SyntaxNode> {
        let cls = child_of_kind(node, "dotted_name").ok_or_else(|| missing(node, "class"))?;
        let mut patterns = Vec::new();
        let mut kwd_attrs = Vec::new();
        let mut kwd_patterns = Vec::new();

        for argument in named_children(node) {
            if argument.kind() != "case_pattern" {
                continue;
            }
            match child_of_kind(argument, "keyword_pattern") {
                Some(keyword) => {
                    let pieces = all_children(keyword);
                    let name = pieces.first().copied().ok_or_else(|| missing(keyword, "name"))?;
                    kwd_attrs.push(FieldValue::str(self.text(name)));
                    let value = pieces.get(2..).unwrap_or_default();
                    kwd_patterns.push(self.pattern_pieces(keyword, value)?);
                }
                None => patterns.push(self.pattern(argument)?),
            }
        }

        Ok(SyntaxNode::new(NodeKind::MatchClass, span(node))
            .with("cls", FieldValue::node(self.dotted_value(cls)?))
            .with("patterns", FieldValue::nodes(patterns))
            .with("kwd_attrs", FieldValue::List(kwd_attrs))
            .with("kwd_patterns", FieldValue::nodes(kwd_patterns)))
    }

    /// The expression a value pattern compares against.
    fn pattern_value(&mut self, parent: Node<'_>, pieces: &[Node<'_>]) -> Result<SyntaxNode> {
        match pieces {
            [single] if single.kind() == "complex_pattern" => {
                let parts = all_children(*single);
                let (operator, right) = match parts.as_slice() {
                    [.., operator, right] => (*operator, *right),
                    _ => return Err(missing(*single, "operand")),
                };
                let left = self.pattern_value(*single, &parts[..parts.len() - 2])?;
                let op = NodeKind::binary_operator(operator.kind())
                    .ok_or_else(|| unsupported(operator, operator.kind()))?;
                Ok(SyntaxNode::new(NodeKind::BinOp, span(*single))
                    .with("left", FieldValue::node(left))
                    .with("op", operator_node(op, operator))
                    .with("right", FieldValue::node(self.expr(right, Ctx::Load)?)))
            }
            [single] if single.kind() == "dotted_name" => self.dotted_value(*single),
            [single] => self.expr(*single, Ctx::Load),
            [minus, number] if minus.kind() == "-" => {
                let at = span(*minus);
                Ok(SyntaxNode::new(NodeKind::UnaryOp, at)
                    .with("op", FieldValue::node(SyntaxNode::new(NodeKind::USub, at)))
                    .with("operand", FieldValue::node(self.expr(*number, Ctx::Load)?)))
            }
            [] => Err(missing(parent, "value")),
            [unexpected, ..] => Err(unsupported(*unexpected, unexpected.kind())),
        }
    }

    /// `a.b.c` as a chain of `Attribute` loads.
    fn dotted_value(&self, node: Node<'_>) -> Result<SyntaxNode> {
        let mut names = named_children(node).into_iter();
        let head = names.next().ok_or_else(|| missing(node, "name"))?;
        let mut value = name_node(self.text(head), Ctx::Load, span(head));
        for attr in names {
            let at = span(head);
            value = SyntaxNode::new(NodeKind::Attribute, at)
                .with("value", FieldValue::node(value))
                .with("attr", FieldValue::str(self.text(attr)))
                .with("ctx", Ctx::Load.node(at));
        }
        Ok(value)
    }

    /// The name bound by `*name` or `**name`; `_` binds nothing.
    fn capture_name(&self, splat: Node<'_>) -> FieldValue {
        match child_of_kind(splat, "identifier") {
            Some(name) => FieldValue::str(self.text(name)),
            None => FieldValue::Absent,
        }
    }

    // ─── Parameters and arguments ───────────────────────────────

    fn arguments(&mut self, params: Option<Node<'_>>, fallback: Span) -> Result<SyntaxNode> {
        let at = params.map(span).unwrap_or(fallback);
        let mut builder = ArgumentsBuilder::default();

        for param in params.map(named_children).unwrap_or_default() {
            match param.kind() {
                "positional_separator" => {
                    let args = std::mem::take(&mut builder.args);
                    builder.posonlyargs.extend(args);
                }
                "keyword_separator" => builder.keyword_only = true,
                "identifier" => builder.push(self.arg(param, None)?, None),
                "typed_parameter" => {
                    let inner = first(param, &named_children(param))?;
                    let annotation = param.child_by_field_name("type");
                    match inner.kind() {
                        "list_splat_pattern" => {
                            let name = first(inner, &named_children(inner))?;
                            builder.vararg = Some(self.arg(name, annotation)?);
                            builder.keyword_only = true;
                        }
                        "dictionary_splat_pattern" => {
                            let name = first(inner, &named_children(inner))?;
                            builder.kwarg = Some(self.arg(name, annotation)?);
                        }
                        _ => builder.push(self.arg(inner, annotation)?, None),
                    }
                }
                "default_parameter" | "typed_default_parameter" => {
                    let name = field(param, "name")?;
                    let arg = self.arg(name, param.child_by_field_name("type"))?;
                    let default = self.expr(field(param, "value")?, Ctx::Load)?;
                    builder.push(arg, Some(default));
                }
                "list_splat_pattern" => {
                    let name = first(param, &named_children(param))?;
                    builder.vararg = Some(self.arg(name, None)?);
                    builder.keyword_only = true;
                }
                "dictionary_splat_pattern" => {
                    let name = first(param, &named_children(param))?;
                    builder.kwarg = Some(self.arg(name, None)?);
                }
                other => return Err(unsupported(param, other)),
            }
        }

        Ok(builder.finish(at))
    }

    fn arg(&mut self, name: Node<'_>, annotation: Option<Node<'_>>) -> Result<SyntaxNode> {
        Ok(SyntaxNode::new(NodeKind::Arg, span(name))
            .with("arg", FieldValue::str(self.text(name)))
            .with("annotation", self.optional_expr(annotation)?)
            .with("type_comment", FieldValue::Absent))
    }

    /// Split an `argument_list` into positional arguments and keywords.
    fn call_arguments(&mut self, list: Node<'_>) -> Result<(Vec<SyntaxNode>, Vec<SyntaxNode>)> {
        let mut args = Vec::new();
        let mut keywords = Vec::new();
        for child in named_children(list) {
            match child.kind() {
                "keyword_argument" => keywords.push(
                    SyntaxNode::new(NodeKind::Keyword, span(child))
                        .with("arg", FieldValue::str(self.text(field(child, "name")?)))
                        .with("value", self.required(child, "value", Ctx::Load)?),
                ),
                "dictionary_splat" => {
                    let value = first(child, &named_children(child))?;
                    keywords.push(
                        SyntaxNode::new(NodeKind::Keyword, span(child))
                            .with("arg", FieldValue::Absent)
                            .with("value", FieldValue::node(self.expr(value, Ctx::Load)?)),
                    );
                }
                _ => args.push(self.expr(child, Ctx::Load)?),
            }
        }
        Ok((args, keywords))
    }

    // ─── Expressions ────────────────────────────────────────────

    fn expr(&mut self, node: Node<'_>, ctx: Ctx) -> Result<SyntaxNode> {
        self.enter(node)?;
        let result = self.expr_inner(node, ctx);
        self.depth -= 1;
        result
    }

    fn exprs(&mut self, nodes: &[Node<'_>], ctx: Ctx) -> Result<Vec<SyntaxNode>> {
        nodes.iter().map(|node| self.expr(*node, ctx)).collect()
    }

    fn required(&mut self, node: Node<'_>, name: &str, ctx: Ctx) -> Result<FieldValue> {
        let child = field(node, name)?;
        Ok(FieldValue::node(self.expr(child, ctx)?))
    }

    fn optional_expr(&mut self, node: Option<Node<'_>>) -> Result<FieldValue> {
        match node {
            Some(node) => Ok(FieldValue::node(self.expr(node, Ctx::Load)?)),
            None => Ok(FieldValue::Absent),
        }
    }

    /// Lower an `as` target, unwrapping tree-sitter's `as_pattern_target`.
    fn optional_target(&mut self, node: Option<Node<'_>>) -> Result<FieldValue> {
        let Some(node) = node else {
            return Ok(FieldValue::Absent);
        };
        let target = if node.kind() == "as_pattern_target" {
            named_children(node).first().copied().unwrap_or(node)
        } else {
            node
        };
        if target.kind() == "as_pattern_target" {
            return Ok(FieldValue::node(name_node(self.text(target), Ctx::Store, span(target))));
        }
        Ok(FieldValue::node(self.expr(target, Ctx::Store)?))
    }

    fn expr_inner(&mut self, node: Node<'_>, ctx: Ctx) -> Result<SyntaxNode> {
        let at = span(node);
        let expr = match node.kind() {
            "identifier" | "keyword_identifier" => name_node(self.text(node), ctx, at),
            "integer" | "float" => {
                let value =
                    parse_number(self.text(node)).map_err(|message| invalid(node, message))?;
                constant(value, at)
            }
            "true" => constant(Literal::Bool(true), at),
            "false" => constant(Literal::Bool(false), at),
            "none" => constant(Literal::None, at),
            "ellipsis" => constant(Literal::Ellipsis, at),
            "string" => {
                let (prefix, parts) = self.string_parts(node)?;
                assemble_string(prefix, parts, at)
            }
            "concatenated_string" => {
                let mut prefix = StringPrefix::default();
                let mut parts = Vec::new();
                for (index, piece) in named_children(node).into_iter().enumerate() {
                    let (piece_prefix, piece_parts) = self.string_parts(piece)?;
                    if index > 0 && piece_prefix.bytes != prefix.bytes {
                        return Err(invalid(piece, "cannot mix bytes and nonbytes literals"));
                    }
                    prefix.formatted |= piece_prefix.formatted;
                    prefix.bytes = piece_prefix.bytes;
                    parts.extend(piece_parts);
                }
                assemble_string(prefix, parts, at)
            }
            "parenthesized_expression" | "type" | "parenthesized_list_splat" => {
                let inner = first(node, &named_children(node))?;
                return self.expr(inner, ctx);
            }
            "generic_type" => {
                let children = named_children(node);
                let name = first(node, &children)?;
                let params = child_of_kind(node, "type_parameter")
                    .map(named_children)
                    .unwrap_or_default();
                let slice = match params.as_slice() {
                    [single] => self.expr(*single, Ctx::Load)?,
                    [] => return Err(missing(node, "type argument")),
                    many => {
                        let elts = self.exprs(many, Ctx::Load)?;
                        tuple(elts, Ctx::Load, span(many[0]))
                    }
                };
                let value = name_node(self.text(name), Ctx::Load, span(name));
                SyntaxNode::new(NodeKind::Subscript, at)
                    .with("value", FieldValue::node(value))
                    .with("slice", FieldValue::node(slice))
                    .with("ctx", ctx.node(at))
            }
            "union_type" => {
                let children = named_children(node);
                let [left, right] = children.as_slice() else {
                    return Err(missing(node, "operand"));
                };
                let operator = child_of_kind_any(node, "|").ok_or_else(|| missing(node, "`|`"))?;
                SyntaxNode::new(NodeKind::BinOp, at)
                    .with("left", FieldValue::node(self.expr(*left, Ctx::Load)?))
                    .with("op", operator_node(NodeKind::BitOr, operator))
                    .with("right", FieldValue::node(self.expr(*right, Ctx::Load)?))
            }
            "member_type" => {
                let children = named_children(node);
                let [value, attr] = children.as_slice() else {
                    return Err(missing(node, "attribute"));
                };
                SyntaxNode::new(NodeKind::Attribute, at)
                    .with("value", FieldValue::node(self.expr(*value, Ctx::Load)?))
                    .with("attr", FieldValue::str(self.text(*attr)))
                    .with("ctx", ctx.node(at))
            }
            "splat_type" if !has_token(node, "**") => {
                let name = first(node, &named_children(node))?;
                SyntaxNode::new(NodeKind::Starred, at)
                    .with("value", FieldValue::node(name_node(self.text(name), ctx, span(name))))
                    .with("ctx", ctx.node(at))
            }
            "call" => {
                let func = self.required(node, "function", Ctx::Load)?;
                let (args, keywords) = match node.child_by_field_name("arguments") {
                    Some(generator) if generator.kind() == "generator_expression" => {
                        (vec![self.expr(generator, Ctx::Load)?], Vec::new())
                    }
                    Some(list) => self.call_arguments(list)?,
                    None => (Vec::new(), Vec::new()),
                };
                SyntaxNode::new(NodeKind::Call, at)
                    .with("func", func)
                    .with("args", FieldValue::nodes(args))
                    .with("keywords", FieldValue::nodes(keywords))
            }
            "attribute" => SyntaxNode::new(NodeKind::Attribute, at)
                .with("value", self.required(node, "object", Ctx::Load)?)
                .with("attr", FieldValue::str(self.text(field(node, "attribute")?)))
                .with("ctx", ctx.node(at)),
            "subscript" => {
                let value = self.required(node, "value", Ctx::Load)?;
                let subscripts = field_children(node, "subscript");
                let slice = match subscripts.as_slice() {
                    [single] => self.expr(*single, Ctx::Load)?,
                    [] => return Err(missing(node, "subscript")),
                    many => {
                        let elts = self.exprs(many, Ctx::Load)?;
                        tuple(elts, Ctx::Load, span(many[0]))
                    }
                };
                SyntaxNode::new(NodeKind::Subscript, at)
                    .with("value", value)
                    .with("slice", FieldValue::node(slice))
                    .with("ctx", ctx.node(at))
            }
            "slice" => {
                let mut bounds: [Option<Node<'_>>; 3] = [None, None, None];
                let mut index = 0;
                for child in all_children(node) {
                    if !child.is_named() && child.kind() == ":" {
                        index += 1;
                    } else if child.is_named() && index < bounds.len() {
                        bounds[index] = Some(child);
                    }
                }
                SyntaxNode::new(NodeKind::Slice, at)
                    .with("lower", self.optional_expr(bounds[0])?)
                    .with("upper", self.optional_expr(bounds[1])?)
                    .with("step", self.optional_expr(bounds[2])?)
            }
            "binary_operator" => {
                let operator = field(node, "operator")?;
                let op = NodeKind::binary_operator(operator.kind())
                    .ok_or_else(|| unsupported(operator, operator.kind()))?;
                SyntaxNode::new(NodeKind::BinOp, at)
                    .with("left", self.required(node, "left", Ctx::Load)?)
                    .with("op", operator_node(op, operator))
                    .with("right", self.required(node, "right", Ctx::Load)?)
            }
            "unary_operator" | "not_operator" => {
                let op = match node.child_by_field_name("operator") {
                    Some(operator) => NodeKind::unary_operator(operator.kind())
                        .ok_or_else(|| unsupported(operator, operator.kind()))?,
                    None => NodeKind::Not,
                };
                SyntaxNode::new(NodeKind::UnaryOp, at)
                    .with("op", FieldValue::node(SyntaxNode::new(op, at)))
                    .with("operand", self.required(node, "argument", Ctx::Load)?)
            }
            "boolean_operator" => self.boolean_operator(node)?,
            "comparison_operator" => self.comparison(node)?,
            "lambda" => {
                let args = self.arguments(node.child_by_field_name("parameters"), at)?;
                SyntaxNode::new(NodeKind::Lambda, at)
                    .with("args", FieldValue::node(args))
                    .with("body", self.required(node, "body", Ctx::Load)?)
            }
            "conditional_expression" => {
                let children = named_children(node);
                let [body, test, orelse] = children.as_slice() else {
                    return Err(missing(node, "branch"));
                };
                SyntaxNode::new(NodeKind::IfExp, at)
                    .with("test", FieldValue::node(self.expr(*test, Ctx::Load)?))
                    .with("body", FieldValue::node(self.expr(*body, Ctx::Load)?))
                    .with("orelse", FieldValue::node(self.expr(*orelse, Ctx::Load)?))
            }
            "named_expression" => SyntaxNode::new(NodeKind::NamedExpr, at)
                .with("target", self.required(node, "name", Ctx::Store)?)
                .with("value", self.required(node, "value", Ctx::Load)?),
            "await" => {
                let value = first(node, &named_children(node))?;
                SyntaxNode::new(NodeKind::Await, at)
                    .with("value", FieldValue::node(self.expr(value, Ctx::Load)?))
            }
            "yield" => {
                let value = named_children(node).first().copied();
                if has_token(node, "from") {
                    let value = value.ok_or_else(|| missing(node, "value"))?;
                    SyntaxNode::new(NodeKind::YieldFrom, at)
                        .with("value", FieldValue::node(self.expr(value, Ctx::Load)?))
                } else {
                    SyntaxNode::new(NodeKind::Yield, at).with("value", self.optional_expr(value)?)
                }
            }
            "list" | "list_pattern" => {
                let elts = self.exprs(&named_children(node), ctx)?;
                SyntaxNode::new(NodeKind::List, at)
                    .with("elts", FieldValue::nodes(elts))
                    .with("ctx", ctx.node(at))
            }
            "tuple" | "tuple_pattern" | "expression_list" | "pattern_list" => {
                let elts = self.exprs(&named_children(node), ctx)?;
                tuple(elts, ctx, at)
            }
            "set" => {
                let elts = self.exprs(&named_children(node), Ctx::Load)?;
                SyntaxNode::new(NodeKind::Set, at).with("elts", FieldValue::nodes(elts))
            }
            "dictionary" => {
                let mut keys = Vec::new();
                let mut values = Vec::new();
                for entry in named_children(node) {
                    match entry.kind() {
                        "pair" => {
                            keys.push(self.required(entry, "key", Ctx::Load)?);
                            values.push(self.expr(field(entry, "value")?, Ctx::Load)?);
                        }
                        "dictionary_splat" => {
                            keys.push(FieldValue::Absent);
                            values.push(self.expr(first(entry, &named_children(entry))?, Ctx::Load)?);
                        }
                        other => return Err(unsupported(entry, other)),
                    }
                }
                SyntaxNode::new(NodeKind::Dict, at)
                    .with("keys", FieldValue::List(keys))
                    .with("values", FieldValue::nodes(values))
            }
            "list_comprehension" => self.comprehension(node, NodeKind::ListComp)?,
            "set_comprehension" => self.comprehension(node, NodeKind::SetComp)?,
            "generator_expression" => self.comprehension(node, NodeKind::GeneratorExp)?,
            "dictionary_comprehension" => self.comprehension(node, NodeKind::DictComp)?,
            "list_splat" | "list_splat_pattern" => {
                let value = first(node, &named_children(node))?;
                SyntaxNode::new(NodeKind::Starred, at)
                    .with("value", FieldValue::node(self.expr(value, ctx)?))
                    .with("ctx", ctx.node(at))
            }
            other => return Err(unsupported(node, other)),
        };
        Ok(expr)
    }

    /// `a and b and c` is one `BoolOp` with three values, as in Python.
    fn boolean_operator(&mut self, node: Node<'_>) -> Result<SyntaxNode> {
        let operator = field(node, "operator")?;
        let token = operator.kind();
        let op = if token == "and" { NodeKind::And } else { NodeKind::Or };

        let mut rights = vec![field(node, "right")?];
        let mut left = field(node, "left")?;
        while left.kind() == "boolean_operator"
            && left.child_by_field_name("operator").map(|o| o.kind()) == Some(token)
        {
            rights.push(field(left, "right")?);
            left = field(left, "left")?;
        }

        let mut values = vec![self.expr(left, Ctx::Load)?];
        for right in rights.into_iter().rev() {
            values.push(self.expr(right, Ctx::Load)?);
        }
        Ok(SyntaxNode::new(NodeKind::BoolOp, span(node))
            .with("op", operator_node(op, operator))
            .with("values", FieldValue::nodes(values)))
    }

    fn comparison(&mut self, node: Node<'_>) -> Result<SyntaxNode> {
        let mut operands = Vec::new();
        let mut ops = Vec::new();
        let mut pending: Vec<Node<'_>> = Vec::new();

        for child in all_children(node) {
            if !child.is_named() {
                pending.push(child);
                continue;
            }
            if let Some(&first_token) = pending.first() {
                let token = pending.iter().map(|t| t.kind()).collect::<Vec<_>>().join(" ");
                let op = NodeKind::comparison_operator(&token)
                    .ok_or_else(|| unsupported(first_token, &token))?;
                ops.push(SyntaxNode::new(op, span(first_token)));
                pending.clear();
            }
            operands.push(self.expr(child, Ctx::Load)?);
        }

        let mut operands = operands.into_iter();
        let left = operands.next().ok_or_else(|| missing(node, "left operand"))?;
        Ok(SyntaxNode::new(NodeKind::Compare, span(node))
            .with("left", FieldValue::node(left))
            .with("ops", FieldValue::nodes(ops))
            .with("comparators", FieldValue::nodes(operands)))
    }

    fn comprehension(&mut self, node: Node<'_>, kind: NodeKind) -> Result<SyntaxNode> {
        let children = named_children(node);
        let body = match node.child_by_field_name("body") {
            Some(body) => body,
            None => first(node, &children)?,
        };

        let mut pending: Vec<PendingComprehension> = Vec::new();
        for clause in children.into_iter().filter(|c| c.id() != body.id()) {
            match clause.kind() {
                "for_in_clause" => {
                    let target = self.expr(field(clause, "left")?, Ctx::Store)?;
                    let rights = field_children(clause, "right");
                    let iter = match rights.as_slice() {
                        [single] => self.expr(*single, Ctx::Load)?,
                        [] => return Err(missing(clause, "iterable")),
                        many => {
                            let elts = self.exprs(many, Ctx::Load)?;
                            tuple(elts, Ctx::Load, span(many[0]))
                        }
                    };
                    pending.push(PendingComprehension {
                        span: span(clause),
                        target,
                        iter,
                        ifs: Vec::new(),
                        is_async: has_token(clause, "async"),
                    });
                }
                "if_clause" => {
                    let condition = first(clause, &named_children(clause))?;
                    let condition = self.expr(condition, Ctx::Load)?;
                    match pending.last_mut() {
                        Some(generator) => generator.ifs.push(condition),
                        None => return Err(missing(clause, "for clause")),
                    }
                }
                _ => {}
            }
        }

        let generators = pending.into_iter().map(|g| {
            SyntaxNode::new(NodeKind::Comprehension, g.span)
                .with("target", FieldValue::node(g.target))
                .with("iter", FieldValue::node(g.iter))
                .with("ifs", FieldValue::nodes(g.ifs))
                .with("is_async", FieldValue::Leaf(Literal::Int(i64::from(g.is_async))))
        });
        let generators = FieldValue::nodes(generators.collect::<Vec<_>>());

        let at = span(node);
        if kind == NodeKind::DictComp {
            return Ok(SyntaxNode::new(kind, at)
                .with("key", self.required(body, "key", Ctx::Load)?)
                .with("value", self.required(body, "value", Ctx::Load)?)
                .with("generators", generators));
        }
        Ok(SyntaxNode::new(kind, at)
            .with("elt", FieldValue::node(self.expr(body, Ctx::Load)?))
            .with("generators", generators))
    }

    // ─── Strings ────────────────────────────────────────────────

    fn string_parts(&mut self, node: Node<'_>) -> Result<(StringPrefix, Vec<StrPart>)> {
        let prefix = match child_of_kind_any(node, "string_start") {
            Some(start) => StringPrefix::from_start_token(self.text(start))
                .map_err(|message| invalid(start, message))?,
            None => StringPrefix::default(),
        };

        let mut parts = Vec::new();
        for child in all_children(node) {
            match child.kind() {
                "string_content" | "escape_sequence" => {
                    parts.push(self.decode_piece(child, prefix)?);
                }
                "escape_interpolation" => {
                    let brace = self.text(child).chars().next().unwrap_or('{');
                    parts.push(StrPart::Text(brace.to_string()));
                }
                "interpolation" => self.interpolation(child, &mut parts)?,
                _ => {}
            }
        }
        Ok((prefix, parts))
    }

    fn decode_piece(&self, piece: Node<'_>, prefix: StringPrefix) -> Result<StrPart> {
        let raw = self.text(piece);
        let raw = if prefix.formatted {
            std::borrow::Cow::Owned(raw.replace("{{", "{").replace("}}", "}"))
        } else {
            std::borrow::Cow::Borrowed(raw)
        };
        let decoded = match (prefix.bytes, prefix.raw) {
            (true, true) => raw_bytes(&raw).map(StrPart::Bytes),
            (true, false) => decode_bytes(&raw).map(StrPart::Bytes),
            (false, true) => Ok(StrPart::Text(raw.into_owned())),
            (false, false) => decode_str(&raw).map(StrPart::Text),
        };
        decoded.map_err(|message| invalid(piece, message))
    }

    /// Push the pieces of one `{...}` replacement field.
    ///
    /// `{x=}` also contributes its source text, and defaults to `!r` unless a
    /// conversion or format spec is given.
    fn interpolation(&mut self, interpolation: Node<'_>, parts: &mut Vec<StrPart>) -> Result<()> {
        let at = span(interpolation);
        let children = named_children(interpolation);
        let expression = interpolation.child_by_field_name("expression").or_else(|| {
            children
                .iter()
                .copied()
                .find(|c| !matches!(c.kind(), "type_conversion" | "format_specifier"))
        });
        let expression = expression.ok_or_else(|| missing(interpolation, "expression"))?;
        let value = self.expr(expression, Ctx::Load)?;

        let tokens = all_children(interpolation);
        let debug_end = tokens
            .iter()
            .position(|t| !t.is_named() && t.kind() == "=")
            .and_then(|eq| tokens.get(eq + 1))
            .map(|next| next.start_byte());
        if let Some(end) = debug_end {
            let text = self.slice(interpolation.start_byte() + 1, end);
            parts.push(StrPart::Text(text.to_string()));
        }

        let conversion = children.iter().find(|c| c.kind() == "type_conversion");
        let spec = children.iter().find(|c| c.kind() == "format_specifier");
        let conversion = match conversion.and_then(|c| self.text(*c).chars().last()) {
            Some(c) => i64::from(u32::from(c)),
            None if debug_end.is_some() && spec.is_none() => i64::from(u32::from('r')),
            None => -1,
        };

        let format_spec = match spec {
            Some(spec) => FieldValue::node(self.format_spec(*spec)?),
            None => FieldValue::Absent,
        };

        parts.push(StrPart::Formatted(
            SyntaxNode::new(NodeKind::FormattedValue, at)
                .with("value", FieldValue::node(value))
                .with("conversion", FieldValue::Leaf(Literal::Int(conversion)))
                .with("format_spec", format_spec),
        ));
        Ok(())
    }

    /// The text after `:` in an interpolation, with any nested interpolations.
    fn format_spec(&mut self, spec: Node<'_>) -> Result<SyntaxNode> {
        let mut cursor = spec.start_byte();
        if self.source.get(cursor) == Some(&b':') {
            cursor += 1;
        }
        let mut parts = Vec::new();
        for nested in named_children(spec) {
            if !matches!(nested.kind(), "interpolation" | "format_expression") {
                continue;
            }
            parts.push(StrPart::Text(self.slice(cursor, nested.start_byte()).to_string()));
            self.interpolation(nested, &mut parts)?;
            cursor = nested.end_byte();
        }
        parts.push(StrPart::Text(self.slice(cursor, spec.end_byte()).to_string()));

        let prefix = StringPrefix {
            formatted: true,
            ..StringPrefix::default()
        };
        Ok(assemble_string(prefix, parts, span(spec)))
    }
}

// ─── Node helpers ───────────────────────────────────────────────

fn span(node: Node<'_>) -> Span {
    let point = node.start_position();
    Span {
        line: point.row + 1,
        column: point.column,
    }
}

/// Named children, skipping comments and other extras.
fn named_children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|child| !child.is_extra())
        .collect()
}

/// Named and anonymous children, skipping extras.
fn all_children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    node.children(&mut cursor)
        .filter(|child| !child.is_extra())
        .collect()
}

fn field_children<'t>(node: Node<'t>, name: &str) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.children_by_field_name(name, &mut cursor)
        .filter(|child| !child.is_extra())
        .collect()
}

fn child_of_kind<'t>(node: Node<'t>, kind: &str) -> Option<Node<'t>> {
    named_children(node).into_iter().find(|child| child.kind() == kind)
}

fn child_of_kind_any<'t>(node: Node<'t>, kind: &str) -> Option<Node<'t>> {
    all_children(node).into_iter().find(|child| child.kind() == kind)
}

fn has_token(node: Node<'_>, token: &str) -> bool {
    all_children(node)
        .iter()
        .any(|child| !child.is_named() && child.kind() == token)
}

fn field<'t>(node: Node<'t>, name: &str) -> Result<Node<'t>> {
    node.child_by_field_name(name)
        .ok_or_else(|| missing(node, name))
}

fn first<'t>(parent: Node<'t>, children: &[Node<'t>]) -> Result<Node<'t>> {
    children
        .first()
        .copied()
        .ok_or_else(|| missing(parent, "operand"))
}

/// `value as target` → (value, target).
fn split_as_pattern(pattern: Node<'_>) -> (Option<Node<'_>>, Option<Node<'_>>) {
    let children = named_children(pattern);
    let alias = pattern
        .child_by_field_name("alias")
        .or(children.get(1).copied());
    (children.first().copied(), alias)
}

/// Look through the `type` wrapper tree-sitter puts around annotations.
fn unwrap_type(node: Node<'_>) -> Result<Node<'_>> {
    if node.kind() == "type" {
        first(node, &named_children(node))
    } else {
        Ok(node)
    }
}

/// Runs of `items` between `separator` tokens, separators dropped.
fn split_tokens<'t>(items: &[Node<'t>], separator: &str) -> Vec<Vec<Node<'t>>> {
    let mut groups = vec![Vec::new()];
    for item in items {
        if !item.is_named() && item.kind() == separator {
            groups.push(Vec::new());
        } else if let Some(group) = groups.last_mut() {
            group.push(*item);
        }
    }
    groups.retain(|group| !group.is_empty());
    groups
}

fn missing(node: Node<'_>, what: &str) -> AstGraphError {
    let at = span(node);
    AstGraphError::syntax(
        at.line,
        at.column,
        format!("`{}` is missing its {}", node.kind(), what),
    )
}

fn unsupported(node: Node<'_>, kind: &str) -> AstGraphError {
    let at = span(node);
    AstGraphError::syntax(at.line, at.column, format!("unsupported syntax `{}`", kind))
}

fn invalid(node: Node<'_>, message: impl Into<String>) -> AstGraphError {
    let at = span(node);
    AstGraphError::syntax(at.line, at.column, message)
}

/// Python 3 spells these as calls.
fn python2_statement(node: Node<'_>) -> AstGraphError {
    let name = if node.kind() == "print_statement" { "print" } else { "exec" };
    invalid(
        node,
        format!("Missing parentheses in call to '{}'. Did you mean {}(...)?", name, name),
    )
}

fn singleton(value: Literal, at: Span) -> SyntaxNode {
    SyntaxNode::new(NodeKind::MatchSingleton, at).with("value", FieldValue::Leaf(value))
}

fn name_node(id: &str, ctx: Ctx, at: Span) -> SyntaxNode {
    SyntaxNode::new(NodeKind::Name, at)
        .with("id", FieldValue::str(id))
        .with("ctx", ctx.node(at))
}

fn constant(value: Literal, at: Span) -> SyntaxNode {
    SyntaxNode::new(NodeKind::Constant, at)
        .with("value", FieldValue::Leaf(value))
        .with("kind", FieldValue::Absent)
}

fn tuple(elts: Vec<SyntaxNode>, ctx: Ctx, at: Span) -> SyntaxNode {
    SyntaxNode::new(NodeKind::Tuple, at)
        .with("elts", FieldValue::nodes(elts))
        .with("ctx", ctx.node(at))
}

fn operator_node(kind: NodeKind, token: Node<'_>) -> FieldValue {
    FieldValue::node(SyntaxNode::new(kind, span(token)))
}

/// Join string pieces into a `Constant` or, for f-strings, a `JoinedStr`.
fn assemble_string(prefix: StringPrefix, parts: Vec<StrPart>, at: Span) -> SyntaxNode {
    let formatted = prefix.formatted || parts.iter().any(|p| matches!(p, StrPart::Formatted(_)));

    if formatted {
        let mut values = Vec::new();
        let mut text = String::new();
        for part in parts {
            match part {
                StrPart::Text(piece) => text.push_str(&piece),
                StrPart::Bytes(piece) => text.push_str(&String::from_utf8_lossy(&piece)),
                StrPart::Formatted(value) => {
                    if !text.is_empty() {
                        values.push(constant(Literal::Str(std::mem::take(&mut text)), at));
                    }
                    values.push(value);
                }
            }
        }
        if !text.is_empty() {
            values.push(constant(Literal::Str(text), at));
        }
        return SyntaxNode::new(NodeKind::JoinedStr, at).with("values", FieldValue::nodes(values));
    }

    if prefix.bytes {
        let mut bytes = Vec::new();
        for part in parts {
            match part {
                StrPart::Bytes(piece) => bytes.extend(piece),
                StrPart::Text(piece) => bytes.extend(piece.into_bytes()),
                StrPart::Formatted(_) => {}
            }
        }
        return constant(Literal::Bytes(bytes), at);
    }

    let mut text = String::new();
    for part in parts {
        if let StrPart::Text(piece) = part {
            text.push_str(&piece);
        }
    }
    constant(Literal::Str(text), at)
}
