//! Reading and parsing Python source into a [`SyntaxNode`] tree.
//!
//! tree-sitter does the parsing; any `ERROR` or `MISSING` node in its tree
//! is reported as a syntax error. The grammar also admits Python 2 forms
//! (`print x`, `1L`, `0777`, `a <> b`); lowering rejects those too.
//!
//! Lowering recurses once per nesting level, so every parse runs on its own
//! thread with a stack sized for [`MAX_NESTING`] levels. Callers on small
//! stacks (rayon workers, test threads) can parse any accepted input.

pub mod language;
pub mod literal;
mod lower;

pub use language::{is_python_path, python_language, python_parser, PYTHON_EXTENSIONS};
pub use lower::MAX_NESTING;

use std::fs;
use std::io;
use std::path::Path;
use std::{panic, thread};
use tracing::debug;
use tree_sitter::Node;

use crate::error::{AstGraphError, Result};
use crate::syntax::SyntaxNode;

/// Read a source file as UTF-8 text, dropping a leading byte-order mark.
pub fn read_source(path: &Path) -> Result<String> {
    let bytes = fs::read(path).map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            AstGraphError::NotFound(path.to_path_buf())
        } else {
            AstGraphError::Read {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;

    let text = String::from_utf8(bytes).map_err(|err| AstGraphError::Read {
        path: path.to_path_buf(),
        source: io::Error::new(io::ErrorKind::InvalidData, err),
    })?;

    match text.strip_prefix('\u{feff}') {
        Some(stripped) => Ok(stripped.to_string()),
        None => Ok(text),
    }
}

/// Stack for the parse thread; enough for [`MAX_NESTING`] levels in debug builds.
const PARSE_STACK_SIZE: usize = 64 * 1024 * 1024;

/// Parse Python source text into a `Module` node.
pub fn parse_source(source: &str) -> Result<SyntaxNode> {
    thread::scope(|scope| {
        let worker = thread::Builder::new()
            .name("astgraph-parse".to_string())
            .stack_size(PARSE_STACK_SIZE)
            .spawn_scoped(scope, || parse_on_current_thread(source));
        match worker {
            Ok(handle) => handle
                .join()
                .unwrap_or_else(|payload| panic::resume_unwind(payload)),
            Err(err) => {
                debug!(error = %err, "could not spawn parse thread, parsing inline");
                parse_on_current_thread(source)
            }
        }
    })
}

fn parse_on_current_thread(source: &str) -> Result<SyntaxNode> {
    let mut parser = python_parser()?;
    let tree = parser
        .parse(source, None)
        .ok_or_else(|| AstGraphError::syntax(1, 0, "parser produced no tree"))?;

    let root = tree.root_node();
    if root.has_error() {
        return Err(diagnose(root, source.as_bytes()));
    }

    let module = lower::lower_module(root, source.as_bytes())?;
    debug!(bytes = source.len(), nodes = module.subtree_size(), "parsed python source");
    Ok(module)
}

/// Read and parse a source file.
pub fn parse_file(path: &Path) -> Result<SyntaxNode> {
    let source = read_source(path)?;
    parse_source(&source).inspect_err(|err| {
        debug!(file = %path.display(), error = %err, "parse failed");
    })
}

/// Build a syntax error from the first `ERROR`/`MISSING` node in document order.
fn diagnose(root: Node<'_>, source: &[u8]) -> AstGraphError {
    let Some(node) = first_error(root) else {
        return AstGraphError::syntax(1, 0, "invalid syntax");
    };

    let point = node.start_position();
    let message = if node.is_missing() {
        format!("expected `{}`", node.kind())
    } else {
        let text = node.utf8_text(source).unwrap_or_default();
        let snippet: String = text.lines().next().unwrap_or_default().chars().take(30).collect();
        if snippet.trim().is_empty() {
            "invalid syntax".to_string()
        } else {
            format!("invalid syntax near `{}`", snippet.trim())
        }
    };
    AstGraphError::syntax(point.row + 1, point.column, message)
}

fn first_error(root: Node<'_>) -> Option<Node<'_>> {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if node.is_error() || node.is_missing() {
            return Some(node);
        }
        let mut cursor = node.walk();
        let faulty: Vec<Node<'_>> = node
            .children(&mut cursor)
            .filter(|child| child.has_error() || child.is_missing())
            .collect();
        stack.extend(faulty.into_iter().rev());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::{FieldValue, Literal, NodeKind};
    use std::io::Write;

    fn body(module: &SyntaxNode) -> Vec<&SyntaxNode> {
        list(module, "body")
    }

    fn list<'a>(node: &'a SyntaxNode, name: &str) -> Vec<&'a SyntaxNode> {
        match node.field(name) {
            Some(FieldValue::List(items)) => items.iter().filter_map(FieldValue::as_node).collect(),
            _ => Vec::new(),
        }
    }

    fn single_statement(source: &str) -> SyntaxNode {
        let module = parse_source(source).unwrap();
        let stmts = body(&module);
        assert_eq!(stmts.len(), 1, "expected one statement in {:?}", source);
        stmts[0].clone()
    }

    fn expression(source: &str) -> SyntaxNode {
        let stmt = single_statement(source);
        assert_eq!(stmt.kind, NodeKind::Expr);
        stmt.child("value").unwrap().clone()
    }

    #[test]
    fn test_function_with_return() {
        let func = single_statement("def f():\n    return 1\n");
        assert_eq!(func.kind, NodeKind::FunctionDef);
        assert_eq!(func.str_field("name"), Some("f"));
        assert_eq!(func.child("args").map(|a| a.kind), Some(NodeKind::Arguments));

        let stmts = list(&func, "body");
        assert_eq!(stmts.len(), 1);
        assert_eq!(stmts[0].kind, NodeKind::Return);
        let value = stmts[0].child("value").unwrap();
        assert_eq!(value.kind, NodeKind::Constant);
        assert_eq!(value.field("value"), Some(&FieldValue::Leaf(Literal::Int(1))));
    }

    #[test]
    fn test_empty_and_blank_sources() {
        for source in ["", "\n\n   \n", "# only a comment\n"] {
            let module = parse_source(source).unwrap();
            assert_eq!(module.kind, NodeKind::Module);
            assert!(body(&module).is_empty());
            assert_eq!(module.subtree_size(), 1);
        }
    }

    #[test]
    fn test_comments_are_not_statements() {
        let module = parse_source("# header\nx = 1  # trailing\n").unwrap();
        assert_eq!(body(&module).len(), 1);
    }

    #[test]
    fn test_chained_assignment_has_many_targets() {
        let assign = single_statement("x = y = 1\n");
        assert_eq!(assign.kind, NodeKind::Assign);
        let targets = list(&assign, "targets");
        assert_eq!(targets.len(), 2);
        assert!(targets.iter().all(|t| t.child("ctx").unwrap().kind == NodeKind::Store));
        assert_eq!(assign.child("value").unwrap().kind, NodeKind::Constant);
    }

    #[test]
    fn test_annotated_and_augmented_assignment() {
        let ann = single_statement("count: int = 0\n");
        assert_eq!(ann.kind, NodeKind::AnnAssign);
        assert_eq!(ann.child("annotation").unwrap().str_field("id"), Some("int"));

        let aug = single_statement("total += step\n");
        assert_eq!(aug.kind, NodeKind::AugAssign);
        assert_eq!(aug.child("op").unwrap().kind, NodeKind::Add);
    }

    #[test]
    fn test_elif_nests_in_orelse() {
        let stmt = single_statement("if a:\n    pass\nelif b:\n    x = 1\nelse:\n    pass\n");
        assert_eq!(stmt.kind, NodeKind::If);
        let orelse = list(&stmt, "orelse");
        assert_eq!(orelse.len(), 1);
        assert_eq!(orelse[0].kind, NodeKind::If);
        assert_eq!(orelse[0].child("test").unwrap().str_field("id"), Some("b"));
        let inner_else = list(orelse[0], "orelse");
        assert_eq!(inner_else.len(), 1);
        assert_eq!(inner_else[0].kind, NodeKind::Pass);
    }

    #[test]
    fn test_boolean_chain_is_flattened() {
        let expr = expression("a and b and c\n");
        assert_eq!(expr.kind, NodeKind::BoolOp);
        assert_eq!(expr.child("op").unwrap().kind, NodeKind::And);
        assert_eq!(list(&expr, "values").len(), 3);

        let mixed = expression("a or b and c\n");
        assert_eq!(mixed.child("op").unwrap().kind, NodeKind::Or);
        assert_eq!(list(&mixed, "values").len(), 2);
    }

    #[test]
    fn test_comparison_chain() {
        let expr = expression("1 < x <= 2\n");
        assert_eq!(expr.kind, NodeKind::Compare);
        let ops: Vec<NodeKind> = list(&expr, "ops").iter().map(|n| n.kind).collect();
        assert_eq!(ops, vec![NodeKind::Lt, NodeKind::LtE]);
        assert_eq!(list(&expr, "comparators").len(), 2);

        let expr = expression("a not in b\n");
        let ops: Vec<NodeKind> = list(&expr, "ops").iter().map(|n| n.kind).collect();
        assert_eq!(ops, vec![NodeKind::NotIn]);
    }

    #[test]
    fn test_call_arguments_and_keywords() {
        let call = expression("print(x, *rest, sep='', **opts)\n");
        assert_eq!(call.kind, NodeKind::Call);
        assert_eq!(call.child("func").unwrap().str_field("id"), Some("print"));
        let args = list(&call, "args");
        assert_eq!(args.len(), 2);
        assert_eq!(args[1].kind, NodeKind::Starred);
        let keywords = list(&call, "keywords");
        assert_eq!(keywords.len(), 2);
        assert_eq!(keywords[0].str_field("arg"), Some("sep"));
        assert_eq!(keywords[1].field("arg"), Some(&FieldValue::Absent));
    }

    #[test]
    fn test_decorators_move_into_definition() {
        let func = single_statement("@cache\n@route('/x')\ndef g():\n    pass\n");
        assert_eq!(func.kind, NodeKind::FunctionDef);
        let decorators = list(&func, "decorator_list");
        assert_eq!(decorators.len(), 2);
        assert_eq!(decorators[0].kind, NodeKind::Name);
        assert_eq!(decorators[1].kind, NodeKind::Call);
    }

    #[test]
    fn test_async_constructs() {
        let func = single_statement(
            "async def h():\n    await x\n    async for i in y:\n        pass\n    async with l:\n        pass\n",
        );
        assert_eq!(func.kind, NodeKind::AsyncFunctionDef);
        let kinds: Vec<NodeKind> = list(&func, "body").iter().map(|n| n.kind).collect();
        assert_eq!(kinds, vec![NodeKind::Expr, NodeKind::AsyncFor, NodeKind::AsyncWith]);
        let awaited = list(&func, "body")[0].child("value").unwrap();
        assert_eq!(awaited.kind, NodeKind::Await);
    }

    #[test]
    fn test_parameter_kinds() {
        let func = single_statement("def k(a, /, b=1, *args, c, d=2, **kw):\n    pass\n");
        let args = func.child("args").unwrap();
        assert_eq!(list(args, "posonlyargs").len(), 1);
        assert_eq!(list(args, "args").len(), 1);
        assert_eq!(args.child("vararg").unwrap().str_field("arg"), Some("args"));
        assert_eq!(list(args, "kwonlyargs").len(), 2);
        assert_eq!(args.child("kwarg").unwrap().str_field("arg"), Some("kw"));
        assert_eq!(list(args, "defaults").len(), 1);
        match args.field("kw_defaults") {
            Some(FieldValue::List(items)) => {
                assert_eq!(items.len(), 2);
                assert_eq!(items[0], FieldValue::Absent);
                assert!(items[1].as_node().is_some());
            }
            other => panic!("unexpected kw_defaults {:?}", other),
        }
    }

    #[test]
    fn test_class_bases_and_keywords() {
        let class = single_statement("class C(Base, metaclass=Meta):\n    x = 1\n");
        assert_eq!(class.kind, NodeKind::ClassDef);
        assert_eq!(class.str_field("name"), Some("C"));
        assert_eq!(list(&class, "bases").len(), 1);
        assert_eq!(list(&class, "keywords").len(), 1);
        assert_eq!(list(&class, "body").len(), 1);
    }

    #[test]
    fn test_try_with_handlers() {
        let stmt = single_statement(
            "try:\n    run()\nexcept ValueError as err:\n    pass\nexcept:\n    pass\nelse:\n    done()\nfinally:\n    close()\n",
        );
        assert_eq!(stmt.kind, NodeKind::Try);
        let handlers = list(&stmt, "handlers");
        assert_eq!(handlers.len(), 2);
        assert_eq!(handlers[0].child("type").unwrap().str_field("id"), Some("ValueError"));
        assert_eq!(handlers[0].str_field("name"), Some("err"));
        assert_eq!(handlers[1].field("type"), Some(&FieldValue::Absent));
        assert_eq!(list(&stmt, "orelse").len(), 1);
        assert_eq!(list(&stmt, "finalbody").len(), 1);
    }

    #[test]
    fn test_with_item_target() {
        let stmt = single_statement("with open(p) as fh:\n    pass\n");
        assert_eq!(stmt.kind, NodeKind::With);
        let items = list(&stmt, "items");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].child("context_expr").unwrap().kind, NodeKind::Call);
        let target = items[0].child("optional_vars").unwrap();
        assert_eq!(target.str_field("id"), Some("fh"));
    }

    #[test]
    fn test_imports() {
        let import = single_statement("import os.path as osp, sys\n");
        assert_eq!(import.kind, NodeKind::Import);
        let names = list(&import, "names");
        assert_eq!(names.len(), 2);
        assert_eq!(names[0].str_field("name"), Some("os.path"));
        assert_eq!(names[0].str_field("asname"), Some("osp"));

        let from = single_statement("from ..pkg import a, b as c\n");
        assert_eq!(from.kind, NodeKind::ImportFrom);
        assert_eq!(from.str_field("module"), Some("pkg"));
        assert_eq!(from.field("level"), Some(&FieldValue::Leaf(Literal::Int(2))));
        assert_eq!(list(&from, "names").len(), 2);
    }

    #[test]
    fn test_string_literals() {
        let joined = expression("'a' \"b\"\n");
        assert_eq!(joined.field("value"), Some(&FieldValue::Leaf(Literal::Str("ab".into()))));

        let escaped = expression("'tab\\there'\n");
        assert_eq!(
            escaped.field("value"),
            Some(&FieldValue::Leaf(Literal::Str("tab\there".into())))
        );

        let raw = expression("r'\\d+'\n");
        assert_eq!(raw.field("value"), Some(&FieldValue::Leaf(Literal::Str("\\d+".into()))));

        let bytes = expression("b'ok'\n");
        assert_eq!(bytes.field("value"), Some(&FieldValue::Leaf(Literal::Bytes(b"ok".to_vec()))));
    }

    #[test]
    fn test_f_string_becomes_joined_str() {
        let joined = expression("f'hi {name!r}'\n");
        assert_eq!(joined.kind, NodeKind::JoinedStr);
        let values = list(&joined, "values");
        assert_eq!(values.len(), 2);
        assert_eq!(values[0].kind, NodeKind::Constant);
        assert_eq!(values[1].kind, NodeKind::FormattedValue);
        assert_eq!(values[1].field("conversion"), Some(&FieldValue::Leaf(Literal::Int(114))));
        assert_eq!(values[1].child("value").unwrap().str_field("id"), Some("name"));
    }

    #[test]
    fn test_comprehension_and_dict_splat() {
        let comp = expression("[x * 2 for x in xs if x if y]\n");
        assert_eq!(comp.kind, NodeKind::ListComp);
        let generators = list(&comp, "generators");
        assert_eq!(generators.len(), 1);
        assert_eq!(list(generators[0], "ifs").len(), 2);

        let dict = expression("{**base, 'k': 1}\n");
        assert_eq!(dict.kind, NodeKind::Dict);
        match dict.field("keys") {
            Some(FieldValue::List(keys)) => {
                assert_eq!(keys[0], FieldValue::Absent);
                assert!(keys[1].as_node().is_some());
            }
            other => panic!("unexpected keys {:?}", other),
        }
    }

    #[test]
    fn test_subscript_and_slice() {
        let sub = expression("xs[1:n:2]\n");
        assert_eq!(sub.kind, NodeKind::Subscript);
        let slice = sub.child("slice").unwrap();
        assert_eq!(slice.kind, NodeKind::Slice);
        assert!(slice.child("lower").is_some());
        assert_eq!(slice.child("upper").unwrap().str_field("id"), Some("n"));
        assert!(slice.child("step").is_some());
    }

    #[test]
    fn test_binary_and_unary_operators() {
        let expr = expression("-a + b // 2\n");
        assert_eq!(expr.kind, NodeKind::BinOp);
        assert_eq!(expr.child("op").unwrap().kind, NodeKind::Add);
        let left = expr.child("left").unwrap();
        assert_eq!(left.kind, NodeKind::UnaryOp);
        assert_eq!(left.child("op").unwrap().kind, NodeKind::USub);
        assert_eq!(expr.child("right").unwrap().child("op").unwrap().kind, NodeKind::FloorDiv);

        let not = expression("not ready\n");
        assert_eq!(not.child("op").unwrap().kind, NodeKind::Not);
    }

    #[test]
    fn test_unmatched_parenthesis_is_syntax_error() {
        let err = parse_source("print((1)\n").unwrap_err();
        assert!(matches!(err, AstGraphError::Syntax(_)), "got {:?}", err);
    }

    #[test]
    fn test_broken_definition_is_syntax_error() {
        let err = parse_source("def broken(:\n    pass\n").unwrap_err();
        match err {
            AstGraphError::Syntax(diagnostic) => assert_eq!(diagnostic.line, 1),
            other => panic!("expected syntax error, got {:?}", other),
        }
    }

    fn nested_parens(depth: usize) -> String {
        format!("{}1{}\n", "(".repeat(depth), ")".repeat(depth))
    }

    #[test]
    fn test_deep_nesting_parses_on_a_default_stack() {
        let source = nested_parens(200);
        // Spawned threads get the platform default stack, usually 2 MiB.
        let result = std::thread::spawn(move || parse_source(&source))
            .join()
            .unwrap();
        let module = result.unwrap();
        let stmt = body(&module)[0];
        assert_eq!(stmt.child("value").unwrap().kind, NodeKind::Constant);
    }

    #[test]
    fn test_excessive_nesting_is_rejected() {
        let source = nested_parens(MAX_NESTING + 50);
        match std::thread::spawn(move || parse_source(&source)).join().unwrap() {
            Err(AstGraphError::Syntax(diagnostic)) => {
                assert_eq!(diagnostic.message, "too deeply nested")
            }
            other => panic!("expected nesting error, got {:?}", other),
        }
    }

    fn syntax_message(source: &str) -> String {
        match parse_source(source) {
            Err(AstGraphError::Syntax(diagnostic)) => diagnostic.message,
            other => panic!("expected syntax error for {:?}, got {:?}", source, other),
        }
    }

    #[test]
    fn test_python2_syntax_is_rejected() {
        assert!(syntax_message("print 'hello'\n").contains("Missing parentheses in call to 'print'"));
        assert!(syntax_message("exec 'x = 1'\n").contains("'exec'"));
        assert!(syntax_message("x = 0777\n").contains("leading zeros"));
        for source in ["x = 1L\n", "a <> b\n", "s = ur'x'\n"] {
            syntax_message(source);
        }
        // The Python 3 spellings still parse.
        assert_eq!(expression("print('hello')\n").kind, NodeKind::Call);
        assert_eq!(expression("a != 0o777\n").kind, NodeKind::Compare);
    }

    #[test]
    fn test_invalid_literals_are_rejected() {
        assert_eq!(
            syntax_message("b'a' 'b'\n"),
            "cannot mix bytes and nonbytes literals"
        );
        assert!(syntax_message("'\\xZZ'\n").contains("truncated"));
        assert!(syntax_message("b'caf\u{e9}'\n").contains("ASCII"));
    }

    fn case_patterns(source: &str) -> Vec<SyntaxNode> {
        let stmt = single_statement(source);
        assert_eq!(stmt.kind, NodeKind::Match);
        list(&stmt, "cases")
            .iter()
            .map(|case| case.child("pattern").unwrap().clone())
            .collect()
    }

    #[test]
    fn test_structural_patterns() {
        let patterns = case_patterns(
            "match command:\n    case [x, *rest]:\n        pass\n    case {'k': v, **others}:\n        pass\n    case Point(0, y=1):\n        pass\n    case 1 | 2 as n:\n        pass\n    case _:\n        pass\n",
        );
        let kinds: Vec<NodeKind> = patterns.iter().map(|p| p.kind).collect();
        assert_eq!(
            kinds,
            vec![
                NodeKind::MatchSequence,
                NodeKind::MatchMapping,
                NodeKind::MatchClass,
                NodeKind::MatchAs,
                NodeKind::MatchAs,
            ]
        );

        let items = list(&patterns[0], "patterns");
        assert_eq!(items[0].kind, NodeKind::MatchAs);
        assert_eq!(items[0].str_field("name"), Some("x"));
        assert_eq!(items[1].kind, NodeKind::MatchStar);
        assert_eq!(items[1].str_field("name"), Some("rest"));

        let mapping = &patterns[1];
        assert_eq!(list(mapping, "keys")[0].kind, NodeKind::Constant);
        assert_eq!(list(mapping, "patterns")[0].str_field("name"), Some("v"));
        assert_eq!(mapping.str_field("rest"), Some("others"));

        let class = &patterns[2];
        assert_eq!(class.child("cls").unwrap().str_field("id"), Some("Point"));
        assert_eq!(list(class, "patterns")[0].kind, NodeKind::MatchValue);
        assert_eq!(
            class.field("kwd_attrs"),
            Some(&FieldValue::List(vec![FieldValue::str("y")]))
        );
        assert_eq!(list(class, "kwd_patterns").len(), 1);

        let alternatives = patterns[3].child("pattern").unwrap();
        assert_eq!(alternatives.kind, NodeKind::MatchOr);
        assert_eq!(list(alternatives, "patterns").len(), 2);
        assert_eq!(patterns[3].str_field("name"), Some("n"));

        assert_eq!(patterns[4].field("pattern"), Some(&FieldValue::Absent));
        assert_eq!(patterns[4].field("name"), Some(&FieldValue::Absent));
    }

    #[test]
    fn test_value_patterns() {
        let patterns = case_patterns(
            "match v:\n    case -1:\n        pass\n    case 1 + 2j:\n        pass\n    case None:\n        pass\n    case Color.RED:\n        pass\n    case (a):\n        pass\n    case a, b:\n        pass\n",
        );
        let kinds: Vec<NodeKind> = patterns.iter().map(|p| p.kind).collect();
        assert_eq!(
            kinds,
            vec![
                NodeKind::MatchValue,
                NodeKind::MatchValue,
                NodeKind::MatchSingleton,
                NodeKind::MatchValue,
                NodeKind::MatchAs,
                NodeKind::MatchSequence,
            ]
        );
        assert_eq!(patterns[0].child("value").unwrap().kind, NodeKind::UnaryOp);
        assert_eq!(patterns[1].child("value").unwrap().kind, NodeKind::BinOp);
        assert_eq!(patterns[2].field("value"), Some(&FieldValue::Leaf(Literal::None)));
        let attribute = patterns[3].child("value").unwrap();
        assert_eq!(attribute.kind, NodeKind::Attribute);
        assert_eq!(attribute.str_field("attr"), Some("RED"));
        assert_eq!(patterns[4].str_field("name"), Some("a"));
        assert_eq!(list(&patterns[5], "patterns").len(), 2);
    }

    #[test]
    fn test_type_parameters() {
        let func = single_statement("def first[T](xs: list[T]) -> T:\n    pass\n");
        let params = list(&func, "type_params");
        assert_eq!(params.len(), 1);
        assert_eq!(params[0].kind, NodeKind::TypeVar);
        assert_eq!(params[0].str_field("name"), Some("T"));
        let args = list(func.child("args").unwrap(), "args");
        assert_eq!(args[0].child("annotation").unwrap().kind, NodeKind::Subscript);

        let class = single_statement("class Box[T: int, *Ts, **P]:\n    pass\n");
        let params = list(&class, "type_params");
        let kinds: Vec<NodeKind> = params.iter().map(|p| p.kind).collect();
        assert_eq!(
            kinds,
            vec![NodeKind::TypeVar, NodeKind::TypeVarTuple, NodeKind::ParamSpec]
        );
        assert_eq!(params[0].child("bound").unwrap().str_field("id"), Some("int"));
        assert_eq!(params[2].str_field("name"), Some("P"));

        let alias = single_statement("type Pair[K] = tuple[K, K]\n");
        assert_eq!(alias.kind, NodeKind::TypeAlias);
        assert_eq!(alias.child("name").unwrap().str_field("id"), Some("Pair"));
        assert_eq!(list(&alias, "type_params").len(), 1);
        assert_eq!(alias.child("value").unwrap().kind, NodeKind::Subscript);
    }

    #[test]
    fn test_self_documenting_f_string() {
        let joined = expression("f'{x=}'\n");
        let values = list(&joined, "values");
        assert_eq!(values.len(), 2);
        assert_eq!(values[0].field("value"), Some(&FieldValue::Leaf(Literal::Str("x=".into()))));
        assert_eq!(values[1].field("conversion"), Some(&FieldValue::Leaf(Literal::Int(114))));

        let joined = expression("f'{x = :>4}'\n");
        let values = list(&joined, "values");
        assert_eq!(values[0].field("value"), Some(&FieldValue::Leaf(Literal::Str("x = ".into()))));
        assert_eq!(values[1].field("conversion"), Some(&FieldValue::Leaf(Literal::Int(-1))));
        assert!(values[1].child("format_spec").is_some());
    }

    #[test]
    fn test_nested_format_spec() {
        let joined = expression("f'{v:{width}}'\n");
        let value = list(&joined, "values")[0];
        let spec = value.child("format_spec").unwrap();
        assert_eq!(spec.kind, NodeKind::JoinedStr);
        let nested = list(spec, "values");
        assert_eq!(nested.len(), 1);
        assert_eq!(nested[0].kind, NodeKind::FormattedValue);
        assert_eq!(nested[0].child("value").unwrap().str_field("id"), Some("width"));
    }

    #[test]
    fn test_read_source_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.py");
        assert!(matches!(read_source(&missing), Err(AstGraphError::NotFound(_))));

        let binary = dir.path().join("binary.py");
        fs::write(&binary, [0xff, 0xfe, 0x00, 0x41]).unwrap();
        assert!(matches!(read_source(&binary), Err(AstGraphError::Read { .. })));

        assert!(matches!(read_source(dir.path()), Err(AstGraphError::Read { .. })));
    }

    #[test]
    fn test_read_source_strips_bom() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all("\u{feff}x = 1\n".as_bytes()).unwrap();
        assert_eq!(read_source(file.path()).unwrap(), "x = 1\n");
        let module = parse_file(file.path()).unwrap();
        assert_eq!(body(&module).len(), 1);
    }
}
