//! Per-module symbol tables
//!
//! The first pass over a module: every name bound at module level (classes,
//! functions, imports, simple aliases and other values), class bodies with
//! their members and annotated attributes, and the import statements that feed
//! the module's import table.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use tree_sitter::Node;

use crate::error::Result;
use crate::indexer::annotation::{is_dotted_name, normalize_annotation};
use crate::indexer::import_resolver::{read_import, ImportedName, TypeCheckingGuard};
use crate::indexer::modules::ModuleSource;
use crate::indexer::parser::ParsedFile;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionKind {
    Function,
    ClassMethod,
    StaticMethod,
    Property,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDecl {
    pub module: String,
    pub qualname: String,
    pub kind: FunctionKind,
    pub return_annotation: Option<String>,
}

impl FunctionDecl {
    pub fn canonical_path(&self) -> String {
        format!("{}.{}", self.module, self.qualname)
    }

    pub fn is_property(&self) -> bool {
        self.kind == FunctionKind::Property
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassDecl {
    pub module: String,
    pub qualname: String,
    /// Base class expressions with subscripts stripped (`Generic[T]` → `Generic`).
    pub bases: Vec<String>,
    /// Import targets of the base heads as they were bound when the class
    /// statement ran, so `class Foo(Foo)` reaches the imported `Foo`.
    pub base_imports: BTreeMap<String, String>,
    pub members: BTreeMap<String, Binding>,
    /// Annotated class-level attributes in source order.
    pub annotations: Vec<(String, String)>,
}

impl ClassDecl {
    pub fn canonical_path(&self) -> String {
        format!("{}.{}", self.module, self.qualname)
    }
}

/// What a name is bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Binding {
    Class(Arc<ClassDecl>),
    Function(Arc<FunctionDecl>),
    /// Bound by an import statement to a fully-qualified path.
    Import(String),
    /// `Name = other.name`
    Alias(String),
    /// Anything else: constants, type variables, calls.
    Value,
}

#[derive(Debug, Clone)]
pub struct ModuleSymbols {
    pub name: String,
    pub path: PathBuf,
    pub is_package: bool,
    pub bindings: BTreeMap<String, Binding>,
    /// Modules pulled in with `from x import *`, in source order.
    pub star_imports: Vec<String>,
    /// Imports at module level or under a `TYPE_CHECKING` guard, in source order.
    pub imports: Vec<ImportedName>,
}

impl ModuleSymbols {
    pub fn get(&self, name: &str) -> Option<&Binding> {
        self.bindings.get(name)
    }
}

pub struct SymbolTableBuilder<'a> {
    parsed: &'a ParsedFile,
    source: &'a ModuleSource,
    guard: TypeCheckingGuard,
    /// Inside an `except` handler, where bindings only fill gaps.
    in_handler: bool,
}

impl<'a> SymbolTableBuilder<'a> {
    pub fn new(parsed: &'a ParsedFile, source: &'a ModuleSource) -> Self {
        Self {
            parsed,
            source,
            guard: TypeCheckingGuard::new(),
            in_handler: false,
        }
    }

    pub fn build(mut self) -> Result<ModuleSymbols> {
        let mut symbols = ModuleSymbols {
            name: self.source.name.clone(),
            path: self.source.path.clone(),
            is_package: self.source.is_package,
            bindings: BTreeMap::new(),
            star_imports: Vec::new(),
            imports: Vec::new(),
        };

        let root = self.parsed.root_node();
        self.visit_block(&root, true, &mut symbols)?;
        Ok(symbols)
    }

    /// `import_table` is whether imports found here feed the import table.
    fn visit_block(&mut self, block: &Node, import_table: bool, symbols: &mut ModuleSymbols) -> Result<()> {
        let mut cursor = block.walk();
        let statements: Vec<Node> = block.named_children(&mut cursor).collect();

        for statement in statements {
            match statement.kind() {
                "import_statement" | "import_from_statement" => {
                    let Some(import) = read_import(&statement, self.parsed, self.source)? else {
                        continue;
                    };

                    for name in import.names {
                        self.guard.observe(&name);
                        self.bind(symbols, name.bound.clone(), Binding::Import(name.bound_target.clone()));
                        if import_table {
                            symbols.imports.push(name);
                        }
                    }

                    if let Some(from) = import.star_from {
                        if !symbols.star_imports.contains(&from) {
                            symbols.star_imports.push(from);
                        }
                    }
                }
                "if_statement" => {
                    let guarded = statement
                        .child_by_field_name("condition")
                        .is_some_and(|c| self.guard.is_guard(self.parsed.node_text(&c)));

                    if let Some(consequence) = statement.child_by_field_name("consequence") {
                        self.visit_block(&consequence, import_table && guarded, symbols)?;
                    }

                    for branch in alternative_blocks(&statement) {
                        self.visit_block(&branch, false, symbols)?;
                    }
                }
                "try_statement" => {
                    for (branch, handler) in try_blocks(&statement) {
                        let outer = self.in_handler;
                        self.in_handler = outer || handler;
                        let visited = self.visit_block(&branch, false, symbols);
                        self.in_handler = outer;
                        visited?;
                    }
                }
                _ => {
                    if let Some((name, binding)) = self.read_definition(&statement, None, &symbols.bindings) {
                        self.bind(symbols, name, binding);
                    }
                }
            }
        }

        Ok(())
    }

    /// Fallbacks in `except` handlers never replace what the `try` body bound.
    fn bind(&self, symbols: &mut ModuleSymbols, name: String, binding: Binding) {
        if self.in_handler && symbols.bindings.contains_key(&name) {
            return;
        }

        symbols.bindings.insert(name, binding);
    }

    /// Reads a class, function or assignment statement into a binding.
    ///
    /// `bound` holds the module-level bindings made before the statement.
    fn read_definition(
        &self,
        node: &Node,
        owner: Option<&str>,
        bound: &BTreeMap<String, Binding>,
    ) -> Option<(String, Binding)> {
        match node.kind() {
            "class_definition" => {
                let class = self.read_class(node, owner, bound)?;
                let name = class.qualname.rsplit('.').next()?.to_string();
                Some((name, Binding::Class(Arc::new(class))))
            }
            "function_definition" => {
                let function = self.read_function(node, owner, FunctionKind::Function)?;
                let name = function.qualname.rsplit('.').next()?.to_string();
                Some((name, Binding::Function(Arc::new(function))))
            }
            "decorated_definition" => {
                let definition = node.child_by_field_name("definition")?;
                if definition.kind() == "class_definition" {
                    return self.read_definition(&definition, owner, bound);
                }

                let kind = self.function_kind(node);
                let function = self.read_function(&definition, owner, kind)?;
                let name = function.qualname.rsplit('.').next()?.to_string();
                Some((name, Binding::Function(Arc::new(function))))
            }
            "expression_statement" => {
                let assignment = node.named_child(0)?;
                if assignment.kind() != "assignment" {
                    return None;
                }

                let left = assignment.child_by_field_name("left")?;
                if left.kind() != "identifier" {
                    return None;
                }

                let name = self.parsed.node_text(&left).to_string();
                let binding = match assignment.child_by_field_name("right") {
                    Some(right) if matches!(right.kind(), "identifier" | "attribute") => {
                        let value = self.parsed.node_text(&right);
                        if is_dotted_name(value) {
                            Binding::Alias(value.to_string())
                        } else {
                            Binding::Value
                        }
                    }
                    _ => Binding::Value,
                };

                Some((name, binding))
            }
            _ => None,
        }
    }

    fn read_class(&self, node: &Node, owner: Option<&str>, bound: &BTreeMap<String, Binding>) -> Option<ClassDecl> {
        let name = self.parsed.node_text(&node.child_by_field_name("name")?);
        let qualname = qualify(owner, name);

        let mut bases = Vec::new();
        let mut base_imports = BTreeMap::new();
        if let Some(superclasses) = node.child_by_field_name("superclasses") {
            let mut cursor = superclasses.walk();
            for base in superclasses.named_children(&mut cursor) {
                let expression = match base.kind() {
                    "subscript" => match base.child_by_field_name("value") {
                        Some(value) => value,
                        None => continue,
                    },
                    "identifier" | "attribute" => base,
                    // keyword arguments (`metaclass=...`), splats and calls
                    _ => continue,
                };

                let text = self.parsed.node_text(&expression);
                if !is_dotted_name(text) {
                    continue;
                }

                let head = text.split('.').next().unwrap_or(text);
                if let Some(Binding::Import(target)) = bound.get(head) {
                    base_imports.insert(head.to_string(), target.clone());
                }
                bases.push(text.to_string());
            }
        }

        let mut class = ClassDecl {
            module: self.source.name.clone(),
            qualname,
            bases,
            base_imports,
            members: BTreeMap::new(),
            annotations: Vec::new(),
        };

        if let Some(body) = node.child_by_field_name("body") {
            self.visit_class_body(&body, &mut class, bound);
        }

        Some(class)
    }

    fn visit_class_body(&self, body: &Node, class: &mut ClassDecl, bound: &BTreeMap<String, Binding>) {
        let mut cursor = body.walk();
        let statements: Vec<Node> = body.named_children(&mut cursor).collect();

        for statement in statements {
            match statement.kind() {
                "if_statement" | "try_statement" => {
                    let branches = if statement.kind() == "try_statement" {
                        try_blocks(&statement).into_iter().map(|(block, _)| block).collect()
                    } else {
                        let mut blocks: Vec<Node> =
                            statement.child_by_field_name("consequence").into_iter().collect();
                        blocks.extend(alternative_blocks(&statement));
                        blocks
                    };

                    for branch in branches {
                        self.visit_class_body(&branch, class, bound);
                    }
                }
                "expression_statement" => {
                    if let Some((name, annotation)) = self.read_annotated_attribute(&statement) {
                        class.annotations.retain(|(existing, _)| *existing != name);
                        class.annotations.push((name, annotation));
                    }
                }
                "decorated_definition" if self.is_accessor_redefinition(&statement, class) => {}
                _ => {
                    if let Some((name, binding)) =
                        self.read_definition(&statement, Some(&class.qualname), bound)
                    {
                        if matches!(binding, Binding::Class(_) | Binding::Function(_)) {
                            class.members.insert(name, binding);
                        }
                    }
                }
            }
        }
    }

    fn read_annotated_attribute(&self, statement: &Node) -> Option<(String, String)> {
        let assignment = statement.named_child(0)?;
        if assignment.kind() != "assignment" {
            return None;
        }

        let left = assignment.child_by_field_name("left")?;
        if left.kind() != "identifier" {
            return None;
        }

        let annotation = assignment.child_by_field_name("type")?;
        Some((
            self.parsed.node_text(&left).to_string(),
            normalize_annotation(self.parsed.node_text(&annotation)),
        ))
    }

    /// `@name.setter` / `@name.deleter` on an existing property.
    fn is_accessor_redefinition(&self, node: &Node, class: &ClassDecl) -> bool {
        self.decorators(node).iter().any(|decorator| {
            let Some((property, accessor)) = decorator.rsplit_once('.') else {
                return false;
            };

            matches!(accessor, "setter" | "deleter")
                && matches!(
                    class.members.get(property),
                    Some(Binding::Function(f)) if f.is_property()
                )
        })
    }

    fn read_function(&self, node: &Node, owner: Option<&str>, kind: FunctionKind) -> Option<FunctionDecl> {
        let name = self.parsed.node_text(&node.child_by_field_name("name")?);
        let return_annotation = node
            .child_by_field_name("return_type")
            .map(|n| normalize_annotation(self.parsed.node_text(&n)));

        Some(FunctionDecl {
            module: self.source.name.clone(),
            qualname: qualify(owner, name),
            kind,
            return_annotation,
        })
    }

    fn function_kind(&self, node: &Node) -> FunctionKind {
        for decorator in self.decorators(node) {
            let name = decorator.rsplit('.').next().unwrap_or(decorator);
            match name {
                "property" | "cached_property" => return FunctionKind::Property,
                "classmethod" => return FunctionKind::ClassMethod,
                "staticmethod" => return FunctionKind::StaticMethod,
                _ => {}
            }
        }

        FunctionKind::Function
    }

    fn decorators(&self, node: &Node) -> Vec<&'a str> {
        let mut decorators = Vec::new();
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            if child.kind() != "decorator" {
                continue;
            }

            if let Some(expression) = child.named_child(0) {
                decorators.push(self.parsed.node_text(&expression));
            }
        }

        decorators
    }
}

fn qualify(owner: Option<&str>, name: &str) -> String {
    match owner {
        Some(owner) => format!("{}.{}", owner, name),
        None => name.to_string(),
    }
}

/// Bodies of the `elif` / `else` branches of an if statement.
fn alternative_blocks<'t>(statement: &Node<'t>) -> Vec<Node<'t>> {
    let mut blocks = Vec::new();
    let mut cursor = statement.walk();
    for alternative in statement.children_by_field_name("alternative", &mut cursor) {
        let field = match alternative.kind() {
            "elif_clause" => "consequence",
            _ => "body",
        };

        if let Some(block) = alternative.child_by_field_name(field) {
            blocks.push(block);
        }
    }

    blocks
}

/// Every block of a try statement (body, handlers, else and finally), paired
/// with whether it is an `except` handler.
fn try_blocks<'t>(statement: &Node<'t>) -> Vec<(Node<'t>, bool)> {
    let mut blocks = Vec::new();
    let mut cursor = statement.walk();
    for child in statement.named_children(&mut cursor) {
        if child.kind() == "block" {
            blocks.push((child, false));
            continue;
        }

        let handler = matches!(child.kind(), "except_clause" | "except_group_clause");
        let mut inner = child.walk();
        blocks.extend(
            child
                .named_children(&mut inner)
                .filter(|n| n.kind() == "block")
                .map(|block| (block, handler)),
        );
    }

    blocks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexer::parser::Parser;

    fn build(code: &str, name: &str, is_package: bool) -> ModuleSymbols {
        let parsed = Parser::python().parse_source(code).unwrap();
        let source = ModuleSource {
            name: name.to_string(),
            path: PathBuf::from("test.py"),
            is_package,
        };
        SymbolTableBuilder::new(&parsed, &source).build().unwrap()
    }

    fn class<'s>(symbols: &'s ModuleSymbols, name: &str) -> &'s ClassDecl {
        match symbols.get(name) {
            Some(Binding::Class(class)) => class,
            other => panic!("expected class {}, got {:?}", name, other),
        }
    }

    fn function<'s>(members: &'s BTreeMap<String, Binding>, name: &str) -> &'s FunctionDecl {
        match members.get(name) {
            Some(Binding::Function(function)) => function,
            other => panic!("expected function {}, got {:?}", name, other),
        }
    }

    #[test]
    fn test_module_bindings() {
        let symbols = build(
            r#"
import os.path
from .models import Foo as Bar
from typing import TypeVar

T = TypeVar("T")
Alias = Bar
VERSION = "1.0"

def make() -> Bar:
    ...

class Widget:
    pass
"#,
            "pkg.mod",
            false,
        );

        assert_eq!(symbols.get("os"), Some(&Binding::Import("os".to_string())));
        assert_eq!(
            symbols.get("Bar"),
            Some(&Binding::Import("pkg.models.Foo".to_string()))
        );
        assert_eq!(symbols.get("T"), Some(&Binding::Value));
        assert_eq!(symbols.get("Alias"), Some(&Binding::Alias("Bar".to_string())));
        assert_eq!(symbols.get("VERSION"), Some(&Binding::Value));
        assert_eq!(
            function(&symbols.bindings, "make").return_annotation.as_deref(),
            Some("Bar")
        );
        assert_eq!(class(&symbols, "Widget").canonical_path(), "pkg.mod.Widget");

        let imports: Vec<_> = symbols.imports.iter().map(|i| i.alias.as_str()).collect();
        assert_eq!(imports, vec!["os.path", "Bar", "TypeVar"]);
    }

    #[test]
    fn test_type_checking_imports_feed_table() {
        let symbols = build(
            r#"
import typing as t

if t.TYPE_CHECKING:
    from pkg.models import Foo
else:
    from pkg.other import Other

try:
    from fast import Thing
except ImportError:
    from slow import Thing
"#,
            "pkg.mod",
            false,
        );

        let imports: Vec<_> = symbols.imports.iter().map(|i| i.alias.as_str()).collect();
        assert_eq!(imports, vec!["t", "Foo"]);
        assert!(symbols.get("Other").is_some());
        assert_eq!(symbols.get("Thing"), Some(&Binding::Import("fast.Thing".to_string())));
    }

    #[test]
    fn test_except_fallback_keeps_try_binding() {
        let symbols = build(
            r#"
try:
    from pkg.models import Foo
except ImportError:
    Foo = None
    Bar = None
"#,
            "pkg.mod",
            false,
        );

        assert_eq!(symbols.get("Foo"), Some(&Binding::Import("pkg.models.Foo".to_string())));
        assert_eq!(symbols.get("Bar"), Some(&Binding::Value));
    }

    #[test]
    fn test_base_imports_snapshot_shadowed_name() {
        let symbols = build(
            "from pkg.base import Foo\nimport pkg.mixins as mixins\n\nclass Foo(Foo, mixins.Mixin, Local):\n    pass\n",
            "pkg.ext",
            false,
        );

        let foo = class(&symbols, "Foo");
        assert_eq!(foo.bases, vec!["Foo", "mixins.Mixin", "Local"]);
        assert_eq!(foo.base_imports.get("Foo").map(String::as_str), Some("pkg.base.Foo"));
        assert_eq!(foo.base_imports.get("mixins").map(String::as_str), Some("pkg.mixins"));
        assert!(!foo.base_imports.contains_key("Local"));
    }

    #[test]
    fn test_star_imports() {
        let symbols = build("from .a import *\nfrom .a import *\n", "pkg", true);
        assert_eq!(symbols.star_imports, vec!["pkg.a"]);
    }

    #[test]
    fn test_class_members_and_annotations() {
        let symbols = build(
            r#"
class Widget(base.Base, Generic[T], metaclass=abc.ABCMeta):
    name: str
    size: int = 0
    count = 5

    @property
    def owner(self) -> "Owner":
        ...

    @owner.setter
    def owner(self, value: Owner) -> None:
        ...

    @classmethod
    def create(cls) -> Widget:
        ...

    @staticmethod
    def helper():
        ...

    class Inner:
        value: Widget
"#,
            "pkg.mod",
            false,
        );

        let widget = class(&symbols, "Widget");
        assert_eq!(widget.bases, vec!["base.Base", "Generic"]);
        assert_eq!(
            widget.annotations,
            vec![
                ("name".to_string(), "str".to_string()),
                ("size".to_string(), "int".to_string()),
            ]
        );
        assert!(!widget.members.contains_key("count"));

        let owner = function(&widget.members, "owner");
        assert_eq!(owner.kind, FunctionKind::Property);
        assert_eq!(owner.return_annotation.as_deref(), Some("Owner"));
        assert_eq!(owner.canonical_path(), "pkg.mod.Widget.owner");

        assert_eq!(function(&widget.members, "create").kind, FunctionKind::ClassMethod);
        let helper = function(&widget.members, "helper");
        assert_eq!(helper.kind, FunctionKind::StaticMethod);
        assert!(helper.return_annotation.is_none());

        match widget.members.get("Inner") {
            Some(Binding::Class(inner)) => {
                assert_eq!(inner.qualname, "Widget.Inner");
                assert_eq!(inner.annotations[0].1, "Widget");
            }
            other => panic!("expected nested class, got {:?}", other),
        }
    }

    #[test]
    fn test_later_definition_wins() {
        let symbols = build(
            "class Foo:\n    pass\n\nFoo = Bar\n",
            "pkg.mod",
            false,
        );
        assert_eq!(symbols.get("Foo"), Some(&Binding::Alias("Bar".to_string())));
    }

    #[test]
    fn test_multiline_return_annotation_is_normalized() {
        let symbols = build(
            "def f() -> typing.Mapping[\n    str,\n    Foo,\n]:\n    ...\n",
            "pkg",
            true,
        );
        assert_eq!(
            function(&symbols.bindings, "f").return_annotation.as_deref(),
            Some("typing.Mapping[str, Foo]")
        );
    }
}
