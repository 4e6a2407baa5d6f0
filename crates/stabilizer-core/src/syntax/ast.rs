//! Module-level syntax nodes consumed by the subpath detector and the code
//! rewriter. Only the node kinds those passes dispatch on are modelled.

/// Byte range into the parsed source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    #[must_use]
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

/// A quoted string literal. `span` covers the contents between the quotes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringLiteral {
    pub value: String,
    pub quote: char,
    pub span: Span,
}

/// Callee of a call expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Callee {
    /// `require(...)`, `foo(...)`.
    Identifier(String),
    /// `require.resolve(...)`, `obj.require(...)`. `object` is the full
    /// dotted object path (`a.b` for `a.b.c(...)`).
    Member { object: String, property: String },
    /// Dynamic `import(...)`.
    Import,
}

/// Tagged module node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleNode {
    /// Call whose first argument is a plain string literal.
    Call {
        callee: Callee,
        argument: StringLiteral,
    },
    /// `import x from "src"` or `import "src"`.
    Import { source: StringLiteral },
    /// Any `export` declaration. `source` is set for re-exports
    /// (`export * from "src"`), never for `export default`.
    Export {
        source: Option<StringLiteral>,
        is_default: bool,
    },
    /// A string literal in any other position.
    Literal(StringLiteral),
}

/// Parsed module: nodes in source order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Module {
    pub nodes: Vec<ModuleNode>,
}

impl ModuleNode {
    /// The module specifier this node references, if it is a dependency
    /// reference: `require("x")`, `require.<member>("x")`, `import("x")`,
    /// `import … from "x"` and `export … from "x"`.
    #[must_use]
    pub fn specifier(&self) -> Option<&StringLiteral> {
        match self {
            Self::Call { callee, argument }
                if callee.is_require()
                    || callee.is_require_member()
                    || *callee == Callee::Import =>
            {
                Some(argument)
            }
            Self::Import { source } => Some(source),
            Self::Export {
                source: Some(source),
                ..
            } => Some(source),
            _ => None,
        }
    }
}

impl Module {
    /// Every dependency reference, in source order.
    pub fn specifiers(&self) -> impl Iterator<Item = &StringLiteral> {
        self.nodes.iter().filter_map(ModuleNode::specifier)
    }
}

impl Callee {
    /// `require`.
    #[must_use]
    pub fn is_require(&self) -> bool {
        matches!(self, Self::Identifier(name) if name == "require")
    }

    /// `require.<member>`, with `require` as the whole object.
    #[must_use]
    pub fn is_require_member(&self) -> bool {
        matches!(self, Self::Member { object, .. } if object == "require")
    }
}
