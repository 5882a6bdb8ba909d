//! Syntax tree for the style-authoring subset of TypeScript
//!
//! Type annotations are discarded by the parser, so nothing here refers to types.

use std::rc::Rc;
use stylebake_core::BinaryOp;

/// Byte range into the module source
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn text<'s>(&self, source: &'s str) -> &'s str {
        source.get(self.start..self.end).unwrap_or("")
    }
}

#[derive(Clone, Debug, Default)]
pub struct Module {
    pub items: Vec<Item>,
}

/// A top-level statement
#[derive(Clone, Debug)]
pub struct Item {
    pub kind: ItemKind,
    pub exported: bool,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub enum ItemKind {
    /// `import ...;` (not evaluated)
    Import,
    /// `type`/`interface` declarations and `export { ... }` lists
    Ignored,
    Binding {
        kind: DeclKind,
        declarators: Vec<Declarator>,
    },
    Function(Rc<Function>),
    ExportDefault(Expr),
    Expr(Expr),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeclKind {
    Const,
    Let,
    Var,
}

#[derive(Clone, Debug)]
pub struct Declarator {
    pub pattern: Pattern,
    pub init: Option<Expr>,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub enum Stmt {
    Decl {
        kind: DeclKind,
        declarators: Vec<Declarator>,
    },
    Function(Rc<Function>),
    If {
        test: Expr,
        then: Box<Stmt>,
        otherwise: Option<Box<Stmt>>,
    },
    Block(Vec<Stmt>),
    Return(Option<Expr>),
    Expr(Expr),
    Empty,
}

/// Binding target of a declaration or parameter
#[derive(Clone, Debug)]
pub enum Pattern {
    Ident(String),
    Object {
        props: Vec<PatternProp>,
        rest: Option<String>,
    },
    Array {
        elems: Vec<Option<PatternElem>>,
        rest: Option<String>,
    },
}

#[derive(Clone, Debug)]
pub struct PatternProp {
    pub key: String,
    pub value: Pattern,
    pub default: Option<Expr>,
}

#[derive(Clone, Debug)]
pub struct PatternElem {
    pub pattern: Pattern,
    pub default: Option<Expr>,
}

#[derive(Clone, Debug)]
pub struct Param {
    pub pattern: Pattern,
    pub default: Option<Expr>,
}

impl Param {
    /// Parameter name when it is a plain identifier
    pub fn ident(&self) -> Option<&str> {
        match &self.pattern {
            Pattern::Ident(name) => Some(name),
            _ => None,
        }
    }
}

#[derive(Clone, Debug)]
pub enum FunctionBody {
    Expr(Box<Expr>),
    Block(Vec<Stmt>),
}

#[derive(Clone, Debug)]
pub struct Function {
    pub name: Option<String>,
    pub params: Vec<Param>,
    pub body: FunctionBody,
    pub is_arrow: bool,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub enum ExprKind {
    Number(f64),
    String(String),
    Template {
        quasis: Vec<String>,
        exprs: Vec<Expr>,
    },
    Bool(bool),
    Null,
    Undefined,
    Ident(String),
    Object(Vec<ObjectProp>),
    Array(Vec<ArrayElem>),
    Function(Rc<Function>),
    Member {
        object: Box<Expr>,
        property: MemberProp,
        optional: bool,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<ArrayElem>,
        optional: bool,
    },
    New(Box<Expr>),
    Unary {
        op: UnaryOperator,
        arg: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Cond {
        test: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
    Assign {
        op: AssignOp,
        target: Box<Expr>,
        value: Box<Expr>,
    },
    /// Parenthesized expression, kept for source fidelity
    Paren(Box<Expr>),
}

impl Expr {
    /// Strip parentheses
    pub fn unparen(&self) -> &Expr {
        match &self.kind {
            ExprKind::Paren(inner) => inner.unparen(),
            _ => self,
        }
    }

    /// Member chain `root.a.b.c` with only static property names
    pub fn member_chain(&self) -> Option<(&str, Vec<&str>)> {
        match &self.unparen().kind {
            ExprKind::Ident(name) => Some((name.as_str(), Vec::new())),
            ExprKind::Member {
                object,
                property: MemberProp::Name(prop),
                ..
            } => {
                let (root, mut chain) = object.member_chain()?;
                chain.push(prop.as_str());
                Some((root, chain))
            }
            ExprKind::Member {
                object,
                property: MemberProp::Computed(key),
                ..
            } => match &key.unparen().kind {
                ExprKind::String(prop) => {
                    let (root, mut chain) = object.member_chain()?;
                    chain.push(prop.as_str());
                    Some((root, chain))
                }
                _ => None,
            },
            _ => None,
        }
    }
}

#[derive(Clone, Debug)]
pub enum MemberProp {
    Name(String),
    Computed(Box<Expr>),
}

#[derive(Clone, Debug)]
pub enum PropKey {
    /// Identifier, string or number key
    Name(String),
    Computed(Expr),
}

#[derive(Clone, Debug)]
pub enum ObjectProp {
    KeyValue { key: PropKey, value: Expr },
    Shorthand(String),
    Spread(Expr),
}

#[derive(Clone, Debug)]
pub enum ArrayElem {
    Expr(Expr),
    Spread(Expr),
    Hole,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOperator {
    Not,
    Neg,
    Plus,
    TypeOf,
    Void,
}

impl UnaryOperator {
    /// Operators that keep a theme reference alive
    pub fn theme_op(self) -> Option<stylebake_core::UnaryOp> {
        use stylebake_core::UnaryOp;
        match self {
            UnaryOperator::Not => Some(UnaryOp::Not),
            UnaryOperator::Neg => Some(UnaryOp::Neg),
            UnaryOperator::Plus => Some(UnaryOp::Plus),
            UnaryOperator::TypeOf | UnaryOperator::Void => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    Add,
    Sub,
    Mul,
    Nullish,
    Or,
    And,
}

impl AssignOp {
    /// Binary operator applied by a compound assignment
    pub fn binary(self) -> Option<BinaryOp> {
        match self {
            AssignOp::Assign => None,
            AssignOp::Add => Some(BinaryOp::Add),
            AssignOp::Sub => Some(BinaryOp::Sub),
            AssignOp::Mul => Some(BinaryOp::Mul),
            AssignOp::Nullish => Some(BinaryOp::Nullish),
            AssignOp::Or => Some(BinaryOp::Or),
            AssignOp::And => Some(BinaryOp::And),
        }
    }
}
