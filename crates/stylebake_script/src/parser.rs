//! nom parser for style modules
//!
//! Parses the subset of TypeScript that style files are written in. Type
//! annotations, casts, `type` aliases and interfaces are skipped without being
//! interpreted. Every expression keeps its byte span so the rewrite pass can
//! splice replacement text into the original source.

use crate::ast::*;
use crate::value::number_to_string;
use nom::{
    branch::alt,
    bytes::complete::{tag, take_until, take_while},
    character::complete::{char, digit0, digit1, hex_digit1, multispace1, not_line_ending, one_of, satisfy},
    combinator::{cut, map, not, opt, recognize, value},
    error::{context, ErrorKind, ParseError as NomParseError, VerboseError, VerboseErrorKind},
    multi::many0,
    sequence::{pair, preceded, terminated, tuple},
    IResult,
};
use std::rc::Rc;
use stylebake_core::BinaryOp;

/// Custom parser result type using VerboseError for better diagnostics
type ParseResult<'a, O> = IResult<&'a str, O, VerboseError<&'a str>>;

const RESERVED: &[&str] = &[
    "const", "let", "var", "function", "return", "if", "else", "true", "false", "null",
    "typeof", "void", "new", "import", "export", "default", "in", "instanceof", "this",
];

/// Error type for module parsing with position information
#[derive(Debug, Clone)]
pub struct ParseError {
    /// Human-readable error message with context
    pub message: String,
    /// Line number (1-indexed)
    pub line: usize,
    /// Column number (1-indexed)
    pub column: usize,
    /// The input fragment where parsing failed
    pub fragment: String,
    /// Context stack from nom's VerboseError
    pub contexts: Vec<String>,
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "parse error: line {}, column {}: {}",
            self.line, self.column, self.message
        )?;
        if !self.fragment.is_empty() {
            write!(f, " (near \"{}\")", self.fragment)?;
        }
        Ok(())
    }
}

impl std::error::Error for ParseError {}

impl ParseError {
    fn from_verbose(input: &str, err: VerboseError<&str>) -> Self {
        let (line, column, fragment) = if let Some((frag, _)) = err.errors.first() {
            calculate_position(input, frag)
        } else {
            (1, 1, String::new())
        };

        let contexts: Vec<String> = err
            .errors
            .iter()
            .filter_map(|(_, kind)| match kind {
                VerboseErrorKind::Context(ctx) => Some((*ctx).to_string()),
                _ => None,
            })
            .collect();

        Self {
            message: format_verbose_error(&err),
            line,
            column,
            fragment,
            contexts,
        }
    }

    fn incomplete() -> Self {
        Self {
            message: "unexpected end of input".to_string(),
            line: 1,
            column: 1,
            fragment: String::new(),
            contexts: Vec::new(),
        }
    }
}

/// Format a VerboseError into a human-readable message
fn format_verbose_error(err: &VerboseError<&str>) -> String {
    let mut parts = Vec::new();

    for (input, kind) in &err.errors {
        match kind {
            VerboseErrorKind::Context(ctx) => parts.push(format!("in {}", ctx)),
            VerboseErrorKind::Char(c) => {
                let preview: String = input.chars().take(20).collect();
                parts.push(format!("expected '{}' near \"{}\"", c, preview));
            }
            VerboseErrorKind::Nom(ek) => parts.push(format!("{:?}", ek)),
        }
    }

    if parts.is_empty() {
        "unknown parse error".to_string()
    } else {
        parts.join(", ")
    }
}

/// Calculate line and column from the original input and the error fragment
fn calculate_position(original: &str, fragment: &str) -> (usize, usize, String) {
    let offset = original.len().saturating_sub(fragment.len());
    let consumed = &original[..offset];

    let line = consumed.matches('\n').count() + 1;
    let column = consumed
        .rfind('\n')
        .map(|pos| offset - pos)
        .unwrap_or(offset + 1);

    let preview: String = fragment.chars().take(30).collect();
    (line, column, preview)
}

/// Parse a whole module
pub fn parse_module(source: &str) -> Result<Module, ParseError> {
    let parser = Parser { source };
    let mut items = Vec::new();
    let mut input = source;
    loop {
        let (rest, _) = match ws::<VerboseError<&str>>(input) {
            Ok(r) => r,
            Err(_) => return Err(ParseError::incomplete()),
        };
        if rest.is_empty() {
            break;
        }
        match parser.item(rest) {
            Ok((rest, item)) => {
                items.push(item);
                input = rest;
            }
            Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
                return Err(ParseError::from_verbose(source, e))
            }
            Err(nom::Err::Incomplete(_)) => return Err(ParseError::incomplete()),
        }
    }
    Ok(Module { items })
}

/// Parse a single expression (spans are relative to `source`)
pub fn parse_expression(source: &str) -> Result<Expr, ParseError> {
    let parser = Parser { source };
    let result = parser
        .expr(source)
        .and_then(|(rest, expr)| {
            let (rest, _) = ws(rest)?;
            if rest.is_empty() {
                Ok(expr)
            } else {
                Err(nom::Err::Error(VerboseError::from_error_kind(rest, ErrorKind::Eof)))
            }
        });
    match result {
        Ok(expr) => Ok(expr),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(ParseError::from_verbose(source, e)),
        Err(nom::Err::Incomplete(_)) => Err(ParseError::incomplete()),
    }
}

// ============================================================================
// Lexical helpers
// ============================================================================

/// Parse whitespace and comments
fn ws<'a, E: NomParseError<&'a str>>(input: &'a str) -> IResult<&'a str, (), E> {
    value(
        (),
        many0(alt((
            value((), multispace1),
            value((), line_comment),
            value((), block_comment),
        ))),
    )(input)
}

fn line_comment<'a, E: NomParseError<&'a str>>(input: &'a str) -> IResult<&'a str, &'a str, E> {
    preceded(tag("//"), not_line_ending)(input)
}

fn block_comment<'a, E: NomParseError<&'a str>>(input: &'a str) -> IResult<&'a str, &'a str, E> {
    preceded(tag("/*"), terminated(take_until("*/"), tag("*/")))(input)
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

/// Punctuation token after optional whitespace
fn sym<'a>(s: &'static str) -> impl FnMut(&'a str) -> ParseResult<'a, &'a str> {
    preceded(ws, tag(s))
}

/// Keyword token: must not be followed by an identifier character
fn kw<'a>(word: &'static str) -> impl FnMut(&'a str) -> ParseResult<'a, &'a str> {
    preceded(ws, terminated(tag(word), not(satisfy(is_ident_char))))
}

/// Any identifier name, reserved words included (property names)
fn ident_name(input: &str) -> ParseResult<&str> {
    preceded(
        ws,
        recognize(pair(satisfy(is_ident_start), take_while(is_ident_char))),
    )(input)
}

/// An identifier usable as a binding or reference
fn binding_ident(input: &str) -> ParseResult<&str> {
    let (rest, name) = ident_name(input)?;
    if RESERVED.contains(&name) {
        return Err(nom::Err::Error(VerboseError::from_error_kind(
            input,
            ErrorKind::Tag,
        )));
    }
    Ok((rest, name))
}

fn failure<'a, T>(input: &'a str, ctx: &'static str) -> ParseResult<'a, T> {
    Err(nom::Err::Failure(VerboseError {
        errors: vec![(input, VerboseErrorKind::Context(ctx))],
    }))
}

fn mismatch<'a, T>(input: &'a str) -> ParseResult<'a, T> {
    Err(nom::Err::Error(VerboseError::from_error_kind(
        input,
        ErrorKind::Alt,
    )))
}

/// Numeric literal: decimal with optional fraction/exponent, or hex
fn number(input: &str) -> ParseResult<f64> {
    let (input, _) = ws(input)?;
    if let Ok((rest, digits)) = preceded(
        alt((tag::<_, _, VerboseError<&str>>("0x"), tag("0X"))),
        hex_digit1,
    )(input)
    {
        return match u64::from_str_radix(digits, 16) {
            Ok(n) => Ok((rest, n as f64)),
            Err(_) => failure(input, "hex literal"),
        };
    }

    let exponent = || tuple((one_of("eE"), opt(one_of("+-")), digit1));
    let (rest, text) = terminated(
        alt((
            recognize(tuple((digit1, opt(pair(char('.'), digit0)), opt(exponent())))),
            recognize(tuple((char('.'), digit1, opt(exponent())))),
        )),
        not(satisfy(is_ident_char)),
    )(input)?;
    match text.parse::<f64>() {
        Ok(n) => Ok((rest, n)),
        Err(_) => failure(input, "number literal"),
    }
}

fn parse_escape(chars: &mut std::iter::Peekable<std::str::CharIndices<'_>>) -> Option<Option<char>> {
    let (_, c) = chars.next()?;
    let decoded = match c {
        'n' => '\n',
        't' => '\t',
        'r' => '\r',
        'b' => '\u{8}',
        'f' => '\u{c}',
        'v' => '\u{b}',
        '0' => '\0',
        '\n' => return Some(None),
        'x' => {
            let hex: String = (0..2).filter_map(|_| chars.next().map(|(_, c)| c)).collect();
            char::from_u32(u32::from_str_radix(&hex, 16).ok()?)?
        }
        'u' => {
            let braced = chars.peek().map(|(_, c)| *c) == Some('{');
            let hex: String = if braced {
                chars.next();
                let mut hex = String::new();
                for (_, c) in chars.by_ref() {
                    if c == '}' {
                        break;
                    }
                    hex.push(c);
                }
                hex
            } else {
                (0..4).filter_map(|_| chars.next().map(|(_, c)| c)).collect()
            };
            char::from_u32(u32::from_str_radix(&hex, 16).ok()?)?
        }
        other => other,
    };
    Some(Some(decoded))
}

/// Quoted string literal with JavaScript escapes
fn string_lit(input: &str) -> ParseResult<String> {
    let (input, _) = ws(input)?;
    let mut chars = input.char_indices().peekable();
    let quote = match chars.next() {
        Some((_, q @ ('\'' | '"'))) => q,
        _ => return mismatch(input),
    };
    let mut out = String::new();
    while let Some((i, c)) = chars.next() {
        match c {
            '\\' => match parse_escape(&mut chars) {
                Some(Some(decoded)) => out.push(decoded),
                Some(None) => {}
                None => return failure(&input[i..], "string escape"),
            },
            '\n' => return failure(input, "unterminated string"),
            c if c == quote => return Ok((&input[i + c.len_utf8()..], out)),
            c => out.push(c),
        }
    }
    failure(input, "unterminated string")
}

/// Skip over a quoted region starting at byte `start`, returning the index after it
fn skip_quoted(input: &str, start: usize) -> Option<usize> {
    let quote = input[start..].chars().next()?;
    let mut escaped = false;
    for (i, c) in input[start + 1..].char_indices() {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == quote {
            return Some(start + 1 + i + 1);
        }
    }
    None
}

/// Where a skipped type annotation ends
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum TypeStop {
    /// Parameter or declaration annotation: ends at `,`, `=`, or a closing bracket
    Annotation,
    /// Arrow function return type: ends at `=>`
    ReturnArrow,
    /// Function declaration return type: ends at the body `{`
    ReturnBlock,
    /// `as T` / `satisfies T`: ends at operators, ternary punctuation or a line break
    Cast,
    /// `type X = ...`: ends at `;` or a line break that does not continue the type
    Alias,
}

/// Skip a type expression without interpreting it
fn skip_type(input: &str, stop: TypeStop) -> ParseResult<()> {
    let bytes = input.as_bytes();
    let mut depth = 0usize;
    let mut i = 0;
    let mut expect_operand = true;
    let mut consumed = false;

    while i < bytes.len() {
        let c = bytes[i];
        if c.is_ascii_whitespace() {
            if c == b'\n'
                && depth == 0
                && consumed
                && !expect_operand
                && matches!(stop, TypeStop::Cast | TypeStop::Alias)
            {
                let next = input[i..].trim_start();
                if !(next.starts_with('|') || next.starts_with('&') || next.starts_with('.')) {
                    break;
                }
            }
            i += 1;
            continue;
        }
        if input[i..].starts_with("//") || input[i..].starts_with("/*") {
            let (rest, _) = ws(&input[i..])?;
            i = input.len() - rest.len();
            continue;
        }
        if matches!(c, b'\'' | b'"' | b'`') {
            match skip_quoted(input, i) {
                Some(next) => i = next,
                None => return failure(&input[i..], "unterminated string in type"),
            }
            expect_operand = false;
            consumed = true;
            continue;
        }
        if c == b'=' && bytes.get(i + 1) == Some(&b'>') {
            if depth == 0 && stop == TypeStop::ReturnArrow {
                break;
            }
            i += 2;
            expect_operand = true;
            consumed = true;
            continue;
        }
        if depth == 0 {
            let stops = match c {
                b',' | b')' | b']' | b'}' | b';' => true,
                b'=' => stop != TypeStop::Alias,
                b'{' => stop == TypeStop::ReturnBlock && !expect_operand,
                b'?' | b':' | b'>' => stop == TypeStop::Cast,
                b'+' | b'-' | b'*' | b'/' | b'%' | b'!' => stop == TypeStop::Cast && !expect_operand,
                b'&' | b'|' => stop == TypeStop::Cast && bytes.get(i + 1) == Some(&c),
                _ => false,
            };
            if stops {
                break;
            }
        }
        match c {
            b'(' | b'[' | b'{' | b'<' => {
                depth += 1;
                expect_operand = true;
            }
            b')' | b']' | b'}' | b'>' => {
                if depth == 0 {
                    break;
                }
                depth -= 1;
                expect_operand = false;
            }
            b'|' | b'&' | b',' | b':' | b'?' | b';' | b'=' => expect_operand = true,
            _ => expect_operand = false,
        }
        consumed = true;
        i += 1;
    }

    if !consumed {
        return mismatch(input);
    }
    Ok((&input[i..], ()))
}

/// Skip a balanced `{ ... }` group (the input starts at `{`)
fn skip_braces(input: &str) -> ParseResult<()> {
    let bytes = input.as_bytes();
    let mut depth = 0usize;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\'' | b'"' | b'`' => {
                i = match skip_quoted(input, i) {
                    Some(next) => next,
                    None => return failure(&input[i..], "unterminated string"),
                };
                continue;
            }
            b'{' => depth += 1,
            b'}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Ok((&input[i + 1..], ()));
                }
            }
            _ => {}
        }
        i += 1;
    }
    failure(input, "unbalanced braces")
}

/// Skip an import or re-export clause up to and including its module specifier
fn skip_module_clause(input: &str) -> ParseResult<()> {
    let mut input = input;
    loop {
        let (rest, _) = ws(input)?;
        if rest.is_empty() {
            return failure(input, "module specifier");
        }
        if rest.starts_with('\'') || rest.starts_with('"') {
            let (rest, _) = string_lit(rest)?;
            let (rest, _) = opt(sym(";"))(rest)?;
            return Ok((rest, ()));
        }
        if rest.starts_with('{') {
            let (rest, _) = skip_braces(rest)?;
            input = rest;
            continue;
        }
        if rest.starts_with(';') {
            // `export { a, b };` has no specifier
            return Ok((&rest[1..], ()));
        }
        let skip = rest.chars().next().map(char::len_utf8).unwrap_or(1);
        input = &rest[skip..];
    }
}

fn binary_op(input: &str) -> ParseResult<BinaryOp> {
    preceded(
        ws,
        alt((
            value(BinaryOp::StrictEq, tag("===")),
            value(BinaryOp::StrictNotEq, tag("!==")),
            value(BinaryOp::Eq, tag("==")),
            value(BinaryOp::NotEq, tag("!=")),
            value(BinaryOp::LtEq, tag("<=")),
            value(BinaryOp::GtEq, tag(">=")),
            value(BinaryOp::And, terminated(tag("&&"), not(char('=')))),
            value(BinaryOp::Or, terminated(tag("||"), not(char('=')))),
            value(BinaryOp::Nullish, terminated(tag("??"), not(char('=')))),
            value(BinaryOp::Lt, tag("<")),
            value(BinaryOp::Gt, tag(">")),
            value(BinaryOp::Add, terminated(tag("+"), not(one_of("+=")))),
            value(BinaryOp::Sub, terminated(tag("-"), not(one_of("-=")))),
            value(BinaryOp::Mul, terminated(tag("*"), not(one_of("*=")))),
            value(BinaryOp::Div, terminated(tag("/"), not(one_of("/*=")))),
            value(BinaryOp::Rem, terminated(tag("%"), not(char('=')))),
        )),
    )(input)
}

fn precedence(op: BinaryOp) -> u8 {
    match op {
        BinaryOp::Nullish | BinaryOp::Or => 1,
        BinaryOp::And => 2,
        BinaryOp::Eq | BinaryOp::NotEq | BinaryOp::StrictEq | BinaryOp::StrictNotEq => 3,
        BinaryOp::Lt | BinaryOp::Gt | BinaryOp::LtEq | BinaryOp::GtEq => 4,
        BinaryOp::Add | BinaryOp::Sub => 5,
        BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => 6,
    }
}

fn assign_op(input: &str) -> ParseResult<AssignOp> {
    preceded(
        ws,
        alt((
            value(AssignOp::Nullish, tag("??=")),
            value(AssignOp::Or, tag("||=")),
            value(AssignOp::And, tag("&&=")),
            value(AssignOp::Add, tag("+=")),
            value(AssignOp::Sub, tag("-=")),
            value(AssignOp::Mul, tag("*=")),
            value(AssignOp::Assign, terminated(tag("="), not(one_of("=>")))),
        )),
    )(input)
}

fn unary_op(input: &str) -> ParseResult<UnaryOperator> {
    alt((
        value(UnaryOperator::Not, sym("!")),
        value(UnaryOperator::Neg, preceded(ws, terminated(tag("-"), not(char('-'))))),
        value(UnaryOperator::Plus, preceded(ws, terminated(tag("+"), not(char('+'))))),
        value(UnaryOperator::TypeOf, kw("typeof")),
        value(UnaryOperator::Void, kw("void")),
    ))(input)
}

// ============================================================================
// Grammar
// ============================================================================

struct Parser<'s> {
    source: &'s str,
}

impl<'s> Parser<'s> {
    fn offset(&self, rest: &str) -> usize {
        self.source.len() - rest.len()
    }

    /// Span from the first token at `start` to `end`
    fn span(&self, start: &str, end: &str) -> Span {
        let start = ws::<VerboseError<&str>>(start).map_or(start, |(rest, _)| rest);
        let start = self.offset(start).min(self.offset(end));
        Span::new(start, self.offset(end))
    }

    fn node(&self, kind: ExprKind, start: &str, end: &str) -> Expr {
        Expr {
            kind,
            span: self.span(start, end),
        }
    }

    // ------------------------------------------------------------------
    // Module items
    // ------------------------------------------------------------------

    fn item(&self, input: &'s str) -> ParseResult<'s, Item> {
        let start = input;

        if let Ok((rest, _)) = terminated(kw("import"), not(sym("(")))(input) {
            let (rest, _) = context("import", skip_module_clause)(rest)?;
            return Ok((rest, self.make_item(ItemKind::Import, false, start, rest)));
        }

        let (input, exported) = map(opt(kw("export")), |e| e.is_some())(input)?;
        if exported {
            if let Ok((rest, _)) = kw("default")(input) {
                let (rest, expr) = context("export default", cut(|i| self.expr(i)))(rest)?;
                let (rest, _) = opt(sym(";"))(rest)?;
                return Ok((rest, self.make_item(ItemKind::ExportDefault(expr), true, start, rest)));
            }
            let (list, _) = opt(kw("type"))(input)?;
            if let Ok((rest, _)) = alt((sym("{"), sym("*")))(list) {
                let clause_start = &list[list.len() - rest.len() - 1..];
                let (rest, _) = context("export list", skip_module_clause)(clause_start)?;
                return Ok((rest, self.make_item(ItemKind::Ignored, true, start, rest)));
            }
        }

        if let Some(rest) = self.skip_type_declaration(input)? {
            return Ok((rest, self.make_item(ItemKind::Ignored, exported, start, rest)));
        }

        if let Ok((rest, kind)) = self.decl_kind(input) {
            let (rest, declarators) = context("declaration", cut(|i| self.declarators(i)))(rest)?;
            let (rest, _) = opt(sym(";"))(rest)?;
            return Ok((
                rest,
                self.make_item(ItemKind::Binding { kind, declarators }, exported, start, rest),
            ));
        }

        if let Ok((rest, _)) = kw("function")(input) {
            let (rest, func) = context("function declaration", cut(|i| self.function_rest(i, start)))(rest)?;
            if func.name.is_none() {
                return failure(input, "function name");
            }
            return Ok((rest, self.make_item(ItemKind::Function(func), exported, start, rest)));
        }

        if exported {
            return failure(input, "export");
        }

        let (rest, expr) = self.expr(input)?;
        let (rest, _) = opt(sym(";"))(rest)?;
        Ok((rest, self.make_item(ItemKind::Expr(expr), false, start, rest)))
    }

    fn make_item(&self, kind: ItemKind, exported: bool, start: &str, end: &str) -> Item {
        Item {
            kind,
            exported,
            span: self.span(start, end),
        }
    }

    /// `type X = ...;`, `interface X {...}`, `declare ...;`, `enum X {...}`
    fn skip_type_declaration(&self, input: &'s str) -> Result<Option<&'s str>, nom::Err<VerboseError<&'s str>>> {
        if let Ok((rest, _)) = terminated(kw("type"), binding_ident)(input) {
            let (rest, _) = skip_type(rest, TypeStop::Alias)?;
            let (rest, _) = opt(sym(";"))(rest)?;
            return Ok(Some(rest));
        }
        if let Ok((rest, _)) = alt((kw("interface"), kw("enum")))(input) {
            let brace = match rest.find('{') {
                Some(pos) => &rest[pos..],
                None => return failure::<()>(rest, "interface body").map(|_| None),
            };
            let (rest, _) = skip_braces(brace)?;
            return Ok(Some(rest));
        }
        if let Ok((rest, _)) = kw("declare")(input) {
            let (rest, _) = skip_type(rest, TypeStop::Alias)?;
            let (rest, _) = opt(sym(";"))(rest)?;
            return Ok(Some(rest));
        }
        Ok(None)
    }

    fn decl_kind(&self, input: &'s str) -> ParseResult<'s, DeclKind> {
        alt((
            value(DeclKind::Const, kw("const")),
            value(DeclKind::Let, kw("let")),
            value(DeclKind::Var, kw("var")),
        ))(input)
    }

    fn declarators(&self, input: &'s str) -> ParseResult<'s, Vec<Declarator>> {
        let mut out = Vec::new();
        let mut input = input;
        loop {
            let (start, _) = ws(input)?;
            let (rest, pattern) = self.pattern(start)?;
            let (rest, _) = opt(sym("!"))(rest)?;
            let (rest, _) = opt(preceded(sym(":"), |i| skip_type(i, TypeStop::Annotation)))(rest)?;
            let (rest, init) = opt(preceded(sym("="), cut(|i| self.expr(i))))(rest)?;
            out.push(Declarator {
                pattern,
                init,
                span: self.span(start, rest),
            });
            match sym(",")(rest) {
                Ok((rest, _)) => input = rest,
                Err(_) => return Ok((rest, out)),
            }
        }
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    fn stmt(&self, input: &'s str) -> ParseResult<'s, Stmt> {
        let (input, _) = ws(input)?;
        let start = input;

        if let Ok((rest, _)) = sym(";")(input) {
            return Ok((rest, Stmt::Empty));
        }
        if input.starts_with('{') {
            let (rest, body) = self.block(input)?;
            return Ok((rest, Stmt::Block(body)));
        }
        if let Some(rest) = self.skip_type_declaration(input)? {
            return Ok((rest, Stmt::Empty));
        }
        if let Ok((rest, kind)) = self.decl_kind(input) {
            let (rest, declarators) = cut(|i| self.declarators(i))(rest)?;
            let (rest, _) = opt(sym(";"))(rest)?;
            return Ok((rest, Stmt::Decl { kind, declarators }));
        }
        if let Ok((rest, _)) = kw("function")(input) {
            let (rest, func) = cut(|i| self.function_rest(i, start))(rest)?;
            return Ok((rest, Stmt::Function(func)));
        }
        if let Ok((rest, _)) = kw("if")(input) {
            return context("if statement", cut(|i| self.if_rest(i)))(rest);
        }
        if let Ok((rest, _)) = kw("return")(input) {
            let (peeked, _) = ws(rest)?;
            if peeked.starts_with(';') || peeked.starts_with('}') || peeked.is_empty() {
                let (rest, _) = opt(sym(";"))(rest)?;
                return Ok((rest, Stmt::Return(None)));
            }
            let (rest, expr) = cut(|i| self.expr(i))(rest)?;
            let (rest, _) = opt(sym(";"))(rest)?;
            return Ok((rest, Stmt::Return(Some(expr))));
        }

        let (rest, expr) = self.expr(input)?;
        let (rest, _) = opt(sym(";"))(rest)?;
        Ok((rest, Stmt::Expr(expr)))
    }

    fn if_rest(&self, input: &'s str) -> ParseResult<'s, Stmt> {
        let (rest, _) = sym("(")(input)?;
        let (rest, test) = self.expr(rest)?;
        let (rest, _) = sym(")")(rest)?;
        let (rest, then) = self.stmt(rest)?;
        let (rest, otherwise) = opt(preceded(kw("else"), |i| self.stmt(i)))(rest)?;
        Ok((
            rest,
            Stmt::If {
                test,
                then: Box::new(then),
                otherwise: otherwise.map(Box::new),
            },
        ))
    }

    fn block(&self, input: &'s str) -> ParseResult<'s, Vec<Stmt>> {
        let (mut input, _) = sym("{")(input)?;
        let mut body = Vec::new();
        loop {
            if let Ok((rest, _)) = sym("}")(input) {
                return Ok((rest, body));
            }
            let (rest, _) = ws(input)?;
            if rest.is_empty() {
                return failure(rest, "block");
            }
            let (rest, stmt) = self.stmt(rest)?;
            body.push(stmt);
            input = rest;
        }
    }

    // ------------------------------------------------------------------
    // Functions and patterns
    // ------------------------------------------------------------------

    /// After the `function` keyword: optional name, parameters, body
    fn function_rest(&self, input: &'s str, start: &'s str) -> ParseResult<'s, Rc<Function>> {
        let (rest, name) = opt(binding_ident)(input)?;
        let (rest, params) = self.param_list(rest)?;
        let (rest, _) = opt(preceded(sym(":"), |i| skip_type(i, TypeStop::ReturnBlock)))(rest)?;
        let (rest, body) = self.block(rest)?;
        Ok((
            rest,
            Rc::new(Function {
                name: name.map(str::to_string),
                params,
                body: FunctionBody::Block(body),
                is_arrow: false,
                span: self.span(start, rest),
            }),
        ))
    }

    fn param_list(&self, input: &'s str) -> ParseResult<'s, Vec<Param>> {
        let (mut input, _) = sym("(")(input)?;
        let mut params = Vec::new();
        loop {
            if let Ok((rest, _)) = sym(")")(input) {
                return Ok((rest, params));
            }
            let (rest, pattern) = self.pattern(input)?;
            let (rest, _) = opt(sym("?"))(rest)?;
            let (rest, _) = opt(preceded(sym(":"), |i| skip_type(i, TypeStop::Annotation)))(rest)?;
            let (rest, default) = opt(preceded(
                preceded(ws, terminated(tag("="), not(char('>')))),
                |i| self.expr(i),
            ))(rest)?;
            params.push(Param { pattern, default });
            input = match sym(",")(rest) {
                Ok((rest, _)) => rest,
                Err(_) => {
                    let (rest, _) = sym(")")(rest)?;
                    return Ok((rest, params));
                }
            };
        }
    }

    fn pattern(&self, input: &'s str) -> ParseResult<'s, Pattern> {
        let (input, _) = ws(input)?;
        if input.starts_with('{') {
            return self.object_pattern(input);
        }
        if input.starts_with('[') {
            return self.array_pattern(input);
        }
        map(binding_ident, |name| Pattern::Ident(name.to_string()))(input)
    }

    fn object_pattern(&self, input: &'s str) -> ParseResult<'s, Pattern> {
        let (mut input, _) = sym("{")(input)?;
        let mut props = Vec::new();
        let mut rest_name = None;
        loop {
            if let Ok((rest, _)) = sym("}")(input) {
                return Ok((rest, Pattern::Object { props, rest: rest_name }));
            }
            if let Ok((rest, _)) = sym("...")(input) {
                let (rest, name) = binding_ident(rest)?;
                rest_name = Some(name.to_string());
                input = rest;
            } else {
                let (rest, (key, is_ident)) = alt((
                    map(ident_name, |k| (k.to_string(), true)),
                    map(string_lit, |k| (k, false)),
                ))(input)?;
                let (rest, explicit) = opt(preceded(sym(":"), |i| self.pattern(i)))(rest)?;
                let value = match explicit {
                    Some(p) => p,
                    None if is_ident && !RESERVED.contains(&key.as_str()) => Pattern::Ident(key.clone()),
                    None => return mismatch(rest),
                };
                let (rest, default) = opt(preceded(sym("="), |i| self.expr(i)))(rest)?;
                props.push(PatternProp { key, value, default });
                input = rest;
            }
            input = match sym(",")(input) {
                Ok((rest, _)) => rest,
                Err(_) => {
                    let (rest, _) = sym("}")(input)?;
                    return Ok((rest, Pattern::Object { props, rest: rest_name }));
                }
            };
        }
    }

    fn array_pattern(&self, input: &'s str) -> ParseResult<'s, Pattern> {
        let (mut input, _) = sym("[")(input)?;
        let mut elems = Vec::new();
        let mut rest_name = None;
        loop {
            if let Ok((rest, _)) = sym("]")(input) {
                return Ok((rest, Pattern::Array { elems, rest: rest_name }));
            }
            if let Ok((rest, _)) = sym(",")(input) {
                elems.push(None);
                input = rest;
                continue;
            }
            if let Ok((rest, _)) = sym("...")(input) {
                let (rest, name) = binding_ident(rest)?;
                rest_name = Some(name.to_string());
                input = rest;
            } else {
                let (rest, pattern) = self.pattern(input)?;
                let (rest, default) = opt(preceded(sym("="), |i| self.expr(i)))(rest)?;
                elems.push(Some(PatternElem { pattern, default }));
                input = rest;
            }
            input = match sym(",")(input) {
                Ok((rest, _)) => rest,
                Err(_) => {
                    let (rest, _) = sym("]")(input)?;
                    return Ok((rest, Pattern::Array { elems, rest: rest_name }));
                }
            };
        }
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    fn expr(&self, input: &'s str) -> ParseResult<'s, Expr> {
        let (input, _) = ws(input)?;
        match self.arrow(input) {
            Ok(result) => return Ok(result),
            Err(nom::Err::Error(_)) => {}
            Err(e) => return Err(e),
        }

        let start = input;
        let (rest, left) = self.conditional(input)?;
        let assignable = matches!(left.unparen().kind, ExprKind::Ident(_) | ExprKind::Member { .. });
        if assignable {
            if let Ok((rest, op)) = assign_op(rest) {
                let (rest, value) = cut(|i| self.expr(i))(rest)?;
                let kind = ExprKind::Assign {
                    op,
                    target: Box::new(left),
                    value: Box::new(value),
                };
                return Ok((rest, self.node(kind, start, rest)));
            }
        }
        Ok((rest, left))
    }

    fn arrow(&self, input: &'s str) -> ParseResult<'s, Expr> {
        let start = input;
        let (rest, params) = alt((
            map(binding_ident, |name| {
                vec![Param {
                    pattern: Pattern::Ident(name.to_string()),
                    default: None,
                }]
            }),
            |i| self.param_list(i),
        ))(input)?;
        let (rest, _) = opt(preceded(sym(":"), |i| skip_type(i, TypeStop::ReturnArrow)))(rest)?;
        let (rest, _) = sym("=>")(rest)?;

        let (body_start, _) = ws(rest)?;
        let (rest, body) = if body_start.starts_with('{') {
            map(cut(|i| self.block(i)), FunctionBody::Block)(body_start)?
        } else {
            map(cut(|i| self.expr(i)), |e| FunctionBody::Expr(Box::new(e)))(body_start)?
        };

        let func = Function {
            name: None,
            params,
            body,
            is_arrow: true,
            span: self.span(start, rest),
        };
        Ok((rest, self.node(ExprKind::Function(Rc::new(func)), start, rest)))
    }

    fn conditional(&self, input: &'s str) -> ParseResult<'s, Expr> {
        let start = input;
        let (rest, test) = self.binary(input, 0)?;
        let mut question = preceded(ws::<VerboseError<&'s str>>, terminated(char('?'), not(one_of(".?"))));
        if let Ok((rest, _)) = question(rest) {
            let (rest, then) = cut(|i| self.expr(i))(rest)?;
            let (rest, _) = cut(sym(":"))(rest)?;
            let (rest, otherwise) = cut(|i| self.expr(i))(rest)?;
            let kind = ExprKind::Cond {
                test: Box::new(test),
                then: Box::new(then),
                otherwise: Box::new(otherwise),
            };
            return Ok((rest, self.node(kind, start, rest)));
        }
        Ok((rest, test))
    }

    fn binary(&self, input: &'s str, min_prec: u8) -> ParseResult<'s, Expr> {
        let start = input;
        let (mut input, mut left) = self.unary(input)?;
        loop {
            let Ok((rest, op)) = binary_op(input) else {
                break;
            };
            let prec = precedence(op);
            if prec < min_prec {
                break;
            }
            let (rest, right) = cut(|i| self.binary(i, prec + 1))(rest)?;
            let kind = ExprKind::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
            left = self.node(kind, start, rest);
            input = rest;
        }
        Ok((input, left))
    }

    fn unary(&self, input: &'s str) -> ParseResult<'s, Expr> {
        let (input, _) = ws(input)?;
        let start = input;
        if let Ok((rest, op)) = unary_op(input) {
            let (rest, arg) = cut(|i| self.unary(i))(rest)?;
            let kind = ExprKind::Unary {
                op,
                arg: Box::new(arg),
            };
            return Ok((rest, self.node(kind, start, rest)));
        }
        self.postfix(input)
    }

    fn postfix(&self, input: &'s str) -> ParseResult<'s, Expr> {
        let start = input;
        let (mut input, mut expr) = self.primary(input)?;
        loop {
            if let Ok((rest, _)) = sym("?.")(input) {
                let (rest, kind) = if rest.trim_start().starts_with('(') {
                    let (rest, args) = self.args(rest)?;
                    (rest, ExprKind::Call { callee: Box::new(expr), args, optional: true })
                } else if rest.trim_start().starts_with('[') {
                    let (rest, key) = self.computed(rest)?;
                    (rest, ExprKind::Member { object: Box::new(expr), property: MemberProp::Computed(Box::new(key)), optional: true })
                } else {
                    let (rest, name) = cut(ident_name)(rest)?;
                    (rest, ExprKind::Member { object: Box::new(expr), property: MemberProp::Name(name.to_string()), optional: true })
                };
                expr = self.node(kind, start, rest);
                input = rest;
            } else if let Ok((rest, _)) = terminated(sym("."), not(char('.')))(input) {
                let (rest, name) = cut(ident_name)(rest)?;
                let kind = ExprKind::Member {
                    object: Box::new(expr),
                    property: MemberProp::Name(name.to_string()),
                    optional: false,
                };
                expr = self.node(kind, start, rest);
                input = rest;
            } else if input.trim_start().starts_with('[') {
                let (rest, key) = self.computed(input)?;
                let kind = ExprKind::Member {
                    object: Box::new(expr),
                    property: MemberProp::Computed(Box::new(key)),
                    optional: false,
                };
                expr = self.node(kind, start, rest);
                input = rest;
            } else if input.trim_start().starts_with('(') {
                let (rest, args) = self.args(input)?;
                let kind = ExprKind::Call {
                    callee: Box::new(expr),
                    args,
                    optional: false,
                };
                expr = self.node(kind, start, rest);
                input = rest;
            } else if let Ok((rest, _)) = terminated(sym("!"), not(char('=')))(input) {
                // Non-null assertion
                input = rest;
            } else if let Ok((rest, _)) = alt((kw("as"), kw("satisfies")))(input) {
                let (rest, _) = cut(|i| skip_type(i, TypeStop::Cast))(rest)?;
                input = rest;
            } else {
                break;
            }
        }
        Ok((input, expr))
    }

    fn computed(&self, input: &'s str) -> ParseResult<'s, Expr> {
        let (rest, _) = sym("[")(input)?;
        let (rest, key) = cut(|i| self.expr(i))(rest)?;
        let (rest, _) = cut(sym("]"))(rest)?;
        Ok((rest, key))
    }

    fn args(&self, input: &'s str) -> ParseResult<'s, Vec<ArrayElem>> {
        let (mut input, _) = sym("(")(input)?;
        let mut args = Vec::new();
        loop {
            if let Ok((rest, _)) = sym(")")(input) {
                return Ok((rest, args));
            }
            let (rest, arg) = match sym("...")(input) {
                Ok((rest, _)) => map(cut(|i| self.expr(i)), ArrayElem::Spread)(rest)?,
                Err(_) => map(|i| self.expr(i), ArrayElem::Expr)(input)?,
            };
            args.push(arg);
            input = match sym(",")(rest) {
                Ok((rest, _)) => rest,
                Err(_) => {
                    let (rest, _) = context("call arguments", cut(sym(")")))(rest)?;
                    return Ok((rest, args));
                }
            };
        }
    }

    fn primary(&self, input: &'s str) -> ParseResult<'s, Expr> {
        let (input, _) = ws(input)?;
        let start = input;
        let Some(first) = input.chars().next() else {
            return mismatch(input);
        };

        match first {
            '(' => {
                let (rest, _) = sym("(")(input)?;
                let (rest, inner) = cut(|i| self.expr(i))(rest)?;
                let (rest, _) = context("parenthesized expression", cut(sym(")")))(rest)?;
                Ok((rest, self.node(ExprKind::Paren(Box::new(inner)), start, rest)))
            }
            '{' => context("object literal", |i| self.object(i))(input),
            '[' => context("array literal", |i| self.array(i))(input),
            '\'' | '"' => {
                let (rest, s) = string_lit(input)?;
                Ok((rest, self.node(ExprKind::String(s), start, rest)))
            }
            '`' => context("template literal", |i| self.template(i))(input),
            c if c.is_ascii_digit() || c == '.' => {
                let (rest, n) = number(input)?;
                Ok((rest, self.node(ExprKind::Number(n), start, rest)))
            }
            _ => self.word(input),
        }
    }

    fn word(&self, input: &'s str) -> ParseResult<'s, Expr> {
        let start = input;
        let (rest, name) = ident_name(input)?;
        let kind = match name {
            "true" => ExprKind::Bool(true),
            "false" => ExprKind::Bool(false),
            "null" => ExprKind::Null,
            "undefined" => ExprKind::Undefined,
            "function" => {
                let (rest, func) = context("function expression", cut(|i| self.function_rest(i, start)))(rest)?;
                return Ok((rest, self.node(ExprKind::Function(func), start, rest)));
            }
            "new" => {
                let (rest, target) = cut(|i| self.postfix(i))(rest)?;
                return Ok((rest, self.node(ExprKind::New(Box::new(target)), start, rest)));
            }
            "this" => ExprKind::Ident(name.to_string()),
            _ if RESERVED.contains(&name) => return mismatch(input),
            _ => ExprKind::Ident(name.to_string()),
        };
        Ok((rest, self.node(kind, start, rest)))
    }

    fn object(&self, input: &'s str) -> ParseResult<'s, Expr> {
        let start = input;
        let (mut input, _) = sym("{")(input)?;
        let mut props = Vec::new();
        loop {
            if let Ok((rest, _)) = sym("}")(input) {
                return Ok((rest, self.node(ExprKind::Object(props), start, rest)));
            }
            let (rest, prop) = self.object_prop(input)?;
            props.push(prop);
            input = match sym(",")(rest) {
                Ok((rest, _)) => rest,
                Err(_) => match sym("}")(rest) {
                    Ok((rest, _)) => return Ok((rest, self.node(ExprKind::Object(props), start, rest))),
                    Err(_) => return failure(rest, "expected ',' or '}' in object literal"),
                },
            };
        }
    }

    fn object_prop(&self, input: &'s str) -> ParseResult<'s, ObjectProp> {
        if let Ok((rest, _)) = sym("...")(input) {
            return map(cut(|i| self.expr(i)), ObjectProp::Spread)(rest);
        }

        let (key_start, _) = ws(input)?;
        let (rest, (key, is_ident)) = if key_start.starts_with('[') {
            let (rest, key) = self.computed(key_start)?;
            (rest, (PropKey::Computed(key), false))
        } else if key_start.starts_with('\'') || key_start.starts_with('"') {
            let (rest, key) = string_lit(key_start)?;
            (rest, (PropKey::Name(key), false))
        } else if key_start.starts_with(|c: char| c.is_ascii_digit()) {
            let (rest, n) = number(key_start)?;
            (rest, (PropKey::Name(number_to_string(n)), false))
        } else {
            let (rest, name) = cut(ident_name)(key_start)?;
            (rest, (PropKey::Name(name.to_string()), true))
        };

        if let Ok((rest, _)) = sym(":")(rest) {
            let (rest, value) = cut(|i| self.expr(i))(rest)?;
            return Ok((rest, ObjectProp::KeyValue { key, value }));
        }

        if rest.trim_start().starts_with('(') {
            let (rest, params) = cut(|i| self.param_list(i))(rest)?;
            let (rest, _) = opt(preceded(sym(":"), |i| skip_type(i, TypeStop::ReturnBlock)))(rest)?;
            let (rest, body) = cut(|i| self.block(i))(rest)?;
            let name = match &key {
                PropKey::Name(name) => Some(name.clone()),
                PropKey::Computed(_) => None,
            };
            let func = Function {
                name,
                params,
                body: FunctionBody::Block(body),
                is_arrow: false,
                span: self.span(key_start, rest),
            };
            let value = self.node(ExprKind::Function(Rc::new(func)), key_start, rest);
            return Ok((rest, ObjectProp::KeyValue { key, value }));
        }

        match key {
            PropKey::Name(name) if is_ident => Ok((rest, ObjectProp::Shorthand(name))),
            _ => failure(rest, "object property value"),
        }
    }

    fn array(&self, input: &'s str) -> ParseResult<'s, Expr> {
        let start = input;
        let (mut input, _) = sym("[")(input)?;
        let mut elems = Vec::new();
        loop {
            if let Ok((rest, _)) = sym("]")(input) {
                return Ok((rest, self.node(ExprKind::Array(elems), start, rest)));
            }
            if let Ok((rest, _)) = sym(",")(input) {
                elems.push(ArrayElem::Hole);
                input = rest;
                continue;
            }
            let (rest, elem) = match sym("...")(input) {
                Ok((rest, _)) => map(cut(|i| self.expr(i)), ArrayElem::Spread)(rest)?,
                Err(_) => map(cut(|i| self.expr(i)), ArrayElem::Expr)(input)?,
            };
            elems.push(elem);
            input = match sym(",")(rest) {
                Ok((rest, _)) => rest,
                Err(_) => {
                    let (rest, _) = cut(sym("]"))(rest)?;
                    return Ok((rest, self.node(ExprKind::Array(elems), start, rest)));
                }
            };
        }
    }

    fn template(&self, input: &'s str) -> ParseResult<'s, Expr> {
        let start = input;
        let (mut input, _) = tag("`")(input)?;
        let mut quasis = Vec::new();
        let mut exprs = Vec::new();
        let mut current = String::new();

        loop {
            let mut chars = input.char_indices().peekable();
            let mut advanced = None;
            while let Some((i, c)) = chars.next() {
                match c {
                    '`' => {
                        quasis.push(std::mem::take(&mut current));
                        let rest = &input[i + 1..];
                        let kind = ExprKind::Template { quasis, exprs };
                        return Ok((rest, self.node(kind, start, rest)));
                    }
                    '\\' => match parse_escape(&mut chars) {
                        Some(Some(decoded)) => current.push(decoded),
                        Some(None) => {}
                        None => return failure(&input[i..], "template escape"),
                    },
                    '$' if chars.peek().map(|(_, c)| *c) == Some('{') => {
                        advanced = Some(&input[i + 2..]);
                        break;
                    }
                    c => current.push(c),
                }
            }
            let Some(after) = advanced else {
                return failure(start, "unterminated template literal");
            };
            quasis.push(std::mem::take(&mut current));
            let (rest, expr) = cut(|i| self.expr(i))(after)?;
            let (rest, _) = cut(sym("}"))(rest)?;
            exprs.push(expr);
            input = rest;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_expr(src: &str) -> Expr {
        parse_expression(src).unwrap_or_else(|e| panic!("failed to parse {src:?}: {e}"))
    }

    #[test]
    fn test_arrow_with_typed_param_and_object_body() {
        let expr = parse_expr("(theme: Theme) => ({ text: { color: theme.colors.text.primary, margin: 0 } })");
        let ExprKind::Function(func) = &expr.kind else {
            panic!("expected function, got {:?}", expr.kind);
        };
        assert!(func.is_arrow);
        assert_eq!(func.params[0].ident(), Some("theme"));
        let FunctionBody::Expr(body) = &func.body else {
            panic!("expected expression body");
        };
        assert!(matches!(body.unparen().kind, ExprKind::Object(_)));
    }

    #[test]
    fn test_member_chain() {
        let expr = parse_expr("theme.sizes.$alert['gap']");
        let (root, chain) = expr.member_chain().unwrap();
        assert_eq!(root, "theme");
        assert_eq!(chain, vec!["sizes", "$alert", "gap"]);
    }

    #[test]
    fn test_precedence() {
        let expr = parse_expr("a + b * 2 === c || d");
        let ExprKind::Binary { op, left, .. } = &expr.kind else {
            panic!("expected binary");
        };
        assert_eq!(*op, BinaryOp::Or);
        let ExprKind::Binary { op, left, .. } = &left.kind else {
            panic!("expected equality");
        };
        assert_eq!(*op, BinaryOp::StrictEq);
        assert!(matches!(&left.kind, ExprKind::Binary { op: BinaryOp::Add, .. }));
    }

    #[test]
    fn test_casts_are_skipped() {
        let expr = parse_expr("{ display: 'flex' as const, width: size as number, flex: 1 }");
        let ExprKind::Object(props) = &expr.kind else {
            panic!("expected object");
        };
        assert_eq!(props.len(), 3);
    }

    #[test]
    fn test_template_literal() {
        let expr = parse_expr("`${theme.spacing.md}px ${x}`");
        let ExprKind::Template { quasis, exprs } = &expr.kind else {
            panic!("expected template");
        };
        assert_eq!(quasis, &vec!["".to_string(), "px ".to_string(), "".to_string()]);
        assert_eq!(exprs.len(), 2);
    }

    #[test]
    fn test_spans_cover_source_text() {
        let src = "defineStyle('Button', (theme) => ({ root: { flex: 1 } }))";
        let expr = parse_expr(src);
        let ExprKind::Call { args, .. } = &expr.kind else {
            panic!("expected call");
        };
        let ArrayElem::Expr(callable) = &args[1] else {
            panic!("expected expression argument");
        };
        assert_eq!(callable.span.text(src), "(theme) => ({ root: { flex: 1 } })");
    }

    #[test]
    fn test_module_items() {
        let src = r#"
import { StyleSheet } from 'react-native-unistyles';
import type { Theme } from '@acme/theme';

// marker
void StyleSheet;

type Size = 'sm' | 'md'
  | 'lg';

export interface Props { size?: Size; }

const base = { flex: 1 };

function half(n: number): number {
    return n / 2;
}

export const styles = defineStyle('Card', (theme: Theme) => ({
    container: { ...base, padding: half(theme.spacing.md) },
}));
export default styles;
"#;
        let module = parse_module(src).unwrap();
        let kinds: Vec<&str> = module
            .items
            .iter()
            .map(|item| match &item.kind {
                ItemKind::Import => "import",
                ItemKind::Ignored => "ignored",
                ItemKind::Binding { .. } => "binding",
                ItemKind::Function(_) => "function",
                ItemKind::ExportDefault(_) => "default",
                ItemKind::Expr(_) => "expr",
            })
            .collect();
        assert_eq!(
            kinds,
            vec!["import", "import", "expr", "ignored", "ignored", "binding", "function", "binding", "default"]
        );
        assert!(module.items[7].exported);
    }

    #[test]
    fn test_block_body_with_if_and_destructuring() {
        let src = "({ size = 'md', intent }: Props) => { let c; if (size === 'sm') { c = 1; } else c = 2; return { c, intent }; }";
        let expr = parse_expr(src);
        let ExprKind::Function(func) = &expr.kind else {
            panic!("expected function");
        };
        assert!(matches!(func.params[0].pattern, Pattern::Object { .. }));
        let FunctionBody::Block(body) = &func.body else {
            panic!("expected block body");
        };
        assert_eq!(body.len(), 3);
    }

    #[test]
    fn test_error_position() {
        let err = parse_module("const a = 1;\nconst b = {;\n").unwrap_err();
        assert_eq!(err.line, 2);
        assert!(err.column > 1);
    }

    #[test]
    fn test_optional_chaining_and_nullish() {
        let expr = parse_expr("theme?.colors?.['text'] ?? fallback");
        assert!(matches!(expr.kind, ExprKind::Binary { op: BinaryOp::Nullish, .. }));
    }
}
