//! Lexer-driven parser back end.
//!
//! Tokenizes JavaScript well enough to tell strings, comments, template
//! literals and regular expressions apart, then recognizes the handful of
//! statement shapes [`ModuleNode`] models. It never fails: unterminated
//! constructs end at end of input.

use super::ast::{Callee, Module, ModuleNode, Span, StringLiteral};
use super::{ParseError, ParserBackend};

/// The shipped [`ParserBackend`].
#[derive(Debug, Clone, Copy, Default)]
pub struct LexerBackend;

impl ParserBackend for LexerBackend {
    fn name(&self) -> &'static str {
        "lexer"
    }

    fn parse(&self, source: &str) -> Result<Module, ParseError> {
        let tokens = Lexer::new(source).tokenize();
        Ok(Parser::new(tokens).parse())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Ident(String),
    Str(StringLiteral),
    /// `.` or `?.`
    Dot,
    Spread,
    Punct(u8),
    /// Numbers, regular expressions, template chunks.
    Opaque,
}

// Keywords after which a `/` starts a regular expression.
const REGEX_PRECEDING_KEYWORDS: &[&str] = &[
    "return", "typeof", "instanceof", "in", "of", "new", "delete", "void", "throw", "case", "do",
    "else", "yield", "await",
];

// Identifiers that look like callees but never are.
const NON_CALLEE_KEYWORDS: &[&str] = &[
    "if", "for", "while", "switch", "catch", "with", "return", "typeof", "case", "function",
];

struct Lexer<'s> {
    src: &'s str,
    bytes: &'s [u8],
    pos: usize,
    tokens: Vec<Token>,
    /// One entry per open `{`; `true` when it opened a template substitution.
    braces: Vec<bool>,
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b == b'$' || b >= 0x80
}

fn is_ident_continue(b: u8) -> bool {
    is_ident_start(b) || b.is_ascii_digit()
}

impl<'s> Lexer<'s> {
    fn new(src: &'s str) -> Self {
        Self {
            src,
            bytes: src.as_bytes(),
            pos: 0,
            tokens: Vec::new(),
            braces: Vec::new(),
        }
    }

    fn peek(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn tokenize(mut self) -> Vec<Token> {
        if self.src.starts_with("#!") {
            self.skip_line();
        }

        while let Some(b) = self.peek(0) {
            match b {
                b if b.is_ascii_whitespace() => self.pos += 1,
                b'/' if self.peek(1) == Some(b'/') => self.skip_line(),
                b'/' if self.peek(1) == Some(b'*') => self.skip_block_comment(),
                b'\'' | b'"' => self.string(b),
                b'`' => {
                    self.pos += 1;
                    self.template();
                }
                b'{' => {
                    self.braces.push(false);
                    self.push_punct(b);
                }
                b'}' => {
                    if self.braces.pop() == Some(true) {
                        self.pos += 1;
                        self.template();
                    } else {
                        self.push_punct(b);
                    }
                }
                b'.' if self.peek(1) == Some(b'.') && self.peek(2) == Some(b'.') => {
                    self.pos += 3;
                    self.tokens.push(Token::Spread);
                }
                b'.' if self.peek(1).is_some_and(|n| n.is_ascii_digit()) => self.number(),
                b'.' => {
                    self.pos += 1;
                    self.tokens.push(Token::Dot);
                }
                b'?' if self.peek(1) == Some(b'.')
                    && !self.peek(2).is_some_and(|n| n.is_ascii_digit()) =>
                {
                    self.pos += 2;
                    self.tokens.push(Token::Dot);
                }
                b'/' if self.regex_allowed() => self.regex(),
                b if b.is_ascii_digit() => self.number(),
                b if is_ident_start(b) => self.ident(),
                _ => self.push_punct(b),
            }
        }

        self.tokens
    }

    fn push_punct(&mut self, b: u8) {
        self.pos += 1;
        self.tokens.push(Token::Punct(b));
    }

    fn skip_line(&mut self) {
        while let Some(b) = self.peek(0) {
            if b == b'\n' {
                break;
            }
            self.pos += 1;
        }
    }

    fn skip_block_comment(&mut self) {
        self.pos += 2;
        while self.pos < self.bytes.len() {
            if self.bytes[self.pos] == b'*' && self.peek(1) == Some(b'/') {
                self.pos += 2;
                return;
            }
            self.pos += 1;
        }
    }

    fn string(&mut self, quote: u8) {
        self.pos += 1;
        let start = self.pos;
        while let Some(b) = self.peek(0) {
            match b {
                b'\\' => self.pos += 2,
                b'\n' => break,
                b if b == quote => break,
                _ => self.pos += 1,
            }
        }
        let end = self.pos.min(self.bytes.len());
        self.tokens.push(Token::Str(StringLiteral {
            value: self.src[start..end].to_string(),
            quote: char::from(quote),
            span: Span::new(start, end),
        }));
        if self.peek(0) == Some(quote) {
            self.pos += 1;
        }
    }

    /// Scan template text up to the closing backtick or a `${`.
    fn template(&mut self) {
        while let Some(b) = self.peek(0) {
            match b {
                b'\\' => self.pos += 2,
                b'`' => {
                    self.pos += 1;
                    break;
                }
                b'$' if self.peek(1) == Some(b'{') => {
                    self.pos += 2;
                    self.braces.push(true);
                    break;
                }
                _ => self.pos += 1,
            }
        }
        self.tokens.push(Token::Opaque);
    }

    fn number(&mut self) {
        while let Some(b) = self.peek(0) {
            if b.is_ascii_alphanumeric() || b == b'.' || b == b'_' {
                self.pos += 1;
            } else {
                break;
            }
        }
        self.tokens.push(Token::Opaque);
    }

    fn ident(&mut self) {
        let start = self.pos;
        while self.peek(0).is_some_and(is_ident_continue) {
            self.pos += 1;
        }
        self.tokens
            .push(Token::Ident(self.src[start..self.pos].to_string()));
    }

    fn regex_allowed(&self) -> bool {
        match self.tokens.last() {
            None => true,
            Some(Token::Punct(p)) => b"(,=:[!&|?{};+-*%<>~^".contains(p),
            Some(Token::Ident(word)) => REGEX_PRECEDING_KEYWORDS.contains(&word.as_str()),
            Some(Token::Spread) => true,
            Some(_) => false,
        }
    }

    fn regex(&mut self) {
        let start = self.pos;
        self.pos += 1;
        let mut in_class = false;
        while let Some(b) = self.peek(0) {
            match b {
                b'\\' => self.pos += 2,
                b'\n' => {
                    // Not a regex after all
                    self.pos = start;
                    self.push_punct(b'/');
                    return;
                }
                b'[' => {
                    in_class = true;
                    self.pos += 1;
                }
                b']' => {
                    in_class = false;
                    self.pos += 1;
                }
                b'/' if !in_class => {
                    self.pos += 1;
                    break;
                }
                _ => self.pos += 1,
            }
        }
        while self.peek(0).is_some_and(|b| b.is_ascii_alphabetic()) {
            self.pos += 1;
        }
        self.tokens.push(Token::Opaque);
    }
}

struct Parser {
    tokens: Vec<Token>,
    /// Strings already attached to a structured node.
    claimed: Vec<bool>,
    nodes: Vec<(usize, ModuleNode)>,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        let claimed = vec![false; tokens.len()];
        Self {
            tokens,
            claimed,
            nodes: Vec::new(),
        }
    }

    fn ident_at(&self, i: usize) -> Option<&str> {
        match self.tokens.get(i) {
            Some(Token::Ident(name)) => Some(name),
            _ => None,
        }
    }

    fn is_punct(&self, i: usize, p: u8) -> bool {
        self.tokens.get(i) == Some(&Token::Punct(p))
    }

    fn is_dot_before(&self, i: usize) -> bool {
        i > 0 && self.tokens[i - 1] == Token::Dot
    }

    /// Claim the string at `i` if it is one.
    fn take_str(&mut self, i: usize) -> Option<StringLiteral> {
        match self.tokens.get(i) {
            Some(Token::Str(lit)) => {
                self.claimed[i] = true;
                Some(lit.clone())
            }
            _ => None,
        }
    }

    fn parse(mut self) -> Module {
        for i in 0..self.tokens.len() {
            match self.ident_at(i) {
                Some("import") if !self.is_dot_before(i) => self.import_at(i),
                Some("export") if !self.is_dot_before(i) => self.export_at(i),
                _ => {}
            }
            if self.is_punct(i, b'(') {
                self.call_at(i);
            }
        }

        for (i, token) in self.tokens.iter().enumerate() {
            if let Token::Str(lit) = token {
                if !self.claimed[i] {
                    self.nodes.push((i, ModuleNode::Literal(lit.clone())));
                }
            }
        }

        self.nodes.sort_by_key(|(i, _)| *i);
        Module {
            nodes: self.nodes.into_iter().map(|(_, node)| node).collect(),
        }
    }

    fn import_at(&mut self, i: usize) {
        match self.tokens.get(i + 1) {
            // import(...) is a call; import.meta is not an import
            Some(Token::Punct(b'(') | Token::Dot) | None => return,
            Some(Token::Str(_)) => {
                if let Some(source) = self.take_str(i + 1) {
                    self.nodes.push((i, ModuleNode::Import { source }));
                }
                return;
            }
            _ => {}
        }

        let mut j = i + 1;
        while j < self.tokens.len() {
            match &self.tokens[j] {
                Token::Punct(b';' | b'=') => return,
                Token::Ident(word) if word == "import" || word == "export" => return,
                Token::Ident(word) if word == "from" => {
                    if let Some(source) = self.take_str(j + 1) {
                        self.nodes.push((i, ModuleNode::Import { source }));
                        return;
                    }
                }
                _ => {}
            }
            j += 1;
        }
    }

    fn export_at(&mut self, i: usize) {
        let mut j = i + 1;
        if self.ident_at(j) == Some("default") {
            self.nodes.push((
                i,
                ModuleNode::Export {
                    source: None,
                    is_default: true,
                },
            ));
            return;
        }
        if self.ident_at(j) == Some("type") && (self.is_punct(j + 1, b'{') || self.is_punct(j + 1, b'*')) {
            j += 1;
        }

        let from_at = if self.is_punct(j, b'*') {
            // export * from / export * as ns from
            if self.ident_at(j + 1) == Some("as") {
                Some(j + 3)
            } else {
                Some(j + 1)
            }
        } else if self.is_punct(j, b'{') {
            self.matching_brace(j).map(|close| close + 1)
        } else {
            None
        };

        let source = from_at
            .filter(|&k| self.ident_at(k) == Some("from"))
            .and_then(|k| self.take_str(k + 1));
        self.nodes.push((
            i,
            ModuleNode::Export {
                source,
                is_default: false,
            },
        ));
    }

    fn matching_brace(&self, open: usize) -> Option<usize> {
        let mut depth = 0usize;
        for (k, token) in self.tokens.iter().enumerate().skip(open) {
            match token {
                Token::Punct(b'{') => depth += 1,
                Token::Punct(b'}') => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(k);
                    }
                }
                _ => {}
            }
        }
        None
    }

    /// `i` is the index of an opening parenthesis.
    fn call_at(&mut self, i: usize) {
        if i == 0 {
            return;
        }
        let Some(callee) = self.callee_before(i) else {
            return;
        };
        let closes = self.is_punct(i + 2, b')') || self.is_punct(i + 2, b',');
        if !closes {
            return;
        }
        if let Some(argument) = self.take_str(i + 1) {
            self.nodes.push((i, ModuleNode::Call { callee, argument }));
        }
    }

    fn callee_before(&self, paren: usize) -> Option<Callee> {
        let name = self.ident_at(paren - 1)?;
        if name == "import" {
            return (!self.is_dot_before(paren - 1)).then_some(Callee::Import);
        }
        if NON_CALLEE_KEYWORDS.contains(&name) {
            return None;
        }

        let mut parts = vec![name.to_string()];
        let mut k = paren - 1;
        let mut computed = false;
        while self.is_dot_before(k) {
            match k.checked_sub(2).and_then(|prev| self.ident_at(prev)) {
                Some(object) => {
                    parts.push(object.to_string());
                    k -= 2;
                }
                None => {
                    computed = true;
                    break;
                }
            }
        }
        parts.reverse();
        if computed {
            parts.insert(0, "<expr>".to_string());
        }

        let property = parts.pop()?;
        if parts.is_empty() {
            Some(Callee::Identifier(property))
        } else {
            Some(Callee::Member {
                object: parts.join("."),
                property,
            })
        }
    }
}
