//! Script text → expression tree.
//!
//! Tokenization is a priority-ordered table of anchored regexes; `0x…` hex
//! is tried before plain integers and `-?\d+\.\d+` doubles before both.
//! The grammar is enforced by a small valid-next-token bitmask updated
//! after every token — e.g. right after a value only an operator, a comma,
//! or a closing parenthesis may follow.
//!
//! Trees are built bottom-up on an explicit stack of in-progress
//! containers: `(` pushes a function or group frame plus one frame for the
//! first argument, `,` closes the current argument frame and opens the
//! next, `)` closes both the argument and the group.  A comma at the top
//! level is plain sequencing within the root container.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, trace};

use crate::error::{ScriptError, ScriptResult};
use crate::expr::{Combiner, Container, Expr, Function};
use crate::functions::FunctionTable;
use crate::value::{Type, Value};

// ── Lexer ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
enum Token {
    /// `[A-Z][A-Z0-9_]*` — an `AND`/`OR` combinator or a function name.
    Keyword(String),
    Comma,
    ParenOpen,
    ParenClose,
    /// `$name`, stored without the sigil.
    Variable(String),
    /// Raw literal text plus the tag the token pattern implies.
    Literal(Type, String),
}

#[derive(Debug, Clone, Copy)]
enum Rule {
    Comma,
    ParenOpen,
    ParenClose,
    Variable,
    Double,
    Hex,
    Int,
    String,
    IntVector,
    Keyword,
}

static TOKEN_RULES: Lazy<Vec<(Rule, Regex)>> = Lazy::new(|| {
    [
        (Rule::Comma, r","),
        (Rule::ParenOpen, r"\("),
        (Rule::ParenClose, r"\)"),
        (Rule::Variable, r"\$[a-z][a-z0-9_]*"),
        (Rule::Double, r"-?\d+\.\d+"),
        (Rule::Hex, r"0x[0-9A-Fa-f]+"),
        (Rule::Int, r"-?\d+"),
        (Rule::String, r#""[^"]*"|'[^']*'"#),
        (Rule::IntVector, r"\[\s*(?:-?\d+(?:[\s,]+-?\d+)*\s*)?\]"),
        (Rule::Keyword, r"[A-Z][A-Z0-9_]*"),
    ]
    .into_iter()
    .map(|(rule, pattern)| {
        let regex = Regex::new(&format!("^(?:{pattern})")).expect("token pattern is valid");
        (rule, regex)
    })
    .collect()
});

struct Lexer<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        Lexer { src, pos: 0 }
    }

    /// Unconsumed input, with leading whitespace skipped.
    fn rest(&mut self) -> &'a str {
        let rest = &self.src[self.pos..];
        let trimmed = rest.trim_start();
        self.pos += rest.len() - trimmed.len();
        trimmed
    }

    /// Next token, `None` at end of input, `Err` on unlexable input.
    fn next_token(&mut self) -> Option<ScriptResult<Token>> {
        let rest = self.rest();
        if rest.is_empty() {
            return None;
        }
        let Some((rule, text)) = TOKEN_RULES
            .iter()
            .find_map(|(rule, regex)| regex.find(rest).map(|m| (*rule, m.as_str())))
        else {
            return Some(Err(ScriptError::syntax(format!(
                "unrecognized input at `{rest}`"
            ))));
        };
        self.pos += text.len();
        let token = match rule {
            Rule::Comma => Token::Comma,
            Rule::ParenOpen => Token::ParenOpen,
            Rule::ParenClose => Token::ParenClose,
            Rule::Variable => Token::Variable(text[1..].to_owned()),
            Rule::Double => Token::Literal(Type::Double, text.to_owned()),
            Rule::Hex | Rule::Int => Token::Literal(Type::Int, text.to_owned()),
            Rule::String => Token::Literal(Type::String, text.to_owned()),
            Rule::IntVector => Token::Literal(Type::IntVector, text.to_owned()),
            Rule::Keyword => Token::Keyword(text.to_owned()),
        };
        Some(Ok(token))
    }
}

// ── Grammar validity bitmask ──────────────────────────────────────────────────

const VALID_COMMA: u8 = 0x01;
const VALID_PARENS_OPEN: u8 = 0x02;
const VALID_PARENS_CLOSE: u8 = 0x04;
/// The bare expression bit; tested alone so that a state allowing only
/// `(` does not also admit atoms.
const EXPR_BIT: u8 = 0x08;
/// Where an expression may start, an opening parenthesis may too.
const VALID_EXPRESSION: u8 = EXPR_BIT | VALID_PARENS_OPEN;
const VALID_OPERATOR: u8 = 0x10;

/// State after any complete value: an operator, a separator, or the end of
/// the enclosing group may follow.
const AFTER_VALUE: u8 = VALID_OPERATOR | VALID_COMMA | VALID_PARENS_CLOSE;

// ── Parse frames ──────────────────────────────────────────────────────────────

/// An in-progress node on the parse stack.
enum Frame {
    Group(Container),
    Call(Function),
}

impl Frame {
    fn group() -> Self {
        Frame::Group(Container::new())
    }

    fn add(&mut self, child: Expr) {
        match self {
            Frame::Group(container) => container.add(child),
            Frame::Call(function) => function.add(child),
        }
    }

    fn is_empty(&self) -> bool {
        match self {
            Frame::Group(container) => container.is_empty(),
            Frame::Call(function) => function.args().is_empty(),
        }
    }

    fn into_expr(self) -> Expr {
        match self {
            Frame::Group(container) => Expr::Container(container),
            Frame::Call(function) => Expr::Function(function),
        }
    }
}

struct ParseState {
    stack: Vec<Frame>,
    pending_function: Option<String>,
    valid: u8,
}

// ── Parser ────────────────────────────────────────────────────────────────────

/// Builds expression trees, consulting a function table for the existence
/// of function names.  Argument-type checking stays lazy: an unknown
/// *signature* only surfaces at type-inference/evaluation time.
pub struct Parser {
    table: Arc<FunctionTable>,
}

impl Parser {
    pub fn new(table: Arc<FunctionTable>) -> Self {
        Parser { table }
    }

    /// Parse `code` into its root expression node.
    pub fn parse(&self, code: &str) -> ScriptResult<Expr> {
        debug!(%code, "parsing script");
        let mut lexer = Lexer::new(code);
        let mut state = ParseState {
            stack: vec![Frame::group()],
            pending_function: None,
            valid: VALID_EXPRESSION,
        };

        loop {
            let rest = lexer.rest();
            let Some(token) = lexer.next_token() else {
                break;
            };
            let token = token?;
            trace!(?token, "token");
            if let Err(e) = self.feed(&mut state, token) {
                return Err(stopped_at(rest, e));
            }
        }

        if let Some(name) = state.pending_function {
            return Err(ScriptError::syntax(format!(
                "dangling function name `{name}` at end of input"
            )));
        }
        match state.stack.pop() {
            Some(root) if state.stack.is_empty() => Ok(root.into_expr()),
            _ => Err(ScriptError::syntax(format!(
                "unbalanced parentheses in `{code}`"
            ))),
        }
    }

    fn feed(&self, state: &mut ParseState, token: Token) -> ScriptResult<()> {
        match token {
            // Ambiguous keyword: a combinator, or a function name.
            Token::Keyword(word) if word == "AND" || word == "OR" => {
                if state.valid & VALID_OPERATOR == 0 {
                    return Err(ScriptError::syntax(format!("unexpected operator: {word}")));
                }
                let combiner = if word == "AND" {
                    Combiner::And
                } else {
                    Combiner::Or
                };
                match state.stack.last_mut() {
                    Some(Frame::Group(container)) => container.set_combiner(combiner)?,
                    _ => return Err(ScriptError::syntax(format!("unexpected operator: {word}"))),
                }
                state.valid = VALID_EXPRESSION;
            }
            Token::Keyword(name) => {
                if state.valid & EXPR_BIT == 0 {
                    return Err(ScriptError::syntax(format!("unexpected expression: {name}")));
                }
                if !self.table.contains(&name) {
                    return Err(ScriptError::syntax(format!("unknown function: {name}")));
                }
                state.pending_function = Some(name);
                state.valid = VALID_PARENS_OPEN;
            }
            Token::ParenOpen => {
                if state.valid & VALID_PARENS_OPEN == 0 {
                    return Err(ScriptError::syntax("unexpected opening parenthesis"));
                }
                match state.pending_function.take() {
                    Some(name) => state.stack.push(Frame::Call(Function::new(name))),
                    None => state.stack.push(Frame::group()),
                }
                // One more frame to hold the first element/argument.
                state.stack.push(Frame::group());
                state.valid = VALID_EXPRESSION | VALID_PARENS_CLOSE;
            }
            Token::ParenClose => {
                if state.valid & VALID_PARENS_CLOSE == 0 {
                    return Err(ScriptError::syntax("unexpected closing parenthesis"));
                }
                if state.stack.len() < 2 {
                    return Err(ScriptError::syntax("unbalanced closing parenthesis"));
                }
                // Close the current element frame; an empty one is simply
                // dropped, which is what keeps `F()` a zero-argument call.
                let element = pop(state)?;
                if !element.is_empty() {
                    top(state)?.add(element.into_expr());
                }
                // The group or call itself is now complete.
                let completed = pop(state)?;
                top(state)?.add(completed.into_expr());
                state.valid = AFTER_VALUE;
            }
            Token::Comma => {
                if state.valid & VALID_COMMA == 0 {
                    return Err(ScriptError::syntax("unexpected comma"));
                }
                state.valid = VALID_EXPRESSION;
                // On the root frame a comma just sequences expressions.
                if state.stack.len() > 1 {
                    let element = pop(state)?;
                    top(state)?.add(element.into_expr());
                    state.stack.push(Frame::group());
                }
            }
            Token::Variable(name) => {
                if state.valid & EXPR_BIT == 0 {
                    return Err(ScriptError::syntax(format!("unexpected expression: ${name}")));
                }
                top(state)?.add(Expr::Variable(name));
                state.valid = AFTER_VALUE;
            }
            Token::Literal(ty, text) => {
                if state.valid & EXPR_BIT == 0 {
                    return Err(ScriptError::syntax(format!("unexpected expression: {text}")));
                }
                let value = Value::from_token(&text, ty)?;
                top(state)?.add(Expr::Literal(value));
                state.valid = AFTER_VALUE;
            }
        }
        Ok(())
    }
}

fn pop(state: &mut ParseState) -> ScriptResult<Frame> {
    state
        .stack
        .pop()
        .ok_or_else(|| ScriptError::syntax("unbalanced closing parenthesis"))
}

fn top(state: &mut ParseState) -> ScriptResult<&mut Frame> {
    state
        .stack
        .last_mut()
        .ok_or_else(|| ScriptError::syntax("unbalanced closing parenthesis"))
}

/// Wrap a grammar failure with the unparsed remainder, mirroring the
/// "where did it stop" shape callers rely on for diagnostics.
fn stopped_at(rest: &str, err: ScriptError) -> ScriptError {
    match err {
        ScriptError::Syntax(msg) => {
            ScriptError::syntax(format!("parsing stopped at `{rest}`: {msg}"))
        }
        other => other,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
