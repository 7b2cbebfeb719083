// ABOUTME: Parser module for parsing Lisp expressions using nom combinators

use crate::ast::Expr;
use crate::number::MAX_SAFE_INTEGER;
use nom::{
    branch::alt,
    bytes::complete::{tag, take_while, take_while1},
    character::complete::{char, digit1, multispace1, none_of, one_of},
    combinator::{opt, recognize, value},
    multi::many0,
    IResult, Parser,
};
use num_bigint::BigInt;
use num_traits::{FromPrimitive, ToPrimitive};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
#[error("parse error: {0}")]
pub struct ParseError(pub String);

/// Parse a single expression; trailing whitespace and comments allowed.
pub fn parse(input: &str) -> Result<Expr, ParseError> {
    let mut forms = parse_program(input)?;
    match forms.len() {
        0 => Err(ParseError("empty input".to_string())),
        1 => Ok(forms.remove(0)),
        n => Err(ParseError(format!("expected a single expression, found {}", n))),
    }
}

/// Parse a whole source text into its sequence of top-level forms.
pub fn parse_program(input: &str) -> Result<Vec<Expr>, ParseError> {
    let mut forms = Vec::new();
    let mut rest = input;
    loop {
        let (after_ws, _) = ws_and_comments(rest).map_err(|_| syntax_error(rest))?;
        if after_ws.is_empty() {
            break;
        }
        let (next, expr) = parse_expr(after_ws).map_err(|_| syntax_error(after_ws))?;
        forms.push(expr);
        rest = next;
    }
    Ok(forms)
}

fn syntax_error(rest: &str) -> ParseError {
    let snippet: String = rest.chars().take(24).collect();
    ParseError(format!("invalid syntax near '{}'", snippet.trim_end()))
}

// ============================================================================
// Lexical layer
// ============================================================================

/// Parse a line comment (; to end of line)
fn parse_comment(input: &str) -> IResult<&str, ()> {
    let (input, _) = char(';')(input)?;
    let (input, _) = take_while(|c| c != '\n')(input)?;
    Ok((input, ()))
}

/// Skip whitespace and comments
fn ws_and_comments(input: &str) -> IResult<&str, ()> {
    many0(alt((value((), multispace1), parse_comment)))
        .map(|_| ())
        .parse(input)
}

fn symbol_continue(c: char) -> bool {
    c.is_alphanumeric() || "+-*/%<>=!?_&.".contains(c)
}

// ============================================================================
// Expression parsers
// ============================================================================

/// Parse a number (integer or floating point)
/// Handles: 42, -42, 3.14, -3.14, .5, -.5
///
/// Integer tokens past the 2^53 safe range become BigNumber literals.
fn parse_number(input: &str) -> IResult<&str, Expr> {
    recognize((
        opt(char('-')),
        alt((
            recognize((digit1, opt((char('.'), opt(digit1))))),
            recognize((char('.'), digit1)),
        )),
    ))
    .map(|num_str: &str| {
        if num_str.contains('.') {
            let num: f64 = num_str.parse().expect("Failed to parse number");
            Expr::Number(num)
        } else {
            let big: BigInt = num_str.parse().expect("Failed to parse integer");
            match big.to_f64() {
                // Exactness check: a token the f64 would round loses
                // nothing by staying a BigNumber
                Some(f)
                    if f.abs() <= MAX_SAFE_INTEGER
                        && BigInt::from_f64(f).as_ref() == Some(&big) =>
                {
                    Expr::Number(f)
                }
                _ => Expr::BigNumber(big),
            }
        }
    })
    .parse(input)
}

/// Parse a boolean (#t or #f)
fn parse_bool(input: &str) -> IResult<&str, Expr> {
    alt((
        value(Expr::Bool(true), tag("#t")),
        value(Expr::Bool(false), tag("#f")),
    ))
    .parse(input)
}

/// Parse a keyword (:name)
fn parse_keyword(input: &str) -> IResult<&str, Expr> {
    let (input, _) = char(':')(input)?;
    let (input, name) = take_while1(symbol_continue)(input)?;
    Ok((input, Expr::Keyword(name.to_string())))
}

/// Parse a symbol. `nil` reads as the nil literal. Symbols may contain a
/// dot for qualified module access (`utils.double`).
fn parse_symbol(input: &str) -> IResult<&str, Expr> {
    let (input, first) = one_of(
        "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ+-*/%<>=!?_&",
    )(input)?;
    let (input, rest) =
        take_while::<_, _, nom::error::Error<_>>(symbol_continue)(input).unwrap_or((input, ""));

    let mut symbol = String::new();
    symbol.push(first);
    symbol.push_str(rest);

    if symbol == "nil" {
        return Ok((input, Expr::Nil));
    }
    Ok((input, Expr::Symbol(symbol)))
}

/// Parse a string with escape sequences: \", \\, \n, \t
fn parse_string(input: &str) -> IResult<&str, Expr> {
    let (input, _) = char('"')(input)?;

    let mut result = String::new();
    let mut rest = input;
    loop {
        let (next, chunk) =
            take_while::<_, _, nom::error::Error<_>>(|c| c != '"' && c != '\\')(rest)
                .unwrap_or((rest, ""));
        result.push_str(chunk);
        rest = next;

        if let Ok((next, _)) = char::<_, nom::error::Error<_>>('\\')(rest) {
            let (next, escaped) = none_of("")(next)?;
            match escaped {
                'n' => result.push('\n'),
                't' => result.push('\t'),
                '\\' => result.push('\\'),
                '"' => result.push('"'),
                other => {
                    result.push('\\');
                    result.push(other);
                }
            }
            rest = next;
            continue;
        }

        let (next, _) = char('"')(rest)?;
        return Ok((next, Expr::String(result)));
    }
}

/// Parse a quoted expression: 'expr -> (quote expr)
fn parse_quote(input: &str) -> IResult<&str, Expr> {
    let (input, _) = char('\'')(input)?;
    let (input, expr) = parse_expr(input)?;
    Ok((
        input,
        Expr::List(vec![Expr::Symbol("quote".to_string()), expr]),
    ))
}

fn parse_seq(input: &str, open: char, close: char) -> IResult<&str, Vec<Expr>> {
    let (input, _) = char(open)(input)?;
    let mut items = Vec::new();
    let mut rest = input;
    loop {
        let (next, _) = ws_and_comments(rest)?;
        if let Ok((next, _)) = char::<_, nom::error::Error<_>>(close)(next) {
            return Ok((next, items));
        }
        let (next, expr) = parse_expr(next)?;
        items.push(expr);
        rest = next;
    }
}

fn parse_list(input: &str) -> IResult<&str, Expr> {
    parse_seq(input, '(', ')').map(|(rest, items)| (rest, Expr::List(items)))
}

fn parse_bracket(input: &str) -> IResult<&str, Expr> {
    parse_seq(input, '[', ']').map(|(rest, items)| (rest, Expr::Bracket(items)))
}

fn parse_expr(input: &str) -> IResult<&str, Expr> {
    let (input, _) = ws_and_comments(input)?;
    alt((
        parse_bool,
        parse_string,
        parse_keyword,
        parse_quote,
        parse_list,
        parse_bracket,
        parse_number,
        parse_symbol,
    ))
    .parse(input)
}
