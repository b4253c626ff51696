//! Nom-based formula parser.
//!
//! Parses formula text directly into the AST. Operator levels from the
//! loosest to the tightest binding: comparison, `&`, `+ -`, `* /`, `^`,
//! prefix `- + @`, postfix `%`, intersection (space), range `:`, spill `#`.
//! The union operator `,` is only recognised inside parentheses because a
//! comma separates function arguments everywhere else.

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while, take_while1, take_while_m_n},
    character::complete::{char, multispace0, one_of, space1},
    combinator::{map, opt, recognize, value},
    error::ErrorKind,
    multi::{fold_many0, many0, separated_list0, separated_list1},
    sequence::{delimited, pair, preceded, tuple},
    IResult,
};

use crate::ast::{AreaRef, BinaryOp, CellRef, Expr, Prefix, UnaryOp};
use crate::error::{CalcError, CalcResult, ParseError};
use sheetcalc_core::{col_from_label, Array, Scalar, XlError, MAX_COLS, MAX_ROWS};

// =============================================================================
// Helper Combinators
// =============================================================================

/// Skip whitespace
fn ws<'a, F, O>(inner: F) -> impl FnMut(&'a str) -> IResult<&'a str, O>
where
    F: FnMut(&'a str) -> IResult<&'a str, O>,
{
    delimited(multispace0, inner, multispace0)
}

fn fail<O>(input: &str, kind: ErrorKind) -> IResult<&str, O> {
    Err(nom::Err::Error(nom::error::Error::new(input, kind)))
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '.' || c == '\\'
}

fn is_name_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '\\'
}

/// Parse an unsigned decimal number (integer, float, scientific)
fn parse_unsigned_number(input: &str) -> IResult<&str, f64> {
    let (input, num_str) = recognize(tuple((
        alt((
            recognize(pair(
                take_while1(|c: char| c.is_ascii_digit()),
                opt(pair(char('.'), take_while(|c: char| c.is_ascii_digit()))),
            )),
            recognize(pair(char('.'), take_while1(|c: char| c.is_ascii_digit()))),
        )),
        opt(tuple((
            one_of("eE"),
            opt(one_of("+-")),
            take_while1(|c: char| c.is_ascii_digit()),
        ))),
    )))(input)?;

    let num: f64 = num_str.parse().unwrap_or(f64::NAN);
    Ok((input, num))
}

/// Parse a string literal (double-quoted, `""` is an escaped quote)
fn parse_string_literal(input: &str) -> IResult<&str, String> {
    let (input, _) = char('"')(input)?;
    let mut result = String::new();
    let mut chars = input.chars().peekable();
    let mut consumed = 0;

    loop {
        match chars.next() {
            Some('"') => {
                // Check for escaped quote
                if chars.peek() == Some(&'"') {
                    result.push('"');
                    chars.next();
                    consumed += 2;
                } else {
                    consumed += 1;
                    break;
                }
            }
            Some(c) => {
                result.push(c);
                consumed += c.len_utf8();
            }
            None => return fail(input, ErrorKind::Char),
        }
    }

    Ok((&input[consumed..], result))
}

/// Parse TRUE/FALSE, but not a name or function that starts with them
fn parse_boolean_literal(input: &str) -> IResult<&str, bool> {
    let (rest, word) = take_while1(is_name_char)(input)?;
    if rest.starts_with(['(', '[', '!', '|']) {
        return fail(input, ErrorKind::Tag);
    }
    if word.eq_ignore_ascii_case("TRUE") {
        Ok((rest, true))
    } else if word.eq_ignore_ascii_case("FALSE") {
        Ok((rest, false))
    } else {
        fail(input, ErrorKind::Tag)
    }
}

/// Parse an error literal such as `#DIV/0!`
fn parse_error_value(input: &str) -> IResult<&str, XlError> {
    for error in XlError::ALL {
        let literal = error.literal();
        match input.get(..literal.len()) {
            Some(head) if head.eq_ignore_ascii_case(literal) => {
                return Ok((&input[literal.len()..], error));
            }
            _ => {}
        }
    }
    fail(input, ErrorKind::Tag)
}

/// Parse a cell address (e.g., A1, $B$2, AA10). The address must not be
/// followed by characters that would make it a name or a function call.
fn parse_cell(input: &str) -> IResult<&str, CellRef> {
    let start = input;
    let (input, abs_col) = opt(char('$'))(input)?;
    let (input, col_letters) = take_while_m_n(1, 3, |c: char| c.is_ascii_alphabetic())(input)?;
    let (input, abs_row) = opt(char('$'))(input)?;
    let (input, row_digits) = take_while_m_n(1, 7, |c: char| c.is_ascii_digit())(input)?;

    if input.starts_with(|c: char| is_name_char(c) || c == '(' || c == '[') {
        return fail(start, ErrorKind::Verify);
    }

    let col = match col_from_label(col_letters) {
        Some(col) if col < MAX_COLS => col,
        _ => return fail(start, ErrorKind::Verify),
    };
    let row = match row_digits.parse::<u32>() {
        Ok(row) if (1..=MAX_ROWS).contains(&row) => row - 1,
        _ => return fail(start, ErrorKind::Verify),
    };

    Ok((
        input,
        CellRef {
            row,
            col,
            abs_row: abs_row.is_some(),
            abs_col: abs_col.is_some(),
        },
    ))
}

/// Parse `A1` or `A1:B2` as one area
fn parse_area(input: &str) -> IResult<&str, AreaRef> {
    let (input, start) = parse_cell(input)?;
    let (input, end) = opt(preceded(char(':'), parse_cell))(input)?;
    Ok((
        input,
        AreaRef {
            start,
            end: end.unwrap_or(start),
        },
    ))
}

/// Parse an identifier (function or defined name)
fn parse_identifier(input: &str) -> IResult<&str, &str> {
    if !input.starts_with(is_name_start) {
        return fail(input, ErrorKind::Alpha);
    }
    take_while1(is_name_char)(input)
}

/// Text that reads as a cell address, such as `A1` or `xfd10`
pub(crate) fn is_cell_address(text: &str) -> bool {
    matches!(parse_cell(text), Ok(("", _)))
}

/// Unquoted sheet name, which cannot look like a cell address
fn parse_unquoted_sheet_name(input: &str) -> IResult<&str, String> {
    let (rest, name) = take_while1(is_name_char)(input)?;
    if is_cell_address(name) {
        return fail(input, ErrorKind::Verify);
    }
    Ok((rest, name.to_string()))
}

/// Parse a sheet name (quoted or unquoted)
/// Examples: Sheet1, 'Sheet Name', 'Sheet''s Data'
fn parse_sheet_name(input: &str) -> IResult<&str, String> {
    alt((
        // Quoted sheet name: 'Sheet Name' or 'Sheet''s Data'
        map(
            delimited(
                char('\''),
                recognize(many0(alt((take_while1(|c: char| c != '\''), tag("''"))))),
                char('\''),
            ),
            |s: &str| s.replace("''", "'"),
        ),
        parse_unquoted_sheet_name,
    ))(input)
}

/// Parse `[1]Sheet1!` or `[Book.xlsx]!`
fn parse_external_prefix(input: &str) -> IResult<&str, Prefix> {
    let (input, book) = delimited(char('['), take_while1(|c: char| c != ']'), char(']'))(input)?;
    let (input, sheet) = opt(parse_sheet_name)(input)?;
    let (input, _) = char('!')(input)?;
    Ok((
        input,
        Prefix::External {
            book: book.to_string(),
            sheet,
        },
    ))
}

/// Parse `Sheet1!`, `'My Sheet'!`, `Sheet1:Sheet3!` or `'Sheet 1:Sheet 3'!`
fn parse_sheet_prefix(input: &str) -> IResult<&str, Prefix> {
    let (input, first) = parse_sheet_name(input)?;
    let (input, last) = opt(preceded(char(':'), parse_sheet_name))(input)?;
    let (input, _) = char('!')(input)?;

    let prefix = match last {
        Some(last) => Prefix::SheetSpan { first, last },
        None => match first.split_once(':') {
            Some((first, last)) => Prefix::SheetSpan {
                first: first.to_string(),
                last: last.to_string(),
            },
            None => Prefix::Sheet(first),
        },
    };
    Ok((input, prefix))
}

/// Text between balanced square brackets
fn parse_bracketed(input: &str) -> IResult<&str, &str> {
    let (rest, _) = char('[')(input)?;
    let mut depth = 1;
    for (i, c) in rest.char_indices() {
        match c {
            '[' => depth += 1,
            ']' => {
                depth -= 1;
                if depth == 0 {
                    return Ok((&rest[i + 1..], &rest[..i]));
                }
            }
            _ => {}
        }
    }
    fail(input, ErrorKind::Char)
}

// =============================================================================
// Operator Parsers
// =============================================================================

fn parse_comparison_op(input: &str) -> IResult<&str, BinaryOp> {
    alt((
        value(BinaryOp::Le, tag("<=")),
        value(BinaryOp::Ge, tag(">=")),
        value(BinaryOp::Ne, tag("<>")),
        value(BinaryOp::Lt, tag("<")),
        value(BinaryOp::Gt, tag(">")),
        value(BinaryOp::Eq, tag("=")),
    ))(input)
}

fn parse_additive_op(input: &str) -> IResult<&str, BinaryOp> {
    alt((value(BinaryOp::Add, char('+')), value(BinaryOp::Sub, char('-'))))(input)
}

fn parse_multiplicative_op(input: &str) -> IResult<&str, BinaryOp> {
    alt((value(BinaryOp::Mul, char('*')), value(BinaryOp::Div, char('/'))))(input)
}

fn parse_concat_op(input: &str) -> IResult<&str, BinaryOp> {
    value(BinaryOp::Concat, char('&'))(input)
}

// =============================================================================
// Expression Parsers (Precedence Climbing)
// =============================================================================

fn parse_array_element(input: &str) -> IResult<&str, Scalar> {
    let (input, _) = multispace0(input)?;
    let (input, scalar) = alt((
        map(pair(opt(one_of("+-")), parse_unsigned_number), |(sign, n)| {
            Scalar::Number(if sign == Some('-') { -n } else { n })
        }),
        map(parse_string_literal, Scalar::Text),
        map(parse_boolean_literal, Scalar::Logical),
        map(parse_error_value, Scalar::Error),
    ))(input)?;
    let (input, _) = multispace0(input)?;
    Ok((input, scalar))
}

/// Parse an array constant such as `{1,2;3,4}`
fn parse_array(input: &str) -> IResult<&str, Expr> {
    let (rest, rows) = delimited(
        char('{'),
        separated_list1(char(';'), separated_list1(char(','), parse_array_element)),
        char('}'),
    )(input)?;

    match Array::from_rows(rows) {
        Ok(array) => Ok((rest, Expr::Array(array))),
        // Unequal rows are a hard failure, not a reason to try other branches
        Err(_) => Err(nom::Err::Failure(nom::error::Error::new(input, ErrorKind::Verify))),
    }
}

/// Parse `( expr )` or a parenthesised union `(A1, B2:C3)`
fn parse_parenthesized(input: &str) -> IResult<&str, Expr> {
    let (input, items) = delimited(
        char('('),
        separated_list1(ws(char(',')), parse_expression),
        preceded(multispace0, char(')')),
    )(input)?;

    let mut items = items.into_iter();
    let first = match items.next() {
        Some(first) => first,
        None => return fail(input, ErrorKind::SeparatedList),
    };
    let inner = items.fold(first, |acc, item| Expr::binary(acc, BinaryOp::Union, item));
    Ok((input, Expr::Grouped(Box::new(inner))))
}

/// Parse a function call argument list after the name
fn parse_arguments(input: &str) -> IResult<&str, Vec<Expr>> {
    let (input, _) = char('(')(input)?;
    let (input, _) = multispace0(input)?;
    let (input, args) = separated_list0(ws(alt((char(','), char(';')))), parse_expression)(input)?;
    let (input, _) = multispace0(input)?;
    let (input, _) = char(')')(input)?;
    Ok((input, args))
}

/// Parse a reference, defined name, function call, structured reference or DDE link
fn parse_reference_or_name(input: &str) -> IResult<&str, Expr> {
    let (input, prefix) = opt(alt((parse_external_prefix, parse_sheet_prefix)))(input)?;

    if let Ok((remaining, area)) = parse_area(input) {
        return Ok((remaining, Expr::Reference { prefix, area }));
    }

    let (remaining, name) = parse_identifier(input)?;

    if prefix.is_none() {
        if remaining.starts_with('(') {
            let (remaining, args) = parse_arguments(remaining)?;
            return Ok((remaining, Expr::function(name.to_uppercase(), args)));
        }

        if remaining.starts_with('[') {
            let (remaining, specifier) = parse_bracketed(remaining)?;
            return Ok((
                remaining,
                Expr::StructuredReference {
                    table: name.to_string(),
                    specifier: specifier.to_string(),
                },
            ));
        }

        if let Some(after_bar) = remaining.strip_prefix('|') {
            let (after_topic, topic) = parse_sheet_name(after_bar)?;
            let (after_item, item) = preceded(char('!'), parse_sheet_name)(after_topic)?;
            return Ok((
                after_item,
                Expr::Dde {
                    application: name.to_string(),
                    topic,
                    item,
                },
            ));
        }
    }

    Ok((
        remaining,
        Expr::Name {
            prefix,
            name: name.to_string(),
        },
    ))
}

/// Parse a primary expression (literals, references, function calls, parentheses)
fn parse_primary(input: &str) -> IResult<&str, Expr> {
    let (input, _) = multispace0(input)?;

    alt((
        parse_parenthesized,
        parse_array,
        map(parse_error_value, Expr::Error),
        // Boolean (before identifier to avoid conflict)
        map(parse_boolean_literal, Expr::Boolean),
        map(parse_string_literal, Expr::String),
        map(parse_unsigned_number, Expr::Number),
        parse_reference_or_name,
    ))(input)
}

/// Parse a primary followed by the spill operator (`A1#`)
fn parse_spill(input: &str) -> IResult<&str, Expr> {
    let (input, expr) = parse_primary(input)?;
    let (input, spill) = opt(char('#'))(input)?;
    match spill {
        Some(_) => Ok((input, Expr::unary(UnaryOp::Spill, expr))),
        None => Ok((input, expr)),
    }
}

/// Parse range expressions (`:`)
fn parse_range(input: &str) -> IResult<&str, Expr> {
    let (input, init) = parse_spill(input)?;

    fold_many0(
        preceded(ws(char(':')), parse_spill),
        move || init.clone(),
        |acc, val| Expr::binary(acc, BinaryOp::Range, val),
    )(input)
}

/// Parse intersection expressions (one or more spaces between references)
fn parse_intersection(input: &str) -> IResult<&str, Expr> {
    let (input, init) = parse_range(input)?;

    fold_many0(
        preceded(space1, parse_range),
        move || init.clone(),
        |acc, val| Expr::binary(acc, BinaryOp::Intersection, val),
    )(input)
}

/// Parse a postfix expression (percent)
fn parse_postfix(input: &str) -> IResult<&str, Expr> {
    let (input, expr) = parse_intersection(input)?;
    let (input, _) = multispace0(input)?;

    let (input, percents) = many0(ws(char('%')))(input)?;

    let result = percents
        .into_iter()
        .fold(expr, |acc, _| Expr::unary(UnaryOp::Percent, acc));

    Ok((input, result))
}

/// Parse a unary expression (prefix -, + or @)
fn parse_unary(input: &str) -> IResult<&str, Expr> {
    let (input, _) = multispace0(input)?;

    alt((
        map(preceded(char('-'), parse_unary), |e| Expr::unary(UnaryOp::Neg, e)),
        map(preceded(char('+'), parse_unary), |e| Expr::unary(UnaryOp::Pos, e)),
        map(preceded(char('@'), parse_unary), |e| {
            Expr::unary(UnaryOp::ImplicitIntersection, e)
        }),
        parse_postfix,
    ))(input)
}

/// Parse power expressions, left-associative like other binary operators (2^3^2 = 64)
fn parse_power(input: &str) -> IResult<&str, Expr> {
    let (input, init) = parse_unary(input)?;

    fold_many0(
        preceded(ws(char('^')), parse_unary),
        move || init.clone(),
        |acc, val| Expr::binary(acc, BinaryOp::Pow, val),
    )(input)
}

/// Parse multiplicative expressions (*, /)
fn parse_multiplicative(input: &str) -> IResult<&str, Expr> {
    let (input, init) = parse_power(input)?;

    fold_many0(
        pair(ws(parse_multiplicative_op), parse_power),
        move || init.clone(),
        |acc, (op, val)| Expr::binary(acc, op, val),
    )(input)
}

/// Parse additive expressions (+, -)
fn parse_additive(input: &str) -> IResult<&str, Expr> {
    let (input, init) = parse_multiplicative(input)?;

    fold_many0(
        pair(ws(parse_additive_op), parse_multiplicative),
        move || init.clone(),
        |acc, (op, val)| Expr::binary(acc, op, val),
    )(input)
}

/// Parse concatenation expressions (&)
fn parse_concat(input: &str) -> IResult<&str, Expr> {
    let (input, init) = parse_additive(input)?;

    fold_many0(
        pair(ws(parse_concat_op), parse_additive),
        move || init.clone(),
        |acc, (op, val)| Expr::binary(acc, op, val),
    )(input)
}

/// Parse comparison expressions (=, <>, <, >, <=, >=)
fn parse_comparison(input: &str) -> IResult<&str, Expr> {
    let (input, init) = parse_concat(input)?;

    fold_many0(
        pair(ws(parse_comparison_op), parse_concat),
        move || init.clone(),
        |acc, (op, val)| Expr::binary(acc, op, val),
    )(input)
}

/// Parse a complete expression
pub fn parse_expression(input: &str) -> IResult<&str, Expr> {
    let (input, _) = multispace0(input)?;
    parse_comparison(input)
}

// =============================================================================
// Public API
// =============================================================================

/// Formula text to AST
#[derive(Debug, Clone, Copy, Default)]
pub struct FormulaParser;

impl FormulaParser {
    pub fn new() -> Self {
        FormulaParser
    }

    /// Parse a formula string into an AST. A leading '=' is optional.
    pub fn parse(&self, input: &str) -> CalcResult<Expr> {
        let input = input.strip_prefix('=').unwrap_or(input);

        match parse_expression(input) {
            Ok((remaining, expr)) => {
                // Check that all input was consumed
                let remaining = remaining.trim();
                if remaining.is_empty() {
                    Ok(expr)
                } else {
                    Err(CalcError::Parse(ParseError {
                        message: format!("Unexpected input: '{}'", remaining),
                        position: input.trim_end().len() - remaining.len(),
                    }))
                }
            }
            Err(nom::Err::Failure(e)) if e.code == ErrorKind::Verify => Err(CalcError::MalformedArray),
            Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(CalcError::Parse(ParseError {
                message: format!("Unexpected input: '{}'", e.input),
                position: input.len() - e.input.len(),
            })),
            Err(nom::Err::Incomplete(_)) => Err(CalcError::Parse(ParseError {
                message: "Incomplete formula".to_string(),
                position: input.len(),
            })),
        }
    }
}

/// Parse formula text with the default parser
pub fn parse_formula(input: &str) -> CalcResult<Expr> {
    FormulaParser::new().parse(input)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(input: &str) -> CalcResult<Expr> {
        FormulaParser::new().parse(input)
    }

    fn cell(a1: &str) -> CellRef {
        match parse_cell(a1) {
            Ok(("", cell)) => cell,
            other => panic!("bad cell {a1}: {other:?}"),
        }
    }

    #[test]
    fn test_number() {
        assert_eq!(parse("123"), Ok(Expr::Number(123.0)));
        assert_eq!(parse("3.14"), Ok(Expr::Number(3.14)));
        assert_eq!(parse(".5"), Ok(Expr::Number(0.5)));
        assert_eq!(parse("-5"), Ok(Expr::unary(UnaryOp::Neg, Expr::Number(5.0))));
        assert_eq!(parse("1e10"), Ok(Expr::Number(1e10)));
        assert_eq!(parse("1.5e-3"), Ok(Expr::Number(1.5e-3)));
    }

    #[test]
    fn test_string() {
        assert_eq!(parse("\"hello\""), Ok(Expr::string("hello")));
        assert_eq!(parse("\"\""), Ok(Expr::string("")));
        assert_eq!(parse("\"say \"\"hi\"\"\""), Ok(Expr::string("say \"hi\"")));
        assert!(parse("\"open").is_err());
    }

    #[test]
    fn test_boolean_and_error_literals() {
        assert_eq!(parse("TRUE"), Ok(Expr::Boolean(true)));
        assert_eq!(parse("false"), Ok(Expr::Boolean(false)));
        assert_eq!(parse("TRUE()"), Ok(Expr::function("TRUE", vec![])));
        assert_eq!(parse("TRUEISH"), Ok(Expr::name("TRUEISH")));
        assert_eq!(parse("#DIV/0!"), Ok(Expr::Error(XlError::DivisionByZero)));
        assert_eq!(parse("#n/a"), Ok(Expr::Error(XlError::NoValueAvailable)));
        assert_eq!(parse("#NAME?"), Ok(Expr::Error(XlError::NameNotRecognized)));
    }

    #[test]
    fn test_cell_reference() {
        assert_eq!(parse("A1"), Ok(Expr::cell_ref(0, 0)));
        assert_eq!(parse("AA10"), Ok(Expr::cell_ref(9, 26)));
        assert_eq!(
            parse("$A$1"),
            Ok(Expr::Reference {
                prefix: None,
                area: AreaRef::cell(CellRef {
                    row: 0,
                    col: 0,
                    abs_row: true,
                    abs_col: true
                }),
            })
        );
        // Beyond the last column or row it is a name, not a reference
        assert_eq!(parse("XFE1"), Ok(Expr::name("XFE1")));
        assert_eq!(parse("A1048577"), Ok(Expr::name("A1048577")));
        // Function names that look like cells
        assert_eq!(parse("LOG10(1)"), Ok(Expr::function("LOG10", vec![Expr::Number(1.0)])));
    }

    #[test]
    fn test_area_and_sheet_prefix() {
        assert_eq!(parse("A1:B2"), Ok(Expr::area_ref(cell("A1"), cell("B2"))));
        assert_eq!(
            parse("Sheet1!A1:B2"),
            Ok(Expr::Reference {
                prefix: Some(Prefix::Sheet("Sheet1".to_string())),
                area: AreaRef {
                    start: cell("A1"),
                    end: cell("B2")
                },
            })
        );
        assert_eq!(
            parse("'Bob''s data'!C3"),
            Ok(Expr::Reference {
                prefix: Some(Prefix::Sheet("Bob's data".to_string())),
                area: AreaRef::cell(cell("C3")),
            })
        );
        assert_eq!(
            parse("Sheet1:Sheet3!A1"),
            Ok(Expr::Reference {
                prefix: Some(Prefix::SheetSpan {
                    first: "Sheet1".to_string(),
                    last: "Sheet3".to_string()
                }),
                area: AreaRef::cell(cell("A1")),
            })
        );
        assert_eq!(
            parse("[1]Sheet1!A1"),
            Ok(Expr::Reference {
                prefix: Some(Prefix::External {
                    book: "1".to_string(),
                    sheet: Some("Sheet1".to_string())
                }),
                area: AreaRef::cell(cell("A1")),
            })
        );
        assert_eq!(
            parse("Sheet2!Total"),
            Ok(Expr::Name {
                prefix: Some(Prefix::Sheet("Sheet2".to_string())),
                name: "Total".to_string()
            })
        );
        assert_eq!(
            parse("'A1'!B2"),
            Ok(Expr::Reference {
                prefix: Some(Prefix::Sheet("A1".to_string())),
                area: AreaRef::cell(cell("B2")),
            })
        );
    }

    #[test]
    fn test_cell_address_is_not_a_sheet_name() {
        // A range from a cell to a cell of another sheet, not a 3-D span
        assert_eq!(
            parse("A1:Other!B2"),
            Ok(Expr::binary(
                Expr::cell_ref(0, 0),
                BinaryOp::Range,
                Expr::Reference {
                    prefix: Some(Prefix::Sheet("Other".to_string())),
                    area: AreaRef::cell(cell("B2")),
                }
            ))
        );
        assert_eq!(
            parse("Other!A1:Sheet1!B2"),
            Ok(Expr::binary(
                Expr::Reference {
                    prefix: Some(Prefix::Sheet("Other".to_string())),
                    area: AreaRef::cell(cell("A1")),
                },
                BinaryOp::Range,
                Expr::Reference {
                    prefix: Some(Prefix::Sheet("Sheet1".to_string())),
                    area: AreaRef::cell(cell("B2")),
                }
            ))
        );
        assert!(parse("A1!B2").is_err());
    }

    #[test]
    fn test_reference_operators() {
        assert_eq!(
            parse("A1:B2:C3"),
            Ok(Expr::binary(
                Expr::area_ref(cell("A1"), cell("B2")),
                BinaryOp::Range,
                Expr::cell_ref(2, 2)
            ))
        );
        assert_eq!(
            parse("A1:C3 B2:D4"),
            Ok(Expr::binary(
                Expr::area_ref(cell("A1"), cell("C3")),
                BinaryOp::Intersection,
                Expr::area_ref(cell("B2"), cell("D4"))
            ))
        );
        assert_eq!(
            parse("SUM((A1,B2))"),
            Ok(Expr::function(
                "SUM",
                vec![Expr::Grouped(Box::new(Expr::binary(
                    Expr::cell_ref(0, 0),
                    BinaryOp::Union,
                    Expr::cell_ref(1, 1)
                )))]
            ))
        );
        // Spaces around other operators are not intersections
        assert_eq!(
            parse("A1 + B1"),
            Ok(Expr::binary(Expr::cell_ref(0, 0), BinaryOp::Add, Expr::cell_ref(0, 1)))
        );
        assert_eq!(parse("A1#"), Ok(Expr::unary(UnaryOp::Spill, Expr::cell_ref(0, 0))));
        assert_eq!(
            parse("@A1:A5"),
            Ok(Expr::unary(
                UnaryOp::ImplicitIntersection,
                Expr::area_ref(cell("A1"), cell("A5"))
            ))
        );
    }

    #[test]
    fn test_arithmetic_precedence() {
        // 1 + 2 * 3 = 1 + (2 * 3)
        assert_eq!(
            parse("1 + 2 * 3"),
            Ok(Expr::binary(
                Expr::Number(1.0),
                BinaryOp::Add,
                Expr::binary(Expr::Number(2.0), BinaryOp::Mul, Expr::Number(3.0))
            ))
        );
        // Negation binds tighter than power
        assert_eq!(
            parse("-2^2"),
            Ok(Expr::binary(
                Expr::unary(UnaryOp::Neg, Expr::Number(2.0)),
                BinaryOp::Pow,
                Expr::Number(2.0)
            ))
        );
        // Power is left-associative
        assert_eq!(
            parse("2^3^2"),
            Ok(Expr::binary(
                Expr::binary(Expr::Number(2.0), BinaryOp::Pow, Expr::Number(3.0)),
                BinaryOp::Pow,
                Expr::Number(2.0)
            ))
        );
        assert_eq!(
            parse("50%"),
            Ok(Expr::unary(UnaryOp::Percent, Expr::Number(50.0)))
        );
    }

    #[test]
    fn test_comparison_and_concat() {
        assert_eq!(
            parse("A1&\"x\"=\"ax\""),
            Ok(Expr::binary(
                Expr::binary(Expr::cell_ref(0, 0), BinaryOp::Concat, Expr::string("x")),
                BinaryOp::Eq,
                Expr::string("ax")
            ))
        );
        assert_eq!(
            parse("1<>2"),
            Ok(Expr::binary(Expr::Number(1.0), BinaryOp::Ne, Expr::Number(2.0)))
        );
    }

    #[test]
    fn test_function_call() {
        assert_eq!(
            parse("=sum(A1:A3, 2)"),
            Ok(Expr::function(
                "SUM",
                vec![Expr::area_ref(cell("A1"), cell("A3")), Expr::Number(2.0)]
            ))
        );
        assert_eq!(parse("NOW()"), Ok(Expr::function("NOW", vec![])));
        assert_eq!(
            parse("IF(A1>0, \"pos\", \"neg\")"),
            Ok(Expr::function(
                "IF",
                vec![
                    Expr::binary(Expr::cell_ref(0, 0), BinaryOp::Gt, Expr::Number(0.0)),
                    Expr::string("pos"),
                    Expr::string("neg"),
                ]
            ))
        );
    }

    #[test]
    fn test_array_constant() {
        let expected = Array::from_rows(vec![
            vec![Scalar::Number(1.0), Scalar::Number(-2.0)],
            vec![Scalar::Text("a".into()), Scalar::Logical(true)],
        ])
        .unwrap();
        assert_eq!(parse("{1,-2;\"a\",TRUE}"), Ok(Expr::Array(expected)));
        assert_eq!(parse("{1,2;3}"), Err(CalcError::MalformedArray));
    }

    #[test]
    fn test_structured_reference_and_dde() {
        assert_eq!(
            parse("Sales[[#Totals],[Amount]]"),
            Ok(Expr::StructuredReference {
                table: "Sales".to_string(),
                specifier: "[#Totals],[Amount]".to_string()
            })
        );
        assert_eq!(
            parse("Excel|'Book.xlsx'!R1C1"),
            Ok(Expr::Dde {
                application: "Excel".to_string(),
                topic: "Book.xlsx".to_string(),
                item: "R1C1".to_string()
            })
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(parse("1 +"), Err(CalcError::Parse(_))));
        assert!(matches!(parse("(1"), Err(CalcError::Parse(_))));
        assert!(matches!(parse("SUM(1,"), Err(CalcError::Parse(_))));
        match parse("1 2)") {
            Err(CalcError::Parse(e)) => assert_eq!(e.position, 3),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_display_round_trip() {
        for text in ["SUM(A1:B2,Sheet2!$C$3)", "-A1%", "(A1,B2)", "\"a\"\"b\"&C1", "{1,2;3,4}", "'B2'!A1"] {
            let expr = parse(text).unwrap();
            assert_eq!(expr.to_string(), text);
            assert_eq!(parse(&expr.to_string()), Ok(expr));
        }
    }
}
