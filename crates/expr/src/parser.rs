//! A `nom`-based parser for the scope expression language.
use crate::ast::{BinaryOp, Expression, PathSegment, Place, Script, Statement, UnaryOp};
use crate::error::ExprError;
use crate::value;
use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{tag, take_while, take_while1},
    character::complete::{char, digit1, multispace0, one_of, satisfy},
    combinator::{map, not, opt, recognize, value},
    error::ErrorKind,
    multi::{many0, separated_list0},
    sequence::{delimited, pair, preceded, terminated},
};
use serde_json::Value;

/// Deepest bracket nesting the parsers accept.
pub const MAX_NESTING: usize = 128;

// --- Main Public Parsers ---

/// Parses a single expression (the body of `#{...}`, a `condition` attribute, ...).
pub fn parse_expression(input: &str) -> Result<Expression, ExprError> {
    check_nesting(input)?;
    match expression(input) {
        Ok((rem, expr)) if rem.trim().is_empty() => Ok(expr),
        Ok((rem, _)) => Err(parse_error(
            input,
            format!("Parser did not consume all input. Remainder: '{}'", rem.trim()),
        )),
        Err(e) => Err(parse_error(input, e.to_string())),
    }
}

/// Parses a `;`-separated statement block (the body of `@{...}`).
pub fn parse_script(input: &str) -> Result<Script, ExprError> {
    check_nesting(input)?;
    match script(input) {
        Ok((rem, statements)) if rem.trim().is_empty() => Ok(Script { statements }),
        Ok((rem, _)) => Err(parse_error(
            input,
            format!("Parser did not consume all input. Remainder: '{}'", rem.trim()),
        )),
        Err(e) => Err(parse_error(input, e.to_string())),
    }
}

fn parse_error(input: &str, message: String) -> ExprError {
    ExprError::Parse {
        expression: input.to_string(),
        message,
    }
}

/// Rejects input whose `()`, `[]` and `{}` nest deeper than [`MAX_NESTING`].
/// Brackets inside string literals do not count.
fn check_nesting(input: &str) -> Result<(), ExprError> {
    let mut depth = 0usize;
    let mut deepest = 0usize;
    let mut quote: Option<char> = None;
    let mut chars = input.chars();
    while let Some(c) = chars.next() {
        match (quote, c) {
            (Some(_), '\\') => {
                chars.next();
            }
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(c),
            (None, '(' | '[' | '{') => {
                depth += 1;
                deepest = deepest.max(depth);
            }
            (None, ')' | ']' | '}') => depth = depth.saturating_sub(1),
            (None, _) => {}
        }
    }
    if deepest > MAX_NESTING {
        return Err(parse_error(
            input,
            format!("Brackets nest {} levels deep; at most {} are allowed", deepest, MAX_NESTING),
        ));
    }
    Ok(())
}

fn fail<O>(input: &str, kind: ErrorKind) -> IResult<&str, O> {
    Err(nom::Err::Error(nom::error::Error::new(input, kind)))
}

// --- Statements ---

fn script(input: &str) -> IResult<&str, Vec<Statement>> {
    let (input, items) = many0(alt((
        map(ws(char(';')), |_| None),
        map(statement, Some),
    )))
    .parse(input)?;
    Ok((input, items.into_iter().flatten().collect()))
}

fn statement(input: &str) -> IResult<&str, Statement> {
    ws(alt((
        return_statement,
        assignment,
        map(expression, Statement::Expression),
    )))
    .parse(input)
}

fn return_statement(input: &str) -> IResult<&str, Statement> {
    let (input, _) = terminated(tag("return"), not(satisfy(is_ident_char))).parse(input)?;
    let (input, value) = opt(expression).parse(input)?;
    Ok((
        input,
        Statement::Return(value.unwrap_or(Expression::Literal(Value::Null))),
    ))
}

fn assignment(input: &str) -> IResult<&str, Statement> {
    let (input, root) = identifier(input)?;
    let (input, path) = many0(alt((
        map(preceded(ws(char('.')), identifier), |k: &str| {
            PathSegment::Key(k.to_string())
        }),
        map(
            delimited(ws(char('[')), expression, ws(char(']'))),
            PathSegment::Computed,
        ),
    )))
    .parse(input)?;
    let (input, _) = ws(terminated(char('='), not(char('=')))).parse(input)?;
    let (input, value) = expression(input)?;
    Ok((
        input,
        Statement::Assign {
            place: Place {
                root: root.to_string(),
                path,
            },
            value,
        },
    ))
}

// --- Expressions, lowest precedence first ---

fn expression(input: &str) -> IResult<&str, Expression> {
    conditional(input)
}

fn conditional(input: &str) -> IResult<&str, Expression> {
    let (input, test) = logical_or(input)?;
    let (input, branches) = opt((
        ws(char('?')),
        expression,
        ws(char(':')),
        expression,
    ))
    .parse(input)?;
    Ok(match branches {
        Some((_, consequent, _, alternate)) => (
            input,
            Expression::Conditional {
                test: Box::new(test),
                consequent: Box::new(consequent),
                alternate: Box::new(alternate),
            },
        ),
        None => (input, test),
    })
}

fn fold_binary<'a>(
    input: &'a str,
    operand: fn(&'a str) -> IResult<&'a str, Expression>,
    operator: fn(&'a str) -> IResult<&'a str, BinaryOp>,
) -> IResult<&'a str, Expression> {
    let (input, first) = operand(input)?;
    let (input, rest) = many0(pair(ws(operator), operand)).parse(input)?;
    let folded = rest
        .into_iter()
        .fold(first, |left, (op, right)| Expression::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        });
    Ok((input, folded))
}

fn logical_or(input: &str) -> IResult<&str, Expression> {
    fold_binary(input, logical_and, |i| value(BinaryOp::Or, tag("||")).parse(i))
}

fn logical_and(input: &str) -> IResult<&str, Expression> {
    fold_binary(input, equality, |i| value(BinaryOp::And, tag("&&")).parse(i))
}

fn equality(input: &str) -> IResult<&str, Expression> {
    fold_binary(input, comparison, |i| {
        alt((
            value(BinaryOp::StrictEqual, tag("===")),
            value(BinaryOp::StrictNotEqual, tag("!==")),
            value(BinaryOp::Equal, tag("==")),
            value(BinaryOp::NotEqual, tag("!=")),
        ))
        .parse(i)
    })
}

fn comparison(input: &str) -> IResult<&str, Expression> {
    fold_binary(input, additive, |i| {
        alt((
            value(BinaryOp::LessEqual, tag("<=")),
            value(BinaryOp::GreaterEqual, tag(">=")),
            value(BinaryOp::Less, char('<')),
            value(BinaryOp::Greater, char('>')),
        ))
        .parse(i)
    })
}

fn additive(input: &str) -> IResult<&str, Expression> {
    fold_binary(input, multiplicative, |i| {
        alt((
            value(BinaryOp::Add, char('+')),
            value(BinaryOp::Subtract, char('-')),
        ))
        .parse(i)
    })
}

fn multiplicative(input: &str) -> IResult<&str, Expression> {
    fold_binary(input, unary, |i| {
        alt((
            value(BinaryOp::Multiply, char('*')),
            value(BinaryOp::Divide, char('/')),
            value(BinaryOp::Remainder, char('%')),
        ))
        .parse(i)
    })
}

fn unary(input: &str) -> IResult<&str, Expression> {
    alt((
        map(preceded(ws(char('!')), unary), |operand| Expression::Unary {
            op: UnaryOp::Not,
            operand: Box::new(operand),
        }),
        map(preceded(ws(char('-')), unary), |operand| Expression::Unary {
            op: UnaryOp::Negate,
            operand: Box::new(operand),
        }),
        postfix,
    ))
    .parse(input)
}

enum Accessor {
    Member(String),
    Index(Expression),
}

fn postfix(input: &str) -> IResult<&str, Expression> {
    let (input, base) = primary(input)?;
    let (input, accessors) = many0(alt((
        map(preceded(ws(char('.')), identifier), |k: &str| {
            Accessor::Member(k.to_string())
        }),
        map(
            delimited(ws(char('[')), expression, ws(char(']'))),
            Accessor::Index,
        ),
    )))
    .parse(input)?;
    let folded = accessors
        .into_iter()
        .fold(base, |object, accessor| match accessor {
            Accessor::Member(property) => Expression::Member {
                object: Box::new(object),
                property,
            },
            Accessor::Index(index) => Expression::Index {
                object: Box::new(object),
                index: Box::new(index),
            },
        });
    Ok((input, folded))
}

fn primary(input: &str) -> IResult<&str, Expression> {
    ws(alt((
        map(number, Expression::Literal),
        map(string_literal, Expression::Literal),
        array_literal,
        object_literal,
        delimited(char('('), expression, ws(char(')'))),
        call_or_identifier,
    )))
    .parse(input)
}

// --- Literal Parsers ---

fn number(input: &str) -> IResult<&str, Value> {
    let (rest, text) = recognize((
        digit1,
        opt((char('.'), digit1)),
        opt((one_of("eE"), opt(one_of("+-")), digit1)),
    ))
    .parse(input)?;
    match text.parse::<f64>().ok().and_then(value::from_f64) {
        Some(number) => Ok((rest, number)),
        None => fail(input, ErrorKind::Float),
    }
}

fn string_literal(input: &str) -> IResult<&str, Value> {
    let (rest, quote) = alt((char('\''), char('"'))).parse(input)?;
    let mut out = String::new();
    let mut chars = rest.char_indices();
    while let Some((i, c)) = chars.next() {
        if c == quote {
            return Ok((&rest[i + 1..], Value::String(out)));
        }
        if c == '\\' {
            match chars.next() {
                Some((_, 'n')) => out.push('\n'),
                Some((_, 't')) => out.push('\t'),
                Some((_, 'r')) => out.push('\r'),
                Some((_, other)) => out.push(other),
                None => break,
            }
        } else {
            out.push(c);
        }
    }
    fail(input, ErrorKind::Char)
}

fn array_literal(input: &str) -> IResult<&str, Expression> {
    map(
        delimited(
            char('['),
            separated_list0(ws(char(',')), expression),
            ws(char(']')),
        ),
        Expression::Array,
    )
    .parse(input)
}

fn object_key(input: &str) -> IResult<&str, String> {
    alt((
        map(identifier, str::to_string),
        map(string_literal, |v| match v {
            Value::String(s) => s,
            other => other.to_string(),
        }),
    ))
    .parse(input)
}

fn object_literal(input: &str) -> IResult<&str, Expression> {
    map(
        delimited(
            char('{'),
            separated_list0(
                ws(char(',')),
                pair(ws(object_key), preceded(ws(char(':')), expression)),
            ),
            ws(char('}')),
        ),
        Expression::Object,
    )
    .parse(input)
}

// --- Names and calls ---

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

fn identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        take_while1(is_ident_start),
        take_while(is_ident_char),
    ))
    .parse(input)
}

fn call_or_identifier(input: &str) -> IResult<&str, Expression> {
    let (input, name) = identifier(input)?;
    let (input, args) = opt(preceded(
        multispace0,
        delimited(
            char('('),
            separated_list0(ws(char(',')), expression),
            ws(char(')')),
        ),
    ))
    .parse(input)?;

    let expr = match (name, args) {
        (name, Some(args)) => Expression::Call {
            name: name.to_string(),
            args,
        },
        ("true", None) => Expression::Literal(Value::Bool(true)),
        ("false", None) => Expression::Literal(Value::Bool(false)),
        ("null" | "undefined", None) => Expression::Literal(Value::Null),
        (name, None) => Expression::Identifier(name.to_string()),
    };
    Ok((input, expr))
}

/// A combinator that takes a parser `inner` and produces a parser that consumes surrounding whitespace.
fn ws<'a, F, O, E>(inner: F) -> impl Parser<&'a str, Output = O, Error = E>
where
    F: Parser<&'a str, Output = O, Error = E>,
    E: nom::error::ParseError<&'a str>,
{
    delimited(multispace0, inner, multispace0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ident(name: &str) -> Box<Expression> {
        Box::new(Expression::Identifier(name.to_string()))
    }

    #[test]
    fn test_parse_member_path() {
        let expr = parse_expression("user.profile.name").unwrap();
        assert_eq!(
            expr,
            Expression::Member {
                object: Box::new(Expression::Member {
                    object: ident("user"),
                    property: "profile".into(),
                }),
                property: "name".into(),
            }
        );
    }

    #[test]
    fn test_parse_precedence() {
        let expr = parse_expression("a + b * 2").unwrap();
        let Expression::Binary { op, right, .. } = expr else {
            panic!("expected binary expression");
        };
        assert_eq!(op, BinaryOp::Add);
        assert!(matches!(
            *right,
            Expression::Binary {
                op: BinaryOp::Multiply,
                ..
            }
        ));
    }

    #[test]
    fn test_parse_keywords_are_not_prefixes() {
        assert_eq!(
            parse_expression("trueValue").unwrap(),
            Expression::Identifier("trueValue".into())
        );
        assert_eq!(
            parse_expression("null").unwrap(),
            Expression::Literal(Value::Null)
        );
    }

    #[test]
    fn test_parse_object_literal_in_call() {
        let expr = parse_expression(" fn({a:1, 'b c': [1, 2]}) ").unwrap();
        let Expression::Call { name, args } = expr else {
            panic!("expected call");
        };
        assert_eq!(name, "fn");
        assert_eq!(args.len(), 1);
        assert!(matches!(&args[0], Expression::Object(fields) if fields.len() == 2));
    }

    #[test]
    fn test_parse_strings_with_escapes() {
        assert_eq!(
            parse_expression(r#""say \"hi\"""#).unwrap(),
            Expression::Literal(json!("say \"hi\""))
        );
        assert_eq!(
            parse_expression("''").unwrap(),
            Expression::Literal(json!(""))
        );
    }

    #[test]
    fn test_parse_numbers_normalize_integers() {
        assert_eq!(parse_expression("3").unwrap(), Expression::Literal(json!(3)));
        assert_eq!(
            parse_expression("2.5").unwrap(),
            Expression::Literal(json!(2.5))
        );
    }

    #[test]
    fn test_parse_ternary() {
        let expr = parse_expression("admin ? 'yes' : 'no'").unwrap();
        assert!(matches!(expr, Expression::Conditional { .. }));
    }

    #[test]
    fn test_parse_rejects_trailing_garbage() {
        assert!(matches!(
            parse_expression("a b"),
            Err(ExprError::Parse { .. })
        ));
        assert!(parse_expression("(a").is_err());
        assert!(parse_expression("").is_err());
    }

    fn nested(depth: usize, inner: &str) -> String {
        format!("{}{}{}", "(".repeat(depth), inner, ")".repeat(depth))
    }

    #[test]
    fn test_parse_deeply_nested_parentheses() {
        assert_eq!(parse_expression(&nested(64, "1")).unwrap(), Expression::Literal(json!(1)));
        assert_eq!(
            parse_expression(&nested(MAX_NESTING, "1")).unwrap(),
            Expression::Literal(json!(1))
        );
        let script = parse_script(&format!("x = {}", nested(64, "[1]"))).unwrap();
        assert!(matches!(script.statements[0], Statement::Assign { .. }));
    }

    #[test]
    fn test_parse_reports_excess_nesting() {
        let Err(ExprError::Parse { message, .. }) = parse_expression(&nested(MAX_NESTING + 1, "1")) else {
            panic!("expected a nesting error");
        };
        assert!(message.contains("129 levels deep"), "{}", message);
        assert!(parse_script(&format!("return {}", nested(MAX_NESTING + 1, "1"))).is_err());
        // Brackets inside strings are text.
        assert!(parse_expression(&format!("'{}'", "(".repeat(MAX_NESTING + 1))).is_ok());
    }

    #[test]
    fn test_parse_script_statements() {
        let script = parse_script("count = count + 1; user.name = 'x';; return count").unwrap();
        assert_eq!(script.statements.len(), 3);
        assert!(matches!(script.statements[0], Statement::Assign { .. }));
        assert!(matches!(
            &script.statements[1],
            Statement::Assign { place, .. } if place.root == "user" && place.path.len() == 1
        ));
        assert!(matches!(script.statements[2], Statement::Return(_)));
    }

    #[test]
    fn test_parse_script_equality_is_not_assignment() {
        let script = parse_script("a == 1").unwrap();
        assert!(matches!(
            script.statements[0],
            Statement::Expression(Expression::Binary {
                op: BinaryOp::Equal,
                ..
            })
        ));
    }

    #[test]
    fn test_parse_empty_script() {
        assert!(parse_script("  ").unwrap().statements.is_empty());
        let script = parse_script("returned = 1").unwrap();
        assert!(matches!(script.statements[0], Statement::Assign { .. }));
    }
}
