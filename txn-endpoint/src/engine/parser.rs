// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Statement parser for the in-memory engine using nom parsers
//!
//! Supported forms:
//!
//! ```text
//! CREATE (v:Label {k: expr, ...}) [, (...)]* [RETURN item, ...]
//! MATCH (v:Label) [WHERE v.k = expr] RETURN item, ...
//! MATCH (v:Label) [WHERE v.k = expr] DELETE v
//! RETURN item [AS alias], ...
//! ```

use log::debug;
use nom::{
    branch::alt,
    bytes::complete::{tag, tag_no_case, take_while},
    character::complete::{alpha1, alphanumeric1, char, digit1, multispace0},
    combinator::{all_consuming, consumed, map, map_res, opt, recognize, value},
    multi::{many0, separated_list0, separated_list1},
    sequence::{delimited, pair, preceded, separated_pair, terminated, tuple},
    IResult,
};

use super::error::StatementError;
use super::value::Value;

type PResult<'a, T> = IResult<&'a str, T>;

/// Deepest bracket nesting accepted in one statement
pub const MAX_NESTING_DEPTH: usize = 64;

/// Parsed statement
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    Create {
        patterns: Vec<NodePattern>,
        returns: Vec<ReturnItem>,
    },
    Match {
        pattern: NodePattern,
        filter: Option<PropertyFilter>,
        action: MatchAction,
    },
    Return {
        items: Vec<ReturnItem>,
    },
}

/// `(v:Label {k: expr})`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NodePattern {
    pub variable: Option<String>,
    pub labels: Vec<String>,
    pub properties: Vec<(String, Expr)>,
}

/// `WHERE v.k = expr`
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyFilter {
    pub variable: String,
    pub key: String,
    pub value: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MatchAction {
    Return(Vec<ReturnItem>),
    Delete(String),
}

/// Projection with the column name it is reported under
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnItem {
    pub expr: Expr,
    pub column: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Parameter(String),
    Variable(String),
    Property(String, String),
    Count(String),
    List(Vec<Expr>),
    Map(Vec<(String, Expr)>),
    Binary(Box<Expr>, BinaryOp, Box<Expr>),
}

impl Expr {
    pub fn is_aggregate(&self) -> bool {
        matches!(self, Expr::Count(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl BinaryOp {
    pub fn symbol(&self) -> char {
        match self {
            BinaryOp::Add => '+',
            BinaryOp::Subtract => '-',
            BinaryOp::Multiply => '*',
            BinaryOp::Divide => '/',
        }
    }
}

/// Parse one statement
pub fn parse_statement(input: &str) -> Result<Query, StatementError> {
    if input.trim().is_empty() {
        return Err(StatementError::Syntax("Empty statement".to_string()));
    }
    // Expressions parse recursively, so bound the depth before handing the text to nom.
    if nesting_depth(input) > MAX_NESTING_DEPTH {
        debug!("PARSER: rejected statement nested deeper than {}", MAX_NESTING_DEPTH);
        return Err(StatementError::Syntax(
            "Expression nested too deeply".to_string(),
        ));
    }

    let result = all_consuming(delimited(
        multispace0,
        alt((create_query, match_query, return_query)),
        pair(multispace0, opt(pair(char(';'), multispace0))),
    ))(input);

    match result {
        Ok((_, query)) => Ok(query),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
            let offset = input.len() - e.input.len();
            debug!("PARSER: rejected statement at offset {}: {:?}", offset, input);
            Err(StatementError::Syntax(describe_failure(e.input, offset)))
        }
        Err(nom::Err::Incomplete(_)) => {
            Err(StatementError::Syntax("Unexpected end of input".to_string()))
        }
    }
}

/// Deepest `(`, `[` or `{` nesting outside quoted strings
fn nesting_depth(input: &str) -> usize {
    let mut depth = 0usize;
    let mut deepest = 0usize;
    let mut quote: Option<char> = None;

    for c in input.chars() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(c),
            (None, '(' | '[' | '{') => {
                depth += 1;
                deepest = deepest.max(depth);
            }
            (None, ')' | ']' | '}') => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    deepest
}

fn describe_failure(remaining: &str, offset: usize) -> String {
    if remaining.trim().is_empty() {
        return "Unexpected end of input".to_string();
    }
    let snippet: String = remaining.chars().take(20).collect();
    format!("Invalid input '{}' at offset {}", snippet, offset)
}

fn ws<'a, O, F>(inner: F) -> impl FnMut(&'a str) -> PResult<'a, O>
where
    F: FnMut(&'a str) -> PResult<'a, O>,
{
    delimited(multispace0, inner, multispace0)
}

/// Case-insensitive keyword that must not run into an identifier
fn keyword<'a>(kw: &'static str) -> impl FnMut(&'a str) -> PResult<'a, &'a str> {
    move |input: &'a str| {
        let (rest, matched) = tag_no_case(kw)(input)?;
        if rest
            .chars()
            .next()
            .map_or(false, |c| c.is_alphanumeric() || c == '_')
        {
            return Err(nom::Err::Error(nom::error::Error::new(
                input,
                nom::error::ErrorKind::Tag,
            )));
        }
        Ok((rest, matched))
    }
}

fn identifier(input: &str) -> PResult<&str> {
    recognize(pair(
        alt((alpha1, tag("_"))),
        many0(alt((alphanumeric1, tag("_")))),
    ))(input)
}

fn map_key(input: &str) -> PResult<String> {
    alt((
        map(identifier, |s: &str| s.to_string()),
        map(quoted_string, |s: &str| s.to_string()),
    ))(input)
}

fn quoted_string(input: &str) -> PResult<&str> {
    alt((
        delimited(char('\''), take_while(|c| c != '\''), char('\'')),
        delimited(char('"'), take_while(|c| c != '"'), char('"')),
    ))(input)
}

fn literal(input: &str) -> PResult<Value> {
    alt((
        map_res(
            recognize(tuple((opt(char('-')), digit1, char('.'), digit1))),
            |s: &str| s.parse::<f64>().map(Value::Float),
        ),
        map_res(recognize(pair(opt(char('-')), digit1)), |s: &str| {
            s.parse::<i64>().map(Value::Integer)
        }),
        map(quoted_string, |s: &str| Value::String(s.to_string())),
        value(Value::Boolean(true), keyword("true")),
        value(Value::Boolean(false), keyword("false")),
        value(Value::Null, keyword("null")),
    ))(input)
}

fn entries(input: &str) -> PResult<Vec<(String, Expr)>> {
    delimited(
        terminated(char('{'), multispace0),
        separated_list0(ws(char(',')), separated_pair(map_key, ws(char(':')), expr)),
        preceded(multispace0, char('}')),
    )(input)
}

fn factor(input: &str) -> PResult<Expr> {
    alt((
        map(literal, Expr::Literal),
        map(preceded(char('$'), identifier), |s: &str| {
            Expr::Parameter(s.to_string())
        }),
        map(
            preceded(
                keyword("count"),
                delimited(ws(char('(')), identifier, preceded(multispace0, char(')'))),
            ),
            |s: &str| Expr::Count(s.to_string()),
        ),
        map(
            separated_pair(identifier, char('.'), identifier),
            |(v, k): (&str, &str)| Expr::Property(v.to_string(), k.to_string()),
        ),
        map(identifier, |s: &str| Expr::Variable(s.to_string())),
        map(
            delimited(
                terminated(char('['), multispace0),
                separated_list0(ws(char(',')), expr),
                preceded(multispace0, char(']')),
            ),
            Expr::List,
        ),
        map(entries, Expr::Map),
        delimited(
            terminated(char('('), multispace0),
            expr,
            preceded(multispace0, char(')')),
        ),
    ))(input)
}

fn term(input: &str) -> PResult<Expr> {
    let (mut input, mut left) = factor(input)?;
    loop {
        let op = ws(alt((
            value(BinaryOp::Multiply, char('*')),
            value(BinaryOp::Divide, char('/')),
        )));
        match pair(op, factor)(input) {
            Ok((rest, (op, right))) => {
                left = Expr::Binary(Box::new(left), op, Box::new(right));
                input = rest;
            }
            Err(nom::Err::Error(_)) => return Ok((input, left)),
            Err(e) => return Err(e),
        }
    }
}

fn expr(input: &str) -> PResult<Expr> {
    let (mut input, mut left) = term(input)?;
    loop {
        let op = ws(alt((
            value(BinaryOp::Add, char('+')),
            value(BinaryOp::Subtract, char('-')),
        )));
        match pair(op, term)(input) {
            Ok((rest, (op, right))) => {
                left = Expr::Binary(Box::new(left), op, Box::new(right));
                input = rest;
            }
            Err(nom::Err::Error(_)) => return Ok((input, left)),
            Err(e) => return Err(e),
        }
    }
}

fn return_item(input: &str) -> PResult<ReturnItem> {
    let (rest, (text, expr)) = consumed(expr)(input)?;
    let (rest, alias) = opt(preceded(ws(keyword("AS")), identifier))(rest)?;
    let column = alias.unwrap_or(text).trim().to_string();
    Ok((rest, ReturnItem { expr, column }))
}

fn return_clause(input: &str) -> PResult<Vec<ReturnItem>> {
    preceded(
        terminated(keyword("RETURN"), multispace0),
        separated_list1(ws(char(',')), return_item),
    )(input)
}

fn node_pattern(input: &str) -> PResult<NodePattern> {
    let (rest, _) = terminated(char('('), multispace0)(input)?;
    let (rest, variable) = opt(identifier)(rest)?;
    let (rest, labels) = many0(preceded(ws(char(':')), identifier))(rest)?;
    let (rest, properties) = opt(preceded(multispace0, entries))(rest)?;
    let (rest, _) = preceded(multispace0, char(')'))(rest)?;

    Ok((
        rest,
        NodePattern {
            variable: variable.map(|v| v.to_string()),
            labels: labels.into_iter().map(|l| l.to_string()).collect(),
            properties: properties.unwrap_or_default(),
        },
    ))
}

fn create_query(input: &str) -> PResult<Query> {
    let (rest, patterns) = preceded(
        terminated(keyword("CREATE"), multispace0),
        separated_list1(ws(char(',')), node_pattern),
    )(input)?;
    let (rest, returns) = opt(preceded(multispace0, return_clause))(rest)?;

    Ok((
        rest,
        Query::Create {
            patterns,
            returns: returns.unwrap_or_default(),
        },
    ))
}

fn where_clause(input: &str) -> PResult<PropertyFilter> {
    map(
        preceded(
            ws(keyword("WHERE")),
            tuple((identifier, char('.'), identifier, ws(char('=')), expr)),
        ),
        |(variable, _, key, _, value)| PropertyFilter {
            variable: variable.to_string(),
            key: key.to_string(),
            value,
        },
    )(input)
}

fn match_query(input: &str) -> PResult<Query> {
    let (rest, pattern) =
        preceded(terminated(keyword("MATCH"), multispace0), node_pattern)(input)?;
    let (rest, filter) = opt(where_clause)(rest)?;
    let (rest, action) = preceded(
        multispace0,
        alt((
            map(return_clause, MatchAction::Return),
            map(
                preceded(terminated(keyword("DELETE"), multispace0), identifier),
                |v: &str| MatchAction::Delete(v.to_string()),
            ),
        )),
    )(rest)?;

    Ok((
        rest,
        Query::Match {
            pattern,
            filter,
            action,
        },
    ))
}

fn return_query(input: &str) -> PResult<Query> {
    map(return_clause, |items| Query::Return { items })(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_create_with_return() {
        let query = parse_statement("CREATE (n) RETURN n").unwrap();
        let Query::Create { patterns, returns } = query else {
            panic!("expected CREATE");
        };
        assert_eq!(patterns.len(), 1);
        assert_eq!(patterns[0].variable.as_deref(), Some("n"));
        assert_eq!(returns.len(), 1);
        assert_eq!(returns[0].column, "n");
    }

    #[test]
    fn test_parse_create_with_labels_and_properties() {
        let query =
            parse_statement("create (p:Person:Employee {name: 'Alice', age: $age})").unwrap();
        let Query::Create { patterns, returns } = query else {
            panic!("expected CREATE");
        };
        assert!(returns.is_empty());
        assert_eq!(patterns[0].labels, vec!["Person", "Employee"]);
        assert_eq!(
            patterns[0].properties,
            vec![
                (
                    "name".to_string(),
                    Expr::Literal(Value::String("Alice".to_string()))
                ),
                ("age".to_string(), Expr::Parameter("age".to_string())),
            ]
        );
    }

    #[test]
    fn test_parse_match_where_return() {
        let query =
            parse_statement("MATCH (p:Person) WHERE p.name = 'Bob' RETURN p.name AS name, p")
                .unwrap();
        let Query::Match {
            pattern,
            filter,
            action,
        } = query
        else {
            panic!("expected MATCH");
        };
        assert_eq!(pattern.labels, vec!["Person"]);
        assert_eq!(filter.unwrap().key, "name");
        let MatchAction::Return(items) = action else {
            panic!("expected RETURN");
        };
        assert_eq!(items[0].column, "name");
        assert_eq!(items[1].column, "p");
    }

    #[test]
    fn test_parse_match_delete() {
        let query = parse_statement("MATCH (n:Temp) DELETE n;").unwrap();
        assert!(matches!(
            query,
            Query::Match {
                action: MatchAction::Delete(_),
                ..
            }
        ));
    }

    #[test]
    fn test_count_column_keeps_source_text() {
        let query = parse_statement("MATCH (n) RETURN count(n)").unwrap();
        let Query::Match {
            action: MatchAction::Return(items),
            ..
        } = query
        else {
            panic!("expected MATCH ... RETURN");
        };
        assert_eq!(items[0].column, "count(n)");
        assert!(items[0].expr.is_aggregate());
    }

    #[test]
    fn test_arithmetic_precedence() {
        let query = parse_statement("RETURN 1 + 2 * 3").unwrap();
        let Query::Return { items } = query else {
            panic!("expected RETURN");
        };
        assert_eq!(
            items[0].expr,
            Expr::Binary(
                Box::new(Expr::Literal(Value::Integer(1))),
                BinaryOp::Add,
                Box::new(Expr::Binary(
                    Box::new(Expr::Literal(Value::Integer(2))),
                    BinaryOp::Multiply,
                    Box::new(Expr::Literal(Value::Integer(3))),
                )),
            )
        );
    }

    #[test]
    fn test_syntax_errors() {
        for text in ["CREATE ;;", "", "   ", "CREATE (n", "MATCH (n)", "RETURN", "DROP n"] {
            assert!(
                matches!(parse_statement(text), Err(StatementError::Syntax(_))),
                "expected syntax error for {:?}",
                text
            );
        }
    }

    #[test]
    fn test_nesting_limit() {
        let nested = |depth: usize| format!("RETURN {}1{}", "[".repeat(depth), "]".repeat(depth));

        assert!(parse_statement(&nested(MAX_NESTING_DEPTH)).is_ok());
        assert_eq!(
            parse_statement(&nested(MAX_NESTING_DEPTH + 1)),
            Err(StatementError::Syntax("Expression nested too deeply".to_string()))
        );
        assert!(matches!(
            parse_statement(&nested(200_000)),
            Err(StatementError::Syntax(_))
        ));

        let quoted = format!("RETURN '{}'", "(".repeat(MAX_NESTING_DEPTH * 2));
        assert!(parse_statement(&quoted).is_ok());
    }

    #[test]
    fn test_keyword_boundaries() {
        assert!(parse_statement("RETURNx 1").is_err());
        assert!(parse_statement("RETURN truex").is_ok());
    }
}
