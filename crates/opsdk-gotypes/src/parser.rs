//! Go source parser
//!
//! Parses the type declarations of a Go file using pest and attaches doc
//! comments to types and struct members the way `go/ast` groups them.

use std::collections::HashMap;

use pest::Parser;
use pest::iterators::Pair;
use pest_derive::Parser;
use thiserror::Error;

use crate::ast::*;
use crate::literal::{LiteralError, unquote};

#[derive(Parser)]
#[grammar = "go_types.pest"]
struct GoSourceParser;

/// Parser error
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Parse error: {0}")]
    Pest(Box<pest::error::Error<Rule>>),

    #[error("Invalid struct tag {tag}: {source}")]
    InvalidTag {
        tag: String,
        #[source]
        source: LiteralError,
    },

    #[error("Unexpected rule: {0:?}")]
    UnexpectedRule(Rule),

    #[error("Missing {0}")]
    Missing(&'static str),
}

impl From<pest::error::Error<Rule>> for ParseError {
    fn from(e: pest::error::Error<Rule>) -> Self {
        ParseError::Pest(Box::new(e))
    }
}

pub type Result<T> = std::result::Result<T, ParseError>;

/// Parse a Go source file into its package name and type declarations
pub fn parse(source: &str) -> Result<SourceFile> {
    let file = GoSourceParser::parse(Rule::file, source)?
        .next()
        .ok_or(ParseError::Missing("file"))?;

    let comments = CommentIndex::collect(source, &file);
    let mut out = SourceFile::default();

    for pair in file.into_inner() {
        match pair.as_rule() {
            Rule::package_clause => {
                out.package = first(pair, Rule::ident)?.as_str().to_string();
            }
            Rule::type_decl => {
                for spec in children(pair).filter(|p| p.as_rule() == Rule::type_spec) {
                    out.types.push(parse_type_spec(spec, &comments)?);
                }
            }
            _ => {}
        }
    }

    Ok(out)
}

fn parse_type_spec(pair: Pair<'_, Rule>, comments: &CommentIndex) -> Result<TypeDecl> {
    let mut name = None;
    let mut alias = false;
    let mut ty = None;
    let mut line = line_of(&pair);

    for inner in children(pair) {
        match inner.as_rule() {
            Rule::ident => {
                line = line_of(&inner);
                name = Some(inner.as_str().to_string());
            }
            Rule::alias_marker => alias = true,
            Rule::type_expr => ty = Some(parse_type_expr(inner, comments)?),
            _ => {}
        }
    }

    let doc = comments.doc_for(line);
    let second_closest = match doc {
        Some(group) => comments.ending_at(group.start_line.saturating_sub(2)),
        None => comments.ending_at(line.saturating_sub(2)),
    };

    Ok(TypeDecl {
        name: name.ok_or(ParseError::Missing("type name"))?,
        alias,
        ty: ty.ok_or(ParseError::Missing("type expression"))?,
        comment_lines: doc.map(|g| g.lines.clone()).unwrap_or_default(),
        second_closest_comment_lines: second_closest.map(|g| g.lines.clone()).unwrap_or_default(),
        line,
    })
}

fn parse_type_expr(pair: Pair<'_, Rule>, comments: &CommentIndex) -> Result<TypeExpr> {
    let inner = children(pair).next().ok_or(ParseError::Missing("type"))?;

    match inner.as_rule() {
        Rule::pointer_type => Ok(TypeExpr::Pointer(Box::new(nested(inner, comments)?))),
        Rule::slice_type => Ok(TypeExpr::Slice(Box::new(nested(inner, comments)?))),
        Rule::chan_type => Ok(TypeExpr::Chan(Box::new(nested(inner, comments)?))),
        Rule::paren_type => nested(inner, comments),
        Rule::array_type => {
            let mut len = String::new();
            let mut elem = None;
            for part in children(inner) {
                match part.as_rule() {
                    Rule::array_len => {
                        len = part.as_str().trim_matches(['[', ']']).trim().to_string();
                    }
                    Rule::type_expr => elem = Some(parse_type_expr(part, comments)?),
                    _ => {}
                }
            }
            Ok(TypeExpr::Array {
                len,
                elem: Box::new(elem.ok_or(ParseError::Missing("array element type"))?),
            })
        }
        Rule::map_type => {
            let mut types = children(inner).filter(|p| p.as_rule() == Rule::type_expr);
            let key = types.next().ok_or(ParseError::Missing("map key type"))?;
            let value = types.next().ok_or(ParseError::Missing("map value type"))?;
            Ok(TypeExpr::Map {
                key: Box::new(parse_type_expr(key, comments)?),
                value: Box::new(parse_type_expr(value, comments)?),
            })
        }
        Rule::func_type => Ok(TypeExpr::Func),
        Rule::interface_type => Ok(TypeExpr::Interface),
        Rule::struct_type => Ok(TypeExpr::Struct(parse_fields(inner, comments)?)),
        Rule::named_type => parse_named_type(inner),
        rule => Err(ParseError::UnexpectedRule(rule)),
    }
}

/// The single `type_expr` child of a wrapper rule
fn nested(pair: Pair<'_, Rule>, comments: &CommentIndex) -> Result<TypeExpr> {
    let inner = first(pair, Rule::type_expr)?;
    parse_type_expr(inner, comments)
}

fn parse_named_type(pair: Pair<'_, Rule>) -> Result<TypeExpr> {
    let mut first_ident = None;
    let mut qualified = None;
    for part in children(pair) {
        match part.as_rule() {
            Rule::ident => first_ident = Some(part.as_str().to_string()),
            Rule::qualified_name => qualified = Some(part.as_str().to_string()),
            _ => {}
        }
    }
    let first_ident = first_ident.ok_or(ParseError::Missing("type name"))?;

    Ok(match qualified {
        Some(name) => TypeExpr::Named {
            package: Some(first_ident),
            name,
        },
        None => TypeExpr::named(first_ident),
    })
}

fn parse_fields(pair: Pair<'_, Rule>, comments: &CommentIndex) -> Result<Vec<Member>> {
    let mut members = Vec::new();

    for field in children(pair).filter(|p| p.as_rule() == Rule::field_decl) {
        let line = line_of(&field);
        let comment_lines = comments
            .doc_for(line)
            .map(|g| g.lines.clone())
            .unwrap_or_default();

        let mut names = Vec::new();
        let mut embedded = false;
        let mut ty = None;
        let mut tags = String::new();

        for part in children(field) {
            match part.as_rule() {
                Rule::named_field => {
                    for item in children(part) {
                        match item.as_rule() {
                            Rule::ident_list => {
                                names = children(item).map(|i| i.as_str().to_string()).collect();
                            }
                            Rule::type_expr => ty = Some(parse_type_expr(item, comments)?),
                            _ => {}
                        }
                    }
                }
                Rule::embedded_field => {
                    embedded = true;
                    let mut pointer = false;
                    for item in children(part) {
                        match item.as_rule() {
                            Rule::embedded_pointer => pointer = true,
                            Rule::named_type => {
                                let named = parse_named_type(item)?;
                                if let TypeExpr::Named { name, .. } = &named {
                                    names = vec![name.clone()];
                                }
                                ty = Some(if pointer {
                                    TypeExpr::Pointer(Box::new(named))
                                } else {
                                    named
                                });
                            }
                            _ => {}
                        }
                    }
                }
                Rule::tag => tags = parse_tag(part)?,
                _ => {}
            }
        }

        let ty = ty.ok_or(ParseError::Missing("field type"))?;
        for name in names {
            members.push(Member {
                name,
                embedded,
                ty: ty.clone(),
                tags: tags.clone(),
                comment_lines: comment_lines.clone(),
                line,
            });
        }
    }

    Ok(members)
}

fn parse_tag(pair: Pair<'_, Rule>) -> Result<String> {
    let literal = children(pair).next().ok_or(ParseError::Missing("tag literal"))?;
    match literal.as_rule() {
        Rule::raw_string => {
            let raw = literal.as_str();
            Ok(raw[1..raw.len() - 1].to_string())
        }
        _ => unquote(literal.as_str()).map_err(|source| ParseError::InvalidTag {
            tag: literal.as_str().to_string(),
            source,
        }),
    }
}

/// Inner pairs without the comment tokens pest interleaves
fn children<'i>(pair: Pair<'i, Rule>) -> impl Iterator<Item = Pair<'i, Rule>> {
    pair.into_inner().filter(|p| p.as_rule() != Rule::COMMENT)
}

fn first<'i>(pair: Pair<'i, Rule>, rule: Rule) -> Result<Pair<'i, Rule>> {
    children(pair)
        .find(|p| p.as_rule() == rule)
        .ok_or(ParseError::Missing("child node"))
}

fn line_of(pair: &Pair<'_, Rule>) -> usize {
    pair.as_span().start_pos().line_col().0
}

// =============================================================================
// COMMENT GROUPING
// =============================================================================

#[derive(Debug, Clone)]
struct CommentGroup {
    start_line: usize,
    end_line: usize,
    lines: Vec<String>,
}

/// Comment groups keyed by the line they end on
///
/// Only comments that start their own line take part; trailing comments
/// after code never become documentation.
#[derive(Debug, Default)]
struct CommentIndex {
    by_end_line: HashMap<usize, CommentGroup>,
}

impl CommentIndex {
    fn collect(source: &str, file: &Pair<'_, Rule>) -> Self {
        let mut groups: Vec<CommentGroup> = Vec::new();

        for comment in file
            .clone()
            .into_inner()
            .flatten()
            .filter(|p| p.as_rule() == Rule::COMMENT)
        {
            let span = comment.as_span();
            let line_start = source[..span.start()].rfind('\n').map_or(0, |i| i + 1);
            if !source[line_start..span.start()].trim().is_empty() {
                continue;
            }

            let start_line = span.start_pos().line_col().0;
            let end_line = span.end_pos().line_col().0;
            let lines = comment_lines(comment.as_str());

            match groups.last_mut() {
                Some(group) if group.end_line + 1 == start_line => {
                    group.end_line = end_line;
                    group.lines.extend(lines);
                }
                _ => groups.push(CommentGroup {
                    start_line,
                    end_line,
                    lines,
                }),
            }
        }

        let by_end_line = groups
            .into_iter()
            .map(|mut g| {
                g.lines = tidy_lines(std::mem::take(&mut g.lines));
                (g.end_line, g)
            })
            .collect();
        Self { by_end_line }
    }

    fn ending_at(&self, line: usize) -> Option<&CommentGroup> {
        if line == 0 {
            return None;
        }
        self.by_end_line.get(&line)
    }

    /// The group ending on the line right above `line`
    fn doc_for(&self, line: usize) -> Option<&CommentGroup> {
        self.ending_at(line.saturating_sub(1))
    }
}

/// Text lines of one comment with the markers removed
fn comment_lines(text: &str) -> Vec<String> {
    if let Some(body) = text.strip_prefix("//") {
        if is_directive(body) {
            return Vec::new();
        }
        let body = body.strip_prefix(' ').unwrap_or(body);
        return vec![body.trim_end().to_string()];
    }

    let body = text
        .strip_prefix("/*")
        .and_then(|t| t.strip_suffix("*/"))
        .unwrap_or(text);
    body.lines().map(|l| l.trim_end().to_string()).collect()
}

/// Tool directives such as `//go:generate` are not documentation
fn is_directive(body: &str) -> bool {
    if ["line ", "extern ", "export "].iter().any(|p| body.starts_with(p)) {
        return true;
    }
    match body.split_once(':') {
        Some((head, tail)) => {
            !head.is_empty()
                && head.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
                && tail.starts_with(|c: char| c.is_ascii_lowercase() || c.is_ascii_digit())
        }
        None => false,
    }
}

/// Drop leading and trailing blank lines and collapse blank runs
fn tidy_lines(lines: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(lines.len());
    for line in lines {
        if line.is_empty() && out.last().is_none_or(|l| l.is_empty()) {
            continue;
        }
        out.push(line);
    }
    while out.last().is_some_and(|l| l.is_empty()) {
        out.pop();
    }
    out
}
