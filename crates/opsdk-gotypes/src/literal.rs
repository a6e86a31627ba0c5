//! Go literal helpers: string unquoting and struct tag parsing

use thiserror::Error;

/// Error returned for malformed Go literals
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LiteralError {
    #[error("invalid syntax")]
    InvalidSyntax,

    #[error("bad syntax for struct tag pair")]
    TagSyntax,

    #[error("bad syntax for struct tag key")]
    TagKeySyntax,

    #[error("bad syntax for struct tag value")]
    TagValueSyntax,
}

/// Interpret a Go string literal: `"..."` with escapes, `` `...` `` raw,
/// or a single-rune `'...'` literal.
pub fn unquote(s: &str) -> Result<String, LiteralError> {
    let mut chars = s.chars();
    let (first, last) = match (chars.next(), chars.next_back()) {
        (Some(f), Some(l)) => (f, l),
        _ => return Err(LiteralError::InvalidSyntax),
    };
    if first != last {
        return Err(LiteralError::InvalidSyntax);
    }
    let body = &s[first.len_utf8()..s.len() - last.len_utf8()];

    match first {
        '`' => {
            if body.contains('`') {
                return Err(LiteralError::InvalidSyntax);
            }
            Ok(body.replace('\r', ""))
        }
        '"' => unescape(body, '"'),
        '\'' => {
            let value = unescape(body, '\'')?;
            if value.chars().count() != 1 {
                return Err(LiteralError::InvalidSyntax);
            }
            Ok(value)
        }
        _ => Err(LiteralError::InvalidSyntax),
    }
}

fn unescape(body: &str, quote: char) -> Result<String, LiteralError> {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();

    while let Some(c) = chars.next() {
        if c == quote || c == '\n' {
            return Err(LiteralError::InvalidSyntax);
        }
        if c != '\\' {
            out.push(c);
            continue;
        }

        let escaped = chars.next().ok_or(LiteralError::InvalidSyntax)?;
        match escaped {
            'a' => out.push('\u{07}'),
            'b' => out.push('\u{08}'),
            'f' => out.push('\u{0C}'),
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            't' => out.push('\t'),
            'v' => out.push('\u{0B}'),
            '\\' => out.push('\\'),
            '\'' | '"' if escaped == quote => out.push(escaped),
            'x' => out.push(hex_escape(&mut chars, 2)?),
            'u' => out.push(hex_escape(&mut chars, 4)?),
            'U' => out.push(hex_escape(&mut chars, 8)?),
            '0'..='7' => {
                let mut value = escaped.to_digit(8).unwrap_or(0);
                for _ in 0..2 {
                    let digit = chars
                        .next()
                        .and_then(|d| d.to_digit(8))
                        .ok_or(LiteralError::InvalidSyntax)?;
                    value = value * 8 + digit;
                }
                if value > 255 {
                    return Err(LiteralError::InvalidSyntax);
                }
                out.push(char::from_u32(value).ok_or(LiteralError::InvalidSyntax)?);
            }
            _ => return Err(LiteralError::InvalidSyntax),
        }
    }

    Ok(out)
}

fn hex_escape(chars: &mut std::str::Chars<'_>, digits: usize) -> Result<char, LiteralError> {
    let mut value = 0u32;
    for _ in 0..digits {
        let digit = chars
            .next()
            .and_then(|d| d.to_digit(16))
            .ok_or(LiteralError::InvalidSyntax)?;
        value = value * 16 + digit;
    }
    char::from_u32(value).ok_or(LiteralError::InvalidSyntax)
}

// =============================================================================
// STRUCT TAGS
// =============================================================================

/// One `key:"name,opt1,opt2"` entry of a struct tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructTag {
    pub key: String,
    pub name: String,
    pub options: Vec<String>,
}

impl StructTag {
    pub fn has_option(&self, option: &str) -> bool {
        self.options.iter().any(|o| o == option)
    }
}

/// Parse a raw struct tag such as `` json:"size,omitempty" protobuf:"varint,1" ``
pub fn parse_struct_tags(tag: &str) -> Result<Vec<StructTag>, LiteralError> {
    let mut tags = Vec::new();
    let mut rest = tag;

    loop {
        rest = rest.trim_start_matches(' ');
        if rest.is_empty() {
            break;
        }

        let key_end = rest
            .find(|c: char| c <= ' ' || c == ':' || c == '"' || c == '\u{7f}')
            .unwrap_or(rest.len());
        if key_end == 0 {
            return Err(LiteralError::TagKeySyntax);
        }
        if key_end + 1 >= rest.len() || !rest[key_end..].starts_with(":\"") {
            return Err(LiteralError::TagSyntax);
        }
        let key = &rest[..key_end];
        rest = &rest[key_end + 1..];

        // Scan the quoted value, honouring escapes
        let mut end = None;
        let mut escaped = false;
        for (i, c) in rest.char_indices().skip(1) {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                end = Some(i);
                break;
            }
        }
        let end = end.ok_or(LiteralError::TagValueSyntax)?;
        let value = unquote(&rest[..=end]).map_err(|_| LiteralError::TagValueSyntax)?;
        rest = &rest[end + 1..];

        let mut parts = value.split(',');
        let name = parts.next().unwrap_or_default().to_string();
        tags.push(StructTag {
            key: key.to_string(),
            name,
            options: parts.map(String::from).collect(),
        });
    }

    Ok(tags)
}
