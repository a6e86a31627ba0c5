//! Display-name formatting

const WORD_SEPARATORS: [char; 4] = ['.', '-', '_', ' '];

/// Turn an identifier in snake, kebab, camel, dotted or spaced form into a
/// space-delimited, title-cased display name.
///
/// `"another-_AppOperator_againTwiceThrice More"` becomes
/// `"Another App Operator Again Twice Thrice More"`.
pub fn display_name(name: &str) -> String {
    let mut joined = name.to_string();
    for sep in WORD_SEPARATORS {
        joined = joined
            .split(sep)
            .filter(|part| !part.is_empty())
            .map(str::trim)
            .collect::<Vec<_>>()
            .join(" ");
    }

    let spaced: Vec<String> = joined.split(' ').map(split_camel_case).collect();
    title_case(&spaced.join(" ")).trim().to_string()
}

/// Insert a space before every uppercase letter that follows a
/// non-uppercase one, so runs of capitals stay together.
fn split_camel_case(word: &str) -> String {
    let mut out = String::with_capacity(word.len() + 4);
    let mut prev: Option<char> = None;
    for c in word.chars() {
        if c.is_uppercase() && prev.is_some_and(|p| !p.is_uppercase()) {
            out.push(' ');
        }
        out.push(c);
        prev = Some(c);
    }
    out
}

fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut at_word_start = true;
    for c in s.chars() {
        if at_word_start {
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
        at_word_start = !(c.is_alphanumeric() || c == '_');
    }
    out
}
