//! Quote-aware SQL statement splitter.
//!
//! A small state machine walks the body once. A `;` terminates a statement
//! only in the normal state: inside a single-quoted literal, an `E'...'`
//! escape string, a `$tag$` dollar-quoted string, a double-quoted
//! identifier, a `--` line comment or a `/* */` block comment it is plain
//! text. Doubled quotes (`'it''s'`) stay inside the literal. Backslash
//! escapes only inside escape strings. Block comments nest.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State<'a> {
    Normal,
    SingleQuote,
    EscapeString,
    DollarQuote(&'a str),
    DoubleQuote,
    LineComment,
    BlockComment(usize),
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$' || b >= 0x80
}

/// Delimiter of a dollar quote opening at `i` (`$$` or `$tag$`), if any.
///
/// A `$` that continues an identifier, or is followed by a digit (a
/// positional parameter such as `$1`), opens nothing.
fn dollar_delimiter(body: &str, i: usize) -> Option<&str> {
    let bytes = body.as_bytes();
    if i > 0 && is_ident_byte(bytes[i - 1]) {
        return None;
    }
    let mut j = i + 1;
    while j < bytes.len() && (bytes[j].is_ascii_alphanumeric() || bytes[j] == b'_') {
        if j == i + 1 && bytes[j].is_ascii_digit() {
            return None;
        }
        j += 1;
    }
    (bytes.get(j) == Some(&b'$')).then(|| &body[i..=j])
}

/// `'` at `i` opens an escape string when prefixed by a lone `E` or `e`.
fn opens_escape_string(bytes: &[u8], i: usize) -> bool {
    match i {
        0 => false,
        1 => matches!(bytes[0], b'e' | b'E'),
        _ => matches!(bytes[i - 1], b'e' | b'E') && !is_ident_byte(bytes[i - 2]),
    }
}

/// Split a unit body into individual statements.
///
/// Returned statements are trimmed and carry no trailing `;`. Fragments that
/// contain only whitespace or comments are dropped. An unterminated quote or
/// comment runs to the end of the body and is returned as the last statement
/// so the database reports the error.
pub fn split_statements(body: &str) -> Vec<String> {
    let bytes = body.as_bytes();
    let mut statements = Vec::new();
    let mut state = State::Normal;
    let mut start = 0;
    let mut has_code = false;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        let next = bytes.get(i + 1).copied();

        match state {
            State::Normal => match b {
                b';' => {
                    if has_code {
                        statements.push(body[start..i].trim().to_string());
                    }
                    start = i + 1;
                    has_code = false;
                }
                b'\'' => {
                    state = if opens_escape_string(bytes, i) {
                        State::EscapeString
                    } else {
                        State::SingleQuote
                    };
                    has_code = true;
                }
                b'"' => {
                    state = State::DoubleQuote;
                    has_code = true;
                }
                b'$' => {
                    has_code = true;
                    if let Some(delimiter) = dollar_delimiter(body, i) {
                        state = State::DollarQuote(delimiter);
                        i += delimiter.len() - 1;
                    }
                }
                b'-' if next == Some(b'-') => {
                    state = State::LineComment;
                    i += 1;
                }
                b'/' if next == Some(b'*') => {
                    state = State::BlockComment(1);
                    i += 1;
                }
                _ if !b.is_ascii_whitespace() => has_code = true,
                _ => {}
            },
            State::SingleQuote | State::EscapeString => {
                if b == b'\\' && state == State::EscapeString {
                    i += 1;
                } else if b == b'\'' {
                    if next == Some(b'\'') {
                        i += 1;
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::DollarQuote(delimiter) => {
                if bytes[i..].starts_with(delimiter.as_bytes()) {
                    state = State::Normal;
                    i += delimiter.len() - 1;
                }
            }
            State::DoubleQuote => {
                if b == b'"' {
                    if next == Some(b'"') {
                        i += 1;
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::LineComment => {
                if b == b'\n' {
                    state = State::Normal;
                }
            }
            State::BlockComment(depth) => {
                if b == b'/' && next == Some(b'*') {
                    state = State::BlockComment(depth + 1);
                    i += 1;
                } else if b == b'*' && next == Some(b'/') {
                    state = if depth > 1 {
                        State::BlockComment(depth - 1)
                    } else {
                        State::Normal
                    };
                    i += 1;
                }
            }
        }
        i += 1;
    }

    if has_code {
        statements.push(body[start..].trim().to_string());
    }

    statements
}

#[cfg(test)]
#[path = "splitter_test.rs"]
mod tests;
