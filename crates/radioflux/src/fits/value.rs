use std::fmt;

/// A typed FITS header value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// FITS logical value (`T` or `F`).
    Logical(bool),
    /// FITS integer value.
    Integer(i64),
    /// FITS floating-point value.
    Float(f64),
    /// FITS character string, trailing blanks removed.
    String(String),
}

impl Value {
    /// Numeric view of the value; integers are promoted to `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Integer(n) => Some(*n as f64),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Logical(true) => write!(f, "T"),
            Value::Logical(false) => write!(f, "F"),
            Value::Integer(n) => write!(f, "{n}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::String(s) => write!(f, "{s}"),
        }
    }
}

/// Find the ` /` comment separator in the text that follows a value.
fn trailing_comment(rest: &str) -> Option<&str> {
    let idx = rest.find(" /").or_else(|| rest.starts_with('/').then_some(0))?;
    let after = &rest[idx..];
    let after = after.trim_start().trim_start_matches('/');
    let comment = after.strip_prefix(' ').unwrap_or(after).trim_end();
    (!comment.is_empty()).then_some(comment)
}

/// Read a quoted string value. `''` inside the quotes is a literal quote.
fn parse_string(field: &str) -> Option<(Value, Option<&str>)> {
    let body = field.strip_prefix('\'')?;
    let mut value = String::new();
    let mut chars = body.char_indices().peekable();
    let mut end = body.len();

    while let Some((i, c)) = chars.next() {
        if c == '\'' {
            if matches!(chars.peek(), Some((_, '\''))) {
                value.push('\'');
                chars.next();
            } else {
                end = i + 1;
                break;
            }
        } else {
            value.push(c);
        }
    }

    let trimmed = value.trim_end().to_string();
    Some((Value::String(trimmed), trailing_comment(&body[end..])))
}

/// Parse a float string, accepting the FITS `D` exponent.
pub(crate) fn parse_float(s: &str) -> Option<f64> {
    s.replace(['D', 'd'], "E").parse::<f64>().ok()
}

/// Parse the value field of a card (bytes 10..80) into a [`Value`] and an
/// optional comment.
///
/// Returns `None` for an undefined value (only blanks before the comment).
pub fn parse_value(field: &str) -> Option<(Value, Option<&str>)> {
    let trimmed = field.trim_start();
    if trimmed.starts_with('\'') {
        return parse_string(trimmed);
    }

    let (text, comment) = match trimmed.find('/') {
        Some(idx) => (&trimmed[..idx], trailing_comment(&trimmed[idx..])),
        None => (trimmed, None),
    };
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    let value = match text {
        "T" => Value::Logical(true),
        "F" => Value::Logical(false),
        _ if !text.contains(['.', 'E', 'e', 'D', 'd']) => match text.parse::<i64>() {
            Ok(n) => Value::Integer(n),
            Err(_) => Value::Float(parse_float(text)?),
        },
        _ => Value::Float(parse_float(text)?),
    };
    Some((value, comment))
}

/// Format a value into the 70-byte value field of a card, right-justifying
/// numbers and logicals to column 30 as the fixed format requires.
pub fn format_value(value: &Value) -> String {
    match value {
        Value::Logical(b) => format!("{:>20}", if *b { "T" } else { "F" }),
        Value::Integer(n) => format!("{n:>20}"),
        Value::Float(v) => format!("{:>20}", format_float(*v)),
        Value::String(s) => {
            let escaped = s.replace('\'', "''");
            format!("'{escaped:<8}'")
        }
    }
}

fn format_float(v: f64) -> String {
    let s = format!("{v:E}");
    if s.contains('.') {
        s
    } else {
        s.replacen('E', ".0E", 1)
    }
}
