use std::fmt;

use serde::Serialize;

/// Argument substituted into a message template.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MessageArg {
    Str(String),
    Int(i64),
    Float(f64),
}

impl MessageArg {
    fn as_integer(&self) -> i64 {
        match self {
            MessageArg::Int(value) => *value,
            MessageArg::Float(value) => value.trunc() as i64,
            MessageArg::Str(value) => value
                .trim()
                .parse::<f64>()
                .map(|parsed| parsed.trunc() as i64)
                .unwrap_or(0),
        }
    }
}

impl fmt::Display for MessageArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageArg::Str(value) => f.write_str(value),
            MessageArg::Int(value) => write!(f, "{value}"),
            MessageArg::Float(value) => write!(f, "{value}"),
        }
    }
}

impl From<&str> for MessageArg {
    fn from(value: &str) -> Self {
        MessageArg::Str(value.to_string())
    }
}

impl From<String> for MessageArg {
    fn from(value: String) -> Self {
        MessageArg::Str(value)
    }
}

impl From<i64> for MessageArg {
    fn from(value: i64) -> Self {
        MessageArg::Int(value)
    }
}

impl From<u32> for MessageArg {
    fn from(value: u32) -> Self {
        MessageArg::Int(i64::from(value))
    }
}

impl From<usize> for MessageArg {
    fn from(value: usize) -> Self {
        MessageArg::Int(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<f64> for MessageArg {
    fn from(value: f64) -> Self {
        MessageArg::Float(value)
    }
}

/// Render a printf-style template.
///
/// Supports `%s` (display form), `%d` (integer form) and `%%`. Placeholders
/// without a matching argument are kept verbatim.
pub fn render_template(template: &str, args: &[MessageArg]) -> String {
    let mut out = String::with_capacity(template.len() + 16);
    let mut args = args.iter();
    let mut chars = template.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '%' {
            out.push(ch);
            continue;
        }

        match chars.peek().copied() {
            Some('%') => {
                chars.next();
                out.push('%');
            }
            Some(spec @ ('s' | 'd')) => {
                chars.next();
                match args.next() {
                    Some(arg) if spec == 'd' => out.push_str(&arg.as_integer().to_string()),
                    Some(arg) => out.push_str(&arg.to_string()),
                    None => {
                        out.push('%');
                        out.push(spec);
                    }
                }
            }
            _ => out.push('%'),
        }
    }

    out
}
