use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use colguard_core::{Error, Result};

/// ASCII character classes, as in the C `ctype` functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum CtypeKind {
    Alnum,
    Alpha,
    Cntrl,
    Digit,
    Graph,
    Lower,
    Print,
    Punct,
    Space,
    Upper,
    Xdigit,
}

impl CtypeKind {
    pub const ALL: [CtypeKind; 11] = [
        CtypeKind::Alnum,
        CtypeKind::Alpha,
        CtypeKind::Cntrl,
        CtypeKind::Digit,
        CtypeKind::Graph,
        CtypeKind::Lower,
        CtypeKind::Print,
        CtypeKind::Punct,
        CtypeKind::Space,
        CtypeKind::Upper,
        CtypeKind::Xdigit,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CtypeKind::Alnum => "alnum",
            CtypeKind::Alpha => "alpha",
            CtypeKind::Cntrl => "cntrl",
            CtypeKind::Digit => "digit",
            CtypeKind::Graph => "graph",
            CtypeKind::Lower => "lower",
            CtypeKind::Print => "print",
            CtypeKind::Punct => "punct",
            CtypeKind::Space => "space",
            CtypeKind::Upper => "upper",
            CtypeKind::Xdigit => "xdigit",
        }
    }

    /// True when `text` is non-empty and every character is in the class.
    pub fn matches(self, text: &str) -> bool {
        !text.is_empty() && text.chars().all(|ch| self.contains(ch))
    }

    fn contains(self, ch: char) -> bool {
        match self {
            CtypeKind::Alnum => ch.is_ascii_alphanumeric(),
            CtypeKind::Alpha => ch.is_ascii_alphabetic(),
            CtypeKind::Cntrl => ch.is_ascii_control(),
            CtypeKind::Digit => ch.is_ascii_digit(),
            CtypeKind::Graph => ch.is_ascii_graphic(),
            CtypeKind::Lower => ch.is_ascii_lowercase(),
            CtypeKind::Print => ch.is_ascii_graphic() || ch == ' ',
            CtypeKind::Punct => ch.is_ascii_punctuation(),
            // \x0b (vertical tab) is whitespace for ctype but not for is_ascii_whitespace.
            CtypeKind::Space => ch.is_ascii_whitespace() || ch == '\x0b',
            CtypeKind::Upper => ch.is_ascii_uppercase(),
            CtypeKind::Xdigit => ch.is_ascii_hexdigit(),
        }
    }
}

impl FromStr for CtypeKind {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self> {
        CtypeKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == name)
            .ok_or_else(|| Error::InvalidRule(format!("invalid type: {name}")))
    }
}

impl fmt::Display for CtypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
