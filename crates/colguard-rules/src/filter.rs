//! Semantic filters used by the rule catalog.
//!
//! Each filter checks the scalar string form of a value and answers yes or
//! no; rules turn a "no" into a violation.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

use bitflags::bitflags;
use once_cell::sync::Lazy;
use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use url::Url;

use colguard_core::{Error, Result};

static EMAIL_LOCAL_ASCII: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+(?:\.[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+)*$")
        .expect("valid email local-part pattern")
});

static EMAIL_LOCAL_UNICODE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]|[^\x00-\x7F])+(?:\.(?:[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]|[^\x00-\x7F])+)*$",
    )
    .expect("valid unicode email local-part pattern")
});

static EMAIL_LOCAL_QUOTED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^"(?:[\x20\x21\x23-\x5B\x5D-\x7E]|\\[\x20-\x7E])*"$"#)
        .expect("valid quoted local-part pattern")
});

/// Named filter kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FilterKind {
    Int,
    Float,
    Regexp,
    Url,
    Domain,
    Email,
    Ip,
    Mac,
}

impl FilterKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FilterKind::Int => "int",
            FilterKind::Float => "float",
            FilterKind::Regexp => "regexp",
            FilterKind::Url => "url",
            FilterKind::Domain => "domain",
            FilterKind::Email => "email",
            FilterKind::Ip => "ip",
            FilterKind::Mac => "mac",
        }
    }
}

impl FromStr for FilterKind {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self> {
        let kind = match name {
            "int" => FilterKind::Int,
            "float" => FilterKind::Float,
            "regexp" => FilterKind::Regexp,
            "url" => FilterKind::Url,
            "domain" => FilterKind::Domain,
            "email" => FilterKind::Email,
            "ip" => FilterKind::Ip,
            "mac" => FilterKind::Mac,
            other => return Err(Error::InvalidRule(format!("unknown filter '{other}'"))),
        };
        Ok(kind)
    }
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

bitflags! {
    /// Behavior switches for the filters.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FilterFlags: u32 {
        const ALLOW_OCTAL = 1 << 0;
        const ALLOW_HEX = 1 << 1;
        const ALLOW_THOUSAND = 1 << 2;
        const IPV4 = 1 << 3;
        const IPV6 = 1 << 4;
        const NO_PRIV_RANGE = 1 << 5;
        const NO_RES_RANGE = 1 << 6;
        const PATH_REQUIRED = 1 << 7;
        const QUERY_REQUIRED = 1 << 8;
        const HOSTNAME = 1 << 9;
        const EMAIL_UNICODE = 1 << 10;
    }
}

impl FilterFlags {
    /// Parse a flag by name, case-insensitively (`allow_hex`, `IPV4`, ...).
    pub fn parse_name(name: &str) -> Result<Self> {
        Self::from_name(&name.trim().to_ascii_uppercase())
            .ok_or_else(|| Error::InvalidRule(format!("unknown filter flag '{name}'")))
    }
}

/// Filter options. Ranges are inclusive.
#[derive(Debug, Clone, Default)]
pub struct FilterOptions {
    pub min_range: Option<f64>,
    pub max_range: Option<f64>,
    pub regexp: Option<Regex>,
    /// Decimal separator for `float`; defaults to `.`.
    pub decimal: Option<char>,
    /// Group separator for `mac`; any of `:`, `-`, `.` when unset.
    pub separator: Option<char>,
}

impl FilterOptions {
    pub fn range(min_range: Option<f64>, max_range: Option<f64>) -> Self {
        Self {
            min_range,
            max_range,
            ..Self::default()
        }
    }

    fn in_range(&self, value: f64) -> bool {
        self.min_range.is_none_or(|min| value >= min)
            && self.max_range.is_none_or(|max| value <= max)
    }
}

/// Check the configuration a filter kind depends on.
pub fn check_filter_config(kind: FilterKind, options: &FilterOptions) -> Result<()> {
    if kind == FilterKind::Regexp && options.regexp.is_none() {
        return Err(Error::InvalidRule(
            "regexp filter requires a 'regexp' option".to_string(),
        ));
    }
    if let (Some(min), Some(max)) = (options.min_range, options.max_range) {
        if min > max {
            return Err(Error::InvalidRule(format!(
                "min_range {min} is greater than max_range {max}"
            )));
        }
    }
    if let Some(decimal) = options.decimal {
        if decimal.is_ascii_digit() {
            return Err(Error::InvalidRule(format!(
                "decimal separator '{decimal}' must not be a digit"
            )));
        }
    }
    Ok(())
}

/// Run the named filter over `input`.
pub fn apply_filter(
    kind: FilterKind,
    input: &str,
    options: &FilterOptions,
    flags: FilterFlags,
) -> bool {
    match kind {
        FilterKind::Int => parse_int(input, flags).is_some_and(|value| options.in_range(value as f64)),
        FilterKind::Float => {
            parse_float(input, options.decimal.unwrap_or('.'), flags)
                .is_some_and(|value| options.in_range(value))
        }
        FilterKind::Regexp => options
            .regexp
            .as_ref()
            .is_some_and(|regexp| regexp.is_match(input)),
        FilterKind::Url => is_valid_url(input, flags),
        FilterKind::Domain => is_valid_domain(input, flags.contains(FilterFlags::HOSTNAME)),
        FilterKind::Email => is_valid_email(input, flags.contains(FilterFlags::EMAIL_UNICODE)),
        FilterKind::Ip => is_valid_ip(input, flags),
        FilterKind::Mac => is_valid_mac(input, options.separator),
    }
}

/// Parse an integer in decimal notation, or octal/hex when allowed.
pub fn parse_int(input: &str, flags: FilterFlags) -> Option<i64> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }

    if flags.contains(FilterFlags::ALLOW_HEX) {
        if let Some(hex) = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
        {
            if hex.is_empty() || !hex.chars().all(|ch| ch.is_ascii_hexdigit()) {
                return None;
            }
            return i64::from_str_radix(hex, 16).ok();
        }
    }

    if flags.contains(FilterFlags::ALLOW_OCTAL) && trimmed.len() > 1 && trimmed.starts_with('0') {
        let octal = trimmed
            .strip_prefix("0o")
            .or_else(|| trimmed.strip_prefix("0O"))
            .unwrap_or(&trimmed[1..]);
        if octal.is_empty() || !octal.chars().all(|ch| ('0'..='7').contains(&ch)) {
            return None;
        }
        return i64::from_str_radix(octal, 8).ok();
    }

    let digits = trimmed
        .strip_prefix('-')
        .or_else(|| trimmed.strip_prefix('+'))
        .unwrap_or(trimmed);
    if digits.is_empty() || !digits.chars().all(|ch| ch.is_ascii_digit()) {
        return None;
    }
    if digits.len() > 1 && digits.starts_with('0') {
        return None;
    }
    trimmed.parse::<i64>().ok()
}

/// Parse a float in decimal or exponent notation.
pub fn parse_float(input: &str, decimal: char, flags: FilterFlags) -> Option<f64> {
    let trimmed = input.trim();
    let (sign, unsigned) = match trimmed.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };

    let (mantissa, exponent) = match unsigned.find(['e', 'E']) {
        Some(idx) => (&unsigned[..idx], Some(&unsigned[idx + 1..])),
        None => (unsigned, None),
    };
    let (int_part, frac_part) = match mantissa.split_once(decimal) {
        Some((int_part, frac_part)) => (int_part, frac_part),
        None => (mantissa, ""),
    };

    if int_part.is_empty() && frac_part.is_empty() {
        return None;
    }

    let int_digits = if int_part.contains(',') {
        if !flags.contains(FilterFlags::ALLOW_THOUSAND) || !is_thousand_grouped(int_part) {
            return None;
        }
        int_part.replace(',', "")
    } else {
        int_part.to_string()
    };

    if !int_digits.chars().all(|ch| ch.is_ascii_digit())
        || !frac_part.chars().all(|ch| ch.is_ascii_digit())
    {
        return None;
    }

    let mut normalized = format!("{sign}{}", if int_digits.is_empty() { "0" } else { &int_digits });
    if !frac_part.is_empty() {
        normalized.push('.');
        normalized.push_str(frac_part);
    }
    if let Some(exponent) = exponent {
        let digits = exponent
            .strip_prefix('-')
            .or_else(|| exponent.strip_prefix('+'))
            .unwrap_or(exponent);
        if digits.is_empty() || !digits.chars().all(|ch| ch.is_ascii_digit()) {
            return None;
        }
        normalized.push('e');
        normalized.push_str(exponent);
    }

    normalized.parse::<f64>().ok().filter(|value| value.is_finite())
}

fn is_thousand_grouped(int_part: &str) -> bool {
    let mut groups = int_part.split(',');
    let Some(head) = groups.next() else {
        return false;
    };
    (1..=3).contains(&head.len())
        && head.chars().all(|ch| ch.is_ascii_digit())
        && groups.all(|group| group.len() == 3 && group.chars().all(|ch| ch.is_ascii_digit()))
}

pub fn is_valid_url(input: &str, flags: FilterFlags) -> bool {
    if input.is_empty()
        || !input.is_ascii()
        || input.chars().any(|ch| ch.is_ascii_whitespace() || ch.is_ascii_control())
    {
        return false;
    }

    let Ok(url) = Url::parse(input) else {
        return false;
    };

    if matches!(url.scheme(), "http" | "https") && url.host_str().is_none_or(str::is_empty) {
        return false;
    }
    if flags.contains(FilterFlags::PATH_REQUIRED) && !has_explicit_path(input) {
        return false;
    }
    if flags.contains(FilterFlags::QUERY_REQUIRED) && url.query().is_none() {
        return false;
    }
    true
}

// The url crate normalizes an empty path to "/", so look at the raw input.
fn has_explicit_path(input: &str) -> bool {
    let Some((_, rest)) = input.split_once(':') else {
        return false;
    };
    let rest = match rest.strip_prefix("//") {
        Some(authority_and_path) => match authority_and_path.find(['/', '?', '#']) {
            Some(idx) => &authority_and_path[idx..],
            None => "",
        },
        None => rest,
    };
    let path_end = rest.find(['?', '#']).unwrap_or(rest.len());
    !rest[..path_end].is_empty()
}

pub fn is_valid_domain(input: &str, hostname: bool) -> bool {
    let domain = input.strip_suffix('.').unwrap_or(input);
    if domain.is_empty() || domain.len() > 253 {
        return false;
    }
    domain.split('.').all(|label| {
        if label.is_empty() || label.len() > 63 {
            return false;
        }
        if !hostname {
            return true;
        }
        label.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '-')
            && !label.starts_with('-')
            && !label.ends_with('-')
    })
}

pub fn is_valid_email(input: &str, unicode: bool) -> bool {
    if input.len() > 320 {
        return false;
    }
    let Some((local, domain)) = input.rsplit_once('@') else {
        return false;
    };
    if local.is_empty() || local.len() > 64 {
        return false;
    }

    let local_ok = if local.starts_with('"') {
        EMAIL_LOCAL_QUOTED.is_match(local)
    } else if unicode {
        EMAIL_LOCAL_UNICODE.is_match(local)
    } else {
        EMAIL_LOCAL_ASCII.is_match(local)
    };
    if !local_ok {
        return false;
    }

    if let Some(literal) = domain.strip_prefix('[').and_then(|d| d.strip_suffix(']')) {
        return match literal.strip_prefix("IPv6:") {
            Some(v6) => v6.parse::<Ipv6Addr>().is_ok(),
            None => literal.parse::<Ipv4Addr>().is_ok(),
        };
    }

    domain.contains('.') && !domain.ends_with('.') && is_valid_domain(domain, true)
}

pub fn is_valid_ip(input: &str, flags: FilterFlags) -> bool {
    let Ok(addr) = input.parse::<IpAddr>() else {
        return false;
    };

    let restrict_family = flags.intersects(FilterFlags::IPV4 | FilterFlags::IPV6);
    let no_priv = flags.contains(FilterFlags::NO_PRIV_RANGE);
    let no_res = flags.contains(FilterFlags::NO_RES_RANGE);

    match addr {
        IpAddr::V4(v4) => {
            if restrict_family && !flags.contains(FilterFlags::IPV4) {
                return false;
            }
            !(no_priv && v4.is_private()) && !(no_res && is_reserved_v4(v4))
        }
        IpAddr::V6(v6) => {
            if restrict_family && !flags.contains(FilterFlags::IPV6) {
                return false;
            }
            !(no_priv && is_private_v6(v6)) && !(no_res && is_reserved_v6(v6))
        }
    }
}

fn is_reserved_v4(addr: Ipv4Addr) -> bool {
    let first = addr.octets()[0];
    first == 0 || first >= 240 || addr.is_loopback() || addr.is_link_local()
}

fn is_private_v6(addr: Ipv6Addr) -> bool {
    addr.segments()[0] & 0xfe00 == 0xfc00
}

fn is_reserved_v6(addr: Ipv6Addr) -> bool {
    addr.is_loopback()
        || addr.is_unspecified()
        || addr.to_ipv4_mapped().is_some()
        || addr.segments()[0] & 0xffc0 == 0xfe80
}

pub fn is_valid_mac(input: &str, separator: Option<char>) -> bool {
    let (group_len, groups, sep) = match input.len() {
        14 => (4, 3, '.'),
        17 => {
            let sep = input.chars().nth(2).unwrap_or(':');
            if sep != ':' && sep != '-' {
                return false;
            }
            (2, 6, sep)
        }
        _ => return false,
    };
    if separator.is_some_and(|expected| expected != sep) {
        return false;
    }

    let parts: Vec<&str> = input.split(sep).collect();
    parts.len() == groups
        && parts
            .iter()
            .all(|part| part.len() == group_len && part.chars().all(|ch| ch.is_ascii_hexdigit()))
}
