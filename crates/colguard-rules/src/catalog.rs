//! The built-in rule variants.
//!
//! Every rule carries a message template whose first argument is the field
//! name, and a [`RuleScope`] telling which write modes it runs for.

use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;

use colguard_core::{
    Charset, ColumnRule, Error, FieldContext, FieldType, MessageArg, Mode, Result, RuleKind,
    ValidationError, ViolationKind, text_length,
};

use crate::ctype::CtypeKind;
use crate::filter::{
    FilterFlags, FilterKind, FilterOptions, apply_filter, check_filter_config, is_valid_email,
    is_valid_ip, is_valid_url, parse_float, parse_int,
};

static SLUG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^[a-z0-9][-_a-z0-9]*[a-z0-9]$").expect("valid slug pattern")
});

/// Write modes a rule runs for. Both are on by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleScope {
    pub on_insert: bool,
    pub on_update: bool,
}

impl Default for RuleScope {
    fn default() -> Self {
        Self {
            on_insert: true,
            on_update: true,
        }
    }
}

impl RuleScope {
    pub fn applies_on(self, mode: Mode) -> bool {
        match mode {
            Mode::Insert => self.on_insert,
            Mode::Update => self.on_update,
        }
    }
}

macro_rules! rule_common {
    ($rule:ty) => {
        impl $rule {
            /// Replace the default message template.
            pub fn with_message(mut self, message: impl Into<String>) -> Self {
                self.message = message.into();
                self
            }

            pub fn on_insert(mut self, enabled: bool) -> Self {
                self.scope.on_insert = enabled;
                self
            }

            pub fn on_update(mut self, enabled: bool) -> Self {
                self.scope.on_update = enabled;
                self
            }

            pub fn message(&self) -> &str {
                &self.message
            }

            pub fn scope(&self) -> RuleScope {
                self.scope
            }
        }

        impl CommonConfig for $rule {
            fn with_common(mut self, message: Option<&str>, scope: RuleScope) -> Self {
                if let Some(message) = message {
                    self.message = message.to_string();
                }
                self.scope = scope;
                self
            }
        }
    };
}

/// Settings every rule shares, applied when building rules from declarations.
pub(crate) trait CommonConfig: Sized {
    fn with_common(self, message: Option<&str>, scope: RuleScope) -> Self;
}

fn rule_error(ctx: &FieldContext<'_>, kind: RuleKind, message: &str) -> ValidationError {
    ctx.fail(ViolationKind::Rule(kind), message)
}

/// Accepts addr-spec e-mail addresses.
#[derive(Debug, Clone)]
pub struct Email {
    pub unicode: bool,
    message: String,
    scope: RuleScope,
}

impl Email {
    pub const DEFAULT_MESSAGE: &'static str = "%s: is invalid e-mail address";

    pub fn new() -> Self {
        Self {
            unicode: false,
            message: Self::DEFAULT_MESSAGE.to_string(),
            scope: RuleScope::default(),
        }
    }

    /// Allow non-ASCII characters in the local part.
    pub fn unicode(mut self) -> Self {
        self.unicode = true;
        self
    }
}

impl Default for Email {
    fn default() -> Self {
        Self::new()
    }
}

rule_common!(Email);

impl ColumnRule for Email {
    fn applies_on(&self, mode: Mode) -> bool {
        self.scope.applies_on(mode)
    }

    fn validate(&self, ctx: &FieldContext<'_>) -> std::result::Result<(), ValidationError> {
        match ctx.value.scalar_string() {
            Some(text) if is_valid_email(&text, self.unicode) => Ok(()),
            _ => Err(rule_error(ctx, RuleKind::Email, &self.message)),
        }
    }
}

/// Runs one of the named semantic filters.
#[derive(Debug, Clone)]
pub struct Filter {
    pub kind: FilterKind,
    pub options: FilterOptions,
    pub flags: FilterFlags,
    message: String,
    scope: RuleScope,
}

impl Filter {
    pub const DEFAULT_MESSAGE: &'static str = "%s: is invalid value";

    /// Fails when the options do not fit the filter kind.
    pub fn new(kind: FilterKind, options: FilterOptions, flags: FilterFlags) -> Result<Self> {
        check_filter_config(kind, &options)?;
        Ok(Self {
            kind,
            options,
            flags,
            message: Self::DEFAULT_MESSAGE.to_string(),
            scope: RuleScope::default(),
        })
    }

    /// Like [`Filter::new`], with the kind given by name (`int`, `email`, ...).
    pub fn named(name: &str, options: FilterOptions, flags: FilterFlags) -> Result<Self> {
        Self::new(FilterKind::from_str(name)?, options, flags)
    }
}

rule_common!(Filter);

impl ColumnRule for Filter {
    fn applies_on(&self, mode: Mode) -> bool {
        self.scope.applies_on(mode)
    }

    fn validate(&self, ctx: &FieldContext<'_>) -> std::result::Result<(), ValidationError> {
        match ctx.value.scalar_string() {
            Some(text) if apply_filter(self.kind, &text, &self.options, self.flags) => Ok(()),
            _ => Err(rule_error(ctx, RuleKind::Filter, &self.message)),
        }
    }
}

/// Lower bound on a numeric value.
#[derive(Debug, Clone)]
pub struct Greater {
    pub min_range: f64,
    /// Reject values equal to `min_range`.
    pub strict: bool,
    message: String,
    scope: RuleScope,
}

impl Greater {
    pub const DEFAULT_MESSAGE: &'static str = "%s: is less than %d";

    pub fn new(min_range: f64) -> Self {
        Self {
            min_range,
            strict: false,
            message: Self::DEFAULT_MESSAGE.to_string(),
            scope: RuleScope::default(),
        }
    }

    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }
}

rule_common!(Greater);

impl ColumnRule for Greater {
    fn applies_on(&self, mode: Mode) -> bool {
        self.scope.applies_on(mode)
    }

    fn validate(&self, ctx: &FieldContext<'_>) -> std::result::Result<(), ValidationError> {
        let passes = ctx.value.as_f64().is_some_and(|value| {
            if self.strict {
                value > self.min_range
            } else {
                value >= self.min_range
            }
        });
        if passes {
            return Ok(());
        }
        Err(ctx.violation(
            ViolationKind::Rule(RuleKind::Greater),
            self.message.as_str(),
            vec![ctx.field.into(), MessageArg::Float(self.min_range)],
        ))
    }
}

/// IP address with optional family and range restrictions.
#[derive(Debug, Clone)]
pub struct Ip {
    pub ipv4: bool,
    pub ipv6: bool,
    pub no_res_range: bool,
    pub no_priv_range: bool,
    message: String,
    scope: RuleScope,
}

impl Ip {
    pub const DEFAULT_MESSAGE: &'static str = "%s: is invalid IP address";

    pub fn new() -> Self {
        Self {
            ipv4: false,
            ipv6: false,
            no_res_range: false,
            no_priv_range: false,
            message: Self::DEFAULT_MESSAGE.to_string(),
            scope: RuleScope::default(),
        }
    }

    pub fn ipv4(mut self) -> Self {
        self.ipv4 = true;
        self
    }

    pub fn ipv6(mut self) -> Self {
        self.ipv6 = true;
        self
    }

    pub fn no_res_range(mut self) -> Self {
        self.no_res_range = true;
        self
    }

    pub fn no_priv_range(mut self) -> Self {
        self.no_priv_range = true;
        self
    }

    fn flags(&self) -> FilterFlags {
        let mut flags = FilterFlags::empty();
        flags.set(FilterFlags::IPV4, self.ipv4);
        flags.set(FilterFlags::IPV6, self.ipv6);
        flags.set(FilterFlags::NO_RES_RANGE, self.no_res_range);
        flags.set(FilterFlags::NO_PRIV_RANGE, self.no_priv_range);
        flags
    }
}

impl Default for Ip {
    fn default() -> Self {
        Self::new()
    }
}

rule_common!(Ip);

impl ColumnRule for Ip {
    fn applies_on(&self, mode: Mode) -> bool {
        self.scope.applies_on(mode)
    }

    fn validate(&self, ctx: &FieldContext<'_>) -> std::result::Result<(), ValidationError> {
        match ctx.value.scalar_string() {
            Some(text) if is_valid_ip(&text, self.flags()) => Ok(()),
            _ => Err(rule_error(ctx, RuleKind::Ip, &self.message)),
        }
    }
}

/// Minimum character count, counted in `encoding` when given.
#[derive(Debug, Clone)]
pub struct MinLength {
    pub length: u32,
    pub encoding: Option<Charset>,
    message: String,
    scope: RuleScope,
}

impl MinLength {
    pub const DEFAULT_MESSAGE: &'static str = "%s: is less than %d characters";

    pub fn new(length: u32) -> Self {
        Self {
            length,
            encoding: None,
            message: Self::DEFAULT_MESSAGE.to_string(),
            scope: RuleScope::default(),
        }
    }

    pub fn encoding(mut self, encoding: Charset) -> Self {
        self.encoding = Some(encoding);
        self
    }
}

rule_common!(MinLength);

impl ColumnRule for MinLength {
    fn applies_on(&self, mode: Mode) -> bool {
        self.scope.applies_on(mode)
    }

    fn validate(&self, ctx: &FieldContext<'_>) -> std::result::Result<(), ValidationError> {
        let long_enough = ctx.value.scalar_string()
            .is_some_and(|text| text_length(&text, self.encoding) >= self.length as usize);
        if long_enough {
            return Ok(());
        }
        Err(ctx.violation(
            ViolationKind::Rule(RuleKind::MinLength),
            self.message.as_str(),
            vec![ctx.field.into(), self.length.into()],
        ))
    }
}

/// Integer or float notation, optionally bounded.
#[derive(Debug, Clone)]
pub struct Number {
    pub min_range: Option<f64>,
    pub max_range: Option<f64>,
    pub allow_octal: bool,
    pub allow_hex: bool,
    pub allow_thousand: bool,
    message: String,
    scope: RuleScope,
}

impl Number {
    pub const DEFAULT_MESSAGE: &'static str = "%s: is invalid value";

    pub fn new() -> Self {
        Self {
            min_range: None,
            max_range: None,
            allow_octal: false,
            allow_hex: false,
            allow_thousand: false,
            message: Self::DEFAULT_MESSAGE.to_string(),
            scope: RuleScope::default(),
        }
    }

    /// Fails when `min_range` is above `max_range`.
    pub fn range(mut self, min_range: Option<f64>, max_range: Option<f64>) -> Result<Self> {
        if let (Some(min), Some(max)) = (min_range, max_range) {
            if min > max {
                return Err(Error::InvalidRule(format!(
                    "min_range {min} is greater than max_range {max}"
                )));
            }
        }
        self.min_range = min_range;
        self.max_range = max_range;
        Ok(self)
    }

    pub fn allow_octal(mut self) -> Self {
        self.allow_octal = true;
        self
    }

    pub fn allow_hex(mut self) -> Self {
        self.allow_hex = true;
        self
    }

    pub fn allow_thousand(mut self) -> Self {
        self.allow_thousand = true;
        self
    }

    /// Parse mode for a field. The thousand separator wins over octal and
    /// hex; without any notation flag the column type decides.
    fn parse_mode(&self, field_type: FieldType) -> (FilterKind, FilterFlags) {
        let mut flags = FilterFlags::empty();
        let mut kind = None;
        if self.allow_octal {
            flags |= FilterFlags::ALLOW_OCTAL;
            kind = Some(FilterKind::Int);
        }
        if self.allow_hex {
            flags |= FilterFlags::ALLOW_HEX;
            kind = Some(FilterKind::Int);
        }
        if self.allow_thousand {
            flags |= FilterFlags::ALLOW_THOUSAND;
            kind = Some(FilterKind::Float);
        }
        let kind = kind.unwrap_or(match field_type {
            FieldType::Integer => FilterKind::Int,
            _ => FilterKind::Float,
        });
        (kind, flags)
    }

    fn in_range(&self, value: f64) -> bool {
        self.min_range.is_none_or(|min| value >= min)
            && self.max_range.is_none_or(|max| value <= max)
    }
}

impl Default for Number {
    fn default() -> Self {
        Self::new()
    }
}

rule_common!(Number);

impl ColumnRule for Number {
    fn applies_on(&self, mode: Mode) -> bool {
        self.scope.applies_on(mode)
    }

    fn validate(&self, ctx: &FieldContext<'_>) -> std::result::Result<(), ValidationError> {
        let (kind, flags) = self.parse_mode(ctx.metadata.field_type);
        let parsed = ctx.value.scalar_string().and_then(|text| match kind {
            FilterKind::Int => parse_int(&text, flags).map(|value| value as f64),
            _ => parse_float(&text, '.', flags),
        });
        match parsed {
            Some(value) if self.in_range(value) => Ok(()),
            _ => Err(rule_error(ctx, RuleKind::Number, &self.message)),
        }
    }
}

/// Value must match a regular expression.
#[derive(Debug, Clone)]
pub struct Regexp {
    pub pattern: Regex,
    message: String,
    scope: RuleScope,
}

impl Regexp {
    pub const DEFAULT_MESSAGE: &'static str = "%s: invalid format of value";

    /// Fails when `pattern` does not compile.
    pub fn new(pattern: &str) -> Result<Self> {
        let pattern = Regex::new(pattern)
            .map_err(|err| Error::InvalidRule(format!("invalid pattern '{pattern}': {err}")))?;
        Ok(Self::from_regex(pattern))
    }

    pub fn from_regex(pattern: Regex) -> Self {
        Self {
            pattern,
            message: Self::DEFAULT_MESSAGE.to_string(),
            scope: RuleScope::default(),
        }
    }
}

rule_common!(Regexp);

impl ColumnRule for Regexp {
    fn applies_on(&self, mode: Mode) -> bool {
        self.scope.applies_on(mode)
    }

    fn validate(&self, ctx: &FieldContext<'_>) -> std::result::Result<(), ValidationError> {
        match ctx.value.scalar_string() {
            Some(text) if self.pattern.is_match(&text) => Ok(()),
            _ => Err(rule_error(ctx, RuleKind::Regexp, &self.message)),
        }
    }
}

/// URL-safe identifier made of letters, digits, `_` and `-`.
#[derive(Debug, Clone)]
pub struct Slug {
    message: String,
    scope: RuleScope,
}

impl Slug {
    pub const DEFAULT_MESSAGE: &'static str =
        "%s: is invalid SLUG (must contains only a-z, 0-9, _ and -)";

    pub fn new() -> Self {
        Self {
            message: Self::DEFAULT_MESSAGE.to_string(),
            scope: RuleScope::default(),
        }
    }
}

impl Default for Slug {
    fn default() -> Self {
        Self::new()
    }
}

rule_common!(Slug);

impl ColumnRule for Slug {
    fn applies_on(&self, mode: Mode) -> bool {
        self.scope.applies_on(mode)
    }

    fn validate(&self, ctx: &FieldContext<'_>) -> std::result::Result<(), ValidationError> {
        match ctx.value.scalar_string() {
            Some(text) if SLUG.is_match(&text) => Ok(()),
            _ => Err(rule_error(ctx, RuleKind::Slug, &self.message)),
        }
    }
}

/// Character-class check over the value's string form.
#[derive(Debug, Clone)]
pub struct TypeRule {
    pub kind: CtypeKind,
    /// Fail when the value *is* in the class.
    pub inverse: bool,
    message: String,
    message_inverse: String,
    scope: RuleScope,
}

impl TypeRule {
    pub const DEFAULT_MESSAGE: &'static str = "%s: invalid type (not %s)";
    pub const DEFAULT_MESSAGE_INVERSE: &'static str = "%s: invalid type (%s)";

    pub fn new(kind: CtypeKind) -> Self {
        Self {
            kind,
            inverse: false,
            message: Self::DEFAULT_MESSAGE.to_string(),
            message_inverse: Self::DEFAULT_MESSAGE_INVERSE.to_string(),
            scope: RuleScope::default(),
        }
    }

    /// Fails on an unknown class name.
    pub fn named(name: &str) -> Result<Self> {
        Ok(Self::new(CtypeKind::from_str(name)?))
    }

    pub fn inverse(mut self) -> Self {
        self.inverse = true;
        self
    }

    pub fn with_message_inverse(mut self, message: impl Into<String>) -> Self {
        self.message_inverse = message.into();
        self
    }

    pub fn message_inverse(&self) -> &str {
        &self.message_inverse
    }
}

rule_common!(TypeRule);

impl ColumnRule for TypeRule {
    fn applies_on(&self, mode: Mode) -> bool {
        self.scope.applies_on(mode)
    }

    fn validate(&self, ctx: &FieldContext<'_>) -> std::result::Result<(), ValidationError> {
        let text = ctx.value.scalar_string().unwrap_or_default();
        let matches = self.kind.matches(&text);
        let template = match (self.inverse, matches) {
            (false, false) => &self.message,
            (true, true) => &self.message_inverse,
            _ => return Ok(()),
        };
        Err(ctx.violation(
            ViolationKind::Rule(RuleKind::Type),
            template.as_str(),
            vec![ctx.field.into(), self.kind.as_str().into()],
        ))
    }
}

/// Absolute URL, optionally with a required path or query.
#[derive(Debug, Clone)]
pub struct Url {
    pub path_required: bool,
    pub query_required: bool,
    message: String,
    scope: RuleScope,
}

impl Url {
    pub const DEFAULT_MESSAGE: &'static str = "%s: is invalid URL";

    pub fn new() -> Self {
        Self {
            path_required: false,
            query_required: false,
            message: Self::DEFAULT_MESSAGE.to_string(),
            scope: RuleScope::default(),
        }
    }

    pub fn path_required(mut self) -> Self {
        self.path_required = true;
        self
    }

    pub fn query_required(mut self) -> Self {
        self.query_required = true;
        self
    }
}

impl Default for Url {
    fn default() -> Self {
        Self::new()
    }
}

rule_common!(Url);

impl ColumnRule for Url {
    fn applies_on(&self, mode: Mode) -> bool {
        self.scope.applies_on(mode)
    }

    fn validate(&self, ctx: &FieldContext<'_>) -> std::result::Result<(), ValidationError> {
        let mut flags = FilterFlags::empty();
        flags.set(FilterFlags::PATH_REQUIRED, self.path_required);
        flags.set(FilterFlags::QUERY_REQUIRED, self.query_required);
        match ctx.value.scalar_string() {
            Some(text) if is_valid_url(&text, flags) => Ok(()),
            _ => Err(rule_error(ctx, RuleKind::Url, &self.message)),
        }
    }
}
