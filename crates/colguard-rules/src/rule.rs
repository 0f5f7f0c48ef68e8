use std::sync::Arc;

use colguard_core::{ColumnRule, FieldContext, Mode, RuleKind, ValidationError};

use crate::catalog::{
    Email, Filter, Greater, Ip, MinLength, Number, Regexp, Slug, TypeRule, Url,
};

/// A rule attached to a field: one of the built-in variants, or a
/// user-defined [`ColumnRule`].
#[derive(Debug, Clone)]
pub enum ValidatorRule {
    Email(Email),
    Filter(Filter),
    Greater(Greater),
    Ip(Ip),
    MinLength(MinLength),
    Number(Number),
    Regexp(Regexp),
    Slug(Slug),
    Type(TypeRule),
    Url(Url),
    Custom(Arc<dyn ColumnRule>),
}

impl ValidatorRule {
    pub fn custom(rule: impl ColumnRule + 'static) -> Self {
        ValidatorRule::Custom(Arc::new(rule))
    }

    /// Built-in variant, or `None` for a custom rule.
    pub fn kind(&self) -> Option<RuleKind> {
        let kind = match self {
            ValidatorRule::Email(_) => RuleKind::Email,
            ValidatorRule::Filter(_) => RuleKind::Filter,
            ValidatorRule::Greater(_) => RuleKind::Greater,
            ValidatorRule::Ip(_) => RuleKind::Ip,
            ValidatorRule::MinLength(_) => RuleKind::MinLength,
            ValidatorRule::Number(_) => RuleKind::Number,
            ValidatorRule::Regexp(_) => RuleKind::Regexp,
            ValidatorRule::Slug(_) => RuleKind::Slug,
            ValidatorRule::Type(_) => RuleKind::Type,
            ValidatorRule::Url(_) => RuleKind::Url,
            ValidatorRule::Custom(_) => return None,
        };
        Some(kind)
    }

    fn as_rule(&self) -> &dyn ColumnRule {
        match self {
            ValidatorRule::Email(rule) => rule,
            ValidatorRule::Filter(rule) => rule,
            ValidatorRule::Greater(rule) => rule,
            ValidatorRule::Ip(rule) => rule,
            ValidatorRule::MinLength(rule) => rule,
            ValidatorRule::Number(rule) => rule,
            ValidatorRule::Regexp(rule) => rule,
            ValidatorRule::Slug(rule) => rule,
            ValidatorRule::Type(rule) => rule,
            ValidatorRule::Url(rule) => rule,
            ValidatorRule::Custom(rule) => &**rule,
        }
    }
}

impl ColumnRule for ValidatorRule {
    fn applies_on(&self, mode: Mode) -> bool {
        self.as_rule().applies_on(mode)
    }

    fn validate(&self, ctx: &FieldContext<'_>) -> Result<(), ValidationError> {
        self.as_rule().validate(ctx)
    }
}

macro_rules! impl_from_rule {
    ($($variant:ident => $rule:ty),* $(,)?) => {
        $(
            impl From<$rule> for ValidatorRule {
                fn from(rule: $rule) -> Self {
                    ValidatorRule::$variant(rule)
                }
            }
        )*
    };
}

impl_from_rule! {
    Email => Email,
    Filter => Filter,
    Greater => Greater,
    Ip => Ip,
    MinLength => MinLength,
    Number => Number,
    Regexp => Regexp,
    Slug => Slug,
    Type => TypeRule,
    Url => Url,
}

impl From<Arc<dyn ColumnRule>> for ValidatorRule {
    fn from(rule: Arc<dyn ColumnRule>) -> Self {
        ValidatorRule::Custom(rule)
    }
}
