//! Declarative form of the rule catalog, as written in schema documents.

use std::str::FromStr;

use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use colguard_core::{Charset, Error, Result};

use crate::catalog::{
    CommonConfig, Email, Filter, Greater, Ip, MinLength, Number, Regexp, RuleScope, Slug,
    TypeRule, Url,
};
use crate::filter::{FilterFlags, FilterOptions};
use crate::rule::ValidatorRule;

fn enabled() -> bool {
    true
}

/// Settings shared by every rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CommonSpec {
    /// Message template; `%s` is replaced by the field name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default = "enabled")]
    pub on_insert: bool,
    #[serde(default = "enabled")]
    pub on_update: bool,
}

impl Default for CommonSpec {
    fn default() -> Self {
        Self {
            message: None,
            on_insert: true,
            on_update: true,
        }
    }
}

impl CommonSpec {
    fn apply<R: CommonConfig>(&self, rule: R) -> R {
        rule.with_common(
            self.message.as_deref(),
            RuleScope {
                on_insert: self.on_insert,
                on_update: self.on_update,
            },
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FilterOptionsSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_range: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_range: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regexp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decimal: Option<char>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub separator: Option<char>,
}

impl FilterOptionsSpec {
    fn build(&self) -> Result<FilterOptions> {
        let regexp = self
            .regexp
            .as_deref()
            .map(|pattern| {
                Regex::new(pattern).map_err(|err| {
                    Error::InvalidRule(format!("invalid pattern '{pattern}': {err}"))
                })
            })
            .transpose()?;
        Ok(FilterOptions {
            min_range: self.min_range,
            max_range: self.max_range,
            regexp,
            decimal: self.decimal,
            separator: self.separator,
        })
    }
}

/// One rule attached to a field, tagged by `rule`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum RuleSpec {
    Email {
        #[serde(default)]
        unicode: bool,
        #[serde(flatten)]
        common: CommonSpec,
    },
    Filter {
        /// Filter name: int, float, regexp, url, domain, email, ip or mac.
        filter: String,
        #[serde(default)]
        options: FilterOptionsSpec,
        /// Flag names such as `allow_hex` or `ipv4`.
        #[serde(default)]
        flags: Vec<String>,
        #[serde(flatten)]
        common: CommonSpec,
    },
    Greater {
        min_range: f64,
        #[serde(default)]
        strict: bool,
        #[serde(flatten)]
        common: CommonSpec,
    },
    Ip {
        #[serde(default)]
        ipv4: bool,
        #[serde(default)]
        ipv6: bool,
        #[serde(default)]
        no_res_range: bool,
        #[serde(default)]
        no_priv_range: bool,
        #[serde(flatten)]
        common: CommonSpec,
    },
    MinLength {
        length: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        encoding: Option<String>,
        #[serde(flatten)]
        common: CommonSpec,
    },
    Number {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min_range: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_range: Option<f64>,
        #[serde(default)]
        allow_octal: bool,
        #[serde(default)]
        allow_hex: bool,
        #[serde(default)]
        allow_thousand: bool,
        #[serde(flatten)]
        common: CommonSpec,
    },
    Regexp {
        pattern: String,
        #[serde(flatten)]
        common: CommonSpec,
    },
    Slug {
        #[serde(flatten)]
        common: CommonSpec,
    },
    Type {
        /// Character class: alnum, alpha, cntrl, digit, graph, lower, print,
        /// punct, space, upper or xdigit.
        #[serde(rename = "type")]
        class: String,
        #[serde(default)]
        inverse: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message_inverse: Option<String>,
        #[serde(flatten)]
        common: CommonSpec,
    },
    Url {
        #[serde(default)]
        path_required: bool,
        #[serde(default)]
        query_required: bool,
        #[serde(flatten)]
        common: CommonSpec,
    },
}

impl RuleSpec {
    /// Build the runtime rule. Misconfiguration fails here, never during
    /// validation.
    pub fn build(&self) -> Result<ValidatorRule> {
        let rule = match self {
            RuleSpec::Email { unicode, common } => {
                let mut rule = Email::new();
                rule.unicode = *unicode;
                common.apply(rule).into()
            }
            RuleSpec::Filter {
                filter,
                options,
                flags,
                common,
            } => {
                let flags = flags.iter().try_fold(FilterFlags::empty(), |acc, name| {
                    FilterFlags::parse_name(name).map(|flag| acc | flag)
                })?;
                common.apply(Filter::named(filter, options.build()?, flags)?).into()
            }
            RuleSpec::Greater {
                min_range,
                strict,
                common,
            } => {
                let mut rule = Greater::new(*min_range);
                rule.strict = *strict;
                common.apply(rule).into()
            }
            RuleSpec::Ip {
                ipv4,
                ipv6,
                no_res_range,
                no_priv_range,
                common,
            } => {
                let mut rule = Ip::new();
                rule.ipv4 = *ipv4;
                rule.ipv6 = *ipv6;
                rule.no_res_range = *no_res_range;
                rule.no_priv_range = *no_priv_range;
                common.apply(rule).into()
            }
            RuleSpec::MinLength {
                length,
                encoding,
                common,
            } => {
                let mut rule = MinLength::new(*length);
                rule.encoding = encoding.as_deref().map(Charset::from_str).transpose()?;
                common.apply(rule).into()
            }
            RuleSpec::Number {
                min_range,
                max_range,
                allow_octal,
                allow_hex,
                allow_thousand,
                common,
            } => {
                let mut rule = Number::new().range(*min_range, *max_range)?;
                rule.allow_octal = *allow_octal;
                rule.allow_hex = *allow_hex;
                rule.allow_thousand = *allow_thousand;
                common.apply(rule).into()
            }
            RuleSpec::Regexp { pattern, common } => common.apply(Regexp::new(pattern)?).into(),
            RuleSpec::Slug { common } => common.apply(Slug::new()).into(),
            RuleSpec::Type {
                class,
                inverse,
                message_inverse,
                common,
            } => {
                let mut rule = TypeRule::named(class)?;
                rule.inverse = *inverse;
                if let Some(message) = message_inverse {
                    rule = rule.with_message_inverse(message.as_str());
                }
                common.apply(rule).into()
            }
            RuleSpec::Url {
                path_required,
                query_required,
                common,
            } => {
                let mut rule = Url::new();
                rule.path_required = *path_required;
                rule.query_required = *query_required;
                common.apply(rule).into()
            }
        };
        Ok(rule)
    }
}

impl TryFrom<&RuleSpec> for ValidatorRule {
    type Error = Error;

    fn try_from(spec: &RuleSpec) -> Result<Self> {
        spec.build()
    }
}
