//! Built-in validator rules for colguard.
//!
//! Rules are plain values built either from code or from a [`RuleSpec`] in a
//! schema document. [`ValidatorRule`] closes over the built-in catalog and
//! keeps a `Custom` variant for user-defined checks.

pub mod catalog;
pub mod ctype;
pub mod filter;
pub mod rule;
pub mod spec;

pub use catalog::{
    Email, Filter, Greater, Ip, MinLength, Number, Regexp, RuleScope, Slug, TypeRule, Url,
};
pub use ctype::CtypeKind;
pub use filter::{FilterFlags, FilterKind, FilterOptions};
pub use rule::ValidatorRule;
pub use spec::{CommonSpec, FilterOptionsSpec, RuleSpec};
