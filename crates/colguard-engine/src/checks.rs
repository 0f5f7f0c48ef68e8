//! Built-in checks, picked by the declared field type.

use colguard_core::{
    FieldContext, FieldType, MAX_DECIMAL_SCALE, MessageArg, ValidationError, Value, ViolationKind,
    text_length,
};

pub const EMPTY: &str = "%s is empty";
pub const NEGATIVE: &str = "%s is less than zero";
pub const PRECISION_EXCEEDED: &str = "%s is too big (maximum %d digits)";
pub const WRONG_LENGTH: &str = "%s has wrong length (must be %d characters)";
pub const TOO_LONG: &str = "%s is too long (more than %d characters)";
pub const INVALID_ENUM: &str = "%s has invalid enum value";
pub const WRONG_TYPE: &str = "%s has a wrong type of value";
pub const NON_SCALAR_ITEM: &str = "%s has a non-scalar item";
pub const ITEM_CONTAINS_SEPARATOR: &str = "%s has an item containing comma";
pub const STREAM_EXPECTED: &str = "%s has invalid type (must be a stream)";

const ARRAY_SEPARATOR: char = ',';

/// Significant digits kept when a float is written without a scale.
const FLOAT_SIGNIFICANT_DIGITS: usize = 14;

type CheckResult = Result<(), ValidationError>;

/// Run the check for the field's type. The value is already known to be
/// non-null; `Other` fields pass.
pub fn check_field(ctx: &FieldContext<'_>) -> CheckResult {
    match ctx.metadata.field_type {
        FieldType::Integer | FieldType::Float | FieldType::Decimal => check_numeric(ctx),
        FieldType::String | FieldType::AsciiString => check_string(ctx),
        FieldType::Enum => check_enum(ctx),
        FieldType::SimpleArray => check_array(ctx),
        FieldType::Blob => check_blob(ctx),
        FieldType::Other => Ok(()),
    }
}

fn with_limit(ctx: &FieldContext<'_>, kind: ViolationKind, template: &str, limit: u32) -> ValidationError {
    ctx.violation(kind, template, vec![ctx.field.into(), MessageArg::from(limit)])
}

/// Zero counts as unset, like an absent facet.
fn positive(facet: Option<u32>) -> Option<u32> {
    facet.filter(|value| *value > 0)
}

fn check_numeric(ctx: &FieldContext<'_>) -> CheckResult {
    let metadata = ctx.metadata;
    let Some(rendered) = ctx.value.scalar_string() else {
        return Err(ctx.fail(ViolationKind::WrongType, WRONG_TYPE));
    };

    if metadata.unsigned && ctx.value.as_f64().is_some_and(|value| value < 0.0) {
        return Err(ctx.fail(ViolationKind::Negative, NEGATIVE));
    }

    if metadata.field_type == FieldType::Decimal {
        if let Some(precision) = positive(metadata.precision) {
            let rendered = match (ctx.value, positive(metadata.scale)) {
                // Text is checked as written.
                (Value::Text(_), _) => rendered,
                (value, Some(scale)) => match value.as_f64() {
                    Some(number) => format!(
                        "{number:.prec$}",
                        prec = scale.min(MAX_DECIMAL_SCALE) as usize
                    ),
                    None => rendered,
                },
                (Value::Float(number), None) => float_text(*number),
                (_, None) => rendered,
            };
            let digits = rendered.chars().filter(char::is_ascii_digit).count();
            if digits > precision as usize {
                return Err(with_limit(
                    ctx,
                    ViolationKind::PrecisionExceeded,
                    PRECISION_EXCEEDED,
                    precision,
                ));
            }
        }
    }
    Ok(())
}

/// Default text of a float, rounded to [`FLOAT_SIGNIFICANT_DIGITS`] so
/// binary noise such as `0.30000000000000004` reads as `0.3`.
fn float_text(number: f64) -> String {
    let rounded = format!("{number:.prec$e}", prec = FLOAT_SIGNIFICANT_DIGITS - 1);
    match rounded.parse::<f64>() {
        Ok(value) => value.to_string(),
        Err(_) => number.to_string(),
    }
}

fn check_string(ctx: &FieldContext<'_>) -> CheckResult {
    let metadata = ctx.metadata;
    let Some(text) = ctx.value.scalar_string() else {
        return Err(ctx.fail(ViolationKind::WrongType, WRONG_TYPE));
    };
    let Some(limit) = positive(metadata.length) else {
        return Ok(());
    };

    let length = if metadata.field_type == FieldType::AsciiString {
        text.len()
    } else {
        text_length(&text, metadata.charset)
    };

    if metadata.fixed_length && length != limit as usize {
        return Err(with_limit(ctx, ViolationKind::WrongLength, WRONG_LENGTH, limit));
    }
    if length > limit as usize {
        return Err(with_limit(ctx, ViolationKind::TooLong, TOO_LONG, limit));
    }
    Ok(())
}

fn check_enum(ctx: &FieldContext<'_>) -> CheckResult {
    let Some(enum_type) = ctx.metadata.enum_type.as_deref() else {
        return Ok(());
    };

    let valid = match ctx.value {
        Value::Enum(instance) => {
            instance.enum_type == enum_type.name && enum_type.has_case(&instance.case)
        }
        Value::Text(name) if enum_type.has_case(name) => true,
        value => enum_type.case_for_value(value).is_some(),
    };
    if valid {
        Ok(())
    } else {
        Err(ctx.fail(ViolationKind::InvalidEnum, INVALID_ENUM))
    }
}

fn check_array(ctx: &FieldContext<'_>) -> CheckResult {
    let Value::Array(items) = ctx.value else {
        return Err(ctx.fail(ViolationKind::WrongType, WRONG_TYPE));
    };

    let mut rendered = Vec::with_capacity(items.len());
    for item in items {
        let Some(text) = array_item(item) else {
            return Err(ctx.fail(ViolationKind::NonScalarItem, NON_SCALAR_ITEM));
        };
        if text.contains(ARRAY_SEPARATOR) {
            return Err(ctx.fail(
                ViolationKind::ItemContainsSeparator,
                ITEM_CONTAINS_SEPARATOR,
            ));
        }
        rendered.push(text);
    }

    if let Some(limit) = positive(ctx.metadata.length) {
        let joined = rendered.join(",");
        if text_length(&joined, ctx.metadata.charset) > limit as usize {
            return Err(with_limit(ctx, ViolationKind::TooLong, TOO_LONG, limit));
        }
    }
    Ok(())
}

/// String form of a scalar-array item; `None` for items that have none.
fn array_item(item: &Value) -> Option<String> {
    if item.is_scalar() {
        item.scalar_string()
    } else {
        None
    }
}

fn check_blob(ctx: &FieldContext<'_>) -> CheckResult {
    match ctx.value {
        Value::Stream(stream) if stream.is_open() => Ok(()),
        _ => Err(ctx.fail(ViolationKind::StreamExpected, STREAM_EXPECTED)),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use colguard_core::{
        BackingValue, BlobStream, Charset, DynamicRecord, EnumType, EnumValue, FieldMetadata,
        Mode, ObjectValue, Record,
    };

    use super::*;

    fn run(metadata: FieldMetadata, value: impl Into<Value>) -> CheckResult {
        let record: Arc<dyn Record> = Arc::new(DynamicRecord::new("Sample"));
        let value = value.into();
        let ctx = FieldContext {
            field: "field",
            value: &value,
            metadata: &metadata,
            record: &record,
            mode: Mode::Insert,
        };
        check_field(&ctx)
    }

    fn kind(result: CheckResult) -> ViolationKind {
        result.unwrap_err().kind()
    }

    #[test]
    fn unsigned_numbers_reject_negatives() {
        let meta = FieldMetadata::new(FieldType::Integer).unsigned();
        assert_eq!(kind(run(meta.clone(), -1)), ViolationKind::Negative);
        assert_eq!(kind(run(meta.clone(), "-0.5")), ViolationKind::Negative);
        assert!(run(meta.clone(), 0).is_ok());
        assert!(run(FieldMetadata::new(FieldType::Float), -1.5).is_ok());
    }

    #[test]
    fn decimal_precision_counts_rendered_digits() {
        let meta = FieldMetadata::new(FieldType::Decimal).precision(10).scale(2);
        assert!(run(meta.clone(), 99999999.99).is_ok());
        assert!(run(meta.clone(), 12345678).is_ok());
        let err = run(meta.clone(), 123456789).unwrap_err();
        assert_eq!(err.kind(), ViolationKind::PrecisionExceeded);
        assert_eq!(err.message(), "field is too big (maximum 10 digits)");
        assert!(run(meta.clone(), "-12345678.90").is_ok());
        assert!(run(meta, "123456789.01").is_err());

        let no_scale = FieldMetadata::new(FieldType::Decimal).precision(3);
        assert!(run(no_scale.clone(), 1.5).is_ok());
        assert!(run(no_scale, 1234).is_err());
    }

    #[test]
    fn unscaled_floats_ignore_binary_noise() {
        let meta = FieldMetadata::new(FieldType::Decimal).precision(10);
        assert!(run(meta.clone(), 0.1 + 0.2).is_ok());
        assert!(run(meta.clone(), 1.0 / 3.0).is_err());
        assert!(run(meta.clone(), 12345.6789).is_ok());
        assert!(run(meta, 123456.78901).is_err());
    }

    #[test]
    fn oversized_scale_never_panics() {
        let meta = FieldMetadata::new(FieldType::Decimal)
            .precision(5)
            .scale(200_000_000);
        let err = run(meta, 1.0).unwrap_err();
        assert_eq!(err.kind(), ViolationKind::PrecisionExceeded);
    }

    #[test]
    fn floats_skip_precision() {
        let meta = FieldMetadata::new(FieldType::Float).precision(2);
        assert!(run(meta, 12345.678).is_ok());
    }

    #[test]
    fn fixed_strings_must_match_length() {
        let meta = FieldMetadata::new(FieldType::String).length(3).fixed_length();
        let err = run(meta.clone(), "ab").unwrap_err();
        assert_eq!(err.kind(), ViolationKind::WrongLength);
        assert_eq!(err.message(), "field has wrong length (must be 3 characters)");
        assert!(run(meta.clone(), "äöü").is_ok());
        assert_eq!(kind(run(meta, "abcd")), ViolationKind::WrongLength);
    }

    #[test]
    fn string_length_depends_on_type_and_charset() {
        let utf8 = FieldMetadata::new(FieldType::String).length(3);
        assert!(run(utf8.clone(), "äöü").is_ok());
        let err = run(utf8, "äöüß").unwrap_err();
        assert_eq!(err.message(), "field is too long (more than 3 characters)");

        let ascii = FieldMetadata::new(FieldType::AsciiString).length(3);
        assert_eq!(kind(run(ascii, "äö")), ViolationKind::TooLong);

        let utf16 = FieldMetadata::new(FieldType::String)
            .length(1)
            .charset(Charset::Utf16);
        assert_eq!(kind(run(utf16, "😀")), ViolationKind::TooLong);

        let unlimited = FieldMetadata::new(FieldType::String);
        assert!(run(unlimited, "x".repeat(10_000)).is_ok());
    }

    #[test]
    fn strings_reject_non_scalar_values() {
        let meta = FieldMetadata::new(FieldType::String).length(10);
        assert_eq!(kind(run(meta.clone(), vec!["a"])), ViolationKind::WrongType);
        assert!(run(meta.clone(), 42).is_ok());
        assert!(run(meta, Value::Object(ObjectValue::new("Money").with_display("1 EUR"))).is_ok());
    }

    #[test]
    fn enums_accept_names_instances_and_backing_values() {
        let status = Arc::new(
            EnumType::new("Status")
                .backed_case("Active", BackingValue::Int(1))
                .backed_case("Blocked", BackingValue::Int(2)),
        );
        let meta = FieldMetadata::new(FieldType::Enum).enum_type(status);
        assert!(run(meta.clone(), "Active").is_ok());
        assert!(run(meta.clone(), 2).is_ok());
        assert!(run(meta.clone(), "2").is_ok());
        assert!(run(meta.clone(), EnumValue::new("Status", "Blocked")).is_ok());
        assert_eq!(kind(run(meta.clone(), "x")), ViolationKind::InvalidEnum);
        assert_eq!(kind(run(meta.clone(), 3)), ViolationKind::InvalidEnum);
        assert_eq!(
            kind(run(meta, EnumValue::new("Other", "Active"))),
            ViolationKind::InvalidEnum
        );

        let plain = Arc::new(EnumType::new("Size").case("Small").case("Large"));
        let meta = FieldMetadata::new(FieldType::Enum).enum_type(plain);
        assert!(run(meta.clone(), "Large").is_ok());
        assert_eq!(kind(run(meta, 0)), ViolationKind::InvalidEnum);

        assert!(run(FieldMetadata::new(FieldType::Enum), "anything").is_ok());
    }

    #[test]
    fn arrays_check_items_and_joined_length() {
        let meta = FieldMetadata::new(FieldType::SimpleArray).length(7);
        assert!(run(meta.clone(), vec!["ab", "cd"]).is_ok());
        assert_eq!(kind(run(meta.clone(), "ab,cd")), ViolationKind::WrongType);
        assert_eq!(
            kind(run(meta.clone(), Value::Array(vec![Value::Array(vec![])]))),
            ViolationKind::NonScalarItem
        );
        assert_eq!(
            kind(run(
                meta.clone(),
                Value::Array(vec![Value::Object(ObjectValue::new("Opaque"))])
            )),
            ViolationKind::NonScalarItem
        );
        assert_eq!(
            kind(run(meta.clone(), vec!["a,b"])),
            ViolationKind::ItemContainsSeparator
        );
        assert_eq!(
            kind(run(meta.clone(), vec!["abcd", "efgh"])),
            ViolationKind::TooLong
        );
        assert!(run(meta, Value::Array(vec![Value::Int(1), Value::Null, Value::Bool(true)])).is_ok());
    }

    #[test]
    fn blobs_need_an_open_stream() {
        let meta = FieldMetadata::new(FieldType::Blob);
        let stream = BlobStream::from_bytes(b"data".to_vec());
        assert!(run(meta.clone(), stream.clone()).is_ok());
        stream.close();
        assert_eq!(kind(run(meta.clone(), stream)), ViolationKind::StreamExpected);
        assert_eq!(kind(run(meta, "data")), ViolationKind::StreamExpected);
    }

    #[test]
    fn other_types_are_not_checked() {
        assert!(run(FieldMetadata::new(FieldType::Other), vec![1, 2]).is_ok());
    }
}
