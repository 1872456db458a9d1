// Typed decoding of the generic field tree into gNMI request messages.

use std::collections::HashSet;

use super::tree::{Field, Scalar, Value};
use super::{FromText, Pos, TextError};
use crate::proto::{
    CapabilityRequest, Decimal64, Encoding, GetRequest, ModelData, Path, PathElem, ScalarArray,
    SetRequest, TypedValue, Update, get_request, typed_value,
};

/// Whether a field may legally appear more than once in a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    Singular,
    Repeated,
}

pub(crate) fn decode_fields<M: FromText>(fields: &[Field]) -> Result<M, TextError> {
    let mut msg = M::default();
    let mut seen = HashSet::new();
    for field in fields {
        let cardinality = msg.merge_field(field)?;
        if cardinality == Cardinality::Singular && !seen.insert(field.name.as_str()) {
            return Err(TextError::at(
                field.pos,
                format!("non-repeated field '{}' is repeated", field.name),
            ));
        }
    }
    Ok(msg)
}

fn unknown(field: &Field, message: &str) -> TextError {
    TextError::at(
        field.pos,
        format!("unknown field '{}' in {message}", field.name),
    )
}

// ── Value accessors ─────────────────────────────────────────────────

fn singular(field: &Field) -> Result<&Value, TextError> {
    match &field.value {
        Value::List(_, pos) => Err(TextError::at(
            *pos,
            format!("non-repeated field '{}' given a list", field.name),
        )),
        other => Ok(other),
    }
}

/// Every value of a repeated field, whether written once, several times,
/// or as `[a, b]`.
fn each(field: &Field) -> &[Value] {
    match &field.value {
        Value::List(items, _) => items,
        other => std::slice::from_ref(other),
    }
}

fn mismatch(value: &Value, expected: &str) -> TextError {
    TextError::at(value.pos(), format!("expected {expected}"))
}

fn message<M: FromText>(value: &Value) -> Result<M, TextError> {
    match value {
        Value::Message(fields, _) => decode_fields(fields),
        other => Err(mismatch(other, &format!("message {}", M::NAME))),
    }
}

fn bytes(value: &Value) -> Result<Vec<u8>, TextError> {
    match value {
        Value::Scalar(Scalar::Bytes(b), _) => Ok(b.clone()),
        other => Err(mismatch(other, "string literal")),
    }
}

fn string(value: &Value) -> Result<String, TextError> {
    String::from_utf8(bytes(value)?)
        .map_err(|_| TextError::at(value.pos(), "string field contains invalid UTF-8"))
}

/// Unsigned magnitude of an integer lexeme (decimal, `0x` hex, `0` octal).
fn magnitude(lexeme: &str, pos: Pos) -> Result<u64, TextError> {
    let parsed = if let Some(hex) = lexeme
        .strip_prefix("0x")
        .or_else(|| lexeme.strip_prefix("0X"))
    {
        u64::from_str_radix(hex, 16)
    } else if lexeme.len() > 1 && lexeme.starts_with('0') {
        u64::from_str_radix(&lexeme[1..], 8)
    } else {
        lexeme.parse::<u64>()
    };
    parsed.map_err(|_| TextError::at(pos, format!("invalid integer '{lexeme}'")))
}

fn int64(value: &Value) -> Result<i64, TextError> {
    match value {
        Value::Scalar(Scalar::Number { negative, lexeme }, pos) => {
            let m = magnitude(lexeme, *pos)?;
            let v = if *negative {
                0_i64.checked_sub_unsigned(m)
            } else {
                i64::try_from(m).ok()
            };
            v.ok_or_else(|| TextError::at(*pos, format!("integer '{lexeme}' out of range")))
        }
        other => Err(mismatch(other, "integer")),
    }
}

fn uint64(value: &Value) -> Result<u64, TextError> {
    match value {
        Value::Scalar(
            Scalar::Number {
                negative: false,
                lexeme,
            },
            pos,
        ) => magnitude(lexeme, *pos),
        other => Err(mismatch(other, "unsigned integer")),
    }
}

fn uint32(value: &Value) -> Result<u32, TextError> {
    let v = uint64(value)?;
    u32::try_from(v).map_err(|_| TextError::at(value.pos(), format!("integer {v} out of range")))
}

fn boolean(value: &Value) -> Result<bool, TextError> {
    match value {
        Value::Scalar(Scalar::Ident(s), _) => match s.as_str() {
            "true" | "True" | "t" => Ok(true),
            "false" | "False" | "f" => Ok(false),
            _ => Err(mismatch(value, "boolean")),
        },
        Value::Scalar(
            Scalar::Number {
                negative: false,
                lexeme,
            },
            _,
        ) => match lexeme.as_str() {
            "1" => Ok(true),
            "0" => Ok(false),
            _ => Err(mismatch(value, "boolean")),
        },
        other => Err(mismatch(other, "boolean")),
    }
}

fn double(value: &Value) -> Result<f64, TextError> {
    let special = |s: &str| match s.to_ascii_lowercase().as_str() {
        "inf" | "infinity" => Some(f64::INFINITY),
        "nan" => Some(f64::NAN),
        _ => None,
    };
    match value {
        Value::Scalar(Scalar::Number { negative, lexeme }, pos) => {
            let v = if lexeme.starts_with("0x") || lexeme.starts_with("0X") {
                int_as_float(magnitude(lexeme, *pos)?)
            } else {
                lexeme
                    .trim_end_matches(['f', 'F'])
                    .parse::<f64>()
                    .map_err(|_| TextError::at(*pos, format!("invalid number '{lexeme}'")))?
            };
            Ok(if *negative { -v } else { v })
        }
        Value::Scalar(Scalar::Ident(s), _) => special(s).ok_or_else(|| mismatch(value, "number")),
        Value::Scalar(Scalar::NegIdent(s), _) => special(s)
            .map(|v| -v)
            .ok_or_else(|| mismatch(value, "number")),
        other => Err(mismatch(other, "number")),
    }
}

#[allow(clippy::cast_precision_loss, clippy::as_conversions)]
fn int_as_float(v: u64) -> f64 {
    v as f64
}

#[allow(clippy::cast_possible_truncation, clippy::as_conversions)]
fn float(value: &Value) -> Result<f32, TextError> {
    double(value).map(|v| v as f32)
}

/// Enum by protocol name, or by number.
fn enumeration(
    value: &Value,
    type_name: &str,
    by_name: fn(&str) -> Option<i32>,
) -> Result<i32, TextError> {
    match value {
        Value::Scalar(Scalar::Ident(name), pos) => by_name(name).ok_or_else(|| {
            TextError::at(*pos, format!("unknown value '{name}' for enum {type_name}"))
        }),
        Value::Scalar(Scalar::Number { .. }, _) => {
            let n = int64(value)?;
            i32::try_from(n)
                .map_err(|_| TextError::at(value.pos(), format!("enum value {n} out of range")))
        }
        other => Err(mismatch(other, &format!("enum {type_name}"))),
    }
}

fn encoding(value: &Value) -> Result<i32, TextError> {
    enumeration(value, "gnmi.Encoding", |s| {
        Encoding::from_str_name(s).map(i32::from)
    })
}

// ── Messages ────────────────────────────────────────────────────────

impl FromText for CapabilityRequest {
    const NAME: &'static str = "gnmi.CapabilityRequest";

    fn merge_field(&mut self, field: &Field) -> Result<Cardinality, TextError> {
        Err(unknown(field, Self::NAME))
    }
}

impl FromText for Path {
    const NAME: &'static str = "gnmi.Path";

    fn merge_field(&mut self, field: &Field) -> Result<Cardinality, TextError> {
        match field.name.as_str() {
            "origin" => self.origin = string(singular(field)?)?,
            "target" => self.target = string(singular(field)?)?,
            "elem" => {
                for v in each(field) {
                    self.elem.push(message(v)?);
                }
                return Ok(Cardinality::Repeated);
            }
            _ => return Err(unknown(field, Self::NAME)),
        }
        Ok(Cardinality::Singular)
    }
}

impl FromText for PathElem {
    const NAME: &'static str = "gnmi.PathElem";

    fn merge_field(&mut self, field: &Field) -> Result<Cardinality, TextError> {
        match field.name.as_str() {
            "name" => {
                self.name = string(singular(field)?)?;
                Ok(Cardinality::Singular)
            }
            "key" => {
                for v in each(field) {
                    let entry: KeyEntry = message(v)?;
                    self.key.insert(entry.key, entry.value);
                }
                Ok(Cardinality::Repeated)
            }
            _ => Err(unknown(field, Self::NAME)),
        }
    }
}

/// One `map<string, string>` entry, written `key: <key: 'k' value: 'v'>`.
#[derive(Default)]
struct KeyEntry {
    key: String,
    value: String,
}

impl FromText for KeyEntry {
    const NAME: &'static str = "gnmi.PathElem.KeyEntry";

    fn merge_field(&mut self, field: &Field) -> Result<Cardinality, TextError> {
        match field.name.as_str() {
            "key" => self.key = string(singular(field)?)?,
            "value" => self.value = string(singular(field)?)?,
            _ => return Err(unknown(field, Self::NAME)),
        }
        Ok(Cardinality::Singular)
    }
}

impl FromText for ModelData {
    const NAME: &'static str = "gnmi.ModelData";

    fn merge_field(&mut self, field: &Field) -> Result<Cardinality, TextError> {
        let v = string(singular(field)?);
        match field.name.as_str() {
            "name" => self.name = v?,
            "organization" => self.organization = v?,
            "version" => self.version = v?,
            _ => return Err(unknown(field, Self::NAME)),
        }
        Ok(Cardinality::Singular)
    }
}

impl FromText for GetRequest {
    const NAME: &'static str = "gnmi.GetRequest";

    fn merge_field(&mut self, field: &Field) -> Result<Cardinality, TextError> {
        match field.name.as_str() {
            "prefix" => self.prefix = Some(message(singular(field)?)?),
            "type" => {
                self.r#type = enumeration(singular(field)?, "gnmi.GetRequest.DataType", |s| {
                    get_request::DataType::from_str_name(s).map(i32::from)
                })?;
            }
            "encoding" => self.encoding = encoding(singular(field)?)?,
            "path" => {
                for v in each(field) {
                    self.path.push(message(v)?);
                }
                return Ok(Cardinality::Repeated);
            }
            "use_models" => {
                for v in each(field) {
                    self.use_models.push(message(v)?);
                }
                return Ok(Cardinality::Repeated);
            }
            _ => return Err(unknown(field, Self::NAME)),
        }
        Ok(Cardinality::Singular)
    }
}

impl FromText for SetRequest {
    const NAME: &'static str = "gnmi.SetRequest";

    fn merge_field(&mut self, field: &Field) -> Result<Cardinality, TextError> {
        match field.name.as_str() {
            "prefix" => {
                self.prefix = Some(message(singular(field)?)?);
                return Ok(Cardinality::Singular);
            }
            "delete" => {
                for v in each(field) {
                    self.delete.push(message(v)?);
                }
            }
            "replace" => {
                for v in each(field) {
                    self.replace.push(message(v)?);
                }
            }
            "update" => {
                for v in each(field) {
                    self.update.push(message(v)?);
                }
            }
            _ => return Err(unknown(field, Self::NAME)),
        }
        Ok(Cardinality::Repeated)
    }
}

impl FromText for Update {
    const NAME: &'static str = "gnmi.Update";

    fn merge_field(&mut self, field: &Field) -> Result<Cardinality, TextError> {
        match field.name.as_str() {
            "path" => self.path = Some(message(singular(field)?)?),
            "val" => self.val = Some(message(singular(field)?)?),
            "duplicates" => self.duplicates = uint32(singular(field)?)?,
            _ => return Err(unknown(field, Self::NAME)),
        }
        Ok(Cardinality::Singular)
    }
}

impl FromText for TypedValue {
    const NAME: &'static str = "gnmi.TypedValue";

    fn merge_field(&mut self, field: &Field) -> Result<Cardinality, TextError> {
        use typed_value::Value as V;

        let v = singular(field)?;
        let value = match field.name.as_str() {
            "string_val" => V::StringVal(string(v)?),
            "int_val" => V::IntVal(int64(v)?),
            "uint_val" => V::UintVal(uint64(v)?),
            "bool_val" => V::BoolVal(boolean(v)?),
            "bytes_val" => V::BytesVal(bytes(v)?),
            "float_val" => V::FloatVal(float(v)?),
            "double_val" => V::DoubleVal(double(v)?),
            "decimal_val" => V::DecimalVal(message(v)?),
            "leaflist_val" => V::LeaflistVal(message(v)?),
            "json_val" => V::JsonVal(bytes(v)?),
            "json_ietf_val" => V::JsonIetfVal(bytes(v)?),
            "ascii_val" => V::AsciiVal(string(v)?),
            "proto_bytes" => V::ProtoBytes(bytes(v)?),
            _ => return Err(unknown(field, Self::NAME)),
        };
        if self.value.is_some() {
            return Err(TextError::at(
                field.pos,
                format!("field '{}' conflicts with another value of oneof", field.name),
            ));
        }
        self.value = Some(value);
        Ok(Cardinality::Singular)
    }
}

impl FromText for Decimal64 {
    const NAME: &'static str = "gnmi.Decimal64";

    fn merge_field(&mut self, field: &Field) -> Result<Cardinality, TextError> {
        match field.name.as_str() {
            "digits" => self.digits = int64(singular(field)?)?,
            "precision" => self.precision = uint32(singular(field)?)?,
            _ => return Err(unknown(field, Self::NAME)),
        }
        Ok(Cardinality::Singular)
    }
}

impl FromText for ScalarArray {
    const NAME: &'static str = "gnmi.ScalarArray";

    fn merge_field(&mut self, field: &Field) -> Result<Cardinality, TextError> {
        if field.name != "element" {
            return Err(unknown(field, Self::NAME));
        }
        for v in each(field) {
            self.element.push(message(v)?);
        }
        Ok(Cardinality::Repeated)
    }
}
