//! Protobuf text format for gNMI messages.
//!
//! Operators and test fixtures describe requests the way the gNMI tooling
//! prints them, e.g.
//!
//! ```text
//! prefix: <target: 'leaf1'>
//! delete: <elem: <name: 'system'> elem: <name: 'config'>>
//! ```
//!
//! [`parse`] decodes that form into the structured request types;
//! [`to_text`] and [`to_text_pretty`] print requests and responses back.

mod decode;
mod lexer;
mod print;
mod tree;

use std::fmt;

pub use decode::Cardinality;
pub use print::Printer;
pub use tree::Field;

/// Line and column (both 1-based) of a token in the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pos {
    pub line: usize,
    pub col: usize,
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

/// A lexical, syntactic or type error in text-format input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextError {
    pub pos: Option<Pos>,
    pub message: String,
}

impl TextError {
    pub(crate) fn at(pos: Pos, message: impl Into<String>) -> Self {
        Self {
            pos: Some(pos),
            message: message.into(),
        }
    }
}

impl fmt::Display for TextError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.pos {
            Some(pos) => write!(f, "{pos}: {}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for TextError {}

/// Messages that can be decoded from text format.
pub trait FromText: Default {
    /// Fully-qualified protobuf message name, used in diagnostics.
    const NAME: &'static str;

    #[doc(hidden)]
    fn merge_field(&mut self, field: &Field) -> Result<Cardinality, TextError>;
}

/// Messages that can be printed in text format.
pub trait ToText {
    #[doc(hidden)]
    fn write_fields(&self, printer: &mut Printer);
}

/// Parse a text-format message. Empty (or comment-only) input yields the
/// default message.
pub fn parse<M: FromText>(input: &str) -> Result<M, TextError> {
    let tokens = lexer::tokenize(input)?;
    let fields = tree::parse_fields(tokens)?;
    decode::decode_fields(&fields)
}

/// Single-line rendering, suitable for log fields and error messages.
pub fn to_text<M: ToText>(msg: &M) -> String {
    let mut printer = Printer::new(false);
    msg.write_fields(&mut printer);
    printer.finish()
}

/// Multi-line rendering with two-space indentation.
pub fn to_text_pretty<M: ToText>(msg: &M) -> String {
    let mut printer = Printer::new(true);
    msg.write_fields(&mut printer);
    printer.finish()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::proto::{
        CapabilityRequest, GetRequest, SetRequest, TypedValue, get_request, typed_value,
    };

    #[test]
    fn get_request_with_keys_and_enums() {
        let req: GetRequest = parse(
            "prefix: <target: 'leaf1'>
             path: <elem: <name: 'interfaces'>
                    elem: <name: 'interface' key: <key: 'name' value: 'eth0'>>>
             type: STATE
             encoding: JSON_IETF",
        )
        .unwrap();

        assert_eq!(req.prefix.as_ref().unwrap().target, "leaf1");
        assert_eq!(req.path.len(), 1);
        assert_eq!(req.path[0].to_string(), "/interfaces/interface[name=eth0]");
        assert_eq!(req.r#type(), get_request::DataType::State);
        assert_eq!(req.encoding, 4);
    }

    #[test]
    fn set_request_with_delete_and_update() {
        let req: SetRequest = parse(
            r#"delete: <elem: <name: 'system'> elem: <name: 'config'>>
               update: {
                 path { elem { name: "system" } elem { name: "config" } elem { name: "hostname" } }
                 val { string_val: "leaf1" }
               }"#,
        )
        .unwrap();

        assert_eq!(req.delete.len(), 1);
        assert_eq!(req.delete[0].to_string(), "/system/config");
        assert_eq!(req.update.len(), 1);
        assert_eq!(
            req.update[0].val.as_ref().and_then(TypedValue::as_str),
            Some("leaf1")
        );
    }

    #[test]
    fn numeric_typed_values() {
        let req: SetRequest = parse(
            "update: <path: <elem: <name: 'mtu'>> val: <uint_val: 9000>>
             update: <path: <elem: <name: 'offset'>> val: <int_val: -0x10>>
             update: <path: <elem: <name: 'ratio'>> val: <double_val: 2.5e1>>
             update: <path: <elem: <name: 'price'>> val: <decimal_val: <digits: 1234 precision: 2>>>",
        )
        .unwrap();

        let vals: Vec<_> = req
            .update
            .iter()
            .map(|u| u.val.clone().unwrap().value.unwrap())
            .collect();
        assert_eq!(vals[0], typed_value::Value::UintVal(9000));
        assert_eq!(vals[1], typed_value::Value::IntVal(-16));
        assert_eq!(vals[2], typed_value::Value::DoubleVal(25.0));
        assert!(matches!(
            &vals[3],
            typed_value::Value::DecimalVal(d) if d.digits == 1234 && d.precision == 2
        ));
    }

    #[test]
    fn empty_input_is_the_default_message() {
        let req: CapabilityRequest = parse("  # nothing here\n").unwrap();
        assert_eq!(req, CapabilityRequest::default());
    }

    #[test]
    fn free_text_is_rejected_with_position() {
        let err = parse::<CapabilityRequest>("not a valid string").unwrap_err();
        assert_eq!(err.pos, Some(Pos { line: 1, col: 5 }));
        assert!(err.to_string().starts_with("1:5:"));
    }

    #[test]
    fn unknown_fields_and_bad_enums_are_rejected() {
        let err = parse::<GetRequest>("bogus: 1").unwrap_err();
        assert!(err.message.contains("unknown field 'bogus' in gnmi.GetRequest"));

        let err = parse::<GetRequest>("type: EVERYTHING").unwrap_err();
        assert!(err.message.contains("EVERYTHING"));

        let err = parse::<GetRequest>("prefix: <target: 'a'> prefix: <target: 'b'>").unwrap_err();
        assert!(err.message.contains("non-repeated field 'prefix'"));
    }

    #[test]
    fn runaway_nesting_is_an_error_not_a_crash() {
        let input = format!("{}{}", "a{".repeat(200_000), "}".repeat(200_000));
        let err = parse::<SetRequest>(&input).unwrap_err();
        assert!(err.message.contains("nesting exceeds"), "got: {err}");
        assert_eq!(err.pos, Some(Pos { line: 1, col: 202 }));
    }

    #[test]
    fn oneof_conflict_is_rejected() {
        let err = parse::<SetRequest>("update: <val: <string_val: 'a' int_val: 1>>").unwrap_err();
        assert!(err.message.contains("oneof"));
    }

    #[test]
    fn compact_printing_reparses() {
        let text = "delete: <elem: <name: 'a'> elem: <name: 'b' key: <key: 'k' value: 'v \"q\"'>>>";
        let req: SetRequest = parse(text).unwrap();
        let printed = to_text(&req);
        assert_eq!(
            printed,
            r#"delete:<elem:<name:"a"> elem:<name:"b" key:<key:"k" value:"v \"q\"">>>"#
        );
        assert_eq!(parse::<SetRequest>(&printed).unwrap(), req);
    }

    #[test]
    fn pretty_printing_indents_nested_messages() {
        let req: GetRequest = parse("path: <elem: <name: 'a'>> type: CONFIG").unwrap();
        assert_eq!(
            to_text_pretty(&req),
            "path: <\n  elem: <\n    name: \"a\"\n  >\n>\ntype: CONFIG"
        );
    }
}
