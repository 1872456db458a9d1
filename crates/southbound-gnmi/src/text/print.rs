// Text-format printer for requests (diagnostics) and responses (CLI output).

use std::fmt::{Display, Write as _};

use super::ToText;
use crate::proto::{
    CapabilityRequest, CapabilityResponse, Decimal64, Encoding, Error as StatusDetail, GetRequest,
    GetResponse, ModelData, Notification, Path, PathElem, ScalarArray, SetRequest, SetResponse,
    SubscribeRequest, SubscribeResponse, Subscription, SubscriptionList, SubscriptionMode,
    TypedValue, Update, UpdateResult, get_request, subscribe_request, subscribe_response,
    subscription_list, typed_value, update_result,
};

/// Accumulates text output. Compact mode keeps everything on one line;
/// pretty mode puts each field on its own line, indented two spaces per
/// nesting level.
pub struct Printer {
    out: String,
    pretty: bool,
    depth: usize,
    at_line_start: bool,
}

impl Printer {
    pub(crate) fn new(pretty: bool) -> Self {
        Self {
            out: String::new(),
            pretty,
            depth: 0,
            at_line_start: true,
        }
    }

    pub(crate) fn finish(self) -> String {
        self.out
    }

    fn begin_field(&mut self, name: &str) {
        if self.pretty {
            if !self.at_line_start {
                self.out.push('\n');
            }
            for _ in 0..self.depth {
                self.out.push_str("  ");
            }
        } else if !self.at_line_start {
            self.out.push(' ');
        }
        self.out.push_str(name);
        self.out.push(':');
        if self.pretty {
            self.out.push(' ');
        }
        self.at_line_start = false;
    }

    fn raw(&mut self, name: &str, value: impl Display) {
        self.begin_field(name);
        let _ = write!(self.out, "{value}");
    }

    fn int<T: Display + Default + PartialEq>(&mut self, name: &str, value: T) {
        if value != T::default() {
            self.raw(name, value);
        }
    }

    fn flag(&mut self, name: &str, value: bool) {
        if value {
            self.raw(name, "true");
        }
    }

    fn string(&mut self, name: &str, value: &str) {
        if !value.is_empty() {
            self.quoted(name, value.as_bytes());
        }
    }

    fn quoted(&mut self, name: &str, value: &[u8]) {
        self.begin_field(name);
        self.out.push('"');
        for &b in value {
            match b {
                b'"' => self.out.push_str("\\\""),
                b'\\' => self.out.push_str("\\\\"),
                b'\n' => self.out.push_str("\\n"),
                b'\r' => self.out.push_str("\\r"),
                b'\t' => self.out.push_str("\\t"),
                0x20..=0x7e => self.out.push(char::from(b)),
                _ => {
                    let _ = write!(self.out, "\\{b:03o}");
                }
            }
        }
        self.out.push('"');
    }

    fn message<M: ToText>(&mut self, name: &str, value: &M) {
        self.begin_field(name);
        self.out.push('<');
        self.at_line_start = !self.pretty;
        self.depth += 1;
        let before = self.out.len();
        value.write_fields(self);
        self.depth -= 1;
        if self.pretty && self.out.len() > before {
            self.out.push('\n');
            for _ in 0..self.depth {
                self.out.push_str("  ");
            }
        }
        self.out.push('>');
        self.at_line_start = false;
    }

    fn opt_message<M: ToText>(&mut self, name: &str, value: Option<&M>) {
        if let Some(v) = value {
            self.message(name, v);
        }
    }

    fn messages<M: ToText>(&mut self, name: &str, values: &[M]) {
        for v in values {
            self.message(name, v);
        }
    }

    fn enumeration(&mut self, name: &str, value: i32, label: Option<&'static str>) {
        if value == 0 {
            return;
        }
        match label {
            Some(l) => self.raw(name, l),
            None => self.raw(name, value),
        }
    }
}

fn encoding_name(v: i32) -> Option<&'static str> {
    Encoding::try_from(v).ok().map(|e| e.as_str_name())
}

// ── Paths and values ────────────────────────────────────────────────

impl ToText for Path {
    fn write_fields(&self, p: &mut Printer) {
        p.string("origin", &self.origin);
        p.messages("elem", &self.elem);
        p.string("target", &self.target);
    }
}

impl ToText for PathElem {
    fn write_fields(&self, p: &mut Printer) {
        p.string("name", &self.name);
        for (k, v) in &self.key {
            p.message("key", &KeyEntry { key: k, value: v });
        }
    }
}

struct KeyEntry<'a> {
    key: &'a str,
    value: &'a str,
}

impl ToText for KeyEntry<'_> {
    fn write_fields(&self, p: &mut Printer) {
        p.quoted("key", self.key.as_bytes());
        p.quoted("value", self.value.as_bytes());
    }
}

impl ToText for TypedValue {
    fn write_fields(&self, p: &mut Printer) {
        use typed_value::Value as V;

        match &self.value {
            None => {}
            Some(V::StringVal(s)) => p.quoted("string_val", s.as_bytes()),
            Some(V::IntVal(v)) => p.raw("int_val", v),
            Some(V::UintVal(v)) => p.raw("uint_val", v),
            Some(V::BoolVal(v)) => p.raw("bool_val", v),
            Some(V::BytesVal(b)) => p.quoted("bytes_val", b),
            Some(V::FloatVal(v)) => p.raw("float_val", v),
            Some(V::DoubleVal(v)) => p.raw("double_val", v),
            Some(V::DecimalVal(d)) => p.message("decimal_val", d),
            Some(V::LeaflistVal(l)) => p.message("leaflist_val", l),
            Some(V::JsonVal(b)) => p.quoted("json_val", b),
            Some(V::JsonIetfVal(b)) => p.quoted("json_ietf_val", b),
            Some(V::AsciiVal(s)) => p.quoted("ascii_val", s.as_bytes()),
            Some(V::ProtoBytes(b)) => p.quoted("proto_bytes", b),
        }
    }
}

impl ToText for Decimal64 {
    fn write_fields(&self, p: &mut Printer) {
        p.int("digits", self.digits);
        p.int("precision", self.precision);
    }
}

impl ToText for ScalarArray {
    fn write_fields(&self, p: &mut Printer) {
        p.messages("element", &self.element);
    }
}

impl ToText for Update {
    fn write_fields(&self, p: &mut Printer) {
        p.opt_message("path", self.path.as_ref());
        p.opt_message("val", self.val.as_ref());
        p.int("duplicates", self.duplicates);
    }
}

impl ToText for ModelData {
    fn write_fields(&self, p: &mut Printer) {
        p.string("name", &self.name);
        p.string("organization", &self.organization);
        p.string("version", &self.version);
    }
}

impl ToText for Notification {
    fn write_fields(&self, p: &mut Printer) {
        p.int("timestamp", self.timestamp);
        p.opt_message("prefix", self.prefix.as_ref());
        p.messages("update", &self.update);
        p.messages("delete", &self.delete);
        p.flag("atomic", self.atomic);
    }
}

// ── Requests ────────────────────────────────────────────────────────

impl ToText for CapabilityRequest {
    fn write_fields(&self, _: &mut Printer) {}
}

impl ToText for GetRequest {
    fn write_fields(&self, p: &mut Printer) {
        p.opt_message("prefix", self.prefix.as_ref());
        p.messages("path", &self.path);
        p.enumeration(
            "type",
            self.r#type,
            get_request::DataType::try_from(self.r#type)
                .ok()
                .map(|t| t.as_str_name()),
        );
        p.enumeration("encoding", self.encoding, encoding_name(self.encoding));
        p.messages("use_models", &self.use_models);
    }
}

impl ToText for SetRequest {
    fn write_fields(&self, p: &mut Printer) {
        p.opt_message("prefix", self.prefix.as_ref());
        p.messages("delete", &self.delete);
        p.messages("replace", &self.replace);
        p.messages("update", &self.update);
    }
}

impl ToText for SubscribeRequest {
    fn write_fields(&self, p: &mut Printer) {
        match &self.request {
            Some(subscribe_request::Request::Subscribe(list)) => p.message("subscribe", list),
            Some(subscribe_request::Request::Poll(_)) => p.message("poll", &Empty),
            None => {}
        }
    }
}

struct Empty;

impl ToText for Empty {
    fn write_fields(&self, _: &mut Printer) {}
}

impl ToText for SubscriptionList {
    fn write_fields(&self, p: &mut Printer) {
        p.opt_message("prefix", self.prefix.as_ref());
        p.messages("subscription", &self.subscription);
        p.enumeration(
            "mode",
            self.mode,
            subscription_list::Mode::try_from(self.mode)
                .ok()
                .map(|m| m.as_str_name()),
        );
        p.flag("allow_aggregation", self.allow_aggregation);
        p.messages("use_models", &self.use_models);
        p.enumeration("encoding", self.encoding, encoding_name(self.encoding));
        p.flag("updates_only", self.updates_only);
    }
}

impl ToText for Subscription {
    fn write_fields(&self, p: &mut Printer) {
        p.opt_message("path", self.path.as_ref());
        p.enumeration(
            "mode",
            self.mode,
            SubscriptionMode::try_from(self.mode)
                .ok()
                .map(|m| m.as_str_name()),
        );
        p.int("sample_interval", self.sample_interval);
        p.flag("suppress_redundant", self.suppress_redundant);
        p.int("heartbeat_interval", self.heartbeat_interval);
    }
}

// ── Responses ───────────────────────────────────────────────────────

impl ToText for CapabilityResponse {
    fn write_fields(&self, p: &mut Printer) {
        p.messages("supported_models", &self.supported_models);
        for &e in &self.supported_encodings {
            match encoding_name(e) {
                Some(name) => p.raw("supported_encodings", name),
                None => p.raw("supported_encodings", e),
            }
        }
        p.string("gNMI_version", &self.gnmi_version);
    }
}

impl ToText for GetResponse {
    fn write_fields(&self, p: &mut Printer) {
        p.messages("notification", &self.notification);
    }
}

impl ToText for SetResponse {
    fn write_fields(&self, p: &mut Printer) {
        p.opt_message("prefix", self.prefix.as_ref());
        p.messages("response", &self.response);
        p.int("timestamp", self.timestamp);
    }
}

impl ToText for UpdateResult {
    fn write_fields(&self, p: &mut Printer) {
        p.opt_message("path", self.path.as_ref());
        p.opt_message("message", self.message.as_ref());
        p.enumeration(
            "op",
            self.op,
            update_result::Operation::try_from(self.op)
                .ok()
                .map(|o| o.as_str_name()),
        );
    }
}

impl ToText for StatusDetail {
    fn write_fields(&self, p: &mut Printer) {
        p.int("code", self.code);
        p.string("message", &self.message);
    }
}

impl ToText for SubscribeResponse {
    fn write_fields(&self, p: &mut Printer) {
        match &self.response {
            Some(subscribe_response::Response::Update(n)) => p.message("update", n),
            Some(subscribe_response::Response::SyncResponse(v)) => p.flag("sync_response", *v),
            None => {}
        }
    }
}
