//! Bulk server import.
//!
//! Accepts either JSON (an array of objects, or one object) or line-oriented
//! text. Text lines are split on `|` if present, else on `,`, else on
//! whitespace; blank lines and `#` comments are skipped. An optional leading
//! type token (`emby`, `jellyfin`, `plex`, `webdav`) overrides the default
//! type for that line. Remaining fields are positional:
//!
//! ```text
//! webdav:  baseUrl | username | password [| displayName] [| remark] [| activate]
//! others:  baseUrl | apiKey [| displayName] [| remark] [| activate]
//! ```
//!
//! With one optional trailing field it is the remark. With two, the last one
//! is `activate` if it reads as a boolean literal, otherwise the pair is
//! `(displayName, remark)`. With three or more they are
//! `(displayName, remark, activate)`.

use serde_json::Value;

use crate::constants::ServerType;
use crate::entry::{EntryFields, ServerEntry, normalize_base_url, parse_bool_literal};

/// Entries that validated, in input order, plus one message per rejected item.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkImport {
    pub entries: Vec<ServerEntry>,
    pub errors: Vec<String>,
}

/// Parse a bulk import blob.
///
/// `default_type` applies to items without a recognized type; an unknown
/// default falls back to `emby`. Invalid JSON is re-read as text.
pub fn parse_bulk(text: &str, default_type: &str) -> BulkImport {
    let default_kind = ServerType::parse(default_type).unwrap_or_default();
    let text = text.trim();
    if text.is_empty() {
        return BulkImport::default();
    }

    if text.starts_with('[') || text.starts_with('{') {
        if let Ok(value) = serde_json::from_str::<Value>(text) {
            if let Some(import) = parse_json(&value, default_kind) {
                return import;
            }
        }
    }

    parse_lines(text, default_kind)
}

fn parse_json(value: &Value, default_kind: ServerType) -> Option<BulkImport> {
    let mut import = BulkImport::default();
    match value {
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                // Non-object elements are skipped without an error.
                let Some(obj) = item.as_object() else {
                    continue;
                };
                let fields = EntryFields::from_json(obj, default_kind, false);
                import.push(ServerEntry::validate(fields).ok(), format!("json[{}]: invalid server", i));
            }
        }
        Value::Object(obj) => {
            let fields = EntryFields::from_json(obj, default_kind, false);
            import.push(ServerEntry::validate(fields).ok(), "json: invalid server".to_string());
        }
        _ => return None,
    }
    Some(import)
}

fn parse_lines(text: &str, default_kind: ServerType) -> BulkImport {
    let mut import = BulkImport::default();
    for (i, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields = parse_line(line, default_kind);
        import.push(
            ServerEntry::validate(fields).ok(),
            format!("line {}: invalid format", i + 1),
        );
    }
    import
}

impl BulkImport {
    fn push(&mut self, entry: Option<ServerEntry>, error: String) {
        match entry {
            Some(entry) => self.entries.push(entry),
            None => self.errors.push(error),
        }
    }
}

/// Split one line into its positional fields.
pub fn split_fields(line: &str) -> Vec<&str> {
    let parts: Vec<&str> = if line.contains('|') {
        line.split('|').collect()
    } else if line.contains(',') {
        line.split(',').collect()
    } else {
        line.split_whitespace().collect()
    };
    parts.into_iter().map(str::trim).collect()
}

/// Map one text line onto entry fields.
pub fn parse_line(line: &str, default_kind: ServerType) -> EntryFields {
    let parts = split_fields(line);

    let (kind, fields) = match parts.first().and_then(|first| ServerType::parse(first)) {
        Some(kind) => (kind, &parts[1..]),
        None => (default_kind, &parts[..]),
    };

    let mut out = EntryFields {
        kind,
        base_url: fields.first().map(|s| normalize_base_url(s)).unwrap_or_default(),
        ..Default::default()
    };

    let rest = fields.get(1..).unwrap_or_default();
    let trailing = if kind == ServerType::Webdav {
        out.username = field(rest, 0);
        out.password = field(rest, 1);
        rest.get(2..).unwrap_or_default()
    } else {
        out.api_key = field(rest, 0);
        rest.get(1..).unwrap_or_default()
    };

    match trailing {
        [] => {}
        [remark] => out.remark = remark.to_string(),
        [a, b] => match parse_bool_literal(b) {
            Some(activate) => {
                out.remark = a.to_string();
                out.activate = activate;
            }
            None => {
                out.display_name = a.to_string();
                out.remark = b.to_string();
            }
        },
        [display_name, remark, activate, ..] => {
            out.display_name = display_name.to_string();
            out.remark = remark.to_string();
            out.activate = parse_bool_literal(activate).unwrap_or(false);
        }
    }

    out
}

fn field(parts: &[&str], idx: usize) -> String {
    parts.get(idx).map(|s| s.to_string()).unwrap_or_default()
}
