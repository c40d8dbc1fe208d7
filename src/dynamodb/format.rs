use humansize::{BINARY, format_size};

use super::value::AttrValue;

pub const COMPACT_MAX_CHARS: usize = 70;
const COMPACT_KEEP_CHARS: usize = COMPACT_MAX_CHARS - 3;

pub const TRUE_GLYPH: &str = "✓";
pub const FALSE_GLYPH: &str = "✗";
pub const NULL_GLYPH: &str = "∅";

/// Single-line rendering used in table cells. Containers only show their size.
pub fn format_compact(value: &AttrValue) -> String {
    match value {
        AttrValue::S(s) => truncate_chars(s),
        AttrValue::N(n) => n.clone(),
        AttrValue::Bool(true) => TRUE_GLYPH.to_string(),
        AttrValue::Bool(false) => FALSE_GLYPH.to_string(),
        AttrValue::Null => NULL_GLYPH.to_string(),
        AttrValue::L(values) => format!("[{}]", values.len()),
        AttrValue::M(map) => format!("{{{}}}", map.len()),
        AttrValue::Ss(values) => format!("Set<{}>", values.len()),
        AttrValue::Ns(values) => format!("NumSet<{}>", values.len()),
        AttrValue::Bs(values) => format!("BinSet<{}>", values.len()),
        AttrValue::B(bytes) => format!("Binary<{} bytes>", bytes.len()),
    }
}

fn truncate_chars(s: &str) -> String {
    if s.chars().count() <= COMPACT_MAX_CHARS {
        return s.to_string();
    }
    let mut out: String = s.chars().take(COMPACT_KEEP_CHARS).collect();
    out.push_str("...");
    out
}

/// Multi-line rendering used by the item detail view. Each nesting level is
/// indented by two spaces; map keys are sorted.
pub fn format_detailed(value: &AttrValue, indent: usize) -> String {
    let mut lines = Vec::new();
    write_detailed(&mut lines, None, value, indent);
    lines.join("\n")
}

fn write_detailed(lines: &mut Vec<String>, label: Option<&str>, value: &AttrValue, indent: usize) {
    let prefix = "  ".repeat(indent);
    let lead = label.map(|label| format!("{label} ")).unwrap_or_default();
    let type_name = value.type_name();
    match value {
        AttrValue::S(s) => lines.push(format!("{prefix}{lead}({type_name}) {s}")),
        AttrValue::N(n) => lines.push(format!("{prefix}{lead}({type_name}) {n}")),
        AttrValue::Bool(b) => lines.push(format!("{prefix}{lead}({type_name}) {b}")),
        AttrValue::Null => lines.push(format!("{prefix}{lead}({type_name})")),
        AttrValue::B(bytes) => lines.push(format!(
            "{prefix}{lead}({type_name}) {}",
            format_size(bytes.len() as u64, BINARY)
        )),
        AttrValue::L(values) => {
            lines.push(format!("{prefix}{lead}({type_name} - {} items)", values.len()));
            for (idx, item) in values.iter().enumerate() {
                write_detailed(lines, Some(&format!("[{idx}]")), item, indent + 1);
            }
        }
        AttrValue::M(map) => {
            lines.push(format!("{prefix}{lead}({type_name} - {} fields)", map.len()));
            // BTreeMap iteration is already key-sorted
            for (key, item) in map {
                write_detailed(lines, Some(&format!("{key}:")), item, indent + 1);
            }
        }
        AttrValue::Ss(values) => {
            lines.push(format!("{prefix}{lead}({type_name} - {} items)", values.len()));
            for item in values {
                write_detailed(lines, Some("-"), &AttrValue::S(item.clone()), indent + 1);
            }
        }
        AttrValue::Ns(values) => {
            lines.push(format!("{prefix}{lead}({type_name} - {} items)", values.len()));
            for item in values {
                write_detailed(lines, Some("-"), &AttrValue::N(item.clone()), indent + 1);
            }
        }
        AttrValue::Bs(values) => {
            lines.push(format!("{prefix}{lead}({type_name} - {} items)", values.len()));
            for item in values {
                write_detailed(lines, Some("-"), &AttrValue::B(item.clone()), indent + 1);
            }
        }
    }
}
