//! Human-readable plan output

use similar::{ChangeTag, TextDiff};

use smallstep_core::{PlanAction, Value};

use super::PlannedChange;

const UNKNOWN: &str = "(known after apply)";

fn displayable(value: &Value) -> serde_json::Value {
    match value {
        Value::Unknown => serde_json::Value::String(UNKNOWN.to_string()),
        Value::List(items) => serde_json::Value::Array(items.iter().map(displayable).collect()),
        Value::Object(fields) => serde_json::Value::Object(
            fields
                .iter()
                .map(|(k, v)| (k.clone(), displayable(v)))
                .collect(),
        ),
        other => other.to_json(),
    }
}

fn pretty(value: Option<&Value>) -> String {
    match value {
        Some(value) => {
            let mut text = serde_json::to_string_pretty(&displayable(value)).unwrap_or_default();
            text.push('\n');
            text
        }
        None => String::new(),
    }
}

/// Line diff between prior and planned state
pub fn diff(before: Option<&Value>, after: Option<&Value>) -> String {
    let old = pretty(before);
    let new = pretty(after);
    let diff = TextDiff::from_lines(&old, &new);
    let mut out = String::new();
    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => '-',
            ChangeTag::Insert => '+',
            ChangeTag::Equal => ' ',
        };
        out.push(sign);
        out.push(' ');
        out.push_str(change.value().trim_end());
        out.push('\n');
    }
    out
}

/// Every change that is not a no-op, with its diff
pub fn changes(changes: &[PlannedChange]) -> String {
    let mut out = String::new();
    for change in changes.iter().filter(|c| c.action != PlanAction::NoOp) {
        out.push_str(&format!("# {} will be {}\n", change.address, verb(change.action)));
        if !change.replace_paths.is_empty() {
            let paths: Vec<String> = change.replace_paths.iter().map(ToString::to_string).collect();
            out.push_str(&format!("# forced by: {}\n", paths.join(", ")));
        }
        out.push_str(&diff(change.prior.as_ref(), change.planned.as_ref()));
    }
    out
}

fn verb(action: PlanAction) -> &'static str {
    match action {
        PlanAction::Create => "created",
        PlanAction::Update => "updated in-place",
        PlanAction::Replace => "replaced",
        PlanAction::Delete => "destroyed",
        PlanAction::NoOp => "left unchanged",
    }
}
