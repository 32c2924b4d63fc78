//! Terminal collaborators and text rendering

use design_core::{DesignView, FieldBinding, FieldWidgets, Navigator, Viewport, Widget};
use design_snapshot::{FieldPath, Node};
use parking_lot::Mutex;
use std::fmt::Write;
use tracing::info;

/// Navigator that remembers where the form went
#[derive(Debug, Default)]
pub struct TerminalNavigator {
    last: Mutex<Option<String>>,
}

impl TerminalNavigator {
    pub fn last_url(&self) -> Option<String> {
        self.last.lock().clone()
    }
}

impl Navigator for TerminalNavigator {
    fn navigate(&self, url: &str) {
        info!(%url, "navigate");
        *self.last.lock() = Some(url.to_string());
    }
}

/// Viewport that logs the scroll target
#[derive(Debug, Default)]
pub struct LogViewport;

impl Viewport for LogViewport {
    fn scroll_to(&self, path: &FieldPath) {
        info!(%path, "first invalid field");
    }
}

/// Widget input that types `value` into the field bound to `target`
#[derive(Debug)]
pub struct TypeInto {
    pub target: FieldPath,
    pub value: String,
}

impl FieldWidgets for TypeInto {
    fn field(&mut self, binding: &FieldBinding) -> Option<Node> {
        (binding.path() == &self.target).then(|| Node::from(self.value.as_str()))
    }
}

fn write_binding(out: &mut String, indent: &str, binding: &FieldBinding) {
    let options = match binding.widget() {
        Widget::Select(options) => format!(" [{}]", options.join("|")),
        Widget::Text | Widget::TextArea => String::new(),
    };
    let _ = writeln!(
        out,
        "{indent}{} ({}){options}: {}",
        binding.label(),
        binding.path(),
        binding.text()
    );
    for message in binding.error().unwrap_or_default() {
        let _ = writeln!(out, "{indent}  ! {message}");
    }
}

fn write_messages(out: &mut String, indent: &str, messages: Option<&Vec<String>>) {
    for message in messages.into_iter().flatten() {
        let _ = writeln!(out, "{indent}! {message}");
    }
}

/// Plain-text rendering of a form
#[must_use]
pub fn render_text(view: &DesignView) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Design ({:?})", view.schema.design);
    write_messages(&mut out, "", view.non_field_errors.as_ref());
    for binding in &view.fields {
        write_binding(&mut out, "  ", binding);
    }

    let _ = writeln!(out, "Branches");
    write_messages(&mut out, "  ", view.branch_errors.as_ref());
    for branch in &view.branches {
        let control = if branch.is_control { " (control)" } else { "" };
        let _ = writeln!(out, "  Branch {}{control}", branch.index);
        for binding in &branch.fields {
            write_binding(&mut out, "    ", binding);
        }
        if let Some(prefs) = &branch.preferences {
            let _ = writeln!(out, "    Preferences ({})", prefs.len());
            write_messages(&mut out, "      ", prefs.errors.as_ref());
            for entry in &prefs.entries {
                let _ = writeln!(out, "      Preference {}", entry.index);
                for binding in &entry.fields {
                    write_binding(&mut out, "        ", binding);
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use design_snapshot::ErrorMap;
    use serde_json::json;

    fn view() -> DesignView {
        let data = Node::from(json!({
            "kind": "multi-pref",
            "branches": [{"name": "control", "ratio": 100, "is_control": true, "preferences": [
                {"pref_name": "browser.a", "pref_type": "integer", "pref_branch": "user", "pref_value": "3"}
            ]}]
        }));
        let errors = ErrorMap::from_node(Node::from(json!({
            "branches": [{"preferences": [{"pref_value": "Invalid JSON."}]}]
        })));
        DesignView::render(&data, &errors)
    }

    #[test]
    fn renders_nested_errors_under_their_field() {
        let text = render_text(&view());
        assert!(text.contains("  Branch 0 (control)"));
        assert!(text.contains("Pref Type (branches[0].preferences[0].pref_type) [boolean|integer|string|json string]: integer"));
        assert!(text.contains("Pref Value (branches[0].preferences[0].pref_value): 3\n          ! Invalid JSON."));
    }

    #[test]
    fn type_into_reports_only_target() {
        let mut widgets = TypeInto {
            target: "branches[0].name".parse().unwrap(),
            value: "baseline".to_string(),
        };
        let edits = view().render_with(&mut widgets);
        assert_eq!(edits.len(), 1);
        assert_eq!(edits[0].to_string(), "set branches[0].name");
    }

    #[test]
    fn navigator_keeps_last_url() {
        let nav = TerminalNavigator::default();
        nav.navigate("/a/");
        nav.navigate("/b/");
        assert_eq!(nav.last_url().as_deref(), Some("/b/"));
    }
}
