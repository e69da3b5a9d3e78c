//! HTML templates for the web interface.
//!
//! Templates are embedded at compile time using `include_str!` and filled by
//! replacing `{{placeholder}}` markers.

/// Page shell with header and message area.
pub const BASE_TEMPLATE: &str = include_str!("templates/base.html");

/// Task list with toggle and delete actions.
pub const INDEX_TEMPLATE: &str = include_str!("templates/index.html");

/// Create and edit form.
pub const TASK_FORM_TEMPLATE: &str = include_str!("templates/task_form.html");

/// Fill `{{key}}` markers in one pass.
///
/// Inserted values are never rescanned, so user text that happens to contain
/// a marker is output literally. Unknown markers are left in place.
pub fn render(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            out.push_str(&rest[start..]);
            return out;
        };

        let key = &after[..end];
        match values.iter().find(|(name, _)| *name == key) {
            Some((_, value)) => out.push_str(value),
            None => out.push_str(&rest[start..start + 2 + end + 2]),
        }
        rest = &after[end + 2..];
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fills_known_markers() {
        assert_eq!(render("<h1>{{a}}</h1>{{b}}", &[("a", "x"), ("b", "y")]), "<h1>x</h1>y");
    }

    #[test]
    fn values_are_not_rescanned() {
        assert_eq!(
            render("{{title}}|{{description}}", &[("title", "{{description}}"), ("description", "d")]),
            "{{description}}|d"
        );
    }

    #[test]
    fn unknown_and_unclosed_markers_stay() {
        assert_eq!(render("{{nope}} {{open", &[]), "{{nope}} {{open");
    }

    #[test]
    fn templates_have_their_markers() {
        for marker in ["{{page_title}}", "{{message}}", "{{content}}"] {
            assert!(BASE_TEMPLATE.contains(marker), "base missing {marker}");
        }
        for marker in ["{{task_count}}", "{{task_rows}}"] {
            assert!(INDEX_TEMPLATE.contains(marker), "index missing {marker}");
        }
        for marker in ["{{form_action}}", "{{title}}", "{{priority_options}}", "{{due_date}}"] {
            assert!(TASK_FORM_TEMPLATE.contains(marker), "form missing {marker}");
        }
    }
}
