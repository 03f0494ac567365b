//! Label derivation: turns binding names into display text.

use crate::schema::Binding;

/// Humanize a field name: `"user.firstName"` -> `"First Name"`,
/// `"total_revenue"` -> `"Total Revenue"`.
///
/// Takes the last `.` segment, treats `_` as a space, splits at
/// lower-to-upper camel boundaries and capitalizes each word.
pub fn humanize(field: &str) -> String {
    let last = field.rsplit('.').next().unwrap_or(field);

    let mut spaced = String::with_capacity(last.len() + 4);
    let mut prev: Option<char> = None;
    for ch in last.chars() {
        let ch = if ch == '_' { ' ' } else { ch };
        if ch.is_uppercase() && prev.is_some_and(|p| p.is_lowercase()) {
            spaced.push(' ');
        }
        spaced.push(ch);
        prev = Some(ch);
    }

    spaced
        .split_whitespace()
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// The label a block gets when none is written.
///
/// Literal text is its own label, empty text included. Field names are
/// humanized, and a name with nothing to humanize derives nothing. Computed
/// and indexed bindings derive nothing.
pub fn derive_label(binding: Option<&Binding>) -> Option<String> {
    match binding? {
        Binding::Literal(text) => Some(text.clone()),
        Binding::Field(name) => Some(humanize(name)).filter(|label| !label.is_empty()),
        Binding::Indexed(_) | Binding::Computed(_) | Binding::Unsupported(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn humanize_camel_case() {
        assert_eq!(humanize("dynamicTitle"), "Dynamic Title");
        assert_eq!(humanize("totalRevenueYTD"), "Total Revenue YTD");
    }

    #[test]
    fn humanize_snake_case() {
        assert_eq!(humanize("order_count"), "Order Count");
        assert_eq!(humanize("__padded__name_"), "Padded Name");
    }

    #[test]
    fn humanize_uses_last_path_segment() {
        assert_eq!(humanize("user.profile.firstName"), "First Name");
        assert_eq!(humanize("revenue"), "Revenue");
    }

    #[test]
    fn derive_label_by_binding_kind() {
        assert_eq!(
            derive_label(Some(&Binding::Field("unitPrice".into()))),
            Some("Unit Price".into())
        );
        assert_eq!(
            derive_label(Some(&Binding::Literal("Tab1".into()))),
            Some("Tab1".into())
        );
        assert_eq!(derive_label(Some(&Binding::Indexed(2))), None);
        assert_eq!(derive_label(Some(&Binding::Computed("a*b".into()))), None);
        assert_eq!(derive_label(Some(&Binding::Field("x.".into()))), None);
        assert_eq!(derive_label(Some(&Binding::Literal(String::new()))), Some(String::new()));
        assert_eq!(derive_label(None), None);
    }
}
