//! Member name derivation
//!
//! Helpers that turn method and class names into member ids and friendly
//! names. They operate on `&str` only and never allocate more than the
//! result.

/// Upper-case the first character
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Lower-case the first character
pub fn decapitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Split an identifier into words at case changes and underscores.
///
/// Runs of capitals are kept together as an acronym: `"exportURLList"`
/// gives `["export", "URL", "List"]`.
fn words(s: &str) -> Vec<String> {
    let chars: Vec<char> = s.chars().collect();
    let mut words = Vec::new();
    let mut current = String::new();

    for (i, &c) in chars.iter().enumerate() {
        if c == '_' || c == '$' || c.is_whitespace() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }
        if c.is_uppercase() && !current.is_empty() {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            if prev.is_lowercase() || prev.is_ascii_digit() || (prev.is_uppercase() && next_is_lower)
            {
                words.push(std::mem::take(&mut current));
            }
        }
        current.push(c);
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

/// Friendly name of an identifier: `"changeStatus"` becomes `"Change status"`.
pub fn natural_name(s: &str) -> String {
    words(s)
        .iter()
        .enumerate()
        .map(|(i, word)| {
            let is_acronym = word.chars().count() > 1 && word.chars().all(|c| !c.is_lowercase());
            if i == 0 {
                capitalize(word)
            } else if is_acronym {
                word.clone()
            } else {
                word.to_lowercase()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Remove whitespace and lower-case the first character
pub fn camel_lower_first(s: &str) -> String {
    let compact: String = s.chars().filter(|c| !c.is_whitespace()).collect();
    decapitalize(&compact)
}

/// Part of a mixin class name after its final `_` or `$` separator.
///
/// When there is no separator, or the separator is the last character, the
/// whole name is returned.
pub fn mixin_suffix(simple_name: &str) -> &str {
    match simple_name.rfind(['_', '$']) {
        Some(idx) if idx + 1 < simple_name.len() => &simple_name[idx + 1..],
        _ => simple_name,
    }
}

/// Property id for a getter name: `getFirstName` gives `firstName`,
/// `isActive` gives `active`.
pub fn property_id_from_getter(method_name: &str) -> Option<String> {
    let rest = method_name
        .strip_prefix("get")
        .or_else(|| method_name.strip_prefix("is"))?;
    if rest.chars().next().is_some_and(char::is_uppercase) {
        Some(decapitalize(rest))
    } else {
        None
    }
}

/// Name of a supporting method: `("hide", "placeOrder")` gives `hidePlaceOrder`
pub fn support_method_name(prefix: &str, member_id: &str) -> String {
    format!("{}{}", prefix, capitalize(member_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_natural_name() {
        assert_eq!(natural_name("changeStatus"), "Change status");
        assert_eq!(natural_name("ChangeStatus"), "Change status");
        assert_eq!(natural_name("firstName"), "First name");
        assert_eq!(natural_name("exportURLList"), "Export URL list");
        assert_eq!(natural_name("line_items"), "Line items");
        assert_eq!(natural_name(""), "");
    }

    #[test]
    fn test_camel_lower_first() {
        assert_eq!(camel_lower_first("changeStatus"), "changeStatus");
        assert_eq!(camel_lower_first("ChangeStatus"), "changeStatus");
        assert_eq!(camel_lower_first("Change Status"), "changeStatus");
    }

    #[test]
    fn test_mixin_suffix() {
        assert_eq!(mixin_suffix("Order_changeStatus"), "changeStatus");
        assert_eq!(mixin_suffix("Order$changeStatus"), "changeStatus");
        assert_eq!(mixin_suffix("Customer_Order_place"), "place");
        assert_eq!(mixin_suffix("Order_"), "Order_");
        assert_eq!(mixin_suffix("Standalone"), "Standalone");
    }

    #[test]
    fn test_property_id_from_getter() {
        assert_eq!(property_id_from_getter("getFirstName").as_deref(), Some("firstName"));
        assert_eq!(property_id_from_getter("isActive").as_deref(), Some("active"));
        assert_eq!(property_id_from_getter("getter"), None);
        assert_eq!(property_id_from_getter("island"), None);
        assert_eq!(property_id_from_getter("close"), None);
    }

    #[test]
    fn test_support_method_name() {
        assert_eq!(support_method_name("hide", "placeOrder"), "hidePlaceOrder");
        assert_eq!(support_method_name("validate0", "addLine"), "validate0AddLine");
    }
}
