//! Custom Askama template filters.

#![allow(clippy::unnecessary_wraps)]

use std::fmt::Display;

/// Returns the current year.
///
/// Usage in templates: `{{ ""|current_year }}`
#[askama::filter_fn]
pub fn current_year(_value: impl Display, _env: &dyn askama::Values) -> askama::Result<i32> {
    use chrono::Datelike;
    Ok(chrono::Utc::now().year())
}

/// Renders a unit count as "1 item" or "N items".
///
/// Usage in templates: `{{ cart.item_count|units }}`
#[askama::filter_fn]
pub fn units(count: impl Display, _env: &dyn askama::Values) -> askama::Result<String> {
    Ok(items_label(&count.to_string()))
}

fn items_label(count: &str) -> String {
    if count == "1" {
        "1 item".to_string()
    } else {
        format!("{count} items")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_items_label() {
        assert_eq!(items_label("0"), "0 items");
        assert_eq!(items_label("1"), "1 item");
        assert_eq!(items_label("12"), "12 items");
    }
}
