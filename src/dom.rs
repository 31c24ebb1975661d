use scraper::{ElementRef, Selector};

/// First element under `scope` matching a CSS selector.
pub(crate) fn select_first<'a>(scope: ElementRef<'a>, css: &str) -> Option<ElementRef<'a>> {
    let selector = Selector::parse(css).ok()?;
    scope.select(&selector).next()
}

/// Full text content of an element, whitespace-trimmed.
pub(crate) fn text_of(element: ElementRef) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Trimmed text of the first match, or None when missing or empty.
pub(crate) fn select_text(scope: ElementRef, css: &str) -> Option<String> {
    let element = select_first(scope, css)?;
    let text = text_of(element);
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Value attribute of a hidden input with the given name.
pub(crate) fn hidden_input_value(scope: ElementRef, name: &str) -> Option<String> {
    let css = format!("input[type='hidden'][name='{}']", name);
    let value = select_first(scope, &css)?.value().attr("value")?;
    Some(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    #[test]
    fn test_select_text_trims_and_drops_empty() {
        let doc = Html::parse_document("<div><p>  hello  </p><span>   </span></div>");
        let root = doc.root_element();

        assert_eq!(select_text(root, "p"), Some("hello".to_string()));
        assert_eq!(select_text(root, "span"), None);
        assert_eq!(select_text(root, "h1"), None);
    }

    #[test]
    fn test_hidden_input_value() {
        let doc = Html::parse_document(
            "<form><input type=\"hidden\" name=\"borrowernumber\" value=\"12345\">\
             <input type=\"text\" name=\"userid\" value=\"jane\"></form>",
        );
        let root = doc.root_element();

        assert_eq!(
            hidden_input_value(root, "borrowernumber"),
            Some("12345".to_string())
        );
        // Visible inputs are not hidden fields
        assert_eq!(hidden_input_value(root, "userid"), None);
    }
}
