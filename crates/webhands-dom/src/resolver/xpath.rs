//! Reduction of single-step XPath expressions to CSS.

use once_cell::sync::Lazy;
use regex::Regex;

use super::css::css_string;

static ID_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^//(?:\*|[a-zA-Z][\w-]*)\[@id=["']([^"']+)["']\]$"#).expect("valid regex")
});

static CLASS_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^//(\*|[a-zA-Z][\w-]*)\[@class=["']([^"']+)["']\]$"#).expect("valid regex")
});

static TAG_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^//([a-zA-Z][\w-]*)$").expect("valid regex"));

static ATTRIBUTE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^//(\*|[a-zA-Z][\w-]*)\[@([a-zA-Z][\w-]*)=["']([^"']*)["']\]$"#)
        .expect("valid regex")
});

static CSS_IDENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-?[_a-zA-Z][_a-zA-Z0-9-]*$").expect("valid regex"));

/// Whether `value` can be used unescaped after `#` or `.`.
pub fn is_css_identifier(value: &str) -> bool {
    CSS_IDENT.is_match(value)
}

/// Turn `//*[@id="x"]`, `//tag[@class="a b"]`, `//tag` or
/// `//tag[@attr="v"]` into the equivalent CSS selector. Anything else,
/// including multi-step paths, yields `None`.
pub fn simplify_xpath_to_css(xpath: &str) -> Option<String> {
    let xpath = xpath.trim();
    let xpath = xpath.strip_prefix("xpath=").unwrap_or(xpath);

    if let Some(caps) = ID_PATTERN.captures(xpath) {
        let id = &caps[1];
        return Some(if is_css_identifier(id) {
            format!("#{}", id)
        } else {
            format!("[id={}]", css_string(id))
        });
    }

    if let Some(caps) = CLASS_PATTERN.captures(xpath) {
        let tag = if &caps[1] == "*" { "" } else { &caps[1] };
        let classes: Vec<&str> = caps[2].split_whitespace().collect();
        if !classes.is_empty() && classes.iter().all(|c| is_css_identifier(c)) {
            return Some(format!("{}.{}", tag, classes.join(".")));
        }
        return None;
    }

    if let Some(caps) = TAG_PATTERN.captures(xpath) {
        return Some(caps[1].to_lowercase());
    }

    if let Some(caps) = ATTRIBUTE_PATTERN.captures(xpath) {
        let tag = if &caps[1] == "*" { "" } else { &caps[1] };
        return Some(format!("{}[{}={}]", tag, &caps[2], css_string(&caps[3])));
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id() {
        assert_eq!(simplify_xpath_to_css(r#"//*[@id="go"]"#).as_deref(), Some("#go"));
        assert_eq!(simplify_xpath_to_css("//button[@id='go']").as_deref(), Some("#go"));
        assert_eq!(
            simplify_xpath_to_css(r#"//*[@id="1st"]"#).as_deref(),
            Some("[id=\"1st\"]")
        );
    }

    #[test]
    fn test_class() {
        assert_eq!(
            simplify_xpath_to_css(r#"//div[@class="card  active"]"#).as_deref(),
            Some("div.card.active")
        );
        assert_eq!(
            simplify_xpath_to_css(r#"//*[@class="card"]"#).as_deref(),
            Some(".card")
        );
        assert_eq!(simplify_xpath_to_css(r#"//div[@class="a:b"]"#), None);
    }

    #[test]
    fn test_tag_and_attribute() {
        assert_eq!(simplify_xpath_to_css("//BUTTON").as_deref(), Some("button"));
        assert_eq!(
            simplify_xpath_to_css(r#"//input[@name="q"]"#).as_deref(),
            Some("input[name=\"q\"]")
        );
        assert_eq!(
            simplify_xpath_to_css(r#"xpath=//*[@data-testid="save"]"#).as_deref(),
            Some("[data-testid=\"save\"]")
        );
        assert_eq!(
            simplify_xpath_to_css("//a[@title='C:\\temp\nnext']").as_deref(),
            Some(r#"a[title="C:\\temp\a next"]"#)
        );
    }

    #[test]
    fn test_multi_step_paths_are_not_simplified() {
        assert_eq!(simplify_xpath_to_css("/html/body/div[2]/button"), None);
        assert_eq!(simplify_xpath_to_css("//div//button"), None);
        assert_eq!(simplify_xpath_to_css("(//a)[2]"), None);
    }

    #[test]
    fn test_css_identifier() {
        assert!(is_css_identifier("btn-primary"));
        assert!(is_css_identifier("_x"));
        assert!(!is_css_identifier("2col"));
        assert!(!is_css_identifier("a.b"));
        assert!(!is_css_identifier(""));
    }
}
