//! Element descriptors and their compilation to WebDriver locators.
//!
//! A [`Target`] says *what* to find (a button named "New Game", the control
//! labelled "Difficulty") rather than holding a live element. Drivers resolve
//! it afresh on every interaction, so no element handle outlives a re-render.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Elements that can carry a `<label>`.
const LABELABLE: &str = "self::select or self::input or self::textarea";

/// Describes an element by accessible role, label, or CSS selector.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Target {
    /// Accessible role plus exact accessible name, like
    /// `page.getByRole('button', { name })`.
    Role { role: String, name: String },
    /// Form control associated with a label of exactly this text.
    Label(String),
    /// Raw CSS selector; the first match in document order is used.
    Css(String),
}

impl Target {
    pub fn role(role: impl Into<String>, name: impl Into<String>) -> Self {
        Target::Role {
            role: role.into(),
            name: name.into(),
        }
    }

    pub fn button(name: impl Into<String>) -> Self {
        Target::role("button", name)
    }

    pub fn label(text: impl Into<String>) -> Self {
        Target::Label(text.into())
    }

    pub fn css(selector: impl Into<String>) -> Self {
        Target::Css(selector.into())
    }

    /// Locator strategy and expression understood by WebDriver.
    pub fn locator(&self) -> Locator {
        match self {
            Target::Css(sel) => Locator::Css(sel.clone()),
            Target::Role { role, name } => Locator::XPath(role_xpath(role, name)),
            Target::Label(text) => Locator::XPath(label_xpath(text)),
        }
    }

    /// Compile role and label descriptors into an XPath union expression.
    /// CSS targets have no XPath form.
    ///
    /// ```
    /// use gridproof_drivers::Target;
    ///
    /// let xpath = Target::button("New Game").to_xpath().unwrap();
    /// assert!(xpath.starts_with("//button[normalize-space(.)='New Game'"));
    /// assert!(Target::css("#sudoku").to_xpath().is_none());
    /// ```
    pub fn to_xpath(&self) -> Option<String> {
        match self.locator() {
            Locator::XPath(xpath) => Some(xpath),
            Locator::Css(_) => None,
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Role { role, name } => write!(f, "{role} {name:?}"),
            Target::Label(text) => write!(f, "control labelled {text:?}"),
            Target::Css(sel) => write!(f, "css {sel:?}"),
        }
    }
}

/// Concrete locator handed to the WebDriver client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    Css(String),
    XPath(String),
}

impl Locator {
    pub fn as_fantoccini(&self) -> fantoccini::Locator<'_> {
        match self {
            Locator::Css(s) => fantoccini::Locator::Css(s),
            Locator::XPath(s) => fantoccini::Locator::XPath(s),
        }
    }
}

/// Quote `s` as an XPath 1.0 string literal.
///
/// XPath 1.0 has no escape syntax, so a string containing both quote kinds
/// is split and rejoined with `concat()`.
pub fn xpath_literal(s: &str) -> String {
    if !s.contains('\'') {
        return format!("'{s}'");
    }
    if !s.contains('"') {
        return format!("\"{s}\"");
    }
    let parts: Vec<String> = s
        .split('\'')
        .map(|part| format!("'{part}'"))
        .collect();
    format!("concat({})", parts.join(", \"'\", "))
}

fn name_predicate(name: &str) -> String {
    let lit = xpath_literal(name);
    format!("normalize-space(.)={lit} or @aria-label={lit}")
}

fn role_xpath(role: &str, name: &str) -> String {
    let named = name_predicate(name);
    let lit = xpath_literal(name);
    let role_lit = xpath_literal(role);
    let explicit = format!("//*[@role={role_lit}][{named}]");

    let implicit: Vec<String> = match role {
        "button" => vec![
            format!("//button[{named}]"),
            format!(
                "//input[(@type='button' or @type='submit' or @type='reset') and (@value={lit} or @aria-label={lit})]"
            ),
        ],
        "link" => vec![format!("//a[@href][{named}]")],
        "combobox" | "listbox" => vec![format!("//select[{}]", label_predicate(name))],
        "textbox" => vec![format!(
            "//*[self::textarea or self::input[not(@type) or @type='text' or @type='search' or @type='email']][{}]",
            label_predicate(name)
        )],
        "checkbox" => vec![format!(
            "//input[@type='checkbox'][{}]",
            label_predicate(name)
        )],
        _ => Vec::new(),
    };

    implicit
        .into_iter()
        .chain(std::iter::once(explicit))
        .collect::<Vec<_>>()
        .join(" | ")
}

/// Predicate matching a labelable element whose label is `text`.
fn label_predicate(text: &str) -> String {
    let lit = xpath_literal(text);
    format!(
        "@id=//label[normalize-space(.)={lit} or normalize-space(text()[1])={lit}]/@for \
         or ancestor::label[normalize-space(text()[1])={lit}] \
         or @aria-label={lit}"
    )
}

fn label_xpath(text: &str) -> String {
    format!("//*[{LABELABLE}][{}]", label_predicate(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_strings_use_single_quotes() {
        assert_eq!(xpath_literal("Hard"), "'Hard'");
    }

    #[test]
    fn apostrophes_switch_to_double_quotes() {
        assert_eq!(xpath_literal("Player's Board"), "\"Player's Board\"");
    }

    #[test]
    fn mixed_quotes_use_concat() {
        assert_eq!(
            xpath_literal(r#"say "it's""#),
            r#"concat('say "it', "'", 's"')"#
        );
    }

    #[test]
    fn button_xpath_covers_native_inputs_and_aria_roles() {
        let xpath = Target::button("New Puzzle 1").to_xpath().unwrap();
        assert!(xpath.contains("//button[normalize-space(.)='New Puzzle 1' or @aria-label='New Puzzle 1']"));
        assert!(xpath.contains("@type='submit'"));
        assert!(xpath.contains("//*[@role='button'][normalize-space(.)='New Puzzle 1'"));
        assert_eq!(xpath.matches(" | ").count(), 2);
    }

    #[test]
    fn unknown_roles_only_match_explicit_role_attribute() {
        let xpath = Target::role("tab", "Settings").to_xpath().unwrap();
        assert_eq!(
            xpath,
            "//*[@role='tab'][normalize-space(.)='Settings' or @aria-label='Settings']"
        );
    }

    #[test]
    fn label_xpath_follows_for_attribute_and_nesting() {
        let xpath = Target::label("Difficulty").to_xpath().unwrap();
        assert!(xpath.starts_with("//*[self::select or self::input or self::textarea]"));
        assert!(xpath.contains("@id=//label[normalize-space(.)='Difficulty'"));
        assert!(xpath.contains("ancestor::label"));
        assert!(xpath.contains("@aria-label='Difficulty'"));
    }

    #[test]
    fn css_targets_stay_css() {
        let t = Target::css("#sudoku .sudoku-board-cell input");
        assert_eq!(
            t.locator(),
            Locator::Css("#sudoku .sudoku-board-cell input".into())
        );
        assert!(matches!(Target::button("x").locator(), Locator::XPath(_)));
    }

    #[test]
    fn display_is_human_readable() {
        assert_eq!(Target::button("New Game").to_string(), "button \"New Game\"");
        assert_eq!(
            Target::label("Difficulty").to_string(),
            "control labelled \"Difficulty\""
        );
    }
}
