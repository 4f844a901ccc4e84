use std::sync::OnceLock;

use regex::Regex;

use crate::editing::ListType;

/// A line opening a list item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListItemLine {
    /// Whitespace before the marker; decides nesting.
    pub indent: String,
    pub list_type: ListType,
    pub checked: Option<bool>,
    /// Number of an ordered item, 1 otherwise.
    pub number: usize,
    pub content: String,
}

/// Which list markers are recognised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ListSyntax {
    pub bullets: bool,
    pub ordered: bool,
    pub checks: bool,
}

pub struct ListMarker;

impl ListMarker {
    pub const BULLET: &'static str = "-";
    pub const UNCHECKED: &'static str = "[ ]";
    pub const CHECKED: &'static str = "[x]";

    pub fn parse(line: &str, syntax: ListSyntax) -> Option<ListItemLine> {
        static BULLET_REGEX: OnceLock<Regex> = OnceLock::new();
        static ORDERED_REGEX: OnceLock<Regex> = OnceLock::new();
        static CHECK_REGEX: OnceLock<Regex> = OnceLock::new();
        let bullet_regex = BULLET_REGEX.get_or_init(|| {
            Regex::new(r"^([ \t]*)[-*+](?:[ \t]+(.*))?$").expect("Invalid bullet regex")
        });
        let ordered_regex = ORDERED_REGEX.get_or_init(|| {
            Regex::new(r"^([ \t]*)(\d{1,9})[.)](?:[ \t]+(.*))?$").expect("Invalid ordered regex")
        });
        let check_regex = CHECK_REGEX.get_or_init(|| {
            Regex::new(r"^\[([ xX])\](?:[ \t]+(.*))?$").expect("Invalid check regex")
        });

        if (syntax.bullets || syntax.checks)
            && let Some(caps) = bullet_regex.captures(line)
        {
            let indent = caps[1].to_string();
            let content = caps.get(2).map_or("", |m| m.as_str());
            if syntax.checks
                && let Some(check) = check_regex.captures(content)
            {
                return Some(ListItemLine {
                    indent,
                    list_type: ListType::Check,
                    checked: Some(!check[1].trim().is_empty()),
                    number: 1,
                    content: check.get(2).map_or("", |m| m.as_str()).trim().to_string(),
                });
            }
            if syntax.bullets {
                return Some(ListItemLine {
                    indent,
                    list_type: ListType::Bullet,
                    checked: None,
                    number: 1,
                    content: content.trim().to_string(),
                });
            }
            return None;
        }
        if syntax.ordered
            && let Some(caps) = ordered_regex.captures(line)
        {
            return Some(ListItemLine {
                indent: caps[1].to_string(),
                list_type: ListType::Number,
                checked: None,
                number: caps[2].parse().unwrap_or(1),
                content: caps.get(3).map_or("", |m| m.as_str()).trim().to_string(),
            });
        }
        None
    }

    /// Marker written in front of an exported item, including the trailing space.
    pub fn prefix(list_type: ListType, number: usize, checked: Option<bool>) -> String {
        match list_type {
            ListType::Bullet => format!("{} ", Self::BULLET),
            ListType::Number => format!("{number}. "),
            ListType::Check => {
                let mark = if checked == Some(true) {
                    Self::CHECKED
                } else {
                    Self::UNCHECKED
                };
                format!("{} {mark} ", Self::BULLET)
            }
        }
    }
}
