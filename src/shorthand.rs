//! Box-model micro-parsers for CSS shorthand, border and width values.
//!
//! Every function here is total: malformed input degrades to `0` or `px`
//! instead of failing, so a sloppy attribute never aborts a compile.

use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

/// One edge of a CSS box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Top,
    Right,
    Bottom,
    Left,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Top => "top",
            Direction::Right => "right",
            Direction::Bottom => "bottom",
            Direction::Left => "left",
        }
    }
}

/// A width split into its numeric part and unit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Width {
    pub value: f64,
    pub unit: String,
}

impl Width {
    pub fn is_percent(&self) -> bool {
        self.unit == "%"
    }
}

impl std::fmt::Display for Width {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.value, self.unit)
    }
}

/// Resolve one edge of a `padding`/`margin`-style shorthand.
///
/// `"10px 20px 30px"` gives top 10, left/right 20, bottom 30.
pub fn parse_shorthand(value: &str, direction: Direction) -> i64 {
    let tokens: Vec<&str> = value.split_whitespace().take(4).collect();

    let index = match (tokens.len(), direction) {
        (2, Direction::Top | Direction::Bottom) => 0,
        (2, Direction::Left | Direction::Right) => 1,
        (3, Direction::Top) => 0,
        (3, Direction::Left | Direction::Right) => 1,
        (3, Direction::Bottom) => 2,
        (4, Direction::Top) => 0,
        (4, Direction::Right) => 1,
        (4, Direction::Bottom) => 2,
        (4, Direction::Left) => 3,
        _ => return parse_int(value).unwrap_or(0),
    };

    parse_int(tokens[index]).unwrap_or(0)
}

/// Extract the width of a `"<width> <style> <color>"` border value.
pub fn parse_border(value: &str) -> i64 {
    static BORDER_REGEX: OnceLock<Regex> = OnceLock::new();
    let re = BORDER_REGEX.get_or_init(|| Regex::new(r"(?:^|\s)(\d+)").unwrap());

    re.captures(value)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<i64>().ok())
        .unwrap_or(0)
}

/// Split a width such as `"600px"`, `"50%"` or `"600"` into value and unit.
///
/// Percentages keep their fractional part unless `truncate_to_int` is set;
/// every other unit is truncated to an integer.
pub fn parse_width(value: &str, truncate_to_int: bool) -> Width {
    static UNIT_REGEX: OnceLock<Regex> = OnceLock::new();
    let re = UNIT_REGEX.get_or_init(|| Regex::new(r"[\d.,]*(\D*)$").unwrap());

    let unit = re
        .captures(value)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .unwrap_or("");

    let parsed = if unit == "%" && !truncate_to_int {
        parse_float(value)
    } else {
        parse_int(value).map(|n| n as f64)
    };

    Width {
        value: parsed.unwrap_or(0.0),
        unit: if unit.is_empty() {
            "px".to_string()
        } else {
            unit.to_string()
        },
    }
}

/// Leading-integer parse: `"10px"` is 10, `" -3em"` is -3, `"px"` is `None`.
pub fn parse_int(value: &str) -> Option<i64> {
    static INT_REGEX: OnceLock<Regex> = OnceLock::new();
    let re = INT_REGEX.get_or_init(|| Regex::new(r"^\s*([+-]?\d+)").unwrap());

    re.captures(value)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<i64>().ok())
}

/// Leading-float parse: `"33.33%"` is 33.33, `".5em"` is 0.5.
pub fn parse_float(value: &str) -> Option<f64> {
    static FLOAT_REGEX: OnceLock<Regex> = OnceLock::new();
    let re = FLOAT_REGEX
        .get_or_init(|| Regex::new(r"^\s*([+-]?(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?)").unwrap());

    re.captures(value)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
}

/// Format a pixel amount the way the markup writes it (`600px`, `287.5px`).
pub fn px(value: f64) -> String {
    format!("{}px", value)
}
