//! String case conversion for object keys and include paths.
//!
//! Words are split on any non-alphanumeric character, on a lower→upper
//! transition, on a letter↔digit transition, and before the last capital of
//! an acronym run (`XMLHttp` splits into `XML`, `Http`).

use once_cell::sync::Lazy;
use regex::Regex;

static UNDERSCORE_BEFORE_DIGITS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"_([0-9]+)").expect("static regex is valid"));

/// Split `input` into its component words.
pub fn words(input: &str) -> Vec<String> {
    let chars: Vec<char> = input.chars().collect();
    let mut words = Vec::new();
    let mut current = String::new();

    for (i, &c) in chars.iter().enumerate() {
        if !c.is_alphanumeric() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }

        if let Some(prev) = current.chars().last() {
            let next = chars.get(i + 1).copied();
            let boundary = (prev.is_lowercase() && c.is_uppercase())
                || (prev.is_ascii_digit() != c.is_ascii_digit())
                || (prev.is_uppercase()
                    && c.is_uppercase()
                    && next.is_some_and(|n| n.is_lowercase()));
            if boundary {
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

/// `test_even_more-types` → `testEvenMoreTypes`
pub fn camel(input: &str) -> String {
    words(input)
        .iter()
        .enumerate()
        .map(|(i, word)| {
            if i == 0 {
                word.to_lowercase()
            } else {
                capitalize(word)
            }
        })
        .collect()
}

/// `productThing` → `product-thing`
pub fn kebab(input: &str) -> String {
    join_lowercase(input, "-")
}

/// Snake case each dot-separated segment, keeping digit runs attached to
/// the word before them: `testValue123` → `test_value123`.
pub fn snake(input: &str) -> String {
    let joined = input
        .split('.')
        .map(|segment| join_lowercase(segment, "_"))
        .collect::<Vec<_>>()
        .join(".");
    UNDERSCORE_BEFORE_DIGITS
        .replace_all(&joined, "$1")
        .into_owned()
}

fn join_lowercase(input: &str, separator: &str) -> String {
    words(input)
        .iter()
        .map(|word| word.to_lowercase())
        .collect::<Vec<_>>()
        .join(separator)
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => {
            let rest = chars.as_str().to_lowercase();
            first.to_uppercase().chain(rest.chars()).collect()
        }
        None => String::new(),
    }
}
