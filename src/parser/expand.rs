use std::borrow::Cow;
use std::env;

/// Substitutes `$NAME` and `${NAME}` references from the process environment.
/// Unset variables expand to nothing.
pub fn expand_vars(input: &str) -> Cow<'_, str> {
    expand_vars_with(input, |name| env::var(name).ok())
}

/// Like [`expand_vars`], with variables looked up through `lookup`.
///
/// A `$` that is not followed by a name (end of input, whitespace, punctuation)
/// is kept literally. An unclosed `${` swallows the rest of the input.
pub fn expand_vars_with<F>(input: &str, lookup: F) -> Cow<'_, str>
where
    F: Fn(&str) -> Option<String>,
{
    if !input.contains('$') {
        return Cow::Borrowed(input);
    }

    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' {
            result.push(c);
            continue;
        }

        let mut name = String::new();
        if chars.peek() == Some(&'{') {
            chars.next();
            for c in chars.by_ref() {
                if c == '}' {
                    break;
                }
                name.push(c);
            }
        } else {
            while let Some(&c) = chars.peek() {
                if c.is_alphanumeric() || c == '_' {
                    name.push(c);
                    chars.next();
                } else {
                    break;
                }
            }
            if name.is_empty() {
                result.push('$');
                continue;
            }
        }

        if let Some(value) = lookup(&name) {
            result.push_str(&value);
        }
    }

    Cow::Owned(result)
}
