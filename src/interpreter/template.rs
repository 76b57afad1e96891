use super::context::Context;

fn is_placeholder_char(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_' || ch == '.'
}

/// Substitutes every `$[[identifier]]` placeholder in `text` with the
/// stringified value bound to `identifier`. Text that merely resembles a
/// placeholder (no closing `]]`, an empty or malformed name) passes through
/// untouched. The first placeholder whose identifier is unbound aborts the
/// whole substitution, returning the identifier.
pub fn fill_in_templates(text: &str, context: &Context) -> Result<String, String> {
    let mut result = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find("$[[") {
        result.push_str(&rest[..start]);
        let after_opener = &rest[start + 3..];
        match parse_placeholder(after_opener) {
            Some((name, consumed)) => {
                match context.get(name) {
                    Some(value) => result.push_str(&value.to_string()),
                    None => return Err(name.to_string()),
                }
                rest = &after_opener[consumed..];
            }
            None => {
                result.push_str("$[[");
                rest = after_opener;
            }
        }
    }
    result.push_str(rest);
    Ok(result)
}

/// Matches `identifier]]` at the start of `text`, returning the identifier
/// and how many bytes the whole tail consumed.
fn parse_placeholder(text: &str) -> Option<(&str, usize)> {
    let name_len = text
        .char_indices()
        .find(|&(_, ch)| !is_placeholder_char(ch))
        .map(|(idx, _)| idx)
        .unwrap_or(text.len());
    if name_len == 0 || !text[name_len..].starts_with("]]") {
        return None;
    }
    Some((&text[..name_len], name_len + 2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;
    use pretty_assertions::assert_eq;

    fn context() -> Context {
        [
            ("x", Value::Integer(5)),
            ("name", Value::Text("Ines".into())),
            ("player.alive", Value::Boolean(true)),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn substitutes_stringified_values() {
        assert_eq!(fill_in_templates("A $[[x]]", &context()).unwrap(), "A 5");
        assert_eq!(
            fill_in_templates("Hello $[[name]], alive: $[[player.alive]].", &context()).unwrap(),
            "Hello Ines, alive: true."
        );
    }

    #[test]
    fn repeated_placeholders_all_resolve() {
        assert_eq!(
            fill_in_templates("$[[x]] and $[[x]]", &context()).unwrap(),
            "5 and 5"
        );
    }

    #[test]
    fn unbound_identifier_fails_with_its_name() {
        assert_eq!(
            fill_in_templates("A $[[missing]]", &context()),
            Err("missing".to_string())
        );
    }

    #[test]
    fn malformed_placeholders_pass_through() {
        for text in ["$[[", "$[[x", "$[[]]", "$[[x] ]", "$[x]]", "money: $5"] {
            assert_eq!(fill_in_templates(text, &context()).unwrap(), text);
        }
    }

    #[test]
    fn text_without_placeholders_is_unchanged() {
        assert_eq!(
            fill_in_templates("Nothing here.", &context()).unwrap(),
            "Nothing here."
        );
    }
}
