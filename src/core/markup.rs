/// Inline markup handling for typed output.

/// Byte offset the reveal cursor moves to from `cursor`.
///
/// A tag starting at `cursor` is revealed whole: the cursor jumps past the
/// matching `>`. An unclosed `<` reveals the rest of the text at once, so the
/// revealed prefix never ends inside a tag. Otherwise the cursor moves one
/// character.
pub fn next_reveal(text: &str, cursor: usize) -> usize {
    let rest = match text.get(cursor..) {
        Some(rest) => rest,
        None => return text.len(),
    };
    match rest.chars().next() {
        None => text.len(),
        Some('<') => match rest.find('>') {
            Some(close) => cursor + close + 1,
            None => text.len(),
        },
        Some(ch) => cursor + ch.len_utf8(),
    }
}

/// Remove every `<...>` tag, for renderers that cannot show markup.
pub fn strip_markup(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_tag = false;
    for ch in text.chars() {
        match ch {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => out.push(ch),
            _ => {}
        }
    }
    out
}

/// Escape user-typed text before it is embedded in markup.
pub fn escape_markup(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reveals(text: &str) -> Vec<&str> {
        let mut cursor = 0;
        let mut out = Vec::new();
        while cursor < text.len() {
            cursor = next_reveal(text, cursor);
            out.push(&text[..cursor]);
        }
        out
    }

    #[test]
    fn plain_text_one_char_at_a_time() {
        assert_eq!(reveals("Hi!"), vec!["H", "Hi", "Hi!"]);
    }

    #[test]
    fn tags_appear_whole() {
        assert_eq!(
            reveals("<b>Go</b>"),
            vec!["<b>", "<b>G", "<b>Go", "<b>Go</b>"]
        );
    }

    #[test]
    fn no_prefix_ends_inside_a_tag() {
        let text = "a <u>start</u> day, <i class=\"x\">now</i>";
        for prefix in reveals(text) {
            let opens = prefix.matches('<').count();
            let closes = prefix.matches('>').count();
            assert_eq!(opens, closes, "half-open tag in {prefix:?}");
        }
    }

    #[test]
    fn unclosed_tag_reveals_the_rest() {
        assert_eq!(reveals("a<b"), vec!["a", "a<b"]);
    }

    #[test]
    fn multibyte_characters_stay_whole() {
        assert_eq!(reveals("né"), vec!["n", "né"]);
        assert_eq!(next_reveal("né", 3), 3);
    }

    #[test]
    fn strip_and_escape() {
        assert_eq!(strip_markup("<u>start</u> day"), "start day");
        assert_eq!(strip_markup("1 > 0"), "1 > 0");
        assert_eq!(escape_markup("<b>&"), "&lt;b&gt;&amp;");
    }
}
