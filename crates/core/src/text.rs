/// Replaces every whitespace character, newlines included, with a single
/// space. Runs of whitespace are kept as runs of spaces.
pub fn replace_whitespaces_w_space(text: &str) -> String {
    text.chars().map(|ch| if ch.is_whitespace() { ' ' } else { ch }).collect()
}

#[cfg(test)]
mod tests {
    use super::replace_whitespaces_w_space;

    #[test]
    fn each_whitespace_char_becomes_one_space() {
        assert_eq!(replace_whitespaces_w_space("a\nb\t\tc\r\n"), "a b  c  ");
        assert_eq!(replace_whitespaces_w_space("plain"), "plain");
    }
}
