//! Character-offset helpers. All offsets in the editor are Unicode scalar
//! offsets, never byte offsets, so every content mutation goes through here.

pub(crate) fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn byte_at_char(s: &str, offset: usize) -> usize {
    s.char_indices()
        .nth(offset)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub(crate) fn insert_at_char(s: &str, offset: usize, text: &str) -> String {
    let at = byte_at_char(s, offset);
    let mut out = String::with_capacity(s.len() + text.len());
    out.push_str(&s[..at]);
    out.push_str(text);
    out.push_str(&s[at..]);
    out
}

pub(crate) fn split_at_char(s: &str, offset: usize) -> (String, String) {
    let at = byte_at_char(s, offset);
    (s[..at].to_string(), s[at..].to_string())
}

/// Removes the character before `offset`; no-op at offset 0.
pub(crate) fn remove_char_before(s: &str, offset: usize) -> String {
    if offset == 0 {
        return s.to_string();
    }
    let end = byte_at_char(s, offset);
    let start = byte_at_char(s, offset - 1);
    let mut out = String::with_capacity(s.len());
    out.push_str(&s[..start]);
    out.push_str(&s[end..]);
    out
}

pub(crate) fn slice_chars(s: &str, start: usize, end: usize) -> String {
    let a = byte_at_char(s, start);
    let b = byte_at_char(s, end.max(start));
    s[a..b].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("ab", 1, "aXb")]
    #[case("", 0, "X")]
    #[case("ab", 99, "abX")]
    #[case("héllo", 2, "héXllo")]
    fn insert_at_char_cases(#[case] input: &str, #[case] offset: usize, #[case] expected: &str) {
        assert_eq!(insert_at_char(input, offset, "X"), expected);
    }

    #[test]
    fn split_and_remove_are_char_based() {
        assert_eq!(split_at_char("héllo", 2), ("hé".to_string(), "llo".to_string()));
        assert_eq!(remove_char_before("héllo", 2), "hllo");
        assert_eq!(remove_char_before("héllo", 0), "héllo");
    }

    #[test]
    fn slice_chars_clamps() {
        assert_eq!(slice_chars("hello", 1, 3), "el");
        assert_eq!(slice_chars("hello", 3, 99), "lo");
        assert_eq!(slice_chars("hello", 4, 2), "");
    }
}
