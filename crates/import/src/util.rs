/// Payment-processor prefixes that precede the real merchant name.
pub const PROCESSOR_PREFIXES: &[&str] = &["SQ *", "TST*", "SP ", "FSP*", "6602-"];

/// Title-cases `s` word-wise: a letter is upper-cased when the previous
/// character is not a letter and lower-cased otherwise (`2xxx` → `2Xxx`,
/// `COSTCO-KS` → `Costco-Ks`).
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_is_letter = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if prev_is_letter {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_is_letter = true;
        } else {
            out.push(c);
            prev_is_letter = false;
        }
    }
    out
}

/// True when `s` has at least one letter and every letter is upper-case.
pub fn is_upper(s: &str) -> bool {
    let mut letters = s.chars().filter(|c| c.is_alphabetic()).peekable();
    letters.peek().is_some() && letters.all(char::is_uppercase)
}

/// Contains a digit and a `-`, `.` or `/` separator, e.g. `800-555-1212`.
pub fn is_phone_like(token: &str) -> bool {
    token.chars().any(|c| c.is_ascii_digit()) && token.contains(['-', '.', '/'])
}

/// First `max` characters of `s`.
pub fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_case_words() {
        assert_eq!(title_case("DOUGH ZONE"), "Dough Zone");
        assert_eq!(title_case("dough zone"), "Dough Zone");
    }

    #[test]
    fn title_case_restarts_after_non_letters() {
        assert_eq!(title_case("2xxx"), "2Xxx");
        assert_eq!(title_case("COSTCO-KIRKLAND"), "Costco-Kirkland");
        assert_eq!(title_case("o'brien"), "O'Brien");
    }

    #[test]
    fn is_upper_requires_a_letter() {
        assert!(is_upper("WA"));
        assert!(is_upper("A1"));
        assert!(!is_upper("Wa"));
        assert!(!is_upper("12"));
        assert!(!is_upper(""));
    }

    #[test]
    fn phone_like_tokens() {
        assert!(is_phone_like("800-555-1212"));
        assert!(is_phone_like("425.555.0100"));
        assert!(is_phone_like("01/15"));
        assert!(!is_phone_like("#1234"));
        assert!(!is_phone_like("WAL-MART"));
    }

    #[test]
    fn truncate_counts_chars_not_bytes() {
        assert_eq!(truncate_chars("Cafééééééééééééééé", 5), "Caféé");
        assert_eq!(truncate_chars("abc", 15), "abc");
    }
}
