use icu_normalizer::DecomposingNormalizerBorrowed;

/// Lowercase, trim and collapse internal whitespace runs to a single space.
pub fn normalize(text: &str) -> String {
    text.split_whitespace()
        .map(|part| part.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Drop everything that is not a letter or digit, whitespace included.
///
/// Input is decomposed (NFD) first, so accented letters lose their combining
/// marks and fold onto the bare letter: "señor" becomes "senor".
pub fn fold(text: &str) -> String {
    let nfd = DecomposingNormalizerBorrowed::new_nfd();
    nfd.normalize(text)
        .chars()
        .filter(|c| c.is_alphanumeric())
        .collect()
}

/// Exact-spelling check. Either the whitespace-normalized forms are equal, or
/// the folded forms (punctuation, spaces and accents removed) are equal.
/// An empty submission never matches.
pub fn is_match(submitted: &str, target: &str) -> bool {
    let input = normalize(submitted);
    if input.is_empty() {
        return false;
    }
    let expected = normalize(target);
    if input == expected {
        return true;
    }

    let folded_input = fold(&input);
    !folded_input.is_empty() && folded_input == fold(&expected)
}
