//! Swedish-aware tokenization for indexing and queries.

use unicode_segmentation::UnicodeSegmentation;

/// Tokenize text into normalized search tokens.
///
/// Lowercases, segments on unicode word boundaries, drops single-character
/// tokens and common Swedish stop words.
pub fn tokenize(text: &str) -> Vec<String> {
    let normalized = text.to_lowercase();

    normalized
        .unicode_words()
        .filter(|word| word.chars().count() >= 2)
        .filter(|word| !is_stopword(word))
        .map(String::from)
        .collect()
}

/// Check if a word is a common Swedish (or English) stopword.
fn is_stopword(word: &str) -> bool {
    const STOPWORDS: &[&str] = &[
        // Swedish common words with low search value
        "och", "att", "en", "ett", "det", "som", "på", "är", "av", "för", "med", "den", "till",
        "har", "de", "inte", "om", "vi", "ska", "kan", "från", "eller", "hos", "vid", "så",
        "även", "efter", "utan", "mot", "under", "vara", "bli", "blev", "sina", "sin", "sitt",
        "denna", "detta", "dessa", "där", "här", "var",
        // English fallbacks for mixed-language pages
        "the", "and", "of", "to", "in", "for", "on", "with", "at", "by", "from", "as", "or",
        // Common URL/HTML artifacts
        "http", "https", "www", "se", "html", "pdf",
    ];
    STOPWORDS.contains(&word)
}
