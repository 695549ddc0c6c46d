//! Word splitting and n-gram windows.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use unicode_segmentation::UnicodeSegmentation;

use crate::error::{Error, Result};

/// Predicate deciding whether a word is excluded from analysis.
///
/// Words reach the predicate already lower-cased by [`words`].
pub trait Stopwords {
    fn is_stopword(&self, word: &str) -> bool;
}

/// Case-folded stop-word list.
///
/// Entries are lower-cased on insertion and lookups are lower-cased too, so
/// `"The"`, `"the"` and `"THE"` are the same stop-word.
/// # Example
/// ```
/// use text_relations::{Stopwords, StopwordSet};
/// let stop: StopwordSet = ["The", "AND"].into_iter().collect();
/// assert!(stop.is_stopword("the"));
/// assert!(stop.is_stopword("And"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StopwordSet {
    words: HashSet<String>,
}

impl StopwordSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<S: AsRef<str>>(&mut self, word: S) -> bool {
        self.words.insert(word.as_ref().to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

impl<S: AsRef<str>> Extend<S> for StopwordSet {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        for word in iter {
            self.insert(word);
        }
    }
}

impl<S: AsRef<str>> FromIterator<S> for StopwordSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = StopwordSet::new();
        set.extend(iter);
        set
    }
}

impl Stopwords for StopwordSet {
    fn is_stopword(&self, word: &str) -> bool {
        if self.words.contains(word) {
            return true;
        }
        self.words.contains(word.to_lowercase().as_str())
    }
}

/// Splits text into lower-cased words on Unicode word boundaries (UAX #29).
///
/// Punctuation and whitespace segments are dropped. Apostrophes survive inside
/// a word ("don't"); other non-alphanumeric characters at a word's edges are
/// trimmed.
/// # Example
/// ```
/// use text_relations::words;
/// let w: Vec<String> = words("(_test] {Test2!= don't").collect();
/// assert_eq!(w, vec!["test", "test2", "don't"]);
/// ```
pub fn words(text: &str) -> impl Iterator<Item = String> + '_ {
    text.unicode_words()
        .map(|word| word.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|word| !word.is_empty())
        .map(|word| word.replace('’', "'").to_lowercase())
}

/// Overlapping windows of `n` consecutive words, each joined by a single space.
///
/// Cloning the iterator (or calling [`tokenize`] again on the same text)
/// replays the identical sequence.
#[derive(Debug, Clone)]
pub struct NGrams {
    words: Vec<String>,
    stopped: Vec<bool>,
    filtered: bool,
    n: usize,
    pos: usize,
}

impl NGrams {
    fn new(words: Vec<String>, stopped: Vec<bool>, n: usize) -> Self {
        let filtered = stopped.iter().any(|&s| s);
        NGrams {
            words,
            stopped,
            filtered,
            n,
            pos: 0,
        }
    }

    fn windows_left(&self) -> usize {
        (self.words.len() + 1).saturating_sub(self.pos + self.n)
    }
}

impl Iterator for NGrams {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        loop {
            let start = self.pos;
            let end = start + self.n;
            if end > self.words.len() {
                return None;
            }
            self.pos += 1;
            if self.stopped[start..end].iter().any(|&s| s) {
                continue;
            }
            return Some(self.words[start..end].join(" "));
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let upper = self.windows_left();
        let lower = if self.filtered { 0 } else { upper };
        (lower, Some(upper))
    }
}

fn check_n(n: usize) -> Result<()> {
    if n < 1 {
        return Err(Error::invalid_argument("n-gram size must be at least 1"));
    }
    Ok(())
}

/// Tokenizes `text` into n-grams.
///
/// A text with `w` words yields exactly `w - n + 1` tokens, or none when
/// `w < n`.
/// # Example
/// ```
/// use text_relations::tokenize;
/// let bigrams: Vec<String> = tokenize("The cat sat", 2).unwrap().collect();
/// assert_eq!(bigrams, vec!["the cat", "cat sat"]);
/// ```
pub fn tokenize(text: &str, n: usize) -> Result<NGrams> {
    check_n(n)?;
    let words: Vec<String> = words(text).collect();
    let stopped = vec![false; words.len()];
    Ok(NGrams::new(words, stopped, n))
}

/// Like [`tokenize`], but drops every window that contains a stop-word.
///
/// Windows are built over the unfiltered word sequence, so removing a
/// stop-word never glues its neighbours into a new n-gram.
pub fn tokenize_filtered<S>(text: &str, n: usize, stopwords: &S) -> Result<NGrams>
where
    S: Stopwords + ?Sized,
{
    check_n(n)?;
    let words: Vec<String> = words(text).collect();
    let stopped = words.iter().map(|w| stopwords.is_stopword(w)).collect();
    Ok(NGrams::new(words, stopped, n))
}

/// Splits an n-gram into its leading `n - 1` words and its last word.
///
/// Returns `None` for a single word.
pub fn split_ngram(token: &str) -> Option<(&str, &str)> {
    token.rsplit_once(' ')
}

/// Reads a stop-word list: one word per line, `#` starts a comment line.
pub fn load_stopwords<P: AsRef<Path>>(path: P) -> Result<StopwordSet> {
    let content = fs::read_to_string(path)?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn stop(list: &[&str]) -> StopwordSet {
        list.iter().collect()
    }

    #[test]
    fn splits_and_folds_case() {
        let w: Vec<String> = words("Hello, World! It's 'quoted' — fine.").collect();
        assert_eq!(w, vec!["hello", "world", "it's", "quoted", "fine"]);
    }

    #[test]
    fn bigrams_of_three_words() {
        let t: Vec<String> = tokenize("the cat sat", 2).unwrap().collect();
        assert_eq!(t, vec!["the cat", "cat sat"]);
    }

    #[test]
    fn ngram_count_law() {
        let text = "one two three four five six seven";
        for n in 1..=9 {
            let expected = if n <= 7 { 7 - n + 1 } else { 0 };
            let tokens = tokenize(text, n).unwrap();
            assert_eq!(tokens.size_hint(), (expected, Some(expected)));
            assert_eq!(tokens.count(), expected, "n = {n}");
        }
    }

    #[test]
    fn zero_n_is_rejected() {
        assert!(matches!(tokenize("a b", 0), Err(Error::InvalidArgument(_))));
        assert!(matches!(
            tokenize_filtered("a b", 0, &stop(&[])),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn restartable() {
        let first = tokenize("w1 w2 w3 w4", 2).unwrap();
        let replay = first.clone();
        let a: Vec<String> = first.collect();
        let b: Vec<String> = replay.collect();
        let c: Vec<String> = tokenize("w1 w2 w3 w4", 2).unwrap().collect();
        assert_eq!(a, vec!["w1 w2", "w2 w3", "w3 w4"]);
        assert_eq!(a, b);
        assert_eq!(a, c);
    }

    #[test]
    fn filtered_drops_windows_touching_a_stopword() {
        let s = stop(&["the", "of"]);
        let t: Vec<String> = tokenize_filtered("The end of the road trip", 2, &s)
            .unwrap()
            .collect();
        assert_eq!(t, vec!["road trip"]);

        let unigrams: Vec<String> = tokenize_filtered("The end of the road", 1, &s)
            .unwrap()
            .collect();
        assert_eq!(unigrams, vec!["end", "road"]);
    }

    #[test]
    fn stopwords_are_case_folded() {
        let s = stop(&["and"]);
        assert!(s.is_stopword("AND"));

        let mixed = stop(&["The", "OF"]);
        assert_eq!(mixed.len(), 2);
        assert!(mixed.is_stopword("the"));
        assert!(mixed.is_stopword("of"));
        let t: Vec<String> = tokenize_filtered("The cat sat", 1, &mixed).unwrap().collect();
        assert_eq!(t, vec!["cat", "sat"]);
    }

    #[test]
    fn splits_on_unicode_word_boundaries() {
        let w: Vec<String> = words("Café résumé, naïve—déjà vu! l’homme").collect();
        assert_eq!(w, vec!["café", "résumé", "naïve", "déjà", "vu", "l'homme"]);
    }

    #[test]
    fn split_ngram_separates_last_word() {
        assert_eq!(split_ngram("new york city"), Some(("new york", "city")));
        assert_eq!(split_ngram("alone"), None);
    }

    #[test]
    fn loads_stopword_file() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "The\n\n# comment\n  and  ").unwrap();
        let s = load_stopwords(f.path()).unwrap();
        assert_eq!(s, stop(&["the", "and"]));
    }
}
