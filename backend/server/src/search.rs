//! # Recipe Search
//!
//! Full-text matching over recipe `name` and `description`.
//!
//! ## Query syntax
//! - Plain words are alternatives: a recipe matches if it contains **any** of them.
//! - `-word` excludes recipes containing that word.
//! - `"some phrase"` must appear in the recipe, all phrases are required.
//!
//! ## Matching
//! - Case-insensitive.
//! - Diacritic-sensitive: `cafe` does not match `café`.
//! - Words are reduced to their English (Snowball) stems, so `cake` finds
//!   `Cakes` and `frying` finds `fry`.
//! - English stop words are ignored. A query made only of stop words finds nothing.
//! - Phrases are matched literally, without stemming.
//! - No ranking. Callers return matches in id order.
use std::{collections::HashSet, sync::LazyLock};

use cookbook::Recipe;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};

static WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\p{L}\p{M}\p{N}]+").expect("word pattern is valid"));

static PHRASE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""([^"]*)""#).expect("phrase pattern is valid"));

static STEMMER: LazyLock<Stemmer> = LazyLock::new(|| Stemmer::create(Algorithm::English));

static STOP_WORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "a", "about", "above", "after", "again", "against", "all", "am", "an", "and", "any",
        "are", "as", "at", "be", "because", "been", "before", "being", "below", "between",
        "both", "but", "by", "can", "could", "did", "do", "does", "doing", "down", "during",
        "each", "few", "for", "from", "further", "had", "has", "have", "having", "he", "her",
        "here", "hers", "herself", "him", "himself", "his", "how", "i", "if", "in", "into",
        "is", "it", "its", "itself", "just", "me", "more", "most", "my", "myself", "no",
        "nor", "not", "now", "of", "off", "on", "once", "only", "or", "other", "ought",
        "our", "ours", "ourselves", "out", "over", "own", "same", "she", "should", "so",
        "some", "such", "than", "that", "the", "their", "theirs", "them", "themselves",
        "then", "there", "these", "they", "this", "those", "through", "to", "too", "under",
        "until", "up", "very", "was", "we", "were", "what", "when", "where", "which",
        "while", "who", "whom", "why", "will", "with", "would", "you", "your", "yours",
        "yourself", "yourselves",
    ]
    .into_iter()
    .collect()
});

/// Terms are stored as stems.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TextQuery {
    pub terms: Vec<String>,
    pub negated: Vec<String>,
    pub phrases: Vec<String>,
}

impl TextQuery {
    pub fn parse(input: &str) -> Self {
        let mut query = TextQuery::default();

        for capture in PHRASE.captures_iter(input) {
            let phrase = capture[1].trim().to_lowercase();
            if !phrase.is_empty() {
                query.phrases.push(phrase);
            }
        }

        let rest = PHRASE.replace_all(input, " ");
        for chunk in rest.split_whitespace() {
            let (negated, chunk) = match chunk.strip_prefix('-') {
                Some(stripped) => (true, stripped),
                None => (false, chunk),
            };

            for word in tokens(chunk) {
                if negated {
                    query.negated.push(word);
                } else {
                    query.terms.push(word);
                }
            }
        }

        query
    }

    /// A query with nothing to look for never matches.
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty() && self.phrases.is_empty()
    }

    pub fn matches(&self, recipe: &Recipe) -> bool {
        if self.is_empty() {
            return false;
        }

        let name = recipe.name.to_lowercase();
        let description = recipe.description.to_lowercase();

        if !self
            .phrases
            .iter()
            .all(|phrase| name.contains(phrase.as_str()) || description.contains(phrase.as_str()))
        {
            return false;
        }

        let words: HashSet<String> = tokens(&name).chain(tokens(&description)).collect();

        if self.negated.iter().any(|word| words.contains(word)) {
            return false;
        }

        self.terms.is_empty() || self.terms.iter().any(|word| words.contains(word))
    }
}

/// Lowercased, stemmed words of `text`, stop words removed.
fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    WORD.find_iter(text).filter_map(|m| {
        let word = m.as_str().to_lowercase();

        if STOP_WORDS.contains(word.as_str()) {
            None
        } else {
            Some(STEMMER.stem(&word).into_owned())
        }
    })
}
