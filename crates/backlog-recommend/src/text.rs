//! Description cleanup and tokenization.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::Html;

static TOKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\w\w+\b").expect("invalid token regex"));

/// Plain text of a store description: markup dropped, text nodes joined by single spaces.
/// A missing description is the empty string.
pub fn clean_html(markup: Option<&str>) -> String {
    let Some(markup) = markup else {
        return String::new();
    };
    let fragment = Html::parse_fragment(markup);
    fragment
        .root_element()
        .text()
        .collect::<Vec<_>>()
        .join(" ")
}

pub const ENGLISH_STOPWORDS: &[&str] = &[
    "a", "about", "above", "across", "after", "afterwards", "again", "against", "all", "almost",
    "alone", "along", "already", "also", "although", "always", "am", "among", "amongst",
    "amoungst", "amount", "an", "and", "another", "any", "anyhow", "anyone", "anything", "anyway",
    "anywhere", "are", "around", "as", "at", "back", "be", "became", "because", "become",
    "becomes", "becoming", "been", "before", "beforehand", "behind", "being", "below", "beside",
    "besides", "between", "beyond", "bill", "both", "bottom", "but", "by", "call", "can",
    "cannot", "cant", "co", "con", "could", "couldnt", "cry", "de", "describe", "detail", "do",
    "done", "down", "due", "during", "each", "eg", "eight", "either", "eleven", "else",
    "elsewhere", "empty", "enough", "etc", "even", "ever", "every", "everyone", "everything",
    "everywhere", "except", "few", "fifteen", "fifty", "fill", "find", "fire", "first", "five",
    "for", "former", "formerly", "forty", "found", "four", "from", "front", "full", "further",
    "get", "give", "go", "had", "has", "hasnt", "have", "he", "hence", "her", "here",
    "hereafter", "hereby", "herein", "hereupon", "hers", "herself", "him", "himself", "his",
    "how", "however", "hundred", "i", "ie", "if", "in", "inc", "indeed", "interest", "into",
    "is", "it", "its", "itself", "keep", "last", "latter", "latterly", "least", "less", "ltd",
    "made", "many", "may", "me", "meanwhile", "might", "mill", "mine", "more", "moreover",
    "most", "mostly", "move", "much", "must", "my", "myself", "name", "namely", "neither",
    "never", "nevertheless", "next", "nine", "no", "nobody", "none", "noone", "nor", "not",
    "nothing", "now", "nowhere", "of", "off", "often", "on", "once", "one", "only", "onto",
    "or", "other", "others", "otherwise", "our", "ours", "ourselves", "out", "over", "own",
    "part", "per", "perhaps", "please", "put", "rather", "re", "same", "see", "seem", "seemed",
    "seeming", "seems", "serious", "several", "she", "should", "show", "side", "since",
    "sincere", "six", "sixty", "so", "some", "somehow", "someone", "something", "sometime",
    "sometimes", "somewhere", "still", "such", "system", "take", "ten", "than", "that", "the",
    "their", "them", "themselves", "then", "thence", "there", "thereafter", "thereby",
    "therefore", "therein", "thereupon", "these", "they", "thick", "thin", "third", "this",
    "those", "though", "three", "through", "throughout", "thru", "thus", "to", "together", "too",
    "top", "toward", "towards", "twelve", "twenty", "two", "un", "under", "until", "up", "upon",
    "us", "very", "via", "was", "we", "well", "were", "what", "whatever", "when", "whence",
    "whenever", "where", "whereafter", "whereas", "whereby", "wherein", "whereupon", "wherever",
    "whether", "which", "while", "whither", "who", "whoever", "whole", "whom", "whose", "why",
    "will", "with", "within", "without", "would", "yet", "you", "your", "yours", "yourself",
    "yourselves",
];

/// Generic gaming vocabulary that says nothing about what a title is like.
pub const GAMING_STOPWORDS: &[&str] = &[
    "game", "games", "play", "playing", "player", "players", "steam", "like", "new", "world", "s",
    "experience", "gameplay", "mode", "feature", "including", "featuring", "steampowered", "app",
    "com", "store", "total", "unique", "weapon", "battle",
];

pub fn default_stopwords() -> HashSet<String> {
    ENGLISH_STOPWORDS
        .iter()
        .chain(GAMING_STOPWORDS)
        .map(|w| w.to_string())
        .collect()
}

/// Lowercases, tokenizes, drops stopwords, then emits n-grams over what is left.
#[derive(Debug, Clone)]
pub struct Analyzer {
    stopwords: HashSet<String>,
    ngram_min: usize,
    ngram_max: usize,
}

impl Analyzer {
    pub fn new(stopwords: HashSet<String>, ngram_min: usize, ngram_max: usize) -> Self {
        let ngram_min = ngram_min.max(1);
        Self {
            stopwords,
            ngram_min,
            ngram_max: ngram_max.max(ngram_min),
        }
    }

    pub fn terms(&self, text: &str) -> Vec<String> {
        let lowered = text.to_lowercase();
        let tokens: Vec<&str> = TOKEN_RE
            .find_iter(&lowered)
            .map(|m| m.as_str())
            .filter(|t| !self.stopwords.contains(*t))
            .collect();

        let mut terms = Vec::new();
        for n in self.ngram_min..=self.ngram_max {
            if n > tokens.len() {
                break;
            }
            terms.extend(tokens.windows(n).map(|w| w.join(" ")));
        }
        terms
    }
}
