//! Implicit link candidates from prose.
//!
//! [`natural_links`] reads a section brief and proposes the nouns it mentions as link targets.
//! Nothing here knows which nodes exist: the builder keeps a candidate only if it names an
//! existing node of another document.
//!
//! The noun phrase chunker is deliberately small. It classifies words with closed-class
//! lexicons (determiners, pronouns, prepositions, conjunctions, auxiliaries) and a handful of
//! adjective suffixes, then marks open-class words in verb position as verbs: after a subject
//! pronoun, `-s` forms right after a noun, words between a noun and a determiner, and `-ing`
//! forms after an auxiliary. Everything else is a noun.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::HashSet;

/// Candidates that are never links, in addition to caller supplied excludes.
pub const NOISE: [&str; 4] = ["", ",", "s", "ing"];

const SYMBOLS: &str = r"|;\\/:*\p{Ps}\p{Pe}\p{S}";

static MARKDOWN_URI: Lazy<Regex> = Lazy::new(|| Regex::new(r"\]\([^)]*\)").unwrap());
static CODE_SPAN: Lazy<Regex> = Lazy::new(|| Regex::new(r"`[^`]+`").unwrap());
static CLEAN_UP: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s\x{064D}").unwrap());
static APOSTROPHE: Lazy<Regex> = Lazy::new(|| Regex::new(r"'(ve|t|s)?").unwrap());
static DASHES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\p{Pd}").unwrap());
static LEADING_SYMBOLS: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"^[{SYMBOLS}\p{{Zs}}]+")).unwrap());
static ALTERNATIVE_SENTENCE_END: Lazy<Regex> = Lazy::new(|| Regex::new(r"\|+").unwrap());
static TRAILING_SYMBOLS: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"[{SYMBOLS}\p{{Zs}}]+$")).unwrap());
static INNER_SYMBOLS: Lazy<Regex> = Lazy::new(|| Regex::new(&format!("[{SYMBOLS}]")).unwrap());
static SPACE_BEFORE_PUNCTUATION: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+([,.])").unwrap());
static COMMAS: Lazy<Regex> = Lazy::new(|| Regex::new(r",+").unwrap());
static FULL_STOPS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.+").unwrap());
static SPACES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\p{L}\p{N}'_]+|[,.;:!?]").unwrap());

/// Remove link urls and code spans and collapse punctuation noise so that only prose remains.
pub fn pre_strip(text: &str) -> String {
    let text = MARKDOWN_URI.replace_all(text.trim(), "]");
    let text = CODE_SPAN.replace_all(&text, "");
    let text = CLEAN_UP.replace_all(&text, "");
    let text = text.replace('"', "");
    // Apostrophes survive only in contractions and possessives.
    let text = APOSTROPHE.replace_all(&text, |caps: &Captures| {
        if caps.get(1).is_some() {
            caps[0].to_string()
        } else {
            String::new()
        }
    });
    let text = DASHES.replace_all(&text, " ");
    let text = LEADING_SYMBOLS.replace_all(&text, "");
    let text = ALTERNATIVE_SENTENCE_END.replace_all(&text, ". ");
    let text = TRAILING_SYMBOLS.replace_all(&text, ".");
    let text = INNER_SYMBOLS.replace_all(&text, ", ");
    let text = SPACE_BEFORE_PUNCTUATION.replace_all(&text, "$1");
    let text = COMMAS.replace_all(&text, ",");
    let text = FULL_STOPS.replace_all(&text, ".");
    SPACES.replace_all(&text, " ").to_string()
}

static PRONOUNS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "i", "me", "my", "mine", "myself", "you", "your", "yours", "yourself", "he", "him",
        "his", "himself", "she", "her", "hers", "herself", "it", "its", "itself", "we", "us",
        "our", "ours", "ourselves", "they", "them", "their", "theirs", "themselves", "this",
        "that", "these", "those", "who", "whom", "whose", "which", "what", "someone",
        "something", "anyone", "anything", "everyone", "everything", "nobody", "nothing",
        "it's", "that's", "there's",
    ]
    .into_iter()
    .collect()
});

static DETERMINERS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "a", "an", "the", "some", "any", "every", "each", "all", "both", "no", "another",
        "such", "many", "much", "few", "several", "more", "most", "less", "either", "neither",
        "one", "two", "three", "four", "five", "six", "seven", "eight", "nine", "ten",
    ]
    .into_iter()
    .collect()
});

/// Closed-class words that separate noun phrases without contributing to them.
static BOUNDARIES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        // prepositions
        "of", "in", "on", "at", "to", "for", "with", "by", "from", "about", "into", "onto",
        "over", "under", "between", "through", "during", "before", "after", "above", "below",
        "without", "within", "across", "against", "among", "around", "behind", "beyond",
        "near", "since", "until", "upon", "via", "than", "as", "like",
        // conjunctions
        "and", "or", "but", "nor", "so", "yet", "if", "because", "while", "although",
        "though", "when", "where", "whether", "then",
        // very common verbs
        "get", "gets", "got",
        "make", "makes", "made", "use", "uses", "used", "see", "sees", "saw", "seen", "go",
        "goes", "went", "likes", "need", "needs", "want", "wants", "know", "knows", "say",
        "says", "said", "think", "thinks", "become", "becomes", "contain", "contains",
        "include", "includes", "describe", "describes", "show", "shows", "take", "takes",
        "give", "gives", "find", "finds", "let", "lets", "eat", "eats", "live", "lives",
        // adverbs
        "not", "very", "also", "just", "only", "too", "really", "always", "never", "often",
        "here", "there", "now", "still", "even", "again", "ever", "well", "quite", "rather",
        "almost", "how", "why",
    ]
    .into_iter()
    .collect()
});

static AUXILIARIES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "am", "is", "are", "was", "were", "be", "been", "being", "have", "has", "had", "do",
        "does", "did", "will", "would", "shall", "should", "can", "could", "may", "might",
        "must", "isn't", "aren't", "wasn't", "weren't", "don't", "doesn't", "didn't", "can't",
        "won't", "i'm", "you're", "we're", "they're", "he's", "she's",
    ]
    .into_iter()
    .collect()
});

/// Pronouns that are followed by a verb when they open a clause.
static SUBJECT_PRONOUNS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    ["i", "you", "he", "she", "it", "we", "they", "who"]
        .into_iter()
        .collect()
});

static ADJECTIVES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "big", "small", "large", "little", "good", "bad", "new", "old", "great", "high", "low",
        "long", "short", "red", "blue", "green", "black", "white", "yellow", "brown", "grey",
        "gray", "young", "quick", "slow", "happy", "sad", "hot", "cold", "fast", "early",
        "late", "important", "different", "simple", "easy", "hard", "free", "full", "real",
        "best", "better", "main", "first", "last", "own", "other", "same", "whole", "true",
        "false", "open", "closed", "public", "private", "local", "global",
    ]
    .into_iter()
    .collect()
});

const ADJECTIVE_SUFFIXES: [&str; 7] = ["ous", "ful", "ive", "able", "ible", "less", "ish"];

const IRREGULAR_PLURALS: [(&str, &str); 8] = [
    ("men", "man"),
    ("women", "woman"),
    ("children", "child"),
    ("people", "person"),
    ("mice", "mouse"),
    ("feet", "foot"),
    ("teeth", "tooth"),
    ("geese", "goose"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WordClass {
    Boundary,
    Pronoun,
    Determiner,
    Adjective,
    Verb,
    Noun,
}

fn classify(word: &str) -> WordClass {
    if AUXILIARIES.contains(word) {
        WordClass::Boundary
    } else if PRONOUNS.contains(word) {
        WordClass::Pronoun
    } else if DETERMINERS.contains(word) {
        WordClass::Determiner
    } else if BOUNDARIES.contains(word) || word.chars().all(|c| c.is_numeric()) {
        WordClass::Boundary
    } else if ADJECTIVES.contains(word)
        || (word.len() > 4 && ADJECTIVE_SUFFIXES.iter().any(|s| word.ends_with(s)))
    {
        WordClass::Adjective
    } else if word.len() > 4 && word.ends_with("ed") {
        WordClass::Boundary
    } else {
        WordClass::Noun
    }
}

/// A third person singular verb form such as `runs` or `watches`.
fn is_third_person(word: &str) -> bool {
    word.len() > 2
        && word.ends_with('s')
        && !["ss", "us", "is", "'s"].iter().any(|s| word.ends_with(s))
}

/// Refine lexical classes using the neighbouring words.
fn tag(words: &[String]) -> Vec<WordClass> {
    let mut classes: Vec<WordClass> = words.iter().map(|word| classify(word)).collect();
    for i in 0..words.len() {
        if classes[i] != WordClass::Noun {
            continue;
        }
        let word = words[i].as_str();
        let previous = i.checked_sub(1).map(|p| (words[p].as_str(), classes[p]));
        let next = words.get(i + 1).map(|n| (n.as_str(), classes[i + 1]));
        let verb = match previous {
            Some((prev, WordClass::Pronoun)) => SUBJECT_PRONOUNS.contains(prev),
            Some((_, WordClass::Noun)) => {
                // `garden parties are` keeps the plural noun
                let before_auxiliary = next.is_some_and(|(n, _)| AUXILIARIES.contains(n));
                let before_object = next.is_some_and(|(n, class)| {
                    class == WordClass::Determiner
                        || (class == WordClass::Pronoun && !SUBJECT_PRONOUNS.contains(n))
                });
                (is_third_person(word) && !before_auxiliary) || before_object
            }
            Some((prev, _)) => word.ends_with("ing") && AUXILIARIES.contains(prev),
            None => false,
        };
        if verb {
            classes[i] = WordClass::Verb;
        }
    }
    classes
}

/// Reduce a plural noun to its singular form.
pub fn singularize(word: &str) -> String {
    if let Some((_, singular)) = IRREGULAR_PLURALS.iter().find(|(plural, _)| *plural == word) {
        return singular.to_string();
    }
    if word.len() <= 3 || ["ss", "us", "is"].iter().any(|s| word.ends_with(s)) {
        return word.to_string();
    }
    if let Some(stem) = word.strip_suffix("ies") {
        return format!("{stem}y");
    }
    for suffix in ["sses", "ches", "shes", "xes", "zes"] {
        if word.ends_with(suffix) {
            return word[..word.len() - 2].to_string();
        }
    }
    word.strip_suffix('s').unwrap_or(word).to_string()
}

fn strip(term: &str) -> String {
    SPACES
        .replace_all(term.trim(), "-")
        .chars()
        .filter(|c| *c != '.' && *c != '_')
        .collect::<String>()
        .replace(',', "")
        .replace("'s", "")
}

struct NounPhrase {
    adjectives: Vec<String>,
    root: String,
}

fn noun_phrases(text: &str) -> Vec<NounPhrase> {
    let lowered = text.to_lowercase();
    let words: Vec<String> = TOKEN
        .find_iter(&lowered)
        .map(|m| strip(m.as_str()))
        .collect();
    let classes = tag(&words);
    let mut phrases = Vec::new();
    let mut adjectives: Vec<String> = Vec::new();
    for (word, class) in words.into_iter().zip(classes) {
        match class {
            WordClass::Adjective => adjectives.push(word),
            WordClass::Noun if !word.is_empty() => phrases.push(NounPhrase {
                adjectives: std::mem::take(&mut adjectives),
                root: singularize(&word),
            }),
            WordClass::Determiner => {}
            _ => adjectives.clear(),
        }
    }
    phrases
}

/// Candidate link targets mentioned in `content`, first occurrence order, without duplicates.
pub fn natural_links(content: &str, excludes: &[&str]) -> Vec<String> {
    let mut seen = HashSet::new();
    noun_phrases(&pre_strip(content))
        .into_iter()
        .flat_map(|phrase| {
            let mut names = vec![phrase.root.clone()];
            names.extend(phrase.adjectives.iter().cloned());
            names.extend(
                phrase
                    .adjectives
                    .iter()
                    .map(|adjective| format!("{adjective}-{}", phrase.root)),
            );
            names
        })
        .filter(|name| name.chars().count() > 1)
        .filter(|name| !NOISE.contains(&name.as_str()) && !excludes.contains(&name.as_str()))
        .filter(|name| seen.insert(name.clone()))
        .collect()
}
