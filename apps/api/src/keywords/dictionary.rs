//! Static vocabulary for keyword extraction: stop-words and known domain phrases.
//!
//! Both tables are immutable and initialized once per process.

use std::collections::HashSet;
use std::sync::{Arc, LazyLock};

use crate::keywords::extractor::normalize;

/// Known multi-word phrases, in priority order.
///
/// Order is part of the contract: the first phrase to match claims its tokens,
/// so longer or more specific phrases must come before any phrase they contain.
const BUILTIN_PHRASES: &[&str] = &[
    // Job titles
    "software engineer",
    "backend engineer",
    "frontend engineer",
    "full stack engineer",
    "software developer",
    "web developer",
    "devops engineer",
    "data engineer",
    "system administrator",
    "database administrator",
    "cloud architect",
    "solutions architect",
    "product manager",
    "scrum master",
    "technical lead",
    "engineering manager",
    // Technologies and frameworks
    "restful api",
    "restful apis",
    "microservices architecture",
    "service oriented architecture",
    "continuous integration",
    "continuous deployment",
    "ci/cd pipeline",
    "git workflow",
    "test driven development",
    "agile methodology",
    "scrum methodology",
    "kanban methodology",
    // Skills and concepts
    "cloud infrastructure",
    "distributed systems",
    "system design",
    "database design",
    "api design",
    "object oriented programming",
    "functional programming",
    "version control",
    "data structures",
    "design patterns",
    "unit testing",
    "integration testing",
    // Cloud platforms and tools
    "aws cloud",
    "microsoft azure",
    "google cloud",
    "cloud computing",
    "amazon web services",
    "aws lambda",
    "aws ec2",
    "aws s3",
    "docker containers",
    "kubernetes orchestration",
    "terraform",
    "infrastructure as code",
    // Programming languages with context
    "golang development",
    "python programming",
    "javascript framework",
    "typescript development",
    "java enterprise",
    "c++ programming",
    "react development",
    "node.js development",
    // Databases
    "postgresql database",
    "mysql database",
    "mongodb database",
    "redis cache",
    "elasticsearch",
    "sqlite database",
    "dynamodb",
    "database optimization",
    // Machine learning and data
    "machine learning",
    "data analysis",
    "data visualization",
    "big data",
    "natural language processing",
    "computer vision",
    "predictive modeling",
    "neural networks",
];

const STOP_WORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "ain", "all", "am", "an", "and", "any",
    "are", "aren", "as", "at", "be", "because", "been", "before", "being", "below", "between",
    "both", "but", "by", "can", "couldn", "could", "d", "did", "didn", "do", "does", "doesn",
    "doing", "don", "down", "during", "each", "few", "for", "from", "further", "had", "hadn",
    "has", "hasn", "have", "haven", "having", "he", "her", "here", "hers", "herself", "him",
    "himself", "his", "how", "i", "if", "in", "into", "is", "isn", "it", "its", "itself",
    "just", "ll", "m", "ma", "me", "mightn", "more", "most", "mustn", "my", "myself",
    "needn", "no", "nor", "not", "now", "o", "of", "off", "on", "once", "only", "or", "other",
    "our", "ours", "ourselves", "out", "over", "own", "re", "s", "same", "shan", "she",
    "should", "shouldn", "so", "some", "such", "t", "than", "that", "the", "their", "theirs",
    "them", "themselves", "then", "there", "these", "they", "this", "those", "through", "to",
    "too", "under", "until", "up", "ve", "very", "was", "wasn", "we", "were", "weren", "what",
    "when", "where", "which", "while", "who", "whom", "why", "will", "with", "won", "would",
    "wouldn", "y", "you", "your", "yours", "yourself", "yourselves",
];

static STOP_WORD_SET: LazyLock<HashSet<&'static str>> =
    LazyLock::new(|| STOP_WORDS.iter().copied().collect());

static BUILTIN: LazyLock<Arc<PhraseDictionary>> =
    LazyLock::new(|| Arc::new(PhraseDictionary::new(BUILTIN_PHRASES)));

pub fn is_stop_word(token: &str) -> bool {
    STOP_WORD_SET.contains(token)
}

/// A known phrase after normalization, kept both joined and tokenized.
#[derive(Debug, Clone, PartialEq)]
pub struct KnownPhrase {
    pub text: String,
    pub tokens: Vec<String>,
}

/// Ordered, deduplicated set of known phrases.
#[derive(Debug, Clone, Default)]
pub struct PhraseDictionary {
    phrases: Vec<KnownPhrase>,
}

impl PhraseDictionary {
    /// Builds a dictionary from raw phrases, keeping declaration order.
    ///
    /// Entries run through the same normalization as input text, so punctuation
    /// inside a phrase (`ci/cd`, `node.js`) is matched the way it appears after
    /// normalization. Entries that normalize to nothing, or to an earlier entry,
    /// are dropped.
    pub fn new<I, S>(phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let phrases = phrases
            .into_iter()
            .filter_map(|raw| {
                let tokens = normalize(raw.as_ref());
                if tokens.is_empty() {
                    return None;
                }
                let text = tokens.join(" ");
                seen.insert(text.clone()).then_some(KnownPhrase { text, tokens })
            })
            .collect();
        Self { phrases }
    }

    /// The built-in technical phrase dictionary, shared process-wide.
    pub fn builtin() -> Arc<PhraseDictionary> {
        Arc::clone(&BUILTIN)
    }

    pub fn phrases(&self) -> &[KnownPhrase] {
        &self.phrases
    }
}
