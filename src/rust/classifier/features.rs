use std::collections::HashMap;
use std::fmt;

use log::{debug, warn};
use tokenizers::pre_tokenizers::bert::BertPreTokenizer;
use tokenizers::{OffsetReferential, OffsetType, PreTokenizedString, PreTokenizer};
use unicode_categories::UnicodeCategories;
use unicode_segmentation::UnicodeSegmentation;

/// A bag-of-words representation of a single input text.
///
/// Maps each normalized token to the number of times it occurred. A key is
/// only ever present with a count of at least one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeatureVector {
    counts: HashMap<String, u64>,
}

impl FeatureVector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one occurrence of `token`.
    pub fn add(&mut self, token: impl Into<String>) {
        let count = self.counts.entry(token.into()).or_insert(0);
        *count = count.saturating_add(1);
    }

    pub fn get(&self, token: &str) -> Option<u64> {
        self.counts.get(token).copied()
    }

    pub fn contains(&self, token: &str) -> bool {
        self.counts.contains_key(token)
    }

    /// Number of distinct tokens.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Sum of all counts.
    pub fn total(&self) -> u64 {
        self.counts.values().fold(0, |acc, &c| acc.saturating_add(c))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.counts.iter().map(|(k, &v)| (k.as_str(), v))
    }

    /// Entries sorted by descending count, ties broken alphabetically.
    pub fn sorted(&self) -> Vec<(&str, u64)> {
        let mut entries: Vec<_> = self.iter().collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        entries
    }

    /// The mapping with counts widened to `f64`, the shape most model
    /// runtimes accept for dictionary inputs.
    pub fn to_f64_map(&self) -> HashMap<String, f64> {
        self.counts
            .iter()
            .map(|(k, &v)| (k.clone(), v as f64))
            .collect()
    }

    pub fn as_map(&self) -> &HashMap<String, u64> {
        &self.counts
    }
}

impl<'a> IntoIterator for &'a FeatureVector {
    type Item = (&'a String, &'a u64);
    type IntoIter = std::collections::hash_map::Iter<'a, String, u64>;

    fn into_iter(self) -> Self::IntoIter {
        self.counts.iter()
    }
}

impl<S: Into<String>> FromIterator<S> for FeatureVector {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut features = FeatureVector::new();
        for token in iter {
            features.add(token);
        }
        features
    }
}

/// How input text is split into candidate segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Segmenter {
    /// Unicode word boundaries (UAX #29). Keeps contractions such as
    /// "don't" and decimal numbers such as "3.14" together.
    #[default]
    Unicode,
    /// BERT-style pre-tokenization: split on whitespace and on every
    /// punctuation character.
    Bert,
}

/// Category assigned to each segment before filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    Word,
    Punctuation,
    Whitespace,
    /// Neither a word nor punctuation/whitespace: symbols, emoji and the like.
    Other,
}

impl fmt::Display for SegmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Word => write!(f, "word"),
            Self::Punctuation => write!(f, "punctuation"),
            Self::Whitespace => write!(f, "whitespace"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// Tokenizer policy for feature extraction.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExtractorConfig {
    pub segmenter: Segmenter,
    /// Count `SegmentKind::Other` segments instead of dropping them.
    pub keep_other: bool,
    /// Drop tokens longer than this many characters.
    pub max_token_chars: Option<usize>,
}

/// Converts raw text into a [`FeatureVector`].
///
/// Extraction is a pure function of the input and the configuration: it never
/// fails and holds no state between calls.
#[derive(Debug, Clone, Default)]
pub struct FeatureExtractor {
    config: ExtractorConfig,
}

impl FeatureExtractor {
    pub fn new(config: ExtractorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Builds the bag of words for `text`.
    ///
    /// # Example
    /// ```
    /// use wordbag::FeatureExtractor;
    ///
    /// let features = FeatureExtractor::default().extract("Hello, world! Hello.");
    /// assert_eq!(features.get("hello"), Some(2));
    /// assert_eq!(features.get("world"), Some(1));
    /// assert_eq!(features.len(), 2);
    /// ```
    pub fn extract(&self, text: &str) -> FeatureVector {
        let mut features = FeatureVector::new();
        for (segment, kind) in self.segments(text) {
            if !self.accepts(&segment, kind) {
                continue;
            }
            features.add(segment);
        }
        debug!(
            "Extracted {} distinct tokens ({} total) from {} bytes of input",
            features.len(),
            features.total(),
            text.len()
        );
        features
    }

    /// Lowercases `text` and returns every segment with its category,
    /// including the ones `extract` would discard.
    pub fn segments(&self, text: &str) -> Vec<(String, SegmentKind)> {
        let lowered = text.to_lowercase();
        let pieces: Vec<String> = match self.config.segmenter {
            Segmenter::Unicode => lowered.split_word_bounds().map(str::to_owned).collect(),
            Segmenter::Bert => bert_splits(&lowered),
        };
        pieces
            .into_iter()
            .map(|piece| {
                let kind = classify_segment(&piece);
                (piece, kind)
            })
            .collect()
    }

    fn accepts(&self, segment: &str, kind: SegmentKind) -> bool {
        let keep = match kind {
            SegmentKind::Word => true,
            SegmentKind::Other => self.config.keep_other,
            SegmentKind::Punctuation | SegmentKind::Whitespace => false,
        };
        if !keep {
            return false;
        }
        match self.config.max_token_chars {
            Some(max) => segment.chars().count() <= max,
            None => true,
        }
    }
}

/// Extracts features with the default policy.
pub fn extract_features(text: &str) -> FeatureVector {
    FeatureExtractor::default().extract(text)
}

fn bert_splits(text: &str) -> Vec<String> {
    let mut pretokenized = PreTokenizedString::from(text);
    if let Err(e) = BertPreTokenizer.pre_tokenize(&mut pretokenized) {
        // The BERT pre-tokenizer only splits; fall back to whitespace if it ever refuses.
        warn!("BERT pre-tokenization failed, splitting on whitespace: {}", e);
        return text.split_whitespace().map(str::to_owned).collect();
    }
    pretokenized
        .get_splits(OffsetReferential::Original, OffsetType::Byte)
        .into_iter()
        .map(|(piece, _, _)| piece.to_owned())
        .collect()
}

pub(crate) fn classify_segment(segment: &str) -> SegmentKind {
    if segment.chars().all(char::is_whitespace) {
        SegmentKind::Whitespace
    } else if segment.chars().any(char::is_alphanumeric) {
        SegmentKind::Word
    } else if segment.chars().all(|c| is_punctuation(c) || c.is_whitespace()) {
        SegmentKind::Punctuation
    } else {
        SegmentKind::Other
    }
}

/// Unicode general category P* (`Pc Pd Ps Pe Pi Pf Po`). Symbols (`S*`), such
/// as `$`, `+`, `€` and emoji, are not punctuation.
fn is_punctuation(c: char) -> bool {
    c.is_punctuation()
}
