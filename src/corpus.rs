use crate::error::{ClassexError, Result};
use crate::types::{WordId, SENT_END_ID, SENT_START_ID};
use crate::vocabulary::Vocabulary;
use rustc_hash::FxHashMap;
use tracing::info;

/// Per-word corpus statistics: unigram counts plus forward and reverse
/// bigram maps, filled in one framed pass.
#[derive(Clone, Debug, Default)]
pub struct CorpusStats {
    pub(crate) word_counts: Vec<i64>,
    pub(crate) bigrams: Vec<FxHashMap<WordId, i64>>,
    pub(crate) rev_bigrams: Vec<FxHashMap<WordId, i64>>,
    pub(crate) token_count: i64,
}

impl CorpusStats {
    /// Pass two over the corpus: every sentence is framed with `<s>` and
    /// `</s>` before counting, and every adjacent framed pair feeds both
    /// bigram tables. The token total excludes the two framing tokens per
    /// sentence.
    ///
    /// Every surface token must already be in `vocabulary` (pass one built
    /// it from the same lines); a miss is an input-shape error.
    pub fn from_lines<I, S>(vocabulary: &Vocabulary, lines: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let len = vocabulary.len();
        let mut stats = Self {
            word_counts: vec![0; len],
            bigrams: vec![FxHashMap::default(); len],
            rev_bigrams: vec![FxHashMap::default(); len],
            token_count: 0,
        };

        let mut sentence = Vec::new();
        for line in lines {
            sentence.clear();
            sentence.push(SENT_START_ID);
            for token in line.as_ref().split_ascii_whitespace() {
                let id = vocabulary
                    .id_for(token)
                    .ok_or_else(|| ClassexError::UnknownToken(token.to_string()))?;
                sentence.push(id);
            }
            sentence.push(SENT_END_ID);

            for &id in &sentence {
                stats.word_counts[id as usize] += 1;
            }
            for pair in sentence.windows(2) {
                *stats.bigrams[pair[0] as usize].entry(pair[1]).or_insert(0) += 1;
                *stats.rev_bigrams[pair[1] as usize].entry(pair[0]).or_insert(0) += 1;
            }
            stats.token_count += sentence.len() as i64 - 2;
        }

        info!(tokens = stats.token_count, "corpus statistics built");
        Ok(stats)
    }

    pub fn word_count(&self, word: WordId) -> i64 {
        self.word_counts[word as usize]
    }

    pub fn token_count(&self) -> i64 {
        self.token_count
    }

    /// Count of the `word -> word` self bigram, zero if absent.
    pub(crate) fn self_bigram(&self, word: WordId) -> i64 {
        self.bigrams[word as usize].get(&word).copied().unwrap_or(0)
    }
}
