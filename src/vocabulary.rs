use crate::error::{ClassexError, Result};
use crate::types::{WordId, NUM_RESERVED_WORDS, SENT_END, SENT_START, UNK};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::info;

/// Bijection between surface tokens and dense word ids.
///
/// The reserved tokens `<s>`, `</s>`, `<unk>` occupy ids 0, 1, 2; every
/// other word type follows in lexicographic order, so ids are stable for a
/// given corpus.
#[derive(Clone, Debug, Default)]
pub struct Vocabulary {
    str_to_id: FxHashMap<String, WordId>,
    id_to_str: Vec<String>,
}

impl Vocabulary {
    /// Pass one over the corpus: collect word types from whitespace-split
    /// sentence lines.
    ///
    /// Literal reserved tokens in the corpus are indistinguishable from the
    /// reserved entries and resolve to their ids.
    pub fn from_lines<I, S>(lines: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut uniq = FxHashSet::default();
        let mut num_sentences = 0usize;
        for line in lines {
            num_sentences += 1;
            for token in line.as_ref().split_ascii_whitespace() {
                uniq.insert(token.to_string());
            }
        }
        if num_sentences == 0 {
            return Err(ClassexError::EmptyCorpus);
        }

        let mut vocabulary = Self::default();
        for reserved in [SENT_START, SENT_END, UNK] {
            vocabulary.insert(reserved.to_string());
            uniq.remove(reserved);
        }

        let mut sorted = uniq.into_iter().collect::<Vec<_>>();
        sorted.sort_unstable();
        vocabulary.str_to_id.reserve(sorted.len());
        vocabulary.id_to_str.reserve(sorted.len());
        for token in sorted {
            vocabulary.insert(token);
        }

        info!(
            word_types = vocabulary.len() - NUM_RESERVED_WORDS,
            sentences = num_sentences,
            "vocabulary built"
        );
        Ok(vocabulary)
    }

    fn insert(&mut self, token: String) -> WordId {
        let id = self.id_to_str.len() as WordId;
        self.str_to_id.insert(token.clone(), id);
        self.id_to_str.push(token);
        id
    }

    pub fn id_for(&self, token: &str) -> Option<WordId> {
        self.str_to_id.get(token).copied()
    }

    pub fn surface(&self, id: WordId) -> &str {
        &self.id_to_str[id as usize]
    }

    pub fn len(&self) -> usize {
        self.id_to_str.len()
    }

    pub fn is_empty(&self) -> bool {
        self.id_to_str.is_empty()
    }

    /// Word ids in ascending order.
    pub fn ids(&self) -> impl Iterator<Item = WordId> + '_ {
        (0..self.id_to_str.len()).map(|id| id as WordId)
    }
}
