use crate::classes::ClassAssignment;
use crate::corpus::CorpusStats;
use crate::types::{ClassId, WordId};
use rustc_hash::FxHashMap;

/// Aggregated class-level tables derived from the corpus statistics and
/// the current assignment.
///
/// All four tables are redundant projections of `bigrams` + `word_class`;
/// after construction only the committer mutates them, and a zero entry in
/// any sparse map is semantically identical to an absent one.
#[derive(Clone, Debug)]
pub struct ClassCounts {
    /// Total token mass per class.
    pub(crate) class_counts: Vec<i64>,
    /// Sparse rows of the K×K class-bigram table.
    pub(crate) cc_bigrams: Vec<FxHashMap<ClassId, i64>>,
    /// Outgoing mass of each word grouped by successor class.
    pub(crate) word_to_class: Vec<FxHashMap<ClassId, i64>>,
    /// Incoming mass of each word grouped by predecessor class.
    pub(crate) class_to_word: Vec<FxHashMap<ClassId, i64>>,
}

impl ClassCounts {
    pub(crate) fn build(
        stats: &CorpusStats,
        assignment: &ClassAssignment,
        num_classes: usize,
    ) -> Self {
        let num_words = stats.word_counts.len();
        let mut counts = Self {
            class_counts: vec![0; num_classes],
            cc_bigrams: vec![FxHashMap::default(); num_classes],
            word_to_class: vec![FxHashMap::default(); num_words],
            class_to_word: vec![FxHashMap::default(); num_words],
        };

        for (word, &count) in stats.word_counts.iter().enumerate() {
            counts.class_counts[assignment.class_of(word as WordId) as usize] += count;
        }

        for word in 0..num_words {
            let src_class = assignment.class_of(word as WordId);
            for (&succ, &count) in &stats.bigrams[word] {
                let tgt_class = assignment.class_of(succ);
                *counts.cc_bigrams[src_class as usize]
                    .entry(tgt_class)
                    .or_insert(0) += count;
                *counts.class_to_word[succ as usize]
                    .entry(src_class)
                    .or_insert(0) += count;
                *counts.word_to_class[word].entry(tgt_class).or_insert(0) += count;
            }
        }

        counts
    }

    pub(crate) fn class_bigram(&self, src: ClassId, tgt: ClassId) -> i64 {
        self.cc_bigrams[src as usize].get(&tgt).copied().unwrap_or(0)
    }

    pub(crate) fn outgoing(&self, word: WordId, class: ClassId) -> i64 {
        self.word_to_class[word as usize]
            .get(&class)
            .copied()
            .unwrap_or(0)
    }

    pub(crate) fn incoming(&self, word: WordId, class: ClassId) -> i64 {
        self.class_to_word[word as usize]
            .get(&class)
            .copied()
            .unwrap_or(0)
    }
}
