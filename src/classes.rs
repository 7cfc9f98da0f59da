use crate::corpus::CorpusStats;
use crate::types::{
    ClassId, WordId, NUM_RESERVED_CLASSES, SENT_END_ID, SENT_START_ID, START_CLASS, UNK_CLASS,
    UNK_ID,
};
use crate::vocabulary::Vocabulary;
use std::cmp::Reverse;
use std::collections::BTreeSet;
use tracing::warn;

/// Word-to-class mapping together with its inverse.
///
/// `class_words` uses ordered sets so that every per-class iteration runs
/// in ascending word-id order, which is also the listing order of the
/// secondary output format.
#[derive(Clone, Debug)]
pub struct ClassAssignment {
    pub(crate) word_class: Vec<ClassId>,
    pub(crate) class_words: Vec<BTreeSet<WordId>>,
}

impl ClassAssignment {
    /// Initial partition: `<s>` and `</s>` in START, `<unk>` in UNK, every
    /// other word containing `'<'` pinned to START, and the rest sorted by
    /// descending unigram count (ties by ascending id) and dealt
    /// round-robin over the non-reserved classes.
    pub fn initialize(
        vocabulary: &Vocabulary,
        stats: &CorpusStats,
        num_classes: usize,
    ) -> Self {
        let mut assignment = Self {
            word_class: vec![START_CLASS; vocabulary.len()],
            class_words: vec![BTreeSet::new(); num_classes],
        };

        let mut sorted_words = Vec::new();
        for word in vocabulary.ids() {
            if vocabulary.surface(word).contains('<') {
                continue;
            }
            sorted_words.push((Reverse(stats.word_count(word)), word));
        }
        sorted_words.sort_unstable();

        if sorted_words.len() < num_classes - NUM_RESERVED_CLASSES {
            warn!(
                words = sorted_words.len(),
                classes = num_classes - NUM_RESERVED_CLASSES,
                "fewer words than classes; some classes stay empty"
            );
        }

        let mut class_idx_helper = NUM_RESERVED_CLASSES;
        for (_, word) in sorted_words {
            let class = (class_idx_helper % num_classes) as ClassId;
            assignment.word_class[word as usize] = class;
            assignment.class_words[class as usize].insert(word);

            class_idx_helper += 1;
            while (class_idx_helper % num_classes) as ClassId == START_CLASS
                || (class_idx_helper % num_classes) as ClassId == UNK_CLASS
            {
                class_idx_helper += 1;
            }
        }

        // Reserved tokens and any other '<'-bearing word stay frozen in a
        // reserved class; registering them keeps word_class and class_words
        // mutually consistent.
        for word in vocabulary.ids() {
            if vocabulary.surface(word).contains('<') {
                assignment.word_class[word as usize] = START_CLASS;
                assignment.class_words[START_CLASS as usize].insert(word);
            }
        }
        assignment.word_class[UNK_ID as usize] = UNK_CLASS;
        assignment.class_words[START_CLASS as usize].remove(&UNK_ID);
        assignment.class_words[UNK_CLASS as usize].insert(UNK_ID);
        debug_assert_eq!(assignment.word_class[SENT_START_ID as usize], START_CLASS);
        debug_assert_eq!(assignment.word_class[SENT_END_ID as usize], START_CLASS);

        assignment
    }

    pub fn class_of(&self, word: WordId) -> ClassId {
        self.word_class[word as usize]
    }

    pub fn members(&self, class: ClassId) -> &BTreeSet<WordId> {
        &self.class_words[class as usize]
    }

    pub fn num_classes(&self) -> usize {
        self.class_words.len()
    }

    /// Move a word between member sets and repoint its class. Count tables
    /// are the committer's responsibility.
    pub(crate) fn reassign(&mut self, word: WordId, from: ClassId, to: ClassId) {
        self.class_words[from as usize].remove(&word);
        self.class_words[to as usize].insert(word);
        self.word_class[word as usize] = to;
    }
}
