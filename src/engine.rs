use crate::classes::ClassAssignment;
use crate::corpus::CorpusStats;
use crate::counts::ClassCounts;
use crate::error::{ClassexError, Result};
use crate::scoring::{cell_delta, log_likelihood, xlogx};
use crate::types::{
    ClassId, OptimizerConfig, RunStatus, RunSummary, WordId, DEADLINE_CHECK_INTERVAL,
    NUM_RESERVED_CLASSES, START_CLASS, UNK_CLASS,
};
use crate::vocabulary::Vocabulary;
use rustc_hash::FxHashMap;
use std::time::{Duration, Instant};
use tracing::{info, warn};

enum PassOutcome {
    Completed { moves: usize },
    DeadlineExpired { moves: usize },
}

/// The exchange optimiser: corpus statistics, the current partition, and
/// the aggregated class tables, plus the incremental move machinery.
///
/// `evaluate` is read-only and exact; `commit` applies the same deltas to
/// every table so the aggregates stay consistent with a from-scratch
/// rebuild. Both run in time proportional to the word's class
/// neighbourhood, never O(K²).
#[derive(Clone, Debug)]
pub struct Exchange {
    vocabulary: Vocabulary,
    stats: CorpusStats,
    assignment: ClassAssignment,
    counts: ClassCounts,
    num_classes: usize,
}

impl Exchange {
    /// Build the optimiser over `num_classes` user-visible classes; the
    /// START and UNK classes are added on top.
    pub fn new(vocabulary: Vocabulary, stats: CorpusStats, num_classes: usize) -> Result<Self> {
        if num_classes < 1 {
            return Err(ClassexError::InvalidClassCount {
                requested: num_classes,
            });
        }
        if num_classes == 1 {
            warn!("a single class leaves every word without an exchange destination");
        }
        let total_classes = num_classes + NUM_RESERVED_CLASSES;
        let assignment = ClassAssignment::initialize(&vocabulary, &stats, total_classes);
        let counts = ClassCounts::build(&stats, &assignment, total_classes);
        Ok(Self {
            vocabulary,
            stats,
            assignment,
            counts,
            num_classes: total_classes,
        })
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    pub fn assignment(&self) -> &ClassAssignment {
        &self.assignment
    }

    /// Total class count including START and UNK.
    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    /// Current objective by full recomputation.
    pub fn log_likelihood(&self) -> f64 {
        log_likelihood(&self.stats, &self.counts)
    }

    /// Exact change in log-likelihood for moving `word` from `from` to
    /// `to`, without touching any table.
    ///
    /// Callers guarantee `from != to` and that neither side is a reserved
    /// class. Absent sparse entries read as zero throughout.
    pub fn evaluate(&self, word: WordId, from: ClassId, to: ClassId) -> f64 {
        debug_assert_ne!(from, to);
        let mut ll_diff = 0.0;
        let word_count = self.stats.word_count(word);

        // Class unigram term; the objective subtracts it twice.
        ll_diff += 2.0 * xlogx(self.counts.class_counts[from as usize]);
        ll_diff -= 2.0 * xlogx(self.counts.class_counts[from as usize] - word_count);
        ll_diff += 2.0 * xlogx(self.counts.class_counts[to as usize]);
        ll_diff -= 2.0 * xlogx(self.counts.class_counts[to as usize] + word_count);

        // Off-diagonal rows: the word's outgoing mass leaves (from, c) and
        // enters (to, c).
        for (&class, &count) in &self.counts.word_to_class[word as usize] {
            if class == from || class == to {
                continue;
            }
            let old = self.counts.class_bigram(from, class);
            cell_delta(&mut ll_diff, old, old - count);
            let old = self.counts.class_bigram(to, class);
            cell_delta(&mut ll_diff, old, old + count);
        }

        // Off-diagonal columns: incoming mass leaves (c, from) and enters
        // (c, to).
        for (&class, &count) in &self.counts.class_to_word[word as usize] {
            if class == from || class == to {
                continue;
            }
            let old = self.counts.class_bigram(class, from);
            cell_delta(&mut ll_diff, old, old - count);
            let old = self.counts.class_bigram(class, to);
            cell_delta(&mut ll_diff, old, old + count);
        }

        // The four cells where `from` and `to` interact need joint
        // accounting; the mixed tables include the self-bigram in the
        // word's own class entry, hence the explicit corrections.
        let self_count = self.stats.self_bigram(word);
        let out_from = self.counts.outgoing(word, from);
        let out_to = self.counts.outgoing(word, to);
        let in_from = self.counts.incoming(word, from);
        let in_to = self.counts.incoming(word, to);

        let old = self.counts.class_bigram(from, to);
        cell_delta(&mut ll_diff, old, old - out_to + in_from - self_count);
        let old = self.counts.class_bigram(to, from);
        cell_delta(&mut ll_diff, old, old - in_to + out_from - self_count);
        let old = self.counts.class_bigram(from, from);
        cell_delta(&mut ll_diff, old, old - out_from - in_from + self_count);
        let old = self.counts.class_bigram(to, to);
        cell_delta(&mut ll_diff, old, old + out_to + in_to + self_count);

        ll_diff
    }

    /// Apply the move to every table. The update order never exposes a
    /// partially-moved state to the evaluator because nothing reads the
    /// tables until this returns.
    pub fn commit(&mut self, word: WordId, from: ClassId, to: ClassId) {
        debug_assert_ne!(from, to);
        let word_count = self.stats.word_count(word);
        self.counts.class_counts[from as usize] -= word_count;
        self.counts.class_counts[to as usize] += word_count;

        for (&succ, &count) in &self.stats.bigrams[word as usize] {
            if succ == word {
                continue;
            }
            let tgt_class = self.assignment.class_of(succ);
            bump(&mut self.counts.cc_bigrams[from as usize], tgt_class, -count);
            bump(&mut self.counts.cc_bigrams[to as usize], tgt_class, count);
            bump(&mut self.counts.class_to_word[succ as usize], from, -count);
            bump(&mut self.counts.class_to_word[succ as usize], to, count);
        }

        for (&pred, &count) in &self.stats.rev_bigrams[word as usize] {
            if pred == word {
                continue;
            }
            let src_class = self.assignment.class_of(pred);
            bump(&mut self.counts.cc_bigrams[src_class as usize], from, -count);
            bump(&mut self.counts.cc_bigrams[src_class as usize], to, count);
            bump(&mut self.counts.word_to_class[pred as usize], from, -count);
            bump(&mut self.counts.word_to_class[pred as usize], to, count);
        }

        // The self bigram moves from the (from, from) diagonal to
        // (to, to) intact, and lives in both of the word's own mixed rows.
        let self_count = self.stats.self_bigram(word);
        if self_count != 0 {
            bump(&mut self.counts.cc_bigrams[from as usize], from, -self_count);
            bump(&mut self.counts.cc_bigrams[to as usize], to, self_count);
            bump(&mut self.counts.word_to_class[word as usize], from, -self_count);
            bump(&mut self.counts.word_to_class[word as usize], to, self_count);
            bump(&mut self.counts.class_to_word[word as usize], from, -self_count);
            bump(&mut self.counts.class_to_word[word as usize], to, self_count);
        }

        self.assignment.reassign(word, from, to);
    }

    /// One full pass: visit non-reserved words in ascending id order, move
    /// each to its best destination when that strictly improves the
    /// objective. First-encountered-wins on tied destinations keeps the
    /// search deterministic.
    fn pass(
        &mut self,
        config: &OptimizerConfig,
        deadline: Option<Instant>,
        visited: &mut usize,
    ) -> Result<PassOutcome> {
        let mut moves = 0;
        for word in 0..self.vocabulary.len() as WordId {
            let from = self.assignment.class_of(word);
            if from == START_CLASS || from == UNK_CLASS {
                continue;
            }

            *visited += 1;
            if *visited % DEADLINE_CHECK_INTERVAL == 0 {
                if let Some(deadline) = deadline {
                    if Instant::now() >= deadline {
                        return Ok(PassOutcome::DeadlineExpired { moves });
                    }
                }
            }

            let mut best_class = None;
            let mut best_diff = f64::NEG_INFINITY;
            for class in NUM_RESERVED_CLASSES as ClassId..self.num_classes as ClassId {
                if class == from {
                    continue;
                }
                let ll_diff = self.evaluate(word, from, class);
                if ll_diff > best_diff {
                    best_diff = ll_diff;
                    best_class = Some(class);
                }
            }

            let Some(best_class) = best_class else {
                return Err(ClassexError::NoCandidateClass {
                    word: self.vocabulary.surface(word).to_string(),
                });
            };

            if best_diff > 0.0 {
                self.commit(word, from, best_class);
                moves += 1;
            }

            if let Some(interval) = config.ll_print_interval {
                if interval > 0 && *visited % interval == 0 {
                    info!(log_likelihood = self.log_likelihood(), "progress");
                }
            }
        }
        Ok(PassOutcome::Completed { moves })
    }

    /// Greedy local search until convergence, the pass cap, or the
    /// wall-clock budget. The deadline is checked between word visits at
    /// [`DEADLINE_CHECK_INTERVAL`] granularity; a visit either completes
    /// or was never started.
    pub fn run(&mut self, config: &OptimizerConfig) -> Result<RunSummary> {
        let deadline = config
            .max_seconds
            .map(|seconds| Instant::now() + Duration::from_secs_f64(seconds));
        info!(log_likelihood = self.log_likelihood(), "initial objective");

        let mut passes = 0;
        let mut total_moves = 0;
        let mut visited = 0usize;

        let status = loop {
            if let Some(max) = config.max_iterations {
                if passes >= max {
                    break RunStatus::IterationLimit;
                }
            }
            match self.pass(config, deadline, &mut visited)? {
                PassOutcome::DeadlineExpired { moves } => {
                    total_moves += moves;
                    break RunStatus::TimeLimit;
                }
                PassOutcome::Completed { moves } => {
                    passes += 1;
                    total_moves += moves;
                    info!(
                        pass = passes,
                        moves,
                        log_likelihood = self.log_likelihood(),
                        "pass complete"
                    );
                    if moves == 0 {
                        break RunStatus::Converged;
                    }
                }
            }
        };

        Ok(RunSummary {
            passes,
            moves: total_moves,
            log_likelihood: self.log_likelihood(),
            status,
        })
    }

    /// Rebuild every aggregate from the raw bigrams and the current
    /// assignment and compare, ignoring explicit zero entries. The
    /// verification oracle behind the property tests.
    pub(crate) fn verify_consistency(&self) -> bool {
        let rebuilt = ClassCounts::build(&self.stats, &self.assignment, self.num_classes);
        if rebuilt.class_counts != self.counts.class_counts {
            return false;
        }
        let rows_match = |ours: &[FxHashMap<ClassId, i64>], theirs: &[FxHashMap<ClassId, i64>]| {
            ours.len() == theirs.len()
                && ours
                    .iter()
                    .zip(theirs)
                    .all(|(a, b)| nonzero_entries(a) == nonzero_entries(b))
        };
        if !rows_match(&self.counts.cc_bigrams, &rebuilt.cc_bigrams)
            || !rows_match(&self.counts.word_to_class, &rebuilt.word_to_class)
            || !rows_match(&self.counts.class_to_word, &rebuilt.class_to_word)
        {
            return false;
        }

        // word_class and class_words must stay a bijection.
        self.vocabulary.ids().all(|word| {
            self.assignment
                .members(self.assignment.class_of(word))
                .contains(&word)
        }) && (0..self.num_classes as ClassId).all(|class| {
            self.assignment
                .members(class)
                .iter()
                .all(|&word| self.assignment.class_of(word) == class)
        })
    }
}

fn bump(row: &mut FxHashMap<ClassId, i64>, class: ClassId, delta: i64) {
    let entry = row.entry(class).or_insert(0);
    *entry += delta;
    debug_assert!(*entry >= 0, "count for class {class} went negative");
}

fn nonzero_entries(row: &FxHashMap<ClassId, i64>) -> FxHashMap<ClassId, i64> {
    row.iter()
        .filter(|(_, &count)| count != 0)
        .map(|(&class, &count)| (class, count))
        .collect()
}
