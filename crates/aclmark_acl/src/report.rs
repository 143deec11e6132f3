use fxhash::FxBuildHasher;
use indexmap::IndexMap;

/// Subtypes under which [MarkReport::emit] records its findings.
pub mod subtype {
    pub const NOT_EQUIVALENT: &str = "not-equivalent";
    pub const REDUNDANT: &str = "redundant";
    pub const DEAD: &str = "dead-statement";
    pub const POST_DEFAULT: &str = "post-default-statement";
    pub const LOSSY_PRUNE: &str = "lossy-prune";
}

/// Outcome of [crate::acl::Acl::mark_against].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MarkReport {
    pub equivalent: bool,
    /// More effective statements than the solution needs.
    pub redundant: bool,
    pub statement_count: usize,
    pub solution_count: usize,
    pub dead_statements: Vec<String>,
    pub post_default_statements: Vec<String>,
    /// Statements or rules whose address scope fell partly or wholly
    /// outside an any-equivalent window.
    pub lossy_prunes: Vec<String>,
}

impl MarkReport {
    pub fn redundant_message(&self) -> Option<String> {
        self.redundant.then(|| {
            format!(
                "{} statements used where {} are enough",
                self.statement_count, self.solution_count
            )
        })
    }

    /// Hand every finding to `sink` under the category `acl_name`.
    pub fn emit<S: ErrorSink + ?Sized>(&self, acl_name: &str, sink: &mut S) {
        if !self.equivalent {
            sink.record(
                acl_name,
                subtype::NOT_EQUIVALENT,
                "acl does not filter like the solution".to_owned(),
            );
        }
        if let Some(message) = self.redundant_message() {
            sink.record(acl_name, subtype::REDUNDANT, message);
        }
        for statement in self.dead_statements.iter() {
            sink.record(acl_name, subtype::DEAD, statement.clone());
        }
        for statement in self.post_default_statements.iter() {
            sink.record(acl_name, subtype::POST_DEFAULT, statement.clone());
        }
        for statement in self.lossy_prunes.iter() {
            sink.record(acl_name, subtype::LOSSY_PRUNE, statement.clone());
        }
    }
}

/// ErrorSink collects grading findings. Entries are append-only and keep
/// their order within a category.
pub trait ErrorSink {
    fn record(&mut self, category: &str, subtype: &str, message: String);
}

/// A finding stored by [MemorySink].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Entry {
    pub subtype: String,
    pub message: String,
}

/// [MemorySink] keeps findings in memory, categories in first-seen order.
#[derive(Clone, Debug, Default)]
pub struct MemorySink {
    entries: IndexMap<String, Vec<Entry>, FxBuildHasher>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, category: &str) -> &[Entry] {
        self.entries
            .get(category)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Entry)> {
        self.entries
            .iter()
            .flat_map(|(category, entries)| entries.iter().map(move |e| (category.as_str(), e)))
    }
}

impl ErrorSink for MemorySink {
    fn record(&mut self, category: &str, subtype: &str, message: String) {
        self.entries
            .entry(category.to_owned())
            .or_default()
            .push(Entry {
                subtype: subtype.to_owned(),
                message,
            });
    }
}
