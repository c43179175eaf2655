/* 📖 # Why a BTreeMap of tokens for prefix search?

Queries use forward matching: `inst` must find documents containing
`install`, `installation` or `instance`. Keeping the token dictionary sorted
turns every query term into one range scan starting at the term and stopping
at the first token that no longer has it as a prefix. No per-prefix entries
are stored, so the index stays proportional to the number of distinct tokens.

Each document gets a sequence number when it is added. Postings store those
numbers, so intersecting them in a BTreeSet yields results in insertion order
without any sorting step.
*/

use std::collections::{BTreeMap, BTreeSet, HashMap};

use tracing::{debug, instrument};

use crate::document::{Document, DocumentId};

/// Result limit applied when none is configured.
pub const DEFAULT_RESULT_LIMIT: usize = 100;

/// Split text into lowercase alphanumeric tokens.
///
/// ```
/// use docportal_engine::search::tokenize;
///
/// assert_eq!(tokenize("Quick-Start: v2!"), vec!["quick", "start", "v2"]);
/// ```
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
        .collect()
}

#[derive(Debug, Clone)]
struct IndexedDocument {
    seq: u64,
    tokens: BTreeSet<String>,
}

/// In-memory inverted index answering forward (prefix) token queries.
#[derive(Debug, Clone)]
pub struct SearchIndex {
    postings: BTreeMap<String, BTreeSet<u64>>,
    documents: HashMap<DocumentId, IndexedDocument>,
    ids_by_seq: BTreeMap<u64, DocumentId>,
    next_seq: u64,
    limit: usize,
}

impl Default for SearchIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl SearchIndex {
    pub fn new() -> Self {
        Self {
            postings: BTreeMap::new(),
            documents: HashMap::new(),
            ids_by_seq: BTreeMap::new(),
            next_seq: 0,
            limit: DEFAULT_RESULT_LIMIT,
        }
    }

    /// Cap the number of ids returned by `search`.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Build an index from a document listing.
    #[instrument(skip(documents))]
    pub fn from_documents<'a>(documents: impl IntoIterator<Item = &'a Document>) -> Self {
        let mut index = Self::new();
        for document in documents {
            index.add(document.id().clone(), document.content());
        }
        debug!(documents = index.len(), tokens = index.postings.len(), "built search index");
        index
    }

    /// Register `content` under `id`, replacing anything indexed for it before.
    ///
    /// A replaced document moves to the end of the insertion order.
    pub fn add(&mut self, id: DocumentId, content: &str) {
        self.remove(&id);
        let seq = self.next_seq;
        self.next_seq += 1;

        let tokens: BTreeSet<String> = tokenize(content).into_iter().collect();
        for token in &tokens {
            self.postings.entry(token.clone()).or_default().insert(seq);
        }
        self.ids_by_seq.insert(seq, id.clone());
        self.documents.insert(id, IndexedDocument { seq, tokens });
    }

    /// Drop a document from the index. Returns false if it was not indexed.
    pub fn remove(&mut self, id: &DocumentId) -> bool {
        let Some(indexed) = self.documents.remove(id) else {
            return false;
        };
        for token in &indexed.tokens {
            if let Some(posting) = self.postings.get_mut(token) {
                posting.remove(&indexed.seq);
                if posting.is_empty() {
                    self.postings.remove(token);
                }
            }
        }
        self.ids_by_seq.remove(&indexed.seq);
        true
    }

    pub fn contains(&self, id: &DocumentId) -> bool {
        self.documents.contains_key(id)
    }

    /// Number of indexed documents.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Ids of documents containing, for every query term, a token starting with it.
    ///
    /// Results are in insertion order and capped at the configured limit. A
    /// query without any alphanumeric term matches nothing.
    pub fn search(&self, query: &str) -> Vec<DocumentId> {
        let terms: BTreeSet<String> = tokenize(query).into_iter().collect();
        if terms.is_empty() {
            return Vec::new();
        }

        let mut matches: Option<BTreeSet<u64>> = None;
        for term in &terms {
            let term_matches = self.prefix_matches(term);
            let narrowed = match matches {
                None => term_matches,
                Some(previous) => previous.intersection(&term_matches).copied().collect(),
            };
            if narrowed.is_empty() {
                return Vec::new();
            }
            matches = Some(narrowed);
        }

        matches
            .unwrap_or_default()
            .into_iter()
            .filter_map(|seq| self.ids_by_seq.get(&seq).cloned())
            .take(self.limit)
            .collect()
    }

    fn prefix_matches(&self, term: &str) -> BTreeSet<u64> {
        self.postings
            .range::<str, _>((std::ops::Bound::Included(term), std::ops::Bound::Unbounded))
            .take_while(|(token, _)| token.starts_with(term))
            .flat_map(|(_, seqs)| seqs.iter().copied())
            .collect()
    }
}
