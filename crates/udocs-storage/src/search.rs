//! Full-text search index.
//!
//! Every storage backend owns one [`SearchIndex`]. The schema has a raw `id`
//! key, two structured fields (`title`, English-stemmed, and `modified`, a
//! date) and an analyzed `body` holding the page text with tags stripped.

use std::path::Path;
use std::sync::{LazyLock, Mutex, PoisonError};
use std::time::Instant;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tantivy::collector::{Count, TopDocs};
use tantivy::directory::MmapDirectory;
use tantivy::query::QueryParser;
use tantivy::schema::{
    DateOptions, Field, INDEXED, IndexRecordOption, STORED, STRING, Schema, TextFieldIndexing,
    TextOptions, Value,
};
use tantivy::{
    Index, IndexReader, IndexWriter, ReloadPolicy, SnippetGenerator, TantivyDocument, Term, doc,
};

use crate::storage::{StorageError, StorageErrorKind};

/// Number of matches returned per query.
const RESULT_LIMIT: usize = 10;

/// Writer heap size, in bytes.
const WRITER_MEMORY: usize = 50_000_000;

/// Maximum snippet length, in characters.
const SNIPPET_CHARS: usize = 240;

static HTML_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"</?[!\w]+((\s+\w+(\s*=\s*(?:".*?"|'.*?'|[^'">\s]+))?)+\s*|\s*)/?>"#)
        .expect("HTML tag pattern is valid")
});

/// Remove HTML tags, keeping text content.
///
/// Tags act as word breaks and whitespace runs collapse to one space.
#[must_use]
pub fn strip_html_tags(html: &str) -> String {
    HTML_TAG
        .replace_all(html, " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Search index error.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// I/O error while preparing the index directory.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Index directory could not be opened.
    #[error("Failed to open index directory: {0}")]
    Directory(#[from] tantivy::directory::error::OpenDirectoryError),
    /// Engine failure.
    #[error("Index error: {0}")]
    Tantivy(#[from] tantivy::TantivyError),
}

impl From<SearchError> for StorageError {
    fn from(err: SearchError) -> Self {
        StorageError::new(StorageErrorKind::Index).with_source(err)
    }
}

/// A document as it is stored in the index.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRecord {
    pub id: String,
    pub title: String,
    pub body: String,
    pub modified: DateTime<Utc>,
}

impl SearchRecord {
    /// Derive a record from stored HTML, stamped with the current time.
    #[must_use]
    pub fn from_html(id: &str, title: &str, data: &[u8]) -> Self {
        Self {
            id: id.to_owned(),
            title: title.to_owned(),
            body: strip_html_tags(&String::from_utf8_lossy(data)),
            modified: Utc::now(),
        }
    }
}

/// Result of a full-text query.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryResult {
    /// The query text as given.
    pub phrase: String,
    /// Total number of matching documents.
    pub total: usize,
    /// Query time in seconds.
    pub took: f64,
    /// Best matches, highest score first.
    pub query_matches: Vec<QueryMatch>,
}

/// A single ranked match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryMatch {
    pub id: String,
    /// 1-based position in the result list.
    pub rank: usize,
    pub score: f32,
    /// RFC 3339 timestamp of the last index update.
    pub modified: String,
    pub title: String,
    /// Highlighted snippet of the body, as HTML.
    pub body: String,
}

#[derive(Clone, Copy)]
struct Fields {
    id: Field,
    title: Field,
    body: Field,
    modified: Field,
}

fn build_schema() -> (Schema, Fields) {
    let mut builder = Schema::builder();
    let analyzed = TextOptions::default()
        .set_indexing_options(
            TextFieldIndexing::default()
                .set_tokenizer("en_stem")
                .set_index_option(IndexRecordOption::WithFreqsAndPositions),
        )
        .set_stored();

    let fields = Fields {
        id: builder.add_text_field("id", STRING | STORED),
        title: builder.add_text_field("title", analyzed.clone()),
        body: builder.add_text_field("body", analyzed),
        modified: builder.add_date_field("modified", DateOptions::from(INDEXED).set_stored()),
    };
    (builder.build(), fields)
}

/// Tantivy-backed full-text index.
pub struct SearchIndex {
    index: Index,
    reader: IndexReader,
    writer: Mutex<IndexWriter>,
    fields: Fields,
}

impl SearchIndex {
    /// Open the index stored in `dir`, creating a fresh one if none exists.
    pub fn open(dir: &Path) -> Result<Self, SearchError> {
        std::fs::create_dir_all(dir)?;
        let (schema, fields) = build_schema();
        let index = Index::open_or_create(MmapDirectory::open(dir)?, schema)?;
        tracing::debug!(dir = %dir.display(), "Opened search index");
        Self::from_index(index, fields)
    }

    /// Create an index held entirely in memory.
    pub fn in_memory() -> Result<Self, SearchError> {
        let (schema, fields) = build_schema();
        Self::from_index(Index::create_in_ram(schema), fields)
    }

    fn from_index(index: Index, fields: Fields) -> Result<Self, SearchError> {
        let writer: IndexWriter = index.writer_with_num_threads(1, WRITER_MEMORY)?;
        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()?;
        Ok(Self {
            index,
            reader,
            writer: Mutex::new(writer),
            fields,
        })
    }

    /// Insert a record, replacing any previous record with the same id.
    pub fn upsert(&self, record: &SearchRecord) -> Result<(), SearchError> {
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        writer.delete_term(Term::from_field_text(self.fields.id, &record.id));
        writer.add_document(doc!(
            self.fields.id => record.id.as_str(),
            self.fields.title => record.title.as_str(),
            self.fields.body => record.body.as_str(),
            self.fields.modified => tantivy::DateTime::from_timestamp_secs(record.modified.timestamp()),
        ))?;
        writer.commit()?;
        drop(writer);
        self.reader.reload()?;
        Ok(())
    }

    /// Remove the record for `id`, if any.
    pub fn remove(&self, id: &str) -> Result<(), SearchError> {
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        writer.delete_term(Term::from_field_text(self.fields.id, id));
        writer.commit()?;
        drop(writer);
        self.reader.reload()?;
        Ok(())
    }

    /// Remove every record.
    pub fn clear(&self) -> Result<(), SearchError> {
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        writer.delete_all_documents()?;
        writer.commit()?;
        drop(writer);
        self.reader.reload()?;
        Ok(())
    }

    /// Run a query against title and body.
    pub fn query(&self, phrase: &str) -> Result<QueryResult, SearchError> {
        let started = Instant::now();
        if phrase.trim().is_empty() {
            return Ok(QueryResult {
                phrase: phrase.to_owned(),
                ..QueryResult::default()
            });
        }

        let searcher = self.reader.searcher();
        let parser = QueryParser::for_index(&self.index, vec![self.fields.title, self.fields.body]);
        let (query, errors) = parser.parse_query_lenient(phrase);
        if !errors.is_empty() {
            tracing::debug!(phrase, errors = errors.len(), "Query parsed leniently");
        }
        let (top_docs, total) =
            searcher.search(&*query, &(TopDocs::with_limit(RESULT_LIMIT), Count))?;

        let mut snippets = SnippetGenerator::create(&searcher, &*query, self.fields.body)?;
        snippets.set_max_num_chars(SNIPPET_CHARS);

        let mut query_matches = Vec::with_capacity(top_docs.len());
        for (position, (score, address)) in top_docs.into_iter().enumerate() {
            let document: TantivyDocument = searcher.doc(address)?;
            let text = |field: Field| {
                document
                    .get_first(field)
                    .and_then(|value| value.as_str())
                    .unwrap_or_default()
                    .to_owned()
            };
            let modified = document
                .get_first(self.fields.modified)
                .and_then(|value| value.as_datetime())
                .and_then(|dt| DateTime::<Utc>::from_timestamp(dt.into_timestamp_secs(), 0))
                .map(|dt| dt.to_rfc3339())
                .unwrap_or_default();

            query_matches.push(QueryMatch {
                id: text(self.fields.id),
                rank: position + 1,
                score,
                modified,
                title: text(self.fields.title),
                body: snippets.snippet_from_doc(&document).to_html(),
            });
        }

        Ok(QueryResult {
            phrase: phrase.to_owned(),
            total,
            took: started.elapsed().as_secs_f64(),
            query_matches,
        })
    }
}
