//! MongoDB storage backend for udocs.
//!
//! Records are partitioned into one collection per route. A record's
//! collection is picked from its id by [`collection_for`]; bare files at the
//! top level (the sidebar) live in the `root` collection. Every collection has
//! a unique index on `page_id`.
//!
//! HTML records are entity-escaped before they are written and unescaped when
//! read back.
//!
//! The search index is kept on local disk, so a server that starts against
//! an existing database re-indexes the stored pages (see `udocs-build`).

use std::collections::HashSet;
use std::path::Path;
use std::sync::{Mutex, PoisonError};

use mongodb::IndexModel;
use mongodb::bson::spec::BinarySubtype;
use mongodb::bson::{Binary, Bson, Document, doc};
use mongodb::options::{IndexOptions, UpdateOptions};
use mongodb::sync::{Client, Collection, Database};
use udocs_storage::{
    QueryResult, SearchIndex, SearchRecord, Storage, StorageError, StorageErrorKind, id,
};

/// Backend identifier for error messages.
const BACKEND: &str = "Mongo";

/// Database used when the connection string names none.
const DEFAULT_DATABASE: &str = "udocs";

/// Collection for top-level files.
const ROOT_COLLECTION: &str = "root";

/// Connection string suffix requesting TLS in the legacy form.
const LEGACY_SSL_SUFFIX: &str = "?ssl=true";

/// Equivalent TLS options understood by the driver.
const TLS_OPTIONS: &str = "?tls=true&tlsAllowInvalidCertificates=true";

/// Pick the collection that holds `id`.
///
/// `/route/page.html` and `/route` map to `route`; `/sidebar.json` and `/` map
/// to `root`.
#[must_use]
pub fn collection_for(id: &str) -> String {
    let normalized = id::normalize(id);
    let mut segments = normalized.trim_start_matches('/').split('/');
    let first = segments.next().unwrap_or_default();
    let nested = segments.next().is_some();

    if first.is_empty() || (!nested && id::has_extension(first)) {
        ROOT_COLLECTION.to_owned()
    } else {
        first.to_owned()
    }
}

/// Translate a connection string to the form the driver expects.
///
/// Both TLS and plain connection strings are accepted; the legacy
/// `?ssl=true` suffix is rewritten to the driver's TLS options.
#[must_use]
pub fn connection_uri(url: &str) -> String {
    match url.strip_suffix(LEGACY_SSL_SUFFIX) {
        Some(base) => format!("{base}{TLS_OPTIONS}"),
        None => url.to_owned(),
    }
}

/// Encode record content for storage.
fn encode_page(id: &str, data: &[u8]) -> Vec<u8> {
    if id::is_html(id) {
        html_escape::encode_safe(&String::from_utf8_lossy(data))
            .into_owned()
            .into_bytes()
    } else {
        data.to_vec()
    }
}

/// Decode stored record content.
fn decode_page(id: &str, data: Vec<u8>) -> Vec<u8> {
    if id::is_html(id) {
        html_escape::decode_html_entities(&String::from_utf8_lossy(&data))
            .into_owned()
            .into_bytes()
    } else {
        data
    }
}

fn driver_error(err: mongodb::error::Error, id: Option<&str>) -> StorageError {
    let error = StorageError::new(StorageErrorKind::Unavailable)
        .with_backend(BACKEND)
        .with_source(err);
    match id {
        Some(id) => error.with_id(id),
        None => error,
    }
}

/// Storage backed by a MongoDB database and a local search index.
pub struct MongoStorage {
    database: Database,
    search: SearchIndex,
    /// Collections whose `page_id` index has been ensured.
    indexed: Mutex<HashSet<String>>,
}

impl MongoStorage {
    /// Connect to the database at `url` and open the search index in `search_dir`.
    pub fn connect(url: &str, search_dir: &Path) -> Result<Self, StorageError> {
        let client = Client::with_uri_str(connection_uri(url)).map_err(|e| driver_error(e, None))?;
        let database = client
            .default_database()
            .unwrap_or_else(|| client.database(DEFAULT_DATABASE));
        let search = SearchIndex::open(search_dir)
            .map_err(|e| StorageError::from(e).with_backend(BACKEND))?;

        tracing::info!(database = database.name(), "Connected to MongoDB");
        Ok(Self {
            database,
            search,
            indexed: Mutex::new(HashSet::new()),
        })
    }

    /// Open a collection, ensuring its unique `page_id` index on first use.
    fn collection(&self, name: &str) -> Result<Collection<Document>, StorageError> {
        let collection = self.database.collection::<Document>(name);
        let mut indexed = self.indexed.lock().unwrap_or_else(PoisonError::into_inner);
        if !indexed.contains(name) {
            let model = IndexModel::builder()
                .keys(doc! { "page_id": 1 })
                .options(IndexOptions::builder().unique(true).build())
                .build();
            collection
                .create_index(model, None)
                .map_err(|e| driver_error(e, None))?;
            indexed.insert(name.to_owned());
        }
        Ok(collection)
    }

    /// Collections a glob pattern can reach.
    fn collections_for_pattern(&self, pattern: &str) -> Result<Vec<String>, StorageError> {
        let normalized = id::normalize(pattern);
        let first = normalized
            .trim_start_matches('/')
            .split('/')
            .next()
            .unwrap_or_default();
        if first.contains(['*', '?', '[']) {
            self.database
                .list_collection_names(None)
                .map_err(|e| driver_error(e, None))
        } else {
            Ok(vec![collection_for(pattern)])
        }
    }

    /// All `page_id`s in a collection.
    fn page_ids(&self, collection: &Collection<Document>) -> Result<Vec<String>, StorageError> {
        let cursor = collection.find(None, None).map_err(|e| driver_error(e, None))?;
        let mut ids = Vec::new();
        for document in cursor {
            let document = document.map_err(|e| driver_error(e, None))?;
            if let Ok(page_id) = document.get_str("page_id") {
                ids.push(page_id.to_owned());
            }
        }
        Ok(ids)
    }

    fn remove_from_index(&self, id: &str) {
        if let Err(e) = self.search.remove(id) {
            tracing::warn!(id, error = %e, "Failed to remove search record");
        }
    }
}

impl Storage for MongoStorage {
    fn fetch(&self, id: &str) -> Result<Vec<u8>, StorageError> {
        let id = id::resolve_fetch(id);
        let collection = self.collection(&collection_for(&id))?;
        let document = collection
            .find_one(doc! { "page_id": id.as_str() }, None)
            .map_err(|e| driver_error(e, Some(&id)))?
            .ok_or_else(|| StorageError::not_found(&id).with_backend(BACKEND))?;
        let data = document.get_binary_generic("page_data").map_err(|e| {
            StorageError::new(StorageErrorKind::Other)
                .with_id(&id)
                .with_backend(BACKEND)
                .with_source(e)
        })?;
        Ok(decode_page(&id, data.clone()))
    }

    fn fetch_glob(&self, pattern: &str) -> Result<Vec<String>, StorageError> {
        let glob = id::compile_glob(pattern).map_err(|e| e.with_backend(BACKEND))?;
        let mut ids = Vec::new();
        for name in self.collections_for_pattern(pattern)? {
            let collection = self.collection(&name)?;
            ids.extend(
                self.page_ids(&collection)?
                    .into_iter()
                    .filter(|id| id::glob_matches(&glob, id)),
            );
        }
        ids.sort();
        Ok(ids)
    }

    fn insert(&self, id: &str, data: &[u8]) -> Result<(), StorageError> {
        let id = id::normalize(id);
        let route = collection_for(&id);
        let collection = self.collection(&route)?;
        let page_data = Bson::Binary(Binary {
            subtype: BinarySubtype::Generic,
            bytes: encode_page(&id, data),
        });
        collection
            .update_one(
                doc! { "page_id": id.as_str() },
                doc! { "$set": { "page_id": id.as_str(), "page_route": route.as_str(), "page_data": page_data } },
                UpdateOptions::builder().upsert(true).build(),
            )
            .map_err(|e| driver_error(e, Some(&id)))?;
        tracing::debug!(id = %id, collection = %route, bytes = data.len(), "Inserted record");
        Ok(())
    }

    fn delete(&self, id: &str) -> Result<(), StorageError> {
        let id = id::normalize(id);
        let collection = self.collection(&collection_for(&id))?;
        let result = collection
            .delete_one(doc! { "page_id": id.as_str() }, None)
            .map_err(|e| driver_error(e, Some(&id)))?;
        if result.deleted_count == 0 {
            return Err(StorageError::not_found(&id).with_backend(BACKEND));
        }
        self.search
            .remove(&id)
            .map_err(|e| StorageError::from(e).with_id(&id).with_backend(BACKEND))
    }

    fn delete_glob(&self, pattern: &str) -> Result<(), StorageError> {
        let glob = id::compile_glob(pattern).map_err(|e| e.with_backend(BACKEND))?;
        for name in self.collections_for_pattern(pattern)? {
            let collection = self.collection(&name)?;
            for id in self.page_ids(&collection)? {
                if !id::glob_covers(&glob, &id) {
                    continue;
                }
                match collection.delete_one(doc! { "page_id": id.as_str() }, None) {
                    Ok(_) => self.remove_from_index(&id),
                    Err(e) => tracing::warn!(id = %id, error = %e, "Failed to delete record"),
                }
            }

            match collection.count_documents(None, None) {
                Ok(0) => {
                    if let Err(e) = collection.drop(None) {
                        tracing::warn!(collection = %name, error = %e, "Failed to drop collection");
                    }
                    self.indexed
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .remove(&name);
                }
                Ok(_) => {}
                Err(e) => tracing::warn!(collection = %name, error = %e, "Failed to count records"),
            }
        }
        Ok(())
    }

    fn index(&self, id: &str, title: &str, data: &[u8]) -> Result<(), StorageError> {
        let id = id::normalize(id);
        self.search
            .upsert(&SearchRecord::from_html(&id, title, data))
            .map_err(|e| StorageError::from(e).with_id(&id).with_backend(BACKEND))
    }

    fn query(&self, text: &str) -> Result<QueryResult, StorageError> {
        self.search
            .query(text)
            .map_err(|e| StorageError::from(e).with_backend(BACKEND))
    }

    fn drop_all(&self) -> Result<(), StorageError> {
        self.database.drop(None).map_err(|e| driver_error(e, None))?;
        self.indexed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.search
            .clear()
            .map_err(|e| StorageError::from(e).with_backend(BACKEND))?;
        tracing::info!(database = self.database.name(), "Dropped database");
        Ok(())
    }
}
