// logcore - template_store.rs
//
// Template <-> logs <-> embedding store, grounded on the source's
// `ProfileStore`/`TemplateStore` pairing of an `RwLock`-guarded catalog
// with a pluggable external provider. Readers proceed in parallel;
// writers (`add`) take the write lock; `search` snapshots both maps in
// one read-lock acquisition to avoid observing a template whose
// embedding has not yet landed alongside an inconsistent embedding.

use crate::error::{LoaderError, StoreError};
use crate::parsers::LogRecord;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use std::sync::RwLock;

/// External embedding collaborator. The store neither retries nor caches
/// failures, but does cache successes.
pub trait EmbeddingProvider: Send + Sync {
    fn embed(&self, text: &str) -> Option<Vec<f32>>;
}

#[derive(Default)]
struct Catalog {
    templates: HashMap<u64, String>,
    logs: HashMap<u64, Vec<LogRecord>>,
    embeddings: HashMap<u64, Vec<f32>>,
}

pub struct TemplateStore {
    catalog: RwLock<Catalog>,
    provider: Option<Box<dyn EmbeddingProvider>>,
}

impl TemplateStore {
    pub fn new(provider: Option<Box<dyn EmbeddingProvider>>) -> Self {
        Self {
            catalog: RwLock::new(Catalog::default()),
            provider,
        }
    }

    /// Appends `record` to the template's log list, sets its template
    /// text, and computes+caches an embedding when a provider is
    /// configured and has not already supplied one.
    pub fn add(&self, template_id: u64, template_str: &str, record: LogRecord) {
        let mut catalog = self.catalog.write().unwrap();
        catalog
            .templates
            .insert(template_id, template_str.to_string());
        catalog.logs.entry(template_id).or_default().push(record);

        if !catalog.embeddings.contains_key(&template_id) {
            if let Some(provider) = &self.provider {
                if let Some(embedding) = provider.embed(template_str) {
                    catalog.embeddings.insert(template_id, embedding);
                }
            }
        }
    }

    pub fn get_template(&self, template_id: u64) -> Option<String> {
        self.catalog.read().unwrap().templates.get(&template_id).cloned()
    }

    pub fn get_logs(&self, template_id: u64) -> Vec<LogRecord> {
        self.catalog
            .read()
            .unwrap()
            .logs
            .get(&template_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn size(&self) -> usize {
        self.catalog.read().unwrap().templates.len()
    }

    /// Computes a query embedding and returns the `top_k` `(id,
    /// similarity)` pairs in descending similarity, tie-broken by smaller
    /// id. Returns an empty vector if no provider is configured or the
    /// query could not be embedded.
    pub fn search(&self, query: &str, top_k: usize) -> Vec<(u64, f32)> {
        let Some(provider) = &self.provider else {
            return Vec::new();
        };
        let Some(query_embedding) = provider.embed(query) else {
            return Vec::new();
        };

        // Snapshot once so scoring never tears against a concurrent `add`.
        let catalog = self.catalog.read().unwrap();
        let mut scored: Vec<(u64, f32)> = catalog
            .embeddings
            .iter()
            .map(|(&id, embedding)| (id, cosine_similarity(&query_embedding, embedding)))
            .collect();
        drop(catalog);

        scored.sort_by(|(id_a, sim_a), (id_b, sim_b)| {
            sim_b
                .partial_cmp(sim_a)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(id_a.cmp(id_b))
        });
        scored.truncate(top_k);
        scored
    }

    /// Persists templates and embeddings (not logs) as JSON:
    /// `{"templates": {...}, "embeddings": {...}}`.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), LoaderError> {
        let path = path.as_ref();
        let catalog = self.catalog.read().unwrap();
        let document = PersistedStore {
            templates: catalog
                .templates
                .iter()
                .map(|(id, text)| (id.to_string(), text.clone()))
                .collect(),
            embeddings: catalog
                .embeddings
                .iter()
                .map(|(id, vector)| (id.to_string(), vector.clone()))
                .collect(),
        };
        drop(catalog);

        let file = File::create(path).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::to_writer_pretty(BufWriter::new(file), &document).map_err(|source| {
            StoreError::Json {
                path: path.to_path_buf(),
                source,
            }
        })?;
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>, provider: Option<Box<dyn EmbeddingProvider>>) -> Result<Self, LoaderError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let document: PersistedStore =
            serde_json::from_reader(BufReader::new(file)).map_err(|source| StoreError::Json {
                path: path.to_path_buf(),
                source,
            })?;

        let mut catalog = Catalog::default();
        for (id_str, text) in document.templates {
            if let Ok(id) = id_str.parse::<u64>() {
                catalog.templates.insert(id, text);
            }
        }
        for (id_str, vector) in document.embeddings {
            if let Ok(id) = id_str.parse::<u64>() {
                catalog.embeddings.insert(id, vector);
            }
        }

        Ok(Self {
            catalog: RwLock::new(catalog),
            provider,
        })
    }
}

#[derive(serde::Serialize, serde::Deserialize)]
struct PersistedStore {
    templates: HashMap<String, String>,
    embeddings: HashMap<String, Vec<f32>>,
}

/// Cosine similarity; zero-norm vectors (or mismatched lengths) yield 0.0
/// rather than dividing by zero.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubProvider;
    impl EmbeddingProvider for StubProvider {
        fn embed(&self, text: &str) -> Option<Vec<f32>> {
            // Deterministic stand-in: embed as a histogram of the first
            // three bytes, so similar strings score similarly.
            let mut vector = vec![0.0f32; 3];
            for (i, byte) in text.bytes().take(3).enumerate() {
                vector[i] = byte as f32;
            }
            Some(vector)
        }
    }

    fn sample_record() -> LogRecord {
        LogRecord {
            body: "disk full".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn add_then_get_template_and_logs() {
        let store = TemplateStore::new(None);
        store.add(1, "disk <*> full", sample_record());
        assert_eq!(store.get_template(1).as_deref(), Some("disk <*> full"));
        assert_eq!(store.get_logs(1).len(), 1);
        assert_eq!(store.size(), 1);
    }

    #[test]
    fn search_without_provider_returns_empty() {
        let store = TemplateStore::new(None);
        store.add(1, "disk <*> full", sample_record());
        assert!(store.search("disk full", 5).is_empty());
    }

    #[test]
    fn search_orders_by_similarity_tie_break_by_id() {
        let store = TemplateStore::new(Some(Box::new(StubProvider)));
        store.add(1, "aaa", sample_record());
        store.add(2, "aaa", sample_record());
        store.add(3, "zzz", sample_record());
        let results = store.search("aaa", 2);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0, 1);
        assert_eq!(results[1].0, 2);
    }

    #[test]
    fn cosine_similarity_of_zero_vector_is_zero() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }

    #[test]
    fn save_and_load_round_trip_templates_and_embeddings() {
        let store = TemplateStore::new(Some(Box::new(StubProvider)));
        store.add(1, "disk <*> full", sample_record());
        let file = tempfile::NamedTempFile::new().unwrap();
        store.save(file.path()).unwrap();

        let loaded = TemplateStore::load(file.path(), None).unwrap();
        assert_eq!(loaded.get_template(1).as_deref(), Some("disk <*> full"));
        assert!(loaded.get_logs(1).is_empty(), "logs are not persisted");
    }
}
