use crate::listing::{Listing, SearchCriteria};
use crate::pipeline::StepResult;
use crate::storage::Storage;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

/// State shared by the steps of one pipeline invocation
pub struct PipelineContext {
    /// Single store handle used by every step of the run
    pub storage: Box<dyn Storage>,
    pub criteria: SearchCriteria,
    /// Listings produced by the most recent step that materializes them
    pub listings: Vec<Listing>,
    /// Free-form run metadata (mode, overrides, step summaries)
    pub metadata: BTreeMap<String, Value>,
    /// Results of the steps that have run, keyed by step name
    pub step_results: HashMap<String, StepResult>,
}

impl PipelineContext {
    /// Creates a context with empty listings, metadata and results
    ///
    /// # Arguments
    ///
    /// * `storage` - The store every step of the run reads and writes
    /// * `criteria` - Search input for discovery steps
    pub fn new(storage: Box<dyn Storage>, criteria: SearchCriteria) -> Self {
        Self {
            storage,
            criteria,
            listings: Vec::new(),
            metadata: BTreeMap::new(),
            step_results: HashMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn result(&self, step_name: &str) -> Option<&StepResult> {
        self.step_results.get(step_name)
    }

    /// Numeric metadata value; `None` when absent or not an unsigned integer
    pub fn metadata_u64(&self, key: &str) -> Option<u64> {
        self.metadata.get(key).and_then(Value::as_u64)
    }
}
