//! Process instance variables

use std::collections::HashMap;

use serde_json::Value;

use super::keys::Key;

/// A variable document
pub type Variables = serde_json::Map<String, Value>;

/// One variable document per process instance
#[derive(Debug, Clone, Default)]
pub struct VariableState {
    documents: HashMap<Key, Variables>,
}

impl VariableState {
    pub fn document(&self, process_instance_key: Key) -> Option<&Variables> {
        self.documents.get(&process_instance_key)
    }

    pub fn get(&self, process_instance_key: Key, name: &str) -> Option<&Value> {
        self.document(process_instance_key)?.get(name)
    }

    /// Merge variables into the document, overwriting existing names
    pub fn merge(&mut self, process_instance_key: Key, variables: &Variables) {
        if variables.is_empty() {
            return;
        }
        let document = self.documents.entry(process_instance_key).or_default();
        for (name, value) in variables {
            document.insert(name.clone(), value.clone());
        }
    }

    pub fn remove(&mut self, process_instance_key: Key) -> Option<Variables> {
        self.documents.remove(&process_instance_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_merge_overwrites() {
        let mut state = VariableState::default();
        let mut first = Variables::new();
        first.insert("amount".into(), json!(10));
        first.insert("currency".into(), json!("EUR"));
        state.merge(1, &first);

        let mut second = Variables::new();
        second.insert("amount".into(), json!(20));
        state.merge(1, &second);

        assert_eq!(state.get(1, "amount"), Some(&json!(20)));
        assert_eq!(state.get(1, "currency"), Some(&json!("EUR")));
        assert!(state.get(2, "amount").is_none());
    }

    #[test]
    fn test_empty_merge_creates_no_document() {
        let mut state = VariableState::default();
        state.merge(1, &Variables::new());

        assert!(state.document(1).is_none());
    }
}
