//! Tokens waiting at parallel joins

use std::collections::BTreeMap;

use super::keys::Key;

/// Flows that arrived at a joining parallel gateway, per flow scope
#[derive(Debug, Clone, Default)]
pub struct JoinState {
    tokens: BTreeMap<(Key, String), BTreeMap<String, usize>>,
}

impl JoinState {
    /// Record that `flow_id` reached the gateway
    ///
    /// Returns true when every incoming flow has at least one token; one token
    /// per incoming flow is consumed in that case.
    pub fn arrive(
        &mut self,
        scope_key: Key,
        gateway_id: &str,
        flow_id: &str,
        incoming: &[String],
    ) -> bool {
        let entry_key = (scope_key, gateway_id.to_string());
        let arrived = self.tokens.entry(entry_key.clone()).or_default();
        *arrived.entry(flow_id.to_string()).or_insert(0) += 1;

        let complete = incoming
            .iter()
            .all(|flow| arrived.get(flow).copied().unwrap_or(0) > 0);
        if !complete {
            return false;
        }

        for flow in incoming {
            if let Some(count) = arrived.get_mut(flow) {
                *count -= 1;
            }
        }
        arrived.retain(|_, count| *count > 0);
        if arrived.is_empty() {
            self.tokens.remove(&entry_key);
        }
        true
    }

    /// Tokens waiting in a scope, over all gateways
    pub fn waiting_in(&self, scope_key: Key) -> usize {
        self.tokens
            .iter()
            .filter(|((scope, _), _)| *scope == scope_key)
            .flat_map(|(_, arrived)| arrived.values())
            .sum()
    }

    /// Drop all tokens of a scope
    pub fn clear_scope(&mut self, scope_key: Key) {
        self.tokens.retain(|(scope, _), _| *scope != scope_key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn incoming() -> Vec<String> {
        vec!["a".to_string(), "b".to_string()]
    }

    #[test]
    fn test_join_waits_for_all_flows() {
        let mut joins = JoinState::default();

        assert!(!joins.arrive(1, "join", "a", &incoming()));
        assert_eq!(joins.waiting_in(1), 1);
        assert!(joins.arrive(1, "join", "b", &incoming()));
        assert_eq!(joins.waiting_in(1), 0);
    }

    #[test]
    fn test_extra_tokens_are_kept() {
        let mut joins = JoinState::default();

        assert!(!joins.arrive(1, "join", "a", &incoming()));
        assert!(!joins.arrive(1, "join", "a", &incoming()));
        assert!(joins.arrive(1, "join", "b", &incoming()));
        assert_eq!(joins.waiting_in(1), 1);
    }

    #[test]
    fn test_scopes_are_separate() {
        let mut joins = JoinState::default();

        assert!(!joins.arrive(1, "join", "a", &incoming()));
        assert!(!joins.arrive(2, "join", "b", &incoming()));

        joins.clear_scope(1);
        assert_eq!(joins.waiting_in(1), 0);
        assert_eq!(joins.waiting_in(2), 1);
    }
}
