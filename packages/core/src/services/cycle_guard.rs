//! Cycle Guard
//!
//! Decides whether a proposed generalization edge would make a node its own
//! ancestor. The check is a breadth-first walk up the generalization edges of
//! the proposed ancestor, looking for the proposed descendant.
//!
//! The walk carries a visited set, so it terminates even if stored data already
//! contains a cycle, and it is bounded by `max_traversal_nodes`.

use std::collections::{HashMap, HashSet, VecDeque};

use async_trait::async_trait;

use super::error::RelationshipError;

/// Read access to generalization adjacency
///
/// Implemented by the transactional working set (reads go through the open
/// transaction) and by plain adjacency maps.
#[async_trait]
pub trait AncestryReader: Send {
    /// Ids of the direct generalizations of `id`, or `None` if the node does not exist
    async fn generalizations_of(&mut self, id: &str)
        -> Result<Option<Vec<String>>, RelationshipError>;
}

#[async_trait]
impl AncestryReader for HashMap<String, Vec<String>> {
    async fn generalizations_of(
        &mut self,
        id: &str,
    ) -> Result<Option<Vec<String>>, RelationshipError> {
        Ok(self.get(id).cloned())
    }
}

/// Returns true if making `candidate_ancestor` a generalization of
/// `candidate_descendant` would create a cycle.
///
/// That is the case when the two are the same node, or when
/// `candidate_descendant` is already reachable from `candidate_ancestor` by
/// following generalization edges.
///
/// # Errors
///
/// `RelationshipError::InvalidInput` if more than `max_traversal_nodes` nodes
/// would have to be visited.
pub async fn would_create_cycle<R>(
    reader: &mut R,
    candidate_ancestor: &str,
    candidate_descendant: &str,
    max_traversal_nodes: usize,
) -> Result<bool, RelationshipError>
where
    R: AncestryReader + ?Sized,
{
    if candidate_ancestor == candidate_descendant {
        return Ok(true);
    }

    let mut visited: HashSet<String> = HashSet::new();
    let mut queue: VecDeque<String> = VecDeque::new();
    visited.insert(candidate_ancestor.to_string());
    queue.push_back(candidate_ancestor.to_string());

    while let Some(current) = queue.pop_front() {
        if visited.len() > max_traversal_nodes {
            return Err(RelationshipError::invalid_input(format!(
                "Hierarchy traversal exceeded {} nodes",
                max_traversal_nodes
            )));
        }

        let Some(parents) = reader.generalizations_of(&current).await? else {
            continue;
        };

        for parent in parents {
            if parent == candidate_descendant {
                tracing::debug!(
                    ancestor = candidate_ancestor,
                    descendant = candidate_descendant,
                    "Cycle detected"
                );
                return Ok(true);
            }
            if visited.insert(parent.clone()) {
                queue.push_back(parent);
            }
        }
    }

    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// child -> parent -> grandparent
    fn chain() -> HashMap<String, Vec<String>> {
        HashMap::from([
            ("child".to_string(), vec!["parent".to_string()]),
            ("parent".to_string(), vec!["grandparent".to_string()]),
            ("grandparent".to_string(), vec![]),
        ])
    }

    #[tokio::test]
    async fn test_self_edge_is_a_cycle() {
        let mut graph = chain();
        assert!(would_create_cycle(&mut graph, "child", "child", 100)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_descendant_as_ancestor_is_a_cycle() {
        let mut graph = chain();
        // grandparent gaining child as a generalization closes the loop
        assert!(would_create_cycle(&mut graph, "child", "grandparent", 100)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_unrelated_or_existing_direction_is_fine() {
        let mut graph = chain();
        graph.insert("other".to_string(), vec![]);
        assert!(!would_create_cycle(&mut graph, "other", "child", 100)
            .await
            .unwrap());
        // Adding a redundant shortcut child -> grandparent keeps the DAG acyclic
        assert!(!would_create_cycle(&mut graph, "grandparent", "child", 100)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_existing_cycle_in_data_terminates() {
        let mut graph = HashMap::from([
            ("a".to_string(), vec!["b".to_string()]),
            ("b".to_string(), vec!["a".to_string()]),
        ]);
        assert!(!would_create_cycle(&mut graph, "a", "z", 100).await.unwrap());
    }

    #[test]
    fn test_missing_nodes_are_skipped() {
        let mut graph = HashMap::from([("a".to_string(), vec!["ghost".to_string()])]);
        let found = tokio_test::block_on(would_create_cycle(&mut graph, "a", "z", 100));
        assert!(!found.unwrap());
    }

    #[tokio::test]
    async fn test_traversal_bound_is_enforced() {
        let mut graph: HashMap<String, Vec<String>> = (0..20)
            .map(|i| (format!("n{}", i), vec![format!("n{}", i + 1)]))
            .collect();
        let err = would_create_cycle(&mut graph, "n0", "z", 5)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Hierarchy traversal exceeded 5 nodes"));
    }
}
