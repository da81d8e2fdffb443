//! Plan generation: diff a freshly built graph against the last lock.

use super::error::Result;
use super::graph::ResourceGraph;
use super::resource::RemovalPolicy;
use super::types::*;

/// Generate a change set by comparing a graph to lock state.
///
/// Creates and updates follow the graph's creation order. Resources only
/// present in the lock are destroyed last, in reverse creation order.
pub fn plan(graph: &ResourceGraph, lock: Option<&PlanLock>) -> Result<ChangeSet> {
    let mut changes = Vec::new();
    let mut to_create = 0u32;
    let mut to_update = 0u32;
    let mut to_destroy = 0u32;
    let mut unchanged = 0u32;

    for resource_id in graph.execution_order() {
        let (Some(node), Some(hash)) = (graph.get(resource_id), graph.node_hash(resource_id)?)
        else {
            continue;
        };
        let previous = lock.and_then(|l| l.resources.get(resource_id));
        let action = determine_action(&hash, previous);
        let description = describe_action(resource_id, node.removal_policy, &action);

        match action {
            PlanAction::Create => to_create += 1,
            PlanAction::Update => to_update += 1,
            PlanAction::Destroy => to_destroy += 1,
            PlanAction::NoOp => unchanged += 1,
        }

        changes.push(PlannedChange {
            resource_id: resource_id.clone(),
            resource_type: node.resource.type_name().to_string(),
            action,
            description,
        });
    }

    if let Some(lock) = lock {
        for (resource_id, rl) in lock.resources.iter().rev() {
            if graph.contains(resource_id) {
                continue;
            }
            to_destroy += 1;
            changes.push(PlannedChange {
                resource_id: resource_id.clone(),
                resource_type: rl.resource_type.clone(),
                action: PlanAction::Destroy,
                description: describe_action(resource_id, rl.removal_policy, &PlanAction::Destroy),
            });
        }
    }

    Ok(ChangeSet {
        name: graph.name().to_string(),
        changes,
        execution_order: graph.execution_order().to_vec(),
        to_create,
        to_update,
        to_destroy,
        unchanged,
    })
}

fn determine_action(desired_hash: &str, previous: Option<&ResourceLock>) -> PlanAction {
    match previous {
        None => PlanAction::Create,
        Some(rl) if rl.hash == desired_hash => PlanAction::NoOp,
        Some(_) => PlanAction::Update,
    }
}

/// Generate a human-readable description of a planned action.
fn describe_action(resource_id: &str, policy: RemovalPolicy, action: &PlanAction) -> String {
    match action {
        PlanAction::Create => format!("{}: create", resource_id),
        PlanAction::Update => format!("{}: update (properties changed)", resource_id),
        PlanAction::Destroy => match policy {
            RemovalPolicy::Destroy => format!("{}: destroy", resource_id),
            RemovalPolicy::Snapshot => format!("{}: snapshot then delete", resource_id),
            RemovalPolicy::Retain => format!("{}: orphan (retained)", resource_id),
        },
        PlanAction::NoOp => format!("{}: no changes", resource_id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::graph::GraphBuilder;
    use crate::core::resource::{LogGroup, Resource, Secret};
    use crate::core::state;

    fn log_group(days: u32) -> Resource {
        Resource::LogGroup(LogGroup {
            retention_days: days,
        })
    }

    fn secret() -> Resource {
        Resource::Secret(Secret {
            name: Some("env".to_string()),
            description: "env".to_string(),
            generate: None,
        })
    }

    fn graph(days: u32) -> ResourceGraph {
        let mut b = GraphBuilder::new("Test");
        b.add("Logs", log_group(days)).unwrap();
        b.add("Env", secret()).unwrap();
        b.seal().unwrap()
    }

    #[test]
    fn test_plan_all_create() {
        let cs = plan(&graph(30), None).unwrap();
        assert_eq!(cs.to_create, 2);
        assert_eq!(cs.unchanged, 0);
        assert!(cs.changes.iter().all(|c| c.action == PlanAction::Create));
        assert!(!cs.is_empty());
    }

    #[test]
    fn test_plan_all_unchanged() {
        let g = graph(30);
        let lock = state::new_lock(&g).unwrap();
        let cs = plan(&g, Some(&lock)).unwrap();
        assert_eq!(cs.unchanged, 2);
        assert!(cs.is_empty());
    }

    #[test]
    fn test_plan_update_on_hash_mismatch() {
        let lock = state::new_lock(&graph(30)).unwrap();
        let cs = plan(&graph(90), Some(&lock)).unwrap();
        assert_eq!(cs.to_update, 1);
        assert_eq!(cs.unchanged, 1);
        let update = cs.changes.iter().find(|c| c.action == PlanAction::Update).unwrap();
        assert_eq!(update.resource_id, "Logs");
    }

    #[test]
    fn test_plan_destroy_respects_removal_policy() {
        let mut b = GraphBuilder::new("Test");
        b.add("Logs", log_group(30)).unwrap();
        b.add("Env", secret()).unwrap();
        b.add_with_policy("Db", secret(), RemovalPolicy::Snapshot).unwrap();
        b.add_with_policy("Kept", secret(), RemovalPolicy::Retain).unwrap();
        let old = b.seal().unwrap();
        let lock = state::new_lock(&old).unwrap();

        let cs = plan(&graph(30), Some(&lock)).unwrap();
        assert_eq!(cs.to_destroy, 2);
        let destroyed: Vec<&PlannedChange> = cs
            .changes
            .iter()
            .filter(|c| c.action == PlanAction::Destroy)
            .collect();
        assert!(destroyed
            .iter()
            .any(|c| c.description == "Db: snapshot then delete"));
        assert!(destroyed
            .iter()
            .any(|c| c.description == "Kept: orphan (retained)"));
        // Destroys come after every create/update/no-op.
        assert!(cs.changes[..2].iter().all(|c| c.action != PlanAction::Destroy));
    }

    #[test]
    fn test_plan_follows_execution_order() {
        let g = graph(30);
        let cs = plan(&g, None).unwrap();
        let ids: Vec<&str> = cs.changes.iter().map(|c| c.resource_id.as_str()).collect();
        let order: Vec<&str> = g.execution_order().iter().map(String::as_str).collect();
        assert_eq!(ids, order);
        assert_eq!(cs.execution_order.len(), 2);
    }

    #[test]
    fn test_describe_action() {
        assert_eq!(
            describe_action("X", RemovalPolicy::Destroy, &PlanAction::Destroy),
            "X: destroy"
        );
        assert_eq!(
            describe_action("X", RemovalPolicy::Snapshot, &PlanAction::Create),
            "X: create"
        );
    }
}
