//! Shared topological-sort helper. Used by the planner to order a candidate
//! action list and by the orchestrator to confirm a plan is still a valid
//! order before executing it.

use std::collections::{HashMap, HashSet};

use crate::error::{CoreError, CoreResult};

/// Topologically sort `ids`, each with zero or more `deps` (predecessor ids).
/// A missing predecessor or a cycle is a validation error. Ties (nodes with
/// no relative ordering constraint) are broken by input order, so the result
/// is deterministic.
pub fn topo_sort(ids: &[String], deps: &HashMap<String, Vec<String>>) -> CoreResult<Vec<String>> {
    let id_set: HashSet<&str> = ids.iter().map(String::as_str).collect();
    for (id, preds) in deps {
        for pred in preds {
            if !id_set.contains(pred.as_str()) {
                return Err(CoreError::validation(format!(
                    "action '{id}' depends on unknown action '{pred}'"
                )));
            }
        }
    }

    let mut in_progress: HashSet<&str> = HashSet::new();
    let mut done: HashSet<&str> = HashSet::new();
    let mut order: Vec<String> = Vec::with_capacity(ids.len());
    let no_deps: Vec<String> = Vec::new();

    fn visit<'a>(
        id: &'a str,
        deps: &'a HashMap<String, Vec<String>>,
        no_deps: &'a [String],
        in_progress: &mut HashSet<&'a str>,
        done: &mut HashSet<&'a str>,
        order: &mut Vec<String>,
    ) -> CoreResult<()> {
        if done.contains(id) {
            return Ok(());
        }
        if in_progress.contains(id) {
            return Err(CoreError::validation(format!(
                "dependency cycle detected at action '{id}'"
            )));
        }
        in_progress.insert(id);
        for pred in deps.get(id).map(Vec::as_slice).unwrap_or(no_deps) {
            visit(pred.as_str(), deps, no_deps, in_progress, done, order)?;
        }
        in_progress.remove(id);
        done.insert(id);
        order.push(id.to_string());
        Ok(())
    }

    for id in ids {
        visit(id, deps, &no_deps, &mut in_progress, &mut done, &mut order)?;
    }

    Ok(order)
}

/// Verify that `order` is a valid topological order for `deps`: every
/// predecessor of an id appears before it.
pub fn is_valid_topological_order(order: &[String], deps: &HashMap<String, Vec<String>>) -> bool {
    let mut seen: HashSet<&str> = HashSet::new();
    for id in order {
        if let Some(preds) = deps.get(id) {
            if preds.iter().any(|p| !seen.contains(p.as_str())) {
                return false;
            }
        }
        seen.insert(id.as_str());
    }
    true
}
