//! Property tests for the dependency engine
//!
//! Random edge requests are checked against a brute-force model of the
//! graph; random DAGs are checked for layering and readiness laws.

use std::collections::{HashMap, HashSet};

use proptest::prelude::*;
use taskdag::domain::{Task, TaskId, TaskStatus};
use taskdag::engine::{DependencyEngine, ErrorKind};
use taskdag::storage::MemoryStore;
use taskdag::OwnerId;

fn owner() -> OwnerId {
    OwnerId::new("prop").unwrap()
}

fn id(n: usize) -> TaskId {
    format!("t-{:07x}", n + 1).parse().unwrap()
}

fn engine_with(count: usize) -> DependencyEngine<MemoryStore> {
    let store = MemoryStore::new();
    for n in 0..count {
        store
            .insert_task(Task::with_id(id(n), owner(), format!("task {}", n)))
            .unwrap();
    }
    DependencyEngine::new(store)
}

/// `to` reachable from `from` following "depends on" edges
fn reaches(edges: &HashSet<(usize, usize)>, from: usize, to: usize) -> bool {
    let mut stack = vec![from];
    let mut seen = HashSet::new();
    while let Some(current) = stack.pop() {
        if current == to {
            return true;
        }
        if !seen.insert(current) {
            continue;
        }
        stack.extend(
            edges
                .iter()
                .filter(|(task, _)| *task == current)
                .map(|(_, dep)| *dep),
        );
    }
    false
}

// Random DAG: task i may only depend on tasks 0..i
fn dag_strategy(max_tasks: usize) -> impl Strategy<Value = (usize, Vec<(usize, usize)>)> {
    (2..=max_tasks).prop_flat_map(|count| {
        let edges = proptest::collection::vec((1..count, any::<usize>()), 0..count * 2);
        edges.prop_map(move |raw| {
            let mut seen = HashSet::new();
            let edges = raw
                .into_iter()
                .map(|(task, dep)| (task, dep % task))
                .filter(|edge| seen.insert(*edge))
                .collect();
            (count, edges)
        })
    })
}

fn ready_set(engine: &DependencyEngine<MemoryStore>) -> HashSet<TaskId> {
    engine
        .ready_tasks(&owner())
        .unwrap()
        .into_iter()
        .map(|task| task.id)
        .collect()
}

proptest! {
    #[test]
    fn test_accepted_edges_never_form_a_cycle(
        count in 2usize..10,
        requests in proptest::collection::vec((0usize..10, 0usize..10), 1..40),
    ) {
        let engine = engine_with(count);
        let mut model: HashSet<(usize, usize)> = HashSet::new();

        for (task, dep) in requests {
            let (task, dep) = (task % count, dep % count);
            let expected = if task == dep {
                Some(ErrorKind::SelfLoop)
            } else if model.contains(&(task, dep)) {
                Some(ErrorKind::Duplicate)
            } else if reaches(&model, dep, task) {
                Some(ErrorKind::Cycle)
            } else {
                None
            };

            let result = engine.try_add_dependency(&owner(), &id(task), &id(dep));
            prop_assert_eq!(result.as_ref().err().map(|e| e.kind()), expected);
            if result.is_ok() {
                model.insert((task, dep));
            }
        }

        let view = engine.dependency_graph(&owner()).unwrap();
        prop_assert!(!view.cyclic);
        prop_assert_eq!(view.edges.len(), model.len());
        prop_assert!(view.nodes.iter().all(|node| node.level.is_some()));
    }

    #[test]
    fn test_layering_matches_longest_chain((count, edges) in dag_strategy(12)) {
        let engine = engine_with(count);
        for (task, dep) in &edges {
            engine.try_add_dependency(&owner(), &id(*task), &id(*dep)).unwrap();
        }

        // Deps always point at lower indices, so one pass in order suffices
        let mut expected: Vec<usize> = vec![0; count];
        for i in 0..count {
            expected[i] = edges
                .iter()
                .filter(|(task, _)| *task == i)
                .map(|(_, dep)| expected[*dep] + 1)
                .max()
                .unwrap_or(0);
        }

        let view = engine.dependency_graph(&owner()).unwrap();
        prop_assert!(!view.cyclic);
        let levels: HashMap<TaskId, Option<usize>> = view
            .nodes
            .iter()
            .map(|node| (node.id.clone(), node.level))
            .collect();
        for (i, level) in expected.iter().enumerate() {
            prop_assert_eq!(levels[&id(i)], Some(*level));
        }
        let placed: usize = view.levels.iter().map(Vec::len).sum();
        prop_assert_eq!(placed, count);
    }

    #[test]
    fn test_completion_never_blocks_ready_tasks(
        (count, edges) in dag_strategy(10),
        order in proptest::collection::vec(any::<usize>(), 1..10),
    ) {
        let engine = engine_with(count);
        for (task, dep) in &edges {
            engine.try_add_dependency(&owner(), &id(*task), &id(*dep)).unwrap();
        }

        let mut done = HashSet::new();
        for pick in order {
            let target = pick % count;
            if !done.insert(target) {
                continue;
            }

            let before = ready_set(&engine);
            engine
                .store()
                .set_status(&id(target), TaskStatus::Completed)
                .unwrap();
            let after = ready_set(&engine);

            for task in before.iter().filter(|task| **task != id(target)) {
                prop_assert!(after.contains(task), "{} left the ready set", task);
            }

            // Ready means pending with every prerequisite completed
            for i in (0..count).filter(|i| !done.contains(i)) {
                let waiting = edges
                    .iter()
                    .any(|(task, dep)| *task == i && !done.contains(dep));
                prop_assert_eq!(after.contains(&id(i)), !waiting);
            }
        }
    }
}
