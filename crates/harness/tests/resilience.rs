use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use storyflow_core::{ChainMap, NodeId};
use storyflow_engine::{Advance, BackOutcome, EngineError, Phase, RestoreOutcome};
use storyflow_harness::{FlakyStore, TestTree, TestViewer, init_tracing};

fn id(s: &str) -> NodeId {
    NodeId::from(s)
}

fn chain(pairs: &[(&str, &str)]) -> ChainMap {
    pairs.iter().map(|(p, c)| (id(p), id(c))).collect()
}

/// Full tree below `name`, three children per node, first child the default.
fn grow(tree: &TestTree, name: &str, depth: usize) {
    if depth == 0 {
        return;
    }
    let children: Vec<String> = (0..3).map(|i| format!("{name}{i}")).collect();
    let refs: Vec<&str> = children.iter().map(String::as_str).collect();
    tree.offer(name, Some(refs[0]), &refs);
    for child in &children {
        grow(tree, child, depth - 1);
    }
}

// ============================================================================
// Content service failures
// ============================================================================

#[tokio::test]
async fn failed_queries_leave_state_untouched() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let tree = TestTree::new();
    tree.offer("R", Some("R1"), &["R1", "X1", "X2"])
        .offer("R1", Some("Y"), &["Y"])
        .offer("X2", None, &["Z"]);
    let tree = Arc::new(tree);
    let mut viewer = TestViewer::new(Arc::clone(&tree));
    viewer.nav.enter_root(id("R")).await?;
    let variants = viewer.nav.variants().clone();

    tree.fail_next(1);
    let err = viewer.nav.continue_forward().await.unwrap_err();
    assert!(matches!(err, EngineError::Content(_)));
    assert_eq!(viewer.current_id(), Some("R"));
    assert_eq!(viewer.nav.depth(), 0);
    assert_eq!(viewer.nav.variants(), &variants);
    assert!(viewer.chain("R")?.is_empty());

    // The next node's own continuations fail after the step was resolved.
    tree.fail_on("R1");
    assert!(viewer.nav.continue_forward().await.is_err());
    assert_eq!(viewer.current_id(), Some("R"));
    assert!(viewer.chain("R")?.is_empty());

    tree.heal();
    viewer.nav.continue_forward().await?;
    assert_eq!(viewer.current_id(), Some("R1"));
    assert_eq!(viewer.chain("R")?, chain(&[("R", "R1")]));

    viewer.nav.open_variants()?;
    tree.fail_on("X2");
    assert!(viewer.nav.choose_branch(2).await.is_err());
    assert_eq!(viewer.nav.phase(), Phase::ChoosingBranch);
    assert_eq!(viewer.current_id(), Some("R1"));
    assert_eq!(viewer.chain("R")?, chain(&[("R", "R1")]));

    tree.heal();
    viewer.nav.choose_branch(2).await?;
    assert_eq!(viewer.current_id(), Some("X2"));
    assert_eq!(viewer.chain("R")?, chain(&[("R", "X2")]));
    Ok(())
}

// ============================================================================
// Storage failures
// ============================================================================

#[tokio::test]
async fn navigation_continues_without_storage() -> Result<(), Box<dyn std::error::Error>> {
    let tree = TestTree::new();
    tree.offer("R", Some("R1"), &["R1", "X1", "X2"]);
    let mut viewer = TestViewer::with_store(Arc::new(tree), Arc::new(FlakyStore::new()));
    viewer.kv.set_broken(true);

    viewer.nav.enter_root(id("R")).await?;
    viewer.nav.continue_forward().await?;
    viewer.nav.open_variants()?;
    viewer.nav.choose_branch(2).await?;
    assert_eq!(viewer.current_id(), Some("X2"));
    assert_eq!(viewer.nav.depth(), 2);

    viewer.kv.set_broken(false);
    assert!(viewer.chain("R")?.is_empty());

    // Replaying the session choice writes it once the store is back.
    viewer.nav.go_back();
    viewer.nav.go_back();
    viewer.nav.continue_forward().await?;
    assert_eq!(viewer.current_id(), Some("X2"));
    assert_eq!(viewer.chain("R")?, chain(&[("R", "X2")]));
    Ok(())
}

#[tokio::test]
async fn steps_after_a_lost_write_record_the_whole_path() -> Result<(), Box<dyn std::error::Error>> {
    let tree = TestTree::new();
    tree.offer("A", Some("B"), &["B"]).offer("B", Some("C"), &["C"]);
    let mut viewer = TestViewer::with_store(Arc::new(tree), Arc::new(FlakyStore::new()));

    viewer.nav.enter_root(id("A")).await?;
    viewer.kv.set_broken(true);
    viewer.nav.continue_forward().await?;
    viewer.kv.set_broken(false);
    viewer.nav.continue_forward().await?;
    assert_eq!(viewer.current_id(), Some("C"));

    let stored = viewer.chain("A")?;
    assert!(stored.orphaned_keys(&id("A")).is_empty());
    assert_eq!(stored, chain(&[("A", "B"), ("B", "C")]));
    Ok(())
}

#[tokio::test]
async fn unreadable_store_still_enters() -> Result<(), Box<dyn std::error::Error>> {
    let tree = TestTree::new();
    tree.offer("A", Some("B"), &["B"]);
    let mut viewer = TestViewer::with_store(Arc::new(tree), Arc::new(FlakyStore::new()));
    viewer.kv.set_broken(true);

    let outcome = viewer.nav.enter_root_from_feed(id("A")).await?;
    assert_eq!(
        outcome,
        RestoreOutcome::Applied {
            current: id("A"),
            depth: 0
        }
    );
    Ok(())
}

// ============================================================================
// Chain validity under random navigation
// ============================================================================

#[tokio::test]
async fn random_sessions_keep_chain_a_simple_path() -> Result<(), Box<dyn std::error::Error>> {
    let tree = TestTree::new();
    grow(&tree, "n", 3);
    let tree = Arc::new(tree);
    let root = id("n");

    for seed in 0..8u64 {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut viewer = TestViewer::new(Arc::clone(&tree));
        viewer.nav.enter_root(root.clone()).await?;

        for _ in 0..150 {
            let has_children = viewer.nav.current().is_some_and(|n| n.has_children);
            match rng.gen_range(0..6) {
                0 | 1 if has_children => {
                    let step = viewer.nav.continue_forward().await?;
                    assert!(matches!(step, Advance::Moved { .. }));
                    let path = viewer.chain("n")?.path_from(&root);
                    assert!(path.starts_with(viewer.nav.path()), "seed {seed}: {path:?}");
                }
                2 | 3 if !viewer.nav.variants().is_empty() => {
                    let offered = viewer.nav.open_variants()?.len();
                    viewer.nav.choose_branch(rng.gen_range(0..offered)).await?;
                    let path = viewer.chain("n")?.path_from(&root);
                    assert!(path.starts_with(viewer.nav.path()), "seed {seed}: {path:?}");
                }
                4 => {
                    if viewer.nav.go_back() == BackOutcome::ExitTree {
                        viewer.nav.enter_root(root.clone()).await?;
                    }
                }
                5 => {
                    viewer.nav.leave_root();
                    viewer.nav.enter_root(root.clone()).await?;
                    let path = viewer.chain("n")?.path_from(&root);
                    assert_eq!(viewer.nav.current().map(|n| &n.id), path.last());
                    assert_eq!(viewer.nav.depth(), path.len() - 1);
                }
                _ => {}
            }

            assert_eq!(viewer.nav.phase(), Phase::Viewing);
            let stored = viewer.chain("n")?;
            assert!(
                stored.orphaned_keys(&root).is_empty(),
                "seed {seed}: orphaned keys in {stored:?}"
            );
        }
    }
    Ok(())
}
