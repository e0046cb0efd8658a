//! Basic usage examples for radixkv.
//!
//! Run with `RUST_LOG=debug` to see version publishes and node restructuring.

use radixkv::{Config, Error, Store, Tree};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    example_store();
    example_tree();
}

fn example_store() {
    println!("=== Store (Thread-Safe Wrapper) ===\n");

    let store = Store::with_config(Config::default().with_name("example").with_max_key_len(64));

    // Insert data
    store.insert(b"user:1001", 1001).unwrap();
    store.insert(b"user:1002", 1002).unwrap();
    store.insert(b"user:1003", 1003).unwrap();

    // Lookups
    println!("user:1001 = {:?}", store.get(b"user:1001"));
    println!("user:9999 = {:?}", store.get(b"user:9999"));
    println!("Contains user:1002: {}", store.contains(b"user:1002"));
    println!("Count: {}\n", store.len());

    // A snapshot keeps seeing the version it was taken from
    let snapshot = store.snapshot();
    store
        .update(|w| {
            w.remove(b"user:1001");
            w.insert(b"user:1004", 1004)?;
            Ok(())
        })
        .unwrap();
    println!("Snapshot count: {}, store count: {}", snapshot.len(), store.len());

    // A failing update leaves the store untouched
    let result = store.update(|w| {
        w.insert(b"user:1005", 1005)?;
        Err::<(), _>(Error::aborted("validation failed"))
    });
    println!("Aborted update: {:?}", result);
    println!("user:1005 = {:?}\n", store.get(b"user:1005"));
}

fn example_tree() {
    println!("=== Tree (Immutable Versions) ===\n");

    let mut txn = Tree::new().txn();
    txn.insert(b"http://example.com/page1", 1);
    txn.insert(b"http://example.com/page2", 2);
    txn.insert(b"http://other.com/page1", 3);
    txn.insert(b"http://example.com", 0);
    let tree = txn.commit();

    println!("example.com pages:");
    for (key, value) in tree.path_iter(b"http://example.com/") {
        println!("  {} = {}", String::from_utf8_lossy(&key), value);
    }

    let found = tree.longest_prefix(b"http://example.com/page3");
    println!(
        "Longest prefix of .../page3: {:?}",
        found.map(|(k, v)| (String::from_utf8_lossy(&k).into_owned(), *v))
    );

    let stats = tree.stats();
    println!(
        "Nodes: {} leaves, {} inner, max depth {}\n",
        stats.leaves,
        stats.inner(),
        stats.max_depth
    );
    print!("{}", tree.dump());
}
