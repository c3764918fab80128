//! Basic MIPS
//!
//! Build a ball tree over items once, then answer top-k inner product
//! queries for a batch of users and for a standalone query.
//!
//! ```bash
//! cargo run --example basic_mips --release
//! ```

use ipball::benchmark::create_clustered_dataset;
use ipball::{compute_top_k_with, BallTreeMips, MipsIndex, MipsParams};

fn main() -> ipball::Result<()> {
    // 1000 items, 5 users, 32 dimensions, 10 clusters
    let ds = create_clustered_dataset(5, 1000, 32, 10, 0.1, 42)?;
    let params = MipsParams::default().with_seed(7);

    // Batch: every user row against all items
    let results = compute_top_k_with(5, &ds.users, &ds.items, &params)?;
    for (user, list) in results.iter() {
        match list {
            Ok(list) => {
                let formatted: Vec<String> = list
                    .iter()
                    .map(|n| format!("{}:{:.3}", n.id, n.score))
                    .collect();
                println!("user {user}: {}", formatted.join("  "));
            }
            Err(e) => println!("user {user}: {e}"),
        }
    }
    println!(
        "scored {} of {} pairs",
        results.search_stats.points_scored,
        ds.users.num_rows() * ds.items.num_rows()
    );

    // Standalone: build once, query any vector
    let index = BallTreeMips::new(&ds.items, &params)?;
    let query = vec![0.5; 32];
    let top = index.search(&query, 3)?;
    println!("\nstandalone query: {top:?}");
    println!("tree: {:?}", index.stats().tree);

    Ok(())
}
