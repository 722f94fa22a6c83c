/// Example: a fruit list backed by the in-memory store
///
/// Walks through the account checks, the typed CRUD client and the list
/// view-model against a store that lives in process memory.
///
/// Run: cargo run --example fruit_list

use recordsync::model::Fruit;
use recordsync::prelude::*;
use recordsync::InMemoryRemoteStore;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    println!("=== RecordSync Fruit List Example ===\n");

    let store = Arc::new(InMemoryRemoteStore::new());
    let container = Container::from_url(store.clone(), "recordsync://iCloud.com.example.FrontRunner/public")?;

    // ============================================================================
    // 1. Account
    // ============================================================================
    println!("1. Checking account...");
    let snapshot = container.identity().account_snapshot().await;
    println!("   signed in: {}", snapshot.is_signed_in);
    println!("   permission granted: {}", snapshot.permission_granted);
    println!("   user: {}\n", snapshot.user_name.as_deref().unwrap_or("-"));

    let client = container.connect().await?;

    // ============================================================================
    // 2. Create, update, delete
    // ============================================================================
    println!("2. Saving a fruit...");
    let id = client.create(&Fruit::new("Banana")).await?;
    println!("   ✓ created {}\n", id);

    let mut fruits: Vec<Fruit> = client.query(Filter::all(), Vec::new(), None).await?;
    println!("   fetched {} fruit(s)", fruits.len());

    if let Some(mut renamed) = fruits.pop() {
        renamed.name = "Woah!".to_string();
        client.update(&renamed).await?;
        println!("   ✓ renamed to '{}'", renamed.name);

        client.delete(&renamed).await?;
        println!("   ✓ deleted");
    }

    let remaining: Vec<Fruit> = client.fetch_all().await?;
    println!("   remaining: {}\n", remaining.len());

    // ============================================================================
    // 3. List view-model
    // ============================================================================
    println!("3. Driving the list model...");
    let model = RecordListModel::<Fruit>::spawn(client.clone(), ListRequest::newest_first());
    for (name, count) in [("Apple", 3), ("Pear", 1), ("Kiwi", 7)] {
        model.add(Fruit::new(name).count(count));
    }
    let state = model.settled().await;
    for fruit in &state.items {
        println!("   {} x{}", fruit.name, fruit.count);
    }

    model.delete_at(0);
    let state = model.settled().await;
    println!("   after delete: {} item(s)", state.items.len());
    if let Some(err) = &state.error {
        println!("   last error: {}", err);
    }
    model.shutdown().await;

    println!("\n=== Done ===");
    Ok(())
}
