//! `vera memory` — Inspect and prune stored profiles and message logs.

use vera_config::AppConfig;
use vera_memory::MemoryStore;
use vera_memory::store::MAX_RECORDS;

fn open(config: &AppConfig) -> MemoryStore {
    if config.memory.backend != "file" {
        eprintln!(
            "  Note: memory backend is '{}'; only the 'file' backend persists between runs.",
            config.memory.backend
        );
    }
    MemoryStore::new(vera_memory::build_from_config(config))
}

pub async fn recent(
    config: &AppConfig,
    server_id: &str,
    user_id: Option<&str>,
    limit: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = open(config);
    let records = store.recent(server_id, user_id, limit.min(MAX_RECORDS)).await;

    if records.is_empty() {
        println!("No messages stored for server '{server_id}'.");
        return Ok(());
    }

    for record in &records {
        println!(
            "[{}] {} ({}): {}",
            record.created_at_iso.format("%Y-%m-%d %H:%M:%S"),
            record.user_name,
            record.user_id,
            record.message
        );
        for triple in &record.knowledge {
            println!("    • {} {} {}", triple.subject, triple.predicate, triple.object);
        }
    }

    Ok(())
}

pub async fn profile(config: &AppConfig, server_id: &str, user_id: &str) -> Result<(), Box<dyn std::error::Error>> {
    let store = open(config);
    match store.get_profile(server_id, user_id).await {
        Some(person) => println!("{}", serde_json::to_string_pretty(&person)?),
        None => println!("No profile for '{user_id}' on '{server_id}'."),
    }
    Ok(())
}

pub async fn forget(config: &AppConfig, server_id: &str, user_id: &str) -> Result<(), Box<dyn std::error::Error>> {
    let store = open(config);
    if store.forget_profile(server_id, user_id).await? {
        println!("Forgot '{user_id}' on '{server_id}'.");
    } else {
        println!("No profile for '{user_id}' on '{server_id}'.");
    }
    Ok(())
}

pub async fn clear(config: &AppConfig, server_id: &str, confirm: bool) -> Result<(), Box<dyn std::error::Error>> {
    if !confirm {
        println!("This deletes the stored message log for '{server_id}'.");
        println!("   Run with --confirm to proceed:");
        println!("   vera memory clear --server {server_id} --confirm");
        return Ok(());
    }

    let store = open(config);
    if store.clear_recent(server_id).await? {
        println!("Cleared the message log for '{server_id}'.");
    } else {
        println!("No message log for '{server_id}'.");
    }
    Ok(())
}
