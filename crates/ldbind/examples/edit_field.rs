//! Edits a few fields of a profile held in an in-memory store.
//!
//! Run with `RUST_LOG=ldbind=debug` to see resolution and save events.

use std::sync::Arc;

use ldbind::{
    Callbacks, CommitOutcome, Contexts, DataType, Dataset, DatasetContext, Datetime, Field, FieldConfig,
    MemoryStore, Node, PropertyId, StoreClient,
};
use tracing_subscriber::EnvFilter;

const PROFILE: &str = "https://pod.example/profile/card";
const ME: &str = "https://pod.example/profile/card#me";

fn describe(outcome: &CommitOutcome) -> String {
    match outcome {
        CommitOutcome::Saved(saved) => format!("saved to {}", saved.dataset.source_url().unwrap_or("?")),
        CommitOutcome::Failed => "failed".to_string(),
        CommitOutcome::Skipped(reason) => format!("skipped ({:?})", reason),
        CommitOutcome::Queued => "queued".to_string(),
        CommitOutcome::Local => "kept local".to_string(),
        CommitOutcome::Unbound => "unbound".to_string(),
        CommitOutcome::Discarded => "discarded".to_string(),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let name = PropertyId::from("http://xmlns.com/foaf/0.1/name");
    let nick = PropertyId::from("http://xmlns.com/foaf/0.1/nick");
    let age = PropertyId::from("http://schema.org/age");
    let born = PropertyId::from("http://schema.org/birthDate");

    let mut me = Node::new(ME);
    me.set_string(name.clone(), "Alice")
        .add_string_with_locale(nick.clone(), "Ally", "en")
        .set_integer(age.clone(), 30)
        .set_datetime(born.clone(), Datetime::parse("1994-06-01T08:00:00Z")?);

    let store = Arc::new(MemoryStore::new());
    store.seed(PROFILE, &Dataset::new().with_node(me)).await?;

    let ctx = DatasetContext::pending();
    ctx.load(store.as_ref(), PROFILE).await?;
    let contexts = Contexts::with_dataset(ctx.clone());

    let callbacks = Callbacks::none()
        .on_save(|dataset, node| println!("  on_save: {} node(s), {}", dataset.len(), node.url()))
        .on_error(|e| println!("  on_error: {}", e));

    let mount = |config: FieldConfig| {
        Field::mount(config, contexts.clone(), callbacks.clone(), store.clone())
    };

    let name_field = mount(
        FieldConfig::new(DataType::String)
            .node_url(ME)
            .properties([PropertyId::from("http://schema.org/name"), name.clone()])
            .edit(true)
            .autosave(true),
    )?;
    println!("name bound to {:?}: {:?}", name_field.chosen_property(), name_field.display_text());
    name_field.input("Alice Liddell");
    println!("commit name: {}", describe(&name_field.commit().await?));
    println!("commit again: {}", describe(&name_field.commit().await?));

    let nick_field = mount(
        FieldConfig::new(DataType::String)
            .node_url(ME)
            .property(nick.clone())
            .locale("en")
            .edit(true)
            .autosave(true),
    )?;
    nick_field.input("Al");
    println!("commit nick: {}", describe(&nick_field.commit().await?));

    let age_field = mount(
        FieldConfig::new(DataType::Integer)
            .node_url(ME)
            .property(age.clone())
            .edit(true)
            .autosave(true),
    )?;
    age_field.input("thirty-one");
    println!("commit invalid age: {}", describe(&age_field.commit().await?));
    age_field.input("31");
    println!("commit age: {}", describe(&age_field.commit().await?));

    let born_field = mount(
        FieldConfig::new(DataType::Datetime)
            .node_url(ME)
            .property(born.clone())
            .edit(true)
            .autosave(false),
    )?;
    born_field.input("1994-06-02T09:30");
    println!("commit birth date: {}", describe(&born_field.commit().await?));

    // Other fields see the published dataset once refreshed.
    name_field.refresh()?;
    age_field.refresh()?;

    let stored = store.fetch_dataset(PROFILE).await?;
    if let Some(node) = stored.get_node(ME) {
        println!("stored name: {:?}", node.get_string(&name));
        println!("stored nick: {:?}", node.get_string_with_locale(&nick, "en"));
        println!("stored age:  {:?}", node.get_integer(&age));
        println!("stored born: {:?}", node.get_datetime(&born).map(|d| d.to_string()));
    }
    println!("saves: {}, fetches: {}", store.save_count(), store.fetch_count());

    for field in [name_field, nick_field, age_field, born_field] {
        field.unmount();
    }
    Ok(())
}
