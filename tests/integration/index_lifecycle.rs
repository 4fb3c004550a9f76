#![allow(missing_docs)]

use std::fs;
use std::sync::Once;

use penumbra::index::SNAPSHOT_EXTENSION;
use penumbra::query::model::{Constraint, Operator, PropertyValue, SelectorName, StaticOperand};
use penumbra::value::PropertyType;
use penumbra::{
    ConfigError, Index, IndexConstraints, IndexDefinition, IndexError, IndexOptions, NodeKey,
    Parameters, PropertyIndex, Result, Value,
};
use tempfile::tempdir;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("penumbra=debug"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_ansi(false)
            .try_init();
    });
}

fn people() -> IndexDefinition {
    IndexDefinition::multi_column(
        "people",
        [("name", PropertyType::String), ("age", PropertyType::Long)],
    )
    .expect("definition")
}

fn all_keys(index: &PropertyIndex) -> Result<Vec<String>> {
    Ok(index
        .filter_all(&IndexConstraints::default())?
        .into_iter()
        .map(|(key, _)| key.as_str().to_owned())
        .collect())
}

fn older_than(age: i64) -> Constraint {
    Constraint::comparison(
        PropertyValue::new(SelectorName::new("p").unwrap(), "age").unwrap(),
        Operator::GreaterThan,
        StaticOperand::literal(age),
    )
}

#[test]
fn staged_changes_become_visible_on_commit() -> Result<()> {
    init_tracing();
    let index = PropertyIndex::in_memory(people());
    assert!(index.requires_reindexing());

    index.add(&"ada".into(), "age", Value::from(36))?;
    index.add(&"alan".into(), "age", Value::from(41))?;
    assert_eq!(index.pending_changes(), 2);
    assert_eq!(index.estimate_total_count()?, 0);
    assert!(all_keys(&index)?.is_empty());

    index.commit()?;
    assert_eq!(index.pending_changes(), 0);
    assert!(!index.requires_reindexing());
    assert_eq!(all_keys(&index)?, ["ada", "alan"]);
    assert_eq!(
        index.estimate_cardinality(&[older_than(40)], &Parameters::new())?,
        1
    );
    Ok(())
}

#[test]
fn later_changes_win_within_a_commit() -> Result<()> {
    let index = PropertyIndex::in_memory(people());
    let key = NodeKey::from("grace");
    index.add(&key, "age", Value::from(30))?;
    index.add(&key, "age", Value::from(85))?;
    index.commit()?;
    assert_eq!(
        index.estimate_cardinality(&[older_than(80)], &Parameters::new())?,
        1
    );
    Ok(())
}

#[test]
fn removing_a_property_keeps_the_others() -> Result<()> {
    let index = PropertyIndex::in_memory(people());
    let key = NodeKey::from("ada");
    index.add(&key, "name", Value::from("Ada"))?;
    index.add(&key, "age", Value::from(36))?;
    index.add(&"alan".into(), "age", Value::from(41))?;
    index.commit()?;

    index.remove_property(&key, "age")?;
    index.commit()?;
    assert_eq!(index.estimate_total_count()?, 2);
    assert_eq!(
        index.estimate_cardinality(&[older_than(0)], &Parameters::new())?,
        1
    );

    // dropping the last property drops the node
    index.add_values(&key, "name", Vec::new())?;
    index.commit()?;
    assert_eq!(all_keys(&index)?, ["alan"]);

    index.remove(&"alan".into())?;
    index.commit()?;
    assert_eq!(index.estimate_total_count()?, 0);
    Ok(())
}

#[test]
fn undeclared_properties_and_bad_values_are_rejected_when_staged() {
    let index = PropertyIndex::in_memory(people());
    assert!(matches!(
        index.add(&"ada".into(), "email", Value::from("ada@example.org")),
        Err(IndexError::UnknownProperty { property, .. }) if property == "email"
    ));
    assert!(matches!(
        index.add(&"ada".into(), "age", Value::from("thirty")),
        Err(IndexError::ValueFormat(_))
    ));
    assert_eq!(index.pending_changes(), 0);
}

#[test]
fn committed_data_survives_restart() -> Result<()> {
    init_tracing();
    let dir = tempdir().expect("tmpdir");
    let options = IndexOptions::default().with_storage_directory(dir.path());

    let index = PropertyIndex::open(people(), options.clone())?;
    index.add(&"ada".into(), "name", Value::from("Ada"))?;
    index.add_values(
        &"ada".into(),
        "age",
        vec![Value::from(36), Value::from(37)],
    )?;
    index.commit()?;
    index.shutdown(true)?;

    let file = dir.path().join(format!("people.{SNAPSHOT_EXTENSION}"));
    assert!(file.exists());

    let reopened = PropertyIndex::open(people(), options)?;
    assert!(!reopened.requires_reindexing());
    assert_eq!(all_keys(&reopened)?, ["ada"]);
    assert_eq!(
        reopened.estimate_cardinality(&[older_than(36)], &Parameters::new())?,
        1
    );
    Ok(())
}

#[test]
fn shutdown_without_persist_discards_only_staged_changes() -> Result<()> {
    let dir = tempdir().expect("tmpdir");
    let options = IndexOptions::default()
        .with_storage_directory(dir.path())
        .with_sync_on_commit(false);

    let index = PropertyIndex::open(people(), options.clone())?;
    index.add(&"ada".into(), "age", Value::from(36))?;
    index.commit()?;
    index.add(&"alan".into(), "age", Value::from(41))?;
    index.shutdown(false)?;

    let reopened = PropertyIndex::open(people(), options)?;
    assert_eq!(all_keys(&reopened)?, ["ada"]);
    assert_eq!(reopened.pending_changes(), 0);
    Ok(())
}

#[test]
fn failed_persist_publishes_nothing_and_keeps_changes_staged() -> Result<()> {
    init_tracing();
    let dir = tempdir().expect("tmpdir");
    let storage = dir.path().join("data");
    fs::create_dir(&storage)?;
    let options = IndexOptions::default().with_storage_directory(&storage);
    let index = PropertyIndex::open(people(), options)?;
    index.add(&"ada".into(), "age", Value::from(36))?;

    // a regular file where the storage directory should be
    fs::remove_dir(&storage)?;
    fs::write(&storage, b"not a directory")?;
    assert!(matches!(index.commit(), Err(IndexError::Io(_))));
    assert_eq!(index.estimate_total_count()?, 0);
    assert!(all_keys(&index)?.is_empty());
    assert!(index.requires_reindexing());
    assert_eq!(index.pending_changes(), 1);

    index.add(&"alan".into(), "age", Value::from(41))?;
    fs::remove_file(&storage)?;
    fs::create_dir(&storage)?;
    index.commit()?;
    assert_eq!(index.pending_changes(), 0);
    assert!(!index.requires_reindexing());
    assert_eq!(all_keys(&index)?, ["ada", "alan"]);
    Ok(())
}

#[test]
fn fresh_storage_directory_needs_reindexing() -> Result<()> {
    let dir = tempdir().expect("tmpdir");
    let options = IndexOptions::default().with_storage_directory(dir.path());
    let index = PropertyIndex::open(people(), options.clone())?;
    assert!(index.requires_reindexing());
    index.shutdown(true)?;

    // nothing was committed, so nothing was written
    let reopened = PropertyIndex::open(people(), options)?;
    assert!(reopened.requires_reindexing());
    Ok(())
}

#[test]
fn reopening_with_another_definition_fails() -> Result<()> {
    let dir = tempdir().expect("tmpdir");
    let options = IndexOptions::default().with_storage_directory(dir.path());
    let index = PropertyIndex::open(people(), options.clone())?;
    index.add(&"ada".into(), "age", Value::from(36))?;
    index.commit()?;
    index.shutdown(true)?;

    let changed = IndexDefinition::single_column("people", "age", PropertyType::Long)?;
    assert!(matches!(
        PropertyIndex::open(changed, options),
        Err(IndexError::DefinitionMismatch(name)) if name == "people"
    ));
    Ok(())
}

#[test]
fn damaged_snapshot_is_reported_as_corruption() -> Result<()> {
    let dir = tempdir().expect("tmpdir");
    let options = IndexOptions::default().with_storage_directory(dir.path());
    let index = PropertyIndex::open(people(), options.clone())?;
    index.add(&"ada".into(), "name", Value::from("Ada"))?;
    index.commit()?;
    index.shutdown(true)?;

    let file = dir.path().join(format!("people.{SNAPSHOT_EXTENSION}"));
    let mut bytes = fs::read(&file)?;
    let last = bytes.len() - 1;
    bytes[last] ^= 0xFF;
    fs::write(&file, bytes)?;

    assert!(matches!(
        PropertyIndex::open(people(), options),
        Err(IndexError::Corruption(_))
    ));
    Ok(())
}

#[test]
fn clearing_empties_committed_and_stored_data() -> Result<()> {
    let dir = tempdir().expect("tmpdir");
    let options = IndexOptions::default().with_storage_directory(dir.path());
    let index = PropertyIndex::open(people(), options.clone())?;
    index.add(&"ada".into(), "age", Value::from(36))?;
    index.commit()?;
    index.add(&"alan".into(), "age", Value::from(41))?;

    index.clear_all_data()?;
    assert_eq!(index.estimate_total_count()?, 0);
    assert_eq!(index.pending_changes(), 0);
    index.commit()?;
    assert_eq!(index.estimate_total_count()?, 0);
    index.shutdown(true)?;

    let reopened = PropertyIndex::open(people(), options)?;
    assert_eq!(reopened.estimate_total_count()?, 0);
    Ok(())
}

#[test]
fn closed_index_rejects_every_operation() -> Result<()> {
    let index = PropertyIndex::in_memory(people());
    index.add(&"ada".into(), "age", Value::from(36))?;
    index.commit()?;
    index.shutdown(false)?;

    let closed = |result: Result<()>| matches!(result, Err(IndexError::Closed(_)));
    assert!(closed(index.add(&"ada".into(), "age", Value::from(1))));
    assert!(closed(index.remove(&"ada".into())));
    assert!(closed(index.commit()));
    assert!(closed(index.clear_all_data()));
    assert!(closed(index.shutdown(true)));
    assert!(matches!(index.estimate_total_count(), Err(IndexError::Closed(_))));
    assert!(matches!(
        index.filter(&IndexConstraints::default(), 0),
        Err(IndexError::Closed(_))
    ));
    Ok(())
}

#[test]
fn options_load_from_toml_and_are_validated_on_open() -> Result<()> {
    let dir = tempdir().expect("tmpdir");
    let path = dir.path().join("index.toml");
    fs::write(
        &path,
        format!(
            "storage_directory = {:?}\nsync_on_commit = false\ndefault_batch_size = 2\n",
            dir.path().join("data")
        ),
    )?;
    let options = IndexOptions::load(&path)?;
    assert_eq!(options.default_batch_size, 2);
    assert!(!options.sync_on_commit);

    fs::create_dir_all(dir.path().join("data"))?;
    let index = PropertyIndex::open(people(), options.clone())?;
    for (key, age) in [("a", 1), ("b", 2), ("c", 3)] {
        index.add(&key.into(), "age", Value::from(age))?;
    }
    index.commit()?;
    assert_eq!(all_keys(&index)?, ["a", "b", "c"]);

    let invalid = options.with_default_batch_size(0);
    assert!(matches!(
        PropertyIndex::open(people(), invalid),
        Err(IndexError::Config(ConfigError::Invalid {
            field: "default_batch_size",
            ..
        }))
    ));
    Ok(())
}
