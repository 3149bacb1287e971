//! View or patch the scan policy.

use crate::config::{ConfigStore, PolicyKey};
use crate::error::Error;

/// Run the config command.
///
/// Without a key the current policy is printed; with a key and value that
/// single field is replaced.
pub fn run(store: &ConfigStore, key: Option<&str>, value: Option<&str>) -> Result<(), Error> {
    match (key, value) {
        (None, _) => {
            let policy = store
                .load()
                .ok_or_else(|| Error::NoExistingConfig(store.path()))?;
            println!("{}", serde_json::to_string_pretty(&policy)?);
        }
        (Some(key), None) => {
            let key: PolicyKey = key.parse()?;
            let policy = store
                .load()
                .ok_or_else(|| Error::NoExistingConfig(store.path()))?;
            let document = serde_json::to_value(&policy)?;
            let field = document
                .get(key.as_str())
                .cloned()
                .unwrap_or(serde_json::Value::Array(Vec::new()));
            println!("{}", field);
        }
        (Some(key), Some(value)) => {
            let key: PolicyKey = key.parse()?;
            store.patch(key, value)?;
            println!("Updated {} in {}", key, store.path().display());
        }
    }

    Ok(())
}
