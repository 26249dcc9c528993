use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const SCHEMA_VERSION: u32 = 1;
const STATE_FILE_NAME: &str = "state.json";
const STATE_ENV_VAR: &str = "RECUR_STATE_PATH";

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredState {
    schema_version: u32,
    #[serde(default)]
    active_list_name: Option<String>,
    #[serde(default)]
    visited_list_names: Vec<String>,
}

/// Durable per-device state that outlives a single session.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LocalState {
    pub active_list_name: Option<String>,
    pub visited_list_names: Vec<String>,
}

pub fn state_path() -> Result<PathBuf, AppError> {
    if let Ok(path) = std::env::var(STATE_ENV_VAR)
        && !path.trim().is_empty()
    {
        return Ok(PathBuf::from(path));
    }

    if cfg!(windows) {
        let appdata =
            std::env::var("APPDATA").map_err(|_| AppError::invalid_data("APPDATA is not set"))?;
        Ok(PathBuf::from(appdata).join("recur").join(STATE_FILE_NAME))
    } else {
        let home = std::env::var("HOME").map_err(|_| AppError::invalid_data("HOME is not set"))?;
        Ok(PathBuf::from(home)
            .join(".config")
            .join("recur")
            .join(STATE_FILE_NAME))
    }
}

pub fn load_state(path: &Path) -> Result<LocalState, AppError> {
    if !path.exists() {
        return Ok(LocalState::default());
    }

    let content = std::fs::read_to_string(path).map_err(|err| AppError::io(err.to_string()))?;
    let stored: StoredState =
        serde_json::from_str(&content).map_err(|err| AppError::invalid_data(err.to_string()))?;

    if stored.schema_version != SCHEMA_VERSION {
        return Err(AppError::invalid_data("schema_version mismatch"));
    }

    Ok(LocalState {
        active_list_name: stored.active_list_name,
        visited_list_names: stored.visited_list_names,
    })
}

pub fn save_state(path: &Path, state: &LocalState) -> Result<(), AppError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|err| AppError::io(err.to_string()))?;
    }

    let stored = StoredState {
        schema_version: SCHEMA_VERSION,
        active_list_name: state.active_list_name.clone(),
        visited_list_names: state.visited_list_names.clone(),
    };
    let content = serde_json::to_string_pretty(&stored)
        .map_err(|err| AppError::invalid_data(err.to_string()))?;
    std::fs::write(path, content).map_err(|err| AppError::io(err.to_string()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let permissions = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(path, permissions).map_err(|err| AppError::io(err.to_string()))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{LocalState, SCHEMA_VERSION, load_state, save_state};
    use std::fs;

    #[test]
    fn missing_file_is_empty_state() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = load_state(&dir.path().join("state.json")).unwrap();

        assert_eq!(loaded, LocalState::default());
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("state.json");
        let state = LocalState {
            active_list_name: Some("groceries".to_string()),
            visited_list_names: vec!["groceries".to_string(), "chores".to_string()],
        };

        save_state(&path, &state).unwrap();
        let loaded = load_state(&path).unwrap();

        assert_eq!(loaded, state);
    }

    #[test]
    fn uses_camel_case_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let state = LocalState {
            active_list_name: Some("home".to_string()),
            visited_list_names: vec!["home".to_string()],
        };

        save_state(&path, &state).unwrap();
        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();

        assert_eq!(raw["activeListName"], "home");
        assert_eq!(raw["visitedListNames"][0], "home");
        assert_eq!(raw["schemaVersion"], SCHEMA_VERSION);
    }

    #[test]
    fn schema_version_must_match() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let bad = format!(
            "{{\n  \"schemaVersion\": {},\n  \"visitedListNames\": []\n}}",
            SCHEMA_VERSION + 1
        );
        fs::write(&path, bad).unwrap();

        let err = load_state(&path).unwrap_err();
        assert_eq!(err.code(), "invalid_data");
    }

    #[test]
    fn rejects_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "{ not json").unwrap();

        assert_eq!(load_state(&path).unwrap_err().code(), "invalid_data");
    }
}
