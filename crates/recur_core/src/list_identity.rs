use crate::error::AppError;
use crate::storage::local_state::{self, LocalState};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::info;

const MAX_PROMPT_ATTEMPTS: usize = 3;

/// Asks the user which list to open when none is remembered.
#[async_trait]
pub trait NamePrompt: Send {
    async fn prompt_for_name(&mut self) -> Result<String, AppError>;
}

/// The location a session was started from. A non-root path names a shared
/// list; once adopted the path is reset to `/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryPoint {
    path: String,
}

impl EntryPoint {
    /// Accepts either a bare path (`/groceries`) or a full link
    /// (`https://host/groceries?x=1`).
    pub fn new(link: &str) -> Self {
        let trimmed = link.trim();
        let after_host = match trimmed.split_once("://") {
            Some((_, rest)) => rest.find('/').map_or("/", |index| &rest[index..]),
            None => trimmed,
        };
        let path = after_host
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_string();
        Self { path }
    }

    pub fn root() -> Self {
        Self {
            path: "/".to_string(),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn is_root(&self) -> bool {
        self.path.is_empty() || self.path == "/"
    }
}

/// Lowercases and trims a list name; blank names are rejected.
pub fn normalize_list_name(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}

/// Link that opens `list_name` on another device.
pub fn share_link(public_url: &str, list_name: &str) -> String {
    format!(
        "{}/{}",
        public_url.trim_end_matches('/'),
        urlencoding::encode(list_name)
    )
}

/// Tracks the active list and the lists visited from this device.
#[derive(Debug)]
pub struct ListIdentity {
    path: PathBuf,
    state: LocalState,
}

impl ListIdentity {
    pub fn open(path: &Path) -> Result<Self, AppError> {
        let stored = local_state::load_state(path)?;

        let mut visited: Vec<String> = Vec::new();
        for name in stored.visited_list_names.iter().filter_map(|name| normalize_list_name(name)) {
            if !visited.contains(&name) {
                visited.push(name);
            }
        }

        Ok(Self {
            path: path.to_path_buf(),
            state: LocalState {
                active_list_name: stored
                    .active_list_name
                    .as_deref()
                    .and_then(normalize_list_name),
                visited_list_names: visited,
            },
        })
    }

    pub fn active_list_name(&self) -> Option<&str> {
        self.state.active_list_name.as_deref()
    }

    pub fn list_visited(&self) -> &[String] {
        &self.state.visited_list_names
    }

    /// Returns the remembered list, or asks for one and remembers it.
    pub async fn resolve_active_list_name(
        &mut self,
        prompt: &mut dyn NamePrompt,
    ) -> Result<String, AppError> {
        if let Some(name) = self.active_list_name() {
            return Ok(name.to_string());
        }

        for _ in 0..MAX_PROMPT_ATTEMPTS {
            let answer = prompt.prompt_for_name().await?;
            if let Some(name) = normalize_list_name(&answer) {
                return self.switch_to(&name);
            }
        }

        Err(AppError::invalid_input("list name is required"))
    }

    /// Adopts the list named by a shared link and resets the entry path.
    pub fn adopt_shared_list_name(
        &mut self,
        entry: &mut EntryPoint,
    ) -> Result<Option<String>, AppError> {
        if entry.is_root() {
            return Ok(None);
        }

        let decoded = urlencoding::decode(&entry.path)
            .map_err(|err| AppError::invalid_input(format!("shared link is not UTF-8: {err}")))?;
        let raw = decoded.strip_prefix('/').unwrap_or(&*decoded);
        let raw = raw.trim_end_matches('/');

        let adopted = match normalize_list_name(raw) {
            Some(name) => {
                info!(list = %name, "adopting shared list");
                Some(self.switch_to(&name)?)
            }
            None => None,
        };

        *entry = EntryPoint::root();
        Ok(adopted)
    }

    /// Makes `name` the active list and remembers it.
    pub fn switch_to(&mut self, name: &str) -> Result<String, AppError> {
        let name = normalize_list_name(name)
            .ok_or_else(|| AppError::invalid_input("list name is required"))?;
        self.state.active_list_name = Some(name.clone());
        self.push_visited(&name);
        self.save()?;
        Ok(name)
    }

    /// Forgets the active list so the next resolution prompts again.
    pub fn clear_active(&mut self) -> Result<(), AppError> {
        self.state.active_list_name = None;
        self.save()
    }

    pub fn remember_visited(&mut self, name: &str) -> Result<(), AppError> {
        let name = normalize_list_name(name)
            .ok_or_else(|| AppError::invalid_input("list name is required"))?;
        if self.push_visited(&name) {
            self.save()?;
        }
        Ok(())
    }

    /// Removes `name` from the visited lists. If it was active, the most
    /// recently visited remaining list becomes active, or none does.
    /// Returns whether anything was removed.
    pub fn forget_visited(&mut self, name: &str) -> Result<bool, AppError> {
        let Some(name) = normalize_list_name(name) else {
            return Ok(false);
        };

        let before = self.state.visited_list_names.len();
        self.state
            .visited_list_names
            .retain(|visited| *visited != name);
        let removed = self.state.visited_list_names.len() != before;
        let was_active = self.state.active_list_name.as_deref() == Some(name.as_str());

        if !removed && !was_active {
            return Ok(false);
        }

        if was_active {
            self.state.active_list_name = self.state.visited_list_names.last().cloned();
            info!(
                forgotten = %name,
                active = self.state.active_list_name.as_deref().unwrap_or("-"),
                "active list forgotten"
            );
        }

        self.save()?;
        Ok(true)
    }

    fn push_visited(&mut self, name: &str) -> bool {
        if self.state.visited_list_names.iter().any(|visited| visited == name) {
            return false;
        }
        self.state.visited_list_names.push(name.to_string());
        true
    }

    fn save(&self) -> Result<(), AppError> {
        local_state::save_state(&self.path, &self.state)
    }
}
