//! The signed-in user plus their projects and materials, persisted on change.

use crate::error::StoreError;
use crate::model::{Material, Project, User};
use crate::store::{Store, MATERIALS_KEY, PROJECTS_KEY, USER_KEY};

pub struct Library {
    store: Store,
    user: Option<User>,
    projects: Vec<Project>,
    materials: Vec<Material>,
}

impl Library {
    /// Load every collection. Unreadable records are logged and start empty.
    pub fn load(store: Store) -> Self {
        let user = load_or_default(&store, USER_KEY);
        let projects: Option<Vec<Project>> = load_or_default(&store, PROJECTS_KEY);
        let materials: Option<Vec<Material>> = load_or_default(&store, MATERIALS_KEY);
        let library = Self {
            store,
            user,
            projects: projects.unwrap_or_default(),
            materials: materials.unwrap_or_default(),
        };
        log::info!(
            "library loaded from {}: {} projects, {} materials",
            library.store.root().display(),
            library.projects.len(),
            library.materials.len()
        );
        library
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn login(&mut self, username: &str) -> Result<(), StoreError> {
        let username = username.trim();
        if username.is_empty() {
            return Err(StoreError::EmptyUsername);
        }
        let user = User {
            username: username.to_string(),
        };
        self.store.set(USER_KEY, &user)?;
        log::info!("signed in as {}", user.username);
        self.user = Some(user);
        Ok(())
    }

    pub fn logout(&mut self) -> Result<(), StoreError> {
        self.store.remove(USER_KEY)?;
        self.user = None;
        Ok(())
    }

    // ── Projects ────────────────────────────────────────────────────────────

    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    pub fn add_project(&mut self, project: Project) -> Result<(), StoreError> {
        let mut projects = self.projects.clone();
        projects.push(project);
        self.store.set(PROJECTS_KEY, &projects)?;
        self.projects = projects;
        Ok(())
    }

    pub fn delete_project(&mut self, id: &str) -> Result<(), StoreError> {
        let mut projects = self.projects.clone();
        projects.retain(|p| p.id != id);
        self.store.set(PROJECTS_KEY, &projects)?;
        self.projects = projects;
        Ok(())
    }

    pub fn projects_newest_first(&self) -> Vec<&Project> {
        let mut sorted: Vec<&Project> = self.projects.iter().collect();
        sorted.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        sorted
    }

    pub fn recent_projects(&self, limit: usize) -> Vec<&Project> {
        let mut recent = self.projects_newest_first();
        recent.truncate(limit);
        recent
    }

    // ── Materials ───────────────────────────────────────────────────────────

    pub fn materials(&self) -> &[Material] {
        &self.materials
    }

    pub fn material(&self, id: &str) -> Option<&Material> {
        self.materials.iter().find(|m| m.id == id)
    }

    pub fn add_material(&mut self, material: Material) -> Result<(), StoreError> {
        let mut materials = self.materials.clone();
        materials.push(material);
        self.store.set(MATERIALS_KEY, &materials)?;
        self.materials = materials;
        Ok(())
    }

    pub fn delete_material(&mut self, id: &str) -> Result<(), StoreError> {
        let mut materials = self.materials.clone();
        materials.retain(|m| m.id != id);
        self.store.set(MATERIALS_KEY, &materials)?;
        self.materials = materials;
        Ok(())
    }
}

fn load_or_default<T: serde::de::DeserializeOwned>(store: &Store, key: &str) -> Option<T> {
    match store.get(key) {
        Ok(value) => value,
        Err(e) => {
            log::warn!("ignoring unreadable record {}: {}", key, e);
            None
        }
    }
}
