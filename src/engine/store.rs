use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::RwLock;
use ulid::Ulid;

use crate::model::*;
use crate::settings::RoomSettings;

#[derive(Debug)]
pub enum StoreError {
    Io(std::io::Error),
    /// A write named a category the store does not hold.
    MissingCategory(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Io(e) => write!(f, "io: {e}"),
            StoreError::MissingCategory(id) => write!(f, "no such category: {id}"),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::Io(e)
    }
}

/// Narrow read/write seam between the engine and whatever holds units,
/// tasks, and settings.
#[async_trait]
pub trait Repository: Send + Sync {
    /// All categories with their units, ordered by name.
    async fn list_categories(&self) -> Result<Vec<Category>, StoreError>;
    async fn get_category(&self, id: &str) -> Result<Option<Category>, StoreError>;
    async fn save_category(&self, category: Category) -> Result<(), StoreError>;
    /// Replace (or append) one unit inside its category.
    async fn save_unit(&self, category_id: &str, unit: Unit) -> Result<(), StoreError>;
    /// All tasks, oldest first.
    async fn list_tasks(&self) -> Result<Vec<HousekeepingTask>, StoreError>;
    async fn get_task(&self, id: Ulid) -> Result<Option<HousekeepingTask>, StoreError>;
    async fn upsert_task(&self, task: HousekeepingTask) -> Result<(), StoreError>;
    async fn load_settings(&self) -> Result<RoomSettings, StoreError>;
    async fn save_settings(&self, settings: RoomSettings) -> Result<(), StoreError>;
}

pub struct InMemoryStore {
    categories: DashMap<String, Category>,
    tasks: DashMap<Ulid, HousekeepingTask>,
    settings: RwLock<RoomSettings>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            categories: DashMap::new(),
            tasks: DashMap::new(),
            settings: RwLock::new(RoomSettings::default()),
        }
    }

    pub fn category_count(&self) -> usize {
        self.categories.len()
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    pub fn contains_category(&self, id: &str) -> bool {
        self.categories.contains_key(id)
    }

    // ── Event application ────────────────────────────────────

    /// Apply one journal event. `UnitSaved` for an unknown category fails
    /// without changing anything.
    pub async fn apply_event(&self, event: &Event) -> Result<(), StoreError> {
        match event {
            Event::CategorySaved { category } => {
                self.categories.insert(category.id.clone(), category.clone());
            }
            Event::UnitSaved { category_id, unit } => {
                let mut category = self
                    .categories
                    .get_mut(category_id)
                    .ok_or_else(|| StoreError::MissingCategory(category_id.clone()))?;
                match category.unit_mut(&unit.unit_number) {
                    Some(existing) => *existing = unit.clone(),
                    None => category.units.push(unit.clone()),
                }
            }
            Event::TaskUpserted { task } => {
                self.tasks.insert(task.id, task.clone());
            }
            Event::SettingsSaved { settings } => {
                *self.settings.write().await = settings.clone();
            }
        }
        Ok(())
    }

    /// Minimal event list that rebuilds the current state.
    pub async fn snapshot_events(&self) -> Vec<Event> {
        let mut events = vec![Event::SettingsSaved {
            settings: self.settings.read().await.clone(),
        }];
        events.extend(
            self.sorted_categories()
                .into_iter()
                .map(|category| Event::CategorySaved { category }),
        );
        events.extend(
            self.sorted_tasks()
                .into_iter()
                .map(|task| Event::TaskUpserted { task }),
        );
        events
    }

    fn sorted_categories(&self) -> Vec<Category> {
        let mut all: Vec<Category> = self.categories.iter().map(|e| e.value().clone()).collect();
        all.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        all
    }

    fn sorted_tasks(&self) -> Vec<HousekeepingTask> {
        let mut all: Vec<HousekeepingTask> = self.tasks.iter().map(|e| e.value().clone()).collect();
        all.sort_by_key(|t| t.id);
        all
    }
}

#[async_trait]
impl Repository for InMemoryStore {
    async fn list_categories(&self) -> Result<Vec<Category>, StoreError> {
        Ok(self.sorted_categories())
    }

    async fn get_category(&self, id: &str) -> Result<Option<Category>, StoreError> {
        Ok(self.categories.get(id).map(|e| e.value().clone()))
    }

    async fn save_category(&self, category: Category) -> Result<(), StoreError> {
        self.apply_event(&Event::CategorySaved { category }).await
    }

    async fn save_unit(&self, category_id: &str, unit: Unit) -> Result<(), StoreError> {
        self.apply_event(&Event::UnitSaved {
            category_id: category_id.to_string(),
            unit,
        })
        .await
    }

    async fn list_tasks(&self) -> Result<Vec<HousekeepingTask>, StoreError> {
        Ok(self.sorted_tasks())
    }

    async fn get_task(&self, id: Ulid) -> Result<Option<HousekeepingTask>, StoreError> {
        Ok(self.tasks.get(&id).map(|e| e.value().clone()))
    }

    async fn upsert_task(&self, task: HousekeepingTask) -> Result<(), StoreError> {
        self.apply_event(&Event::TaskUpserted { task }).await
    }

    async fn load_settings(&self) -> Result<RoomSettings, StoreError> {
        Ok(self.settings.read().await.clone())
    }

    async fn save_settings(&self, settings: RoomSettings) -> Result<(), StoreError> {
        self.apply_event(&Event::SettingsSaved { settings }).await
    }
}
