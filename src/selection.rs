use chrono::{DateTime, Utc};

use crate::model::{ItemId, MediaItem};

/// Ordered working set of [`MediaItem`]s.
///
/// List order is render order. Ids are unique within one selection and
/// assigned in creation order; they are never reused, so a removed id
/// stays invalid for the lifetime of the selection.
#[derive(Clone, Debug, Default)]
pub struct Selection {
    items: Vec<MediaItem>,
    next_id: u64,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a new item (selected by default) and return its id.
    pub fn add(
        &mut self,
        source: impl Into<String>,
        timestamp: DateTime<Utc>,
        label: impl Into<String>,
        measurement: f64,
    ) -> ItemId {
        let id = ItemId(self.next_id);
        self.next_id += 1;
        self.items.push(MediaItem {
            id,
            source: source.into(),
            timestamp,
            label: label.into(),
            measurement,
            selected: true,
        });
        id
    }

    /// Remove an item entirely. Sibling order is preserved.
    pub fn remove(&mut self, id: ItemId) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item.id != id);
        self.items.len() != before
    }

    /// Flip an item in or out of the render set without removing it.
    pub fn set_selected(&mut self, id: ItemId, selected: bool) -> bool {
        match self.get_mut(id) {
            Some(item) => {
                item.selected = selected;
                true
            }
            None => false,
        }
    }

    /// Partial metadata edit; `None` fields are left untouched.
    pub fn update_details(
        &mut self,
        id: ItemId,
        label: Option<&str>,
        measurement: Option<f64>,
    ) -> bool {
        match self.get_mut(id) {
            Some(item) => {
                if let Some(label) = label {
                    item.label = label.to_string();
                }
                if let Some(measurement) = measurement {
                    item.measurement = measurement;
                }
                true
            }
            None => false,
        }
    }

    /// Move an item to `new_index` (clamped to the list end), shifting
    /// siblings without otherwise reordering them.
    pub fn move_item(&mut self, id: ItemId, new_index: usize) -> bool {
        let Some(from) = self.items.iter().position(|item| item.id == id) else {
            return false;
        };
        let item = self.items.remove(from);
        let to = new_index.min(self.items.len());
        self.items.insert(to, item);
        true
    }

    pub fn get(&self, id: ItemId) -> Option<&MediaItem> {
        self.items.iter().find(|item| item.id == id)
    }

    fn get_mut(&mut self, id: ItemId) -> Option<&mut MediaItem> {
        self.items.iter_mut().find(|item| item.id == id)
    }

    /// All items in list order, selected or not.
    pub fn items(&self) -> &[MediaItem] {
        &self.items
    }

    /// Selected items in render order.
    pub fn selected_items(&self) -> Vec<&MediaItem> {
        self.items.iter().filter(|item| item.selected).collect()
    }

    pub fn selected_count(&self) -> usize {
        self.items.iter().filter(|item| item.selected).count()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
