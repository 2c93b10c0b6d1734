use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Fields requested for every folder item, to keep listing payloads small.
pub const ITEM_FIELDS: &str = "name,created_at,modified_at,size";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    Folder,
    File,
    /// Web links and anything Box adds later. Never expanded or downloaded.
    #[serde(other)]
    Other,
}

/// One child of a folder, as returned by `GET /folders/{id}/items`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FolderEntry {
    #[serde(deserialize_with = "id_from_string_or_number")]
    pub id: String,
    #[serde(rename = "type")]
    pub item_type: ItemType,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub modified_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub size: u64,
}

impl FolderEntry {
    pub fn is_folder(&self) -> bool {
        self.item_type == ItemType::Folder
    }

    pub fn is_file(&self) -> bool {
        self.item_type == ItemType::File
    }
}

/// A single page of folder children.
#[derive(Debug, Clone, Deserialize)]
pub struct FolderItemsPage {
    pub total_count: u64,
    #[serde(default)]
    pub entries: Vec<FolderEntry>,
}

/// Metadata of a folder itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FolderInfo {
    #[serde(deserialize_with = "id_from_string_or_number")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub modified_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub item_collection: Option<ItemCollection>,
}

impl FolderInfo {
    pub fn item_count(&self) -> Option<u64> {
        self.item_collection.as_ref().map(|c| c.total_count)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemCollection {
    pub total_count: u64,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(u64),
}

fn id_from_string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(s) => s,
        RawId::Number(n) => n.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_items_page() {
        let json = r#"{
            "total_count": 2,
            "entries": [
                {"type": "folder", "id": "11", "name": "Designs"},
                {"type": "file", "id": 22, "name": "logo.png",
                 "modified_at": "2024-03-01T10:00:00-08:00", "size": 2048}
            ],
            "offset": 0,
            "limit": 100
        }"#;
        let page: FolderItemsPage = serde_json::from_str(json).unwrap();
        assert_eq!(page.total_count, 2);
        assert!(page.entries[0].is_folder());
        assert_eq!(page.entries[0].size, 0);
        let file = &page.entries[1];
        assert!(file.is_file());
        assert_eq!(file.id, "22");
        assert_eq!(file.size, 2048);
        assert_eq!(
            file.modified_at.unwrap().to_rfc3339(),
            "2024-03-01T18:00:00+00:00"
        );
    }

    #[test]
    fn unknown_item_type_is_other() {
        let entry: FolderEntry =
            serde_json::from_str(r#"{"type": "web_link", "id": "5", "name": "x"}"#).unwrap();
        assert_eq!(entry.item_type, ItemType::Other);
        assert!(!entry.is_file() && !entry.is_folder());
    }

    #[test]
    fn count_only_page_without_entries() {
        let page: FolderItemsPage = serde_json::from_str(r#"{"total_count": 250}"#).unwrap();
        assert_eq!(page.total_count, 250);
        assert!(page.entries.is_empty());
    }

    #[test]
    fn folder_info_item_count() {
        let info: FolderInfo = serde_json::from_str(
            r#"{"id": "0", "name": "All Files", "item_collection": {"total_count": 7}}"#,
        )
        .unwrap();
        assert_eq!(info.name, "All Files");
        assert_eq!(info.item_count(), Some(7));
    }
}
