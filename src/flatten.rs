use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::api::{BoxClient, FolderEntry, ItemType};
use crate::error::BoxsyncError;

/// Separates the remote id from the path-qualified name in an identifier.
pub const IDENTIFIER_DELIMITER: &str = "|||";
/// Joins ancestor folder names in a path-qualified name.
pub const PATH_SEPARATOR: char = '|';

/// Anything that can enumerate every child of a folder.
#[async_trait]
pub trait FolderListing: Send + Sync {
    async fn list_all_folder_children(
        &self,
        folder_id: &str,
    ) -> Result<Vec<FolderEntry>, BoxsyncError>;
}

#[async_trait]
impl FolderListing for BoxClient {
    async fn list_all_folder_children(
        &self,
        folder_id: &str,
    ) -> Result<Vec<FolderEntry>, BoxsyncError> {
        BoxClient::list_all_folder_children(self, folder_id).await
    }
}

/// The folder a file was found in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FolderRef {
    pub id: String,
    /// Path-qualified name of the folder itself.
    pub name: String,
}

/// A file reachable from the root, named by its ancestor chain.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlattenedFileEntry {
    pub remote_id: String,
    /// Ancestor folder names and the file's own name, joined with `|`.
    pub name: String,
    pub modified_at: Option<DateTime<Utc>>,
    pub size: u64,
    pub parent: Option<FolderRef>,
}

impl FlattenedFileEntry {
    /// `<remote id>|||<path-qualified name>`
    pub fn identifier(&self) -> String {
        format!("{}{IDENTIFIER_DELIMITER}{}", self.remote_id, self.name)
    }
}

/// Split an identifier produced by [`FlattenedFileEntry::identifier`].
pub fn split_identifier(identifier: &str) -> Result<(String, String), BoxsyncError> {
    match identifier.split_once(IDENTIFIER_DELIMITER) {
        Some((id, name)) if !id.is_empty() && !name.is_empty() => {
            Ok((id.to_string(), name.to_string()))
        }
        _ => Err(BoxsyncError::InvalidIdentifier(identifier.to_string())),
    }
}

struct Pending {
    entry: FolderEntry,
    path: String,
    parent: Option<FolderRef>,
}

impl Pending {
    fn root_child(entry: FolderEntry) -> Self {
        Self {
            path: entry.name.clone(),
            entry,
            parent: None,
        }
    }
}

/// Collect every file below `root_folder_id`.
///
/// The work list starts with the root's children. Each round removes the
/// first folder still in it and appends that folder's children, tagged with
/// the folder's own path-qualified name. The loop ends when only files are
/// left. Output order is not significant.
pub async fn flatten(
    listing: &dyn FolderListing,
    root_folder_id: &str,
) -> Result<Vec<FlattenedFileEntry>, BoxsyncError> {
    let mut work: Vec<Pending> = listing
        .list_all_folder_children(root_folder_id)
        .await?
        .into_iter()
        .map(Pending::root_child)
        .collect();

    while let Some(pos) = work.iter().position(|p| p.entry.is_folder()) {
        let folder = work.remove(pos);
        let children = listing.list_all_folder_children(&folder.entry.id).await?;
        debug!(folder = %folder.path, children = children.len(), "Expanding folder");

        let parent = FolderRef {
            id: folder.entry.id,
            name: folder.path,
        };
        work.extend(children.into_iter().map(|entry| Pending {
            path: format!("{}{PATH_SEPARATOR}{}", parent.name, entry.name),
            entry,
            parent: Some(parent.clone()),
        }));
    }

    let files = work
        .into_iter()
        .filter(|p| match p.entry.item_type {
            ItemType::File => true,
            _ => {
                debug!(name = %p.path, "Skipping non-file item");
                false
            }
        })
        .map(|p| FlattenedFileEntry {
            remote_id: p.entry.id,
            name: p.path,
            modified_at: p.entry.modified_at,
            size: p.entry.size,
            parent: p.parent,
        })
        .collect();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeTree {
        children: HashMap<String, Vec<FolderEntry>>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeTree {
        fn with(mut self, folder: &str, entries: Vec<FolderEntry>) -> Self {
            self.children.insert(folder.to_string(), entries);
            self
        }
    }

    #[async_trait]
    impl FolderListing for FakeTree {
        async fn list_all_folder_children(
            &self,
            folder_id: &str,
        ) -> Result<Vec<FolderEntry>, BoxsyncError> {
            self.calls.lock().unwrap().push(folder_id.to_string());
            self.children
                .get(folder_id)
                .cloned()
                .ok_or_else(|| BoxsyncError::Upstream {
                    status: Some(404),
                    detail: format!("no folder {folder_id}"),
                })
        }
    }

    fn item(item_type: ItemType, id: &str, name: &str) -> FolderEntry {
        FolderEntry {
            id: id.into(),
            item_type,
            name: name.into(),
            created_at: None,
            modified_at: None,
            size: 10,
        }
    }

    fn sample_tree() -> FakeTree {
        FakeTree::default()
            .with(
                "root",
                vec![
                    item(ItemType::File, "a", "fileA"),
                    item(ItemType::Folder, "B", "B"),
                ],
            )
            .with(
                "B",
                vec![
                    item(ItemType::File, "c", "fileC"),
                    item(ItemType::Folder, "D", "D"),
                ],
            )
            .with("D", vec![item(ItemType::File, "e", "fileE")])
    }

    #[tokio::test]
    async fn nested_files_carry_full_ancestor_path() {
        let tree = sample_tree();
        let mut names: Vec<String> = flatten(&tree, "root")
            .await
            .unwrap()
            .into_iter()
            .map(|f| f.name)
            .collect();
        names.sort();
        assert_eq!(names, vec!["B|D|fileE", "B|fileC", "fileA"]);
        assert_eq!(*tree.calls.lock().unwrap(), vec!["root", "B", "D"]);
    }

    #[tokio::test]
    async fn parent_reference_points_to_immediate_folder() {
        let files = flatten(&sample_tree(), "root").await.unwrap();
        let e = files.iter().find(|f| f.remote_id == "e").unwrap();
        assert_eq!(
            e.parent,
            Some(FolderRef {
                id: "D".into(),
                name: "B|D".into()
            })
        );
        let a = files.iter().find(|f| f.remote_id == "a").unwrap();
        assert_eq!(a.parent, None);
        assert_eq!(e.identifier(), "e|||B|D|fileE");
    }

    #[tokio::test]
    async fn empty_folders_and_web_links_yield_nothing() {
        let tree = FakeTree::default()
            .with(
                "root",
                vec![
                    item(ItemType::Folder, "empty", "Empty"),
                    item(ItemType::Other, "w", "bookmark"),
                ],
            )
            .with("empty", vec![]);
        assert!(flatten(&tree, "root").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn listing_failure_aborts_flatten() {
        let tree = FakeTree::default().with("root", vec![item(ItemType::Folder, "gone", "Gone")]);
        let err = flatten(&tree, "root").await.unwrap_err();
        assert_eq!(err.code(), "upstream_error");
    }

    #[test]
    fn split_identifier_keeps_pipes_in_name() {
        assert_eq!(
            split_identifier("42|||B|D|fileE").unwrap(),
            ("42".to_string(), "B|D|fileE".to_string())
        );
    }

    #[test]
    fn split_identifier_rejects_malformed() {
        for bad in ["no-delimiter", "|||name", "42|||", ""] {
            let err = split_identifier(bad).unwrap_err();
            assert_eq!(err.code(), "invalid_identifier", "input: {bad:?}");
        }
    }
}
