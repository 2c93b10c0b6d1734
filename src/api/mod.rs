pub mod client;
pub mod types;

pub use client::BoxClient;
pub use types::{FolderEntry, FolderInfo, FolderItemsPage, ItemType};
