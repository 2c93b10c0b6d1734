pub mod api;
pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod flatten;
pub mod oauth;
pub mod source;
pub mod store;

pub use api::{BoxClient, FolderEntry, FolderInfo, ItemType};
pub use cache::{ContentDownloader, LocalContentCache};
pub use config::{load_config, BoxsyncConfig, SourceConfig};
pub use error::BoxsyncError;
pub use flatten::{flatten, split_identifier, FlattenedFileEntry, FolderListing};
pub use oauth::{Authorizer, TokenManager};
pub use source::BoxSource;
pub use store::{FileTokenStore, MemoryTokenStore, TokenStore};
