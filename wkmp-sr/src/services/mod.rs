//! External collaborators of the search engine

pub mod download_manager;

pub use download_manager::{
    DownloadManager, DownloadRequest, InMemoryDownloadManager, TrackStateUpdate, STATE_CHANNEL_CAPACITY,
};
