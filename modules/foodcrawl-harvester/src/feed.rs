use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::info;

use crate::error::{HarvestError, Result};

#[derive(Deserialize)]
struct FeedFile {
    data: Vec<FeedEntry>,
}

#[derive(Deserialize)]
struct FeedEntry {
    id: String,
}

/// Read the identifiers of one `{"data": [{"id": ...}, ...]}` file, in
/// file order. Extra fields are ignored.
pub fn load_feed(path: &Path) -> Result<Vec<String>> {
    let feed_err = |message: String| HarvestError::Feed {
        path: path.to_path_buf(),
        message,
    };

    let file = File::open(path).map_err(|e| feed_err(e.to_string()))?;
    let feed: FeedFile =
        serde_json::from_reader(BufReader::new(file)).map_err(|e| feed_err(e.to_string()))?;

    let ids: Vec<String> = feed.data.into_iter().map(|entry| entry.id).collect();
    info!(path = %path.display(), ids = ids.len(), "Loaded feed");
    Ok(ids)
}

/// Concatenate several feeds, in the order given. Fails on the first bad file.
pub fn load_feeds(paths: &[PathBuf]) -> Result<Vec<String>> {
    let mut ids = Vec::new();
    for path in paths {
        ids.extend(load_feed(path)?);
    }
    Ok(ids)
}
