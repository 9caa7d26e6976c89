use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Directory,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    pub name: String,
    pub path: String,
    pub kind: EntryKind,
    pub item_count: usize,
    pub size: String,
    pub modified_at: String,
    #[serde(default)]
    pub error: Option<String>,
}

impl Entry {
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }

    /// `3 items | Modified: ...` for directories, size for files.
    pub fn summary(&self) -> String {
        if let Some(err) = &self.error {
            return format!("unavailable: {}", err);
        }
        let lead = if self.is_dir() {
            format!("{} items", self.item_count)
        } else {
            self.size.clone()
        };
        format!("{} | Modified: {}", lead, self.modified_at)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct DiskUsage {
    pub filesystem: String,
    pub size: String,
    pub used: String,
    pub available: String,
    pub use_percentage: String,
    pub mounted_on: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_server_listing() {
        let raw = r#"[
            {"name":"a","path":"/a","kind":"directory","itemCount":2,"size":"-","modifiedAt":"Mon"},
            {"name":"x","path":"/x","kind":"file","itemCount":0,"size":"-","modifiedAt":"","error":"not found: /x"}
        ]"#;
        let entries: Vec<Entry> = serde_json::from_str(raw).unwrap();
        assert!(entries[0].is_dir());
        assert_eq!(entries[0].summary(), "2 items | Modified: Mon");
        assert_eq!(entries[1].summary(), "unavailable: not found: /x");
    }
}
