use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadEntry {
    pub id: u64,
    pub annotation: String,
    pub path: PathBuf,
}

impl PayloadEntry {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// One archived entry joined with every slot currently pointing at it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveRow {
    pub id: u64,
    pub slots: Vec<String>,
    pub annotation: String,
    pub file_name: String,
}
