use crate::models::FileRecord;

pub fn filter_files(files: &[FileRecord], query: &str) -> Vec<FileRecord> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return files.to_vec();
    }
    files
        .iter()
        .filter(|f| f.name.to_lowercase().contains(&query))
        .cloned()
        .collect()
}

pub fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 3] = ["KB", "MB", "GB"];
    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}

/// Object key for an upload. The timestamp prefix keeps same-named uploads
/// apart in the bucket.
pub fn storage_key(now_millis: i64, file_name: &str) -> String {
    let name = file_name.rsplit(['/', '\\']).next().unwrap_or(file_name);
    format!("{}_{}", now_millis, name)
}

pub fn key_from_public_url(url: &str) -> Option<&str> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.rsplit('/').next().filter(|k| !k.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn file(name: &str) -> FileRecord {
        FileRecord {
            id: json!(name),
            name: name.to_string(),
            size: 10,
            mime_type: "text/plain".to_string(),
            path: format!("https://x.test/storage/v1/object/public/files/1_{}", name),
            created_at: None,
            owner_id: None,
        }
    }

    #[test]
    fn test_filter_files() {
        let files = vec![file("Quarterly Report.pdf"), file("Team Photo.jpg")];
        assert_eq!(filter_files(&files, " "), files);
        let hits = filter_files(&files, "photo");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "Team Photo.jpg");
    }

    #[test]
    fn test_human_size() {
        assert_eq!(human_size(0), "0 B");
        assert_eq!(human_size(1023), "1023 B");
        assert_eq!(human_size(1536), "1.5 KB");
        assert_eq!(human_size(2_516_582), "2.4 MB");
        assert_eq!(human_size(3 * 1024 * 1024 * 1024), "3.0 GB");
    }

    #[test]
    fn test_storage_key_strips_directories() {
        assert_eq!(storage_key(1700, "notes.txt"), "1700_notes.txt");
        assert_eq!(storage_key(1700, "/home/me/notes.txt"), "1700_notes.txt");
    }

    #[test]
    fn test_key_from_public_url() {
        assert_eq!(
            key_from_public_url("https://x.test/storage/v1/object/public/files/12_a.png?t=1"),
            Some("12_a.png")
        );
        assert_eq!(key_from_public_url("https://x.test/"), None);
    }
}
