//! `vsync ls`: list the collections this user synced on this host.

use std::collections::HashSet;

use anyhow::Result;
use serde::Serialize;

use vectorsync_core::store::CollectionGateway;

use crate::chroma::ChromaClient;
use crate::collection::{Owner, META_EMBEDDING_FUNCTION, META_PATH};

/// One row of the listing.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CollectionSummary {
    #[serde(rename = "project-root")]
    pub project_root: String,
    pub user: String,
    pub hostname: String,
    pub collection_name: String,
    pub size: usize,
    pub embedding_function: String,
    pub num_files: usize,
}

/// Gather a summary of every collection owned by the current user and host.
pub async fn list_project_collections(client: &ChromaClient) -> Result<Vec<CollectionSummary>> {
    let owner = Owner::current();
    let mut summaries = Vec::new();

    for info in client.list_collections().await? {
        if !owner.owns(&info) {
            continue;
        }
        let project_root = info.meta_str(META_PATH).unwrap_or_default().to_string();
        let embedding_function = info
            .meta_str(META_EMBEDDING_FUNCTION)
            .unwrap_or_default()
            .to_string();
        let collection_name = info.name.clone();

        let collection = client.read_only_collection(info);
        let size = collection.count().await?;
        let num_files = collection
            .all_path_metadata()
            .await?
            .into_iter()
            .collect::<HashSet<_>>()
            .len();

        summaries.push(CollectionSummary {
            project_root,
            user: owner.username.clone(),
            hostname: owner.hostname.clone(),
            collection_name,
            size,
            embedding_function,
            num_files,
        });
    }

    Ok(summaries)
}

/// Run the ls command and print JSON (pipe mode) or a table.
pub async fn run_ls(client: &ChromaClient, pipe: bool) -> Result<()> {
    let summaries = list_project_collections(client).await?;
    if pipe {
        println!("{}", serde_json::to_string(&summaries)?);
    } else {
        let home = dirs::home_dir().map(|h| h.to_string_lossy().to_string());
        print!("{}", render_table(&summaries, home.as_deref()));
    }
    Ok(())
}

const HEADERS: [&str; 4] = [
    "Project Root",
    "Collection Size",
    "Number of Files",
    "Embedding Function",
];

/// Aligned table with the home directory shown as `~`.
pub fn render_table(summaries: &[CollectionSummary], home: Option<&str>) -> String {
    let rows: Vec<[String; 4]> = summaries
        .iter()
        .map(|s| {
            [
                abbreviate_home(&s.project_root, home),
                s.size.to_string(),
                s.num_files.to_string(),
                s.embedding_function.clone(),
            ]
        })
        .collect();

    let mut widths = HEADERS.map(str::len);
    for row in &rows {
        for (w, cell) in widths.iter_mut().zip(row.iter()) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    let header: Vec<String> = HEADERS
        .iter()
        .zip(widths.iter())
        .map(|(h, w)| format!("{:<width$}", h, width = *w))
        .collect();
    out.push_str(header.join("  ").trim_end());
    out.push('\n');
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    out.push_str(&rule.join("  "));
    out.push('\n');

    for row in &rows {
        // text columns left-aligned, counts right-aligned
        let cells = [
            format!("{:<width$}", row[0], width = widths[0]),
            format!("{:>width$}", row[1], width = widths[1]),
            format!("{:>width$}", row[2], width = widths[2]),
            format!("{:<width$}", row[3], width = widths[3]),
        ];
        out.push_str(cells.join("  ").trim_end());
        out.push('\n');
    }
    out
}

fn abbreviate_home(path: &str, home: Option<&str>) -> String {
    match home {
        Some(home) if !home.is_empty() => match path.strip_prefix(home) {
            Some(rest) if rest.is_empty() || rest.starts_with('/') => format!("~{}", rest),
            _ => path.to_string(),
        },
        _ => path.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(root: &str, size: usize, files: usize) -> CollectionSummary {
        CollectionSummary {
            project_root: root.to_string(),
            user: "alice".into(),
            hostname: "box".into(),
            collection_name: "c".into(),
            size,
            embedding_function: "local".into(),
            num_files: files,
        }
    }

    #[test]
    fn test_abbreviate_home() {
        assert_eq!(abbreviate_home("/home/a/proj", Some("/home/a")), "~/proj");
        assert_eq!(abbreviate_home("/home/a", Some("/home/a")), "~");
        assert_eq!(abbreviate_home("/home/ab/proj", Some("/home/a")), "/home/ab/proj");
        assert_eq!(abbreviate_home("/srv/proj", None), "/srv/proj");
    }

    #[test]
    fn test_table_has_headers_and_rows() {
        let table = render_table(
            &[summary("/home/a/proj", 120, 7), summary("/srv/x", 3, 1)],
            Some("/home/a"),
        );
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 4);
        for header in HEADERS {
            assert!(lines[0].contains(header));
        }
        assert!(lines[2].starts_with("~/proj"));
        assert!(lines[2].contains("120"));
        assert!(lines[3].starts_with("/srv/x"));
    }

    #[test]
    fn test_json_keys() {
        let json = serde_json::to_value(vec![summary("/p", 1, 1)]).unwrap();
        let row = &json[0];
        assert_eq!(row["project-root"], "/p");
        assert_eq!(row["num_files"], 1);
        assert_eq!(row["embedding_function"], "local");
    }
}
