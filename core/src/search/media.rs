//! Reduces walked nodes to the media files a client asked for.

use crate::path;
use crate::types::{MediaFile, MediaTypeSet, NodeRecord};

/// Keep the files whose MIME type is in `media_types` and shorten their paths against
/// `folder_path_from_root` (see [`path::reduce_path`]).
///
/// Node paths must already be expressed relative to the virtual root.
pub fn filter_and_shorten<I>(
    nodes: I,
    media_types: &MediaTypeSet,
    folder_path_from_root: &str,
) -> Vec<MediaFile>
where
    I: IntoIterator<Item = NodeRecord>,
{
    nodes
        .into_iter()
        .filter_map(|node| {
            let mimetype = node.mime.filter(|mime| media_types.matches(mime))?;
            Some(MediaFile {
                path: path::reduce_path(&node.path, folder_path_from_root),
                node_id: node.id,
                mimetype,
                mtime: node.mtime,
                size: node.size,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{NodeId, NodeKind};

    fn file(path: &str, mime: &str) -> NodeRecord {
        NodeRecord {
            id: NodeId::new("home::alice", 1),
            kind: NodeKind::File,
            path: path.to_string(),
            mime: Some(mime.to_string()),
            mtime: 1_400_000_000,
            size: 42,
        }
    }

    fn folder(path: &str) -> NodeRecord {
        NodeRecord {
            id: NodeId::new("home::alice", 2),
            kind: NodeKind::Folder,
            path: path.to_string(),
            mime: None,
            mtime: 0,
            size: 0,
        }
    }

    #[test]
    fn keeps_only_requested_types() {
        let nodes = vec![
            file("root/folder/a.jpg", "image/jpeg"),
            file("root/folder/b.PNG", "IMAGE/PNG"),
            file("root/folder/notes.txt", "text/plain"),
            folder("root/folder/sub"),
        ];
        let types = MediaTypeSet::parse("image/jpeg;image/png");
        let files = filter_and_shorten(nodes, &types, "root/folder");

        let paths: Vec<&str> = files.iter().map(|file| file.path.as_str()).collect();
        assert_eq!(paths, vec!["root/folder/a.jpg", "root/folder/b.PNG"]);
        assert!(files.iter().all(|file| types.matches(&file.mimetype)));
    }

    #[test]
    fn shortens_deeply_nested_paths() {
        let nodes = vec![
            file("root/folder/sub1/sub2/file.ext", "image/jpeg"),
            file("root/folder/sub1/near.jpg", "image/jpeg"),
        ];
        let files = filter_and_shorten(nodes, &MediaTypeSet::parse("image/*"), "root/folder");
        assert_eq!(files[0].path, "root/folder/file.ext");
        assert_eq!(files[1].path, "root/folder/sub1/near.jpg");
        assert_eq!(files[0].size, 42);
    }

    #[test]
    fn empty_input_or_filter_yields_nothing() {
        assert!(filter_and_shorten(Vec::new(), &MediaTypeSet::parse("image/*"), "").is_empty());
        let nodes = vec![file("a.jpg", "image/jpeg")];
        assert!(filter_and_shorten(nodes, &MediaTypeSet::default(), "").is_empty());
    }
}
