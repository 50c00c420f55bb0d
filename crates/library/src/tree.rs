use std::collections::{BTreeMap, HashMap};

use common::{
    folder_name, parent_folder_path, Folder, GenreBucket, Track, OTHER_GENRE, ROOT_FOLDER_LABEL,
    ROOT_FOLDER_PATH,
};

#[derive(Default)]
struct FolderNode {
    tracks: Vec<Track>,
    children: Vec<String>,
}

/// Rebuilds the folder hierarchy from a flat track list.
///
/// Every ancestor of an observed folder path gets a node, with no direct
/// tracks if nothing lives there. Top-level paths (no '/') become the
/// returned roots. Subfolders and roots are sorted case-insensitively.
pub fn build_folder_tree(tracks: &[Track]) -> Vec<Folder> {
    let mut arena: BTreeMap<String, FolderNode> = BTreeMap::new();

    for track in tracks {
        arena
            .entry(track.folder_path.clone())
            .or_default()
            .tracks
            .push(track.clone());
    }

    let observed: Vec<String> = arena.keys().cloned().collect();
    for path in observed {
        let mut current = path.as_str();
        while let Some(parent) = parent_folder_path(current) {
            if arena.contains_key(parent) {
                break;
            }
            arena.insert(parent.to_string(), FolderNode::default());
            current = parent;
        }
    }

    let mut roots = Vec::new();
    let paths: Vec<String> = arena.keys().cloned().collect();
    for path in paths {
        match parent_folder_path(&path) {
            Some(parent) => {
                let parent = parent.to_string();
                if let Some(node) = arena.get_mut(&parent) {
                    node.children.push(path);
                }
            }
            None => roots.push(path),
        }
    }

    let mut folders: Vec<Folder> = roots
        .iter()
        .filter_map(|path| finalize(path, &mut arena))
        .collect();
    sort_folders(&mut folders);
    folders
}

/// A synthetic top-level folder holding the whole tree, or `None` for an
/// empty library.
pub fn root_folder(tracks: &[Track]) -> Option<Folder> {
    if tracks.is_empty() {
        return None;
    }
    Some(Folder {
        path: ROOT_FOLDER_PATH.to_string(),
        name: ROOT_FOLDER_LABEL.to_string(),
        tracks: Vec::new(),
        subfolders: build_folder_tree(tracks),
    })
}

/// One bucket per genre label present, "Other" last.
pub fn group_by_genre(tracks: &[Track]) -> Vec<GenreBucket> {
    let mut order: Vec<String> = Vec::new();
    let mut by_genre: HashMap<String, Vec<Track>> = HashMap::new();

    for track in tracks {
        let genre = if track.genre.trim().is_empty() {
            OTHER_GENRE.to_string()
        } else {
            track.genre.clone()
        };
        by_genre
            .entry(genre.clone())
            .or_insert_with(|| {
                order.push(genre);
                Vec::new()
            })
            .push(track.clone());
    }

    let mut buckets: Vec<GenreBucket> = order
        .into_iter()
        .filter_map(|name| {
            let tracks = by_genre.remove(&name)?;
            Some(GenreBucket { name, tracks })
        })
        .collect();
    buckets.sort_by(|a, b| {
        (a.name == OTHER_GENRE)
            .cmp(&(b.name == OTHER_GENRE))
            .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
            .then_with(|| a.name.cmp(&b.name))
    });
    buckets
}

fn finalize(path: &str, arena: &mut BTreeMap<String, FolderNode>) -> Option<Folder> {
    let node = arena.remove(path)?;
    let mut subfolders: Vec<Folder> = node
        .children
        .iter()
        .filter_map(|child| finalize(child, arena))
        .collect();
    sort_folders(&mut subfolders);

    let name = if path.is_empty() {
        ROOT_FOLDER_LABEL.to_string()
    } else {
        folder_name(path).to_string()
    };

    Some(Folder {
        path: path.to_string(),
        name,
        tracks: node.tracks,
        subfolders,
    })
}

fn sort_folders(folders: &mut [Folder]) {
    folders.sort_by(|a, b| {
        a.name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then_with(|| a.path.cmp(&b.path))
    });
}
