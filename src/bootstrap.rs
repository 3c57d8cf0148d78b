//! Initial scan of the remote store into a namespace index

use crate::error::RemoteError;
use crate::index::{NamespaceIndex, ObjectEntry};
use crate::path::Scope;
use crate::remote::{ContainerHandle, ObjectStoreClient, StoreRoot};
use log::{info, warn};
use std::collections::HashSet;

/// Resolve the root and mirror every container and live object into a fresh index.
pub async fn build_index(
    client: &dyn ObjectStoreClient,
    root_id: &str,
) -> Result<(StoreRoot, NamespaceIndex), RemoteError> {
    let root = client.resolve_root(root_id).await?;
    let index = NamespaceIndex::new(root.home.clone());

    load_objects(client, &index, &Scope::Home, &root.home).await?;

    let containers = client.list_containers(&root.group).await?;
    for container in containers {
        if container.id == root.home.id {
            continue;
        }
        if index.top_level_taken(&container.name) {
            warn!(
                "Skipping channel {} ({}): name already used at the mount root",
                container.name, container.id
            );
            continue;
        }
        let name = container.name.clone();
        if let Err(e) = index.insert_container(&name, container.clone()) {
            warn!("Skipping channel {} ({}): {}", name, container.id, e);
            continue;
        }
        load_objects(client, &index, &Scope::Container(name), &container).await?;
    }

    info!(
        "Indexed {} directories and {} files under {}",
        index.container_count(),
        index.object_count(),
        root.home.name
    );
    Ok((root, index))
}

async fn load_objects(
    client: &dyn ObjectStoreClient,
    index: &NamespaceIndex,
    scope: &Scope,
    container: &ContainerHandle,
) -> Result<(), RemoteError> {
    // newest first, so the first sighting of a name is the live one
    let objects = client.list_objects(container).await?;
    let mut seen = HashSet::new();
    for object in objects {
        if !seen.insert(object.name.clone()) {
            warn!(
                "Stale copy of {} in {} (message {}); ignoring",
                object.name, container.name, object.id
            );
            continue;
        }
        let name = object.name.clone();
        if let Err(e) = index.insert_object(scope, &name, ObjectEntry::new(object)) {
            warn!("Skipping {} in {}: {}", name, container.name, e);
        }
    }
    Ok(())
}
