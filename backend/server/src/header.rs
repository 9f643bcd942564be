//! # Navigation Items
//!
//! Ordered collection behind the site header menu.
//!
//! ## Ordering
//!
//! - Display order is ascending `order`, ties broken by `createdAt` then id
//! - Create and update never renumber, so duplicate or sparse orders are legal in between deletes
//! - Every successful delete runs the reorder pass: sort what is left, then `order = position`
//!
//! After a delete the collection always reads back as `0..n-1` in the same relative sequence it
//! had before.
//!
//! ## Known Race
//!
//! The reorder pass reads the collection, then writes it back in one atomic bulk write. A create
//! landing between the read and the write keeps whatever order it was given. Fine for a single
//! operator; the next delete heals it.
use std::cmp::Ordering;

use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{NavigationItem, NavigationItemPayload},
    store::HeaderStore,
};

pub const TEXT_AND_LINK_REQUIRED: &str = "Text and link are required";
pub const ITEM_NOT_FOUND: &str = "Header item not found";

pub fn display_order(a: &NavigationItem, b: &NavigationItem) -> Ordering {
    a.order
        .cmp(&b.order)
        .then_with(|| a.created_at.cmp(&b.created_at))
        .then_with(|| a.id.cmp(&b.id))
}

/// Sorts by current order and rewrites every item's order to its position.
pub fn renumber(mut items: Vec<NavigationItem>) -> Vec<NavigationItem> {
    items.sort_by(display_order);

    for (position, item) in items.iter_mut().enumerate() {
        item.order = position as u32;
    }

    items
}

pub fn required_fields(payload: &NavigationItemPayload) -> Result<(String, String), AppError> {
    match (payload.text.as_deref(), payload.link.as_deref()) {
        (Some(text), Some(link)) if !text.is_empty() && !link.is_empty() => {
            Ok((text.to_string(), link.to_string()))
        }
        _ => Err(AppError::validation(TEXT_AND_LINK_REQUIRED)),
    }
}

pub async fn list_items(store: &dyn HeaderStore) -> Result<Vec<NavigationItem>, AppError> {
    let mut items = store
        .list_items()
        .await
        .map_err(AppError::storage("Failed to fetch header items"))?;

    items.sort_by(display_order);

    Ok(items)
}

pub async fn create_item(
    store: &dyn HeaderStore,
    payload: NavigationItemPayload,
) -> Result<NavigationItem, AppError> {
    let (text, link) = required_fields(&payload)?;
    let item = NavigationItem::new(text, link, payload.order, payload.is_active);

    store
        .insert_item(&item)
        .await
        .map_err(AppError::storage("Failed to create header item"))?;

    info!(id = %item.id, order = item.order, "Created header item");

    Ok(item)
}

/// Replaces text and link. Order and active flag are replaced only when supplied.
pub async fn update_item(
    store: &dyn HeaderStore,
    id: Uuid,
    payload: NavigationItemPayload,
) -> Result<NavigationItem, AppError> {
    let (text, link) = required_fields(&payload)?;

    let mut item = store
        .get_item(id)
        .await
        .map_err(AppError::storage("Failed to update header item"))?
        .ok_or_else(|| AppError::not_found(ITEM_NOT_FOUND))?;

    item.text = text;
    item.link = link;
    if let Some(order) = payload.order {
        item.order = order;
    }
    if let Some(is_active) = payload.is_active {
        item.is_active = is_active;
    }

    let replaced = store
        .replace_item(&item)
        .await
        .map_err(AppError::storage("Failed to update header item"))?;

    // Deleted between the read and the write.
    if !replaced {
        return Err(AppError::not_found(ITEM_NOT_FOUND));
    }

    info!(id = %item.id, order = item.order, "Updated header item");

    Ok(item)
}

pub async fn delete_item(store: &dyn HeaderStore, id: Uuid) -> Result<(), AppError> {
    store
        .remove_item(id)
        .await
        .map_err(AppError::storage("Failed to delete header item"))?
        .ok_or_else(|| AppError::not_found(ITEM_NOT_FOUND))?;

    let remaining = store
        .list_items()
        .await
        .map_err(AppError::storage("Failed to delete header item"))?;
    let renumbered = renumber(remaining);

    store
        .save_items(&renumbered)
        .await
        .map_err(AppError::storage("Failed to delete header item"))?;

    debug!(remaining = renumbered.len(), "Reordered header items");
    info!(%id, "Deleted header item");

    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;
    use crate::store::MemoryStore;

    fn payload(text: &str, link: &str, order: Option<u32>) -> NavigationItemPayload {
        NavigationItemPayload {
            text: Some(text.to_string()),
            link: Some(link.to_string()),
            order,
            is_active: None,
        }
    }

    fn orders(items: &[NavigationItem]) -> Vec<u32> {
        items.iter().map(|item| item.order).collect()
    }

    fn texts(items: &[NavigationItem]) -> Vec<&str> {
        items.iter().map(|item| item.text.as_str()).collect()
    }

    #[test]
    fn renumber_closes_gaps_and_keeps_sequence() {
        let base = Utc::now();
        let mut items = Vec::new();
        for (offset, (text, order)) in [("c", 9), ("a", 2), ("b", 5)].into_iter().enumerate() {
            let mut item = NavigationItem::new(text.into(), "/".into(), Some(order), None);
            item.created_at = base + Duration::seconds(offset as i64);
            items.push(item);
        }

        let renumbered = renumber(items);

        assert_eq!(orders(&renumbered), vec![0, 1, 2]);
        assert_eq!(texts(&renumbered), vec!["a", "b", "c"]);
    }

    #[test]
    fn renumber_breaks_ties_by_creation_time() {
        let base = Utc::now();
        let mut later = NavigationItem::new("later".into(), "/l".into(), Some(0), None);
        later.created_at = base + Duration::seconds(1);
        let mut earlier = NavigationItem::new("earlier".into(), "/e".into(), Some(0), None);
        earlier.created_at = base;

        let renumbered = renumber(vec![later, earlier]);

        assert_eq!(texts(&renumbered), vec!["earlier", "later"]);
        assert_eq!(orders(&renumbered), vec![0, 1]);
    }

    #[tokio::test]
    async fn create_defaults_order_and_active_flag() {
        let store = MemoryStore::new();

        let item = create_item(&store, payload("Home", "/", None)).await.unwrap();

        assert_eq!(item.order, 0);
        assert!(item.is_active);
    }

    #[tokio::test]
    async fn create_requires_text_and_link() {
        let store = MemoryStore::new();

        for bad in [
            payload("", "/", None),
            payload("Home", "", None),
            NavigationItemPayload {
                text: Some("Home".into()),
                ..Default::default()
            },
        ] {
            let err = create_item(&store, bad).await.unwrap_err();
            assert!(matches!(err, AppError::Validation(ref msg) if msg == TEXT_AND_LINK_REQUIRED));
        }

        assert!(list_items(&store).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn create_tolerates_duplicate_orders() {
        let store = MemoryStore::new();
        create_item(&store, payload("Home", "/", Some(0))).await.unwrap();
        create_item(&store, payload("About", "/about", Some(0))).await.unwrap();

        let items = list_items(&store).await.unwrap();

        assert_eq!(orders(&items), vec![0, 0]);
        assert_eq!(items.len(), 2);
    }

    #[tokio::test]
    async fn delete_middle_item_renumbers_rest() {
        let store = MemoryStore::new();
        create_item(&store, payload("Home", "/", Some(0))).await.unwrap();
        let about = create_item(&store, payload("About", "/about", Some(1)))
            .await
            .unwrap();
        create_item(&store, payload("Contact", "/contact", Some(2)))
            .await
            .unwrap();

        delete_item(&store, about.id).await.unwrap();

        let items = list_items(&store).await.unwrap();
        assert_eq!(orders(&items), vec![0, 1]);
        assert_eq!(texts(&items), vec!["Home", "Contact"]);
    }

    #[tokio::test]
    async fn every_delete_restores_contiguous_order() {
        let store = MemoryStore::new();
        let mut ids = Vec::new();
        for (text, order) in [("a", 4), ("b", 4), ("c", 0), ("d", 17), ("e", 3), ("f", 9)] {
            let item = create_item(&store, payload(text, "/", Some(order))).await.unwrap();
            ids.push(item.id);
        }

        for id in [ids[3], ids[0], ids[5], ids[1]] {
            let before: Vec<Uuid> = list_items(&store)
                .await
                .unwrap()
                .into_iter()
                .map(|item| item.id)
                .filter(|item_id| *item_id != id)
                .collect();

            delete_item(&store, id).await.unwrap();

            let after = list_items(&store).await.unwrap();
            assert_eq!(orders(&after), (0..after.len() as u32).collect::<Vec<_>>());
            assert_eq!(after.iter().map(|item| item.id).collect::<Vec<_>>(), before);
        }
    }

    #[tokio::test]
    async fn update_without_reorder_keeps_duplicates() {
        let store = MemoryStore::new();
        create_item(&store, payload("Home", "/", Some(0))).await.unwrap();
        let about = create_item(&store, payload("About", "/about", Some(1)))
            .await
            .unwrap();

        let updated = update_item(&store, about.id, payload("About", "/about", Some(0)))
            .await
            .unwrap();

        assert_eq!(updated.order, 0);
        assert_eq!(updated.text, "About");
        assert_eq!(updated.link, "/about");
        assert_eq!(orders(&list_items(&store).await.unwrap()), vec![0, 0]);
    }

    #[tokio::test]
    async fn update_keeps_omitted_optional_fields() {
        let store = MemoryStore::new();
        let created = create_item(
            &store,
            NavigationItemPayload {
                is_active: Some(false),
                ..payload("Blog", "/blog", Some(4))
            },
        )
        .await
        .unwrap();

        let updated = update_item(&store, created.id, payload("Journal", "/journal", None))
            .await
            .unwrap();

        assert_eq!(updated.order, 4);
        assert!(!updated.is_active);
        assert_eq!(updated.created_at, created.created_at);
    }

    #[tokio::test]
    async fn update_unknown_id_leaves_store_untouched() {
        let store = MemoryStore::new();
        let home = create_item(&store, payload("Home", "/", None)).await.unwrap();

        let err = update_item(&store, Uuid::new_v4(), payload("X", "/x", Some(3)))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::NotFound(_)));
        assert_eq!(list_items(&store).await.unwrap(), vec![home]);
    }

    #[tokio::test]
    async fn delete_unknown_id_is_not_found() {
        let store = MemoryStore::new();

        let err = delete_item(&store, Uuid::new_v4()).await.unwrap_err();

        assert!(matches!(err, AppError::NotFound(ref msg) if msg == ITEM_NOT_FOUND));
    }
}
