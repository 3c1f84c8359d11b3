//! Tag subsystem
//!
//! Tags live behind their own endpoints keyed by resource id. Reads flatten the
//! paginated listing into a key/value map; updates apply the delta key by key.

use std::collections::BTreeMap;

use cumulus_core::context::OperationContext;

use crate::client::ScpApi;
use crate::client::api::MAX_PAGE_SIZE;
use crate::client::models::Tag;
use crate::error::ScpResult;

pub type Tags = BTreeMap<String, String>;

/// Keys to add, change and remove to go from one tag map to another
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TagDelta {
    pub added: Vec<Tag>,
    pub changed: Vec<Tag>,
    pub removed: Vec<String>,
}

impl TagDelta {
    pub fn between(old: &Tags, new: &Tags) -> Self {
        let mut delta = TagDelta::default();
        for (key, value) in new {
            match old.get(key) {
                None => delta.added.push(tag(key, value)),
                Some(prior) if prior != value => delta.changed.push(tag(key, value)),
                Some(_) => {}
            }
        }
        delta.removed = old
            .keys()
            .filter(|k| !new.contains_key(*k))
            .cloned()
            .collect();
        delta
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.changed.is_empty() && self.removed.is_empty()
    }
}

fn tag(key: &str, value: &str) -> Tag {
    Tag {
        tag_key: key.to_string(),
        tag_value: value.to_string(),
    }
}

/// Wire form of a tag map, for create payloads
pub fn to_wire(tags: &Tags) -> Vec<Tag> {
    tags.iter().map(|(k, v)| tag(k, v)).collect()
}

/// All tags of a resource, following pages until `TotalCount` is reached
pub async fn read(api: &ScpApi, ctx: &OperationContext, resource_id: &str) -> ScpResult<Tags> {
    let mut tags = Tags::new();
    let mut seen = 0usize;
    let mut page = 0;
    loop {
        ctx.check()?;
        let response = api.list_tags(resource_id, page, MAX_PAGE_SIZE).await?;
        let count = response.contents.len();
        seen += count;
        tags.extend(response.contents.into_iter().map(|t| (t.tag_key, t.tag_value)));
        if count == 0 || seen as i64 >= response.total_count {
            break;
        }
        page += 1;
    }
    Ok(tags)
}

/// Apply the difference between `old` and `new`
pub async fn apply(
    api: &ScpApi,
    ctx: &OperationContext,
    resource_id: &str,
    old: &Tags,
    new: &Tags,
) -> ScpResult<()> {
    let delta = TagDelta::between(old, new);
    if delta.is_empty() {
        return Ok(());
    }
    log::info!(
        "tags of {}: {} added, {} changed, {} removed",
        resource_id,
        delta.added.len(),
        delta.changed.len(),
        delta.removed.len()
    );

    if !delta.added.is_empty() {
        ctx.check()?;
        api.add_tags(resource_id, delta.added).await?;
    }
    for t in &delta.changed {
        ctx.check()?;
        api.modify_tag(resource_id, &t.tag_key, &t.tag_value).await?;
    }
    for key in &delta.removed {
        ctx.check()?;
        api.remove_tag(resource_id, key).await?;
    }
    Ok(())
}
