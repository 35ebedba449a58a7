use std::rc::Rc;

use plume_shared::AtUri;

use super::{map_pages, Effect, Reduce};
use crate::models::{InfiniteData, TimelinePage, TimelineSlice};

impl Reduce for InfiniteData<TimelinePage> {
    fn reduce(this: &Rc<Self>, effect: &Effect) -> Rc<Self> {
        match effect {
            Effect::PostDeleted { uri, .. } => map_pages(this, |_, page| without_post(page, uri)),
            _ => Rc::clone(this),
        }
    }
}

/// Drop every item showing `uri`, and slices left empty by that.
fn without_post(page: &TimelinePage, uri: &AtUri) -> Option<TimelinePage> {
    let contains = page
        .slices
        .iter()
        .any(|slice| slice.items.iter().any(|item| item.post.uri == *uri));
    if !contains {
        return None;
    }

    let slices = page
        .slices
        .iter()
        .filter_map(|slice| {
            let items: Vec<_> = slice
                .items
                .iter()
                .filter(|item| item.post.uri != *uri)
                .cloned()
                .collect();
            (!items.is_empty()).then_some(TimelineSlice { items })
        })
        .collect();

    Some(TimelinePage {
        cursor: page.cursor.clone(),
        slices,
    })
}

#[cfg(test)]
mod tests {
    use plume_cache::EntityCache;

    use super::*;
    use crate::models::TimelineItem;
    use crate::testing::{me, post, post_uri};

    fn slice(posts: &[&Rc<plume_cache::SignalizedPost>]) -> TimelineSlice {
        TimelineSlice {
            items: posts
                .iter()
                .map(|p| TimelineItem {
                    post: Rc::clone(p),
                    reason: None,
                })
                .collect(),
        }
    }

    fn deleted(rkey: &str) -> Effect {
        Effect::PostDeleted {
            session: me(),
            uri: post_uri(rkey),
            author_handle: None,
            parent: None,
        }
    }

    fn uris(data: &InfiniteData<TimelinePage>) -> Vec<String> {
        data.pages
            .iter()
            .flat_map(|p| &p.slices)
            .flat_map(|s| &s.items)
            .map(|i| i.post.uri.rkey().to_string())
            .collect()
    }

    #[test]
    fn test_removes_deleted_post_in_order() {
        let cache = EntityCache::with_sweep_interval(0);
        let (p0, p1, p2) = (post(&cache, "p0"), post(&cache, "p1"), post(&cache, "p2"));
        let timeline = Rc::new(InfiniteData::first(TimelinePage {
            cursor: Some("c1".into()),
            slices: vec![slice(&[&p0]), slice(&[&p1]), slice(&[&p2])],
        }));

        let next = Reduce::reduce(&timeline, &deleted("p1"));
        assert!(!Rc::ptr_eq(&next, &timeline));
        assert_eq!(uris(&next), ["p0", "p2"]);
        assert_eq!(next.pages[0].slices.len(), 2);
        assert_eq!(next.pages[0].cursor.as_deref(), Some("c1"));
        // The original value is untouched.
        assert_eq!(uris(&timeline), ["p0", "p1", "p2"]);
    }

    #[test]
    fn test_unaffected_timeline_is_same_reference() {
        let cache = EntityCache::with_sweep_interval(0);
        let (p0, p2) = (post(&cache, "p0"), post(&cache, "p2"));
        let timeline = Rc::new(InfiniteData::first(TimelinePage {
            cursor: None,
            slices: vec![slice(&[&p0, &p2])],
        }));

        assert!(Rc::ptr_eq(&Reduce::reduce(&timeline, &deleted("p1")), &timeline));
        let convo_left = Effect::ConversationLeft {
            session: me(),
            id: "c".into(),
        };
        assert!(Rc::ptr_eq(&Reduce::reduce(&timeline, &convo_left), &timeline));
    }

    #[test]
    fn test_removal_is_idempotent_and_keeps_partial_slices() {
        let cache = EntityCache::with_sweep_interval(0);
        let (p0, p1) = (post(&cache, "p0"), post(&cache, "p1"));
        let timeline = Rc::new(InfiniteData::first(TimelinePage {
            cursor: None,
            slices: vec![slice(&[&p0, &p1])],
        }));

        let once = Reduce::reduce(&timeline, &deleted("p0"));
        assert_eq!(uris(&once), ["p1"]);
        let twice = Reduce::reduce(&once, &deleted("p0"));
        assert!(Rc::ptr_eq(&once, &twice));
    }
}
