use std::rc::Rc;

use plume_shared::AtUri;

use super::{Effect, Reduce};
use crate::models::{ThreadAncestor, ThreadData, ThreadNode};

impl Reduce for ThreadData {
    /// A deleted ancestor becomes a not-found placeholder so the chain to
    /// the root stays intact; a deleted reply takes its subtree with it.
    fn reduce(this: &Rc<Self>, effect: &Effect) -> Rc<Self> {
        let Effect::PostDeleted { uri, .. } = effect else {
            return Rc::clone(this);
        };

        let in_parents = this
            .parents
            .iter()
            .any(|a| matches!(a, ThreadAncestor::Post(p) if p.uri == *uri));
        let replies = prune(&this.replies, uri);

        if !in_parents && replies.is_none() {
            return Rc::clone(this);
        }

        let parents = this
            .parents
            .iter()
            .map(|a| match a {
                ThreadAncestor::Post(p) if p.uri == *uri => ThreadAncestor::NotFound(uri.clone()),
                other => other.clone(),
            })
            .collect();

        Rc::new(ThreadData {
            post: Rc::clone(&this.post),
            parents,
            replies: replies.unwrap_or_else(|| this.replies.clone()),
        })
    }
}

/// `None` when no node in the tree shows `uri`.
fn prune(nodes: &[ThreadNode], uri: &AtUri) -> Option<Vec<ThreadNode>> {
    let mut changed = false;
    let mut out = Vec::with_capacity(nodes.len());

    for node in nodes {
        if node.post.uri == *uri {
            changed = true;
            continue;
        }
        match prune(&node.replies, uri) {
            Some(replies) => {
                changed = true;
                out.push(ThreadNode {
                    post: Rc::clone(&node.post),
                    replies,
                });
            }
            None => out.push(node.clone()),
        }
    }

    changed.then_some(out)
}

#[cfg(test)]
mod tests {
    use plume_cache::EntityCache;

    use super::*;
    use crate::testing::{me, post, post_uri};

    fn deleted(rkey: &str) -> Effect {
        Effect::PostDeleted {
            session: me(),
            uri: post_uri(rkey),
            author_handle: None,
            parent: None,
        }
    }

    fn thread(cache: &EntityCache) -> Rc<ThreadData> {
        Rc::new(ThreadData {
            post: post(cache, "anchor"),
            parents: vec![
                ThreadAncestor::Post(post(cache, "root")),
                ThreadAncestor::Post(post(cache, "parent")),
            ],
            replies: vec![
                ThreadNode {
                    post: post(cache, "r1"),
                    replies: vec![ThreadNode {
                        post: post(cache, "r1a"),
                        replies: vec![],
                    }],
                },
                ThreadNode {
                    post: post(cache, "r2"),
                    replies: vec![],
                },
            ],
        })
    }

    #[test]
    fn test_deleted_ancestor_becomes_not_found() {
        let cache = EntityCache::with_sweep_interval(0);
        let data = thread(&cache);

        let next = Reduce::reduce(&data, &deleted("parent"));
        assert!(matches!(&next.parents[1], ThreadAncestor::NotFound(u) if u.rkey() == "parent"));
        assert!(matches!(&next.parents[0], ThreadAncestor::Post(_)));
        assert_eq!(next.replies.len(), 2);

        assert!(Rc::ptr_eq(&Reduce::reduce(&next, &deleted("parent")), &next));
    }

    #[test]
    fn test_deleted_reply_prunes_subtree() {
        let cache = EntityCache::with_sweep_interval(0);
        let data = thread(&cache);

        let next = Reduce::reduce(&data, &deleted("r1"));
        assert_eq!(next.replies.len(), 1);
        assert_eq!(next.replies[0].post.uri.rkey(), "r2");

        let nested = Reduce::reduce(&data, &deleted("r1a"));
        assert_eq!(nested.replies.len(), 2);
        assert!(nested.replies[0].replies.is_empty());
    }

    #[test]
    fn test_unrelated_post_keeps_reference() {
        let cache = EntityCache::with_sweep_interval(0);
        let data = thread(&cache);
        assert!(Rc::ptr_eq(&Reduce::reduce(&data, &deleted("elsewhere")), &data));
    }
}
