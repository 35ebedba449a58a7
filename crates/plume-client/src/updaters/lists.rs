use std::rc::Rc;

use super::{map_pages, Effect, Reduce};
use crate::models::{InfiniteData, ListMember, ListMembersPage, ListMembership, ProfileListsPage};

impl Reduce for Vec<ListMembership> {
    fn reduce(this: &Rc<Self>, effect: &Effect) -> Rc<Self> {
        match effect {
            Effect::MembershipsChanged {
                created, removed, ..
            } => {
                let to_add: Vec<&ListMembership> = created
                    .iter()
                    .filter(|c| !this.iter().any(|m| m.item_uri == c.item_uri))
                    .collect();
                let removes = this
                    .iter()
                    .any(|m| removed.iter().any(|r| r.item_uri == m.item_uri));

                if to_add.is_empty() && !removes {
                    return Rc::clone(this);
                }

                let next = this
                    .iter()
                    .filter(|m| !removed.iter().any(|r| r.item_uri == m.item_uri))
                    .chain(to_add)
                    .cloned()
                    .collect();
                Rc::new(next)
            }
            Effect::ListDeleted { uri, .. } => {
                if !this.iter().any(|m| m.list_uri == *uri) {
                    return Rc::clone(this);
                }
                Rc::new(this.iter().filter(|m| m.list_uri != *uri).cloned().collect())
            }
            _ => Rc::clone(this),
        }
    }
}

impl Reduce for InfiniteData<ListMembersPage> {
    /// Additions go to the top of the first page.
    fn reduce(this: &Rc<Self>, effect: &Effect) -> Rc<Self> {
        let Effect::MembershipsChanged {
            actor,
            created,
            removed,
            ..
        } = effect
        else {
            return Rc::clone(this);
        };

        let Some(list_uri) = this.pages.first().map(|p| p.list.uri.clone()) else {
            return Rc::clone(this);
        };
        let present = |item: &ListMembership| {
            this.pages
                .iter()
                .any(|p| p.members.iter().any(|m| m.uri == item.item_uri))
        };
        let added: Vec<ListMember> = created
            .iter()
            .filter(|c| c.list_uri == list_uri && !present(*c))
            .map(|c| ListMember {
                uri: c.item_uri.clone(),
                profile: Rc::clone(actor),
            })
            .collect();

        map_pages(this, |index, page| {
            let removes = page
                .members
                .iter()
                .any(|m| removed.iter().any(|r| r.item_uri == m.uri));
            let adds = index == 0 && !added.is_empty();
            if !removes && !adds {
                return None;
            }

            let kept = page
                .members
                .iter()
                .filter(|m| !removed.iter().any(|r| r.item_uri == m.uri))
                .cloned();
            let members = if adds {
                added.iter().cloned().chain(kept).collect()
            } else {
                kept.collect()
            };

            Some(ListMembersPage {
                cursor: page.cursor.clone(),
                list: Rc::clone(&page.list),
                members,
            })
        })
    }
}

impl Reduce for InfiniteData<ProfileListsPage> {
    fn reduce(this: &Rc<Self>, effect: &Effect) -> Rc<Self> {
        let Effect::ListDeleted { uri, .. } = effect else {
            return Rc::clone(this);
        };

        map_pages(this, |_, page| {
            if !page.lists.iter().any(|l| l.uri == *uri) {
                return None;
            }
            Some(ProfileListsPage {
                cursor: page.cursor.clone(),
                lists: page.lists.iter().filter(|l| l.uri != *uri).cloned().collect(),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use plume_cache::EntityCache;
    use plume_shared::{AtUri, Did};

    use super::*;
    use crate::testing::{list, list_uri, me, profile};

    fn membership(list: &str, item: &str) -> ListMembership {
        ListMembership {
            actor: Did::parse("did:plc:abc").unwrap(),
            list_uri: list_uri(list),
            item_uri: AtUri::parse(format!("at://did:plc:me/app.bsky.graph.listitem/{item}")).unwrap(),
        }
    }

    fn changed(
        cache: &EntityCache,
        created: Vec<ListMembership>,
        removed: Vec<ListMembership>,
    ) -> Effect {
        Effect::MembershipsChanged {
            session: me(),
            actor: profile(cache, "did:plc:abc", "alice"),
            created,
            removed,
        }
    }

    #[test]
    fn test_memberships_add_and_remove() {
        let cache = EntityCache::with_sweep_interval(0);
        let data = Rc::new(vec![membership("a", "1"), membership("b", "2")]);
        let effect = changed(&cache, vec![membership("c", "3")], vec![membership("a", "1")]);

        let next = Reduce::reduce(&data, &effect);
        let items: Vec<_> = next.iter().map(|m| m.item_uri.rkey()).collect();
        assert_eq!(items, ["2", "3"]);

        // Same effect again: nothing left to do.
        assert!(Rc::ptr_eq(&Reduce::reduce(&next, &effect), &next));
    }

    #[test]
    fn test_memberships_list_deleted() {
        let data = Rc::new(vec![membership("a", "1"), membership("b", "2")]);
        let effect = Effect::ListDeleted {
            session: me(),
            uri: list_uri("a"),
        };

        let next = Reduce::reduce(&data, &effect);
        assert_eq!(next.len(), 1);
        assert!(Rc::ptr_eq(&Reduce::reduce(&next, &effect), &next));
    }

    #[test]
    fn test_list_members_page() {
        let cache = EntityCache::with_sweep_interval(0);
        let bob = profile(&cache, "did:plc:bob", "bob");
        let data = Rc::new(InfiniteData::first(ListMembersPage {
            cursor: None,
            list: list(&cache, "a"),
            members: vec![ListMember {
                uri: membership("a", "1").item_uri,
                profile: bob,
            }],
        }));

        let add = changed(&cache, vec![membership("a", "9")], vec![]);
        let next = Reduce::reduce(&data, &add);
        let members = &next.pages[0].members;
        assert_eq!(members.len(), 2);
        assert_eq!(members[0].uri.rkey(), "9");
        assert_eq!(members[0].profile.handle.get(), "alice");
        assert!(Rc::ptr_eq(&Reduce::reduce(&next, &add), &next));

        // Membership in another list leaves this one alone.
        let other = changed(&cache, vec![membership("b", "8")], vec![]);
        assert!(Rc::ptr_eq(&Reduce::reduce(&data, &other), &data));

        let remove = changed(&cache, vec![], vec![membership("a", "1")]);
        let next = Reduce::reduce(&next, &remove);
        assert_eq!(next.pages[0].members.len(), 1);
    }

    #[test]
    fn test_profile_lists_drop_deleted_list() {
        let cache = EntityCache::with_sweep_interval(0);
        let data = Rc::new(InfiniteData::first(ProfileListsPage {
            cursor: None,
            lists: vec![list(&cache, "a"), list(&cache, "b")],
        }));
        let effect = Effect::ListDeleted {
            session: me(),
            uri: list_uri("a"),
        };

        let next = Reduce::reduce(&data, &effect);
        assert_eq!(next.pages[0].lists.len(), 1);
        assert_eq!(next.pages[0].lists[0].uri, list_uri("b"));
        assert!(Rc::ptr_eq(&Reduce::reduce(&next, &effect), &next));
    }
}
