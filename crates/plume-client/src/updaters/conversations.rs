use std::rc::Rc;

use super::{map_pages, Effect, Reduce};
use crate::models::{ConvoListPage, InfiniteData};

impl Reduce for InfiniteData<ConvoListPage> {
    fn reduce(this: &Rc<Self>, effect: &Effect) -> Rc<Self> {
        let Effect::ConversationLeft { id, .. } = effect else {
            return Rc::clone(this);
        };

        map_pages(this, |_, page| {
            if !page.convos.iter().any(|c| c.id == *id) {
                return None;
            }
            Some(ConvoListPage {
                cursor: page.cursor.clone(),
                convos: page.convos.iter().filter(|c| c.id != *id).cloned().collect(),
            })
        })
    }
}
