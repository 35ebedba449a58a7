//! Mutations: perform the write through the transport, then apply the
//! resulting [`Effect`](crate::Effect) to the caches.
//!
//! Nothing is patched before the server confirmed the write.

mod conversations;
mod lists;
mod posts;

pub use conversations::leave_conversation;
pub use lists::{delete_list, update_list_memberships};
pub use posts::delete_post;
