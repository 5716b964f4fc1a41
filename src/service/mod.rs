pub mod account;
pub mod attachment;
pub mod lookup;
pub mod query;
pub mod ticket;
pub mod view;

pub use attachment::{Attachment, FileStore};
pub use query::{TicketFilter, TicketScope, TicketSort};
pub use ticket::{FollowAction, NewPost, NewTicket, PostChanges, TicketChanges};
