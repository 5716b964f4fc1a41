pub mod base_time;
pub mod department;
pub mod status;
pub mod ticket;
pub mod ticket_follower;
pub mod ticket_post;
pub mod ticket_type;
pub mod user;
