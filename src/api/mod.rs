pub mod auth;
pub mod doc;
pub mod health_check;
pub mod lookup;
pub mod ticket;

pub use doc::ApiDoc;
