pub mod builders;
pub mod db;
pub mod requests;

pub use builders::{FeedBuilder, UserBuilder};
pub use db::TestDb;
