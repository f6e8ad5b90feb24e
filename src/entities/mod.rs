pub mod access_token;
pub mod client;
pub mod feed;
pub mod mirror_registration;
pub mod product;
pub mod property;
pub mod user;

pub use access_token::Entity as AccessToken;
pub use client::Entity as Client;
pub use feed::Entity as Feed;
pub use mirror_registration::Entity as MirrorRegistration;
pub use product::Entity as Product;
pub use property::Entity as Property;
pub use user::Entity as User;
