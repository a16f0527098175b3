pub mod approval;
pub mod audit;
pub mod auth;
pub mod child;
pub mod feature_flag;
pub mod notification;
pub mod product;
pub mod prompt;
pub mod routine;
pub mod shelf;
pub mod user;
pub mod wishlist;
