pub mod bitmap;
pub mod frames;
pub mod layout;
pub mod manager;
pub mod page;
pub mod swap;
