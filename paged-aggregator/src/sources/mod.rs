pub mod mock;
pub mod rest;

pub use mock::MockPageSource;
pub use rest::RestCollectionSource;
