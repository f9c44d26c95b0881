//! Wire contract shared by everything that talks to the collection endpoints.

pub mod defs;

pub use defs::{CollectionEndpointSpec, CollectionResponse, Cursor, ErrorBody, ErrorResponse, FieldErrors};
