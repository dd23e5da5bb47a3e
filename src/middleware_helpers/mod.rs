pub mod media_type;
pub mod request_id;

pub use media_type::{accepts_jsonapi, jsonapi_negotiation};
pub use request_id::{request_id_middleware, REQUEST_ID_HEADER};
