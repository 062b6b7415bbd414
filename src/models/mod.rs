mod archived_conversation;
mod conversation;
mod erasure_request;
mod subject;

pub use archived_conversation::*;
pub use conversation::*;
pub use erasure_request::*;
pub use subject::*;
