mod archived_conversations;
mod conversations;
mod erasure_requests;
mod job_leases;
mod subjects;

pub use archived_conversations::*;
pub use conversations::*;
pub use erasure_requests::*;
pub use job_leases::*;
pub use subjects::*;
