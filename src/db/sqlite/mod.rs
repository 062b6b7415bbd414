mod archived_conversations;
mod common;
mod conversations;
mod erasure_requests;
mod job_leases;
mod subjects;

pub use archived_conversations::SqliteArchivedConversationRepo;
pub use conversations::SqliteConversationRepo;
pub use erasure_requests::SqliteErasureRequestRepo;
pub use job_leases::SqliteJobLeaseRepo;
pub use subjects::SqliteSubjectRepo;
