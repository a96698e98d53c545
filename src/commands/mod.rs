pub mod purge_deleted;
pub mod serve;
