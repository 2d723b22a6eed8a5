pub mod job_repo;
pub mod order_repo;
