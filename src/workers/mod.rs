pub mod message_cleanup;

pub use message_cleanup::MessageCleanupWorker;
