// Export all route modules
pub mod companies;
pub mod legacy;
pub mod stats;

// Re-export all route handlers for easy importing
pub use companies::*;
pub use legacy::*;
pub use stats::*;
