// Database schema definitions
// Timestamps are stored as UTC epoch milliseconds.

pub const INITIAL_SCHEMA: &str = include_str!("../../migrations/001_initial_schema.sql");
