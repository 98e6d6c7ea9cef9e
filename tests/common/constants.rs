//! Shared constants for end-to-end tests
//!
//! When test data changes (user credentials, categories, etc.),
//! update only this file.

// ============================================================================
// Test User Credentials
// ============================================================================

/// Regular test user email
pub const TEST_USER: &str = "testuser@example.com";

/// Regular test user display name
pub const TEST_USER_NAME: &str = "Test User";

/// Regular test user password
pub const TEST_PASS: &str = "testpass123";

/// Second regular user, for ownership checks
pub const OTHER_USER: &str = "other@example.com";

pub const OTHER_USER_NAME: &str = "Other User";

pub const OTHER_PASS: &str = "otherpass123";

/// Admin test user email
pub const ADMIN_USER: &str = "admin@example.com";

/// Admin test user password
pub const ADMIN_PASS: &str = "adminpass123";

// ============================================================================
// Test Content
// ============================================================================

/// Category seeded in every test database
pub const ROCK_CATEGORY: &str = "rock";

pub const JAZZ_CATEGORY: &str = "jazz";

// ============================================================================
// Test Timeouts and Configuration
// ============================================================================

/// Secret used to sign tokens in the test server
pub const TEST_JWT_SECRET: &[u8] = b"e2e-test-secret-of-enough-length";

/// Page size configured on the test server
pub const TEST_POSTS_PER_PAGE: usize = 2;

/// Maximum time to wait for server to become ready (milliseconds)
pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;

/// Timeout for individual HTTP requests (seconds)
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Polling interval when waiting for server ready (milliseconds)
pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 50;
