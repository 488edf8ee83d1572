/*
 * Responsibility
 * - Public middleware surface
 * - http: request id / tracing / timeout; session: cookie-backed Session; smart: the OAuth flow
 */
pub mod http;
pub mod session;
pub mod smart;
