//! HTTP + SSE control surface
//!
//! | Method | Path               | Effect                                  |
//! |--------|--------------------|-----------------------------------------|
//! | GET    | `/health`          | liveness and build information          |
//! | GET    | `/session`         | current session snapshot                |
//! | POST   | `/session/start`   | open the scanner                        |
//! | POST   | `/session/cancel`  | close the scanner                       |
//! | POST   | `/session/restart` | scan the next credential                |
//! | POST   | `/session/retry`   | retry after a camera error              |
//! | POST   | `/session/done`    | dismiss the result                      |
//! | PUT    | `/session/mode`    | select `entrada` or `acreditacion`      |
//! | GET    | `/cameras`         | enumerate camera devices                |
//! | GET    | `/events`          | SSE stream of session events            |

pub mod handlers;
pub mod server;
pub mod sse;

pub use server::{build_router, run, serve, AppContext};
