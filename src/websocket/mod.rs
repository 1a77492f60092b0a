//! WebSocket Change Feed
//!
//! Pushes store changes to connected clients so views can refresh.
//!
//! - **ConnectionHub**: Manages connections and topic subscriptions
//! - **Handler**: WebSocket upgrade and message loop
//! - **Messages**: Client and server message formats
//!
//! Topics:
//! - `collections.*` - Every change
//! - `collections.{name}` - One collection or singleton (e.g., `collections.workouts`)
//! - `system` - Session and sync notices
//!
//! ```javascript
//! const ws = new WebSocket('ws://localhost:8090/api/v1/ws');
//! ws.onopen = () => {
//!   ws.send(JSON.stringify({type: 'subscribe', topics: ['collections.workouts']}));
//! };
//! ```

mod handler;
mod hub;
mod messages;

pub use handler::websocket_handler;
pub use hub::{ConnectionHub, HubConfig, HubError};
pub use messages::{ClientMessage, ServerMessage, WsEvent};
