// WebSocket Hub: Real-time notification broadcasting
// Phase 7A Week 2: T203 - WebSocket Handler
//
// This module provides WebSocket connection management for real-time
// notification delivery to connected clients.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

/// Connection ID type for uniquely identifying WebSocket connections
pub type ConnectionId = Uuid;

/// User ID type for identifying users
pub type UserId = Uuid;

/// WebSocket Hub - Central manager for all WebSocket connections
pub struct WebSocketHub {
    /// All active connections indexed by connection ID
    connections: Arc<RwLock<HashMap<ConnectionId, ClientConnection>>>,
    /// Broadcast channel for sending messages to all connected clients
    broadcast_channel: broadcast::Sender<Message>,
}

/// Individual client connection tracking
pub struct ClientConnection {
    /// User ID this connection belongs to
    pub user_id: UserId,
    /// Unique connection ID
    pub connection_id: ConnectionId,
    /// Channel for sending messages to this specific client
    pub sender: UnboundedSender<Message>,
    /// Current state of this connection
    pub state: ConnectionState,
}

/// Connection state tracking
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
    /// Newly connected, active
    Connected,
    /// Client disconnected
    Disconnected,
    /// Client attempting to reconnect
    Reconnecting,
}

/// Message structure for WebSocket communication
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Message type identifier
    #[serde(rename = "type")]
    pub message_type: String,
    /// Message payload as JSON
    pub payload: serde_json::Value,
    /// Timestamp when message was created
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl WebSocketHub {
    /// Create a new WebSocket Hub with specified broadcast capacity
    pub fn new(broadcast_capacity: usize) -> Self {
        let (broadcast_tx, _) = broadcast::channel(broadcast_capacity);

        Self {
            connections: Arc::new(RwLock::new(HashMap::new())),
            broadcast_channel: broadcast_tx,
        }
    }

    /// Get total number of active connections
    pub async fn connection_count(&self) -> usize {
        let connections = self.connections.read().await;
        connections.len()
    }

    /// Accept a new WebSocket connection
    ///
    /// # Arguments
    /// * `user_id` - User ID for this connection
    /// * `sender` - Message sender channel for this client
    ///
    /// # Returns
    /// Unique connection ID for the new connection
    pub async fn accept_connection(
        &self,
        user_id: UserId,
        sender: UnboundedSender<Message>,
    ) -> ConnectionId {
        let connection_id = Uuid::new_v4();
        let connection = ClientConnection {
            user_id,
            connection_id,
            sender,
            state: ConnectionState::Connected,
        };

        let mut connections = self.connections.write().await;
        connections.insert(connection_id, connection);

        connection_id
    }

    /// Remove a connection when client disconnects
    ///
    /// # Arguments
    /// * `connection_id` - ID of connection to remove
    ///
    /// # Returns
    /// true if connection was found and removed, false otherwise
    pub async fn remove_connection(&self, connection_id: ConnectionId) -> bool {
        let mut connections = self.connections.write().await;
        connections.remove(&connection_id).is_some()
    }

    /// Broadcast a message to all connected clients
    ///
    /// # Arguments
    /// * `message` - Message to broadcast
    ///
    /// # Returns
    /// Number of clients that received the message
    pub async fn broadcast(&self, message: Message) -> usize {
        // Send via broadcast channel
        let _receiver_count = self.broadcast_channel.receiver_count();

        // Also send directly to all client senders for guaranteed delivery
        let connections = self.connections.read().await;
        let mut success_count = 0;

        for connection in connections.values() {
            if connection.state == ConnectionState::Connected
                && connection.sender.send(message.clone()).is_ok()
            {
                success_count += 1;
            }
        }

        success_count
    }

    /// Send a message to a specific user
    ///
    /// # Arguments
    /// * `user_id` - Target user ID
    /// * `message` - Message to send
    ///
    /// # Returns
    /// Number of connections for this user that received the message
    pub async fn send_to_user(&self, user_id: UserId, message: Message) -> usize {
        let connections = self.connections.read().await;
        let mut success_count = 0;

        for connection in connections.values() {
            if connection.user_id == user_id
                && connection.state == ConnectionState::Connected
                && connection.sender.send(message.clone()).is_ok()
            {
                success_count += 1;
            }
        }

        success_count
    }

    /// Update connection state
    ///
    /// # Arguments
    /// * `connection_id` - Connection to update
    /// * `new_state` - New state for the connection
    ///
    /// # Returns
    /// true if connection was found and updated, false otherwise
    pub async fn update_connection_state(
        &self,
        connection_id: ConnectionId,
        new_state: ConnectionState,
    ) -> bool {
        let mut connections = self.connections.write().await;

        if let Some(connection) = connections.get_mut(&connection_id) {
            connection.state = new_state;
            true
        } else {
            false
        }
    }

    /// Get a snapshot of all connection IDs
    pub async fn get_connection_ids(&self) -> Vec<ConnectionId> {
        let connections = self.connections.read().await;
        connections.keys().copied().collect()
    }
}
