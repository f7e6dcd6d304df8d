//! Session and actor access.

use parking_lot::RwLock;

/// Position of the acting player, in world cell units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActorPosition {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl ActorPosition {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// The host's view of the current session.
///
/// An inactive session (menu screen, disconnected) is an expected transient
/// state, not an error.
pub trait SessionAccessor: Send + Sync {
    /// Whether a world and actor are currently bound.
    fn is_active(&self) -> bool;

    /// Current actor position, if an actor is bound.
    fn actor_position(&self) -> Option<ActorPosition>;

    /// Whether the actor may run privileged commands.
    fn is_privileged(&self) -> bool;
}

#[derive(Debug, Clone, Copy)]
struct SessionState {
    position: Option<ActorPosition>,
    privileged: bool,
}

/// Session state set directly by the embedding code.
///
/// The session is active while a position is bound.
#[derive(Debug)]
pub struct SharedSession {
    state: RwLock<SessionState>,
}

impl SharedSession {
    /// Create an inactive, unprivileged session.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(SessionState {
                position: None,
                privileged: false,
            }),
        }
    }

    /// Create an active session at `position`.
    pub fn active_at(position: ActorPosition) -> Self {
        let session = Self::new();
        session.join(position);
        session
    }

    /// Bind an actor at `position`.
    pub fn join(&self, position: ActorPosition) {
        self.state.write().position = Some(position);
    }

    /// Unbind the actor.
    pub fn leave(&self) {
        self.state.write().position = None;
    }

    /// Move the bound actor. Ignored when no actor is bound.
    pub fn move_to(&self, position: ActorPosition) {
        let mut state = self.state.write();
        if state.position.is_some() {
            state.position = Some(position);
        }
    }

    pub fn set_privileged(&self, privileged: bool) {
        self.state.write().privileged = privileged;
    }
}

impl Default for SharedSession {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionAccessor for SharedSession {
    fn is_active(&self) -> bool {
        self.state.read().position.is_some()
    }

    fn actor_position(&self) -> Option<ActorPosition> {
        self.state.read().position
    }

    fn is_privileged(&self) -> bool {
        self.state.read().privileged
    }
}
