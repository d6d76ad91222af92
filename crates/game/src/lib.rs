//! Cityhold simulation core: a fixed-step horde-survival simulation with a
//! player, chasing hostiles, projectiles and an escalating spawn director.
//!
//! Rendering, world decoration and device capture stay with the host. The
//! host feeds elapsed time and an [`input::InputSource`] into
//! [`Simulation::tick`] and reads back transforms, health and events.

pub mod config;
pub mod error;
pub mod events;
pub mod hostile;
pub mod hostile_ai;
pub mod player;
pub mod projectile;
pub mod session;
pub mod simulation;
pub mod spawner;
pub mod weapons;

pub use config::GameConfig;
pub use error::{ConfigError, SimError};
pub use events::GameEvent;
pub use hostile::HostileView;
pub use session::{SessionPhase, SessionStats};
pub use simulation::Simulation;
pub use spawner::ThreatLevel;
