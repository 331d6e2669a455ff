//! Managers own the per-kind rules. Entity data lives in the hecs world;
//! managers hold only their own bookkeeping and are handed the world on
//! every call.

pub mod audio;
pub mod enemy;
pub mod projectile;
pub mod tower;
pub mod wave;

pub use audio::SpatialAudioManager;
pub use enemy::EnemyManager;
pub use projectile::ProjectileManager;
pub use tower::TowerManager;
pub use wave::WaveManager;
