pub mod achievements;
pub mod lifecycle;
pub mod streaks;
