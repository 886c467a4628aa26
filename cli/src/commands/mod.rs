pub mod demo;
pub mod play;
pub mod rollout;
pub mod script;
