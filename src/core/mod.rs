pub mod animator;
pub mod config;
pub mod context;
pub mod game;
pub mod markup;
pub mod queue;
pub mod router;
pub mod runner;
pub mod scheduler;
pub mod screen;
pub mod story;
pub mod timer;
