pub mod commands;
pub mod dispatch;
pub mod parallelism;
pub mod pip;
pub mod playbook;
pub mod requirements;
pub mod runtime;
