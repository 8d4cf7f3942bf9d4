pub mod accession;
pub mod args;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod driver;
pub mod error;
pub mod expand;
pub mod guard;
pub mod invocation;
pub mod orchestrator;
pub mod output;
pub mod params;
pub mod process;
pub mod sdl;
pub mod source;
pub mod tools;
