pub mod server;

pub use server::ScriptServer;
