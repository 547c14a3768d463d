mod command;
mod composer;

pub use command::{classpath_separator, CommandComposer, VersionJsonComposer};
pub use composer::{LaunchComposer, LaunchOptions, ProcessInvocation};
