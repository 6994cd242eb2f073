mod channel;

pub use channel::ScriptedChannel;
