pub mod groups;
pub mod serve;
pub mod sync;
pub mod upstream;
