pub mod archiver;
pub mod audit;
pub mod config;
pub mod guard;
pub mod metrics;
pub mod paths;
pub mod sections;
pub mod shutdown;
pub mod source;
pub mod store;
pub mod trends;
pub mod util;
pub mod warn;
pub mod workspace;
