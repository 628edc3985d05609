pub mod database;
pub mod dispatcher;
pub mod milestones;
pub mod scanner;
pub mod store;
