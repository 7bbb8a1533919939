pub mod dispatcher;
pub mod input;
pub mod keys;
pub mod rules;
pub mod terminal;
