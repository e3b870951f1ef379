pub mod fund;
pub mod returns;
